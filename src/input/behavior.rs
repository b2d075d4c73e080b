//! Session-consistent behavioral parameters
//!
//! One [`BehavioralProfile`] is created per session and read by the mouse and
//! typing planners. Everything is derived from `seed`, so the same seed gives
//! the same "person".

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{EvasionError, EvasionResult};

/// Accuracy-to-error scaling: accuracy 0.8 means 8% of characters get a typo
const ERROR_PER_INACCURACY: f64 = 0.4;

/// Behavioral parameters of one synthetic user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralProfile {
    pub id: String,
    pub seed: u64,
    /// Pointer speed relative to the Fitts baseline; larger is faster
    pub mouse_speed_factor: f64,
    /// Baseline typing speed in words per minute
    #[serde(rename = "typingWPM")]
    pub typing_wpm: f64,
    /// Probability of a typo per character
    pub error_rate: f64,
    /// Delay increase per minute of session time (0.005 = +0.5%/min)
    pub fatigue_rate: f64,
    /// Physiological tremor frequency
    pub tremor_frequency_hz: f64,
    /// Tremor amplitude in pixels
    pub tremor_amplitude_px: f64,
    pub created_at: DateTime<Utc>,
}

impl BehavioralProfile {
    /// Derive a profile from a seed
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let id = uuid::Builder::from_random_bytes(rng.gen())
            .into_uuid()
            .to_string();
        let accuracy: f64 = rng.gen_range(0.92..=0.995);

        Self {
            id,
            seed,
            mouse_speed_factor: rng.gen_range(0.7..=1.3),
            typing_wpm: rng.gen_range(40.0..=75.0),
            error_rate: (1.0 - accuracy) * ERROR_PER_INACCURACY,
            fatigue_rate: rng.gen_range(0.002..=0.01),
            tremor_frequency_hz: rng.gen_range(8.0..=12.0),
            tremor_amplitude_px: rng.gen_range(0.4..=1.6),
            created_at: Utc::now(),
        }
    }

    /// Profile with a random seed
    pub fn random() -> Self {
        Self::from_seed(rand::random())
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Scale overall speed. Mouse speed becomes `multiplier` and typing speed
    /// scales by the same ratio.
    ///
    /// `multiplier` must lie in `[0.5, 1.5]`.
    pub fn with_speed_multiplier(mut self, multiplier: f64) -> EvasionResult<Self> {
        if !multiplier.is_finite() || !(0.5..=1.5).contains(&multiplier) {
            return Err(EvasionError::invalid(format!(
                "speed multiplier {} outside 0.5..=1.5",
                multiplier
            )));
        }
        self.typing_wpm *= multiplier / self.mouse_speed_factor;
        self.mouse_speed_factor = multiplier;
        Ok(self)
    }

    /// Set accuracy in `[0.8, 1.0]`; error rate becomes `(1 - accuracy) * 0.4`
    pub fn with_accuracy(mut self, accuracy: f64) -> EvasionResult<Self> {
        if !accuracy.is_finite() || !(0.8..=1.0).contains(&accuracy) {
            return Err(EvasionError::invalid(format!(
                "accuracy level {} outside 0.8..=1.0",
                accuracy
            )));
        }
        self.error_rate = (1.0 - accuracy) * ERROR_PER_INACCURACY;
        Ok(self)
    }

    /// Set the per-character typo probability directly
    pub fn with_error_rate(mut self, error_rate: f64) -> EvasionResult<Self> {
        if !error_rate.is_finite() || !(0.0..=1.0).contains(&error_rate) {
            return Err(EvasionError::invalid(format!(
                "error rate {} outside 0..=1",
                error_rate
            )));
        }
        self.error_rate = error_rate;
        Ok(self)
    }

    pub fn with_typing_wpm(mut self, wpm: f64) -> EvasionResult<Self> {
        if !wpm.is_finite() || wpm <= 0.0 {
            return Err(EvasionError::invalid(format!("typing speed {} WPM", wpm)));
        }
        self.typing_wpm = wpm;
        Ok(self)
    }

    pub fn with_fatigue_rate(mut self, fatigue_rate: f64) -> EvasionResult<Self> {
        if !fatigue_rate.is_finite() || fatigue_rate < 0.0 {
            return Err(EvasionError::invalid(format!(
                "fatigue rate {}",
                fatigue_rate
            )));
        }
        self.fatigue_rate = fatigue_rate;
        Ok(self)
    }

    /// Accuracy level implied by the error rate
    pub fn accuracy(&self) -> f64 {
        (1.0 - self.error_rate / ERROR_PER_INACCURACY).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_seed_is_reproducible() {
        let a = BehavioralProfile::from_seed(42);
        let b = BehavioralProfile::from_seed(42);
        assert_eq!(a.id, b.id);
        assert_eq!(a.mouse_speed_factor, b.mouse_speed_factor);
        assert_eq!(a.typing_wpm, b.typing_wpm);
        assert_eq!(a.error_rate, b.error_rate);
    }

    #[test]
    fn test_ranges() {
        for seed in 0..100 {
            let p = BehavioralProfile::from_seed(seed);
            assert!((0.7..=1.3).contains(&p.mouse_speed_factor));
            assert!((40.0..=75.0).contains(&p.typing_wpm));
            assert!((8.0..=12.0).contains(&p.tremor_frequency_hz));
            assert!(p.error_rate >= 0.0 && p.error_rate < 0.04);
        }
    }

    #[test]
    fn test_speed_multiplier() {
        let base = BehavioralProfile::from_seed(7);
        let fast = base.clone().with_speed_multiplier(1.5).unwrap();
        assert_eq!(fast.mouse_speed_factor, 1.5);
        assert!(
            (fast.typing_wpm - base.typing_wpm * 1.5 / base.mouse_speed_factor).abs() < 1e-9
        );
        assert!(base.clone().with_speed_multiplier(2.0).is_err());
        assert!(base.with_speed_multiplier(f64::NAN).is_err());
    }

    #[test]
    fn test_accuracy_maps_to_error_rate() {
        let p = BehavioralProfile::from_seed(1).with_accuracy(0.9).unwrap();
        assert!((p.error_rate - 0.04).abs() < 1e-12);
        assert!((p.accuracy() - 0.9).abs() < 1e-12);

        let perfect = BehavioralProfile::from_seed(1).with_accuracy(1.0).unwrap();
        assert_eq!(perfect.error_rate, 0.0);

        assert!(BehavioralProfile::from_seed(1).with_accuracy(0.5).is_err());
    }

    #[test]
    fn test_serializes_wpm_field_name() {
        let json = serde_json::to_value(BehavioralProfile::from_seed(3)).unwrap();
        assert!(json.get("typingWPM").is_some());
        assert!(json.get("mouseSpeedFactor").is_some());
    }
}
