//! Pointer path planning
//!
//! [`MouseMovementAI`] turns a start and end point into a timed list of
//! samples that looks like a human reach:
//!
//! 1. Duration from Fitts's Law, scaled by the profile's speed factor.
//! 2. A minimum-jerk trajectory sampled at a fixed cadence.
//! 3. Physiological tremor (8-12 Hz), faded out near both endpoints.
//! 4. Optional overshoot past the target followed by a corrective sub-path.
//! 5. Optional micro-corrections in the last stretch of the final segment.
//!
//! The first sample is always the start at t=0 and the last is always the
//! end point exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EvasionError, EvasionResult};
use crate::input::behavior::BehavioralProfile;
use crate::input::timing::{fitts_law_ms, jittered, uniform_ms};
use crate::input::trajectory::{minimum_jerk_point, Point};

/// Tunable constants for path generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseConfig {
    /// Fitts intercept in milliseconds
    pub fitts_a_ms: f64,
    /// Fitts slope in milliseconds per bit
    pub fitts_b_ms: f64,
    /// Target width used when the caller gives none
    pub default_target_width: f64,
    /// Simulated time between samples
    pub sample_interval_ms: u64,
    /// Relative per-path spread of the movement duration
    pub duration_jitter: f64,
    /// Upper bound for the primary reach and for the corrective sub-path
    pub max_duration_ms: u64,
    pub tremor_enabled: bool,
    /// Multiplier on the profile's tremor amplitude
    pub tremor_amplitude_scale: f64,
    pub tremor_min_hz: f64,
    pub tremor_max_hz: f64,
    /// Fraction of the path at each end over which tremor fades in/out
    pub tremor_edge_fraction: f64,
    pub overshoot_probability: f64,
    /// Shorter movements never overshoot
    pub min_overshoot_distance: f64,
    /// Overshoot length as a fraction of the distance
    pub overshoot_min_ratio: f64,
    pub overshoot_max_ratio: f64,
    pub micro_correction_probability: f64,
    pub max_micro_corrections: usize,
    pub micro_correction_amplitude_px: f64,
    /// Trailing fraction of the final segment that hosts micro-corrections
    pub micro_correction_window: f64,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            fitts_a_ms: 50.0,
            fitts_b_ms: 150.0,
            default_target_width: 20.0,
            sample_interval_ms: 12,
            duration_jitter: 0.1,
            max_duration_ms: 10_000,
            tremor_enabled: true,
            tremor_amplitude_scale: 1.0,
            tremor_min_hz: 8.0,
            tremor_max_hz: 12.0,
            tremor_edge_fraction: 0.15,
            overshoot_probability: 0.3,
            min_overshoot_distance: 50.0,
            overshoot_min_ratio: 0.03,
            overshoot_max_ratio: 0.08,
            micro_correction_probability: 0.6,
            max_micro_corrections: 3,
            micro_correction_amplitude_px: 1.5,
            micro_correction_window: 0.12,
        }
    }
}

/// Per-call options
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseOptions {
    /// Width of the element being targeted, in pixels
    pub target_width: Option<f64>,
}

/// One timed sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "tMillis")]
    pub t_ms: u64,
}

/// A planned pointer movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MousePath {
    pub points: Vec<PathPoint>,
    /// Pure Fitts time before jitter
    pub baseline_duration_ms: f64,
    /// Duration of the primary reach
    pub movement_duration_ms: u64,
    /// Primary reach plus any corrective sub-path
    pub total_duration_ms: u64,
    pub overshoot: bool,
    pub micro_corrections: usize,
}

impl MousePath {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PathPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PathPoint> {
        self.points.last()
    }
}

/// Straight minimum-jerk piece of a path
#[derive(Debug, Clone, Copy)]
struct Segment {
    from: Point,
    to: Point,
    start_ms: u64,
    duration_ms: u64,
}

/// Sinusoidal tremor on both axes with independent phases
#[derive(Debug, Clone, Copy)]
struct Tremor {
    frequency_hz: f64,
    amplitude: f64,
    phase_x: f64,
    phase_y: f64,
    edge: f64,
}

impl Tremor {
    fn offset(&self, t_ms: u64, total_ms: u64) -> Point {
        if self.amplitude <= 0.0 || total_ms == 0 {
            return Point::default();
        }
        let s = t_ms as f64 / total_ms as f64;
        let envelope = (s / self.edge).min((1.0 - s) / self.edge).clamp(0.0, 1.0);
        let omega_t = 2.0 * std::f64::consts::PI * self.frequency_hz * t_ms as f64 / 1000.0;

        Point::new(
            self.amplitude * envelope * (omega_t + self.phase_x).sin(),
            self.amplitude * envelope * (omega_t + self.phase_y).sin(),
        )
    }
}

/// Small bump perpendicular-ish to the motion that returns to zero
#[derive(Debug, Clone, Copy)]
struct MicroCorrection {
    /// Normalized segment time where the bump starts and ends
    start: f64,
    end: f64,
    direction: Point,
    amplitude: f64,
}

impl MicroCorrection {
    fn offset(&self, s: f64) -> Point {
        if s <= self.start || s >= self.end {
            return Point::default();
        }
        let u = (s - self.start) / (self.end - self.start);
        let bump = (std::f64::consts::PI * u).sin().powi(2);
        self.direction * (self.amplitude * bump)
    }
}

/// Plans human-like pointer paths
#[derive(Debug, Clone, Default)]
pub struct MouseMovementAI {
    config: MouseConfig,
}

impl MouseMovementAI {
    pub fn new(config: MouseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MouseConfig {
        &self.config
    }

    /// Deterministic Fitts's Law duration before any jitter.
    ///
    /// Divided by the profile's speed factor, so faster profiles move in
    /// less time. Never decreases as `distance` grows.
    pub fn baseline_duration_ms(
        &self,
        profile: &BehavioralProfile,
        distance: f64,
        target_width: f64,
    ) -> f64 {
        let speed = if profile.mouse_speed_factor > 0.0 {
            profile.mouse_speed_factor
        } else {
            1.0
        };
        fitts_law_ms(
            self.config.fitts_a_ms,
            self.config.fitts_b_ms,
            distance,
            target_width,
        ) / speed
    }

    /// Plan a path using a generator seeded with `seed`
    pub fn plan_seeded(
        &self,
        profile: &BehavioralProfile,
        start: Point,
        end: Point,
        options: &MouseOptions,
        seed: u64,
    ) -> EvasionResult<MousePath> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.plan(profile, start, end, options, &mut rng)
    }

    /// Plan a path from `start` to `end`.
    ///
    /// Fails with `InvalidInput` on non-finite coordinates, a non-positive
    /// target width or an unusable profile; nothing is returned in that case.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        profile: &BehavioralProfile,
        start: Point,
        end: Point,
        options: &MouseOptions,
        rng: &mut R,
    ) -> EvasionResult<MousePath> {
        if !start.is_finite() || !end.is_finite() {
            return Err(EvasionError::invalid(format!(
                "non-finite coordinates: start ({}, {}), end ({}, {})",
                start.x, start.y, end.x, end.y
            )));
        }
        let target_width = options
            .target_width
            .unwrap_or(self.config.default_target_width);
        if !target_width.is_finite() || target_width <= 0.0 {
            return Err(EvasionError::invalid(format!(
                "target width must be positive, got {}",
                target_width
            )));
        }
        if !profile.mouse_speed_factor.is_finite() || profile.mouse_speed_factor <= 0.0 {
            return Err(EvasionError::invalid(format!(
                "mouse speed factor must be positive, got {}",
                profile.mouse_speed_factor
            )));
        }

        let distance = start.distance_to(&end);
        if !distance.is_finite() {
            return Err(EvasionError::invalid(format!(
                "distance between ({}, {}) and ({}, {}) is not representable",
                start.x, start.y, end.x, end.y
            )));
        }
        if distance <= f64::EPSILON {
            return Ok(MousePath {
                points: vec![PathPoint {
                    x: end.x,
                    y: end.y,
                    t_ms: 0,
                }],
                baseline_duration_ms: 0.0,
                movement_duration_ms: 0,
                total_duration_ms: 0,
                overshoot: false,
                micro_corrections: 0,
            });
        }

        let interval = self.config.sample_interval_ms.max(1);
        let baseline = self.baseline_duration_ms(profile, distance, target_width);
        let movement_ms = self.sampled_duration_ms(rng, baseline, interval);

        let direction = (end - start).normalized();
        let mut segments = Vec::with_capacity(2);

        let wants_overshoot = distance >= self.config.min_overshoot_distance
            && rng.gen::<f64>() < self.config.overshoot_probability;
        let overshoot_target = if wants_overshoot {
            let ratio = uniform_ms(
                rng,
                self.config.overshoot_min_ratio,
                self.config.overshoot_max_ratio,
            );
            let lateral = rng.gen_range(-0.5f64..=0.5) * ratio * distance;
            let past = end + direction * (ratio * distance) + direction.perpendicular() * lateral;
            // Near the edge of the f64 range the overshoot point is not representable.
            past.is_finite().then_some(past)
        } else {
            None
        };
        let overshoot = overshoot_target.is_some();

        if let Some(past) = overshoot_target {
            let correction_distance = past.distance_to(&end);
            let correction_ms = self.sampled_duration_ms(
                rng,
                self.baseline_duration_ms(profile, correction_distance, target_width),
                interval,
            );

            segments.push(Segment {
                from: start,
                to: past,
                start_ms: 0,
                duration_ms: movement_ms,
            });
            segments.push(Segment {
                from: past,
                to: end,
                start_ms: movement_ms,
                duration_ms: correction_ms,
            });
        } else {
            segments.push(Segment {
                from: start,
                to: end,
                start_ms: 0,
                duration_ms: movement_ms,
            });
        }

        let total_ms = segments
            .last()
            .map(|s| s.start_ms.saturating_add(s.duration_ms))
            .unwrap_or(movement_ms);

        let tremor = self.tremor(profile, rng);
        let corrections = self.micro_corrections(direction, rng);

        let mut points = Vec::new();
        let last_index = segments.len() - 1;
        for (index, segment) in segments.iter().enumerate() {
            let first_offset = if index == 0 { 0 } else { interval };
            let mut local = first_offset;
            loop {
                let local_t = local.min(segment.duration_ms);
                let s = local_t as f64 / segment.duration_ms as f64;
                let t_ms = segment.start_ms.saturating_add(local_t);

                let mut point = minimum_jerk_point(segment.from, segment.to, s);
                point = point + tremor.offset(t_ms, total_ms);
                if index == last_index {
                    for correction in &corrections {
                        point = point + correction.offset(s);
                    }
                }
                points.push(PathPoint {
                    x: point.x,
                    y: point.y,
                    t_ms,
                });

                if local_t >= segment.duration_ms {
                    break;
                }
                local = local.saturating_add(interval);
            }
        }

        if let Some(first) = points.first_mut() {
            first.x = start.x;
            first.y = start.y;
            first.t_ms = 0;
        }
        if let Some(last) = points.last_mut() {
            last.x = end.x;
            last.y = end.y;
            last.t_ms = total_ms;
        }

        debug!(
            "Planned mouse path: {:.0}px in {}ms, {} samples, overshoot={}, corrections={}",
            distance,
            total_ms,
            points.len(),
            overshoot,
            corrections.len()
        );

        Ok(MousePath {
            points,
            baseline_duration_ms: baseline,
            movement_duration_ms: movement_ms,
            total_duration_ms: total_ms,
            overshoot,
            micro_corrections: corrections.len(),
        })
    }

    /// Jittered duration, at least one sample interval and at most the cap
    fn sampled_duration_ms<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        baseline: f64,
        interval: u64,
    ) -> u64 {
        let cap = self.config.max_duration_ms.max(interval);
        let jittered_ms = jittered(rng, baseline, self.config.duration_jitter).round();
        if jittered_ms.is_finite() {
            (jittered_ms as u64).clamp(interval, cap)
        } else {
            cap
        }
    }

    fn tremor<R: Rng + ?Sized>(&self, profile: &BehavioralProfile, rng: &mut R) -> Tremor {
        let (min_hz, max_hz) = (self.config.tremor_min_hz, self.config.tremor_max_hz);
        let frequency_hz = if profile.tremor_frequency_hz.is_finite() {
            profile.tremor_frequency_hz.clamp(min_hz, max_hz)
        } else {
            (min_hz + max_hz) / 2.0
        };
        let amplitude = if self.config.tremor_enabled {
            (profile.tremor_amplitude_px * self.config.tremor_amplitude_scale).max(0.0)
        } else {
            0.0
        };

        Tremor {
            frequency_hz,
            amplitude,
            phase_x: rng.gen_range(0.0..std::f64::consts::TAU),
            phase_y: rng.gen_range(0.0..std::f64::consts::TAU),
            edge: self.config.tremor_edge_fraction.max(1e-3),
        }
    }

    fn micro_corrections<R: Rng + ?Sized>(
        &self,
        direction: Point,
        rng: &mut R,
    ) -> Vec<MicroCorrection> {
        let max = self.config.max_micro_corrections;
        if max == 0 || rng.gen::<f64>() >= self.config.micro_correction_probability {
            return Vec::new();
        }

        let count = rng.gen_range(1..=max);
        let window = self.config.micro_correction_window.clamp(0.01, 0.5);
        let slot = window / count as f64;
        let window_start = 1.0 - window;

        (0..count)
            .map(|i| {
                let start = window_start + slot * i as f64;
                // Mostly sideways, with some along-track component.
                let angle: f64 = rng.gen_range(-0.6..=0.6);
                let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                let lateral = direction.perpendicular() * (side * angle.cos());
                let along = direction * angle.sin();
                MicroCorrection {
                    start,
                    end: start + slot,
                    direction: (lateral + along).normalized(),
                    amplitude: self.config.micro_correction_amplitude_px
                        * rng.gen_range(0.5f64..=1.0),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> BehavioralProfile {
        BehavioralProfile::from_seed(17)
    }

    fn quiet_config() -> MouseConfig {
        MouseConfig {
            overshoot_probability: 0.0,
            micro_correction_probability: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoints_exact() {
        let ai = MouseMovementAI::default();
        let start = Point::new(10.5, 20.25);
        let end = Point::new(812.0, 433.75);
        for seed in 0..50 {
            let path = ai
                .plan_seeded(&profile(), start, end, &MouseOptions::default(), seed)
                .unwrap();
            let first = path.first().unwrap();
            let last = path.last().unwrap();
            assert_eq!((first.x, first.y, first.t_ms), (start.x, start.y, 0));
            assert_eq!((last.x, last.y), (end.x, end.y));
            assert_eq!(last.t_ms, path.total_duration_ms);
        }
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let ai = MouseMovementAI::default();
        let path = ai
            .plan_seeded(
                &profile(),
                Point::new(0.0, 0.0),
                Point::new(600.0, 200.0),
                &MouseOptions::default(),
                5,
            )
            .unwrap();
        for pair in path.points.windows(2) {
            assert!(pair[1].t_ms > pair[0].t_ms);
            assert!(pair[1].t_ms - pair[0].t_ms <= ai.config().sample_interval_ms);
        }
    }

    #[test]
    fn test_same_point_single_sample() {
        let ai = MouseMovementAI::default();
        let p = Point::new(50.0, 50.0);
        let path = ai
            .plan_seeded(&profile(), p, p, &MouseOptions::default(), 1)
            .unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.points[0], PathPoint { x: 50.0, y: 50.0, t_ms: 0 });
        assert_eq!(path.total_duration_ms, 0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let ai = MouseMovementAI::default();
        let err = ai
            .plan_seeded(
                &profile(),
                Point::new(f64::NAN, 0.0),
                Point::new(1.0, 1.0),
                &MouseOptions::default(),
                1,
            )
            .unwrap_err();
        assert!(matches!(err, EvasionError::InvalidInput(_)));

        let err = ai
            .plan_seeded(
                &profile(),
                Point::new(0.0, 0.0),
                Point::new(f64::INFINITY, 1.0),
                &MouseOptions::default(),
                1,
            )
            .unwrap_err();
        assert!(matches!(err, EvasionError::InvalidInput(_)));
    }

    #[test]
    fn test_bad_target_width_rejected() {
        let ai = MouseMovementAI::default();
        let options = MouseOptions {
            target_width: Some(0.0),
        };
        assert!(ai
            .plan_seeded(&profile(), Point::new(0.0, 0.0), Point::new(5.0, 5.0), &options, 1)
            .is_err());
    }

    #[test]
    fn test_faster_profile_shorter_baseline() {
        let ai = MouseMovementAI::default();
        let slow = profile().with_speed_multiplier(0.5).unwrap();
        let fast = profile().with_speed_multiplier(1.5).unwrap();
        assert!(
            ai.baseline_duration_ms(&fast, 400.0, 20.0) < ai.baseline_duration_ms(&slow, 400.0, 20.0)
        );
    }

    #[test]
    fn test_overshoot_adds_correction() {
        let config = MouseConfig {
            overshoot_probability: 1.0,
            micro_correction_probability: 0.0,
            ..Default::default()
        };
        let ai = MouseMovementAI::new(config);
        let end = Point::new(500.0, 0.0);
        let path = ai
            .plan_seeded(&profile(), Point::new(0.0, 0.0), end, &MouseOptions::default(), 9)
            .unwrap();

        assert!(path.overshoot);
        assert!(path.total_duration_ms > path.movement_duration_ms);
        let max_x = path.points.iter().map(|p| p.x).fold(f64::MIN, f64::max);
        assert!(max_x > end.x);
        assert_eq!(path.last().unwrap().x, end.x);
    }

    #[test]
    fn test_huge_distance_is_capped() {
        let config = MouseConfig {
            overshoot_probability: 1.0,
            ..Default::default()
        };
        let ai = MouseMovementAI::new(config);
        let end = Point::new(1e200, 0.0);
        let path = ai
            .plan_seeded(&profile(), Point::new(0.0, 0.0), end, &MouseOptions::default(), 4)
            .unwrap();

        let cap = ai.config().max_duration_ms;
        assert!(path.overshoot);
        assert!(path.movement_duration_ms <= cap);
        assert!(path.total_duration_ms <= 2 * cap);
        assert!(path.len() as u64 <= 2 * (cap / ai.config().sample_interval_ms + 2));
        assert_eq!((path.last().unwrap().x, path.last().unwrap().y), (end.x, end.y));
    }

    #[test]
    fn test_unrepresentable_distance_rejected() {
        let ai = MouseMovementAI::default();
        let err = ai
            .plan_seeded(
                &profile(),
                Point::new(-1e308, 0.0),
                Point::new(1e308, 0.0),
                &MouseOptions::default(),
                1,
            )
            .unwrap_err();
        assert!(matches!(err, EvasionError::InvalidInput(_)));
    }

    #[test]
    fn test_short_moves_never_overshoot() {
        let config = MouseConfig {
            overshoot_probability: 1.0,
            ..Default::default()
        };
        let ai = MouseMovementAI::new(config);
        let path = ai
            .plan_seeded(
                &profile(),
                Point::new(0.0, 0.0),
                Point::new(20.0, 0.0),
                &MouseOptions::default(),
                3,
            )
            .unwrap();
        assert!(!path.overshoot);
    }

    #[test]
    fn test_micro_corrections_bounded() {
        let config = MouseConfig {
            micro_correction_probability: 1.0,
            ..quiet_config()
        };
        let ai = MouseMovementAI::new(config);
        for seed in 0..30 {
            let path = ai
                .plan_seeded(
                    &profile(),
                    Point::new(0.0, 0.0),
                    Point::new(300.0, 300.0),
                    &MouseOptions::default(),
                    seed,
                )
                .unwrap();
            assert!((1..=3).contains(&path.micro_corrections));
        }
    }

    #[test]
    fn test_quiet_path_stays_near_baseline() {
        let ai = MouseMovementAI::new(quiet_config());
        let start = Point::new(0.0, 0.0);
        let end = Point::new(400.0, 0.0);
        let p = profile();
        let path = ai
            .plan_seeded(&p, start, end, &MouseOptions::default(), 2)
            .unwrap();

        for point in &path.points {
            let s = point.t_ms as f64 / path.movement_duration_ms as f64;
            let base = minimum_jerk_point(start, end, s);
            assert!((point.y - base.y).abs() <= p.tremor_amplitude_px + 1e-9);
        }
    }

    #[test]
    fn test_micro_correction_bump_returns_to_zero() {
        let c = MicroCorrection {
            start: 0.9,
            end: 0.95,
            direction: Point::new(0.0, 1.0),
            amplitude: 2.0,
        };
        assert_eq!(c.offset(0.9), Point::default());
        assert_eq!(c.offset(0.95), Point::default());
        assert!((c.offset(0.925).y - 2.0).abs() < 1e-9);
    }
}
