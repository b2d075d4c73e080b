//! Human-like timing models
//!
//! Deterministic timing formulas plus the noise helpers used on top of them.
//!
//! # Background
//!
//! - Pointing time follows Fitts's Law: `MT = a + b * log2(D/W + 1)`
//!   (MacKenzie, 1992).
//! - Typing speed is quoted in words per minute with the usual convention of
//!   five characters per word, so 60 WPM is 200 ms per character.
//! - Long sessions slow down; fatigue is modelled as a linear multiplier on
//!   delays with an upper cap.
//!
//! Every stochastic helper takes the random source explicitly.

use rand::Rng;

/// Fitts's Law movement time in milliseconds.
///
/// `distance` below zero is treated as zero and `target_width` is floored at
/// one pixel, so the result is always at least `a_ms` and never decreases as
/// the distance grows.
pub fn fitts_law_ms(a_ms: f64, b_ms: f64, distance: f64, target_width: f64) -> f64 {
    let width = target_width.max(1.0);
    let dist = distance.max(0.0);

    // Index of Difficulty in bits
    let id = (dist / width + 1.0).log2();

    a_ms + b_ms * id
}

/// Average milliseconds per character for a typing speed
pub fn wpm_to_delay_ms(wpm: f64, chars_per_word: f64) -> f64 {
    if wpm <= 0.0 || chars_per_word <= 0.0 {
        return 200.0;
    }
    60_000.0 / (wpm * chars_per_word)
}

/// Delay multiplier after `elapsed_minutes` of activity: `1 + rate * t`,
/// capped at `max_multiplier`.
pub fn fatigue_multiplier(fatigue_rate: f64, elapsed_minutes: f64, max_multiplier: f64) -> f64 {
    let raw = 1.0 + fatigue_rate.max(0.0) * elapsed_minutes.max(0.0);
    raw.min(max_multiplier.max(1.0))
}

/// Normally distributed sample (Box-Muller transform)
pub fn normal_random<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // Avoid log(0)
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen();

    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();

    mean + z * std_dev
}

/// Scale `base` by a normal factor with relative spread `variance`.
///
/// The factor is clamped to `[1 - 2v, 1 + 2v]` and never below 0.1, so the
/// result stays positive for positive `base`.
pub fn jittered<R: Rng + ?Sized>(rng: &mut R, base: f64, variance: f64) -> f64 {
    if variance <= 0.0 {
        return base;
    }
    let factor = normal_random(rng, 1.0, variance / 2.0)
        .clamp(1.0 - 2.0 * variance, 1.0 + 2.0 * variance)
        .max(0.1);
    base * factor
}

/// Uniform sample in `[min, max]`; returns `min` for an empty range
pub fn uniform_ms<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    rng.gen_range(min..=max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fitts_law_monotonic_in_distance() {
        let mut previous = 0.0;
        for d in (0..2000).step_by(25) {
            let t = fitts_law_ms(50.0, 150.0, d as f64, 20.0);
            assert!(t >= previous);
            previous = t;
        }
    }

    #[test]
    fn test_fitts_law_values() {
        assert_eq!(fitts_law_ms(50.0, 150.0, 0.0, 20.0), 50.0);
        // D/W = 3 => ID = 2 bits
        assert!((fitts_law_ms(50.0, 150.0, 60.0, 20.0) - 350.0).abs() < 1e-9);
        // Smaller targets take longer
        assert!(fitts_law_ms(50.0, 150.0, 500.0, 5.0) > fitts_law_ms(50.0, 150.0, 500.0, 50.0));
    }

    #[test]
    fn test_wpm_to_delay() {
        assert!((wpm_to_delay_ms(60.0, 5.0) - 200.0).abs() < 1e-9);
        assert!((wpm_to_delay_ms(120.0, 5.0) - 100.0).abs() < 1e-9);
        assert_eq!(wpm_to_delay_ms(0.0, 5.0), 200.0);
    }

    #[test]
    fn test_fatigue_multiplier_capped() {
        assert_eq!(fatigue_multiplier(0.01, 0.0, 1.5), 1.0);
        assert!((fatigue_multiplier(0.01, 10.0, 1.5) - 1.1).abs() < 1e-9);
        assert_eq!(fatigue_multiplier(0.01, 1000.0, 1.5), 1.5);
    }

    #[test]
    fn test_normal_random_distribution() {
        let mut rng = StdRng::seed_from_u64(12);
        let n = 10_000;
        let samples: Vec<f64> = (0..n).map(|_| normal_random(&mut rng, 100.0, 10.0)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        assert!((mean - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_jittered_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let v = jittered(&mut rng, 100.0, 0.2);
            assert!((60.0..=140.0).contains(&v));
        }
        assert_eq!(jittered(&mut rng, 100.0, 0.0), 100.0);
    }

    #[test]
    fn test_uniform_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            let v = uniform_ms(&mut rng, 0.05, 0.15);
            assert!((0.05..=0.15).contains(&v));
        }
        assert_eq!(uniform_ms(&mut rng, 30.0, 30.0), 30.0);
        assert_eq!(uniform_ms(&mut rng, 40.0, 10.0), 40.0);
    }
}
