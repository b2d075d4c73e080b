//! Integration tests for the input simulation module
//!
//! Tests for mouse path generation (endpoints, Fitts's Law timing, tremor),
//! typing plans (determinism, typo rate, digraph timing, fatigue) and
//! behavioral profile overrides.

use ki_browser_evasion::input::trajectory::minimum_jerk_point;
use ki_browser_evasion::input::{
    BehavioralProfile, KeyAction, MouseConfig, MouseMovementAI, MouseOptions, Point, TypingAI,
    TypingOptions,
};
use ki_browser_evasion::EvasionError;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn quiet_mouse() -> MouseMovementAI {
    MouseMovementAI::new(MouseConfig {
        overshoot_probability: 0.0,
        micro_correction_probability: 0.0,
        ..Default::default()
    })
}

// ============================================================================
// Mouse Path Tests
// ============================================================================

#[test]
fn test_endpoint_fidelity() {
    let ai = MouseMovementAI::default();
    let cases = [
        (Point::new(0.0, 0.0), Point::new(800.0, 600.0)),
        (Point::new(1920.0, 1080.0), Point::new(3.5, 7.25)),
        (Point::new(-50.0, 20.0), Point::new(-49.0, 21.0)),
        (Point::new(100.0, 100.0), Point::new(100.0, 900.0)),
    ];

    for seed in 0..40u64 {
        let profile = BehavioralProfile::from_seed(seed);
        for (start, end) in cases {
            let path = ai
                .plan_seeded(&profile, start, end, &MouseOptions::default(), seed)
                .unwrap();
            let first = path.first().unwrap();
            let last = path.last().unwrap();

            assert_eq!((first.x, first.y, first.t_ms), (start.x, start.y, 0));
            assert_eq!((last.x, last.y), (end.x, end.y));
            assert_eq!(last.t_ms, path.total_duration_ms);
            assert!(path.points.windows(2).all(|w| w[0].t_ms < w[1].t_ms));
        }
    }
}

#[test]
fn test_zero_distance_single_sample() {
    let profile = BehavioralProfile::from_seed(1);
    let p = Point::new(42.0, 42.0);
    let path = MouseMovementAI::default()
        .plan_seeded(&profile, p, p, &MouseOptions::default(), 1)
        .unwrap();

    assert_eq!(path.len(), 1);
    assert_eq!(path.total_duration_ms, 0);
    assert_eq!(path.points[0].t_ms, 0);
}

#[test]
fn test_non_finite_coordinates_rejected() {
    let profile = BehavioralProfile::from_seed(1);
    let ai = MouseMovementAI::default();
    for (start, end) in [
        (Point::new(f64::NAN, 0.0), Point::new(1.0, 1.0)),
        (Point::new(0.0, 0.0), Point::new(f64::INFINITY, 1.0)),
    ] {
        assert!(matches!(
            ai.plan_seeded(&profile, start, end, &MouseOptions::default(), 1),
            Err(EvasionError::InvalidInput(_))
        ));
    }

    let bad_width = MouseOptions {
        target_width: Some(0.0),
    };
    assert!(matches!(
        ai.plan_seeded(&profile, Point::new(0.0, 0.0), Point::new(5.0, 5.0), &bad_width, 1),
        Err(EvasionError::InvalidInput(_))
    ));
}

#[test]
fn test_huge_finite_coordinates() {
    let ai = MouseMovementAI::new(MouseConfig {
        overshoot_probability: 1.0,
        ..Default::default()
    });
    let cap = ai.config().max_duration_ms;

    for seed in 0..10u64 {
        let profile = BehavioralProfile::from_seed(seed);
        let start = Point::new(0.0, 0.0);
        let end = Point::new(1e200, 0.0);
        let path = ai
            .plan_seeded(&profile, start, end, &MouseOptions::default(), seed)
            .unwrap();

        assert!(path.total_duration_ms <= 2 * cap);
        assert!(path.points.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert_eq!(path.last().unwrap().x, end.x);
    }

    let near_max = ai.plan_seeded(
        &BehavioralProfile::from_seed(1),
        Point::new(0.0, 0.0),
        Point::new(f64::MAX, 0.0),
        &MouseOptions::default(),
        1,
    );
    let path = near_max.unwrap();
    assert!(!path.overshoot);
    assert_eq!(path.last().unwrap().x, f64::MAX);

    assert!(matches!(
        ai.plan_seeded(
            &BehavioralProfile::from_seed(1),
            Point::new(f64::MIN, 0.0),
            Point::new(f64::MAX, 0.0),
            &MouseOptions::default(),
            1,
        ),
        Err(EvasionError::InvalidInput(_))
    ));
}

#[test]
fn test_fitts_monotonic_in_distance() {
    let ai = MouseMovementAI::default();
    let profile = BehavioralProfile::from_seed(4);

    for width in [5.0, 20.0, 80.0] {
        let mut last = 0.0;
        for step in 0..200 {
            let distance = step as f64 * 15.0;
            let t = ai.baseline_duration_ms(&profile, distance, width);
            assert!(t >= last, "width {} distance {}", width, distance);
            last = t;
        }
    }
}

#[test]
fn test_bigger_targets_are_faster() {
    let ai = MouseMovementAI::default();
    let profile = BehavioralProfile::from_seed(4);
    assert!(
        ai.baseline_duration_ms(&profile, 600.0, 80.0)
            < ai.baseline_duration_ms(&profile, 600.0, 8.0)
    );
}

#[test]
fn test_faster_profile_moves_quicker() {
    let ai = MouseMovementAI::default();
    let slow = BehavioralProfile::from_seed(1)
        .with_speed_multiplier(0.5)
        .unwrap();
    let fast = BehavioralProfile::from_seed(1)
        .with_speed_multiplier(1.5)
        .unwrap();

    assert!(
        ai.baseline_duration_ms(&fast, 500.0, 20.0) < ai.baseline_duration_ms(&slow, 500.0, 20.0)
    );
}

#[test]
fn test_tremor_frequency_in_physiological_band() {
    let ai = MouseMovementAI::new(MouseConfig {
        overshoot_probability: 0.0,
        micro_correction_probability: 0.0,
        duration_jitter: 0.0,
        fitts_b_ms: 600.0,
        ..Default::default()
    });
    let start = Point::new(0.0, 0.0);
    let end = Point::new(2000.0, 0.0);

    for seed in 0..10u64 {
        let profile = BehavioralProfile::from_seed(seed);
        let path = ai
            .plan_seeded(&profile, start, end, &MouseOptions::default(), seed)
            .unwrap();
        let movement = path.movement_duration_ms as f64;

        // Mid-section only: the tremor envelope fades in and out at the ends.
        let residuals: Vec<f64> = path
            .points
            .iter()
            .filter(|p| {
                let s = p.t_ms as f64 / movement;
                (0.2..=0.8).contains(&s)
            })
            .map(|p| p.x - minimum_jerk_point(start, end, p.t_ms as f64 / movement).x)
            .collect();

        let crossings = residuals
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count();
        let window_s = 0.6 * movement / 1000.0;
        let frequency = crossings as f64 / (2.0 * window_s);

        assert!(
            (7.0..=13.0).contains(&frequency),
            "seed {}: estimated {:.2}Hz",
            seed,
            frequency
        );
        assert!(
            (frequency - profile.tremor_frequency_hz).abs() < 1.0,
            "seed {}: estimated {:.2}Hz, profile {:.2}Hz",
            seed,
            frequency,
            profile.tremor_frequency_hz
        );
    }
}

#[test]
fn test_tremor_stays_small() {
    let ai = quiet_mouse();
    let start = Point::new(0.0, 0.0);
    let end = Point::new(900.0, 0.0);

    for seed in 0..20u64 {
        let profile = BehavioralProfile::from_seed(seed);
        let path = ai
            .plan_seeded(&profile, start, end, &MouseOptions::default(), seed)
            .unwrap();
        assert!(path.points.iter().all(|p| p.y.abs() <= 2.0));
    }
}

#[test]
fn test_overshoot_extends_duration() {
    let ai = MouseMovementAI::new(MouseConfig {
        overshoot_probability: 1.0,
        ..Default::default()
    });
    let profile = BehavioralProfile::from_seed(2);
    let start = Point::new(0.0, 0.0);
    let end = Point::new(700.0, 0.0);

    let path = ai
        .plan_seeded(&profile, start, end, &MouseOptions::default(), 9)
        .unwrap();

    assert!(path.overshoot);
    assert!(path.total_duration_ms > path.movement_duration_ms);
    assert!(path.points.iter().any(|p| p.x > end.x + 5.0));
    assert_eq!(path.last().unwrap().x, end.x);
}

#[test]
fn test_same_seed_same_path() {
    let ai = MouseMovementAI::default();
    let profile = BehavioralProfile::from_seed(21);
    let start = Point::new(10.0, 20.0);
    let end = Point::new(640.0, 480.0);

    let a = ai
        .plan_seeded(&profile, start, end, &MouseOptions::default(), 5)
        .unwrap();
    let b = ai
        .plan_seeded(&profile, start, end, &MouseOptions::default(), 5)
        .unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// Typing Plan Tests
// ============================================================================

#[test]
fn test_typing_deterministic_without_errors() {
    let ai = TypingAI::default();
    let profile = BehavioralProfile::from_seed(77).with_error_rate(0.0).unwrap();
    let text = "The quick brown fox jumps over the lazy dog.";

    let a = ai.plan_seeded(&profile, text, &TypingOptions::default()).unwrap();
    let b = ai.plan_seeded(&profile, text, &TypingOptions::default()).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.typo_count, 0);
    assert_eq!(a.events.len(), text.chars().count() * 2);
    assert_eq!(a.typed_text(), text);
}

#[test]
fn test_events_are_chronological() {
    let ai = TypingAI::default();
    let profile = BehavioralProfile::from_seed(3).with_error_rate(0.2).unwrap();
    let plan = ai
        .plan_seeded(&profile, "chronological order matters", &TypingOptions::default())
        .unwrap();

    assert!(plan.events.windows(2).all(|w| w[0].t_ms <= w[1].t_ms));
    assert_eq!(plan.total_duration_ms, plan.events.last().unwrap().t_ms);
    assert_eq!(plan.typed_text(), "chronological order matters");
}

#[test]
fn test_typo_rate_converges() {
    let ai = TypingAI::default();
    let p = 0.05;
    let profile = BehavioralProfile::from_seed(5).with_error_rate(p).unwrap();
    let text = "the rain in spain stays mainly in the plain ".repeat(50);
    let mut rng = StdRng::seed_from_u64(2024);

    let mut typos = 0;
    let mut backspaces = 0;
    let mut chars = 0;
    for _ in 0..5 {
        let plan = ai
            .plan(&profile, &text, &TypingOptions::default(), &mut rng)
            .unwrap();
        typos += plan.typo_count;
        backspaces += plan
            .events
            .iter()
            .filter(|e| e.action == KeyAction::Backspace)
            .count();
        chars += plan.char_count;
        assert_eq!(plan.typed_text(), text);
    }

    assert_eq!(typos, backspaces);
    let observed = typos as f64 / chars as f64;
    assert!((observed - p).abs() < 0.015, "observed {}", observed);
}

#[test]
fn test_typo_costs_time_and_events() {
    let ai = TypingAI::default();
    let clean = BehavioralProfile::from_seed(9).with_error_rate(0.0).unwrap();
    let sloppy = clean.clone().with_error_rate(1.0).unwrap();
    let text = "keyboard";

    let a = ai.plan_seeded(&clean, text, &TypingOptions::default()).unwrap();
    let b = ai.plan_seeded(&sloppy, text, &TypingOptions::default()).unwrap();

    assert_eq!(b.typo_count, text.len());
    assert_eq!(b.events.len(), text.len() * 5);
    assert!(b.total_duration_ms > a.total_duration_ms);
}

#[test]
fn test_common_digraph_is_faster() {
    let ai = TypingAI::default();
    let profile = BehavioralProfile::from_seed(1);

    for (fast, slow) in [(('t', 'h'), ('d', 'h')), (('e', 'r'), ('e', 'w'))] {
        let fast_delay = ai.expected_delay_ms(&profile, Some(fast.0), fast.1, 0.0);
        let slow_delay = ai.expected_delay_ms(&profile, Some(slow.0), slow.1, 0.0);
        assert!(
            fast_delay < slow_delay,
            "{:?} ({}) vs {:?} ({})",
            fast,
            fast_delay,
            slow,
            slow_delay
        );
    }
}

#[test]
fn test_fatigue_slows_and_caps() {
    let ai = TypingAI::default();
    let profile = BehavioralProfile::from_seed(1).with_fatigue_rate(0.01).unwrap();

    let fresh = ai.expected_delay_ms(&profile, Some('a'), 'b', 0.0);
    let tired = ai.expected_delay_ms(&profile, Some('a'), 'b', 30.0);
    let exhausted = ai.expected_delay_ms(&profile, Some('a'), 'b', 10_000.0);

    assert!(tired > fresh);
    assert!((exhausted / fresh - ai.config().max_fatigue_multiplier).abs() < 1e-9);
}

#[test]
fn test_non_printable_passes_through() {
    let ai = TypingAI::default();
    let profile = BehavioralProfile::from_seed(6).with_error_rate(1.0).unwrap();
    let plan = ai
        .plan_seeded(&profile, "\n", &TypingOptions::default())
        .unwrap();

    assert_eq!(plan.typo_count, 0);
    assert_eq!(plan.typed_text(), "\n");
}

#[test]
fn test_invalid_elapsed_minutes() {
    let ai = TypingAI::default();
    let profile = BehavioralProfile::from_seed(6);
    let options = TypingOptions {
        elapsed_session_minutes: -1.0,
    };
    assert!(matches!(
        ai.plan_seeded(&profile, "abc", &options),
        Err(EvasionError::InvalidInput(_))
    ));
}
