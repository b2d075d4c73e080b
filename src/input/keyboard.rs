//! Keystroke timing plans
//!
//! [`TypingAI`] turns a text into a timed list of key events. Delays start
//! from the profile's WPM and are shaped by:
//!
//! - per-character difficulty (home-row letters fast, symbols slow),
//! - common digraphs, which are typed faster,
//! - hand alternation, which is faster than same-hand sequences,
//! - fatigue over the session, capped at a maximum slowdown.
//!
//! With the profile's error rate a character is first mistyped (usually as
//! a neighbouring QWERTY key), followed by a pause, a backspace and the
//! correct key.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EvasionError, EvasionResult};
use crate::input::behavior::BehavioralProfile;
use crate::input::timing::{fatigue_multiplier, jittered, uniform_ms, wpm_to_delay_ms};

// ============================================================================
// Static tables
// ============================================================================

/// Frequent English letter pairs
const COMMON_DIGRAPHS: [&str; 30] = [
    "th", "he", "in", "er", "an", "re", "on", "at", "en", "nd", "ti", "es", "or", "te", "of",
    "ed", "is", "it", "al", "ar", "st", "to", "nt", "ng", "se", "ha", "as", "ou", "io", "le",
];

static DIGRAPHS: Lazy<HashSet<(char, char)>> = Lazy::new(|| {
    COMMON_DIGRAPHS
        .iter()
        .filter_map(|pair| {
            let mut chars = pair.chars();
            Some((chars.next()?, chars.next()?))
        })
        .collect()
});

/// Hand that types a key in touch typing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

const LEFT_HAND_KEYS: &str = "`12345qwertasdfgzxcvb~!@#$%";
const RIGHT_HAND_KEYS: &str = "67890-=yuiop[]\\hjkl;'nm,./^&*()_+{}|:\"<>?";

static HANDS: Lazy<HashMap<char, Hand>> = Lazy::new(|| {
    let left = LEFT_HAND_KEYS.chars().map(|c| (c, Hand::Left));
    let right = RIGHT_HAND_KEYS.chars().map(|c| (c, Hand::Right));
    left.chain(right).collect()
});

/// QWERTY rows with their horizontal stagger in key widths
const KEY_ROWS: [(&str, f64); 4] = [
    ("1234567890", 0.0),
    ("qwertyuiop", 0.5),
    ("asdfghjkl", 0.75),
    ("zxcvbnm", 1.25),
];

/// Physically adjacent keys, same class only (letters to letters, digits to
/// digits)
static ADJACENT_KEYS: Lazy<HashMap<char, Vec<char>>> = Lazy::new(|| {
    let positions: Vec<(char, usize, f64)> = KEY_ROWS
        .iter()
        .enumerate()
        .flat_map(|(row, (keys, offset))| {
            keys.chars()
                .enumerate()
                .map(move |(i, c)| (c, row, offset + i as f64))
        })
        .collect();

    positions
        .iter()
        .map(|&(c, row, x)| {
            let neighbours = positions
                .iter()
                .filter(|&&(other, other_row, other_x)| {
                    other != c
                        && other.is_ascii_digit() == c.is_ascii_digit()
                        && ((other_row == row && (other_x - x).abs() <= 1.0)
                            || (other_row.abs_diff(row) == 1 && (other_x - x).abs() < 1.0))
                })
                .map(|&(other, _, _)| other)
                .collect();
            (c, neighbours)
        })
        .collect()
});

pub fn is_common_digraph(first: char, second: char) -> bool {
    DIGRAPHS.contains(&(first.to_ascii_lowercase(), second.to_ascii_lowercase()))
}

pub fn hand_for(c: char) -> Option<Hand> {
    HANDS.get(&c.to_ascii_lowercase()).copied()
}

/// Whether typing `second` after `first` switches hands
pub fn hands_alternate(first: char, second: char) -> bool {
    matches!((hand_for(first), hand_for(second)), (Some(a), Some(b)) if a != b)
}

/// Keys adjacent to `c` on a QWERTY layout (lowercase); empty if unknown
pub fn adjacent_keys(c: char) -> &'static [char] {
    ADJACENT_KEYS
        .get(&c.to_ascii_lowercase())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Relative effort of reaching a key
fn char_difficulty(c: char) -> f64 {
    match c {
        // Common letters - fastest
        'e' | 't' | 'a' | 'o' | 'i' | 'n' | 's' | 'h' | 'r' => 0.8,
        'l' | 'd' | 'c' | 'u' | 'm' | 'w' | 'f' | 'g' | 'y' | 'p' | 'b' => 1.0,
        // Rare letters
        'v' | 'k' | 'j' | 'x' | 'q' | 'z' => 1.2,
        '0'..='9' => 1.1,
        // Thumb key
        ' ' => 0.7,
        '.' | ',' => 1.0,
        '!' | '?' | ':' | ';' => 1.3,
        '@' | '#' | '$' | '%' | '^' | '&' | '*' => 1.5,
        // Shift
        _ if c.is_uppercase() => 1.2,
        _ => 1.0,
    }
}

// ============================================================================
// Plan types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Down,
    Up,
    Backspace,
}

/// One timed key event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Character typed, or `"Backspace"`
    #[serde(rename = "char")]
    pub key: String,
    pub action: KeyAction,
    #[serde(rename = "tMillis")]
    pub t_ms: u64,
}

impl KeyEvent {
    fn new(key: impl Into<String>, action: KeyAction, t_ms: f64) -> Self {
        Self {
            key: key.into(),
            action,
            t_ms: t_ms.max(0.0).round() as u64,
        }
    }
}

/// Timed keystrokes for a text, in chronological order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPlan {
    pub events: Vec<KeyEvent>,
    pub total_duration_ms: u64,
    /// Characters that were mistyped and corrected
    pub typo_count: usize,
    /// Characters of the input text
    pub char_count: usize,
}

impl TypingPlan {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Text the plan leaves in the field after corrections
    pub fn typed_text(&self) -> String {
        let mut text = String::new();
        for event in &self.events {
            match event.action {
                KeyAction::Down => text.push_str(&event.key),
                KeyAction::Backspace => {
                    text.pop();
                }
                KeyAction::Up => {}
            }
        }
        text
    }
}

/// Per-call options
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingOptions {
    /// Session time already spent, feeds the fatigue model
    pub elapsed_session_minutes: f64,
}

/// Tunable constants for typing plans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    pub chars_per_word: f64,
    /// Delay multiplier for a common digraph
    pub digraph_speedup: f64,
    /// Delay multiplier when the pair switches hands
    pub hand_alternation_speedup: f64,
    pub max_fatigue_multiplier: f64,
    /// Relative spread of each inter-key delay
    pub delay_variance: f64,
    pub key_hold_min_ms: f64,
    pub key_hold_max_ms: f64,
    /// Pause between a typo and its backspace
    pub typo_pause_min_ms: f64,
    pub typo_pause_max_ms: f64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            chars_per_word: 5.0,
            digraph_speedup: 0.75,
            hand_alternation_speedup: 0.85,
            max_fatigue_multiplier: 1.5,
            delay_variance: 0.2,
            key_hold_min_ms: 50.0,
            key_hold_max_ms: 110.0,
            typo_pause_min_ms: 150.0,
            typo_pause_max_ms: 400.0,
        }
    }
}

// ============================================================================
// TypingAI
// ============================================================================

/// Plans human-like keystroke sequences
#[derive(Debug, Clone, Default)]
pub struct TypingAI {
    config: TypingConfig,
}

impl TypingAI {
    pub fn new(config: TypingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TypingConfig {
        &self.config
    }

    /// Deterministic delay before typing `current` after `previous`
    pub fn expected_delay_ms(
        &self,
        profile: &BehavioralProfile,
        previous: Option<char>,
        current: char,
        elapsed_minutes: f64,
    ) -> f64 {
        let base = wpm_to_delay_ms(profile.typing_wpm, self.config.chars_per_word);

        let mut multiplier = if current.is_control() {
            1.0
        } else {
            char_difficulty(current)
        };
        if let Some(previous) = previous {
            if is_common_digraph(previous, current) {
                multiplier *= self.config.digraph_speedup;
            }
            if hands_alternate(previous, current) {
                multiplier *= self.config.hand_alternation_speedup;
            }
        }

        multiplier *= fatigue_multiplier(
            profile.fatigue_rate,
            elapsed_minutes,
            self.config.max_fatigue_multiplier,
        );

        base * multiplier
    }

    /// Plan with a generator seeded from the profile seed
    pub fn plan_seeded(
        &self,
        profile: &BehavioralProfile,
        text: &str,
        options: &TypingOptions,
    ) -> EvasionResult<TypingPlan> {
        let mut rng = StdRng::seed_from_u64(profile.seed);
        self.plan(profile, text, options, &mut rng)
    }

    /// Plan keystrokes for `text`.
    ///
    /// An empty text gives an empty plan. Invalid options or profile values
    /// fail with `InvalidInput` and no plan.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        profile: &BehavioralProfile,
        text: &str,
        options: &TypingOptions,
        rng: &mut R,
    ) -> EvasionResult<TypingPlan> {
        let elapsed = options.elapsed_session_minutes;
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(EvasionError::invalid(format!(
                "elapsed session minutes must be non-negative, got {}",
                elapsed
            )));
        }
        if !profile.typing_wpm.is_finite() || profile.typing_wpm <= 0.0 {
            return Err(EvasionError::invalid(format!(
                "typing speed must be positive, got {}",
                profile.typing_wpm
            )));
        }
        if !profile.error_rate.is_finite() || !(0.0..=1.0).contains(&profile.error_rate) {
            return Err(EvasionError::invalid(format!(
                "error rate must be within 0..=1, got {}",
                profile.error_rate
            )));
        }

        if text.is_empty() {
            return Ok(TypingPlan::default());
        }

        let base = wpm_to_delay_ms(profile.typing_wpm, self.config.chars_per_word);
        let mut events = Vec::with_capacity(text.len() * 2);
        let mut typo_count = 0;
        let mut char_count = 0;
        let mut t = 0.0_f64;
        let mut previous: Option<char> = None;

        for c in text.chars() {
            char_count += 1;
            let minutes = elapsed + t / 60_000.0;

            if previous.is_some() {
                let delay = self.expected_delay_ms(profile, previous, c, minutes);
                t += jittered(rng, delay, self.config.delay_variance);
            }

            if !c.is_control() && rng.gen::<f64>() < profile.error_rate {
                let wrong = typo_for(c, rng);
                self.press(&mut events, &wrong.to_string(), t, rng);

                t += uniform_ms(rng, self.config.typo_pause_min_ms, self.config.typo_pause_max_ms);
                events.push(KeyEvent::new("Backspace", KeyAction::Backspace, t));

                let fatigue = fatigue_multiplier(
                    profile.fatigue_rate,
                    elapsed + t / 60_000.0,
                    self.config.max_fatigue_multiplier,
                );
                t += jittered(rng, base * fatigue, self.config.delay_variance);
                typo_count += 1;
            }

            self.press(&mut events, &c.to_string(), t, rng);
            previous = Some(c);
        }

        // Stable: a key's down stays ahead of its own up at equal times.
        events.sort_by_key(|e| e.t_ms);
        let total_duration_ms = events.last().map(|e| e.t_ms).unwrap_or(0);

        debug!(
            "Planned {} key events for {} chars ({} typos) over {}ms",
            events.len(),
            char_count,
            typo_count,
            total_duration_ms
        );

        Ok(TypingPlan {
            events,
            total_duration_ms,
            typo_count,
            char_count,
        })
    }

    fn press<R: Rng + ?Sized>(&self, events: &mut Vec<KeyEvent>, key: &str, t: f64, rng: &mut R) {
        let hold = uniform_ms(rng, self.config.key_hold_min_ms, self.config.key_hold_max_ms);
        events.push(KeyEvent::new(key, KeyAction::Down, t));
        events.push(KeyEvent::new(key, KeyAction::Up, t + hold));
    }
}

/// Wrong character for a typo: a random neighbouring key with the same case,
/// or the same character again (double strike) when it has no neighbours.
fn typo_for<R: Rng + ?Sized>(c: char, rng: &mut R) -> char {
    let neighbours = adjacent_keys(c);
    if neighbours.is_empty() {
        return c;
    }
    let wrong = neighbours[rng.gen_range(0..neighbours.len())];
    if c.is_uppercase() {
        wrong.to_ascii_uppercase()
    } else {
        wrong
    }
}
