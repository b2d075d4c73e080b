//! Evasion engine settings and configuration management.
//!
//! Settings come from several sources, applied in this order:
//! defaults, a configuration file (TOML or JSON), `KI_EVASION_*`
//! environment variables, then command line arguments.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

use crate::detection::HoneypotConfig;
use crate::input::{MouseConfig, TypingConfig};
use crate::throttle::RateLimitConfig;

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML configuration.
    #[error("Failed to serialize TOML configuration: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Failed to parse JSON configuration.
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Unsupported file format.
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// Complete engine configuration.
///
/// Every section falls back to its defaults, so a file only needs the
/// values it changes:
///
/// ```toml
/// seed = 42
///
/// [mouse]
/// overshoot_probability = 0.2
///
/// [rate_limit]
/// max_delay_ms = 120000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvasionSettings {
    /// Seed for every random source; fresh entropy when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Mouse path generation.
    #[serde(default)]
    pub mouse: MouseConfig,

    /// Keystroke planning.
    #[serde(default)]
    pub typing: TypingConfig,

    /// Honeypot field heuristics.
    #[serde(default)]
    pub honeypot: HoneypotConfig,

    /// Per-domain backoff.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl EvasionSettings {
    /// Creates settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a configuration file.
    ///
    /// Supports both TOML and JSON formats, detected by file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use ki_browser_evasion::config::EvasionSettings;
    ///
    /// let settings = EvasionSettings::from_file("evasion.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let settings = match file_extension(path).as_str() {
            "toml" => toml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            ext => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };

        info!("Loaded configuration from {}", path.display());
        Ok(settings)
    }

    /// Saves settings to a configuration file.
    ///
    /// The format is determined by the file extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        let content = match file_extension(path).as_str() {
            "toml" => toml::to_string_pretty(self)?,
            "json" => serde_json::to_string_pretty(self)?,
            ext => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };

        fs::write(path, content)?;
        Ok(())
    }

    /// Loads settings from environment variables.
    ///
    /// Recognised variables:
    /// - `KI_EVASION_SEED`
    /// - `KI_EVASION_TARGET_WIDTH`
    /// - `KI_EVASION_OVERSHOOT_PROBABILITY`
    /// - `KI_EVASION_SAMPLE_INTERVAL_MS`
    /// - `KI_EVASION_MAX_FATIGUE_MULTIPLIER`
    /// - `KI_EVASION_HONEYPOT_THRESHOLD`
    /// - `KI_EVASION_RATE_BASE_DELAY_MS`
    /// - `KI_EVASION_RATE_MAX_DELAY_MS`
    /// - `KI_EVASION_RATE_FLOOR_DELAY_MS`
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env_overrides();
        settings
    }

    /// Applies environment variable overrides to current settings.
    fn apply_env_overrides(&mut self) {
        if let Some(seed) = env_value("KI_EVASION_SEED") {
            self.seed = Some(seed);
        }
        if let Some(width) = env_value("KI_EVASION_TARGET_WIDTH") {
            self.mouse.default_target_width = width;
        }
        if let Some(probability) = env_value("KI_EVASION_OVERSHOOT_PROBABILITY") {
            self.mouse.overshoot_probability = probability;
        }
        if let Some(interval) = env_value("KI_EVASION_SAMPLE_INTERVAL_MS") {
            self.mouse.sample_interval_ms = interval;
        }
        if let Some(cap) = env_value("KI_EVASION_MAX_FATIGUE_MULTIPLIER") {
            self.typing.max_fatigue_multiplier = cap;
        }
        if let Some(threshold) = env_value("KI_EVASION_HONEYPOT_THRESHOLD") {
            self.honeypot.threshold = threshold;
        }
        if let Some(base) = env_value("KI_EVASION_RATE_BASE_DELAY_MS") {
            self.rate_limit.base_delay_ms = base;
        }
        if let Some(max) = env_value("KI_EVASION_RATE_MAX_DELAY_MS") {
            self.rate_limit.max_delay_ms = max;
        }
        if let Some(floor) = env_value("KI_EVASION_RATE_FLOOR_DELAY_MS") {
            self.rate_limit.floor_delay_ms = floor;
        }
    }

    /// Merges current settings with environment variable overrides.
    pub fn merge_with_env(mut self) -> Self {
        self.apply_env_overrides();
        self
    }

    /// Merges settings with CLI arguments.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ki_browser_evasion::config::{CliArgs, EvasionSettings};
    ///
    /// let args = CliArgs {
    ///     seed: Some(7),
    ///     ..Default::default()
    /// };
    ///
    /// let settings = EvasionSettings::default().merge_with_args(&args);
    /// assert_eq!(settings.seed, Some(7));
    /// ```
    pub fn merge_with_args(mut self, args: &CliArgs) -> Self {
        if let Some(seed) = args.seed {
            self.seed = Some(seed);
        }
        if let Some(width) = args.target_width {
            self.mouse.default_target_width = width;
        }
        if let Some(probability) = args.overshoot_probability {
            self.mouse.overshoot_probability = probability;
        }
        if let Some(threshold) = args.honeypot_threshold {
            self.honeypot.threshold = threshold;
        }
        self
    }

    /// Validates all settings.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ki_browser_evasion::config::EvasionSettings;
    ///
    /// assert!(EvasionSettings::default().validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_mouse()?;
        self.validate_typing()?;
        self.validate_honeypot()?;
        self.validate_rate_limit()
    }

    fn validate_mouse(&self) -> Result<(), ConfigError> {
        let mouse = &self.mouse;

        ensure(
            positive(mouse.fitts_a_ms) && positive(mouse.fitts_b_ms),
            "Fitts constants must be positive",
        )?;
        ensure(
            positive(mouse.default_target_width),
            "Default target width must be positive",
        )?;
        ensure(
            mouse.sample_interval_ms > 0,
            "Sample interval must be at least 1ms",
        )?;
        ensure(
            mouse.max_duration_ms >= mouse.sample_interval_ms,
            "Maximum movement duration must cover at least one sample interval",
        )?;
        ensure(
            (0.0..=0.5).contains(&mouse.duration_jitter),
            "Duration jitter must be between 0 and 0.5",
        )?;
        ensure(
            probability(mouse.overshoot_probability),
            "Overshoot probability must be between 0 and 1",
        )?;
        ensure(
            probability(mouse.micro_correction_probability),
            "Micro-correction probability must be between 0 and 1",
        )?;
        ensure(
            positive(mouse.tremor_min_hz)
                && mouse.tremor_max_hz <= 50.0
                && mouse.tremor_min_hz <= mouse.tremor_max_hz,
            "Tremor band must satisfy 0 < min <= max <= 50 Hz",
        )?;
        ensure(
            (0.0..=0.5).contains(&mouse.tremor_edge_fraction),
            "Tremor edge fraction must be between 0 and 0.5",
        )?;
        ensure(
            mouse.tremor_amplitude_scale.is_finite() && mouse.tremor_amplitude_scale >= 0.0,
            "Tremor amplitude scale cannot be negative",
        )?;
        ensure(
            mouse.overshoot_min_ratio >= 0.0
                && mouse.overshoot_min_ratio <= mouse.overshoot_max_ratio
                && mouse.overshoot_max_ratio <= 1.0,
            "Overshoot ratios must satisfy 0 <= min <= max <= 1",
        )?;
        ensure(
            mouse.micro_correction_window > 0.0 && mouse.micro_correction_window <= 1.0,
            "Micro-correction window must be in (0, 1]",
        )?;
        ensure(
            mouse.micro_correction_amplitude_px.is_finite()
                && mouse.micro_correction_amplitude_px >= 0.0,
            "Micro-correction amplitude cannot be negative",
        )
    }

    fn validate_typing(&self) -> Result<(), ConfigError> {
        let typing = &self.typing;

        ensure(
            positive(typing.chars_per_word),
            "Characters per word must be positive",
        )?;
        ensure(
            typing.digraph_speedup > 0.0 && typing.digraph_speedup <= 1.0,
            "Digraph speedup must be in (0, 1]",
        )?;
        ensure(
            typing.hand_alternation_speedup > 0.0 && typing.hand_alternation_speedup <= 1.0,
            "Hand alternation speedup must be in (0, 1]",
        )?;
        ensure(
            typing.max_fatigue_multiplier.is_finite() && typing.max_fatigue_multiplier >= 1.0,
            "Maximum fatigue multiplier must be at least 1",
        )?;
        ensure(
            (0.0..=0.5).contains(&typing.delay_variance),
            "Delay variance must be between 0 and 0.5",
        )?;
        ensure(
            typing.key_hold_min_ms >= 0.0 && typing.key_hold_min_ms <= typing.key_hold_max_ms,
            "Key hold range must satisfy 0 <= min <= max",
        )?;
        ensure(
            typing.typo_pause_min_ms >= 0.0
                && typing.typo_pause_min_ms <= typing.typo_pause_max_ms,
            "Typo pause range must satisfy 0 <= min <= max",
        )
    }

    fn validate_honeypot(&self) -> Result<(), ConfigError> {
        ensure(
            positive(self.honeypot.threshold),
            "Honeypot threshold must be positive",
        )?;
        ensure(
            self.honeypot.opacity_threshold.is_finite() && self.honeypot.opacity_threshold >= 0.0,
            "Honeypot opacity threshold cannot be negative",
        )
    }

    fn validate_rate_limit(&self) -> Result<(), ConfigError> {
        let rate = &self.rate_limit;

        ensure(rate.base_delay_ms > 0, "Base delay must be at least 1ms")?;
        ensure(
            rate.floor_delay_ms <= rate.base_delay_ms,
            "Floor delay cannot exceed base delay",
        )?;
        ensure(
            rate.base_delay_ms <= rate.max_delay_ms,
            "Base delay cannot exceed maximum delay",
        )?;
        ensure(
            probability(rate.jitter_ratio),
            "Jitter ratio must be between 0 and 1",
        )?;
        ensure(
            rate.history_limit > 0,
            "Rate limit history must keep at least one entry",
        )
    }

    // Builder-style methods for convenient configuration

    /// Sets the seed for all random sources.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the mouse configuration.
    pub fn with_mouse(mut self, mouse: MouseConfig) -> Self {
        self.mouse = mouse;
        self
    }

    /// Sets the typing configuration.
    pub fn with_typing(mut self, typing: TypingConfig) -> Self {
        self.typing = typing;
        self
    }

    /// Sets the honeypot configuration.
    pub fn with_honeypot(mut self, honeypot: HoneypotConfig) -> Self {
        self.honeypot = honeypot;
        self
    }

    /// Sets the rate limit configuration.
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

/// CLI argument structure for parsing command line options.
///
/// All fields are optional to allow partial overrides.
#[derive(Debug, Default, Clone)]
pub struct CliArgs {
    /// Seed for all random sources.
    pub seed: Option<u64>,
    /// Default mouse target width in pixels.
    pub target_width: Option<f64>,
    /// Overshoot probability per mouse path.
    pub overshoot_probability: Option<f64>,
    /// Honeypot score threshold.
    pub honeypot_threshold: Option<f64>,
    /// Configuration file path.
    pub config_file: Option<PathBuf>,
}

impl CliArgs {
    /// Creates an empty CliArgs instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the final settings by applying the full configuration chain.
    ///
    /// 1. Default values
    /// 2. Configuration file (if specified)
    /// 3. Environment variables
    /// 4. CLI arguments (self)
    pub fn load_settings(&self) -> Result<EvasionSettings, ConfigError> {
        let mut settings = if let Some(ref config_file) = self.config_file {
            EvasionSettings::from_file(config_file)?
        } else {
            EvasionSettings::default()
        };

        settings = settings.merge_with_env();
        settings = settings.merge_with_args(self);
        settings.validate()?;

        Ok(settings)
    }
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn env_value<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}

fn ensure(condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(message.to_string()))
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}
