//! Configuration module for ki-browser-evasion.
//!
//! This module provides configuration management for the engine, including:
//! - Loading settings from files (TOML/JSON)
//! - Environment variable overrides
//! - CLI argument merging
//! - Validation and defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use ki_browser_evasion::config::EvasionSettings;
//!
//! // Load from a specific file
//! let settings = EvasionSettings::from_file("evasion.toml").unwrap();
//!
//! // Override with environment variables
//! let settings = settings.merge_with_env();
//! settings.validate().unwrap();
//! ```

mod settings;

pub use settings::{CliArgs, ConfigError, EvasionSettings};
