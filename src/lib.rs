//! # KI-Browser Evasion
//!
//! Detection-evasion engine for browser automation, written in Rust.
//!
//! The crate produces everything an automated browser needs to look like a
//! real person on a real machine: coherent device fingerprints, human-like
//! pointer paths and keystroke plans, a filter for honeypot form fields and
//! adaptive per-domain request pacing. It performs no I/O of its own; scripts
//! and input plans are data for a page host to execute or replay.
//!
//! ## Features
//!
//! - **Fingerprint Profiles**: Platform-consistent navigator, screen, WebGL,
//!   locale and hardware values plus a matching injection script
//! - **Mouse Movement**: Fitts's Law timing, minimum-jerk trajectories,
//!   physiological tremor, overshoot and micro-corrections
//! - **Typing**: Digraph and hand-alternation timing, fatigue, adjacent-key
//!   typos with backspace correction
//! - **Honeypot Detection**: Weighted heuristics over field geometry, style
//!   and naming
//! - **Rate Limiting**: Exponential backoff with jitter, Retry-After support
//!   and blocking after repeated throttling
//! - **Flexible Configuration**: TOML/JSON files, environment variables, CLI arguments
//!
//! ## Quick Start
//!
//! ```rust
//! use ki_browser_evasion::prelude::*;
//!
//! let mut manager = FingerprintProfileManager::with_seed(1);
//! let profile = manager.create_profile(Some("windows"), Some("us")).unwrap();
//! let script = to_injection_script(&profile);
//! assert!(script.contains(&profile.gpu.renderer));
//!
//! let behavior = BehavioralProfile::from_seed(2);
//! let path = MouseMovementAI::default()
//!     .plan_seeded(&behavior, Point::new(10.0, 10.0), Point::new(500.0, 300.0), &MouseOptions::default(), 3)
//!     .unwrap();
//! assert_eq!(path.last().unwrap().x, 500.0);
//!
//! let limiter = RateLimitAdapter::default();
//! limiter.record_rate_limited("example.com", Some(30.0)).unwrap();
//! assert!(!limiter.is_allowed("example.com"));
//! ```
//!
//! ## Module Overview
//!
//! - [`stealth`]: Fingerprint profiles, their manager and injection scripts
//! - [`input`]: Behavioral profiles, mouse paths and typing plans
//! - [`detection`]: Honeypot form field detection
//! - [`throttle`]: Adaptive per-domain rate limiting
//! - [`api`]: Structured command layer over all components
//! - [`config`]: Configuration loading and management
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       KI-Browser Evasion                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                    ┌───────────────────┐                        │
//! │                    │   API (commands)  │                        │
//! │                    └─────────┬─────────┘                        │
//! │       ┌────────────┬─────────┴──┬────────────┐                  │
//! │  ┌────┴────┐  ┌────┴────┐  ┌────┴────┐  ┌────┴────┐             │
//! │  │ Stealth │  │  Input  │  │Detection│  │Throttle │             │
//! │  │ Profile │  │  Sim    │  │Honeypot │  │  Rate   │             │
//! │  └─────────┘  └─────────┘  └─────────┘  └─────────┘             │
//! │                    ┌───────────┐                                │
//! │                    │  Config   │                                │
//! │                    └───────────┘                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The four components are independent of each other; only the command
//! layer ties them together.
//!
//! ## Configuration
//!
//! Configuration follows a precedence chain:
//! 1. Default values
//! 2. Configuration file (TOML/JSON)
//! 3. Environment variables (`KI_EVASION_*`)
//! 4. CLI arguments
//!
//! See [`config::EvasionSettings`] for all available options.

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Full version string with name
pub const FULL_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Module Exports
// ============================================================================

/// Error taxonomy shared by all components.
pub mod error;

/// Fingerprint profiles, profile management and injection scripts.
pub mod stealth;

/// Human-like input simulation: behavioral profiles, mouse paths, typing plans.
pub mod input;

/// Honeypot form field detection.
pub mod detection;

/// Adaptive per-key rate limiting.
pub mod throttle;

/// Structured command layer over the evasion components.
pub mod api;

/// Configuration management for loading settings from files, env, and CLI.
pub mod config;

// ============================================================================
// Re-exports for Convenience
// ============================================================================

// Error types
pub use error::{EvasionError, EvasionResult};

// Stealth types
pub use stealth::{
    to_injection_script, FingerprintContext, FingerprintGenerator, FingerprintProfile,
    FingerprintProfileManager, NavigatorOverrides, Platform, ProfileOptions, Region, WebGLProfile,
};

// Input types
pub use input::{
    BehavioralProfile, KeyAction, KeyEvent, MouseConfig, MouseMovementAI, MouseOptions, MousePath,
    Point, TypingAI, TypingConfig, TypingOptions, TypingPlan,
};

// Detection types
pub use detection::{FieldDescriptor, HoneypotConfig, HoneypotDetector, HoneypotFinding};

// Throttle types
pub use throttle::{Clock, RateLimitAdapter, RateLimitConfig, RateLimitState, RateLimitStatus};

// API types
pub use api::{CommandResponse, EvasionCommand, EvasionCommandHandler};

// Config types
pub use config::{CliArgs, ConfigError, EvasionSettings};

// ============================================================================
// Prelude Module
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust
/// use ki_browser_evasion::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::{CommandResponse, EvasionCommand, EvasionCommandHandler};
    pub use crate::config::{CliArgs, EvasionSettings};
    pub use crate::detection::{FieldDescriptor, HoneypotDetector};
    pub use crate::error::{EvasionError, EvasionResult};
    pub use crate::input::{
        BehavioralProfile, MouseMovementAI, MouseOptions, Point, TypingAI, TypingOptions,
    };
    pub use crate::stealth::{
        to_injection_script, FingerprintContext, FingerprintProfile, FingerprintProfileManager,
    };
    pub use crate::throttle::RateLimitAdapter;
    pub use crate::{FULL_VERSION, NAME, VERSION};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constants() {
        assert!(!VERSION.is_empty());
        assert!(!NAME.is_empty());
        assert!(FULL_VERSION.contains(VERSION));
        assert!(FULL_VERSION.contains(NAME));
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;
        let handler = EvasionCommandHandler::default();
        assert!(handler.fingerprints().is_empty());
        let _ = VERSION;
    }
}
