//! Behavioral simulation
//!
//! Produces timed pointer paths and keystroke plans that look like a human
//! operator. Nothing here dispatches real input events; the plans are data
//! for the page host to replay.
//!
//! # Submodules
//!
//! - [`behavior`] - Session-consistent behavioral parameters
//! - [`mouse`] - Fitts's Law / minimum-jerk pointer paths with tremor
//! - [`keyboard`] - Keystroke plans with digraph, hand and fatigue effects
//! - [`trajectory`] - Points and the minimum-jerk profile
//! - [`timing`] - Timing formulas and noise helpers
//!
//! # Example
//!
//! ```rust
//! use ki_browser_evasion::input::{
//!     BehavioralProfile, MouseMovementAI, MouseOptions, Point, TypingAI, TypingOptions,
//! };
//!
//! let profile = BehavioralProfile::from_seed(1);
//!
//! let path = MouseMovementAI::default()
//!     .plan_seeded(&profile, Point::new(0.0, 0.0), Point::new(300.0, 120.0), &MouseOptions::default(), 99)
//!     .unwrap();
//! assert_eq!(path.last().unwrap().x, 300.0);
//!
//! let plan = TypingAI::default()
//!     .plan_seeded(&profile, "hello", &TypingOptions::default())
//!     .unwrap();
//! assert_eq!(plan.typed_text(), "hello");
//! ```

pub mod behavior;
pub mod keyboard;
pub mod mouse;
pub mod timing;
pub mod trajectory;

pub use behavior::BehavioralProfile;
pub use keyboard::{KeyAction, KeyEvent, TypingAI, TypingConfig, TypingOptions, TypingPlan};
pub use mouse::{MouseConfig, MouseMovementAI, MouseOptions, MousePath, PathPoint};
pub use trajectory::{minimum_jerk, Point};
