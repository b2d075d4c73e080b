//! Request pacing
//!
//! - [`rate_limit`] - Per-key exponential backoff honouring Retry-After
//! - [`clock`] - Injectable time source

pub mod clock;
pub mod rate_limit;

pub use clock::{Clock, ManualClock, SystemClock};
pub use rate_limit::{
    RateLimitAdapter, RateLimitConfig, RateLimitEvent, RateLimitState, RateLimitStatus,
    RequestOutcome,
};
