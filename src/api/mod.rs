//! Command layer for ki-browser-evasion
//!
//! Exposes the evasion components as structured commands. The layer is
//! synchronous and performs no I/O; a transport (such as the `ki-evasion`
//! binary's JSON-lines loop) feeds it parsed or raw JSON commands.

pub mod commands;
pub mod handler;

pub use commands::{CommandResponse, EvasionCommand};
pub use handler::{EvasionCommandHandler, DEFAULT_SESSION};
