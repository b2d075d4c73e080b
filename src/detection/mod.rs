//! Page-side bot trap detection
//!
//! - [`honeypot`] - Classifies form fields that only bots would fill

pub mod honeypot;

pub use honeypot::{
    FieldDescriptor, FieldGeometry, FieldStyle, HoneypotConfig, HoneypotDetector,
    HoneypotFinding, HoneypotSignal, HoneypotWeights,
};
