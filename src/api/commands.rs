//! Command and response types for the evasion command layer
//!
//! Commands are JSON objects tagged by `"command"` with camelCase fields:
//!
//! ```json
//! {"command": "generate_mouse_path", "start": {"x": 0, "y": 0}, "end": {"x": 400, "y": 220}}
//! {"command": "record_rate_limit", "domain": "example.com", "retryAfter": 30}
//! ```

use serde::{Deserialize, Serialize};

use crate::detection::FieldDescriptor;
use crate::error::EvasionError;
use crate::input::Point;
use crate::stealth::manager::deserialize_seed;
use crate::stealth::ProfileOptions;

/// Commands understood by [`EvasionCommandHandler`](super::EvasionCommandHandler)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EvasionCommand {
    // ------------------------------------------------------------------
    // Fingerprints
    // ------------------------------------------------------------------
    /// Create a fingerprint profile
    CreateFingerprintProfile {
        #[serde(flatten)]
        options: ProfileOptions,
    },

    /// Create a profile pinned to a region on a random platform
    CreateRegionalFingerprint {
        region: String,
        #[serde(default)]
        id: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    GetFingerprintProfile { profile_id: String },

    ListFingerprintProfiles,

    #[serde(rename_all = "camelCase")]
    SetActiveFingerprint { profile_id: String },

    GetActiveFingerprint,

    /// Render the injection script for a profile (the active one by default)
    #[serde(rename_all = "camelCase")]
    ApplyFingerprint {
        #[serde(default)]
        profile_id: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    DeleteFingerprintProfile { profile_id: String },

    #[serde(rename_all = "camelCase")]
    RegenerateFingerprint { profile_id: String },

    GetFingerprintOptions,

    // ------------------------------------------------------------------
    // Behavior
    // ------------------------------------------------------------------
    /// Create (or replace) the behavioral profile of a session
    #[serde(rename_all = "camelCase")]
    CreateBehavioralProfile {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default, deserialize_with = "deserialize_seed")]
        seed: Option<u64>,
        #[serde(default)]
        speed_multiplier: Option<f64>,
        #[serde(default)]
        accuracy_level: Option<f64>,
        #[serde(default, rename = "typingWPM")]
        typing_wpm: Option<f64>,
    },

    #[serde(rename_all = "camelCase")]
    DeleteBehavioralProfile { session_id: String },

    #[serde(rename_all = "camelCase")]
    GenerateMousePath {
        #[serde(default)]
        session_id: Option<String>,
        start: Point,
        end: Point,
        #[serde(default)]
        target_width: Option<f64>,
        #[serde(default, deserialize_with = "deserialize_seed")]
        seed: Option<u64>,
    },

    #[serde(rename_all = "camelCase")]
    GenerateTypingEvents {
        #[serde(default)]
        session_id: Option<String>,
        text: String,
        #[serde(default)]
        elapsed_session_minutes: Option<f64>,
        #[serde(default, deserialize_with = "deserialize_seed")]
        seed: Option<u64>,
    },

    // ------------------------------------------------------------------
    // Honeypots
    // ------------------------------------------------------------------
    CheckHoneypot { fields: Vec<FieldDescriptor> },

    FilterHoneypots { fields: Vec<FieldDescriptor> },

    // ------------------------------------------------------------------
    // Rate limiting
    // ------------------------------------------------------------------
    GetRateLimitState { domain: String },

    RecordRequestSuccess { domain: String },

    #[serde(rename_all = "camelCase")]
    RecordRateLimit {
        domain: String,
        /// Retry-After header value in seconds
        #[serde(default)]
        retry_after: Option<f64>,
    },

    IsRateLimited { domain: String },

    ResetRateLimit { domain: String },
}

impl EvasionCommand {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            EvasionCommand::CreateFingerprintProfile { .. } => "create_fingerprint_profile",
            EvasionCommand::CreateRegionalFingerprint { .. } => "create_regional_fingerprint",
            EvasionCommand::GetFingerprintProfile { .. } => "get_fingerprint_profile",
            EvasionCommand::ListFingerprintProfiles => "list_fingerprint_profiles",
            EvasionCommand::SetActiveFingerprint { .. } => "set_active_fingerprint",
            EvasionCommand::GetActiveFingerprint => "get_active_fingerprint",
            EvasionCommand::ApplyFingerprint { .. } => "apply_fingerprint",
            EvasionCommand::DeleteFingerprintProfile { .. } => "delete_fingerprint_profile",
            EvasionCommand::RegenerateFingerprint { .. } => "regenerate_fingerprint",
            EvasionCommand::GetFingerprintOptions => "get_fingerprint_options",
            EvasionCommand::CreateBehavioralProfile { .. } => "create_behavioral_profile",
            EvasionCommand::DeleteBehavioralProfile { .. } => "delete_behavioral_profile",
            EvasionCommand::GenerateMousePath { .. } => "generate_mouse_path",
            EvasionCommand::GenerateTypingEvents { .. } => "generate_typing_events",
            EvasionCommand::CheckHoneypot { .. } => "check_honeypot",
            EvasionCommand::FilterHoneypots { .. } => "filter_honeypots",
            EvasionCommand::GetRateLimitState { .. } => "get_rate_limit_state",
            EvasionCommand::RecordRequestSuccess { .. } => "record_request_success",
            EvasionCommand::RecordRateLimit { .. } => "record_rate_limit",
            EvasionCommand::IsRateLimited { .. } => "is_rate_limited",
            EvasionCommand::ResetRateLimit { .. } => "reset_rate_limit",
        }
    }
}

/// Response to a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    /// Whether the command succeeded
    pub success: bool,

    /// Error message if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Machine-readable error code if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Response data (JSON value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    /// Create a success response
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
            error_code: None,
            data: None,
        }
    }

    /// Create a success response with data
    pub fn success_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            error_code: None,
            data: Some(data),
        }
    }

    /// Create an error response
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            error_code: Some(code.into()),
            data: None,
        }
    }

    /// Response for an unparseable command
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error("bad_request", message)
    }
}

impl From<EvasionError> for CommandResponse {
    fn from(err: EvasionError) -> Self {
        Self::error(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_command() {
        let cmd: EvasionCommand = serde_json::from_str(
            r#"{"command": "record_rate_limit", "domain": "example.com", "retryAfter": 30}"#,
        )
        .unwrap();

        match cmd {
            EvasionCommand::RecordRateLimit {
                domain,
                retry_after,
            } => {
                assert_eq!(domain, "example.com");
                assert_eq!(retry_after, Some(30.0));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_flattened_profile_options() {
        let cmd: EvasionCommand = serde_json::from_str(
            r#"{"command": "create_fingerprint_profile", "platform": "linux", "region": "eu", "seed": 5}"#,
        )
        .unwrap();

        match cmd {
            EvasionCommand::CreateFingerprintProfile { options } => {
                assert_eq!(options.platform.as_deref(), Some("linux"));
                assert_eq!(options.region.as_deref(), Some("eu"));
                assert_eq!(options.seed, Some(5));
                assert_eq!(options.timezone, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_text_seed() {
        let cmd: EvasionCommand = serde_json::from_str(
            r#"{"command": "generate_typing_events", "text": "hi", "seed": "abc"}"#,
        )
        .unwrap();
        match cmd {
            EvasionCommand::GenerateTypingEvents { seed, .. } => {
                assert_eq!(seed, Some(crate::stealth::manager::seed_from_text("abc")));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cmd: EvasionCommand = serde_json::from_str(
            r#"{"command": "create_fingerprint_profile", "platform": "linux", "seed": "17"}"#,
        )
        .unwrap();
        match cmd {
            EvasionCommand::CreateFingerprintProfile { options } => {
                assert_eq!(options.seed, Some(17));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_unit_command() {
        let cmd: EvasionCommand =
            serde_json::from_str(r#"{"command": "list_fingerprint_profiles"}"#).unwrap();
        assert_eq!(cmd.name(), "list_fingerprint_profiles");
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<EvasionCommand>(r#"{"command": "launch_rocket"}"#).is_err());
    }

    #[test]
    fn test_error_response_from_evasion_error() {
        let response = CommandResponse::from(EvasionError::NotFound("profile x".to_string()));
        assert!(!response.success);
        assert_eq!(response.error_code.as_deref(), Some("not_found"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["errorCode"], "not_found");
        assert!(json.get("data").is_none());
    }
}
