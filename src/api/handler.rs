//! Synchronous command dispatcher
//!
//! Owns one identity's worth of state: the fingerprint profiles and active
//! pointer, behavioral profiles keyed by session id, and a rate limiter that
//! may be shared with other handlers.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::commands::{CommandResponse, EvasionCommand};
use crate::config::EvasionSettings;
use crate::detection::{FieldDescriptor, HoneypotDetector};
use crate::error::{EvasionError, EvasionResult};
use crate::input::{
    BehavioralProfile, MouseMovementAI, MouseOptions, Point, TypingAI, TypingOptions,
};
use crate::stealth::{FingerprintContext, FingerprintProfileManager, ProfileOptions};
use crate::throttle::RateLimitAdapter;

/// Session used when a command names none
pub const DEFAULT_SESSION: &str = "default";

enum HandlerError {
    Evasion(EvasionError),
    Serialize(serde_json::Error),
}

impl From<EvasionError> for HandlerError {
    fn from(err: EvasionError) -> Self {
        HandlerError::Evasion(err)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Serialize(err)
    }
}

type HandlerResult = Result<Value, HandlerError>;

/// Dispatches [`EvasionCommand`]s to the evasion components
pub struct EvasionCommandHandler {
    fingerprints: FingerprintProfileManager,
    context: FingerprintContext,
    sessions: HashMap<String, BehavioralProfile>,
    mouse: MouseMovementAI,
    typing: TypingAI,
    honeypot: HoneypotDetector,
    rate_limiter: Arc<RateLimitAdapter>,
    rng: StdRng,
}

impl Default for EvasionCommandHandler {
    fn default() -> Self {
        Self::from_settings(&EvasionSettings::default())
    }
}

impl EvasionCommandHandler {
    /// Build a handler from validated settings
    pub fn from_settings(settings: &EvasionSettings) -> Self {
        let mut master = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            fingerprints: FingerprintProfileManager::with_seed(master.gen()),
            context: FingerprintContext::new(),
            sessions: HashMap::new(),
            mouse: MouseMovementAI::new(settings.mouse.clone()),
            typing: TypingAI::new(settings.typing.clone()),
            honeypot: HoneypotDetector::new(settings.honeypot.clone()),
            rate_limiter: Arc::new(RateLimitAdapter::with_seed(
                settings.rate_limit.clone(),
                master.gen(),
            )),
            rng: StdRng::seed_from_u64(master.gen()),
        }
    }

    /// Use a rate limiter shared with other handlers
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimitAdapter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn rate_limiter(&self) -> Arc<RateLimitAdapter> {
        Arc::clone(&self.rate_limiter)
    }

    pub fn fingerprints(&self) -> &FingerprintProfileManager {
        &self.fingerprints
    }

    pub fn context(&self) -> &FingerprintContext {
        &self.context
    }

    /// Behavioral profile of a session, if one exists
    pub fn session(&self, session_id: &str) -> Option<&BehavioralProfile> {
        self.sessions.get(session_id)
    }

    /// Parse and handle one JSON command
    pub fn handle_json(&mut self, line: &str) -> CommandResponse {
        match serde_json::from_str::<EvasionCommand>(line) {
            Ok(command) => self.handle(command),
            Err(e) => {
                warn!("Rejected malformed command: {}", e);
                CommandResponse::bad_request(format!("Invalid command: {}", e))
            }
        }
    }

    /// Process a single command
    pub fn handle(&mut self, command: EvasionCommand) -> CommandResponse {
        let name = command.name();
        debug!("Handling command {}", name);

        match self.dispatch(command) {
            Ok(Value::Null) => CommandResponse::success(),
            Ok(data) => CommandResponse::success_with_data(data),
            Err(HandlerError::Evasion(err)) => {
                debug!("Command {} failed: {}", name, err);
                CommandResponse::from(err)
            }
            Err(HandlerError::Serialize(err)) => {
                warn!("Command {} produced unserializable output: {}", name, err);
                CommandResponse::error("internal", err.to_string())
            }
        }
    }

    fn dispatch(&mut self, command: EvasionCommand) -> HandlerResult {
        match command {
            EvasionCommand::CreateFingerprintProfile { options } => {
                self.handle_create_fingerprint(options)
            }
            EvasionCommand::CreateRegionalFingerprint { region, id } => {
                let profile = self.fingerprints.create_regional_profile(&region, id)?;
                data(&profile)
            }
            EvasionCommand::GetFingerprintProfile { profile_id } => {
                data(self.fingerprints.get_profile(&profile_id)?)
            }
            EvasionCommand::ListFingerprintProfiles => {
                let profiles = self.fingerprints.list_profiles();
                Ok(json!({ "count": profiles.len(), "profiles": profiles }))
            }
            EvasionCommand::SetActiveFingerprint { profile_id } => {
                self.fingerprints.set_active(&mut self.context, &profile_id)?;
                data(&self.fingerprints.get_profile(&profile_id)?.summary())
            }
            EvasionCommand::GetActiveFingerprint => {
                let active = self.fingerprints.get_active(&self.context);
                Ok(json!({ "active": active }))
            }
            EvasionCommand::ApplyFingerprint { profile_id } => {
                self.handle_apply_fingerprint(profile_id)
            }
            EvasionCommand::DeleteFingerprintProfile { profile_id } => {
                let removed = self.fingerprints.delete_profile(&profile_id)?;
                if self.context.active_profile_id.as_deref() == Some(profile_id.as_str()) {
                    self.fingerprints.clear_active(&mut self.context);
                }
                Ok(json!({ "deleted": removed.id }))
            }
            EvasionCommand::RegenerateFingerprint { profile_id } => {
                data(&self.fingerprints.regenerate(&profile_id)?)
            }
            EvasionCommand::GetFingerprintOptions => data(&FingerprintProfileManager::options()),
            EvasionCommand::CreateBehavioralProfile {
                session_id,
                seed,
                speed_multiplier,
                accuracy_level,
                typing_wpm,
            } => self.handle_create_behavioral(
                session_id,
                seed,
                speed_multiplier,
                accuracy_level,
                typing_wpm,
            ),
            EvasionCommand::DeleteBehavioralProfile { session_id } => {
                if self.sessions.remove(&session_id).is_none() {
                    return Err(EvasionError::not_found(format!(
                        "behavioral session {}",
                        session_id
                    ))
                    .into());
                }
                info!("Ended behavioral session {}", session_id);
                Ok(json!({ "deleted": session_id }))
            }
            EvasionCommand::GenerateMousePath {
                session_id,
                start,
                end,
                target_width,
                seed,
            } => self.handle_mouse_path(session_id, start, end, target_width, seed),
            EvasionCommand::GenerateTypingEvents {
                session_id,
                text,
                elapsed_session_minutes,
                seed,
            } => self.handle_typing(session_id, &text, elapsed_session_minutes, seed),
            EvasionCommand::CheckHoneypot { fields } => {
                let findings = self.honeypot.evaluate(&fields);
                let suspicious = findings.iter().filter(|f| f.suspicious).count();
                Ok(json!({ "suspiciousCount": suspicious, "findings": findings }))
            }
            EvasionCommand::FilterHoneypots { fields } => self.handle_filter_honeypots(fields),
            EvasionCommand::GetRateLimitState { domain } => {
                data(&self.rate_limiter.state(&domain)?)
            }
            EvasionCommand::RecordRequestSuccess { domain } => {
                data(&self.rate_limiter.record_success(&domain)?)
            }
            EvasionCommand::RecordRateLimit {
                domain,
                retry_after,
            } => data(&self.rate_limiter.record_rate_limited(&domain, retry_after)?),
            EvasionCommand::IsRateLimited { domain } => Ok(json!({
                "domain": domain,
                "rateLimited": !self.rate_limiter.is_allowed(&domain),
                "delayRemainingMillis": self.rate_limiter.delay_remaining(&domain),
            })),
            EvasionCommand::ResetRateLimit { domain } => {
                let reset = self.rate_limiter.reset(&domain);
                Ok(json!({ "domain": domain, "reset": reset }))
            }
        }
    }

    fn handle_create_fingerprint(&mut self, options: ProfileOptions) -> HandlerResult {
        let profile = self.fingerprints.create_profile_with(options)?;
        let issues = profile.consistency_issues();
        Ok(json!({
            "profile": profile,
            "validation": { "valid": issues.is_empty(), "issues": issues },
        }))
    }

    fn handle_apply_fingerprint(&mut self, profile_id: Option<String>) -> HandlerResult {
        let profile = match profile_id {
            Some(id) => self.fingerprints.get_profile(&id)?,
            None => self
                .fingerprints
                .get_active(&self.context)
                .ok_or_else(|| EvasionError::not_found("no active fingerprint profile"))?,
        };

        Ok(json!({
            "profileId": profile.id,
            "script": crate::stealth::to_injection_script(profile),
        }))
    }

    fn handle_create_behavioral(
        &mut self,
        session_id: Option<String>,
        seed: Option<u64>,
        speed_multiplier: Option<f64>,
        accuracy_level: Option<f64>,
        typing_wpm: Option<f64>,
    ) -> HandlerResult {
        let session_id = session_id.unwrap_or_else(|| DEFAULT_SESSION.to_string());
        if session_id.trim().is_empty() {
            return Err(EvasionError::invalid("session id is empty").into());
        }

        let seed = seed.unwrap_or_else(|| self.rng.gen());
        let mut profile = BehavioralProfile::from_seed(seed);
        if let Some(multiplier) = speed_multiplier {
            profile = profile.with_speed_multiplier(multiplier)?;
        }
        if let Some(accuracy) = accuracy_level {
            profile = profile.with_accuracy(accuracy)?;
        }
        if let Some(wpm) = typing_wpm {
            profile = profile.with_typing_wpm(wpm)?;
        }

        info!(
            "Created behavioral profile {} for session {}",
            profile.id, session_id
        );
        let result = json!({ "sessionId": session_id, "profile": profile });
        self.sessions.insert(session_id, profile);
        Ok(result)
    }

    fn handle_mouse_path(
        &mut self,
        session_id: Option<String>,
        start: Point,
        end: Point,
        target_width: Option<f64>,
        seed: Option<u64>,
    ) -> HandlerResult {
        let profile = self.session_profile(session_id)?;
        let options = MouseOptions { target_width };

        let path = match seed {
            Some(seed) => self.mouse.plan_seeded(&profile, start, end, &options, seed)?,
            None => self
                .mouse
                .plan(&profile, start, end, &options, &mut self.rng)?,
        };
        data(&path)
    }

    fn handle_typing(
        &mut self,
        session_id: Option<String>,
        text: &str,
        elapsed_session_minutes: Option<f64>,
        seed: Option<u64>,
    ) -> HandlerResult {
        let profile = self.session_profile(session_id)?;
        let options = TypingOptions {
            elapsed_session_minutes: elapsed_session_minutes.unwrap_or(0.0),
        };

        let plan = match seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                self.typing.plan(&profile, text, &options, &mut rng)?
            }
            None => self.typing.plan(&profile, text, &options, &mut self.rng)?,
        };
        data(&plan)
    }

    fn handle_filter_honeypots(&self, fields: Vec<FieldDescriptor>) -> HandlerResult {
        let findings = self.honeypot.evaluate(&fields);
        let removed: Vec<&str> = findings
            .iter()
            .filter(|f| f.suspicious)
            .map(|f| f.field_id.as_str())
            .collect();
        let kept = self.honeypot.filter(&fields);

        Ok(json!({ "fields": kept, "removed": removed }))
    }

    /// Profile for `session_id`; the default session is created on first use
    fn session_profile(&mut self, session_id: Option<String>) -> EvasionResult<BehavioralProfile> {
        match session_id {
            Some(id) if id != DEFAULT_SESSION => self
                .sessions
                .get(&id)
                .cloned()
                .ok_or_else(|| EvasionError::not_found(format!("behavioral session {}", id))),
            _ => {
                if !self.sessions.contains_key(DEFAULT_SESSION) {
                    let profile = BehavioralProfile::from_seed(self.rng.gen());
                    debug!("Created default behavioral session {}", profile.id);
                    self.sessions.insert(DEFAULT_SESSION.to_string(), profile);
                }
                self.sessions
                    .get(DEFAULT_SESSION)
                    .cloned()
                    .ok_or_else(|| EvasionError::not_found("default behavioral session"))
            }
        }
    }
}

fn data<T: Serialize + ?Sized>(value: &T) -> HandlerResult {
    Ok(serde_json::to_value(value)?)
}
