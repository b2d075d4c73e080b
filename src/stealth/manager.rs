//! Fingerprint profile manager
//!
//! Owns the set of generated profiles. The "active" profile is not global
//! state: callers keep their own [`FingerprintContext`] and the manager reads
//! and writes the pointer inside it.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::{EvasionError, EvasionResult};
use crate::stealth::fingerprint::{FingerprintGenerator, FingerprintProfile, ProfileSummary};
use crate::stealth::tables::{find_timezone, HardwareTier, Platform, Region, TIMEZONES};
use crate::stealth::{is_line_breaking, to_injection_script};

/// Optional parameters for profile creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOptions {
    /// `windows`, `mac` or `linux` (and common aliases); random when absent
    pub platform: Option<String>,
    /// Region code pinning languages and timezone
    pub region: Option<String>,
    /// Explicit IANA timezone; must be in the timezone table
    pub timezone: Option<String>,
    /// Hardware tier: `low`, `medium`, `high` or `workstation`
    pub tier: Option<String>,
    /// Seed for reproducible derived fields; text seeds are hashed
    #[serde(default, deserialize_with = "deserialize_seed")]
    pub seed: Option<u64>,
    /// Caller-chosen id; generated when absent
    pub id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedInput {
    Number(u64),
    Text(String),
}

/// Accept a seed as an integer or as text
pub(crate) fn deserialize_seed<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    Ok(Option::<SeedInput>::deserialize(deserializer)?.map(|seed| match seed {
        SeedInput::Number(n) => n,
        SeedInput::Text(text) => seed_from_text(&text),
    }))
}

/// Map a text seed to a generator seed.
///
/// Decimal text maps to its value; anything else goes through 64-bit FNV-1a,
/// which stays stable across builds and platforms.
pub fn seed_from_text(text: &str) -> u64 {
    let text = text.trim();
    text.parse().unwrap_or_else(|_| {
        text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
        })
    })
}

/// Caller-owned session state holding the active profile pointer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintContext {
    pub active_profile_id: Option<String>,
}

impl FingerprintContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Values accepted by the creation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintOptions {
    pub platforms: Vec<Platform>,
    pub regions: Vec<Region>,
    pub tiers: Vec<HardwareTier>,
    pub timezones: Vec<String>,
}

/// Creates, stores and renders fingerprint profiles
#[derive(Debug)]
pub struct FingerprintProfileManager {
    profiles: HashMap<String, FingerprintProfile>,
    /// Generators the profiles were created with, reused on regeneration
    generators: HashMap<String, FingerprintGenerator>,
    /// Insertion order for stable listings
    order: Vec<String>,
    rng: StdRng,
}

impl Default for FingerprintProfileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintProfileManager {
    /// Manager drawing ids and seeds from OS entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Manager whose ids and seeds are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            profiles: HashMap::new(),
            generators: HashMap::new(),
            order: Vec::new(),
            rng,
        }
    }

    /// Create a profile for `platform` (uniformly random when `None`),
    /// optionally pinned to `region`.
    pub fn create_profile(
        &mut self,
        platform: Option<&str>,
        region: Option<&str>,
    ) -> EvasionResult<FingerprintProfile> {
        self.create_profile_with(ProfileOptions {
            platform: platform.map(str::to_string),
            region: region.map(str::to_string),
            ..Default::default()
        })
    }

    /// Create a profile pinned to `region` on a random platform
    pub fn create_regional_profile(
        &mut self,
        region: &str,
        id: Option<String>,
    ) -> EvasionResult<FingerprintProfile> {
        self.create_profile_with(ProfileOptions {
            region: Some(region.to_string()),
            id,
            ..Default::default()
        })
    }

    pub fn create_profile_with(
        &mut self,
        options: ProfileOptions,
    ) -> EvasionResult<FingerprintProfile> {
        // Validate everything before touching state or the RNG.
        let platform = options
            .platform
            .as_deref()
            .map(str::parse::<Platform>)
            .transpose()?;
        let region = options
            .region
            .as_deref()
            .map(str::parse::<Region>)
            .transpose()?;
        let tier = options
            .tier
            .as_deref()
            .map(str::parse::<HardwareTier>)
            .transpose()?;
        let timezone = match options.timezone.as_deref() {
            Some(name) => Some(find_timezone(name).ok_or_else(|| {
                EvasionError::invalid(format!("unknown timezone '{}'", name))
            })?),
            None => None,
        };
        if let Some(id) = &options.id {
            if id.trim().is_empty() {
                return Err(EvasionError::invalid("profile id must not be empty"));
            }
            if id.chars().any(is_line_breaking) {
                return Err(EvasionError::invalid(format!(
                    "profile id {:?} contains control or line separator characters",
                    id
                )));
            }
            if self.profiles.contains_key(id) {
                return Err(EvasionError::invalid(format!(
                    "profile '{}' already exists",
                    id
                )));
            }
        }

        let platform =
            platform.unwrap_or_else(|| Platform::ALL[self.rng.gen_range(0..Platform::ALL.len())]);
        let mut generator = FingerprintGenerator::new(platform);
        if let Some(region) = region {
            generator = generator.with_region(region);
        }
        if let Some(tz) = timezone {
            generator = generator.with_timezone(tz);
        }
        if let Some(tier) = tier {
            generator = generator.with_tier(tier);
        }

        let id = match options.id {
            Some(id) => id,
            None => self.next_id(),
        };
        let seed = options.seed.unwrap_or_else(|| self.rng.gen());
        let profile = generator.generate(id.clone(), seed);

        info!(
            "Created fingerprint profile {} ({}, region {:?})",
            id, platform, region
        );

        self.order.push(id.clone());
        self.generators.insert(id.clone(), generator);
        self.profiles.insert(id, profile.clone());
        Ok(profile)
    }

    pub fn get_profile(&self, id: &str) -> EvasionResult<&FingerprintProfile> {
        self.profiles
            .get(id)
            .ok_or_else(|| EvasionError::not_found(format!("fingerprint profile '{}'", id)))
    }

    /// Summaries in creation order
    pub fn list_profiles(&self) -> Vec<ProfileSummary> {
        self.order
            .iter()
            .filter_map(|id| self.profiles.get(id))
            .map(FingerprintProfile::summary)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Remove a profile. Contexts still pointing at it resolve to no active
    /// profile afterwards.
    pub fn delete_profile(&mut self, id: &str) -> EvasionResult<FingerprintProfile> {
        let profile = self
            .profiles
            .remove(id)
            .ok_or_else(|| EvasionError::not_found(format!("fingerprint profile '{}'", id)))?;
        self.generators.remove(id);
        self.order.retain(|existing| existing != id);
        info!("Deleted fingerprint profile {}", id);
        Ok(profile)
    }

    /// Re-roll every derived field of a profile with a fresh seed.
    ///
    /// The id, creation time, platform and any region/timezone/tier pins are
    /// kept.
    pub fn regenerate(&mut self, id: &str) -> EvasionResult<FingerprintProfile> {
        let generator = self
            .generators
            .get(id)
            .cloned()
            .ok_or_else(|| EvasionError::not_found(format!("fingerprint profile '{}'", id)))?;

        let created_at = self.get_profile(id)?.created_at;
        let seed = self.rng.gen();
        let mut profile = generator.generate(id, seed);
        profile.created_at = created_at;
        self.profiles.insert(id.to_string(), profile.clone());
        info!("Regenerated fingerprint profile {}", id);
        Ok(profile)
    }

    /// Point `context` at an existing profile
    pub fn set_active(&self, context: &mut FingerprintContext, id: &str) -> EvasionResult<()> {
        self.get_profile(id)?;
        debug!("Active fingerprint profile set to {}", id);
        context.active_profile_id = Some(id.to_string());
        Ok(())
    }

    /// Profile `context` points at, if it still exists
    pub fn get_active<'a>(&'a self, context: &FingerprintContext) -> Option<&'a FingerprintProfile> {
        context
            .active_profile_id
            .as_deref()
            .and_then(|id| self.profiles.get(id))
    }

    pub fn clear_active(&self, context: &mut FingerprintContext) {
        context.active_profile_id = None;
    }

    /// Injection script for a stored profile
    pub fn to_injection_script(&self, id: &str) -> EvasionResult<String> {
        Ok(to_injection_script(self.get_profile(id)?))
    }

    /// Values accepted by [`ProfileOptions`]
    pub fn options() -> FingerprintOptions {
        FingerprintOptions {
            platforms: Platform::ALL.to_vec(),
            regions: Region::ALL.to_vec(),
            tiers: HardwareTier::ALL.to_vec(),
            timezones: TIMEZONES.iter().map(|tz| tz.name.to_string()).collect(),
        }
    }

    fn next_id(&mut self) -> String {
        loop {
            let id = uuid::Builder::from_random_bytes(self.rng.gen())
                .into_uuid()
                .to_string();
            if !self.profiles.contains_key(&id) {
                return id;
            }
        }
    }
}
