//! Fingerprint profiles
//!
//! A [`FingerprintProfile`] is one synthetic device identity. All of its
//! fields are drawn from the same [`PlatformBucket`], and everything random
//! about it derives from a single `seed`, so the same seed and request always
//! produce the same identity.
//!
//! # Example
//!
//! ```rust
//! use ki_browser_evasion::stealth::{FingerprintGenerator, Platform, Region};
//!
//! let profile = FingerprintGenerator::new(Platform::Linux)
//!     .with_region(Region::EU)
//!     .generate("profile-1", 42);
//!
//! assert_eq!(profile.navigator_platform, "Linux x86_64");
//! assert!(profile.consistency_issues().is_empty());
//! ```

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::stealth::tables::{
    find_timezone, HardwareTier, LocaleEntry, Platform, PlatformBucket, Region, TimezoneEntry,
};
use crate::stealth::webgl::WebGLProfile;

/// Screen dimensions as reported by `window.screen`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub avail_width: u32,
    pub avail_height: u32,
    pub color_depth: u32,
}

/// Browser content area (`innerWidth` / `innerHeight`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Unmasked WebGL vendor and renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub vendor: String,
    pub renderer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleInfo {
    /// `navigator.languages`, most preferred first
    pub languages: Vec<String>,
    /// IANA timezone name
    pub timezone: String,
    /// `Date.prototype.getTimezoneOffset()` for the timezone
    pub timezone_offset_minutes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareInfo {
    pub concurrency: u32,
    #[serde(rename = "deviceMemoryGB")]
    pub device_memory_gb: u32,
    pub tier: HardwareTier,
}

/// Seeds for the canvas and audio read-back noise
///
/// Fixed per profile so that repeated reads see the same perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseSeeds {
    pub canvas_seed: u32,
    pub audio_seed: u32,
}

/// A complete, internally consistent synthetic device identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintProfile {
    pub id: String,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
    /// Seed every derived field was drawn from
    pub seed: u64,
    /// Region the locale was pinned to, if any
    pub region: Option<Region>,
    pub user_agent: String,
    pub navigator_platform: String,
    pub vendor: String,
    pub screen: ScreenInfo,
    pub viewport: Viewport,
    pub gpu: GpuInfo,
    pub locale: LocaleInfo,
    pub hardware: HardwareInfo,
    pub noise: NoiseSeeds,
}

/// Compact listing entry for a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: String,
    pub platform: Platform,
    pub region: Option<Region>,
    pub user_agent: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

impl FingerprintProfile {
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id.clone(),
            platform: self.platform,
            region: self.region,
            user_agent: self.user_agent.clone(),
            timezone: self.locale.timezone.clone(),
            created_at: self.created_at,
        }
    }

    /// Check the profile against its platform bucket.
    ///
    /// Returns one message per field that could not have come from the
    /// bucket; an empty list means the profile is consistent.
    pub fn consistency_issues(&self) -> Vec<String> {
        let bucket = self.platform.bucket();
        let mut issues = Vec::new();

        if !bucket.user_agents.contains(&self.user_agent.as_str()) {
            issues.push(format!("user agent is not a {} user agent", self.platform));
        }
        if self.navigator_platform != bucket.navigator_platform {
            issues.push(format!(
                "navigator.platform '{}' does not match {}",
                self.navigator_platform, self.platform
            ));
        }
        if self.vendor != bucket.vendor {
            issues.push(format!("navigator.vendor '{}' is unexpected", self.vendor));
        }

        match WebGLProfile::from_renderer(&self.gpu.renderer) {
            Some(gpu) if gpu.platform() != self.platform => issues.push(format!(
                "GPU '{}' belongs to {}, not {}",
                self.gpu.renderer,
                gpu.platform(),
                self.platform
            )),
            Some(gpu) if gpu.vendor() != self.gpu.vendor => {
                issues.push(format!("GPU vendor '{}' does not match renderer", self.gpu.vendor))
            }
            Some(_) => {}
            None => issues.push(format!("unknown GPU renderer '{}'", self.gpu.renderer)),
        }

        let s = &self.screen;
        if !bucket
            .screens
            .iter()
            .any(|size| size.width == s.width && size.height == s.height)
        {
            issues.push(format!("screen {}x{} is not a {} resolution", s.width, s.height, self.platform));
        }
        if s.avail_width > s.width || s.avail_height > s.height {
            issues.push("available screen area exceeds the screen".to_string());
        }
        if !bucket.color_depths.contains(&s.color_depth) {
            issues.push(format!("color depth {} is unexpected", s.color_depth));
        }
        if self.viewport.width > s.avail_width || self.viewport.height > s.avail_height {
            issues.push("viewport exceeds the available screen area".to_string());
        }

        match find_timezone(&self.locale.timezone) {
            Some(tz) if tz.offset_minutes != self.locale.timezone_offset_minutes => {
                issues.push(format!("timezone offset does not match {}", tz.name))
            }
            Some(_) => {}
            None => issues.push(format!("unknown timezone '{}'", self.locale.timezone)),
        }
        if self.locale.languages.is_empty() {
            issues.push("language list is empty".to_string());
        }

        let hw = &self.hardware;
        if !hw.tier.concurrency_options().contains(&hw.concurrency)
            || !hw.tier.device_memory_options().contains(&hw.device_memory_gb)
        {
            issues.push(format!("hardware counts do not fit the {} tier", hw.tier));
        }

        issues
    }

    pub fn is_consistent(&self) -> bool {
        self.consistency_issues().is_empty()
    }
}

/// Builds profiles for one platform, optionally pinned to a region,
/// timezone or hardware tier
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintGenerator {
    platform: Platform,
    region: Option<Region>,
    timezone: Option<&'static TimezoneEntry>,
    tier: Option<HardwareTier>,
}

impl FingerprintGenerator {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            region: None,
            timezone: None,
            tier: None,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Pin the timezone; it overrides the region's own timezones.
    pub fn with_timezone(mut self, timezone: &'static TimezoneEntry) -> Self {
        self.timezone = Some(timezone);
        self
    }

    pub fn with_tier(mut self, tier: HardwareTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// Generate a profile. Identical `seed` values yield identical profiles
    /// apart from `created_at`.
    pub fn generate(&self, id: impl Into<String>, seed: u64) -> FingerprintProfile {
        let mut rng = StdRng::seed_from_u64(seed);
        let bucket = self.platform.bucket();

        let user_agent = pick(&mut rng, bucket.user_agents);
        let gpu = pick(&mut rng, bucket.gpus);
        let screen = self.pick_screen(&mut rng, bucket);
        let viewport = pick_viewport(&mut rng, &screen);
        let locale = self.pick_locale(&mut rng, bucket);

        let tier = match self.tier {
            Some(tier) => tier,
            None => pick(&mut rng, bucket.tiers),
        };
        let hardware = HardwareInfo {
            concurrency: pick(&mut rng, tier.concurrency_options()),
            device_memory_gb: pick(&mut rng, tier.device_memory_options()),
            tier,
        };

        let noise = NoiseSeeds {
            canvas_seed: rng.gen(),
            audio_seed: rng.gen(),
        };

        FingerprintProfile {
            id: id.into(),
            platform: self.platform,
            created_at: Utc::now(),
            seed,
            region: self.region,
            user_agent: user_agent.to_string(),
            navigator_platform: bucket.navigator_platform.to_string(),
            vendor: bucket.vendor.to_string(),
            screen,
            viewport,
            gpu: GpuInfo {
                vendor: gpu.vendor().to_string(),
                renderer: gpu.renderer().to_string(),
            },
            locale,
            hardware,
            noise,
        }
    }

    fn pick_screen(&self, rng: &mut StdRng, bucket: &PlatformBucket) -> ScreenInfo {
        let size = pick(rng, bucket.screens);
        ScreenInfo {
            width: size.width,
            height: size.height,
            avail_width: size.width,
            avail_height: size.height - bucket.reserved_height,
            color_depth: pick(rng, bucket.color_depths),
        }
    }

    fn pick_locale(&self, rng: &mut StdRng, bucket: &PlatformBucket) -> LocaleInfo {
        let candidates = match self.region {
            Some(region) => region.locales(),
            None => bucket.locales,
        };

        let entry = match self.timezone {
            // A pinned timezone keeps the languages usually paired with it.
            Some(tz) => candidates
                .iter()
                .chain(Region::ALL.iter().flat_map(|r| r.locales().iter()))
                .find(|l| l.timezone == tz.name)
                .map(|l| LocaleEntry {
                    languages: if self.region.is_some() {
                        candidates[0].languages
                    } else {
                        l.languages
                    },
                    timezone: tz.name,
                })
                .unwrap_or(LocaleEntry {
                    languages: candidates[0].languages,
                    timezone: tz.name,
                }),
            None => pick(rng, candidates),
        };

        let offset = find_timezone(entry.timezone)
            .map(|tz| tz.offset_minutes)
            .unwrap_or(0);

        LocaleInfo {
            languages: entry.languages.iter().map(|l| l.to_string()).collect(),
            timezone: entry.timezone.to_string(),
            timezone_offset_minutes: offset,
        }
    }
}

/// Uniform choice from a non-empty static table
fn pick<T: Copy>(rng: &mut StdRng, items: &[T]) -> T {
    items[rng.gen_range(0..items.len())]
}

fn pick_viewport(rng: &mut StdRng, screen: &ScreenInfo) -> Viewport {
    // Mostly maximized windows, sometimes a little narrower.
    let width_trim = pick(rng, &[0u32, 0, 0, 16, 80, 160]);
    // Tab strip, address bar and bookmarks bar.
    let chrome_height = rng.gen_range(71..=140);

    Viewport {
        width: screen.avail_width.saturating_sub(width_trim),
        height: screen.avail_height.saturating_sub(chrome_height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_profile() {
        let generator = FingerprintGenerator::new(Platform::Windows);
        let a = generator.generate("a", 7);
        let b = generator.generate("a", 7);

        assert_eq!(a.user_agent, b.user_agent);
        assert_eq!(a.gpu, b.gpu);
        assert_eq!(a.screen, b.screen);
        assert_eq!(a.viewport, b.viewport);
        assert_eq!(a.locale, b.locale);
        assert_eq!(a.hardware, b.hardware);
        assert_eq!(a.noise, b.noise);
    }

    #[test]
    fn test_different_seeds_change_noise() {
        let generator = FingerprintGenerator::new(Platform::Mac);
        let a = generator.generate("a", 1);
        let b = generator.generate("a", 2);
        assert_ne!(a.noise, b.noise);
    }

    #[test]
    fn test_generated_profiles_are_consistent() {
        for platform in Platform::ALL {
            let generator = FingerprintGenerator::new(platform);
            for seed in 0..200 {
                let profile = generator.generate("p", seed);
                let issues = profile.consistency_issues();
                assert!(issues.is_empty(), "{} seed {}: {:?}", platform, seed, issues);
            }
        }
    }

    #[test]
    fn test_region_pins_locale() {
        let profile = FingerprintGenerator::new(Platform::Windows)
            .with_region(Region::JP)
            .generate("jp", 3);

        assert_eq!(profile.region, Some(Region::JP));
        assert_eq!(profile.locale.timezone, "Asia/Tokyo");
        assert_eq!(profile.locale.languages[0], "ja-JP");
        assert_eq!(profile.locale.timezone_offset_minutes, -540);
    }

    #[test]
    fn test_timezone_pin() {
        let tz = find_timezone("America/Denver").unwrap();
        let profile = FingerprintGenerator::new(Platform::Mac)
            .with_timezone(tz)
            .generate("tz", 11);

        assert_eq!(profile.locale.timezone, "America/Denver");
        assert_eq!(profile.locale.timezone_offset_minutes, 420);
        assert_eq!(profile.locale.languages, vec!["en-US", "en"]);
    }

    #[test]
    fn test_tier_pin() {
        let profile = FingerprintGenerator::new(Platform::Linux)
            .with_tier(HardwareTier::Workstation)
            .generate("ws", 5);

        assert_eq!(profile.hardware.tier, HardwareTier::Workstation);
        assert!(profile.hardware.concurrency >= 16);
        assert_eq!(profile.hardware.device_memory_gb, 8);
    }

    #[test]
    fn test_detects_cross_platform_gpu() {
        let mut profile = FingerprintGenerator::new(Platform::Linux).generate("x", 9);
        let windows_gpu = WebGLProfile::NvidiaRtx3060;
        profile.gpu = GpuInfo {
            vendor: windows_gpu.vendor().to_string(),
            renderer: windows_gpu.renderer().to_string(),
        };

        let issues = profile.consistency_issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("windows"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let profile = FingerprintGenerator::new(Platform::Windows).generate("json", 1);
        let json = serde_json::to_value(&profile).unwrap();

        assert!(json.get("createdAt").is_some());
        assert!(json["screen"].get("availHeight").is_some());
        assert!(json["hardware"].get("deviceMemoryGB").is_some());
        assert!(json["noise"].get("canvasSeed").is_some());
        assert_eq!(json["platform"], "windows");
    }
}
