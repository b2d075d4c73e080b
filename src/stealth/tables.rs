//! Static lookup tables for fingerprint generation
//!
//! Every value a generated profile can take lives in one of these tables.
//! A [`PlatformBucket`] groups the user agents, GPUs, screens, locales and
//! hardware tiers that are plausible together for one operating system, and
//! profile generation never draws a field from a different bucket than the
//! profile's platform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EvasionError, EvasionResult};
use crate::stealth::webgl::WebGLProfile;

// ============================================================================
// Platform
// ============================================================================

/// Operating system family of a synthetic identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Mac,
    Linux,
}

impl Platform {
    /// All supported platforms, in the order used for uniform selection
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Mac, Platform::Linux];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Mac => "mac",
            Platform::Linux => "linux",
        }
    }

    /// Table of values that are consistent with this platform
    pub fn bucket(&self) -> &'static PlatformBucket {
        match self {
            Platform::Windows => &WINDOWS_BUCKET,
            Platform::Mac => &MAC_BUCKET,
            Platform::Linux => &LINUX_BUCKET,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = EvasionError;

    fn from_str(s: &str) -> EvasionResult<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" => Err(EvasionError::invalid("platform must not be empty")),
            "windows" | "win" | "win32" | "win64" => Ok(Platform::Windows),
            "mac" | "macos" | "osx" | "darwin" | "macintel" => Ok(Platform::Mac),
            "linux" | "x11" => Ok(Platform::Linux),
            _ => Err(EvasionError::InvalidPlatform(s.to_string())),
        }
    }
}

// ============================================================================
// Hardware tiers
// ============================================================================

/// Hardware class, drives `hardwareConcurrency` and `deviceMemory`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareTier {
    Low,
    Medium,
    High,
    Workstation,
}

impl HardwareTier {
    pub const ALL: [HardwareTier; 4] = [
        HardwareTier::Low,
        HardwareTier::Medium,
        HardwareTier::High,
        HardwareTier::Workstation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HardwareTier::Low => "low",
            HardwareTier::Medium => "medium",
            HardwareTier::High => "high",
            HardwareTier::Workstation => "workstation",
        }
    }

    /// Logical core counts reported for this tier
    pub fn concurrency_options(&self) -> &'static [u32] {
        match self {
            HardwareTier::Low => &[2, 4],
            HardwareTier::Medium => &[4, 6, 8],
            HardwareTier::High => &[8, 12, 16],
            HardwareTier::Workstation => &[16, 24, 32],
        }
    }

    /// `navigator.deviceMemory` values; browsers clamp the API to 8
    pub fn device_memory_options(&self) -> &'static [u32] {
        match self {
            HardwareTier::Low => &[2, 4],
            HardwareTier::Medium => &[4, 8],
            HardwareTier::High | HardwareTier::Workstation => &[8],
        }
    }
}

impl fmt::Display for HardwareTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HardwareTier {
    type Err = EvasionError;

    fn from_str(s: &str) -> EvasionResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(HardwareTier::Low),
            "medium" | "mid" => Ok(HardwareTier::Medium),
            "high" => Ok(HardwareTier::High),
            "workstation" => Ok(HardwareTier::Workstation),
            other => Err(EvasionError::invalid(format!(
                "unknown hardware tier '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Timezones and regions
// ============================================================================

/// IANA timezone with the value `Date.prototype.getTimezoneOffset` reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneEntry {
    pub name: &'static str,
    /// Minutes behind UTC (positive west of Greenwich), standard time.
    pub offset_minutes: i32,
}

pub static TIMEZONES: &[TimezoneEntry] = &[
    TimezoneEntry { name: "America/New_York", offset_minutes: 300 },
    TimezoneEntry { name: "America/Chicago", offset_minutes: 360 },
    TimezoneEntry { name: "America/Denver", offset_minutes: 420 },
    TimezoneEntry { name: "America/Los_Angeles", offset_minutes: 480 },
    TimezoneEntry { name: "Europe/London", offset_minutes: 0 },
    TimezoneEntry { name: "Europe/Berlin", offset_minutes: -60 },
    TimezoneEntry { name: "Europe/Paris", offset_minutes: -60 },
    TimezoneEntry { name: "Europe/Amsterdam", offset_minutes: -60 },
    TimezoneEntry { name: "Europe/Moscow", offset_minutes: -180 },
    TimezoneEntry { name: "Asia/Tokyo", offset_minutes: -540 },
    TimezoneEntry { name: "Asia/Shanghai", offset_minutes: -480 },
    TimezoneEntry { name: "Australia/Sydney", offset_minutes: -600 },
];

/// Look up a timezone by its IANA name (exact match)
pub fn find_timezone(name: &str) -> Option<&'static TimezoneEntry> {
    TIMEZONES.iter().find(|tz| tz.name == name)
}

/// Language preference list paired with a timezone where it is typical
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleEntry {
    pub languages: &'static [&'static str],
    pub timezone: &'static str,
}

const fn locale(languages: &'static [&'static str], timezone: &'static str) -> LocaleEntry {
    LocaleEntry { languages, timezone }
}

const EN_US: &[&str] = &["en-US", "en"];
const EN_GB: &[&str] = &["en-GB", "en"];
const DE_DE: &[&str] = &["de-DE", "de", "en-US", "en"];
const FR_FR: &[&str] = &["fr-FR", "fr", "en-US", "en"];
const NL_NL: &[&str] = &["nl-NL", "nl", "en-US", "en"];
const RU_RU: &[&str] = &["ru-RU", "ru", "en-US", "en"];
const JA_JP: &[&str] = &["ja-JP", "ja", "en-US", "en"];
const ZH_CN: &[&str] = &["zh-CN", "zh", "en"];
const EN_AU: &[&str] = &["en-AU", "en"];

/// Geographic region that pins locale and timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    US,
    UK,
    EU,
    RU,
    JP,
    CN,
    AU,
}

impl Region {
    pub const ALL: [Region; 7] = [
        Region::US,
        Region::UK,
        Region::EU,
        Region::RU,
        Region::JP,
        Region::CN,
        Region::AU,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::US => "US",
            Region::UK => "UK",
            Region::EU => "EU",
            Region::RU => "RU",
            Region::JP => "JP",
            Region::CN => "CN",
            Region::AU => "AU",
        }
    }

    /// Locale/timezone pairs a profile pinned to this region may take
    pub fn locales(&self) -> &'static [LocaleEntry] {
        match self {
            Region::US => US_LOCALES,
            Region::UK => UK_LOCALES,
            Region::EU => EU_LOCALES,
            Region::RU => RU_LOCALES,
            Region::JP => JP_LOCALES,
            Region::CN => CN_LOCALES,
            Region::AU => AU_LOCALES,
        }
    }
}

const US_LOCALES: &[LocaleEntry] = &[
    locale(EN_US, "America/New_York"),
    locale(EN_US, "America/Chicago"),
    locale(EN_US, "America/Denver"),
    locale(EN_US, "America/Los_Angeles"),
];
const UK_LOCALES: &[LocaleEntry] = &[locale(EN_GB, "Europe/London")];
const EU_LOCALES: &[LocaleEntry] = &[
    locale(DE_DE, "Europe/Berlin"),
    locale(FR_FR, "Europe/Paris"),
    locale(NL_NL, "Europe/Amsterdam"),
];
const RU_LOCALES: &[LocaleEntry] = &[locale(RU_RU, "Europe/Moscow")];
const JP_LOCALES: &[LocaleEntry] = &[locale(JA_JP, "Asia/Tokyo")];
const CN_LOCALES: &[LocaleEntry] = &[locale(ZH_CN, "Asia/Shanghai")];
const AU_LOCALES: &[LocaleEntry] = &[locale(EN_AU, "Australia/Sydney")];

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = EvasionError;

    fn from_str(s: &str) -> EvasionResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(Region::US),
            "UK" | "GB" => Ok(Region::UK),
            "EU" => Ok(Region::EU),
            "RU" => Ok(Region::RU),
            "JP" => Ok(Region::JP),
            "CN" => Ok(Region::CN),
            "AU" => Ok(Region::AU),
            "" => Err(EvasionError::invalid("region must not be empty")),
            other => Err(EvasionError::invalid(format!("unknown region '{}'", other))),
        }
    }
}

// ============================================================================
// Platform buckets
// ============================================================================

/// Physical screen size available on a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

const fn screen(width: u32, height: u32) -> ScreenSize {
    ScreenSize { width, height }
}

/// Everything a profile of one platform may be built from
#[derive(Debug)]
pub struct PlatformBucket {
    pub platform: Platform,
    /// `navigator.platform`
    pub navigator_platform: &'static str,
    /// `navigator.vendor`
    pub vendor: &'static str,
    pub user_agents: &'static [&'static str],
    pub gpus: &'static [WebGLProfile],
    pub screens: &'static [ScreenSize],
    /// Vertical pixels taken by the taskbar, dock or panel
    pub reserved_height: u32,
    pub color_depths: &'static [u32],
    pub locales: &'static [LocaleEntry],
    /// Weighted by repetition
    pub tiers: &'static [HardwareTier],
}

impl PlatformBucket {
    /// Whether a timezone is one this platform's default locales use
    pub fn has_timezone(&self, timezone: &str) -> bool {
        self.locales.iter().any(|l| l.timezone == timezone)
    }
}

pub static WINDOWS_BUCKET: PlatformBucket = PlatformBucket {
    platform: Platform::Windows,
    navigator_platform: "Win32",
    vendor: "Google Inc.",
    user_agents: &[
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.0.0",
    ],
    gpus: &[
        WebGLProfile::NvidiaGtx1660,
        WebGLProfile::NvidiaRtx3060,
        WebGLProfile::NvidiaRtx3080,
        WebGLProfile::NvidiaRtx4070,
        WebGLProfile::AmdRx580,
        WebGLProfile::AmdRx6700Xt,
        WebGLProfile::IntelUhd630,
        WebGLProfile::IntelIrisXe,
    ],
    screens: &[
        screen(1920, 1080),
        screen(2560, 1440),
        screen(1366, 768),
        screen(1536, 864),
        screen(1600, 900),
        screen(3840, 2160),
    ],
    reserved_height: 40,
    color_depths: &[24],
    locales: &[
        locale(EN_US, "America/New_York"),
        locale(EN_US, "America/Chicago"),
        locale(EN_US, "America/Los_Angeles"),
        locale(EN_GB, "Europe/London"),
        locale(DE_DE, "Europe/Berlin"),
    ],
    tiers: &[
        HardwareTier::Low,
        HardwareTier::Medium,
        HardwareTier::Medium,
        HardwareTier::Medium,
        HardwareTier::High,
        HardwareTier::High,
        HardwareTier::Workstation,
    ],
};

pub static MAC_BUCKET: PlatformBucket = PlatformBucket {
    platform: Platform::Mac,
    navigator_platform: "MacIntel",
    vendor: "Google Inc.",
    user_agents: &[
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    ],
    gpus: &[
        WebGLProfile::AppleM1,
        WebGLProfile::AppleM2,
        WebGLProfile::AppleM3,
        WebGLProfile::MacIntelIrisPlus655,
        WebGLProfile::MacRadeonPro5500M,
    ],
    screens: &[
        screen(1440, 900),
        screen(1512, 982),
        screen(1680, 1050),
        screen(1728, 1117),
        screen(2560, 1440),
    ],
    reserved_height: 25,
    color_depths: &[24, 30],
    locales: &[
        locale(EN_US, "America/Los_Angeles"),
        locale(EN_US, "America/New_York"),
        locale(EN_GB, "Europe/London"),
        locale(FR_FR, "Europe/Paris"),
        locale(JA_JP, "Asia/Tokyo"),
    ],
    tiers: &[HardwareTier::Medium, HardwareTier::High, HardwareTier::High],
};

pub static LINUX_BUCKET: PlatformBucket = PlatformBucket {
    platform: Platform::Linux,
    navigator_platform: "Linux x86_64",
    vendor: "Google Inc.",
    user_agents: &[
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    ],
    gpus: &[
        WebGLProfile::LinuxMesaUhd630,
        WebGLProfile::LinuxMesaIrisXe,
        WebGLProfile::LinuxNvidiaRtx3060,
        WebGLProfile::LinuxRadeonRx6700Xt,
    ],
    screens: &[
        screen(1920, 1080),
        screen(2560, 1440),
        screen(1366, 768),
        screen(1600, 900),
        screen(3840, 2160),
    ],
    reserved_height: 27,
    color_depths: &[24],
    locales: &[
        locale(EN_US, "America/New_York"),
        locale(EN_US, "America/Denver"),
        locale(DE_DE, "Europe/Berlin"),
        locale(EN_GB, "Europe/London"),
        locale(RU_RU, "Europe/Moscow"),
    ],
    tiers: &[
        HardwareTier::Low,
        HardwareTier::Medium,
        HardwareTier::Medium,
        HardwareTier::High,
        HardwareTier::Workstation,
    ],
};
