//! Fingerprint profiles and injection scripts
//!
//! This module generates consistent synthetic device identities and renders
//! them as a self-contained JavaScript override script. The script is only
//! produced here; running it inside a page is the page host's job.
//!
//! # Components
//!
//! - [`tables`] - Platform buckets, regions, timezones and hardware tiers
//! - [`webgl`] - GPU vendor/renderer strings per platform
//! - [`fingerprint`] - The profile value object and its generator
//! - [`navigator`] - `navigator.*` overrides
//! - [`manager`] - Profile storage, regeneration and active-profile handling
//!
//! # Example
//!
//! ```rust
//! use ki_browser_evasion::stealth::{FingerprintContext, FingerprintProfileManager};
//!
//! let mut manager = FingerprintProfileManager::with_seed(7);
//! let mut session = FingerprintContext::new();
//!
//! let profile = manager.create_profile(Some("windows"), Some("US")).unwrap();
//! manager.set_active(&mut session, &profile.id).unwrap();
//!
//! let script = manager.to_injection_script(&profile.id).unwrap();
//! assert!(script.contains("getTimezoneOffset"));
//! ```

pub mod fingerprint;
pub mod manager;
pub mod navigator;
pub mod tables;
pub mod webgl;

pub use fingerprint::{
    FingerprintGenerator, FingerprintProfile, GpuInfo, HardwareInfo, LocaleInfo, NoiseSeeds,
    ProfileSummary, ScreenInfo, Viewport,
};
pub use manager::{FingerprintContext, FingerprintOptions, FingerprintProfileManager, ProfileOptions};
pub use navigator::NavigatorOverrides;
pub use tables::{HardwareTier, Platform, Region};
pub use webgl::WebGLProfile;

use serde::Serialize;

/// Render a profile as an injectable override script.
///
/// The script is an IIFE covering navigator, screen, timezone, WebGL, canvas
/// and audio introspection points. Canvas and audio noise come from a
/// mulberry32 generator seeded with the profile's noise seeds and reseeded on
/// every read, so the same profile perturbs the same input identically.
pub fn to_injection_script(profile: &FingerprintProfile) -> String {
    let navigator = NavigatorOverrides::from_profile(profile).to_script();
    let webgl = webgl::webgl_override_script(&profile.gpu.vendor, &profile.gpu.renderer);

    format!(
        r#"// Fingerprint profile {id}
(function() {{
    'use strict';

    // === NAVIGATOR ===
{navigator}
    // === SCREEN ===
    const SCREEN = {{
        width: {screen_width},
        height: {screen_height},
        availWidth: {avail_width},
        availHeight: {avail_height},
        colorDepth: {color_depth},
        pixelDepth: {color_depth}
    }};
    for (const key of Object.keys(SCREEN)) {{
        try {{
            Object.defineProperty(Screen.prototype, key, {{
                get: function() {{ return SCREEN[key]; }},
                configurable: true
            }});
        }} catch (e) {{}}
    }}
    try {{
        Object.defineProperty(window, 'innerWidth', {{ get: () => {viewport_width}, configurable: true }});
        Object.defineProperty(window, 'innerHeight', {{ get: () => {viewport_height}, configurable: true }});
        Object.defineProperty(window, 'outerWidth', {{ get: () => {avail_width}, configurable: true }});
        Object.defineProperty(window, 'outerHeight', {{ get: () => {avail_height}, configurable: true }});
    }} catch (e) {{}}

    // === TIMEZONE ===
    const TIMEZONE = {timezone};
    const TIMEZONE_OFFSET = {timezone_offset};
    Date.prototype.getTimezoneOffset = function() {{ return TIMEZONE_OFFSET; }};
    const originalResolvedOptions = Intl.DateTimeFormat.prototype.resolvedOptions;
    Intl.DateTimeFormat.prototype.resolvedOptions = function() {{
        const options = originalResolvedOptions.call(this);
        options.timeZone = TIMEZONE;
        return options;
    }};

    // === WEBGL ===
{webgl}
    // === NOISE ===
    const mulberry32 = function(a) {{
        return function() {{
            a |= 0; a = a + 0x6D2B79F5 | 0;
            let t = Math.imul(a ^ a >>> 15, 1 | a);
            t = t + Math.imul(t ^ t >>> 7, 61 | t) ^ t;
            return ((t ^ t >>> 14) >>> 0) / 4294967296;
        }};
    }};
    const CANVAS_SEED = {canvas_seed};
    const AUDIO_SEED = {audio_seed};

    const noiseImageData = function(imageData) {{
        const next = mulberry32(CANVAS_SEED);
        const data = imageData.data;
        for (let i = 0; i < data.length; i += 4) {{
            if (data[i + 3] === 0) continue;
            if (next() < 0.05) {{
                const channel = i + Math.floor(next() * 3);
                data[channel] = data[channel] ^ 1;
            }}
        }}
        return imageData;
    }};

    const originalGetImageData = CanvasRenderingContext2D.prototype.getImageData;
    CanvasRenderingContext2D.prototype.getImageData = function() {{
        return noiseImageData(originalGetImageData.apply(this, arguments));
    }};

    const withNoisyCopy = function(canvas, action) {{
        try {{
            const ctx = canvas.getContext('2d');
            if (ctx && canvas.width > 0 && canvas.height > 0) {{
                const copy = document.createElement('canvas');
                copy.width = canvas.width;
                copy.height = canvas.height;
                const copyCtx = copy.getContext('2d');
                copyCtx.putImageData(ctx.getImageData(0, 0, canvas.width, canvas.height), 0, 0);
                return action(copy);
            }}
        }} catch (e) {{}}
        return action(canvas);
    }};

    const originalToDataURL = HTMLCanvasElement.prototype.toDataURL;
    HTMLCanvasElement.prototype.toDataURL = function() {{
        const args = arguments;
        return withNoisyCopy(this, (c) => originalToDataURL.apply(c, args));
    }};
    const originalToBlob = HTMLCanvasElement.prototype.toBlob;
    HTMLCanvasElement.prototype.toBlob = function() {{
        const args = arguments;
        return withNoisyCopy(this, (c) => originalToBlob.apply(c, args));
    }};

    const noiseSamples = function(samples) {{
        const next = mulberry32(AUDIO_SEED);
        for (let i = 0; i < samples.length; i += 100) {{
            samples[i] = samples[i] + (next() - 0.5) * 1e-7;
        }}
        return samples;
    }};
    if (typeof AudioBuffer !== 'undefined') {{
        const originalGetChannelData = AudioBuffer.prototype.getChannelData;
        AudioBuffer.prototype.getChannelData = function() {{
            return noiseSamples(originalGetChannelData.apply(this, arguments));
        }};
    }}
    if (typeof AnalyserNode !== 'undefined') {{
        const originalGetFloatFrequencyData = AnalyserNode.prototype.getFloatFrequencyData;
        AnalyserNode.prototype.getFloatFrequencyData = function(array) {{
            originalGetFloatFrequencyData.call(this, array);
            noiseSamples(array);
        }};
    }}
}})();
"#,
        id = comment_text(&profile.id),
        navigator = navigator,
        screen_width = profile.screen.width,
        screen_height = profile.screen.height,
        avail_width = profile.screen.avail_width,
        avail_height = profile.screen.avail_height,
        color_depth = profile.screen.color_depth,
        viewport_width = profile.viewport.width,
        viewport_height = profile.viewport.height,
        timezone = js_string(&profile.locale.timezone),
        timezone_offset = profile.locale.timezone_offset_minutes,
        webgl = webgl,
        canvas_seed = profile.noise.canvas_seed,
        audio_seed = profile.noise.audio_seed,
    )
}

/// Characters that terminate a line in JavaScript source
pub(crate) fn is_line_breaking(c: char) -> bool {
    c.is_control() || c == '\u{2028}' || c == '\u{2029}'
}

/// Text safe to place inside a `//` comment
fn comment_text(s: &str) -> String {
    s.chars()
        .map(|c| if is_line_breaking(c) { ' ' } else { c })
        .collect()
}

/// Quote a string as a JavaScript string literal
pub(crate) fn js_string(s: &str) -> String {
    escape_separators(serde_json::Value::String(s.to_string()).to_string())
}

/// Render any serializable value as a JavaScript literal
pub(crate) fn js_value<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .map(|v| escape_separators(v.to_string()))
        .unwrap_or_else(|_| "null".to_string())
}

/// JSON leaves U+2028 and U+2029 unescaped; older engines end a string there
fn escape_separators(json: String) -> String {
    if json.contains(['\u{2028}', '\u{2029}']) {
        json.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
    } else {
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_separators_cannot_leave_comment_or_string() {
        let mut p = profile(Platform::Linux, 3);
        p.id = "x\u{2028}alert(1)\u{2029}//\r\nmore".to_string();
        p.locale.timezone = "Europe/Berlin\u{2028}".to_string();
        let script = to_injection_script(&p);

        assert!(!script.contains('\u{2028}'));
        assert!(!script.contains('\u{2029}'));
        assert!(script.starts_with("// Fingerprint profile x alert(1) //  more\n(function() {"));
        assert!(script.contains(r#""Europe/Berlin\u2028""#));
    }

    fn profile(platform: Platform, seed: u64) -> FingerprintProfile {
        FingerprintGenerator::new(platform).generate("test-profile", seed)
    }

    #[test]
    fn test_script_is_iife() {
        let script = to_injection_script(&profile(Platform::Windows, 1));
        assert!(script.contains("(function() {"));
        assert!(script.trim_end().ends_with("})();"));
    }

    #[test]
    fn test_script_covers_introspection_points() {
        let p = profile(Platform::Linux, 8);
        let script = to_injection_script(&p);

        for needle in [
            "'webdriver', false",
            "Screen.prototype",
            "getTimezoneOffset",
            "resolvedOptions",
            "37446",
            "getImageData",
            "toDataURL",
            "getChannelData",
        ] {
            assert!(script.contains(needle), "missing {}", needle);
        }
        assert!(script.contains(&format!("CANVAS_SEED = {};", p.noise.canvas_seed)));
        assert!(script.contains(&format!("AUDIO_SEED = {};", p.noise.audio_seed)));
        assert!(script.contains(&p.gpu.renderer));
    }

    #[test]
    fn test_script_is_stable_per_profile() {
        let p = profile(Platform::Mac, 21);
        assert_eq!(to_injection_script(&p), to_injection_script(&p));
    }

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string("a\"b"), r#""a\"b""#);
        assert_eq!(js_string("line\nbreak"), r#""line\nbreak""#);
        assert_eq!(js_value(&vec!["en-US", "en"]), r#"["en-US","en"]"#);
    }
}
