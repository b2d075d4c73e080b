//! Navigator property overrides
//!
//! Renders the `navigator.*` part of the injection script from a profile.
//! `navigator.webdriver` is always reported as `false`; there is no
//! configuration that turns it on.

use crate::stealth::fingerprint::FingerprintProfile;
use crate::stealth::{js_string, js_value};

/// Navigator values derived from a [`FingerprintProfile`]
#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorOverrides {
    pub user_agent: String,
    pub app_version: String,
    pub platform: String,
    pub vendor: String,
    pub languages: Vec<String>,
    pub hardware_concurrency: u32,
    pub device_memory: u32,
    /// Desktop profiles have no touch screen
    pub max_touch_points: u32,
}

impl NavigatorOverrides {
    pub fn from_profile(profile: &FingerprintProfile) -> Self {
        Self {
            user_agent: profile.user_agent.clone(),
            app_version: app_version(&profile.user_agent),
            platform: profile.navigator_platform.clone(),
            vendor: profile.vendor.clone(),
            languages: profile.locale.languages.clone(),
            hardware_concurrency: profile.hardware.concurrency,
            device_memory: profile.hardware.device_memory_gb,
            max_touch_points: 0,
        }
    }

    /// Script fragment redefining the navigator getters
    pub fn to_script(&self) -> String {
        let language = self
            .languages
            .first()
            .map(String::as_str)
            .unwrap_or("en-US");

        format!(
            r#"
    const defineGetter = function(target, name, value) {{
        try {{
            Object.defineProperty(target, name, {{
                get: function() {{ return value; }},
                configurable: true,
                enumerable: true
            }});
        }} catch (e) {{}}
    }};
    defineGetter(Navigator.prototype, 'webdriver', false);
    defineGetter(navigator, 'webdriver', false);
    defineGetter(navigator, 'userAgent', {user_agent});
    defineGetter(navigator, 'appVersion', {app_version});
    defineGetter(navigator, 'platform', {platform});
    defineGetter(navigator, 'vendor', {vendor});
    defineGetter(navigator, 'languages', Object.freeze({languages}));
    defineGetter(navigator, 'language', {language});
    defineGetter(navigator, 'hardwareConcurrency', {hardware_concurrency});
    defineGetter(navigator, 'deviceMemory', {device_memory});
    defineGetter(navigator, 'maxTouchPoints', {max_touch_points});
    try {{
        delete window.cdc_adoQpoasnfa76pfcZLmcfl_Array;
        delete window.cdc_adoQpoasnfa76pfcZLmcfl_Promise;
        delete window.cdc_adoQpoasnfa76pfcZLmcfl_Symbol;
        delete window.__webdriver_evaluate;
        delete window.__selenium_unwrapped;
    }} catch (e) {{}}
"#,
            user_agent = js_string(&self.user_agent),
            app_version = js_string(&self.app_version),
            platform = js_string(&self.platform),
            vendor = js_string(&self.vendor),
            languages = js_value(&self.languages),
            language = js_string(language),
            hardware_concurrency = self.hardware_concurrency,
            device_memory = self.device_memory,
            max_touch_points = self.max_touch_points,
        )
    }
}

/// `navigator.appVersion` is the user agent without the `Mozilla/` prefix
fn app_version(user_agent: &str) -> String {
    user_agent
        .strip_prefix("Mozilla/")
        .unwrap_or(user_agent)
        .to_string()
}
