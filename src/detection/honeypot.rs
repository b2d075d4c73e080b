//! Honeypot form field detection
//!
//! Trap fields are hidden from humans but present in the DOM, so an
//! automated filler that completes every input gives itself away. Each
//! heuristic that fires on a field adds its weight to the field's score and
//! records a reason; the field is suspicious once the score reaches the
//! threshold.
//!
//! Weak signals (`tabindex=-1`, `aria-hidden`, `autocomplete=off`) are common
//! on legitimate fields and only count when a stronger signal fired too.

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Name/id fragments used by common honeypot implementations
static DEFAULT_TOKENS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "honeypot",
        "honey_pot",
        "trap",
        "confirm_email",
        "email_confirm",
        "winnie_the_pooh",
        "bot_check",
        "leave_blank",
        "leave_empty",
        "do_not_fill",
        "dont_fill",
        "nobots",
        "no_bots",
        "hp_field",
    ]
});

/// Rendered geometry of a field in CSS pixels
///
/// Each dimension is optional; a missing or unparseable one is not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub left: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub top: Option<f64>,
}

/// Computed style values relevant to visibility
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStyle {
    #[serde(default, deserialize_with = "lenient_string")]
    pub display: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub visibility: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub opacity: Option<f64>,
}

/// Description of one form field as extracted by the page host
///
/// Page hosts read most of these values from DOM attributes, so numbers and
/// booleans are also accepted as strings. A value of the wrong shape is
/// treated as absent rather than failing the whole descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Caller's handle for the field
    pub field_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// DOM `id` attribute
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub input_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_nested")]
    pub geometry: Option<FieldGeometry>,
    #[serde(default, deserialize_with = "lenient_style")]
    pub style: FieldStyle,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub tab_index: Option<i32>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub aria_hidden: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub autocomplete: Option<String>,
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches("px").trim_end().parse().ok(),
        _ => None,
    })
}

fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(value.and_then(|v| i32::try_from(v).ok()))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_nested<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

fn lenient_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FieldStyle, D::Error> {
    Ok(lenient_nested(deserializer)?.unwrap_or_default())
}

impl FieldDescriptor {
    pub fn new(field_id: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_geometry(mut self, width: f64, height: f64, left: f64, top: f64) -> Self {
        self.geometry = Some(FieldGeometry {
            width: Some(width),
            height: Some(height),
            left: Some(left),
            top: Some(top),
        });
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.style.display = Some(display.into());
        self
    }

    pub fn with_visibility(mut self, visibility: impl Into<String>) -> Self {
        self.style.visibility = Some(visibility.into());
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.style.opacity = Some(opacity);
        self
    }

    pub fn with_tab_index(mut self, tab_index: i32) -> Self {
        self.tab_index = Some(tab_index);
        self
    }
}

/// A heuristic that can fire on a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoneypotSignal {
    ZeroWidth,
    ZeroHeight,
    DisplayNone,
    VisibilityHidden,
    ZeroOpacity,
    OffScreen,
    HiddenType,
    SuspiciousName,
    NegativeTabIndex,
    AriaHidden,
    AutocompleteOff,
}

impl HoneypotSignal {
    /// Reason code reported in findings
    pub fn as_str(&self) -> &'static str {
        match self {
            HoneypotSignal::ZeroWidth => "zero_width",
            HoneypotSignal::ZeroHeight => "zero_height",
            HoneypotSignal::DisplayNone => "display_none",
            HoneypotSignal::VisibilityHidden => "visibility_hidden",
            HoneypotSignal::ZeroOpacity => "zero_opacity",
            HoneypotSignal::OffScreen => "off_screen",
            HoneypotSignal::HiddenType => "hidden_type",
            HoneypotSignal::SuspiciousName => "suspicious_name",
            HoneypotSignal::NegativeTabIndex => "negative_tabindex",
            HoneypotSignal::AriaHidden => "aria_hidden",
            HoneypotSignal::AutocompleteOff => "autocomplete_off",
        }
    }
}

/// Score contribution of each signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoneypotWeights {
    pub zero_width: f64,
    pub zero_height: f64,
    pub display_none: f64,
    pub visibility_hidden: f64,
    pub zero_opacity: f64,
    pub off_screen: f64,
    pub hidden_type: f64,
    pub suspicious_name: f64,
    pub negative_tabindex: f64,
    pub aria_hidden: f64,
    pub autocomplete_off: f64,
}

impl Default for HoneypotWeights {
    fn default() -> Self {
        Self {
            zero_width: 0.3,
            zero_height: 0.3,
            display_none: 0.6,
            visibility_hidden: 0.6,
            zero_opacity: 0.5,
            off_screen: 0.6,
            hidden_type: 0.6,
            suspicious_name: 0.5,
            negative_tabindex: 0.3,
            aria_hidden: 0.2,
            autocomplete_off: 0.1,
        }
    }
}

impl HoneypotWeights {
    pub fn weight(&self, signal: HoneypotSignal) -> f64 {
        match signal {
            HoneypotSignal::ZeroWidth => self.zero_width,
            HoneypotSignal::ZeroHeight => self.zero_height,
            HoneypotSignal::DisplayNone => self.display_none,
            HoneypotSignal::VisibilityHidden => self.visibility_hidden,
            HoneypotSignal::ZeroOpacity => self.zero_opacity,
            HoneypotSignal::OffScreen => self.off_screen,
            HoneypotSignal::HiddenType => self.hidden_type,
            HoneypotSignal::SuspiciousName => self.suspicious_name,
            HoneypotSignal::NegativeTabIndex => self.negative_tabindex,
            HoneypotSignal::AriaHidden => self.aria_hidden,
            HoneypotSignal::AutocompleteOff => self.autocomplete_off,
        }
    }
}

/// Detector thresholds and token list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoneypotConfig {
    /// Score at which a field is flagged
    pub threshold: f64,
    /// Width/height at or below this counts as zero
    pub min_dimension_px: f64,
    /// Opacity at or below this counts as invisible
    pub opacity_threshold: f64,
    /// `left`/`top` at or below this counts as off-screen
    pub off_screen_px: f64,
    /// Additional suspicious name fragments
    pub extra_tokens: Vec<String>,
    pub weights: HoneypotWeights,
}

impl Default for HoneypotConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_dimension_px: 1.0,
            opacity_threshold: 0.01,
            off_screen_px: -500.0,
            extra_tokens: Vec::new(),
            weights: HoneypotWeights::default(),
        }
    }
}

/// Verdict for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoneypotFinding {
    pub field_id: String,
    pub suspicious: bool,
    /// Reason code of every heuristic that fired
    pub reasons: Vec<String>,
    pub score: f64,
}

/// Heuristic trap-field classifier
#[derive(Debug, Clone)]
pub struct HoneypotDetector {
    config: HoneypotConfig,
    tokens: Vec<String>,
}

impl Default for HoneypotDetector {
    fn default() -> Self {
        Self::new(HoneypotConfig::default())
    }
}

impl HoneypotDetector {
    pub fn new(config: HoneypotConfig) -> Self {
        let tokens = DEFAULT_TOKENS
            .iter()
            .map(|t| t.to_string())
            .chain(config.extra_tokens.iter().map(|t| normalize(t)))
            .filter(|t| !t.is_empty())
            .collect();
        Self { config, tokens }
    }

    pub fn config(&self) -> &HoneypotConfig {
        &self.config
    }

    /// One finding per field, in input order
    pub fn evaluate(&self, fields: &[FieldDescriptor]) -> Vec<HoneypotFinding> {
        fields.iter().map(|f| self.evaluate_field(f)).collect()
    }

    /// Fields that are not suspicious
    pub fn filter(&self, fields: &[FieldDescriptor]) -> Vec<FieldDescriptor> {
        fields
            .iter()
            .filter(|f| !self.evaluate_field(f).suspicious)
            .cloned()
            .collect()
    }

    pub fn evaluate_field(&self, field: &FieldDescriptor) -> HoneypotFinding {
        let signals = self.signals(field);
        let weights = &self.config.weights;
        let score: f64 = signals.iter().map(|&s| weights.weight(s)).sum();
        let suspicious = score >= self.config.threshold;

        if suspicious {
            debug!(
                "Field {} flagged as honeypot (score {:.2}): {:?}",
                field.field_id, score, signals
            );
        }

        HoneypotFinding {
            field_id: field.field_id.clone(),
            suspicious,
            reasons: signals.iter().map(|s| s.as_str().to_string()).collect(),
            score,
        }
    }

    fn signals(&self, field: &FieldDescriptor) -> Vec<HoneypotSignal> {
        let mut signals = Vec::new();

        // Missing or malformed dimensions are no evidence either way.
        if let Some(geometry) = &field.geometry {
            let min = self.config.min_dimension_px;
            let off = self.config.off_screen_px;
            if finite(geometry.width).map_or(false, |w| w <= min) {
                signals.push(HoneypotSignal::ZeroWidth);
            }
            if finite(geometry.height).map_or(false, |h| h <= min) {
                signals.push(HoneypotSignal::ZeroHeight);
            }
            if [geometry.left, geometry.top]
                .into_iter()
                .filter_map(finite)
                .any(|edge| edge <= off)
            {
                signals.push(HoneypotSignal::OffScreen);
            }
        }

        if matches_value(&field.style.display, "none") {
            signals.push(HoneypotSignal::DisplayNone);
        }
        if matches_value(&field.style.visibility, "hidden")
            || matches_value(&field.style.visibility, "collapse")
        {
            signals.push(HoneypotSignal::VisibilityHidden);
        }
        if let Some(opacity) = finite(field.style.opacity) {
            if opacity <= self.config.opacity_threshold {
                signals.push(HoneypotSignal::ZeroOpacity);
            }
        }
        if matches_value(&field.input_type, "hidden") {
            signals.push(HoneypotSignal::HiddenType);
        }
        if self.has_suspicious_name(field) {
            signals.push(HoneypotSignal::SuspiciousName);
        }

        if !signals.is_empty() {
            if field.tab_index.map_or(false, |t| t < 0) {
                signals.push(HoneypotSignal::NegativeTabIndex);
            }
            if field.aria_hidden == Some(true) {
                signals.push(HoneypotSignal::AriaHidden);
            }
            if matches_value(&field.autocomplete, "off") {
                signals.push(HoneypotSignal::AutocompleteOff);
            }
        }

        signals
    }

    fn has_suspicious_name(&self, field: &FieldDescriptor) -> bool {
        [&field.name, &field.id]
            .into_iter()
            .flatten()
            .map(|value| normalize(value))
            .any(|value| self.tokens.iter().any(|token| value.contains(token.as_str())))
    }
}

/// Lowercase, with `-` and spaces folded into `_`
fn normalize(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
        .collect()
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn matches_value(value: &Option<String>, expected: &str) -> bool {
    value
        .as_deref()
        .map_or(false, |v| v.trim().eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_trap_has_all_reasons() {
        let field = FieldDescriptor::new("f1")
            .with_name("confirm_email")
            .with_geometry(0.0, 0.0, 10.0, 10.0)
            .with_display("none");

        let finding = HoneypotDetector::default().evaluate_field(&field);
        assert!(finding.suspicious);
        for reason in ["zero_width", "zero_height", "display_none", "suspicious_name"] {
            assert!(finding.reasons.contains(&reason.to_string()), "{}", reason);
        }
    }

    #[test]
    fn test_normal_field_passes() {
        let field = FieldDescriptor::new("email")
            .with_name("email")
            .with_geometry(240.0, 32.0, 100.0, 300.0)
            .with_display("block")
            .with_opacity(1.0);

        let finding = HoneypotDetector::default().evaluate_field(&field);
        assert!(!finding.suspicious);
        assert!(finding.reasons.is_empty());
        assert_eq!(finding.score, 0.0);
    }

    #[test]
    fn test_missing_geometry_not_suspicious() {
        let finding = HoneypotDetector::default().evaluate_field(&FieldDescriptor::new("bare"));
        assert!(!finding.suspicious);
        assert!(finding.reasons.is_empty());
    }

    #[test]
    fn test_nan_dimension_ignored() {
        let field = FieldDescriptor::new("nan").with_geometry(f64::NAN, 0.0, 0.0, 0.0);
        let finding = HoneypotDetector::default().evaluate_field(&field);
        assert_eq!(finding.reasons, vec!["zero_height"]);
        assert!(!finding.suspicious);
    }

    #[test]
    fn test_name_normalization() {
        let detector = HoneypotDetector::default();
        for name in ["Confirm-Email", "CONFIRM EMAIL", "user_honeypot_1", "Winnie-The-Pooh"] {
            let field = FieldDescriptor::new("x").with_name(name);
            assert!(detector.evaluate_field(&field).suspicious, "{}", name);
        }
    }

    #[test]
    fn test_dom_id_checked() {
        let mut field = FieldDescriptor::new("x");
        field.id = Some("hp_field_2".to_string());
        assert!(HoneypotDetector::default().evaluate_field(&field).suspicious);
    }

    #[test]
    fn test_weak_signals_alone_do_not_flag() {
        let mut field = FieldDescriptor::new("search").with_tab_index(-1);
        field.aria_hidden = Some(true);
        field.autocomplete = Some("off".to_string());

        let finding = HoneypotDetector::default().evaluate_field(&field);
        assert!(!finding.suspicious);
        assert!(finding.reasons.is_empty());
    }

    #[test]
    fn test_tabindex_combines_with_other_signal() {
        let field = FieldDescriptor::new("x")
            .with_geometry(0.5, 20.0, 0.0, 0.0)
            .with_tab_index(-1);

        let finding = HoneypotDetector::default().evaluate_field(&field);
        assert_eq!(finding.reasons, vec!["zero_width", "negative_tabindex"]);
        assert!(finding.suspicious);
    }

    #[test]
    fn test_off_screen() {
        let field = FieldDescriptor::new("x").with_geometry(200.0, 30.0, -9999.0, 10.0);
        let finding = HoneypotDetector::default().evaluate_field(&field);
        assert!(finding.suspicious);
        assert_eq!(finding.reasons, vec!["off_screen"]);
    }

    #[test]
    fn test_extra_tokens() {
        let config = HoneypotConfig {
            extra_tokens: vec!["Fax-Number".to_string()],
            ..Default::default()
        };
        let detector = HoneypotDetector::new(config);
        let field = FieldDescriptor::new("x").with_name("fax_number");
        assert!(detector.evaluate_field(&field).suspicious);
    }

    #[test]
    fn test_filter_keeps_only_clean_fields() {
        let fields = vec![
            FieldDescriptor::new("a").with_name("username"),
            FieldDescriptor::new("b").with_name("honeypot"),
            FieldDescriptor::new("c").with_visibility("hidden"),
            FieldDescriptor::new("d").with_opacity(0.0),
            FieldDescriptor::new("e").with_name("password"),
        ];
        let kept: Vec<String> = HoneypotDetector::default()
            .filter(&fields)
            .into_iter()
            .map(|f| f.field_id)
            .collect();
        assert_eq!(kept, vec!["a", "e"]);
    }

    #[test]
    fn test_deserialize_descriptor() {
        let json = r#"{
            "fieldId": "f9",
            "name": "website",
            "type": "text",
            "geometry": {"width": 0, "height": 0},
            "style": {"display": "none"},
            "tabIndex": -1
        }"#;
        let field: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(field.input_type.as_deref(), Some("text"));
        assert_eq!(field.geometry.unwrap().left, None);

        let finding = HoneypotDetector::default().evaluate_field(&field);
        assert!(finding.suspicious);
        assert!(finding.reasons.contains(&"negative_tabindex".to_string()));
    }

    #[test]
    fn test_attribute_strings_accepted() {
        let json = r#"{
            "fieldId": "f10",
            "geometry": {"width": "0px", "height": "0"},
            "style": {"opacity": "0"},
            "tabIndex": "-1",
            "ariaHidden": "true"
        }"#;
        let field: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(field.tab_index, Some(-1));
        assert_eq!(field.style.opacity, Some(0.0));
        assert_eq!(field.aria_hidden, Some(true));
        assert_eq!(field.geometry.unwrap().width, Some(0.0));

        let finding = HoneypotDetector::default().evaluate_field(&field);
        assert!(finding.suspicious);
        for reason in ["zero_width", "zero_height", "zero_opacity", "negative_tabindex"] {
            assert!(finding.reasons.contains(&reason.to_string()), "{}", reason);
        }
    }

    #[test]
    fn test_malformed_values_read_as_absent() {
        let json = r#"{
            "fieldId": "f11",
            "name": "email",
            "geometry": {"width": 240, "height": {"x": 1}, "left": "auto"},
            "style": "display:none",
            "tabIndex": "first",
            "ariaHidden": 1
        }"#;
        let field: FieldDescriptor = serde_json::from_str(json).unwrap();
        let geometry = field.geometry.unwrap();
        assert_eq!(geometry.width, Some(240.0));
        assert_eq!(geometry.height, None);
        assert_eq!(geometry.left, None);
        assert_eq!(field.style, FieldStyle::default());
        assert_eq!(field.tab_index, None);
        assert_eq!(field.aria_hidden, None);

        let finding = HoneypotDetector::default().evaluate_field(&field);
        assert!(finding.reasons.is_empty());
    }
}
