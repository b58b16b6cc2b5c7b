#![forbid(unsafe_code)]

//! Site configuration.
//!
//! Every section is optional in the TOML source and every field defaults to
//! the controller defaults, so an empty file is a valid configuration.
//! Durations are written as integer milliseconds.
//!
//! ```toml
//! [navigation]
//! scroll_threshold = 50.0
//! spy_interval_ms = 100
//!
//! [modal]
//! auto_close_delay_ms = 2000
//!
//! [api]
//! base_url = "https://example.com"
//! demo_mode = false
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vitrine_widgets::{
    FormConfig, MobileMenuConfig, ModalConfig, NavigationConfig, ScrollFxConfig,
};

use crate::error::ConfigError;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn as_ms(value: Duration) -> u64 {
    u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationSection {
    pub scroll_threshold: f64,
    pub section_offset: f64,
    pub probe_padding: f64,
    pub spy_interval_ms: u64,
    pub home_section: String,
}

impl Default for NavigationSection {
    fn default() -> Self {
        let d = NavigationConfig::default();
        Self {
            scroll_threshold: d.scroll_threshold,
            section_offset: d.section_offset,
            probe_padding: d.probe_padding,
            spy_interval_ms: as_ms(d.spy_interval),
            home_section: d.home_section,
        }
    }
}

impl NavigationSection {
    pub fn to_config(&self) -> NavigationConfig {
        NavigationConfig {
            scroll_threshold: self.scroll_threshold,
            section_offset: self.section_offset,
            probe_padding: self.probe_padding,
            spy_interval: ms(self.spy_interval_ms),
            home_section: self.home_section.clone(),
            ..NavigationConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollFxSection {
    pub parallax_rate: f64,
    pub mobile_breakpoint: f64,
    pub root_margin: f64,
    pub stagger_step_ms: u64,
}

impl Default for ScrollFxSection {
    fn default() -> Self {
        let d = ScrollFxConfig::default();
        Self {
            parallax_rate: d.parallax_rate,
            mobile_breakpoint: d.mobile_breakpoint,
            root_margin: d.root_margin,
            stagger_step_ms: as_ms(d.stagger_step),
        }
    }
}

impl ScrollFxSection {
    pub fn to_config(&self) -> ScrollFxConfig {
        ScrollFxConfig {
            parallax_rate: self.parallax_rate,
            mobile_breakpoint: self.mobile_breakpoint,
            root_margin: self.root_margin,
            stagger_step: ms(self.stagger_step_ms),
            ..ScrollFxConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobileMenuSection {
    pub duration_ms: u64,
    pub swipe_threshold: f64,
    pub breakpoint: f64,
    pub resize_debounce_ms: u64,
}

impl Default for MobileMenuSection {
    fn default() -> Self {
        let d = MobileMenuConfig::default();
        Self {
            duration_ms: as_ms(d.duration),
            swipe_threshold: d.swipe_threshold,
            breakpoint: d.breakpoint,
            resize_debounce_ms: as_ms(d.resize_debounce),
        }
    }
}

impl MobileMenuSection {
    pub fn to_config(&self) -> MobileMenuConfig {
        MobileMenuConfig {
            duration: ms(self.duration_ms),
            swipe_threshold: self.swipe_threshold,
            breakpoint: self.breakpoint,
            resize_debounce: ms(self.resize_debounce_ms),
            ..MobileMenuConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalSection {
    pub close_on_backdrop: bool,
    pub close_on_escape: bool,
    pub open_duration_ms: u64,
    pub close_duration_ms: u64,
    pub start_scale: f64,
    pub auto_close_delay_ms: u64,
}

impl Default for ModalSection {
    fn default() -> Self {
        let d = ModalConfig::default();
        Self {
            close_on_backdrop: d.close_on_backdrop,
            close_on_escape: d.close_on_escape,
            open_duration_ms: as_ms(d.open_duration),
            close_duration_ms: as_ms(d.close_duration),
            start_scale: d.start_scale,
            auto_close_delay_ms: as_ms(d.auto_close_delay),
        }
    }
}

impl ModalSection {
    pub fn to_config(&self) -> ModalConfig {
        ModalConfig {
            start_scale: self.start_scale,
            auto_close_delay: ms(self.auto_close_delay_ms),
            ..ModalConfig::default()
        }
        .close_on_backdrop(self.close_on_backdrop)
        .close_on_escape(self.close_on_escape)
        .durations(ms(self.open_duration_ms), ms(self.close_duration_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsSection {
    pub validate_on_input: bool,
    pub input_debounce_ms: u64,
    pub submitting_label: String,
    pub generic_error: String,
    pub success_fallback: String,
}

impl Default for FormsSection {
    fn default() -> Self {
        let d = FormConfig::default();
        Self {
            validate_on_input: d.validate_on_input,
            input_debounce_ms: as_ms(d.input_debounce),
            submitting_label: d.submitting_label,
            generic_error: d.generic_error,
            success_fallback: d.success_fallback,
        }
    }
}

impl FormsSection {
    pub fn to_config(&self) -> FormConfig {
        FormConfig {
            validate_on_input: self.validate_on_input,
            input_debounce: ms(self.input_debounce_ms),
            submitting_label: self.submitting_label.clone(),
            generic_error: self.generic_error.clone(),
            success_fallback: self.success_fallback.clone(),
            ..FormConfig::default()
        }
    }
}

/// Where form submissions go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Prefix for the `/api/...` endpoint paths. Empty means same origin.
    pub base_url: String,
    pub timeout_ms: u64,
    /// Answer every submission locally with a canned success.
    pub demo_mode: bool,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 10_000,
            demo_mode: false,
        }
    }
}

impl ApiSection {
    pub fn timeout(&self) -> Duration {
        ms(self.timeout_ms)
    }
}

/// Voice assistant capability settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSection {
    pub enabled: bool,
    pub public_key: String,
    pub assistant_id: String,
    /// Force the simulated client even when credentials are present.
    pub simulate: bool,
}

impl VoiceSection {
    /// Whether a live client could be started with these settings.
    pub fn has_credentials(&self) -> bool {
        !self.public_key.trim().is_empty() && !self.assistant_id.trim().is_empty()
    }
}

/// Complete site configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub navigation: NavigationSection,
    pub scroll_fx: ScrollFxSection,
    pub mobile_menu: MobileMenuSection,
    pub modal: ModalSection,
    pub forms: FormsSection,
    pub api: ApiSection,
    pub voice: VoiceSection,
}

impl SiteConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), "loaded site config");
        Ok(config)
    }

    /// Reject values the controllers cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        if !(0.0..0.5).contains(&self.scroll_fx.root_margin) {
            return invalid("scroll_fx.root_margin", "must be in [0, 0.5)");
        }
        if !(self.modal.start_scale > 0.0 && self.modal.start_scale <= 1.0) {
            return invalid("modal.start_scale", "must be in (0, 1]");
        }
        if self.mobile_menu.swipe_threshold <= 0.0 {
            return invalid("mobile_menu.swipe_threshold", "must be positive");
        }
        if self.navigation.scroll_threshold < 0.0 {
            return invalid("navigation.scroll_threshold", "must not be negative");
        }
        if self.navigation.home_section.trim().is_empty() {
            return invalid("navigation.home_section", "must not be empty");
        }
        if self.api.timeout_ms == 0 {
            return invalid("api.timeout_ms", "must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_document_is_default() {
        let config = SiteConfig::from_toml_str("").unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.navigation.to_config(), NavigationConfig::default());
        assert_eq!(config.modal.to_config(), ModalConfig::default());
        assert_eq!(config.forms.to_config(), FormConfig::default());
        assert_eq!(config.mobile_menu.to_config(), MobileMenuConfig::default());
        assert_eq!(config.scroll_fx.to_config(), ScrollFxConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = SiteConfig::from_toml_str(
            r#"
            [modal]
            auto_close_delay_ms = 500
            close_on_backdrop = false

            [api]
            demo_mode = true
            "#,
        )
        .unwrap();
        let modal = config.modal.to_config();
        assert_eq!(modal.auto_close_delay, Duration::from_millis(500));
        assert!(!modal.close_on_backdrop);
        assert!(modal.close_on_escape);
        assert!(config.api.demo_mode);
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = SiteConfig::from_toml_str("[scroll_fx]\nroot_margin = 0.7\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "scroll_fx.root_margin",
                ..
            }
        ));
        let err = SiteConfig::from_toml_str("[api]\ntimeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "api.timeout_ms", .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SiteConfig::from_toml_str("[navigation\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[voice]\nenabled = true\npublic_key = \"pk\"\nassistant_id = \"a1\"").unwrap();
        let config = SiteConfig::load(file.path()).unwrap();
        assert!(config.voice.enabled);
        assert!(config.voice.has_credentials());

        let missing = file.path().with_extension("missing");
        let err = SiteConfig::load(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { path, .. } if path == missing));
    }
}
