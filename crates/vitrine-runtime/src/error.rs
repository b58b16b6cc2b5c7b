#![forbid(unsafe_code)]

//! Runtime error taxonomy.
//!
//! - Validation failures are values ([`vitrine_widgets::ValidationOutcome`]),
//!   never errors.
//! - [`TransportError`]s end up as form banners; they never escape
//!   [`crate::App`].
//! - [`CapabilityError`]s select the simulated voice client at startup.
//! - [`SiteError`] is what `App::init` and the config loader return.

use std::path::PathBuf;

use thiserror::Error;
use vitrine_core::DomError;
use vitrine_widgets::{FormError, WidgetError};

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failure of a network call made on behalf of a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network request failed: {0}")]
    Network(String),
    #[error("server returned status {status} without a readable body")]
    Status { status: u16 },
    #[error("could not decode server response: {0}")]
    Decode(String),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// A vendor capability could not be loaded or started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("capability `{0}` is not available")]
    Unavailable(&'static str),
    #[error("capability `{name}` failed to start: {reason}")]
    StartFailed { name: &'static str, reason: String },
}

/// Umbrella error for the runtime.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error(transparent)]
    Widget(#[from] WidgetError),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("tracing subscriber: {0}")]
    Telemetry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        let err = SiteError::from(TransportError::Status { status: 502 });
        assert_eq!(
            err.to_string(),
            "server returned status 502 without a readable body"
        );
        let err = SiteError::from(ConfigError::Invalid {
            field: "scroll_fx.root_margin",
            reason: "must be in [0, 0.5)".into(),
        });
        assert!(err.to_string().contains("scroll_fx.root_margin"));
    }
}
