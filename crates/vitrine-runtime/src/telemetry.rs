#![forbid(unsafe_code)]

//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::SiteError;

/// Default directive when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_FILTER: &str = "info";

/// Install a global subscriber: `EnvFilter` plus the fmt layer.
///
/// `filter` takes precedence over `RUST_LOG`; with neither set the level is
/// [`DEFAULT_FILTER`]. Fails if a global subscriber is already installed.
pub fn init_tracing(filter: Option<&str>) -> Result<(), SiteError> {
    let env_filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| SiteError::Telemetry(format!("invalid filter `{directives}`: {e}")))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| SiteError::Telemetry(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directive_is_reported() {
        let err = init_tracing(Some("vitrine=notalevel[")).unwrap_err();
        assert!(err.to_string().contains("invalid filter"));
    }
}
