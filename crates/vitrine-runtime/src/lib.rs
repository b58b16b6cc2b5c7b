#![forbid(unsafe_code)]

//! Application runtime for Vitrine.
//!
//! - [`app`]: the root [`App`] context, event dispatch and signal routing.
//! - [`bus`]: typed publish/subscribe for [`Signal`](vitrine_widgets::Signal)s.
//! - [`config`]: [`SiteConfig`], loaded from TOML.
//! - [`api`]: the form [`Transport`] (HTTP or local demo).
//! - [`capability`]: live or simulated voice client selection.
//! - [`readiness`]: the startup [`ReadinessBarrier`].
//! - [`telemetry`]: tracing subscriber setup.
//! - [`error`]: the runtime error taxonomy.

pub mod api;
pub mod app;
pub mod bus;
pub mod capability;
pub mod config;
pub mod error;
pub mod readiness;
pub mod telemetry;

pub use api::{DemoTransport, HealthStatus, Transport};
#[cfg(feature = "http")]
pub use api::HttpTransport;
pub use app::{App, AppBuilder, ApplicationState};
pub use bus::{EventBus, Subscription, SubscriptionScope};
pub use capability::{SimulatedVoice, VoiceCapability, VoiceClient, VoiceLoader};
pub use config::SiteConfig;
pub use error::{CapabilityError, ConfigError, SiteError, TransportError};
pub use readiness::{Modules, ReadinessBarrier};
pub use telemetry::init_tracing;
