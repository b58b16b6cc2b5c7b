#![forbid(unsafe_code)]

//! Vitrine public facade.
//!
//! Re-exports the core primitives, the page controllers, and (with the
//! `runtime` feature) the application runtime. Most hosts only need
//! [`prelude`].

pub use vitrine_core as core;
#[cfg(feature = "runtime")]
pub use vitrine_runtime as runtime;
pub use vitrine_widgets as widgets;

pub use vitrine_core::{Document, Dom, DomError, ElementId, Event, EventOutcome, Instant};
pub use vitrine_widgets::{Controller, Signal, WidgetError};

#[cfg(feature = "runtime")]
pub use vitrine_runtime::{App, SiteConfig, SiteError};

/// Everything a host page binding typically needs.
pub mod prelude {
    pub use vitrine_core::{
        Bounds, Document, Dom, DomError, ElementId, Event, EventOutcome, Instant, KeyCode,
        KeyEvent, Modifiers, ScrollBehavior, TouchEvent, TouchPhase, Viewport,
    };
    pub use vitrine_widgets::{
        Controller, FormController, MobileMenuController, ModalManager, NavigationController,
        ScrollEffectsController, Signal, SubmitRequest, SubmitResponse, TransitionPhase,
        ValidationOutcome, VoiceEvent, VoiceStatus, VoiceWidget, WidgetError,
    };

    #[cfg(feature = "runtime")]
    pub use vitrine_runtime::{
        App, ApplicationState, DemoTransport, EventBus, SiteConfig, SiteError, Subscription,
        Transport, TransportError, init_tracing,
    };
    #[cfg(feature = "http")]
    pub use vitrine_runtime::HttpTransport;
}
