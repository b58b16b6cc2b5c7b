#![forbid(unsafe_code)]

//! Page controllers for Vitrine.
//!
//! Each controller owns one concern of the page (navigation, scroll effects,
//! mobile menu, modals, forms, voice widget) and talks to the document only
//! through [`vitrine_core::Dom`]. Controllers never reference each other;
//! cross-cutting effects travel as [`Signal`]s through the outbox handed to
//! every call.

pub mod animation;
pub mod focus;
pub mod form;
pub mod mobile_menu;
pub mod modal;
pub mod navigation;
pub mod scroll_fx;
pub mod signal;
pub mod voice;

pub use animation::{ClassAnimator, EffectId, Easing, Transition, TransitionPhase};
pub use focus::{FocusRestore, FocusTrap};
pub use form::{
    FieldRule, FormConfig, FormController, FormError, FormKind, RuleSet, SubmitRequest,
    SubmitResponse, ValidationOutcome,
};
pub use mobile_menu::{MobileMenuConfig, MobileMenuController, MobileMenuState};
pub use modal::{ModalAction, ModalConfig, ModalError, ModalManager, ModalState};
pub use navigation::{NavigationConfig, NavigationController, NavigationState};
pub use scroll_fx::{ScrollEffectsController, ScrollFxConfig};
pub use signal::{Outbox, Signal};
pub use voice::{VoiceCommand, VoiceEvent, VoiceStatus, VoiceWidget, VoiceWidgetConfig};

use thiserror::Error;
use vitrine_core::{Dom, DomError, Event, EventOutcome, Instant};

/// Error raised by a controller call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error(transparent)]
    Modal(#[from] ModalError),
    #[error(transparent)]
    Form(#[from] FormError),
}

/// Run every DOM write in order, then report the first failure.
///
/// Teardown paths use this so that one missing element cannot skip the
/// writes after it.
pub(crate) fn apply_all<const N: usize>(
    writes: [Result<(), DomError>; N],
) -> Result<(), DomError> {
    writes.into_iter().collect()
}

/// A page controller.
///
/// `handle_event` reacts to a host event; `tick` runs once per animation
/// frame and advances transitions, debounces, and frame-gated work.
pub trait Controller {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    fn handle_event(
        &mut self,
        dom: &mut dyn Dom,
        event: &Event,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<EventOutcome, WidgetError>;

    fn tick(&mut self, dom: &mut dyn Dom, now: Instant, out: &mut Outbox) -> Result<(), WidgetError> {
        let _ = (dom, now, out);
        Ok(())
    }
}
