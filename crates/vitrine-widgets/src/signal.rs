#![forbid(unsafe_code)]

//! Typed cross-controller messages.
//!
//! Controllers never call their siblings. They push a [`Signal`] into the
//! outbox they are handed, and the application routes it: a nav-link click
//! closes the mobile menu, a successful form submission schedules the
//! enclosing modal to close, and so on.

use crate::voice::VoiceStatus;

/// A message published by a controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Scroll-spy settled on a new section.
    SectionChanged { section: String },
    /// A nav link was activated; the page is scrolling to `section`.
    NavigateRequested { section: String },
    /// The mobile menu finished opening (`true`) or started closing (`false`).
    MobileMenuChanged { open: bool },
    /// A modal became the active modal.
    ModalOpened { modal: String },
    /// A modal left the active slot.
    ModalClosed { modal: String },
    /// A form passed validation and is waiting for its network call.
    SubmitRequested { form: String },
    /// A form submission finished.
    FormSubmitted {
        form: String,
        success: bool,
        message: String,
    },
    /// The voice widget changed visual state.
    VoiceStatusChanged { status: VoiceStatus },
}

impl Signal {
    /// Stable event name, as used by DOM custom events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SectionChanged { .. } => "section-changed",
            Self::NavigateRequested { .. } => "navigate-requested",
            Self::MobileMenuChanged { .. } => "mobile-menu-changed",
            Self::ModalOpened { .. } => "modal-opened",
            Self::ModalClosed { .. } => "modal-closed",
            Self::SubmitRequested { .. } => "submit-requested",
            Self::FormSubmitted { .. } => "form-submitted",
            Self::VoiceStatusChanged { .. } => "voice-status-changed",
        }
    }
}

/// Collector handed to controllers during dispatch.
pub type Outbox = Vec<Signal>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_kebab_case() {
        let signals = [
            Signal::SectionChanged {
                section: "home".into(),
            },
            Signal::FormSubmitted {
                form: "newsletter".into(),
                success: true,
                message: String::new(),
            },
            Signal::VoiceStatusChanged {
                status: VoiceStatus::Idle,
            },
        ];
        for signal in signals {
            let name = signal.name();
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '-'));
        }
    }
}
