#![forbid(unsafe_code)]

//! Modal dialogs: element discovery, dismissal rules, and the single-slot
//! manager.
//!
//! # Animation
//!
//! Opening writes `scale(0.9)` on the content and `opacity: 0` on the root,
//! then transitions both to `scale(1)` / `1` on the next frame. Closing
//! reverses the transition and hides the root when it completes.
//!
//! # Focus
//!
//! - **Auto-focus**: the first focusable element in the content receives focus.
//! - **Focus trap**: Tab and Shift+Tab wrap within the content.
//! - **Focus restore**: the element focused before `open()` gets focus back.

mod container;
mod manager;

pub use container::{ModalAction, ModalConfig, ModalElements};
pub use manager::{ModalManager, ModalState};

use thiserror::Error;
use vitrine_core::DomError;

/// Modal manager errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModalError {
    /// A transition is running; the call was rejected.
    #[error("modal transition in progress")]
    Busy,
    #[error("no modal registered as `{0}`")]
    Unknown(String),
    #[error(transparent)]
    Dom(#[from] DomError),
}
