#![forbid(unsafe_code)]

//! Modal element bundle, dismissal configuration, and event classification.

use std::time::Duration;

use vitrine_core::{Dom, DomError, ElementId, Event, KeyCode};

/// Dismissal detected by [`ModalElements::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAction {
    /// A close button was activated.
    Close,
    /// The backdrop itself (not the content) was clicked.
    BackdropClicked,
    /// Escape was pressed.
    EscapePressed,
}

/// Modal configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalConfig {
    pub close_on_backdrop: bool,
    pub close_on_escape: bool,
    pub open_duration: Duration,
    pub close_duration: Duration,
    /// Content scale at the start of the entrance.
    pub start_scale: f64,
    /// Delay before a modal whose form submitted successfully closes itself.
    pub auto_close_delay: Duration,
    pub modal_class: String,
    pub backdrop_class: String,
    pub content_class: String,
    pub close_class: String,
    pub active_class: String,
    /// Attribute on trigger elements naming the modal they open.
    pub trigger_attribute: String,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            close_on_backdrop: true,
            close_on_escape: true,
            open_duration: Duration::from_millis(300),
            close_duration: Duration::from_millis(300),
            start_scale: 0.9,
            auto_close_delay: Duration::from_secs(2),
            modal_class: "modal".to_string(),
            backdrop_class: "modal-backdrop".to_string(),
            content_class: "modal-content".to_string(),
            close_class: "modal-close".to_string(),
            active_class: "active".to_string(),
            trigger_attribute: "data-modal-open".to_string(),
        }
    }
}

impl ModalConfig {
    pub fn close_on_backdrop(mut self, close: bool) -> Self {
        self.close_on_backdrop = close;
        self
    }

    pub fn close_on_escape(mut self, close: bool) -> Self {
        self.close_on_escape = close;
        self
    }

    pub fn durations(mut self, open: Duration, close: Duration) -> Self {
        self.open_duration = open;
        self.close_duration = close;
        self
    }
}

/// Elements making up one registered modal.
///
/// Invariants:
/// - `backdrop` and `content` are `root` or descendants of it.
/// - When the markup has no dedicated backdrop, `root` acts as the backdrop,
///   so clicks on the content never count as backdrop clicks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalElements {
    pub root: ElementId,
    pub backdrop: ElementId,
    pub content: ElementId,
    pub close_buttons: Vec<ElementId>,
}

impl ModalElements {
    /// Discover the parts of the modal with HTML id `html_id`.
    pub fn discover(dom: &dyn Dom, html_id: &str, config: &ModalConfig) -> Result<Self, DomError> {
        let root = dom.require(html_id)?;
        let within = |class: &str| -> Vec<ElementId> {
            dom.elements_with_class(class)
                .into_iter()
                .filter(|&el| dom.contains(root, el))
                .collect()
        };
        Ok(Self {
            root,
            backdrop: within(&config.backdrop_class).first().copied().unwrap_or(root),
            content: within(&config.content_class).first().copied().unwrap_or(root),
            close_buttons: within(&config.close_class),
        })
    }

    /// Map an event to a dismissal action for this (open) modal.
    pub fn classify(&self, dom: &dyn Dom, event: &Event, config: &ModalConfig) -> Option<ModalAction> {
        match event {
            Event::Key(key) if key.code == KeyCode::Escape && config.close_on_escape => {
                Some(ModalAction::EscapePressed)
            }
            Event::Click(el) if self.close_buttons.iter().any(|&b| dom.contains(b, *el)) => {
                Some(ModalAction::Close)
            }
            Event::Click(el) if *el == self.backdrop && config.close_on_backdrop => {
                // A root-as-backdrop only counts when the click is outside the content.
                (self.backdrop != self.content).then_some(ModalAction::BackdropClicked)
            }
            _ => None,
        }
    }
}
