#![forbid(unsafe_code)]

//! Voice-assistant status widget.
//!
//! The widget never talks to a voice vendor. It turns lifecycle
//! [`VoiceEvent`]s (from a live client or a simulated one) into button
//! classes, `aria-pressed`, and status text, and queues a [`VoiceCommand`]
//! when the user clicks the button.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vitrine_core::{Dom, DomError, ElementId, Event, EventOutcome, Instant};

use crate::signal::{Outbox, Signal};
use crate::{Controller, WidgetError};

/// Lifecycle event emitted by a voice client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum VoiceEvent {
    CallStart,
    CallEnd,
    SpeechStart,
    SpeechEnd,
    Message(String),
    Error(String),
}

/// Visual state of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoiceStatus {
    #[default]
    Idle,
    Connecting,
    Listening,
    Speaking,
    Error,
}

impl VoiceStatus {
    /// A call is starting or running.
    pub fn in_call(self) -> bool {
        matches!(self, Self::Connecting | Self::Listening | Self::Speaking)
    }
}

/// What the user asked the voice client to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceWidgetConfig {
    pub button_id: String,
    pub status_id: String,
    pub transcript_id: String,
    pub active_class: String,
    pub connecting_class: String,
    pub speaking_class: String,
    pub error_class: String,
    pub idle_text: String,
    pub connecting_text: String,
    pub listening_text: String,
    pub speaking_text: String,
    pub error_text: String,
}

impl Default for VoiceWidgetConfig {
    fn default() -> Self {
        Self {
            button_id: "voice-button".to_string(),
            status_id: "voice-status".to_string(),
            transcript_id: "voice-transcript".to_string(),
            active_class: "active".to_string(),
            connecting_class: "connecting".to_string(),
            speaking_class: "speaking".to_string(),
            error_class: "error".to_string(),
            idle_text: "Talk to our AI assistant".to_string(),
            connecting_text: "Connecting...".to_string(),
            listening_text: "Listening...".to_string(),
            speaking_text: "Assistant is speaking...".to_string(),
            error_text: "Voice assistant unavailable. Please try again.".to_string(),
        }
    }
}

/// Button + status line for the voice assistant.
#[derive(Debug)]
pub struct VoiceWidget {
    config: VoiceWidgetConfig,
    button: ElementId,
    status_el: Option<ElementId>,
    transcript: Option<ElementId>,
    status: VoiceStatus,
    last_error: Option<String>,
    commands: Vec<VoiceCommand>,
}

impl VoiceWidget {
    /// Bind to the voice button; the status and transcript elements are optional.
    pub fn attach(dom: &mut dyn Dom, config: VoiceWidgetConfig) -> Result<Self, DomError> {
        let button = dom.require(&config.button_id)?;
        let widget = Self {
            status_el: dom.element_by_id(&config.status_id),
            transcript: dom.element_by_id(&config.transcript_id),
            config,
            button,
            status: VoiceStatus::Idle,
            last_error: None,
            commands: Vec::new(),
        };
        widget.render(dom)?;
        Ok(widget)
    }

    pub fn status(&self) -> VoiceStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Commands queued by button clicks since the last call.
    pub fn take_commands(&mut self) -> Vec<VoiceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Reflect a client event.
    pub fn apply(&mut self, dom: &mut dyn Dom, event: &VoiceEvent, out: &mut Outbox) -> Result<(), DomError> {
        let next = match event {
            VoiceEvent::CallStart => VoiceStatus::Listening,
            VoiceEvent::SpeechStart => VoiceStatus::Speaking,
            VoiceEvent::SpeechEnd if self.status.in_call() => VoiceStatus::Listening,
            VoiceEvent::SpeechEnd => self.status,
            VoiceEvent::CallEnd => VoiceStatus::Idle,
            VoiceEvent::Error(message) => {
                self.last_error = Some(message.clone());
                VoiceStatus::Error
            }
            VoiceEvent::Message(text) => {
                if let Some(transcript) = self.transcript {
                    dom.set_text(transcript, text)?;
                }
                self.status
            }
        };
        self.set_status(dom, next, out)
    }

    fn set_status(&mut self, dom: &mut dyn Dom, next: VoiceStatus, out: &mut Outbox) -> Result<(), DomError> {
        if next == self.status {
            return Ok(());
        }
        debug!(from = ?self.status, to = ?next, "voice status");
        self.status = next;
        self.render(dom)?;
        out.push(Signal::VoiceStatusChanged { status: next });
        Ok(())
    }

    fn render(&self, dom: &mut dyn Dom) -> Result<(), DomError> {
        let c = &self.config;
        let s = self.status;
        dom.toggle_class(self.button, &c.active_class, matches!(s, VoiceStatus::Listening | VoiceStatus::Speaking))?;
        dom.toggle_class(self.button, &c.connecting_class, s == VoiceStatus::Connecting)?;
        dom.toggle_class(self.button, &c.speaking_class, s == VoiceStatus::Speaking)?;
        dom.toggle_class(self.button, &c.error_class, s == VoiceStatus::Error)?;
        dom.set_attribute(self.button, "aria-pressed", if s.in_call() { "true" } else { "false" })?;
        if let Some(status_el) = self.status_el {
            let text = match s {
                VoiceStatus::Idle => &c.idle_text,
                VoiceStatus::Connecting => &c.connecting_text,
                VoiceStatus::Listening => &c.listening_text,
                VoiceStatus::Speaking => &c.speaking_text,
                VoiceStatus::Error => &c.error_text,
            };
            dom.set_text(status_el, text)?;
        }
        Ok(())
    }
}

impl Controller for VoiceWidget {
    fn name(&self) -> &'static str {
        "voice"
    }

    fn handle_event(
        &mut self,
        dom: &mut dyn Dom,
        event: &Event,
        _now: Instant,
        out: &mut Outbox,
    ) -> Result<EventOutcome, WidgetError> {
        let Event::Click(el) = event else {
            return Ok(EventOutcome::IGNORED);
        };
        if !dom.contains(self.button, *el) {
            return Ok(EventOutcome::IGNORED);
        }
        match self.status {
            VoiceStatus::Idle | VoiceStatus::Error => {
                self.last_error = None;
                self.commands.push(VoiceCommand::Start);
                self.set_status(dom, VoiceStatus::Connecting, out)?;
            }
            VoiceStatus::Listening | VoiceStatus::Speaking => {
                self.commands.push(VoiceCommand::Stop);
            }
            // Second click while connecting is dropped.
            VoiceStatus::Connecting => {}
        }
        Ok(EventOutcome::PREVENT_DEFAULT)
    }
}
