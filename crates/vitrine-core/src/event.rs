#![forbid(unsafe_code)]

//! Input events.
//!
//! Hosts translate native input (scroll, resize, keyboard, pointer, touch,
//! form control notifications) into [`Event`] values and feed them to the
//! application. Scroll and resize events carry no payload beyond what the
//! host has already written into its [`Dom`](crate::dom::Dom) state: the
//! controllers read `scroll_y()` and `viewport()` directly.

use bitflags::bitflags;

use crate::dom::ElementId;
use crate::geometry::Point;

bitflags! {
    /// Keyboard modifier state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const META  = 0b1000;
    }
}

/// Logical key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Tab,
    Enter,
    Char(char),
    Other,
}

impl KeyCode {
    /// Map a DOM `KeyboardEvent.key` string to a key code.
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            "Escape" | "Esc" => Self::Escape,
            "Tab" => Self::Tab,
            "Enter" => Self::Enter,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => Self::Other,
                }
            }
        }
    }
}

/// A key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create a key press with no modifiers.
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// Set the modifier state.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Tab with Shift held (backwards focus traversal).
    #[inline]
    pub fn is_shift_tab(&self) -> bool {
        self.code == KeyCode::Tab && self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// Phase of a single-finger touch gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// A touch sample for the primary touch point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub point: Point,
}

impl TouchEvent {
    pub const fn new(phase: TouchPhase, x: f64, y: f64) -> Self {
        Self {
            phase,
            point: Point::new(x, y),
        }
    }
}

/// Canonical input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The document scrolled; read `Dom::scroll_y`.
    Scroll,
    /// The viewport changed size; the host has already updated `Dom::viewport`.
    Resize,
    /// Keyboard input.
    Key(KeyEvent),
    /// Primary-button activation of an element.
    Click(ElementId),
    /// Touch input on the mobile menu surface.
    Touch(TouchEvent),
    /// A form control's value changed.
    Input(ElementId),
    /// A form control lost focus.
    Blur(ElementId),
    /// A form was submitted.
    Submit(ElementId),
}

/// What the host should do with the native event after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    /// Some controller consumed the event.
    pub handled: bool,
    /// The native default action (scroll, focus move, navigation) must be suppressed.
    pub prevent_default: bool,
}

impl EventOutcome {
    pub const IGNORED: Self = Self {
        handled: false,
        prevent_default: false,
    };

    pub const HANDLED: Self = Self {
        handled: true,
        prevent_default: false,
    };

    pub const PREVENT_DEFAULT: Self = Self {
        handled: true,
        prevent_default: true,
    };

    /// Combine outcomes from several controllers.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            handled: self.handled || other.handled,
            prevent_default: self.prevent_default || other.prevent_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_key_mapping() {
        assert_eq!(KeyCode::from_dom_key("Escape"), KeyCode::Escape);
        assert_eq!(KeyCode::from_dom_key("Esc"), KeyCode::Escape);
        assert_eq!(KeyCode::from_dom_key("Tab"), KeyCode::Tab);
        assert_eq!(KeyCode::from_dom_key("a"), KeyCode::Char('a'));
        assert_eq!(KeyCode::from_dom_key("ArrowUp"), KeyCode::Other);
    }

    #[test]
    fn shift_tab_detection() {
        let tab = KeyEvent::new(KeyCode::Tab);
        assert!(!tab.is_shift_tab());
        assert!(tab.with_modifiers(Modifiers::SHIFT).is_shift_tab());
        assert!(
            !KeyEvent::new(KeyCode::Enter)
                .with_modifiers(Modifiers::SHIFT)
                .is_shift_tab()
        );
    }

    #[test]
    fn outcome_merge_is_sticky() {
        let merged = EventOutcome::IGNORED
            .merge(EventOutcome::HANDLED)
            .merge(EventOutcome::IGNORED);
        assert_eq!(merged, EventOutcome::HANDLED);
        assert_eq!(
            EventOutcome::HANDLED.merge(EventOutcome::PREVENT_DEFAULT),
            EventOutcome::PREVENT_DEFAULT
        );
    }
}
