#![forbid(unsafe_code)]

//! Focus trap and focus restoration.
//!
//! A [`FocusTrap`] constrains Tab traversal to the focusable descendants of
//! one container: Tab on the last element wraps to the first, Shift+Tab on
//! the first wraps to the last. Focus that has escaped the container is
//! pulled back on the next Tab.
//!
//! [`FocusRestore`] captures the element focused before an overlay opened
//! and gives it back exactly once.

use vitrine_core::{Dom, DomError, ElementId, KeyCode, KeyEvent};

/// Tab-wrapping focus trap for a container element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTrap {
    container: ElementId,
}

impl FocusTrap {
    pub const fn new(container: ElementId) -> Self {
        Self { container }
    }

    pub fn container(&self) -> ElementId {
        self.container
    }

    /// Focus the first focusable element in the container.
    ///
    /// Returns the focused element, or `None` if nothing is focusable.
    pub fn focus_first(&self, dom: &mut dyn Dom) -> Result<Option<ElementId>, DomError> {
        match dom.focusable_within(self.container).first().copied() {
            Some(first) => {
                dom.focus(first)?;
                Ok(Some(first))
            }
            None => Ok(None),
        }
    }

    /// Handle a key press. Returns `true` when the trap moved focus itself,
    /// in which case the host must suppress the native Tab behavior.
    pub fn handle_key(&self, dom: &mut dyn Dom, key: &KeyEvent) -> Result<bool, DomError> {
        if key.code != KeyCode::Tab {
            return Ok(false);
        }
        let focusable = dom.focusable_within(self.container);
        let (Some(&first), Some(&last)) = (focusable.first(), focusable.last()) else {
            return Ok(false);
        };
        let active = dom.active_element();
        let inside = active.is_some_and(|a| dom.contains(self.container, a) && a != self.container);

        let target = if !inside {
            Some(if key.is_shift_tab() { last } else { first })
        } else if key.is_shift_tab() && active == Some(first) {
            Some(last)
        } else if !key.is_shift_tab() && active == Some(last) {
            Some(first)
        } else {
            None
        };

        match target {
            Some(el) => {
                dom.focus(el)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Single-use handle to the element that had focus before an overlay opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusRestore {
    previous: Option<ElementId>,
}

impl FocusRestore {
    /// Record the currently focused element.
    pub fn capture(dom: &dyn Dom) -> Self {
        Self {
            previous: dom.active_element(),
        }
    }

    pub fn previous(&self) -> Option<ElementId> {
        self.previous
    }

    /// Give focus back. A second call is a no-op. Elements removed in the
    /// meantime are skipped.
    pub fn restore(&mut self, dom: &mut dyn Dom) -> Option<ElementId> {
        let previous = self.previous.take()?;
        if dom.exists(previous) && dom.focus(previous).is_ok() {
            Some(previous)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vitrine_core::{Document, Modifiers};

    fn tab() -> KeyEvent {
        KeyEvent::new(KeyCode::Tab)
    }

    fn shift_tab() -> KeyEvent {
        KeyEvent::new(KeyCode::Tab).with_modifiers(Modifiers::SHIFT)
    }

    fn fixture(n: usize) -> (Document, ElementId, Vec<ElementId>, ElementId) {
        let mut doc = Document::default();
        let outside = doc.create_element("button", None);
        let container = doc.create_element("div", None);
        let items = (0..n)
            .map(|_| doc.create_element("button", Some(container)))
            .collect();
        (doc, container, items, outside)
    }

    #[test]
    fn tab_wraps_last_to_first() {
        let (mut doc, container, items, _) = fixture(3);
        let trap = FocusTrap::new(container);
        doc.focus(items[2]).unwrap();
        assert!(trap.handle_key(&mut doc, &tab()).unwrap());
        assert_eq!(doc.active_element(), Some(items[0]));
    }

    #[test]
    fn shift_tab_wraps_first_to_last() {
        let (mut doc, container, items, _) = fixture(3);
        let trap = FocusTrap::new(container);
        doc.focus(items[0]).unwrap();
        assert!(trap.handle_key(&mut doc, &shift_tab()).unwrap());
        assert_eq!(doc.active_element(), Some(items[2]));
    }

    #[test]
    fn tab_in_middle_is_native() {
        let (mut doc, container, items, _) = fixture(3);
        let trap = FocusTrap::new(container);
        doc.focus(items[1]).unwrap();
        assert!(!trap.handle_key(&mut doc, &tab()).unwrap());
        assert_eq!(doc.active_element(), Some(items[1]));
    }

    #[test]
    fn escaped_focus_is_pulled_back() {
        let (mut doc, container, items, outside) = fixture(2);
        let trap = FocusTrap::new(container);
        doc.focus(outside).unwrap();
        assert!(trap.handle_key(&mut doc, &tab()).unwrap());
        assert_eq!(doc.active_element(), Some(items[0]));
    }

    #[test]
    fn non_tab_keys_ignored() {
        let (mut doc, container, items, _) = fixture(2);
        doc.focus(items[1]).unwrap();
        let trap = FocusTrap::new(container);
        assert!(
            !trap
                .handle_key(&mut doc, &KeyEvent::new(KeyCode::Enter))
                .unwrap()
        );
    }

    #[test]
    fn restore_happens_once() {
        let (mut doc, _, items, outside) = fixture(2);
        doc.focus(outside).unwrap();
        let mut restore = FocusRestore::capture(&doc);
        doc.focus(items[1]).unwrap();
        assert_eq!(restore.restore(&mut doc), Some(outside));
        assert_eq!(doc.active_element(), Some(outside));
        doc.focus(items[0]).unwrap();
        assert_eq!(restore.restore(&mut doc), None);
        assert_eq!(doc.active_element(), Some(items[0]));
    }

    proptest! {
        #[test]
        fn tab_cycles_stay_inside(n in 1usize..8, presses in proptest::collection::vec(any::<bool>(), 1..40)) {
            let (mut doc, container, items, _) = fixture(n);
            let trap = FocusTrap::new(container);
            trap.focus_first(&mut doc).unwrap();
            for shift in presses {
                let key = if shift { shift_tab() } else { tab() };
                if !trap.handle_key(&mut doc, &key).unwrap() {
                    // Emulate the native move to the adjacent element.
                    let active = doc.active_element().unwrap();
                    let idx = items.iter().position(|&e| e == active).unwrap();
                    let next = if shift { idx - 1 } else { idx + 1 };
                    doc.focus(items[next]).unwrap();
                }
                let active = doc.active_element().unwrap();
                prop_assert!(items.contains(&active));
            }
        }
    }
}
