#![forbid(unsafe_code)]

//! Mobile menu controller.
//!
//! State machine: Closed → Opening → Open → Closing → Closed.
//!
//! # Invariants
//!
//! - `open()` and `close()` are no-ops while a transition is running or when
//!   the menu is already in the requested state. Nothing is queued.
//! - The overlay exists exactly while the menu is visible and not closing.
//! - The menu holds the page scroll lock (as [`SCROLL_LOCK_OWNER`]) from
//!   `open()` until `close()` starts. Holds by other owners are untouched.
//! - Phase and lock changes happen before any styling write, so a failed
//!   write never leaves the menu stuck mid-transition or the page locked.
//! - `aria-expanded` on the toggle and `aria-hidden` on the menu always
//!   reflect the logical state (open from `open()`, closed from `close()`).
//! - Switching to a desktop viewport while the menu is visible force-closes
//!   it without animation.
//!
//! # Gestures
//!
//! A horizontal swipe (|dx| > |dy|) on the open menu suppresses native
//! scrolling and drags the menu left with a proportional fade (at most 50%).
//! Releasing past `swipe_threshold` commits to close; otherwise the menu
//! snaps back.

use std::time::Duration;

use tracing::{debug, trace};
use vitrine_core::{
    Debounce, Dom, DomError, ElementId, Event, EventOutcome, Instant, KeyCode, Point, TouchEvent,
    TouchPhase,
};

use crate::animation::{
    Easing, Transition, TransitionPhase, fmt_num, translate_x_percent, translate_x_px,
};
use crate::focus::FocusTrap;
use crate::signal::{Outbox, Signal};
use crate::{Controller, WidgetError, apply_all};

/// Scroll-lock owner tag used by the mobile menu.
pub const SCROLL_LOCK_OWNER: &str = "mobile-menu";

/// Mobile menu configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MobileMenuConfig {
    pub duration: Duration,
    /// Leftward swipe distance that commits a close.
    pub swipe_threshold: f64,
    /// Viewports at or below this width are "mobile".
    pub breakpoint: f64,
    pub resize_debounce: Duration,
    /// Maximum opacity reduction while dragging.
    pub max_drag_fade: f64,
    /// Curve for the slide transition and the drag fade.
    pub easing: Easing,
    pub menu_id: String,
    pub toggle_id: String,
    pub overlay_class: String,
    pub open_class: String,
}

impl Default for MobileMenuConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(300),
            swipe_threshold: 50.0,
            breakpoint: 768.0,
            resize_debounce: Duration::from_millis(100),
            max_drag_fade: 0.5,
            easing: Easing::EaseOut,
            menu_id: "mobile-menu".to_string(),
            toggle_id: "mobile-menu-toggle".to_string(),
            overlay_class: "mobile-menu-overlay".to_string(),
            open_class: "open".to_string(),
        }
    }
}

/// Observable menu state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobileMenuState {
    pub is_open: bool,
    pub is_animating: bool,
    pub is_mobile: bool,
    pub touch_start: Option<Point>,
}

#[derive(Debug, Clone, Copy)]
struct Swipe {
    start: Point,
    dx: f64,
    tracking: bool,
}

/// Slide-in mobile menu.
#[derive(Debug)]
pub struct MobileMenuController {
    config: MobileMenuConfig,
    menu: ElementId,
    toggle: ElementId,
    trap: FocusTrap,
    phase: TransitionPhase,
    transition: Transition,
    overlay: Option<ElementId>,
    is_mobile: bool,
    swipe: Option<Swipe>,
    resize: Debounce,
}

impl MobileMenuController {
    /// Bind to the menu and its toggle button and write the closed state.
    pub fn attach(dom: &mut dyn Dom, config: MobileMenuConfig) -> Result<Self, DomError> {
        let menu = dom.require(&config.menu_id)?;
        let toggle = dom.require(&config.toggle_id)?;
        let is_mobile = dom.viewport().is_narrow(config.breakpoint);
        dom.set_attribute(toggle, "aria-controls", &config.menu_id)?;
        dom.set_attribute(toggle, "aria-expanded", "false")?;
        dom.set_attribute(menu, "aria-hidden", "true")?;
        debug!(is_mobile, "mobile menu attached");
        Ok(Self {
            transition: Transition::new(config.duration),
            resize: Debounce::new(config.resize_debounce),
            trap: FocusTrap::new(menu),
            config,
            menu,
            toggle,
            phase: TransitionPhase::Closed,
            overlay: None,
            is_mobile,
            swipe: None,
        })
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn state(&self) -> MobileMenuState {
        MobileMenuState {
            is_open: matches!(self.phase, TransitionPhase::Opening | TransitionPhase::Open),
            is_animating: self.phase.is_animating(),
            is_mobile: self.is_mobile,
            touch_start: self.swipe.map(|s| s.start),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open
    }

    pub fn overlay(&self) -> Option<ElementId> {
        self.overlay
    }

    /// Open if closed, close if open; no-op mid-transition.
    pub fn toggle(&mut self, dom: &mut dyn Dom, out: &mut Outbox) -> Result<bool, DomError> {
        match self.phase {
            TransitionPhase::Closed => self.open(dom),
            TransitionPhase::Open => self.close(dom, true, out),
            TransitionPhase::Opening | TransitionPhase::Closing => {
                trace!(phase = ?self.phase, "toggle ignored while animating");
                Ok(false)
            }
        }
    }

    /// Start the opening slide. Returns `false` when the call was a no-op.
    pub fn open(&mut self, dom: &mut dyn Dom) -> Result<bool, DomError> {
        if self.phase != TransitionPhase::Closed || !self.is_mobile {
            return Ok(false);
        }
        let menu = self.menu;
        let overlay = dom.create_element("div", None);
        self.overlay = Some(overlay);
        self.phase = TransitionPhase::Opening;
        self.transition = Transition::new(self.config.duration);
        dom.acquire_scroll_lock(SCROLL_LOCK_OWNER);
        debug!("mobile menu opening");

        apply_all([
            dom.set_style(menu, "display", "flex"),
            dom.set_style(menu, "transform", &translate_x_percent(-100.0)),
            dom.set_style(menu, "opacity", "0"),
            dom.set_style(menu, "transition", &self.transition_css()),
            dom.add_class(menu, &self.config.open_class),
            dom.add_class(overlay, &self.config.overlay_class),
            dom.set_attribute(overlay, "aria-hidden", "true"),
            self.trap.focus_first(dom).map(|_| ()),
            dom.set_attribute(self.toggle, "aria-expanded", "true"),
            dom.set_attribute(menu, "aria-hidden", "false"),
        ])?;
        Ok(true)
    }

    /// Close the menu. Returns `false` when the call was a no-op.
    pub fn close(
        &mut self,
        dom: &mut dyn Dom,
        animate: bool,
        out: &mut Outbox,
    ) -> Result<bool, DomError> {
        if self.phase != TransitionPhase::Open {
            return Ok(false);
        }
        self.begin_close(dom, animate, out)?;
        Ok(true)
    }

    fn begin_close(
        &mut self,
        dom: &mut dyn Dom,
        animate: bool,
        out: &mut Outbox,
    ) -> Result<(), DomError> {
        self.swipe = None;
        dom.release_scroll_lock(SCROLL_LOCK_OWNER);
        out.push(Signal::MobileMenuChanged { open: false });
        let focus_in_menu = dom
            .active_element()
            .is_some_and(|a| dom.contains(self.menu, a));
        let released = apply_all([
            self.overlay.take().map_or(Ok(()), |o| dom.remove_element(o)),
            dom.set_attribute(self.toggle, "aria-expanded", "false"),
            dom.set_attribute(self.menu, "aria-hidden", "true"),
            if focus_in_menu { dom.focus(self.toggle) } else { Ok(()) },
        ]);

        let hidden = if animate {
            self.phase = TransitionPhase::Closing;
            self.transition = Transition::new(self.config.duration);
            debug!("mobile menu closing");
            Ok(())
        } else {
            debug!("mobile menu closed without animation");
            self.finish_close(dom)
        };
        released.and(hidden)
    }

    fn finish_close(&mut self, dom: &mut dyn Dom) -> Result<(), DomError> {
        self.phase = TransitionPhase::Closed;
        let menu = self.menu;
        apply_all([
            dom.set_style(menu, "display", "none"),
            dom.remove_style(menu, "transform"),
            dom.remove_style(menu, "opacity"),
            dom.remove_class(menu, &self.config.open_class),
        ])
    }

    fn transition_css(&self) -> String {
        Transition::new(self.config.duration)
            .easing(self.config.easing)
            .css(&["transform", "opacity"])
    }

    /// Advance the slide transition and the resize debounce.
    pub fn advance(
        &mut self,
        dom: &mut dyn Dom,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), DomError> {
        match self.phase {
            TransitionPhase::Opening => {
                let mut styled = Ok(());
                if self.transition.start(now) {
                    styled = apply_all([
                        dom.set_style(self.menu, "transform", &translate_x_percent(0.0)),
                        dom.set_style(self.menu, "opacity", "1"),
                    ]);
                }
                if self.transition.is_complete(now) {
                    self.phase = TransitionPhase::Open;
                    out.push(Signal::MobileMenuChanged { open: true });
                    debug!("mobile menu open");
                }
                styled?;
            }
            TransitionPhase::Closing => {
                let mut styled = Ok(());
                if self.transition.start(now) {
                    styled = apply_all([
                        dom.set_style(self.menu, "transform", &translate_x_percent(-100.0)),
                        dom.set_style(self.menu, "opacity", "0"),
                    ]);
                }
                if self.transition.is_complete(now) {
                    debug!("mobile menu closed");
                    self.finish_close(dom)?;
                }
                styled?;
            }
            TransitionPhase::Open | TransitionPhase::Closed => {}
        }

        if self.resize.poll(now) {
            self.on_resize(dom, out)?;
        }
        Ok(())
    }

    /// Re-evaluate mobile mode after the resize debounce settles.
    fn on_resize(&mut self, dom: &mut dyn Dom, out: &mut Outbox) -> Result<(), DomError> {
        let was_mobile = self.is_mobile;
        self.is_mobile = dom.viewport().is_narrow(self.config.breakpoint);
        if was_mobile && !self.is_mobile && self.phase.is_visible() {
            debug!("switched to desktop; force-closing mobile menu");
            self.force_close(dom, out)?;
        }
        Ok(())
    }

    /// Close immediately from any phase, including mid-transition.
    pub fn force_close(&mut self, dom: &mut dyn Dom, out: &mut Outbox) -> Result<(), DomError> {
        match self.phase {
            TransitionPhase::Closed => Ok(()),
            TransitionPhase::Closing => self.finish_close(dom),
            TransitionPhase::Opening | TransitionPhase::Open => self.begin_close(dom, false, out),
        }
    }

    /// Feed a touch sample. Returns the outcome for the native event.
    pub fn handle_touch(
        &mut self,
        dom: &mut dyn Dom,
        touch: &TouchEvent,
        out: &mut Outbox,
    ) -> Result<EventOutcome, DomError> {
        match touch.phase {
            TouchPhase::Start => {
                if self.phase != TransitionPhase::Open {
                    return Ok(EventOutcome::IGNORED);
                }
                self.swipe = Some(Swipe {
                    start: touch.point,
                    dx: 0.0,
                    tracking: false,
                });
                Ok(EventOutcome::HANDLED)
            }
            TouchPhase::Move => {
                let Some(swipe) = self.swipe.as_mut() else {
                    return Ok(EventOutcome::IGNORED);
                };
                let dx = touch.point.x - swipe.start.x;
                let dy = touch.point.y - swipe.start.y;
                if dx.abs() <= dy.abs() {
                    return Ok(EventOutcome::HANDLED);
                }
                swipe.dx = dx;
                swipe.tracking = true;
                let offset = dx.min(0.0);
                let width = dom.viewport().width.max(1.0);
                let fade =
                    self.config.easing.apply(offset.abs() / width) * self.config.max_drag_fade;
                dom.set_style(self.menu, "transition", "none")?;
                dom.set_style(self.menu, "transform", &translate_x_px(offset))?;
                dom.set_style(self.menu, "opacity", &fmt_num(1.0 - fade))?;
                Ok(EventOutcome::PREVENT_DEFAULT)
            }
            TouchPhase::End | TouchPhase::Cancel => {
                let Some(swipe) = self.swipe.take() else {
                    return Ok(EventOutcome::IGNORED);
                };
                if !swipe.tracking {
                    return Ok(EventOutcome::HANDLED);
                }
                dom.set_style(self.menu, "transition", &self.transition_css())?;
                let commit =
                    touch.phase == TouchPhase::End && -swipe.dx > self.config.swipe_threshold;
                if commit {
                    debug!(dx = swipe.dx, "swipe committed close");
                    self.close(dom, true, out)?;
                } else {
                    dom.set_style(self.menu, "transform", &translate_x_percent(0.0))?;
                    dom.set_style(self.menu, "opacity", "1")?;
                }
                Ok(EventOutcome::HANDLED)
            }
        }
    }
}

impl Controller for MobileMenuController {
    fn name(&self) -> &'static str {
        "mobile-menu"
    }

    fn handle_event(
        &mut self,
        dom: &mut dyn Dom,
        event: &Event,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<EventOutcome, WidgetError> {
        let outcome = match event {
            Event::Click(el) if dom.contains(self.toggle, *el) => {
                self.toggle(dom, out)?;
                EventOutcome::PREVENT_DEFAULT
            }
            Event::Click(el) if self.overlay == Some(*el) => {
                self.close(dom, true, out)?;
                EventOutcome::HANDLED
            }
            Event::Key(key) if self.phase == TransitionPhase::Open => match key.code {
                KeyCode::Escape => {
                    self.close(dom, true, out)?;
                    EventOutcome::HANDLED
                }
                KeyCode::Tab => {
                    if self.trap.handle_key(dom, key)? {
                        EventOutcome::PREVENT_DEFAULT
                    } else {
                        EventOutcome::HANDLED
                    }
                }
                _ => EventOutcome::IGNORED,
            },
            Event::Touch(touch) => self.handle_touch(dom, touch, out)?,
            Event::Resize => {
                self.resize.trigger(now);
                EventOutcome::HANDLED
            }
            _ => EventOutcome::IGNORED,
        };
        Ok(outcome)
    }

    fn tick(&mut self, dom: &mut dyn Dom, now: Instant, out: &mut Outbox) -> Result<(), WidgetError> {
        self.advance(dom, now, out)?;
        Ok(())
    }
}
