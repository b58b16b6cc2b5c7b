#![forbid(unsafe_code)]

//! Single-slot modal manager.
//!
//! # Invariants
//!
//! - At most one modal occupies the active slot. Opening a different modal
//!   while one is open first runs the full close of the current one; the
//!   requested modal starts opening on the frame that close completes. At no
//!   point do two modals carry `aria-hidden="false"`.
//! - Calls overlapping a running transition fail with [`ModalError::Busy`].
//! - While a modal is visible the manager holds the page scroll lock under
//!   [`SCROLL_LOCK_OWNER`] and runs the focus trap. Both are released on
//!   every exit path, including [`ModalManager::force_close`] and failed
//!   DOM writes: release happens before any styling, and styling is applied
//!   best-effort with the first error reported afterwards.
//! - Focus captured at `open()` is restored exactly once, when the modal
//!   finishes closing.

use ahash::AHashMap;
use tracing::{debug, trace};
use vitrine_core::{Dom, DomError, ElementId, Event, EventOutcome, Instant, KeyCode};

use super::ModalError;
use super::container::{ModalAction, ModalConfig, ModalElements};
use crate::animation::{Transition, TransitionPhase, scale};
use crate::focus::{FocusRestore, FocusTrap};
use crate::signal::{Outbox, Signal};
use crate::{Controller, WidgetError, apply_all};

/// Scroll-lock owner tag used by the modal manager.
pub const SCROLL_LOCK_OWNER: &str = "modal";

/// Observable modal state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModalState {
    pub active_modal: Option<String>,
    pub previous_focus: Option<ElementId>,
    pub is_animating: bool,
}

#[derive(Debug)]
struct ActiveModal {
    id: String,
    elements: ModalElements,
    trap: FocusTrap,
    restore: FocusRestore,
}

/// Modal manager with a single active slot.
#[derive(Debug)]
pub struct ModalManager {
    config: ModalConfig,
    registry: AHashMap<String, ModalElements>,
    active: Option<ActiveModal>,
    phase: TransitionPhase,
    transition: Transition,
    /// Modal to open once the current one finishes closing.
    pending: Option<String>,
}

impl ModalManager {
    pub fn new(config: ModalConfig) -> Self {
        Self {
            transition: Transition::new(config.open_duration),
            config,
            registry: AHashMap::new(),
            active: None,
            phase: TransitionPhase::Closed,
            pending: None,
        }
    }

    /// Create a manager and register every modal element carrying an HTML id.
    pub fn attach(dom: &mut dyn Dom, config: ModalConfig) -> Result<Self, DomError> {
        let mut manager = Self::new(config);
        for el in dom.elements_with_class(&manager.config.modal_class) {
            if let Some(id) = dom.html_id(el) {
                manager.register(dom, &id)?;
            }
        }
        debug!(count = manager.registry.len(), "modals registered");
        Ok(manager)
    }

    /// Register the modal with HTML id `html_id` and write its hidden state.
    pub fn register(&mut self, dom: &mut dyn Dom, html_id: &str) -> Result<(), DomError> {
        let elements = ModalElements::discover(dom, html_id, &self.config)?;
        dom.set_attribute(elements.root, "role", "dialog")?;
        dom.set_attribute(elements.root, "aria-modal", "true")?;
        dom.set_attribute(elements.root, "aria-hidden", "true")?;
        self.registry.insert(html_id.to_string(), elements);
        Ok(())
    }

    pub fn config(&self) -> &ModalConfig {
        &self.config
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn state(&self) -> ModalState {
        ModalState {
            active_modal: self.active.as_ref().map(|a| a.id.clone()),
            previous_focus: self.active.as_ref().and_then(|a| a.restore.previous()),
            is_animating: self.phase.is_animating(),
        }
    }

    pub fn active_modal(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.id.as_str())
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.registry.contains_key(id)
    }

    /// The open modal containing `el`, if any.
    pub fn modal_containing(&self, dom: &dyn Dom, el: ElementId) -> Option<&str> {
        self.active
            .as_ref()
            .filter(|_| self.phase == TransitionPhase::Open)
            .filter(|a| dom.contains(a.elements.root, el))
            .map(|a| a.id.as_str())
    }

    /// Open modal `id`.
    ///
    /// If a different modal is open, it is closed first and `id` opens when
    /// that close completes. Opening the modal that is already open is a
    /// no-op.
    pub fn open(&mut self, dom: &mut dyn Dom, id: &str) -> Result<(), ModalError> {
        if !self.registry.contains_key(id) {
            return Err(ModalError::Unknown(id.to_string()));
        }
        if self.phase.is_animating() {
            return Err(ModalError::Busy);
        }
        match self.active.as_ref() {
            Some(active) if active.id == id => Ok(()),
            Some(active) => {
                debug!(from = %active.id, to = id, "swapping modals");
                self.pending = Some(id.to_string());
                self.begin_close(dom)
            }
            None => self.begin_open(dom, id),
        }
    }

    fn begin_open(&mut self, dom: &mut dyn Dom, id: &str) -> Result<(), ModalError> {
        let elements = self
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| ModalError::Unknown(id.to_string()))?;
        let restore = FocusRestore::capture(dom);
        let trap = FocusTrap::new(elements.content);
        let (root, content) = (elements.root, elements.content);

        // Slot and lock first, so a failed write below still leaves a modal
        // that `close`/`force_close` can tear down.
        self.active = Some(ActiveModal {
            id: id.to_string(),
            elements,
            trap,
            restore,
        });
        self.phase = TransitionPhase::Opening;
        self.transition = Transition::new(self.config.open_duration);
        dom.acquire_scroll_lock(SCROLL_LOCK_OWNER);
        debug!(modal = id, "modal opening");

        let css = Transition::new(self.config.open_duration).css(&["transform", "opacity"]);
        apply_all([
            dom.set_style(root, "display", "flex"),
            dom.add_class(root, &self.config.active_class),
            dom.set_style(root, "opacity", "0"),
            dom.set_style(content, "transform", &scale(self.config.start_scale)),
            dom.set_style(root, "transition", &css),
            dom.set_style(content, "transition", &css),
            dom.set_attribute(root, "aria-hidden", "false"),
            trap.focus_first(dom).map(|_| ()),
        ])?;
        Ok(())
    }

    /// Close the active modal. Returns `false` when nothing is active.
    pub fn close(&mut self, dom: &mut dyn Dom) -> Result<bool, ModalError> {
        if self.active.is_none() {
            return Ok(false);
        }
        if self.phase.is_animating() {
            return Err(ModalError::Busy);
        }
        self.begin_close(dom)?;
        Ok(true)
    }

    fn begin_close(&mut self, dom: &mut dyn Dom) -> Result<(), ModalError> {
        self.phase = TransitionPhase::Closing;
        self.transition = Transition::new(self.config.close_duration);
        let Some(active) = &self.active else {
            return Ok(());
        };
        debug!(modal = %active.id, "modal closing");
        let css = Transition::new(self.config.close_duration).css(&["transform", "opacity"]);
        apply_all([
            dom.set_style(active.elements.root, "transition", &css),
            dom.set_style(active.elements.content, "transition", &css),
        ])?;
        Ok(())
    }

    /// Hide the active modal and release scroll lock and focus.
    ///
    /// The release always happens; a failed hide is reported afterwards.
    fn finish_close(&mut self, dom: &mut dyn Dom, out: &mut Outbox) -> Result<(), DomError> {
        self.phase = TransitionPhase::Closed;
        let Some(mut active) = self.active.take() else {
            return Ok(());
        };
        dom.release_scroll_lock(SCROLL_LOCK_OWNER);
        let restored = active.restore.restore(dom);
        trace!(modal = %active.id, ?restored, "focus restored");

        let els = &active.elements;
        let hidden = apply_all([
            dom.set_style(els.root, "display", "none"),
            dom.remove_class(els.root, &self.config.active_class),
            dom.remove_style(els.root, "opacity"),
            dom.remove_style(els.content, "transform"),
            dom.set_attribute(els.root, "aria-hidden", "true"),
        ]);
        out.push(Signal::ModalClosed { modal: active.id });
        hidden
    }

    /// Tear down immediately regardless of phase. Used at shutdown.
    pub fn force_close(&mut self, dom: &mut dyn Dom, out: &mut Outbox) -> Result<(), DomError> {
        self.pending = None;
        if self.active.is_some() {
            debug!("modal force-closed");
        }
        self.finish_close(dom, out)
    }

    /// Advance the running transition.
    pub fn advance(
        &mut self,
        dom: &mut dyn Dom,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), ModalError> {
        let Some(active) = &self.active else {
            return Ok(());
        };
        let (root, content) = (active.elements.root, active.elements.content);
        match self.phase {
            // Phase changes never wait on a styling write, so a failed write
            // cannot strand the manager mid-transition.
            TransitionPhase::Opening => {
                let mut styled = Ok(());
                if self.transition.start(now) {
                    styled = apply_all([
                        dom.set_style(root, "opacity", "1"),
                        dom.set_style(content, "transform", &scale(1.0)),
                    ]);
                }
                if self.transition.is_complete(now) {
                    self.phase = TransitionPhase::Open;
                    let modal = active.id.clone();
                    debug!(modal = %modal, "modal open");
                    out.push(Signal::ModalOpened { modal });
                }
                styled?;
            }
            TransitionPhase::Closing => {
                let mut styled = Ok(());
                if self.transition.start(now) {
                    styled = apply_all([
                        dom.set_style(root, "opacity", "0"),
                        dom.set_style(content, "transform", &scale(self.config.start_scale)),
                    ]);
                }
                if self.transition.is_complete(now) {
                    let closed = self.finish_close(dom, out);
                    if let Some(next) = self.pending.take() {
                        self.begin_open(dom, &next)?;
                    }
                    closed?;
                }
                styled?;
            }
            TransitionPhase::Open | TransitionPhase::Closed => {}
        }
        Ok(())
    }

    fn dismiss(&mut self, dom: &mut dyn Dom, action: ModalAction) -> Result<EventOutcome, ModalError> {
        match self.close(dom) {
            Ok(_) => {
                trace!(?action, "modal dismissed");
                Ok(EventOutcome::HANDLED)
            }
            // Dismissals during a transition are dropped.
            Err(ModalError::Busy) => Ok(EventOutcome::HANDLED),
            Err(err) => Err(err),
        }
    }
}

impl Controller for ModalManager {
    fn name(&self) -> &'static str {
        "modal"
    }

    fn handle_event(
        &mut self,
        dom: &mut dyn Dom,
        event: &Event,
        _now: Instant,
        _out: &mut Outbox,
    ) -> Result<EventOutcome, WidgetError> {
        if let Event::Click(el) = event
            && let Some(target) = dom.attribute(*el, &self.config.trigger_attribute)
        {
            match self.open(dom, &target) {
                Ok(()) | Err(ModalError::Busy) => return Ok(EventOutcome::PREVENT_DEFAULT),
                Err(err) => return Err(err.into()),
            }
        }

        let Some(active) = &self.active else {
            return Ok(EventOutcome::IGNORED);
        };
        if let Event::Key(key) = event
            && key.code == KeyCode::Tab
        {
            let moved = active.trap.handle_key(dom, key)?;
            return Ok(if moved {
                EventOutcome::PREVENT_DEFAULT
            } else {
                EventOutcome::HANDLED
            });
        }
        match active.elements.classify(dom, event, &self.config) {
            Some(action) => Ok(self.dismiss(dom, action)?),
            None => Ok(EventOutcome::IGNORED),
        }
    }

    fn tick(&mut self, dom: &mut dyn Dom, now: Instant, out: &mut Outbox) -> Result<(), WidgetError> {
        self.advance(dom, now, out)?;
        Ok(())
    }
}
