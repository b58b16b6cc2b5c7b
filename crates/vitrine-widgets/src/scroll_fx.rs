#![forbid(unsafe_code)]

//! Parallax and reveal-on-scroll.
//!
//! Scroll events only raise a [`FrameGate`] flag; the work runs once per
//! frame in `tick`. Any number of scroll events between two frames produce a
//! single parallax write and a single reveal pass.
//!
//! Reveal uses a trigger band shrunk by `root_margin` (a fraction of the
//! viewport height) at the top and bottom. Each observed element is revealed
//! at most once and then dropped from observation. Elements revealed in the
//! same pass get staggered `transition-delay`s by their index in that pass.

use std::time::Duration;

use tracing::trace;
use vitrine_core::{Dom, DomError, ElementId, Event, EventOutcome, FrameGate, Instant};

use crate::animation::{stagger_classes, translate_y_px};
use crate::signal::Outbox;
use crate::{Controller, WidgetError};

/// Scroll-effects configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollFxConfig {
    /// Background drift per scrolled pixel (negative drifts slower than content).
    pub parallax_rate: f64,
    /// Parallax is disabled at or below this viewport width.
    pub mobile_breakpoint: f64,
    /// Fraction of the viewport height trimmed from each end of the reveal band.
    pub root_margin: f64,
    pub stagger_step: Duration,
    pub parallax_class: String,
    pub reveal_class: String,
    pub revealed_class: String,
}

impl Default for ScrollFxConfig {
    fn default() -> Self {
        Self {
            parallax_rate: -0.5,
            mobile_breakpoint: 768.0,
            root_margin: 0.1,
            stagger_step: Duration::from_millis(100),
            parallax_class: "parallax-bg".to_string(),
            reveal_class: "reveal".to_string(),
            revealed_class: "animate-in".to_string(),
        }
    }
}

/// Parallax and reveal controller.
#[derive(Debug)]
pub struct ScrollEffectsController {
    config: ScrollFxConfig,
    parallax: Vec<ElementId>,
    observed: Vec<ElementId>,
    gate: FrameGate,
}

impl ScrollEffectsController {
    /// Bind to parallax layers and reveal targets present in `dom`.
    pub fn attach(dom: &dyn Dom, config: ScrollFxConfig) -> Self {
        Self {
            parallax: dom.elements_with_class(&config.parallax_class),
            observed: dom.elements_with_class(&config.reveal_class),
            gate: FrameGate::new(),
            config,
        }
    }

    /// Elements still waiting to be revealed.
    pub fn observed(&self) -> &[ElementId] {
        &self.observed
    }

    /// Whether a frame update is pending.
    pub fn is_ticking(&self) -> bool {
        self.gate.is_ticking()
    }

    /// Start observing an element added after attach.
    pub fn observe(&mut self, el: ElementId) {
        if !self.observed.contains(&el) {
            self.observed.push(el);
        }
    }

    /// Request a frame update. Returns `true` if this request scheduled it.
    pub fn request_frame(&mut self) -> bool {
        self.gate.request()
    }

    /// Apply the parallax offset, or clear it on narrow viewports.
    pub fn update_parallax(&self, dom: &mut dyn Dom) -> Result<(), DomError> {
        let disabled = dom.viewport().is_narrow(self.config.mobile_breakpoint);
        let transform = if disabled {
            "none".to_string()
        } else {
            translate_y_px(dom.scroll_y() * self.config.parallax_rate)
        };
        for &el in &self.parallax {
            dom.set_style(el, "transform", &transform)?;
        }
        Ok(())
    }

    /// Reveal observed elements intersecting the trigger band.
    ///
    /// Returns the elements revealed in this pass, in stagger order.
    pub fn reveal_pass(&mut self, dom: &mut dyn Dom) -> Result<Vec<ElementId>, DomError> {
        let height = dom.viewport().height;
        let margin = height * self.config.root_margin;
        let start = dom.scroll_y() + margin;
        let end = dom.scroll_y() + height - margin;

        let (visible, pending): (Vec<ElementId>, Vec<ElementId>) = self
            .observed
            .iter()
            .copied()
            .partition(|&el| dom.bounds(el).is_some_and(|b| b.intersects(start, end)));
        self.observed = pending;
        // Removed elements can never reveal; stop observing them too.
        self.observed.retain(|&el| dom.exists(el));
        stagger_classes(dom, &visible, &self.config.revealed_class, self.config.stagger_step)?;
        if !visible.is_empty() {
            trace!(count = visible.len(), "revealed elements");
        }
        Ok(visible)
    }

    /// Run the pending frame update, if any.
    pub fn run_frame(&mut self, dom: &mut dyn Dom) -> Result<bool, DomError> {
        if !self.gate.take() {
            return Ok(false);
        }
        self.update_parallax(dom)?;
        self.reveal_pass(dom)?;
        Ok(true)
    }
}

impl Controller for ScrollEffectsController {
    fn name(&self) -> &'static str {
        "scroll-fx"
    }

    fn handle_event(
        &mut self,
        _dom: &mut dyn Dom,
        event: &Event,
        _now: Instant,
        _out: &mut Outbox,
    ) -> Result<EventOutcome, WidgetError> {
        match event {
            Event::Scroll | Event::Resize => {
                self.request_frame();
                Ok(EventOutcome::HANDLED)
            }
            _ => Ok(EventOutcome::IGNORED),
        }
    }

    fn tick(
        &mut self,
        dom: &mut dyn Dom,
        _now: Instant,
        _out: &mut Outbox,
    ) -> Result<(), WidgetError> {
        self.run_frame(dom)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vitrine_core::{Bounds, Document, Viewport};

    fn page(width: f64) -> (Document, ElementId, Vec<ElementId>) {
        let mut doc = Document::new(Viewport::new(width, 1000.0));
        let bg = doc.create_element("div", None);
        doc.add_class(bg, "parallax-bg").unwrap();
        let cards = [50.0, 400.0, 850.0, 1500.0, 2600.0]
            .into_iter()
            .map(|top| {
                let el = doc.create_element("div", None);
                doc.add_class(el, "reveal").unwrap();
                doc.set_bounds(el, Bounds::new(top, 100.0));
                el
            })
            .collect();
        (doc, bg, cards)
    }

    #[test]
    fn parallax_drifts_at_rate() {
        let (mut doc, bg, _) = page(1280.0);
        let fx = ScrollEffectsController::attach(&doc, ScrollFxConfig::default());
        doc.set_scroll_y(200.0);
        fx.update_parallax(&mut doc).unwrap();
        assert_eq!(doc.style(bg, "transform").as_deref(), Some("translateY(-100px)"));
    }

    #[test]
    fn parallax_resets_on_mobile() {
        let (mut doc, bg, _) = page(1280.0);
        let fx = ScrollEffectsController::attach(&doc, ScrollFxConfig::default());
        doc.set_scroll_y(200.0);
        fx.update_parallax(&mut doc).unwrap();
        doc.set_viewport(Viewport::new(768.0, 1000.0));
        fx.update_parallax(&mut doc).unwrap();
        assert_eq!(doc.style(bg, "transform").as_deref(), Some("none"));
    }

    #[test]
    fn reveal_band_respects_root_margin() {
        let (mut doc, _, cards) = page(1280.0);
        let mut fx = ScrollEffectsController::attach(&doc, ScrollFxConfig::default());
        // Band is [100, 900): the card at 50..150 and 850..950 both intersect.
        let revealed = fx.reveal_pass(&mut doc).unwrap();
        assert_eq!(revealed, vec![cards[0], cards[1], cards[2]]);
        assert_eq!(
            doc.style(cards[2], "transition-delay").as_deref(),
            Some("200ms")
        );
        assert_eq!(fx.observed(), &[cards[3], cards[4]]);
    }

    #[test]
    fn element_just_outside_margin_is_not_revealed() {
        let mut doc = Document::new(Viewport::new(1280.0, 1000.0));
        let el = doc.create_element("div", None);
        doc.add_class(el, "reveal").unwrap();
        doc.set_bounds(el, Bounds::new(900.0, 50.0));
        let mut fx = ScrollEffectsController::attach(&doc, ScrollFxConfig::default());
        assert!(fx.reveal_pass(&mut doc).unwrap().is_empty());
        doc.set_scroll_y(1.0);
        assert_eq!(fx.reveal_pass(&mut doc).unwrap(), vec![el]);
    }

    #[test]
    fn reveal_happens_at_most_once() {
        let (mut doc, _, cards) = page(1280.0);
        let mut fx = ScrollEffectsController::attach(&doc, ScrollFxConfig::default());
        fx.reveal_pass(&mut doc).unwrap();
        doc.remove_class(cards[0], "animate-in").unwrap();
        doc.set_scroll_y(0.0);
        assert!(fx.reveal_pass(&mut doc).unwrap().is_empty());
        assert!(!doc.has_class(cards[0], "animate-in"));

        doc.set_scroll_y(1200.0);
        let second = fx.reveal_pass(&mut doc).unwrap();
        assert_eq!(second, vec![cards[3]]);
        assert_eq!(
            doc.style(cards[3], "transition-delay").as_deref(),
            Some("0ms"),
            "stagger index restarts per pass"
        );
    }

    #[test]
    fn scroll_events_coalesce_into_one_frame() {
        let (mut doc, bg, _) = page(1280.0);
        let mut fx = ScrollEffectsController::attach(&doc, ScrollFxConfig::default());
        let now = Instant::now();
        let mut out = Outbox::new();
        for y in [10.0, 20.0, 30.0] {
            doc.set_scroll_y(y);
            fx.handle_event(&mut doc, &Event::Scroll, now, &mut out).unwrap();
        }
        assert!(fx.is_ticking());
        assert!(doc.style(bg, "transform").is_none(), "no write before the frame");
        assert!(fx.run_frame(&mut doc).unwrap());
        assert_eq!(doc.style(bg, "transform").as_deref(), Some("translateY(-15px)"));
        assert!(!fx.run_frame(&mut doc).unwrap());
    }
}
