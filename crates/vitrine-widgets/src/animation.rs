#![forbid(unsafe_code)]

//! Transition primitives shared by the menu, modal, and reveal controllers.
//!
//! # Frame model
//!
//! A browser transition only runs if the start styles are committed before
//! the end styles. Controllers model this with a [`Transition`] that is
//! created unstarted: the opening call writes the start styles, the next
//! `tick` writes the end styles and stamps the start time, and the
//! transition completes once `duration` has elapsed after that frame.
//!
//! # Invariants
//!
//! - Progress is always in `[0.0, 1.0]`.
//! - A zero-duration transition completes on the frame it starts.
//! - [`ClassAnimator`] removes every temporary class it adds.

use std::time::Duration;

use vitrine_core::{Dom, DomError, ElementId, Instant};

/// Lifecycle of an animated overlay.
///
/// State machine: Closed → Opening → Open → Closing → Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPhase {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

impl TransitionPhase {
    #[inline]
    pub fn is_animating(self) -> bool {
        matches!(self, Self::Opening | Self::Closing)
    }

    #[inline]
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Easing curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    EaseOut,
    EaseIn,
    EaseInOut,
}

impl Easing {
    /// Apply the curve to a progress value (clamped to `[0, 1]`).
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOut => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            Self::EaseIn => t * t * t,
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let inv = -2.0 * t + 2.0;
                    1.0 - inv * inv * inv / 2.0
                }
            }
        }
    }

    /// CSS timing-function keyword.
    pub fn css(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseOut => "ease-out",
            Self::EaseIn => "ease-in",
            Self::EaseInOut => "ease-in-out",
        }
    }
}

/// A timed transition that starts on the first frame after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    duration: Duration,
    easing: Easing,
    started: Option<Instant>,
}

impl Transition {
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            easing: Easing::EaseOut,
            started: None,
        }
    }

    #[must_use]
    pub const fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Stamp the start time. Returns `true` on the first call only.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.started.is_some() {
            return false;
        }
        self.started = Some(now);
        true
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    /// Linear progress in `[0, 1]`; zero before the first frame.
    pub fn progress(&self, now: Instant) -> f64 {
        let Some(started) = self.started else {
            return 0.0;
        };
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(started);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        self.started.is_some() && self.progress(now) >= 1.0
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// CSS `transition` value animating `properties` with this timing.
    pub fn css(&self, properties: &[&str]) -> String {
        let ms = self.duration.as_millis();
        properties
            .iter()
            .map(|p| format!("{p} {ms}ms {}", self.easing.css()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `translateX(<percent>%)`.
pub fn translate_x_percent(percent: f64) -> String {
    format!("translateX({}%)", fmt_num(percent))
}

/// `translateX(<px>px)`.
pub fn translate_x_px(px: f64) -> String {
    format!("translateX({}px)", fmt_num(px))
}

/// `translateY(<px>px)`.
pub fn translate_y_px(px: f64) -> String {
    format!("translateY({}px)", fmt_num(px))
}

/// `scale(<factor>)`.
pub fn scale(factor: f64) -> String {
    format!("scale({})", fmt_num(factor))
}

/// Format a CSS number without a trailing `.0` and without `-0`.
pub fn fmt_num(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

/// Delays for `count` staggered items, `step` apart.
pub fn stagger_delays(count: usize, step: Duration) -> Vec<Duration> {
    (0..count as u32).map(|i| step * i).collect()
}

/// Apply `class` to each element with a staggered `transition-delay`.
pub fn stagger_classes(
    dom: &mut dyn Dom,
    elements: &[ElementId],
    class: &str,
    step: Duration,
) -> Result<(), DomError> {
    for (&el, delay) in elements.iter().zip(stagger_delays(elements.len(), step)) {
        dom.set_style(el, "transition-delay", &format!("{}ms", delay.as_millis()))?;
        dom.add_class(el, class)?;
    }
    Ok(())
}

/// What happens when a class effect ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EffectEnd {
    /// Remove the temporary class.
    RemoveClass,
    /// Keep the class (animate-in settles on it).
    KeepClass,
    /// Remove the class and hide the element (animate-out).
    Hide,
}

/// Identifier of a running class effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

#[derive(Debug, Clone)]
struct ClassEffect {
    id: EffectId,
    el: ElementId,
    class: String,
    transition: Transition,
    end: EffectEnd,
}

pub const PULSE_CLASS: &str = "pulse";
pub const SHAKE_CLASS: &str = "shake";
pub const PULSE_DURATION: Duration = Duration::from_millis(600);
pub const SHAKE_DURATION: Duration = Duration::from_millis(500);

/// Applies and retires CSS animation classes.
#[derive(Debug, Default)]
pub struct ClassAnimator {
    effects: Vec<ClassEffect>,
    next_id: u64,
}

impl ClassAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        dom: &mut dyn Dom,
        el: ElementId,
        class: &str,
        duration: Duration,
        end: EffectEnd,
    ) -> Result<EffectId, DomError> {
        // Restarting an effect on the same element/class replaces it.
        self.effects.retain(|e| !(e.el == el && e.class == class));
        dom.add_class(el, class)?;
        let id = EffectId(self.next_id);
        self.next_id += 1;
        self.effects.push(ClassEffect {
            id,
            el,
            class: class.to_string(),
            transition: Transition::new(duration),
            end,
        });
        Ok(id)
    }

    /// Show `el` and apply an entrance class; completes after `duration`.
    pub fn animate_in(
        &mut self,
        dom: &mut dyn Dom,
        el: ElementId,
        class: &str,
        duration: Duration,
    ) -> Result<EffectId, DomError> {
        dom.remove_style(el, "display")?;
        self.push(dom, el, class, duration, EffectEnd::KeepClass)
    }

    /// Apply an exit class; the element is hidden when it completes.
    pub fn animate_out(
        &mut self,
        dom: &mut dyn Dom,
        el: ElementId,
        class: &str,
        duration: Duration,
    ) -> Result<EffectId, DomError> {
        self.push(dom, el, class, duration, EffectEnd::Hide)
    }

    /// Attention pulse.
    pub fn pulse(&mut self, dom: &mut dyn Dom, el: ElementId) -> Result<EffectId, DomError> {
        self.push(dom, el, PULSE_CLASS, PULSE_DURATION, EffectEnd::RemoveClass)
    }

    /// Error shake.
    pub fn shake(&mut self, dom: &mut dyn Dom, el: ElementId) -> Result<EffectId, DomError> {
        self.push(dom, el, SHAKE_CLASS, SHAKE_DURATION, EffectEnd::RemoveClass)
    }

    /// Whether an effect is still running.
    pub fn is_running(&self, id: EffectId) -> bool {
        self.effects.iter().any(|e| e.id == id)
    }

    pub fn running(&self) -> usize {
        self.effects.len()
    }

    /// Advance effects. Returns the ids that completed on this frame.
    pub fn tick(&mut self, dom: &mut dyn Dom, now: Instant) -> Vec<EffectId> {
        let mut done = Vec::new();
        for effect in &mut self.effects {
            effect.transition.start(now);
        }
        self.effects.retain(|effect| {
            if !effect.transition.is_complete(now) {
                return true;
            }
            // The element may have been removed mid-effect; nothing to undo then.
            let _ = match effect.end {
                EffectEnd::RemoveClass => dom.remove_class(effect.el, &effect.class),
                EffectEnd::KeepClass => Ok(()),
                EffectEnd::Hide => dom
                    .remove_class(effect.el, &effect.class)
                    .and_then(|()| dom.set_style(effect.el, "display", "none")),
            };
            done.push(effect.id);
            false
        });
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::Document;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn phase_predicates() {
        assert!(!TransitionPhase::Closed.is_visible());
        assert!(TransitionPhase::Opening.is_animating());
        assert!(TransitionPhase::Closing.is_animating());
        assert!(!TransitionPhase::Open.is_animating());
        assert!(TransitionPhase::Open.is_visible());
    }

    #[test]
    fn easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseOut,
            Easing::EaseIn,
            Easing::EaseInOut,
        ] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9);
            assert_eq!(easing.apply(-3.0), 0.0);
        }
    }

    #[test]
    fn transition_waits_for_first_frame() {
        let t0 = Instant::now();
        let mut t = Transition::new(ms(300));
        assert_eq!(t.progress(t0 + ms(1000)), 0.0);
        assert!(!t.is_complete(t0 + ms(1000)));
        assert!(t.start(t0));
        assert!(!t.start(t0 + ms(50)), "start is stamped once");
        assert!((t.progress(t0 + ms(150)) - 0.5).abs() < 1e-9);
        assert!(!t.is_complete(t0 + ms(299)));
        assert!(t.is_complete(t0 + ms(300)));
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let t0 = Instant::now();
        let mut t = Transition::new(Duration::ZERO);
        t.start(t0);
        assert!(t.is_complete(t0));
    }

    #[test]
    fn css_helpers() {
        assert_eq!(translate_x_percent(-100.0), "translateX(-100%)");
        assert_eq!(translate_x_px(-12.5), "translateX(-12.5px)");
        assert_eq!(translate_y_px(-0.0), "translateY(0px)");
        assert_eq!(scale(0.9), "scale(0.9)");
        assert_eq!(
            Transition::new(ms(300)).css(&["transform", "opacity"]),
            "transform 300ms ease-out, opacity 300ms ease-out"
        );
        assert_eq!(stagger_delays(3, ms(100)), vec![ms(0), ms(100), ms(200)]);
    }

    #[test]
    fn pulse_class_is_removed_after_duration() {
        let t0 = Instant::now();
        let mut doc = Document::default();
        let el = doc.create_element("button", None);
        let mut anim = ClassAnimator::new();
        let id = anim.pulse(&mut doc, el).unwrap();
        assert!(doc.has_class(el, PULSE_CLASS));
        assert!(anim.tick(&mut doc, t0).is_empty());
        assert!(anim.tick(&mut doc, t0 + ms(599)).is_empty());
        assert_eq!(anim.tick(&mut doc, t0 + ms(600)), vec![id]);
        assert!(!doc.has_class(el, PULSE_CLASS));
        assert!(!anim.is_running(id));
    }

    #[test]
    fn animate_out_hides_element() {
        let t0 = Instant::now();
        let mut doc = Document::default();
        let el = doc.create_element("div", None);
        let mut anim = ClassAnimator::new();
        anim.animate_in(&mut doc, el, "fade-in", ms(100)).unwrap();
        anim.tick(&mut doc, t0);
        anim.tick(&mut doc, t0 + ms(100));
        assert!(doc.has_class(el, "fade-in"));

        anim.animate_out(&mut doc, el, "fade-out", ms(100)).unwrap();
        anim.tick(&mut doc, t0 + ms(200));
        anim.tick(&mut doc, t0 + ms(300));
        assert!(!doc.has_class(el, "fade-out"));
        assert_eq!(doc.style(el, "display").as_deref(), Some("none"));
    }

    #[test]
    fn effect_survives_removed_element() {
        let t0 = Instant::now();
        let mut doc = Document::default();
        let el = doc.create_element("div", None);
        let mut anim = ClassAnimator::new();
        anim.shake(&mut doc, el).unwrap();
        doc.remove_element(el).unwrap();
        anim.tick(&mut doc, t0);
        assert_eq!(anim.tick(&mut doc, t0 + SHAKE_DURATION).len(), 1);
        assert_eq!(anim.running(), 0);
    }

    #[test]
    fn stagger_sets_increasing_delays() {
        let mut doc = Document::default();
        let items: Vec<_> = (0..3).map(|_| doc.create_element("div", None)).collect();
        stagger_classes(&mut doc, &items, "visible", ms(100)).unwrap();
        let delays: Vec<_> = items
            .iter()
            .map(|&el| doc.style(el, "transition-delay").unwrap())
            .collect();
        assert_eq!(delays, vec!["0ms", "100ms", "200ms"]);
        assert!(items.iter().all(|&el| doc.has_class(el, "visible")));
    }
}
