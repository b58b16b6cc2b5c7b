#![forbid(unsafe_code)]

//! Navigation bar controller: scrolled chrome, scroll-spy, smooth navigation.
//!
//! # Invariants
//!
//! - The `scrolled` class is written only when the threshold is crossed
//!   (edge-triggered), never on every scroll tick.
//! - The active-link class and `aria-current="page"` always move together;
//!   at most one nav link carries them.
//! - `active_section` names the section containing the probe position
//!   `scroll_y + section_offset + probe_padding`. Above the first section the
//!   first section wins, below the last section the last one wins, and in a
//!   gap between sections the nearest preceding section wins.
//!
//! # Failure Modes
//!
//! - A nav link whose target section is missing is ignored on click.
//! - A page without sections reports `home_section`.

use std::time::Duration;

use tracing::{debug, trace};
use vitrine_core::{
    Bounds, Dom, DomError, ElementId, Event, EventOutcome, Instant, ScrollBehavior, Throttle,
};

use crate::signal::{Outbox, Signal};
use crate::{Controller, WidgetError};

/// Navigation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationConfig {
    /// Scroll distance at which the navbar switches to its scrolled look.
    pub scroll_threshold: f64,
    /// Height of the fixed navbar; subtracted from scroll targets.
    pub section_offset: f64,
    /// Extra look-ahead added to the scroll-spy probe.
    pub probe_padding: f64,
    /// Leading-edge throttle interval for the scroll-spy.
    pub spy_interval: Duration,
    /// Section reported when the page has no sections.
    pub home_section: String,
    pub navbar_id: String,
    pub link_class: String,
    pub section_class: String,
    pub active_class: String,
    pub scrolled_class: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: 50.0,
            section_offset: 80.0,
            probe_padding: 20.0,
            spy_interval: Duration::from_millis(100),
            home_section: "home".to_string(),
            navbar_id: "navbar".to_string(),
            link_class: "nav-link".to_string(),
            section_class: "section".to_string(),
            active_class: "active".to_string(),
            scrolled_class: "scrolled".to_string(),
        }
    }
}

/// Observable navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    pub is_scrolled: bool,
    pub active_section: String,
}

#[derive(Debug, Clone)]
struct NavLink {
    el: ElementId,
    section: String,
}

/// Navbar and scroll-spy controller.
#[derive(Debug)]
pub struct NavigationController {
    config: NavigationConfig,
    navbar: Option<ElementId>,
    links: Vec<NavLink>,
    state: NavigationState,
    spy: Throttle,
}

impl NavigationController {
    /// Bind to the navbar and nav links present in `dom`.
    ///
    /// Links are elements carrying `link_class` with an `href="#section"`.
    pub fn attach(dom: &dyn Dom, config: NavigationConfig) -> Self {
        let navbar = dom.element_by_id(&config.navbar_id);
        let links = dom
            .elements_with_class(&config.link_class)
            .into_iter()
            .filter_map(|el| {
                let href = dom.attribute(el, "href")?;
                let section = href.strip_prefix('#')?.to_string();
                Some(NavLink { el, section })
            })
            .collect::<Vec<_>>();
        debug!(links = links.len(), navbar = navbar.is_some(), "navigation attached");
        let state = NavigationState {
            is_scrolled: false,
            active_section: config.home_section.clone(),
        };
        Self {
            spy: Throttle::new(config.spy_interval),
            config,
            navbar,
            links,
            state,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn active_section(&self) -> &str {
        &self.state.active_section
    }

    pub fn is_scrolled(&self) -> bool {
        self.state.is_scrolled
    }

    /// Toggle the scrolled navbar look on threshold crossings.
    ///
    /// Returns `true` when the look changed.
    pub fn on_scroll(&mut self, dom: &mut dyn Dom) -> Result<bool, DomError> {
        let scrolled = dom.scroll_y() > self.config.scroll_threshold;
        if scrolled == self.state.is_scrolled {
            return Ok(false);
        }
        self.state.is_scrolled = scrolled;
        if let Some(navbar) = self.navbar {
            dom.toggle_class(navbar, &self.config.scrolled_class, scrolled)?;
        }
        trace!(scrolled, "navbar chrome toggled");
        Ok(true)
    }

    /// Throttled scroll-spy update.
    ///
    /// Returns the new active section if it changed.
    pub fn update_active_section(
        &mut self,
        dom: &mut dyn Dom,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<Option<String>, DomError> {
        if !self.spy.try_fire(now) {
            return Ok(None);
        }
        let section = self.compute_active_section(dom);
        if self.set_active(dom, &section, out)? {
            Ok(Some(section))
        } else {
            Ok(None)
        }
    }

    /// Section containing the current probe position (unthrottled, pure).
    pub fn compute_active_section(&self, dom: &dyn Dom) -> String {
        let probe = dom.scroll_y() + self.config.section_offset + self.config.probe_padding;
        let mut sections: Vec<(String, Bounds)> = dom
            .elements_with_class(&self.config.section_class)
            .into_iter()
            .filter_map(|el| Some((dom.html_id(el)?, dom.bounds(el)?)))
            .collect();
        sections.sort_by(|a, b| a.1.top.total_cmp(&b.1.top));

        let (Some(first), Some(last)) = (sections.first(), sections.last()) else {
            return self.config.home_section.clone();
        };
        if let Some((id, _)) = sections.iter().find(|(_, b)| b.contains_y(probe)) {
            return id.clone();
        }
        if probe < first.1.top {
            return first.0.clone();
        }
        if probe >= last.1.bottom() {
            return last.0.clone();
        }
        sections
            .iter()
            .rev()
            .find(|(_, b)| b.top <= probe)
            .map_or_else(|| first.0.clone(), |(id, _)| id.clone())
    }

    /// Smooth-scroll to a section and mark its link active immediately.
    pub fn navigate_to(
        &mut self,
        dom: &mut dyn Dom,
        section: &str,
        out: &mut Outbox,
    ) -> Result<(), DomError> {
        let target = dom.require(section)?;
        let top = dom.bounds(target).map_or(0.0, |b| b.top);
        dom.scroll_to((top - self.config.section_offset).max(0.0), ScrollBehavior::Smooth);
        self.set_active(dom, section, out)?;
        out.push(Signal::NavigateRequested {
            section: section.to_string(),
        });
        debug!(section, "navigating");
        Ok(())
    }

    /// Compute the active section and write link state unconditionally.
    pub fn sync(&mut self, dom: &mut dyn Dom, out: &mut Outbox) -> Result<(), DomError> {
        self.on_scroll(dom)?;
        let section = self.compute_active_section(dom);
        if !self.set_active(dom, &section, out)? {
            self.apply_links(dom)?;
        }
        Ok(())
    }

    /// Mark `section` active on the links. Returns `true` if it changed.
    fn set_active(
        &mut self,
        dom: &mut dyn Dom,
        section: &str,
        out: &mut Outbox,
    ) -> Result<bool, DomError> {
        if self.state.active_section == section {
            return Ok(false);
        }
        self.state.active_section = section.to_string();
        self.apply_links(dom)?;
        out.push(Signal::SectionChanged {
            section: section.to_string(),
        });
        debug!(section, "active section changed");
        Ok(true)
    }

    fn apply_links(&self, dom: &mut dyn Dom) -> Result<(), DomError> {
        let mut marked = false;
        for link in &self.links {
            // Only the first link for a section is marked; duplicates stay inactive.
            let active = !marked && link.section == self.state.active_section;
            marked |= active;
            dom.toggle_class(link.el, &self.config.active_class, active)?;
            if active {
                dom.set_attribute(link.el, "aria-current", "page")?;
            } else {
                dom.remove_attribute(link.el, "aria-current")?;
            }
        }
        Ok(())
    }

    fn link_for(&self, dom: &dyn Dom, el: ElementId) -> Option<&NavLink> {
        self.links.iter().find(|l| dom.contains(l.el, el))
    }
}

impl Controller for NavigationController {
    fn name(&self) -> &'static str {
        "navigation"
    }

    fn handle_event(
        &mut self,
        dom: &mut dyn Dom,
        event: &Event,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<EventOutcome, WidgetError> {
        match event {
            Event::Scroll => {
                self.on_scroll(dom)?;
                self.update_active_section(dom, now, out)?;
                Ok(EventOutcome::HANDLED)
            }
            Event::Click(el) => {
                let Some(section) = self.link_for(dom, *el).map(|l| l.section.clone()) else {
                    return Ok(EventOutcome::IGNORED);
                };
                if dom.element_by_id(&section).is_none() {
                    return Ok(EventOutcome::IGNORED);
                }
                self.navigate_to(dom, &section, out)?;
                Ok(EventOutcome::PREVENT_DEFAULT)
            }
            _ => Ok(EventOutcome::IGNORED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vitrine_core::Document;

    const SECTIONS: &[(&str, f64, f64)] = &[
        ("home", 0.0, 600.0),
        ("services", 600.0, 800.0),
        ("about", 1400.0, 500.0),
        ("contact", 1900.0, 700.0),
    ];

    fn page() -> (Document, Vec<ElementId>) {
        let mut doc = Document::default();
        let nav = doc.append_with_id("nav", None, "navbar");
        let links = SECTIONS
            .iter()
            .map(|(id, _, _)| {
                let a = doc.create_element("a", Some(nav));
                doc.add_class(a, "nav-link").unwrap();
                doc.set_attribute(a, "href", &format!("#{id}")).unwrap();
                a
            })
            .collect();
        let main = doc.create_element("main", None);
        for (id, top, height) in SECTIONS {
            let s = doc.append_with_id("section", Some(main), id);
            doc.add_class(s, "section").unwrap();
            doc.set_bounds(s, Bounds::new(*top, *height));
        }
        (doc, links)
    }

    fn zero_probe() -> NavigationConfig {
        NavigationConfig {
            section_offset: 0.0,
            probe_padding: 0.0,
            ..NavigationConfig::default()
        }
    }

    fn active_links(doc: &Document, links: &[ElementId]) -> Vec<ElementId> {
        links
            .iter()
            .copied()
            .filter(|&l| doc.has_class(l, "active"))
            .collect()
    }

    #[test]
    fn scrolled_class_is_edge_triggered() {
        let (mut doc, _) = page();
        let mut nav = NavigationController::attach(&doc, NavigationConfig::default());
        let navbar = doc.element_by_id("navbar").unwrap();

        doc.set_scroll_y(10.0);
        assert!(!nav.on_scroll(&mut doc).unwrap());
        doc.set_scroll_y(51.0);
        assert!(nav.on_scroll(&mut doc).unwrap());
        assert!(doc.has_class(navbar, "scrolled"));
        doc.set_scroll_y(300.0);
        assert!(!nav.on_scroll(&mut doc).unwrap(), "no write while above threshold");
        doc.set_scroll_y(50.0);
        assert!(nav.on_scroll(&mut doc).unwrap());
        assert!(!doc.has_class(navbar, "scrolled"));
    }

    #[test]
    fn spy_is_leading_edge_throttled() {
        let (mut doc, _) = page();
        let mut nav = NavigationController::attach(&doc, zero_probe());
        let mut out = Outbox::new();
        let t0 = Instant::now();

        doc.set_scroll_y(700.0);
        assert_eq!(
            nav.update_active_section(&mut doc, t0, &mut out).unwrap(),
            Some("services".to_string())
        );
        doc.set_scroll_y(1500.0);
        assert_eq!(
            nav.update_active_section(&mut doc, t0 + Duration::from_millis(50), &mut out)
                .unwrap(),
            None
        );
        assert_eq!(nav.active_section(), "services");
        assert_eq!(
            nav.update_active_section(&mut doc, t0 + Duration::from_millis(100), &mut out)
                .unwrap(),
            Some("about".to_string())
        );
        assert_eq!(
            out,
            vec![
                Signal::SectionChanged {
                    section: "services".into()
                },
                Signal::SectionChanged {
                    section: "about".into()
                },
            ]
        );
    }

    #[test]
    fn probe_includes_offset_and_padding() {
        let (mut doc, _) = page();
        let nav = NavigationController::attach(&doc, NavigationConfig::default());
        // 500 + 80 + 20 = 600 → services
        doc.set_scroll_y(500.0);
        assert_eq!(nav.compute_active_section(&doc), "services");
        doc.set_scroll_y(499.0);
        assert_eq!(nav.compute_active_section(&doc), "home");
    }

    #[test]
    fn extremes_pick_first_and_last() {
        let (mut doc, _) = page();
        let nav = NavigationController::attach(&doc, zero_probe());
        let home = doc.element_by_id("home").unwrap();
        doc.set_bounds(home, Bounds::new(100.0, 500.0));
        doc.set_scroll_y(0.0);
        assert_eq!(nav.compute_active_section(&doc), "home");
        doc.set_scroll_y(10_000.0);
        assert_eq!(nav.compute_active_section(&doc), "contact");
    }

    #[test]
    fn gap_picks_preceding_section() {
        let (mut doc, _) = page();
        let about = doc.element_by_id("about").unwrap();
        doc.set_bounds(about, Bounds::new(1500.0, 400.0));
        let nav = NavigationController::attach(&doc, zero_probe());
        doc.set_scroll_y(1450.0);
        assert_eq!(nav.compute_active_section(&doc), "services");
    }

    #[test]
    fn sync_marks_initial_link() {
        let (mut doc, links) = page();
        let mut nav = NavigationController::attach(&doc, NavigationConfig::default());
        let mut out = Outbox::new();
        nav.sync(&mut doc, &mut out).unwrap();
        assert_eq!(nav.active_section(), "home");
        assert!(out.is_empty(), "home was already the initial section");
        assert_eq!(active_links(&doc, &links), vec![links[0]]);
    }

    #[test]
    fn no_sections_defaults_to_home() {
        let doc = Document::default();
        let nav = NavigationController::attach(&doc, NavigationConfig::default());
        assert_eq!(nav.compute_active_section(&doc), "home");
    }

    #[test]
    fn navigate_scrolls_smoothly_and_marks_link() {
        let (mut doc, links) = page();
        let mut nav = NavigationController::attach(&doc, NavigationConfig::default());
        let mut out = Outbox::new();
        let outcome = nav
            .handle_event(&mut doc, &Event::Click(links[2]), Instant::now(), &mut out)
            .unwrap();
        assert_eq!(outcome, EventOutcome::PREVENT_DEFAULT);
        assert_eq!(doc.scroll_y(), 1320.0);
        assert_eq!(doc.last_scroll_behavior(), Some(ScrollBehavior::Smooth));
        assert_eq!(active_links(&doc, &links), vec![links[2]]);
        assert_eq!(doc.attribute(links[2], "aria-current").as_deref(), Some("page"));
        assert!(out.contains(&Signal::NavigateRequested {
            section: "about".into()
        }));
    }

    #[test]
    fn click_outside_links_is_ignored() {
        let (mut doc, _) = page();
        let mut nav = NavigationController::attach(&doc, NavigationConfig::default());
        let other = doc.create_element("button", None);
        let outcome = nav
            .handle_event(&mut doc, &Event::Click(other), Instant::now(), &mut Outbox::new())
            .unwrap();
        assert_eq!(outcome, EventOutcome::IGNORED);
    }

    proptest! {
        #[test]
        fn scroll_inside_band_selects_exactly_that_section(idx in 0usize..4, frac in 0.0f64..1.0) {
            let (mut doc, links) = page();
            let mut nav = NavigationController::attach(&doc, zero_probe());
            nav.sync(&mut doc, &mut Outbox::new()).unwrap();
            let (id, top, height) = SECTIONS[idx];
            doc.set_scroll_y(top + frac * (height - 1.0));
            nav.update_active_section(&mut doc, Instant::now(), &mut Outbox::new()).unwrap();
            prop_assert_eq!(nav.active_section(), id);

            let active = active_links(&doc, &links);
            let current: Vec<_> = links
                .iter()
                .copied()
                .filter(|&l| doc.attribute(l, "aria-current").as_deref() == Some("page"))
                .collect();
            prop_assert_eq!(&active, &vec![links[idx]]);
            prop_assert_eq!(active, current);
        }
    }
}
