#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vitrine_core::{
    Bounds, Document, Dom, ElementId, Event, Instant, KeyCode, KeyEvent, Modifiers, TouchEvent,
    TouchPhase, Viewport,
};
use vitrine_runtime::{App, SiteConfig};

#[derive(Debug, Arbitrary)]
enum Step {
    Scroll(u16),
    Resize(u16),
    Click(u8),
    Escape,
    Tab { shift: bool },
    Touch { phase: u8, x: i16 },
    Input(String),
    Submit,
    Advance(u16),
}

fn page() -> (Document, Vec<ElementId>) {
    let mut doc = Document::new(Viewport::new(600.0, 800.0));
    let mut clickable = Vec::new();
    clickable.push(doc.append_with_id("button", None, "mobile-menu-toggle"));
    let menu = doc.append_with_id("nav", None, "mobile-menu");
    for (id, top) in [("home", 0.0), ("about", 700.0)] {
        let link = doc.create_element("a", Some(menu));
        let _ = doc.add_class(link, "nav-link");
        let _ = doc.set_attribute(link, "href", &format!("#{id}"));
        clickable.push(link);
        let section = doc.append_with_id("section", None, id);
        let _ = doc.add_class(section, "section");
        doc.set_bounds(section, Bounds::new(top, 700.0));
    }
    let trigger = doc.create_element("button", None);
    let _ = doc.set_attribute(trigger, "data-modal-open", "contact-modal");
    clickable.push(trigger);
    let modal = doc.append_with_id("div", None, "contact-modal");
    let _ = doc.add_class(modal, "modal");
    clickable.push(modal);
    let form = doc.append_with_id("form", Some(modal), "contact-form");
    let _ = doc.add_class(form, "site-form");
    let email = doc.create_element("input", Some(form));
    let _ = doc.set_attribute(email, "name", "email");
    let _ = doc.set_attribute(email, "data-validate", "required,email");
    clickable.push(email);
    (doc, clickable)
}

fuzz_target!(|steps: Vec<Step>| {
    let (doc, clickable) = page();
    let mut config = SiteConfig::default();
    config.api.demo_mode = true;
    let Ok(mut app) = App::builder(doc).config(config).build() else {
        return;
    };
    let mut now = Instant::now();
    if app.init(now).is_err() {
        return;
    }
    let form = app.dom().element_by_id("contact-form");
    let email = clickable[clickable.len() - 1];
    for step in steps.into_iter().take(256) {
        let event = match step {
            Step::Scroll(y) => {
                app.dom_mut().set_scroll_y(f64::from(y));
                Event::Scroll
            }
            Step::Resize(w) => {
                app.dom_mut().set_viewport(Viewport::new(f64::from(w), 800.0));
                Event::Resize
            }
            Step::Click(i) => Event::Click(clickable[usize::from(i) % clickable.len()]),
            Step::Escape => Event::Key(KeyEvent::new(KeyCode::Escape)),
            Step::Tab { shift } => {
                let key = KeyEvent::new(KeyCode::Tab);
                Event::Key(if shift { key.with_modifiers(Modifiers::SHIFT) } else { key })
            }
            Step::Touch { phase, x } => {
                let phase = match phase % 3 {
                    0 => TouchPhase::Start,
                    1 => TouchPhase::Move,
                    _ => TouchPhase::End,
                };
                Event::Touch(TouchEvent::new(phase, f64::from(x), 0.0))
            }
            Step::Input(value) => {
                let _ = app.dom_mut().set_value(email, &value);
                Event::Input(email)
            }
            Step::Submit => match form {
                Some(form) => Event::Submit(form),
                None => continue,
            },
            Step::Advance(dt) => {
                now += Duration::from_millis(u64::from(dt));
                app.tick(now);
                continue;
            }
        };
        app.handle_event(&event, now);
    }
    // Teardown releases the scroll lock from any state.
    app.cleanup(now);
    assert!(!app.dom().is_scroll_locked());
});
