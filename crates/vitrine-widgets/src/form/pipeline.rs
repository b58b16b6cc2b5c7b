#![forbid(unsafe_code)]

//! The form controller.
//!
//! # Invariants
//!
//! - A form id is in the submitting set from a successful `begin_submit`
//!   until the matching `finish_submit`. While it is, further submits of that
//!   form are dropped without side effects.
//! - Controls disabled by `begin_submit` (and only those) are re-enabled by
//!   `finish_submit`; the submit button label is restored verbatim.
//! - Failed submissions keep every entered value.

use std::fmt::Display;

use ahash::AHashSet;
use tracing::{debug, info, warn};
use vitrine_core::{Dom, DomError, ElementId, Event, EventOutcome, Instant};

use super::rules::{RuleSet, ValidationOutcome};
use super::strategy::{FormKind, FormValues, SubmitRequest, SubmitResponse};
use super::validator::FieldValidator;
use super::{FormConfig, FormError};
use crate::animation::ClassAnimator;
use crate::signal::{Outbox, Signal};
use crate::{Controller, WidgetError};

#[derive(Debug)]
struct InFlight {
    disabled: Vec<ElementId>,
    button: Option<(ElementId, String)>,
}

#[derive(Debug)]
struct FormEntry {
    id: String,
    el: ElementId,
    kind: FormKind,
    fields: Vec<FieldValidator>,
    banner: Option<ElementId>,
    in_flight: Option<InFlight>,
}

/// Validation and submission for every registered form.
#[derive(Debug)]
pub struct FormController {
    config: FormConfig,
    rules: RuleSet,
    forms: Vec<FormEntry>,
    submitting: AHashSet<String>,
    requests: Vec<SubmitRequest>,
    animator: ClassAnimator,
}

impl FormController {
    pub fn new(config: FormConfig, rules: RuleSet) -> Self {
        Self {
            config,
            rules,
            forms: Vec::new(),
            submitting: AHashSet::new(),
            requests: Vec::new(),
            animator: ClassAnimator::new(),
        }
    }

    /// Create a controller with the built-in rules and register every form
    /// carrying the configured class.
    pub fn attach(dom: &mut dyn Dom, config: FormConfig) -> Result<Self, FormError> {
        let mut controller = Self::new(config, RuleSet::builtin()?);
        for el in dom.elements_with_class(&controller.config.form_class) {
            if let Some(id) = dom.html_id(el) {
                controller.register(dom, &id)?;
            }
        }
        debug!(count = controller.forms.len(), "forms registered");
        Ok(controller)
    }

    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    /// Register the form with HTML id `form_id`, parsing its rule lists.
    pub fn register(&mut self, dom: &mut dyn Dom, form_id: &str) -> Result<(), FormError> {
        let el = dom.require(form_id)?;
        let mut fields = Vec::new();
        for control in dom.focusable_within(el) {
            if let Some(field) = FieldValidator::bind(dom, form_id, control, &self.rules, &self.config)? {
                fields.push(field);
            }
        }
        dom.set_attribute(el, "novalidate", "")?;
        self.forms.retain(|f| f.id != form_id);
        self.forms.push(FormEntry {
            id: form_id.to_string(),
            el,
            kind: FormKind::from_form_id(form_id),
            fields,
            banner: None,
            in_flight: None,
        });
        Ok(())
    }

    pub fn is_submitting(&self, form_id: &str) -> bool {
        self.submitting.contains(form_id)
    }

    /// Registered form owning element `el` (the form itself or a descendant).
    pub fn form_of(&self, dom: &dyn Dom, el: ElementId) -> Option<&str> {
        self.forms
            .iter()
            .find(|f| dom.contains(f.el, el))
            .map(|f| f.id.as_str())
    }

    pub fn form_element(&self, form_id: &str) -> Option<ElementId> {
        self.entry(form_id).ok().map(|f| f.el)
    }

    /// Requests produced by submit events since the last call.
    pub fn take_requests(&mut self) -> Vec<SubmitRequest> {
        std::mem::take(&mut self.requests)
    }

    fn entry(&self, form_id: &str) -> Result<&FormEntry, FormError> {
        self.forms
            .iter()
            .find(|f| f.id == form_id)
            .ok_or_else(|| FormError::UnknownForm(form_id.to_string()))
    }

    fn entry_index(&self, form_id: &str) -> Result<usize, FormError> {
        self.forms
            .iter()
            .position(|f| f.id == form_id)
            .ok_or_else(|| FormError::UnknownForm(form_id.to_string()))
    }

    /// Validate a single field element and reflect the result.
    ///
    /// Elements that are not registered fields validate trivially.
    pub fn validate_field(
        &mut self,
        dom: &mut dyn Dom,
        el: ElementId,
    ) -> Result<ValidationOutcome, DomError> {
        for form in &mut self.forms {
            if let Some(field) = form.fields.iter_mut().find(|f| f.element() == el) {
                field.cancel_input();
                return field.validate(dom, &self.rules, &self.config);
            }
        }
        Ok(ValidationOutcome::Valid)
    }

    /// Validate every field of a form. Returns the first invalid field.
    pub fn validate_form(
        &mut self,
        dom: &mut dyn Dom,
        form_id: &str,
    ) -> Result<Option<ElementId>, FormError> {
        let idx = self.entry_index(form_id)?;
        let mut first_invalid = None;
        for field in &mut self.forms[idx].fields {
            field.cancel_input();
            let outcome = field.validate(dom, &self.rules, &self.config)?;
            if !outcome.is_valid() && first_invalid.is_none() {
                first_invalid = Some(field.element());
            }
        }
        Ok(first_invalid)
    }

    /// Current trimmed values of a form's named fields.
    pub fn values(&self, dom: &dyn Dom, form_id: &str) -> Result<FormValues, FormError> {
        let form = self.entry(form_id)?;
        Ok(form
            .fields
            .iter()
            .map(|f| (f.name().to_string(), f.value(dom).trim().to_string()))
            .collect())
    }

    /// Validate, lock, and build the request for `form_id`.
    ///
    /// Returns `None` when the form is already submitting or failed
    /// validation; in the latter case a banner explains why.
    pub fn begin_submit(
        &mut self,
        dom: &mut dyn Dom,
        form_id: &str,
        out: &mut Outbox,
    ) -> Result<Option<SubmitRequest>, FormError> {
        let idx = self.entry_index(form_id)?;
        if self.submitting.contains(form_id) {
            warn!(form = form_id, "duplicate submission ignored");
            return Ok(None);
        }

        if let Some(first_invalid) = self.validate_form(dom, form_id)? {
            warn!(form = form_id, "submission blocked by validation");
            let message = self.config.validation_error.clone();
            self.show_banner(dom, idx, &message, false)?;
            dom.focus(first_invalid)?;
            return Ok(None);
        }

        let values = self.values(dom, form_id)?;
        let request = match self.forms[idx].kind.build(form_id, &values) {
            Ok(request) => request,
            Err(err @ (FormError::MissingField(_) | FormError::InvalidEmail(_))) => {
                warn!(form = form_id, error = %err, "submission blocked by payload check");
                let message = self.config.validation_error.clone();
                self.show_banner(dom, idx, &message, false)?;
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        self.lock(dom, idx)?;
        self.submitting.insert(form_id.to_string());
        debug!(form = form_id, endpoint = %request.endpoint, "submission started");
        out.push(Signal::SubmitRequested {
            form: form_id.to_string(),
        });
        Ok(Some(request))
    }

    /// Disable enabled controls and swap the submit label.
    fn lock(&mut self, dom: &mut dyn Dom, idx: usize) -> Result<(), DomError> {
        let form = &mut self.forms[idx];
        let controls = dom.focusable_within(form.el);
        let button = controls
            .iter()
            .copied()
            .find(|&c| dom.attribute(c, "type").as_deref() == Some("submit"))
            .map(|b| (b, dom.text(b).unwrap_or_default()));
        for &control in &controls {
            dom.set_disabled(control, true)?;
        }
        if let Some((b, _)) = button {
            dom.set_text(b, &self.config.submitting_label)?;
        }
        dom.set_attribute(form.el, "aria-busy", "true")?;
        form.in_flight = Some(InFlight {
            disabled: controls,
            button,
        });
        Ok(())
    }

    fn unlock(&mut self, dom: &mut dyn Dom, idx: usize) -> Result<(), DomError> {
        let form = &mut self.forms[idx];
        dom.remove_attribute(form.el, "aria-busy")?;
        let Some(in_flight) = form.in_flight.take() else {
            return Ok(());
        };
        for control in in_flight.disabled {
            if dom.exists(control) {
                dom.set_disabled(control, false)?;
            }
        }
        if let Some((button, label)) = in_flight.button
            && dom.exists(button)
        {
            dom.set_text(button, &label)?;
        }
        Ok(())
    }

    /// Apply the result of the network call started by `begin_submit`.
    ///
    /// Transport failures and `success: false` replies are treated alike.
    pub fn finish_submit<E: Display>(
        &mut self,
        dom: &mut dyn Dom,
        form_id: &str,
        result: Result<SubmitResponse, E>,
        out: &mut Outbox,
    ) -> Result<(), FormError> {
        if !self.submitting.remove(form_id) {
            debug!(form = form_id, "finish for a form that is not submitting");
            return Ok(());
        }
        let idx = self.entry_index(form_id)?;
        self.unlock(dom, idx)?;

        let (success, message) = match result {
            Ok(resp) if resp.success => {
                let message = non_empty_or(resp.message, &self.config.success_fallback);
                (true, message)
            }
            Ok(resp) => {
                warn!(form = form_id, message = %resp.message, "server rejected submission");
                (false, non_empty_or(resp.message, &self.config.generic_error))
            }
            Err(err) => {
                warn!(form = form_id, error = %err, "submission transport failed");
                (false, self.config.generic_error.clone())
            }
        };

        if success {
            self.reset(dom, idx)?;
            info!(form = form_id, "form submitted");
        }
        self.show_banner(dom, idx, &message, success)?;
        out.push(Signal::FormSubmitted {
            form: form_id.to_string(),
            success,
            message,
        });
        Ok(())
    }

    fn reset(&mut self, dom: &mut dyn Dom, idx: usize) -> Result<(), DomError> {
        for field in &mut self.forms[idx].fields {
            dom.set_value(field.element(), "")?;
            field.cancel_input();
            field.clear(dom, &self.config)?;
        }
        Ok(())
    }

    fn show_banner(
        &mut self,
        dom: &mut dyn Dom,
        idx: usize,
        message: &str,
        success: bool,
    ) -> Result<(), DomError> {
        let form = &mut self.forms[idx];
        let banner = match form.banner.filter(|&b| dom.exists(b)) {
            Some(banner) => banner,
            None => {
                let banner = dom.create_element("div", Some(form.el));
                dom.add_class(banner, &self.config.banner_class)?;
                form.banner = Some(banner);
                banner
            }
        };
        dom.set_text(banner, message)?;
        dom.toggle_class(banner, &self.config.success_class, success)?;
        dom.toggle_class(banner, &self.config.failure_class, !success)?;
        dom.set_attribute(banner, "role", if success { "status" } else { "alert" })?;
        dom.remove_style(banner, "display")?;
        if !success {
            self.animator.shake(dom, form.el)?;
        }
        Ok(())
    }

    /// Banner element of a form, if one has been shown.
    pub fn banner(&self, form_id: &str) -> Option<ElementId> {
        self.entry(form_id).ok().and_then(|f| f.banner)
    }
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

impl Controller for FormController {
    fn name(&self) -> &'static str {
        "forms"
    }

    fn handle_event(
        &mut self,
        dom: &mut dyn Dom,
        event: &Event,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<EventOutcome, WidgetError> {
        match event {
            Event::Blur(el) => {
                self.validate_field(dom, *el)?;
                Ok(EventOutcome::HANDLED)
            }
            Event::Input(el) if self.config.validate_on_input => {
                let field = self
                    .forms
                    .iter_mut()
                    .flat_map(|f| f.fields.iter_mut())
                    .find(|f| f.element() == *el);
                match field {
                    Some(field) => {
                        field.note_input(now);
                        Ok(EventOutcome::HANDLED)
                    }
                    None => Ok(EventOutcome::IGNORED),
                }
            }
            Event::Submit(el) => {
                let Some(form_id) = self.form_of(dom, *el).map(str::to_string) else {
                    return Ok(EventOutcome::IGNORED);
                };
                if let Some(request) = self.begin_submit(dom, &form_id, out)? {
                    self.requests.push(request);
                }
                Ok(EventOutcome::PREVENT_DEFAULT)
            }
            _ => Ok(EventOutcome::IGNORED),
        }
    }

    fn tick(&mut self, dom: &mut dyn Dom, now: Instant, _out: &mut Outbox) -> Result<(), WidgetError> {
        for form in &mut self.forms {
            for field in &mut form.fields {
                if field.input_settled(now) {
                    field.validate(dom, &self.rules, &self.config)?;
                }
            }
        }
        self.animator.tick(dom, now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::SHAKE_CLASS;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use vitrine_core::Document;

    struct Page {
        doc: Document,
        forms: FormController,
        fields: Vec<ElementId>,
        submit: ElementId,
        out: Outbox,
    }

    fn community_page() -> Page {
        let mut doc = Document::default();
        let form = doc.append_with_id("form", None, "community-form");
        doc.add_class(form, "site-form").unwrap();
        let mut fields = Vec::new();
        for (name, rules) in [
            ("name", "required,minLength:2"),
            ("email", "required,email"),
            ("aiExperience", "required"),
            ("company", ""),
        ] {
            let el = doc.create_element("input", Some(form));
            doc.set_attribute(el, "name", name).unwrap();
            doc.set_attribute(el, "data-validate", rules).unwrap();
            fields.push(el);
        }
        let submit = doc.create_element("button", Some(form));
        doc.set_attribute(submit, "type", "submit").unwrap();
        doc.set_text(submit, "Join the Community").unwrap();
        let forms = FormController::attach(&mut doc, FormConfig::default()).unwrap();
        Page {
            doc,
            forms,
            fields,
            submit,
            out: Outbox::new(),
        }
    }

    impl Page {
        fn fill(&mut self, values: &[&str]) {
            for (&el, value) in self.fields.iter().zip(values) {
                self.doc.set_value(el, value).unwrap();
            }
        }

        fn begin(&mut self) -> Option<SubmitRequest> {
            self.forms
                .begin_submit(&mut self.doc, "community-form", &mut self.out)
                .unwrap()
        }
    }

    #[test]
    fn attach_rejects_unknown_rules() {
        let mut doc = Document::default();
        let form = doc.append_with_id("form", None, "f");
        doc.add_class(form, "site-form").unwrap();
        let el = doc.create_element("input", Some(form));
        doc.set_attribute(el, "name", "x").unwrap();
        doc.set_attribute(el, "data-validate", "required,bogus").unwrap();
        let err = FormController::attach(&mut doc, FormConfig::default()).unwrap_err();
        assert_eq!(err, FormError::UnknownRule("bogus".into()));
    }

    #[test]
    fn begin_submit_locks_form_and_builds_request() {
        let mut p = community_page();
        p.fill(&["Test User", "test@example.com", "beginner", ""]);
        let req = p.begin().unwrap();
        assert_eq!(req.endpoint, "/api/community-join");
        assert_eq!(
            req.body,
            json!({
                "name": "Test User",
                "email": "test@example.com",
                "aiExperience": "beginner",
                "newsletterOptIn": false,
            })
        );
        assert!(p.forms.is_submitting("community-form"));
        assert!(p.fields.iter().all(|&f| p.doc.is_disabled(f)));
        assert!(p.doc.is_disabled(p.submit));
        assert_eq!(p.doc.text(p.submit).as_deref(), Some("Submitting..."));
        assert_eq!(
            p.out,
            vec![Signal::SubmitRequested {
                form: "community-form".into()
            }]
        );
    }

    #[test]
    fn duplicate_submit_is_silent_noop() {
        let mut p = community_page();
        p.fill(&["Test User", "test@example.com", "beginner", ""]);
        assert!(p.begin().is_some());
        let before = p.out.len();
        assert!(p.begin().is_none());
        assert_eq!(p.out.len(), before);
        assert!(p.forms.banner("community-form").is_none());
    }

    #[test]
    fn success_resets_and_restores_controls() {
        let mut p = community_page();
        p.fill(&["Test User", "test@example.com", "beginner", "Acme"]);
        p.begin().unwrap();
        p.forms
            .finish_submit::<String>(
                &mut p.doc,
                "community-form",
                Ok(SubmitResponse::ok("Welcome to the community!")),
                &mut p.out,
            )
            .unwrap();

        assert!(!p.forms.is_submitting("community-form"));
        assert!(p.fields.iter().all(|&f| !p.doc.is_disabled(f)));
        assert_eq!(p.doc.text(p.submit).as_deref(), Some("Join the Community"));
        assert!(p.fields.iter().all(|&f| p.doc.value(f).as_deref() == Some("")));
        let banner = p.forms.banner("community-form").unwrap();
        assert_eq!(p.doc.text(banner).as_deref(), Some("Welcome to the community!"));
        assert!(p.doc.has_class(banner, "success"));
        assert_eq!(
            p.out.last(),
            Some(&Signal::FormSubmitted {
                form: "community-form".into(),
                success: true,
                message: "Welcome to the community!".into(),
            })
        );
    }

    #[test]
    fn transport_failure_keeps_values() {
        let mut p = community_page();
        p.fill(&["Test User", "test@example.com", "beginner", ""]);
        p.begin().unwrap();
        p.forms
            .finish_submit(&mut p.doc, "community-form", Err("connection refused"), &mut p.out)
            .unwrap();
        assert_eq!(p.doc.value(p.fields[0]).as_deref(), Some("Test User"));
        let banner = p.forms.banner("community-form").unwrap();
        assert_eq!(
            p.doc.text(banner).as_deref(),
            Some("Something went wrong. Please try again.")
        );
        assert!(p.doc.has_class(banner, "error"));
        let form = p.forms.form_element("community-form").unwrap();
        assert!(p.doc.has_class(form, SHAKE_CLASS));
    }

    #[test]
    fn server_failure_shows_server_message() {
        let mut p = community_page();
        p.fill(&["Test User", "test@example.com", "beginner", ""]);
        p.begin().unwrap();
        p.forms
            .finish_submit::<String>(
                &mut p.doc,
                "community-form",
                Ok(SubmitResponse::failed("Email already registered")),
                &mut p.out,
            )
            .unwrap();
        let banner = p.forms.banner("community-form").unwrap();
        assert_eq!(p.doc.text(banner).as_deref(), Some("Email already registered"));
        assert!(!p.doc.has_class(banner, "success"));
    }

    #[test]
    fn validation_failure_blocks_request() {
        let mut p = community_page();
        p.fill(&["Test User", "not-an-email", "", ""]);
        assert!(p.begin().is_none());
        assert!(!p.forms.is_submitting("community-form"));
        assert!(p.out.is_empty());
        assert_eq!(p.doc.active_element(), Some(p.fields[1]));
        assert_eq!(
            p.doc.attribute(p.fields[2], "aria-invalid").as_deref(),
            Some("true")
        );
        let banner = p.forms.banner("community-form").unwrap();
        assert!(p.doc.has_class(banner, "error"));
        assert!(!p.doc.is_disabled(p.submit));
    }

    #[test]
    fn blur_validates_and_input_is_debounced() {
        let mut p = community_page();
        let t0 = Instant::now();
        let email = p.fields[1];
        p.doc.set_value(email, "nope").unwrap();
        p.forms
            .handle_event(&mut p.doc, &Event::Blur(email), t0, &mut p.out)
            .unwrap();
        assert_eq!(p.doc.attribute(email, "aria-invalid").as_deref(), Some("true"));

        p.doc.set_value(email, "a@b.co").unwrap();
        p.forms
            .handle_event(&mut p.doc, &Event::Input(email), t0, &mut p.out)
            .unwrap();
        p.forms
            .tick(&mut p.doc, t0 + Duration::from_millis(299), &mut p.out)
            .unwrap();
        assert_eq!(p.doc.attribute(email, "aria-invalid").as_deref(), Some("true"));
        p.forms
            .tick(&mut p.doc, t0 + Duration::from_millis(300), &mut p.out)
            .unwrap();
        assert_eq!(p.doc.attribute(email, "aria-invalid"), None);
    }

    #[test]
    fn submit_event_queues_request() {
        let mut p = community_page();
        p.fill(&["Test User", "test@example.com", "beginner", ""]);
        let form = p.forms.form_element("community-form").unwrap();
        let outcome = p
            .forms
            .handle_event(&mut p.doc, &Event::Submit(form), Instant::now(), &mut p.out)
            .unwrap();
        assert_eq!(outcome, EventOutcome::PREVENT_DEFAULT);
        p.forms
            .handle_event(&mut p.doc, &Event::Submit(form), Instant::now(), &mut p.out)
            .unwrap();
        assert_eq!(p.forms.take_requests().len(), 1);
        assert!(p.forms.take_requests().is_empty());
    }
}
