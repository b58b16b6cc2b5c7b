#![forbid(unsafe_code)]

//! Field-level validation bound to the document.
//!
//! An invalid field gets an error node inserted directly after it, plus
//! `aria-invalid="true"` and `aria-describedby` pointing at that node. A
//! passing validation removes all three.

use vitrine_core::{Debounce, Dom, DomError, ElementId, Instant};

use super::FormConfig;
use super::FormError;
use super::rules::{FieldRule, RuleSet, ValidationOutcome};

/// A named form field with its parsed rule list.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    el: ElementId,
    name: String,
    rules: Vec<FieldRule>,
    error_id: String,
    error_node: Option<ElementId>,
    input: Debounce,
}

impl FieldValidator {
    /// Bind `el` if it has a `name` attribute; fields without one are not
    /// part of the submitted values.
    pub fn bind(
        dom: &dyn Dom,
        form_id: &str,
        el: ElementId,
        rule_set: &RuleSet,
        config: &FormConfig,
    ) -> Result<Option<Self>, FormError> {
        let Some(name) = dom.attribute(el, "name") else {
            return Ok(None);
        };
        let rules = match dom.attribute(el, &config.rule_attribute) {
            Some(list) => rule_set.parse(&list)?,
            None => Vec::new(),
        };
        let error_id = match dom.html_id(el) {
            Some(id) => format!("{id}-error"),
            None => format!("{form_id}-{name}-error"),
        };
        Ok(Some(Self {
            el,
            name,
            rules,
            error_id,
            error_node: None,
            input: Debounce::new(config.input_debounce),
        }))
    }

    pub fn element(&self) -> ElementId {
        self.el
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn error_node(&self) -> Option<ElementId> {
        self.error_node
    }

    pub fn value(&self, dom: &dyn Dom) -> String {
        dom.value(self.el).unwrap_or_default()
    }

    /// Evaluate the rules and reflect the outcome into the document.
    pub fn validate(
        &mut self,
        dom: &mut dyn Dom,
        rule_set: &RuleSet,
        config: &FormConfig,
    ) -> Result<ValidationOutcome, DomError> {
        let outcome = rule_set.check(&self.rules, &self.value(dom));
        match outcome.message() {
            Some(message) => self.show_error(dom, message, config)?,
            None => self.clear(dom, config)?,
        }
        Ok(outcome)
    }

    fn show_error(
        &mut self,
        dom: &mut dyn Dom,
        message: &str,
        config: &FormConfig,
    ) -> Result<(), DomError> {
        let node = match self.error_node.filter(|&n| dom.exists(n)) {
            Some(node) => node,
            None => {
                let node = dom.insert_after("div", self.el)?;
                dom.set_html_id(node, &self.error_id)?;
                dom.add_class(node, &config.field_error_class)?;
                dom.set_attribute(node, "role", "alert")?;
                self.error_node = Some(node);
                node
            }
        };
        dom.set_text(node, message)?;
        dom.set_attribute(self.el, "aria-invalid", "true")?;
        dom.set_attribute(self.el, "aria-describedby", &self.error_id)?;
        dom.add_class(self.el, &config.invalid_class)
    }

    /// Remove the error node and ARIA error state.
    pub fn clear(&mut self, dom: &mut dyn Dom, config: &FormConfig) -> Result<(), DomError> {
        if let Some(node) = self.error_node.take()
            && dom.exists(node)
        {
            dom.remove_element(node)?;
        }
        dom.remove_attribute(self.el, "aria-invalid")?;
        dom.remove_attribute(self.el, "aria-describedby")?;
        dom.remove_class(self.el, &config.invalid_class)
    }

    /// Note an input event; validation runs once input settles.
    pub fn note_input(&mut self, now: Instant) {
        self.input.trigger(now);
    }

    /// Whether the input debounce settled at `now`.
    pub fn input_settled(&mut self, now: Instant) -> bool {
        self.input.poll(now)
    }

    pub fn cancel_input(&mut self) {
        self.input.cancel();
    }
}
