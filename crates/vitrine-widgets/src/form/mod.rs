#![forbid(unsafe_code)]

//! Form validation and submission pipeline.
//!
//! - [`rules`]: rule-list parsing and evaluation.
//! - [`validator`]: per-field DOM binding (inline error node, ARIA state).
//! - [`strategy`]: per-form payload mapping and endpoints.
//! - [`pipeline`]: the [`FormController`] tying them together.
//!
//! Submission is split around the network call so the pipeline stays
//! transport-agnostic: [`FormController::begin_submit`] validates and locks
//! the form and hands back a [`SubmitRequest`]; the caller performs the call
//! and reports the result with [`FormController::finish_submit`].

pub mod pipeline;
pub mod rules;
pub mod strategy;
pub mod validator;

pub use pipeline::FormController;
pub use rules::{FieldRule, RuleMessage, RuleSet, ValidationOutcome, ValidationRule};
pub use strategy::{FormKind, FormValues, SubmitRequest, SubmitResponse};
pub use validator::FieldValidator;

use std::time::Duration;

use thiserror::Error;
use vitrine_core::DomError;

/// Form pipeline errors.
///
/// Validation failures are not errors; they are [`ValidationOutcome`]s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("unknown validation rule `{0}`")]
    UnknownRule(String),
    #[error("rule `{rule}` has invalid parameter `{param}`")]
    InvalidParameter { rule: String, param: String },
    #[error("rule `{rule}` has an invalid pattern: {reason}")]
    Pattern { rule: String, reason: String },
    #[error("no form registered as `{0}`")]
    UnknownForm(String),
    #[error("required field `{0}` is empty")]
    MissingField(String),
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
    #[error("payload serialization failed: {0}")]
    Payload(String),
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Form pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FormConfig {
    /// Forms carrying this class (and an HTML id) are registered at attach.
    pub form_class: String,
    /// Attribute holding a field's rule list.
    pub rule_attribute: String,
    pub validate_on_input: bool,
    pub input_debounce: Duration,
    pub submitting_label: String,
    pub field_error_class: String,
    pub invalid_class: String,
    pub banner_class: String,
    pub success_class: String,
    pub failure_class: String,
    pub generic_error: String,
    pub validation_error: String,
    pub success_fallback: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            form_class: "site-form".to_string(),
            rule_attribute: "data-validate".to_string(),
            validate_on_input: true,
            input_debounce: Duration::from_millis(300),
            submitting_label: "Submitting...".to_string(),
            field_error_class: "field-error".to_string(),
            invalid_class: "error".to_string(),
            banner_class: "form-message".to_string(),
            success_class: "success".to_string(),
            failure_class: "error".to_string(),
            generic_error: "Something went wrong. Please try again.".to_string(),
            validation_error: "Please correct the highlighted fields and try again.".to_string(),
            success_fallback: "Thank you! We'll be in touch soon.".to_string(),
        }
    }
}
