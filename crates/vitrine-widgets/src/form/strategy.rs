#![forbid(unsafe_code)]

//! Per-form submission strategies.
//!
//! The form id selects a strategy, which maps the collected field values to
//! a typed JSON payload and an endpoint. Strategies mirror the server's
//! required-field checks so a well-formed form never provokes a 400.

use std::sync::LazyLock;

use ahash::AHashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::FormError;
use super::rules::EMAIL_PATTERN;

/// Compiled once for the server-side email check.
static EMAIL_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN));

/// Field name → trimmed value.
pub type FormValues = AHashMap<String, String>;

/// Which submission strategy handles a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    Newsletter,
    Consultation,
    Community,
    Generic,
}

impl FormKind {
    /// Dispatch on the form identifier.
    pub fn from_form_id(id: &str) -> Self {
        let id = id.to_ascii_lowercase();
        if id.contains("newsletter") {
            Self::Newsletter
        } else if id.contains("consult") {
            Self::Consultation
        } else if id.contains("community") {
            Self::Community
        } else {
            Self::Generic
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Newsletter => "/api/newsletter",
            Self::Consultation => "/api/consultation",
            Self::Community => "/api/community-join",
            Self::Generic => "/api/contact",
        }
    }

    /// Build the request for `form_id` from `values`.
    pub fn build(self, form_id: &str, values: &FormValues) -> Result<SubmitRequest, FormError> {
        let body = match self {
            Self::Newsletter => to_json(&NewsletterPayload {
                email: required_email(values)?,
                name: optional(values, "name"),
            })?,
            Self::Consultation => to_json(&ConsultationPayload {
                name: required(values, "name")?,
                email: required_email(values)?,
                company: optional(values, "company"),
                phone: optional(values, "phone"),
                message: optional(values, "message"),
                service: optional(values, "service"),
            })?,
            Self::Community => to_json(&CommunityPayload {
                name: required(values, "name")?,
                email: required_email(values)?,
                ai_experience: required(values, "aiExperience")?,
                company: optional(values, "company"),
                business_size: optional(values, "businessSize"),
                newsletter_opt_in: optional(values, "newsletterOptIn").is_some_and(|v| is_checked(&v)),
            })?,
            Self::Generic => {
                let mut map = serde_json::Map::new();
                let mut keys: Vec<_> = values.keys().collect();
                keys.sort();
                for key in keys {
                    map.insert(key.clone(), serde_json::Value::String(values[key].clone()));
                }
                serde_json::Value::Object(map)
            }
        };
        Ok(SubmitRequest {
            form_id: form_id.to_string(),
            kind: self,
            endpoint: self.endpoint().to_string(),
            body,
        })
    }
}

fn to_json<T: Serialize>(payload: &T) -> Result<serde_json::Value, FormError> {
    serde_json::to_value(payload).map_err(|e| FormError::Payload(e.to_string()))
}

fn optional(values: &FormValues, key: &str) -> Option<String> {
    values
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(values: &FormValues, key: &str) -> Result<String, FormError> {
    optional(values, key).ok_or_else(|| FormError::MissingField(key.to_string()))
}

fn required_email(values: &FormValues) -> Result<String, FormError> {
    let email = required(values, "email")?;
    let re = EMAIL_RE.as_ref().map_err(|e| FormError::Pattern {
        rule: "email".to_string(),
        reason: e.to_string(),
    })?;
    if re.is_match(&email) {
        Ok(email)
    } else {
        Err(FormError::InvalidEmail(email))
    }
}

fn is_checked(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "on" | "true" | "yes" | "1")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterPayload {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationPayload {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPayload {
    pub name: String,
    pub email: String,
    pub ai_experience: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_size: Option<String>,
    pub newsletter_opt_in: bool,
}

/// A request ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub form_id: String,
    pub kind: FormKind,
    pub endpoint: String,
    pub body: serde_json::Value,
}

/// Server reply: `{success, message}` on every status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl SubmitResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn values(pairs: &[(&str, &str)]) -> FormValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn dispatch_by_form_id() {
        assert_eq!(FormKind::from_form_id("newsletter-form"), FormKind::Newsletter);
        assert_eq!(FormKind::from_form_id("consultationForm"), FormKind::Consultation);
        assert_eq!(FormKind::from_form_id("community-join-form"), FormKind::Community);
        assert_eq!(FormKind::from_form_id("contact"), FormKind::Generic);
    }

    #[test]
    fn community_payload_is_camel_case() {
        let req = FormKind::Community
            .build(
                "community-form",
                &values(&[
                    ("name", "Test User"),
                    ("email", "test@example.com"),
                    ("aiExperience", "beginner"),
                    ("newsletterOptIn", "on"),
                    ("company", "  "),
                ]),
            )
            .unwrap();
        assert_eq!(req.endpoint, "/api/community-join");
        assert_eq!(
            req.body,
            json!({
                "name": "Test User",
                "email": "test@example.com",
                "aiExperience": "beginner",
                "newsletterOptIn": true,
            })
        );
    }

    #[test]
    fn community_requires_experience() {
        let err = FormKind::Community
            .build("community", &values(&[("name", "A"), ("email", "a@b.co")]))
            .unwrap_err();
        assert_eq!(err, FormError::MissingField("aiExperience".into()));
    }

    #[test]
    fn email_check_reuses_one_compiled_pattern() {
        let first = EMAIL_RE.as_ref().unwrap() as *const Regex;
        for email in ["a@b.co", "someone@example.org"] {
            let req = FormKind::Newsletter
                .build("newsletter", &values(&[("email", email)]))
                .unwrap();
            assert_eq!(req.body["email"], email);
        }
        assert_eq!(EMAIL_RE.as_ref().unwrap() as *const Regex, first);
    }

    #[test]
    fn newsletter_checks_email() {
        let err = FormKind::Newsletter
            .build("newsletter", &values(&[("email", "nope")]))
            .unwrap_err();
        assert_eq!(err, FormError::InvalidEmail("nope".into()));
        let ok = FormKind::Newsletter
            .build("newsletter", &values(&[("email", "a@b.co")]))
            .unwrap();
        assert_eq!(ok.body, json!({ "email": "a@b.co" }));
    }

    #[test]
    fn generic_passes_fields_through() {
        let req = FormKind::Generic
            .build("contact", &values(&[("topic", "hi"), ("email", "x@y.z")]))
            .unwrap();
        assert_eq!(req.body, json!({ "email": "x@y.z", "topic": "hi" }));
        assert_eq!(req.endpoint, "/api/contact");
    }

    #[test]
    fn response_message_defaults_to_empty() {
        let resp: SubmitResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert_eq!(resp, SubmitResponse::failed(""));
    }
}
