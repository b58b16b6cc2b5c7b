#![forbid(unsafe_code)]

//! Form submission transport.
//!
//! The form pipeline only knows the `{success, message}` contract. A
//! [`Transport`] turns a [`SubmitRequest`] into a [`SubmitResponse`]:
//!
//! - [`HttpTransport`] (feature `http`) POSTs JSON to the site API. Error
//!   statuses that still carry a `{success, message}` body become
//!   `success: false` replies rather than transport errors, so the server's
//!   message reaches the banner.
//! - [`DemoTransport`] answers locally; it backs demo mode and tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vitrine_widgets::{FormKind, SubmitRequest, SubmitResponse};

use crate::error::TransportError;

/// Reply of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub email_configured: bool,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

pub const HEALTH_ENDPOINT: &str = "/api/health";

/// Request/response channel used for form submissions.
#[async_trait(?Send)]
pub trait Transport {
    /// Human-readable name for logs.
    fn name(&self) -> &'static str;

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, TransportError>;

    /// Diagnostics only; never gates submissions.
    async fn health(&self) -> Result<HealthStatus, TransportError>;
}

/// Interpret a raw reply body according to its status code.
pub fn decode_reply(status: u16, body: &str) -> Result<SubmitResponse, TransportError> {
    let parsed = serde_json::from_str::<SubmitResponse>(body);
    match status {
        200..=299 => parsed.map_err(|e| TransportError::Decode(e.to_string())),
        400..=599 => match parsed {
            Ok(reply) => Ok(SubmitResponse {
                success: false,
                ..reply
            }),
            Err(_) => Err(TransportError::Status { status }),
        },
        _ => Err(TransportError::Status { status }),
    }
}

/// Canned success message for demo replies.
pub fn demo_message(kind: FormKind) -> &'static str {
    match kind {
        FormKind::Newsletter => "Thanks for subscribing!",
        FormKind::Consultation => "Thank you! We'll be in touch within 24 hours.",
        FormKind::Community => "Welcome to the community!",
        FormKind::Generic => "Thank you! We'll be in touch soon.",
    }
}

/// Local transport: scripted replies first, then canned successes.
#[derive(Debug, Default)]
pub struct DemoTransport {
    scripted: RefCell<VecDeque<Result<SubmitResponse, TransportError>>>,
    requests: RefCell<Vec<SubmitRequest>>,
    calls: Cell<usize>,
}

impl DemoTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next submission.
    pub fn push_reply(&self, reply: Result<SubmitResponse, TransportError>) {
        self.scripted.borrow_mut().push_back(reply);
    }

    /// Number of `submit` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn requests(&self) -> Vec<SubmitRequest> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Transport for DemoTransport {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, TransportError> {
        self.calls.set(self.calls.get() + 1);
        self.requests.borrow_mut().push(request.clone());
        let reply = self
            .scripted
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(SubmitResponse::ok(demo_message(request.kind))));
        debug!(form = %request.form_id, ok = reply.is_ok(), "demo transport reply");
        reply
    }

    async fn health(&self) -> Result<HealthStatus, TransportError> {
        Ok(HealthStatus {
            status: "ok".to_string(),
            timestamp: String::new(),
            email_configured: false,
        })
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::config::ApiSection;

    /// JSON-over-HTTP transport backed by `reqwest`.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpTransport {
        pub fn new(api: &ApiSection) -> Result<Self, TransportError> {
            let client = reqwest::Client::builder()
                .timeout(api.timeout())
                .build()
                .map_err(|e| TransportError::Unavailable(e.to_string()))?;
            Ok(Self {
                client,
                base_url: api.base_url.trim_end_matches('/').to_string(),
            })
        }

        pub fn url(&self, endpoint: &str) -> String {
            format!("{}{}", self.base_url, endpoint)
        }
    }

    #[async_trait(?Send)]
    impl Transport for HttpTransport {
        fn name(&self) -> &'static str {
            "http"
        }

        async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, TransportError> {
            let url = self.url(&request.endpoint);
            debug!(form = %request.form_id, %url, "posting form");
            let response = self
                .client
                .post(&url)
                .json(&request.body)
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            decode_reply(status, &body)
        }

        async fn health(&self) -> Result<HealthStatus, TransportError> {
            let response = self
                .client
                .get(self.url(HEALTH_ENDPOINT))
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                });
            }
            response
                .json::<HealthStatus>()
                .await
                .map_err(|e| TransportError::Decode(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request(kind: FormKind) -> SubmitRequest {
        SubmitRequest {
            form_id: "f".into(),
            kind,
            endpoint: kind.endpoint().into(),
            body: json!({}),
        }
    }

    #[test]
    fn error_status_with_body_is_a_failed_reply() {
        let reply = decode_reply(400, r#"{"success":false,"message":"Email is required"}"#).unwrap();
        assert_eq!(reply, SubmitResponse::failed("Email is required"));
        // A 5xx claiming success is still a failure.
        let reply = decode_reply(500, r#"{"success":true,"message":"?"}"#).unwrap();
        assert!(!reply.success);
    }

    #[test]
    fn unreadable_bodies() {
        assert_eq!(
            decode_reply(502, "<html>Bad Gateway</html>"),
            Err(TransportError::Status { status: 502 })
        );
        assert!(matches!(decode_reply(200, "not json"), Err(TransportError::Decode(_))));
        assert_eq!(
            decode_reply(200, r#"{"success":true}"#),
            Ok(SubmitResponse::ok(""))
        );
    }

    #[test]
    fn health_wire_format() {
        let health: HealthStatus = serde_json::from_str(
            r#"{"status":"ok","timestamp":"2024-01-01T00:00:00Z","emailConfigured":true}"#,
        )
        .unwrap();
        assert!(health.is_ok());
        assert!(health.email_configured);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn demo_transport_scripts_then_succeeds() {
        let transport = DemoTransport::new();
        transport.push_reply(Err(TransportError::Network("offline".into())));
        let first = transport.submit(&request(FormKind::Newsletter)).await;
        assert!(first.is_err());
        let second = transport.submit(&request(FormKind::Community)).await.unwrap();
        assert_eq!(second, SubmitResponse::ok("Welcome to the community!"));
        assert_eq!(transport.calls(), 2);
        assert_eq!(transport.requests()[1].kind, FormKind::Community);
        assert!(transport.health().await.unwrap().is_ok());
    }
}
