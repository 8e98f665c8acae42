//! I/O boundary traits for testability
//!
//! These traits abstract the registry and the HTTP transport underneath it,
//! allowing services and the registry client to be tested with fakes.

use std::fmt;
use std::time::Duration;

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::infrastructure::error::RegistryResult;

/// Payload for creating an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrganization {
    pub parent_id: i64,
    pub name: String,
    pub description: String,
    pub next_sibling_id: i64,
}

/// Payload for updating parent and ordering links of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkUpdate {
    pub parent_id: i64,
    pub name: String,
    pub next_sibling_id: i64,
}

/// Remote organization registry.
///
/// Identity is the natural key (`description`), not a generated id.
pub trait Registry: Send + Sync {
    /// Look up an organization by description. Idempotent.
    fn find_by_description(&self, description: &str) -> RegistryResult<Option<i64>>;

    /// Create an organization and return its id. Not idempotent.
    fn create(&self, organization: &NewOrganization) -> RegistryResult<i64>;

    /// Overwrite parent, name and next-sibling of an organization. Idempotent.
    fn update_links(&self, id: i64, update: &LinkUpdate) -> RegistryResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

impl fmt::Display for HttpBody {
    /// Renders the body for logs; secrets in form bodies are masked.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpBody::Empty => Ok(()),
            HttpBody::Json(value) => write!(f, "{}", value),
            HttpBody::Form(pairs) => {
                let rendered = pairs
                    .iter()
                    .map(|(k, v)| {
                        if k == "client_secret" {
                            format!("{}=***", k)
                        } else {
                            format!("{}={}", k, v)
                        }
                    })
                    .join("&");
                f.write_str(&rendered)
            }
        }
    }
}

/// Transport-agnostic HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: HttpBody,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: HttpBody::Empty,
        }
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = HttpBody::Json(value);
        self
    }

    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        self.body = HttpBody::Form(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// URL including the query string, for logs.
    pub fn display_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .join("&");
        format!("{}?{}", self.url, query)
    }
}

/// Status and body of a completed HTTP exchange (any status code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response (DNS, TLS, timeout, connection).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// HTTP transport abstraction.
pub trait HttpTransport: Send + Sync {
    /// Perform a request. Non-2xx statuses are responses, not errors.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Blocking HTTP transport backed by ureq.
#[derive(Debug)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(concat!("orgsync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl HttpTransport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut req = self.agent.request(request.method.as_str(), &request.url);
        for (key, value) in &request.query {
            req = req.query(key, value);
        }
        for (key, value) in &request.headers {
            req = req.set(key, value);
        }

        let result = match &request.body {
            HttpBody::Empty => req.call(),
            HttpBody::Json(value) => req.send_json(value.clone()),
            HttpBody::Form(pairs) => {
                let pairs: Vec<(&str, &str)> = pairs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                req.send_form(&pairs)
            }
        };

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(TransportError(transport.to_string()))
            }
        };
        let status = response.status();
        let body = response
            .into_string()
            .map_err(|e| TransportError(format!("reading response body: {}", e)))?;
        Ok(HttpResponse { status, body })
    }
}
