//! HTTP client for the organization registry.
//!
//! Authenticates with the OAuth2 client-credentials flow. The access token is
//! state of the client instance: acquired on first use, reused until shortly
//! before expiry, and refreshed exactly once when a call comes back 401.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, trace};

use crate::config::RegistrySettings;
use crate::infrastructure::error::{RegistryError, RegistryResult};
use crate::infrastructure::traits::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, LinkUpdate, NewOrganization, Registry,
};

/// Tracing target for request/response diagnostics.
pub const REGISTRY_TARGET: &str = "orgsync::registry";

/// Tokens are refreshed this long before they expire.
const TOKEN_EXPIRY_GRACE: Duration = Duration::from_secs(30);

/// Used when the token response carries no `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Response bodies are cut to this many characters in TRACE events and errors.
const LOG_BODY_LIMIT: usize = 300;

const HTTP_UNAUTHORIZED: u16 = 401;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_expired(&self, grace_period: Duration) -> bool {
        Instant::now() + grace_period >= self.expires_at
    }
}

/// Enforces a minimum interval between consecutive requests.
#[derive(Debug)]
struct Throttle {
    min_interval: Option<Duration>,
    last_request: Option<Instant>,
}

impl Throttle {
    fn wait(&mut self) {
        if let (Some(interval), Some(last)) = (self.min_interval, self.last_request) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// Registry client speaking the registry's REST API.
pub struct RegistryClient {
    settings: RegistrySettings,
    transport: Arc<dyn HttpTransport>,
    debug: bool,
    token: Mutex<Option<CachedToken>>,
    throttle: Mutex<Throttle>,
}

impl RegistryClient {
    /// Create a client; `debug` raises request/response events from TRACE to INFO
    /// and logs response bodies in full.
    pub fn new(settings: RegistrySettings, transport: Arc<dyn HttpTransport>, debug: bool) -> Self {
        // Unusable rates are rejected by `Settings::validate_registry`
        let throttle = Throttle {
            min_interval: settings.min_request_interval().unwrap_or_default(),
            last_request: None,
        };
        Self {
            settings,
            transport,
            debug,
            token: Mutex::new(None),
            throttle: Mutex::new(throttle),
        }
    }

    fn organizations_url(&self) -> String {
        format!("{}/organizations", self.settings.base_url.trim_end_matches('/'))
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        // The guarded state stays consistent even if a holder panicked
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns a valid access token, acquiring one if none is cached.
    fn access_token(&self) -> RegistryResult<String> {
        let mut cache = Self::lock(&self.token);
        if let Some(ref token) = *cache {
            if !token.is_expired(TOKEN_EXPIRY_GRACE) {
                return Ok(token.access_token.clone());
            }
        }
        let token = self.acquire_token()?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token, forcing a refresh on next use.
    fn invalidate_token(&self) {
        *Self::lock(&self.token) = None;
    }

    #[instrument(level = "debug", skip(self))]
    fn acquire_token(&self) -> RegistryResult<CachedToken> {
        const OPERATION: &str = "token";
        let request = HttpRequest::new(HttpMethod::Post, &self.settings.token_url).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("scope", self.settings.scope.as_str()),
        ]);

        let response = self.send(OPERATION, &request, false)?;
        if !response.is_success() {
            return Err(RegistryError::unavailable(
                OPERATION,
                format!("status {}: {}", response.status, truncate(&response.body)),
            ));
        }

        let token: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            RegistryError::unavailable(OPERATION, format!("invalid token response: {}", e))
        })?;
        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        debug!("acquired access token, expires in {}s", lifetime);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }

    /// One throttled HTTP exchange, logged for diagnostics.
    fn send(
        &self,
        operation: &'static str,
        request: &HttpRequest,
        retry: bool,
    ) -> RegistryResult<HttpResponse> {
        Self::lock(&self.throttle).wait();
        let attempt = if retry { "retry" } else { "first" };
        let result = self.transport.send(request);

        match &result {
            Ok(response) => {
                if self.debug {
                    info!(target: REGISTRY_TARGET, operation, attempt, method = request.method.as_str(), url = %request.display_url(), request_body = %request.body, status = response.status, response_body = %response.body, "registry call");
                } else {
                    trace!(target: REGISTRY_TARGET, operation, attempt, method = request.method.as_str(), url = %request.display_url(), request_body = %request.body, status = response.status, response_body = %truncate(&response.body), "registry call");
                }
            }
            Err(error) => {
                if self.debug {
                    info!(target: REGISTRY_TARGET, operation, attempt, method = request.method.as_str(), url = %request.display_url(), request_body = %request.body, %error, "registry call failed");
                } else {
                    trace!(target: REGISTRY_TARGET, operation, attempt, method = request.method.as_str(), url = %request.display_url(), request_body = %request.body, %error, "registry call failed");
                }
            }
        }

        result.map_err(|e| RegistryError::unavailable(operation, e.0))
    }

    /// Send with a bearer token; 401 maps to `AuthExpired`, other non-2xx to `Unavailable`.
    fn attempt(
        &self,
        operation: &'static str,
        request: &HttpRequest,
        retry: bool,
    ) -> RegistryResult<HttpResponse> {
        let token = self.access_token()?;
        let request = request
            .clone()
            .header("Authorization", &format!("Bearer {}", token));
        let response = self.send(operation, &request, retry)?;

        if response.status == HTTP_UNAUTHORIZED {
            return Err(RegistryError::AuthExpired { operation });
        }
        if !response.is_success() {
            return Err(RegistryError::unavailable(
                operation,
                format!("status {}: {}", response.status, truncate(&response.body)),
            ));
        }
        Ok(response)
    }

    /// Authorized call with one token refresh and one retry on 401.
    fn authorized(
        &self,
        operation: &'static str,
        request: HttpRequest,
    ) -> RegistryResult<HttpResponse> {
        match self.attempt(operation, &request, false) {
            Err(RegistryError::AuthExpired { .. }) => {
                debug!("{}: unauthorized, refreshing token and retrying once", operation);
                self.invalidate_token();
                match self.attempt(operation, &request, true) {
                    Err(RegistryError::AuthExpired { operation }) => Err(
                        RegistryError::unavailable(operation, "unauthorized after token refresh"),
                    ),
                    other => other,
                }
            }
            other => other,
        }
    }
}

impl Registry for RegistryClient {
    #[instrument(level = "debug", skip(self))]
    fn find_by_description(&self, description: &str) -> RegistryResult<Option<i64>> {
        const OPERATION: &str = "find_by_description";
        let request = HttpRequest::new(HttpMethod::Get, self.organizations_url())
            .query("description", description);
        let response = self.authorized(OPERATION, request)?;

        let body: Value = serde_json::from_str(&response.body).map_err(|e| {
            RegistryError::unavailable(OPERATION, format!("invalid JSON response: {}", e))
        })?;
        let candidate = match &body {
            Value::Array(items) => items.first(),
            Value::Object(_) => Some(&body),
            _ => None,
        };
        Ok(candidate.and_then(extract_id))
    }

    #[instrument(level = "debug", skip(self), fields(description = %organization.description))]
    fn create(&self, organization: &NewOrganization) -> RegistryResult<i64> {
        const OPERATION: &str = "create";
        let payload = serde_json::to_value(organization)
            .map_err(|e| RegistryError::unavailable(OPERATION, e.to_string()))?;
        let request = HttpRequest::new(HttpMethod::Post, self.organizations_url())
            .header("Content-Type", "application/json")
            .json(payload);
        let response = self.authorized(OPERATION, request)?;

        serde_json::from_str::<Value>(&response.body)
            .ok()
            .as_ref()
            .and_then(extract_id)
            .ok_or_else(|| {
                RegistryError::unavailable(
                    OPERATION,
                    format!("response has no id: {}", truncate(&response.body)),
                )
            })
    }

    #[instrument(level = "debug", skip(self, update))]
    fn update_links(&self, id: i64, update: &LinkUpdate) -> RegistryResult<()> {
        const OPERATION: &str = "update_links";
        let payload = serde_json::to_value(update)
            .map_err(|e| RegistryError::unavailable(OPERATION, e.to_string()))?;
        let request =
            HttpRequest::new(HttpMethod::Patch, format!("{}/{}", self.organizations_url(), id))
                .header("Content-Type", "application/merge-patch+json")
                .json(payload);
        self.authorized(OPERATION, request)?;
        Ok(())
    }
}

/// Registry ids arrive as numbers or as numeric strings.
fn extract_id(value: &Value) -> Option<i64> {
    match value.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}
