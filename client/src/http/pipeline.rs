use super::{CLIENT_REQUEST_ID_HEADER, REQUEST_ID_HEADER, RETRY_AFTER_HEADER};
use crate::auth::{TokenCache, TokenCredential};
use crate::common::{ClientError, ClientResult, RateLimiter};
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::{Method, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("azpager/", env!("CARGO_PKG_VERSION"));

/// One outgoing request, before pipeline policies are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    /// Absolute URL
    pub url: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a query parameter, replacing an earlier value with the same name.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.query.retain(|(existing, _)| *existing != name);
        self.query.push((name, value.into()));
        self
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    /// Final URL after redirects
    pub url: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Body as JSON. An empty body reads as `null`.
    pub fn json(&self) -> ClientResult<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(ClientError::from)
    }

    pub fn request_id(&self) -> Option<String> {
        self.header(REQUEST_ID_HEADER).map(str::to_string)
    }

    /// Server-suggested delay from `retry-after-ms`, `x-ms-retry-after-ms`
    /// or `Retry-After` (delta seconds or an HTTP date).
    pub fn retry_after(&self) -> Option<Duration> {
        for name in ["retry-after-ms", "x-ms-retry-after-ms"] {
            if let Some(ms) = self.header(name).and_then(|v| v.parse::<u64>().ok()) {
                return Some(Duration::from_millis(ms));
            }
        }

        let raw = self.header(RETRY_AFTER_HEADER)?;
        if let Ok(seconds) = raw.parse::<u64>() {
            return Some(Duration::from_secs(seconds));
        }

        let at = chrono::DateTime::parse_from_rfc2822(raw).ok()?;
        let delta = at.with_timezone(&chrono::Utc) - chrono::Utc::now();
        Some(delta.to_std().unwrap_or(Duration::ZERO))
    }
}

/// Sends requests with the client policies applied, in this order: rate
/// limit, bearer token, client request id, user agent, api-version.
///
/// Cheap to clone; clones share the token cache and rate limiter.
#[derive(Clone)]
pub struct HttpPipeline {
    client: reqwest::Client,
    credential: Option<Arc<dyn TokenCredential>>,
    scope: String,
    token_cache: TokenCache,
    user_agent: String,
    api_version: Option<String>,
    rate_limiter: Option<RateLimiter>,
}

impl std::fmt::Debug for HttpPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPipeline")
            .field("authenticated", &self.credential.is_some())
            .field("scope", &self.scope)
            .field("user_agent", &self.user_agent)
            .field("api_version", &self.api_version)
            .field("rate_limiter", &self.rate_limiter)
            .finish()
    }
}

impl HttpPipeline {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            credential: None,
            scope: String::new(),
            token_cache: TokenCache::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            api_version: None,
            rate_limiter: None,
        }
    }

    pub fn with_credential(
        mut self,
        credential: Arc<dyn TokenCredential>,
        scope: impl Into<String>,
    ) -> Self {
        self.credential = Some(credential);
        self.scope = scope.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Appended as `api-version` to every request URL that does not carry one.
    pub fn with_api_version(mut self, api_version: Option<String>) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Option<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_ref()
    }

    /// Sends `spec` once.
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] when no response arrives and
    /// [`ClientError::Service`] for any non-2xx status.
    pub async fn send(&self, operation: &str, spec: &RequestSpec) -> ClientResult<RawResponse> {
        let url = self.resolve_url(spec)?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let mut request = self.client.request(spec.method.clone(), url.clone());

        if let Some(credential) = &self.credential {
            let token = self
                .token_cache
                .get_or_fetch(credential.as_ref(), &self.scope)
                .await?;
            request = request.bearer_auth(token.token);
        }

        let client_request_id = uuid::Uuid::new_v4().to_string();
        request = request
            .header(CLIENT_REQUEST_ID_HEADER, &client_request_id)
            .header(USER_AGENT, &self.user_agent);

        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        log::debug!(
            "{operation}: {} {url} (client request id {client_request_id})",
            spec.method
        );

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::transport(operation, e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::transport(operation, e))?;

        let raw = RawResponse {
            status,
            headers,
            body,
            url: final_url,
        };

        if !(200..300).contains(&status) {
            let error =
                ClientError::from_service_response(operation, status, raw.request_id(), &raw.body);
            log::warn!("{operation} failed: {error}");
            return Err(error);
        }

        Ok(raw)
    }

    fn resolve_url(&self, spec: &RequestSpec) -> ClientResult<Url> {
        let mut url = Url::parse(&spec.url)
            .map_err(|e| ClientError::Configuration(format!("Invalid URL '{}': {e}", spec.url)))?;

        let existing: Vec<String> = url.query_pairs().map(|(name, _)| name.into_owned()).collect();
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &spec.query {
                if !existing.contains(name) {
                    pairs.append_pair(name, value);
                }
            }
            if let Some(api_version) = &self.api_version {
                let explicit = spec.query.iter().any(|(name, _)| name == "api-version");
                if !explicit && !existing.iter().any(|name| name == "api-version") {
                    pairs.append_pair("api-version", api_version);
                }
            }
        }

        // query_pairs_mut leaves a dangling '?' when nothing was appended
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }
}
