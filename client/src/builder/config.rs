use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 1;
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Polls faster than this mostly burn quota
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// One day
pub const MAX_OPERATION_TIMEOUT_SECS: u64 = 86_400;

pub const MAX_REQUESTS_PER_SECOND: u32 = 1_000;

/// Settings for one [`ServiceClient`](super::ServiceClient).
///
/// Every field is optional so the struct can be deserialized from partial
/// configuration sources; accessors apply the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    endpoint: Option<String>,
    api_version: Option<String>,
    scope: Option<String>,
    request_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    operation_timeout_secs: Option<u64>,
    max_pages: Option<usize>,
    requests_per_second: Option<u32>,
    user_agent: Option<String>,
    stop_local_on_unsupported_cancel: Option<bool>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing endpoint")]
    MissingEndpoint,
    #[error("Invalid endpoint '{value}': {reason}")]
    InvalidEndpoint { value: String, reason: String },
    #[error("Invalid request_timeout_secs: {configured} (min: {min_limit}, max: {max_limit})")]
    RequestTimeout {
        configured: u64,
        min_limit: u64,
        max_limit: u64,
    },
    #[error("Invalid poll_interval_ms: {configured} (min: {min_limit}, max: {max_limit})")]
    PollInterval {
        configured: u64,
        min_limit: u64,
        max_limit: u64,
    },
    #[error("Invalid operation_timeout_secs: {configured} (limit: {limit})")]
    OperationTimeout { configured: u64, limit: u64 },
    #[error("Invalid max_pages: {configured} (must be at least 1)")]
    MaxPages { configured: usize },
    #[error("Invalid requests_per_second: {configured} (min: 1, max: {limit})")]
    RequestsPerSecond { configured: u32, limit: u32 },
}

impl ConfigValidationError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigValidationError::MissingEndpoint => "No endpoint configured!\n\n\
                Set `endpoint` in azpager.toml or AZPAGER__CLIENT__ENDPOINT in your environment."
                .to_string(),
            ConfigValidationError::InvalidEndpoint { value, reason } => format!(
                "Endpoint is not a valid URL!\n\n\
                Your configured value: {value}\n\
                Problem: {reason}\n\n\
                Use an absolute URL such as https://management.azure.com/."
            ),
            ConfigValidationError::RequestTimeout {
                configured,
                min_limit,
                max_limit,
            } => format!(
                "Request timeout out of range!\n\n\
                Your configured value: {configured} seconds\n\
                Valid range: {min_limit} - {max_limit}\n\n\
                Please update request_timeout_secs."
            ),
            ConfigValidationError::PollInterval {
                configured,
                min_limit,
                max_limit,
            } => format!(
                "Poll interval out of range!\n\n\
                Your configured value: {configured} ms\n\
                Valid range: {min_limit} - {max_limit}\n\n\
                Please update poll_interval_ms."
            ),
            ConfigValidationError::OperationTimeout { configured, limit } => format!(
                "Operation timeout too high!\n\n\
                Your configured value: {configured} seconds\n\
                Maximum: {limit} seconds\n\n\
                Please update operation_timeout_secs."
            ),
            ConfigValidationError::MaxPages { configured } => format!(
                "Page limit too low!\n\n\
                Your configured value: {configured}\n\n\
                Remove max_pages to list everything, or set it to 1 or more."
            ),
            ConfigValidationError::RequestsPerSecond { configured, limit } => format!(
                "Request rate out of range!\n\n\
                Your configured value: {configured}\n\
                Valid range: 1 - {limit}\n\n\
                Remove requests_per_second to disable client-side throttling."
            ),
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }

    /// Validate the configuration against defined limits
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        match self.endpoint.as_deref().map(str::trim) {
            None | Some("") => errors.push(ConfigValidationError::MissingEndpoint),
            Some(endpoint) => match reqwest::Url::parse(endpoint) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                Ok(url) => errors.push(ConfigValidationError::InvalidEndpoint {
                    value: endpoint.to_string(),
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                }),
                Err(e) => errors.push(ConfigValidationError::InvalidEndpoint {
                    value: endpoint.to_string(),
                    reason: e.to_string(),
                }),
            },
        }

        let timeout = self.request_timeout().as_secs();
        if !(MIN_REQUEST_TIMEOUT_SECS..=MAX_REQUEST_TIMEOUT_SECS).contains(&timeout) {
            errors.push(ConfigValidationError::RequestTimeout {
                configured: timeout,
                min_limit: MIN_REQUEST_TIMEOUT_SECS,
                max_limit: MAX_REQUEST_TIMEOUT_SECS,
            });
        }

        let interval = self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&interval) {
            errors.push(ConfigValidationError::PollInterval {
                configured: interval,
                min_limit: MIN_POLL_INTERVAL_MS,
                max_limit: MAX_POLL_INTERVAL_MS,
            });
        }

        let operation_timeout = self.operation_timeout().as_secs();
        if operation_timeout > MAX_OPERATION_TIMEOUT_SECS {
            errors.push(ConfigValidationError::OperationTimeout {
                configured: operation_timeout,
                limit: MAX_OPERATION_TIMEOUT_SECS,
            });
        }

        if let Some(0) = self.max_pages {
            errors.push(ConfigValidationError::MaxPages { configured: 0 });
        }

        if let Some(rps) = self.requests_per_second {
            if rps == 0 || rps > MAX_REQUESTS_PER_SECOND {
                errors.push(ConfigValidationError::RequestsPerSecond {
                    configured: rps,
                    limit: MAX_REQUESTS_PER_SECOND,
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Token scope; defaults to `<endpoint origin>/.default`.
    pub fn scope(&self) -> Option<String> {
        if let Some(scope) = &self.scope {
            return Some(scope.clone());
        }
        let endpoint = reqwest::Url::parse(self.endpoint.as_deref()?).ok()?;
        Some(format!("{}/.default", endpoint.origin().ascii_serialization()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(30))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs.unwrap_or(600))
    }

    /// `None` lists until the service stops returning continuation tokens.
    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    pub fn requests_per_second(&self) -> Option<u32> {
        self.requests_per_second
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .unwrap_or(crate::http::pipeline::DEFAULT_USER_AGENT)
    }

    pub fn stop_local_on_unsupported_cancel(&self) -> bool {
        self.stop_local_on_unsupported_cancel.unwrap_or(true)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = Some(ms);
        self
    }

    pub fn with_operation_timeout_secs(mut self, secs: u64) -> Self {
        self.operation_timeout_secs = Some(secs);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = Some(rps);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_stop_local_on_unsupported_cancel(mut self, stop: bool) -> Self {
        self.stop_local_on_unsupported_cancel = Some(stop);
        self
    }
}
