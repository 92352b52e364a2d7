use super::config::ClientConfig;
use super::service_client::ServiceClient;
use crate::auth::TokenCredential;
use crate::common::{ClientError, ClientResult, RateLimiter};
use crate::http::HttpPipeline;
use std::sync::Arc;

/// Builds a [`ServiceClient`]. Each call to [`build`](Self::build) yields an
/// independent client; nothing is shared through globals.
pub struct ClientBuilder {
    config: ClientConfig,
    credential: Option<Arc<dyn TokenCredential>>,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            credential: None,
            http_client: None,
        }
    }

    pub fn credential<C>(mut self, credential: C) -> Self
    where
        C: TokenCredential + 'static,
    {
        self.credential = Some(Arc::new(credential));
        self
    }

    pub fn shared_credential(mut self, credential: Arc<dyn TokenCredential>) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Use a preconfigured transport. `request_timeout_secs` is then ignored.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> ClientResult<ServiceClient> {
        if let Err(errors) = self.config.validate() {
            let summary = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ClientError::Configuration(summary));
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(self.config.request_timeout())
                .build()
                .map_err(|e| {
                    ClientError::Configuration(format!("Failed to create HTTP client: {e}"))
                })?,
        };

        let rate_limiter = self
            .config
            .requests_per_second()
            .map(RateLimiter::new)
            .transpose()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        let mut pipeline = HttpPipeline::new(http_client)
            .with_user_agent(self.config.user_agent())
            .with_api_version(self.config.api_version().map(str::to_string))
            .with_rate_limiter(rate_limiter);

        match (self.credential, self.config.scope()) {
            (Some(credential), Some(scope)) => {
                pipeline = pipeline.with_credential(credential, scope);
            }
            (Some(_), None) => {
                return Err(ClientError::Configuration(
                    "A credential was supplied but no token scope could be determined".to_string(),
                ));
            }
            (None, _) => log::debug!("Building client without credentials"),
        }

        ServiceClient::new(pipeline, self.config)
    }
}
