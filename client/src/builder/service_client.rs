use super::config::ClientConfig;
use crate::common::{ClientError, ClientResult};
use crate::http::{
    CancelRoute, FinalStateVia, HttpOperationProtocol, HttpPageFetcher, HttpPipeline,
    JsonPageParser, RequestSpec, TokenPlacement,
};
use crate::lro::{Poller, PollerOptions};
use crate::paging::Pager;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Per-call settings for [`ServiceClient::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Defaults to `value`
    pub item_field: Option<String>,
    /// Defaults to `nextLink`
    pub link_field: Option<String>,
    /// Read the continuation token from this response header instead of the body
    pub token_header: Option<String>,
    pub token_placement: TokenPlacement,
    /// Overrides [`ClientConfig::max_pages`]
    pub max_pages: Option<usize>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

/// Per-call settings for [`ServiceClient::begin`].
#[derive(Debug, Clone, Default)]
pub struct LroOptions {
    /// Overrides [`ClientConfig::poll_interval`]
    pub poll_interval: Option<Duration>,
    /// Defaults to [`FinalStateVia::default_for`] the request method
    pub final_state: Option<FinalStateVia>,
    pub cancel: Option<CancelRoute>,
    pub headers: Vec<(String, String)>,
}

/// Entry point for listing, long-running operations and direct calls against
/// one service endpoint. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    pipeline: HttpPipeline,
    endpoint: Url,
    config: ClientConfig,
}

impl ServiceClient {
    pub(crate) fn new(pipeline: HttpPipeline, config: ClientConfig) -> ClientResult<Self> {
        let raw = config
            .endpoint()
            .ok_or_else(|| ClientError::Configuration("Missing endpoint".to_string()))?;
        let mut endpoint = Url::parse(raw)
            .map_err(|e| ClientError::Configuration(format!("Invalid endpoint '{raw}': {e}")))?;

        // relative paths resolve below the endpoint path
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            pipeline,
            endpoint,
            config,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &HttpPipeline {
        &self.pipeline
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval()
    }

    pub fn operation_timeout(&self) -> Duration {
        self.config.operation_timeout()
    }

    /// Absolute URL for `path`. Absolute inputs are returned unchanged.
    pub fn url(&self, path: &str) -> ClientResult<String> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }
        self.endpoint
            .join(path.trim_start_matches('/'))
            .map(String::from)
            .map_err(|e| ClientError::Configuration(format!("Invalid path '{path}': {e}")))
    }

    /// Lazy listing of `path`. No request is sent until the pager is consumed.
    pub fn list<T>(&self, path: &str, options: ListOptions) -> ClientResult<Pager<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut request = RequestSpec::get(self.url(path)?);
        request.query = options.query;
        request.headers = options.headers;

        let mut parser = JsonPageParser::<T>::new();
        if let Some(field) = options.item_field {
            parser = parser.with_item_field(field);
        }
        if let Some(field) = options.link_field {
            parser = parser.with_link_field(field);
        }
        if let Some(header) = options.token_header {
            parser = parser.with_token_header(header);
        }

        let fetcher = HttpPageFetcher::new(self.pipeline.clone(), request, parser)
            .with_placement(options.token_placement)
            .with_operation(format!("list {path}"));

        Ok(Pager::new(fetcher).with_max_pages(options.max_pages.or(self.config.max_pages())))
    }

    /// Sends the initiating request of a long-running operation.
    ///
    /// Returns once the service has accepted the request; use
    /// [`Poller::wait_for_completion`] to drive it to the end.
    pub async fn begin<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: LroOptions,
    ) -> ClientResult<Poller<T>>
    where
        T: DeserializeOwned,
    {
        let mut request = RequestSpec::new(method.clone(), self.url(path)?);
        request.body = body;
        request.headers = options.headers;

        let final_state = options
            .final_state
            .unwrap_or_else(|| FinalStateVia::default_for(&method));
        let protocol = HttpOperationProtocol::new(self.pipeline.clone(), request)
            .with_final_state(final_state)
            .with_cancel(options.cancel);

        let poller_options = PollerOptions {
            poll_interval: options
                .poll_interval
                .unwrap_or_else(|| self.config.poll_interval()),
            stop_local_on_unsupported_cancel: self.config.stop_local_on_unsupported_cancel(),
        };

        Poller::start(protocol, poller_options).await
    }

    /// Single GET, deserialized.
    pub async fn get<T>(&self, path: &str) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let request = RequestSpec::get(self.url(path)?);
        let response = self.pipeline.send(&format!("get {path}"), &request).await?;
        serde_json::from_value(response.json()?).map_err(ClientError::from)
    }
}
