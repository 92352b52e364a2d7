use super::parsers::{AzureStatusParser, StatusParser};
use super::pipeline::{HttpPipeline, RequestSpec};
use crate::common::{ClientError, ClientResult};
use crate::lro::OperationProtocol;
use crate::model::{PollContext, StatusEnvelope};
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::Value;

/// Where the terminal value of a succeeded operation is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalStateVia {
    /// `resourceLocation` of the status monitor, else the monitor's last body
    OperationLocation,
    /// Same as [`FinalStateVia::OperationLocation`] for the legacy header name
    AzureAsyncOperation,
    /// The URL from the initial `Location` header, else the last polled body
    Location,
    /// GET on the URL of the initiating request
    OriginalUri,
}

impl FinalStateVia {
    /// Azure resource-manager conventions: PUT and PATCH re-read the resource,
    /// POST follows `Location`, everything else uses the status monitor.
    pub fn default_for(method: &Method) -> Self {
        if *method == Method::PUT || *method == Method::PATCH {
            FinalStateVia::OriginalUri
        } else if *method == Method::POST {
            FinalStateVia::Location
        } else {
            FinalStateVia::OperationLocation
        }
    }
}

/// How to ask the service to cancel a running operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CancelRoute {
    /// Send this fixed request
    Request(RequestSpec),
    /// POST to the status monitor URL with this path suffix, e.g. `:cancel`
    PollUrlSuffix(String),
    /// DELETE the status monitor URL
    DeletePollUrl,
}

/// [`OperationProtocol`] for Azure-style REST operations.
pub struct HttpOperationProtocol {
    pipeline: HttpPipeline,
    initial: RequestSpec,
    parser: Box<dyn StatusParser>,
    final_state: FinalStateVia,
    cancel: Option<CancelRoute>,
    operation: String,
}

impl std::fmt::Debug for HttpOperationProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOperationProtocol")
            .field("operation", &self.operation)
            .field("final_state", &self.final_state)
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl HttpOperationProtocol {
    pub fn new(pipeline: HttpPipeline, initial: RequestSpec) -> Self {
        let operation = format!("{} {}", initial.method, initial.url);
        let final_state = FinalStateVia::default_for(&initial.method);
        Self {
            pipeline,
            initial,
            parser: Box::new(AzureStatusParser),
            final_state,
            cancel: None,
            operation,
        }
    }

    pub fn with_parser<P>(mut self, parser: P) -> Self
    where
        P: StatusParser + 'static,
    {
        self.parser = Box::new(parser);
        self
    }

    pub fn with_final_state(mut self, final_state: FinalStateVia) -> Self {
        self.final_state = final_state;
        self
    }

    pub fn with_cancel(mut self, cancel: Option<CancelRoute>) -> Self {
        self.cancel = cancel;
        self
    }

    fn final_resource_url(&self, context: &PollContext) -> Option<String> {
        match self.final_state {
            FinalStateVia::OriginalUri => Some(self.initial.url.clone()),
            FinalStateVia::Location
            | FinalStateVia::OperationLocation
            | FinalStateVia::AzureAsyncOperation => context.resource_location.clone(),
        }
    }

    fn cancel_request(&self, route: &CancelRoute, context: &PollContext) -> ClientResult<RequestSpec> {
        let poll_url = || {
            context.poll_url.clone().ok_or_else(|| {
                ClientError::Configuration(
                    "Cannot cancel: the service did not return a status monitor URL".to_string(),
                )
            })
        };

        match route {
            CancelRoute::Request(spec) => Ok(spec.clone()),
            CancelRoute::PollUrlSuffix(suffix) => {
                let url = append_path(&poll_url()?, suffix)?;
                Ok(RequestSpec::new(Method::POST, url))
            }
            CancelRoute::DeletePollUrl => Ok(RequestSpec::new(Method::DELETE, poll_url()?)),
        }
    }
}

fn append_path(url: &str, suffix: &str) -> ClientResult<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| ClientError::Configuration(format!("Invalid URL '{url}': {e}")))?;
    let path = format!("{}{suffix}", parsed.path().trim_end_matches('/'));
    parsed.set_path(&path);
    Ok(parsed.into())
}

#[async_trait]
impl OperationProtocol for HttpOperationProtocol {
    async fn initiate(&self) -> ClientResult<StatusEnvelope> {
        let response = self.pipeline.send(&self.operation, &self.initial).await?;
        let mut envelope = self.parser.parse_status(&response)?;

        // resources that only expose provisioningState are polled in place
        if !envelope.status.is_terminal() && envelope.poll_url.is_none() {
            envelope.poll_url = Some(self.initial.url.clone());
        }

        Ok(envelope)
    }

    async fn poll_status(&self, context: &PollContext) -> ClientResult<StatusEnvelope> {
        let url = context
            .poll_url
            .clone()
            .unwrap_or_else(|| self.initial.url.clone());
        let response = self
            .pipeline
            .send(&self.operation, &RequestSpec::get(url))
            .await?;
        self.parser.parse_status(&response)
    }

    async fn fetch_result(&self, context: &PollContext) -> ClientResult<Value> {
        // completed synchronously: the initiating response already is the result
        if context.poll_url.is_none() {
            return Ok(context.last_payload().cloned().unwrap_or(Value::Null));
        }

        match self.final_resource_url(context) {
            Some(url) => {
                log::debug!("{}: reading final result from {url}", self.operation);
                let response = self
                    .pipeline
                    .send(&self.operation, &RequestSpec::get(url))
                    .await?;
                response.json()
            }
            None => Ok(context.last_payload().cloned().unwrap_or(Value::Null)),
        }
    }

    fn supports_cancel(&self) -> bool {
        self.cancel.is_some()
    }

    async fn cancel(&self, context: &PollContext) -> ClientResult<()> {
        let Some(route) = &self.cancel else {
            return Err(ClientError::CancellationUnsupported {
                operation_id: context.operation_id.clone(),
            });
        };

        let spec = self.cancel_request(route, context)?;
        self.pipeline.send(&self.operation, &spec).await?;
        Ok(())
    }
}
