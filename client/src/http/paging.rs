use super::parsers::PageParser;
use super::pipeline::{HttpPipeline, RequestSpec};
use crate::common::{ClientError, ClientResult};
use crate::model::Page;
use crate::paging::PageFetcher;
use async_trait::async_trait;
use reqwest::{Method, Url};

/// How a continuation token is sent back to the service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TokenPlacement {
    /// The token is a URL (absolute or relative to the first request) to GET as-is.
    #[default]
    NextLink,
    /// Repeat the original request with the token in this query parameter.
    Query(String),
    /// Repeat the original request with the token in this header.
    Header(String),
}

/// [`PageFetcher`] backed by HTTP requests.
pub struct HttpPageFetcher<T> {
    pipeline: HttpPipeline,
    request: RequestSpec,
    parser: Box<dyn PageParser<T>>,
    placement: TokenPlacement,
    operation: String,
}

impl<T> std::fmt::Debug for HttpPageFetcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageFetcher")
            .field("operation", &self.operation)
            .field("url", &self.request.url)
            .field("placement", &self.placement)
            .finish()
    }
}

impl<T> HttpPageFetcher<T> {
    pub fn new<P>(pipeline: HttpPipeline, request: RequestSpec, parser: P) -> Self
    where
        P: PageParser<T> + 'static,
    {
        let operation = format!("list {}", request.url);
        Self {
            pipeline,
            request,
            parser: Box::new(parser),
            placement: TokenPlacement::default(),
            operation,
        }
    }

    pub fn with_placement(mut self, placement: TokenPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Name used in logs and error messages.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    fn continuation_request(&self, token: &str) -> ClientResult<RequestSpec> {
        match &self.placement {
            TokenPlacement::NextLink => {
                let url = resolve_next_link(&self.request.url, token)?;
                let mut spec = RequestSpec::new(Method::GET, url);
                spec.headers = self.request.headers.clone();
                Ok(spec)
            }
            TokenPlacement::Query(name) => {
                let mut spec = self.request.clone();
                spec.url = without_query_param(&spec.url, name)?;
                Ok(spec.with_query(name.clone(), token))
            }
            TokenPlacement::Header(name) => {
                let mut spec = self.request.clone();
                spec.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
                Ok(spec.with_header(name.clone(), token))
            }
        }
    }
}

fn resolve_next_link(base: &str, link: &str) -> ClientResult<String> {
    let base = Url::parse(base)
        .map_err(|e| ClientError::Configuration(format!("Invalid URL '{base}': {e}")))?;
    base.join(link)
        .map(String::from)
        .map_err(|e| ClientError::InvalidContinuationToken {
            token: link.to_string(),
            status_code: None,
            message: format!("not a valid next link: {e}"),
        })
}

fn without_query_param(url: &str, name: &str) -> ClientResult<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| ClientError::Configuration(format!("Invalid URL '{url}': {e}")))?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    Ok(parsed.into())
}

#[async_trait]
impl<T: Send + 'static> PageFetcher<T> for HttpPageFetcher<T> {
    async fn list_first_page(&self) -> ClientResult<Page<T>> {
        let response = self.pipeline.send(&self.operation, &self.request).await?;
        self.parser.parse_page(&response)
    }

    async fn list_next_page(&self, continuation_token: &str) -> ClientResult<Page<T>> {
        let spec = self.continuation_request(continuation_token)?;

        let response = match self.pipeline.send(&self.operation, &spec).await {
            Ok(response) => response,
            Err(ClientError::Service {
                status_code: status_code @ (400 | 404 | 410),
                message,
                ..
            }) => {
                return Err(ClientError::InvalidContinuationToken {
                    token: continuation_token.to_string(),
                    status_code: Some(status_code),
                    message,
                });
            }
            Err(e) => return Err(e),
        };

        self.parser.parse_page(&response)
    }
}
