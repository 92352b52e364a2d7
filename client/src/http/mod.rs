//! REST strategies that plug Azure-style HTTP services into the paging and
//! polling engines.
//!
//! - [`HttpPipeline`] sends one request with the bearer, client-request-id,
//!   user-agent, api-version and rate-limit policies applied. It never retries.
//! - [`HttpPageFetcher`] implements [`PageFetcher`](crate::paging::PageFetcher)
//!   on top of a pipeline, a [`PageParser`] and a [`TokenPlacement`].
//! - [`HttpOperationProtocol`] implements
//!   [`OperationProtocol`](crate::lro::OperationProtocol) using a
//!   [`StatusParser`] and a [`FinalStateVia`] choice.

pub mod operation;
pub mod paging;
pub mod parsers;
pub mod pipeline;

pub use operation::{CancelRoute, FinalStateVia, HttpOperationProtocol};
pub use paging::{HttpPageFetcher, TokenPlacement};
pub use parsers::{AzureStatusParser, JsonPageParser, PageParser, StatusParser};
pub use pipeline::{HttpPipeline, RawResponse, RequestSpec};
pub use reqwest::Method;

/// Header carrying the service-side request id.
pub const REQUEST_ID_HEADER: &str = "x-ms-request-id";
/// Header carrying the client-generated request id.
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";
/// Header carrying the request-unit charge of a page (Cosmos-style services).
pub const REQUEST_CHARGE_HEADER: &str = "x-ms-request-charge";
pub const OPERATION_LOCATION_HEADER: &str = "operation-location";
pub const AZURE_ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
pub const LOCATION_HEADER: &str = "location";
pub const RETRY_AFTER_HEADER: &str = "retry-after";
