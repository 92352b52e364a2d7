//! # azpager client library
//!
//! Uniform consumption of paginated listings and long-running operations
//! exposed by Azure-style REST services.
//!
//! ## Modules
//!
//! - [`paging`] - Lazy page and item streams over any [`paging::PageFetcher`]
//! - [`lro`] - The [`lro::Poller`] state machine over any [`lro::OperationProtocol`]
//! - [`http`] - reqwest-backed fetchers, status parsers and the request pipeline
//! - [`builder`] - [`builder::ClientConfig`] and [`builder::ServiceClient`] assembly
//! - [`auth`] - Bearer credentials and the token cache
//! - [`model`] - Pages, operation statuses and poll context
//! - [`common`] - Error taxonomy and the client-side rate limiter
//! - [`utils`] - Environment variable helpers

pub mod auth;
pub mod builder;
pub mod common;
pub mod http;
pub mod lro;
pub mod model;
pub mod paging;
pub mod utils;
