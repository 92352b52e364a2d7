//! Data models shared by the paging adapter and the long-running-operation poller.
//!
//! - [`Page`] and [`PageMetadata`] describe one server response of a paginated listing.
//! - [`OperationStatus`], [`StatusEnvelope`], [`PollContext`] and [`PollResponse`]
//!   describe the state of a long-running operation between poll attempts.
//! - [`ErrorDetail`] carries the structured failure reported by the service.

pub mod operation;
pub mod page;

pub use operation::{ErrorDetail, OperationStatus, PollContext, PollResponse, StatusEnvelope};
pub use page::{Page, PageMetadata};
