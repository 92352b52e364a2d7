//! Paged iteration adapter.
//!
//! A [`PageFetcher`] knows how to issue the first request of a listing and how
//! to follow a continuation token. A [`Pager`] turns that into a lazy stream of
//! pages ([`Pager::as_pages`]) or of items ([`Pager::as_sequence`]), fetching one
//! page at a time and only when the caller advances past the buffered page.
//!
//! ```no_run
//! use client::paging::Pager;
//! use futures::TryStreamExt;
//!
//! # async fn run(pager: Pager<serde_json::Value>) -> client::common::ClientResult<()> {
//! let mut items = pager.as_sequence();
//! while let Some(item) = items.try_next().await? {
//!     println!("{item}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod pager;

pub use blocking::BlockingIter;
pub use pager::Pager;

use crate::common::ClientResult;
use crate::model::Page;
use async_trait::async_trait;

/// Source of pages for one listing.
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    /// Issues the initial request of the listing.
    async fn list_first_page(&self) -> ClientResult<Page<T>>;

    /// Fetches the page identified by a continuation token from the previous page.
    async fn list_next_page(&self, continuation_token: &str) -> ClientResult<Page<T>>;
}
