use serde::{Deserialize, Serialize};

/// Per-response details that callers iterating page by page may want to inspect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageMetadata {
    /// HTTP status code of the response that produced the page
    pub status_code: u16,
    /// Service request ID (`x-ms-request-id`) for support tickets
    pub request_id: Option<String>,
    /// Cost of producing the page, e.g. request units (`x-ms-request-charge`)
    pub request_charge: Option<f64>,
}

/// A single server response unit of a paginated listing.
///
/// A page owns only its items. The continuation token is `None` exactly when
/// the server has no further pages; an empty string token is treated as `None`.
///
/// # Examples
///
/// ```no_run
/// use client::model::Page;
///
/// let page = Page::new(vec!["a", "b"], Some("t1".to_string()));
/// assert!(page.has_more());
///
/// let last = Page::new(vec!["c"], Some(String::new()));
/// assert!(!last.has_more());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items returned in this page, in server order
    pub items: Vec<T>,
    /// Opaque token used to fetch the next page
    pub continuation_token: Option<String>,
    /// Total number of matching items, when the service reports it
    pub total_count: Option<u64>,
    /// Response level metadata
    pub metadata: PageMetadata,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, continuation_token: Option<String>) -> Self {
        Self {
            items,
            continuation_token: continuation_token.filter(|token| !token.trim().is_empty()),
            total_count: None,
            metadata: PageMetadata::default(),
        }
    }

    /// A final page with no continuation token.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    pub fn with_total_count(mut self, total_count: Option<u64>) -> Self {
        self.total_count = total_count;
        self
    }

    pub fn with_metadata(mut self, metadata: PageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the continuation token if the server indicated more pages exist.
    pub fn next_token(&self) -> Option<&str> {
        self.continuation_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    pub fn has_more(&self) -> bool {
        self.next_token().is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}
