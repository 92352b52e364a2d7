use super::PageFetcher;
use super::blocking::BlockingIter;
use crate::common::{ClientError, ClientResult};
use crate::model::Page;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

/// Where the next fetch of a traversal starts from.
enum Cursor {
    First,
    Next(String),
    Done,
}

struct Traversal<T> {
    fetcher: Box<dyn PageFetcher<T>>,
    cursor: Cursor,
    pages_fetched: usize,
    max_pages: Option<usize>,
}

/// Lazy, single-use traversal of a paginated listing.
///
/// Nothing is requested until the returned stream is first polled. At most one
/// page is held at a time and pages are yielded strictly in server order. A
/// traversal cannot be restarted: build a new pager to list again.
pub struct Pager<T> {
    fetcher: Box<dyn PageFetcher<T>>,
    max_pages: Option<usize>,
}

impl<T> std::fmt::Debug for Pager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

impl<T: Send + 'static> Pager<T> {
    pub fn new<F>(fetcher: F) -> Self
    where
        F: PageFetcher<T> + 'static,
    {
        Self {
            fetcher: Box::new(fetcher),
            max_pages: None,
        }
    }

    /// Stops the traversal after `max_pages` pages even if the server keeps
    /// returning continuation tokens.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Stream of pages, exposing page boundaries and per-page metadata.
    ///
    /// An error ends the stream after it is yielded; pages already yielded stay valid.
    pub fn as_pages(self) -> BoxStream<'static, ClientResult<Page<T>>> {
        let traversal = Traversal {
            fetcher: self.fetcher,
            cursor: Cursor::First,
            pages_fetched: 0,
            max_pages: self.max_pages,
        };

        stream::unfold(traversal, |mut traversal| async move {
            let cursor = std::mem::replace(&mut traversal.cursor, Cursor::Done);

            if let Some(limit) = traversal.max_pages {
                if traversal.pages_fetched >= limit {
                    if let Cursor::Next(_) = cursor {
                        log::warn!(
                            "Stopping listing after {limit} pages although the service reported more"
                        );
                    }
                    return None;
                }
            }

            let (result, previous_token) = match cursor {
                Cursor::Done => return None,
                Cursor::First => {
                    log::debug!("Fetching first page");
                    (traversal.fetcher.list_first_page().await, None)
                }
                Cursor::Next(token) => {
                    log::debug!(
                        "Fetching page {} with continuation token",
                        traversal.pages_fetched + 1
                    );
                    let result = traversal.fetcher.list_next_page(&token).await;
                    (result, Some(token))
                }
            };

            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    log::debug!(
                        "Listing stopped after {} pages: {e}",
                        traversal.pages_fetched
                    );
                    return Some((Err(e), traversal));
                }
            };

            traversal.pages_fetched += 1;

            match page.next_token() {
                Some(next) if previous_token.as_deref() == Some(next) => {
                    let error = ClientError::InvalidContinuationToken {
                        token: next.to_string(),
                        status_code: None,
                        message: "service returned the token that was just used".to_string(),
                    };
                    Some((Err(error), traversal))
                }
                Some(next) => {
                    traversal.cursor = Cursor::Next(next.to_string());
                    Some((Ok(page), traversal))
                }
                None => {
                    log::debug!("Listing complete after {} pages", traversal.pages_fetched);
                    Some((Ok(page), traversal))
                }
            }
        })
        .boxed()
    }

    /// Stream of items across all pages, in server order.
    pub fn as_sequence(self) -> BoxStream<'static, ClientResult<T>> {
        self.as_pages()
            .map_ok(|page| stream::iter(page.items.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }

    /// Drains every page into one vector.
    pub async fn collect_all(self) -> ClientResult<Vec<T>> {
        self.as_sequence().try_collect().await
    }

    /// Synchronous iterator over items. See [`BlockingIter`] for runtime requirements.
    pub fn blocking_items(self) -> ClientResult<BlockingIter<T>> {
        BlockingIter::new(self.as_sequence())
    }

    /// Synchronous iterator over pages.
    pub fn blocking_pages(self) -> ClientResult<BlockingIter<Page<T>>> {
        BlockingIter::new(self.as_pages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use claims::{assert_err, assert_ok};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves pages keyed by the token used to request them; "" is the first page.
    struct ScriptedFetcher {
        pages: HashMap<String, (Vec<&'static str>, Option<&'static str>)>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedFetcher {
        fn new(script: &[(&str, Vec<&'static str>, Option<&'static str>)]) -> Self {
            let pages = script
                .iter()
                .map(|(key, items, next)| (key.to_string(), (items.clone(), *next)))
                .collect();
            Self {
                pages,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn page(&self, key: &str) -> ClientResult<Page<&'static str>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(key) {
                Some((items, next)) => Ok(Page::new(items.clone(), next.map(String::from))),
                None => Err(ClientError::InvalidContinuationToken {
                    token: key.to_string(),
                    status_code: Some(400),
                    message: "unknown token".to_string(),
                }),
            }
        }
    }

    #[async_trait]
    impl PageFetcher<&'static str> for ScriptedFetcher {
        async fn list_first_page(&self) -> ClientResult<Page<&'static str>> {
            self.page("")
        }

        async fn list_next_page(&self, token: &str) -> ClientResult<Page<&'static str>> {
            self.page(token)
        }
    }

    #[tokio::test]
    async fn test_sequence_flattens_pages_in_order() {
        let fetcher = ScriptedFetcher::new(&[
            ("", vec!["a", "b", "c"], Some("t1")),
            ("t1", vec!["d", "e"], None),
        ]);
        let calls = fetcher.calls.clone();

        let items = assert_ok!(Pager::new(fetcher).collect_all().await);

        assert_eq!(items, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_nothing_fetched_until_polled() {
        let fetcher = ScriptedFetcher::new(&[("", vec!["a"], None)]);
        let calls = fetcher.calls.clone();

        let stream = Pager::new(fetcher).as_sequence();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        drop(stream);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_next_page_fetched_only_when_buffer_exhausted() {
        let fetcher = ScriptedFetcher::new(&[
            ("", vec!["a", "b"], Some("t1")),
            ("t1", vec!["c"], None),
        ]);
        let calls = fetcher.calls.clone();
        let mut stream = Pager::new(fetcher).as_sequence();

        assert_eq!(assert_ok!(stream.next().await.unwrap()), "a");
        assert_eq!(assert_ok!(stream.next().await.unwrap()), "b");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(assert_ok!(stream.next().await.unwrap()), "c");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_first_page_with_token_keeps_going() {
        let fetcher = ScriptedFetcher::new(&[
            ("", vec![], Some("t1")),
            ("t1", vec![], Some("t2")),
            ("t2", vec!["x"], None),
        ]);
        let calls = fetcher.calls.clone();

        let items = assert_ok!(Pager::new(fetcher).collect_all().await);

        assert_eq!(items, vec!["x"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_terminal_page_makes_one_call() {
        let fetcher = ScriptedFetcher::new(&[("", vec![], None)]);
        let calls = fetcher.calls.clone();

        let items = assert_ok!(Pager::new(fetcher).collect_all().await);

        assert!(items.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_surfaces_after_earlier_items() {
        let fetcher = ScriptedFetcher::new(&[("", vec!["a", "b"], Some("missing"))]);
        let calls = fetcher.calls.clone();
        let mut stream = Pager::new(fetcher).as_sequence();

        assert_eq!(assert_ok!(stream.next().await.unwrap()), "a");
        assert_eq!(assert_ok!(stream.next().await.unwrap()), "b");
        let error = assert_err!(stream.next().await.unwrap());
        assert!(matches!(
            error,
            ClientError::InvalidContinuationToken { .. }
        ));
        assert!(stream.next().await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pages_expose_boundaries() {
        let fetcher = ScriptedFetcher::new(&[
            ("", vec!["a", "b", "c"], Some("t1")),
            ("t1", vec!["d", "e"], None),
        ]);

        let pages: Vec<Page<&str>> = assert_ok!(Pager::new(fetcher).as_pages().try_collect().await);

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].next_token(), Some("t1"));
        assert_eq!(pages[1].items, vec!["d", "e"]);
        assert!(!pages[1].has_more());
    }

    #[tokio::test]
    async fn test_repeated_token_is_rejected() {
        let fetcher = ScriptedFetcher::new(&[
            ("", vec!["a"], Some("loop")),
            ("loop", vec!["b"], Some("loop")),
        ]);
        let calls = fetcher.calls.clone();

        let error = assert_err!(Pager::new(fetcher).collect_all().await);

        assert!(matches!(
            error,
            ClientError::InvalidContinuationToken { ref token, .. } if token == "loop"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_max_pages_guard_stops_quietly() {
        let fetcher = ScriptedFetcher::new(&[
            ("", vec!["a"], Some("t1")),
            ("t1", vec!["b"], Some("t2")),
            ("t2", vec!["c"], None),
        ]);
        let calls = fetcher.calls.clone();

        let items = assert_ok!(
            Pager::new(fetcher)
                .with_max_pages(Some(2))
                .collect_all()
                .await
        );

        assert_eq!(items, vec!["a", "b"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_max_pages_sends_nothing() {
        let fetcher = ScriptedFetcher::new(&[("", vec!["a"], None)]);
        let calls = fetcher.calls.clone();

        let items = assert_ok!(
            Pager::new(fetcher)
                .with_max_pages(Some(0))
                .collect_all()
                .await
        );

        assert!(items.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
