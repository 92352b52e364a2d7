use crate::common::{ClientError, ClientResult};
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::runtime::{Builder, Runtime};

/// Synchronous view over a paging stream.
///
/// Owns a current-thread runtime and blocks the calling thread on every page
/// fetch. Ordering and laziness are identical to the async stream. Must not be
/// driven from inside another tokio runtime.
pub struct BlockingIter<I> {
    runtime: Runtime,
    stream: BoxStream<'static, ClientResult<I>>,
}

impl<I> BlockingIter<I> {
    pub fn new(stream: BoxStream<'static, ClientResult<I>>) -> ClientResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Configuration(format!("Failed to create runtime: {e}")))?;

        Ok(Self { runtime, stream })
    }
}

impl<I> Iterator for BlockingIter<I> {
    type Item = ClientResult<I>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.stream.next())
    }
}

#[cfg(test)]
mod tests {
    use crate::common::ClientResult;
    use crate::model::Page;
    use crate::paging::{PageFetcher, Pager};
    use async_trait::async_trait;
    use claims::assert_ok;

    struct TwoPages;

    #[async_trait]
    impl PageFetcher<u32> for TwoPages {
        async fn list_first_page(&self) -> ClientResult<Page<u32>> {
            Ok(Page::new(vec![1, 2], Some("next".to_string())))
        }

        async fn list_next_page(&self, _token: &str) -> ClientResult<Page<u32>> {
            Ok(Page::last(vec![3]))
        }
    }

    #[test]
    fn test_blocking_items_match_async_order() {
        let iter = assert_ok!(Pager::new(TwoPages).blocking_items());
        let items: ClientResult<Vec<u32>> = iter.collect();
        assert_eq!(assert_ok!(items), vec![1, 2, 3]);
    }

    #[test]
    fn test_blocking_pages() {
        let iter = assert_ok!(Pager::new(TwoPages).blocking_pages());
        let sizes: Vec<usize> = iter.map(|page| page.map(|p| p.len()).unwrap_or(0)).collect();
        assert_eq!(sizes, vec![2, 1]);
    }
}
