//! Lazy sequencing of page-indexed collections.
//!
//! Platform list endpoints return one page at a time. [`paginate`] turns a
//! page fetch function into a single forward-only stream over every resource
//! in the collection, fetching the next page only when the previous one has
//! been consumed.

use std::future::Future;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

/// One page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Resources on this page, in server order.
    pub resources: Vec<T>,
    /// Whether the server reports further pages.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// A page with no successor.
    pub fn last(resources: Vec<T>) -> Self {
        Self {
            resources,
            has_more: false,
        }
    }

    /// An empty, final page.
    pub fn empty() -> Self {
        Self::last(Vec::new())
    }
}

/// Streams every resource across all pages returned by `fetch`.
///
/// Pages are numbered from 1. The stream ends after a page reporting
/// `has_more == false` or after an empty page, whichever comes first. A failed
/// fetch ends the stream with that error; resources already yielded stay
/// yielded.
///
/// The stream is not restartable: building a new one re-fetches from page 1.
pub fn paginate<'a, T, E, F, Fut>(fetch: F) -> BoxStream<'a, Result<T, E>>
where
    T: Send + 'a,
    E: Send + 'a,
    F: FnMut(u32) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>, E>> + Send + 'a,
{
    stream::try_unfold((fetch, Some(1_u32)), |(mut fetch, next)| async move {
        let Some(number) = next else {
            return Ok(None);
        };
        let page = fetch(number).await?;
        let following = if page.has_more && !page.resources.is_empty() {
            Some(number + 1)
        } else {
            None
        };
        let resources = stream::iter(page.resources.into_iter().map(Ok::<T, E>));
        Ok(Some((resources, (fetch, following))))
    })
    .try_flatten()
    .boxed()
}
