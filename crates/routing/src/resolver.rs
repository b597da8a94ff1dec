//! Name-to-resource resolution over paginated collections.
//!
//! Names are matched exactly. When several resources share a name the first
//! one in the collection's server order wins; the platform does not document
//! a tie-break, so callers must not rely on which duplicate is returned.

use futures::stream::{BoxStream, TryStreamExt};

use crate::errors::{ResourceKind, RoutingError};
use crate::types::NamedResource;

/// Returns the first resource in `resources` satisfying `predicate`.
///
/// Consumes the stream only up to the first match, so later pages are never
/// fetched once a match is found.
///
/// # Errors
///
/// Propagates the first error produced by the stream.
pub async fn find_first<T, E, P>(
    mut resources: BoxStream<'_, Result<T, E>>,
    mut predicate: P,
) -> Result<Option<T>, E>
where
    P: FnMut(&T) -> bool,
{
    while let Some(resource) = resources.try_next().await? {
        if predicate(&resource) {
            return Ok(Some(resource));
        }
    }
    Ok(None)
}

/// Returns the first resource in `resources` named exactly `name`.
///
/// # Errors
///
/// Returns [`RoutingError::NotFound`] if no resource is named `name` after
/// every page has been read, or the stream's own error converted into a
/// [`RoutingError`].
pub async fn resolve<T, E>(
    resources: BoxStream<'_, Result<T, E>>,
    kind: ResourceKind,
    name: &str,
) -> Result<T, RoutingError>
where
    T: NamedResource,
    RoutingError: From<E>,
{
    find_first(resources, |resource| resource.name() == name)
        .await?
        .ok_or_else(|| RoutingError::not_found(kind, name))
}
