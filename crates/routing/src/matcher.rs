//! Route existence checks and lookups by [`RouteKey`].
//!
//! The platform filters route listings by domain, host, path and port, but
//! the filters are advisory (an absent host is not the same as an empty one on
//! every API version), so [`RouteMatcher::find`] re-checks each candidate with
//! [`RouteKey::matches`].

use tracing::debug;

use crate::collections;
use crate::errors::PlatformError;
use crate::identifiers::DomainId;
use crate::ports::{RouteFilter, RouteStore};
use crate::resolver::find_first;
use crate::types::{Route, RouteKey};

/// Looks up routes in a [`RouteStore`].
pub struct RouteMatcher<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> RouteMatcher<'a, S>
where
    S: RouteStore + ?Sized,
{
    /// Creates a matcher over `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Returns `true` if the filtered listing contains at least one route.
    ///
    /// Only the first page is fetched.
    ///
    /// # Errors
    ///
    /// Propagates the listing failure.
    pub async fn exists(
        &self,
        domain_id: &DomainId,
        host: Option<&str>,
        path: Option<&str>,
    ) -> Result<bool, PlatformError> {
        let filter = RouteFilter {
            domain_id: Some(domain_id.clone()),
            host: host.map(str::to_owned),
            path: path.map(str::to_owned),
            ..RouteFilter::default()
        };
        let page = self.store.list_routes(&filter, 1).await?;
        let exists = !page.resources.is_empty();
        debug!(domain_id = %domain_id, ?host, ?path, exists, "Checked route existence");
        Ok(exists)
    }

    /// Returns the first route matching `key`, or `None`.
    ///
    /// # Errors
    ///
    /// Propagates any listing failure.
    pub async fn find(&self, key: &RouteKey) -> Result<Option<Route>, PlatformError> {
        let filter = RouteFilter {
            domain_id: Some(key.domain_id().clone()),
            host: key.host().map(str::to_owned),
            path: key.path().map(str::to_owned),
            port: key.port(),
            scope: None,
        };
        let route = find_first(collections::routes(self.store, filter), |route| {
            key.matches(route)
        })
        .await?;
        debug!(
            domain_id = %key.domain_id(),
            route_id = route.as_ref().map(|route| route.id.as_str()),
            "Looked up route"
        );
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, FakePlatform};

    #[tokio::test]
    async fn exists_is_true_for_a_non_empty_listing() {
        let platform = FakePlatform::new().with_route(fixtures::http_route());

        let exists = RouteMatcher::new(&platform)
            .exists(
                &fixtures::domain_id(),
                Some("test-host"),
                Some("test-path"),
            )
            .await
            .unwrap();

        assert!(exists);
    }

    #[tokio::test]
    async fn exists_is_false_for_an_empty_listing() {
        let platform = FakePlatform::new();

        let exists = RouteMatcher::new(&platform)
            .exists(&fixtures::domain_id(), Some("test-host"), None)
            .await
            .unwrap();

        assert!(!exists);
    }

    #[tokio::test]
    async fn find_skips_candidates_that_only_match_the_server_filter() {
        let decoy = Route {
            id: crate::identifiers::RouteId::new("decoy-route-id").unwrap(),
            path: Some("test-path-other".into()),
            ..fixtures::http_route()
        };
        let platform = FakePlatform::new()
            .with_loose_route_filtering()
            .with_route(decoy)
            .with_route(fixtures::http_route());
        let key = RouteKey::new(
            fixtures::domain_id(),
            Some("test-host".into()),
            Some("test-path".into()),
            None,
        )
        .unwrap();

        let found = RouteMatcher::new(&platform).find(&key).await.unwrap();

        assert_eq!(found.map(|route| route.id), Some(fixtures::route_id()));
    }

    #[tokio::test]
    async fn find_by_port() {
        let platform = FakePlatform::new().with_route(fixtures::tcp_route(9999));
        let key = RouteKey::new(fixtures::domain_id(), None, None, Some(9999)).unwrap();

        let found = RouteMatcher::new(&platform).find(&key).await.unwrap();

        assert_eq!(found.and_then(|route| route.port), Some(9999));
    }

    #[tokio::test]
    async fn find_returns_none_when_nothing_matches() {
        let platform = FakePlatform::new().with_route(fixtures::tcp_route(1024));
        let key = RouteKey::new(fixtures::domain_id(), None, None, Some(9999)).unwrap();

        let found = RouteMatcher::new(&platform).find(&key).await.unwrap();

        assert!(found.is_none());
    }
}
