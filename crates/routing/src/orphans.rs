//! Detection and deletion of orphaned routes.
//!
//! A route is orphaned when it has no bound service instance and no
//! destination. The scan checks routes concurrently, bounded by
//! [`OperationsConfig::scan_concurrency`]. Deletion starts only once the whole
//! listing has been checked, since every deletion shifts the pages that
//! follow it. Deletion order is unspecified.

use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::collections;
use crate::config::{OperationsConfig, OrphanFailurePolicy};
use crate::errors::RoutingError;
use crate::identifiers::RouteId;
use crate::jobs::Sleeper;
use crate::listing::scope_for;
use crate::operations::delete_and_wait;
use crate::ports::{Platform, RouteFilter};
use crate::types::{Level, Route, Target};

/// An orphan whose deletion failed during a sweep that continues on failure.
#[derive(Debug)]
pub struct OrphanFailure {
    /// The route that could not be deleted.
    pub route_id: RouteId,
    /// Why deletion failed.
    pub error: RoutingError,
}

/// Outcome of a sweep.
#[derive(Debug, Default)]
pub struct OrphanSweep {
    /// Routes deleted, in completion order.
    pub deleted: Vec<RouteId>,
    /// Deletions that failed; always empty under [`OrphanFailurePolicy::Abort`].
    pub failed: Vec<OrphanFailure>,
}

/// Finds and deletes orphaned routes.
pub struct OrphanScanner<'a, P: ?Sized> {
    platform: &'a P,
    target: &'a Target,
    config: &'a OperationsConfig,
    sleeper: &'a dyn Sleeper,
}

impl<'a, P> OrphanScanner<'a, P>
where
    P: Platform + ?Sized,
{
    pub fn new(
        platform: &'a P,
        target: &'a Target,
        config: &'a OperationsConfig,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            platform,
            target,
            config,
            sleeper,
        }
    }

    /// Streams the orphaned routes at `level`.
    pub fn orphans(&self, level: Level) -> BoxStream<'a, Result<Route, RoutingError>> {
        let platform = self.platform;
        let filter = RouteFilter {
            scope: Some(scope_for(self.target, level)),
            ..RouteFilter::default()
        };
        collections::routes(platform, filter)
            .map_err(RoutingError::from)
            .map_ok(move |route| orphaned(platform, route))
            .try_buffer_unordered(self.config.effective_concurrency())
            .try_filter_map(|route| future::ready(Ok(route)))
            .boxed()
    }

    /// Deletes every orphan at `level`, waiting for each deletion job.
    ///
    /// # Errors
    ///
    /// Listing or checking failures end the sweep before anything is
    /// deleted. A failed deletion ends it too under
    /// [`OrphanFailurePolicy::Abort`], dropping deletions still in flight.
    pub async fn sweep(&self, level: Level) -> Result<OrphanSweep, RoutingError> {
        let orphans: Vec<Route> = self.orphans(level).try_collect().await?;
        debug!(orphans = orphans.len(), "Orphan scan finished");

        let mut sweep = OrphanSweep::default();
        let mut outcomes = stream::iter(orphans)
            .map(|route| async move {
                let outcome =
                    delete_and_wait(self.platform, &route.id, self.sleeper, self.config).await;
                (route.id, outcome)
            })
            .buffer_unordered(self.config.effective_concurrency());

        while let Some((route_id, outcome)) = outcomes.next().await {
            match outcome {
                Ok(()) => {
                    info!(route_id = %route_id, "Orphaned route deleted");
                    sweep.deleted.push(route_id);
                }
                Err(error) => match self.config.orphan_failure_policy {
                    OrphanFailurePolicy::Abort => {
                        warn!(route_id = %route_id, error = %error, "Orphan deletion failed; aborting sweep");
                        return Err(error);
                    }
                    OrphanFailurePolicy::Continue => {
                        warn!(route_id = %route_id, error = %error, "Orphan deletion failed");
                        sweep.failed.push(OrphanFailure { route_id, error });
                    }
                },
            }
        }

        info!(
            deleted = sweep.deleted.len(),
            failed = sweep.failed.len(),
            "Orphan sweep finished"
        );
        Ok(sweep)
    }
}

/// Returns the route if nothing is bound to it.
///
/// Destinations are only listed for routes without a service instance.
async fn orphaned<P>(platform: &P, route: Route) -> Result<Option<Route>, RoutingError>
where
    P: Platform + ?Sized,
{
    if route.service_instance_id.is_some() {
        debug!(route_id = %route.id, "Route is bound to a service instance");
        return Ok(None);
    }

    let mut destinations = collections::destinations(platform, route.id.clone());
    if destinations.try_next().await?.is_some() {
        debug!(route_id = %route.id, "Route has destinations");
        return Ok(None);
    }
    Ok(Some(route))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::identifiers::JobId;
    use crate::testing::{fixtures, Call, FakePlatform, RecordingSleeper};

    fn route(id: &str) -> Route {
        Route {
            id: RouteId::new(id).unwrap(),
            ..fixtures::orphan_route()
        }
    }

    fn job(id: &str) -> JobId {
        JobId::new(id).unwrap()
    }

    async fn sweep(
        platform: &FakePlatform,
        config: OperationsConfig,
    ) -> Result<OrphanSweep, RoutingError> {
        let sleeper = RecordingSleeper::default();
        OrphanScanner::new(platform, &fixtures::target(), &config, &sleeper)
            .sweep(Level::Space)
            .await
    }

    #[tokio::test]
    async fn route_with_a_destination_is_kept() {
        let platform = FakePlatform::new().with_route(fixtures::http_route());

        let result = sweep(&platform, OperationsConfig::default()).await.unwrap();

        assert!(result.deleted.is_empty());
        assert!(!platform
            .calls()
            .iter()
            .any(|call| matches!(call, Call::DeleteRoute(_))));
    }

    #[tokio::test]
    async fn route_bound_to_a_service_is_kept_without_listing_destinations() {
        let platform = FakePlatform::new().with_route(Route {
            service_instance_id: Some(fixtures::service_instance_id()),
            ..fixtures::orphan_route()
        });

        let result = sweep(&platform, OperationsConfig::default()).await.unwrap();

        assert!(result.deleted.is_empty());
        assert!(!platform.calls().iter().any(|call| matches!(
            call,
            Call::ListDestinations(_) | Call::DeleteRoute(_)
        )));
    }

    #[tokio::test]
    async fn orphan_is_deleted_and_its_job_awaited() {
        let platform = FakePlatform::new()
            .with_route(fixtures::orphan_route())
            .with_job(
                fixtures::job_id(),
                vec![fixtures::legacy("running"), fixtures::legacy("finished")],
            );
        let sleeper = RecordingSleeper::default();
        let config = OperationsConfig::default();

        let result = OrphanScanner::new(&platform, &fixtures::target(), &config, &sleeper)
            .sweep(Level::Space)
            .await
            .unwrap();

        assert_eq!(result.deleted, vec![fixtures::route_id()]);
        assert_eq!(sleeper.slept(), vec![Duration::from_secs(1)]);
        assert!(platform
            .calls()
            .contains(&Call::DeleteRoute(fixtures::route_id())));
    }

    #[tokio::test]
    async fn failed_deletion_aborts_the_sweep_by_default() {
        let platform = FakePlatform::new()
            .with_route(fixtures::orphan_route())
            .with_job(
                fixtures::job_id(),
                vec![fixtures::enumerated_failed(1, "test-error-title", "test-error-detail")],
            );

        let error = sweep(&platform, OperationsConfig::default())
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "test-error-title(1): test-error-detail");
    }

    #[tokio::test]
    async fn failed_deletion_is_recorded_when_continuing() {
        let platform = FakePlatform::new()
            .with_route(route("failing-route-id"))
            .with_route(route("healthy-route-id"))
            .with_delete_job(RouteId::new("failing-route-id").unwrap(), job("failing-job"))
            .with_delete_job(RouteId::new("healthy-route-id").unwrap(), job("healthy-job"))
            .with_job(
                job("failing-job"),
                vec![fixtures::legacy_failed(10, "CF-Error", "boom")],
            )
            .with_job(job("healthy-job"), vec![fixtures::enumerated("COMPLETE")]);
        let config = OperationsConfig {
            orphan_failure_policy: OrphanFailurePolicy::Continue,
            ..OperationsConfig::default()
        };

        let result = sweep(&platform, config).await.unwrap();

        assert_eq!(result.deleted, vec![RouteId::new("healthy-route-id").unwrap()]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(
            result.failed[0].route_id,
            RouteId::new("failing-route-id").unwrap()
        );
        assert!(matches!(
            result.failed[0].error,
            RoutingError::JobFailed { code: 10, .. }
        ));
    }

    #[tokio::test]
    async fn every_orphan_is_found_across_pages() {
        let platform = (0..5)
            .fold(FakePlatform::new().with_page_size(2), |platform, n| {
                platform.with_route(route(&format!("orphan-{n}")))
            })
            .with_route(fixtures::http_route());
        let config = OperationsConfig::default();
        let sleeper = RecordingSleeper::default();

        let mut found: Vec<RouteId> = OrphanScanner::new(&platform, &fixtures::target(), &config, &sleeper)
            .orphans(Level::Space)
            .map_ok(|route| route.id)
            .try_collect()
            .await
            .unwrap();
        found.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let expected: Vec<RouteId> = (0..5)
            .map(|n| RouteId::new(format!("orphan-{n}")).unwrap())
            .collect();
        assert_eq!(found, expected);
    }

    #[rstest]
    #[case::sequential(5, 1)]
    #[case::concurrent(20, 4)]
    #[tokio::test]
    async fn sweep_deletes_every_orphan_across_pages(
        #[case] count: usize,
        #[case] scan_concurrency: usize,
    ) {
        let platform = (0..count)
            .fold(FakePlatform::new().with_page_size(2), |platform, n| {
                platform.with_route(route(&format!("orphan-{n}")))
            })
            .with_job(
                fixtures::job_id(),
                vec![fixtures::enumerated("COMPLETE"); count],
            );
        let config = OperationsConfig {
            scan_concurrency,
            ..OperationsConfig::default()
        };

        let result = sweep(&platform, config).await.unwrap();

        let mut deleted = result.deleted;
        deleted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let mut expected: Vec<RouteId> = (0..count)
            .map(|n| RouteId::new(format!("orphan-{n}")).unwrap())
            .collect();
        expected.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(deleted, expected);
        assert!(platform.routes().is_empty());
    }

    #[tokio::test]
    async fn nothing_is_deleted_before_the_listing_completes() {
        let platform = FakePlatform::new()
            .with_page_size(1)
            .with_route(route("orphan-0"))
            .with_route(route("orphan-1"))
            .with_job(
                fixtures::job_id(),
                vec![fixtures::enumerated("COMPLETE"); 2],
            );

        sweep(&platform, OperationsConfig::default()).await.unwrap();

        let calls = platform.calls();
        let first_delete = calls
            .iter()
            .position(|call| matches!(call, Call::DeleteRoute(_)))
            .unwrap();
        let last_listing = calls
            .iter()
            .rposition(|call| matches!(call, Call::ListRoutes(_)))
            .unwrap();
        assert!(last_listing < first_delete);
    }

    #[tokio::test]
    async fn empty_scope_deletes_nothing() {
        let platform = FakePlatform::new();

        let result = sweep(&platform, OperationsConfig::default()).await.unwrap();

        assert!(result.deleted.is_empty());
        assert!(result.failed.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_ends_the_sweep() {
        let platform = FakePlatform::new().with_failing_route_listing();

        let result = sweep(&platform, OperationsConfig::default()).await;

        assert!(matches!(result, Err(RoutingError::Platform(_))));
    }
}
