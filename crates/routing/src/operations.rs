//! Public route operations.
//!
//! [`RouteOperations`] composes the resolver, matcher and job poller into the
//! operations callers use. Each operation is a sequential pipeline that stops
//! at the first failure; nothing is cached between calls, so every invocation
//! sees the platform's current state.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, instrument};

use crate::collections;
use crate::config::OperationsConfig;
use crate::errors::{ResourceKind, RoutingError};
use crate::identifiers::{OperationId, RouteId};
use crate::jobs::{JobPoller, Sleeper, TokioSleeper};
use crate::listing;
use crate::matcher::RouteMatcher;
use crate::orphans::{OrphanScanner, OrphanSweep};
use crate::ports::{
    ApplicationFilter, DomainFilter, JobTracker, Platform, RouteStore, ScopeFilter, SpaceFilter,
};
use crate::resolver::{find_first, resolve};
use crate::types::{
    Application, Domain, Level, NewRoute, Route, RouteKey, RouteView, Space, Target,
};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Arguments of [`RouteOperations::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRouteRequest {
    /// Domain name.
    pub domain: String,
    /// Host label.
    pub host: Option<String>,
    /// Context path.
    pub path: Option<String>,
}

/// Arguments of [`RouteOperations::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRouteRequest {
    /// Domain name.
    pub domain: String,
    /// Host label.
    pub host: Option<String>,
    /// Context path.
    pub path: Option<String>,
    /// TCP port; excludes `host` and `path`.
    pub port: Option<u16>,
    /// Name of the space (in the targeted organization) to own the route.
    pub space: String,
}

/// Arguments of [`RouteOperations::map`] and [`RouteOperations::unmap`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRouteRequest {
    /// Name of the application in the targeted space.
    pub application: String,
    /// Domain name.
    pub domain: String,
    /// Host label.
    pub host: Option<String>,
    /// Context path.
    pub path: Option<String>,
    /// TCP port; excludes `host` and `path`.
    pub port: Option<u16>,
}

/// Arguments of [`RouteOperations::unmap`].
pub type UnmapRouteRequest = MapRouteRequest;

/// Arguments of [`RouteOperations::delete`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRouteRequest {
    /// Domain name.
    pub domain: String,
    /// Host label.
    pub host: Option<String>,
    /// Context path.
    pub path: Option<String>,
    /// TCP port; excludes `host` and `path`.
    pub port: Option<u16>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Route lifecycle operations against one organization and space.
pub struct RouteOperations<P> {
    platform: Arc<P>,
    target: Target,
    config: OperationsConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl<P> RouteOperations<P>
where
    P: Platform,
{
    /// Creates operations acting in `target`, polling jobs with tokio timers.
    pub fn new(platform: Arc<P>, target: Target, config: OperationsConfig) -> Self {
        Self {
            platform,
            target,
            config,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the sleeper used between job polls.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The organization and space operations act in.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Reports whether a route exists for `host`/`path` under `domain`.
    ///
    /// A domain that does not exist yields `false` rather than an error.
    ///
    /// # Errors
    ///
    /// Only platform failures.
    #[instrument(
        skip_all,
        fields(operation_id = %OperationId::new_random(), domain = %request.domain)
    )]
    pub async fn check(&self, request: &CheckRouteRequest) -> Result<bool, RoutingError> {
        let domains = collections::domains(&*self.platform, DomainFilter::named(&request.domain));
        let Some(domain) = find_first(domains, |domain| domain.name == request.domain).await?
        else {
            debug!("Domain does not exist; reporting route as absent");
            return Ok(false);
        };

        let exists = RouteMatcher::new(&*self.platform)
            .exists(&domain.id, request.host.as_deref(), request.path.as_deref())
            .await?;
        Ok(exists)
    }

    /// Creates a route in the named space and returns the number created.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::NotFound`] for a missing domain (the space is then
    ///   never looked up) or a missing space.
    /// - [`RoutingError::InvalidRequest`] when a port is combined with a host
    ///   or path.
    #[instrument(
        skip_all,
        fields(
            operation_id = %OperationId::new_random(),
            domain = %request.domain,
            space = %request.space
        )
    )]
    pub async fn create(&self, request: &CreateRouteRequest) -> Result<u32, RoutingError> {
        let domain = self.resolve_domain(&request.domain).await?;
        let key = RouteKey::new(
            domain.id.clone(),
            request.host.clone(),
            request.path.clone(),
            request.port,
        )?;
        let space = self.resolve_space(&request.space).await?;

        let route = self
            .platform
            .create_route(&NewRoute {
                key,
                space_id: space.id,
            })
            .await?;
        info!(route_id = %route.id, "Route created");
        Ok(1)
    }

    /// Binds the application to the route, creating the route in the targeted
    /// space if it does not exist yet.
    ///
    /// Returns the route's port for TCP routes.
    ///
    /// The route is not removed again if binding fails after it was created.
    ///
    /// # Errors
    ///
    /// [`RoutingError::NotFound`] for a missing application or domain.
    #[instrument(
        skip_all,
        fields(
            operation_id = %OperationId::new_random(),
            application = %request.application,
            domain = %request.domain
        )
    )]
    pub async fn map(&self, request: &MapRouteRequest) -> Result<Option<u16>, RoutingError> {
        let application = self.resolve_application(&request.application).await?;
        let domain = self.resolve_domain(&request.domain).await?;
        let key = RouteKey::new(
            domain.id.clone(),
            request.host.clone(),
            request.path.clone(),
            request.port,
        )?;

        let route = match RouteMatcher::new(&*self.platform).find(&key).await? {
            Some(route) => route,
            None => {
                let route = self
                    .platform
                    .create_route(&NewRoute {
                        key,
                        space_id: self.target.space_id.clone(),
                    })
                    .await?;
                info!(route_id = %route.id, "Route created for mapping");
                route
            }
        };

        self.platform
            .insert_destination(&route.id, &application.id)
            .await?;
        info!(route_id = %route.id, application_id = %application.id, "Route mapped");
        Ok(route.port)
    }

    /// Removes the application's destination from the route.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::NotFound`] for a missing application or domain.
    /// - [`RoutingError::RouteNotFound`] when no route matches.
    /// - [`RoutingError::NotMapped`] when the application is not bound to it.
    #[instrument(
        skip_all,
        fields(
            operation_id = %OperationId::new_random(),
            application = %request.application,
            domain = %request.domain
        )
    )]
    pub async fn unmap(&self, request: &UnmapRouteRequest) -> Result<(), RoutingError> {
        let application = self.resolve_application(&request.application).await?;
        let domain = self.resolve_domain(&request.domain).await?;
        let key = RouteKey::new(
            domain.id.clone(),
            request.host.clone(),
            request.path.clone(),
            request.port,
        )?;
        let route = self.find_route(&key, &request.domain).await?;

        let Some(destination_id) = route
            .destination_for(&application.id)
            .and_then(|destination| destination.id.clone())
        else {
            return Err(RoutingError::NotMapped {
                application: request.application.clone(),
                domain: request.domain.clone(),
            });
        };

        self.platform
            .remove_destination(&route.id, &destination_id)
            .await?;
        info!(route_id = %route.id, destination_id = %destination_id, "Route unmapped");
        Ok(())
    }

    /// Deletes the route and waits for the deletion job to finish.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::NotFound`] for a missing domain.
    /// - [`RoutingError::RouteNotFound`] when no route matches.
    /// - [`RoutingError::JobFailed`] when the deletion job fails.
    #[instrument(
        skip_all,
        fields(operation_id = %OperationId::new_random(), domain = %request.domain)
    )]
    pub async fn delete(&self, request: &DeleteRouteRequest) -> Result<(), RoutingError> {
        let domain = self.resolve_domain(&request.domain).await?;
        let key = RouteKey::new(
            domain.id.clone(),
            request.host.clone(),
            request.path.clone(),
            request.port,
        )?;
        let route = self.find_route(&key, &request.domain).await?;

        delete_and_wait(&*self.platform, &route.id, &*self.sleeper, &self.config).await
    }

    /// Streams every route at `level`, annotated with domain, space,
    /// application and service names.
    ///
    /// Views follow the order of the platform's route listing.
    pub fn list(&self, level: Level) -> BoxStream<'_, Result<RouteView, RoutingError>> {
        let span = info_span!("list", operation_id = %OperationId::new_random(), ?level);
        listing::annotated_routes(&*self.platform, &self.target, level, span)
    }

    /// Deletes every route at `level` that has no destination and no bound
    /// service instance.
    ///
    /// # Errors
    ///
    /// Listing failures always; job failures unless the configured
    /// [`crate::OrphanFailurePolicy`] is `Continue`.
    #[instrument(skip_all, fields(operation_id = %OperationId::new_random(), ?level))]
    pub async fn delete_orphaned_routes(&self, level: Level) -> Result<OrphanSweep, RoutingError> {
        OrphanScanner::new(&*self.platform, &self.target, &self.config, &*self.sleeper)
            .sweep(level)
            .await
    }

    async fn resolve_domain(&self, name: &str) -> Result<Domain, RoutingError> {
        let organization_id = &self.target.organization_id;
        let domains = collections::domains(&*self.platform, DomainFilter::named(name));
        let domain = find_first(domains, |domain| {
            domain.name == name && domain.is_visible_to(organization_id)
        })
        .await?
        .ok_or_else(|| RoutingError::not_found(ResourceKind::Domain, name))?;
        debug!(domain_id = %domain.id, "Resolved domain");
        Ok(domain)
    }

    async fn resolve_space(&self, name: &str) -> Result<Space, RoutingError> {
        let filter = SpaceFilter {
            organization_id: self.target.organization_id.clone(),
            name: Some(name.to_owned()),
        };
        let space = resolve(
            collections::spaces(&*self.platform, filter),
            ResourceKind::Space,
            name,
        )
        .await?;
        debug!(space_id = %space.id, "Resolved space");
        Ok(space)
    }

    async fn resolve_application(&self, name: &str) -> Result<Application, RoutingError> {
        let filter = ApplicationFilter {
            scope: ScopeFilter::Space(self.target.space_id.clone()),
            name: Some(name.to_owned()),
        };
        let application = resolve(
            collections::applications(&*self.platform, filter),
            ResourceKind::Application,
            name,
        )
        .await?;
        debug!(application_id = %application.id, "Resolved application");
        Ok(application)
    }

    async fn find_route(&self, key: &RouteKey, domain: &str) -> Result<Route, RoutingError> {
        RouteMatcher::new(&*self.platform)
            .find(key)
            .await?
            .ok_or_else(|| RoutingError::RouteNotFound {
                domain: domain.to_owned(),
            })
    }
}

/// Deletes a route and polls the resulting job to completion.
pub(crate) async fn delete_and_wait<P>(
    platform: &P,
    route_id: &RouteId,
    sleeper: &dyn Sleeper,
    config: &OperationsConfig,
) -> Result<(), RoutingError>
where
    P: RouteStore + JobTracker + ?Sized,
{
    let job_id = platform.delete_route(route_id).await?;
    info!(route_id = %route_id, job_id = %job_id, "Route deletion submitted");
    JobPoller::new(platform, sleeper, config.poll_interval)
        .with_timeout(config.job_timeout)
        .wait(&job_id)
        .await
}

#[cfg(test)]
#[path = "operations_tests.rs"]
mod tests;
