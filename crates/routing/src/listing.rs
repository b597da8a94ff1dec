//! Route listing with human-readable annotations.
//!
//! Routes reference domains, spaces, applications and service instances by
//! id. The listing fetches those name collections concurrently up front and
//! joins them locally, so the number of requests does not grow with the number
//! of routes. Routes themselves are then streamed page by page.

use std::collections::HashMap;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, Instrument, Span};

use crate::collections;
use crate::errors::RoutingError;
use crate::identifiers::{ApplicationId, DomainId, OrganizationId, ServiceInstanceId, SpaceId};
use crate::ports::{
    ApplicationFilter, DomainFilter, DomainVisibility, Platform, RouteFilter, ScopeFilter,
    SpaceFilter,
};
use crate::types::{Level, Route, RouteView, Target};

/// The listing scope for `level` within `target`.
pub(crate) fn scope_for(target: &Target, level: Level) -> ScopeFilter {
    match level {
        Level::Organization => ScopeFilter::Organization(target.organization_id.clone()),
        Level::Space => ScopeFilter::Space(target.space_id.clone()),
    }
}

/// Id-to-name lookups for everything a route refers to.
#[derive(Default)]
struct Names {
    domains: HashMap<DomainId, String>,
    spaces: HashMap<SpaceId, String>,
    applications: HashMap<ApplicationId, String>,
    service_instances: HashMap<ServiceInstanceId, String>,
}

impl Names {
    fn annotate(&self, route: Route) -> RouteView {
        let applications = route
            .destinations
            .iter()
            .filter_map(|destination| self.applications.get(&destination.application_id))
            .cloned()
            .collect();
        let service = route
            .service_instance_id
            .as_ref()
            .and_then(|id| self.service_instances.get(id))
            .cloned();

        RouteView {
            domain: self.domains.get(&route.domain_id).cloned().unwrap_or_default(),
            space: self.spaces.get(&route.space_id).cloned().unwrap_or_default(),
            host: route.host.filter(|host| !host.is_empty()),
            path: route.path.filter(|path| !path.is_empty()),
            port: route.port,
            applications,
            service,
            id: route.id,
        }
    }
}

async fn load_names<P>(
    platform: &P,
    organization_id: OrganizationId,
    scope: ScopeFilter,
) -> Result<Names, RoutingError>
where
    P: Platform + ?Sized,
{
    let private_domains = collections::domains(
        platform,
        DomainFilter {
            name: None,
            visibility: DomainVisibility::PrivateTo(organization_id.clone()),
        },
    )
    .try_collect::<Vec<_>>();
    let shared_domains = collections::domains(
        platform,
        DomainFilter {
            name: None,
            visibility: DomainVisibility::Shared,
        },
    )
    .try_collect::<Vec<_>>();
    let spaces = collections::spaces(
        platform,
        SpaceFilter {
            organization_id,
            name: None,
        },
    )
    .try_collect::<Vec<_>>();
    let applications = collections::applications(
        platform,
        ApplicationFilter {
            scope: scope.clone(),
            name: None,
        },
    )
    .try_collect::<Vec<_>>();
    let service_instances =
        collections::service_instances(platform, scope).try_collect::<Vec<_>>();

    let (private_domains, shared_domains, spaces, applications, service_instances) = futures::try_join!(
        private_domains,
        shared_domains,
        spaces,
        applications,
        service_instances
    )?;
    debug!(
        spaces = spaces.len(),
        applications = applications.len(),
        service_instances = service_instances.len(),
        "Fetched listing names"
    );

    Ok(Names {
        domains: private_domains
            .into_iter()
            .chain(shared_domains)
            .map(|domain| (domain.id, domain.name))
            .collect(),
        spaces: spaces
            .into_iter()
            .map(|space| (space.id, space.name))
            .collect(),
        applications: applications
            .into_iter()
            .map(|application| (application.id, application.name))
            .collect(),
        service_instances: service_instances
            .into_iter()
            .map(|instance| (instance.id, instance.name))
            .collect(),
    })
}

/// Streams every route at `level` with its references resolved to names.
///
/// Names are loaded once before the first route page is requested; routes
/// are then fetched a page at a time as the stream is polled, so views keep
/// the order of the route listing. References that cannot be resolved (for
/// example an application deleted mid-listing) are dropped from the view
/// rather than failing it.
pub(crate) fn annotated_routes<'a, P>(
    platform: &'a P,
    target: &Target,
    level: Level,
    span: Span,
) -> BoxStream<'a, Result<RouteView, RoutingError>>
where
    P: Platform + ?Sized,
{
    let scope = scope_for(target, level);
    let filter = RouteFilter {
        scope: Some(scope.clone()),
        ..RouteFilter::default()
    };
    let names = load_names(platform, target.organization_id.clone(), scope).instrument(span);

    stream::once(names)
        .map_ok(move |names| {
            collections::routes(platform, filter.clone())
                .map_err(RoutingError::from)
                .map_ok(move |route| names.annotate(route))
        })
        .try_flatten()
        .boxed()
}
