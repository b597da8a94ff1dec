//! Streams over each platform collection.
//!
//! Thin bindings between the port traits and [`paginate`]: each function
//! yields every resource matching the filter, fetching pages on demand.

use futures::stream::BoxStream;

use crate::errors::PlatformError;
use crate::identifiers::RouteId;
use crate::paging::paginate;
use crate::ports::{
    ApplicationCatalog, ApplicationFilter, DomainCatalog, DomainFilter, RouteFilter, RouteStore,
    ScopeFilter, ServiceInstanceCatalog, SpaceCatalog, SpaceFilter,
};
use crate::types::{Application, Destination, Domain, Route, ServiceInstance, Space};

type Resources<'a, T> = BoxStream<'a, Result<T, PlatformError>>;

pub fn domains<'a, C>(catalog: &'a C, filter: DomainFilter) -> Resources<'a, Domain>
where
    C: DomainCatalog + ?Sized,
{
    paginate(move |page| {
        let filter = filter.clone();
        async move { catalog.list_domains(&filter, page).await }
    })
}

pub fn spaces<'a, C>(catalog: &'a C, filter: SpaceFilter) -> Resources<'a, Space>
where
    C: SpaceCatalog + ?Sized,
{
    paginate(move |page| {
        let filter = filter.clone();
        async move { catalog.list_spaces(&filter, page).await }
    })
}

pub fn applications<'a, C>(catalog: &'a C, filter: ApplicationFilter) -> Resources<'a, Application>
where
    C: ApplicationCatalog + ?Sized,
{
    paginate(move |page| {
        let filter = filter.clone();
        async move { catalog.list_applications(&filter, page).await }
    })
}

pub fn service_instances<'a, C>(
    catalog: &'a C,
    scope: ScopeFilter,
) -> Resources<'a, ServiceInstance>
where
    C: ServiceInstanceCatalog + ?Sized,
{
    paginate(move |page| {
        let scope = scope.clone();
        async move { catalog.list_service_instances(&scope, page).await }
    })
}

pub fn routes<'a, S>(store: &'a S, filter: RouteFilter) -> Resources<'a, Route>
where
    S: RouteStore + ?Sized,
{
    paginate(move |page| {
        let filter = filter.clone();
        async move { store.list_routes(&filter, page).await }
    })
}

pub fn destinations<'a, S>(store: &'a S, route_id: RouteId) -> Resources<'a, Destination>
where
    S: RouteStore + ?Sized,
{
    paginate(move |page| {
        let route_id = route_id.clone();
        async move { store.list_destinations(&route_id, page).await }
    })
}
