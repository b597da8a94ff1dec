//! Query parameters for list endpoints.
//!
//! Every filter becomes the v3 `*_guids` / `names` / `hosts` style parameter;
//! unset filter fields add nothing. Shared domains have no server-side
//! filter, so [`DomainVisibility::Shared`] adds nothing either.

use routing::{
    ApplicationFilter, DomainFilter, DomainVisibility, RouteFilter, ScopeFilter, SpaceFilter,
};

pub(crate) type Query = Vec<(&'static str, String)>;

/// Appends the page selection.
pub(crate) fn paged(mut query: Query, page: u32, per_page: u32) -> Query {
    query.push(("page", page.to_string()));
    query.push(("per_page", per_page.to_string()));
    query
}

fn scope(scope: &ScopeFilter) -> (&'static str, String) {
    match scope {
        ScopeFilter::Organization(id) => ("organization_guids", id.as_str().to_owned()),
        ScopeFilter::Space(id) => ("space_guids", id.as_str().to_owned()),
    }
}

pub(crate) fn domains(filter: &DomainFilter) -> Query {
    let mut query = Query::new();
    if let Some(name) = &filter.name {
        query.push(("names", name.clone()));
    }
    if let DomainVisibility::PrivateTo(organization_id) = &filter.visibility {
        query.push(("organization_guids", organization_id.as_str().to_owned()));
    }
    query
}

pub(crate) fn spaces(filter: &SpaceFilter) -> Query {
    let mut query = vec![(
        "organization_guids",
        filter.organization_id.as_str().to_owned(),
    )];
    if let Some(name) = &filter.name {
        query.push(("names", name.clone()));
    }
    query
}

pub(crate) fn applications(filter: &ApplicationFilter) -> Query {
    let mut query = vec![scope(&filter.scope)];
    if let Some(name) = &filter.name {
        query.push(("names", name.clone()));
    }
    query
}

pub(crate) fn service_instances(filter: &ScopeFilter) -> Query {
    vec![scope(filter)]
}

pub(crate) fn routes(filter: &RouteFilter) -> Query {
    let mut query = Query::new();
    if let Some(domain_id) = &filter.domain_id {
        query.push(("domain_guids", domain_id.as_str().to_owned()));
    }
    if let Some(host) = &filter.host {
        query.push(("hosts", host.clone()));
    }
    if let Some(path) = &filter.path {
        query.push(("paths", path.clone()));
    }
    if let Some(port) = filter.port {
        query.push(("ports", port.to_string()));
    }
    if let Some(route_scope) = &filter.scope {
        query.push(scope(route_scope));
    }
    query
}
