//! Driven ports: the platform capabilities route operations consume.
//!
//! Each trait covers one collection of the remote platform. Implementations
//! own transport, authentication and DTO mapping; this crate only sees the
//! domain types in [`crate::types`].
//!
//! List methods take a filter plus a 1-based page number and return a
//! [`Page`]. Callers stream across pages with [`crate::paging::paginate`].

use async_trait::async_trait;

use crate::errors::PlatformError;
use crate::identifiers::{
    ApplicationId, DestinationId, DomainId, JobId, OrganizationId, RouteId, SpaceId,
};
use crate::paging::Page;
use crate::types::{
    Application, Destination, Domain, NewRoute, Route, ServiceInstance, Space, Timestamp,
};

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Which domains a listing should include.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DomainVisibility {
    /// Every domain the caller may see.
    #[default]
    Any,
    /// Only domains private to the organization.
    PrivateTo(OrganizationId),
    /// Shared domains. Platforms that cannot select them server-side may
    /// also return private domains visible to the caller; consumers that
    /// care re-check [`crate::DomainScope`].
    Shared,
}

/// Server-side filter for domain listings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainFilter {
    /// Restrict to domains with this exact name.
    pub name: Option<String>,
    /// Restrict by ownership.
    pub visibility: DomainVisibility,
}

impl DomainFilter {
    /// Domains named `name`, of any ownership.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            visibility: DomainVisibility::Any,
        }
    }
}

/// Server-side filter for space listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceFilter {
    /// Organization the spaces belong to.
    pub organization_id: OrganizationId,
    /// Restrict to spaces with this exact name.
    pub name: Option<String>,
}

/// Where a listing of applications, routes or service instances is scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeFilter {
    /// Everything in one organization.
    Organization(OrganizationId),
    /// Everything in one space.
    Space(SpaceId),
}

/// Server-side filter for application listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFilter {
    /// Organization or space the applications live in.
    pub scope: ScopeFilter,
    /// Restrict to applications with this exact name.
    pub name: Option<String>,
}

/// Server-side filter for route listings.
///
/// Every populated field narrows the result; unset fields do not filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteFilter {
    /// Restrict to routes under this domain.
    pub domain_id: Option<DomainId>,
    /// Restrict to routes with this host.
    pub host: Option<String>,
    /// Restrict to routes with this path.
    pub path: Option<String>,
    /// Restrict to routes with this port.
    pub port: Option<u16>,
    /// Restrict to routes in this organization or space.
    pub scope: Option<ScopeFilter>,
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Error detail attached to a failed job, in the platform's own words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJobError {
    /// Numeric error code.
    pub code: i64,
    /// Short error title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
}

/// Status of a job exactly as the platform reported it.
///
/// Older API versions report a free-text status; newer ones an enumerated
/// state. [`crate::jobs::normalize`] maps both onto [`crate::jobs::JobState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawJobStatus {
    /// Free-text status such as `"queued"`, `"running"`, `"finished"`, `"failed"`.
    Legacy {
        /// The status string.
        status: String,
        /// Error detail, present when the job failed.
        error: Option<RawJobError>,
    },
    /// Enumerated state such as `"PROCESSING"`, `"POLLING"`, `"COMPLETE"`, `"FAILED"`.
    Enumerated {
        /// The state string.
        state: String,
        /// Errors reported for a failed job; the first one is surfaced.
        errors: Vec<RawJobError>,
    },
}

/// A job document returned by [`JobTracker::get_job`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJob {
    /// Job identifier.
    pub id: JobId,
    /// Reported status.
    pub status: RawJobStatus,
    /// Last time the platform updated the job, when reported.
    pub updated_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Port traits
// ---------------------------------------------------------------------------

/// Read access to domains.
#[async_trait]
pub trait DomainCatalog: Send + Sync {
    /// Lists one page of domains matching `filter`.
    async fn list_domains(
        &self,
        filter: &DomainFilter,
        page: u32,
    ) -> Result<Page<Domain>, PlatformError>;
}

/// Read access to spaces.
#[async_trait]
pub trait SpaceCatalog: Send + Sync {
    /// Lists one page of spaces matching `filter`.
    async fn list_spaces(
        &self,
        filter: &SpaceFilter,
        page: u32,
    ) -> Result<Page<Space>, PlatformError>;
}

/// Read access to applications.
#[async_trait]
pub trait ApplicationCatalog: Send + Sync {
    /// Lists one page of applications matching `filter`.
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: u32,
    ) -> Result<Page<Application>, PlatformError>;
}

/// Read access to service instances.
#[async_trait]
pub trait ServiceInstanceCatalog: Send + Sync {
    /// Lists one page of service instances in `scope`.
    async fn list_service_instances(
        &self,
        scope: &ScopeFilter,
        page: u32,
    ) -> Result<Page<ServiceInstance>, PlatformError>;
}

/// Read and write access to routes and their destinations.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Lists one page of routes matching `filter`.
    async fn list_routes(&self, filter: &RouteFilter, page: u32)
        -> Result<Page<Route>, PlatformError>;

    /// Creates a route and returns it as persisted.
    async fn create_route(&self, route: &NewRoute) -> Result<Route, PlatformError>;

    /// Starts deleting a route; completion is tracked through the returned job.
    async fn delete_route(&self, route_id: &RouteId) -> Result<JobId, PlatformError>;

    /// Lists one page of the route's destinations.
    async fn list_destinations(
        &self,
        route_id: &RouteId,
        page: u32,
    ) -> Result<Page<Destination>, PlatformError>;

    /// Binds `application_id` to the route, keeping existing destinations.
    async fn insert_destination(
        &self,
        route_id: &RouteId,
        application_id: &ApplicationId,
    ) -> Result<(), PlatformError>;

    /// Removes one destination from the route.
    async fn remove_destination(
        &self,
        route_id: &RouteId,
        destination_id: &DestinationId,
    ) -> Result<(), PlatformError>;
}

/// Read access to asynchronous jobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobTracker: Send + Sync {
    /// Fetches the current status of a job.
    async fn get_job(&self, job_id: &JobId) -> Result<RawJob, PlatformError>;
}

/// Everything route operations need from the platform.
///
/// Blanket-implemented for any type implementing every port, so a single
/// client (or test fake) can be handed to [`crate::RouteOperations`].
pub trait Platform:
    DomainCatalog + SpaceCatalog + ApplicationCatalog + ServiceInstanceCatalog + RouteStore + JobTracker
{
}

impl<T> Platform for T where
    T: DomainCatalog
        + SpaceCatalog
        + ApplicationCatalog
        + ServiceInstanceCatalog
        + RouteStore
        + JobTracker
{
}
