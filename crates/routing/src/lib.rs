//! Route orchestration domain for Routekeeper.
//!
//! This crate resolves human-readable names (domain, space, application) to
//! platform identifiers, then drives route operations through the platform's
//! asynchronous jobs. Infrastructure crates implement the ports defined here;
//! they never add routing rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no I/O of its
//! own. It defines *what* is needed from the platform; adapter crates such as
//! `cloud-controller` define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype resource identifiers (`DomainId`, `RouteId`, etc.) |
//! | [`types`] | Resource and value types (`Route`, `RouteKey`, `RouteView`, etc.) |
//! | [`errors`] | Routing and platform error types, retry policy |
//! | [`config`] | Polling and orphan sweep settings |
//! | [`ports`] | Platform port traits and their filters |
//! | [`paging`] | Lazy streaming over paginated listings |
//! | [`resolver`] | First-match lookup of named resources |
//! | [`matcher`] | Route existence checks and lookups by key |
//! | [`jobs`] | Job status normalization and polling |
//! | [`operations`] | Public route operations |
//! | [`orphans`] | Orphaned route detection and deletion |

mod collections;
pub mod config;
pub mod errors;
pub mod identifiers;
pub mod jobs;
mod listing;
pub mod matcher;
pub mod operations;
pub mod orphans;
pub mod paging;
pub mod ports;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{OperationsConfig, OrphanFailurePolicy};
pub use errors::{PlatformError, ResourceKind, RetryPolicy, RoutingError};
pub use identifiers::{
    ApplicationId, DestinationId, DomainId, JobId, OperationId, OrganizationId, RouteId,
    ServiceInstanceId, SpaceId,
};
pub use jobs::{JobFailure, JobPoller, JobState, Sleeper, TokioSleeper};
pub use operations::{
    CheckRouteRequest, CreateRouteRequest, DeleteRouteRequest, MapRouteRequest, RouteOperations,
    UnmapRouteRequest,
};
pub use orphans::{OrphanFailure, OrphanScanner, OrphanSweep};
pub use paging::Page;
pub use ports::{
    ApplicationCatalog, ApplicationFilter, DomainCatalog, DomainFilter, DomainVisibility,
    JobTracker, Platform, RawJob, RawJobError, RawJobStatus, RouteFilter, RouteStore,
    ScopeFilter, ServiceInstanceCatalog, SpaceCatalog, SpaceFilter,
};
pub use types::{
    Application, Destination, Domain, DomainScope, Level, NamedResource, NewRoute, Route,
    RouteKey, RouteView, ServiceInstance, Space, Target, Timestamp,
};
