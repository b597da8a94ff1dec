//! Platform resource types and the values exchanged with callers.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! invariants (a route is either HTTP-style or TCP-style, a domain is either
//! shared or private to one organization) and participate in matching and
//! join logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::RoutingError;
use crate::identifiers::{
    ApplicationId, DestinationId, DomainId, OrganizationId, RouteId, ServiceInstanceId, SpaceId,
};

// ---------------------------------------------------------------------------
// Named resources
// ---------------------------------------------------------------------------

/// A resource that callers address by a human-readable name.
///
/// Implemented by every collection the resolver works against.
pub trait NamedResource {
    /// Identifier type of the resource.
    type Id: Clone;

    /// Server-assigned identifier.
    fn id(&self) -> &Self::Id;

    /// Human-readable name, unique within the resource's parent in practice
    /// but not guaranteed unique by the platform.
    fn name(&self) -> &str;
}

macro_rules! named_resource {
    ($ty:ty, $id:ty) => {
        impl NamedResource for $ty {
            type Id = $id;

            fn id(&self) -> &$id {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

/// Ownership of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DomainScope {
    /// Usable only by routes in the owning organization.
    Private {
        /// The owning organization.
        organization_id: OrganizationId,
    },
    /// Usable by every organization on the platform.
    Shared,
}

/// A DNS domain routes are registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Server-assigned identifier.
    pub id: DomainId,
    /// Fully-qualified domain name, e.g. `"apps.example.com"`.
    pub name: String,
    /// Shared, or private to one organization.
    pub scope: DomainScope,
}

impl Domain {
    /// Returns `true` if routes in `organization_id` may use this domain.
    pub fn is_visible_to(&self, organization_id: &OrganizationId) -> bool {
        match &self.scope {
            DomainScope::Shared => true,
            DomainScope::Private {
                organization_id: owner,
            } => owner == organization_id,
        }
    }
}

named_resource!(Domain, DomainId);

/// A space within an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    /// Server-assigned identifier.
    pub id: SpaceId,
    /// Space name, unique within its organization.
    pub name: String,
    /// Owning organization.
    pub organization_id: OrganizationId,
}

named_resource!(Space, SpaceId);

/// An application deployed to a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Server-assigned identifier.
    pub id: ApplicationId,
    /// Application name, unique within its space.
    pub name: String,
    /// Space the application is deployed to.
    pub space_id: SpaceId,
}

named_resource!(Application, ApplicationId);

/// A service instance that may be bound to a route (route services).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Server-assigned identifier.
    pub id: ServiceInstanceId,
    /// Service instance name.
    pub name: String,
    /// Space the instance lives in.
    pub space_id: SpaceId,
}

named_resource!(ServiceInstance, ServiceInstanceId);

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Binding of a route to one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Destination identifier; `None` only for destinations not yet persisted.
    pub id: Option<DestinationId>,
    /// Application receiving the route's traffic.
    pub application_id: ApplicationId,
    /// Application port traffic is delivered to, when not the default.
    pub port: Option<u16>,
}

/// A traffic-binding record.
///
/// HTTP-style routes carry `host` and/or `path`; TCP-style routes carry `port`.
/// The two families never mix on one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Server-assigned identifier.
    pub id: RouteId,
    /// Domain the route is registered under.
    pub domain_id: DomainId,
    /// Space owning the route.
    pub space_id: SpaceId,
    /// Host label prepended to the domain.
    pub host: Option<String>,
    /// Context path, e.g. `"/api"`.
    pub path: Option<String>,
    /// TCP port for TCP-style routes.
    pub port: Option<u16>,
    /// Applications receiving traffic for this route.
    pub destinations: Vec<Destination>,
    /// Route service bound to this route, if any.
    pub service_instance_id: Option<ServiceInstanceId>,
}

impl Route {
    /// Returns the destination bound to `application_id`, if any.
    pub fn destination_for(&self, application_id: &ApplicationId) -> Option<&Destination> {
        self.destinations
            .iter()
            .find(|destination| &destination.application_id == application_id)
    }
}

/// The identity of a route as callers describe it.
///
/// Constructed through [`RouteKey::new`], which rejects keys that mix a TCP
/// port with a host or path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    domain_id: DomainId,
    host: Option<String>,
    path: Option<String>,
    port: Option<u16>,
}

impl RouteKey {
    /// Creates a key for a route under `domain_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidRequest`] if `port` is combined with a
    /// host or a path.
    pub fn new(
        domain_id: DomainId,
        host: Option<String>,
        path: Option<String>,
        port: Option<u16>,
    ) -> Result<Self, RoutingError> {
        if port.is_some() && (host.is_some() || path.is_some()) {
            return Err(RoutingError::InvalidRequest {
                message: "a port cannot be combined with a host or path".to_owned(),
            });
        }
        Ok(Self {
            domain_id,
            host,
            path,
            port,
        })
    }

    /// Domain the route lives under.
    pub fn domain_id(&self) -> &DomainId {
        &self.domain_id
    }

    /// Host label, if this is an HTTP-style key.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Context path, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// TCP port, if this is a TCP-style key.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns `true` if `route` is the route this key describes.
    ///
    /// TCP keys compare ports only. HTTP keys only match routes without a
    /// port and compare host and path, with an absent value equal to the
    /// empty string.
    pub fn matches(&self, route: &Route) -> bool {
        if route.domain_id != self.domain_id {
            return false;
        }
        match self.port {
            Some(port) => route.port == Some(port),
            None => {
                route.port.is_none()
                    && normalized(self.host.as_deref()) == normalized(route.host.as_deref())
                    && normalized(self.path.as_deref()) == normalized(route.path.as_deref())
            }
        }
    }
}

fn normalized(value: Option<&str>) -> &str {
    value.unwrap_or_default()
}

/// Parameters for a route the platform should create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoute {
    /// Host, path, port and domain of the route.
    pub key: RouteKey,
    /// Space that will own the route.
    pub space_id: SpaceId,
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// The organization and space operations act in.
///
/// Application and space names are resolved relative to this target, and new
/// routes are created in its space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Targeted organization.
    pub organization_id: OrganizationId,
    /// Targeted space.
    pub space_id: SpaceId,
}

/// Boundary of a listing or orphan scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// Every route in the targeted organization.
    Organization,
    /// Every route in the targeted space.
    Space,
}

/// A route annotated with human-readable names, as produced by listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteView {
    /// Route identifier.
    pub id: RouteId,
    /// Domain name, or empty if the domain is not visible to the organization.
    pub domain: String,
    /// Host label.
    pub host: Option<String>,
    /// Context path; `None` when the route has no path.
    pub path: Option<String>,
    /// TCP port.
    pub port: Option<u16>,
    /// Names of the applications bound to the route.
    pub applications: Vec<String>,
    /// Name of the bound route service.
    pub service: Option<String>,
    /// Name of the owning space.
    pub space: String,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp reported by the platform.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
