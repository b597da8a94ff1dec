//! DTOs for Cloud Controller JSON documents.
//!
//! Responses decode into these transport DTOs first and are then mapped into
//! routing domain types in one pass. Mapping fails with a message when a
//! required relationship or identifier is missing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use routing::{
    Application, ApplicationId, Destination, DestinationId, Domain, DomainId, DomainScope, JobId,
    NewRoute, OrganizationId, RawJob, RawJobError, RawJobStatus, Route, RouteId, ServiceInstance,
    ServiceInstanceId, Space, SpaceId, Timestamp,
};

// ---------------------------------------------------------------------------
// Shared shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ListDto<T> {
    #[serde(default)]
    pub(crate) pagination: PaginationDto,
    #[serde(default = "Vec::new")]
    pub(crate) resources: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PaginationDto {
    next: Option<LinkDto>,
}

impl PaginationDto {
    pub(crate) fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct LinkDto {
    #[allow(dead_code)]
    href: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct RelationshipDto {
    data: Option<GuidDto>,
}

impl RelationshipDto {
    fn to(guid: &str) -> Self {
        Self {
            data: Some(GuidDto {
                guid: guid.to_owned(),
            }),
        }
    }

    fn guid(&self) -> Option<&str> {
        self.data.as_ref().map(|data| data.guid.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct GuidDto {
    guid: String,
}

/// Converts a server-assigned guid into a typed identifier.
fn guid<I>(value: &str, what: &str, make: impl FnOnce(String) -> Option<I>) -> Result<I, String> {
    make(value.to_owned()).ok_or_else(|| format!("{what} has an empty guid"))
}

fn related<I>(
    relationship: &RelationshipDto,
    what: &str,
    make: impl FnOnce(String) -> Option<I>,
) -> Result<I, String> {
    let value = relationship
        .guid()
        .ok_or_else(|| format!("{what} relationship is missing"))?;
    guid(value, what, make)
}

fn non_empty(value: String) -> Option<String> {
    Some(value).filter(|value| !value.is_empty())
}

// ---------------------------------------------------------------------------
// Named resources
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct DomainDto {
    guid: String,
    name: String,
    #[serde(default)]
    relationships: DomainRelationshipsDto,
}

#[derive(Debug, Default, Deserialize)]
struct DomainRelationshipsDto {
    #[serde(default)]
    organization: RelationshipDto,
}

impl DomainDto {
    pub(crate) fn into_domain(self) -> Result<Domain, String> {
        let scope = match self.relationships.organization.guid() {
            Some(owner) => DomainScope::Private {
                organization_id: guid(owner, "domain organization", OrganizationId::new)?,
            },
            None => DomainScope::Shared,
        };
        Ok(Domain {
            id: guid(&self.guid, "domain", DomainId::new)?,
            name: self.name,
            scope,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpaceDto {
    guid: String,
    name: String,
    relationships: SpaceRelationshipsDto,
}

#[derive(Debug, Deserialize)]
struct SpaceRelationshipsDto {
    organization: RelationshipDto,
}

impl SpaceDto {
    pub(crate) fn into_space(self) -> Result<Space, String> {
        Ok(Space {
            id: guid(&self.guid, "space", SpaceId::new)?,
            organization_id: related(
                &self.relationships.organization,
                "space organization",
                OrganizationId::new,
            )?,
            name: self.name,
        })
    }
}

/// Apps and service instances share the same space-owned shape.
#[derive(Debug, Deserialize)]
pub(crate) struct SpaceScopedDto {
    guid: String,
    name: String,
    relationships: SpaceScopedRelationshipsDto,
}

#[derive(Debug, Deserialize)]
struct SpaceScopedRelationshipsDto {
    space: RelationshipDto,
}

impl SpaceScopedDto {
    pub(crate) fn into_application(self) -> Result<Application, String> {
        Ok(Application {
            id: guid(&self.guid, "app", ApplicationId::new)?,
            space_id: related(&self.relationships.space, "app space", SpaceId::new)?,
            name: self.name,
        })
    }

    pub(crate) fn into_service_instance(self) -> Result<ServiceInstance, String> {
        Ok(ServiceInstance {
            id: guid(&self.guid, "service instance", ServiceInstanceId::new)?,
            space_id: related(
                &self.relationships.space,
                "service instance space",
                SpaceId::new,
            )?,
            name: self.name,
        })
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RouteDto {
    guid: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    path: String,
    port: Option<u16>,
    #[serde(default)]
    destinations: Vec<DestinationDto>,
    relationships: RouteRelationshipsDto,
}

#[derive(Debug, Deserialize, Serialize)]
struct RouteRelationshipsDto {
    domain: RelationshipDto,
    space: RelationshipDto,
}

impl RouteDto {
    /// The route without its service binding, which is listed separately.
    pub(crate) fn into_route(self) -> Result<Route, String> {
        let destinations = self
            .destinations
            .into_iter()
            .map(DestinationDto::into_destination)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Route {
            id: guid(&self.guid, "route", RouteId::new)?,
            domain_id: related(&self.relationships.domain, "route domain", DomainId::new)?,
            space_id: related(&self.relationships.space, "route space", SpaceId::new)?,
            host: non_empty(self.host),
            path: non_empty(self.path),
            port: self.port,
            destinations,
            service_instance_id: None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DestinationDto {
    guid: Option<String>,
    app: DestinationAppDto,
    port: Option<u16>,
}

#[derive(Debug, Deserialize, Serialize)]
struct DestinationAppDto {
    guid: String,
}

impl DestinationDto {
    pub(crate) fn into_destination(self) -> Result<Destination, String> {
        Ok(Destination {
            id: self.guid.and_then(DestinationId::new),
            application_id: guid(&self.app.guid, "destination app", ApplicationId::new)?,
            port: self.port,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DestinationsDto {
    #[serde(default)]
    pub(crate) destinations: Vec<DestinationDto>,
}

/// Body of `POST /v3/routes/{guid}/destinations`.
#[derive(Debug, Serialize)]
pub(crate) struct InsertDestinationsDto {
    destinations: Vec<NewDestinationDto>,
}

#[derive(Debug, Serialize)]
struct NewDestinationDto {
    app: DestinationAppDto,
}

impl InsertDestinationsDto {
    pub(crate) fn single(application_id: &ApplicationId) -> Self {
        Self {
            destinations: vec![NewDestinationDto {
                app: DestinationAppDto {
                    guid: application_id.as_str().to_owned(),
                },
            }],
        }
    }
}

/// Body of `POST /v3/routes`.
#[derive(Debug, Serialize)]
pub(crate) struct NewRouteDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    relationships: RouteRelationshipsDto,
}

impl From<&NewRoute> for NewRouteDto {
    fn from(route: &NewRoute) -> Self {
        Self {
            host: route.key.host().map(str::to_owned),
            path: route.key.path().map(str::to_owned),
            port: route.key.port(),
            relationships: RouteRelationshipsDto {
                domain: RelationshipDto::to(route.key.domain_id().as_str()),
                space: RelationshipDto::to(route.space_id.as_str()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceRouteBindingDto {
    relationships: ServiceRouteBindingRelationshipsDto,
}

#[derive(Debug, Deserialize)]
struct ServiceRouteBindingRelationshipsDto {
    route: RelationshipDto,
    service_instance: RelationshipDto,
}

impl ServiceRouteBindingDto {
    pub(crate) fn into_binding(self) -> Result<(RouteId, ServiceInstanceId), String> {
        Ok((
            related(&self.relationships.route, "binding route", RouteId::new)?,
            related(
                &self.relationships.service_instance,
                "binding service instance",
                ServiceInstanceId::new,
            )?,
        ))
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// A job in either API vocabulary.
///
/// v3 documents carry a top-level `state`; v2 documents wrap an `entity`
/// with a free-text `status`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum JobDto {
    Enumerated(EnumeratedJobDto),
    Legacy(LegacyJobDto),
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnumeratedJobDto {
    guid: String,
    state: String,
    #[serde(default)]
    errors: Vec<EnumeratedJobErrorDto>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct EnumeratedJobErrorDto {
    code: i64,
    title: String,
    detail: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyJobDto {
    metadata: LegacyMetadataDto,
    entity: LegacyJobEntityDto,
}

#[derive(Debug, Deserialize)]
struct LegacyMetadataDto {
    guid: String,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct LegacyJobEntityDto {
    status: String,
    error_details: Option<LegacyJobErrorDto>,
}

#[derive(Debug, Deserialize)]
struct LegacyJobErrorDto {
    code: i64,
    error_code: String,
    description: String,
}

impl JobDto {
    pub(crate) fn into_job(self) -> Result<RawJob, String> {
        match self {
            Self::Enumerated(job) => Ok(RawJob {
                id: guid(&job.guid, "job", JobId::new)?,
                status: RawJobStatus::Enumerated {
                    state: job.state,
                    errors: job
                        .errors
                        .into_iter()
                        .map(|error| RawJobError {
                            code: error.code,
                            title: error.title,
                            description: error.detail,
                        })
                        .collect(),
                },
                updated_at: job.updated_at.map(Timestamp::from_utc),
            }),
            Self::Legacy(job) => Ok(RawJob {
                id: guid(&job.metadata.guid, "job", JobId::new)?,
                status: RawJobStatus::Legacy {
                    status: job.entity.status,
                    error: job.entity.error_details.map(|error| RawJobError {
                        code: error.code,
                        title: error.error_code,
                        description: error.description,
                    }),
                },
                updated_at: job.metadata.updated_at.map(Timestamp::from_utc),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorsDto {
    #[serde(default)]
    errors: Vec<ErrorDto>,
}

#[derive(Debug, Deserialize)]
struct ErrorDto {
    code: i64,
    title: String,
    detail: String,
}

impl ErrorsDto {
    /// `"{title}({code}): {detail}"` of the first error, if any.
    pub(crate) fn summary(&self) -> Option<String> {
        self.errors
            .first()
            .map(|error| format!("{}({}): {}", error.title, error.code, error.detail))
    }
}
