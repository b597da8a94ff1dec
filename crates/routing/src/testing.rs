//! In-memory platform and fixtures for unit tests.
//!
//! [`FakePlatform`] implements every port over plain collections, filters the
//! way the platform does, pages results, replays scripted job statuses and
//! records each call so tests can assert on what was (and was not) asked.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::PlatformError;
use crate::identifiers::{
    ApplicationId, DestinationId, DomainId, JobId, RouteId, SpaceId,
};
use crate::jobs::Sleeper;
use crate::paging::Page;
use crate::ports::{
    ApplicationCatalog, ApplicationFilter, DomainCatalog, DomainFilter, DomainVisibility,
    JobTracker, RawJob, RawJobStatus, RouteFilter, RouteStore, ScopeFilter,
    ServiceInstanceCatalog, SpaceCatalog, SpaceFilter,
};
use crate::types::{
    Application, Destination, Domain, DomainScope, NewRoute, Route, ServiceInstance, Space,
};

/// A port call observed by [`FakePlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListDomains(DomainFilter),
    ListSpaces(SpaceFilter),
    ListApplications(ApplicationFilter),
    ListServiceInstances(ScopeFilter),
    ListRoutes(RouteFilter),
    CreateRoute(NewRoute),
    DeleteRoute(RouteId),
    ListDestinations(RouteId),
    InsertDestination(RouteId, ApplicationId),
    RemoveDestination(RouteId, DestinationId),
    GetJob(JobId),
}

#[derive(Default)]
struct State {
    domains: Vec<Domain>,
    spaces: Vec<Space>,
    applications: Vec<Application>,
    service_instances: Vec<ServiceInstance>,
    routes: Vec<Route>,
    jobs: HashMap<JobId, VecDeque<RawJobStatus>>,
    delete_jobs: HashMap<RouteId, JobId>,
    created: u32,
    calls: Vec<Call>,
}

pub struct FakePlatform {
    state: Mutex<State>,
    page_size: usize,
    loose_route_filtering: bool,
    failing_route_page: Option<u32>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 50,
            loose_route_filtering: false,
            failing_route_page: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Route listings only honour the domain filter, leaving host/path/port
    /// matching to the caller.
    pub fn with_loose_route_filtering(mut self) -> Self {
        self.loose_route_filtering = true;
        self
    }

    pub fn with_failing_route_listing(self) -> Self {
        self.with_failing_route_page(1)
    }

    /// Route listing fails from page `page` onwards.
    pub fn with_failing_route_page(mut self, page: u32) -> Self {
        self.failing_route_page = Some(page);
        self
    }

    pub fn with_domain(self, domain: Domain) -> Self {
        self.state.lock().unwrap().domains.push(domain);
        self
    }

    pub fn with_space(self, space: Space) -> Self {
        self.state.lock().unwrap().spaces.push(space);
        self
    }

    pub fn with_application(self, application: Application) -> Self {
        self.state.lock().unwrap().applications.push(application);
        self
    }

    pub fn with_service_instance(self, instance: ServiceInstance) -> Self {
        self.state.lock().unwrap().service_instances.push(instance);
        self
    }

    pub fn with_route(self, route: Route) -> Self {
        self.state.lock().unwrap().routes.push(route);
        self
    }

    /// Deleting `route_id` returns `job_id` instead of the default job.
    pub fn with_delete_job(self, route_id: RouteId, job_id: JobId) -> Self {
        self.state
            .lock()
            .unwrap()
            .delete_jobs
            .insert(route_id, job_id);
        self
    }

    /// Successive `get_job(job_id)` calls return `statuses` in order.
    pub fn with_job(self, job_id: JobId, statuses: Vec<RawJobStatus>) -> Self {
        self.state
            .lock()
            .unwrap()
            .jobs
            .insert(job_id, statuses.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.state.lock().unwrap().routes.clone()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn page<T: Clone>(&self, matching: Vec<T>, page: u32) -> Page<T> {
        let start = (page as usize - 1) * self.page_size;
        let resources: Vec<T> = matching
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        let has_more = start + resources.len() < matching.len();
        Page {
            resources,
            has_more,
        }
    }

    fn space_in_scope(state: &State, space_id: &SpaceId, scope: &ScopeFilter) -> bool {
        match scope {
            ScopeFilter::Space(id) => id == space_id,
            ScopeFilter::Organization(organization_id) => state
                .spaces
                .iter()
                .any(|space| &space.id == space_id && &space.organization_id == organization_id),
        }
    }
}

#[async_trait]
impl DomainCatalog for FakePlatform {
    async fn list_domains(
        &self,
        filter: &DomainFilter,
        page: u32,
    ) -> Result<Page<Domain>, PlatformError> {
        self.record(Call::ListDomains(filter.clone()));
        let matching: Vec<Domain> = {
            let state = self.state.lock().unwrap();
            state
                .domains
                .iter()
                .filter(|domain| filter.name.as_ref().is_none_or(|name| &domain.name == name))
                .filter(|domain| match (&filter.visibility, &domain.scope) {
                    (DomainVisibility::Any, _) => true,
                    (DomainVisibility::Shared, DomainScope::Shared) => true,
                    (
                        DomainVisibility::PrivateTo(organization_id),
                        DomainScope::Private {
                            organization_id: owner,
                        },
                    ) => owner == organization_id,
                    _ => false,
                })
                .cloned()
                .collect()
        };
        Ok(self.page(matching, page))
    }
}

#[async_trait]
impl SpaceCatalog for FakePlatform {
    async fn list_spaces(
        &self,
        filter: &SpaceFilter,
        page: u32,
    ) -> Result<Page<Space>, PlatformError> {
        self.record(Call::ListSpaces(filter.clone()));
        let matching: Vec<Space> = {
            let state = self.state.lock().unwrap();
            state
                .spaces
                .iter()
                .filter(|space| space.organization_id == filter.organization_id)
                .filter(|space| filter.name.as_ref().is_none_or(|name| &space.name == name))
                .cloned()
                .collect()
        };
        Ok(self.page(matching, page))
    }
}

#[async_trait]
impl ApplicationCatalog for FakePlatform {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: u32,
    ) -> Result<Page<Application>, PlatformError> {
        self.record(Call::ListApplications(filter.clone()));
        let matching: Vec<Application> = {
            let state = self.state.lock().unwrap();
            state
                .applications
                .iter()
                .filter(|app| Self::space_in_scope(&state, &app.space_id, &filter.scope))
                .filter(|app| filter.name.as_ref().is_none_or(|name| &app.name == name))
                .cloned()
                .collect()
        };
        Ok(self.page(matching, page))
    }
}

#[async_trait]
impl ServiceInstanceCatalog for FakePlatform {
    async fn list_service_instances(
        &self,
        scope: &ScopeFilter,
        page: u32,
    ) -> Result<Page<ServiceInstance>, PlatformError> {
        self.record(Call::ListServiceInstances(scope.clone()));
        let matching: Vec<ServiceInstance> = {
            let state = self.state.lock().unwrap();
            state
                .service_instances
                .iter()
                .filter(|instance| Self::space_in_scope(&state, &instance.space_id, scope))
                .cloned()
                .collect()
        };
        Ok(self.page(matching, page))
    }
}

#[async_trait]
impl RouteStore for FakePlatform {
    async fn list_routes(
        &self,
        filter: &RouteFilter,
        page: u32,
    ) -> Result<Page<Route>, PlatformError> {
        self.record(Call::ListRoutes(filter.clone()));
        if self.failing_route_page.is_some_and(|failing| page >= failing) {
            return Err(PlatformError::transport("route listing unavailable"));
        }
        let loose = self.loose_route_filtering;
        let matching: Vec<Route> = {
            let state = self.state.lock().unwrap();
            state
                .routes
                .iter()
                .filter(|route| filter.domain_id.as_ref().is_none_or(|id| &route.domain_id == id))
                .filter(|route| {
                    loose
                        || ((filter.host.is_none() || route.host == filter.host)
                            && (filter.path.is_none() || route.path == filter.path)
                            && (filter.port.is_none() || route.port == filter.port))
                })
                .filter(|route| {
                    filter
                        .scope
                        .as_ref()
                        .is_none_or(|scope| Self::space_in_scope(&state, &route.space_id, scope))
                })
                .cloned()
                .collect()
        };
        Ok(self.page(matching, page))
    }

    async fn create_route(&self, route: &NewRoute) -> Result<Route, PlatformError> {
        self.record(Call::CreateRoute(route.clone()));
        let mut state = self.state.lock().unwrap();
        state.created += 1;
        let created = Route {
            id: RouteId::new(format!("created-route-{}", state.created))
                .ok_or_else(|| PlatformError::protocol("empty route id"))?,
            domain_id: route.key.domain_id().clone(),
            space_id: route.space_id.clone(),
            host: route.key.host().map(str::to_owned),
            path: route.key.path().map(str::to_owned),
            port: route.key.port(),
            destinations: Vec::new(),
            service_instance_id: None,
        };
        state.routes.push(created.clone());
        Ok(created)
    }

    async fn delete_route(&self, route_id: &RouteId) -> Result<JobId, PlatformError> {
        self.record(Call::DeleteRoute(route_id.clone()));
        let mut state = self.state.lock().unwrap();
        state.routes.retain(|route| &route.id != route_id);
        Ok(state
            .delete_jobs
            .get(route_id)
            .cloned()
            .unwrap_or_else(fixtures::job_id))
    }

    async fn list_destinations(
        &self,
        route_id: &RouteId,
        page: u32,
    ) -> Result<Page<Destination>, PlatformError> {
        self.record(Call::ListDestinations(route_id.clone()));
        let destinations = {
            let state = self.state.lock().unwrap();
            state
                .routes
                .iter()
                .find(|route| &route.id == route_id)
                .map(|route| route.destinations.clone())
                .ok_or_else(|| PlatformError::Status {
                    status: 404,
                    message: format!("route {route_id} not found"),
                    retry_after: None,
                })?
        };
        Ok(self.page(destinations, page))
    }

    async fn insert_destination(
        &self,
        route_id: &RouteId,
        application_id: &ApplicationId,
    ) -> Result<(), PlatformError> {
        self.record(Call::InsertDestination(
            route_id.clone(),
            application_id.clone(),
        ));
        let mut state = self.state.lock().unwrap();
        if let Some(route) = state.routes.iter_mut().find(|route| &route.id == route_id) {
            route.destinations.push(Destination {
                id: DestinationId::new(format!("destination-{application_id}")),
                application_id: application_id.clone(),
                port: None,
            });
        }
        Ok(())
    }

    async fn remove_destination(
        &self,
        route_id: &RouteId,
        destination_id: &DestinationId,
    ) -> Result<(), PlatformError> {
        self.record(Call::RemoveDestination(
            route_id.clone(),
            destination_id.clone(),
        ));
        let mut state = self.state.lock().unwrap();
        if let Some(route) = state.routes.iter_mut().find(|route| &route.id == route_id) {
            route
                .destinations
                .retain(|destination| destination.id.as_ref() != Some(destination_id));
        }
        Ok(())
    }
}

#[async_trait]
impl JobTracker for FakePlatform {
    async fn get_job(&self, job_id: &JobId) -> Result<RawJob, PlatformError> {
        self.record(Call::GetJob(job_id.clone()));
        let status = self
            .state
            .lock()
            .unwrap()
            .jobs
            .get_mut(job_id)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| PlatformError::protocol(format!("no scripted status for {job_id}")))?;
        Ok(RawJob {
            id: job_id.clone(),
            status,
            updated_at: None,
        })
    }
}

/// Sleeper that returns immediately and remembers what it was asked to do.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

pub mod fixtures {
    use super::*;
    use crate::identifiers::{OrganizationId, ServiceInstanceId};
    use crate::ports::RawJobError;
    use crate::types::Target;

    pub fn organization_id() -> OrganizationId {
        OrganizationId::new("test-organization-id").unwrap()
    }

    pub fn space_id() -> SpaceId {
        SpaceId::new("test-space-id").unwrap()
    }

    pub fn domain_id() -> DomainId {
        DomainId::new("test-domain-id").unwrap()
    }

    pub fn route_id() -> RouteId {
        RouteId::new("test-route-id").unwrap()
    }

    pub fn application_id() -> ApplicationId {
        ApplicationId::new("test-application-id").unwrap()
    }

    pub fn destination_id() -> DestinationId {
        DestinationId::new("test-destination-id").unwrap()
    }

    pub fn job_id() -> JobId {
        JobId::new("test-job-entity-id").unwrap()
    }

    pub fn service_instance_id() -> ServiceInstanceId {
        ServiceInstanceId::new("test-service-instance-id").unwrap()
    }

    pub fn target() -> Target {
        Target {
            organization_id: organization_id(),
            space_id: space_id(),
        }
    }

    pub fn domain() -> Domain {
        Domain {
            id: domain_id(),
            name: "test-domain".into(),
            scope: DomainScope::Shared,
        }
    }

    pub fn space() -> Space {
        Space {
            id: space_id(),
            name: "test-space-name".into(),
            organization_id: organization_id(),
        }
    }

    pub fn application() -> Application {
        Application {
            id: application_id(),
            name: "test-application-name".into(),
            space_id: space_id(),
        }
    }

    pub fn service_instance() -> ServiceInstance {
        ServiceInstance {
            id: service_instance_id(),
            name: "test-service-instance-name".into(),
            space_id: space_id(),
        }
    }

    pub fn destination() -> Destination {
        Destination {
            id: Some(destination_id()),
            application_id: application_id(),
            port: None,
        }
    }

    /// `test-host` / `test-path` under `test-domain`, bound to the test application.
    pub fn http_route() -> Route {
        Route {
            id: route_id(),
            domain_id: domain_id(),
            space_id: space_id(),
            host: Some("test-host".into()),
            path: Some("test-path".into()),
            port: None,
            destinations: vec![destination()],
            service_instance_id: None,
        }
    }

    /// TCP route on `port` under `test-domain`, bound to the test application.
    pub fn tcp_route(port: u16) -> Route {
        Route {
            host: None,
            path: None,
            port: Some(port),
            ..http_route()
        }
    }

    /// A route with neither destinations nor a service instance.
    pub fn orphan_route() -> Route {
        Route {
            destinations: Vec::new(),
            ..http_route()
        }
    }

    pub fn legacy(status: &str) -> RawJobStatus {
        RawJobStatus::Legacy {
            status: status.into(),
            error: None,
        }
    }

    pub fn legacy_failed(code: i64, error_code: &str, description: &str) -> RawJobStatus {
        RawJobStatus::Legacy {
            status: "failed".into(),
            error: Some(RawJobError {
                code,
                title: error_code.into(),
                description: description.into(),
            }),
        }
    }

    pub fn enumerated(state: &str) -> RawJobStatus {
        RawJobStatus::Enumerated {
            state: state.into(),
            errors: Vec::new(),
        }
    }

    pub fn enumerated_failed(code: i64, title: &str, detail: &str) -> RawJobStatus {
        RawJobStatus::Enumerated {
            state: "FAILED".into(),
            errors: vec![RawJobError {
                code,
                title: title.into(),
                description: detail.into(),
            }],
        }
    }
}
