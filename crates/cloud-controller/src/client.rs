//! Reqwest-backed implementation of every routing port.
//!
//! The client owns transport details only: URL construction, bearer
//! authentication, timeouts, status mapping and JSON decoding into routing
//! domain types. It never retries; [`routing::PlatformError::retry_policy`]
//! tells callers which failures are worth retrying.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LOCATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use routing::{
    Application, ApplicationCatalog, ApplicationFilter, ApplicationId, Destination, DestinationId,
    Domain, DomainCatalog, DomainFilter, JobId, JobTracker, NewRoute, Page, PlatformError, RawJob,
    Route, RouteFilter, RouteId, RouteStore, ScopeFilter, ServiceInstance, ServiceInstanceCatalog,
    ServiceInstanceId, Space, SpaceCatalog, SpaceFilter,
};

use crate::config::ClientConfig;
use crate::dto::{
    DestinationsDto, DomainDto, ErrorsDto, InsertDestinationsDto, JobDto, ListDto, NewRouteDto,
    RouteDto, ServiceRouteBindingDto, SpaceDto, SpaceScopedDto,
};
use crate::query::{self, Query};

const MAX_PAGE_SIZE: u32 = 5000;

/// Errors raised while constructing a [`CloudControllerClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API URL is not an absolute URL.
    #[error("invalid API URL {url}: {message}")]
    InvalidApiUrl {
        /// The configured URL.
        url: String,
        /// Why parsing failed.
        message: String,
    },

    /// No access token was configured.
    #[error("access token must not be empty")]
    MissingAccessToken,

    /// The access token contains characters not allowed in a header.
    #[error("access token is not a valid header value")]
    InvalidAccessToken,

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Platform adapter over the Cloud Controller v3 API.
pub struct CloudControllerClient {
    client: Client,
    base: Url,
    page_size: u32,
}

impl CloudControllerClient {
    /// Builds a client authenticated with the configured bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the URL or token is unusable or the
    /// reqwest client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base = base_url(&config.api_url)?;

        let token = config.access_token.trim();
        if token.is_empty() {
            return Err(ClientError::MissingAccessToken);
        }
        let mut authorization = HeaderValue::from_str(&format!("bearer {token}"))
            .map_err(|_| ClientError::InvalidAccessToken)?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base,
            page_size: config.page_size.clamp(1, MAX_PAGE_SIZE),
        })
    }

    fn url(&self, path: &str) -> Result<Url, PlatformError> {
        self.base
            .join(path)
            .map_err(|error| PlatformError::protocol(format!("invalid request path {path}: {error}")))
    }

    /// Sends the request and returns the response headers and body of a
    /// successful reply.
    async fn execute(&self, request: RequestBuilder) -> Result<(HeaderMap, Vec<u8>), PlatformError> {
        let request = request
            .build()
            .map_err(|error| PlatformError::protocol(format!("invalid request: {error}")))?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self
            .client
            .execute(request)
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_transport_error)?.to_vec();
        debug!(%method, url = %url.path(), status = status.as_u16(), "Platform request completed");

        if !status.is_success() {
            let error = map_status_error(status, &headers, &body);
            warn!(%method, url = %url.path(), error = %error, "Platform request failed");
            return Err(error);
        }
        Ok((headers, body))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, PlatformError> {
        let (_, body) = self.execute(request).await?;
        decode(&body)
    }

    async fn list<D, T>(
        &self,
        path: &str,
        query: Query,
        page: u32,
        convert: impl Fn(D) -> Result<T, String>,
    ) -> Result<Page<T>, PlatformError>
    where
        D: DeserializeOwned,
    {
        let url = self.url(path)?;
        let list: ListDto<D> = self
            .fetch(
                self.client
                    .get(url)
                    .query(&query::paged(query, page, self.page_size)),
            )
            .await?;
        let has_more = list.pagination.has_more();
        let resources = list
            .resources
            .into_iter()
            .map(convert)
            .collect::<Result<Vec<_>, _>>()
            .map_err(PlatformError::decode)?;
        Ok(Page {
            resources,
            has_more,
        })
    }

    /// Fills in `service_instance_id` for routes bound to a route service.
    async fn attach_service_instances(&self, routes: &mut [Route]) -> Result<(), PlatformError> {
        if routes.is_empty() {
            return Ok(());
        }
        let route_guids = routes
            .iter()
            .map(|route| route.id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let mut bindings: HashMap<RouteId, ServiceInstanceId> = HashMap::new();
        let mut page = 1;
        loop {
            let listed = self
                .list(
                    "v3/service_route_bindings",
                    vec![("route_guids", route_guids.clone())],
                    page,
                    ServiceRouteBindingDto::into_binding,
                )
                .await?;
            let exhausted = !listed.has_more || listed.resources.is_empty();
            bindings.extend(listed.resources);
            if exhausted {
                break;
            }
            page += 1;
        }

        for route in routes {
            route.service_instance_id = bindings.remove(&route.id);
        }
        Ok(())
    }
}

#[async_trait]
impl DomainCatalog for CloudControllerClient {
    async fn list_domains(
        &self,
        filter: &DomainFilter,
        page: u32,
    ) -> Result<Page<Domain>, PlatformError> {
        self.list("v3/domains", query::domains(filter), page, DomainDto::into_domain)
            .await
    }
}

#[async_trait]
impl SpaceCatalog for CloudControllerClient {
    async fn list_spaces(
        &self,
        filter: &SpaceFilter,
        page: u32,
    ) -> Result<Page<Space>, PlatformError> {
        self.list("v3/spaces", query::spaces(filter), page, SpaceDto::into_space)
            .await
    }
}

#[async_trait]
impl ApplicationCatalog for CloudControllerClient {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: u32,
    ) -> Result<Page<Application>, PlatformError> {
        self.list(
            "v3/apps",
            query::applications(filter),
            page,
            SpaceScopedDto::into_application,
        )
        .await
    }
}

#[async_trait]
impl ServiceInstanceCatalog for CloudControllerClient {
    async fn list_service_instances(
        &self,
        scope: &ScopeFilter,
        page: u32,
    ) -> Result<Page<ServiceInstance>, PlatformError> {
        self.list(
            "v3/service_instances",
            query::service_instances(scope),
            page,
            SpaceScopedDto::into_service_instance,
        )
        .await
    }
}

#[async_trait]
impl RouteStore for CloudControllerClient {
    async fn list_routes(
        &self,
        filter: &RouteFilter,
        page: u32,
    ) -> Result<Page<Route>, PlatformError> {
        let mut listed = self
            .list("v3/routes", query::routes(filter), page, RouteDto::into_route)
            .await?;
        self.attach_service_instances(&mut listed.resources).await?;
        Ok(listed)
    }

    async fn create_route(&self, route: &NewRoute) -> Result<Route, PlatformError> {
        let url = self.url("v3/routes")?;
        let created: RouteDto = self
            .fetch(self.client.post(url).json(&NewRouteDto::from(route)))
            .await?;
        created.into_route().map_err(PlatformError::decode)
    }

    async fn delete_route(&self, route_id: &RouteId) -> Result<JobId, PlatformError> {
        let url = self.url(&format!("v3/routes/{route_id}"))?;
        let (headers, _) = self.execute(self.client.delete(url)).await?;
        let location = headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| PlatformError::protocol("route deletion returned no job location"))?;
        job_id_from_location(&self.base, location)
    }

    async fn list_destinations(
        &self,
        route_id: &RouteId,
        page: u32,
    ) -> Result<Page<Destination>, PlatformError> {
        // The destinations endpoint is not paginated.
        if page > 1 {
            return Ok(Page::empty());
        }
        let url = self.url(&format!("v3/routes/{route_id}/destinations"))?;
        let listed: DestinationsDto = self.fetch(self.client.get(url)).await?;
        let destinations = listed
            .destinations
            .into_iter()
            .map(|destination| destination.into_destination())
            .collect::<Result<Vec<_>, _>>()
            .map_err(PlatformError::decode)?;
        Ok(Page::last(destinations))
    }

    async fn insert_destination(
        &self,
        route_id: &RouteId,
        application_id: &ApplicationId,
    ) -> Result<(), PlatformError> {
        let url = self.url(&format!("v3/routes/{route_id}/destinations"))?;
        self.execute(
            self.client
                .post(url)
                .json(&InsertDestinationsDto::single(application_id)),
        )
        .await?;
        Ok(())
    }

    async fn remove_destination(
        &self,
        route_id: &RouteId,
        destination_id: &DestinationId,
    ) -> Result<(), PlatformError> {
        let url = self.url(&format!(
            "v3/routes/{route_id}/destinations/{destination_id}"
        ))?;
        self.execute(self.client.delete(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl JobTracker for CloudControllerClient {
    async fn get_job(&self, job_id: &JobId) -> Result<RawJob, PlatformError> {
        let url = self.url(&format!("v3/jobs/{job_id}"))?;
        let job: JobDto = self.fetch(self.client.get(url)).await?;
        job.into_job().map_err(PlatformError::decode)
    }
}

/// Parses `api_url`, making sure relative request paths extend it.
fn base_url(api_url: &str) -> Result<Url, ClientError> {
    let mut base = Url::parse(api_url).map_err(|error| ClientError::InvalidApiUrl {
        url: api_url.to_owned(),
        message: error.to_string(),
    })?;
    if base.cannot_be_a_base() {
        return Err(ClientError::InvalidApiUrl {
            url: api_url.to_owned(),
            message: "URL cannot be a base".to_owned(),
        });
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

/// Extracts the job id from the `Location` of an accepted deletion, e.g.
/// `https://api.example.com/v3/jobs/<guid>`.
fn job_id_from_location(base: &Url, location: &str) -> Result<JobId, PlatformError> {
    let url = base
        .join(location)
        .map_err(|error| PlatformError::protocol(format!("invalid job location {location}: {error}")))?;
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
        .and_then(JobId::new)
        .ok_or_else(|| PlatformError::protocol(format!("job location {location} has no job id")))
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, PlatformError> {
    serde_json::from_slice(body)
        .map_err(|error| PlatformError::decode(format!("invalid JSON payload: {error}")))
}

fn map_transport_error(error: reqwest::Error) -> PlatformError {
    PlatformError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> PlatformError {
    let message = serde_json::from_slice::<ErrorsDto>(body)
        .ok()
        .and_then(|errors| errors.summary())
        .unwrap_or_else(|| body_preview(body));
    PlatformError::Status {
        status: status.as_u16(),
        message,
        retry_after: retry_after(headers),
    }
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use routing::RetryPolicy;

    use super::*;

    fn base() -> Url {
        base_url("https://api.example.com").unwrap()
    }

    #[rstest]
    #[case::absolute("https://api.example.com/v3/jobs/job-guid")]
    #[case::relative("/v3/jobs/job-guid")]
    #[case::trailing_slash("https://api.example.com/v3/jobs/job-guid/")]
    fn job_id_is_the_last_location_segment(#[case] location: &str) {
        let job_id = job_id_from_location(&base(), location).unwrap();

        assert_eq!(job_id.as_str(), "job-guid");
    }

    #[test]
    fn job_location_without_segments_is_a_protocol_error() {
        let error = job_id_from_location(&base(), "https://api.example.com/").unwrap_err();

        assert!(matches!(error, PlatformError::Protocol { .. }));
    }

    #[test]
    fn base_url_keeps_a_path_prefix() {
        let base = base_url("https://gateway.example.com/cf").unwrap();

        assert_eq!(
            base.join("v3/routes").unwrap().as_str(),
            "https://gateway.example.com/cf/v3/routes"
        );
    }

    #[test]
    fn relative_api_url_is_rejected() {
        assert!(matches!(
            base_url("api.example.com"),
            Err(ClientError::InvalidApiUrl { .. })
        ));
    }

    #[test]
    fn empty_token_is_rejected() {
        let config = ClientConfig::new("https://api.example.com", "  ");

        assert!(matches!(
            CloudControllerClient::new(&config),
            Err(ClientError::MissingAccessToken)
        ));
    }

    #[rstest]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS, true)]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, true)]
    #[case::bad_gateway(StatusCode::BAD_GATEWAY, true)]
    #[case::not_found(StatusCode::NOT_FOUND, false)]
    #[case::unprocessable(StatusCode::UNPROCESSABLE_ENTITY, false)]
    fn statuses_map_to_retry_policies(#[case] status: StatusCode, #[case] retryable: bool) {
        let error = map_status_error(status, &HeaderMap::new(), b"");

        assert_eq!(
            matches!(error.retry_policy(), RetryPolicy::Retryable { .. }),
            retryable
        );
    }

    #[test]
    fn status_error_carries_the_platform_error_summary() {
        let body = br#"{ "errors": [
            { "code": 10010, "title": "CF-ResourceNotFound", "detail": "Route not found" }
        ] }"#;

        let error = map_status_error(StatusCode::NOT_FOUND, &HeaderMap::new(), body);

        assert_eq!(
            error,
            PlatformError::Status {
                status: 404,
                message: "CF-ResourceNotFound(10010): Route not found".into(),
                retry_after: None,
            }
        );
    }

    #[test]
    fn status_error_falls_back_to_a_body_preview() {
        let body = "x".repeat(200);

        let error = map_status_error(StatusCode::BAD_GATEWAY, &HeaderMap::new(), body.as_bytes());

        let PlatformError::Status { message, .. } = error else {
            panic!("expected a status error");
        };
        assert_eq!(message.len(), 163);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn retry_after_seconds_are_honoured() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

        let error = map_status_error(StatusCode::TOO_MANY_REQUESTS, &headers, b"");

        assert_eq!(
            error.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(7))
            }
        );
    }
}
