//! Error and retry-policy types for route operations.
//!
//! [`RoutingError`] is the only error callers of [`crate::RouteOperations`]
//! see. It distinguishes the structured domain failures (a named resource is
//! missing, a job failed) from [`PlatformError`]s raised by the port
//! implementations, which are passed through unchanged.
//!
//! [`RetryPolicy`] is advisory: the core never retries, but callers and
//! transport layers may consult it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifiers::JobId;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// ## Rules
///
/// - `Retryable` errors: transport timeouts, rate limiting, server errors.
/// - `NonRetryable` errors: missing resources, failed jobs, rejected requests,
///   undecodable responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt (e.g. from `Retry-After`).
        /// `None` means apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Port-level errors
// ---------------------------------------------------------------------------

/// Errors raised by platform port implementations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlatformError {
    /// The request never produced a response (connection, TLS, timeout).
    #[error("platform request failed: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The platform answered with a non-success status.
    #[error("platform returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error text reported by the platform.
        message: String,
        /// Delay requested by the platform before retrying, if any.
        retry_after: Option<Duration>,
    },

    /// The response body could not be decoded.
    #[error("platform response could not be decoded: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },

    /// The response was well-formed but violated the expected protocol, e.g.
    /// an unknown job status or a missing job location.
    #[error("platform protocol violation: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },
}

impl PlatformError {
    /// Creates a [`PlatformError::Transport`].
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a [`PlatformError::Decode`].
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a [`PlatformError::Protocol`].
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Whether the failed call may be retried.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::Status {
                status,
                retry_after,
                ..
            } if *status == 429 || *status >= 500 => RetryPolicy::Retryable {
                after: *retry_after,
            },
            _ => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation-level errors
// ---------------------------------------------------------------------------

/// Kind of a named resource, used in [`RoutingError::NotFound`] messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A domain.
    Domain,
    /// A space.
    Space,
    /// An application.
    Application,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Domain => "Domain",
            Self::Space => "Space",
            Self::Application => "Application",
        };
        f.write_str(label)
    }
}

/// Errors returned by route operations.
///
/// Every pipeline step short-circuits on the first error; no operation
/// returns a partial success alongside an error.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A required named resource could not be resolved.
    #[error("{kind} {name} does not exist")]
    NotFound {
        /// Kind of the missing resource.
        kind: ResourceKind,
        /// Name the caller supplied.
        name: String,
    },

    /// No route matched the requested host, path or port under the domain.
    #[error("Route for {domain} does not exist")]
    RouteNotFound {
        /// Name of the domain that was searched.
        domain: String,
    },

    /// The route exists but has no destination for the application.
    #[error("Application {application} is not mapped to a route on {domain}")]
    NotMapped {
        /// Application name.
        application: String,
        /// Domain name.
        domain: String,
    },

    /// A polled job reached its failed terminal state.
    #[error("{title}({code}): {description}")]
    JobFailed {
        /// Numeric platform error code.
        code: i64,
        /// Short error title (e.g. `"CF-RouteNotFound"`).
        title: String,
        /// Human-readable description.
        description: String,
    },

    /// A job did not reach a terminal state within the configured timeout.
    #[error("Job {job_id} did not complete within {waited:?}")]
    JobTimedOut {
        /// Job that was being polled.
        job_id: JobId,
        /// Time spent waiting.
        waited: Duration,
    },

    /// The request cannot be expressed as a route (e.g. port combined with host).
    #[error("Invalid route request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// A platform call failed; passed through unchanged.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl RoutingError {
    /// Creates a [`RoutingError::NotFound`].
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether the failed operation may be retried as a whole.
    ///
    /// Only platform failures can be retryable; domain failures never are.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Platform(error) => error.retry_policy(),
            _ => RetryPolicy::NonRetryable,
        }
    }
}
