//! Newtype resource identifiers.
//!
//! Every platform resource is addressed by an opaque, server-assigned string.
//! Each kind gets its own newtype so a [`DomainId`] can never be passed where a
//! [`SpaceId`] is expected, even though both are strings on the wire.
//!
//! Identifiers are compared by exact match and are never derived from user
//! input: they only enter the system through a platform port response.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — platform-assigned
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies an organization, the outermost tenancy boundary.
    OrganizationId
}

string_id! {
    /// Identifies a space within an organization.
    SpaceId
}

string_id! {
    /// Identifies a domain (shared or private to one organization).
    DomainId
}

string_id! {
    /// Identifies an application deployed to a space.
    ApplicationId
}

string_id! {
    /// Identifies a route.
    RouteId
}

string_id! {
    /// Identifies one destination binding on a route.
    ///
    /// Required to remove a single application from a route without touching
    /// the route's other destinations.
    DestinationId
}

string_id! {
    /// Identifies a (managed or user-provided) service instance.
    ServiceInstanceId
}

string_id! {
    /// Identifies a server-side asynchronous job returned by a mutating call.
    JobId
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single invocation of a public route operation.
///
/// Generated fresh per call and recorded on the operation's tracing span so all
/// network calls and poll ticks of one pipeline can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Generates a new random operation identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
