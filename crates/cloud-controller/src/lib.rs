//! Routekeeper platform adapter for the Cloud Controller v3 HTTP API.
//!
//! Implements every [`routing::Platform`] port with a single
//! [`CloudControllerClient`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, bearer authentication, query building,
//! pagination links, DTO decoding and status mapping live here. The
//! [`routing`] crate sees only its port traits and domain types.

mod client;
mod config;
mod dto;
mod query;

pub use client::{ClientError, CloudControllerClient};
pub use config::{ClientConfig, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT};
