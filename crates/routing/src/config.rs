//! Tunables for route operations.
//!
//! [`OperationsConfig`] is deserialisable so the composition root can load it
//! from a configuration file; every field has a default, so an empty document
//! yields [`OperationsConfig::default`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between job status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of per-route checks or deletes in flight during a scan.
pub const DEFAULT_SCAN_CONCURRENCY: usize = 4;

/// What an orphan sweep does when deleting one orphan fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanFailurePolicy {
    /// Fail the sweep with the first error; outstanding deletes are dropped.
    #[default]
    Abort,
    /// Record the failure and keep deleting the remaining orphans.
    Continue,
}

/// Configuration shared by every operation of a [`crate::RouteOperations`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationsConfig {
    /// Delay between two polls of a pending or running job.
    #[serde(with = "duration_millis", rename = "poll_interval_ms")]
    pub poll_interval: Duration,

    /// Upper bound on how long a single job is polled. `None` polls until the
    /// job reaches a terminal state.
    #[serde(with = "optional_duration_millis", rename = "job_timeout_ms")]
    pub job_timeout: Option<Duration>,

    /// Maximum number of per-route checks, and of deletes, in flight at once
    /// during an orphan sweep. Values below 1 are treated as 1.
    pub scan_concurrency: usize,

    /// Behaviour of an orphan sweep when a delete job fails.
    pub orphan_failure_policy: OrphanFailurePolicy,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            job_timeout: None,
            scan_concurrency: DEFAULT_SCAN_CONCURRENCY,
            orphan_failure_policy: OrphanFailurePolicy::Abort,
        }
    }
}

impl OperationsConfig {
    pub(crate) fn effective_concurrency(&self) -> usize {
        self.scan_concurrency.max(1)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod optional_duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer
                .serialize_some(&u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|millis| millis.map(Duration::from_millis))
    }
}
