//! Settings resolution: flags and environment over the JSON settings file
//! over built-in defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use cloud_controller::ClientConfig;
use routing::{OperationsConfig, OrganizationId, SpaceId, Target};

use crate::args::ConnectionArgs;

/// Contents of the `--config` file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub api_url: Option<String>,
    pub access_token: Option<String>,
    pub organization_id: Option<String>,
    pub space_id: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub page_size: Option<u32>,
    pub user_agent: Option<String>,
    #[serde(default)]
    pub operations: OperationsConfig,
}

impl FileSettings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings file {}", path.display()))
    }
}

/// Everything needed to build the client and the operations.
#[derive(Debug)]
pub struct Settings {
    pub client: ClientConfig,
    pub target: Target,
    pub operations: OperationsConfig,
}

impl Settings {
    pub fn resolve(args: &ConnectionArgs, file: FileSettings) -> anyhow::Result<Self> {
        let api_url = required(args.api_url.clone().or(file.api_url), "api-url")?;
        let access_token = required(args.access_token.clone().or(file.access_token), "access-token")?;
        let organization_id = required(
            args.organization_id.clone().or(file.organization_id),
            "organization-id",
        )?;
        let space_id = required(args.space_id.clone().or(file.space_id), "space-id")?;

        let mut client = ClientConfig::new(api_url, access_token);
        if let Some(timeout) = file.request_timeout_ms {
            client.request_timeout = Duration::from_millis(timeout);
        }
        if let Some(page_size) = file.page_size {
            client.page_size = page_size;
        }
        if let Some(user_agent) = file.user_agent {
            client.user_agent = user_agent;
        }

        let mut operations = file.operations;
        if let Some(interval) = args.poll_interval_ms {
            operations.poll_interval = Duration::from_millis(interval);
        }
        if let Some(timeout) = args.job_timeout_ms {
            operations.job_timeout = Some(Duration::from_millis(timeout));
        }
        if let Some(concurrency) = args.scan_concurrency {
            operations.scan_concurrency = concurrency;
        }
        if let Some(policy) = args.orphan_failure_policy {
            operations.orphan_failure_policy = policy.into();
        }

        let target = Target {
            organization_id: OrganizationId::new(organization_id)
                .ok_or_else(|| anyhow!("organization-id must not be empty"))?,
            space_id: SpaceId::new(space_id).ok_or_else(|| anyhow!("space-id must not be empty"))?,
        };

        Ok(Self {
            client,
            target,
            operations,
        })
    }
}

fn required(value: Option<String>, flag: &str) -> anyhow::Result<String> {
    value.ok_or_else(|| anyhow!("--{flag} is required (flag, environment or settings file)"))
}
