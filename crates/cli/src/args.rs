//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use routing::{Level, OrphanFailurePolicy};

/// Manage routes on a Cloud Foundry style platform.
#[derive(Debug, Parser)]
#[command(name = "routekeeper", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// JSON settings file; flags and environment variables take precedence.
    #[arg(long, global = true, env = "ROUTEKEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, env = "ROUTEKEEPER_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Where to connect and what to act on.
#[derive(Debug, Default, Args)]
pub struct ConnectionArgs {
    /// API base URL.
    #[arg(long, global = true, env = "CF_API_URL")]
    pub api_url: Option<String>,

    /// OAuth access token.
    #[arg(long, global = true, env = "CF_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Organization guid.
    #[arg(long, global = true, env = "CF_ORGANIZATION_ID")]
    pub organization_id: Option<String>,

    /// Space guid.
    #[arg(long, global = true, env = "CF_SPACE_ID")]
    pub space_id: Option<String>,

    /// Delay between job polls, in milliseconds.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Give up on a job after this many milliseconds of polling.
    #[arg(long, global = true)]
    pub job_timeout_ms: Option<u64>,

    /// Concurrent route checks and deletions during an orphan sweep.
    #[arg(long, global = true)]
    pub scan_concurrency: Option<usize>,

    /// What an orphan sweep does when one deletion fails.
    #[arg(long, global = true, value_enum)]
    pub orphan_failure_policy: Option<FailurePolicyArg>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Report whether a route exists.
    Check {
        /// Domain name.
        #[arg(long)]
        domain: String,
        /// Host label.
        #[arg(long)]
        host: Option<String>,
        /// Context path.
        #[arg(long)]
        path: Option<String>,
    },

    /// Create a route in a space of the targeted organization.
    Create {
        #[command(flatten)]
        route: RouteArgs,
        /// Space name.
        #[arg(long)]
        space: String,
    },

    /// Bind an application to a route, creating the route if needed.
    Map {
        /// Application name.
        #[arg(long = "app")]
        application: String,
        #[command(flatten)]
        route: RouteArgs,
    },

    /// Remove an application's binding from a route.
    Unmap {
        /// Application name.
        #[arg(long = "app")]
        application: String,
        #[command(flatten)]
        route: RouteArgs,
    },

    /// Delete a route and wait for the deletion to finish.
    Delete {
        #[command(flatten)]
        route: RouteArgs,
    },

    /// List routes with their domain, space, applications and service.
    List {
        #[arg(long, value_enum, default_value_t = LevelArg::Space)]
        level: LevelArg,
    },

    /// Delete routes with no application and no service bound.
    DeleteOrphaned {
        #[arg(long, value_enum, default_value_t = LevelArg::Space)]
        level: LevelArg,
    },
}

/// Identifies a route under a domain.
#[derive(Debug, Clone, Args)]
pub struct RouteArgs {
    /// Domain name.
    #[arg(long)]
    pub domain: String,
    /// Host label.
    #[arg(long)]
    pub host: Option<String>,
    /// Context path.
    #[arg(long)]
    pub path: Option<String>,
    /// TCP port.
    #[arg(long, conflicts_with_all = ["host", "path"])]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    Organization,
    Space,
}

impl From<LevelArg> for Level {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Organization => Level::Organization,
            LevelArg::Space => Level::Space,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicyArg {
    Abort,
    Continue,
}

impl From<FailurePolicyArg> for OrphanFailurePolicy {
    fn from(policy: FailurePolicyArg) -> Self {
        match policy {
            FailurePolicyArg::Abort => OrphanFailurePolicy::Abort,
            FailurePolicyArg::Continue => OrphanFailurePolicy::Continue,
        }
    }
}
