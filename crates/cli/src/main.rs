//! Routekeeper CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration** from flags, environment variables and an optional
//!    JSON settings file (`--config`).
//! 2. **Wire observability** by configuring `tracing-subscriber` (text or JSON
//!    on stderr) and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an
//!    OpenTelemetry OTLP exporter. Every span emitted by the workspace crates
//!    flows through these layers.
//! 3. **Construct infrastructure** by creating the `CloudControllerClient` and
//!    injecting it into `RouteOperations`.
//! 4. **Dispatch** the selected subcommand and print its outcome.

mod args;
mod output;
mod settings;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use futures::TryStreamExt;

use cloud_controller::CloudControllerClient;
use routing::{
    CheckRouteRequest, CreateRouteRequest, DeleteRouteRequest, MapRouteRequest, Platform,
    RouteOperations,
};

use crate::args::{Cli, Command, RouteArgs};
use crate::output::Outcome;
use crate::settings::{FileSettings, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = match telemetry::init(cli.log_json) {
        Ok(telemetry) => telemetry,
        Err(error) => {
            eprintln!("error: failed to initialise telemetry: {error:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(cli).await;
    telemetry.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file = match &cli.config {
        Some(path) => FileSettings::load(path)?,
        None => FileSettings::default(),
    };
    let settings = Settings::resolve(&cli.connection, file)?;
    tracing::debug!(client = ?settings.client, target = ?settings.target, "Resolved settings");

    let client = CloudControllerClient::new(&settings.client)
        .context("failed to construct the platform client")?;
    let operations = RouteOperations::new(Arc::new(client), settings.target, settings.operations);

    let outcome = execute(&operations, cli.command).await?;
    output::print(&outcome, cli.json).context("failed to write output")?;
    Ok(())
}

async fn execute<P: Platform>(
    operations: &RouteOperations<P>,
    command: Command,
) -> anyhow::Result<Outcome> {
    let outcome = match command {
        Command::Check { domain, host, path } => {
            let exists = operations
                .check(&CheckRouteRequest { domain, host, path })
                .await
                .context("failed to check route")?;
            Outcome::Exists(exists)
        }
        Command::Create { route, space } => {
            let RouteArgs {
                domain,
                host,
                path,
                port,
            } = route;
            let created = operations
                .create(&CreateRouteRequest {
                    domain,
                    host,
                    path,
                    port,
                    space,
                })
                .await
                .context("failed to create route")?;
            Outcome::Created(created)
        }
        Command::Map { application, route } => {
            let port = operations
                .map(&map_request(application, route))
                .await
                .context("failed to map route")?;
            Outcome::Mapped(port)
        }
        Command::Unmap { application, route } => {
            operations
                .unmap(&map_request(application, route))
                .await
                .context("failed to unmap route")?;
            Outcome::Unmapped
        }
        Command::Delete { route } => {
            let RouteArgs {
                domain,
                host,
                path,
                port,
            } = route;
            operations
                .delete(&DeleteRouteRequest {
                    domain,
                    host,
                    path,
                    port,
                })
                .await
                .context("failed to delete route")?;
            Outcome::Deleted
        }
        Command::List { level } => {
            let routes = operations
                .list(level.into())
                .try_collect()
                .await
                .context("failed to list routes")?;
            Outcome::Routes(routes)
        }
        Command::DeleteOrphaned { level } => {
            let sweep = operations
                .delete_orphaned_routes(level.into())
                .await
                .context("failed to delete orphaned routes")?;
            Outcome::Swept(sweep)
        }
    };
    Ok(outcome)
}

fn map_request(application: String, route: RouteArgs) -> MapRouteRequest {
    MapRouteRequest {
        application,
        domain: route.domain,
        host: route.host,
        path: route.path,
        port: route.port,
    }
}
