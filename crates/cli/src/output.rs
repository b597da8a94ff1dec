//! Rendering of command results for humans and for `--json`.

use std::io::{self, Write};

use serde_json::{json, Value};

use routing::{OrphanSweep, RouteView};

/// Result of one subcommand.
#[derive(Debug)]
pub enum Outcome {
    Exists(bool),
    Created(u32),
    Mapped(Option<u16>),
    Unmapped,
    Deleted,
    Routes(Vec<RouteView>),
    Swept(OrphanSweep),
}

impl Outcome {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Exists(exists) => json!({ "exists": exists }),
            Self::Created(count) => json!({ "created": count }),
            Self::Mapped(port) => json!({ "mapped": true, "port": port }),
            Self::Unmapped => json!({ "unmapped": true }),
            Self::Deleted => json!({ "deleted": true }),
            Self::Routes(routes) => json!({ "routes": routes }),
            Self::Swept(sweep) => json!({
                "deleted": sweep.deleted,
                "failed": sweep
                    .failed
                    .iter()
                    .map(|failure| json!({
                        "route_id": failure.route_id,
                        "error": failure.error.to_string(),
                    }))
                    .collect::<Vec<_>>(),
            }),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Self::Exists(true) => "Route exists".to_owned(),
            Self::Exists(false) => "Route does not exist".to_owned(),
            Self::Created(count) => format!("Created {count} route(s)"),
            Self::Mapped(Some(port)) => format!("Route mapped on port {port}"),
            Self::Mapped(None) => "Route mapped".to_owned(),
            Self::Unmapped => "Route unmapped".to_owned(),
            Self::Deleted => "Route deleted".to_owned(),
            Self::Routes(routes) => route_table(routes),
            Self::Swept(sweep) => {
                let mut lines = vec![format!(
                    "Deleted {} orphaned route(s)",
                    sweep.deleted.len()
                )];
                lines.extend(
                    sweep
                        .failed
                        .iter()
                        .map(|failure| format!("Failed to delete {}: {}", failure.route_id, failure.error)),
                );
                lines.join("\n")
            }
        }
    }
}

pub fn print(outcome: &Outcome, as_json: bool) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    if as_json {
        serde_json::to_writer_pretty(&mut stdout, &outcome.to_json())?;
        writeln!(stdout)
    } else {
        writeln!(stdout, "{}", outcome.to_text())
    }
}

const HEADERS: [&str; 7] = ["space", "host", "domain", "port", "path", "apps", "service"];

fn route_table(routes: &[RouteView]) -> String {
    if routes.is_empty() {
        return "No routes found".to_owned();
    }

    let rows: Vec<[String; 7]> = routes
        .iter()
        .map(|route| {
            [
                route.space.clone(),
                route.host.clone().unwrap_or_default(),
                route.domain.clone(),
                route.port.map(|port| port.to_string()).unwrap_or_default(),
                route.path.clone().unwrap_or_default(),
                route.applications.join(", "),
                route.service.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: &[&str]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("   ")
            .trim_end()
            .to_owned()
    };

    let mut lines = vec![render(&HEADERS)];
    lines.extend(
        rows.iter()
            .map(|row| render(&row.each_ref().map(String::as_str))),
    );
    lines.join("\n")
}
