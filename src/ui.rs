// UI layer: a small interactive menu using `dialoguer`. It only renders
// what `ApiClient` returns; failures are printed as one line, except
// authentication failures which end the program.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::ApiClient;
use crate::error::Error;
use crate::export::ExportRequest;
use crate::models::{Route, Waypoint};
use crate::session::Credentials;
use crate::transport::Transport;

/// Credentials from `DELORME_USERNAME` / `DELORME_PASSWORD`, prompting for
/// whichever is missing.
pub fn credentials() -> Result<Credentials> {
    let username = match std::env::var("DELORME_USERNAME") {
        Ok(name) if !name.is_empty() => name,
        _ => Input::new().with_prompt("Username").interact_text()?,
    };
    let password = match std::env::var("DELORME_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => Password::new().with_prompt("Password").interact()?,
    };
    Ok(Credentials::new(username, password))
}

/// Main interactive menu. Runs until the user picks "Exit"; returns an error
/// only when the service rejects the credentials.
pub fn main_menu<T: Transport>(api: &ApiClient<T>) -> Result<()> {
    let items = vec![
        "List routes",
        "Show last route",
        "Delete route",
        "List waypoints",
        "Delete waypoint",
        "Import file",
        "Export device data",
        "Exit",
    ];
    loop {
        let selection = Select::new().items(&items).default(0).interact()?;
        let outcome: Result<()> = match selection {
            0 => with_spinner("Fetching routes...", || api.list_routes())
                .map(|routes| routes.iter().for_each(print_route))
                .map_err(Into::into),
            1 => with_spinner("Fetching routes...", || api.last_route())
                .map(|r| print_route(&r))
                .map_err(Into::into),
            2 => {
                let id: i64 = Input::new().with_prompt("Route id").interact_text()?;
                if !confirm_delete("route", id)? {
                    continue;
                }
                with_spinner("Deleting...", || api.delete_route(id))
                    .map(|()| println!("Deleted route {id}"))
                    .map_err(Into::into)
            }
            3 => with_spinner("Fetching waypoints...", || api.list_waypoints())
                .map(|wps| wps.iter().for_each(print_waypoint))
                .map_err(Into::into),
            4 => {
                let id: i64 = Input::new().with_prompt("Waypoint id").interact_text()?;
                if !confirm_delete("waypoint", id)? {
                    continue;
                }
                with_spinner("Deleting...", || api.delete_waypoint(id))
                    .map(|()| println!("Deleted waypoint {id}"))
                    .map_err(Into::into)
            }
            5 => {
                let path: String = Input::new().with_prompt("File path").interact_text()?;
                let path = PathBuf::from(path);
                with_spinner("Importing...", || api.import_file(&path))
                    .map(|results| {
                        for r in results {
                            println!("{}\t{}", r.route_id, r.label);
                        }
                    })
                    .map_err(Into::into)
            }
            6 => {
                let request = export_request()?;
                let out: String = Input::new()
                    .with_prompt("Save to")
                    .default("export.gpx".into())
                    .interact_text()?;
                with_spinner("Exporting...", || api.export_data(&request))
                    .map_err(anyhow::Error::from)
                    .and_then(|body| save_export(Path::new(&out), &body))
            }
            _ => break,
        };

        report(outcome)?;
    }
    Ok(())
}

/// Print a failed menu action as one line. Only authentication failures
/// are passed back up.
fn report(outcome: Result<()>) -> Result<()> {
    match outcome {
        Err(e) if is_fatal(&e) => Err(e),
        Err(e) => {
            println!("Error: {e:#}");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

fn is_fatal(e: &anyhow::Error) -> bool {
    e.downcast_ref::<Error>()
        .is_some_and(Error::is_authentication)
}

fn confirm_delete(kind: &str, id: i64) -> Result<bool> {
    Ok(Confirm::new().with_prompt(delete_prompt(kind, id)).interact()?)
}

fn delete_prompt(kind: &str, id: i64) -> String {
    format!("Delete {kind} {id}?")
}

fn save_export(out: &Path, body: &str) -> Result<()> {
    std::fs::write(out, body).with_context(|| format!("writing {}", out.display()))?;
    println!("Saved {}", out.display());
    Ok(())
}

fn export_request() -> Result<ExportRequest> {
    let device_id: i64 = Input::new().with_prompt("Device id").interact_text()?;
    let mut request = ExportRequest::new(device_id);
    if let Some(from) = prompt_date("From date (YYYY-MM-DD, empty for latest track)")? {
        request = request.with_from_date(from);
    }
    if let Some(to) = prompt_date("To date (YYYY-MM-DD, optional)")? {
        request = request.with_to_date(to);
    }
    Ok(request)
}

fn prompt_date(prompt: &str) -> Result<Option<DateTime<Utc>>> {
    let raw: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date `{raw}`"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("invalid date")?;
    Ok(Some(midnight.and_utc()))
}

fn with_spinner<R>(message: &'static str, f: impl FnOnce() -> R) -> R {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    spinner.finish_and_clear();
    out
}

fn print_route(r: &Route) {
    println!(
        "{}\t{}\t{}\t{}",
        r.route_id,
        r.label,
        r.created_at.format("%Y-%m-%d %H:%M"),
        r.modified_at.format("%Y-%m-%d %H:%M")
    );
}

fn print_waypoint(w: &Waypoint) {
    let label = w
        .field("Label")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    println!("{}\t{}", w.waypoint_id, label);
}
