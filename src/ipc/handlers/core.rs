use crate::dashboard::Dashboard;
use crate::db::{self, SqliteBlobStore};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::settings;
use crate::store::RecordStore;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "exportInProgress": state.export_in_progress(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    // The running export still reports into the current dashboard.
    if state.export_in_progress() {
        return err(
            &req.id,
            "export_in_progress",
            "wait for the running export to finish",
            None,
        );
    }

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };
    let dashboard_settings = match settings::load(&conn) {
        Ok(s) => s,
        Err(e) => {
            warn!("could not read dashboard settings, using defaults: {e:#}");
            settings::DashboardSettings::default()
        }
    };
    let (store, report) = match RecordStore::open(SqliteBlobStore::new(conn)) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:#}"), None),
    };

    info!(path = %path.display(), records = report.loaded, "workspace opened");
    state.workspace = Some(path.clone());
    state.dashboard = Some(Dashboard::new(store, dashboard_settings));
    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "recordCount": report.loaded,
            "quarantinedKey": report.quarantined_key,
            "warnings": report.warnings,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
