use super::{dashboard_mut, query_param};
use crate::export::{self, ExportJob};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Event, Request};
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

fn handle_view(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard_mut(state, req) {
        Ok(d) => ok(&req.id, json!(d.view(&query_param(req)))),
        Err(e) => e,
    }
}

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard_mut(state, req) {
        Ok(d) => ok(&req.id, json!(d.cards())),
        Err(e) => e,
    }
}

fn handle_charts(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard_mut(state, req) {
        Ok(d) => ok(&req.id, json!(d.charts())),
        Err(e) => e,
    }
}

fn handle_resize(state: &mut AppState, req: &Request) -> serde_json::Value {
    let d = match dashboard_mut(state, req) {
        Ok(d) => d,
        Err(e) => return e,
    };
    d.on_resize(Instant::now());
    ok(
        &req.id,
        json!({
            "scheduled": true,
            "quietMs": d.settings().resize_debounce_ms,
        }),
    )
}

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let events = state.events.clone();
    let workspace = state.workspace.clone();
    let d = match dashboard_mut(state, req) {
        Ok(d) => d,
        Err(e) => return e,
    };

    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => match workspace {
            Some(ws) => ws.join(&d.settings().export_file_name),
            None => return err(&req.id, "no_workspace", "select a workspace first", None),
        },
    };

    let Some(job_id) = d.begin_export() else {
        return ok(
            &req.id,
            json!({ "started": false, "reason": "export_in_progress" }),
        );
    };
    let job = ExportJob {
        job_id: job_id.clone(),
        out_path: out_path.clone(),
        view: d.view(&query_param(req)),
    };

    let spawned = export::spawn_export(job, move |job_id, result| {
        let _ = events.send(Event::ExportFinished { job_id, result });
    });
    if let Err(e) = spawned {
        d.finish_export(&job_id);
        error!(error = %e, "could not start export thread");
        return err(
            &req.id,
            "export_failed",
            export::EXPORT_FAILED_MESSAGE,
            Some(json!({ "reason": e.to_string() })),
        );
    }

    info!(job = %job_id, path = %out_path.display(), "report export started");
    ok(
        &req.id,
        json!({
            "started": true,
            "jobId": job_id,
            "outPath": out_path.to_string_lossy(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.view" => Some(handle_view(state, req)),
        "dashboard.summary" => Some(handle_summary(state, req)),
        "dashboard.charts" => Some(handle_charts(state, req)),
        "dashboard.resize" => Some(handle_resize(state, req)),
        "dashboard.export" => Some(handle_export(state, req)),
        _ => None,
    }
}
