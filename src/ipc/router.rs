use std::time::Instant;

use super::handlers;
use super::types::{AppState, Request};
use crate::export::{ExportError, ExportSummary, EXPORT_FAILED_MESSAGE};
use crate::ipc::error::{err, event};
use serde_json::json;
use tracing::{debug, error, info};

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    debug!(id = %req.id, method = %req.method, "request");
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::dashboard::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::settings::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

/// One protocol line in, one response out. Blank lines produce nothing.
pub fn handle_line(state: &mut AppState, line: &str) -> Option<serde_json::Value> {
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Request>(line) {
        Ok(req) => Some(handle_request(state, req)),
        // Can't reply with an id we could not read.
        Err(e) => Some(json!({
            "ok": false,
            "error": { "code": "bad_json", "message": e.to_string() }
        })),
    }
}

pub fn on_export_finished(
    state: &mut AppState,
    job_id: String,
    result: Result<ExportSummary, ExportError>,
) -> serde_json::Value {
    if let Some(d) = state.dashboard.as_mut() {
        d.finish_export(&job_id);
    }
    match result {
        Ok(summary) => {
            info!(job = %job_id, path = %summary.out_path, bytes = summary.bytes, "report exported");
            event(
                "export.finished",
                json!({ "jobId": job_id, "ok": true, "result": summary }),
            )
        }
        Err(e) => {
            error!(job = %job_id, error = %e, "report export failed");
            event(
                "export.finished",
                json!({
                    "jobId": job_id,
                    "ok": false,
                    "error": {
                        "code": "export_failed",
                        "message": EXPORT_FAILED_MESSAGE,
                        "details": { "reason": e.to_string() }
                    }
                }),
            )
        }
    }
}

pub fn poll_redraw(state: &mut AppState, now: Instant) -> Option<serde_json::Value> {
    let d = state.dashboard.as_mut()?;
    let charts = d.poll_redraw(now)?;
    Some(event(
        "charts.redraw",
        json!({ "revision": d.store().revision(), "charts": charts }),
    ))
}
