use super::{dashboard_mut, query_param};
use crate::dashboard::{AddError, ImportMode};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::legacy;
use crate::record::RecordDraft;
use serde_json::json;
use tracing::info;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let d = match dashboard_mut(state, req) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let table = d.table(&query_param(req));
    ok(&req.id, json!(table))
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let d = match dashboard_mut(state, req) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let source = req.params.get("student").unwrap_or(&req.params);
    if !source.is_object() {
        return err(&req.id, "bad_params", "params must be an object", None);
    }
    let draft = RecordDraft::from_json(source);
    match d.add(&draft) {
        Ok(()) => ok(&req.id, json!({ "view": d.view(&query_param(req)) })),
        Err(AddError::Invalid(e)) => err(
            &req.id,
            "validation_failed",
            e.to_string(),
            Some(json!({ "field": e.field().as_str(), "constraint": e.constraint() })),
        ),
        Err(AddError::Persist(e)) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

fn handle_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let d = match dashboard_mut(state, req) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let confirmed = req
        .params
        .get("confirm")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !confirmed {
        return err(
            &req.id,
            "confirmation_required",
            "Clear all stored student data? Resend with confirm=true.",
            None,
        );
    }
    if let Err(e) = d.reset() {
        return err(&req.id, "db_update_failed", format!("{e:#}"), None);
    }
    ok(&req.id, json!({ "view": d.view(&query_param(req)) }))
}

fn handle_import_legacy(state: &mut AppState, req: &Request) -> serde_json::Value {
    let d = match dashboard_mut(state, req) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let Some(blob) = req.params.get("blob").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing blob", None);
    };
    let mode_raw = req
        .params
        .get("mode")
        .and_then(|v| v.as_str())
        .unwrap_or("append");
    let Some(mode) = ImportMode::parse(mode_raw) else {
        return err(
            &req.id,
            "bad_params",
            "mode must be one of: append, replace",
            None,
        );
    };

    let parsed = match legacy::parse_legacy_blob(blob) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("{e:#}"), None),
    };
    let imported = parsed.accepted.len();
    if let Err(e) = d.import(parsed.accepted, mode) {
        return err(&req.id, "db_update_failed", format!("{e:#}"), None);
    }
    info!(imported, rejected = parsed.rejected.len(), mode = mode_raw, "legacy records imported");
    ok(
        &req.id,
        json!({
            "imported": imported,
            "rejected": parsed.rejected,
            "view": d.view(&query_param(req)),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.add" => Some(handle_add(state, req)),
        "students.reset" => Some(handle_reset(state, req)),
        "students.importLegacy" => Some(handle_import_legacy(state, req)),
        _ => None,
    }
}
