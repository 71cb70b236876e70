use super::dashboard_mut;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::settings;
use serde_json::json;

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard_mut(state, req) {
        Ok(d) => ok(&req.id, json!({ "dashboard": d.settings().to_json() })),
        Err(e) => e,
    }
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let d = match dashboard_mut(state, req) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut next = d.settings().clone();
    if let Err(msg) = next.merge_patch(patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = settings::save(d.store().blob().conn(), &next) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    d.apply_settings(next);
    ok(&req.id, json!({ "dashboard": d.settings().to_json() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
