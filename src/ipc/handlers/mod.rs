pub mod core;
pub mod dashboard;
pub mod settings;
pub mod students;

use crate::dashboard::Dashboard;
use crate::db::SqliteBlobStore;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub(crate) fn dashboard_mut<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Dashboard<SqliteBlobStore>, serde_json::Value> {
    state
        .dashboard
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub(crate) fn query_param(req: &Request) -> String {
    req.params
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}
