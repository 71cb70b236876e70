use crate::calc::DEFAULT_TOP_N;
use crate::db;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

pub const SETTINGS_KEY: &str = "dashboard";
pub const DEFAULT_EXPORT_FILE_NAME: &str = "student-performance-report.zip";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSettings {
    pub top_performer_count: usize,
    pub resize_debounce_ms: u64,
    pub export_file_name: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            top_performer_count: DEFAULT_TOP_N,
            resize_debounce_ms: 300,
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
        }
    }
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_file_name(v: &Value, key: &str) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.is_empty() || s.chars().count() > 120 {
        return Err(format!("{} length must be 1..=120", key));
    }
    if s.contains('/') || s.contains('\\') || s == "." || s == ".." {
        return Err(format!("{} must be a plain file name", key));
    }
    Ok(s.to_string())
}

impl DashboardSettings {
    pub fn resize_quiet(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Validates every field of `patch` before applying any of them.
    pub fn merge_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = self.clone();
        for (k, v) in patch {
            match k.as_str() {
                "topPerformerCount" => {
                    next.top_performer_count = parse_i64_range(v, k, 1, 20)? as usize;
                }
                "resizeDebounceMs" => {
                    next.resize_debounce_ms = parse_i64_range(v, k, 50, 5000)? as u64;
                }
                "exportFileName" => {
                    next.export_file_name = parse_file_name(v, k)?;
                }
                _ => return Err(format!("unknown dashboard setting: {}", k)),
            }
        }
        *self = next;
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Stored values are applied field by field; a bad historical value falls
/// back to its default instead of blocking the workspace.
pub fn load(conn: &Connection) -> anyhow::Result<DashboardSettings> {
    let mut current = DashboardSettings::default();
    if let Some(saved) = db::settings_get_json(conn, SETTINGS_KEY)? {
        if let Some(saved_obj) = saved.as_object() {
            for (k, v) in saved_obj {
                let mut one = Map::new();
                one.insert(k.clone(), v.clone());
                let _ = current.merge_patch(&one);
            }
        }
    }
    Ok(current)
}

pub fn save(conn: &Connection, settings: &DashboardSettings) -> anyhow::Result<()> {
    db::settings_set_json(conn, SETTINGS_KEY, &settings.to_json())
}
