//! Import of the blob written by the browser-only dashboard
//! (localStorage key `students`, fields `sName`, `sRoll`, `sSubject`,
//! `sMarks`, `sAttendance`, `grade`).

use crate::record::{RecordDraft, ValidatedRecord};
use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedEntry {
    pub index: usize,
    pub field: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LegacyImport {
    pub accepted: Vec<ValidatedRecord>,
    pub rejected: Vec<RejectedEntry>,
}

/// Every entry goes through the same validation as a form submission.
/// Entries that fail are reported, not fatal; a blob that is not a JSON
/// array is.
pub fn parse_legacy_blob(raw: &str) -> anyhow::Result<LegacyImport> {
    let parsed: Value = serde_json::from_str(raw).context("legacy blob is not valid JSON")?;
    let Value::Array(entries) = parsed else {
        return Err(anyhow!("legacy blob must be a JSON array of records"));
    };

    let mut accepted = Vec::with_capacity(entries.len());
    let mut rejected = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        if !entry.is_object() {
            rejected.push(RejectedEntry {
                index,
                field: None,
                message: "entry must be an object".to_string(),
            });
            continue;
        }
        match RecordDraft::from_json(entry).validate() {
            Ok(rec) => accepted.push(rec),
            Err(e) => {
                warn!(index, error = %e, "legacy entry rejected");
                rejected.push(RejectedEntry {
                    index,
                    field: Some(e.field().as_str().to_string()),
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(LegacyImport { accepted, rejected })
}
