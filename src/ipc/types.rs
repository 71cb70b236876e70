use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crate::dashboard::Dashboard;
use crate::db::SqliteBlobStore;
use crate::export::{ExportError, ExportSummary};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the event loop waits on.
#[derive(Debug)]
pub enum Event {
    Line(String),
    InputClosed,
    ExportFinished {
        job_id: String,
        result: Result<ExportSummary, ExportError>,
    },
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub dashboard: Option<Dashboard<SqliteBlobStore>>,
    pub events: Sender<Event>,
}

impl AppState {
    pub fn new(events: Sender<Event>) -> Self {
        Self {
            workspace: None,
            dashboard: None,
            events,
        }
    }

    pub fn next_wake(&self, now: Instant) -> Option<Duration> {
        self.dashboard.as_ref().and_then(|d| d.next_wake(now))
    }

    pub fn export_in_progress(&self) -> bool {
        self.dashboard
            .as_ref()
            .map(|d| d.export_in_progress())
            .unwrap_or(false)
    }
}
