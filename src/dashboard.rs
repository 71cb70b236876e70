use crate::calc::{
    self, GradeDistribution, ScatterPoint, SubjectAverage, SummaryCards, SummaryStats, TopPerformer,
};
use crate::debounce::Debouncer;
use crate::filter;
use crate::record::{RecordDraft, StudentRecord, ValidatedRecord, ValidationError};
use crate::settings::DashboardSettings;
use crate::store::{BlobStore, RecordStore};
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AddError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("failed to save record: {0:#}")]
    Persist(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Append,
    Replace,
}

impl ImportMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "append" => Some(Self::Append),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub query: String,
    pub rows: Vec<StudentRecord>,
    pub total: usize,
    /// Drives the "no records" banner.
    pub empty: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsView {
    pub stats: SummaryStats,
    pub display: SummaryCards,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub subject_averages: Vec<SubjectAverage>,
    pub grade_distribution: GradeDistribution,
    pub scatter: Vec<ScatterPoint>,
    pub top_performers: Vec<TopPerformer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub revision: u64,
    pub table: TableView,
    pub cards: CardsView,
    pub charts: ChartSeries,
}

/// Everything the renderer needs, plus the transient UI state (resize
/// debounce, export-in-progress) that must not live in the record store.
pub struct Dashboard<B: BlobStore> {
    store: RecordStore<B>,
    settings: DashboardSettings,
    resize: Debouncer,
    export_job: Option<String>,
}

impl<B: BlobStore> Dashboard<B> {
    pub fn new(store: RecordStore<B>, settings: DashboardSettings) -> Self {
        let resize = Debouncer::new(settings.resize_quiet());
        Self {
            store,
            settings,
            resize,
            export_job: None,
        }
    }

    pub fn store(&self) -> &RecordStore<B> {
        &self.store
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn apply_settings(&mut self, settings: DashboardSettings) {
        self.resize.set_quiet(settings.resize_quiet());
        self.settings = settings;
    }

    pub fn add(&mut self, draft: &RecordDraft) -> Result<(), AddError> {
        let candidate = draft.validate()?;
        self.store.append(candidate).map_err(AddError::Persist)?;
        info!(count = self.store.len(), "student record added");
        Ok(())
    }

    pub fn reset(&mut self) -> anyhow::Result<()> {
        self.store.clear()
    }

    /// Replace clears and appends under one write, so a failure keeps the
    /// old collection.
    pub fn import(
        &mut self,
        accepted: Vec<ValidatedRecord>,
        mode: ImportMode,
    ) -> anyhow::Result<()> {
        match mode {
            ImportMode::Append => self.store.append_many(accepted),
            ImportMode::Replace => self.store.replace_all(accepted),
        }
    }

    pub fn table(&self, query: &str) -> TableView {
        let rows: Vec<StudentRecord> = filter::filter(self.store.records(), query)
            .into_iter()
            .cloned()
            .collect();
        TableView {
            query: query.to_string(),
            total: self.store.len(),
            empty: rows.is_empty(),
            rows,
        }
    }

    pub fn cards(&self) -> CardsView {
        let stats = calc::summary_stats(self.store.records());
        CardsView {
            display: stats.cards(),
            stats,
        }
    }

    pub fn charts(&self) -> ChartSeries {
        let records = self.store.records();
        ChartSeries {
            subject_averages: calc::subject_averages(records),
            grade_distribution: calc::grade_distribution(records),
            scatter: calc::scatter_series(records),
            top_performers: calc::top_performers(records, self.settings.top_performer_count),
        }
    }

    /// The table follows the query; cards and charts cover the whole
    /// collection.
    pub fn view(&self, query: &str) -> DashboardView {
        DashboardView {
            revision: self.store.revision(),
            table: self.table(query),
            cards: self.cards(),
            charts: self.charts(),
        }
    }

    pub fn on_resize(&mut self, now: Instant) {
        self.resize.trigger(now);
    }

    pub fn next_wake(&self, now: Instant) -> Option<Duration> {
        self.resize.remaining(now)
    }

    /// Fresh chart series once a resize burst has settled.
    pub fn poll_redraw(&mut self, now: Instant) -> Option<ChartSeries> {
        if self.resize.poll(now) {
            debug!("resize settled, redrawing charts");
            Some(self.charts())
        } else {
            None
        }
    }

    /// Returns a job id, or `None` while another export is running.
    pub fn begin_export(&mut self) -> Option<String> {
        if self.export_job.is_some() {
            return None;
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.export_job = Some(id.clone());
        Some(id)
    }

    pub fn finish_export(&mut self, job_id: &str) {
        if self.export_job.as_deref() == Some(job_id) {
            self.export_job = None;
        }
    }

    pub fn export_in_progress(&self) -> bool {
        self.export_job.is_some()
    }
}
