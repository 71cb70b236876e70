use crate::record::{StudentRecord, ValidatedRecord};
use anyhow::Context;
use thiserror::Error;
use tracing::{info, warn};

pub const STUDENTS_KEY: &str = "students";

/// String-keyed, string-valued persistence. No transactions, no expiry.
pub trait BlobStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
#[error("stored student records are unreadable: {source}")]
pub struct StorageReadError {
    /// The blob exactly as it was read.
    pub raw: String,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Unreadable(#[from] StorageReadError),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub fn decode_collection(raw: &str) -> Result<Vec<StudentRecord>, StorageReadError> {
    serde_json::from_str(raw).map_err(|source| StorageReadError {
        raw: raw.to_string(),
        source,
    })
}

pub fn encode_collection(records: &[StudentRecord]) -> anyhow::Result<String> {
    serde_json::to_string(records).context("failed to serialize student records")
}

/// Reads the collection without any recovery; an absent blob is an empty
/// collection.
pub fn load_collection<B: BlobStore>(blob: &B) -> Result<Vec<StudentRecord>, LoadError> {
    let Some(raw) = blob.get(STUDENTS_KEY)? else {
        return Ok(Vec::new());
    };
    Ok(decode_collection(&raw)?)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Set when an unreadable blob was moved aside.
    pub quarantined_key: Option<String>,
    pub warnings: Vec<String>,
}

/// Owns the record collection and keeps the blob store in step with it.
pub struct RecordStore<B: BlobStore> {
    blob: B,
    records: Vec<StudentRecord>,
    revision: u64,
}

impl<B: BlobStore> RecordStore<B> {
    /// Loads the stored collection. An unreadable blob is copied to a
    /// `students.corrupt.<timestamp>` key and the store starts empty.
    pub fn open(mut blob: B) -> anyhow::Result<(Self, LoadReport)> {
        let mut report = LoadReport::default();
        let records = match load_collection(&blob) {
            Ok(records) => records,
            Err(LoadError::Backend(e)) => return Err(e),
            Err(LoadError::Unreadable(e)) => {
                let key = format!(
                    "{}.corrupt.{}",
                    STUDENTS_KEY,
                    chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
                );
                blob.set(&key, &e.raw)
                    .with_context(|| format!("failed to quarantine unreadable blob to {}", key))?;
                blob.set(STUDENTS_KEY, "[]")
                    .context("failed to reset student records after quarantine")?;
                warn!(error = %e, quarantine = %key, "stored records unreadable, starting empty");
                report
                    .warnings
                    .push(format!("{}; original data kept under {}", e, key));
                report.quarantined_key = Some(key);
                Vec::new()
            }
        };
        report.loaded = records.len();
        info!(count = records.len(), "student records loaded");
        Ok((
            Self {
                blob,
                records,
                revision: 0,
            },
            report,
        ))
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Bumped after every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn blob(&self) -> &B {
        &self.blob
    }

    pub fn append(&mut self, candidate: ValidatedRecord) -> anyhow::Result<()> {
        self.records.push(candidate.into_record());
        if let Err(e) = self.persist() {
            self.records.pop();
            return Err(e);
        }
        self.revision += 1;
        Ok(())
    }

    /// Appends several records with a single write; all or nothing.
    pub fn append_many(&mut self, candidates: Vec<ValidatedRecord>) -> anyhow::Result<()> {
        let before = self.records.len();
        self.records
            .extend(candidates.into_iter().map(ValidatedRecord::into_record));
        if let Err(e) = self.persist() {
            self.records.truncate(before);
            return Err(e);
        }
        self.revision += 1;
        Ok(())
    }

    pub fn replace_all(&mut self, candidates: Vec<ValidatedRecord>) -> anyhow::Result<()> {
        let next = candidates
            .into_iter()
            .map(ValidatedRecord::into_record)
            .collect();
        let previous = std::mem::replace(&mut self.records, next);
        if let Err(e) = self.persist() {
            self.records = previous;
            return Err(e);
        }
        self.revision += 1;
        Ok(())
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        let previous = std::mem::take(&mut self.records);
        if let Err(e) = self.persist() {
            self.records = previous;
            return Err(e);
        }
        self.revision += 1;
        info!(removed = previous.len(), "student records cleared");
        Ok(())
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        let encoded = encode_collection(&self.records)?;
        self.blob
            .set(STUDENTS_KEY, &encoded)
            .context("failed to persist student records")
    }
}
