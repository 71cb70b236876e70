use crate::dashboard::DashboardView;
use crate::record::StudentRecord;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const REPORT_ENTRY: &str = "report.json";
const TABLE_ENTRY: &str = "students.csv";
pub const REPORT_FORMAT_V1: &str = "studentdash-report-v1";

/// Shown to the user whatever the underlying cause.
pub const EXPORT_FAILED_MESSAGE: &str = "Could not export report. Try again.";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("i/o error while exporting: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode report bundle: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid export path: {0}")]
    Path(String),
}

/// A captured dashboard plus where to put it. Capturing happens on the
/// event loop; encoding happens on the export thread.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub job_id: String,
    pub out_path: PathBuf,
    pub view: DashboardView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub job_id: String,
    pub out_path: String,
    pub report_format: String,
    pub report_sha256: String,
    pub entry_count: usize,
    pub bytes: u64,
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn table_csv(rows: &[StudentRecord]) -> String {
    let mut out = String::from("Name,Roll Number,Subject,Marks,Attendance,Grade\n");
    for r in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_quote(&r.name),
            csv_quote(&r.roll_number),
            csv_quote(&r.subject),
            r.marks,
            r.attendance,
            r.grade()
        ));
    }
    out
}

fn partial_path(out_path: &Path) -> PathBuf {
    let mut p = out_path.as_os_str().to_owned();
    p.push(".partial");
    PathBuf::from(p)
}

pub fn write_report_bundle(job: &ExportJob) -> Result<ExportSummary, ExportError> {
    if job.out_path.file_name().is_none() {
        return Err(ExportError::Path(job.out_path.to_string_lossy().to_string()));
    }
    if let Some(parent) = job.out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let report = serde_json::to_vec_pretty(&job.view)?;
    let report_sha256 = format!("{:x}", Sha256::digest(&report));
    let manifest = json!({
        "format": REPORT_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "reportId": job.job_id,
        "reportSha256": report_sha256,
        "query": job.view.table.query,
        "rowCount": job.view.table.rows.len(),
    });

    let tmp = partial_path(&job.out_path);
    let written = write_zip(&tmp, &manifest, &report, &table_csv(&job.view.table.rows));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = std::fs::rename(&tmp, &job.out_path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    let bytes = std::fs::metadata(&job.out_path)?.len();

    Ok(ExportSummary {
        job_id: job.job_id.clone(),
        out_path: job.out_path.to_string_lossy().to_string(),
        report_format: REPORT_FORMAT_V1.to_string(),
        report_sha256,
        entry_count: 3,
        bytes,
    })
}

fn write_zip(
    path: &Path,
    manifest: &serde_json::Value,
    report: &[u8],
    table_csv: &str,
) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)?;
    zip.write_all(serde_json::to_string_pretty(manifest)?.as_bytes())?;
    zip.start_file(REPORT_ENTRY, opts)?;
    zip.write_all(report)?;
    zip.start_file(TABLE_ENTRY, opts)?;
    zip.write_all(table_csv.as_bytes())?;

    let mut file = zip.finish()?;
    file.flush()?;
    Ok(())
}

/// Runs the encode step off the event loop and hands the outcome to
/// `on_done` on the export thread.
pub fn spawn_export<F>(job: ExportJob, on_done: F) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce(String, Result<ExportSummary, ExportError>) + Send + 'static,
{
    thread::Builder::new()
        .name("report-export".to_string())
        .spawn(move || {
            let result = write_report_bundle(&job);
            on_done(job.job_id, result);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::Dashboard;
    use crate::settings::DashboardSettings;
    use crate::store::tests::{valid, MemoryBlobStore};
    use crate::store::RecordStore;
    use std::io::Read;
    use std::sync::mpsc;
    use zip::ZipArchive;

    fn view() -> DashboardView {
        let (store, _) = RecordStore::open(MemoryBlobStore::default()).expect("open");
        let mut d = Dashboard::new(store, DashboardSettings::default());
        d.import(
            vec![
                valid("Asha, K", "Math", 92.0, 88.0),
                valid("Ravi", "Science", 55.5, 61.0),
            ],
            crate::dashboard::ImportMode::Append,
        )
        .expect("import");
        d.view("")
    }

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn bundle_contains_manifest_report_and_table() {
        let dir = temp_dir("studentdash-export");
        let job = ExportJob {
            job_id: "job-1".to_string(),
            out_path: dir.join("nested").join("report.zip"),
            view: view(),
        };
        let summary = write_report_bundle(&job).expect("export");
        assert_eq!(summary.entry_count, 3);
        assert!(!partial_path(&job.out_path).exists());

        let mut archive = ZipArchive::new(File::open(&job.out_path).expect("open")).expect("zip");
        let mut manifest = String::new();
        archive
            .by_name(MANIFEST_ENTRY)
            .expect("manifest")
            .read_to_string(&mut manifest)
            .expect("read");
        let manifest: serde_json::Value = serde_json::from_str(&manifest).expect("json");
        assert_eq!(manifest["format"], REPORT_FORMAT_V1);
        assert_eq!(manifest["reportSha256"], summary.report_sha256.as_str());
        assert_eq!(manifest["rowCount"], 2);

        let mut report = Vec::new();
        archive
            .by_name(REPORT_ENTRY)
            .expect("report")
            .read_to_end(&mut report)
            .expect("read");
        assert_eq!(format!("{:x}", Sha256::digest(&report)), summary.report_sha256);

        let mut csv = String::new();
        archive
            .by_name(TABLE_ENTRY)
            .expect("csv")
            .read_to_string(&mut csv)
            .expect("read");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "\"Asha, K\",\"R-Asha, K\",Math,92,88,A");
        assert_eq!(lines[2], "Ravi,R-Ravi,Science,55.5,61,D");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn unwritable_target_reports_error() {
        let dir = temp_dir("studentdash-export-fail");
        // A directory where the output file should go.
        let out_path = dir.join("taken");
        std::fs::create_dir_all(out_path.join("inner")).expect("mkdir");
        let job = ExportJob {
            job_id: "job-2".to_string(),
            out_path,
            view: view(),
        };
        assert!(write_report_bundle(&job).is_err());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn spawned_export_reports_back() {
        let dir = temp_dir("studentdash-export-thread");
        let (tx, rx) = mpsc::channel();
        let job = ExportJob {
            job_id: "job-3".to_string(),
            out_path: dir.join("r.zip"),
            view: view(),
        };
        let handle = spawn_export(job, move |id, result| {
            let _ = tx.send((id, result.is_ok()));
        })
        .expect("spawn");
        handle.join().expect("join");
        assert_eq!(rx.recv().expect("result"), ("job-3".to_string(), true));
        let _ = std::fs::remove_dir_all(dir);
    }
}
