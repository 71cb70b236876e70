mod common;

use common::{student, temp_dir, Sidecar};
use serde_json::json;
use std::fs::File;
use std::io::Read;

#[test]
fn empty_dashboard_reports_zero_values() {
    let workspace = temp_dir("studentdash-empty");
    let (mut s, _) = Sidecar::open(&workspace);

    let cards = s.request_ok("1", "dashboard.summary", json!({}));
    assert_eq!(cards["stats"]["count"], 0);
    assert_eq!(
        cards["display"],
        json!({
            "totalStudents": "0",
            "avgMarks": "0.00",
            "avgAttendance": "0.00",
            "passRate": "0%"
        })
    );

    let charts = s.request_ok("2", "dashboard.charts", json!({}));
    assert_eq!(charts["gradeDistribution"], json!({ "A": 0, "B": 0, "C": 0, "D": 0, "F": 0 }));
    assert_eq!(charts["subjectAverages"], json!([]));
    assert_eq!(charts["scatter"], json!([]));
    assert_eq!(charts["topPerformers"], json!([]));
    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn charts_and_cards_follow_the_collection() {
    let workspace = temp_dir("studentdash-charts");
    let (mut s, _) = Sidecar::open(&workspace);
    s.request_ok("1", "students.add", student("Asha", "1", "Math", 80.0, 90.0));
    s.request_ok("2", "students.add", student("Ravi", "2", "Math", 100.0, 80.0));
    s.request_ok("3", "students.add", student("Meera", "3", "Science", 50.0, 70.0));
    s.request_ok("4", "students.add", student("Kiran", "4", "Science", 30.0, 60.0));

    let cards = s.request_ok("5", "dashboard.summary", json!({}));
    assert_eq!(cards["stats"]["passRate"], 75.0);
    assert_eq!(cards["display"]["passRate"], "75.0%");
    assert_eq!(cards["display"]["avgMarks"], "65.00");
    assert_eq!(cards["display"]["avgAttendance"], "75.00");

    let charts = s.request_ok("6", "dashboard.charts", json!({}));
    assert_eq!(charts["subjectAverages"][0]["subject"], "Math");
    assert_eq!(charts["subjectAverages"][0]["avgMarks"], 90.0);
    assert_eq!(charts["subjectAverages"][1]["subject"], "Science");
    assert_eq!(charts["subjectAverages"][1]["avgMarks"], 40.0);
    assert_eq!(charts["gradeDistribution"], json!({ "A": 1, "B": 1, "C": 0, "D": 1, "F": 1 }));
    assert_eq!(charts["scatter"][0], json!({ "x": 90.0, "y": 80.0 }));
    let top: Vec<&str> = charts["topPerformers"]
        .as_array()
        .expect("top")
        .iter()
        .map(|t| t["name"].as_str().expect("name"))
        .collect();
    assert_eq!(top, vec!["Ravi", "Asha", "Meera", "Kiran"]);

    // The table is filtered; cards and charts are not.
    let view = s.request_ok("7", "dashboard.view", json!({ "query": "science" }));
    assert_eq!(view["table"]["rows"].as_array().map(|r| r.len()), Some(2));
    assert_eq!(view["cards"]["stats"]["count"], 4);
    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn settings_update_persists_and_validates() {
    let workspace = temp_dir("studentdash-settings");
    let (mut s, _) = Sidecar::open(&workspace);
    let got = s.request_ok("1", "settings.get", json!({}));
    assert_eq!(got["dashboard"]["topPerformerCount"], 5);
    assert_eq!(got["dashboard"]["resizeDebounceMs"], 300);

    let e = s.request_err(
        "2",
        "settings.update",
        json!({ "patch": { "topPerformerCount": 0 } }),
    );
    assert_eq!(e["code"], "bad_params");

    s.request_ok(
        "3",
        "settings.update",
        json!({ "patch": { "topPerformerCount": 2 } }),
    );
    for (i, marks) in [70.0, 90.0, 80.0].iter().enumerate() {
        s.request_ok(
            &format!("a{}", i),
            "students.add",
            student(&format!("s{}", i), "r", "Math", *marks, 50.0),
        );
    }
    let charts = s.request_ok("4", "dashboard.charts", json!({}));
    assert_eq!(charts["topPerformers"].as_array().map(|t| t.len()), Some(2));
    assert_eq!(charts["topPerformers"][0]["name"], "s1");
    s.close();

    let (mut s, _) = Sidecar::open(&workspace);
    let got = s.request_ok("5", "settings.get", json!({}));
    assert_eq!(got["dashboard"]["topPerformerCount"], 2);
    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unreadable_settings_fall_back_to_defaults() {
    let workspace = temp_dir("studentdash-bad-settings");
    {
        let (s, _) = Sidecar::open(&workspace);
        s.close();
    }
    {
        let conn = rusqlite::Connection::open(workspace.join("studentdash.sqlite3"))
            .expect("open db");
        conn.execute(
            "INSERT INTO workspace_settings(key, value_json) VALUES('dashboard', '{oops')
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
            [],
        )
        .expect("seed bad settings");
    }

    let (mut s, opened) = Sidecar::open(&workspace);
    assert_eq!(opened["recordCount"], 0);
    let got = s.request_ok("1", "settings.get", json!({}));
    assert_eq!(got["dashboard"]["topPerformerCount"], 5);
    assert_eq!(got["dashboard"]["resizeDebounceMs"], 300);
    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn resize_burst_produces_one_redraw() {
    let workspace = temp_dir("studentdash-resize");
    let (mut s, _) = Sidecar::open(&workspace);
    s.request_ok(
        "1",
        "settings.update",
        json!({ "patch": { "resizeDebounceMs": 250 } }),
    );
    s.request_ok("2", "students.add", student("Asha", "1", "Math", 80.0, 90.0));

    for i in 0..5 {
        let r = s.request_ok(&format!("r{}", i), "dashboard.resize", json!({}));
        assert_eq!(r["scheduled"], true);
    }
    let redraw = s.next_event("charts.redraw");
    assert_eq!(redraw["charts"]["scatter"][0], json!({ "x": 90.0, "y": 80.0 }));

    // Well past the quiet period: nothing else queued.
    std::thread::sleep(std::time::Duration::from_millis(600));
    s.request_ok("3", "health", json!({}));
    assert_eq!(s.buffered_events("charts.redraw"), 0);
    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn export_writes_bundle_and_reports_completion() {
    let workspace = temp_dir("studentdash-export");
    let (mut s, _) = Sidecar::open(&workspace);
    s.request_ok("1", "students.add", student("Asha", "1", "Math", 80.0, 90.0));
    s.request_ok("2", "students.add", student("Ravi", "2", "Art", 45.0, 60.0));

    let started = s.request_ok("3", "dashboard.export", json!({ "query": "art" }));
    assert_eq!(started["started"], true);
    let job_id = started["jobId"].as_str().expect("job id").to_string();

    let finished = s.next_event("export.finished");
    assert_eq!(finished["jobId"], job_id.as_str());
    assert_eq!(finished["ok"], true, "export failed: {}", finished);
    let out_path = finished["result"]["outPath"].as_str().expect("path").to_string();
    assert!(out_path.ends_with("student-performance-report.zip"));

    let mut archive = zip::ZipArchive::new(File::open(&out_path).expect("bundle")).expect("zip");
    let mut csv = String::new();
    archive
        .by_name("students.csv")
        .expect("csv entry")
        .read_to_string(&mut csv)
        .expect("read csv");
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("Ravi,2,Art,45,60,D"));

    // Flag cleared: another export starts.
    let again = s.request_ok("4", "dashboard.export", json!({}));
    assert_eq!(again["started"], true);
    let _ = s.next_event("export.finished");
    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn failed_export_is_reported_and_state_is_untouched() {
    let workspace = temp_dir("studentdash-export-fail");
    let (mut s, _) = Sidecar::open(&workspace);
    s.request_ok("1", "students.add", student("Asha", "1", "Math", 80.0, 90.0));

    let blocked = workspace.join("blocked");
    std::fs::create_dir_all(blocked.join("inner")).expect("mkdir");
    let started = s.request_ok(
        "2",
        "dashboard.export",
        json!({ "outPath": blocked.to_string_lossy() }),
    );
    assert_eq!(started["started"], true);

    let finished = s.next_event("export.finished");
    assert_eq!(finished["ok"], false);
    assert_eq!(finished["error"]["code"], "export_failed");
    assert_eq!(finished["error"]["message"], "Could not export report. Try again.");

    let listed = s.request_ok("3", "students.list", json!({}));
    assert_eq!(listed["total"], 1);
    let health = s.request_ok("4", "health", json!({}));
    assert_eq!(health["exportInProgress"], false);
    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn legacy_browser_blob_imports_valid_rows() {
    let workspace = temp_dir("studentdash-legacy");
    let (mut s, _) = Sidecar::open(&workspace);
    s.request_ok("1", "students.add", student("Existing", "0", "Math", 50.0, 50.0));

    let blob = r#"[
        {"sName":"Asha","sRoll":"1","sSubject":"Math","sMarks":92,"sAttendance":88,"grade":"A"},
        {"sName":"Ravi","sRoll":"2","sSubject":"Math","sMarks":120,"sAttendance":70,"grade":"A"}
    ]"#;
    let appended = s.request_ok("2", "students.importLegacy", json!({ "blob": blob }));
    assert_eq!(appended["imported"], 1);
    assert_eq!(appended["rejected"][0]["index"], 1);
    assert_eq!(appended["rejected"][0]["field"], "marks");
    assert_eq!(appended["view"]["table"]["total"], 2);

    let replaced = s.request_ok(
        "3",
        "students.importLegacy",
        json!({ "blob": blob, "mode": "replace" }),
    );
    assert_eq!(replaced["view"]["table"]["total"], 1);
    assert_eq!(replaced["view"]["table"]["rows"][0]["name"], "Asha");

    let e = s.request_err(
        "4",
        "students.importLegacy",
        json!({ "blob": blob, "mode": "merge" }),
    );
    assert_eq!(e["code"], "bad_params");
    let e = s.request_err("5", "students.importLegacy", json!({ "blob": "{}" }));
    assert_eq!(e["code"], "bad_params");
    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}
