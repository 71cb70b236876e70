#![allow(dead_code)]

use serde_json::json;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Sidecar {
    child: Child,
    stdin: Option<ChildStdin>,
    reader: BufReader<ChildStdout>,
    events: VecDeque<serde_json::Value>,
}

impl Sidecar {
    pub fn spawn() -> Self {
        let exe = env!("CARGO_BIN_EXE_studentdashd");
        let mut child = Command::new(exe)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn studentdashd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin: Some(stdin),
            reader: BufReader::new(stdout),
            events: VecDeque::new(),
        }
    }

    pub fn open(workspace: &PathBuf) -> (Self, serde_json::Value) {
        let mut s = Self::spawn();
        let opened = s.request_ok(
            "open",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        (s, opened)
    }

    pub fn send_raw(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin open");
        writeln!(stdin, "{}", line).expect("write request");
        stdin.flush().expect("flush request");
    }

    pub fn read_value(&mut self) -> serde_json::Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read line");
        assert!(!line.trim().is_empty(), "sidecar closed stdout");
        serde_json::from_str(line.trim()).expect("parse response json")
    }

    /// Full response envelope; event lines seen on the way are kept.
    pub fn request(
        &mut self,
        id: &str,
        method: &str,
        params: serde_json::Value,
    ) -> serde_json::Value {
        let payload = json!({ "id": id, "method": method, "params": params });
        self.send_raw(&payload.to_string());
        loop {
            let value = self.read_value();
            if value.get("event").is_some() {
                self.events.push_back(value);
                continue;
            }
            assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
            return value;
        }
    }

    pub fn request_ok(
        &mut self,
        id: &str,
        method: &str,
        params: serde_json::Value,
    ) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    pub fn request_err(
        &mut self,
        id: &str,
        method: &str,
        params: serde_json::Value,
    ) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value.get("error").cloned().expect("error object")
    }

    /// Blocks until an event with this name arrives.
    pub fn next_event(&mut self, name: &str) -> serde_json::Value {
        if let Some(pos) = self
            .events
            .iter()
            .position(|e| e.get("event").and_then(|v| v.as_str()) == Some(name))
        {
            return self.events.remove(pos).expect("buffered event");
        }
        loop {
            let value = self.read_value();
            if value.get("event").and_then(|v| v.as_str()) == Some(name) {
                return value;
            }
            self.events.push_back(value);
        }
    }

    pub fn buffered_events(&self, name: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.get("event").and_then(|v| v.as_str()) == Some(name))
            .count()
    }

    pub fn close(mut self) {
        drop(self.stdin.take());
        let _ = self.child.wait();
    }
}

pub fn student(name: &str, roll: &str, subject: &str, marks: f64, attendance: f64) -> serde_json::Value {
    json!({
        "name": name,
        "rollNumber": roll,
        "subject": subject,
        "marks": marks,
        "attendance": attendance,
    })
}
