use crate::store::BlobStore;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "studentdash.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS workspace_settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    // Workspaces created before updated_at was tracked.
    if !table_has_column(&conn, "kv_store", "updated_at")? {
        conn.execute("ALTER TABLE kv_store ADD COLUMN updated_at TEXT", [])?;
    }

    Ok(conn)
}

pub fn kv_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let v = conn
        .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |r| {
            r.get::<_, String>(0)
        })
        .optional()?;
    Ok(v)
}

pub fn kv_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO kv_store(key, value, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        (key, value, now),
    )?;
    Ok(())
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw = conn
        .query_row(
            "SELECT value_json FROM workspace_settings WHERE key = ?",
            [key],
            |r| r.get::<_, String>(0),
        )
        .optional()?;
    match raw {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO workspace_settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The workspace database seen as a string key/value blob store.
pub struct SqliteBlobStore {
    conn: Connection,
}

impl SqliteBlobStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        kv_get(&self.conn, key)
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        kv_set(&self.conn, key, value)
    }
}
