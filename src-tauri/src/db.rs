use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::storage::{NoteBackend, SettingsBackend};
use crate::types::{parse_iso8601, to_iso8601, Note};

/// File name of the store inside the app data directory.
pub const DEFAULT_DB_FILE: &str = "weekly-updates.sqlite";

pub fn default_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DEFAULT_DB_FILE)
}

/// SQLite-backed store for both the note list and the settings keys.
///
/// The connection sits behind a `Mutex` so the backend is `Send` and can be
/// owned by the shared app state; every call is short and synchronous.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS updates (
                 position   INTEGER PRIMARY KEY,
                 id         INTEGER NOT NULL,
                 content    TEXT NOT NULL,
                 created_at TEXT NOT NULL,
                 updated_at TEXT
             );
             CREATE TABLE IF NOT EXISTS settings (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("sqlite connection lock poisoned: {e}"))
    }
}

impl NoteBackend for SqliteBackend {
    /// Rows come back in stored position order; that order is the list order.
    fn load(&self) -> Result<Vec<Note>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, content, created_at, updated_at
             FROM updates
             ORDER BY position ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut notes = Vec::new();
        for row in rows {
            let (id, content, created_at, updated_at) = row?;
            let created_at = match parse_iso8601(&created_at) {
                Ok(ts) => ts,
                Err(e) => {
                    // Not carried into memory, so the next full save drops it for good.
                    tracing::error!(
                        id,
                        raw = %created_at,
                        "Discarding update with unreadable createdAt: {e}"
                    );
                    continue;
                }
            };
            let updated_at = updated_at.and_then(|raw| {
                parse_iso8601(&raw)
                    .map_err(|e| tracing::warn!("Dropping unreadable updatedAt: {e}"))
                    .ok()
            });
            notes.push(Note {
                id: u64::try_from(id).unwrap_or_default(),
                content,
                created_at,
                updated_at,
            });
        }
        Ok(notes)
    }

    /// Delete-all plus insert inside one transaction. If anything fails the
    /// transaction is dropped and rolled back, so the old list survives.
    fn save_all(&self, notes: &[Note]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM updates", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO updates (position, id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, note) in notes.iter().enumerate() {
                insert.execute(params![
                    i64::try_from(position)?,
                    i64::try_from(note.id)?,
                    note.content,
                    to_iso8601(&note.created_at),
                    note.updated_at.as_ref().map(to_iso8601),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl SettingsBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
