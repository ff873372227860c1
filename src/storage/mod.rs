use crate::error::{ConfabError, Result};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;

pub mod types;
pub use types::{MessageRecord, Role, Session};

/// Durable store for sessions and messages
///
/// Holds only the database path; a connection is opened per operation and
/// every write commits before the call returns, so a crash can never leave a
/// half-written turn behind.
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open the store at its default location
    ///
    /// The path resolves to the user's data directory unless overridden via
    /// the `CONFAB_HISTORY_DB` environment variable. The schema is created on
    /// first use; reopening an existing database never alters its data.
    pub fn open() -> Result<Self> {
        // Allow override of the history DB path via environment variable.
        // This makes it easy to point the binary at a test DB or alternate
        // file without changing the user's application data dir.
        if let Ok(override_path) = std::env::var("CONFAB_HISTORY_DB") {
            return Self::open_at(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "confab-cli", "confab")
            .ok_or_else(|| ConfabError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| ConfabError::Storage(e.to_string()))?;

        Self::open_at(data_dir.join("history.db"))
    }

    /// Open the store at a specific database path
    ///
    /// This is primarily useful for tests where the default application data
    /// directory is not desirable (for example, using a temporary directory).
    ///
    /// # Examples
    ///
    /// ```
    /// use confab::storage::SqliteStore;
    ///
    /// let store = SqliteStore::open_at("/tmp/confab_doc_test.db").unwrap();
    /// ```
    pub fn open_at<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure parent directory exists so opening the DB file succeeds.
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ConfabError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.ensure_schema()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ConfabError::Storage(e.to_string()).into())
    }

    /// Initialize the database schema
    ///
    /// Safe to call on every startup; existing tables and rows are left
    /// untouched.
    fn ensure_schema(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                model TEXT NOT NULL,
                provider TEXT NOT NULL,
                updated TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create sessions table")
        .map_err(|e| ConfabError::Storage(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sid INTEGER NOT NULL REFERENCES sessions(id),
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create messages table")
        .map_err(|e| ConfabError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Create a new session and return its assigned id
    pub fn insert_session(&self, title: &str, model: &str, provider: &str) -> Result<i64> {
        let conn = self.connect()?;
        let now = format_timestamp(Utc::now());

        conn.execute(
            "INSERT INTO sessions (title, model, provider, updated) VALUES (?, ?, ?, ?)",
            params![title, model, provider, now],
        )
        .context("Failed to insert session")
        .map_err(|e| ConfabError::Storage(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    /// Set a session's title
    ///
    /// Fails with `SessionNotFound` when the id does not exist.
    pub fn update_session_title(&self, id: i64, title: &str) -> Result<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE sessions SET title = ? WHERE id = ?",
                params![title, id],
            )
            .context("Failed to update session title")
            .map_err(|e| ConfabError::Storage(e.to_string()))?;

        if changed == 0 {
            return Err(ConfabError::SessionNotFound(id).into());
        }
        Ok(())
    }

    /// Append one message row to a session
    ///
    /// Assigns the write timestamp, clamped against the session's newest
    /// message so transcript order stays non-decreasing even across clock
    /// adjustments, and refreshes the session's `updated` column in the same
    /// transaction.
    pub fn insert_message(&self, sid: i64, role: Role, content: &str) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ConfabError::Storage(e.to_string()))?;

        let exists: Option<i64> = tx
            .query_row("SELECT id FROM sessions WHERE id = ?", params![sid], |row| {
                row.get(0)
            })
            .optional()
            .context("Failed to look up session")
            .map_err(|e| ConfabError::Storage(e.to_string()))?;
        if exists.is_none() {
            return Err(ConfabError::SessionNotFound(sid).into());
        }

        let last: Option<String> = tx
            .query_row(
                "SELECT timestamp FROM messages WHERE sid = ?
                 ORDER BY timestamp DESC, id DESC LIMIT 1",
                params![sid],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read last message timestamp")
            .map_err(|e| ConfabError::Storage(e.to_string()))?;

        let now = format_timestamp(Utc::now());
        // Fixed-width RFC 3339 sorts lexicographically, so a string compare
        // is a time compare.
        let timestamp = match last {
            Some(prev) if prev > now => prev,
            _ => now,
        };

        tx.execute(
            "INSERT INTO messages (sid, role, content, timestamp) VALUES (?, ?, ?, ?)",
            params![sid, role.as_str(), content, timestamp],
        )
        .context("Failed to insert message")
        .map_err(|e| ConfabError::Storage(e.to_string()))?;

        tx.execute(
            "UPDATE sessions SET updated = ? WHERE id = ?",
            params![timestamp, sid],
        )
        .context("Failed to refresh session timestamp")
        .map_err(|e| ConfabError::Storage(e.to_string()))?;

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| ConfabError::Storage(e.to_string()))?;

        Ok(())
    }

    /// List all sessions, oldest activity first
    ///
    /// Ordered ascending by `updated`, with insertion order breaking ties.
    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, model, provider, updated
                 FROM sessions ORDER BY updated ASC, id ASC",
            )
            .context("Failed to prepare statement")
            .map_err(|e| ConfabError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map([], row_to_session)
            .context("Failed to query sessions")
            .map_err(|e| ConfabError::Storage(e.to_string()))?;

        let mut sessions = Vec::new();
        for session in rows {
            sessions.push(session.map_err(|e| ConfabError::Storage(e.to_string()))?);
        }
        Ok(sessions)
    }

    /// List a session's messages in conversation order
    pub fn list_messages(&self, sid: i64) -> Result<Vec<MessageRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, sid, role, content, timestamp
                 FROM messages WHERE sid = ? ORDER BY timestamp ASC, id ASC",
            )
            .context("Failed to prepare statement")
            .map_err(|e| ConfabError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![sid], row_to_message)
            .context("Failed to query messages")
            .map_err(|e| ConfabError::Storage(e.to_string()))?;

        let mut messages = Vec::new();
        for message in rows {
            messages.push(message.map_err(|e| ConfabError::Storage(e.to_string()))?);
        }
        Ok(messages)
    }

    /// Fetch one session by id
    pub fn get_session(&self, id: i64) -> Result<Option<Session>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT id, title, model, provider, updated FROM sessions WHERE id = ?",
            params![id],
            row_to_session,
        )
        .optional()
        .context("Failed to query session")
        .map_err(|e| ConfabError::Storage(e.to_string()).into())
    }

    /// Check whether a session id exists
    pub fn session_exists(&self, id: i64) -> Result<bool> {
        Ok(self.get_session(id)?.is_some())
    }
}

/// Fixed-width RFC 3339 with microseconds; lexicographic order equals time
/// order, which the timestamp clamp in `insert_message` relies on.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let updated_raw: String = row.get(4)?;
    Ok(Session {
        id: row.get(0)?,
        title: row.get(1)?,
        model: row.get(2)?,
        provider: row.get(3)?,
        updated: parse_timestamp(&updated_raw),
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    let role_raw: String = row.get(2)?;
    let role = Role::parse_str(&role_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })?;
    let timestamp_raw: String = row.get(4)?;
    Ok(MessageRecord {
        id: row.get(0)?,
        sid: row.get(1)?,
        role,
        content: row.get(3)?,
        timestamp: parse_timestamp(&timestamp_raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    /// Helper: create a temporary store backed by a temp directory.
    ///
    /// Returns both the `SqliteStore` and the `TempDir` so the caller keeps
    /// ownership of the directory (preventing it from being removed).
    fn create_test_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("history.db");
        let store = SqliteStore::open_at(db_path).expect("failed to create store");
        (store, dir)
    }

    #[test]
    fn test_open_creates_tables() {
        let (store, _dir) = create_test_store();
        let conn = Connection::open(&store.db_path).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master
                 WHERE type='table' AND name IN ('sessions', 'messages')",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_reopen_preserves_existing_data() {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("history.db");

        let sid = {
            let store = SqliteStore::open_at(&db_path).expect("first open");
            let sid = store.insert_session("Kept", "gpt-3.5-turbo", "openai").unwrap();
            store.insert_message(sid, Role::User, "still here?").unwrap();
            sid
        };

        // Second open runs ensure_schema again; nothing may be lost.
        let store = SqliteStore::open_at(&db_path).expect("second open");
        let session = store.get_session(sid).unwrap().expect("session survives");
        assert_eq!(session.title, "Kept");
        assert_eq!(store.list_messages(sid).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_session_assigns_increasing_ids() {
        let (store, _dir) = create_test_store();
        let a = store.insert_session("", "gpt-3.5-turbo", "openai").unwrap();
        let b = store.insert_session("", "gpt-3.5-turbo", "openai").unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_update_session_title() {
        let (store, _dir) = create_test_store();
        let sid = store.insert_session("", "gpt-3.5-turbo", "openai").unwrap();
        store.update_session_title(sid, "Explain recursion").unwrap();

        let session = store.get_session(sid).unwrap().unwrap();
        assert_eq!(session.title, "Explain recursion");
    }

    #[test]
    fn test_update_session_title_unknown_id() {
        let (store, _dir) = create_test_store();
        let err = store.update_session_title(999, "nope").unwrap_err();
        let err = err.downcast::<ConfabError>().expect("typed error");
        assert!(matches!(err, ConfabError::SessionNotFound(999)));
    }

    #[test]
    fn test_insert_message_unknown_session() {
        let (store, _dir) = create_test_store();
        let err = store.insert_message(123, Role::User, "hello").unwrap_err();
        let err = err.downcast::<ConfabError>().expect("typed error");
        assert!(matches!(err, ConfabError::SessionNotFound(123)));
    }

    #[test]
    fn test_list_messages_returns_append_order() {
        let (store, _dir) = create_test_store();
        let sid = store.insert_session("", "gpt-3.5-turbo", "openai").unwrap();

        let contents: Vec<String> = (0..20).map(|i| format!("message {}", i)).collect();
        for content in &contents {
            store.insert_message(sid, Role::User, content).unwrap();
        }

        let loaded = store.list_messages(sid).unwrap();
        assert_eq!(loaded.len(), contents.len());
        for (record, content) in loaded.iter().zip(&contents) {
            assert_eq!(&record.content, content);
        }
        // Established order never changes on reload.
        let reloaded = store.list_messages(sid).unwrap();
        for (a, b) in loaded.iter().zip(&reloaded) {
            assert_eq!(a.id, b.id);
        }
    }

    #[test]
    fn test_list_messages_timestamps_non_decreasing() {
        let (store, _dir) = create_test_store();
        let sid = store.insert_session("", "gpt-3.5-turbo", "openai").unwrap();
        for i in 0..10 {
            store
                .insert_message(sid, Role::User, &format!("m{}", i))
                .unwrap();
        }

        let loaded = store.list_messages(sid).unwrap();
        for pair in loaded.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn test_list_messages_scoped_to_session() {
        let (store, _dir) = create_test_store();
        let a = store.insert_session("", "gpt-3.5-turbo", "openai").unwrap();
        let b = store.insert_session("", "gpt-3.5-turbo", "openai").unwrap();
        store.insert_message(a, Role::User, "for a").unwrap();
        store.insert_message(b, Role::User, "for b").unwrap();

        let messages = store.list_messages(a).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "for a");
        assert_eq!(messages[0].sid, a);
    }

    #[test]
    fn test_list_sessions_ordered_by_updated_ascending() {
        let (store, _dir) = create_test_store();
        let first = store.insert_session("first", "gpt-3.5-turbo", "openai").unwrap();
        let second = store.insert_session("second", "gpt-3.5-turbo", "openai").unwrap();

        // Appending to the first session makes it the most recently updated,
        // so it moves to the end of the ascending listing.
        store.insert_message(first, Role::User, "bump").unwrap();

        let sessions = store.list_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, second);
        assert_eq!(sessions[1].id, first);
    }

    #[test]
    fn test_list_sessions_ties_keep_insertion_order() {
        let (store, _dir) = create_test_store();
        // Freeze both rows to the same updated value so only the id breaks
        // the tie.
        let a = store.insert_session("a", "gpt-3.5-turbo", "openai").unwrap();
        let b = store.insert_session("b", "gpt-3.5-turbo", "openai").unwrap();
        let conn = Connection::open(&store.db_path).unwrap();
        conn.execute("UPDATE sessions SET updated = '2024-01-01T00:00:00.000000Z'", [])
            .unwrap();

        let sessions = store.list_sessions().unwrap();
        assert_eq!(sessions[0].id, a);
        assert_eq!(sessions[1].id, b);
    }

    #[test]
    fn test_get_session_missing_returns_none() {
        let (store, _dir) = create_test_store();
        assert!(store.get_session(7).unwrap().is_none());
        assert!(!store.session_exists(7).unwrap());
    }

    #[test]
    fn test_session_fields_roundtrip() {
        let (store, _dir) = create_test_store();
        let sid = store
            .insert_session("Explain recursion", "gpt-3.5-turbo", "openai")
            .unwrap();

        let session = store.get_session(sid).unwrap().unwrap();
        assert_eq!(session.id, sid);
        assert_eq!(session.title, "Explain recursion");
        assert_eq!(session.model, "gpt-3.5-turbo");
        assert_eq!(session.provider, "openai");
    }

    #[test]
    fn test_role_stored_as_lowercase_text() {
        let (store, _dir) = create_test_store();
        let sid = store.insert_session("", "gpt-3.5-turbo", "openai").unwrap();
        store.insert_message(sid, Role::Assistant, "hi").unwrap();

        let conn = Connection::open(&store.db_path).unwrap();
        let role: String = conn
            .query_row("SELECT role FROM messages WHERE sid = ?", params![sid], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(role, "assistant");
    }

    #[test]
    #[serial]
    fn test_open_respects_env_override() {
        // Use nested path to ensure parent directory creation is exercised.
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("nested").join("history.db");
        env::set_var("CONFAB_HISTORY_DB", db_path.to_string_lossy().to_string());

        let store = SqliteStore::open().expect("open failed with env override");
        assert_eq!(store.db_path, db_path);
        assert!(db_path.parent().unwrap().exists());

        env::remove_var("CONFAB_HISTORY_DB");
    }
}
