//! Transcript reads and appends
//!
//! The accessor performs no context-window truncation or token budgeting:
//! the full transcript is reloaded and resent on every turn.

use crate::error::Result;
use crate::storage::{MessageRecord, Role, SqliteStore};
use std::sync::Arc;

/// Reads and appends ordered message transcripts for a session
pub struct HistoryAccessor {
    store: Arc<SqliteStore>,
}

impl HistoryAccessor {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// Load the full transcript in conversation order
    pub fn load(&self, sid: i64) -> Result<Vec<MessageRecord>> {
        self.store.list_messages(sid)
    }

    /// Append one message to a session's transcript
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` when `sid` does not exist in the store.
    pub fn append(&self, sid: i64, role: Role, content: &str) -> Result<()> {
        self.store.insert_message(sid, role, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfabError;
    use tempfile::tempdir;

    fn create_test_accessor() -> (HistoryAccessor, Arc<SqliteStore>, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let store =
            Arc::new(SqliteStore::open_at(dir.path().join("history.db")).expect("open store"));
        let accessor = HistoryAccessor::new(Arc::clone(&store));
        (accessor, store, dir)
    }

    #[test]
    fn test_append_then_load_preserves_order() {
        let (accessor, store, _dir) = create_test_accessor();
        let sid = store.insert_session("", "gpt-3.5-turbo", "openai").unwrap();

        accessor.append(sid, Role::System, "be brief").unwrap();
        accessor.append(sid, Role::User, "why is the sky blue?").unwrap();
        accessor.append(sid, Role::Assistant, "Rayleigh scattering.").unwrap();

        let loaded = accessor.load(sid).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].role, Role::System);
        assert_eq!(loaded[1].role, Role::User);
        assert_eq!(loaded[2].role, Role::Assistant);
        assert_eq!(loaded[2].content, "Rayleigh scattering.");
    }

    #[test]
    fn test_append_unknown_session() {
        let (accessor, _store, _dir) = create_test_accessor();
        let err = accessor.append(55, Role::User, "anyone home?").unwrap_err();
        let err = err.downcast::<ConfabError>().expect("typed error");
        assert!(matches!(err, ConfabError::SessionNotFound(55)));
    }

    #[test]
    fn test_load_empty_session() {
        let (accessor, store, _dir) = create_test_accessor();
        let sid = store.insert_session("", "gpt-3.5-turbo", "openai").unwrap();
        assert!(accessor.load(sid).unwrap().is_empty());
    }
}
