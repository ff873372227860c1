//! Session identity and selection logic
//!
//! The `SessionManager` is the only component that creates sessions or
//! changes their titles. Titles are set exactly once, from the first user
//! prompt of the session, truncated to [`MAX_TITLE_CHARS`] characters.

use crate::error::{ConfabError, Result};
use crate::storage::{Role, Session, SqliteStore};
use std::sync::Arc;

/// Maximum number of characters kept from the first prompt as the title
pub const MAX_TITLE_CHARS: usize = 50;

/// Creates, selects, titles, and enumerates chat sessions
pub struct SessionManager {
    store: Arc<SqliteStore>,
    model: String,
    provider: String,
}

impl SessionManager {
    /// Create a manager bound to the store and the configured backend
    ///
    /// `model` and `provider` are recorded on every session the manager
    /// creates and are fixed for the session's lifetime.
    pub fn new(store: Arc<SqliteStore>, model: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            store,
            model: model.into(),
            provider: provider.into(),
        }
    }

    /// Resolve the session for a new chat turn
    ///
    /// With no current session, creates one titled from `prompt`. With an
    /// existing id, validates it and sets the title from `prompt` only when
    /// it is still empty; an already-set title is never changed.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` when `current_sid` references a session
    /// that does not exist.
    pub fn start_or_resume(&self, current_sid: Option<i64>, prompt: &str) -> Result<i64> {
        match current_sid {
            Some(sid) => {
                let session = self
                    .store
                    .get_session(sid)?
                    .ok_or(ConfabError::SessionNotFound(sid))?;
                if session.title.is_empty() {
                    self.store
                        .update_session_title(sid, &truncate_title(prompt))?;
                }
                Ok(sid)
            }
            None => {
                let sid = self.store.insert_session(
                    &truncate_title(prompt),
                    &self.model,
                    &self.provider,
                )?;
                tracing::debug!("Created session {} from first prompt", sid);
                Ok(sid)
            }
        }
    }

    /// Validate a session id before the REPL switches to it
    ///
    /// On `SessionNotFound` the caller is expected to keep its previous
    /// selection.
    pub fn select_session(&self, sid: i64) -> Result<i64> {
        if self.store.session_exists(sid)? {
            Ok(sid)
        } else {
            Err(ConfabError::SessionNotFound(sid).into())
        }
    }

    /// All stored sessions, oldest activity first
    pub fn list(&self) -> Result<Vec<Session>> {
        self.store.list_sessions()
    }

    /// Create an empty-titled session seeded with a system message
    ///
    /// Used to install a custom system prompt before the first user turn;
    /// the title is filled in later by `start_or_resume`.
    pub fn new_blank_session(&self, initial_system_content: &str) -> Result<i64> {
        let sid = self
            .store
            .insert_session("", &self.model, &self.provider)?;
        self.store
            .insert_message(sid, Role::System, initial_system_content)?;
        tracing::debug!("Created blank session {} with system message", sid);
        Ok(sid)
    }
}

/// Truncate a prompt to the titling prefix, respecting UTF-8 boundaries
fn truncate_title(prompt: &str) -> String {
    prompt.chars().take(MAX_TITLE_CHARS).collect()
}
