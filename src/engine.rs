//! Streaming chat turn orchestration
//!
//! A turn moves through resolving the session, building the model-facing
//! context, streaming the completion, and committing the final transcript.
//! The user message is persisted before the remote call starts, so a
//! provider failure can never lose it; the assistant message is persisted
//! only after the stream ends cleanly. Partial text already printed when a
//! stream fails is not retracted and not stored.

use crate::config::ChatConfig;
use crate::error::{ConfabError, Result};
use crate::history::HistoryAccessor;
use crate::providers::{ChatMessage, ChatProvider};
use crate::session::SessionManager;
use crate::storage::Role;
use futures::StreamExt;
use std::io::Write;
use std::time::Duration;

/// Executes one conversational turn end-to-end
pub struct ChatEngine {
    sessions: SessionManager,
    history: HistoryAccessor,
    provider: Box<dyn ChatProvider>,
    system_prompt: String,
    idle_timeout: Duration,
}

impl ChatEngine {
    /// Create an engine over the given components
    pub fn new(
        sessions: SessionManager,
        history: HistoryAccessor,
        provider: Box<dyn ChatProvider>,
        chat_config: &ChatConfig,
    ) -> Self {
        Self {
            sessions,
            history,
            provider,
            system_prompt: chat_config.system_prompt.clone(),
            idle_timeout: Duration::from_secs(chat_config.stream_idle_timeout_seconds),
        }
    }

    /// Run one chat turn, streaming output to `out`
    ///
    /// Resolves (or creates) the session for `current_sid`, sends the full
    /// context to the provider, emits each text chunk to `out` as it
    /// arrives (flushed per chunk), and commits the accumulated assistant
    /// message once the stream ends. Returns the resolved session id so the
    /// caller can track the current session.
    ///
    /// # Errors
    ///
    /// Provider failures, a Ctrl-C interrupt, and the idle timeout all end
    /// the turn without committing an assistant message. The user message is
    /// already durable at that point.
    pub async fn run_turn<W: Write>(
        &self,
        current_sid: Option<i64>,
        prompt: &str,
        out: &mut W,
    ) -> Result<i64> {
        let sid = self.sessions.start_or_resume(current_sid, prompt)?;

        // Brand-new sessions are seeded with the configured system prompt;
        // it is persisted so resuming replays the same context. Resumed
        // sessions replay their full stored transcript.
        let mut context: Vec<ChatMessage> = if current_sid.is_none() {
            self.history.append(sid, Role::System, &self.system_prompt)?;
            vec![ChatMessage::system(&self.system_prompt)]
        } else {
            self.history.load(sid)?.iter().map(ChatMessage::from).collect()
        };

        context.push(ChatMessage::user(prompt));
        // Durable before the remote call starts; never lost to a provider
        // failure.
        self.history.append(sid, Role::User, prompt)?;

        let response = self.stream_response(&context, out).await?;
        self.history.append(sid, Role::Assistant, &response)?;

        Ok(sid)
    }

    /// Stream one completion, emitting chunks as they arrive
    ///
    /// Returns the accumulated assistant text after a clean end of stream.
    async fn stream_response<W: Write>(
        &self,
        context: &[ChatMessage],
        out: &mut W,
    ) -> Result<String> {
        let mut stream = self.provider.stream_chat(context).await?;
        let mut response: Vec<String> = Vec::new();

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            let next = tokio::select! {
                item = tokio::time::timeout(self.idle_timeout, stream.next()) => {
                    item.map_err(|_| {
                        ConfabError::Provider(format!(
                            "No data received for {} seconds",
                            self.idle_timeout.as_secs()
                        ))
                    })?
                }
                _ = &mut ctrl_c => {
                    tracing::debug!("Stream interrupted by user");
                    return Err(ConfabError::Provider("Interrupted".to_string()).into());
                }
            };

            match next {
                Some(Ok(chunk)) => {
                    if !chunk.is_empty() {
                        write!(out, "{}", chunk)?;
                        out.flush()?;
                        response.push(chunk);
                    }
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        writeln!(out)?;
        out.flush()?;

        Ok(response.concat())
    }
}
