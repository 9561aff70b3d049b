//! Conversation-facing compose service.
//!
//! Owns the live sessions and serializes turns: each conversation id maps to
//! one session behind its own mutex, held for the whole turn, so no two
//! events for the same conversation ever interleave. Different conversations
//! proceed independently.

use docflow_core::error::{DocflowError, Result};
use docflow_core::oracle::{ConfirmationCheck, Oracle};
use docflow_core::session::{
    ComposeEvent, ComposeMachine, ComposeSession, ConversationMessage, Prefill, TurnOutcome,
};
use docflow_core::store::DocumentStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

#[cfg(test)]
#[path = "compose_service_test.rs"]
mod compose_service_test;

/// Per-conversation entry point for the compose dialogue.
pub struct ComposeService {
    machine: ComposeMachine,
    oracle: Arc<dyn Oracle>,
    sessions: RwLock<HashMap<String, Arc<Mutex<ComposeSession>>>>,
}

impl ComposeService {
    pub fn new(oracle: Arc<dyn Oracle>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            machine: ComposeMachine::new(oracle.clone(), store),
            oracle,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Feeds one event into a conversation's session as one atomic turn.
    ///
    /// Creates the session on first contact. The per-session lock is held
    /// across the entire turn, including oracle and store calls.
    pub async fn handle_event(
        &self,
        conversation_id: &str,
        event: ComposeEvent,
    ) -> Result<TurnOutcome> {
        let session = self.session_handle(conversation_id).await;
        let mut session = session.lock().await;
        self.machine.handle_event(&mut session, event).await
    }

    /// Starts a fresh rewrite session seeded from a rejected request.
    ///
    /// Any existing session for the conversation is replaced.
    pub async fn start_rewrite(&self, conversation_id: &str, prefill: Prefill) {
        info!(conversation_id, "starting rewrite session");
        let session = ComposeSession::with_prefill(conversation_id, prefill);
        self.sessions
            .write()
            .await
            .insert(conversation_id.to_string(), Arc::new(Mutex::new(session)));
    }

    /// Snapshot of a conversation's history, creating the session if needed.
    pub async fn history(&self, conversation_id: &str) -> Vec<ConversationMessage> {
        let session = self.session_handle(conversation_id).await;
        let session = session.lock().await;
        session.chat_history.clone()
    }

    /// Runs the optional oracle completeness check over the frozen
    /// confirmation text.
    pub async fn validate_confirmation(&self, conversation_id: &str) -> Result<ConfirmationCheck> {
        let session = self.session_handle(conversation_id).await;
        let session = session.lock().await;

        let confirm_text = session
            .confirm_text
            .as_deref()
            .ok_or_else(|| DocflowError::internal("no confirmation text to validate"))?;
        let required = session
            .template
            .as_ref()
            .map(|t| t.resolved_fields().to_vec())
            .unwrap_or_default();

        self.oracle
            .validate_confirmation(confirm_text, &required)
            .await
            .map_err(|err| DocflowError::oracle(err.to_string()))
    }

    async fn session_handle(&self, conversation_id: &str) -> Arc<Mutex<ComposeSession>> {
        if let Some(existing) = self.sessions.read().await.get(conversation_id) {
            return existing.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ComposeSession::new(conversation_id))))
            .clone()
    }
}
