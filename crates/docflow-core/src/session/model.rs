//! Compose session domain model.
//!
//! A [`ComposeSession`] is the root aggregate for one user's active document
//! request: the conversation so far, the selected template, the collected
//! field values, and the stage of the field-collection dialogue. It is owned
//! by exactly one conversation and never shared or persisted; only the
//! outcome (draft/approval records) outlives it.

use super::message::ConversationMessage;
use super::question::QuestionItem;
use crate::template::Template;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Greeting seeded into every fresh session.
pub const GREETING: &str = "안녕하세요! 어떤 문서를 작성하시겠어요? (예: 품의서, 연차 신청)";

/// The discrete phase of one compose session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Waiting for the first utterance; no template selected yet.
    Initial,
    /// Collecting field values, one question at a time.
    Gathering,
    /// All required fields present; confirmation text rendered for review.
    Confirm,
    /// Final records handed to the store. Transient: the session resets to a
    /// fresh `Initial` immediately after.
    Submitted,
}

/// Initial values carried over from a rejected-request rewrite.
///
/// Prefill wins over oracle classification (for the document type) and over
/// oracle extraction (for field values).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prefill {
    /// Document type to use instead of classifying the first utterance.
    #[serde(default)]
    pub doc_type: Option<String>,
    /// Field values merged over the oracle's initial extraction.
    #[serde(default)]
    pub filled_fields: HashMap<String, String>,
}

/// The state bag for one active compose interaction.
///
/// All mutation goes through the dialogue machine; one inbound event is one
/// atomic turn. No two turns for the same session may run concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeSession {
    /// Conversation identifier this session belongs to.
    pub id: String,
    /// Current dialogue stage.
    pub stage: Stage,
    /// Append-only conversation history.
    pub chat_history: Vec<ConversationMessage>,
    /// The selected template, absent until `Initial` completes.
    pub template: Option<Template>,
    /// Collected field values. Membership is what matters, not order.
    pub filled_fields: HashMap<String, String>,
    /// Pending questions, consumed from the front.
    pub questions_to_ask: VecDeque<QuestionItem>,
    /// The field key the most recent assistant question targeted.
    pub last_asked: Option<String>,
    /// Rewrite prefill, consumed during the `Initial` turn.
    pub prefill: Option<Prefill>,
    /// The frozen confirmation document, present from `Confirm` onward.
    pub confirm_text: Option<String>,
    /// Latch: the confirmation synthesis call fired for the current field map.
    pub confirm_rendered: bool,
    /// Timestamp when the session was created (ISO 8601 format).
    pub created_at: String,
    /// Timestamp when the session was last updated (ISO 8601 format).
    pub updated_at: String,
}

impl ComposeSession {
    /// Creates a fresh session seeded with the assistant greeting.
    pub fn new(id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            stage: Stage::Initial,
            chat_history: vec![ConversationMessage::assistant(GREETING)],
            template: None,
            filled_fields: HashMap::new(),
            questions_to_ask: VecDeque::new(),
            last_asked: None,
            prefill: None,
            confirm_text: None,
            confirm_rendered: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Creates a fresh session carrying a rewrite prefill.
    pub fn with_prefill(id: impl Into<String>, prefill: Prefill) -> Self {
        let mut session = Self::new(id);
        session.prefill = Some(prefill);
        session
    }

    /// Wipes everything back to a fresh `Initial` session, keeping the id.
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.id));
    }

    /// Appends a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.chat_history.push(ConversationMessage::user(content));
        self.touch();
    }

    /// Appends an assistant turn.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.chat_history
            .push(ConversationMessage::assistant(content));
        self.touch();
    }

    /// Resolved field keys not yet filled, in declaration order.
    pub fn unfilled_fields(&self) -> Vec<String> {
        match &self.template {
            Some(template) => template.unfilled_fields(&self.filled_fields),
            None => Vec::new(),
        }
    }

    /// The first unfilled field key, if any.
    pub fn next_unfilled(&self) -> Option<String> {
        self.unfilled_fields().into_iter().next()
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
