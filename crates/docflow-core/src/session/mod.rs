//! Compose session domain module.
//!
//! This module contains the multi-turn field-collection dialogue: the session
//! aggregate, conversation messages, the question queue normalizer, and the
//! state machine that advances one atomic turn per inbound event.
//!
//! # Module Structure
//!
//! - `model`: session aggregate (`ComposeSession`, `Stage`, `Prefill`)
//! - `message`: conversation message types (`MessageRole`, `ConversationMessage`)
//! - `event`: inbound events and turn outcomes (`ComposeEvent`, `TurnOutcome`)
//! - `question`: question queue types and normalization
//! - `machine`: the dialogue state machine (`ComposeMachine`)

mod event;
mod machine;
mod message;
mod model;
pub mod question;

// Re-export public API
pub use event::{ComposeEvent, TurnOutcome};
pub use machine::ComposeMachine;
pub use message::{ConversationMessage, MessageRole};
pub use model::{ComposeSession, GREETING, Prefill, Stage};
pub use question::{QuestionItem, RawQuestion, normalize_questions};
