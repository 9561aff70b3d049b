use serde::{Deserialize, Serialize};

/// Inbound events a compose session can receive, one per turn.
///
/// Every UI action (message submit, button press) maps to exactly one event;
/// the dialogue machine treats each event as one atomic turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComposeEvent {
    /// Free-text user utterance.
    Utterance { content: String },
    /// "Start over" button: wipe the session back to a fresh greeting.
    Restart,
    /// "Submit for approval" button, valid in the confirm stage.
    Submit {
        creator_id: String,
        assignee_id: String,
        due_date: String,
    },
    /// Inline single-field patch: a free-text edit instruction, valid in the
    /// confirm stage.
    Edit { instruction: String },
    /// "Revise remaining fields" button: drop back to gathering and re-ask
    /// whatever is still unfilled.
    ReviseRemaining,
}

/// What a completed turn produced, beyond the mutated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// The dialogue continues; render the updated history.
    Continue,
    /// The request was handed to the store and the session reset.
    Submitted {
        draft_id: String,
        approval_id: String,
    },
}
