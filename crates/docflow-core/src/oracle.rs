//! Oracle trait: the NLU/NLG boundary.
//!
//! The oracle is an external language service treated as a non-deterministic
//! black box: given a prompt it may return free text, valid JSON, malformed
//! JSON, or fail outright. Adapters are expected to do their own lenient
//! parsing and surface failures as `Err`; the dialogue machine converts every
//! oracle failure into an in-band degraded value and never aborts a turn
//! because of one.

use crate::session::question::RawQuestion;
use crate::template::Template;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The oracle's analysis of an initial utterance against a template.
///
/// Any subset of keys may be missing from the raw response; every field
/// defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Field values extracted from the utterance.
    #[serde(default)]
    pub filled_fields: HashMap<String, String>,
    /// Field keys the oracle believes are still missing.
    #[serde(default)]
    pub missing_fields: Vec<String>,
    /// Questions to ask for the missing fields, possibly keyless.
    #[serde(default)]
    pub ask: Vec<RawQuestion>,
}

/// Executive summary of a confirmation document, used when routing an
/// approval to its reviewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalSummary {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// The three decision-critical points.
    #[serde(default)]
    pub points: Vec<String>,
}

/// A single-field patch extracted from a free-text edit instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEdit {
    pub key: String,
    pub value: String,
}

/// Result of the optional downstream confirmation validator.
///
/// Not invoked by the default compose flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationCheck {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub missing: Vec<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
}

/// The natural-language understanding/generation service boundary.
///
/// Injected into the dialogue machine and the approval services; tests
/// substitute scripted mocks.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Picks the candidate document type that best matches the utterance.
    ///
    /// The returned name is untrusted: callers must validate membership in
    /// `candidates` and fall back to a keyword heuristic if the answer is
    /// empty or not a candidate.
    async fn classify(&self, utterance: &str, candidates: &[String]) -> Result<String>;

    /// Extracts initial field values from the first utterance and proposes
    /// questions for whatever is missing.
    async fn extract_and_ask(
        &self,
        utterance: &str,
        template: &Template,
    ) -> Result<ExtractionReport>;

    /// Renders the formal confirmation document from the full field map.
    ///
    /// Free text; the caller passes it through without local validation.
    async fn render_confirmation(
        &self,
        filled_fields: &HashMap<String, String>,
        doc_type: &str,
    ) -> Result<String>;

    /// Answers an open-domain side question asked mid-form.
    async fn answer_freeform(&self, question: &str, context: &str) -> Result<String>;

    /// Summarizes a confirmation document for the approval inbox.
    async fn summarize_for_approval(&self, confirm_text: &str) -> Result<ApprovalSummary>;

    /// Suggests the logical follow-up action after an approval.
    async fn suggest_next_step(&self, doc_type: &str, creator_name: &str) -> Result<String>;

    /// Drafts a polite rejection notice from the reviewer's terse memo.
    async fn draft_rejection_note(
        &self,
        memo: &str,
        creator_name: &str,
        doc_title: &str,
    ) -> Result<String>;

    /// Extracts exactly one `{key, value}` patch from an edit instruction.
    async fn apply_field_edit(
        &self,
        filled_fields: &HashMap<String, String>,
        instruction: &str,
    ) -> Result<FieldEdit>;

    /// Checks a rendered confirmation for placeholder gaps or contradictions.
    async fn validate_confirmation(
        &self,
        confirm_text: &str,
        required_fields: &[String],
    ) -> Result<ConfirmationCheck>;
}
