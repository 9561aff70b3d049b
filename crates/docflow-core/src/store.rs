//! Document store trait and the persisted record types.
//!
//! The store is an external collaborator reachable by opaque record ids. It
//! is assumed strongly consistent from a single session's point of view
//! (read-after-write) with last-writer-wins updates; no optimistic locking.

use crate::template::Template;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Review status of an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting in the reviewer's inbox.
    Pending,
    /// Approved; follow-up action may have been assigned.
    Approved,
    /// Rejected with a memo; the creator may rewrite and resubmit.
    Rejected,
}

/// A user's submitted document: the compose flow's output triple plus
/// bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub creator_id: String,
    pub doc_type: String,
    pub filled_fields: HashMap<String, String>,
    pub missing_fields: Vec<String>,
    pub confirm_text: String,
    pub created_at: String,
}

/// A routed review request derived from a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    pub draft_id: String,
    /// Inbox title; a plain "<doc_type> 요청" until a summary is attached.
    pub title: String,
    pub summary: String,
    pub points: Vec<String>,
    pub confirm_text: String,
    pub creator_id: String,
    pub assignee_id: String,
    pub due_date: String,
    pub status: ApprovalStatus,
    /// Reviewer's terse rejection memo, set on rejection.
    pub reject_memo: Option<String>,
    /// Generated polite rejection notice sent to the creator.
    pub rejection_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A follow-up action item created when a request is approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub owner_id: String,
    pub content: String,
    pub created_at: String,
}

/// An abstract store for templates, drafts, approvals, and follow-up todos.
///
/// This trait decouples the dialogue core and the approval services from the
/// concrete persistence mechanism (in-memory tables, SQL, remote API).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lists all document templates.
    async fn get_templates(&self) -> Result<Vec<Template>>;

    /// Finds a template by its document type name.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Template))`: template found
    /// - `Ok(None)`: no template with that type
    /// - `Err(_)`: error occurred during retrieval
    async fn get_template_by_type(&self, doc_type: &str) -> Result<Option<Template>>;

    /// Creates a draft from a finished compose session.
    ///
    /// # Returns
    ///
    /// The opaque id of the new draft.
    async fn create_draft(
        &self,
        creator_id: &str,
        doc_type: &str,
        filled_fields: &HashMap<String, String>,
        missing_fields: &[String],
        confirm_text: &str,
    ) -> Result<String>;

    /// Promotes a draft to a pending approval assigned to a reviewer.
    ///
    /// # Returns
    ///
    /// The opaque id of the new approval.
    async fn submit_draft(
        &self,
        draft_id: &str,
        confirm_text: &str,
        assignee_id: &str,
        due_date: &str,
        creator_id: &str,
    ) -> Result<String>;

    /// Finds a draft by its id.
    async fn get_draft(&self, draft_id: &str) -> Result<Option<Draft>>;

    /// Finds an approval by its id.
    async fn get_approval(&self, approval_id: &str) -> Result<Option<Approval>>;

    /// Lists approvals waiting in a reviewer's inbox.
    async fn pending_approvals(&self, assignee_id: &str) -> Result<Vec<Approval>>;

    /// Lists rejected approvals created by a user, newest first.
    async fn rejected_approvals(&self, creator_id: &str) -> Result<Vec<Approval>>;

    /// Replaces an approval's inbox summary (last-writer-wins).
    async fn attach_summary(
        &self,
        approval_id: &str,
        title: &str,
        summary: &str,
        points: &[String],
    ) -> Result<()>;

    /// Updates an approval's review status, optionally recording the
    /// reviewer's memo and the generated rejection note.
    async fn update_approval_status(
        &self,
        approval_id: &str,
        status: ApprovalStatus,
        reject_memo: Option<&str>,
        rejection_note: Option<&str>,
    ) -> Result<()>;

    /// Creates a follow-up todo for a user.
    async fn create_todo(&self, owner_id: &str, content: &str) -> Result<String>;

    /// Lists a user's follow-up todos.
    async fn list_todos(&self, owner_id: &str) -> Result<Vec<Todo>>;

    /// Deletes a todo (no error if it is already gone).
    async fn delete_todo(&self, todo_id: &str) -> Result<()>;
}
