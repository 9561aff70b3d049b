//! Reviewer-side workflow over submitted requests.
//!
//! Covers the life of an approval record after submission: summarizing it
//! for the inbox, approving with a follow-up todo, rejecting with a drafted
//! notice, and turning a rejected request back into a compose prefill.
//!
//! Oracle failures never block a decision. Every generated text has a local
//! fallback, so approve and reject always land in the store.

use docflow_core::error::{DocflowError, Result};
use docflow_core::oracle::Oracle;
use docflow_core::session::Prefill;
use docflow_core::store::{Approval, ApprovalStatus, DocumentStore, Draft};
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(test)]
#[path = "approval_service_test.rs"]
mod approval_service_test;

/// Services the approval inbox and review decisions.
pub struct ApprovalService {
    oracle: Arc<dyn Oracle>,
    store: Arc<dyn DocumentStore>,
}

impl ApprovalService {
    pub fn new(oracle: Arc<dyn Oracle>, store: Arc<dyn DocumentStore>) -> Self {
        Self { oracle, store }
    }

    /// Attaches an executive summary to a freshly submitted approval.
    ///
    /// When summarization fails the record keeps its default
    /// "<doc_type> 요청" title and the inbox shows the raw confirmation text.
    pub async fn route(&self, approval_id: &str) -> Result<Approval> {
        let approval = self.fetch_approval(approval_id).await?;

        match self
            .oracle
            .summarize_for_approval(&approval.confirm_text)
            .await
        {
            Ok(summary) => {
                self.store
                    .attach_summary(approval_id, &summary.title, &summary.summary, &summary.points)
                    .await
                    .map_err(|err| DocflowError::store(err.to_string()))?;
            }
            Err(err) => {
                warn!(approval_id, error = %err, "summary generation failed, keeping default title");
            }
        }

        self.fetch_approval(approval_id).await
    }

    /// Approves a request and queues a follow-up todo for the reviewer.
    pub async fn approve(&self, approval_id: &str) -> Result<Approval> {
        let approval = self.fetch_approval(approval_id).await?;
        let draft = self.fetch_draft(&approval.draft_id).await?;

        self.store
            .update_approval_status(approval_id, ApprovalStatus::Approved, None, None)
            .await
            .map_err(|err| DocflowError::store(err.to_string()))?;

        let suggestion = match self
            .oracle
            .suggest_next_step(&draft.doc_type, &approval.creator_id)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(approval_id, error = %err, "next-step suggestion failed");
                format!(
                    "'{}' 님의 '{}' 요청이 승인되었습니다. 후속 조치를 확인해주세요.",
                    approval.creator_id, draft.doc_type
                )
            }
        };
        self.store
            .create_todo(&approval.assignee_id, &suggestion)
            .await
            .map_err(|err| DocflowError::store(err.to_string()))?;

        info!(approval_id, "request approved");
        self.fetch_approval(approval_id).await
    }

    /// Rejects a request, recording the reviewer's memo and a polite notice
    /// drafted from it.
    pub async fn reject(&self, approval_id: &str, memo: &str) -> Result<Approval> {
        let approval = self.fetch_approval(approval_id).await?;

        let note = match self
            .oracle
            .draft_rejection_note(memo, &approval.creator_id, &approval.title)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(approval_id, error = %err, "rejection note drafting failed, using memo");
                memo.to_string()
            }
        };

        self.store
            .update_approval_status(
                approval_id,
                ApprovalStatus::Rejected,
                Some(memo),
                Some(&note),
            )
            .await
            .map_err(|err| DocflowError::store(err.to_string()))?;

        info!(approval_id, "request rejected");
        self.fetch_approval(approval_id).await
    }

    /// Builds a compose prefill from a rejected request, so the creator can
    /// rewrite without re-entering everything.
    pub async fn rewrite_prefill(&self, approval_id: &str) -> Result<Prefill> {
        let approval = self.fetch_approval(approval_id).await?;
        let draft = self.fetch_draft(&approval.draft_id).await?;

        Ok(Prefill {
            doc_type: Some(draft.doc_type),
            filled_fields: draft.filled_fields,
        })
    }

    /// The reviewer's pending inbox, newest first.
    pub async fn inbox(&self, assignee_id: &str) -> Result<Vec<Approval>> {
        self.store
            .pending_approvals(assignee_id)
            .await
            .map_err(|err| DocflowError::store(err.to_string()))
    }

    /// A creator's rejected requests, newest first.
    pub async fn rejected(&self, creator_id: &str) -> Result<Vec<Approval>> {
        self.store
            .rejected_approvals(creator_id)
            .await
            .map_err(|err| DocflowError::store(err.to_string()))
    }

    async fn fetch_approval(&self, approval_id: &str) -> Result<Approval> {
        self.store
            .get_approval(approval_id)
            .await
            .map_err(|err| DocflowError::store(err.to_string()))?
            .ok_or_else(|| DocflowError::not_found("approval", approval_id))
    }

    async fn fetch_draft(&self, draft_id: &str) -> Result<Draft> {
        self.store
            .get_draft(draft_id)
            .await
            .map_err(|err| DocflowError::store(err.to_string()))?
            .ok_or_else(|| DocflowError::not_found("draft", draft_id))
    }
}
