//! In-memory document store.
//!
//! Tables live in a single `RwLock`-guarded struct, so every operation sees a
//! consistent snapshot and writes are last-writer-wins. Ids are random UUIDs
//! and timestamps are RFC3339 strings, matching the persisted record types.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use docflow_core::store::{Approval, ApprovalStatus, DocumentStore, Draft, Todo};
use docflow_core::template::Template;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Default)]
struct Tables {
    templates: Vec<Template>,
    drafts: HashMap<String, Draft>,
    approvals: HashMap<String, Approval>,
    todos: HashMap<String, Todo>,
}

/// A process-local [`DocumentStore`] backed by hash maps.
///
/// Suitable for tests and single-instance deployments; nothing survives a
/// restart.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with the given templates.
    pub fn with_templates(templates: Vec<Template>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                templates,
                ..Tables::default()
            }),
        }
    }

    /// Replaces the template catalog.
    pub async fn seed_templates(&self, templates: Vec<Template>) {
        self.tables.write().await.templates = templates;
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_templates(&self) -> Result<Vec<Template>> {
        Ok(self.tables.read().await.templates.clone())
    }

    async fn get_template_by_type(&self, doc_type: &str) -> Result<Option<Template>> {
        let tables = self.tables.read().await;
        Ok(tables
            .templates
            .iter()
            .find(|t| t.doc_type == doc_type)
            .cloned())
    }

    async fn create_draft(
        &self,
        creator_id: &str,
        doc_type: &str,
        filled_fields: &HashMap<String, String>,
        missing_fields: &[String],
        confirm_text: &str,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let draft = Draft {
            id: id.clone(),
            creator_id: creator_id.to_string(),
            doc_type: doc_type.to_string(),
            filled_fields: filled_fields.clone(),
            missing_fields: missing_fields.to_vec(),
            confirm_text: confirm_text.to_string(),
            created_at: now_rfc3339(),
        };
        self.tables.write().await.drafts.insert(id.clone(), draft);
        debug!(draft_id = %id, doc_type, "draft created");
        Ok(id)
    }

    async fn submit_draft(
        &self,
        draft_id: &str,
        confirm_text: &str,
        assignee_id: &str,
        due_date: &str,
        creator_id: &str,
    ) -> Result<String> {
        let mut tables = self.tables.write().await;
        let draft = tables
            .drafts
            .get(draft_id)
            .ok_or_else(|| anyhow!("draft not found: {draft_id}"))?;

        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();
        let approval = Approval {
            id: id.clone(),
            draft_id: draft_id.to_string(),
            title: format!("{} 요청", draft.doc_type),
            summary: String::new(),
            points: Vec::new(),
            confirm_text: confirm_text.to_string(),
            creator_id: creator_id.to_string(),
            assignee_id: assignee_id.to_string(),
            due_date: due_date.to_string(),
            status: ApprovalStatus::Pending,
            reject_memo: None,
            rejection_note: None,
            created_at: now.clone(),
            updated_at: now,
        };
        tables.approvals.insert(id.clone(), approval);
        debug!(approval_id = %id, draft_id, assignee_id, "draft submitted");
        Ok(id)
    }

    async fn get_draft(&self, draft_id: &str) -> Result<Option<Draft>> {
        Ok(self.tables.read().await.drafts.get(draft_id).cloned())
    }

    async fn get_approval(&self, approval_id: &str) -> Result<Option<Approval>> {
        Ok(self.tables.read().await.approvals.get(approval_id).cloned())
    }

    async fn pending_approvals(&self, assignee_id: &str) -> Result<Vec<Approval>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Approval> = tables
            .approvals
            .values()
            .filter(|a| a.assignee_id == assignee_id && a.status == ApprovalStatus::Pending)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn rejected_approvals(&self, creator_id: &str) -> Result<Vec<Approval>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Approval> = tables
            .approvals
            .values()
            .filter(|a| a.creator_id == creator_id && a.status == ApprovalStatus::Rejected)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(found)
    }

    async fn attach_summary(
        &self,
        approval_id: &str,
        title: &str,
        summary: &str,
        points: &[String],
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let approval = tables
            .approvals
            .get_mut(approval_id)
            .ok_or_else(|| anyhow!("approval not found: {approval_id}"))?;
        approval.title = title.to_string();
        approval.summary = summary.to_string();
        approval.points = points.to_vec();
        approval.updated_at = now_rfc3339();
        Ok(())
    }

    async fn update_approval_status(
        &self,
        approval_id: &str,
        status: ApprovalStatus,
        reject_memo: Option<&str>,
        rejection_note: Option<&str>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let approval = tables
            .approvals
            .get_mut(approval_id)
            .ok_or_else(|| anyhow!("approval not found: {approval_id}"))?;
        approval.status = status;
        if let Some(memo) = reject_memo {
            approval.reject_memo = Some(memo.to_string());
        }
        if let Some(note) = rejection_note {
            approval.rejection_note = Some(note.to_string());
        }
        approval.updated_at = now_rfc3339();
        debug!(approval_id, ?status, "approval status updated");
        Ok(())
    }

    async fn create_todo(&self, owner_id: &str, content: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let todo = Todo {
            id: id.clone(),
            owner_id: owner_id.to_string(),
            content: content.to_string(),
            created_at: now_rfc3339(),
        };
        self.tables.write().await.todos.insert(id.clone(), todo);
        Ok(id)
    }

    async fn list_todos(&self, owner_id: &str) -> Result<Vec<Todo>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Todo> = tables
            .todos
            .values()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn delete_todo(&self, todo_id: &str) -> Result<()> {
        self.tables.write().await.todos.remove(todo_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pumui_template() -> Template {
        Template::new("품의", vec!["금액".to_string(), "사유".to_string()])
    }

    fn sample_fields() -> HashMap<String, String> {
        HashMap::from([("금액".to_string(), "500000".to_string())])
    }

    #[tokio::test]
    async fn template_lookup_by_type() {
        let store = InMemoryStore::with_templates(vec![pumui_template()]);
        let found = store.get_template_by_type("품의").await.unwrap();
        assert_eq!(found.unwrap().doc_type, "품의");
        assert!(store.get_template_by_type("휴가").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn draft_then_submit_creates_pending_approval() {
        let store = InMemoryStore::new();
        let draft_id = store
            .create_draft("u1", "품의", &sample_fields(), &["사유".to_string()], "본문")
            .await
            .unwrap();

        let approval_id = store
            .submit_draft(&draft_id, "본문", "mgr1", "2026-09-15", "u1")
            .await
            .unwrap();

        let approval = store.get_approval(&approval_id).await.unwrap().unwrap();
        assert_eq!(approval.status, ApprovalStatus::Pending);
        assert_eq!(approval.title, "품의 요청");
        assert_eq!(approval.draft_id, draft_id);

        let inbox = store.pending_approvals("mgr1").await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, approval_id);
    }

    #[tokio::test]
    async fn submitting_unknown_draft_fails() {
        let store = InMemoryStore::new();
        let result = store
            .submit_draft("no-such-draft", "본문", "mgr1", "2026-09-15", "u1")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn attached_summary_replaces_default_title() {
        let store = InMemoryStore::new();
        let draft_id = store
            .create_draft("u1", "품의", &sample_fields(), &[], "본문")
            .await
            .unwrap();
        let approval_id = store
            .submit_draft(&draft_id, "본문", "mgr1", "2026-09-15", "u1")
            .await
            .unwrap();

        store
            .attach_summary(&approval_id, "비품 구매 품의", "요약", &["포인트".to_string()])
            .await
            .unwrap();

        let approval = store.get_approval(&approval_id).await.unwrap().unwrap();
        assert_eq!(approval.title, "비품 구매 품의");
        assert_eq!(approval.points, ["포인트"]);
    }

    #[tokio::test]
    async fn rejection_records_memo_and_note() {
        let store = InMemoryStore::new();
        let draft_id = store
            .create_draft("u1", "품의", &sample_fields(), &[], "본문")
            .await
            .unwrap();
        let approval_id = store
            .submit_draft(&draft_id, "본문", "mgr1", "2026-09-15", "u1")
            .await
            .unwrap();

        store
            .update_approval_status(
                &approval_id,
                ApprovalStatus::Rejected,
                Some("금액 근거 부족"),
                Some("반려 안내문"),
            )
            .await
            .unwrap();

        let rejected = store.rejected_approvals("u1").await.unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].reject_memo.as_deref(), Some("금액 근거 부족"));
        assert_eq!(rejected[0].rejection_note.as_deref(), Some("반려 안내문"));
        assert!(store.pending_approvals("mgr1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn todos_are_scoped_to_owner() {
        let store = InMemoryStore::new();
        let id = store.create_todo("mgr1", "후속 조치 확인").await.unwrap();
        store.create_todo("other", "다른 일").await.unwrap();

        let todos = store.list_todos("mgr1").await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].content, "후속 조치 확인");

        store.delete_todo(&id).await.unwrap();
        assert!(store.list_todos("mgr1").await.unwrap().is_empty());

        // Deleting again is not an error.
        store.delete_todo(&id).await.unwrap();
    }
}
