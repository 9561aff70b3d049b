use super::*;
use anyhow::{Result as AnyResult, anyhow};
use async_trait::async_trait;
use docflow_core::oracle::{ApprovalSummary, ConfirmationCheck, ExtractionReport, FieldEdit};
use docflow_core::template::Template;
use docflow_infrastructure::InMemoryStore;
use std::collections::HashMap;

/// Scripted oracle; `None` fields simulate an outage of that operation.
#[derive(Default)]
struct MockOracle {
    summary: Option<ApprovalSummary>,
    next_step: Option<String>,
    rejection_note: Option<String>,
}

#[async_trait]
impl Oracle for MockOracle {
    async fn classify(&self, _utterance: &str, _candidates: &[String]) -> AnyResult<String> {
        Err(anyhow!("not scripted"))
    }

    async fn extract_and_ask(
        &self,
        _utterance: &str,
        _template: &Template,
    ) -> AnyResult<ExtractionReport> {
        Err(anyhow!("not scripted"))
    }

    async fn render_confirmation(
        &self,
        _filled_fields: &HashMap<String, String>,
        _doc_type: &str,
    ) -> AnyResult<String> {
        Err(anyhow!("not scripted"))
    }

    async fn answer_freeform(&self, _question: &str, _context: &str) -> AnyResult<String> {
        Err(anyhow!("not scripted"))
    }

    async fn summarize_for_approval(&self, _confirm_text: &str) -> AnyResult<ApprovalSummary> {
        self.summary.clone().ok_or_else(|| anyhow!("summary outage"))
    }

    async fn suggest_next_step(&self, _doc_type: &str, _creator_name: &str) -> AnyResult<String> {
        self.next_step
            .clone()
            .ok_or_else(|| anyhow!("suggestion outage"))
    }

    async fn draft_rejection_note(
        &self,
        _memo: &str,
        _creator_name: &str,
        _doc_title: &str,
    ) -> AnyResult<String> {
        self.rejection_note
            .clone()
            .ok_or_else(|| anyhow!("drafting outage"))
    }

    async fn apply_field_edit(
        &self,
        _filled_fields: &HashMap<String, String>,
        _instruction: &str,
    ) -> AnyResult<FieldEdit> {
        Err(anyhow!("not scripted"))
    }

    async fn validate_confirmation(
        &self,
        _confirm_text: &str,
        _required_fields: &[String],
    ) -> AnyResult<ConfirmationCheck> {
        Err(anyhow!("not scripted"))
    }
}

async fn submitted_approval(store: &InMemoryStore) -> String {
    let fields = HashMap::from([
        ("금액".to_string(), "500000".to_string()),
        ("사유".to_string(), "비품 구매".to_string()),
    ]);
    let draft_id = store
        .create_draft("u1", "품의", &fields, &[], "확인 본문")
        .await
        .unwrap();
    store
        .submit_draft(&draft_id, "확인 본문", "mgr1", "2026-09-15", "u1")
        .await
        .unwrap()
}

fn service(oracle: MockOracle, store: Arc<InMemoryStore>) -> ApprovalService {
    ApprovalService::new(Arc::new(oracle), store)
}

#[tokio::test]
async fn route_attaches_generated_summary() {
    let store = Arc::new(InMemoryStore::new());
    let approval_id = submitted_approval(&store).await;

    let oracle = MockOracle {
        summary: Some(ApprovalSummary {
            title: "비품 구매 품의".to_string(),
            summary: "50만원 비품 구매 요청".to_string(),
            points: vec!["금액 50만원".to_string()],
        }),
        ..MockOracle::default()
    };

    let approval = service(oracle, store).route(&approval_id).await.unwrap();
    assert_eq!(approval.title, "비품 구매 품의");
    assert_eq!(approval.points, ["금액 50만원"]);
}

#[tokio::test]
async fn route_keeps_default_title_on_summary_outage() {
    let store = Arc::new(InMemoryStore::new());
    let approval_id = submitted_approval(&store).await;

    let approval = service(MockOracle::default(), store)
        .route(&approval_id)
        .await
        .unwrap();
    assert_eq!(approval.title, "품의 요청");
    assert_eq!(approval.status, ApprovalStatus::Pending);
}

#[tokio::test]
async fn approve_updates_status_and_queues_todo() {
    let store = Arc::new(InMemoryStore::new());
    let approval_id = submitted_approval(&store).await;

    let oracle = MockOracle {
        next_step: Some("회계팀에 결제 요청을 전달하세요.".to_string()),
        ..MockOracle::default()
    };

    let approval = service(oracle, store.clone())
        .approve(&approval_id)
        .await
        .unwrap();
    assert_eq!(approval.status, ApprovalStatus::Approved);

    let todos = store.list_todos("mgr1").await.unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].content, "회계팀에 결제 요청을 전달하세요.");
}

#[tokio::test]
async fn approve_still_lands_when_suggestion_fails() {
    let store = Arc::new(InMemoryStore::new());
    let approval_id = submitted_approval(&store).await;

    let approval = service(MockOracle::default(), store.clone())
        .approve(&approval_id)
        .await
        .unwrap();
    assert_eq!(approval.status, ApprovalStatus::Approved);

    // The fallback todo still names the request.
    let todos = store.list_todos("mgr1").await.unwrap();
    assert_eq!(todos.len(), 1);
    assert!(todos[0].content.contains("품의"));
}

#[tokio::test]
async fn reject_records_memo_and_note() {
    let store = Arc::new(InMemoryStore::new());
    let approval_id = submitted_approval(&store).await;

    let oracle = MockOracle {
        rejection_note: Some("금액 근거를 보완해 다시 제출해주세요.".to_string()),
        ..MockOracle::default()
    };

    let approval = service(oracle, store)
        .reject(&approval_id, "금액 근거 부족")
        .await
        .unwrap();
    assert_eq!(approval.status, ApprovalStatus::Rejected);
    assert_eq!(approval.reject_memo.as_deref(), Some("금액 근거 부족"));
    assert_eq!(
        approval.rejection_note.as_deref(),
        Some("금액 근거를 보완해 다시 제출해주세요.")
    );
}

#[tokio::test]
async fn reject_falls_back_to_raw_memo() {
    let store = Arc::new(InMemoryStore::new());
    let approval_id = submitted_approval(&store).await;

    let approval = service(MockOracle::default(), store)
        .reject(&approval_id, "금액 근거 부족")
        .await
        .unwrap();
    assert_eq!(approval.rejection_note.as_deref(), Some("금액 근거 부족"));
}

#[tokio::test]
async fn rewrite_prefill_carries_the_draft_fields() {
    let store = Arc::new(InMemoryStore::new());
    let approval_id = submitted_approval(&store).await;
    let svc = service(MockOracle::default(), store);

    svc.reject(&approval_id, "다시 작성").await.unwrap();

    let prefill = svc.rewrite_prefill(&approval_id).await.unwrap();
    assert_eq!(prefill.doc_type.as_deref(), Some("품의"));
    assert_eq!(prefill.filled_fields["금액"], "500000");
    assert_eq!(prefill.filled_fields["사유"], "비품 구매");
}

#[tokio::test]
async fn unknown_approval_is_not_found() {
    let store = Arc::new(InMemoryStore::new());
    let err = service(MockOracle::default(), store)
        .route("no-such-id")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
