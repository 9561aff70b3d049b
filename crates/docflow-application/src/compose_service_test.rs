use super::*;
use anyhow::{Result as AnyResult, anyhow};
use async_trait::async_trait;
use docflow_core::oracle::{ApprovalSummary, ConfirmationCheck, ExtractionReport, FieldEdit};
use docflow_core::session::RawQuestion;
use docflow_core::store::ApprovalStatus;
use docflow_core::template::Template;
use docflow_infrastructure::InMemoryStore;

struct MockOracle {
    classify_reply: String,
    extraction: ExtractionReport,
    check: Option<ConfirmationCheck>,
}

impl MockOracle {
    fn scripted() -> Self {
        Self {
            classify_reply: "품의".to_string(),
            extraction: ExtractionReport {
                filled_fields: HashMap::from([("금액".to_string(), "500000".to_string())]),
                missing_fields: vec!["사유".to_string()],
                ask: vec![RawQuestion::Structured {
                    key: Some("사유".to_string()),
                    question: "사유를 알려주세요.".to_string(),
                }],
            },
            check: None,
        }
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn classify(&self, _utterance: &str, _candidates: &[String]) -> AnyResult<String> {
        Ok(self.classify_reply.clone())
    }

    async fn extract_and_ask(
        &self,
        _utterance: &str,
        _template: &Template,
    ) -> AnyResult<ExtractionReport> {
        Ok(self.extraction.clone())
    }

    async fn render_confirmation(
        &self,
        _filled_fields: &HashMap<String, String>,
        doc_type: &str,
    ) -> AnyResult<String> {
        Ok(format!("{doc_type} 보고서 본문"))
    }

    async fn answer_freeform(&self, _question: &str, _context: &str) -> AnyResult<String> {
        Ok("답변입니다.".to_string())
    }

    async fn summarize_for_approval(&self, _confirm_text: &str) -> AnyResult<ApprovalSummary> {
        Err(anyhow!("not scripted"))
    }

    async fn suggest_next_step(&self, _doc_type: &str, _creator_name: &str) -> AnyResult<String> {
        Err(anyhow!("not scripted"))
    }

    async fn draft_rejection_note(
        &self,
        _memo: &str,
        _creator_name: &str,
        _doc_title: &str,
    ) -> AnyResult<String> {
        Err(anyhow!("not scripted"))
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
        self.check.clone().ok_or_else(|| anyhow!("not scripted"))
    }
}

fn pumui_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_templates(vec![Template::new(
        "품의",
        vec!["금액".to_string(), "사유".to_string()],
    )]))
}

fn utterance(content: &str) -> ComposeEvent {
    ComposeEvent::Utterance {
        content: content.to_string(),
    }
}

fn submit() -> ComposeEvent {
    ComposeEvent::Submit {
        creator_id: "u1".to_string(),
        assignee_id: "mgr1".to_string(),
        due_date: "2026-09-15".to_string(),
    }
}

#[tokio::test]
async fn full_flow_reaches_submission() {
    let store = pumui_store();
    let service = ComposeService::new(Arc::new(MockOracle::scripted()), store.clone());

    let outcome = service
        .handle_event("conv-1", utterance("품의서 쓸래, 금액은 50만원"))
        .await
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Continue);

    let outcome = service
        .handle_event("conv-1", utterance("비품 구매 때문입니다"))
        .await
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Continue);

    let outcome = service.handle_event("conv-1", submit()).await.unwrap();
    let TurnOutcome::Submitted { approval_id, .. } = outcome else {
        panic!("expected submission, got {outcome:?}");
    };

    let approval = store.get_approval(&approval_id).await.unwrap().unwrap();
    assert_eq!(approval.status, ApprovalStatus::Pending);
    assert_eq!(approval.assignee_id, "mgr1");

    // Submission resets the conversation back to a fresh greeting.
    let history = service.history("conv-1").await;
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn conversations_are_isolated() {
    let service = ComposeService::new(Arc::new(MockOracle::scripted()), pumui_store());

    service
        .handle_event("conv-a", utterance("품의서 쓸래"))
        .await
        .unwrap();

    let other = service.history("conv-b").await;
    assert_eq!(other.len(), 1, "untouched conversation has only the greeting");
    assert!(service.history("conv-a").await.len() > 1);
}

#[tokio::test]
async fn rewrite_session_skips_classification() {
    // Nothing new to extract from the rewrite opener.
    let mut oracle = MockOracle::scripted();
    oracle.extraction = ExtractionReport::default();
    let service = ComposeService::new(Arc::new(oracle), pumui_store());

    let prefill = Prefill {
        doc_type: Some("품의".to_string()),
        filled_fields: HashMap::from([
            ("금액".to_string(), "500000".to_string()),
            ("사유".to_string(), "비품 구매".to_string()),
        ]),
    };
    service.start_rewrite("conv-1", prefill).await;

    service
        .handle_event("conv-1", utterance("다시 제출할게요"))
        .await
        .unwrap();

    // All fields were prefilled, so the session lands directly in confirm.
    let history = service.history("conv-1").await;
    let last = &history.last().unwrap().content;
    assert!(last.contains("보고서 본문"), "unexpected last message: {last}");
}

#[tokio::test]
async fn validate_confirmation_requires_confirm_text() {
    let service = ComposeService::new(Arc::new(MockOracle::scripted()), pumui_store());
    let err = service.validate_confirmation("conv-1").await.unwrap_err();
    assert!(matches!(err, DocflowError::Internal(_)));
}

#[tokio::test]
async fn validate_confirmation_passes_through() {
    let mut oracle = MockOracle::scripted();
    oracle.check = Some(ConfirmationCheck {
        is_valid: false,
        missing: vec!["사유".to_string()],
        suggestion: Some("사유를 보완하세요.".to_string()),
    });
    let service = ComposeService::new(Arc::new(oracle), pumui_store());

    service
        .handle_event("conv-1", utterance("품의서 쓸래, 금액은 50만원"))
        .await
        .unwrap();
    service
        .handle_event("conv-1", utterance("비품 구매 때문입니다"))
        .await
        .unwrap();

    let check = service.validate_confirmation("conv-1").await.unwrap();
    assert!(!check.is_valid);
    assert_eq!(check.missing, ["사유"]);
}
