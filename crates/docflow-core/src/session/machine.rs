//! The compose dialogue state machine.
//!
//! One [`ComposeMachine::handle_event`] call is one atomic turn: bind the
//! inbound event, make whatever oracle calls the stage needs, mutate the
//! session, and return. Oracle failures never abort a turn; they degrade to
//! empty structures and the deterministic "ask the next unfilled field" path
//! takes over. Only store-write failures on submission propagate as errors,
//! and they leave the session intact so the user can retry.

use super::event::{ComposeEvent, TurnOutcome};
use super::model::{ComposeSession, Stage};
use super::question::{fold, normalize_questions};
use crate::error::{DocflowError, Result};
use crate::oracle::Oracle;
use crate::store::DocumentStore;
use crate::template::Template;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Detects utterances that are themselves questions rather than answers.
static QUESTION_TRIGGERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(what|which|how)\b|무엇|뭐예요|뭔가요|어떻게|어떤|필수|항목|field|가이드|guide")
        .expect("question trigger pattern is valid")
});

/// Subset of triggers answerable from the template itself, without the
/// oracle.
static META_TRIGGERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)필수|항목|field|가이드|guide|required").expect("meta trigger pattern is valid")
});

/// Drives a [`ComposeSession`] across turns.
///
/// Holds no per-session state of its own; the oracle and store are injected
/// so tests can script them.
pub struct ComposeMachine {
    oracle: Arc<dyn Oracle>,
    store: Arc<dyn DocumentStore>,
}

impl ComposeMachine {
    /// Creates a machine over the given oracle and store backends.
    pub fn new(oracle: Arc<dyn Oracle>, store: Arc<dyn DocumentStore>) -> Self {
        Self { oracle, store }
    }

    /// Processes one inbound event as one atomic turn.
    ///
    /// # Errors
    ///
    /// Only store-write failures during submission and misrouted button
    /// events return `Err`; everything oracle-facing degrades in-band.
    pub async fn handle_event(
        &self,
        session: &mut ComposeSession,
        event: ComposeEvent,
    ) -> Result<TurnOutcome> {
        match event {
            ComposeEvent::Utterance { content } => self.handle_utterance(session, content).await,
            ComposeEvent::Restart => {
                debug!(session_id = %session.id, "restarting session");
                session.reset();
                Ok(TurnOutcome::Continue)
            }
            ComposeEvent::Submit {
                creator_id,
                assignee_id,
                due_date,
            } => {
                self.handle_submit(session, &creator_id, &assignee_id, &due_date)
                    .await
            }
            ComposeEvent::Edit { instruction } => self.handle_edit(session, &instruction).await,
            ComposeEvent::ReviseRemaining => self.handle_revise(session).await,
        }
    }

    async fn handle_utterance(
        &self,
        session: &mut ComposeSession,
        content: String,
    ) -> Result<TurnOutcome> {
        match session.stage {
            Stage::Initial | Stage::Submitted => self.handle_initial(session, &content).await,
            Stage::Gathering => self.handle_gathering(session, &content).await,
            Stage::Confirm => self.handle_confirm_utterance(session, &content).await,
        }
    }

    // ------------------------------------------------------------------
    // initial: resolve the document type, extract, seed the question queue
    // ------------------------------------------------------------------

    async fn handle_initial(
        &self,
        session: &mut ComposeSession,
        content: &str,
    ) -> Result<TurnOutcome> {
        session.push_user(content);

        let templates = match self.store.get_templates().await {
            Ok(templates) => templates,
            Err(err) => {
                warn!(session_id = %session.id, error = %err, "template listing failed");
                session.push_assistant("템플릿 목록을 불러오지 못했습니다. 잠시 후 다시 시도해주세요.");
                return Ok(TurnOutcome::Continue);
            }
        };
        let candidates: Vec<String> = templates.iter().map(|t| t.doc_type.clone()).collect();

        // Prefill (rejected-request rewrite) overrides classification.
        let prefill = session.prefill.clone().unwrap_or_default();
        let doc_type = match prefill.doc_type.clone() {
            Some(doc_type) => doc_type,
            None => match self.classify_with_fallback(content, &candidates).await {
                Some(doc_type) => doc_type,
                None => {
                    session.push_assistant(
                        "어떤 문서인지 파악하지 못했습니다. 문서 종류를 포함해 다시 말씀해주세요.",
                    );
                    return Ok(TurnOutcome::Continue);
                }
            },
        };

        let template = match self.store.get_template_by_type(&doc_type).await {
            Ok(Some(template)) => template,
            Ok(None) => {
                // Recoverable: the session stays valid for a fresh utterance.
                session.push_assistant(format!(
                    "'{doc_type}'에 해당하는 템플릿을 찾지 못했습니다. 관리자에게 문의하세요."
                ));
                return Ok(TurnOutcome::Continue);
            }
            Err(err) => {
                warn!(session_id = %session.id, error = %err, "template lookup failed");
                session.push_assistant(format!(
                    "'{doc_type}' 템플릿 조회 중 오류가 발생했습니다. 잠시 후 다시 시도해주세요."
                ));
                return Ok(TurnOutcome::Continue);
            }
        };

        let report = match self.oracle.extract_and_ask(content, &template).await {
            Ok(report) => report,
            Err(err) => {
                warn!(session_id = %session.id, error = %err, "extraction degraded to empty");
                Default::default()
            }
        };

        let mut filled = report.filled_fields;
        // Prefill wins over oracle extraction, applied after.
        filled.extend(prefill.filled_fields.clone());

        let field_keys: Vec<String> = template.resolved_fields().to_vec();
        let remaining: Vec<String> = field_keys
            .iter()
            .filter(|key| !filled.contains_key(*key))
            .cloned()
            .collect();

        session.questions_to_ask =
            normalize_questions(&field_keys, &remaining, report.ask).into();
        session.filled_fields = filled;
        session.template = Some(template);
        session.prefill = None;

        session.push_assistant(format!("네, **{doc_type}** 작성을 시작하겠습니다."));
        debug!(
            session_id = %session.id,
            doc_type = %doc_type,
            queued = session.questions_to_ask.len(),
            "initial turn resolved"
        );

        self.advance(session).await;
        Ok(TurnOutcome::Continue)
    }

    /// Validates the oracle's classification against the candidate set,
    /// falling back to a keyword match on the utterance.
    async fn classify_with_fallback(
        &self,
        utterance: &str,
        candidates: &[String],
    ) -> Option<String> {
        let answer = match self.oracle.classify(utterance, candidates).await {
            Ok(answer) => answer.trim().to_string(),
            Err(err) => {
                warn!(error = %err, "classification call failed, using keyword fallback");
                String::new()
            }
        };

        if !answer.is_empty() && candidates.iter().any(|c| *c == answer) {
            return Some(answer);
        }

        let folded_utterance = fold(utterance);
        candidates
            .iter()
            .find(|c| folded_utterance.contains(&fold(c)))
            .cloned()
    }

    // ------------------------------------------------------------------
    // gathering: bind the answer, then ask the next question
    // ------------------------------------------------------------------

    async fn handle_gathering(
        &self,
        session: &mut ComposeSession,
        content: &str,
    ) -> Result<TurnOutcome> {
        session.push_user(content);

        // A side question defers the pending field slot instead of consuming
        // it: answer out-of-band and leave last_asked live.
        if is_side_question(content) {
            let answer = self.answer_side_question(session, content).await;
            session.push_assistant(answer);
            return Ok(TurnOutcome::Continue);
        }

        // Bind the utterance to the slot we asked for, exactly once per
        // turn, before computing the next question.
        let key = session
            .last_asked
            .clone()
            .or_else(|| session.next_unfilled());
        if let Some(key) = key {
            session
                .filled_fields
                .insert(key.clone(), content.trim().to_string());
            debug!(session_id = %session.id, field = %key, "field bound");
        }

        self.advance(session).await;
        Ok(TurnOutcome::Continue)
    }

    /// Pops the next queued question, falls back to a default question for
    /// the next unfilled field, or enters the confirm stage.
    async fn advance(&self, session: &mut ComposeSession) {
        if let Some(next) = session.questions_to_ask.pop_front() {
            session.last_asked = Some(next.key);
            session.push_assistant(next.question);
            session.stage = Stage::Gathering;
            return;
        }

        if let Some(key) = session.next_unfilled() {
            session.push_assistant(default_question(&key));
            session.last_asked = Some(key);
            session.stage = Stage::Gathering;
            return;
        }

        self.enter_confirm(session).await;
    }

    /// Answers a mid-form side question without advancing the queue.
    async fn answer_side_question(&self, session: &ComposeSession, content: &str) -> String {
        if META_TRIGGERS.is_match(content) {
            if let Some(template) = &session.template {
                return introspection_answer(template, &session.filled_fields);
            }
        }

        let context = match &session.template {
            Some(template) => format!(
                "현재 '{}' 문서를 작성 중입니다. 남은 항목: {}",
                template.doc_type,
                join_or_none(&session.unfilled_fields()),
            ),
            None => "문서 작성 대화 중입니다.".to_string(),
        };

        match self.oracle.answer_freeform(content, &context).await {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) | Err(_) => {
                "질문에 대한 답을 찾지 못했습니다. 계속해서 항목을 입력해주세요.".to_string()
            }
        }
    }

    // ------------------------------------------------------------------
    // confirm: render once, then wait for a button
    // ------------------------------------------------------------------

    async fn enter_confirm(&self, session: &mut ComposeSession) {
        session.stage = Stage::Confirm;
        session.last_asked = None;

        // Latch: the synthesis call fires at most once per entry with a
        // given field map.
        if session.confirm_rendered {
            return;
        }

        let doc_type = session
            .template
            .as_ref()
            .map(|t| t.doc_type.clone())
            .unwrap_or_else(|| "문서".to_string());

        let text = match self
            .oracle
            .render_confirmation(&session.filled_fields, &doc_type)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) | Err(_) => {
                warn!(session_id = %session.id, "confirmation synthesis degraded to local render");
                fallback_confirm_text(&session.filled_fields)
            }
        };

        session.confirm_text = Some(text.clone());
        session.confirm_rendered = true;
        session.push_assistant(format!(
            "모든 정보가 수집되었습니다. 아래 내용으로 제출할까요?\n\n---\n{text}\n---\n\n하단 버튼을 눌러주세요."
        ));
        debug!(session_id = %session.id, "entered confirm stage");
    }

    async fn handle_confirm_utterance(
        &self,
        session: &mut ComposeSession,
        content: &str,
    ) -> Result<TurnOutcome> {
        session.push_user(content);

        if is_side_question(content) {
            let answer = self.answer_side_question(session, content).await;
            session.push_assistant(answer);
        } else {
            session.push_assistant(
                "확인 단계입니다. 하단 버튼으로 제출, 수정 또는 다시 시작을 선택해주세요.",
            );
        }
        Ok(TurnOutcome::Continue)
    }

    // ------------------------------------------------------------------
    // edit / revise / submit
    // ------------------------------------------------------------------

    async fn handle_edit(
        &self,
        session: &mut ComposeSession,
        instruction: &str,
    ) -> Result<TurnOutcome> {
        if session.stage != Stage::Confirm {
            return Err(DocflowError::internal("edit received outside confirm stage"));
        }

        session.push_user(instruction);

        match self
            .oracle
            .apply_field_edit(&session.filled_fields, instruction)
            .await
        {
            Ok(edit) => {
                // Overwrite, not merge; any key is allowed, on- or
                // off-template.
                session
                    .filled_fields
                    .insert(edit.key.clone(), edit.value.clone());
                session.push_assistant(format!(
                    "✅ '{}' 값이 '{}'(으)로 수정되었습니다.",
                    edit.key, edit.value
                ));
                // The field map changed, so the confirmation must be
                // re-synthesized.
                session.confirm_rendered = false;
                session.confirm_text = None;
                self.enter_confirm(session).await;
            }
            Err(err) => {
                warn!(session_id = %session.id, error = %err, "edit extraction failed");
                session.push_assistant("수정 내용을 해석하지 못했습니다. 다시 시도해주세요.");
            }
        }

        Ok(TurnOutcome::Continue)
    }

    async fn handle_revise(&self, session: &mut ComposeSession) -> Result<TurnOutcome> {
        if session.stage != Stage::Confirm {
            return Err(DocflowError::internal(
                "revise received outside confirm stage",
            ));
        }

        let unfilled = session.unfilled_fields();
        if unfilled.is_empty() {
            session.push_assistant("남은 항목이 없습니다. 일부 수정은 '수정' 버튼을 이용해주세요.");
            return Ok(TurnOutcome::Continue);
        }

        session.questions_to_ask = unfilled
            .iter()
            .map(|key| super::question::QuestionItem {
                key: key.clone(),
                question: default_question(key),
            })
            .collect();
        session.confirm_rendered = false;
        session.confirm_text = None;

        self.advance(session).await;
        Ok(TurnOutcome::Continue)
    }

    async fn handle_submit(
        &self,
        session: &mut ComposeSession,
        creator_id: &str,
        assignee_id: &str,
        due_date: &str,
    ) -> Result<TurnOutcome> {
        if session.stage != Stage::Confirm {
            return Err(DocflowError::internal(
                "submit received outside confirm stage",
            ));
        }
        let confirm_text = session
            .confirm_text
            .clone()
            .ok_or_else(|| DocflowError::internal("confirm stage without confirm text"))?;
        let doc_type = session
            .template
            .as_ref()
            .map(|t| t.doc_type.clone())
            .ok_or_else(|| DocflowError::internal("confirm stage without template"))?;

        // Store failures here propagate without touching the session, so
        // collected fields survive for a retry.
        let missing = session.unfilled_fields();
        let draft_id = self
            .store
            .create_draft(
                creator_id,
                &doc_type,
                &session.filled_fields,
                &missing,
                &confirm_text,
            )
            .await
            .map_err(|err| DocflowError::store(err.to_string()))?;

        let approval_id = self
            .store
            .submit_draft(&draft_id, &confirm_text, assignee_id, due_date, creator_id)
            .await
            .map_err(|err| DocflowError::store(err.to_string()))?;

        debug!(
            session_id = %session.id,
            draft_id = %draft_id,
            approval_id = %approval_id,
            "request submitted"
        );

        session.stage = Stage::Submitted;
        session.reset();

        Ok(TurnOutcome::Submitted {
            draft_id,
            approval_id,
        })
    }
}

/// True when the utterance reads as a question rather than a field answer.
fn is_side_question(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.ends_with('?') || trimmed.ends_with('？') || QUESTION_TRIGGERS.is_match(trimmed)
}

fn default_question(key: &str) -> String {
    format!("'{key}' 값을 알려주세요.")
}

/// Answers template meta-questions from local state, without the oracle.
fn introspection_answer(template: &Template, filled: &HashMap<String, String>) -> String {
    let required = template.resolved_fields();
    let filled_keys: Vec<String> = required
        .iter()
        .filter(|key| filled.contains_key(*key))
        .cloned()
        .collect();
    let missing = template.unfilled_fields(filled);

    let mut lines = vec![
        format!("필수 항목: {}", join_or_none(required)),
        format!("입력된 항목: {}", join_or_none(&filled_keys)),
        format!("남은 항목: {}", join_or_none(&missing)),
    ];
    if let Some(guide) = &template.guide_md {
        lines.push(format!("작성 가이드:\n{guide}"));
    }
    lines.join("\n")
}

fn join_or_none(keys: &[String]) -> String {
    if keys.is_empty() {
        "없음".to_string()
    } else {
        keys.join(", ")
    }
}

fn fallback_confirm_text(filled: &HashMap<String, String>) -> String {
    let mut text = String::from("다음과 같이 확인되었습니다:\n");
    let mut entries: Vec<_> = filled.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in entries {
        text.push_str(&format!("- {key}: {value}\n"));
    }
    text
}

#[cfg(test)]
#[path = "machine_test.rs"]
mod machine_test;
