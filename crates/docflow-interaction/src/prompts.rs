//! Prompt builders for the Potens oracle.
//!
//! Each function renders one operation's full prompt. Field maps are embedded
//! as JSON so the oracle sees exact keys; output-format blocks ask for bare
//! JSON, and the lenient parser cleans up whatever comes back anyway.

use docflow_core::template::Template;
use std::collections::HashMap;

fn fields_json(filled: &HashMap<String, String>) -> String {
    serde_json::to_string(filled).unwrap_or_else(|_| "{}".to_string())
}

/// Classification: pick one candidate document type for the utterance.
pub fn classify(utterance: &str, candidates: &[String]) -> String {
    format!(
        "## 역할: 당신은 직원의 요청을 듣고 올바른 업무 서식을 찾아주는 AI 비서입니다.\n\n\
         ## 임무: 사용자의 요청이 아래 '선택 가능 서식' 중 어떤 것과 가장 관련이 깊은지 판단하여, 그 서식의 이름 하나만 응답하세요.\n\n\
         ## 선택 가능 서식:\n{}\n\n\
         ## 사용자 요청:\n\"{utterance}\"\n\n\
         ## 출력 규칙:\n\
         - 반드시 '선택 가능 서식'에 있는 이름 중 하나로만 대답해야 합니다.\n\
         - 다른 설명 없이 서식의 이름만 출력하세요.",
        serde_json::to_string(candidates).unwrap_or_default()
    )
}

/// Initial extraction: pull field values out of the first utterance and
/// propose questions for the rest.
pub fn extract_and_ask(utterance: &str, template: &Template) -> String {
    format!(
        "## 역할 및 목표\n\
         당신은 직원의 문서 작성을 돕는 꼼꼼한 AI 어시스턴트입니다. 사용자의 첫 발화에서 가능한 모든 정보를 추출하고, 누락된 필수 필드에 대해 명확한 질문을 생성하세요.\n\n\
         ## 문서 템플릿 정보\n\
         - 종류: \"{doc_type}\"\n\
         - 필수 필드: {fields:?}\n\n\
         ## 사용자 최초 발화\n\"{utterance}\"\n\n\
         ## JSON 출력 형식 (JSON 객체로만 응답)\n\
         {{\n\
           \"filled_fields\": {{ \"필드키\": \"추출한 값\" }},\n\
           \"missing_fields\": [\"누락된 필드키\"],\n\
           \"ask\": [ {{ \"key\": \"누락된 필드키\", \"question\": \"해당 필드에 대한 질문\" }} ]\n\
         }}",
        doc_type = template.doc_type,
        fields = template.resolved_fields(),
    )
}

/// Confirmation synthesis: render the field map as a formal report.
pub fn render_confirmation(filled: &HashMap<String, String>, doc_type: &str) -> String {
    format!(
        "## 역할\n\
         당신은 전문적인 비즈니스 문서 작성가입니다. 정형화된 데이터를 바탕으로 관리자가 승인을 위해 검토할 간결하고 공식적인 '{doc_type}' 보고서를 작성하세요.\n\n\
         ## 원본 데이터\n{data}\n\n\
         ## 작성 규칙\n\
         - 6~10개 문장 내외의 공식적인 보고서 텍스트를 작성하세요.\n\
         - 금액, 기한, 핵심 사유 등 의사결정에 중요한 부분은 굵은 글씨(`**텍스트**`)로 강조하세요.\n\
         - 값이 비어있는 항목은 `[입력 필요]` 라고 명확하게 표시하세요.\n\
         - 출력은 마크다운 본문 텍스트만 포함해야 합니다.",
        data = fields_json(filled),
    )
}

/// Open-domain side question asked mid-form.
pub fn answer_freeform(question: &str, context: &str) -> String {
    format!(
        "## 상황\n{context}\n\n\
         ## 사용자 질문\n\"{question}\"\n\n\
         ## 임무\n위 정보를 참고하여 간결하고 자연스럽게 답변하세요. 답변 후 문서 작성을 이어갈 수 있도록 한 문장으로 마무리하세요."
    )
}

/// Executive summary for the approval inbox.
pub fn summarize_for_approval(confirm_text: &str) -> String {
    format!(
        "## 역할\n당신은 요약 전문가입니다. 업무 보고서를 읽고 바쁜 경영진을 위해 핵심만 요약하세요.\n\n\
         ## 원본 보고서\n{confirm_text}\n\n\
         ## JSON 출력 형식 (JSON 객체로만 응답)\n\
         {{ \"title\": \"짧고 강력한 제목\", \"summary\": \"한두 문장 요약\", \"points\": [\"핵심 포인트 1\", \"핵심 포인트 2\", \"핵심 포인트 3\"] }}"
    )
}

/// Follow-up suggestion after an approval.
pub fn suggest_next_step(doc_type: &str, creator_name: &str) -> String {
    format!(
        "## 상황\n'{creator_name}' 직원이 제출한 '{doc_type}' 요청이 방금 승인되었습니다.\n\n\
         ## 임무\n방금 요청을 승인한 관리자를 위해, 승인 사실과 가장 논리적인 다음 후속 조치를 알려주는 짧은 한 문장의 알림 메시지를 생성하세요."
    )
}

/// Polite rejection notice drafted from the reviewer's memo.
pub fn draft_rejection_note(memo: &str, creator_name: &str, doc_title: &str) -> String {
    format!(
        "## 역할: 당신은 감정적이지 않고 명확하게 의사를 전달하는 중간 관리자입니다.\n\
         ## 임무: 아래 '반려 메모'를 바탕으로, 직원에게 보낼 정중하고 명확한 '반려 사유 안내문'을 작성하세요.\n\n\
         ## 상황 정보\n\
         - 문서 제목: \"{doc_title}\"\n\
         - 작성 직원: \"{creator_name}\"\n\
         - 반려 메모: \"{memo}\"\n\n\
         ## 작성 규칙\n\
         1. 정중하고 부드러운 어조를 사용하세요.\n\
         2. 왜 반려되었는지 메모를 바탕으로 명확하게 설명하세요.\n\
         3. 직원이 다음에 무엇을 해야 하는지 구체적인 행동을 안내하세요.\n\
         4. 2~3 문장으로 간결하게 작성하세요."
    )
}

/// Single-field patch extraction from a free-text edit instruction.
pub fn apply_field_edit(filled: &HashMap<String, String>, instruction: &str) -> String {
    format!(
        "사용자가 문서 내용을 수정하려 합니다.\n\n\
         ## 현재 데이터\n{data}\n\n\
         ## 사용자 요청\n\"{instruction}\"\n\n\
         ## 출력 규칙\n\
         - 반드시 JSON만 출력하세요. (설명, 코드블록, 주석 금지)\n\
         - 형식: {{\"key\": \"필드명\", \"value\": \"새 값\"}}",
        data = fields_json(filled),
    )
}

/// Final completeness check of a rendered confirmation (optional path).
pub fn validate_confirmation(confirm_text: &str, required_fields: &[String]) -> String {
    format!(
        "## 역할: 당신은 매우 꼼꼼한 문서 검수관입니다.\n\
         ## 임무: 아래 보고서 본문을 읽고, '필수 항목'이 모두 채워졌는지, 논리적 오류는 없는지 검증하세요.\n\n\
         ## 보고서 본문:\n{confirm_text}\n\n\
         ## 필수 항목 목록:\n{required_fields:?}\n\n\
         ## JSON 출력 형식 (JSON 객체로만 응답)\n\
         {{ \"is_valid\": true, \"missing\": [\"누락된 필드명\"], \"suggestion\": \"수정 제안 문구\" }}"
    )
}
