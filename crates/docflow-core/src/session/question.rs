//! Question queue types and normalization.
//!
//! The oracle produces an "ask" list whose items may be bare strings or
//! objects with an optional key. Before the dialogue machine can consume
//! them, every item must be bound to a concrete field key; the rules live in
//! [`normalize_questions`].

use serde::{Deserialize, Serialize};

/// A question bound to the field key it collects.
///
/// Every item leaving the normalizer has a concrete key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionItem {
    /// The field key this question fills.
    pub key: String,
    /// The question text shown to the user.
    pub question: String,
}

/// A raw ask-list item as the oracle produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawQuestion {
    /// Object form, key optional.
    Structured {
        #[serde(default)]
        key: Option<String>,
        question: String,
    },
    /// Bare question string.
    Bare(String),
}

impl RawQuestion {
    fn into_parts(self) -> (Option<String>, String) {
        match self {
            Self::Structured { key, question } => {
                let key = key.filter(|k| !k.trim().is_empty());
                (key, question.trim().to_string())
            }
            Self::Bare(question) => (None, question.trim().to_string()),
        }
    }
}

/// Lowercases and strips all whitespace for loose textual matching.
pub(crate) fn fold(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Assigns a field key to every raw ask item, dropping the unassignable.
///
/// Assignment rules, in order:
/// 1. An explicit key from the oracle wins verbatim, without validation
///    against `field_keys` (the oracle may name a meaningful off-template
///    field).
/// 2. Otherwise, the first key in `field_keys` whose folded text appears
///    inside the folded question text is used. First match wins, not best
///    match.
/// 3. Otherwise, the next still-unassigned key from `remaining` is popped in
///    FIFO order.
/// 4. Items left keyless once `remaining` is exhausted are dropped silently;
///    an under-filled queue is normal downstream.
pub fn normalize_questions(
    field_keys: &[String],
    remaining: &[String],
    raw_items: Vec<RawQuestion>,
) -> Vec<QuestionItem> {
    let mut pool: std::collections::VecDeque<String> = remaining.iter().cloned().collect();
    let mut out = Vec::with_capacity(raw_items.len());

    for raw in raw_items {
        let (explicit, question) = raw.into_parts();

        let key = explicit.or_else(|| {
            let folded_question = fold(&question);
            field_keys
                .iter()
                .find(|key| {
                    let folded_key = fold(key);
                    !folded_key.is_empty() && folded_question.contains(&folded_key)
                })
                .cloned()
        });

        let key = match key {
            Some(key) => {
                pool.retain(|k| *k != key);
                key
            }
            None => match pool.pop_front() {
                Some(key) => key,
                // Remaining list exhausted; drop the item.
                None => continue,
            },
        };

        out.push(QuestionItem { key, question });
    }

    out
}
