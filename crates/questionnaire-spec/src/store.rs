use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::{AnswerKey, QuestionSchema};

/// Free-text answers of one respondent, keyed by question text or section comment key.
pub type ResponseMap = BTreeMap<String, String>;

/// The fixed parties answering the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Respondent {
    Spouse1,
    Spouse2,
}

impl Respondent {
    /// Export order.
    pub const ALL: [Respondent; 2] = [Respondent::Spouse1, Respondent::Spouse2];

    pub fn id(&self) -> &'static str {
        match self {
            Respondent::Spouse1 => "spouse1",
            Respondent::Spouse2 => "spouse2",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Respondent::Spouse1 => "Spouse 1",
            Respondent::Spouse2 => "Spouse 2",
        }
    }
}

impl fmt::Display for Respondent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Error)]
#[error("unknown respondent '{0}' (expected spouse1 or spouse2)")]
pub struct UnknownRespondent(pub String);

impl FromStr for Respondent {
    type Err = UnknownRespondent;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "spouse1" | "spouse 1" | "1" => Ok(Respondent::Spouse1),
            "spouse2" | "spouse 2" | "2" => Ok(Respondent::Spouse2),
            _ => Err(UnknownRespondent(value.to_string())),
        }
    }
}

/// Snapshot of every collected answer.
///
/// Respondent ids are kept as strings so that unknown respondents and stale
/// keys from older files survive an import/export round trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AnswerStore {
    responses: BTreeMap<String, ResponseMap>,
}

impl AnswerStore {
    /// Session-start store: both respondents present with no answers.
    pub fn new() -> Self {
        let responses = Respondent::ALL
            .iter()
            .map(|respondent| (respondent.id().to_string(), ResponseMap::new()))
            .collect();
        Self { responses }
    }

    pub fn from_responses(responses: BTreeMap<String, ResponseMap>) -> Self {
        Self { responses }
    }

    pub fn responses(&self) -> &BTreeMap<String, ResponseMap> {
        &self.responses
    }

    pub fn into_responses(self) -> BTreeMap<String, ResponseMap> {
        self.responses
    }

    pub fn respondent(&self, id: &str) -> Option<&ResponseMap> {
        self.responses.get(id)
    }

    /// Raw lookup by legacy string key; absent respondents and keys read as empty.
    pub fn get(&self, respondent: Respondent, key: &str) -> &str {
        self.responses
            .get(respondent.id())
            .and_then(|map| map.get(key))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Lookup by typed key. Keys that do not resolve against `schema` read as empty.
    pub fn answer(&self, schema: &QuestionSchema, respondent: Respondent, key: AnswerKey) -> &str {
        match schema.key_name(key) {
            Some(name) => self.get(respondent, &name),
            None => "",
        }
    }

    /// Returns a new snapshot with one entry replaced.
    pub fn with_answer(
        &self,
        respondent: Respondent,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut next = self.clone();
        next.responses
            .entry(respondent.id().to_string())
            .or_default()
            .insert(key.into(), value.into());
        next
    }

    /// Typed variant of [`with_answer`](Self::with_answer); `None` when `key` is not in `schema`.
    pub fn with_answer_for(
        &self,
        schema: &QuestionSchema,
        respondent: Respondent,
        key: AnswerKey,
        value: impl Into<String>,
    ) -> Option<Self> {
        let name = schema.key_name(key)?;
        Some(self.with_answer(respondent, name, value))
    }

    pub fn answered_count(&self, schema: &QuestionSchema, respondent: Respondent) -> usize {
        schema
            .keys()
            .filter(|key| !self.answer(schema, respondent, *key).is_empty())
            .count()
    }

    /// Keys held for `respondent` that no longer exist in `schema`.
    pub fn stale_keys<'a>(&'a self, schema: &QuestionSchema, respondent: &str) -> Vec<&'a str> {
        self.responses
            .get(respondent)
            .map(|map| {
                map.keys()
                    .filter(|key| schema.resolve(key).is_none())
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }
}
