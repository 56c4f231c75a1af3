use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::key::{AnswerKey, COMMENT_SUFFIX};

const BUILTIN_SCHEMA: &str = include_str!("../../fixtures/alimony.json");

pub const DEFAULT_TITLE: &str = "Alimony Questionnaire";
pub const DEFAULT_FILE_STEM: &str = "Alimony_Questionnaire";

/// Errors raised while building or parsing a [`QuestionSchema`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse question schema: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("section #{index} has an empty title")]
    EmptyTitle { index: usize },
    #[error("section title '{0}' is used more than once")]
    DuplicateSection(String),
    #[error("question '{question}' appears more than once in section '{section}'")]
    DuplicateQuestion { section: String, question: String },
}

/// One titled group of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<String>,
}

impl Section {
    pub fn new(title: impl Into<String>, questions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            title: title.into(),
            questions: questions.into_iter().map(Into::into).collect(),
        }
    }

    /// Legacy string key under which a section-level remark is stored.
    pub fn comment_key(&self) -> String {
        format!("{}{}", self.title, COMMENT_SUFFIX)
    }
}

/// Static, ordered questionnaire definition.
///
/// Loaded once and never mutated; every export walks it in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSchema {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
    sections: Vec<Section>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_file_stem() -> String {
    DEFAULT_FILE_STEM.to_string()
}

impl QuestionSchema {
    /// Builds a schema with the default title and file stem.
    pub fn new(sections: Vec<Section>) -> Result<Self, SchemaError> {
        let schema = Self {
            title: default_title(),
            file_stem: default_file_stem(),
            sections,
        };
        schema.check()?;
        Ok(schema)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_file_stem(mut self, stem: impl Into<String>) -> Self {
        self.file_stem = stem.into();
        self
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_str(json).map_err(SchemaError::Parse)?;
        schema.check()?;
        Ok(schema)
    }

    /// The seven-section alimony questionnaire shipped with the crate.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_json(BUILTIN_SCHEMA)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn question_count(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.questions.len())
            .sum()
    }

    /// Every answer key in display order: each section's questions, then its comment key.
    pub fn keys(&self) -> impl Iterator<Item = AnswerKey> + '_ {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(section, entry)| {
                (0..entry.questions.len())
                    .map(move |question| AnswerKey::Question { section, question })
                    .chain(std::iter::once(AnswerKey::SectionComment { section }))
            })
    }

    /// Maps a typed key to the legacy string form stored in exported files.
    pub fn key_name(&self, key: AnswerKey) -> Option<String> {
        match key {
            AnswerKey::Question { section, question } => self
                .sections
                .get(section)
                .and_then(|entry| entry.questions.get(question))
                .cloned(),
            AnswerKey::SectionComment { section } => {
                self.sections.get(section).map(Section::comment_key)
            }
        }
    }

    /// Resolves a legacy string key. Question text wins over a comment key with the same spelling.
    pub fn resolve(&self, name: &str) -> Option<AnswerKey> {
        for (section, entry) in self.sections.iter().enumerate() {
            if let Some(question) = entry.questions.iter().position(|text| text == name) {
                return Some(AnswerKey::Question { section, question });
            }
        }
        let title = name.strip_suffix(COMMENT_SUFFIX)?;
        self.sections
            .iter()
            .position(|entry| entry.title == title)
            .map(|section| AnswerKey::SectionComment { section })
    }

    fn check(&self) -> Result<(), SchemaError> {
        let mut titles = BTreeSet::new();
        for (index, section) in self.sections.iter().enumerate() {
            if section.title.trim().is_empty() {
                return Err(SchemaError::EmptyTitle { index });
            }
            if !titles.insert(section.title.as_str()) {
                return Err(SchemaError::DuplicateSection(section.title.clone()));
            }
            let mut seen = BTreeSet::new();
            for question in &section.questions {
                if !seen.insert(question.as_str()) {
                    return Err(SchemaError::DuplicateQuestion {
                        section: section.title.clone(),
                        question: question.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
