use serde::{Deserialize, Serialize};

/// Suffix appended to a section title to build its legacy comment key.
pub const COMMENT_SUFFIX: &str = "_comments";

/// Schema-resolved address of one answer.
///
/// Indices point into [`QuestionSchema`](crate::QuestionSchema); the string
/// form only appears at the file-format boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKey {
    Question { section: usize, question: usize },
    SectionComment { section: usize },
}
