use serde::{Deserialize, Serialize};

use crate::spec::{AnswerKey, QuestionSchema};
use crate::store::{AnswerStore, Respondent};

pub const BANNER_RULE: &str = "=============================";
pub const COMMENTS_LABEL: &str = "Additional Comments:";

/// Arrangement of the plain-text export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextLayout {
    /// Each question followed by one `Spouse N: answer` line per respondent.
    #[default]
    Interleaved,
    /// One full block per respondent, answers on the line after each question.
    PerRespondent,
}

impl TextLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextLayout::Interleaved => "interleaved",
            TextLayout::PerRespondent => "per-respondent",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "interleaved" => Some(TextLayout::Interleaved),
            "per-respondent" | "per_respondent" => Some(TextLayout::PerRespondent),
            _ => None,
        }
    }
}

/// Encode the answers as UTF-8 text. Answer text is written verbatim, without escaping.
pub fn encode_text(schema: &QuestionSchema, store: &AnswerStore, layout: TextLayout) -> Vec<u8> {
    render_text(schema, store, layout).into_bytes()
}

pub fn render_text(schema: &QuestionSchema, store: &AnswerStore, layout: TextLayout) -> String {
    match layout {
        TextLayout::Interleaved => render_interleaved(schema, store),
        TextLayout::PerRespondent => render_per_respondent(schema, store),
    }
}

fn banner(out: &mut String, heading: &str) {
    out.push_str(BANNER_RULE);
    out.push('\n');
    out.push_str(heading);
    out.push('\n');
    out.push_str(BANNER_RULE);
    out.push('\n');
}

fn respondent_lines(out: &mut String, schema: &QuestionSchema, store: &AnswerStore, key: AnswerKey) {
    for respondent in Respondent::ALL {
        out.push_str(respondent.label());
        out.push_str(": ");
        out.push_str(store.answer(schema, respondent, key));
        out.push('\n');
    }
}

fn render_interleaved(schema: &QuestionSchema, store: &AnswerStore) -> String {
    let mut out = String::new();
    banner(&mut out, &schema.title);

    for (section_index, section) in schema.sections().iter().enumerate() {
        out.push('\n');
        banner(&mut out, &section.title);

        for (question_index, question) in section.questions.iter().enumerate() {
            out.push('\n');
            out.push_str(question);
            out.push('\n');
            let key = AnswerKey::Question {
                section: section_index,
                question: question_index,
            };
            respondent_lines(&mut out, schema, store, key);
        }

        out.push('\n');
        out.push_str(COMMENTS_LABEL);
        out.push('\n');
        respondent_lines(
            &mut out,
            schema,
            store,
            AnswerKey::SectionComment {
                section: section_index,
            },
        );
    }

    out
}

fn render_per_respondent(schema: &QuestionSchema, store: &AnswerStore) -> String {
    let mut out = String::new();

    for respondent in Respondent::ALL {
        out.push('\n');
        banner(&mut out, &format!("{} Responses", respondent.label()));

        for section in schema.sections() {
            out.push('\n');
            out.push_str(&section.title);
            out.push('\n');
            for question in &section.questions {
                out.push('\n');
                out.push_str(question);
                out.push('\n');
                out.push_str(store.get(respondent, question));
                out.push('\n');
            }
            out.push('\n');
            out.push_str(COMMENTS_LABEL);
            out.push('\n');
            out.push_str(store.get(respondent, &section.comment_key()));
            out.push('\n');
        }
    }

    out
}
