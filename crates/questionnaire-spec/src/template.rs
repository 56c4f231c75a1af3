use handlebars::{Handlebars, no_escape};
use serde_json::{Value, json};
use thiserror::Error;

use crate::spec::{AnswerKey, QuestionSchema};
use crate::store::{AnswerStore, Respondent};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template rendering failed: {0}")]
    Render(#[from] handlebars::RenderError),
}

fn answers_for(schema: &QuestionSchema, store: &AnswerStore, key: AnswerKey) -> Vec<Value> {
    Respondent::ALL
        .iter()
        .map(|respondent| {
            json!({
                "respondent": respondent.id(),
                "label": respondent.label(),
                "value": store.answer(schema, *respondent, key),
            })
        })
        .collect()
}

/// Data handed to user templates.
///
/// `{title, respondents[{id,label}], sections[{title, questions[{text, answers[]}], comments[]}]}`
pub fn template_context(schema: &QuestionSchema, store: &AnswerStore) -> Value {
    let respondents = Respondent::ALL
        .iter()
        .map(|respondent| json!({ "id": respondent.id(), "label": respondent.label() }))
        .collect::<Vec<_>>();

    let sections = schema
        .sections()
        .iter()
        .enumerate()
        .map(|(section_index, section)| {
            let questions = section
                .questions
                .iter()
                .enumerate()
                .map(|(question_index, text)| {
                    let key = AnswerKey::Question {
                        section: section_index,
                        question: question_index,
                    };
                    json!({
                        "text": text,
                        "answers": answers_for(schema, store, key),
                    })
                })
                .collect::<Vec<_>>();
            let comments = answers_for(
                schema,
                store,
                AnswerKey::SectionComment {
                    section: section_index,
                },
            );
            json!({
                "title": section.title,
                "questions": questions,
                "comments": comments,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "title": schema.title,
        "respondents": respondents,
        "sections": sections,
    })
}

/// Render a Handlebars template over the answers. Output is not HTML-escaped.
pub fn render_template(
    template: &str,
    schema: &QuestionSchema,
    store: &AnswerStore,
) -> Result<String, TemplateError> {
    let mut engine = Handlebars::new();
    engine.register_escape_fn(no_escape);
    engine.set_strict_mode(true);
    let rendered = engine.render_template(template, &template_context(schema, store))?;
    Ok(rendered)
}
