use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use questionnaire_spec::{
    AnswerKey, AnswerStore, ExportFormat, ExportOptions, ImportError, QuestionSchema, Respondent,
    SchemaError, TextLayout, UnknownRespondent, build_rows as qa_build_rows, decode_json,
    export as qa_export,
};

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("failed to parse answers: {0}")]
    AnswersParse(#[source] serde_json::Error),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Respondent(#[from] UnknownRespondent),
    #[error("unknown export format '{0}'")]
    Format(String),
    #[error("unknown text layout '{0}'")]
    Layout(String),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    schema_json: Option<String>,
    #[serde(default)]
    rows_per_page: Option<usize>,
}

fn parse_config(config_json: &str) -> Result<ComponentConfig, ComponentError> {
    if config_json.trim().is_empty() {
        Ok(ComponentConfig::default())
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)
    }
}

fn load_schema(config: &ComponentConfig) -> Result<QuestionSchema, ComponentError> {
    let schema = match config.schema_json.as_deref() {
        Some(json) => QuestionSchema::from_json(json)?,
        None => QuestionSchema::builtin()?,
    };
    Ok(schema)
}

fn parse_answers(answers_json: &str) -> Result<AnswerStore, ComponentError> {
    if answers_json.trim().is_empty() {
        return Ok(AnswerStore::new());
    }
    serde_json::from_str(answers_json).map_err(ComponentError::AnswersParse)
}

fn store_value(store: &AnswerStore) -> Result<Value, ComponentError> {
    serde_json::to_value(store).map_err(ComponentError::JsonEncode)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => value.to_string(),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn key_entry(schema: &QuestionSchema, key: AnswerKey) -> Value {
    let mut entry = serde_json::to_value(key).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut entry {
        map.insert(
            "name".into(),
            schema.key_name(key).map(Value::String).unwrap_or(Value::Null),
        );
    }
    entry
}

/// Schema plus every answer key in display order, for the host UI to lay out its inputs.
pub fn describe(config_json: &str) -> String {
    respond(parse_config(config_json).and_then(|config| {
        let schema = load_schema(&config)?;
        let keys = schema
            .keys()
            .map(|key| key_entry(&schema, key))
            .collect::<Vec<_>>();
        let respondents = Respondent::ALL
            .iter()
            .map(|respondent| json!({ "id": respondent.id(), "label": respondent.label() }))
            .collect::<Vec<_>>();
        Ok(json!({
            "schema": serde_json::to_value(&schema).map_err(ComponentError::JsonEncode)?,
            "respondents": respondents,
            "keys": keys,
        }))
    }))
}

/// Answer store for a fresh session.
pub fn empty_answers() -> String {
    respond(store_value(&AnswerStore::new()))
}

/// Returns the answers with one entry replaced; the input JSON is not modified.
pub fn update_answer(answers_json: &str, respondent: &str, key: &str, value: &str) -> String {
    respond(parse_answers(answers_json).and_then(|store| {
        let respondent: Respondent = respondent.parse()?;
        store_value(&store.with_answer(respondent, key, value))
    }))
}

fn parse_format(format: &str) -> Result<ExportFormat, ComponentError> {
    ExportFormat::from_label(format).ok_or_else(|| ComponentError::Format(format.to_string()))
}

fn parse_layout(layout: &str) -> Result<TextLayout, ComponentError> {
    if layout.trim().is_empty() {
        return Ok(TextLayout::default());
    }
    TextLayout::from_label(layout).ok_or_else(|| ComponentError::Layout(layout.to_string()))
}

/// Export the answers; `content` is UTF-8 text, or base64 when the bytes are not text.
pub fn export(config_json: &str, answers_json: &str, format: &str, layout: &str) -> String {
    respond(parse_config(config_json).and_then(|config| {
        let schema = load_schema(&config)?;
        let store = parse_answers(answers_json)?;
        let mut options = ExportOptions {
            layout: parse_layout(layout)?,
            ..ExportOptions::default()
        };
        if let Some(rows_per_page) = config.rows_per_page {
            options.rows_per_page = rows_per_page;
        }
        let artifact = qa_export(&schema, &store, parse_format(format)?, options);
        let (encoding, content) = match String::from_utf8(artifact.bytes) {
            Ok(text) => ("utf8", text),
            Err(err) => ("base64", B64.encode(err.into_bytes())),
        };
        Ok(json!({
            "file_name": artifact.file_name,
            "format": artifact.format,
            "encoding": encoding,
            "content": content,
        }))
    }))
}

/// Table rows shared by the PDF and DOCX collaborators.
pub fn build_rows(config_json: &str, answers_json: &str) -> String {
    respond(parse_config(config_json).and_then(|config| {
        let schema = load_schema(&config)?;
        let store = parse_answers(answers_json)?;
        let rows = qa_build_rows(&schema, &store)
            .iter()
            .map(|row| json!({ "kind": row.kind.as_str(), "cells": row.cells() }))
            .collect::<Vec<_>>();
        Ok(Value::Array(rows))
    }))
}

fn import_failure(err: &ImportError, current: Value) -> Value {
    json!({
        "status": "error",
        "error": err.to_string(),
        "answers": current,
    })
}

/// Decode an imported file. On failure the current answers are echoed back unchanged.
pub fn import_answers(payload: &str, current_answers_json: &str) -> String {
    respond(parse_answers(current_answers_json).and_then(|current| {
        match decode_json(payload.as_bytes()) {
            Ok(store) => Ok(json!({
                "status": "imported",
                "answers": store_value(&store)?,
            })),
            Err(err) => {
                warn!(error = %err, "import rejected; keeping current answers");
                Ok(import_failure(&err, store_value(&current)?))
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn small_config() -> String {
        let schema = json!({
            "title": "Test Form",
            "file_stem": "Test_Form",
            "sections": [
                { "title": "Test", "questions": ["Q1?"] }
            ]
        });
        json!({ "schema_json": schema.to_string() }).to_string()
    }

    fn parse(output: &str) -> Value {
        serde_json::from_str(output).expect("json")
    }

    #[test]
    fn describe_defaults_to_builtin_schema() {
        let parsed = parse(&describe(""));
        assert_eq!(parsed["schema"]["title"], "Alimony Questionnaire");
        assert_eq!(parsed["schema"]["sections"].as_array().map(Vec::len), Some(7));
        assert_eq!(parsed["respondents"][1]["label"], "Spouse 2");
        assert_eq!(parsed["keys"].as_array().map(Vec::len), Some(43));
        assert_eq!(parsed["keys"][0]["kind"], "question");
        assert_eq!(parsed["keys"][0]["name"], "Date of marriage:");
        assert_eq!(parsed["keys"][5]["kind"], "section_comment");
        assert_eq!(parsed["keys"][5]["name"], "1. Marriage and Family Details_comments");
    }

    #[test]
    fn describe_reports_bad_config() {
        let parsed = parse(&describe("{not json"));
        assert!(parsed["error"].as_str().unwrap_or("").contains("config"));
    }

    #[test]
    fn update_answer_returns_new_snapshot() {
        let empty = empty_answers();
        let parsed = parse(&update_answer(&empty, "spouse1", "Q1?", "yes"));
        assert_eq!(parsed["spouse1"]["Q1?"], "yes");
        assert_eq!(parsed["spouse2"], json!({}));

        let parsed = parse(&update_answer(&empty, "spouse9", "Q1?", "yes"));
        assert!(parsed["error"].as_str().unwrap_or("").contains("spouse9"));
    }

    #[test]
    fn export_text_uses_schema_stem() {
        let answers = json!({ "spouse1": { "Q1?": "yes" }, "spouse2": {} }).to_string();
        let parsed = parse(&export(&small_config(), &answers, "text", ""));
        assert_eq!(parsed["file_name"], "Test_Form.txt");
        assert_eq!(parsed["encoding"], "utf8");
        let content = parsed["content"].as_str().expect("content");
        assert!(content.contains("Q1?\nSpouse 1: yes\nSpouse 2: \n"));
    }

    #[test]
    fn export_pdf_hands_over_table_payload() {
        let config = json!({ "rows_per_page": 2 }).to_string();
        let parsed = parse(&export(&config, "", "pdf", ""));
        assert_eq!(parsed["file_name"], "Alimony_Questionnaire.pdf.table.json");
        let table: Value =
            serde_json::from_str(parsed["content"].as_str().expect("content")).expect("table");
        assert_eq!(table["rows_per_page"], 2);
        assert_eq!(table["row_count"], 50);
    }

    #[test]
    fn export_rejects_unknown_format_and_layout() {
        let parsed = parse(&export("", "", "xlsx", ""));
        assert_eq!(parsed["error"], "unknown export format 'xlsx'");
        let parsed = parse(&export("", "", "text", "sideways"));
        assert_eq!(parsed["error"], "unknown text layout 'sideways'");
    }

    #[test]
    fn build_rows_returns_triples() {
        let answers = json!({ "spouse1": { "Q1?": "yes" } }).to_string();
        let parsed = parse(&build_rows(&small_config(), &answers));
        assert_eq!(
            parsed,
            json!([
                { "kind": "section_header", "cells": ["Test", "", ""] },
                { "kind": "question", "cells": ["Q1?", "yes", ""] },
                { "kind": "comments", "cells": ["Additional Comments", "", ""] }
            ])
        );
    }

    #[test]
    fn import_round_trips_json_export() {
        let answers = json!({ "spouse1": { "Q1?": "oui, très bien" }, "spouse2": { "stale": "x" } });
        let exported = parse(&export(&small_config(), &answers.to_string(), "json", ""));
        let payload = exported["content"].as_str().expect("content");

        let parsed = parse(&import_answers(payload, ""));
        assert_eq!(parsed["status"], "imported");
        assert_eq!(parsed["answers"], answers);
    }

    #[test]
    fn failed_import_echoes_current_answers() {
        let current = json!({ "spouse1": { "Q1?": "keep me" }, "spouse2": {} });
        let parsed = parse(&import_answers("%%% definitely not an export", &current.to_string()));
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["answers"], current);
        assert!(parsed["error"].as_str().is_some());
    }
}
