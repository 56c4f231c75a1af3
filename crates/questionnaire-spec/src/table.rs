use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::spec::{AnswerKey, QuestionSchema};
use crate::store::{AnswerStore, Respondent};

pub const COMMENTS_ROW_LABEL: &str = "Additional Comments";
pub const QUESTION_COLUMN: &str = "Question";

/// Role of a row inside the exported table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    SectionHeader,
    Question,
    Comments,
}

impl RowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::SectionHeader => "section_header",
            RowKind::Question => "question",
            RowKind::Comments => "comments",
        }
    }
}

/// One (label, spouse 1, spouse 2) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub kind: RowKind,
    pub label: String,
    pub respondent1: String,
    pub respondent2: String,
}

impl TableRow {
    fn header(title: &str) -> Self {
        Self {
            kind: RowKind::SectionHeader,
            label: title.to_string(),
            respondent1: String::new(),
            respondent2: String::new(),
        }
    }

    fn answers(kind: RowKind, label: &str, schema: &QuestionSchema, store: &AnswerStore, key: AnswerKey) -> Self {
        Self {
            kind,
            label: label.to_string(),
            respondent1: store.answer(schema, Respondent::Spouse1, key).to_string(),
            respondent2: store.answer(schema, Respondent::Spouse2, key).to_string(),
        }
    }

    pub fn cells(&self) -> [&str; 3] {
        [
            self.label.as_str(),
            self.respondent1.as_str(),
            self.respondent2.as_str(),
        ]
    }
}

/// Shared input of the PDF table renderer and the DOCX table builder.
///
/// Per section: a header row, one row per question, then the comments row.
pub fn build_rows(schema: &QuestionSchema, store: &AnswerStore) -> Vec<TableRow> {
    let mut rows = Vec::with_capacity(schema.question_count() + 2 * schema.sections().len());
    for (section_index, section) in schema.sections().iter().enumerate() {
        rows.push(TableRow::header(&section.title));
        for (question_index, question) in section.questions.iter().enumerate() {
            let key = AnswerKey::Question {
                section: section_index,
                question: question_index,
            };
            rows.push(TableRow::answers(RowKind::Question, question, schema, store, key));
        }
        let key = AnswerKey::SectionComment {
            section: section_index,
        };
        rows.push(TableRow::answers(RowKind::Comments, COMMENTS_ROW_LABEL, schema, store, key));
    }
    rows
}

/// A page of rows as handed to a page-oriented renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePage {
    pub number: usize,
    pub rows: Vec<TableRow>,
}

/// Titled table with the fixed Question / Spouse 1 / Spouse 2 columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDocument {
    pub title: String,
    pub columns: [String; 3],
    pub rows: Vec<TableRow>,
}

impl TableDocument {
    pub fn new(schema: &QuestionSchema, rows: Vec<TableRow>) -> Self {
        Self {
            title: schema.title.clone(),
            columns: [
                QUESTION_COLUMN.to_string(),
                Respondent::Spouse1.label().to_string(),
                Respondent::Spouse2.label().to_string(),
            ],
            rows,
        }
    }

    pub fn from_store(schema: &QuestionSchema, store: &AnswerStore) -> Self {
        Self::new(schema, build_rows(schema, store))
    }

    /// Splits rows into pages of at most `rows_per_page` (minimum 1).
    ///
    /// A section header is never the last row of a page unless it is alone on it.
    pub fn paginate(&self, rows_per_page: usize) -> Vec<TablePage> {
        let per_page = rows_per_page.max(1);
        let mut pages = Vec::new();
        let mut current: Vec<TableRow> = Vec::with_capacity(per_page.min(self.rows.len()));

        for row in &self.rows {
            current.push(row.clone());
            if current.len() < per_page {
                continue;
            }
            let carried = if per_page > 1
                && current
                    .last()
                    .is_some_and(|last| last.kind == RowKind::SectionHeader)
            {
                current.pop()
            } else {
                None
            };
            pages.push(TablePage {
                number: pages.len() + 1,
                rows: std::mem::take(&mut current),
            });
            current.extend(carried);
        }

        if !current.is_empty() {
            pages.push(TablePage {
                number: pages.len() + 1,
                rows: current,
            });
        }
        pages
    }
}

/// Hand-off payload for the external PDF and DOCX composers.
pub fn render_table_json(document: &TableDocument, rows_per_page: usize) -> Value {
    let pages = document
        .paginate(rows_per_page)
        .iter()
        .map(|page| {
            let rows = page
                .rows
                .iter()
                .map(|row| {
                    json!({
                        "kind": row.kind.as_str(),
                        "cells": row.cells(),
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "number": page.number,
                "rows": rows,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "title": document.title,
        "columns": document.columns,
        "rows_per_page": rows_per_page.max(1),
        "row_count": document.rows.len(),
        "page_count": pages.len(),
        "pages": pages,
    })
}
