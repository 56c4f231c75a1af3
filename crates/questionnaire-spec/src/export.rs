use serde::{Deserialize, Serialize};

use crate::exchange::encode_json;
use crate::spec::QuestionSchema;
use crate::store::AnswerStore;
use crate::table::{TableDocument, render_table_json};
use crate::text::{TextLayout, encode_text};

pub const DEFAULT_ROWS_PER_PAGE: usize = 25;

/// File formats offered by the export menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Text,
    Pdf,
    Docx,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Json => "json",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "text" | "txt" => Some(ExportFormat::Text),
            "pdf" => Some(ExportFormat::Pdf),
            "docx" | "word" => Some(ExportFormat::Docx),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    /// Name of the file the save collaborator should create, e.g. `Alimony_Questionnaire.pdf`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension())
    }

    /// Whether the bytes are produced here or by an external table composer.
    pub fn is_tabular(&self) -> bool {
        matches!(self, ExportFormat::Pdf | ExportFormat::Docx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub layout: TextLayout,
    pub rows_per_page: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            layout: TextLayout::default(),
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
        }
    }
}

/// Bytes ready for a file-save collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Export a snapshot. Never fails: every answer store has a representation in every format.
///
/// PDF and DOCX produce the paginated table payload consumed by the external
/// composers, named `<stem>.<ext>.table.json`.
pub fn export(
    schema: &QuestionSchema,
    store: &AnswerStore,
    format: ExportFormat,
    options: ExportOptions,
) -> ExportArtifact {
    let file_name = format.file_name(&schema.file_stem);
    let (file_name, bytes) = match format {
        ExportFormat::Text => (file_name, encode_text(schema, store, options.layout)),
        ExportFormat::Json => (file_name, encode_json(store)),
        ExportFormat::Pdf | ExportFormat::Docx => {
            let document = TableDocument::from_store(schema, store);
            let payload = render_table_json(&document, options.rows_per_page);
            (
                format!("{}.table.json", file_name),
                format!("{:#}", payload).into_bytes(),
            )
        }
    };
    tracing::debug!(format = format.extension(), file = %file_name, bytes = bytes.len(), "export built");
    ExportArtifact {
        format,
        file_name,
        bytes,
    }
}
