#![allow(missing_docs)]

pub mod exchange;
pub mod export;
pub mod spec;
pub mod store;
pub mod table;
pub mod template;
pub mod text;

pub use exchange::{DecodeFailure, ImportError, decode_json, decode_json_into, encode_json, encode_json_plain};
pub use export::{DEFAULT_ROWS_PER_PAGE, ExportArtifact, ExportFormat, ExportOptions, export};
pub use spec::{AnswerKey, QuestionSchema, SchemaError, Section};
pub use store::{AnswerStore, Respondent, ResponseMap, UnknownRespondent};
pub use table::{RowKind, TableDocument, TablePage, TableRow, build_rows, render_table_json};
pub use template::{TemplateError, render_template, template_context};
pub use text::{TextLayout, encode_text, render_text};
