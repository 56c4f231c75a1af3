pub mod key;
pub mod schema;

pub use key::{AnswerKey, COMMENT_SUFFIX};
pub use schema::{DEFAULT_FILE_STEM, DEFAULT_TITLE, QuestionSchema, SchemaError, Section};
