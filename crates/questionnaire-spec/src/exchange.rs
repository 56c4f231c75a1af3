//! JSON exchange codec.
//!
//! Exports are the answer store serialized as JSON, then base64-wrapped so
//! non-ASCII answers survive plain-text save paths. Imports accept both the
//! wrapped form and plain JSON written by older exports.

use std::collections::BTreeMap;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD as B64};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::store::{AnswerStore, ResponseMap};

/// Decoder for hand-carried exports: padding optional, stray trailing bits ignored.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Why one decoding attempt could not produce a JSON document.
#[derive(Debug, Error)]
pub enum DecodeFailure {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raised when an imported file cannot be turned into an [`AnswerStore`].
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file is neither a wrapped export ({wrapped}) nor plain JSON ({plain})")]
    Unreadable {
        wrapped: DecodeFailure,
        plain: DecodeFailure,
    },
    #[error("imported answers have the wrong shape at '{path}': expected {expected}")]
    Shape { path: String, expected: &'static str },
}

enum AttemptError {
    Decode(DecodeFailure),
    Shape { path: String, expected: &'static str },
}

impl From<base64::DecodeError> for AttemptError {
    fn from(err: base64::DecodeError) -> Self {
        AttemptError::Decode(err.into())
    }
}

impl From<std::string::FromUtf8Error> for AttemptError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        AttemptError::Decode(err.into())
    }
}

impl From<serde_json::Error> for AttemptError {
    fn from(err: serde_json::Error) -> Self {
        AttemptError::Decode(err.into())
    }
}

/// Serialize every respondent and entry, unfiltered, then base64-wrap the UTF-8 bytes.
pub fn encode_json(store: &AnswerStore) -> Vec<u8> {
    let json = json!(store).to_string();
    B64.encode(json.as_bytes()).into_bytes()
}

/// Legacy, unwrapped export: pretty-printed JSON.
pub fn encode_json_plain(store: &AnswerStore) -> Vec<u8> {
    format!("{:#}", json!(store)).into_bytes()
}

/// Decode a wrapped export, falling back to plain JSON for older files.
pub fn decode_json(input: &[u8]) -> Result<AnswerStore, ImportError> {
    let wrapped = match decode_wrapped(input) {
        Ok(store) => {
            debug!(respondents = store.responses().len(), "imported wrapped answers");
            return Ok(store);
        }
        Err(err) => err,
    };
    let plain = match decode_plain(input) {
        Ok(store) => {
            debug!(respondents = store.responses().len(), "imported plain JSON answers");
            return Ok(store);
        }
        Err(err) => err,
    };

    match (wrapped, plain) {
        (_, AttemptError::Shape { path, expected }) | (AttemptError::Shape { path, expected }, _) => {
            Err(ImportError::Shape { path, expected })
        }
        (AttemptError::Decode(wrapped), AttemptError::Decode(plain)) => {
            Err(ImportError::Unreadable { wrapped, plain })
        }
    }
}

/// Replace `store` with the decoded answers; on error `store` is left untouched.
pub fn decode_json_into(input: &[u8], store: &mut AnswerStore) -> Result<(), ImportError> {
    *store = decode_json(input)?;
    Ok(())
}

/// Whitespace anywhere in the payload is ignored, so line-wrapped exports decode.
fn decode_wrapped(input: &[u8]) -> Result<AnswerStore, AttemptError> {
    let compact = input
        .iter()
        .copied()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect::<Vec<_>>();
    let bytes = LENIENT.decode(compact)?;
    let text = String::from_utf8(without_bom(&bytes).to_vec())?;
    let value: Value = serde_json::from_str(&text)?;
    store_from_value(&value)
}

fn decode_plain(input: &[u8]) -> Result<AnswerStore, AttemptError> {
    let text = String::from_utf8(without_bom(input).to_vec())?;
    let value: Value = serde_json::from_str(&text)?;
    store_from_value(&value)
}

fn store_from_value(value: &Value) -> Result<AnswerStore, AttemptError> {
    let object = value.as_object().ok_or_else(|| AttemptError::Shape {
        path: String::new(),
        expected: "an object keyed by respondent",
    })?;

    let mut responses = BTreeMap::new();
    for (respondent, entries) in object {
        let respondent_path = format!("/{}", escape_pointer(respondent));
        let entries = entries.as_object().ok_or_else(|| AttemptError::Shape {
            path: respondent_path.clone(),
            expected: "an object of answers",
        })?;
        let mut map = ResponseMap::new();
        for (key, answer) in entries {
            let text = answer.as_str().ok_or_else(|| AttemptError::Shape {
                path: format!("{}/{}", respondent_path, escape_pointer(key)),
                expected: "a string answer",
            })?;
            map.insert(key.clone(), text.to_string());
        }
        responses.insert(respondent.clone(), map);
    }
    Ok(AnswerStore::from_responses(responses))
}

fn without_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
