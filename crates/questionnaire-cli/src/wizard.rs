use serde_json::Value;

use questionnaire_spec::{AnswerStore, QuestionSchema, Respondent};

/// Controls which bits of state the fill wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: prompts only.
    Clean,
    /// Verbose output: per-respondent progress and stale-key warnings.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts while the wizard walks the questionnaire.
pub struct FillPresenter {
    verbosity: Verbosity,
    current_section: Option<usize>,
}

impl FillPresenter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            current_section: None,
        }
    }

    pub fn show_header(&self, payload: &FillPayload) {
        println!("Form: {}", payload.title);
        println!("Press Enter to keep the current answer, type 'exit' to abort.");
    }

    pub fn show_respondent(&mut self, respondent: Respondent, answered: usize, total: usize) {
        self.current_section = None;
        println!();
        println!("== {} ==", respondent.label());
        if self.verbosity.is_verbose() {
            println!("Answered: {}/{}", answered, total);
        }
    }

    pub fn show_prompt(&mut self, prompt: &PromptContext) {
        if self.current_section != Some(prompt.section) {
            println!();
            println!("{}", prompt.section_title);
            self.current_section = Some(prompt.section);
        }
        println!("{}/{} {}", prompt.index, prompt.total, prompt.label);
        if !prompt.current.is_empty() {
            println!("  Current: {}", prompt.current);
        }
    }

    pub fn show_stale_keys(&self, respondent: Respondent, keys: &[&str]) {
        if self.verbosity.is_verbose() && !keys.is_empty() {
            println!(
                "{} has {} answer(s) for questions no longer asked; they are kept: {}",
                respondent.label(),
                keys.len(),
                keys.join(", ")
            );
        }
    }

    pub fn show_completion(&self, schema: &QuestionSchema, store: &AnswerStore) {
        println!("Done ✅");
        let total = schema.keys().count();
        for respondent in Respondent::ALL {
            println!(
                "{}: {}/{} answered",
                respondent.label(),
                store.answered_count(schema, respondent),
                total
            );
        }
    }
}

/// Questionnaire layout extracted from the component `describe` output.
pub struct FillPayload {
    pub title: String,
    pub section_titles: Vec<String>,
    pub keys: Vec<KeyEntry>,
}

impl FillPayload {
    pub fn from_json(json: &Value) -> Result<Self, String> {
        let schema = json
            .get("schema")
            .and_then(Value::as_object)
            .ok_or_else(|| "describe payload missing schema".to_string())?;
        let title = schema
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let section_titles = schema
            .get("sections")
            .and_then(Value::as_array)
            .ok_or_else(|| "describe payload missing sections".to_string())?
            .iter()
            .map(|section| {
                section
                    .get("title")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .ok_or_else(|| "section missing title".to_string())
            })
            .collect::<Result<_, _>>()?;
        let keys = json
            .get("keys")
            .and_then(Value::as_array)
            .ok_or_else(|| "describe payload missing keys".to_string())?
            .iter()
            .map(KeyEntry::from_json)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            title,
            section_titles,
            keys,
        })
    }
}

/// One answer slot: a question or a section comment.
pub struct KeyEntry {
    pub section: usize,
    pub name: String,
    pub is_comment: bool,
}

impl KeyEntry {
    fn from_json(value: &Value) -> Result<Self, String> {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "key missing name".to_string())?
            .to_string();
        let section = value
            .get("section")
            .and_then(Value::as_u64)
            .ok_or_else(|| format!("key '{}' missing section", name))? as usize;
        let is_comment = value.get("kind").and_then(Value::as_str) == Some("section_comment");
        Ok(Self {
            section,
            name,
            is_comment,
        })
    }

    pub fn label(&self) -> &str {
        if self.is_comment {
            "Additional Comments"
        } else {
            &self.name
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub section: usize,
    pub section_title: String,
    pub label: String,
    pub current: String,
}

impl PromptContext {
    pub fn new(payload: &FillPayload, position: usize, current: &str) -> Option<Self> {
        let entry = payload.keys.get(position)?;
        Some(Self {
            index: position + 1,
            total: payload.keys.len(),
            section: entry.section,
            section_title: payload
                .section_titles
                .get(entry.section)
                .cloned()
                .unwrap_or_default(),
            label: entry.label().to_string(),
            current: current.to_string(),
        })
    }
}
