mod output;
mod wizard;

use clap::{Parser, Subcommand, ValueEnum};
use component_questionnaire::{describe, update_answer};
use questionnaire_spec::{
    AnswerStore, DEFAULT_ROWS_PER_PAGE, ExportFormat, ExportOptions, QuestionSchema, Respondent,
    TextLayout, decode_json, encode_json, encode_json_plain, export, render_template,
};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use output::{WriteRoots, output_dir};
use wizard::{FillPayload, FillPresenter, PromptContext, Verbosity};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Alimony questionnaire CLI",
    long_about = "Fill in the alimony questionnaire for both spouses, export it as text, JSON, or table payloads for PDF/DOCX composers, and import earlier JSON exports"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    Text,
    Pdf,
    Docx,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => ExportFormat::Text,
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Docx => ExportFormat::Docx,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LayoutArg {
    Interleaved,
    PerRespondent,
}

impl From<LayoutArg> for TextLayout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Interleaved => TextLayout::Interleaved,
            LayoutArg::PerRespondent => TextLayout::PerRespondent,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Answer the questionnaire interactively for both spouses.
    Fill {
        /// Existing answers (JSON export, wrapped or plain) to start from.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Question schema JSON; defaults to the built-in alimony questionnaire.
        #[arg(long, value_name = "SCHEMA")]
        schema: Option<PathBuf>,
        /// File to save the answers to (defaults to <output dir>/<stem>.json).
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Overwrite the output file if present.
        #[arg(long)]
        force: bool,
        /// Show progress counts and stale answers.
        #[arg(long)]
        verbose: bool,
    },
    /// Export answers to text, JSON, or a table payload for the PDF/DOCX composers.
    Export {
        /// Answers file (JSON export, wrapped or plain); empty answers when omitted.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        /// Arrangement of the text export.
        #[arg(long, value_enum, default_value_t = LayoutArg::Interleaved)]
        layout: LayoutArg,
        /// Rows per page in table payloads.
        #[arg(long, value_name = "N")]
        rows_per_page: Option<usize>,
        /// Handlebars template replacing the built-in text layout.
        #[arg(long, value_name = "TEMPLATE")]
        template: Option<PathBuf>,
        #[arg(long, value_name = "SCHEMA")]
        schema: Option<PathBuf>,
        /// Output directory (defaults to QUESTIONNAIRE_OUTPUT_DIR or the current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Write the export to stdout instead of a file.
        #[arg(long, conflicts_with = "out")]
        stdout: bool,
        #[arg(long)]
        force: bool,
    },
    /// Read a JSON export and report or re-save its answers.
    Import {
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        #[arg(long, value_name = "SCHEMA")]
        schema: Option<PathBuf>,
        /// Save the decoded answers to this file.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Save as plain JSON instead of the wrapped exchange encoding.
        #[arg(long, requires = "out")]
        plain: bool,
        #[arg(long)]
        force: bool,
    },
    /// Print the question schema, or the JSON Schema of the answers file.
    Schema {
        #[arg(long, value_name = "SCHEMA")]
        schema: Option<PathBuf>,
        #[arg(long)]
        json_schema: bool,
    },
}

fn main() -> CliResult<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Command::Fill {
            answers,
            schema,
            out,
            force,
            verbose,
        } => run_fill(answers, schema, out, force, verbose),
        Command::Export {
            answers,
            format,
            layout,
            rows_per_page,
            template,
            schema,
            out,
            stdout,
            force,
        } => run_export(ExportArgs {
            answers,
            format: format.into(),
            options: ExportOptions {
                layout: layout.into(),
                rows_per_page: rows_per_page.unwrap_or(DEFAULT_ROWS_PER_PAGE),
            },
            template,
            schema,
            out,
            stdout,
            force,
        }),
        Command::Import {
            input,
            schema,
            out,
            plain,
            force,
        } => run_import(input, schema, out, plain, force),
        Command::Schema {
            schema,
            json_schema,
        } => run_schema(schema, json_schema),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_schema(path: Option<&Path>) -> CliResult<QuestionSchema> {
    let schema = match path {
        Some(path) => QuestionSchema::from_json(&fs::read_to_string(path)?)?,
        None => QuestionSchema::builtin()?,
    };
    debug!(sections = schema.sections().len(), "schema loaded");
    Ok(schema)
}

fn schema_config(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) => {
            let schema_json = fs::read_to_string(path)?;
            Ok(serde_json::json!({ "schema_json": schema_json }).to_string())
        }
        None => Ok(String::new()),
    }
}

fn load_answers(path: Option<&Path>) -> CliResult<AnswerStore> {
    match path {
        Some(path) => Ok(decode_json(&fs::read(path)?)?),
        None => Ok(AnswerStore::new()),
    }
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

/// What the user typed at a fill prompt.
#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Keep,
    Set(String),
    Abort,
}

fn parse_reply(raw: &str) -> Reply {
    let line = raw.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Reply::Keep
    } else if trimmed.eq_ignore_ascii_case("exit") {
        Reply::Abort
    } else {
        Reply::Set(line.replace("\\n", "\n"))
    }
}

/// Reads one line; `None` once stdin is exhausted.
fn read_reply() -> CliResult<Option<Reply>> {
    print!("> ");
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(parse_reply(&input)))
}

fn run_fill(
    answers_path: Option<PathBuf>,
    schema_path: Option<PathBuf>,
    out: Option<PathBuf>,
    force: bool,
    verbose: bool,
) -> CliResult<()> {
    let config_json = schema_config(schema_path.as_deref())?;
    let schema = load_schema(schema_path.as_deref())?;
    let mut store = load_answers(answers_path.as_deref())?;

    let described = parse_component_result(&describe(&config_json))?;
    let payload =
        FillPayload::from_json(&described).map_err(|err| format!("fill layout error: {}", err))?;
    let mut presenter = FillPresenter::new(Verbosity::from_verbose(verbose));
    presenter.show_header(&payload);
    println!("Type \\n inside an answer for a line break.");

    'respondents: for respondent in Respondent::ALL {
        presenter.show_respondent(
            respondent,
            store.answered_count(&schema, respondent),
            payload.keys.len(),
        );
        presenter.show_stale_keys(respondent, &store.stale_keys(&schema, respondent.id()));

        for (position, entry) in payload.keys.iter().enumerate() {
            let current = store.get(respondent, &entry.name).to_string();
            let prompt = PromptContext::new(&payload, position, &current)
                .ok_or("fill prompt out of range")?;
            presenter.show_prompt(&prompt);

            let value = match read_reply()? {
                None => {
                    warn!("stdin closed; saving answers collected so far");
                    break 'respondents;
                }
                Some(Reply::Abort) => return Err("fill aborted by user".into()),
                Some(Reply::Keep) => continue,
                Some(Reply::Set(value)) => value,
            };

            let store_json = serde_json::to_string(&store)?;
            let updated = parse_component_result(&update_answer(
                &store_json,
                respondent.id(),
                &entry.name,
                &value,
            ))?;
            store = serde_json::from_value(updated)?;
        }
    }

    let path = match out {
        Some(path) => path,
        None => output_dir(None)?.join(ExportFormat::Json.file_name(&schema.file_stem)),
    };
    WriteRoots::from_env()?.write(&path, &encode_json(&store), force)?;
    presenter.show_completion(&schema, &store);
    println!("Saved answers to {}", path.display());
    Ok(())
}

struct ExportArgs {
    answers: Option<PathBuf>,
    format: ExportFormat,
    options: ExportOptions,
    template: Option<PathBuf>,
    schema: Option<PathBuf>,
    out: Option<PathBuf>,
    stdout: bool,
    force: bool,
}

fn run_export(args: ExportArgs) -> CliResult<()> {
    let schema = load_schema(args.schema.as_deref())?;
    let store = load_answers(args.answers.as_deref())?;

    let (file_name, bytes) = match &args.template {
        Some(template_path) => {
            if args.format != ExportFormat::Text {
                return Err("--template only applies to --format text".into());
            }
            let template = fs::read_to_string(template_path)?;
            let rendered = render_template(&template, &schema, &store)?;
            (args.format.file_name(&schema.file_stem), rendered.into_bytes())
        }
        None => {
            let artifact = export(&schema, &store, args.format, args.options);
            (artifact.file_name, artifact.bytes)
        }
    };

    if args.stdout {
        io::stdout().write_all(&bytes)?;
        return Ok(());
    }

    let path = output_dir(args.out)?.join(&file_name);
    WriteRoots::from_env()?.write(&path, &bytes, args.force)?;
    if args.format.is_tabular() {
        println!(
            "Wrote {} table payload to {}",
            args.format.extension(),
            path.display()
        );
    } else {
        println!("Exported {}", path.display());
    }
    Ok(())
}

fn run_import(
    input: PathBuf,
    schema_path: Option<PathBuf>,
    out: Option<PathBuf>,
    plain: bool,
    force: bool,
) -> CliResult<()> {
    let bytes = fs::read(&input)?;
    let store = match decode_json(&bytes) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("Import failed: {}", err);
            eprintln!("No answers were changed.");
            return Err("import failed".into());
        }
    };
    let schema = load_schema(schema_path.as_deref())?;

    println!("Imported answers from {}", input.display());
    describe_store(&schema, &store);

    if let Some(out) = out {
        let encoded = if plain {
            encode_json_plain(&store)
        } else {
            encode_json(&store)
        };
        WriteRoots::from_env()?.write(&out, &encoded, force)?;
        println!("Wrote {}", out.display());
    }
    Ok(())
}

fn describe_store(schema: &QuestionSchema, store: &AnswerStore) {
    let total = schema.keys().count();
    for (id, responses) in store.responses() {
        match id.parse::<Respondent>() {
            Ok(respondent) if respondent.id() == id.as_str() => {
                let stale = store.stale_keys(schema, id).len();
                let mut line = format!(
                    "  {}: {}/{} answered",
                    respondent.label(),
                    store.answered_count(schema, respondent),
                    total
                );
                if stale > 0 {
                    line.push_str(&format!(", {} answer(s) for questions no longer asked", stale));
                }
                println!("{}", line);
            }
            _ => println!(
                "  {}: {} entr(ies) for an unknown respondent (kept)",
                id,
                responses.len()
            ),
        }
    }
}

fn run_schema(schema_path: Option<PathBuf>, json_schema: bool) -> CliResult<()> {
    if json_schema {
        let schema = schemars::schema_for!(AnswerStore);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }
    let schema = load_schema(schema_path.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
