//! PDF Form-Fill CLI tool
//!
//! A command-line tool for inspecting and filling interactive PDF forms.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use glob::glob;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use pdf_formfill::form::{read_field_value, FieldKind, FieldValue, ValueMap};
use pdf_formfill::session::{FormSession, SessionOptions};
use pdf_formfill::source::SourceList;
use pdf_formfill::stamp::ImageAsset;

/// PDF Form-Fill - Inspect and fill interactive PDF forms
#[derive(Parser)]
#[command(name = "pdf-formfill")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # List a form's fields in reading order
    pdf-formfill fields form.pdf

    # Fill fields and write the result
    pdf-formfill fill form.pdf -o filled.pdf --set full_name=\"Ada Lovelace\" --check accept_terms

    # Values from a JSON map, plus a logo stamp on page 1
    pdf-formfill fill form.pdf -o filled.pdf --values values.json --image logo.png

    # Probe fallback candidates in order until one is a valid PDF
    pdf-formfill fill cache/form.pdf originals/form.pdf -o filled.pdf --set city=Lisbon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the form's fields in visual reading order
    Fields {
        /// Candidate input PDFs, probed in order. Supports glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,
    },

    /// Fill form fields and write a new PDF
    Fill {
        /// Candidate input PDFs, probed in order. Supports glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Set a text/radio/dropdown field: name=value (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Check a checkbox field (repeatable)
        #[arg(long = "check", value_name = "NAME")]
        check: Vec<String>,

        /// Uncheck a checkbox field (repeatable)
        #[arg(long = "uncheck", value_name = "NAME")]
        uncheck: Vec<String>,

        /// JSON file mapping field names to values (strings and booleans)
        #[arg(long)]
        values: Option<PathBuf>,

        /// PNG or JPEG image stamped top-center on a page
        #[arg(long)]
        image: Option<PathBuf>,

        /// Zero-based page index for the image stamp
        #[arg(long, default_value_t = 0)]
        image_page: usize,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Show which candidate was accepted and summarize the document
    Info {
        /// Candidate input PDFs, probed in order. Supports glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fields { inputs } => cmd_fields(inputs),
        Commands::Fill {
            inputs, output, set, check, uncheck, values, image, image_page, open,
        } => cmd_fill(inputs, output, set, check, uncheck, values, image, image_page, open),
        Commands::Info { inputs } => cmd_info(inputs),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Expand glob patterns in input paths, preserving candidate order
fn expand_globs(patterns: Vec<String>) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = Vec::new();
            for entry in glob(&pattern)? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            // Sort within one pattern for stable probing order
            matched.sort();
            paths.extend(matched);
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

/// Open a file with the system default application
fn open_file(path: &PathBuf) -> anyhow::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// List the form's fields in reading order
fn cmd_fields(inputs: Vec<String>) -> anyhow::Result<()> {
    let sources = SourceList::from_paths(expand_globs(inputs)?);
    let session = FormSession::open(sources, SessionOptions::default())?;

    if session.fields().is_empty() {
        println!("No form fields found.");
        return Ok(());
    }

    for field in session.fields() {
        match field.kind {
            FieldKind::RadioGroup | FieldKind::Dropdown => {
                println!("{} ({}) [{}]", field.name, field.kind, field.options.join(", "));
            }
            FieldKind::Text | FieldKind::Checkbox => {
                println!("{} ({})", field.name, field.kind);
            }
        }
    }

    Ok(())
}

/// Fill form fields and write the result
#[allow(clippy::too_many_arguments)]
fn cmd_fill(
    inputs: Vec<String>,
    output: PathBuf,
    set: Vec<String>,
    check: Vec<String>,
    uncheck: Vec<String>,
    values_file: Option<PathBuf>,
    image: Option<PathBuf>,
    image_page: usize,
    open: bool,
) -> anyhow::Result<()> {
    let mut values = ValueMap::new();

    if let Some(path) = values_file {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        values.extend(values_from_json(&text)?);
    }
    for assignment in set {
        let Some((name, value)) = assignment.split_once('=') else {
            bail!("--set expects NAME=VALUE, got: {}", assignment);
        };
        values.insert(name.to_string(), FieldValue::Text(value.to_string()));
    }
    for name in check {
        values.insert(name, FieldValue::Checked(true));
    }
    for name in uncheck {
        values.insert(name, FieldValue::Checked(false));
    }

    // The format gate runs before any document work
    let stamp = image.as_deref().map(ImageAsset::from_path).transpose()?;

    let sources = SourceList::from_paths(expand_globs(inputs)?);
    let options = SessionOptions {
        stamp,
        stamp_page: image_page,
        ..Default::default()
    };

    let mut session = FormSession::open(sources, options)?;
    eprintln!("Filling {} field value(s)...", values.len());

    session.update_many(values, std::time::Instant::now());
    let handle = session.render()?;
    std::fs::write(&output, &handle.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    eprintln!("Output: {}", output.display());

    if open {
        open_file(&output)?;
    }

    Ok(())
}

/// Show source and document diagnostics
fn cmd_info(inputs: Vec<String>) -> anyhow::Result<()> {
    let mut sources = SourceList::from_paths(expand_globs(inputs)?);
    let doc = sources.load()?;
    let accepted = sources
        .resolved()
        .map(|s| s.label())
        .unwrap_or_else(|| "<unknown>".to_string());

    let session_sources = sources.clone();
    let session = FormSession::open(session_sources, SessionOptions::default())?;

    println!("Source: {}", accepted);
    println!("Pages: {}", doc.get_pages().len());
    println!("Fields: {}", session.fields().len());

    for field in session.fields() {
        let value = read_field_value(&doc, &field.name)
            .unwrap_or_else(|| "(unset)".to_string());
        println!("  {} ({}) = {}", field.name, field.kind, value);
    }

    Ok(())
}

/// Parse a JSON object into a value map: strings and numbers become text
/// values, booleans become checkbox values.
fn values_from_json(text: &str) -> anyhow::Result<ValueMap> {
    let parsed: serde_json::Value =
        serde_json::from_str(text).context("Values file is not valid JSON")?;
    let object = parsed
        .as_object()
        .context("Values file must contain a JSON object")?;

    let mut values = ValueMap::new();
    for (name, value) in object {
        let field_value = match value {
            serde_json::Value::Bool(b) => FieldValue::Checked(*b),
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            serde_json::Value::Number(n) => FieldValue::Text(n.to_string()),
            other => bail!("Unsupported value for \"{}\": {}", name, other),
        };
        values.insert(name.clone(), field_value);
    }
    Ok(values)
}
