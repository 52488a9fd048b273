//! # edi-cli
//!
//! Command-line front end for the EDI parser.
//!
//! `edi parse` prints the parse tree and findings as JSON, `edi validate`
//! prints an itemised report for one or more files and `edi generate` writes
//! the minimal document a grammar accepts.

mod config;
mod report;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use config::CliConfig;
use edi_lexer::{Dialect, DialectConfig};
use edi_parser::{ParseOptions, ParseResult};
use edi_schema::{Grammar, GrammarLoader, GrammarRegistry};
use report::{FileReport, ReportFormat};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edi")]
#[command(about = "Grammar-driven EDI parser and validator")]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and print the result as JSON
    Parse {
        /// Input file path
        input: PathBuf,

        #[command(flatten)]
        grammar: GrammarArgs,

        #[command(flatten)]
        input_options: InputArgs,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Write the JSON to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate one or more documents and report every finding
    Validate {
        /// Input file paths
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        grammar: GrammarArgs,

        #[command(flatten)]
        input_options: InputArgs,

        /// Report format
        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },

    /// Generate the minimal document a grammar accepts
    Generate {
        #[command(flatten)]
        grammar: GrammarArgs,

        /// Dialect whose separators are used
        #[arg(short, long)]
        dialect: Option<Dialect>,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Grammar selection: a file, or a message type and version looked up in
/// the grammar search paths
#[derive(Args)]
struct GrammarArgs {
    /// Grammar file (JSON or YAML)
    #[arg(short, long, conflicts_with_all = ["message_type", "grammar_version"])]
    grammar: Option<PathBuf>,

    /// Message type (e.g. ORDERS, 837)
    #[arg(short, long, requires = "grammar_version")]
    message_type: Option<String>,

    /// Grammar version (e.g. D96A, 005010X222A1)
    #[arg(long = "version", requires = "message_type")]
    grammar_version: Option<String>,

    /// Additional grammar search path
    #[arg(long = "grammar-path")]
    grammar_paths: Vec<PathBuf>,
}

#[derive(Args)]
struct InputArgs {
    /// Dialect of the input (x12, edifact, custom)
    #[arg(short, long)]
    dialect: Option<Dialect>,

    /// Downgrade recoverable errors to warnings
    #[arg(long)]
    lenient: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };

    match cli.command {
        Commands::Parse {
            input,
            grammar,
            input_options,
            pretty,
            output,
        } => {
            let grammar = resolve_grammar(&grammar, &config)?;
            let dialect = config.dialect_config(input_options.dialect)?;
            let options = config.parse_options(input_options.lenient);

            let bytes = fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let result = edi_parser::Parser::new(&grammar, dialect)
                .with_options(options)
                .parse(&bytes);

            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            write_output(output.as_deref(), json.as_bytes())?;

            Ok(exit_code(result.success))
        }
        Commands::Validate {
            inputs,
            grammar,
            input_options,
            format,
        } => {
            let grammar = resolve_grammar(&grammar, &config)?;
            let dialect = config.dialect_config(input_options.dialect)?;
            let options = config.parse_options(input_options.lenient);

            let results = validate_files(grammar, dialect, options, inputs).await?;
            let success = results.iter().all(|(_, result)| result.success);

            match format {
                ReportFormat::Text => {
                    for (path, result) in &results {
                        print!("{}", report::render_text(path, result));
                    }
                }
                ReportFormat::Json => {
                    let reports: Vec<FileReport<'_>> = results
                        .iter()
                        .map(|(path, result)| FileReport::new(path, result))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&reports)?);
                }
            }

            Ok(exit_code(success))
        }
        Commands::Generate {
            grammar,
            dialect,
            output,
        } => {
            let grammar = resolve_grammar(&grammar, &config)?;
            let dialect = config.dialect_config(dialect)?;

            let bytes = edi_parser::generate_document(&grammar, dialect.separators)?;
            write_output(output.as_deref(), &bytes)?;

            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_grammar(args: &GrammarArgs, config: &CliConfig) -> Result<Arc<Grammar>> {
    if let Some(path) = &args.grammar {
        let grammar = GrammarLoader::default()
            .load_from_file(path)
            .with_context(|| format!("failed to load grammar {}", path.display()))?;
        return Ok(Arc::new(grammar));
    }

    let (Some(message_type), Some(version)) = (&args.message_type, &args.grammar_version) else {
        bail!("either --grammar or --message-type and --version are required");
    };

    let mut paths = args.grammar_paths.clone();
    paths.extend(config.grammar_paths.iter().cloned());
    debug!(?paths, "grammar search paths");

    let registry = GrammarRegistry::with_loader(GrammarLoader::new(paths));
    registry
        .load(message_type, version)
        .with_context(|| format!("no usable grammar for {message_type} {version}"))
}

/// Parse every file on the blocking pool, one independent parse per file
async fn validate_files(
    grammar: Arc<Grammar>,
    dialect: DialectConfig,
    options: ParseOptions,
    inputs: Vec<PathBuf>,
) -> Result<Vec<(PathBuf, ParseResult)>> {
    let mut tasks = Vec::with_capacity(inputs.len());
    for input in inputs {
        let grammar = Arc::clone(&grammar);
        let path = input.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<ParseResult> {
            let bytes = fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(edi_parser::Parser::new(&grammar, dialect)
                .with_options(options)
                .parse(&bytes))
        });
        tasks.push((input, task));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for (input, task) in tasks {
        let result = task
            .await
            .with_context(|| format!("validation of {} did not complete", input.display()))??;
        info!(file = %input.display(), success = result.success, "validated");
        results.push((input, result));
    }

    Ok(results)
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            if !bytes.ends_with(b"\n") {
                stdout.write_all(b"\n")?;
            }
            Ok(())
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
