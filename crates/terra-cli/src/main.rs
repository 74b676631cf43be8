//! Terra CLI
//!
//! Command-line interface for the Terra front end.

mod printer;
mod render;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use terra_core::{Diagnostics, DiagnosticsOutput, Frontend, FrontendConfig};
use walkdir::WalkDir;

/// Source file extension picked up when a directory is checked.
const SOURCE_EXTENSION: &str = "tr";

const EXIT_ERRORS: u8 = 1;
const EXIT_USAGE: u8 = 64;
const EXIT_FATAL: u8 = 70;
const EXIT_IO: u8 = 74;

#[derive(Parser)]
#[command(name = "terra")]
#[command(author, version, about = "Front end for the Terra language", long_about = None)]
struct Cli {
    /// Log front end phases (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize, parse and resolve names, reporting diagnostics
    Check {
        /// Source files or directories containing .tr files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format (human, json, fancy)
        #[arg(short, long, default_value = "human")]
        format: String,

        /// Configuration file (defaults to ./terra.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the token stream of a file
    Tokens {
        /// Path to the .tr file
        file: PathBuf,

        /// Output format (human, json)
        #[arg(short, long, default_value = "human")]
        format: String,
    },

    /// Parse a file and print the AST
    Ast {
        /// Path to the .tr file
        file: PathBuf,

        /// Output format (tree, json)
        #[arg(short, long, default_value = "tree")]
        format: String,
    },

    /// Parse a file and print every scope with its symbols
    Scopes {
        /// Path to the .tr file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { paths, format, config } => cmd_check(&paths, &format, config.as_deref()),
        Commands::Tokens { file, format } => cmd_tokens(&file, &format),
        Commands::Ast { file, format } => cmd_ast(&file, &format),
        Commands::Scopes { file } => cmd_scopes(&file),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

/// Invalid UTF-8 is replaced rather than rejected; the lexer reports each
/// replacement character as unexpected.
fn read_source(path: &Path) -> Result<String, ExitCode> {
    let bytes = fs::read(path).map_err(|e| {
        eprintln!(
            "{} Failed to read file '{}': {}",
            "error:".red().bold(),
            path.display(),
            e
        );
        ExitCode::from(EXIT_IO)
    })?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read source");
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn load_config(config: Option<&Path>) -> Result<FrontendConfig, ExitCode> {
    let loaded = match config {
        Some(path) => {
            tracing::debug!(path = %path.display(), "configuration given on the command line");
            FrontendConfig::load(path)
        }
        None => FrontendConfig::from_dir(Path::new(".")),
    };
    loaded.map_err(|e| {
        eprintln!("{} {}", "error:".red().bold(), e);
        match e {
            terra_core::FrontendError::ConfigRead { .. } => ExitCode::from(EXIT_IO),
            _ => ExitCode::from(EXIT_USAGE),
        }
    })
}

/// Expand directories into the `.tr` files below them, in file name order.
fn collect_sources(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| p.extension().is_some_and(|ext| ext == SOURCE_EXTENSION));
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    tracing::debug!(roots = paths.len(), files = files.len(), "collected sources");
    files
}

/// Flush everything collected so far and stop: a Fatal diagnostic ends the run.
fn abort_fatal(diagnostics: &Diagnostics) -> ExitCode {
    if let Err(e) = diagnostics.flush(&mut io::stderr()) {
        eprintln!("{} {}", "error:".red().bold(), e);
    }
    ExitCode::from(EXIT_FATAL)
}

fn cmd_check(paths: &[PathBuf], format: &str, config: Option<&Path>) -> ExitCode {
    let config = match load_config(config) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let frontend = Frontend::new(config);

    let files = collect_sources(paths);
    if files.is_empty() {
        eprintln!("{} no .{} files found", "error:".red().bold(), SOURCE_EXTENSION);
        return ExitCode::from(EXIT_USAGE);
    }

    let mut total_errors = 0;
    let mut reports = Vec::new();

    for path in &files {
        let source = match read_source(path) {
            Ok(s) => s,
            Err(code) => return code,
        };
        let file = path.display().to_string();

        let (ast, diagnostics) = frontend.compile(&source, &file);
        tracing::debug!(file = %file, errors = diagnostics.error_count(), "checked");
        if diagnostics.has_fatal() {
            return abort_fatal(&diagnostics);
        }
        total_errors += diagnostics.error_count();

        match format {
            "json" => {
                let output = DiagnosticsOutput::from_diagnostics(&diagnostics);
                reports.push(serde_json::json!({ "file": file, "report": output }));
            }
            "fancy" => render::fancy(&diagnostics, &source, &file),
            _ => {
                render::human(&diagnostics, &source);
                let error_count = diagnostics.error_count();
                if error_count > 0 {
                    eprintln!(
                        "{}: could not check `{}` due to {} previous error{}",
                        "error".red().bold(),
                        file,
                        error_count,
                        if error_count == 1 { "" } else { "s" }
                    );
                } else {
                    println!("{} `{}` checked successfully", "Finished".green().bold(), file);
                }
            }
        }

        if let Some(mut ast) = ast {
            ast.release();
        }
    }

    if format == "json" {
        let output = serde_json::json!({
            "version": "1.0",
            "status": if total_errors == 0 { "ok" } else { "error" },
            "files": reports,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return ExitCode::from(EXIT_FATAL);
            }
        }
    }

    if total_errors > 0 {
        ExitCode::from(EXIT_ERRORS)
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_tokens(path: &Path, format: &str) -> ExitCode {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let file = path.display().to_string();

    let mut diagnostics = Diagnostics::new();
    let tokens = match Frontend::default().tokenize(&source, &file, &mut diagnostics) {
        Ok(tokens) => tokens,
        Err(_) => return abort_fatal(&diagnostics),
    };

    match format {
        "json" => match printer::tokens_json(&tokens) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return ExitCode::from(EXIT_FATAL);
            }
        },
        _ => print!("{}", printer::tokens_human(&tokens)),
    }

    finish_dump(&diagnostics)
}

fn cmd_ast(path: &Path, format: &str) -> ExitCode {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let file = path.display().to_string();

    let (ast, diagnostics) = Frontend::default().compile(&source, &file);
    let Some(ast) = ast else {
        return abort_fatal(&diagnostics);
    };

    match format {
        "json" => match printer::ast_json(&ast) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return ExitCode::from(EXIT_FATAL);
            }
        },
        _ => print!("{}", printer::ast_tree(&ast)),
    }

    finish_dump(&diagnostics)
}

fn cmd_scopes(path: &Path) -> ExitCode {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let file = path.display().to_string();

    let (ast, diagnostics) = Frontend::default().compile(&source, &file);
    let Some(ast) = ast else {
        return abort_fatal(&diagnostics);
    };

    print!("{}", printer::scopes(&ast));
    finish_dump(&diagnostics)
}

/// Dumps go to stdout; their diagnostics go to stderr in flush format.
fn finish_dump(diagnostics: &Diagnostics) -> ExitCode {
    if let Err(e) = diagnostics.flush(&mut io::stderr()) {
        eprintln!("{} {}", "error:".red().bold(), e);
    }
    if diagnostics.has_errors() {
        ExitCode::from(EXIT_ERRORS)
    } else {
        ExitCode::SUCCESS
    }
}
