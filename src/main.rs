//! Binary entry point for ragstore.
//!
//! This binary provides a CLI over the configured vector store backend.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use ragstore::config::{RAGSTORE_COLLECTION, Settings, VECTOR_DB_TYPE};
use ragstore::{RagService, cli, observability};
use std::path::PathBuf;
use std::process::ExitCode;

/// ragstore - pluggable vector store backends for RAG applications.
#[derive(Parser)]
#[command(name = "ragstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend kind: weaviate, milvus, or memory.
    #[arg(short, long, global = true, env = VECTOR_DB_TYPE)]
    backend: Option<String>,

    /// Collection (namespace) to use.
    #[arg(short, long, global = true, env = RAGSTORE_COLLECTION)]
    collection: Option<String>,

    /// Path to an env file with backend settings.
    #[arg(short, long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Connect and ensure the collection exists.
    Setup,

    /// Write documents from a JSON file.
    Write {
        /// JSON array of `{url, text, metadata, vector}` mappings.
        file: PathBuf,
    },

    /// Write a web page.
    Webpage {
        /// Page URL.
        url: String,

        /// File containing the page text.
        #[arg(short, long)]
        text_file: PathBuf,
    },

    /// List stored documents as JSON.
    List {
        /// Maximum number of documents.
        #[arg(short, long, default_value_t = cli::DEFAULT_LIST_LIMIT)]
        limit: usize,

        /// Number of documents to skip.
        #[arg(short, long, default_value_t = 0)]
        offset: usize,
    },

    /// Ask a question.
    Query {
        /// The question.
        text: String,

        /// Maximum number of documents to draw on.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show backend kind and connection state.
    Status,
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = observability::init_from_env(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Builds the service and runs the selected command.
fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = match &cli.env_file {
        Some(path) => Settings::from_env_file(path)?,
        None => Settings::from_env(),
    };
    if let Some(collection) = &cli.collection {
        settings = settings.with(RAGSTORE_COLLECTION, collection.as_str());
    }

    let rag = RagService::from_settings(cli.backend.as_deref(), &settings)
        .context("failed to create vector store")?;

    let command = cli.command;
    let output = cli::with_cleanup(&rag, |rag| match command {
        Commands::Setup => cli::setup(rag),
        Commands::Write { file } => cli::write(rag, &file),
        Commands::Webpage { url, text_file } => cli::webpage(rag, &url, &text_file),
        Commands::List { limit, offset } => cli::list(rag, limit, offset),
        Commands::Query { text, limit } => cli::query(rag, &text, limit),
        Commands::Status => cli::status(rag),
    })?;
    println!("{output}");
    Ok(())
}
