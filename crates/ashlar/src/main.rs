//! Ashlar command-line tool.
//!
//! Opens the SQLite store, runs one subcommand and prints its result as JSON.

mod config;

use std::process::ExitCode;

use anyhow::Context;
use ashlar_persistence::backends::sqlite::SqliteBackend;
use ashlar_persistence::core::{Backend, FilteredSearch, RecordStorage, SchemaStorage};
use ashlar_persistence::types::{QueryParams, RecordType};
use clap::Parser;
use serde_json::Value;
use tracing::{error, info};

use crate::config::{Command, Config};

/// Initializes the tracing subscriber for logging.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ashlar={0},ashlar_persistence={0}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Opens the database and brings its schema up to date.
async fn open_backend(config: &Config) -> anyhow::Result<SqliteBackend> {
    let backend = SqliteBackend::with_config(&config.database_url, config.backend_config())?;
    backend.initialize().await?;
    backend.health_check().await?;
    info!(
        backend = %backend.kind(),
        database = %config.database_url,
        "Opened backend"
    );
    Ok(backend)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    let backend = open_backend(&config).await?;

    match config.command {
        Command::Init => {
            info!("Database schema is up to date");
        }
        Command::CreateRecordType {
            label,
            plural_label,
            description,
        } => {
            let mut record_type = RecordType::new(label, plural_label);
            record_type.description = description;
            print_json(&backend.create_record_type(record_type).await?)?;
        }
        Command::PublishSchema { record_type, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let schema: Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            print_json(&backend.publish_schema(record_type, schema).await?)?;
        }
        Command::Schemas { record_type } => {
            let chain = backend.schema_chain(record_type).await?;
            print_json(&chain.versions())?;
        }
        Command::Records(args) => {
            let params = QueryParams::parse(&args.query);
            print_json(&backend.search_records(&params).await?)?;
        }
        Command::Boundaries(args) => {
            let params = QueryParams::parse(&args.query);
            print_json(&backend.search_boundaries(&params).await?)?;
        }
        Command::Polygons(args) => {
            let params = QueryParams::parse(&args.query);
            print_json(&backend.search_polygons(&params).await?)?;
        }
        Command::RecordTypes(args) => {
            let params = QueryParams::parse(&args.query);
            print_json(&backend.search_record_types(&params).await?)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(&config.log_level);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
