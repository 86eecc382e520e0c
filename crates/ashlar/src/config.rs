//! Command-line configuration.
//!
//! Every global option can also be set through the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ASHLAR_DATABASE_URL` | ashlar.db | SQLite database path, or `:memory:` |
//! | `ASHLAR_LOG_LEVEL` | info | Log level |
//! | `ASHLAR_MAX_CONNECTIONS` | 10 | Connection pool size |
//! | `ASHLAR_BUSY_TIMEOUT_MS` | 5000 | SQLite busy timeout |

use std::path::PathBuf;

use ashlar_persistence::backends::sqlite::SqliteBackendConfig;
use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Ashlar storage command-line tool.
#[derive(Debug, Clone, Parser)]
#[command(name = "ashlar")]
#[command(about = "Manage Ashlar record types, schemas and filtered searches")]
pub struct Config {
    /// SQLite database path.
    #[arg(long, env = "ASHLAR_DATABASE_URL", default_value = "ashlar.db")]
    pub database_url: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "ASHLAR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum number of pooled connections.
    #[arg(long, env = "ASHLAR_MAX_CONNECTIONS", default_value = "10")]
    pub max_connections: u32,

    /// Milliseconds to wait on a locked database.
    #[arg(long, env = "ASHLAR_BUSY_TIMEOUT_MS", default_value = "5000")]
    pub busy_timeout_ms: u32,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do once the database is open.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create the database schema.
    Init,

    /// Create a record type.
    CreateRecordType {
        /// Display label.
        #[arg(long)]
        label: String,
        /// Plural display label.
        #[arg(long)]
        plural_label: String,
        /// Free-text description.
        #[arg(long)]
        description: Option<String>,
    },

    /// Publish a new schema version from a JSON file.
    PublishSchema {
        /// Record type to publish for.
        #[arg(long)]
        record_type: Uuid,
        /// Path to the JSON schema document.
        #[arg(long)]
        file: PathBuf,
    },

    /// Print a record type's schema versions, oldest first.
    Schemas {
        /// Record type whose chain to print.
        #[arg(long)]
        record_type: Uuid,
    },

    /// Search records.
    Records(SearchArgs),

    /// Search boundaries.
    Boundaries(SearchArgs),

    /// Search boundary polygons.
    Polygons(SearchArgs),

    /// Search record types.
    RecordTypes(SearchArgs),
}

/// Arguments shared by the search subcommands.
#[derive(Debug, Clone, clap::Args)]
pub struct SearchArgs {
    /// URL-encoded query string, e.g. `status=ERROR,WARNING`.
    #[arg(long, default_value = "")]
    pub query: String,
}

impl Config {
    /// Builds the backend configuration from the global options.
    pub fn backend_config(&self) -> SqliteBackendConfig {
        SqliteBackendConfig {
            max_connections: self.max_connections,
            busy_timeout_ms: self.busy_timeout_ms,
            ..Default::default()
        }
    }
}
