// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 出力フォーマット
#[derive(Clone, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Structured JSON output
    Json,
}

/// Stratum - Modular Migration Runner
///
/// Applies versioned schema and data migrations contributed by
/// independent modules, in dependency order.
#[derive(Parser, Debug)]
#[command(name = "stratum")]
#[command(author = "Stratum Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Modular migration runner")]
#[command(long_about = "Stratum - Modular Migration Runner

Applies versioned schema and data migrations contributed by
independent modules, in dependency order.

Stratum helps you:
  • Keep schema and data migrations next to the module that owns them
  • Apply pending migrations in module dependency order
  • Revert the most recently applied migrations
  • Track applied migrations in a JSON file or a database table

Supported databases: PostgreSQL, MySQL, SQLite")]
#[command(propagate_version = true)]
#[command(after_help = "GETTING STARTED:
  1. Declare modules and storages:  Edit .stratum.yaml
  2. Add migrations:                <module>/migrations/schemas/0.1.0-init.yaml
  3. Check pending migrations:      stratum migrate status
  4. Apply migrations:              stratum migrate up
  5. Revert the last migration:     stratum migrate down 1

For detailed help on each command, use: stratum <command> --help")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Target environment passed to every migration step
    #[arg(short, long, global = true, value_name = "ENV", default_value = "development")]
    pub env: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run, revert and inspect migrations
    Migrate {
        #[command(subcommand)]
        command: MigrateCommands,
    },
}

/// migrate subcommands
#[derive(Subcommand, Debug)]
pub enum MigrateCommands {
    /// Apply pending migrations
    ///
    /// Executes pending migrations in module dependency order,
    /// schema migrations before data migrations.
    ///
    /// EXAMPLES:
    ///   # Apply everything
    ///   stratum migrate up
    ///
    ///   # Apply the next 3 migrations
    ///   stratum migrate up 3
    ///
    ///   # Apply against a specific storage
    ///   stratum migrate up --storage db
    Up {
        /// Number of migrations to apply (default: all)
        #[arg(value_name = "COUNT")]
        count: Option<String>,

        /// Storage key from the config
        #[arg(short, long, value_name = "KEY")]
        storage: Option<String>,
    },

    /// Revert applied migrations
    ///
    /// Reverts the most recently applied migrations first.
    ///
    /// EXAMPLES:
    ///   # Revert everything
    ///   stratum migrate down
    ///
    ///   # Revert the last migration
    ///   stratum migrate down 1
    Down {
        /// Number of migrations to revert (default: all)
        #[arg(value_name = "COUNT")]
        count: Option<String>,

        /// Storage key from the config
        #[arg(short, long, value_name = "KEY")]
        storage: Option<String>,
    },

    /// Show pending migrations
    ///
    /// EXAMPLES:
    ///   stratum migrate status
    ///   stratum migrate status --storage db
    Status {
        /// Storage key from the config
        #[arg(short, long, value_name = "KEY")]
        storage: Option<String>,
    },
}
