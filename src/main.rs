use anyhow::{Context, Result};
use clap::Parser;
use colored::control as color_control;
use std::env;
use std::process;
use stratum_migrate::cli::commands::down::{DownCommand, DownCommandHandler};
use stratum_migrate::cli::commands::status::{StatusCommand, StatusCommandHandler};
use stratum_migrate::cli::commands::up::{UpCommand, UpCommandHandler};
use stratum_migrate::cli::{Cli, Commands, MigrateCommands};
use tracing_subscriber::EnvFilter;

fn main() {
    sqlx::any::install_default_drivers();

    // CLIをパースして実行
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")
        .unwrap_or_else(|e| {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        });

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// ログ出力を初期化する（RUST_LOGが優先）
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "stratum_migrate=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    // --no-color フラグの処理
    if cli.no_color {
        color_control::set_override(false);
    }

    // プロジェクトのルートパスを取得
    let project_path = env::current_dir()?;
    let config_path = cli.config;

    match cli.command {
        Commands::Migrate { command } => match command {
            MigrateCommands::Up { count, storage } => {
                let handler = UpCommandHandler::new();
                let command = UpCommand {
                    project_path,
                    config_path,
                    env: cli.env,
                    count,
                    storage,
                    format: cli.format,
                };
                handler.execute(&command).await
            }

            MigrateCommands::Down { count, storage } => {
                let handler = DownCommandHandler::new();
                let command = DownCommand {
                    project_path,
                    config_path,
                    env: cli.env,
                    count,
                    storage,
                    format: cli.format,
                };
                handler.execute(&command).await
            }

            MigrateCommands::Status { storage } => {
                let handler = StatusCommandHandler::new();
                let command = StatusCommand {
                    project_path,
                    config_path,
                    env: cli.env,
                    storage,
                    format: cli.format,
                };
                handler.execute(&command).await
            }
        },
    }
}
