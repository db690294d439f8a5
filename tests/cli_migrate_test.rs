// migrate up / down / status コマンドの統合テスト
//
// 一時プロジェクトに設定ファイルとYAMLマイグレーションを作成し、
// コマンドハンドラー経由でJSON / SQLiteストレージに対して実行します。

use anyhow::Result;
use sqlx::any::install_default_drivers;
use sqlx::Row;
use std::fs;
use std::path::{Path, PathBuf};
use stratum_migrate::adapters::database::DatabaseConnectionService;
use stratum_migrate::cli::commands::down::{DownCommand, DownCommandHandler};
use stratum_migrate::cli::commands::status::{StatusCommand, StatusCommandHandler};
use stratum_migrate::cli::commands::up::{UpCommand, UpCommandHandler};
use stratum_migrate::cli::OutputFormat;
use stratum_migrate::core::config::{DatabaseConfig, Dialect};
use tempfile::TempDir;

const CONFIG: &str = r#"version: "1.0"
migrate:
  storage: local
modules:
  - name: blog
    path: modules/blog
    depends_on: [core]
  - name: core
    path: modules/core
storages:
  local:
    type: json
    path: .stratum/migrations.json
  db:
    type: sql
    dialect: sqlite
    database: app.db
"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// core → blog の2モジュールを持つプロジェクトを作成
fn setup_project() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let project_path = temp_dir.path().to_path_buf();

    write(&project_path, ".stratum.yaml", CONFIG);
    write(
        &project_path,
        "modules/core/migrations/schemas/0.1.0-users.yaml",
        "up: CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)\ndown: DROP TABLE users\n",
    );
    write(
        &project_path,
        "modules/core/migrations/data/0.1.0-admin.yaml",
        "up: INSERT INTO users (id, name) VALUES (1, 'admin')\ndown: DELETE FROM users WHERE id = 1\n",
    );
    write(
        &project_path,
        "modules/blog/migrations/schemas/0.1.0-posts.yaml",
        "up:\n  - CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER)\n  - CREATE INDEX idx_posts_user ON posts (user_id)\ndown:\n  - DROP TABLE posts\n  - SELECT 1\n",
    );
    write(&project_path, "modules/blog/migrations/schemas/README.md", "not a migration");

    Ok((temp_dir, project_path))
}

fn up(project_path: &Path, count: Option<&str>, storage: Option<&str>) -> UpCommand {
    UpCommand {
        project_path: project_path.to_path_buf(),
        config_path: None,
        env: "test".to_string(),
        count: count.map(str::to_string),
        storage: storage.map(str::to_string),
        format: OutputFormat::Text,
    }
}

fn down(project_path: &Path, count: Option<&str>, storage: Option<&str>) -> DownCommand {
    DownCommand {
        project_path: project_path.to_path_buf(),
        config_path: None,
        env: "test".to_string(),
        count: count.map(str::to_string),
        storage: storage.map(str::to_string),
        format: OutputFormat::Text,
    }
}

fn status(project_path: &Path, storage: Option<&str>, format: OutputFormat) -> StatusCommand {
    StatusCommand {
        project_path: project_path.to_path_buf(),
        config_path: None,
        env: "test".to_string(),
        storage: storage.map(str::to_string),
        format,
    }
}

#[tokio::test]
async fn test_status_lists_pending_in_dependency_order() -> Result<()> {
    let (_temp_dir, project_path) = setup_project()?;

    let output = StatusCommandHandler::new()
        .execute(&status(&project_path, None, OutputFormat::Text))
        .await?;

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "3 pending migrations:");
    assert!(lines[1].ends_with("modules/core/migrations/schemas/0.1.0-users.yaml"));
    assert!(lines[2].ends_with("modules/core/migrations/data/0.1.0-admin.yaml"));
    assert!(lines[3].ends_with("modules/blog/migrations/schemas/0.1.0-posts.yaml"));

    let json = StatusCommandHandler::new()
        .execute(&status(&project_path, None, OutputFormat::Json))
        .await?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(value["pending"][0]["module"], "core");
    assert_eq!(value["pending"][2]["category"], "schema");

    Ok(())
}

#[tokio::test]
async fn test_up_and_down_against_sqlite_storage() -> Result<()> {
    install_default_drivers();
    let (_temp_dir, project_path) = setup_project()?;

    let output = UpCommandHandler::new()
        .execute(&up(&project_path, None, Some("db")))
        .await?;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        // Migration executed in <durationMs>: <path>.
        let rest = line.strip_prefix("Migration executed in ").unwrap();
        let (duration, path) = rest.split_once(": ").unwrap();
        assert!(duration.parse::<f64>().is_ok(), "{}", line);
        assert!(path.ends_with(".yaml."), "{}", line);
    }

    // マイグレーションの効果と履歴テーブルを確認
    let pool = DatabaseConnectionService::new()
        .create_pool(&DatabaseConfig {
            dialect: Dialect::SQLite,
            host: String::new(),
            port: 0,
            database: project_path.join("app.db").display().to_string(),
            user: None,
            password: None,
            timeout: None,
        })
        .await?;
    let row = sqlx::query("SELECT name FROM users WHERE id = 1")
        .fetch_one(&pool)
        .await?;
    let name: String = row.get(0);
    assert_eq!(name, "admin");
    let row = sqlx::query("SELECT COUNT(*) FROM stratum_migrations")
        .fetch_one(&pool)
        .await?;
    let count: i64 = row.get(0);
    assert_eq!(count, 3);
    pool.close().await;

    let output = StatusCommandHandler::new()
        .execute(&status(&project_path, Some("db"), OutputFormat::Text))
        .await?;
    assert_eq!(output, "No pending migration.");

    let output = DownCommandHandler::new()
        .execute(&down(&project_path, Some("1"), Some("db")))
        .await?;
    assert!(output.ends_with("modules/blog/migrations/schemas/0.1.0-posts.yaml."));

    let output = StatusCommandHandler::new()
        .execute(&status(&project_path, Some("db"), OutputFormat::Text))
        .await?;
    assert!(output.starts_with("1 pending migrations:"));

    Ok(())
}

#[tokio::test]
async fn test_sql_step_on_json_storage_fails_with_rollback_outcome() -> Result<()> {
    let (_temp_dir, project_path) = setup_project()?;

    let err = UpCommandHandler::new()
        .execute(&up(&project_path, None, None))
        .await
        .unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Execution failed (up)"));
    assert!(message.contains("Missing call argument"));
    assert!(message.contains("rollback failed"));

    // 何も記録されていない
    assert!(!project_path.join(".stratum/migrations.json").exists());

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_steps_with_json_storage() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let project_path = temp_dir.path().to_path_buf();
    write(
        &project_path,
        ".stratum.yaml",
        "version: \"1.0\"\nmigrate:\n  storage: local\nmodules:\n  - name: core\n    path: core\nstorages:\n  local:\n    type: json\n    path: state.json\n",
    );
    write(
        &project_path,
        "core/migrations/data/0.1.0-touch.yaml",
        "up:\n  command: sh\n  args: [\"-c\", \"echo $STRATUM_ENV > marker.txt\"]\ndown:\n  command: rm\n  args: [marker.txt]\n",
    );
    write(
        &project_path,
        "core/migrations/data/0.2.0-fail.yaml",
        "up:\n  command: sh\n  args: [\"-c\", \"echo broken >&2; exit 3\"]\n",
    );

    let err = UpCommandHandler::new()
        .execute(&up(&project_path, None, None))
        .await
        .unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Stopped after 1 migration(s)"));
    assert!(message.contains("broken"));
    assert_eq!(fs::read_to_string(project_path.join("marker.txt"))?.trim(), "test");

    let output = DownCommandHandler::new()
        .execute(&down(&project_path, None, None))
        .await?;
    assert_eq!(output.lines().count(), 1);
    assert!(!project_path.join("marker.txt").exists());

    Ok(())
}

#[tokio::test]
async fn test_invalid_count_is_rejected() -> Result<()> {
    let (_temp_dir, project_path) = setup_project()?;

    for count in ["0", "-1", "abc", "4"] {
        let err = UpCommandHandler::new()
            .execute(&up(&project_path, Some(count), Some("db")))
            .await
            .unwrap_err();
        assert!(
            err.to_string().contains("Invalid count parameter"),
            "count {}: {}",
            count,
            err
        );
    }

    let err = StatusCommandHandler::new()
        .execute(&status(&project_path, Some("nope"), OutputFormat::Text))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid storage key: nope"));

    Ok(())
}
