//! Database initialization
//!
//! Creates the engine's tables if needed. All statements are idempotent and
//! safe to run at every startup.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use strix_common::Result;
use tracing::info;

/// Initialize a file-backed database, creating it on first run
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; parameter reads during
    // dispatch race against value upserts from the web application
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// In-memory database for tests
///
/// Capped at one connection: with a pool, every connection would see its own
/// empty memory database.
pub async fn init_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_parameter_values_table(pool).await?;
    create_jobs_table(pool).await?;
    create_task_reports_table(pool).await?;
    Ok(())
}

async fn create_parameter_values_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parameter_values (
            plugin      TEXT NOT NULL,
            parameter   TEXT NOT NULL,
            scope       TEXT NOT NULL,
            scope_id    TEXT NOT NULL DEFAULT '',
            value       TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            PRIMARY KEY (plugin, parameter, scope, scope_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_jobs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id                     TEXT PRIMARY KEY,
            user_id                TEXT,
            observable             TEXT NOT NULL,
            observable_kind        TEXT NOT NULL,
            status                 TEXT NOT NULL,
            runtime_configuration  TEXT NOT NULL,
            received_at            TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_task_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS task_reports (
            task_id     TEXT PRIMARY KEY,
            job_id      TEXT NOT NULL,
            plugin      TEXT NOT NULL,
            status      TEXT NOT NULL,
            errors      TEXT NOT NULL,
            start_time  TEXT NOT NULL,
            end_time    TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_task_reports_job ON task_reports(job_id)")
        .execute(pool)
        .await?;
    Ok(())
}
