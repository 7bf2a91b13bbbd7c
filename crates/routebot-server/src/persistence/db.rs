//! Database connection and initialization.

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

const SCHEMA: &str = include_str!("../../migrations/001_init.sql");

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Initialize the SQLite database.
///
/// Creates the database file if it doesn't exist, runs migrations,
/// and returns a connection pool.
pub async fn init_database(db_path: &str, max_connections: u32) -> Result<Database> {
    let in_memory = db_path == ":memory:";
    if !in_memory {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = if in_memory {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite:{}?mode=rwc", db_path)
    };

    info!("Connecting to database: {}", db_path);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(&db_url)
        .await?;

    run_migrations(&pool).await?;

    Ok(Database { pool })
}

/// Apply the schema. Every statement is `IF NOT EXISTS`, so re-running
/// against an existing database is a no-op and any failure is fatal.
async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let statements = schema_statements(SCHEMA);
    info!("Applying schema ({} statements)", statements.len());

    for (index, statement) in statements.iter().enumerate() {
        sqlx::query(statement.as_str())
            .execute(pool)
            .await
            .with_context(|| format!("schema statement {} failed", index + 1))?;
    }
    Ok(())
}

/// Split a schema file into statements, dropping `--` comment lines.
fn schema_statements(sql: &str) -> Vec<String> {
    let uncommented: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    uncommented
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}
