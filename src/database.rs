use color_eyre::{Result, eyre::Context};
use sea_orm::{ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection};
use std::path::Path;
use std::time::Duration;

const SCHEMA: &str = include_str!("../schema.sql");

pub struct Database {
    pub conn: DatabaseConnection,
}

impl Database {
    /// Open or create a database at the given path
    pub async fn open(path: &Path) -> Result<Self> {
        log::debug!("Opening database at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create database directory: {}",
                parent.display()
            ))?;
        }

        let url = format!("sqlite://{}?mode=rwc", path.display());

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(8)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let conn = SeaDatabase::connect(opt)
            .await
            .context(format!("Failed to open database: {}", path.display()))?;

        apply_schema(&conn).await?;

        log::info!("Database ready at: {}", path.display());
        Ok(Database { conn })
    }
}

/// Runs every statement of `schema.sql`. Statements are idempotent.
pub async fn apply_schema<C: ConnectionTrait>(conn: &C) -> Result<()> {
    log::debug!("Applying database schema");
    for statement in schema_statements(SCHEMA) {
        conn.execute_unprepared(&statement)
            .await
            .with_context(|| format!("Failed to execute schema statement: {}", statement))?;
    }
    Ok(())
}

/// Splits a SQL script on `;`, dropping comment lines and empty statements.
fn schema_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(|statement| {
            statement
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}
