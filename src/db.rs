use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub async fn init_db(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid DATABASE_URL: {database_url}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    if let Some(dir) = database_dir(database_url) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create database directory {dir:?}"))?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run database migrations")?;

    info!(database_url, "Database ready");
    Ok(pool)
}

/// Parent directory of a file-backed sqlite URL, if it has one.
fn database_dir(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_dir_is_taken_from_file_urls() {
        assert_eq!(database_dir("sqlite://data/attendance.db"), Some(Path::new("data")));
        assert_eq!(
            database_dir("sqlite:/var/lib/qr/attendance.db?mode=rwc"),
            Some(Path::new("/var/lib/qr"))
        );
        assert_eq!(database_dir("sqlite://attendance.db"), None);
        assert_eq!(database_dir("sqlite::memory:"), None);
    }
}
