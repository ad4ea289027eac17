//! Startup helpers: database connection + migrations and assembly of the
//! shared application state.

use std::{path::Path, sync::Arc};

use anyhow::Result;

use crate::config::Config;
use crate::services::identity::IdentityVerifier;
use crate::services::storage::ObjectStore;
use crate::AppState;

/// Redact credentials from a database URL before logging it.
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let scheme = url.scheme();
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = url.path();
        format!("{}://{}{}{}", scheme, host, port_part, path)
    } else if let Some(at_pos) = db_url.find('@') {
        format!("(redacted){}", &db_url[at_pos + 1..])
    } else {
        "(redacted)".to_string()
    }
}

/// Open the SQLite pool and run migrations.
///
/// File databases get their parent directory created first. `sqlite::memory:`
/// is supported for throwaway instances.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    let pool = if db_url.starts_with("sqlite::memory:") {
        // Every connection to an in-memory database is a separate database
        sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(db_url)
            .await?
    } else {
        let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
        let db_file_path = Path::new(db_path);

        if let Some(parent) = db_file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    )
                })?;
            }
        }

        let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect_with(connect_options)
            .await?
    };

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Build the process-wide application state. Called once at startup; the
/// returned handle is shared by every request.
pub async fn build_state(config: Config, db: sqlx::SqlitePool) -> Result<Arc<AppState>> {
    let storage = ObjectStore::new(&config.storage)
        .map_err(|e| anyhow::anyhow!("Failed to configure object store: {}", e))?;
    tokio::fs::create_dir_all(storage.root()).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to create storage directory {}: {}",
            storage.root().display(),
            e
        )
    })?;
    tracing::info!("Object store rooted at {}", storage.root().display());

    let identity = IdentityVerifier::new(&config.identity);

    Ok(Arc::new(AppState {
        db,
        config,
        identity,
        storage,
    }))
}
