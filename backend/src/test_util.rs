use std::path::Path;
use std::sync::Arc;

use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;

use crate::config::Config;
use crate::AppState;

pub const TEST_SECRET: &str = "test-secret";

/// Single-connection in-memory database with the real migrations applied.
pub async fn memory_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("JSON body")
}

/// A fully wired application backed by an in-memory database and a
/// throwaway storage directory, removed when the app is dropped.
pub struct TestApp {
    pub state: Arc<AppState>,
    storage_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let storage_dir = tempfile::tempdir().expect("storage dir");

        let mut config = Config::default();
        config.database.url = "sqlite::memory:".to_string();
        config.identity.jwt_secret = TEST_SECRET.to_string();
        config.storage.dir = storage_dir.path().to_string_lossy().into_owned();

        let state = crate::services::init::build_state(config, memory_pool().await)
            .await
            .expect("test state");

        Self { state, storage_dir }
    }

    pub fn router(&self) -> Router {
        crate::build_router(self.state.clone())
    }

    pub fn token(&self, uid: &str) -> String {
        self.state
            .identity
            .issue(uid, None, chrono::Duration::minutes(5))
            .expect("test token")
    }

    pub fn storage_dir(&self) -> &Path {
        self.storage_dir.path()
    }
}
