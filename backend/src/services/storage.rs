use std::path::{Path, PathBuf};

use url::Url;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};

pub const PROFILE_IMAGE_PREFIX: &str = "profile-images";
const MAX_FILENAME_LEN: usize = 100;

/// Object store backed by a local directory. Objects are addressed by a
/// relative key and served publicly under `public_url`.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    public_url: Url,
}

impl ObjectStore {
    pub fn new(config: &StorageConfig) -> AppResult<Self> {
        let mut base = config.public_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let public_url = Url::parse(&base)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid storage URL {}: {}", base, e)))?;

        Ok(Self {
            root: PathBuf::from(&config.dir),
            public_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key for a profile image: user id, upload time and original file name.
    pub fn profile_image_key(uid: &str, timestamp_millis: i64, filename: &str) -> String {
        format!(
            "{}/{}_{}_{}",
            PROFILE_IMAGE_PREFIX,
            sanitize_component(uid, "user"),
            timestamp_millis,
            sanitize_component(filename, "image")
        )
    }

    /// Write an object and return the URL it can be fetched from.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> AppResult<String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::info!("Stored object {} ({} bytes)", key, bytes.len());
        self.url_for(key)
    }

    pub fn url_for(&self, key: &str) -> AppResult<String> {
        self.public_url
            .join(key)
            .map(|u| u.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("cannot build URL for {}: {}", key, e)))
    }
}

/// Reduce a user-supplied name to a safe single path component.
pub fn sanitize_component(name: &str, fallback: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let cleaned = cleaned.trim_start_matches('.');
    let cleaned: String = cleaned.chars().take(MAX_FILENAME_LEN).collect();

    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}
