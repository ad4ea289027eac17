use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::db::{Profile, ProfileRepository, SocialLink};
use crate::error::{AppError, AppResult};
use crate::services::image;
use crate::services::storage::ObjectStore;
use crate::validation;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

pub struct ProfileService;

impl ProfileService {
    pub async fn get_profile(state: &Arc<AppState>, user_id: &str) -> AppResult<Profile> {
        ProfileRepository::find_by_user_id(&state.db, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("profile".to_string()))
    }

    /// Decode and validate a partial update body, then merge it into the
    /// user's document.
    pub async fn update_profile(
        state: &Arc<AppState>,
        user_id: &str,
        body: &Value,
    ) -> AppResult<Profile> {
        let update = validation::parse_profile_update(body)?;

        let profile = ProfileRepository::merge_update(&state.db, user_id, &update).await?;
        tracing::info!("Updated profile for user {}", user_id);
        Ok(profile)
    }

    pub async fn social_links(state: &Arc<AppState>, user_id: &str) -> AppResult<Vec<SocialLink>> {
        ProfileRepository::social_links(&state.db, user_id).await
    }

    /// Validate the whole submitted list and replace the stored one with it.
    /// A single failing element leaves storage untouched.
    pub async fn replace_social_links(
        state: &Arc<AppState>,
        user_id: &str,
        body: &Value,
    ) -> AppResult<Vec<SocialLink>> {
        let links = validation::parse_social_links(body)?;

        let profile =
            ProfileRepository::replace_social_links(&state.db, user_id, &links).await?;
        tracing::info!(
            "Replaced social links for user {} ({} entries)",
            user_id,
            profile.social_links.len()
        );
        Ok(profile.social_links)
    }

    /// Bound-check an uploaded image and write it to the object store.
    pub async fn store_profile_image(
        state: &Arc<AppState>,
        user_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> AppResult<StoredImage> {
        // Decoding and resizing are CPU bound
        let processed = tokio::task::spawn_blocking(move || image::enforce_bounds(bytes))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("image task panicked: {}", e)))??;

        let key = ObjectStore::profile_image_key(user_id, Utc::now().timestamp_millis(), filename);
        let url = state.storage.put(&key, &processed.bytes).await?;

        Ok(StoredImage {
            url,
            width: processed.width,
            height: processed.height,
        })
    }
}
