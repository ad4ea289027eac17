use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use sqlx::SqlitePool;

use crate::db::models::*;
use crate::error::{AppError, AppResult};
use crate::validation::ProfileUpdate;

const PROFILE_COLUMNS: &str = r#"
    user_id, display_name, bio, contact_email, profile_image_url,
    social_links, created_at, updated_at
"#;

// ============================================================================
// Profile Repository
// ============================================================================

/// Per-user profile documents. Every write is keyed by the caller's verified
/// user id and creates the document when it does not exist yet.
pub struct ProfileRepository;

impl ProfileRepository {
    pub async fn find_by_user_id(pool: &SqlitePool, user_id: &str) -> AppResult<Option<Profile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM profiles WHERE user_id = ?",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        row.map(|r| profile_from_row(&r)).transpose()
    }

    /// Merge-write: fields present in `update` overwrite the stored value,
    /// absent fields keep whatever the document already holds.
    pub async fn merge_update(
        pool: &SqlitePool,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> AppResult<Profile> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO profiles (
                user_id, display_name, bio, contact_email, profile_image_url,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = COALESCE(excluded.display_name, profiles.display_name),
                bio = COALESCE(excluded.bio, profiles.bio),
                contact_email = COALESCE(excluded.contact_email, profiles.contact_email),
                profile_image_url = COALESCE(excluded.profile_image_url, profiles.profile_image_url),
                updated_at = excluded.updated_at
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(&update.display_name)
        .bind(&update.bio)
        .bind(&update.contact_email)
        .bind(&update.profile_image_url)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        profile_from_row(&row)
    }

    /// Replace-write of the whole link list. Nothing is merged or appended.
    pub async fn replace_social_links(
        pool: &SqlitePool,
        user_id: &str,
        links: &[SocialLink],
    ) -> AppResult<Profile> {
        let now = Utc::now().naive_utc();
        let encoded = serde_json::to_string(links).map_err(|e| AppError::Internal(e.into()))?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO profiles (user_id, social_links, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                social_links = excluded.social_links,
                updated_at = excluded.updated_at
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(encoded)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        profile_from_row(&row)
    }

    /// Stored link list, empty when the user has no document yet.
    pub async fn social_links(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<SocialLink>> {
        let encoded: Option<String> =
            sqlx::query_scalar("SELECT social_links FROM profiles WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(pool)
                .await
                .map_err(AppError::Database)?;

        match encoded {
            Some(encoded) => decode_links(&encoded),
            None => Ok(Vec::new()),
        }
    }
}

fn decode_links(encoded: &str) -> AppResult<Vec<SocialLink>> {
    if encoded.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(encoded).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("corrupt social_links column: {}", e))
    })
}

fn profile_from_row(r: &SqliteRow) -> AppResult<Profile> {
    let links: String = r.get("social_links");
    Ok(Profile {
        user_id: r.get("user_id"),
        display_name: r.get("display_name"),
        bio: r.get("bio"),
        contact_email: r.get("contact_email"),
        profile_image_url: r.get("profile_image_url"),
        social_links: decode_links(&links)?,
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}
