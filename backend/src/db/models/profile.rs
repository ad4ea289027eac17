use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::SocialLink;

/// Stored profile document, one per user. Every field except the key and the
/// timestamps may be absent because documents are created by partial writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub contact_email: Option<String>,
    pub profile_image_url: Option<String>,
    pub social_links: Vec<SocialLink>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
