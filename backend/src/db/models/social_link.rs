use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static::lazy_static! {
    static ref TWITTER_URL: Regex = Regex::new(r"^https?://(www\.)?twitter\.com/.+").unwrap();
    static ref INSTAGRAM_URL: Regex = Regex::new(r"^https?://(www\.)?instagram\.com/.+").unwrap();
    static ref TIKTOK_URL: Regex = Regex::new(r"^https?://(www\.)?tiktok\.com/@.+").unwrap();
    static ref NICONICO_URL: Regex = Regex::new(r"^https?://(www\.)?nicovideo\.jp/user/.+").unwrap();
}

/// Platforms a profile can link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Instagram,
    Tiktok,
    Niconico,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Twitter,
        Platform::Instagram,
        Platform::Tiktok,
        Platform::Niconico,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Niconico => "niconico",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Twitter => "Twitter",
            Platform::Instagram => "Instagram",
            Platform::Tiktok => "TikTok",
            Platform::Niconico => "niconico",
        }
    }

    fn url_pattern(&self) -> &'static Regex {
        match self {
            Platform::Twitter => &TWITTER_URL,
            Platform::Instagram => &INSTAGRAM_URL,
            Platform::Tiktok => &TIKTOK_URL,
            Platform::Niconico => &NICONICO_URL,
        }
    }

    /// Whether `url` points at a profile on this platform.
    pub fn matches(&self, url: &str) -> bool {
        self.url_pattern().is_match(url)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}

/// One platform + URL entry of a profile's link list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub id: String,
    pub platform: Platform,
    pub url: String,
}
