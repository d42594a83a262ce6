//! User records.

use serde::Deserialize;

use super::image::QualityUrl;

/// A user as embedded in artwork and search payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub account: String,
    #[serde(default)]
    pub profile_image_urls: QualityUrl,
    #[serde(default)]
    pub is_followed: Option<bool>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl User {
    /// Profile page URL.
    #[must_use]
    pub fn link(&self) -> String {
        format!("https://www.pixiv.net/users/{}", self.id)
    }
}

/// The account object returned by the token endpoint.
///
/// Unlike [`User`], its id comes over the wire as a string.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account: String,
    #[serde(default)]
    pub mail_address: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub x_restrict: i64,
    #[serde(default)]
    pub is_mail_authorized: bool,
}

/// Extended profile fields from the user detail endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub webpage: Option<String>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub birth: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub total_follow_users: u64,
    #[serde(default)]
    pub total_illusts: u64,
    #[serde(default)]
    pub total_manga: u64,
    #[serde(default)]
    pub total_novels: u64,
    #[serde(default)]
    pub total_illust_bookmarks_public: u64,
    #[serde(default)]
    pub background_image_url: Option<String>,
    #[serde(default)]
    pub twitter_account: Option<String>,
    #[serde(default)]
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
}

/// Which profile fields the user shows publicly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfilePublicity {
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub birth_day: String,
    #[serde(default)]
    pub birth_year: String,
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub pawoo: bool,
}

/// Self-reported workspace description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserWorkspace {
    #[serde(default)]
    pub pc: Option<String>,
    #[serde(default)]
    pub monitor: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub tablet: Option<String>,
    #[serde(default)]
    pub music: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub workspace_image_url: Option<String>,
}

/// Aggregate view returned by the user detail endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDetail {
    pub user: User,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub profile_publicity: UserProfilePublicity,
    #[serde(default)]
    pub workspace: UserWorkspace,
}
