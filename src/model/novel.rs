//! Novel records.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use super::illust::{AiType, Series, Tag};
use super::image::QualityUrl;
use super::user::User;

/// A novel as returned by search and detail endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Novel {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub restrict: i64,
    #[serde(default)]
    pub x_restrict: i64,
    #[serde(default)]
    pub is_original: bool,
    #[serde(alias = "image_urls")]
    pub image_url: QualityUrl,
    pub create_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub page_count: u32,
    pub text_length: u64,
    pub user: User,
    #[serde(default, deserialize_with = "super::empty_object_as_none")]
    pub series: Option<Series>,
    #[serde(default)]
    pub is_bookmarked: bool,
    #[serde(default)]
    pub total_bookmarks: u64,
    #[serde(default)]
    pub total_view: u64,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub total_comments: u64,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_mypixiv_only: bool,
    #[serde(default)]
    pub is_x_restricted: bool,
    #[serde(default, alias = "novel_ai_type")]
    pub ai_type: Option<AiType>,
}

impl Novel {
    /// Public novel page URL.
    #[must_use]
    pub fn link(&self) -> String {
        format!("https://www.pixiv.net/novel/show.php?id={}", self.id)
    }
}

/// Reader position marker attached to novel text.
#[derive(Debug, Clone, Deserialize)]
pub struct NovelMarker {
    pub page: u32,
}

/// Series header from the novel series endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct NovelSeries {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub is_original: bool,
    #[serde(default)]
    pub is_concluded: bool,
    #[serde(default, alias = "total_character_count")]
    pub character_count: u64,
    pub user: User,
    #[serde(default, alias = "display_text")]
    pub display: String,
}
