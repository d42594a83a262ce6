//! Illustration records, comments and ugoira metadata.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::image::{Quality, QualityUrl};
use super::user::User;
use crate::client::PixivClient;
use crate::context;
use crate::error::Error;
use crate::ugoira::{UgoiraContent, UgoiraKind};

/// The artwork kind reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IllustType {
    Illust,
    Manga,
    Ugoira,
    Novel,
}

impl IllustType {
    /// Wire name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Illust => "illust",
            Self::Manga => "manga",
            Self::Ugoira => "ugoira",
            Self::Novel => "novel",
        }
    }
}

/// How much AI was involved in producing a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "u8")]
pub enum AiType {
    NotAi,
    Assisted,
    Generated,
}

impl From<u8> for AiType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::NotAi,
            1 => Self::Assisted,
            _ => Self::Generated,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub translated_name: Option<String>,
}

/// A series an artwork or novel belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Series {
    pub id: u64,
    pub title: String,
}

/// Image URLs of one page of a multi-page work.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaPage {
    pub image_urls: QualityUrl,
}

/// Full-size URL of a single-page work.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaSinglePage {
    #[serde(default, alias = "original_image_url")]
    pub original: Option<String>,
}

/// An illustration, manga or ugoira work.
#[derive(Debug, Clone, Deserialize)]
pub struct Illust {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: IllustType,
    pub image_urls: QualityUrl,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub restrict: i64,
    pub user: User,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub tools: Vec<String>,
    pub create_date: DateTime<FixedOffset>,
    pub page_count: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub sanity_level: i64,
    #[serde(default)]
    pub x_restrict: i64,
    #[serde(default, deserialize_with = "super::empty_object_as_none")]
    pub series: Option<Series>,
    #[serde(default)]
    pub meta_single_page: MetaSinglePage,
    #[serde(default)]
    pub meta_pages: Vec<MetaPage>,
    #[serde(default)]
    pub total_view: u64,
    #[serde(default)]
    pub total_bookmarks: u64,
    #[serde(default)]
    pub is_bookmarked: bool,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub total_comments: Option<u64>,
    #[serde(default, alias = "illust_ai_type")]
    pub ai_type: Option<AiType>,
    // Filled on first ugoira_metadata() call, never by deserialization.
    #[serde(skip)]
    ugoira_cache: OnceCell<UgoiraMetadata>,
}

impl Illust {
    /// Public artwork page URL.
    #[must_use]
    pub fn link(&self) -> String {
        format!("https://www.pixiv.net/artworks/{}/", self.id)
    }

    /// Whether the sanity level marks the work as sensitive.
    #[must_use]
    pub fn is_nsfw(&self) -> bool {
        self.sanity_level > 5
    }

    /// Full-size URLs of every page.
    #[must_use]
    pub fn all_image_urls(&self) -> Vec<&str> {
        if self.meta_pages.is_empty() {
            self.meta_single_page
                .original
                .as_deref()
                .or_else(|| self.image_urls.link())
                .into_iter()
                .collect()
        } else {
            self.meta_pages
                .iter()
                .filter_map(|page| page.image_urls.link())
                .collect()
        }
    }

    /// Downloads the first page through the scope-bound client.
    ///
    /// # Errors
    ///
    /// [`Error::ClientNotFound`] outside a [`context::scope`],
    /// [`Error::ArtworkTypeMismatch`] for ugoira works, or any download
    /// error.
    pub async fn download(&self) -> Result<bytes::Bytes, Error> {
        if self.kind == IllustType::Ugoira {
            return Err(Error::ArtworkTypeMismatch {
                expected: "illust",
                actual: self.kind.as_str().to_string(),
                hint: "use download_ugoira for animated works",
            });
        }
        let client = context::current()?;
        let url = self
            .meta_single_page
            .original
            .as_deref()
            .or_else(|| self.image_urls.link())
            .ok_or(Error::MissingUrl { what: "image" })?
            .to_string();
        client.download(&url).await
    }

    /// The frame manifest of this ugoira work, fetched at most once per
    /// instance; repeat calls return the cached manifest.
    ///
    /// # Errors
    ///
    /// Any request or decode error from the metadata endpoint.
    pub async fn ugoira_metadata(&self, client: &PixivClient) -> Result<&UgoiraMetadata, Error> {
        self.ugoira_cache
            .get_or_try_init(|| async {
                Ok(client.illust().ugoira_metadata(self.id).await?.metadata)
            })
            .await
    }

    /// Decodes this ugoira work through the scope-bound client, taking
    /// the best archive quality available.
    ///
    /// # Errors
    ///
    /// [`Error::ClientNotFound`] outside a [`context::scope`], or any
    /// error from [`crate::ugoira::download`].
    pub async fn download_ugoira(&self, kind: UgoiraKind) -> Result<Option<UgoiraContent>, Error> {
        let client = context::current()?;
        crate::ugoira::download(&client, self, Quality::Original, kind).await
    }
}

/// A comment on an illustration.
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub comment: String,
    pub date: DateTime<FixedOffset>,
    pub user: User,
    #[serde(
        default,
        alias = "parent_comment",
        deserialize_with = "super::empty_object_as_none"
    )]
    pub parent: Option<Box<Comment>>,
}

/// One frame of an ugoira animation.
#[derive(Debug, Clone, Deserialize)]
pub struct UgoiraFrame {
    /// File name inside the ZIP container.
    pub file: String,
    /// Display duration in milliseconds.
    pub delay: u64,
}

/// Frame manifest and archive URLs of an ugoira work.
#[derive(Debug, Clone, Deserialize)]
pub struct UgoiraMetadata {
    #[serde(alias = "zip_url")]
    pub zip_urls: QualityUrl,
    pub frames: Vec<UgoiraFrame>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_illust_type_decodes_from_wire_names() {
        let kind: IllustType = serde_json::from_str(r#""ugoira""#).unwrap();
        assert_eq!(kind, IllustType::Ugoira);
        assert_eq!(kind.as_str(), "ugoira");
    }

    #[test]
    fn test_ai_type_decodes_from_integers() {
        let kind: AiType = serde_json::from_str("0").unwrap();
        assert_eq!(kind, AiType::NotAi);
        let kind: AiType = serde_json::from_str("2").unwrap();
        assert_eq!(kind, AiType::Generated);
    }

    #[test]
    fn test_ugoira_metadata_decodes() {
        let metadata: UgoiraMetadata = serde_json::from_str(
            r#"{
                "zip_urls": {"medium": "https://i.pximg.net/x_ugoira600x600.zip"},
                "frames": [
                    {"file": "000000.jpg", "delay": 100},
                    {"file": "000001.jpg", "delay": 200}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(metadata.frames.len(), 2);
        assert_eq!(metadata.frames[1].delay, 200);
        assert!(metadata.zip_urls.link().is_some());
    }

    #[test]
    fn test_comment_with_empty_parent() {
        let comment: Comment = serde_json::from_str(
            r#"{
                "id": 1,
                "comment": "nice",
                "date": "2024-05-01T12:00:00+09:00",
                "user": {"id": 2, "name": "n", "account": "a"},
                "parent_comment": {}
            }"#,
        )
        .unwrap();
        assert!(comment.parent.is_none());
    }
}
