//! Response envelopes and pagination.
//!
//! List endpoints wrap their items together with a `next_url` pointing at
//! the next page; [`Paged::next_page`] follows it. Aliased fields keep the
//! exposed names short where the wire names are verbose.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::illust::{Comment, Illust, UgoiraMetadata};
use super::novel::{Novel, NovelMarker, NovelSeries};
use super::user::User;
use crate::client::PixivClient;
use crate::error::Error;

/// A paginated result that can fetch its continuation.
#[async_trait]
pub trait Paged: DeserializeOwned + Sync {
    /// URL of the next page, if any.
    fn next_url(&self) -> Option<&str>;

    /// Fetches the next page, or `None` when this is the last one.
    ///
    /// # Errors
    ///
    /// Any request or decode error from the follow-up call.
    async fn next_page(&self, client: &PixivClient) -> Result<Option<Self>, Error> {
        match self.next_url() {
            Some(url) => Ok(Some(client.get(url, &[]).await?.parse()?)),
            None => Ok(None),
        }
    }
}

macro_rules! impl_paged {
    ($($ty:ty),+ $(,)?) => {$(
        impl Paged for $ty {
            fn next_url(&self) -> Option<&str> {
                self.next_url.as_deref()
            }
        }
    )+};
}

/// A user search hit with a sample of their works.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPreview {
    pub user: User,
    #[serde(default)]
    pub illusts: Vec<Illust>,
    #[serde(default)]
    pub is_muted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSearchResult {
    #[serde(default, alias = "user_previews")]
    pub users: Vec<UserPreview>,
    #[serde(default)]
    pub next_url: Option<String>,
}

pub use super::user::UserDetail as UserDetailResult;

#[derive(Debug, Clone, Deserialize)]
pub struct IllustSearchResult {
    #[serde(default)]
    pub illusts: Vec<Illust>,
    #[serde(default)]
    pub next_url: Option<String>,
    #[serde(default)]
    pub search_span_limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IllustDetailResult {
    pub illust: Illust,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentsResult {
    #[serde(default, alias = "total_comments")]
    pub total: u64,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub next_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendedResult {
    #[serde(default)]
    pub illusts: Vec<Illust>,
    #[serde(default)]
    pub ranking_illusts: Vec<Illust>,
    #[serde(default)]
    pub contest_exists: bool,
    #[serde(default)]
    pub next_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UgoiraMetadataResult {
    #[serde(alias = "ugoira_metadata")]
    pub metadata: UgoiraMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovelSearchResult {
    #[serde(default)]
    pub novels: Vec<Novel>,
    #[serde(default)]
    pub next_url: Option<String>,
    #[serde(default)]
    pub search_span_limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovelDetailResult {
    pub novel: Novel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovelContentResult {
    #[serde(alias = "novel_text")]
    pub content: String,
    #[serde(
        default,
        alias = "novel_marker",
        deserialize_with = "super::empty_object_as_none"
    )]
    pub marker: Option<NovelMarker>,
    #[serde(
        default,
        alias = "series_prev",
        deserialize_with = "super::empty_object_as_none"
    )]
    pub previous: Option<Novel>,
    #[serde(
        default,
        alias = "series_next",
        deserialize_with = "super::empty_object_as_none"
    )]
    pub next: Option<Novel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovelSeriesResult {
    #[serde(alias = "novel_series_detail")]
    pub series: NovelSeries,
    #[serde(default, alias = "novel_series_first_novel")]
    pub first_novel: Option<Novel>,
    #[serde(default, alias = "novel_series_latest_novel")]
    pub latest_novel: Option<Novel>,
    #[serde(default)]
    pub novels: Vec<Novel>,
    #[serde(default)]
    pub next_url: Option<String>,
}

impl_paged!(
    UserSearchResult,
    IllustSearchResult,
    CommentsResult,
    RecommendedResult,
    NovelSearchResult,
    NovelSeriesResult,
);
