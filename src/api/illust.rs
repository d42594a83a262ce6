//! Illustration endpoints.

use chrono::NaiveDate;

use super::{SearchDuration, SearchFilter, SearchSort, SearchTarget, scalar};
use crate::client::PixivClient;
use crate::error::Error;
use crate::model::illust::IllustType;
use crate::model::image::Quality;
use crate::model::result::{
    CommentsResult, IllustDetailResult, IllustSearchResult, RecommendedResult,
    UgoiraMetadataResult,
};
use crate::ugoira::{UgoiraContent, UgoiraKind};

/// Optional parameters of [`IllustApi::search`].
#[derive(Debug, Clone, Default)]
pub struct IllustSearchOptions {
    pub sort: Option<SearchSort>,
    pub target: Option<SearchTarget>,
    pub duration: Option<SearchDuration>,
    pub filter: Option<SearchFilter>,
    pub offset: Option<u32>,
    pub min_bookmarks: Option<u32>,
    pub max_bookmarks: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Illustration endpoints, obtained from [`PixivClient::illust`].
#[derive(Debug, Clone)]
pub struct IllustApi {
    client: PixivClient,
}

impl IllustApi {
    pub(crate) fn new(client: PixivClient) -> Self {
        Self { client }
    }

    /// Searches illustrations by keyword.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn search(
        &self,
        word: &str,
        options: &IllustSearchOptions,
    ) -> Result<IllustSearchResult, Error> {
        let url = self.client.v1("/search/illust");
        let params = [
            ("word", Some(word.to_string())),
            ("sort", scalar(options.sort)),
            ("search_target", scalar(options.target)),
            ("duration", scalar(options.duration)),
            ("filter", scalar(options.filter)),
            ("offset", scalar(options.offset)),
            ("bookmark_num_min", scalar(options.min_bookmarks)),
            ("bookmark_num_max", scalar(options.max_bookmarks)),
            (
                "start_date",
                options.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ),
            (
                "end_date",
                options.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Fetches one illustration.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for unknown ids, or any request error.
    pub async fn detail(
        &self,
        illust_id: u64,
        filter: Option<SearchFilter>,
    ) -> Result<IllustDetailResult, Error> {
        let url = self.client.v1("/illust/detail");
        let params = [
            ("illust_id", Some(illust_id.to_string())),
            ("filter", scalar(filter)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists comments on an illustration.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn comments(
        &self,
        illust_id: u64,
        offset: Option<u32>,
    ) -> Result<CommentsResult, Error> {
        let url = self.client.v1("/illust/comments");
        let params = [
            ("illust_id", Some(illust_id.to_string())),
            ("offset", scalar(offset)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists works related to an illustration.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn related(
        &self,
        illust_id: u64,
        offset: Option<u32>,
        filter: Option<SearchFilter>,
        seed_illust_ids: &[u64],
    ) -> Result<IllustSearchResult, Error> {
        let url = self.client.v2("/illust/related");
        let seeds = if seed_illust_ids.is_empty() {
            None
        } else {
            Some(
                seed_illust_ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(","),
            )
        };
        let params = [
            ("illust_id", Some(illust_id.to_string())),
            ("offset", scalar(offset)),
            ("filter", scalar(filter)),
            ("seed_illust_ids", seeds),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists recommended works of the given content type.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn recommended(
        &self,
        content_type: IllustType,
        offset: Option<u32>,
        filter: Option<SearchFilter>,
    ) -> Result<RecommendedResult, Error> {
        let url = self.client.v1("/illust/recommended");
        let params = [
            ("content_type", Some(content_type.as_str().to_string())),
            ("include_ranking_label", Some("true".to_string())),
            ("offset", scalar(offset)),
            ("filter", scalar(filter)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists new works from followed users.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn follow(&self, offset: Option<u32>) -> Result<IllustSearchResult, Error> {
        let url = self.client.v2("/illust/follow");
        let params = [
            ("restrict", Some("public".to_string())),
            ("offset", scalar(offset)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists the newest public works.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn new_illusts(
        &self,
        content_type: IllustType,
        max_illust_id: Option<u64>,
        filter: Option<SearchFilter>,
    ) -> Result<IllustSearchResult, Error> {
        let url = self.client.v1("/illust/new");
        let params = [
            ("content_type", Some(content_type.as_str().to_string())),
            ("max_illust_id", scalar(max_illust_id)),
            ("filter", scalar(filter)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Fetches the frame manifest of an ugoira work.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn ugoira_metadata(&self, illust_id: u64) -> Result<UgoiraMetadataResult, Error> {
        let url = self.client.v1("/ugoira/metadata");
        let params = [("illust_id", Some(illust_id.to_string()))];
        self.client.get(&url, &params).await?.parse()
    }

    /// Downloads the first page of a still work.
    ///
    /// # Errors
    ///
    /// [`Error::ArtworkTypeMismatch`] when the id names an ugoira work,
    /// or any request error.
    pub async fn download(&self, illust_id: u64) -> Result<bytes::Bytes, Error> {
        let illust = self.detail(illust_id, None).await?.illust;
        if illust.kind == IllustType::Ugoira {
            return Err(Error::ArtworkTypeMismatch {
                expected: "illust",
                actual: illust.kind.as_str().to_string(),
                hint: "use download_ugoira for animated works",
            });
        }
        let url = illust
            .meta_single_page
            .original
            .as_deref()
            .or_else(|| illust.image_urls.link())
            .ok_or(Error::MissingUrl { what: "image" })?
            .to_string();
        self.client.download(&url).await
    }

    /// Downloads and decodes an ugoira work at the best archive quality.
    ///
    /// # Errors
    ///
    /// [`Error::ArtworkTypeMismatch`] when the id names a still work, or
    /// any error from [`crate::ugoira::download`].
    pub async fn download_ugoira(
        &self,
        illust_id: u64,
        kind: UgoiraKind,
    ) -> Result<Option<UgoiraContent>, Error> {
        self.download_ugoira_at(illust_id, Quality::Original, kind)
            .await
    }

    /// Downloads and decodes an ugoira work, picking the archive at the
    /// given quality tier (falling back tier by tier below it).
    ///
    /// # Errors
    ///
    /// See [`Self::download_ugoira`].
    pub async fn download_ugoira_at(
        &self,
        illust_id: u64,
        quality: Quality,
        kind: UgoiraKind,
    ) -> Result<Option<UgoiraContent>, Error> {
        let illust = self.detail(illust_id, None).await?.illust;
        crate::ugoira::download(&self.client, &illust, quality, kind).await
    }
}
