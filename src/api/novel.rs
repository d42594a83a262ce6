//! Novel endpoints.

use chrono::NaiveDate;

use super::{SearchDuration, SearchFilter, SearchSort, SearchTarget, scalar};
use crate::client::PixivClient;
use crate::error::Error;
use crate::model::result::{
    NovelContentResult, NovelDetailResult, NovelSearchResult, NovelSeriesResult,
};

/// Optional parameters of [`NovelApi::search`].
#[derive(Debug, Clone, Default)]
pub struct NovelSearchOptions {
    pub sort: Option<SearchSort>,
    pub target: Option<SearchTarget>,
    pub duration: Option<SearchDuration>,
    pub filter: Option<SearchFilter>,
    pub offset: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Novel endpoints, obtained from [`PixivClient::novel`].
#[derive(Debug, Clone)]
pub struct NovelApi {
    client: PixivClient,
}

impl NovelApi {
    pub(crate) fn new(client: PixivClient) -> Self {
        Self { client }
    }

    /// Searches novels by keyword.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn search(
        &self,
        word: &str,
        options: &NovelSearchOptions,
    ) -> Result<NovelSearchResult, Error> {
        let url = self.client.v1("/search/novel");
        let params = [
            ("word", Some(word.to_string())),
            ("sort", scalar(options.sort)),
            ("search_target", scalar(options.target)),
            ("duration", scalar(options.duration)),
            ("filter", scalar(options.filter)),
            ("offset", scalar(options.offset)),
            (
                "start_date",
                options.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ),
            (
                "end_date",
                options.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ),
            ("merge_plain_keyword_results", Some("true".to_string())),
            ("include_translated_tag_results", Some("true".to_string())),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Fetches one novel.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for unknown ids, or any request error.
    pub async fn detail(&self, novel_id: u64) -> Result<NovelDetailResult, Error> {
        let url = self.client.v2("/novel/detail");
        let params = [("novel_id", Some(novel_id.to_string()))];
        self.client.get(&url, &params).await?.parse()
    }

    /// Fetches a novel's text.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn content(&self, novel_id: u64) -> Result<NovelContentResult, Error> {
        let url = self.client.v1("/novel/text");
        let params = [("novel_id", Some(novel_id.to_string()))];
        self.client.get(&url, &params).await?.parse()
    }

    /// Fetches a novel series with its entries.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn series(
        &self,
        series_id: u64,
        filter: Option<SearchFilter>,
    ) -> Result<NovelSeriesResult, Error> {
        let url = self.client.v2("/novel/series");
        let params = [
            ("series_id", Some(series_id.to_string())),
            ("filter", scalar(filter)),
        ];
        self.client.get(&url, &params).await?.parse()
    }
}
