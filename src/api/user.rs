//! User endpoints.

use super::{SearchDuration, SearchFilter, SearchSort, scalar};
use crate::client::PixivClient;
use crate::error::Error;
use crate::model::illust::IllustType;
use crate::model::result::{
    IllustSearchResult, NovelSearchResult, UserDetailResult, UserSearchResult,
};

/// Optional parameters of [`UserApi::search`].
#[derive(Debug, Clone, Default)]
pub struct UserSearchOptions {
    pub sort: Option<SearchSort>,
    pub duration: Option<SearchDuration>,
    pub filter: Option<SearchFilter>,
    pub offset: Option<u32>,
}

/// User endpoints, obtained from [`PixivClient::user`].
#[derive(Debug, Clone)]
pub struct UserApi {
    client: PixivClient,
}

impl UserApi {
    pub(crate) fn new(client: PixivClient) -> Self {
        Self { client }
    }

    /// Searches users by name.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn search(
        &self,
        word: &str,
        options: &UserSearchOptions,
    ) -> Result<UserSearchResult, Error> {
        let url = self.client.v1("/search/user");
        let params = [
            ("word", Some(word.to_string())),
            ("sort", scalar(options.sort)),
            ("duration", scalar(options.duration)),
            ("filter", scalar(options.filter)),
            ("offset", scalar(options.offset)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Fetches one user's profile.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for unknown ids, or any request error.
    pub async fn detail(
        &self,
        user_id: u64,
        filter: Option<SearchFilter>,
    ) -> Result<UserDetailResult, Error> {
        let url = self.client.v1("/user/detail");
        let params = [
            ("user_id", Some(user_id.to_string())),
            ("filter", scalar(filter)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists a user's works of the given content type.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn illusts(
        &self,
        user_id: u64,
        content_type: IllustType,
        filter: Option<SearchFilter>,
        offset: Option<u32>,
    ) -> Result<IllustSearchResult, Error> {
        let url = self.client.v1("/user/illusts");
        let params = [
            ("user_id", Some(user_id.to_string())),
            ("type", Some(content_type.as_str().to_string())),
            ("filter", scalar(filter)),
            ("offset", scalar(offset)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists a user's public illustration bookmarks.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn bookmarks(
        &self,
        user_id: u64,
        tag: Option<&str>,
        max_bookmark_id: Option<u64>,
        filter: Option<SearchFilter>,
    ) -> Result<IllustSearchResult, Error> {
        let url = self.client.v1("/user/bookmarks/illust");
        let params = [
            ("user_id", Some(user_id.to_string())),
            ("restrict", Some("public".to_string())),
            ("tag", tag.map(String::from)),
            ("max_bookmark_id", scalar(max_bookmark_id)),
            ("filter", scalar(filter)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists a user's novels.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn novels(
        &self,
        user_id: u64,
        filter: Option<SearchFilter>,
        offset: Option<u32>,
    ) -> Result<NovelSearchResult, Error> {
        let url = self.client.v1("/user/novels");
        let params = [
            ("user_id", Some(user_id.to_string())),
            ("filter", scalar(filter)),
            ("offset", scalar(offset)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists the users a user follows.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn following(
        &self,
        user_id: u64,
        offset: Option<u32>,
    ) -> Result<UserSearchResult, Error> {
        let url = self.client.v1("/user/following");
        let params = [
            ("user_id", Some(user_id.to_string())),
            ("restrict", Some("public".to_string())),
            ("offset", scalar(offset)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists a user's followers.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn followers(
        &self,
        user_id: u64,
        offset: Option<u32>,
    ) -> Result<UserSearchResult, Error> {
        let url = self.client.v1("/user/follower");
        let params = [
            ("user_id", Some(user_id.to_string())),
            ("offset", scalar(offset)),
        ];
        self.client.get(&url, &params).await?.parse()
    }

    /// Lists users similar to the given one.
    ///
    /// # Errors
    ///
    /// Any request or decode error.
    pub async fn related(
        &self,
        seed_user_id: u64,
        filter: Option<SearchFilter>,
        offset: Option<u32>,
    ) -> Result<UserSearchResult, Error> {
        let url = self.client.v1("/user/related");
        let params = [
            ("seed_user_id", Some(seed_user_id.to_string())),
            ("filter", scalar(filter)),
            ("offset", scalar(offset)),
        ];
        self.client.get(&url, &params).await?.parse()
    }
}
