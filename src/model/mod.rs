//! Typed records for API payloads.
//!
//! Field names follow the wire format, with serde aliases where the API
//! uses a longer name than the one exposed here. Unknown fields are
//! ignored so new API fields never break decoding.

pub mod illust;
pub mod image;
pub mod novel;
pub mod result;
pub mod user;

pub use illust::{
    AiType, Comment, Illust, IllustType, MetaPage, MetaSinglePage, Series, Tag, UgoiraFrame,
    UgoiraMetadata,
};
pub use image::{Quality, QualityUrl};
pub use novel::{Novel, NovelMarker, NovelSeries};
pub use result::{
    CommentsResult, IllustDetailResult, IllustSearchResult, NovelContentResult,
    NovelDetailResult, NovelSearchResult, NovelSeriesResult, Paged, RecommendedResult,
    UgoiraMetadataResult, UserDetailResult, UserPreview, UserSearchResult,
};
pub use user::{Account, User, UserDetail, UserProfile, UserProfilePublicity, UserWorkspace};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes `{}` and `null` as `None`.
///
/// The API pads several optional object fields with an empty object
/// instead of omitting them.
pub(crate) fn empty_object_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
