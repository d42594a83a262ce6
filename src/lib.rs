//! Pixiv Mobile API Client
//!
//! This library is an async client for the Pixiv mobile app API: typed
//! endpoint wrappers, token authentication, client-side rate limiting
//! with bounded retries, an optional DNS-over-HTTPS bypass for poisoned
//! networks, streaming downloads, and an ugoira decoder that turns the
//! frame archives into ZIPs, raw frames, GIFs or MP4s.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`client`] - The client itself: headers, auth, requests, downloads
//! - [`api`] - Endpoint sections (illust, user, novel) and search enums
//! - [`model`] - Typed payload records and pagination
//! - [`net`] - Request pipeline: retries, response checks, DoH resolver
//! - [`limiter`] - Leaky-bucket request rate limiting
//! - [`ugoira`] - Animation container decoding via ffmpeg
//! - [`context`] - Task-scoped ambient client for model helpers
//!
//! # Example
//!
//! ```no_run
//! use pixiv_app_api::{PixivClient, UgoiraKind};
//!
//! # async fn example() -> Result<(), pixiv_app_api::Error> {
//! let client = PixivClient::builder().build()?;
//! client.login_with_token("refresh-token").await?;
//!
//! let found = client.illust().search("風景", &Default::default()).await?;
//! if let Some(first) = found.illusts.first() {
//!     let gif = client.illust().download_ugoira(first.id, UgoiraKind::Gif).await?;
//!     # let _ = gif;
//! }
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod client;
pub mod context;
pub mod error;
pub mod limiter;
pub mod model;
pub mod net;
pub mod ugoira;

// Re-export commonly used types
pub use api::{
    IllustApi, IllustSearchOptions, NovelApi, NovelSearchOptions, SearchDuration, SearchFilter,
    SearchSort, SearchTarget, UserApi, UserSearchOptions,
};
pub use client::{
    AuthResult, DownloadOutput, PixivClient, PixivClientBuilder, ProgressHandler,
};
pub use error::{ApiErrorPayload, Error};
pub use limiter::RateLimiter;
pub use model::{Paged, Quality, QualityUrl};
pub use net::{RetryPolicy, resolver::DohResolver, response::ApiResponse};
pub use ugoira::{UgoiraContent, UgoiraKind};
