//! Error types for the Pixiv client.
//!
//! The API reports failures in three distinct ways: HTTP status codes,
//! a top-level `errors` object on validation failures, and a top-level
//! `error` object whose `message` string selects the concrete kind
//! (`"Rate Limit"`, `"invalid_grant"`, ...). All three are normalized
//! into [`Error`] here.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Error payload embedded in API error responses.
///
/// All fields are optional on the wire; whichever are present are carried
/// through so callers can display them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorPayload {
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub user_message_details: Option<Value>,
}

impl ApiErrorPayload {
    /// Best human-readable description, preferring the user-facing text.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.user_message
            .as_deref()
            .or(self.message.as_deref())
            .or(self.reason.as_deref())
            .unwrap_or("unknown API error")
    }
}

/// Errors that can occur while talking to the API or decoding its assets.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-level error (DNS resolution, connection refused, TLS, timeout).
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP 404 — the resource does not exist.
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// Any other non-200 HTTP status without a mapped kind.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Body-level `errors` object (validation / business failures).
    #[error("platform rejected the request: {errors}")]
    Platform {
        /// The raw `errors` payload for caller inspection.
        errors: Value,
    },

    /// Body-level `error` whose message names the platform's rate limit.
    #[error("rate limited by the API: {}", payload.summary())]
    RateLimit {
        /// The error payload.
        payload: ApiErrorPayload,
    },

    /// Body-level `error` with message `invalid_grant` — the refresh token
    /// was rejected and a new login is required.
    #[error("refresh token rejected: {}", payload.summary())]
    InvalidRefreshToken {
        /// The error payload.
        payload: ApiErrorPayload,
    },

    /// Any other body-level `error` object.
    #[error("API error: {}", payload.summary())]
    Api {
        /// The error payload.
        payload: ApiErrorPayload,
    },

    /// The payload names no usable URL for the requested asset.
    #[error("no {what} URL available")]
    MissingUrl {
        /// What kind of URL was missing.
        what: &'static str,
    },

    /// An illustration-only or ugoira-only operation was invoked on the
    /// wrong artwork kind.
    #[error("artwork type mismatch: expected {expected}, got {actual}; {hint}")]
    ArtworkTypeMismatch {
        /// Artwork kind the operation requires.
        expected: &'static str,
        /// Artwork kind that was actually found.
        actual: String,
        /// Which method to use instead.
        hint: &'static str,
    },

    /// An operation needed an ambient client but none is bound to the
    /// current scope (see [`crate::context`]).
    #[error("no Pixiv client bound to the current scope")]
    ClientNotFound,

    /// The login exchange failed or returned a malformed payload.
    #[error("login failed: {message}")]
    Login {
        /// What went wrong.
        message: String,
    },

    /// The client was used after [`crate::PixivClient::close`].
    #[error("client is closed")]
    Closed,

    /// The client could not be constructed from its configuration.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong with the configuration.
        message: String,
    },

    /// File system error while materializing frames or encoder output.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The ugoira ZIP container could not be read.
    #[error("ugoira archive error: {source}")]
    Archive {
        /// The underlying archive error.
        #[from]
        source: zip::result::ZipError,
    },

    /// The external encoder could not be spawned or exited with a failure.
    #[error("encoder failed: {detail}")]
    Encoder {
        /// Exit status, when the process ran at all.
        status: Option<i32>,
        /// Captured stderr or spawn error text.
        detail: String,
    },

    /// A response body could not be decoded into the expected model.
    #[error("could not decode response: {source}")]
    Json {
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error, mapping 404 to [`Error::NotFound`].
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        if status == 404 {
            Self::NotFound { url }
        } else {
            Self::HttpStatus { url, status }
        }
    }

    /// Creates an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a login error.
    pub fn login(message: impl Into<String>) -> Self {
        Self::Login {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an encoder error from a spawn failure.
    pub fn encoder_spawn(source: std::io::Error) -> Self {
        Self::Encoder {
            status: None,
            detail: source.to_string(),
        }
    }

    /// Classifies a body-level `error` payload by its `message`/`reason`
    /// string: `"Rate Limit"` and `"invalid_grant"` have dedicated kinds,
    /// everything else is a generic API error.
    #[must_use]
    pub fn from_error_payload(payload: ApiErrorPayload) -> Self {
        let marker = payload
            .message
            .as_deref()
            .or(payload.reason.as_deref())
            .unwrap_or_default();
        match marker {
            "Rate Limit" => Self::RateLimit { payload },
            "invalid_grant" => Self::InvalidRefreshToken { payload },
            _ => Self::Api { payload },
        }
    }

    /// Whether this is the platform's rate-limit rejection, which gets the
    /// dedicated retry-with-delay path.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }

    /// Whether retrying can plausibly help.
    ///
    /// Transport failures and 5xx/408 statuses are transient; typed API
    /// errors (not found, bad token, malformed request) are not and
    /// propagate to the caller on the first occurrence.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::HttpStatus { status, .. } => *status == 408 || (500..600).contains(status),
            _ => false,
        }
    }
}
