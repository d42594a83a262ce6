//! Buffered API response with body-level error checks.

use std::sync::OnceLock;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiErrorPayload, Error};

/// A fully buffered response from the API.
///
/// The body is decoded as JSON at most once; [`ApiResponse::json`] memoizes
/// the parse so repeated error checks and model decodes stay cheap. Bodies
/// that are not JSON (raw image bytes, ZIP containers) simply report no
/// JSON value and flow through the error checks untouched.
#[derive(Debug)]
pub struct ApiResponse {
    url: String,
    status: StatusCode,
    headers: HeaderMap,
    body: bytes::Bytes,
    json: OnceLock<Option<Value>>,
}

impl ApiResponse {
    pub(crate) fn new(url: String, status: StatusCode, headers: HeaderMap, body: bytes::Bytes) -> Self {
        Self {
            url,
            status,
            headers,
            body,
            json: OnceLock::new(),
        }
    }

    /// The final request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The HTTP status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw body bytes.
    #[must_use]
    pub fn bytes(&self) -> &bytes::Bytes {
        &self.body
    }

    /// The body parsed as JSON, or `None` when it is not valid JSON.
    ///
    /// The parse result is cached; every call after the first returns the
    /// same value without touching the body again.
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        self.json
            .get_or_init(|| serde_json::from_slice(&self.body).ok())
            .as_ref()
    }

    /// Decodes the body into a typed model.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] when the body does not match `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|source| Error::Json { source })
    }

    /// Checks the body for an API-level error envelope.
    ///
    /// A top-level `errors` value maps to [`Error::Platform`]; a top-level
    /// `error` object is classified by its message (rate limit, invalid
    /// refresh token, or generic). This runs before the status check so a
    /// 200 response carrying an error envelope is still an error, and an
    /// error status with a descriptive body produces the richer kind.
    ///
    /// # Errors
    ///
    /// The mapped error kind when the body carries an error envelope.
    pub fn check_result(&self) -> Result<(), Error> {
        let Some(Value::Object(map)) = self.json() else {
            return Ok(());
        };
        if let Some(errors) = map.get("errors")
            && !is_empty_value(errors)
        {
            return Err(Error::Platform {
                errors: errors.clone(),
            });
        }
        if let Some(error) = map.get("error")
            && !is_empty_value(error)
        {
            // The OAuth endpoint ships `"error": "invalid_grant"` as a bare
            // string; API endpoints ship an object payload.
            let payload = match error {
                Value::String(message) => ApiErrorPayload {
                    message: Some(message.clone()),
                    ..ApiErrorPayload::default()
                },
                other => serde_json::from_value(other.clone()).unwrap_or_default(),
            };
            return Err(Error::from_error_payload(payload));
        }
        Ok(())
    }

    /// Checks the HTTP status code.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for 404, [`Error::HttpStatus`] for any other
    /// non-success status.
    pub fn check_status(&self) -> Result<(), Error> {
        if self.status.is_success() {
            Ok(())
        } else {
            Err(Error::http_status(&self.url, self.status.as_u16()))
        }
    }

    /// Runs [`Self::check_result`] then [`Self::check_status`].
    ///
    /// # Errors
    ///
    /// The first failing check's error.
    pub fn check(&self) -> Result<(), Error> {
        self.check_result()?;
        self.check_status()
    }
}

/// Whether a JSON value counts as "no error present".
///
/// The API sometimes ships `"error": null`, `false`, `{}`, `[]` or `""` on
/// success paths; none of those carry an actual error.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}
