//! Request pipeline: rate limiting, sending, error mapping, retries.
//!
//! Every API call goes through [`Transport::send`]: acquire limiter
//! capacity, send, buffer the body, run the body-level error check and
//! then the status check, and retry on rate limits and transient
//! failures with a fixed delay between attempts. Downloads use
//! [`Transport::send_stream`], which retries the handshake the same way
//! but leaves the body streaming.

pub mod resolver;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Request;
use tracing::{error, warn};

use crate::error::Error;
use crate::limiter::RateLimiter;
use response::ApiResponse;

/// How often and how patiently failed requests are retried.
///
/// `times` bounds the TOTAL number of attempts, the rate-limited path
/// included, so a persistently throttling server cannot spin a request
/// forever. `sleep` is the fixed delay between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per request. Clamped to at least 1.
    pub times: u32,
    /// Delay between attempts.
    pub sleep: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            times: 5,
            sleep: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt bound and inter-attempt delay.
    #[must_use]
    pub fn new(times: u32, sleep: Duration) -> Self {
        Self { times, sleep }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            times: 1,
            sleep: Duration::ZERO,
        }
    }
}

/// Shared request pipeline of one client.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl Transport {
    pub(crate) fn new(http: reqwest::Client, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            http,
            limiter,
            retry,
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends a request and buffers the full response.
    ///
    /// Rate-limit rejections and transient failures (transport errors,
    /// 5xx, 408) are retried up to the policy bound; every other error
    /// returns immediately. The error of the final attempt is the one
    /// the caller sees.
    ///
    /// # Errors
    ///
    /// Any [`Error`] produced by sending or by the response checks.
    pub async fn send(&self, request: Request) -> Result<ApiResponse, Error> {
        let times = self.retry.times.max(1);
        let last = request;
        for attempt in 1..times {
            // Requests with streaming bodies cannot be cloned and get a
            // single attempt.
            let Some(req) = last.try_clone() else {
                self.limiter.acquire(1.0).await;
                return self.execute(last).await;
            };
            self.limiter.acquire(1.0).await;
            match self.execute(req).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_rate_limit() => {
                    error!(attempt, url = %last.url(), "rate limited, backing off");
                }
                Err(err) if err.is_transient() => {
                    warn!(attempt, url = %last.url(), error = %err, "request failed, retrying");
                }
                Err(err) => return Err(err),
            }
            tokio::time::sleep(self.retry.sleep).await;
        }
        self.limiter.acquire(1.0).await;
        self.execute(last).await
    }

    /// Sends a request for a streaming body.
    ///
    /// Retries the handshake like [`Self::send`] but only checks the
    /// status line; the body stays on the wire for the caller to stream.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] or a status error from the final attempt.
    pub async fn send_stream(&self, request: Request) -> Result<reqwest::Response, Error> {
        let times = self.retry.times.max(1);
        let last = request;
        for attempt in 1..times {
            let Some(req) = last.try_clone() else {
                self.limiter.acquire(1.0).await;
                return self.execute_stream(last).await;
            };
            self.limiter.acquire(1.0).await;
            match self.execute_stream(req).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() => {
                    warn!(attempt, url = %last.url(), error = %err, "download handshake failed, retrying");
                }
                Err(err) => return Err(err),
            }
            tokio::time::sleep(self.retry.sleep).await;
        }
        self.limiter.acquire(1.0).await;
        self.execute_stream(last).await
    }

    async fn execute(&self, request: Request) -> Result<ApiResponse, Error> {
        let url = request.url().to_string();
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|source| Error::network(&url, source))?;
        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|source| Error::network(&final_url, source))?;
        let response = ApiResponse::new(final_url, status, headers, body);
        response.check()?;
        Ok(response)
    }

    async fn execute_stream(&self, request: Request) -> Result<reqwest::Response, Error> {
        let url = request.url().to_string();
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|source| Error::network(&url, source))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::http_status(response.url().as_str(), status.as_u16()))
        }
    }
}
