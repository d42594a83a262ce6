//! The client: identity headers, auth injection, requests and downloads.

mod auth;

pub use auth::AuthResult;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Method;
use reqwest::header::{ACCEPT_LANGUAGE, AUTHORIZATION, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::api::{IllustApi, NovelApi, UserApi};
use crate::error::Error;
use crate::limiter::RateLimiter;
use crate::model::user::Account;
use crate::net::resolver::DohResolver;
use crate::net::response::ApiResponse;
use crate::net::{RetryPolicy, Transport};

/// Identity headers of the platform's mobile app. Requests without them
/// are rejected by several endpoints.
const APP_OS: &str = "IOS";
const APP_OS_VERSION: &str = "17.5.1";
const APP_VERSION: &str = "7.20.6";
const APP_USER_AGENT: &str = "PixivAndroidApp/5.0.234 (Android 11; Pixel 5)";
const APP_REFERER: &str = "https://www.pixiv.net/";
const DEFAULT_ACCEPT_LANGUAGE: &str =
    "zh-CN,zh;q=0.9,zh-Hans;q=0.8,en;q=0.7,zh-Hant;q=0.6,ja;q=0.5";

const DEFAULT_API_BASE: &str = "https://app-api.pixiv.net";

const DEFAULT_RATE: f64 = 100.0;
const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Receives download progress after every chunk.
///
/// `total` is taken from `content-length` and may be unknown.
#[async_trait]
pub trait ProgressHandler: Send {
    async fn on_progress(&mut self, received: u64, total: Option<u64>);
}

/// Where a download lands.
pub enum DownloadOutput<'a> {
    /// Buffer the whole body in memory and return it.
    Memory,
    /// Append to a caller-owned buffer.
    Buffer(&'a mut Vec<u8>),
    /// Write to a file, creating parent directories as needed.
    File(&'a Path),
}

#[derive(Debug, Default)]
pub(crate) struct AuthState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub account: Option<Account>,
}

#[derive(Debug)]
struct ClientInner {
    transport: Transport,
    api_base: String,
    auth: tokio::sync::RwLock<AuthState>,
    closed: AtomicBool,
}

/// Asynchronous client for the platform's mobile API.
///
/// Cloning is cheap and every clone shares the same connection pool,
/// rate limiter and credentials.
///
/// # Example
///
/// ```no_run
/// use pixiv_app_api::PixivClient;
///
/// # async fn example() -> Result<(), pixiv_app_api::Error> {
/// let client = PixivClient::builder().bypass(true).build()?;
/// client.login_with_token("refresh-token").await?;
/// let result = client.illust().detail(129899459, None).await?;
/// println!("{}", result.illust.title);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PixivClient {
    inner: Arc<ClientInner>,
}

/// Configures and constructs a [`PixivClient`].
#[derive(Debug)]
pub struct PixivClientBuilder {
    limit: Option<(f64, Duration)>,
    retry: RetryPolicy,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    proxy: Option<String>,
    bypass: bool,
    accept_language: Option<String>,
    api_base: Option<String>,
}

impl Default for PixivClientBuilder {
    fn default() -> Self {
        Self {
            limit: Some((DEFAULT_RATE, DEFAULT_PERIOD)),
            retry: RetryPolicy::default(),
            timeout: None,
            connect_timeout: None,
            proxy: None,
            bypass: false,
            accept_language: None,
            api_base: None,
        }
    }
}

impl PixivClientBuilder {
    /// Limits requests to `max_rate` per `period`. The default is 100
    /// requests per minute.
    #[must_use]
    pub fn rate_limit(mut self, max_rate: f64, period: Duration) -> Self {
        self.limit = Some((max_rate, period));
        self
    }

    /// Disables client-side rate limiting.
    #[must_use]
    pub fn unlimited(mut self) -> Self {
        self.limit = None;
        self
    }

    /// Sets the retry policy. The default is 5 attempts, 1s apart.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the total per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Routes all traffic through the given proxy URL.
    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Resolves API hosts over DNS-over-HTTPS and relaxes certificate
    /// verification, for networks that poison DNS answers for them.
    #[must_use]
    pub fn bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    /// Overrides the `Accept-Language` header.
    #[must_use]
    pub fn accept_language(mut self, value: impl Into<String>) -> Self {
        self.accept_language = Some(value.into());
        self
    }

    /// Overrides the API root URL, for mirrors and tests. The default is
    /// the platform's production host.
    #[must_use]
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the proxy URL, accept-language value or the
    /// underlying HTTP client is invalid.
    pub fn build(self) -> Result<PixivClient, Error> {
        let mut headers = HeaderMap::new();
        headers.insert("app-os", HeaderValue::from_static(APP_OS));
        headers.insert("app-os-version", HeaderValue::from_static(APP_OS_VERSION));
        headers.insert("app-version", HeaderValue::from_static(APP_VERSION));
        headers.insert(USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));
        headers.insert(REFERER, HeaderValue::from_static(APP_REFERER));
        let accept_language = match &self.accept_language {
            Some(value) => HeaderValue::from_str(value)
                .map_err(|_| Error::config(format!("invalid accept-language: {value}")))?,
            None => HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
        };
        headers.insert(ACCEPT_LANGUAGE, accept_language);
        headers.insert(
            "access-control-expose-headers",
            HeaderValue::from_static("Content-Length"),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(proxy) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|err| Error::config(format!("invalid proxy: {err}")))?;
            builder = builder.proxy(proxy);
        }
        if self.bypass {
            // The poisoned networks also intercept TLS for these hosts,
            // so certificate verification has to be relaxed for the
            // resolved-by-IP connections to succeed.
            builder = builder
                .dns_resolver(Arc::new(DohResolver::new()))
                .danger_accept_invalid_certs(true);
        }
        let http = builder
            .build()
            .map_err(|err| Error::config(format!("could not build HTTP client: {err}")))?;

        let limiter = match self.limit {
            Some((max_rate, period)) => RateLimiter::new(max_rate, period),
            None => RateLimiter::unlimited(),
        };
        Ok(PixivClient {
            inner: Arc::new(ClientInner {
                transport: Transport::new(http, Arc::new(limiter), self.retry),
                api_base: self
                    .api_base
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                auth: tokio::sync::RwLock::new(AuthState::default()),
                closed: AtomicBool::new(false),
            }),
        })
    }
}

impl PixivClient {
    /// Starts building a client.
    #[must_use]
    pub fn builder() -> PixivClientBuilder {
        PixivClientBuilder::default()
    }

    /// Illustration endpoints.
    #[must_use]
    pub fn illust(&self) -> IllustApi {
        IllustApi::new(self.clone())
    }

    /// User endpoints.
    #[must_use]
    pub fn user(&self) -> UserApi {
        UserApi::new(self.clone())
    }

    /// Novel endpoints.
    #[must_use]
    pub fn novel(&self) -> NovelApi {
        NovelApi::new(self.clone())
    }

    /// Whether a refresh token is stored.
    pub async fn is_logged(&self) -> bool {
        self.inner.auth.read().await.refresh_token.is_some()
    }

    /// The account stored by the last successful login.
    pub async fn account(&self) -> Option<Account> {
        self.inner.auth.read().await.account.clone()
    }

    /// Marks the client closed. Every call afterwards fails with
    /// [`Error::Closed`]. Clones share the closed state.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    /// Whether [`Self::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.is_closed() {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    pub(crate) fn v1(&self, path: &str) -> String {
        format!("{}/v1{path}", self.inner.api_base)
    }

    pub(crate) fn v2(&self, path: &str) -> String {
        format!("{}/v2{path}", self.inner.api_base)
    }

    pub(crate) async fn set_auth(
        &self,
        access_token: String,
        refresh_token: String,
        account: Account,
    ) {
        let mut auth = self.inner.auth.write().await;
        auth.access_token = Some(access_token);
        auth.refresh_token = Some(refresh_token);
        auth.account = Some(account);
    }

    pub(crate) async fn refresh_token(&self) -> Option<String> {
        self.inner.auth.read().await.refresh_token.clone()
    }

    /// The `Authorization` value for the current token, if any.
    async fn bearer(&self) -> Result<Option<HeaderValue>, Error> {
        let auth = self.inner.auth.read().await;
        match &auth.access_token {
            None => Ok(None),
            Some(token) => HeaderValue::from_str(&format!("Bearer {token}"))
                .map(Some)
                .map_err(|_| Error::config("access token is not a valid header value".to_string())),
        }
    }

    /// Sends a request with identity and auth headers applied.
    ///
    /// Query parameters with a `None` or empty value are dropped before
    /// the URL is built.
    ///
    /// # Errors
    ///
    /// Any [`Error`] from the pipeline, or [`Error::Closed`].
    #[instrument(skip(self, params), fields(url = url))]
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<ApiResponse, Error> {
        self.ensure_open()?;
        let query = filter_params(params);
        let mut builder = self.inner.transport.http().request(method, url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(bearer) = self.bearer().await? {
            builder = builder.header(AUTHORIZATION, bearer);
        }
        let request = builder
            .build()
            .map_err(|err| Error::config(format!("could not build request: {err}")))?;
        debug!(url = %request.url(), "sending API request");
        self.inner.transport.send(request).await
    }

    /// GET convenience over [`Self::request`].
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn get(
        &self,
        url: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<ApiResponse, Error> {
        self.request(Method::GET, url, params).await
    }

    /// POST convenience over [`Self::request`].
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn post(
        &self,
        url: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<ApiResponse, Error> {
        self.request(Method::POST, url, params).await
    }

    /// PUT convenience over [`Self::request`].
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn put(
        &self,
        url: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<ApiResponse, Error> {
        self.request(Method::PUT, url, params).await
    }

    /// PATCH convenience over [`Self::request`].
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn patch(
        &self,
        url: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<ApiResponse, Error> {
        self.request(Method::PATCH, url, params).await
    }

    /// DELETE convenience over [`Self::request`].
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn delete(
        &self,
        url: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<ApiResponse, Error> {
        self.request(Method::DELETE, url, params).await
    }

    /// HEAD convenience over [`Self::request`].
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn head(
        &self,
        url: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<ApiResponse, Error> {
        self.request(Method::HEAD, url, params).await
    }

    /// OPTIONS convenience over [`Self::request`].
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn options(
        &self,
        url: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<ApiResponse, Error> {
        self.request(Method::OPTIONS, url, params).await
    }

    /// Opens a streaming request and hands back the raw response for
    /// incremental body consumption.
    ///
    /// The same identity and auth headers, query handling and retry
    /// policy apply as for [`Self::request`], but only the status line is
    /// checked; the body stays on the wire for the caller to read chunk
    /// by chunk.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`], [`Error::Network`], or a status error from the
    /// handshake.
    #[instrument(skip(self, params), fields(url = url))]
    pub async fn stream(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<reqwest::Response, Error> {
        self.ensure_open()?;
        let query = filter_params(params);
        let mut builder = self.inner.transport.http().request(method, url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(bearer) = self.bearer().await? {
            builder = builder.header(AUTHORIZATION, bearer);
        }
        let request = builder
            .build()
            .map_err(|err| Error::config(format!("could not build request: {err}")))?;
        self.inner.transport.send_stream(request).await
    }

    /// Downloads `url` into memory.
    ///
    /// # Errors
    ///
    /// See [`Self::download_with`].
    pub async fn download(&self, url: &str) -> Result<bytes::Bytes, Error> {
        let body = self.download_with(url, DownloadOutput::Memory, None).await?;
        Ok(body.unwrap_or_default())
    }

    /// Downloads `url` to a file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// See [`Self::download_with`].
    pub async fn download_to_file(&self, url: &str, path: &Path) -> Result<(), Error> {
        self.download_with(url, DownloadOutput::File(path), None)
            .await?;
        Ok(())
    }

    /// Streams `url` into the chosen output, reporting progress after
    /// every chunk.
    ///
    /// Returns the body for [`DownloadOutput::Memory`], `None` otherwise.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`], [`Error::Network`], a status error from the
    /// handshake, or [`Error::Io`] while writing to a file.
    #[instrument(skip(self, output, progress), fields(url = url))]
    pub async fn download_with(
        &self,
        url: &str,
        output: DownloadOutput<'_>,
        mut progress: Option<&mut (dyn ProgressHandler + Send)>,
    ) -> Result<Option<bytes::Bytes>, Error> {
        let response = self.stream(Method::GET, url, &[]).await?;
        let total = response.content_length();

        let mut sink = match output {
            DownloadOutput::Memory => Sink::Memory(Vec::new()),
            DownloadOutput::Buffer(buffer) => Sink::Buffer(buffer),
            DownloadOutput::File(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|err| Error::io(parent, err))?;
                }
                let file = tokio::fs::File::create(path)
                    .await
                    .map_err(|err| Error::io(path, err))?;
                Sink::File(file, path)
            }
        };

        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| Error::network(url, err))?;
            received += chunk.len() as u64;
            sink.write(&chunk).await?;
            if let Some(handler) = progress.as_deref_mut() {
                handler.on_progress(received, total).await;
            }
        }
        debug!(received, "download finished");
        sink.finish().await
    }
}

enum Sink<'a> {
    Memory(Vec<u8>),
    Buffer(&'a mut Vec<u8>),
    File(tokio::fs::File, &'a Path),
}

impl Sink<'_> {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), Error> {
        match self {
            Self::Memory(buffer) => buffer.extend_from_slice(chunk),
            Self::Buffer(buffer) => buffer.extend_from_slice(chunk),
            Self::File(file, path) => file
                .write_all(chunk)
                .await
                .map_err(|err| Error::io(*path, err))?,
        }
        Ok(())
    }

    async fn finish(self) -> Result<Option<bytes::Bytes>, Error> {
        match self {
            Self::Memory(buffer) => Ok(Some(bytes::Bytes::from(buffer))),
            Self::Buffer(_) => Ok(None),
            Self::File(mut file, path) => {
                file.flush().await.map_err(|err| Error::io(path, err))?;
                Ok(None)
            }
        }
    }
}

/// Drops parameters with `None` or empty values.
fn filter_params(params: &[(&str, Option<String>)]) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| match value {
            Some(value) if !value.is_empty() => Some(((*key).to_string(), value.clone())),
            _ => None,
        })
        .collect()
}
