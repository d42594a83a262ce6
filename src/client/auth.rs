//! OAuth token exchange for the mobile app credentials.
//!
//! The token endpoint authenticates the *app* with a fixed client id and
//! secret, plus a request signature: `X-Client-Time` carries the current
//! UTC time and `X-Client-Hash` the MD5 of that time concatenated with a
//! fixed salt. The *user* is identified by a refresh token obtained out
//! of band (the interactive browser login is not part of this crate).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::instrument;

use super::PixivClient;
use crate::error::Error;
use crate::model::user::Account;

const AUTH_TOKEN_URL: &str = "https://oauth.secure.pixiv.net/auth/token";
const CLIENT_ID: &str = "MOBrBDS8blbauoSck0ZfDbtuzpyT";
const CLIENT_SECRET: &str = "lsACyCD94FhDUtGTXi3QzcFE2uU1hqtDaKeqrdwj";
const HASH_SECRET: &str = "28c1fdd170a5204386cb1313c7077b34f83e4aaf4aa829ce78c231e05b0bae2c";
const REDIRECT_URI: &str = "https://app-api.pixiv.net/web/v1/users/auth/pixiv/callback";

/// Successful token endpoint payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResult {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: u64,
    pub user: Account,
}

/// The client-time header pair signing a token request.
fn client_time_and_hash(now: DateTime<Utc>) -> (String, String) {
    let time = now.to_rfc3339_opts(SecondsFormat::Secs, false);
    let hash = format!("{:x}", md5::compute(format!("{time}{HASH_SECRET}")));
    (time, hash)
}

impl PixivClient {
    /// Exchanges a refresh token for an access token and stores both.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRefreshToken`] when the token is rejected,
    /// [`Error::Login`] when the success payload is malformed, or any
    /// transport error.
    #[instrument(skip_all)]
    pub async fn login_with_token(&self, refresh_token: &str) -> Result<Account, Error> {
        self.token_exchange(
            AUTH_TOKEN_URL,
            &[
                ("client_id", CLIENT_ID),
                ("client_secret", CLIENT_SECRET),
                ("grant_type", "refresh_token"),
                ("include_policy", "true"),
                ("refresh_token", refresh_token),
            ],
        )
        .await
    }

    /// Exchanges an authorization code (PKCE flow) for tokens and stores
    /// them.
    ///
    /// # Errors
    ///
    /// See [`Self::login_with_token`].
    #[instrument(skip_all)]
    pub async fn login_with_code(&self, code: &str, code_verifier: &str) -> Result<Account, Error> {
        self.token_exchange(
            AUTH_TOKEN_URL,
            &[
                ("client_id", CLIENT_ID),
                ("client_secret", CLIENT_SECRET),
                ("grant_type", "authorization_code"),
                ("include_policy", "true"),
                ("code", code),
                ("code_verifier", code_verifier),
                ("redirect_uri", REDIRECT_URI),
            ],
        )
        .await
    }

    /// Re-runs the refresh-token exchange with the stored token.
    ///
    /// # Errors
    ///
    /// [`Error::Login`] when no refresh token is stored, otherwise see
    /// [`Self::login_with_token`].
    pub async fn refresh_session(&self) -> Result<Account, Error> {
        let token = self
            .refresh_token()
            .await
            .ok_or_else(|| Error::login("no refresh token stored, log in first"))?;
        self.login_with_token(&token).await
    }

    pub(crate) async fn token_exchange(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<Account, Error> {
        let (time, hash) = client_time_and_hash(Utc::now());
        let request = self
            .transport()
            .http()
            .post(url)
            .header("x-client-time", &time)
            .header("x-client-hash", &hash)
            .form(form)
            .build()
            .map_err(|err| Error::config(format!("could not build request: {err}")))?;
        let response = self.transport().send(request).await?;
        let result: AuthResult = response
            .parse()
            .map_err(|_| Error::login("token endpoint returned an unexpected payload"))?;
        let account = result.user.clone();
        self.set_auth(result.access_token, result.refresh_token, result.user)
            .await;
        Ok(account)
    }
}
