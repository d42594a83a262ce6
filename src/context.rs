//! Task-scoped ambient client.
//!
//! Model convenience methods (for example [`crate::model::QualityUrl::download`])
//! need a client without one being threaded through every call. Instead of a
//! process-wide singleton, the current client is bound to a task-local scope:
//!
//! ```no_run
//! # async fn example(client: pixiv_app_api::PixivClient) -> Result<(), pixiv_app_api::Error> {
//! use pixiv_app_api::context;
//!
//! context::scope(client, async {
//!     let current = context::current()?;
//!     // calls inside this future see `current`
//!     # let _ = current;
//!     Ok(())
//! })
//! .await
//! # }
//! ```
//!
//! Scopes nest; the innermost binding wins. Outside any scope,
//! [`current`] returns [`Error::ClientNotFound`].

use std::future::Future;

use crate::client::PixivClient;
use crate::error::Error;

tokio::task_local! {
    static CURRENT_CLIENT: PixivClient;
}

/// Runs `fut` with `client` bound as the ambient client for its duration.
pub async fn scope<F>(client: PixivClient, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_CLIENT.scope(client, fut).await
}

/// Returns the client bound to the current task scope.
///
/// # Errors
///
/// [`Error::ClientNotFound`] when no scope is active on this task.
pub fn current() -> Result<PixivClient, Error> {
    CURRENT_CLIENT
        .try_with(Clone::clone)
        .map_err(|_| Error::ClientNotFound)
}
