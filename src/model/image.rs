//! Image URL sets and quality selection.

use serde::Deserialize;

use crate::context;
use crate::error::Error;

/// An image quality tier, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Original,
    Large,
    Medium,
    SquareMedium,
}

impl Quality {
    /// Wire name of this tier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Large => "large",
            Self::Medium => "medium",
            Self::SquareMedium => "square_medium",
        }
    }
}

/// The per-quality URL set the API attaches to images and ugoira archives.
///
/// Not every tier is present on every asset; selection falls back to the
/// next lower tier, and [`QualityUrl::link`] picks the best available one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualityUrl {
    #[serde(default, alias = "square_medium")]
    pub square: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub original: Option<String>,
}

impl QualityUrl {
    /// The best available URL: original, then large, medium, square.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.original
            .as_deref()
            .or(self.large.as_deref())
            .or(self.medium.as_deref())
            .or(self.square.as_deref())
    }

    /// The URL for `quality`, falling back tier by tier below the
    /// requested one, and finally to [`Self::link`].
    #[must_use]
    pub fn select(&self, quality: Quality) -> Option<&str> {
        let tiers: &[&Option<String>] = match quality {
            Quality::Original => &[&self.original, &self.large, &self.medium, &self.square],
            Quality::Large => &[&self.large, &self.medium, &self.square],
            Quality::Medium => &[&self.medium, &self.square],
            Quality::SquareMedium => &[&self.square],
        };
        tiers
            .iter()
            .find_map(|tier| tier.as_deref())
            .or_else(|| self.link())
    }

    /// Downloads the best available URL through the scope-bound client.
    ///
    /// # Errors
    ///
    /// [`Error::ClientNotFound`] outside a [`context::scope`],
    /// [`Error::MissingUrl`] when no URL is present, or any download error.
    pub async fn download(&self) -> Result<bytes::Bytes, Error> {
        let client = context::current()?;
        let url = self.link().ok_or(Error::MissingUrl { what: "image" })?;
        client.download(url).await
    }
}
