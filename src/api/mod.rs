//! Endpoint sections and search parameter enums.
//!
//! Each section is a thin handle over the client exposing the endpoints
//! of one domain. Parameters serialize to the scalar strings the API
//! expects; `None` parameters are dropped by the client before the URL
//! is built.

mod illust;
mod novel;
mod user;

pub use illust::{IllustApi, IllustSearchOptions};
pub use novel::{NovelApi, NovelSearchOptions};
pub use user::{UserApi, UserSearchOptions};

use std::fmt;

macro_rules! scalar_enum {
    ($(#[$doc:meta])* $name:ident { $($(#[$vdoc:meta])* $variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($(#[$vdoc])* $variant),+
        }

        impl $name {
            /// Wire value of this variant.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

scalar_enum! {
    /// What part of a work a search keyword matches against.
    SearchTarget {
        PartialMatchForTags => "partial_match_for_tags",
        ExactMatchForTags => "exact_match_for_tags",
        Text => "text",
        Keyword => "keyword",
    }
}

scalar_enum! {
    /// Search result ordering.
    SearchSort {
        DateDesc => "date_desc",
        DateAsc => "date_asc",
        PopularDesc => "popular_desc",
        PopularAsc => "popular_asc",
    }
}

scalar_enum! {
    /// How far back a search reaches.
    SearchDuration {
        WithinLastDay => "within_last_day",
        WithinLastWeek => "within_last_week",
        WithinLastMonth => "within_last_month",
        WithinLastYear => "within_last_year",
    }
}

scalar_enum! {
    /// Which mobile platform's result filtering to apply.
    SearchFilter {
        ForAndroid => "for_android",
        ForIos => "for_ios",
    }
}

/// `Option<impl Display>` to the optional string the query builder takes.
pub(crate) fn scalar<T: fmt::Display>(value: Option<T>) -> Option<String> {
    value.map(|v| v.to_string())
}
