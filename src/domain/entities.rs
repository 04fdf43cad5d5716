//! Read-only records handed out by the content source.

use time::OffsetDateTime;

/// One content item as projected by the content source.
///
/// Timestamps are kept raw; `published_at` and `modified_at` resolve them with
/// the fallback chain used everywhere feeds are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Stable identifier; also the item's permalink.
    pub url: String,
    pub title: String,
    pub body_html: String,
    /// Explicit publish timestamp (`date`).
    pub date: Option<OffsetDateTime>,
    /// Explicit update timestamp (`updatedat`).
    pub updated: Option<OffsetDateTime>,
    /// Modification time reported by storage.
    pub stored_at: Option<OffsetDateTime>,
    pub authors: Vec<String>,
    /// Unlisted items never appear in feeds.
    pub listed: bool,
    pub exclude_from_feeds: bool,
    pub sunset_at: Option<OffsetDateTime>,
    pub embargo_until: Option<OffsetDateTime>,
}

impl ContentItem {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            body_html: String::new(),
            date: None,
            updated: None,
            stored_at: None,
            authors: Vec::new(),
            listed: true,
            exclude_from_feeds: false,
            sunset_at: None,
            embargo_until: None,
        }
    }

    /// `updated` → `date` → storage mtime → epoch.
    pub fn modified_at(&self) -> OffsetDateTime {
        self.updated
            .or(self.date)
            .or(self.stored_at)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// `date` → `modified_at()`.
    pub fn published_at(&self) -> OffsetDateTime {
        self.date.unwrap_or_else(|| self.modified_at())
    }

    pub fn is_sunset(&self, now: OffsetDateTime) -> bool {
        self.sunset_at.is_some_and(|at| at <= now)
    }

    pub fn is_under_embargo(&self, now: OffsetDateTime) -> bool {
        self.embargo_until.is_some_and(|until| until > now)
    }
}

/// A named, orderable set of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub key: String,
    pub display_name: String,
    pub items: Vec<ContentItem>,
}

/// Site-wide values written into every feed envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub title: String,
    pub description: String,
    pub copyright: String,
    /// Public base URL without a trailing slash.
    pub url: String,
}
