//! Shared domain enumerations.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Syndication format served by the feed endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFormat {
    Atom,
    Rss,
    Json,
}

impl FeedFormat {
    pub const ALL: [FeedFormat; 3] = [FeedFormat::Atom, FeedFormat::Rss, FeedFormat::Json];

    /// Token used in cache keys and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            FeedFormat::Atom => "atom",
            FeedFormat::Rss => "rss",
            FeedFormat::Json => "json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FeedFormat::Atom => "application/atom+xml",
            FeedFormat::Rss => "application/rss+xml",
            FeedFormat::Json => "application/json",
        }
    }

    /// File name used when building self links.
    pub fn file_name(self) -> &'static str {
        match self {
            FeedFormat::Atom => "atom.xml",
            FeedFormat::Rss => "rss.xml",
            FeedFormat::Json => "feed.json",
        }
    }

    /// XML formats can carry trailing comment annotations; JSON cannot.
    pub fn supports_comments(self) -> bool {
        !matches!(self, FeedFormat::Json)
    }

    /// Resolve a route segment such as `atom`, `rss.xml` or `feed.json`.
    pub fn from_route_segment(segment: &str) -> Option<Self> {
        match segment.trim().to_ascii_lowercase().as_str() {
            "atom" | "atom.xml" => Some(FeedFormat::Atom),
            "rss" | "rss.xml" => Some(FeedFormat::Rss),
            "json" | "feed.json" => Some(FeedFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedFormat {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_route_segment(value)
            .ok_or_else(|| DomainError::validation(format!("unknown feed format `{value}`")))
    }
}

/// Which item timestamp drives the feed-level high-water mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighWaterSource {
    #[default]
    Published,
    Modified,
}

impl FromStr for HighWaterSource {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "published" => Ok(HighWaterSource::Published),
            "modified" => Ok(HighWaterSource::Modified),
            other => Err(DomainError::validation(format!(
                "unknown high-water source `{other}`"
            ))),
        }
    }
}
