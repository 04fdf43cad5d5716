//! Feed cache key naming.
//!
//! A feed occupies three independent entries sharing one base name:
//! `<engineVersion>-<scope>-<format>[-debug]` followed by a slot suffix.

use std::fmt;

use crate::application::syndication::FeedScope;
use crate::domain::types::FeedFormat;

/// Version tag baked into every key so upgrades never read stale layouts.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The three entries written for each regenerated feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSlot {
    Body,
    HighWater,
    Etag,
}

impl CacheSlot {
    pub fn suffix(self) -> &'static str {
        match self {
            CacheSlot::Body => "body",
            CacheSlot::HighWater => "hwm",
            CacheSlot::Etag => "etag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedCacheKey {
    base: String,
}

impl FeedCacheKey {
    pub fn new(scope: &FeedScope, format: FeedFormat, debug: bool) -> Self {
        Self::with_version(ENGINE_VERSION, scope, format, debug)
    }

    pub fn with_version(version: &str, scope: &FeedScope, format: FeedFormat, debug: bool) -> Self {
        let scope = match scope {
            FeedScope::Firehose { .. } => "firehose".to_string(),
            FeedScope::Category(key) => format!("c.{key}"),
        };
        let mut base = format!("{version}-{scope}-{}", format.as_str());
        if debug {
            base.push_str("-debug");
        }
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn slot(&self, slot: CacheSlot) -> String {
        format!("{}-{}", self.base, slot.suffix())
    }
}

impl fmt::Display for FeedCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}
