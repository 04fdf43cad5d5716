//! Feed assembly for Atom, RSS and JSON Feed.
//!
//! The assembler selects, orders and truncates a collection's items, renders
//! them through the format writer and returns the complete body together with
//! its validators. It keeps no state between calls and never touches the feed
//! cache; callers own every caching decision.

pub mod etag;
pub mod select;
mod text;
pub mod writer;

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::repos::{ContentSource, RepoError};
use crate::domain::entities::{Collection, ContentItem, SiteProfile};
use crate::domain::types::{FeedFormat, HighWaterSource};
use crate::util::clock::Clock;

use self::select::{MAX_ENTRIES, high_water_mark, select_entries};
use self::writer::{EnvelopeHead, FeedEntry, FeedWriter};

const SOURCE: &str = "application::syndication";

/// Which collection a feed is built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedScope {
    /// The unfiltered default collection.
    Firehose { collection: String },
    /// A named category from the allow-list.
    Category(String),
}

impl FeedScope {
    pub fn collection_key(&self) -> &str {
        match self {
            FeedScope::Firehose { collection } => collection,
            FeedScope::Category(key) => key,
        }
    }

    pub fn is_firehose(&self) -> bool {
        matches!(self, FeedScope::Firehose { .. })
    }
}

/// Fully assembled feed plus validators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub body: Bytes,
    /// High-water mark, whole seconds.
    pub last_modified: OffsetDateTime,
    pub etag: String,
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("collection `{key}` does not exist")]
    CollectionNotFound { key: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    pub site: SiteProfile,
    /// Display name used when an item has no author of its own.
    pub fallback_author: String,
    /// Cache TTL advertised in RSS `<ttl>`.
    pub ttl_minutes: Option<u32>,
    pub high_water: HighWaterSource,
    pub max_entries: usize,
    pub generator: String,
}

impl AssemblerOptions {
    pub fn new(site: SiteProfile) -> Self {
        Self {
            site,
            fallback_author: "Staff Writer".to_string(),
            ttl_minutes: None,
            high_water: HighWaterSource::default(),
            max_entries: MAX_ENTRIES,
            generator: format!("syndic {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Clone)]
pub struct FeedAssembler {
    source: Arc<dyn ContentSource>,
    clock: Arc<dyn Clock>,
    options: AssemblerOptions,
}

impl FeedAssembler {
    pub fn new(
        source: Arc<dyn ContentSource>,
        clock: Arc<dyn Clock>,
        options: AssemblerOptions,
    ) -> Self {
        Self {
            source,
            clock,
            options,
        }
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Build the complete feed for `scope` in `format`.
    pub async fn assemble(
        &self,
        scope: &FeedScope,
        format: FeedFormat,
        debug: bool,
    ) -> Result<FeedSnapshot, AssembleError> {
        let collection = self.load(scope).await?;
        let now = self.clock.now();
        let selection = select_entries(&collection.items, now, self.options.max_entries);
        let last_modified = high_water_mark(&selection.entries, self.options.high_water);
        let writer = FeedWriter::from(format);

        let mut items = String::new();
        if debug {
            for (item, reason) in &selection.excluded {
                let message = format!("excluding {} because {}", item.url, reason.as_str());
                if let Some(comment) = writer.render_comment(&message) {
                    items.push_str(&comment);
                }
            }
        }

        let total = selection.entries.len();
        for (index, item) in selection.entries.iter().enumerate() {
            let entry = self.entry_for(item);
            items.push_str(&writer.render_item(&entry, index + 1 == total));
        }

        let head = self.envelope_head(scope, &collection, format, debug, last_modified);
        let body = writer.render_envelope(&head, &items);
        let etag = etag::compute(body.as_bytes());

        debug!(
            target = SOURCE,
            collection = %collection.key,
            format = %format,
            entries = total,
            excluded = selection.excluded.len(),
            etag = %etag,
            "assembled feed"
        );

        Ok(FeedSnapshot {
            body: Bytes::from(body),
            last_modified,
            etag,
        })
    }

    /// The high-water mark `assemble` would report, without rendering anything.
    pub async fn high_water_mark(&self, scope: &FeedScope) -> Result<OffsetDateTime, AssembleError> {
        let collection = self.load(scope).await?;
        let selection = select_entries(
            &collection.items,
            self.clock.now(),
            self.options.max_entries,
        );
        Ok(high_water_mark(&selection.entries, self.options.high_water))
    }

    async fn load(&self, scope: &FeedScope) -> Result<Collection, AssembleError> {
        let key = scope.collection_key();
        self.source
            .load_collection(key)
            .await?
            .ok_or_else(|| AssembleError::CollectionNotFound {
                key: key.to_string(),
            })
    }

    fn entry_for(&self, item: &ContentItem) -> FeedEntry {
        let authors = if item.authors.is_empty() {
            vec![self.options.fallback_author.clone()]
        } else {
            item.authors.clone()
        };

        FeedEntry {
            url: item.url.clone(),
            title: item.title.clone(),
            body_html: item.body_html.clone(),
            published_at: item.published_at(),
            modified_at: item.modified_at(),
            authors,
        }
    }

    fn envelope_head(
        &self,
        scope: &FeedScope,
        collection: &Collection,
        format: FeedFormat,
        debug: bool,
        updated: OffsetDateTime,
    ) -> EnvelopeHead {
        let site = &self.options.site;
        let site_url = site.url.trim_end_matches('/').to_string();

        let mut title = site.title.clone();
        if !scope.is_firehose() {
            title = format!("{title} - {}", collection.display_name);
        }
        if debug {
            title = format!("{title} [debug {}]", format.as_str());
        }

        let self_link = match scope {
            FeedScope::Firehose { .. } => format!("{site_url}/feeds/{}", format.file_name()),
            FeedScope::Category(key) => format!("{site_url}/feeds/{key}/{}", format.file_name()),
        };

        EnvelopeHead {
            title,
            subtitle: site.description.clone(),
            site_url,
            self_link,
            rights: site.copyright.clone(),
            generator: self.options.generator.clone(),
            updated,
            ttl_minutes: self.options.ttl_minutes,
        }
    }
}
