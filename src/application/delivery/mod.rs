//! Conditional feed delivery.
//!
//! Decides per request whether a feed can be answered from validators alone,
//! from the cache, or has to be assembled again. The decision order is fixed:
//! TTL disabled, ETag, high-water mark, cached body, regeneration.

mod request;

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use metrics::{counter, histogram};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::application::repos::RepoError;
use crate::application::syndication::{AssembleError, FeedAssembler, FeedScope, FeedSnapshot};
use crate::cache::{CacheSlot, CacheStore, CacheTtl, ENGINE_VERSION, FeedCacheKey};
use crate::domain::types::FeedFormat;
use crate::util::clock::Clock;

pub use request::{FeedRequest, ValidatorError, parse_if_modified_since, parse_if_none_match};

const SOURCE: &str = "application::delivery";

pub const METRIC_FEED_FRESH: &str = "syndic_feed_fresh_total";
pub const METRIC_FEED_HIT: &str = "syndic_feed_hit_total";
pub const METRIC_FEED_NOT_MODIFIED: &str = "syndic_feed_not_modified_total";
pub const METRIC_FEED_REGENERATE: &str = "syndic_feed_regenerate_total";
pub const METRIC_FEED_INCONSISTENT: &str = "syndic_feed_cache_inconsistent_total";
pub const METRIC_FEED_ASSEMBLE_MS: &str = "syndic_feed_assemble_ms";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Assembled for this request.
    Fresh,
    /// Served from the cache.
    Hit,
    /// The client's copy is current; no body.
    NotModified,
}

impl DeliveryOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryOutcome::Fresh => "fresh",
            DeliveryOutcome::Hit => "hit",
            DeliveryOutcome::NotModified => "not_modified",
        }
    }
}

/// What the HTTP layer needs to answer a feed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub outcome: DeliveryOutcome,
    pub format: FeedFormat,
    /// Absent for `NotModified`.
    pub body: Option<Bytes>,
    /// Absent only when a 304 was decided from a recomputed high-water mark.
    pub etag: Option<String>,
    pub last_modified: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("feeds are not available")]
    NotAvailable,
    #[error("category feeds are not configured")]
    CategoriesDisabled,
    #[error("`{category}` is not a feed category")]
    UnknownCategory { category: String },
    #[error("collection `{key}` does not exist")]
    CollectionNotFound { key: String, firehose: bool },
    #[error("content source failed: {0}")]
    Source(#[from] RepoError),
}

impl DeliveryError {
    fn from_assemble(err: AssembleError, scope: &FeedScope) -> Self {
        match err {
            AssembleError::CollectionNotFound { key } => DeliveryError::CollectionNotFound {
                key,
                firehose: scope.is_firehose(),
            },
            AssembleError::Repo(err) => DeliveryError::Source(err),
        }
    }
}

/// Which collections may be served and for how long they are cached.
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    pub disabled: bool,
    pub firehose: String,
    /// Allow-list for category feeds; empty turns them off.
    pub categories: Vec<String>,
    pub ttl: CacheTtl,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            disabled: false,
            firehose: "articles".to_string(),
            categories: Vec::new(),
            ttl: CacheTtl::from_minutes(10),
        }
    }
}

/// How a body reached the client, for debug annotations.
enum Provenance {
    Uncached,
    Stored,
    Cached { expires_in: Option<i64> },
}

/// Cached validators for one feed.
struct CachedValidators {
    etag: String,
    last_modified: OffsetDateTime,
}

#[derive(Clone)]
pub struct FeedDeliveryService {
    assembler: FeedAssembler,
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    options: DeliveryOptions,
}

impl FeedDeliveryService {
    pub fn new(
        assembler: FeedAssembler,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        options: DeliveryOptions,
    ) -> Self {
        Self {
            assembler,
            store,
            clock,
            options,
        }
    }

    pub fn options(&self) -> &DeliveryOptions {
        &self.options
    }

    /// Map an optional category to the scope it is served from.
    pub fn resolve_scope(&self, category: Option<&str>) -> Result<FeedScope, DeliveryError> {
        if self.options.disabled {
            return Err(DeliveryError::NotAvailable);
        }
        let Some(category) = category else {
            return Ok(FeedScope::Firehose {
                collection: self.options.firehose.clone(),
            });
        };
        if self.options.categories.is_empty() {
            return Err(DeliveryError::CategoriesDisabled);
        }
        if self.options.categories.iter().any(|known| known == category) {
            Ok(FeedScope::Category(category.to_string()))
        } else {
            Err(DeliveryError::UnknownCategory {
                category: category.to_string(),
            })
        }
    }

    pub async fn deliver(&self, request: &FeedRequest) -> Result<Delivery, DeliveryError> {
        let started = Instant::now();
        let ttl = self.options.ttl;

        if !ttl.is_enabled() {
            let snapshot = self.regenerate(request).await?;
            let delivery = self.fresh(request, snapshot, Provenance::Uncached, started);
            return Ok(delivery);
        }

        let key = FeedCacheKey::new(&request.scope, request.format, request.debug);

        if let Some(tag) = &request.if_none_match {
            let cached_tag = self.store.get(&key.slot(CacheSlot::Etag));
            if cached_tag.as_deref() == Some(tag.as_bytes()) {
                match self.cached_high_water(&key) {
                    Some(last_modified) => {
                        return Ok(self.not_modified(request, Some(tag.clone()), last_modified));
                    }
                    None => {
                        self.inconsistent(&key, "entity tag without high-water mark");
                        return self.rebuild(request, &key, started).await;
                    }
                }
            }
        }

        if let Some(since) = request.modified_since() {
            let high_water = match self.cached_high_water(&key) {
                Some(last_modified) => match self.cached_etag(&key) {
                    Some(etag) => Some((Some(etag), last_modified)),
                    None => {
                        self.inconsistent(&key, "high-water mark without entity tag");
                        None
                    }
                },
                None => {
                    let last_modified = self
                        .assembler
                        .high_water_mark(&request.scope)
                        .await
                        .map_err(|err| DeliveryError::from_assemble(err, &request.scope))?;
                    Some((None, last_modified))
                }
            };

            match high_water {
                Some((etag, last_modified)) if last_modified <= since => {
                    return Ok(self.not_modified(request, etag, last_modified));
                }
                Some(_) => {}
                None => return self.rebuild(request, &key, started).await,
            }
        }

        let Some(body) = self.store.get(&key.slot(CacheSlot::Body)) else {
            return self.rebuild(request, &key, started).await;
        };
        let Some(validators) = self.cached_validators(&key) else {
            self.inconsistent(&key, "body without validators");
            return self.rebuild(request, &key, started).await;
        };

        counter!(METRIC_FEED_HIT, "format" => request.format.as_str()).increment(1);
        let expires_in = self
            .store
            .expires_at(&key.slot(CacheSlot::Body))
            .map(|at| (at - self.clock.now()).whole_seconds());
        let body = self.annotate(
            request,
            &key,
            body,
            Provenance::Cached { expires_in },
            started,
        );

        Ok(Delivery {
            outcome: DeliveryOutcome::Hit,
            format: request.format,
            body: Some(body),
            etag: Some(validators.etag),
            last_modified: validators.last_modified,
        })
    }

    /// Regenerate, store all three slots, then re-apply the request's validators.
    async fn rebuild(
        &self,
        request: &FeedRequest,
        key: &FeedCacheKey,
        started: Instant,
    ) -> Result<Delivery, DeliveryError> {
        let snapshot = self.regenerate(request).await?;
        let ttl = self.options.ttl;

        self.store
            .set(&key.slot(CacheSlot::Body), snapshot.body.clone(), ttl);
        self.store.set(
            &key.slot(CacheSlot::HighWater),
            Bytes::from(snapshot.last_modified.unix_timestamp().to_string()),
            ttl,
        );
        self.store.set(
            &key.slot(CacheSlot::Etag),
            Bytes::from(snapshot.etag.clone()),
            ttl,
        );

        let etag_matches = request.if_none_match.as_deref() == Some(snapshot.etag.as_str());
        let unchanged_since = request
            .modified_since()
            .is_some_and(|since| snapshot.last_modified <= since);
        if etag_matches || unchanged_since {
            return Ok(self.not_modified(request, Some(snapshot.etag), snapshot.last_modified));
        }

        Ok(self.fresh(request, snapshot, Provenance::Stored, started))
    }

    async fn regenerate(&self, request: &FeedRequest) -> Result<FeedSnapshot, DeliveryError> {
        let started = Instant::now();
        let snapshot = self
            .assembler
            .assemble(&request.scope, request.format, request.debug)
            .await
            .map_err(|err| DeliveryError::from_assemble(err, &request.scope))?;

        counter!(METRIC_FEED_REGENERATE, "format" => request.format.as_str()).increment(1);
        histogram!(METRIC_FEED_ASSEMBLE_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(snapshot)
    }

    fn fresh(
        &self,
        request: &FeedRequest,
        snapshot: FeedSnapshot,
        provenance: Provenance,
        started: Instant,
    ) -> Delivery {
        counter!(METRIC_FEED_FRESH, "format" => request.format.as_str()).increment(1);
        let key = FeedCacheKey::new(&request.scope, request.format, request.debug);
        let body = self.annotate(request, &key, snapshot.body, provenance, started);
        Delivery {
            outcome: DeliveryOutcome::Fresh,
            format: request.format,
            body: Some(body),
            etag: Some(snapshot.etag),
            last_modified: snapshot.last_modified,
        }
    }

    fn not_modified(
        &self,
        request: &FeedRequest,
        etag: Option<String>,
        last_modified: OffsetDateTime,
    ) -> Delivery {
        counter!(METRIC_FEED_NOT_MODIFIED, "format" => request.format.as_str()).increment(1);
        debug!(
            target = SOURCE,
            scope = request.scope.collection_key(),
            format = %request.format,
            "client copy is current"
        );
        Delivery {
            outcome: DeliveryOutcome::NotModified,
            format: request.format,
            body: None,
            etag,
            last_modified,
        }
    }

    fn cached_etag(&self, key: &FeedCacheKey) -> Option<String> {
        let raw = self.store.get(&key.slot(CacheSlot::Etag))?;
        String::from_utf8(raw.to_vec()).ok()
    }

    fn cached_high_water(&self, key: &FeedCacheKey) -> Option<OffsetDateTime> {
        let raw = self.store.get(&key.slot(CacheSlot::HighWater))?;
        let seconds = std::str::from_utf8(&raw).ok()?.parse::<i64>().ok()?;
        OffsetDateTime::from_unix_timestamp(seconds).ok()
    }

    fn cached_validators(&self, key: &FeedCacheKey) -> Option<CachedValidators> {
        Some(CachedValidators {
            etag: self.cached_etag(key)?,
            last_modified: self.cached_high_water(key)?,
        })
    }

    fn inconsistent(&self, key: &FeedCacheKey, detail: &'static str) {
        counter!(METRIC_FEED_INCONSISTENT).increment(1);
        warn!(
            target = SOURCE,
            key = key.base(),
            detail,
            "feed cache slots out of step; regenerating"
        );
    }

    /// Append provenance comments to XML bodies in debug mode. JSON bodies stay
    /// untouched and the same facts go to the log.
    fn annotate(
        &self,
        request: &FeedRequest,
        key: &FeedCacheKey,
        body: Bytes,
        provenance: Provenance,
        started: Instant,
    ) -> Bytes {
        if !request.debug {
            return body;
        }

        let mut notes = vec![match provenance {
            Provenance::Uncached => "Freshly generated; not cached for reuse".to_string(),
            Provenance::Stored => format!(
                "Freshly generated; cached into {key} for {} minute(s) for reuse",
                self.options.ttl.minutes().unwrap_or_default()
            ),
            Provenance::Cached {
                expires_in: Some(seconds),
            } => format!("Retrieved {key} from cache; expires in {seconds} seconds"),
            Provenance::Cached { expires_in: None } => format!("Retrieved {key} from cache"),
        }];
        notes.push(format!(
            "That all took {:.3} milliseconds",
            started.elapsed().as_secs_f64() * 1000.0
        ));
        notes.push(format!("syndic {ENGINE_VERSION}"));

        if !request.format.supports_comments() {
            for note in &notes {
                info!(target = SOURCE, key = key.base(), note = note.as_str(), "feed debug");
            }
            return body;
        }

        let mut annotated = Vec::with_capacity(body.len() + 256);
        annotated.extend_from_slice(&body);
        for note in notes {
            let comment = format!("<!-- {} -->\n", note.replace("--", "- -"));
            annotated.extend_from_slice(comment.as_bytes());
        }
        Bytes::from(annotated)
    }
}
