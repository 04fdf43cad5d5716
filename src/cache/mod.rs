//! Feed cache.
//!
//! Three independent entries per feed (body, high-water mark, ETag) live in a
//! [`CacheStore`] under names produced by [`FeedCacheKey`]. The store never
//! interprets what it holds.

mod config;
mod keys;
mod lock;
mod store;

pub use config::{CacheConfig, CacheTtl};
pub use keys::{CacheSlot, ENGINE_VERSION, FeedCacheKey};
pub use store::{CacheStore, MemoryCacheStore};
