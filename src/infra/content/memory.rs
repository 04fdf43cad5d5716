use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::application::repos::{ContentSource, RepoError};
use crate::domain::entities::Collection;

/// Collections held in memory; counts every load so callers can assert on
/// how often the source was consulted.
#[derive(Debug, Default)]
pub struct MemoryContentSource {
    collections: RwLock<HashMap<String, Collection>>,
    loads: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryContentSource {
    pub fn with(collections: impl IntoIterator<Item = Collection>) -> Self {
        let source = Self::default();
        for collection in collections {
            source.insert(collection);
        }
        source
    }

    /// Add or replace a collection by key.
    pub fn insert(&self, collection: Collection) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(collection.key.clone(), collection);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Make every subsequent load fail as if the backing store were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentSource for MemoryContentSource {
    async fn load_collection(&self, key: &str) -> Result<Option<Collection>, RepoError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("content source unavailable"));
        }
        Ok(self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(key: &str) -> Collection {
        Collection {
            key: key.to_string(),
            display_name: key.to_uppercase(),
            items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn loads_are_counted_and_missing_is_none() {
        let source = MemoryContentSource::with([collection("articles")]);
        assert!(source.load_collection("articles").await.expect("load").is_some());
        assert!(source.load_collection("travel").await.expect("load").is_none());
        assert_eq!(source.loads(), 2);
    }

    #[tokio::test]
    async fn unavailable_source_errors() {
        let source = MemoryContentSource::with([collection("articles")]);
        source.set_unavailable(true);
        let err = source.load_collection("articles").await.expect_err("down");
        assert!(matches!(err, RepoError::Persistence(_)));
    }
}
