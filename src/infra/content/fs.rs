//! Filesystem-backed content source.
//!
//! Layout: `<root>/<collection>/*.toml`, one item per file, plus an optional
//! `<root>/<collection>/_collection.toml` carrying `display_name`.
//!
//! ```toml
//! title = "Crossing the pass"
//! url = "https://example.com/travel/crossing-the-pass"
//! body_html = "<p>…</p>"
//! date = "2024-05-01T09:00:00Z"
//! updated = "2024-05-03T18:30:00Z"
//! authors = ["Ada"]
//! excludefromfeeds = false
//! ```
//!
//! Timestamps are quoted RFC 3339 strings. When `url` (or `id`) is missing the
//! item is addressed as `<base_url>/<collection>/<file stem>`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::fs;
use tracing::debug;

use crate::application::repos::{ContentSource, RepoError};
use crate::domain::entities::{Collection, ContentItem};

const SOURCE: &str = "infra::content::fs";
const COLLECTION_FILE: &str = "_collection.toml";

#[derive(Debug, Clone)]
pub struct FsContentSource {
    root: PathBuf,
    base_url: String,
}

impl FsContentSource {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn collection_dir(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.root.join(relative)),
            _ => None,
        }
    }

    async fn read_item(&self, key: &str, path: &Path) -> Result<ContentItem, RepoError> {
        let record = path.display().to_string();
        let data = fs::read_to_string(path)
            .await
            .map_err(RepoError::from_persistence)?;
        let raw: RawItem =
            toml::from_str(&data).map_err(|err| RepoError::malformed(&record, err))?;
        let stored_at = fs::metadata(path)
            .await
            .and_then(|meta| meta.modified())
            .ok()
            .map(OffsetDateTime::from);

        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let url = raw
            .url
            .or(raw.id)
            .unwrap_or_else(|| format!("{}/{key}/{stem}", self.base_url));
        let title = raw.title.unwrap_or_else(|| stem.to_string());

        let mut item = ContentItem::new(url, title);
        item.body_html = raw.body_html;
        item.date = parse_timestamp(&record, "date", raw.date.as_deref())?;
        item.updated = parse_timestamp(&record, "updated", raw.updated.as_deref())?;
        item.stored_at = stored_at;
        item.authors = raw.authors;
        item.listed = raw.listed;
        item.exclude_from_feeds = raw.exclude_from_feeds;
        item.sunset_at = parse_timestamp(&record, "sunset", raw.sunset.as_deref())?;
        item.embargo_until = parse_timestamp(&record, "embargo", raw.embargo.as_deref())?;
        Ok(item)
    }

    async fn display_name(&self, key: &str, dir: &Path) -> Result<String, RepoError> {
        let path = dir.join(COLLECTION_FILE);
        match fs::read_to_string(&path).await {
            Ok(data) => {
                let raw: RawCollection = toml::from_str(&data)
                    .map_err(|err| RepoError::malformed(path.display().to_string(), err))?;
                Ok(raw.display_name.unwrap_or_else(|| key.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(key.to_string()),
            Err(err) => Err(RepoError::from_persistence(err)),
        }
    }
}

#[async_trait]
impl ContentSource for FsContentSource {
    async fn load_collection(&self, key: &str) -> Result<Option<Collection>, RepoError> {
        let Some(dir) = self.collection_dir(key) else {
            return Ok(None);
        };

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(RepoError::from_persistence(err)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(RepoError::from_persistence)?
        {
            let path = entry.path();
            let is_item = path.extension().is_some_and(|ext| ext == "toml")
                && path.file_name().is_some_and(|name| name != COLLECTION_FILE);
            if is_item {
                paths.push(path);
            }
        }
        paths.sort();

        let mut items = Vec::with_capacity(paths.len());
        for path in &paths {
            items.push(self.read_item(key, path).await?);
        }

        debug!(
            target = SOURCE,
            collection = key,
            items = items.len(),
            "loaded collection"
        );

        Ok(Some(Collection {
            key: key.to_string(),
            display_name: self.display_name(key, &dir).await?,
            items,
        }))
    }
}

fn parse_timestamp(
    record: &str,
    field: &str,
    value: Option<&str>,
) -> Result<Option<OffsetDateTime>, RepoError> {
    value
        .map(|raw| {
            OffsetDateTime::parse(raw.trim(), &time::format_description::well_known::Rfc3339)
                .map_err(|err| RepoError::malformed(record, format!("`{field}`: {err}")))
        })
        .transpose()
}

#[derive(Debug, Deserialize)]
struct RawItem {
    title: Option<String>,
    url: Option<String>,
    id: Option<String>,
    #[serde(default)]
    body_html: String,
    date: Option<String>,
    updated: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default = "listed_by_default")]
    listed: bool,
    #[serde(default, rename = "excludefromfeeds")]
    exclude_from_feeds: bool,
    sunset: Option<String>,
    embargo: Option<String>,
}

fn listed_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    display_name: Option<String>,
}
