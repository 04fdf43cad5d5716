//! Entry selection: visibility, ordering and truncation.

use time::OffsetDateTime;

use crate::domain::entities::ContentItem;
use crate::domain::types::HighWaterSource;

/// Upper bound on entries in any feed.
pub const MAX_ENTRIES: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    Unlisted,
    ExcludedFromFeeds,
    Sunset,
    Embargoed,
}

impl ExclusionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExclusionReason::Unlisted => "unlisted",
            ExclusionReason::ExcludedFromFeeds => "excludefromfeeds",
            ExclusionReason::Sunset => "sunset",
            ExclusionReason::Embargoed => "under embargo",
        }
    }
}

#[derive(Debug)]
pub struct Selection<'a> {
    /// Newest first by publish time, at most `cap` long.
    pub entries: Vec<&'a ContentItem>,
    pub excluded: Vec<(&'a ContentItem, ExclusionReason)>,
}

pub fn exclusion_reason(item: &ContentItem, now: OffsetDateTime) -> Option<ExclusionReason> {
    if !item.listed {
        Some(ExclusionReason::Unlisted)
    } else if item.exclude_from_feeds {
        Some(ExclusionReason::ExcludedFromFeeds)
    } else if item.is_sunset(now) {
        Some(ExclusionReason::Sunset)
    } else if item.is_under_embargo(now) {
        Some(ExclusionReason::Embargoed)
    } else {
        None
    }
}

pub fn select_entries(items: &[ContentItem], now: OffsetDateTime, cap: usize) -> Selection<'_> {
    let mut entries = Vec::with_capacity(items.len());
    let mut excluded = Vec::new();

    for item in items {
        match exclusion_reason(item, now) {
            Some(reason) => excluded.push((item, reason)),
            None => entries.push(item),
        }
    }

    // Ascending then reversed: among equal publish times the later item wins.
    entries.sort_by_key(|item| item.published_at());
    entries.reverse();
    entries.truncate(cap);

    Selection { entries, excluded }
}

/// Maximum timestamp across the selected entries, truncated to whole seconds.
///
/// An empty selection yields the epoch.
pub fn high_water_mark(entries: &[&ContentItem], source: HighWaterSource) -> OffsetDateTime {
    entries
        .iter()
        .map(|item| match source {
            HighWaterSource::Published => item.published_at(),
            HighWaterSource::Modified => item.modified_at(),
        })
        .max()
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .replace_nanosecond(0)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}
