//! Inbound feed requests and conditional-header validation.

use thiserror::Error;
use time::OffsetDateTime;

use crate::application::syndication::{FeedScope, etag};
use crate::domain::types::FeedFormat;
use crate::util::http_date;

/// One feed request, already resolved to a scope. Built per call and dropped
/// once the response is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub scope: FeedScope,
    pub format: FeedFormat,
    /// Bare tag (no quotes) from `If-None-Match`.
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<OffsetDateTime>,
    pub debug: bool,
}

impl FeedRequest {
    pub fn new(scope: FeedScope, format: FeedFormat) -> Self {
        Self {
            scope,
            format,
            if_none_match: None,
            if_modified_since: None,
            debug: false,
        }
    }

    pub fn with_if_none_match(mut self, tag: impl Into<String>) -> Self {
        self.if_none_match = Some(tag.into());
        self
    }

    /// The epoch is the zero value and counts as no validator.
    pub fn with_if_modified_since(mut self, at: OffsetDateTime) -> Self {
        self.if_modified_since = (at != OffsetDateTime::UNIX_EPOCH).then_some(at);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// `If-Modified-Since`, unless it holds the epoch.
    pub fn modified_since(&self) -> Option<OffsetDateTime> {
        self.if_modified_since
            .filter(|at| *at != OffsetDateTime::UNIX_EPOCH)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("If-None-Match `{value}` is not an entity tag issued by this server")]
    MalformedEntityTag { value: String },
    #[error("If-Modified-Since `{value}` is not a valid HTTP date")]
    MalformedDate { value: String },
}

/// Accept exactly one of our tags, optionally quoted and optionally weak.
pub fn parse_if_none_match(raw: &str) -> Result<String, ValidatorError> {
    let trimmed = raw.trim();
    let strong = trimmed.strip_prefix("W/").unwrap_or(trimmed);
    let bare = strong
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(strong);

    if etag::is_well_formed(bare) {
        Ok(bare.to_string())
    } else {
        Err(ValidatorError::MalformedEntityTag {
            value: raw.to_string(),
        })
    }
}

pub fn parse_if_modified_since(raw: &str) -> Result<OffsetDateTime, ValidatorError> {
    http_date::parse(raw).ok_or_else(|| ValidatorError::MalformedDate {
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn tag() -> String {
        etag::compute(b"body")
    }

    #[test]
    fn accepts_bare_quoted_and_weak_tags() {
        let tag = tag();
        assert_eq!(parse_if_none_match(&tag), Ok(tag.clone()));
        assert_eq!(parse_if_none_match(&format!("\"{tag}\"")), Ok(tag.clone()));
        assert_eq!(parse_if_none_match(&format!("W/\"{tag}\"")), Ok(tag.clone()));
        assert_eq!(parse_if_none_match(&format!("  \"{tag}\" ")), Ok(tag));
    }

    #[test]
    fn rejects_foreign_tags() {
        for raw in ["garbage", "*", "", "\"abc\"", "\"syn0\""] {
            assert!(
                matches!(
                    parse_if_none_match(raw),
                    Err(ValidatorError::MalformedEntityTag { .. })
                ),
                "{raw} should be rejected"
            );
        }
        let two = format!("\"{}\", \"{}\"", tag(), tag());
        assert!(parse_if_none_match(&two).is_err());
    }

    #[test]
    fn epoch_modified_since_counts_as_absent() {
        let scope = FeedScope::Firehose {
            collection: "articles".to_string(),
        };
        let request = FeedRequest::new(scope, FeedFormat::Rss);
        assert_eq!(
            request
                .clone()
                .with_if_modified_since(OffsetDateTime::UNIX_EPOCH)
                .if_modified_since,
            None
        );
        assert_eq!(
            request
                .with_if_modified_since(datetime!(1994-11-06 08:49:37 UTC))
                .if_modified_since,
            Some(datetime!(1994-11-06 08:49:37 UTC))
        );
    }

    #[test]
    fn modified_since_requires_a_date() {
        assert_eq!(
            parse_if_modified_since("Sun, 06 Nov 1994 08:49:37 GMT"),
            Ok(datetime!(1994-11-06 08:49:37 UTC))
        );
        assert_eq!(
            parse_if_modified_since("last tuesday"),
            Err(ValidatorError::MalformedDate {
                value: "last tuesday".to_string()
            })
        );
    }
}
