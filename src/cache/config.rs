//! Feed cache configuration.

use std::num::{NonZeroU32, NonZeroUsize};

const DEFAULT_CAPACITY: usize = 256;
const DEFAULT_TTL_MINUTES: u32 = 10;
/// One year.
pub const MAX_TTL_MINUTES: u32 = 525_600;

/// Time-to-live in whole minutes. `0` or empty disables caching; it never
/// means "expire immediately".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheTtl(Option<NonZeroU32>);

impl CacheTtl {
    pub const DISABLED: CacheTtl = CacheTtl(None);

    pub fn from_minutes(minutes: u32) -> Self {
        Self(NonZeroU32::new(minutes))
    }

    /// Interpret a raw configuration value: empty, `0` and `false` disable.
    /// Values above [`MAX_TTL_MINUTES`] are rejected.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("false") {
            return Ok(Self::DISABLED);
        }
        let minutes = trimmed
            .parse::<u32>()
            .map_err(|err| format!("`{trimmed}` is not a whole number of minutes: {err}"))?;
        if minutes > MAX_TTL_MINUTES {
            return Err(format!(
                "`{minutes}` minutes exceeds the maximum of {MAX_TTL_MINUTES}"
            ));
        }
        Ok(Self::from_minutes(minutes))
    }

    pub fn minutes(self) -> Option<u32> {
        self.0.map(NonZeroU32::get)
    }

    pub fn is_enabled(self) -> bool {
        self.0.is_some()
    }

    pub fn as_duration(self) -> Option<time::Duration> {
        self.minutes()
            .map(|minutes| time::Duration::minutes(i64::from(minutes)))
    }
}

/// Feed cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Maximum entries held by the in-memory store; each feed uses three.
    pub capacity: usize,
    pub ttl: CacheTtl,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: CacheTtl::from_minutes(DEFAULT_TTL_MINUTES),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            capacity: settings.capacity,
            ttl: settings.ttl,
        }
    }
}

impl CacheConfig {
    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 256);
        assert_eq!(config.ttl.minutes(), Some(10));
    }

    #[test]
    fn zero_and_empty_ttl_disable_caching() {
        assert_eq!(CacheTtl::parse("").expect("empty"), CacheTtl::DISABLED);
        assert_eq!(CacheTtl::parse("0").expect("zero"), CacheTtl::DISABLED);
        assert_eq!(CacheTtl::parse("false").expect("false"), CacheTtl::DISABLED);
        assert!(!CacheTtl::from_minutes(0).is_enabled());
        assert_eq!(CacheTtl::parse(" 15 ").expect("number").minutes(), Some(15));
        assert!(CacheTtl::parse("soon").is_err());
    }

    #[test]
    fn ttl_above_one_year_is_rejected() {
        assert_eq!(
            CacheTtl::parse("525600").expect("one year").minutes(),
            Some(MAX_TTL_MINUTES)
        );
        assert!(CacheTtl::parse("525601").is_err());
        assert!(CacheTtl::parse("4294967295").is_err());
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.capacity_non_zero().get(), 1);
    }
}
