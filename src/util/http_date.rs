//! HTTP-date formatting and parsing.
//!
//! Output is always IMF-fixdate. Input also accepts the obsolete RFC 850 and
//! asctime forms plus numeric-offset RFC 2822 dates.

use time::{
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc2822},
    macros::format_description,
    parsing::Parsed,
};

const IMF_FIXDATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// `Sunday, 06-Nov-94 08:49:37 GMT`
const RFC850: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday], [day]-[month repr:short]-[year repr:last_two] [hour]:[minute]:[second] GMT"
);

/// `Sun Nov  6 08:49:37 1994`
const ASCTIME: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
);

/// Format an instant as `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn format(at: OffsetDateTime) -> String {
    let utc = at.to_offset(UtcOffset::UTC);
    utc.format(IMF_FIXDATE)
        .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

/// Parse any HTTP-date form, falling back to numeric-offset RFC 2822 dates.
pub fn parse(value: &str) -> Option<OffsetDateTime> {
    let trimmed = value.trim();
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, IMF_FIXDATE) {
        return Some(parsed.assume_utc());
    }
    if let Some(parsed) = parse_rfc850(trimmed, OffsetDateTime::now_utc().year()) {
        return Some(parsed);
    }
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, ASCTIME) {
        return Some(parsed.assume_utc());
    }
    OffsetDateTime::parse(trimmed, &Rfc2822)
        .ok()
        .map(|parsed| parsed.to_offset(UtcOffset::UTC))
}

/// Two-digit years more than 50 years past `current_year` belong to the
/// previous century (RFC 9110 section 5.6.7).
fn parse_rfc850(value: &str, current_year: i32) -> Option<OffsetDateTime> {
    let mut parsed = Parsed::new();
    let rest = parsed.parse_items(value.as_bytes(), RFC850).ok()?;
    if !rest.is_empty() {
        return None;
    }

    let century = current_year - current_year.rem_euclid(100);
    let mut year = century + i32::from(parsed.year_last_two()?);
    if year > current_year + 50 {
        year -= 100;
    }
    parsed.set_year(year)?;

    PrimitiveDateTime::try_from(parsed)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}
