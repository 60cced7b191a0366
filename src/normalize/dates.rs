//! Posting-date parsing. The portal publishes `DD/MM/YYYY`.

use super::Parse;
use chrono::NaiveDate;

/// Parse a raw portal date string. Format mismatches come back as
/// `Unparsed` and are counted by the caller, never raised.
pub fn parse_date(raw: &str) -> Parse<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Parse::Unparsed {
            raw: raw.to_string(),
            reason: "empty".into(),
        };
    }

    match NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") {
        Ok(date) => Parse::Parsed(date),
        Err(e) => Parse::Unparsed {
            raw: raw.to_string(),
            reason: e.to_string(),
        },
    }
}
