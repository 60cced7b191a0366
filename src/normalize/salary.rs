//! Salary parsing: raw portal strings → PEN amount.
//!
//! The portal writes amounts as "S/. 4,000.00", "S/ 4000" or occasionally
//! free text ("A convenir"). We take the first numeric token after
//! stripping currency symbols and thousands separators. All amounts are
//! PEN; no conversion.

use super::Parse;
use regex::Regex;
use std::sync::OnceLock;

fn numeric_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("static regex"))
}

/// Parse a raw salary string into a PEN amount.
pub fn parse_salary(raw: &str) -> Parse<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Parse::Unparsed {
            raw: raw.to_string(),
            reason: "empty".into(),
        };
    }

    // Thousands separators out first so "4,000.00" scans as one token.
    // The currency marker ("S/.", "S/") carries no digits, so the token
    // scan never picks it up.
    let cleaned = trimmed.replace(',', "");

    if let Some(m) = numeric_token().find(&cleaned) {
        if let Ok(amount) = m.as_str().parse::<f64>() {
            return Parse::Parsed(amount);
        }
    }

    Parse::Unparsed {
        raw: raw.to_string(),
        reason: "no numeric token".into(),
    }
}
