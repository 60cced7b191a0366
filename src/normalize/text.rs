//! Free-text cleanup shared by the requirement fields.
//!
//! Trim, collapse runs of whitespace, strip embedded control characters.
//! A result that is empty or boilerplate-only ("Ver bases") becomes the
//! explicit `Unspecified` marker — never an empty string.

use serde::{Deserialize, Serialize};

/// A cleaned free-text field: real content or an explicit missing marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextField {
    Text(String),
    Unspecified,
}

impl TextField {
    pub fn as_option(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Unspecified => None,
        }
    }

    pub fn from_option(value: Option<String>) -> Self {
        match value {
            Some(s) if !s.trim().is_empty() => Self::Text(s),
            _ => Self::Unspecified,
        }
    }

    pub fn is_specified(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// Collapse internal whitespace runs to single spaces and trim the ends.
/// Control characters are dropped outright.
pub fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_gap = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            in_gap = true;
        } else if ch.is_control() {
            // e.g. stray \u{200b}-adjacent artifacts from the renderer
            continue;
        } else {
            if in_gap && !out.is_empty() {
                out.push(' ');
            }
            in_gap = false;
            out.push(ch);
        }
    }
    out
}

/// Uppercase and strip the accents the portal uses inconsistently, for
/// comparison purposes only. Display forms keep their accents.
pub fn comparison_key(raw: &str) -> String {
    collapse_whitespace(raw)
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'Á' => 'A',
            'É' => 'E',
            'Í' => 'I',
            'Ó' => 'O',
            'Ú' | 'Ü' => 'U',
            other => other,
        })
        .collect()
}

/// Clean a requirement free-text field. Sentinel patterns are compared
/// accent- and case-insensitively against the whole cleaned value.
pub fn clean_free_text(raw: &str, sentinels: &[String]) -> TextField {
    let cleaned = collapse_whitespace(raw);
    if cleaned.is_empty() {
        return TextField::Unspecified;
    }

    let key = comparison_key(&cleaned);
    if sentinels.iter().any(|s| comparison_key(s) == key) {
        return TextField::Unspecified;
    }

    TextField::Text(cleaned)
}

/// Clean the job title. Titles are required, not sentinel-checked:
/// an empty result is simply missing.
pub fn clean_title(raw: &str) -> Option<String> {
    let cleaned = collapse_whitespace(raw);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
