//! Vacancy-count parsing. The portal publishes a bare integer.

use super::Parse;

/// Parse a raw vacancy-count string into a count.
pub fn parse_vacancies(raw: &str) -> Parse<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Parse::Unparsed {
            raw: raw.to_string(),
            reason: "empty".into(),
        };
    }

    match trimmed.parse::<u32>() {
        Ok(count) => Parse::Parsed(count),
        Err(e) => Parse::Unparsed {
            raw: raw.to_string(),
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_count() {
        assert_eq!(parse_vacancies("2"), Parse::Parsed(2));
        assert_eq!(parse_vacancies(" 10 "), Parse::Parsed(10));
    }

    #[test]
    fn test_free_text_is_unparsed() {
        assert!(!parse_vacancies("varias").is_parsed());
    }

    #[test]
    fn test_empty_is_unparsed() {
        assert!(!parse_vacancies("  ").is_parsed());
    }
}
