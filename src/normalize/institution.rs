//! Institution canonicalization via the configured alias table.

use super::text::{collapse_whitespace, comparison_key};
use crate::config::LookupTables;

/// Canonicalize a raw institution string.
///
/// The raw value is trimmed and whitespace-collapsed, then looked up in
/// the alias table by its uppercased, accent-folded key. A hit returns
/// the canonical display form; a miss keeps the collapsed raw value as
/// its own display form. Empty input is missing, not an empty string.
pub fn canonicalize(raw: &str, tables: &LookupTables) -> Option<String> {
    let display = collapse_whitespace(raw);
    if display.is_empty() {
        return None;
    }

    let key = comparison_key(&display);
    match tables.resolve_institution(&key) {
        Some(canonical) => Some(canonical.to_string()),
        None => Some(display),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn tables() -> LookupTables {
        PipelineConfig::load(None).unwrap().tables
    }

    #[test]
    fn test_alias_maps_to_canonical() {
        assert_eq!(
            canonicalize(" minedu ", &tables()).as_deref(),
            Some("MINISTERIO DE EDUCACION")
        );
    }

    #[test]
    fn test_accented_full_name_maps_to_canonical() {
        assert_eq!(
            canonicalize("Ministerio de Educación", &tables()).as_deref(),
            Some("MINISTERIO DE EDUCACION")
        );
    }

    #[test]
    fn test_unknown_institution_keeps_display_form() {
        assert_eq!(
            canonicalize("Municipalidad  Distrital de Chorrillos", &tables()).as_deref(),
            Some("Municipalidad Distrital de Chorrillos")
        );
    }

    #[test]
    fn test_empty_is_missing() {
        assert_eq!(canonicalize("   ", &tables()), None);
    }

    #[test]
    fn test_known_institution_membership() {
        let t = tables();
        let canonical = canonicalize("MINSA", &t).unwrap();
        assert!(t.is_known_institution(&canonical));
        let unknown = canonicalize("Empresa Fantasma SAC", &t).unwrap();
        assert!(!t.is_known_institution(&unknown));
    }
}
