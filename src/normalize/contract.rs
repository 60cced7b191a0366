//! Contract-type extraction from the convocatoria reference string.
//!
//! SERVIR embeds the legal-basis code of a posting in its convocatoria
//! string ("CAS N° 045-2025 D.LEG 1057"). Classification is a
//! case-insensitive substring scan over the configured token table;
//! first rule wins.

use crate::config::ContractTokenRule;
use serde::{Deserialize, Serialize};

/// Contract-type categories distinguished by the legal-basis code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractType {
    #[serde(rename = "CAS")]
    Cas,
    #[serde(rename = "BUDGETED_POSITION")]
    BudgetedPosition,
    #[serde(rename = "OTHER")]
    Other,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cas => "CAS",
            Self::BudgetedPosition => "BUDGETED_POSITION",
            Self::Other => "OTHER",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a stored label back into the enum. Unrecognized labels map
    /// to `Unknown` so a schema change never breaks reads.
    pub fn from_label(label: &str) -> Self {
        match label {
            "CAS" => Self::Cas,
            "BUDGETED_POSITION" => Self::BudgetedPosition,
            "OTHER" => Self::Other,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the convocatoria scan went. Empty input is counted apart from an
/// unmatched one in the run diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvocatoriaOutcome {
    Matched,
    Unmatched,
    Empty,
}

/// Classify a raw convocatoria string against the ordered token rules.
pub fn classify(raw: &str, rules: &[ContractTokenRule]) -> (ContractType, ConvocatoriaOutcome) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (ContractType::Unknown, ConvocatoriaOutcome::Empty);
    }

    let haystack = trimmed.to_uppercase();
    for rule in rules {
        if haystack.contains(&rule.token.to_uppercase()) {
            return (rule.contract_type, ConvocatoriaOutcome::Matched);
        }
    }

    (ContractType::Unknown, ConvocatoriaOutcome::Unmatched)
}
