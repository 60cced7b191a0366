//! Rule-based quality gate.
//!
//! Deterministic, ordered rules; first match wins. Verdicts never block
//! storage — flagged records stay available for manual review, only
//! ACCEPTED ones are exported for analysis by convention.

use crate::config::LookupTables;
use crate::normalize::contract::ContractType;
use crate::normalize::NormalizedPosting;
use serde::{Deserialize, Serialize};

/// Fitness of a normalized posting for analytical use. Recomputed every
/// run; the stored label is never trusted across rule changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityVerdict {
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "FLAGGED_MISSING_REQUIREMENTS")]
    FlaggedMissingRequirements,
    #[serde(rename = "FLAGGED_INCOMPLETE_SALARY")]
    FlaggedIncompleteSalary,
    #[serde(rename = "FLAGGED_NONSTANDARD_FORMAT")]
    FlaggedNonstandardFormat,
}

impl QualityVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::FlaggedMissingRequirements => "FLAGGED_MISSING_REQUIREMENTS",
            Self::FlaggedIncompleteSalary => "FLAGGED_INCOMPLETE_SALARY",
            Self::FlaggedNonstandardFormat => "FLAGGED_NONSTANDARD_FORMAT",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ACCEPTED" => Some(Self::Accepted),
            "FLAGGED_MISSING_REQUIREMENTS" => Some(Self::FlaggedMissingRequirements),
            "FLAGGED_INCOMPLETE_SALARY" => Some(Self::FlaggedIncompleteSalary),
            "FLAGGED_NONSTANDARD_FORMAT" => Some(Self::FlaggedNonstandardFormat),
            _ => None,
        }
    }

    /// All verdicts in a stable order, for histograms and CLI parsing.
    pub fn all() -> [Self; 4] {
        [
            Self::Accepted,
            Self::FlaggedMissingRequirements,
            Self::FlaggedIncompleteSalary,
            Self::FlaggedNonstandardFormat,
        ]
    }
}

impl std::fmt::Display for QualityVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply the gate to a normalized posting candidate.
pub fn assess(posting: &NormalizedPosting, tables: &LookupTables) -> QualityVerdict {
    let missing_core = posting.institution.is_none()
        || posting.job_title.is_none()
        || !posting.experience.is_specified()
        || !posting.academic_profile.is_specified()
        || posting.contract_type == ContractType::Unknown;

    if missing_core {
        return QualityVerdict::FlaggedMissingRequirements;
    }

    if posting.salary_amount.is_none() {
        return QualityVerdict::FlaggedIncompleteSalary;
    }

    let institution_known = posting
        .institution
        .as_deref()
        .is_some_and(|i| tables.is_known_institution(i));
    if !institution_known {
        return QualityVerdict::FlaggedNonstandardFormat;
    }

    QualityVerdict::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::normalize::text::TextField;
    use crate::normalize::Provenance;
    use chrono::NaiveDate;

    fn tables() -> LookupTables {
        PipelineConfig::load(None).unwrap().tables
    }

    fn complete_posting() -> NormalizedPosting {
        NormalizedPosting {
            posting_id: "100".into(),
            institution: Some("MINISTERIO DE SALUD".into()),
            job_title: Some("ENFERMERA".into()),
            vacancies: Some(1),
            experience: TextField::Text("Un año".into()),
            academic_profile: TextField::Text("Licenciada en Enfermería".into()),
            specialization: TextField::Unspecified,
            knowledge: TextField::Unspecified,
            competencies: TextField::Unspecified,
            salary_amount: Some(3500.0),
            posting_start_date: NaiveDate::from_ymd_opt(2025, 12, 5),
            posting_end_date: NaiveDate::from_ymd_opt(2025, 12, 19),
            contract_type: ContractType::Cas,
            provenance: Provenance::default(),
        }
    }

    #[test]
    fn test_complete_posting_accepted() {
        assert_eq!(assess(&complete_posting(), &tables()), QualityVerdict::Accepted);
    }

    #[test]
    fn test_null_salary_flagged_incomplete() {
        let mut p = complete_posting();
        p.salary_amount = None;
        assert_eq!(assess(&p, &tables()), QualityVerdict::FlaggedIncompleteSalary);
    }

    #[test]
    fn test_unknown_contract_type_flags_requirements() {
        let mut p = complete_posting();
        p.contract_type = ContractType::Unknown;
        assert_eq!(
            assess(&p, &tables()),
            QualityVerdict::FlaggedMissingRequirements
        );
    }

    #[test]
    fn test_rule_order_missing_title_beats_null_salary() {
        let mut p = complete_posting();
        p.job_title = None;
        p.salary_amount = None;
        assert_eq!(
            assess(&p, &tables()),
            QualityVerdict::FlaggedMissingRequirements
        );
    }

    #[test]
    fn test_unknown_institution_flags_nonstandard() {
        let mut p = complete_posting();
        p.institution = Some("Municipalidad de Ninguna Parte".into());
        assert_eq!(
            assess(&p, &tables()),
            QualityVerdict::FlaggedNonstandardFormat
        );
    }

    #[test]
    fn test_verdict_label_round_trip() {
        for v in QualityVerdict::all() {
            assert_eq!(QualityVerdict::from_label(v.as_str()), Some(v));
        }
        assert_eq!(QualityVerdict::from_label("nope"), None);
    }
}
