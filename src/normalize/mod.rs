//! Field normalization: RawPosting → NormalizedPosting candidate.
//!
//! Every function in this module is pure. Lookup tables come in as
//! explicit arguments; parse outcomes are tagged (`Parse::Parsed` vs
//! `Parse::Unparsed`) so the reason for a miss survives to the stats
//! layer instead of collapsing into a bare null.

pub mod contract;
pub mod dates;
pub mod institution;
pub mod salary;
pub mod text;
pub mod vacancy;

use crate::config::LookupTables;
use chrono::{DateTime, NaiveDate, Utc};
use contract::{ContractType, ConvocatoriaOutcome};
use serde::{Deserialize, Serialize};
use text::TextField;

/// A posting exactly as scraped: every field is opaque text. Ephemeral —
/// owned by the orchestrator for one run, never persisted directly.
#[derive(Debug, Clone, Default)]
pub struct RawPosting {
    pub posting_id: String,
    pub institution_raw: String,
    pub job_title: String,
    pub vacancies_text: String,
    pub experience_text: String,
    pub academic_profile_text: String,
    pub specialization_text: String,
    pub knowledge_text: String,
    pub competencies_text: String,
    pub salary_text: String,
    pub posting_start_text: String,
    pub posting_end_text: String,
    pub convocatoria_text: String,
    pub scrape_timestamp: Option<DateTime<Utc>>,
}

/// Tagged parse result. `Unparsed` keeps the raw input and the reason so
/// later rule-tuning can see what the parser rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Parse<T> {
    Parsed(T),
    Unparsed { raw: String, reason: String },
}

impl<T> Parse<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Parse::Parsed(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Parse::Parsed(v) => Some(v),
            Parse::Unparsed { .. } => None,
        }
    }
}

/// Raw source text for the parse-bearing fields, carried alongside the
/// normalized values. This is what makes `convoca reprocess` possible
/// without re-scraping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    pub institution_raw: String,
    pub vacancies_text: String,
    pub salary_text: String,
    pub posting_start_text: String,
    pub posting_end_text: String,
    pub convocatoria_text: String,
}

/// A normalized posting candidate, not yet quality-gated.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPosting {
    pub posting_id: String,
    /// Canonical display form, or None when the raw value was empty.
    pub institution: Option<String>,
    pub job_title: Option<String>,
    /// Number of vacancies for the position, when the portal gives one.
    pub vacancies: Option<u32>,
    pub experience: TextField,
    pub academic_profile: TextField,
    pub specialization: TextField,
    pub knowledge: TextField,
    pub competencies: TextField,
    /// Amount in PEN. No currency conversion.
    pub salary_amount: Option<f64>,
    pub posting_start_date: Option<NaiveDate>,
    pub posting_end_date: Option<NaiveDate>,
    pub contract_type: ContractType,
    pub provenance: Provenance,
}

/// Which per-field parses missed, for the run's diagnostic counters.
/// Empty convocatoria input is counted apart from an unmatched one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseMiss {
    Vacancies,
    Salary,
    StartDate,
    EndDate,
    ConvocatoriaEmpty,
    ConvocatoriaUnmatched,
}

/// Normalize one raw posting. Returns the candidate record plus the list
/// of per-field parse misses for stats accumulation.
pub fn normalize(raw: &RawPosting, tables: &LookupTables) -> (NormalizedPosting, Vec<ParseMiss>) {
    let mut misses = Vec::new();

    let vacancies = vacancy::parse_vacancies(&raw.vacancies_text);
    if !vacancies.is_parsed() && !raw.vacancies_text.trim().is_empty() {
        misses.push(ParseMiss::Vacancies);
    }

    let salary = salary::parse_salary(&raw.salary_text);
    if !salary.is_parsed() && !raw.salary_text.trim().is_empty() {
        misses.push(ParseMiss::Salary);
    }

    let start = dates::parse_date(&raw.posting_start_text);
    if !start.is_parsed() && !raw.posting_start_text.trim().is_empty() {
        misses.push(ParseMiss::StartDate);
    }
    let end = dates::parse_date(&raw.posting_end_text);
    if !end.is_parsed() && !raw.posting_end_text.trim().is_empty() {
        misses.push(ParseMiss::EndDate);
    }

    let (contract_type, outcome) =
        contract::classify(&raw.convocatoria_text, &tables.contract_tokens);
    match outcome {
        ConvocatoriaOutcome::Empty => misses.push(ParseMiss::ConvocatoriaEmpty),
        ConvocatoriaOutcome::Unmatched => misses.push(ParseMiss::ConvocatoriaUnmatched),
        ConvocatoriaOutcome::Matched => {}
    }

    let posting = NormalizedPosting {
        posting_id: raw.posting_id.trim().to_string(),
        institution: institution::canonicalize(&raw.institution_raw, tables),
        job_title: text::clean_title(&raw.job_title),
        vacancies: vacancies.into_option(),
        experience: text::clean_free_text(&raw.experience_text, &tables.unspecified_sentinels),
        academic_profile: text::clean_free_text(
            &raw.academic_profile_text,
            &tables.unspecified_sentinels,
        ),
        specialization: text::clean_free_text(
            &raw.specialization_text,
            &tables.unspecified_sentinels,
        ),
        knowledge: text::clean_free_text(&raw.knowledge_text, &tables.unspecified_sentinels),
        competencies: text::clean_free_text(&raw.competencies_text, &tables.unspecified_sentinels),
        salary_amount: salary.into_option(),
        posting_start_date: start.into_option(),
        posting_end_date: end.into_option(),
        contract_type,
        provenance: Provenance {
            institution_raw: raw.institution_raw.clone(),
            vacancies_text: raw.vacancies_text.clone(),
            salary_text: raw.salary_text.clone(),
            posting_start_text: raw.posting_start_text.clone(),
            posting_end_text: raw.posting_end_text.clone(),
            convocatoria_text: raw.convocatoria_text.clone(),
        },
    };

    (posting, misses)
}
