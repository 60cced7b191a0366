//! Run-level statistics and the run outcome.

use crate::normalize::ParseMiss;
use crate::quality::QualityVerdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a run ended, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every page and posting processed cleanly.
    Complete,
    /// The run finished, but some units failed and were skipped.
    Partial,
    /// The walker exceeded its failure budget; committed progress kept.
    Aborted,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::Partial => 2,
            Self::Aborted => 1,
        }
    }
}

/// Counters accumulated over one collection (or reprocess) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    pub pages_walked: u64,
    pub pages_failed: u64,
    pub postings_seen: u64,
    pub postings_inserted: u64,
    pub postings_updated: u64,
    pub fetch_failures: u64,

    // Per-field parse misses. Empty convocatoria input is counted apart
    // from an unmatched one.
    pub vacancy_misses: u64,
    pub salary_misses: u64,
    pub start_date_misses: u64,
    pub end_date_misses: u64,
    pub convocatoria_empty: u64,
    pub convocatoria_unmatched: u64,

    // Verdict histogram for this run.
    pub accepted: u64,
    pub flagged_missing_requirements: u64,
    pub flagged_incomplete_salary: u64,
    pub flagged_nonstandard_format: u64,

    pub outcome: RunOutcome,
}

impl RunStats {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_walked: 0,
            pages_failed: 0,
            postings_seen: 0,
            postings_inserted: 0,
            postings_updated: 0,
            fetch_failures: 0,
            vacancy_misses: 0,
            salary_misses: 0,
            start_date_misses: 0,
            end_date_misses: 0,
            convocatoria_empty: 0,
            convocatoria_unmatched: 0,
            accepted: 0,
            flagged_missing_requirements: 0,
            flagged_incomplete_salary: 0,
            flagged_nonstandard_format: 0,
            outcome: RunOutcome::Complete,
        }
    }

    pub fn record_miss(&mut self, miss: ParseMiss) {
        match miss {
            ParseMiss::Vacancies => self.vacancy_misses += 1,
            ParseMiss::Salary => self.salary_misses += 1,
            ParseMiss::StartDate => self.start_date_misses += 1,
            ParseMiss::EndDate => self.end_date_misses += 1,
            ParseMiss::ConvocatoriaEmpty => self.convocatoria_empty += 1,
            ParseMiss::ConvocatoriaUnmatched => self.convocatoria_unmatched += 1,
        }
    }

    pub fn record_verdict(&mut self, verdict: QualityVerdict) {
        match verdict {
            QualityVerdict::Accepted => self.accepted += 1,
            QualityVerdict::FlaggedMissingRequirements => self.flagged_missing_requirements += 1,
            QualityVerdict::FlaggedIncompleteSalary => self.flagged_incomplete_salary += 1,
            QualityVerdict::FlaggedNonstandardFormat => self.flagged_nonstandard_format += 1,
        }
    }

    /// Close the run: stamp the finish time and settle the outcome.
    /// `aborted` marks a walker-budget termination; otherwise any failed
    /// unit downgrades Complete to Partial.
    pub fn finish(&mut self, aborted: bool) {
        self.finished_at = Some(Utc::now());
        self.outcome = if aborted {
            RunOutcome::Aborted
        } else if self.pages_failed > 0 || self.fetch_failures > 0 {
            RunOutcome::Partial
        } else {
            RunOutcome::Complete
        };
    }

    /// Human-readable run summary.
    pub fn summary(&self) -> String {
        let elapsed = self
            .finished_at
            .map(|f| (f - self.started_at).num_seconds())
            .unwrap_or_default();
        format!(
            "pages walked:        {}\n\
             pages failed:        {}\n\
             postings seen:       {}\n\
             newly inserted:      {}\n\
             updated:             {}\n\
             fetch failures:      {}\n\
             parse misses:        vacancies {}, salary {}, start date {}, end date {}\n\
             convocatoria:        empty {}, unmatched {}\n\
             verdicts:            accepted {}, missing-reqs {}, incomplete-salary {}, nonstandard {}\n\
             outcome:             {:?} ({}s)",
            self.pages_walked,
            self.pages_failed,
            self.postings_seen,
            self.postings_inserted,
            self.postings_updated,
            self.fetch_failures,
            self.vacancy_misses,
            self.salary_misses,
            self.start_date_misses,
            self.end_date_misses,
            self.convocatoria_empty,
            self.convocatoria_unmatched,
            self.accepted,
            self.flagged_missing_requirements,
            self.flagged_incomplete_salary,
            self.flagged_nonstandard_format,
            self.outcome,
            elapsed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_run_is_complete() {
        let mut stats = RunStats::start();
        stats.pages_walked = 3;
        stats.postings_seen = 12;
        stats.finish(false);
        assert_eq!(stats.outcome, RunOutcome::Complete);
        assert_eq!(stats.outcome.exit_code(), 0);
    }

    #[test]
    fn test_failed_units_downgrade_to_partial() {
        let mut stats = RunStats::start();
        stats.fetch_failures = 1;
        stats.finish(false);
        assert_eq!(stats.outcome, RunOutcome::Partial);
        assert_eq!(stats.outcome.exit_code(), 2);
    }

    #[test]
    fn test_walker_budget_aborts() {
        let mut stats = RunStats::start();
        stats.pages_failed = 2;
        stats.finish(true);
        assert_eq!(stats.outcome, RunOutcome::Aborted);
        assert_eq!(stats.outcome.exit_code(), 1);
    }

    #[test]
    fn test_miss_and_verdict_counters() {
        let mut stats = RunStats::start();
        stats.record_miss(ParseMiss::Salary);
        stats.record_miss(ParseMiss::Vacancies);
        stats.record_miss(ParseMiss::ConvocatoriaEmpty);
        stats.record_verdict(QualityVerdict::Accepted);
        stats.record_verdict(QualityVerdict::FlaggedIncompleteSalary);
        assert_eq!(stats.salary_misses, 1);
        assert_eq!(stats.vacancy_misses, 1);
        assert_eq!(stats.convocatoria_empty, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.flagged_incomplete_salary, 1);
    }
}
