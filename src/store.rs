//! Idempotent posting store backed by SQLite.
//!
//! One logical table keyed by posting_id. Upsert semantics: first
//! observation inserts with first_seen = last_seen = now; re-observation
//! updates last_seen and fills previously-null columns, never
//! overwriting a non-null value. The merge is commutative, so re-runs
//! and interleaved runs converge on the same state. Nothing is ever
//! deleted during normal operation.

use crate::error::PipelineError;
use crate::normalize::contract::ContractType;
use crate::normalize::text::TextField;
use crate::normalize::{NormalizedPosting, Provenance};
use crate::quality::QualityVerdict;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A posting row as stored, used by export, status and reprocess.
#[derive(Debug, Clone)]
pub struct StoredPosting {
    pub posting_id: String,
    pub institution: Option<String>,
    pub job_title: Option<String>,
    pub vacancies: Option<u32>,
    pub experience: Option<String>,
    pub academic_profile: Option<String>,
    pub specialization: Option<String>,
    pub knowledge: Option<String>,
    pub competencies: Option<String>,
    pub salary_amount: Option<f64>,
    pub posting_start_date: Option<String>,
    pub posting_end_date: Option<String>,
    pub contract_type: ContractType,
    pub verdict: Option<QualityVerdict>,
    pub provenance: Provenance,
    pub first_seen_at: String,
    pub last_seen_at: String,
}

/// The posting store.
pub struct Store {
    conn: Connection,
}

const SELECT_COLUMNS: &str = "posting_id, institution, job_title, vacancies, experience, \
     academic_profile, specialization, knowledge, competencies, salary_amount, \
     posting_start_date, posting_end_date, contract_type, verdict, \
     raw_institution, raw_vacancies, raw_salary, raw_posting_start, \
     raw_posting_end, raw_convocatoria, first_seen_at, last_seen_at";

impl Store {
    /// Open or create a store at the given path.
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PipelineError::Config(format!(
                        "cannot create data directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, PipelineError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PipelineError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS postings (
                posting_id          TEXT PRIMARY KEY,
                institution         TEXT,
                job_title           TEXT,
                vacancies           INTEGER,
                experience          TEXT,
                academic_profile    TEXT,
                specialization      TEXT,
                knowledge           TEXT,
                competencies        TEXT,
                salary_amount       REAL,
                posting_start_date  TEXT,
                posting_end_date    TEXT,
                contract_type       TEXT NOT NULL DEFAULT 'UNKNOWN',
                verdict             TEXT,
                raw_institution     TEXT,
                raw_vacancies       TEXT,
                raw_salary          TEXT,
                raw_posting_start   TEXT,
                raw_posting_end     TEXT,
                raw_convocatoria    TEXT,
                first_seen_at       TEXT NOT NULL,
                last_seen_at        TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Insert a new posting or merge into the existing row.
    ///
    /// The insert carries an ON CONFLICT clause, so an id that already
    /// exists falls through to the merge update instead of tripping the
    /// primary-key constraint, even when another run inserted it between
    /// our statements.
    pub fn upsert(
        &mut self,
        posting: &NormalizedPosting,
        verdict: QualityVerdict,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, PipelineError> {
        let now_str = now.to_rfc3339();
        let tx = self.conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO postings (
                posting_id, institution, job_title, vacancies, experience,
                academic_profile, specialization, knowledge, competencies,
                salary_amount, posting_start_date, posting_end_date,
                contract_type, verdict, raw_institution, raw_vacancies,
                raw_salary, raw_posting_start, raw_posting_end,
                raw_convocatoria, first_seen_at, last_seen_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                       ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?21)
             ON CONFLICT(posting_id) DO NOTHING",
            params![
                posting.posting_id,
                posting.institution,
                posting.job_title,
                posting.vacancies,
                posting.experience.as_option(),
                posting.academic_profile.as_option(),
                posting.specialization.as_option(),
                posting.knowledge.as_option(),
                posting.competencies.as_option(),
                posting.salary_amount,
                posting.posting_start_date.map(iso_date),
                posting.posting_end_date.map(iso_date),
                posting.contract_type.as_str(),
                verdict.as_str(),
                raw_or_null(&posting.provenance.institution_raw),
                raw_or_null(&posting.provenance.vacancies_text),
                raw_or_null(&posting.provenance.salary_text),
                raw_or_null(&posting.provenance.posting_start_text),
                raw_or_null(&posting.provenance.posting_end_text),
                raw_or_null(&posting.provenance.convocatoria_text),
                now_str,
            ],
        )?;

        if inserted == 1 {
            tx.commit()?;
            return Ok(UpsertOutcome::Inserted);
        }

        // Merge: last-write on last_seen and verdict, fill-if-null on
        // everything else. first_seen_at is never touched.
        tx.execute(
            "UPDATE postings SET
                institution        = COALESCE(institution, ?2),
                job_title          = COALESCE(job_title, ?3),
                vacancies          = COALESCE(vacancies, ?4),
                experience         = COALESCE(experience, ?5),
                academic_profile   = COALESCE(academic_profile, ?6),
                specialization     = COALESCE(specialization, ?7),
                knowledge          = COALESCE(knowledge, ?8),
                competencies       = COALESCE(competencies, ?9),
                salary_amount      = COALESCE(salary_amount, ?10),
                posting_start_date = COALESCE(posting_start_date, ?11),
                posting_end_date   = COALESCE(posting_end_date, ?12),
                contract_type      = CASE WHEN contract_type = 'UNKNOWN'
                                          THEN ?13 ELSE contract_type END,
                verdict            = ?14,
                raw_institution    = COALESCE(raw_institution, ?15),
                raw_vacancies      = COALESCE(raw_vacancies, ?16),
                raw_salary         = COALESCE(raw_salary, ?17),
                raw_posting_start  = COALESCE(raw_posting_start, ?18),
                raw_posting_end    = COALESCE(raw_posting_end, ?19),
                raw_convocatoria   = COALESCE(raw_convocatoria, ?20),
                last_seen_at       = ?21
             WHERE posting_id = ?1",
            params![
                posting.posting_id,
                posting.institution,
                posting.job_title,
                posting.vacancies,
                posting.experience.as_option(),
                posting.academic_profile.as_option(),
                posting.specialization.as_option(),
                posting.knowledge.as_option(),
                posting.competencies.as_option(),
                posting.salary_amount,
                posting.posting_start_date.map(iso_date),
                posting.posting_end_date.map(iso_date),
                posting.contract_type.as_str(),
                verdict.as_str(),
                raw_or_null(&posting.provenance.institution_raw),
                raw_or_null(&posting.provenance.vacancies_text),
                raw_or_null(&posting.provenance.salary_text),
                raw_or_null(&posting.provenance.posting_start_text),
                raw_or_null(&posting.provenance.posting_end_text),
                raw_or_null(&posting.provenance.convocatoria_text),
                now_str,
            ],
        )?;
        tx.commit()?;
        Ok(UpsertOutcome::Updated)
    }

    /// Apply a reprocessed normalization to an existing row: fill
    /// previously-null typed columns and always refresh the verdict.
    /// Not an observation — seen timestamps stay untouched.
    pub fn apply_reprocess(
        &mut self,
        posting: &NormalizedPosting,
        verdict: QualityVerdict,
    ) -> Result<(), PipelineError> {
        self.conn.execute(
            "UPDATE postings SET
                vacancies          = COALESCE(vacancies, ?2),
                salary_amount      = COALESCE(salary_amount, ?3),
                posting_start_date = COALESCE(posting_start_date, ?4),
                posting_end_date   = COALESCE(posting_end_date, ?5),
                contract_type      = CASE WHEN contract_type = 'UNKNOWN'
                                          THEN ?6 ELSE contract_type END,
                institution        = COALESCE(institution, ?7),
                verdict            = ?8
             WHERE posting_id = ?1",
            params![
                posting.posting_id,
                posting.vacancies,
                posting.salary_amount,
                posting.posting_start_date.map(iso_date),
                posting.posting_end_date.map(iso_date),
                posting.contract_type.as_str(),
                posting.institution,
                verdict.as_str(),
            ],
        )?;
        Ok(())
    }

    /// All stored postings matching a verdict filter, ordered by
    /// posting_id for deterministic export.
    pub fn export(
        &self,
        filter: Option<QualityVerdict>,
    ) -> Result<Vec<StoredPosting>, PipelineError> {
        match filter {
            Some(v) => self.query_rows(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM postings \
                     WHERE verdict = ?1 ORDER BY posting_id"
                ),
                params![v.as_str()],
            ),
            None => self.query_rows(
                &format!("SELECT {SELECT_COLUMNS} FROM postings ORDER BY posting_id"),
                params![],
            ),
        }
    }

    /// Full scan for reprocessing, ordered by posting_id.
    pub fn scan(&self) -> Result<Vec<StoredPosting>, PipelineError> {
        self.export(None)
    }

    /// Total stored postings.
    pub fn count(&self) -> Result<u64, PipelineError> {
        let n: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM postings", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Histogram of stored verdict labels.
    pub fn verdict_counts(&self) -> Result<Vec<(String, u64)>, PipelineError> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(verdict, 'NONE'), COUNT(*) FROM postings \
             GROUP BY verdict ORDER BY 1",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query_rows(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredPosting>, PipelineError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                let verdict_label: Option<String> = row.get(13)?;
                Ok(StoredPosting {
                    posting_id: row.get(0)?,
                    institution: row.get(1)?,
                    job_title: row.get(2)?,
                    vacancies: row.get(3)?,
                    experience: row.get(4)?,
                    academic_profile: row.get(5)?,
                    specialization: row.get(6)?,
                    knowledge: row.get(7)?,
                    competencies: row.get(8)?,
                    salary_amount: row.get(9)?,
                    posting_start_date: row.get(10)?,
                    posting_end_date: row.get(11)?,
                    contract_type: ContractType::from_label(&row.get::<_, String>(12)?),
                    verdict: verdict_label.as_deref().and_then(QualityVerdict::from_label),
                    provenance: Provenance {
                        institution_raw: row.get::<_, Option<String>>(14)?.unwrap_or_default(),
                        vacancies_text: row.get::<_, Option<String>>(15)?.unwrap_or_default(),
                        salary_text: row.get::<_, Option<String>>(16)?.unwrap_or_default(),
                        posting_start_text: row.get::<_, Option<String>>(17)?.unwrap_or_default(),
                        posting_end_text: row.get::<_, Option<String>>(18)?.unwrap_or_default(),
                        convocatoria_text: row.get::<_, Option<String>>(19)?.unwrap_or_default(),
                    },
                    first_seen_at: row.get(20)?,
                    last_seen_at: row.get(21)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl StoredPosting {
    /// Rebuild a normalization candidate from the stored raw provenance,
    /// for the reprocess command.
    pub fn to_normalized(&self) -> NormalizedPosting {
        NormalizedPosting {
            posting_id: self.posting_id.clone(),
            institution: self.institution.clone(),
            job_title: self.job_title.clone(),
            vacancies: self.vacancies,
            experience: TextField::from_option(self.experience.clone()),
            academic_profile: TextField::from_option(self.academic_profile.clone()),
            specialization: TextField::from_option(self.specialization.clone()),
            knowledge: TextField::from_option(self.knowledge.clone()),
            competencies: TextField::from_option(self.competencies.clone()),
            salary_amount: self.salary_amount,
            posting_start_date: self.posting_start_date.as_deref().and_then(parse_iso_date),
            posting_end_date: self.posting_end_date.as_deref().and_then(parse_iso_date),
            contract_type: self.contract_type,
            provenance: self.provenance.clone(),
        }
    }
}

fn iso_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn raw_or_null(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(raw)
    }
}
