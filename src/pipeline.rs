//! Orchestrator — drives one full collection run.
//!
//! Walk listing pages, fetch details with a bounded concurrent pool,
//! normalize, gate, upsert. Detail fetches within a page run
//! concurrently (read-only against the source); store writes are
//! serialized through the single connection. A failed posting is
//! counted and skipped, never fatal; only the walker's failure budget
//! ends a run early, with committed progress retained.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fetcher::DetailFetcher;
use crate::normalize::{self, RawPosting};
use crate::quality;
use crate::renderer::Renderer;
use crate::stats::RunStats;
use crate::store::{Store, StoredPosting, UpsertOutcome};
use crate::walker::{PageOutcome, PageWalker, PostingStub, WalkEnd};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

/// Run a full collection pass against the portal.
pub async fn collect(
    renderer: &dyn Renderer,
    store: &mut Store,
    config: &PipelineConfig,
    start_page: u32,
) -> Result<RunStats, PipelineError> {
    let mut stats = RunStats::start();
    let fetcher = DetailFetcher::new(renderer, config);
    let mut walker = PageWalker::new(renderer, config, start_page);

    while let Some(page) = walker.next_page().await {
        stats.pages_walked += 1;

        let stubs = match page.outcome {
            PageOutcome::Stubs(stubs) => stubs,
            PageOutcome::Failed => {
                stats.pages_failed += 1;
                continue;
            }
        };

        info!(page = page.index, postings = stubs.len(), "processing listing page");

        // Independent, read-only fetches: bounded concurrency per page.
        let fetched: Vec<(PostingStub, Result<RawPosting, PipelineError>)> =
            stream::iter(stubs)
                .map(|stub| {
                    let fetcher = &fetcher;
                    async move {
                        let result = fetcher.fetch(&stub).await;
                        (stub, result)
                    }
                })
                .buffer_unordered(config.fetch_concurrency)
                .collect()
                .await;

        // Writes are serialized: one upsert at a time, keyed by posting_id.
        for (stub, result) in fetched {
            stats.postings_seen += 1;
            let raw = match result {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(posting = %stub.id, "detail fetch failed: {e}");
                    stats.fetch_failures += 1;
                    continue;
                }
            };

            let (posting, misses) = normalize::normalize(&raw, &config.tables);
            for miss in misses {
                stats.record_miss(miss);
            }

            let verdict = quality::assess(&posting, &config.tables);
            stats.record_verdict(verdict);

            match store.upsert(&posting, verdict, Utc::now())? {
                UpsertOutcome::Inserted => stats.postings_inserted += 1,
                UpsertOutcome::Updated => stats.postings_updated += 1,
            }
        }
    }

    let aborted = walker.end() == Some(WalkEnd::BudgetExceeded);
    stats.finish(aborted);
    info!(outcome = ?stats.outcome, "collection run finished");
    Ok(stats)
}

/// Re-run normalization over the stored raw provenance, filling
/// previously-null values and recomputing every verdict. No network.
pub fn reprocess(store: &mut Store, config: &PipelineConfig) -> Result<RunStats, PipelineError> {
    let mut stats = RunStats::start();

    let rows = store.scan()?;
    info!(rows = rows.len(), "reprocessing stored postings");

    for row in rows {
        stats.postings_seen += 1;

        let (fresh, misses) = normalize::normalize(&raw_from_stored(&row), &config.tables);
        for miss in misses {
            stats.record_miss(miss);
        }

        // Merge view: existing parsed values win, fresh parses fill the
        // holes. Mirrors the store's fill-if-null merge.
        let mut candidate = row.to_normalized();
        if candidate.institution.is_none() {
            candidate.institution = fresh.institution;
        }
        if candidate.vacancies.is_none() {
            candidate.vacancies = fresh.vacancies;
        }
        if candidate.salary_amount.is_none() {
            candidate.salary_amount = fresh.salary_amount;
        }
        if candidate.posting_start_date.is_none() {
            candidate.posting_start_date = fresh.posting_start_date;
        }
        if candidate.posting_end_date.is_none() {
            candidate.posting_end_date = fresh.posting_end_date;
        }
        if candidate.contract_type == normalize::contract::ContractType::Unknown {
            candidate.contract_type = fresh.contract_type;
        }

        let verdict = quality::assess(&candidate, &config.tables);
        stats.record_verdict(verdict);
        store.apply_reprocess(&candidate, verdict)?;
        stats.postings_updated += 1;
    }

    stats.finish(false);
    Ok(stats)
}

/// Rebuild a RawPosting from a stored row: raw provenance for the
/// parse-bearing fields, already-cleaned text for the rest.
fn raw_from_stored(row: &StoredPosting) -> RawPosting {
    RawPosting {
        posting_id: row.posting_id.clone(),
        institution_raw: row.provenance.institution_raw.clone(),
        job_title: row.job_title.clone().unwrap_or_default(),
        vacancies_text: row.provenance.vacancies_text.clone(),
        experience_text: row.experience.clone().unwrap_or_default(),
        academic_profile_text: row.academic_profile.clone().unwrap_or_default(),
        specialization_text: row.specialization.clone().unwrap_or_default(),
        knowledge_text: row.knowledge.clone().unwrap_or_default(),
        competencies_text: row.competencies.clone().unwrap_or_default(),
        salary_text: row.provenance.salary_text.clone(),
        posting_start_text: row.provenance.posting_start_text.clone(),
        posting_end_text: row.provenance.posting_end_text.clone(),
        convocatoria_text: row.provenance.convocatoria_text.clone(),
        scrape_timestamp: None,
    }
}
