//! Run configuration and the static lookup tables.
//!
//! The institution-alias and contract-token tables are configuration, not
//! code: they are loaded once at startup (from `--config <file>` or the
//! embedded default) and passed immutably into the normalizer and the
//! quality gate. A missing or empty institution table is a fatal
//! configuration error caught before any network activity.

use crate::error::PipelineError;
use crate::normalize::contract::ContractType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Default configuration shipped with the binary.
const DEFAULT_CONFIG: &str = include_str!("../assets/default_config.json");

/// Full pipeline configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Listing-page URL template. `{page}` is replaced by the page index.
    pub listing_url: String,
    /// Navigation timeout per page load, in milliseconds.
    #[serde(default = "default_nav_timeout_ms")]
    pub nav_timeout_ms: u64,
    /// Maximum retry attempts for a failed page or detail fetch.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Base delay for exponential backoff, in milliseconds. Doubles per
    /// attempt. Zero makes retries immediate (used by tests).
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Consecutive failed listing pages tolerated before the walk aborts.
    #[serde(default = "default_empty_page_limit")]
    pub empty_page_limit: u32,
    /// Bounded concurrency for detail fetches within one listing page.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// Lookup tables used by the normalizer and the quality gate.
    pub tables: LookupTables,
}

fn default_nav_timeout_ms() -> u64 {
    30_000
}
fn default_retry_limit() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    500
}
fn default_empty_page_limit() -> u32 {
    2
}
fn default_fetch_concurrency() -> usize {
    4
}

/// The static lookup tables: institution aliases, known institutions,
/// contract-type tokens, and boilerplate sentinels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupTables {
    /// Alias → canonical display form. Keys are matched after trimming,
    /// whitespace-collapsing and uppercasing the raw value.
    pub institution_aliases: HashMap<String, String>,
    /// Canonical names of institutions known to the portal. Membership
    /// drives the FLAGGED_NONSTANDARD_FORMAT rule.
    pub known_institutions: HashSet<String>,
    /// Ordered contract-type token rules; first match wins.
    pub contract_tokens: Vec<ContractTokenRule>,
    /// Boilerplate patterns treated as "unspecified" in free-text fields,
    /// matched case-insensitively against the whole cleaned value.
    pub unspecified_sentinels: Vec<String>,
}

/// One contract-type token rule: a case-insensitive substring and the
/// contract type it maps to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractTokenRule {
    pub token: String,
    pub contract_type: ContractType,
}

impl PipelineConfig {
    /// Load configuration from a file, or the embedded default when no
    /// path is given. Validates the lookup tables before returning.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let raw = match path {
            Some(p) => std::fs::read_to_string(p).map_err(|e| {
                PipelineError::Config(format!("cannot read config file {}: {e}", p.display()))
            })?,
            None => DEFAULT_CONFIG.to_string(),
        };

        let config: PipelineConfig = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::Config(format!("invalid config JSON: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the loaded configuration. Fatal failures only.
    fn validate(&self) -> Result<(), PipelineError> {
        if self.tables.known_institutions.is_empty() {
            return Err(PipelineError::Config(
                "known-institution table is empty".into(),
            ));
        }
        if self.tables.contract_tokens.is_empty() {
            return Err(PipelineError::Config(
                "contract-token table is empty".into(),
            ));
        }
        if !self.listing_url.contains("{page}") {
            return Err(PipelineError::Config(
                "listing_url must contain a {page} placeholder".into(),
            ));
        }
        Ok(())
    }

    /// Build the listing URL for a given page index.
    pub fn listing_page_url(&self, page: u32) -> String {
        self.listing_url.replace("{page}", &page.to_string())
    }

    /// Backoff delay before retry `attempt` (1-based). Doubles per
    /// attempt, saturating so a large configured retry limit cannot
    /// overflow the factor.
    pub fn retry_delay_ms(&self, attempt: u32) -> u64 {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        self.retry_base_delay_ms.saturating_mul(factor)
    }
}

impl LookupTables {
    /// Resolve a collapsed, uppercased institution key to its canonical
    /// display form, if the alias table knows it.
    pub fn resolve_institution(&self, key: &str) -> Option<&str> {
        self.institution_aliases.get(key).map(String::as_str)
    }

    /// Whether a canonical institution name is in the known table.
    pub fn is_known_institution(&self, canonical: &str) -> bool {
        self.known_institutions.contains(canonical)
    }
}
