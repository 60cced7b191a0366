//! `convoca reprocess` — normalize-only pass over stored raw fields.
//!
//! No network. Re-runs the parsers against the stored raw provenance,
//! fills previously-null values, and recomputes every verdict under the
//! current rule tables.

use crate::config::PipelineConfig;
use crate::pipeline;
use crate::store::Store;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Run the reprocess command. Returns the process exit code.
pub fn run(config_path: Option<&Path>, db_path: &PathBuf, json: bool, quiet: bool) -> Result<i32> {
    let config = PipelineConfig::load(config_path)?;
    let mut store = Store::open(db_path)?;

    let stats = pipeline::reprocess(&mut store, &config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else if !quiet {
        println!("{}", stats.summary());
    }

    Ok(stats.outcome.exit_code())
}
