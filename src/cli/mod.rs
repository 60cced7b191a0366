//! CLI subcommand implementations for the convoca binary.

pub mod collect_cmd;
pub mod export_cmd;
pub mod reprocess_cmd;
pub mod status_cmd;

use std::path::PathBuf;

/// Default store location: ~/.convoca/postings.db.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".convoca")
        .join("postings.db")
}
