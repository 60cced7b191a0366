//! `convoca export` — flat CSV extract, filterable by verdict.

use crate::export;
use crate::quality::QualityVerdict;
use crate::store::Store;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Run the export command. `verdict` filters rows ("ACCEPTED", ...);
/// `out` of "-" writes to stdout.
pub fn run(db_path: &PathBuf, verdict: Option<&str>, out: &str, quiet: bool) -> Result<i32> {
    let filter = match verdict {
        Some(label) => match QualityVerdict::from_label(&label.to_uppercase()) {
            Some(v) => Some(v),
            None => bail!(
                "unknown verdict '{label}' (expected one of: {})",
                QualityVerdict::all().map(|v| v.as_str()).join(", ")
            ),
        },
        None => None,
    };

    let store = Store::open(db_path)?;
    let rows = store.export(filter)?;
    let csv = export::to_csv(&rows);

    if out == "-" {
        print!("{csv}");
    } else {
        std::fs::write(out, csv)?;
        if !quiet {
            eprintln!("wrote {} rows to {out}", rows.len());
        }
    }

    Ok(0)
}
