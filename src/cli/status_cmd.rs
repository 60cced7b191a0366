//! `convoca status` — stored-record count and verdict histogram.

use crate::store::Store;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(db_path: &PathBuf, json: bool) -> Result<i32> {
    let store = Store::open(db_path)?;
    let count = store.count()?;
    let verdicts = store.verdict_counts()?;

    if json {
        let histogram: serde_json::Map<String, serde_json::Value> = verdicts
            .into_iter()
            .map(|(label, n)| (label, serde_json::json!(n)))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "db": db_path.display().to_string(),
                "postings": count,
                "verdicts": histogram,
            }))?
        );
    } else {
        println!("store:    {}", db_path.display());
        println!("postings: {count}");
        for (label, n) in verdicts {
            println!("  {label:<32} {n}");
        }
    }

    Ok(0)
}
