//! `convoca collect` — run a full collection pass.

use crate::config::PipelineConfig;
use crate::pipeline;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::store::Store;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Run the collect command. Returns the process exit code.
pub async fn run(
    config_path: Option<&Path>,
    db_path: &PathBuf,
    start_page: u32,
    json: bool,
    quiet: bool,
) -> Result<i32> {
    // Configuration problems abort here, before any network activity.
    let config = PipelineConfig::load(config_path)?;
    let mut store = Store::open(db_path)?;

    let renderer = ChromiumRenderer::new()
        .await
        .context("failed to start the rendering collaborator")?;

    let stats = pipeline::collect(&renderer, &mut store, &config, start_page).await?;
    renderer.shutdown().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else if !quiet {
        println!("{}", stats.summary());
        println!("store now holds {} postings", store.count()?);
    }

    Ok(stats.outcome.exit_code())
}
