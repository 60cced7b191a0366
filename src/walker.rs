//! PageWalker — lazy iteration over listing pages.
//!
//! Pages are requested by increasing index through the page-indexed
//! listing URL, so a walk is restartable from any index and the same
//! index always yields the same page of stubs, absent upstream changes.
//! A page fetch failure is retried with bounded exponential backoff; a
//! page that exhausts its retries is reported as failed and the walk
//! moves on. The walk ends at the first page with zero stubs, or when
//! consecutive failed pages reach the configured bound.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::renderer::Renderer;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A posting summary stub from a listing page: id plus detail link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingStub {
    pub id: String,
    pub link: String,
}

/// One walked listing page.
#[derive(Debug, Clone)]
pub struct WalkedPage {
    pub index: u32,
    pub outcome: PageOutcome,
}

/// What a listing page yielded.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Stubs(Vec<PostingStub>),
    /// Retries exhausted for this page; the walk continues.
    Failed,
}

/// How the walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    /// A page yielded zero stubs — the listing is exhausted.
    Exhausted,
    /// Consecutive dead pages reached the configured bound.
    BudgetExceeded,
}

/// Lazy walker over listing pages.
pub struct PageWalker<'a> {
    renderer: &'a dyn Renderer,
    config: &'a PipelineConfig,
    next_index: u32,
    consecutive_failed: u32,
    end: Option<WalkEnd>,
}

impl<'a> PageWalker<'a> {
    pub fn new(renderer: &'a dyn Renderer, config: &'a PipelineConfig, start_page: u32) -> Self {
        Self {
            renderer,
            config,
            next_index: start_page,
            consecutive_failed: 0,
            end: None,
        }
    }

    /// Why the walk stopped. None while pages remain.
    pub fn end(&self) -> Option<WalkEnd> {
        self.end
    }

    /// Fetch and parse the next listing page. Returns None once the walk
    /// has ended; `end()` then says why.
    pub async fn next_page(&mut self) -> Option<WalkedPage> {
        if self.end.is_some() {
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;
        let url = self.config.listing_page_url(index);

        match self.fetch_with_retry(&url).await {
            Some(html) => {
                let stubs = parse_listing(&html, &url);
                if stubs.is_empty() {
                    debug!(page = index, "listing page empty, walk exhausted");
                    self.end = Some(WalkEnd::Exhausted);
                    return None;
                }
                self.consecutive_failed = 0;
                Some(WalkedPage {
                    index,
                    outcome: PageOutcome::Stubs(stubs),
                })
            }
            None => {
                self.consecutive_failed += 1;
                if self.consecutive_failed >= self.config.empty_page_limit {
                    warn!(
                        page = index,
                        limit = self.config.empty_page_limit,
                        "consecutive page failures exceeded budget, ending walk"
                    );
                    self.end = Some(WalkEnd::BudgetExceeded);
                }
                Some(WalkedPage {
                    index,
                    outcome: PageOutcome::Failed,
                })
            }
        }
    }

    /// Explicit bounded retry loop with exponential backoff. The base
    /// delay comes from config so tests can run with zero delay.
    async fn fetch_with_retry(&self, url: &str) -> Option<String> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_once(url).await {
                Ok(html) => return Some(html),
                Err(e) => {
                    attempt += 1;
                    if !e.is_retryable() || attempt > self.config.retry_limit {
                        warn!(url, attempts = attempt, "page fetch failed: {e}");
                        return None;
                    }
                    let delay = self.config.retry_delay_ms(attempt);
                    debug!(url, attempt, delay_ms = delay, "retrying page fetch");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, PipelineError> {
        let mut ctx = self
            .renderer
            .new_context()
            .await
            .map_err(|e| PipelineError::transport(url, format!("{e:#}")))?;
        let result = async {
            ctx.navigate(url, self.config.nav_timeout_ms).await?;
            ctx.get_html().await
        }
        .await;
        let _ = ctx.close().await;

        let html = result.map_err(|e| PipelineError::transport(url, format!("{e:#}")))?;
        if html.trim().is_empty() {
            // A blank document means the renderer glitched; an exhausted
            // listing still renders page chrome with zero stubs.
            return Err(PipelineError::rendering(url, "blank rendered document"));
        }
        Ok(html)
    }
}

/// Extract posting stubs from rendered listing HTML.
///
/// The portal links each posting through an anchor whose href goes to
/// the detail view. Relative links are resolved against the listing URL;
/// the posting id is the detail link's `id` query parameter or, failing
/// that, its last path segment. Duplicate ids within one page collapse.
pub fn parse_listing(html: &str, base_url: &str) -> Vec<PostingStub> {
    let document = Html::parse_document(html);
    let anchor = Selector::parse(r#"a[href*="detalle"]"#).expect("static selector");

    let base = Url::parse(base_url).ok();
    let mut stubs: Vec<PostingStub> = Vec::new();

    for el in document.select(&anchor) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let link = match &base {
            Some(b) => match b.join(href) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            },
            None => href.to_string(),
        };
        let Some(id) = stub_id(&link) else {
            continue;
        };
        if stubs.iter().all(|s| s.id != id) {
            stubs.push(PostingStub { id, link });
        }
    }

    stubs
}

fn stub_id(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    if let Some((_, id)) = url.query_pairs().find(|(k, _)| k == "id") {
        if !id.is_empty() {
            return Some(id.into_owned());
        }
    }
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()
        .filter(|s| *s != "detalle")
        .map(str::to_string)
}
