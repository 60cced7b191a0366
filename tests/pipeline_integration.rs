//! End-to-end pipeline tests against an in-memory renderer.
//!
//! The renderer serves canned listing and detail pages keyed by URL, so
//! the full walk → fetch → normalize → gate → upsert path runs without a
//! browser or network.

use anyhow::bail;
use async_trait::async_trait;
use convoca::config::PipelineConfig;
use convoca::normalize::contract::ContractType;
use convoca::pipeline;
use convoca::quality::QualityVerdict;
use convoca::renderer::{RenderContext, Renderer};
use convoca::store::Store;
use std::collections::HashMap;
use std::sync::Arc;

const PORTAL: &str = "https://portal.test/consultas/ofertas.xhtml?page={page}";

/// Serves a fixed URL → HTML map. Unknown URLs fail like a dead host.
struct StaticRenderer {
    pages: Arc<HashMap<String, String>>,
}

struct StaticContext {
    pages: Arc<HashMap<String, String>>,
    current: Option<String>,
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn new_context(&self) -> anyhow::Result<Box<dyn RenderContext>> {
        Ok(Box::new(StaticContext {
            pages: Arc::clone(&self.pages),
            current: None,
        }))
    }
    async fn shutdown(&self) -> anyhow::Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}

#[async_trait]
impl RenderContext for StaticContext {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> anyhow::Result<()> {
        match self.pages.get(url) {
            Some(html) => {
                self.current = Some(html.clone());
                Ok(())
            }
            None => bail!("connection refused: {url}"),
        }
    }
    async fn get_html(&self) -> anyhow::Result<String> {
        Ok(self.current.clone().unwrap_or_default())
    }
    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

fn listing_page(ids: &[&str]) -> String {
    let mut html = String::from("<html><body><div class='avisos'>");
    for id in ids {
        html.push_str(&format!(
            "<div class='aviso'><a href='https://portal.test/consultas/detalle?id={id}'>Ver m\u{e1}s</a></div>"
        ));
    }
    html.push_str("</div></body></html>");
    html
}

fn detail_page(title: &str, institution: &str, salary: &str, convocatoria: &str) -> String {
    format!(
        "<html><body>
          <span class=\"sp-aviso0\">{title}</span>
          <span class=\"sp-aviso\">{institution}</span>
          <div class=\"row\">
            <span class=\"sub-titulo\">CANTIDAD DE VACANTES:</span>
            <span class=\"detalle-sp\">2</span>
          </div>
          <div class=\"row\">
            <span class=\"sub-titulo\">REMUNERACI\u{d3}N:</span>
            <span class=\"detalle-sp\">{salary}</span>
          </div>
          <div class=\"row\">
            <span class=\"sub-titulo\">FECHA INICIO DE PUBLICACI\u{d3}N:</span>
            <span class=\"detalle-sp\">05/12/2025</span>
          </div>
          <div class=\"row\">
            <span class=\"sub-titulo\">FECHA FIN DE PUBLICACI\u{d3}N:</span>
            <span class=\"detalle-sp\">19/12/2025</span>
          </div>
          <div class=\"row\">
            <span class=\"sub-titulo\">N\u{da}MERO DE CONVOCATORIA:</span>
            <span class=\"detalle-sp\">{convocatoria}</span>
          </div>
          <div>
            <span class=\"sub-titulo-2\">EXPERIENCIA:</span>
            <span class=\"detalle-sp\">Dos a\u{f1}os en el sector p\u{fa}blico</span>
            <span class=\"sub-titulo-2\">FORMACI\u{d3}N ACAD\u{c9}MICA - PERFIL:</span>
            <span class=\"detalle-sp\">Titulado universitario</span>
          </div>
        </body></html>"
    )
}

fn detail_url(id: &str) -> String {
    format!("https://portal.test/consultas/detalle?id={id}")
}

fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::load(None).unwrap();
    config.listing_url = PORTAL.into();
    config.retry_base_delay_ms = 0;
    config.retry_limit = 1;
    config.empty_page_limit = 2;
    config.fetch_concurrency = 3;
    config
}

/// Two listing pages of five postings each, with posting 300 repeated on
/// both, followed by an empty page ending the walk.
fn portal_fixture() -> HashMap<String, String> {
    let mut pages = HashMap::new();
    pages.insert(
        PORTAL.replace("{page}", "0"),
        listing_page(&["100", "101", "102", "103", "300"]),
    );
    pages.insert(
        PORTAL.replace("{page}", "1"),
        listing_page(&["300", "201", "202", "203", "204"]),
    );
    pages.insert(PORTAL.replace("{page}", "2"), listing_page(&[]));

    for id in [
        "100", "101", "102", "103", "300", "201", "202", "203", "204",
    ] {
        pages.insert(
            detail_url(id),
            detail_page(
                "ANALISTA DE SISTEMAS",
                "MINEDU",
                "S/. 4,000.00",
                "CAS N\u{b0} 045-2025 D.LEG 1057",
            ),
        );
    }
    pages
}

#[tokio::test]
async fn test_two_pages_with_one_repeat_store_nine_records() {
    let renderer = StaticRenderer {
        pages: Arc::new(portal_fixture()),
    };
    let mut store = Store::open_in_memory().unwrap();
    let config = test_config();

    let stats = pipeline::collect(&renderer, &mut store, &config, 0)
        .await
        .unwrap();

    assert_eq!(stats.postings_seen, 10);
    assert_eq!(stats.postings_inserted, 9);
    assert_eq!(stats.postings_updated, 1);
    assert_eq!(stats.outcome.exit_code(), 0);
    assert_eq!(store.count().unwrap(), 9);

    // Everything in the fixture is complete and from a known institution.
    let accepted = store.export(Some(QualityVerdict::Accepted)).unwrap();
    assert_eq!(accepted.len(), 9);
    assert_eq!(accepted[0].institution.as_deref(), Some("MINISTERIO DE EDUCACION"));
    assert_eq!(accepted[0].contract_type, ContractType::Cas);
    assert_eq!(accepted[0].salary_amount, Some(4000.0));
    assert_eq!(accepted[0].vacancies, Some(2));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let renderer = StaticRenderer {
        pages: Arc::new(portal_fixture()),
    };
    let mut store = Store::open_in_memory().unwrap();
    let config = test_config();

    pipeline::collect(&renderer, &mut store, &config, 0)
        .await
        .unwrap();
    let first = store.export(None).unwrap();

    let stats = pipeline::collect(&renderer, &mut store, &config, 0)
        .await
        .unwrap();
    let second = store.export(None).unwrap();

    assert_eq!(stats.postings_inserted, 0);
    assert_eq!(stats.postings_updated, 10);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.posting_id, b.posting_id);
        assert_eq!(a.salary_amount, b.salary_amount);
        assert_eq!(a.first_seen_at, b.first_seen_at); // set once, never moved
    }
}

#[tokio::test]
async fn test_reobservation_fills_previously_missing_salary() {
    let config = test_config();
    let mut store = Store::open_in_memory().unwrap();

    // First run: posting 500's salary is free text and does not parse.
    let mut pages = HashMap::new();
    pages.insert(PORTAL.replace("{page}", "0"), listing_page(&["500"]));
    pages.insert(PORTAL.replace("{page}", "1"), listing_page(&[]));
    pages.insert(
        detail_url("500"),
        detail_page("ASESOR LEGAL", "MINSA", "A convenir", "CAS D.LEG 1057"),
    );
    let renderer = StaticRenderer {
        pages: Arc::new(pages),
    };
    pipeline::collect(&renderer, &mut store, &config, 0)
        .await
        .unwrap();

    let row = &store.export(None).unwrap()[0];
    assert_eq!(row.salary_amount, None);
    assert_eq!(row.verdict, Some(QualityVerdict::FlaggedIncompleteSalary));
    let first_seen = row.first_seen_at.clone();

    // Second run: the portal now shows a real amount.
    let mut pages = HashMap::new();
    pages.insert(PORTAL.replace("{page}", "0"), listing_page(&["500"]));
    pages.insert(PORTAL.replace("{page}", "1"), listing_page(&[]));
    pages.insert(
        detail_url("500"),
        detail_page("ASESOR LEGAL", "MINSA", "S/. 7,500.00", "CAS D.LEG 1057"),
    );
    let renderer = StaticRenderer {
        pages: Arc::new(pages),
    };
    pipeline::collect(&renderer, &mut store, &config, 0)
        .await
        .unwrap();

    let row = &store.export(None).unwrap()[0];
    assert_eq!(row.salary_amount, Some(7500.0));
    assert_eq!(row.verdict, Some(QualityVerdict::Accepted));
    assert_eq!(row.first_seen_at, first_seen);
}

#[tokio::test]
async fn test_failed_detail_fetch_degrades_to_partial() {
    let config = test_config();
    let mut store = Store::open_in_memory().unwrap();

    let mut pages = portal_fixture();
    pages.remove(&detail_url("202")); // this posting's host is now dead

    let renderer = StaticRenderer {
        pages: Arc::new(pages),
    };
    let stats = pipeline::collect(&renderer, &mut store, &config, 0)
        .await
        .unwrap();

    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.outcome.exit_code(), 2); // partial, not aborted
    assert_eq!(store.count().unwrap(), 8); // the rest committed
}

#[tokio::test]
async fn test_unreachable_portal_aborts_with_progress_kept() {
    let config = test_config();
    let mut store = Store::open_in_memory().unwrap();

    // Page 0 works; every later page is unreachable.
    let mut pages = HashMap::new();
    pages.insert(PORTAL.replace("{page}", "0"), listing_page(&["100"]));
    pages.insert(
        detail_url("100"),
        detail_page("ANALISTA", "MINEDU", "S/. 4,000.00", "CAS D.LEG 1057"),
    );
    let renderer = StaticRenderer {
        pages: Arc::new(pages),
    };

    let stats = pipeline::collect(&renderer, &mut store, &config, 0)
        .await
        .unwrap();

    assert_eq!(stats.outcome.exit_code(), 1); // walker budget exhausted
    assert_eq!(store.count().unwrap(), 1); // page 0's work was committed
    assert_eq!(stats.pages_failed, 2);
}
