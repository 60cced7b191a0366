//! DetailFetcher — one posting's raw fields from its rendered detail page.
//!
//! The portal lays out a detail page as labeled rows: a `sub-titulo`
//! label with its value in a `detalle-sp` element inside the same row
//! (summary fields), and `sub-titulo-2` labels followed by a
//! `detalle-sp` sibling (requirement fields). Absent fields come back as
//! empty strings; only transport/navigation errors fail the fetch.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::normalize::RawPosting;
use crate::renderer::Renderer;
use crate::walker::PostingStub;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;

// Portal labels for the summary rows.
const LABEL_VACANCIES: &str = "CANTIDAD DE VACANTES";
const LABEL_SALARY: &str = "REMUNERACI";
const LABEL_START: &str = "FECHA INICIO DE";
const LABEL_END: &str = "FECHA FIN DE";
const LABEL_CONVOCATORIA: &str = "MERO DE CONVOCATORIA";

// Portal labels for the requirement rows.
const LABEL_EXPERIENCE: &str = "EXPERIENCIA";
const LABEL_ACADEMIC: &str = "FORMACI";
const LABEL_SPECIALIZATION: &str = "ESPECIALIZACI";
const LABEL_KNOWLEDGE: &str = "CONOCIMIENTO";
const LABEL_COMPETENCIES: &str = "COMPETENCIAS";

/// Fetches and field-extracts posting detail pages.
pub struct DetailFetcher<'a> {
    renderer: &'a dyn Renderer,
    config: &'a PipelineConfig,
}

impl<'a> DetailFetcher<'a> {
    pub fn new(renderer: &'a dyn Renderer, config: &'a PipelineConfig) -> Self {
        Self { renderer, config }
    }

    /// Fetch one posting. Transport failures and blank renders are
    /// retried with the same bounded backoff as the walker; a posting
    /// that exhausts its retries is skipped by the orchestrator, never
    /// aborts the run.
    pub async fn fetch(&self, stub: &PostingStub) -> Result<RawPosting, PipelineError> {
        let mut attempt = 0u32;
        let html = loop {
            match self.fetch_once(&stub.link).await {
                Ok(html) => break html,
                Err(e) => {
                    attempt += 1;
                    if !e.is_retryable() || attempt > self.config.retry_limit {
                        return Err(e);
                    }
                    let delay = self.config.retry_delay_ms(attempt);
                    debug!(url = %stub.link, attempt, delay_ms = delay, "retrying detail fetch");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        };

        let mut raw = extract_fields(&html);
        raw.posting_id = stub.id.clone();
        raw.scrape_timestamp = Some(Utc::now());
        Ok(raw)
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
            // A blank document is a renderer glitch, not a posting with
            // every field absent.
            return Err(PipelineError::rendering(url, "blank rendered document"));
        }
        Ok(html)
    }
}

/// Extract all raw posting fields from rendered detail-page HTML.
/// Missing fields become empty strings; this function never fails.
pub fn extract_fields(html: &str) -> RawPosting {
    let document = Html::parse_document(html);

    RawPosting {
        posting_id: String::new(),
        institution_raw: first_text(&document, "span.sp-aviso"),
        job_title: first_text(&document, "span.sp-aviso0"),
        vacancies_text: simple_field(&document, LABEL_VACANCIES),
        experience_text: requirement_field(&document, LABEL_EXPERIENCE),
        academic_profile_text: requirement_field(&document, LABEL_ACADEMIC),
        specialization_text: requirement_field(&document, LABEL_SPECIALIZATION),
        knowledge_text: requirement_field(&document, LABEL_KNOWLEDGE),
        competencies_text: requirement_field(&document, LABEL_COMPETENCIES),
        salary_text: simple_field(&document, LABEL_SALARY),
        posting_start_text: simple_field(&document, LABEL_START),
        posting_end_text: simple_field(&document, LABEL_END),
        convocatoria_text: simple_field(&document, LABEL_CONVOCATORIA),
        scrape_timestamp: None,
    }
}

fn first_text(document: &Html, selector: &str) -> String {
    let sel = Selector::parse(selector).expect("static selector");
    document
        .select(&sel)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default()
}

/// A summary field: `sub-titulo` label, value in the `detalle-sp` of the
/// enclosing row (or the row right after it).
fn simple_field(document: &Html, label: &str) -> String {
    let labels = Selector::parse(".sub-titulo").expect("static selector");
    let value = Selector::parse(".detalle-sp").expect("static selector");

    for el in document.select(&labels) {
        if !element_text(&el).to_uppercase().contains(label) {
            continue;
        }
        let Some(row) = enclosing_row(&el) else {
            continue;
        };
        if let Some(detalle) = row.select(&value).next() {
            return element_text(&detalle);
        }
        // Some rows put the value in the sibling row below the label.
        if let Some(next_row) = next_element_sibling(&row) {
            if let Some(detalle) = next_row.select(&value).next() {
                return element_text(&detalle);
            }
        }
    }

    String::new()
}

/// A requirement field: `sub-titulo-2` label, value in the next
/// `detalle-sp` sibling.
fn requirement_field(document: &Html, label: &str) -> String {
    let labels = Selector::parse(".sub-titulo-2").expect("static selector");

    for el in document.select(&labels) {
        if !element_text(&el).to_uppercase().contains(label) {
            continue;
        }
        let mut sibling = next_element_sibling(&el);
        while let Some(s) = sibling {
            if has_class(&s, "detalle-sp") {
                return element_text(&s);
            }
            sibling = next_element_sibling(&s);
        }
    }

    String::new()
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn enclosing_row<'b>(el: &ElementRef<'b>) -> Option<ElementRef<'b>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| has_class(a, "row"))
}

fn next_element_sibling<'b>(el: &ElementRef<'b>) -> Option<ElementRef<'b>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A detail page shaped like the portal's rendered output.
    fn detail_html() -> String {
        r#"<html><body>
          <span class="sp-aviso0">ANALISTA DE SISTEMAS</span>
          <span class="sp-aviso">MINEDU</span>
          <div class="row">
            <span class="sub-titulo">CANTIDAD DE VACANTES:</span>
            <span class="detalle-sp">2</span>
          </div>
          <div class="row">
            <span class="sub-titulo">REMUNERACIÓN:</span>
            <span class="detalle-sp">S/. 4,000.00</span>
          </div>
          <div class="row">
            <span class="sub-titulo">FECHA INICIO DE PUBLICACIÓN:</span>
            <span class="detalle-sp">05/12/2025</span>
          </div>
          <div class="row">
            <span class="sub-titulo">FECHA FIN DE PUBLICACIÓN:</span>
          </div>
          <div class="row">
            <span class="detalle-sp">19/12/2025</span>
          </div>
          <div class="row">
            <span class="sub-titulo">NÚMERO DE CONVOCATORIA:</span>
            <span class="detalle-sp">CAS N° 045-2025 D.LEG 1057</span>
          </div>
          <div>
            <span class="sub-titulo-2">EXPERIENCIA:</span>
            <span class="otro">decoración</span>
            <span class="detalle-sp">Dos años en el sector público</span>
            <span class="sub-titulo-2">FORMACIÓN ACADÉMICA - PERFIL:</span>
            <span class="detalle-sp">Titulado en Ingeniería</span>
            <span class="sub-titulo-2">CONOCIMIENTO:</span>
            <span class="detalle-sp">SQL, Python</span>
          </div>
        </body></html>"#
            .to_string()
    }

    #[test]
    fn test_extract_summary_fields() {
        let raw = extract_fields(&detail_html());
        assert_eq!(raw.job_title, "ANALISTA DE SISTEMAS");
        assert_eq!(raw.institution_raw, "MINEDU");
        assert_eq!(raw.vacancies_text, "2");
        assert_eq!(raw.salary_text, "S/. 4,000.00");
        assert_eq!(raw.posting_start_text, "05/12/2025");
        assert_eq!(raw.convocatoria_text, "CAS N° 045-2025 D.LEG 1057");
    }

    #[test]
    fn test_extract_value_from_following_row() {
        // The end date's value sits in the row after its label.
        let raw = extract_fields(&detail_html());
        assert_eq!(raw.posting_end_text, "19/12/2025");
    }

    #[test]
    fn test_extract_requirement_fields_skip_decoration_siblings() {
        let raw = extract_fields(&detail_html());
        assert_eq!(raw.experience_text, "Dos años en el sector público");
        assert_eq!(raw.academic_profile_text, "Titulado en Ingeniería");
        assert_eq!(raw.knowledge_text, "SQL, Python");
    }

    #[test]
    fn test_absent_fields_are_empty_strings_not_errors() {
        let raw = extract_fields(&detail_html());
        assert_eq!(raw.specialization_text, "");
        assert_eq!(raw.competencies_text, "");
    }

    #[test]
    fn test_partially_rendered_page_degrades_gracefully() {
        let raw = extract_fields("<html><body><p>cargando…</p></body></html>");
        assert_eq!(raw.job_title, "");
        assert_eq!(raw.salary_text, "");
    }

    /// Renders every navigation as a blank document.
    struct BlankRenderer;
    struct BlankContext;

    #[async_trait::async_trait]
    impl crate::renderer::Renderer for BlankRenderer {
        async fn new_context(&self) -> anyhow::Result<Box<dyn crate::renderer::RenderContext>> {
            Ok(Box::new(BlankContext))
        }
        async fn shutdown(&self) -> anyhow::Result<()> {
            Ok(())
        }
        fn active_contexts(&self) -> usize {
            0
        }
    }

    #[async_trait::async_trait]
    impl crate::renderer::RenderContext for BlankContext {
        async fn navigate(&mut self, _url: &str, _timeout_ms: u64) -> anyhow::Result<()> {
            Ok(())
        }
        async fn get_html(&self) -> anyhow::Result<String> {
            Ok(String::new())
        }
        async fn close(self: Box<Self>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_blank_detail_page_is_rendering_failure() {
        let mut config = PipelineConfig::load(None).unwrap();
        config.retry_base_delay_ms = 0;
        config.retry_limit = 1;

        let renderer = BlankRenderer;
        let fetcher = DetailFetcher::new(&renderer, &config);
        let stub = PostingStub {
            id: "900".into(),
            link: "https://portal.test/consultas/detalle?id=900".into(),
        };

        let err = fetcher.fetch(&stub).await.unwrap_err();
        assert!(matches!(err, PipelineError::Rendering { .. }));
    }
}
