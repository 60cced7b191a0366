//! Rendering-collaborator abstraction.
//!
//! The SERVIR portal is a JSF application: listing and detail pages only
//! exist after client-side script execution, so the pipeline consumes a
//! browser through the `Renderer` / `RenderContext` traits and treats it
//! as a black box that returns rendered content or a transport error.
//! Tests substitute an in-memory implementation.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab).
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout, waiting for the page to settle.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()>;
    /// Get the rendered page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}
