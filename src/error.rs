//! Pipeline failure taxonomy.
//!
//! Only `Config` errors and an exhausted page-walker budget abort a run.
//! Everything else degrades to a flagged or partial record and is surfaced
//! through run statistics rather than dropped.

use thiserror::Error;

/// A failure inside the collection pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network or navigation failure. Retried with bounded backoff.
    #[error("transport failure for {url}: {message}")]
    Transport { url: String, message: String },

    /// The rendering collaborator returned a blank or malformed document.
    /// Retried like a transport failure; individual absent fields come
    /// back as empty strings instead.
    #[error("rendering failure for {url}: {message}")]
    Rendering { url: String, message: String },

    /// A field did not match its expected format. Recorded per field,
    /// value set to null/unspecified, never run-fatal.
    #[error("parse failure in {field}: {reason}")]
    Parse { field: &'static str, reason: String },

    /// Missing or invalid configuration. Aborts before any network activity.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage-layer failure. Duplicate primary keys are not errors — they
    /// take the update path in `Store::upsert`.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl PipelineError {
    pub fn transport(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn rendering(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Rendering {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// True for transient failures worth another attempt: the transport
    /// layer and a blank render both are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Rendering { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_and_rendering_are_retryable() {
        let e = PipelineError::transport("https://example.com", "timeout");
        assert!(e.is_retryable());
        let e = PipelineError::rendering("https://example.com", "blank rendered document");
        assert!(e.is_retryable());
    }

    #[test]
    fn test_parse_is_not_retryable() {
        let e = PipelineError::Parse {
            field: "salary",
            reason: "no numeric token".into(),
        };
        assert!(!e.is_retryable());
        assert!(e.to_string().contains("salary"));
    }
}
