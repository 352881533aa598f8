//! Error types for plan export.
//!
//! Every variant is attributable to a pipeline [`Stage`] so failures can be
//! reported per stage (fingerprint, cache, render, serialize, convert, watermark).

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Payload validation before any generation work
    Input,
    /// Content fingerprint / storage path construction
    Fingerprint,
    /// Cache store access
    Cache,
    /// Plan payload to document model
    Render,
    /// Document model to DOCX / PDF bytes
    Serialize,
    /// DOCX to PDF conversion
    Convert,
    /// Preview watermark overlay
    Watermark,
}

impl Stage {
    /// Short lowercase name used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Fingerprint => "fingerprint",
            Stage::Cache => "cache",
            Stage::Render => "render",
            Stage::Serialize => "serialize",
            Stage::Convert => "convert",
            Stage::Watermark => "watermark",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types that can occur while exporting a plan.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Plan payload is missing structurally required fields
    #[error("Malformed plan payload: {0}")]
    MalformedInput(String),

    /// No usable converter (binary missing, remote not configured or compiled out)
    #[error("Converter unavailable ({converter}): {reason}")]
    ConverterUnavailable {
        /// Converter that was attempted
        converter: &'static str,
        /// Why it could not be used
        reason: String,
    },

    /// Converter ran but did not produce a document
    #[error("Conversion failed ({converter}){}: {context}", status_suffix(.status))]
    ConversionFailed {
        /// Converter that failed
        converter: &'static str,
        /// HTTP status or process exit code, when one exists
        status: Option<i32>,
        /// Failure context (timeout, stderr excerpt, empty body, ...)
        context: String,
    },

    /// Generated artifact could not be written to the cache
    #[error("Cache persist failed for {path}: {reason}")]
    CachePersistFailed {
        /// Storage path that was being written
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// Cache read / existence check failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Canonical encoding of the payload failed
    #[error("Fingerprint error: {0}")]
    Fingerprint(String),

    /// Document model could not be built
    #[error("Render error: {0}")]
    Render(String),

    /// DOCX / PDF serialization failed
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Watermark overlay failed (unparseable or unsupported PDF)
    #[error("Watermark error: {0}")]
    Watermark(String),

    /// A stage produced bytes that are not a valid artifact
    #[error("Invalid {stage} output: {reason}")]
    InvalidArtifact {
        /// Stage that produced the bytes
        stage: Stage,
        /// What was wrong with them
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn status_suffix(status: &Option<i32>) -> String {
    status
        .map(|s| format!(" with status {}", s))
        .unwrap_or_default()
}

impl Error {
    /// Stage the error is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            Error::MalformedInput(_) | Error::Json(_) => Stage::Input,
            Error::ConverterUnavailable { .. } | Error::ConversionFailed { .. } => Stage::Convert,
            Error::CachePersistFailed { .. } | Error::Cache(_) => Stage::Cache,
            Error::Fingerprint(_) => Stage::Fingerprint,
            Error::Render(_) => Stage::Render,
            Error::Serialize(_) | Error::Io(_) => Stage::Serialize,
            Error::Watermark(_) => Stage::Watermark,
            Error::InvalidArtifact { stage, .. } => *stage,
        }
    }

    /// Whether the caller sent a bad request (as opposed to a server-side failure).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::MalformedInput(_) | Error::Json(_))
    }

    /// Whether the error means export is temporarily unavailable rather than broken.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::ConverterUnavailable { .. })
    }

    pub(crate) fn serialize(err: impl std::fmt::Display) -> Self {
        Error::Serialize(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_failed_message_with_status() {
        let err = Error::ConversionFailed {
            converter: "remote",
            status: Some(502),
            context: "bad gateway".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("remote"));
        assert!(msg.contains("502"));
        assert!(msg.contains("bad gateway"));
    }

    #[test]
    fn test_conversion_failed_message_without_status() {
        let err = Error::ConversionFailed {
            converter: "local",
            status: None,
            context: "timed out after 45s".to_string(),
        };
        let msg = format!("{}", err);
        assert!(!msg.contains("status"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn test_stage_attribution() {
        assert_eq!(Error::MalformedInput("x".into()).stage(), Stage::Input);
        assert_eq!(
            Error::ConverterUnavailable {
                converter: "local",
                reason: "missing".into()
            }
            .stage(),
            Stage::Convert
        );
        assert_eq!(Error::Watermark("x".into()).stage(), Stage::Watermark);
        assert_eq!(
            Error::InvalidArtifact {
                stage: Stage::Convert,
                reason: "empty".into()
            }
            .stage(),
            Stage::Convert
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::MalformedInput("no plan id".into()).is_client_error());
        assert!(!Error::Render("x".into()).is_client_error());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
