//! Artifact kinds and the response handed back to callers.

use crate::fingerprint::ContentFingerprint;
use bytes::Bytes;

/// Content type of word-processing artifacts.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Content type of fixed-layout artifacts.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Format the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Editable word-processing document
    Word,
    /// Fixed-layout document
    Pdf,
}

impl std::str::FromStr for ExportFormat {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docx" | "word" => Ok(ExportFormat::Word),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(crate::error::Error::MalformedInput(format!(
                "unknown export format: {}",
                other
            ))),
        }
    }
}

/// Concrete artifact variant. Each kind has its own cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// DOCX
    WordDocument,
    /// Unwatermarked PDF
    FixedLayoutClean,
    /// Watermarked PDF
    FixedLayoutPreview,
}

impl ArtifactKind {
    /// The only kind a caller may receive for a requested format.
    ///
    /// Callers without entitlement always get the preview, whatever they asked for.
    pub fn permitted(format: ExportFormat, entitled: bool) -> Self {
        match (format, entitled) {
            (_, false) => ArtifactKind::FixedLayoutPreview,
            (ExportFormat::Word, true) => ArtifactKind::WordDocument,
            (ExportFormat::Pdf, true) => ArtifactKind::FixedLayoutClean,
        }
    }

    /// MIME type.
    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::WordDocument => DOCX_CONTENT_TYPE,
            ArtifactKind::FixedLayoutClean | ArtifactKind::FixedLayoutPreview => PDF_CONTENT_TYPE,
        }
    }

    /// File name of the entry inside its cache directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::WordDocument => "plan.docx",
            ArtifactKind::FixedLayoutClean => "plan.pdf",
            ArtifactKind::FixedLayoutPreview => "plan-preview.pdf",
        }
    }

    /// Download file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::WordDocument => "docx",
            _ => "pdf",
        }
    }

    /// Whether the artifact carries the preview watermark.
    pub fn is_preview(&self) -> bool {
        matches!(self, ArtifactKind::FixedLayoutPreview)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArtifactKind::WordDocument => "word-document",
            ArtifactKind::FixedLayoutClean => "fixed-layout-clean",
            ArtifactKind::FixedLayoutPreview => "fixed-layout-preview",
        };
        f.write_str(name)
    }
}

/// Where the returned bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the cache store
    Hit,
    /// Generated by this request
    Miss,
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Variant that was produced
    pub kind: ArtifactKind,
    /// Document bytes (never empty)
    pub bytes: Bytes,
    /// Sanitized download file name
    pub file_name: String,
    /// Fingerprint the artifact is cached under
    pub fingerprint: ContentFingerprint,
    /// Hit or miss
    pub cache_status: CacheStatus,
}

impl Artifact {
    /// MIME type of the bytes.
    pub fn content_type(&self) -> &'static str {
        self.kind.content_type()
    }

    /// HTTP response headers for serving the artifact.
    pub fn response_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", self.content_type().to_string()),
            (
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.file_name),
            ),
            ("Content-Length", self.bytes.len().to_string()),
            ("Cache-Control", "no-store, max-age=0".to_string()),
            ("Pragma", "no-cache".to_string()),
        ]
    }
}

/// Build a download file name that is safe in a `Content-Disposition` header.
///
/// Keeps ASCII letters and digits, folds common Latin accents, and collapses
/// everything else into single hyphens.
pub fn sanitize_file_name(business_name: &str, kind: ArtifactKind) -> String {
    let mut stem = String::new();
    for c in business_name.chars() {
        let c = crate::document::fold_char(c);
        if c.is_ascii_alphanumeric() {
            stem.push(c);
        } else if !stem.ends_with('-') && !stem.is_empty() {
            stem.push('-');
        }
    }
    let stem = stem.trim_matches('-');
    let stem: String = stem.chars().take(60).collect();
    let stem = stem.trim_end_matches('-');

    let suffix = if kind.is_preview() { "-preview" } else { "" };
    if stem.is_empty() {
        format!("haccp-plan{}.{}", suffix, kind.extension())
    } else {
        format!("haccp-plan-{}{}.{}", stem, suffix, kind.extension())
    }
}
