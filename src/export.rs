//! Artifact orchestration.
//!
//! ```text
//! request ──→ fingerprint ──→ cache lookup ──hit──→ artifact
//!                                  │
//!                                 miss
//!                                  ↓
//!          render ──→ DOCX ──→ convert ──→ [watermark] ──→ persist ──→ artifact
//!                        └──(conversion failed)──→ direct PDF ──┘
//! ```
//!
//! Entitlement decides the artifact kind before anything else happens:
//! callers without it can only ever receive the watermarked preview, and a
//! cached preview is only served if it still carries the watermark.
//!
//! Fingerprints: the DOCX and the clean PDF share the payload hash; the
//! preview hash additionally covers [`WatermarkConfig::stage_marker`], the
//! overlay version plus every appearance setting. The DOCX written
//! by a paid export is therefore reused by later PDF exports of the same
//! payload, and previews reuse it too without ever writing it.

use crate::artifact::{
    sanitize_file_name, Artifact, ArtifactKind, CacheStatus, ExportFormat, DOCX_CONTENT_TYPE,
};
use crate::cache::{CacheStore, CachedBlob};
use crate::config::ExportConfig;
use crate::convert::{ConversionPipeline, DocumentConverter};
use crate::document::{clean_field, render, DocumentModel};
use crate::error::{Error, Result, Stage};
use crate::fingerprint::{fingerprint, ContentFingerprint, StoragePath};
use crate::plan::PlanPayload;
use crate::theme::{resolve_theme, ThemeDescriptor};
use crate::watermark::{apply_watermark, is_watermarked};
use crate::writer::{DocumentSerializer, DocxWriter, PdfWriter};
use bytes::Bytes;
use std::borrow::Cow;
use std::sync::Arc;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const PDF_MAGIC: &[u8] = b"%PDF-";

/// One export request.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Plan to export
    pub payload: PlanPayload,
    /// Requested format (downgraded to the preview without entitlement)
    pub format: ExportFormat,
}

impl ExportRequest {
    /// Create a request.
    pub fn new(payload: PlanPayload, format: ExportFormat) -> Self {
        Self { payload, format }
    }

    /// Artifact kind the caller is allowed to receive.
    pub fn permitted_kind(&self) -> ArtifactKind {
        ArtifactKind::permitted(self.format, self.payload.entitled)
    }
}

/// Turns export requests into artifacts, through the cache.
///
/// Stateless between requests and shareable across threads. Two concurrent
/// misses for the same fingerprint both generate; the second write is a
/// no-op because generation is deterministic.
pub struct ArtifactExporter {
    config: ExportConfig,
    cache: Arc<dyn CacheStore>,
    converter: Box<dyn DocumentConverter>,
    docx: Box<dyn DocumentSerializer>,
    pdf: Box<dyn DocumentSerializer>,
}

impl std::fmt::Debug for ArtifactExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactExporter")
            .field("config", &self.config)
            .field("converter", &self.converter.name())
            .finish()
    }
}

/// Per-request state; the model is rendered at most once and only if needed.
struct Job<'a> {
    payload: &'a PlanPayload,
    theme: &'static ThemeDescriptor,
    model: Option<DocumentModel>,
}

impl<'a> Job<'a> {
    fn model(&mut self) -> Result<&DocumentModel> {
        if self.model.is_none() {
            self.model = Some(render(self.payload, self.theme)?);
        }
        self.model
            .as_ref()
            .ok_or_else(|| Error::Render("document model unavailable".to_string()))
    }
}

impl ArtifactExporter {
    /// Exporter over injected cache and converter.
    pub fn new(
        config: ExportConfig,
        cache: Arc<dyn CacheStore>,
        converter: Box<dyn DocumentConverter>,
    ) -> Self {
        Self {
            config,
            cache,
            converter,
            docx: Box::new(DocxWriter::new()),
            pdf: Box::new(PdfWriter::new()),
        }
    }

    /// Exporter whose converter chain is built from `config`.
    pub fn from_config(config: ExportConfig, cache: Arc<dyn CacheStore>) -> Self {
        let converter = Box::new(ConversionPipeline::from_config(&config));
        Self::new(config, cache, converter)
    }

    /// Active configuration.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export one plan.
    pub fn export(&self, request: &ExportRequest) -> Result<Artifact> {
        request.payload.validate()?;
        let kind = request.permitted_kind();
        if kind.is_preview() {
            self.config.watermark.validate()?;
            log::info!(
                "Plan {} not entitled, serving preview for {:?} request",
                request.payload.plan_id,
                request.format
            );
        }

        let payload = self.effective_payload(&request.payload);
        let theme = resolve_theme(payload.template_id.as_deref());
        let base_hash = fingerprint(&payload, theme.name, &[])?;
        let hash = if kind.is_preview() {
            let marker = self.config.watermark.stage_marker();
            fingerprint(&payload, theme.name, &[marker.as_str()])?
        } else {
            base_hash.clone()
        };
        let path = StoragePath::build(&payload.plan_id, theme.name, &hash, kind);

        if let Some(bytes) = self.lookup(&path, kind) {
            log::info!("Cache hit {} ({} bytes)", path, bytes.len());
            return Ok(self.artifact(&payload, kind, bytes, hash, CacheStatus::Hit));
        }
        log::info!("Cache miss {}", path);

        let mut job = Job {
            payload: &payload,
            theme,
            model: None,
        };
        let bytes = match kind {
            ArtifactKind::WordDocument => self.word_document(&mut job, &base_hash)?,
            ArtifactKind::FixedLayoutClean | ArtifactKind::FixedLayoutPreview => {
                self.fixed_layout(&mut job, &base_hash, kind)?
            },
        };
        let stage = if kind.is_preview() {
            Stage::Watermark
        } else {
            Stage::Serialize
        };
        validate_output(kind, &bytes, stage)?;

        self.persist(&path, &bytes, kind.content_type());
        Ok(self.artifact(&payload, kind, Bytes::from(bytes), hash, CacheStatus::Miss))
    }

    /// Payload with configured defaults applied.
    fn effective_payload<'p>(&self, payload: &'p PlanPayload) -> Cow<'p, PlanPayload> {
        match &self.config.document_version {
            Some(version) if clean_field(payload.document_version.as_deref()).is_none() => {
                let mut owned = payload.clone();
                owned.document_version = Some(version.clone());
                Cow::Owned(owned)
            },
            _ => Cow::Borrowed(payload),
        }
    }

    /// Cached bytes for `path`, if present and acceptable for `kind`.
    ///
    /// Read errors and unacceptable entries are treated as misses.
    fn lookup(&self, path: &StoragePath, kind: ArtifactKind) -> Option<Bytes> {
        let blob = match self.cache.get(path) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", path, e);
                return None;
            },
        };
        match reject_reason(kind, &blob) {
            None => Some(blob.bytes),
            Some(reason) => {
                log::warn!("Ignoring cache entry {}: {}", path, reason);
                None
            },
        }
    }

    fn persist(&self, path: &StoragePath, bytes: &[u8], content_type: &str) {
        if let Err(e) = self.cache.put(path, bytes, content_type) {
            log::warn!("Failed to persist {}: {}", path, e);
        }
    }

    fn word_document(&self, job: &mut Job<'_>, base_hash: &ContentFingerprint) -> Result<Vec<u8>> {
        let docx = self.docx.serialize(job.model()?)?;
        log::debug!("Generated DOCX for {} ({} bytes, {})", job.payload.plan_id, docx.len(), base_hash);
        Ok(docx)
    }

    /// DOCX for the PDF flows: reused from the cache when a paid export
    /// already produced it, otherwise generated (and persisted only when
    /// the caller is entitled to the document).
    fn intermediate_docx(
        &self,
        job: &mut Job<'_>,
        base_hash: &ContentFingerprint,
        entitled: bool,
    ) -> Result<Vec<u8>> {
        let path = StoragePath::build(
            &job.payload.plan_id,
            job.theme.name,
            base_hash,
            ArtifactKind::WordDocument,
        );
        if let Some(bytes) = self.lookup(&path, ArtifactKind::WordDocument) {
            log::debug!("Reusing cached DOCX {}", path);
            return Ok(bytes.to_vec());
        }
        let docx = self.word_document(job, base_hash)?;
        validate_output(ArtifactKind::WordDocument, &docx, Stage::Serialize)?;
        if entitled {
            self.persist(&path, &docx, DOCX_CONTENT_TYPE);
        }
        Ok(docx)
    }

    fn fixed_layout(
        &self,
        job: &mut Job<'_>,
        base_hash: &ContentFingerprint,
        kind: ArtifactKind,
    ) -> Result<Vec<u8>> {
        let converted = self
            .intermediate_docx(job, base_hash, !kind.is_preview())
            .and_then(|docx| self.converter.convert(&docx))
            .and_then(|pdf| {
                validate_output(ArtifactKind::FixedLayoutClean, &pdf, Stage::Convert)?;
                Ok(pdf)
            });

        let pdf = match converted {
            Ok(pdf) => pdf,
            Err(e) if self.config.direct_pdf_fallback && !e.is_client_error() => {
                log::warn!(
                    "Conversion failed for {} ({}), falling back to direct PDF",
                    job.payload.plan_id,
                    e
                );
                self.pdf.serialize(job.model()?)?
            },
            Err(e) => return Err(e),
        };

        if kind.is_preview() {
            let watermarked = apply_watermark(&pdf, &self.config.watermark)?;
            log::debug!("Watermarked preview for {}", job.payload.plan_id);
            Ok(watermarked)
        } else {
            Ok(pdf)
        }
    }

    fn artifact(
        &self,
        payload: &PlanPayload,
        kind: ArtifactKind,
        bytes: Bytes,
        fingerprint: ContentFingerprint,
        cache_status: CacheStatus,
    ) -> Artifact {
        Artifact {
            kind,
            bytes,
            file_name: sanitize_file_name(&payload.business.name, kind),
            fingerprint,
            cache_status,
        }
    }
}

/// Why a cached blob cannot be served as `kind`, if it cannot.
fn reject_reason(kind: ArtifactKind, blob: &CachedBlob) -> Option<&'static str> {
    if blob.content_type != kind.content_type() {
        return Some("content type mismatch");
    }
    if !has_magic(kind, &blob.bytes) {
        return Some("not a valid document");
    }
    if kind.is_preview() && !is_watermarked(&blob.bytes) {
        return Some("preview without watermark");
    }
    None
}

fn has_magic(kind: ArtifactKind, bytes: &[u8]) -> bool {
    match kind {
        ArtifactKind::WordDocument => bytes.starts_with(ZIP_MAGIC),
        ArtifactKind::FixedLayoutClean | ArtifactKind::FixedLayoutPreview => bytes.starts_with(PDF_MAGIC),
    }
}

/// Refuse to persist or return empty or mislabeled bytes.
fn validate_output(kind: ArtifactKind, bytes: &[u8], stage: Stage) -> Result<()> {
    if bytes.is_empty() {
        return Err(Error::InvalidArtifact {
            stage,
            reason: format!("empty {} output", kind),
        });
    }
    if !has_magic(kind, bytes) {
        return Err(Error::InvalidArtifact {
            stage,
            reason: format!("{} output has the wrong file signature", kind),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::plan::{BusinessInfo, ProcessStep};

    struct Failing;

    impl DocumentConverter for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn convert(&self, _docx: &[u8]) -> Result<Vec<u8>> {
            Err(Error::ConversionFailed {
                converter: "failing",
                status: Some(500),
                context: "boom".to_string(),
            })
        }
    }

    fn payload(entitled: bool) -> PlanPayload {
        PlanPayload {
            plan_id: "plan-7".to_string(),
            business: BusinessInfo {
                name: "Acme Foods".to_string(),
                ..Default::default()
            },
            process_steps: vec![ProcessStep {
                position: 1,
                name: "Receiving".to_string(),
                description: None,
            }],
            entitled,
            ..Default::default()
        }
    }

    fn exporter(cache: Arc<MemoryCache>) -> ArtifactExporter {
        ArtifactExporter::new(ExportConfig::default(), cache, Box::new(Failing))
    }

    #[test]
    fn test_word_export_is_cached() {
        let cache = Arc::new(MemoryCache::new());
        let exporter = exporter(cache.clone());
        let request = ExportRequest::new(payload(true), ExportFormat::Word);

        let first = exporter.export(&request).unwrap();
        assert_eq!(first.kind, ArtifactKind::WordDocument);
        assert_eq!(first.cache_status, CacheStatus::Miss);
        assert!(first.bytes.starts_with(ZIP_MAGIC));

        let second = exporter.export(&request).unwrap();
        assert_eq!(second.cache_status, CacheStatus::Hit);
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unpaid_word_request_gets_preview() {
        let cache = Arc::new(MemoryCache::new());
        let exporter = exporter(cache.clone());
        let artifact = exporter
            .export(&ExportRequest::new(payload(false), ExportFormat::Word))
            .unwrap();
        assert_eq!(artifact.kind, ArtifactKind::FixedLayoutPreview);
        assert!(is_watermarked(&artifact.bytes));
        // Preview flows never persist the DOCX
        assert_eq!(cache.len(), 1);
        assert!(cache.paths()[0].as_str().ends_with("plan-preview.pdf"));
    }

    #[test]
    fn test_fallback_disabled_surfaces_conversion_error() {
        let cache = Arc::new(MemoryCache::new());
        let config = ExportConfig::default().with_direct_pdf_fallback(false);
        let exporter = ArtifactExporter::new(config, cache.clone(), Box::new(Failing));
        let err = exporter
            .export(&ExportRequest::new(payload(true), ExportFormat::Pdf))
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Convert);
        // The DOCX intermediate was still persisted for the paid caller
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reject_reason() {
        let pdf = CachedBlob {
            bytes: Bytes::from_static(b"%PDF-1.7 clean"),
            content_type: "application/pdf".to_string(),
        };
        assert_eq!(reject_reason(ArtifactKind::FixedLayoutClean, &pdf), None);
        assert_eq!(
            reject_reason(ArtifactKind::FixedLayoutPreview, &pdf),
            Some("preview without watermark")
        );
        assert_eq!(
            reject_reason(ArtifactKind::WordDocument, &pdf),
            Some("content type mismatch")
        );
    }

    #[test]
    fn test_configured_version_applies_only_when_missing() {
        let config = ExportConfig::default().with_document_version("3.1");
        let exporter = ArtifactExporter::new(config, Arc::new(MemoryCache::new()), Box::new(Failing));
        let mut p = payload(true);
        assert_eq!(exporter.effective_payload(&p).document_version.as_deref(), Some("3.1"));
        p.document_version = Some("1.4".to_string());
        assert_eq!(exporter.effective_payload(&p).document_version.as_deref(), Some("1.4"));
    }

    #[test]
    fn test_exporter_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ArtifactExporter>();
    }

    #[test]
    fn test_invalid_payload_is_client_error() {
        let exporter = exporter(Arc::new(MemoryCache::new()));
        let mut p = payload(true);
        p.plan_id = " ".to_string();
        let err = exporter.export(&ExportRequest::new(p, ExportFormat::Pdf)).unwrap_err();
        assert!(err.is_client_error());
    }
}
