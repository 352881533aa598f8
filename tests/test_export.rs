//! End-to-end export tests against filesystem and in-memory caches, with
//! converter doubles standing in for the conversion service.

use plan_export::error::Error;
use plan_export::fingerprint::fingerprint;
use plan_export::{
    is_watermarked, ArtifactExporter, ArtifactKind, CacheStatus, CacheStore, ConversionPipeline,
    DocumentConverter, ExportConfig, ExportFormat, ExportRequest, FsCache, LocalConverter,
    MemoryCache, PdfWriter, PlanPayload, Result, Stage, StoragePath, WatermarkConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn bakery(entitled: bool) -> PlanPayload {
    let bytes = std::fs::read("tests/fixtures/bakery.json").expect("Failed to read bakery fixture");
    let mut payload = PlanPayload::from_json(&bytes).expect("Failed to parse bakery fixture");
    payload.entitled = entitled;
    payload
}

/// Converter that "converts" by running the direct PDF writer on a fixed
/// minimal document and counts its calls.
#[derive(Clone, Default)]
struct CountingConverter {
    calls: Arc<AtomicUsize>,
}

impl CountingConverter {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentConverter for CountingConverter {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn convert(&self, docx: &[u8]) -> Result<Vec<u8>> {
        assert!(docx.starts_with(b"PK\x03\x04"), "converter must receive a DOCX");
        self.calls.fetch_add(1, Ordering::SeqCst);
        let payload = bakery(true);
        let model = plan_export::render(&payload, plan_export::resolve_theme(Some("classic")))?;
        PdfWriter::new().write(&model)
    }
}

/// Converter that simulates a remote call hitting its deadline.
struct TimingOut;

impl DocumentConverter for TimingOut {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn convert(&self, _docx: &[u8]) -> Result<Vec<u8>> {
        std::thread::sleep(Duration::from_millis(20));
        Err(Error::ConversionFailed {
            converter: "remote",
            status: None,
            context: "timed out after 0.02s".to_string(),
        })
    }
}

/// Converter that returns a truncated, non-PDF body.
struct Truncated;

impl DocumentConverter for Truncated {
    fn name(&self) -> &'static str {
        "truncated"
    }

    fn convert(&self, _docx: &[u8]) -> Result<Vec<u8>> {
        Ok(b"%PD".to_vec())
    }
}

#[test]
fn test_paid_pdf_generated_once_then_served_from_cache() {
    let dir = tempdir().unwrap();
    let converter = CountingConverter::default();
    let exporter = ArtifactExporter::new(
        ExportConfig::default(),
        Arc::new(FsCache::new(dir.path())),
        Box::new(converter.clone()),
    );
    let request = ExportRequest::new(bakery(true), ExportFormat::Pdf);

    let first = exporter.export(&request).unwrap();
    assert_eq!(first.kind, ArtifactKind::FixedLayoutClean);
    assert_eq!(first.cache_status, CacheStatus::Miss);
    assert_eq!(first.content_type(), "application/pdf");
    assert!(!is_watermarked(&first.bytes));
    assert_eq!(converter.calls(), 1);

    let second = exporter.export(&request).unwrap();
    assert_eq!(second.cache_status, CacheStatus::Hit);
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(converter.calls(), 1);

    // The DOCX intermediate and the PDF share the payload hash
    let docx_path = dir
        .path()
        .join("plan-bakery-001")
        .join("modern")
        .join(first.fingerprint.as_str())
        .join("plan.docx");
    assert!(docx_path.is_file());
}

#[test]
fn test_cached_docx_is_reused_for_pdf() {
    let cache = Arc::new(MemoryCache::new());
    let converter = CountingConverter::default();
    let exporter = ArtifactExporter::new(ExportConfig::default(), cache.clone(), Box::new(converter.clone()));

    let word = exporter
        .export(&ExportRequest::new(bakery(true), ExportFormat::Word))
        .unwrap();
    assert_eq!(word.kind, ArtifactKind::WordDocument);
    assert_eq!(cache.len(), 1);

    let pdf = exporter
        .export(&ExportRequest::new(bakery(true), ExportFormat::Pdf))
        .unwrap();
    assert_eq!(pdf.cache_status, CacheStatus::Miss);
    assert_eq!(word.fingerprint, pdf.fingerprint);
    assert_eq!(cache.len(), 2);
    assert_eq!(converter.calls(), 1);
}

#[test]
fn test_entitlement_isolation() {
    let cache = Arc::new(MemoryCache::new());
    let exporter = ArtifactExporter::new(
        ExportConfig::default(),
        cache.clone(),
        Box::new(CountingConverter::default()),
    );

    let paid = exporter
        .export(&ExportRequest::new(bakery(true), ExportFormat::Pdf))
        .unwrap();
    for format in [ExportFormat::Pdf, ExportFormat::Word] {
        let unpaid = exporter
            .export(&ExportRequest::new(bakery(false), format))
            .unwrap();
        assert_eq!(unpaid.kind, ArtifactKind::FixedLayoutPreview);
        assert!(is_watermarked(&unpaid.bytes));
        assert!(unpaid.bytes.windows(9).any(|w| w == b"(PREVIEW)"));
        assert_ne!(unpaid.bytes, paid.bytes);
        assert_ne!(unpaid.fingerprint, paid.fingerprint);
        assert!(unpaid.file_name.ends_with("-preview.pdf"));
    }
}

#[test]
fn test_preview_flow_never_writes_docx() {
    let cache = Arc::new(MemoryCache::new());
    let exporter = ArtifactExporter::new(
        ExportConfig::default(),
        cache.clone(),
        Box::new(CountingConverter::default()),
    );
    exporter
        .export(&ExportRequest::new(bakery(false), ExportFormat::Word))
        .unwrap();
    let paths = cache.paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].as_str().ends_with("/plan-preview.pdf"));
}

#[test]
fn test_unwatermarked_preview_entry_is_regenerated() {
    let cache = Arc::new(MemoryCache::new());
    let payload = bakery(false);
    let hash = fingerprint(
        &payload,
        "modern",
        &[WatermarkConfig::default().stage_marker().as_str()],
    )
    .unwrap();
    let path = StoragePath::build(&payload.plan_id, "modern", &hash, ArtifactKind::FixedLayoutPreview);
    cache.insert_raw(path.clone(), b"%PDF-1.7 clean bytes", "application/pdf");

    let exporter = ArtifactExporter::new(
        ExportConfig::default(),
        cache.clone(),
        Box::new(CountingConverter::default()),
    );
    let artifact = exporter
        .export(&ExportRequest::new(payload, ExportFormat::Pdf))
        .unwrap();
    assert_eq!(artifact.cache_status, CacheStatus::Miss);
    assert!(is_watermarked(&artifact.bytes));

    let stored = cache.get(&path).unwrap().unwrap();
    assert_eq!(stored.bytes, artifact.bytes);
}

#[test]
fn test_misrouted_entry_is_not_served() {
    let cache = Arc::new(MemoryCache::new());
    let payload = bakery(true);
    let hash = fingerprint(&payload, "modern", &[]).unwrap();
    let path = StoragePath::build(&payload.plan_id, "modern", &hash, ArtifactKind::FixedLayoutClean);
    cache.insert_raw(path, b"PK\x03\x04 a docx", "application/pdf");

    let exporter = ArtifactExporter::new(
        ExportConfig::default(),
        cache,
        Box::new(CountingConverter::default()),
    );
    let artifact = exporter
        .export(&ExportRequest::new(payload, ExportFormat::Pdf))
        .unwrap();
    assert_eq!(artifact.cache_status, CacheStatus::Miss);
    assert!(artifact.bytes.starts_with(b"%PDF-"));
}

#[test]
fn test_conversion_failure_falls_back_to_direct_pdf() {
    let exporter = ArtifactExporter::new(
        ExportConfig::default(),
        Arc::new(MemoryCache::new()),
        Box::new(TimingOut),
    );
    let paid = exporter
        .export(&ExportRequest::new(bakery(true), ExportFormat::Pdf))
        .unwrap();
    assert!(paid.bytes.starts_with(b"%PDF-"));
    assert!(!is_watermarked(&paid.bytes));

    let unpaid = exporter
        .export(&ExportRequest::new(bakery(false), ExportFormat::Pdf))
        .unwrap();
    assert!(is_watermarked(&unpaid.bytes));
}

#[test]
fn test_timeout_without_local_tool_surfaces_error() {
    let pipeline = ConversionPipeline::new(vec![
        Box::new(TimingOut),
        Box::new(LocalConverter::new("/nonexistent/soffice", Duration::from_secs(1))),
    ]);
    let cache = Arc::new(MemoryCache::new());
    let exporter = ArtifactExporter::new(
        ExportConfig::default().with_direct_pdf_fallback(false),
        cache.clone(),
        Box::new(pipeline),
    );

    let err = exporter
        .export(&ExportRequest::new(bakery(true), ExportFormat::Pdf))
        .unwrap_err();
    assert!(
        matches!(err, Error::ConverterUnavailable { .. } | Error::ConversionFailed { .. }),
        "unexpected error: {}",
        err
    );
    assert_eq!(err.stage(), Stage::Convert);
    // Only the DOCX intermediate was cached; no PDF entry
    assert!(cache.paths().iter().all(|p| p.as_str().ends_with(".docx")));
}

#[test]
fn test_truncated_conversion_output_is_never_returned() {
    let cache = Arc::new(MemoryCache::new());
    let exporter = ArtifactExporter::new(
        ExportConfig::default().with_direct_pdf_fallback(false),
        cache.clone(),
        Box::new(Truncated),
    );
    let err = exporter
        .export(&ExportRequest::new(bakery(true), ExportFormat::Pdf))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArtifact { stage: Stage::Convert, .. }));
    assert!(cache.paths().iter().all(|p| !p.as_str().ends_with(".pdf")));
}

#[test]
fn test_persist_failure_still_returns_artifact() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("cache-root");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let exporter = ArtifactExporter::new(
        ExportConfig::default(),
        Arc::new(FsCache::new(&blocker)),
        Box::new(CountingConverter::default()),
    );
    let artifact = exporter
        .export(&ExportRequest::new(bakery(true), ExportFormat::Word))
        .unwrap();
    assert_eq!(artifact.cache_status, CacheStatus::Miss);
    assert!(artifact.bytes.starts_with(b"PK"));
}

#[test]
fn test_output_is_deterministic_across_exporters() {
    let make = || {
        ArtifactExporter::new(
            ExportConfig::default(),
            Arc::new(MemoryCache::new()),
            Box::new(TimingOut),
        )
    };
    for (entitled, format) in [
        (true, ExportFormat::Word),
        (true, ExportFormat::Pdf),
        (false, ExportFormat::Pdf),
    ] {
        let a = make().export(&ExportRequest::new(bakery(entitled), format)).unwrap();
        let b = make().export(&ExportRequest::new(bakery(entitled), format)).unwrap();
        assert_eq!(a.bytes, b.bytes, "{} not deterministic", a.kind);
    }
}

#[test]
fn test_response_headers() {
    let exporter = ArtifactExporter::new(
        ExportConfig::default(),
        Arc::new(MemoryCache::new()),
        Box::new(TimingOut),
    );
    let artifact = exporter
        .export(&ExportRequest::new(bakery(true), ExportFormat::Word))
        .unwrap();
    assert_eq!(artifact.file_name, "haccp-plan-Panaderia-La-Espiga.docx");
    let headers = artifact.response_headers();
    assert!(headers
        .iter()
        .any(|(k, v)| *k == "Cache-Control" && v.contains("no-store")));
    assert!(headers.iter().any(|(k, v)| *k == "Content-Disposition"
        && v.contains("haccp-plan-Panaderia-La-Espiga.docx")));
}

#[test]
fn test_watermark_settings_change_preview_cache_entry() {
    let cache = Arc::new(MemoryCache::new());
    let default_exporter = ArtifactExporter::new(
        ExportConfig::default(),
        cache.clone(),
        Box::new(CountingConverter::default()),
    );
    let first = default_exporter
        .export(&ExportRequest::new(bakery(false), ExportFormat::Pdf))
        .unwrap();

    let draft = ExportConfig::default()
        .with_watermark(WatermarkConfig::default().with_lines(["DRAFT COPY"]));
    let draft_exporter =
        ArtifactExporter::new(draft, cache.clone(), Box::new(CountingConverter::default()));
    let second = draft_exporter
        .export(&ExportRequest::new(bakery(false), ExportFormat::Pdf))
        .unwrap();

    assert_eq!(second.cache_status, CacheStatus::Miss);
    assert_ne!(first.fingerprint, second.fingerprint);
    let contains =
        |haystack: &[u8], needle: &[u8]| haystack.windows(needle.len()).any(|w| w == needle);
    assert!(contains(&second.bytes, b"(DRAFT COPY)"));
    assert!(!contains(&second.bytes, b"(PREVIEW)"));
}
