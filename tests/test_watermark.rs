//! Integration tests for the preview watermark on generated and
//! hand-written PDFs.

use plan_export::pdf::{Object, PdfFile};
use plan_export::{
    apply_watermark, is_watermarked, render, resolve_theme, PdfWriter, PlanPayload,
    WatermarkConfig,
};

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn generated_pdf() -> Vec<u8> {
    let bytes = std::fs::read("tests/fixtures/bakery.json").unwrap();
    let payload = PlanPayload::from_json(&bytes).unwrap();
    let model = render(&payload, resolve_theme(payload.template_id.as_deref())).unwrap();
    PdfWriter::new().write(&model).unwrap()
}

#[test]
fn test_watermark_generated_document() {
    let original = generated_pdf();
    let watermarked = apply_watermark(&original, &WatermarkConfig::default()).unwrap();

    assert!(watermarked.starts_with(&original));
    assert!(is_watermarked(&watermarked));
    assert!(!is_watermarked(&original));
    assert!(contains(&watermarked, b"(PREVIEW) Tj"));
    assert!(contains(&watermarked, b"(NOT FOR OFFICIAL USE) Tj"));

    let before = PdfFile::parse(&original).unwrap();
    let after = PdfFile::parse(&watermarked).unwrap();
    let pages_before = before.pages().unwrap();
    let pages_after = after.pages().unwrap();
    assert!(!pages_before.is_empty());
    assert_eq!(pages_before.len(), pages_after.len());

    for (b, a) in pages_before.iter().zip(&pages_after) {
        assert_eq!(b.id, a.id);
        assert_eq!(b.visible_box(&before), a.visible_box(&after));
        let contents = a.dict.get("Contents").and_then(Object::as_array).unwrap();
        // push, original content, overlay
        assert_eq!(contents.len(), 3);
        assert_eq!(Some(&contents[1]), b.dict.get("Contents"));
    }
}

#[test]
fn test_custom_text_and_determinism() {
    let original = generated_pdf();
    let config = WatermarkConfig::default()
        .with_lines(["BORRADOR"])
        .with_opacity(0.3)
        .with_rotation(30.0);
    let a = apply_watermark(&original, &config).unwrap();
    let b = apply_watermark(&original, &config).unwrap();
    assert_eq!(a, b);
    assert!(contains(&a, b"(BORRADOR) Tj"));
    assert!(contains(&a, b"/ca 0.3"));
    assert!(!contains(&a, b"(PREVIEW)"));
}

#[test]
fn test_rotated_page_with_inherited_attributes() {
    let pdf: &[u8] = b"%PDF-1.7\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 2 /MediaBox [0 0 842 595] /Rotate 90 >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>\nendobj\n\
4 0 obj\n<< /Length 8 >>\nstream\n1 0 0 RG\nendstream\nendobj\n\
5 0 obj\n<< /Type /Page /Parent 2 0 R /Resources 6 0 R >>\nendobj\n\
6 0 obj\n<< /ProcSet [/PDF] >>\nendobj\n\
trailer\n<< /Size 7 /Root 1 0 R >>\nstartxref\n0\n%%EOF\n";

    let out = apply_watermark(pdf, &WatermarkConfig::default()).unwrap();
    let file = PdfFile::parse(&out).unwrap();
    let pages = file.pages().unwrap();
    assert_eq!(pages.len(), 2);

    // Page without content still gets push + overlay
    let second = pages[1].dict.get("Contents").and_then(Object::as_array).unwrap();
    assert_eq!(second.len(), 2);
    // Resources referenced indirectly are copied inline and extended
    let resources = file.resolve_dict(pages[1].dict.get("Resources")).unwrap();
    assert!(resources.contains_key("ProcSet"));
    assert!(resources.contains_key("Font"));
    assert!(resources.contains_key("ExtGState"));
    // Inherited attributes survive on the rewritten page
    assert_eq!(pages[0].dict.get("Rotate").and_then(Object::as_integer), Some(90));
    assert_eq!(pages[0].visible_box(&file), [0.0, 0.0, 842.0, 595.0]);
}

#[test]
fn test_rejects_non_pdf() {
    let err = apply_watermark(b"PK\x03\x04 definitely a zip", &WatermarkConfig::default()).unwrap_err();
    assert_eq!(err.stage(), plan_export::Stage::Watermark);
}
