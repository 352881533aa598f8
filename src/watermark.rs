//! Preview watermark overlay.
//!
//! The watermark is applied as a PDF incremental update, so the original
//! bytes are kept verbatim and only page objects are superseded:
//!
//! ```text
//! /Contents [ push("q")  original...  overlay("Q q <text> Q") ]
//! ```
//!
//! The push/pop pair isolates the overlay from whatever graphics state the
//! original content leaves behind. Every page gets the same shared
//! Helvetica-Bold font and ExtGState (fill/stroke alpha), added to a copy of
//! its resources under names that do not collide with existing ones.

use crate::error::{Error, Result};
use crate::pdf::parser::find;
use crate::pdf::{
    Base14, ContentStreamBuilder, Dict, IncrementalUpdate, Object, ObjectRef, PageInfo, PdfFile,
};
use crate::theme::Rgb;
use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Stage marker folded into preview fingerprints. Bump when the overlay
/// output changes so stale previews are not served from the cache.
pub const WATERMARK_VERSION: &str = "watermark:v1";

/// Stream dictionary key identifying an overlay written by this module.
pub const WATERMARK_MARKER_KEY: &str = "PlanExportWatermark";

const FONT_RESOURCE_BASE: &str = "PEWmF";
const GSTATE_RESOURCE_BASE: &str = "PEWmGS";
const WATERMARK_FONT: Base14 = Base14::HelveticaBold;

/// Watermark appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkConfig {
    /// Text lines, top to bottom
    pub lines: Vec<String>,
    /// Font size in points
    pub font_size: f32,
    /// Fill and stroke alpha (0.0-1.0)
    pub opacity: f32,
    /// Counter-clockwise rotation of the text block, as seen on screen
    pub rotation_degrees: f32,
    /// Text color
    pub color: Rgb,
    /// Extra space between lines, in points
    pub line_gap: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            lines: vec!["PREVIEW".to_string(), "NOT FOR OFFICIAL USE".to_string()],
            font_size: 48.0,
            opacity: 0.15,
            rotation_degrees: 45.0,
            color: Rgb(0.5, 0.5, 0.5),
            line_gap: 12.0,
        }
    }
}

impl WatermarkConfig {
    /// Replace the text lines.
    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Set the font size.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    /// Set the opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Set the rotation.
    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    /// Set the text color.
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    /// Fingerprint stage marker covering the algorithm version and every
    /// appearance setting, e.g. `watermark:v1:3f9a...`.
    pub fn stage_marker(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.lines.len() as u64).to_be_bytes());
        for line in &self.lines {
            hasher.update((line.len() as u64).to_be_bytes());
            hasher.update(line.as_bytes());
        }
        let Rgb(r, g, b) = self.color;
        for value in [
            self.font_size,
            self.opacity,
            self.rotation_degrees,
            r,
            g,
            b,
            self.line_gap,
        ] {
            hasher.update(value.to_bits().to_be_bytes());
        }
        format!("{}:{}", WATERMARK_VERSION, hex::encode(hasher.finalize()))
    }

    /// Reject configurations that would draw nothing visible.
    pub fn validate(&self) -> Result<()> {
        if self.lines.iter().all(|l| l.trim().is_empty()) {
            return Err(Error::Watermark("watermark has no text".to_string()));
        }
        if !(self.font_size > 0.0 && self.font_size.is_finite()) {
            return Err(Error::Watermark(format!("invalid font size {}", self.font_size)));
        }
        if !(self.opacity > 0.0 && self.opacity <= 1.0) {
            return Err(Error::Watermark(format!("opacity {} outside (0, 1]", self.opacity)));
        }
        if !self.rotation_degrees.is_finite() || !self.line_gap.is_finite() {
            return Err(Error::Watermark("rotation and line gap must be finite".to_string()));
        }
        Ok(())
    }
}

/// Overlay the watermark on every page.
///
/// Page count, page boxes and existing content are unchanged; the result
/// starts with the input bytes. Pure: identical input gives identical output.
pub fn apply_watermark(pdf: &[u8], config: &WatermarkConfig) -> Result<Vec<u8>> {
    config.validate()?;
    let file = PdfFile::parse(pdf)?;
    let pages = file.pages()?;

    let mut update = IncrementalUpdate::new(&file);
    let push = update.add(content_stream(b"q\n".to_vec(), None));
    let font = update.add(Object::dict(vec![
        ("Type", Object::name("Font")),
        ("Subtype", Object::name("Type1")),
        ("BaseFont", Object::name(WATERMARK_FONT.base_font())),
        ("Encoding", Object::name("WinAnsiEncoding")),
    ]));
    let gstate = update.add(Object::dict(vec![
        ("Type", Object::name("ExtGState")),
        ("ca", Object::Real(config.opacity as f64)),
        ("CA", Object::Real(config.opacity as f64)),
    ]));

    for page in &pages {
        let mut resources = file
            .resolve_dict(page.dict.get("Resources"))
            .unwrap_or_default();
        let font_name = add_resource(&file, &mut resources, "Font", FONT_RESOURCE_BASE, font);
        let gstate_name =
            add_resource(&file, &mut resources, "ExtGState", GSTATE_RESOURCE_BASE, gstate);

        let rotate = page
            .dict
            .get("Rotate")
            .map(|o| file.resolve(o))
            .and_then(Object::as_integer)
            .unwrap_or(0);
        let overlay = overlay_content(
            page.visible_box(&file),
            config,
            config.rotation_degrees + rotate as f32,
            &font_name,
            &gstate_name,
        );
        let overlay = update.add(content_stream(overlay, Some(WATERMARK_VERSION)));

        let mut contents = vec![Object::Reference(push)];
        contents.extend(original_contents(&file, page)?);
        contents.push(Object::Reference(overlay));

        let mut dict = page.dict.clone();
        dict.insert("Contents".to_string(), Object::Array(contents));
        dict.insert("Resources".to_string(), Object::Dictionary(resources));
        update.replace(page.id, Object::Dictionary(dict));
    }

    let output = update
        .finish()
        .map_err(|e| Error::Watermark(format!("incremental update failed: {}", e)))?;
    log::debug!("Watermarked {} pages ({} -> {} bytes)", pages.len(), pdf.len(), output.len());
    Ok(output)
}

/// Whether `pdf` carries an overlay written by [`apply_watermark`].
pub fn is_watermarked(pdf: &[u8]) -> bool {
    let marker = format!("/{}", WATERMARK_MARKER_KEY);
    pdf.starts_with(b"%PDF-") && find(pdf, marker.as_bytes()).is_some()
}

fn content_stream(data: Vec<u8>, marker: Option<&str>) -> Object {
    let mut dict = Dict::new();
    if let Some(version) = marker {
        dict.insert(WATERMARK_MARKER_KEY.to_string(), Object::string(version));
    }
    Object::Stream {
        dict,
        data: Bytes::from(data),
    }
}

/// Current `/Contents` of a page as a list of stream references.
fn original_contents(file: &PdfFile<'_>, page: &PageInfo) -> Result<Vec<Object>> {
    let Some(contents) = page.dict.get("Contents") else {
        return Ok(Vec::new());
    };
    match contents {
        Object::Reference(r) => match file.get(*r) {
            Some(Object::Array(items)) => Ok(items.clone()),
            Some(Object::Stream { .. }) => Ok(vec![contents.clone()]),
            Some(Object::Null) | None => Ok(Vec::new()),
            Some(other) => Err(Error::Watermark(format!(
                "page {} has /Contents of type {}",
                page.id,
                other.type_name()
            ))),
        },
        Object::Array(items) => Ok(items.clone()),
        Object::Null => Ok(Vec::new()),
        other => Err(Error::Watermark(format!(
            "page {} has direct /Contents of type {}",
            page.id,
            other.type_name()
        ))),
    }
}

/// Add `target` to a resource category under a fresh name and return the name.
fn add_resource(
    file: &PdfFile<'_>,
    resources: &mut Dict,
    category: &str,
    base: &str,
    target: ObjectRef,
) -> String {
    let mut entries = file.resolve_dict(resources.get(category)).unwrap_or_default();
    let mut name = base.to_string();
    let mut suffix = 1;
    while entries.contains_key(&name) {
        name = format!("{}{}", base, suffix);
        suffix += 1;
    }
    entries.insert(name.clone(), Object::Reference(target));
    resources.insert(category.to_string(), Object::Dictionary(entries));
    name
}

/// Overlay drawing: closes the push, then draws the centered rotated block.
fn overlay_content(
    visible_box: [f64; 4],
    config: &WatermarkConfig,
    angle_degrees: f32,
    font_name: &str,
    gstate_name: &str,
) -> Vec<u8> {
    let [llx, lly, urx, ury] = visible_box.map(|v| v as f32);
    let (cx, cy) = ((llx + urx) / 2.0, (lly + ury) / 2.0);
    let (sin, cos) = angle_degrees.to_radians().sin_cos();

    let size = config.font_size;
    let lines: Vec<&str> = config
        .lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    let count = lines.len() as f32;
    let block_height = count * size + (count - 1.0).max(0.0) * config.line_gap;
    let ascent = WATERMARK_FONT.ascent() / 1000.0 * size;

    let mut builder = ContentStreamBuilder::new();
    builder
        .restore_state()
        .save_state()
        .set_ext_gstate(gstate_name)
        .fill_color(config.color);
    for (i, line) in lines.iter().enumerate() {
        // Line position in the unrotated frame centered on the page
        let x = -WATERMARK_FONT.text_width(line, size) / 2.0;
        let y = block_height / 2.0 - i as f32 * (size + config.line_gap) - ascent;
        let matrix = [
            cos,
            sin,
            -sin,
            cos,
            cx + x * cos - y * sin,
            cy + x * sin + y * cos,
        ];
        builder.text_with_matrix(font_name, size, matrix, line);
    }
    builder.restore_state();

    // Leading newline keeps the first operator off the previous stream's last token
    let mut data = vec![b'\n'];
    data.extend(builder.build());
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    const INHERITED: &[u8] = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] /Resources << /Font << /PEWmF 9 0 R >> >> >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents [4 0 R] >>\nendobj\n\
4 0 obj\n<< /Length 8 >>\nstream\n0 0 m S\nendstream\nendobj\n\
trailer\n<< /Size 5 /Root 1 0 R >>\nstartxref\n0\n%%EOF\n";

    #[test]
    fn test_overlay_wraps_existing_content() {
        let out = apply_watermark(INHERITED, &WatermarkConfig::default()).unwrap();
        assert!(out.starts_with(INHERITED));
        assert!(is_watermarked(&out));
        assert!(!is_watermarked(INHERITED));

        let file = PdfFile::parse(&out).unwrap();
        let pages = file.pages().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].visible_box(&file), [0.0, 0.0, 612.0, 792.0]);

        let contents = pages[0].dict.get("Contents").and_then(Object::as_array).unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1], Object::Reference(ObjectRef::new(4, 0)));
    }

    #[test]
    fn test_resource_names_do_not_collide() {
        let out = apply_watermark(INHERITED, &WatermarkConfig::default()).unwrap();
        let file = PdfFile::parse(&out).unwrap();
        let page = &file.pages().unwrap()[0];
        let resources = file.resolve_dict(page.dict.get("Resources")).unwrap();
        let fonts = file.resolve_dict(resources.get("Font")).unwrap();
        assert_eq!(fonts.get("PEWmF"), Some(&Object::Reference(ObjectRef::new(9, 0))));
        assert!(fonts.contains_key("PEWmF1"));
        let gstates = file.resolve_dict(resources.get("ExtGState")).unwrap();
        assert!(gstates.contains_key("PEWmGS"));
    }

    #[test]
    fn test_overlay_is_balanced_and_centered() {
        let content = overlay_content([0.0, 0.0, 600.0, 800.0], &WatermarkConfig::default(), 0.0, "F", "G");
        let text = String::from_utf8(content).unwrap();
        assert!(text.starts_with("\nQ\nq\n/G gs\n"));
        assert!(text.ends_with("Q\n"));
        assert_eq!(text.matches("BT").count(), 2);
        // Unrotated: the first line is centered horizontally on x = 300
        let width = WATERMARK_FONT.text_width("PREVIEW", 48.0);
        let x = crate::pdf::serializer::format_number((300.0 - width / 2.0) as f64);
        assert!(text.contains(&format!("1 0 -0 1 {} ", x)) || text.contains(&format!("1 0 0 1 {} ", x)));
    }

    #[test]
    fn test_deterministic() {
        let config = WatermarkConfig::default();
        assert_eq!(
            apply_watermark(INHERITED, &config).unwrap(),
            apply_watermark(INHERITED, &config).unwrap()
        );
    }

    #[test]
    fn test_invalid_input_and_config() {
        assert!(matches!(
            apply_watermark(b"PK\x03\x04 not a pdf", &WatermarkConfig::default()),
            Err(Error::Watermark(_))
        ));
        let empty = WatermarkConfig::default().with_lines(Vec::<String>::new());
        assert!(apply_watermark(INHERITED, &empty).is_err());
        let invisible = WatermarkConfig::default().with_opacity(0.0);
        assert!(invisible.validate().is_err());
    }
}
