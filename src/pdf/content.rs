//! Content stream builder.
//!
//! Emits the page description operators of ISO 32000-1 Sections 8-9 used by
//! the PDF serializer and the watermark overlay. Numbers go through
//! [`format_number`] so the same drawing always produces the same bytes.

use super::fonts::{encode_win_ansi, Base14};
use super::serializer::{format_number, write_name, write_string};
use crate::theme::Rgb;

/// Builder for PDF content streams.
#[derive(Debug, Default, Clone)]
pub struct ContentStreamBuilder {
    buf: Vec<u8>,
}

impl ContentStreamBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn nums(&mut self, values: &[f32]) {
        for v in values {
            self.buf.extend_from_slice(format_number(*v as f64).as_bytes());
            self.buf.push(b' ');
        }
    }

    fn op(&mut self, operator: &str) -> &mut Self {
        self.buf.extend_from_slice(operator.as_bytes());
        self.buf.push(b'\n');
        self
    }

    /// Save graphics state (q).
    pub fn save_state(&mut self) -> &mut Self {
        self.op("q")
    }

    /// Restore graphics state (Q).
    pub fn restore_state(&mut self) -> &mut Self {
        self.op("Q")
    }

    /// Apply an ExtGState resource (gs).
    pub fn set_ext_gstate(&mut self, name: &str) -> &mut Self {
        let _ = write_name(&mut self.buf, name);
        self.buf.push(b' ');
        self.op("gs")
    }

    /// Set fill color (rg).
    pub fn fill_color(&mut self, color: Rgb) -> &mut Self {
        self.nums(&[color.0, color.1, color.2]);
        self.op("rg")
    }

    /// Set stroke color (RG).
    pub fn stroke_color(&mut self, color: Rgb) -> &mut Self {
        self.nums(&[color.0, color.1, color.2]);
        self.op("RG")
    }

    /// Set line width (w).
    pub fn line_width(&mut self, width: f32) -> &mut Self {
        self.nums(&[width]);
        self.op("w")
    }

    /// Concatenate a transformation matrix (cm).
    pub fn transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> &mut Self {
        self.nums(&[a, b, c, d, e, f]);
        self.op("cm")
    }

    /// Axis-aligned rectangle path (re).
    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.nums(&[x, y, width, height]);
        self.op("re")
    }

    /// Rectangle with rounded corners; falls back to `re` for a zero radius.
    pub fn rounded_rect(&mut self, x: f32, y: f32, width: f32, height: f32, radius: f32) -> &mut Self {
        let r = radius.min(width / 2.0).min(height / 2.0);
        if r <= 0.0 {
            return self.rect(x, y, width, height);
        }
        let k = r * 0.552_284_8;
        let (x1, y1) = (x + width, y + height);
        self.move_to(x + r, y)
            .line_to(x1 - r, y)
            .curve_to(x1 - r + k, y, x1, y + r - k, x1, y + r)
            .line_to(x1, y1 - r)
            .curve_to(x1, y1 - r + k, x1 - r + k, y1, x1 - r, y1)
            .line_to(x + r, y1)
            .curve_to(x + r - k, y1, x, y1 - r + k, x, y1 - r)
            .line_to(x, y + r)
            .curve_to(x, y + r - k, x + r - k, y, x + r, y)
            .op("h")
    }

    /// Begin a subpath (m).
    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.nums(&[x, y]);
        self.op("m")
    }

    /// Straight segment (l).
    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.nums(&[x, y]);
        self.op("l")
    }

    /// Cubic Bezier segment (c).
    pub fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) -> &mut Self {
        self.nums(&[x1, y1, x2, y2, x3, y3]);
        self.op("c")
    }

    /// Fill the current path (f).
    pub fn fill(&mut self) -> &mut Self {
        self.op("f")
    }

    /// Stroke the current path (S).
    pub fn stroke(&mut self) -> &mut Self {
        self.op("S")
    }

    /// Intersect the clipping path with the current path (W n).
    pub fn clip(&mut self) -> &mut Self {
        self.op("W n")
    }

    /// Draw a straight line.
    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> &mut Self {
        self.move_to(x1, y1).line_to(x2, y2).stroke()
    }

    /// Show one line of text at `(x, y)` (baseline), as a self-contained text object.
    pub fn text(&mut self, font: Base14, size: f32, x: f32, y: f32, text: &str) -> &mut Self {
        self.op("BT");
        self.font(font, size);
        self.nums(&[x, y]);
        self.op("Td");
        self.show(text);
        self.op("ET")
    }

    /// Show text with a full text matrix (Tm), for rotated text.
    pub fn text_with_matrix(
        &mut self,
        resource: &str,
        size: f32,
        matrix: [f32; 6],
        text: &str,
    ) -> &mut Self {
        self.op("BT");
        let _ = write_name(&mut self.buf, resource);
        self.buf.push(b' ');
        self.nums(&[size]);
        self.op("Tf");
        self.nums(&matrix);
        self.op("Tm");
        self.show(text);
        self.op("ET")
    }

    fn font(&mut self, font: Base14, size: f32) {
        let _ = write_name(&mut self.buf, font.resource_name());
        self.buf.push(b' ');
        self.nums(&[size]);
        self.op("Tf");
    }

    fn show(&mut self, text: &str) {
        let _ = write_string(&mut self.buf, &encode_win_ansi(text));
        self.buf.extend_from_slice(b" Tj\n");
    }

    /// Paint an XObject (Do).
    pub fn draw_xobject(&mut self, name: &str, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.save_state();
        self.transform(width, 0.0, 0.0, height, x, y);
        let _ = write_name(&mut self.buf, name);
        self.buf.push(b' ');
        self.op("Do");
        self.restore_state()
    }

    /// Append a raw comment line.
    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.buf.push(b'%');
        self.buf
            .extend(text.bytes().filter(|b| *b != b'\n' && *b != b'\r'));
        self.buf.push(b'\n');
        self
    }

    /// Whether nothing has been drawn.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finished stream bytes.
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_operators() {
        let mut b = ContentStreamBuilder::new();
        b.text(Base14::Helvetica, 10.0, 50.0, 700.5, "Hello (world)");
        let out = String::from_utf8(b.build()).unwrap();
        assert_eq!(out, "BT\n/F1 10 Tf\n50 700.5 Td\n(Hello \\(world\\)) Tj\nET\n");
    }

    #[test]
    fn test_non_ascii_text_is_win_ansi() {
        let mut b = ContentStreamBuilder::new();
        b.text(Base14::Helvetica, 10.0, 0.0, 0.0, "Niño");
        let out = b.build();
        assert!(out.windows(6).any(|w| w == b"<4E69F"));
    }

    #[test]
    fn test_graphics_operators() {
        let mut b = ContentStreamBuilder::new();
        b.save_state()
            .fill_color(Rgb(1.0, 0.5, 0.0))
            .rect(0.0, 0.0, 10.0, 20.0)
            .fill()
            .restore_state();
        let out = String::from_utf8(b.build()).unwrap();
        assert_eq!(out, "q\n1 0.5 0 rg\n0 0 10 20 re\nf\nQ\n");
    }

    #[test]
    fn test_zero_radius_is_plain_rect() {
        let mut plain = ContentStreamBuilder::new();
        plain.rect(1.0, 2.0, 3.0, 4.0);
        let mut rounded = ContentStreamBuilder::new();
        rounded.rounded_rect(1.0, 2.0, 3.0, 4.0, 0.0);
        assert_eq!(plain.build(), rounded.build());
    }

    #[test]
    fn test_same_drawing_same_bytes() {
        let draw = || {
            let mut b = ContentStreamBuilder::new();
            b.rounded_rect(10.0, 10.0, 100.0, 30.0, 4.0).fill();
            b.build()
        };
        assert_eq!(draw(), draw());
    }
}
