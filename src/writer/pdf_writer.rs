//! Direct fixed-layout serializer.
//!
//! Lays the document model out on A4 pages using the base-14 fonts and
//! assembles a complete PDF: header, body, xref table and trailer. This is
//! the fallback path when no DOCX converter is available, so the layout
//! follows the same theme tokens as the DOCX styles.

use super::image_handler::{compress, logo_size, EmbeddedImage};
use super::DocumentSerializer;
use crate::artifact::PDF_CONTENT_TYPE;
use crate::document::{Block, DocumentModel, ImageBlock, Labels, ParagraphStyle, Table};
use crate::error::Result;
use crate::pdf::{encode_win_ansi, wrap_text, Base14, ContentStreamBuilder, Dict, Object, ObjectSerializer};
use crate::theme::{Rgb, ThemeDescriptor};
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

/// Line height as a multiple of the font size.
const LINE_SPACING: f32 = 1.3;

/// Padding inside a section header band.
const BAND_PADDING: f32 = 6.0;

/// Space reserved between the body area and the bottom margin for the footer.
const FOOTER_RESERVE: f32 = 18.0;

/// Resource name of the logo XObject.
const LOGO_RESOURCE: &str = "Im1";

/// Configuration for direct PDF generation.
#[derive(Debug, Clone)]
pub struct PdfWriterConfig {
    /// Page width in points
    pub page_width: f32,
    /// Page height in points
    pub page_height: f32,
    /// Whether to Flate-compress page content streams
    pub compress: bool,
    /// `/Producer` entry of the info dictionary
    pub producer: String,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            page_width: 595.0,
            page_height: 842.0,
            compress: false,
            producer: "plan_export".to_string(),
        }
    }
}

impl PdfWriterConfig {
    /// Enable or disable content stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Serializes a document model straight to PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    config: PdfWriterConfig,
}

impl PdfWriter {
    /// Create a writer with the default (A4, uncompressed) configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with a custom configuration.
    pub fn with_config(config: PdfWriterConfig) -> Self {
        Self { config }
    }

    /// Lay out and serialize the model.
    pub fn write(&self, model: &DocumentModel) -> Result<Vec<u8>> {
        let mut layout = Layout::new(model, &self.config);
        for block in &model.blocks {
            match block {
                Block::SectionHeader { number, title } => layout.section_header(*number, title),
                Block::Paragraph { text, style } => layout.paragraph(text, *style),
                Block::Table(table) => layout.table(table),
                Block::SignatureLine { label, name } => layout.signature(label, name.as_deref()),
                Block::Image(image) => layout.image(image),
            }
        }
        let logo = layout.logo;
        let pages = layout.finish(model.metadata.labels(), &model.metadata.version_label);

        let embedded = match logo.map(EmbeddedImage::from_block).transpose() {
            Ok(embedded) => embedded,
            Err(e) => {
                log::warn!("Logo dropped from PDF: {}", e);
                None
            },
        };
        log::debug!("Laid out {} PDF pages", pages.len());
        self.assemble(model, pages, embedded)
    }

    fn assemble(
        &self,
        model: &DocumentModel,
        pages: Vec<Vec<u8>>,
        image: Option<EmbeddedImage>,
    ) -> Result<Vec<u8>> {
        const CATALOG_ID: u32 = 1;
        const PAGES_ID: u32 = 2;
        const INFO_ID: u32 = 3;

        let theme = model.metadata.theme;
        let mut next_id = 4;
        let mut objects: BTreeMap<u32, Object> = BTreeMap::new();

        let fonts: BTreeSet<Base14> = [
            Base14::regular(theme.font_family),
            Base14::bold(theme.font_family),
        ]
        .into_iter()
        .collect();
        let mut font_resources = Dict::new();
        for font in fonts {
            objects.insert(
                next_id,
                Object::dict(vec![
                    ("Type", Object::name("Font")),
                    ("Subtype", Object::name("Type1")),
                    ("BaseFont", Object::name(font.base_font())),
                    ("Encoding", Object::name("WinAnsiEncoding")),
                ]),
            );
            font_resources.insert(font.resource_name().to_string(), Object::reference(next_id));
            next_id += 1;
        }

        let mut resources = Dict::new();
        resources.insert("Font".to_string(), Object::Dictionary(font_resources));

        if let Some(EmbeddedImage {
            mut xobject,
            soft_mask,
        }) = image
        {
            if let Some(mask) = soft_mask {
                objects.insert(next_id, mask);
                if let Object::Stream { dict, .. } = &mut xobject {
                    dict.insert("SMask".to_string(), Object::reference(next_id));
                }
                next_id += 1;
            }
            objects.insert(next_id, xobject);
            resources.insert(
                "XObject".to_string(),
                Object::dict(vec![(LOGO_RESOURCE, Object::reference(next_id))]),
            );
            next_id += 1;
        }

        let mut kids = Vec::with_capacity(pages.len());
        for content in pages {
            let (page_id, content_id) = (next_id, next_id + 1);
            next_id += 2;

            let mut content_dict = Dict::new();
            let data = if self.config.compress {
                content_dict.insert("Filter".to_string(), Object::name("FlateDecode"));
                compress(&content)?
            } else {
                content
            };
            objects.insert(
                content_id,
                Object::Stream {
                    dict: content_dict,
                    data: Bytes::from(data),
                },
            );
            objects.insert(
                page_id,
                Object::dict(vec![
                    ("Type", Object::name("Page")),
                    ("Parent", Object::reference(PAGES_ID)),
                    (
                        "MediaBox",
                        Object::rect(
                            0.0,
                            0.0,
                            self.config.page_width as f64,
                            self.config.page_height as f64,
                        ),
                    ),
                    ("Contents", Object::reference(content_id)),
                    ("Resources", Object::Dictionary(resources.clone())),
                ]),
            );
            kids.push(Object::reference(page_id));
        }

        let page_count = kids.len() as i64;
        objects.insert(
            PAGES_ID,
            Object::dict(vec![
                ("Type", Object::name("Pages")),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(page_count)),
            ]),
        );
        objects.insert(
            CATALOG_ID,
            Object::dict(vec![
                ("Type", Object::name("Catalog")),
                ("Pages", Object::reference(PAGES_ID)),
                ("Lang", Object::string(model.metadata.language.code())),
            ]),
        );
        objects.insert(
            INFO_ID,
            Object::dict(vec![
                (
                    "Title",
                    Object::String(encode_win_ansi(&format!(
                        "{} - {}",
                        model.metadata.title, model.metadata.subtitle
                    ))),
                ),
                ("Producer", Object::string(&self.config.producer)),
            ]),
        );

        let serializer = ObjectSerializer::new();
        let mut output = Vec::new();
        writeln!(output, "%PDF-1.7")?;
        // Binary marker
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(objects.len());
        for (id, object) in &objects {
            offsets.push(output.len());
            output.extend_from_slice(&serializer.serialize_indirect(*id, 0, object)?);
        }

        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", next_id)?;
        writeln!(output, "0000000000 65535 f ")?;
        for offset in &offsets {
            writeln!(output, "{:010} 00000 n ", offset)?;
        }

        let trailer = Object::dict(vec![
            ("Size", Object::Integer(next_id as i64)),
            ("Root", Object::reference(CATALOG_ID)),
            ("Info", Object::reference(INFO_ID)),
        ]);
        writeln!(output, "trailer")?;
        serializer.write_object(&mut output, &trailer)?;
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        writeln!(output, "%%EOF")?;
        Ok(output)
    }
}

impl DocumentSerializer for PdfWriter {
    fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    fn serialize(&self, model: &DocumentModel) -> Result<Vec<u8>> {
        self.write(model)
    }
}

/// Page-by-page layout state.
struct Layout<'m> {
    theme: &'static ThemeDescriptor,
    regular: Base14,
    bold: Base14,
    width: f32,
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    margin: f32,
    pages: Vec<ContentStreamBuilder>,
    page: ContentStreamBuilder,
    y: f32,
    logo: Option<&'m ImageBlock>,
}

impl<'m> Layout<'m> {
    fn new(model: &DocumentModel, config: &PdfWriterConfig) -> Self {
        let theme = model.metadata.theme;
        let margin = theme.spacing.page_margin;
        Self {
            theme,
            regular: Base14::regular(theme.font_family),
            bold: Base14::bold(theme.font_family),
            width: config.page_width,
            left: margin,
            right: config.page_width - margin,
            top: config.page_height - margin,
            bottom: margin + FOOTER_RESERVE,
            margin,
            pages: Vec::new(),
            page: ContentStreamBuilder::new(),
            y: config.page_height - margin,
            logo: None,
        }
    }

    fn content_width(&self) -> f32 {
        self.right - self.left
    }

    fn at_top(&self) -> bool {
        (self.y - self.top).abs() < 0.01
    }

    fn new_page(&mut self) {
        let done = std::mem::take(&mut self.page);
        self.pages.push(done);
        self.y = self.top;
    }

    /// Start a new page unless `height` still fits above the bottom margin.
    fn ensure(&mut self, height: f32) {
        if self.y - height < self.bottom && !self.at_top() {
            self.new_page();
        }
    }

    fn baseline(top: f32, font: Base14, size: f32) -> f32 {
        top - font.ascent() / 1000.0 * size
    }

    fn paragraph(&mut self, text: &str, style: ParagraphStyle) {
        let t = self.theme;
        let (font, size, color, gap) = match style {
            ParagraphStyle::Title => (self.bold, t.fonts.title, t.colors.primary, t.spacing.paragraph_gap),
            ParagraphStyle::Subtitle => {
                (self.regular, t.fonts.section, t.colors.muted, t.spacing.section_gap)
            },
            ParagraphStyle::Body => (self.regular, t.fonts.body, t.colors.text, t.spacing.paragraph_gap),
            ParagraphStyle::Label => (self.bold, t.fonts.body, t.colors.text, 2.0),
            ParagraphStyle::Note => (self.regular, t.fonts.body, t.colors.muted, t.spacing.paragraph_gap),
        };
        let line_height = size * LINE_SPACING;
        if style == ParagraphStyle::Label {
            // Keep a label with the first lines of its value
            self.ensure(line_height * 3.0);
        }
        for line in wrap_text(text, font, size, self.content_width()) {
            self.ensure(line_height);
            let baseline = Self::baseline(self.y, font, size);
            self.page
                .fill_color(color)
                .text(font, size, self.left, baseline, &line);
            self.y -= line_height;
        }
        self.y -= gap;
    }

    fn section_header(&mut self, number: u8, title: &str) {
        let t = self.theme;
        let size = t.fonts.section;
        let band = size + 2.0 * BAND_PADDING;
        self.ensure(t.spacing.section_gap + band + 3.0 * t.fonts.body * LINE_SPACING);
        if !self.at_top() {
            self.y -= t.spacing.section_gap;
        }
        let width = self.content_width();
        self.page
            .save_state()
            .fill_color(t.colors.accent)
            .rounded_rect(self.left, self.y - band, width, band, t.radii.section)
            .fill()
            .restore_state();
        let baseline = Self::baseline(self.y - BAND_PADDING, self.bold, size);
        self.page.fill_color(t.colors.primary).text(
            self.bold,
            size,
            self.left + BAND_PADDING,
            baseline,
            &format!("{}. {}", number, title),
        );
        self.y -= band + t.spacing.paragraph_gap;
    }

    fn table(&mut self, table: &Table) {
        let t = self.theme;
        let size = t.fonts.table;
        let pad = t.spacing.cell_padding;
        let line_height = size * LINE_SPACING;
        let widths = table.column_widths(self.content_width());

        let headers: Vec<String> = table.columns.iter().map(|c| c.header.clone()).collect();
        let header = wrap_cells(&headers, &widths, self.bold, size, pad);
        let header_height = max_lines(&header) as f32 * line_height + 2.0 * pad;

        self.ensure(header_height + line_height + 2.0 * pad);
        self.table_header(&header, &widths, header_height);

        let fresh_capacity =
            (((self.top - self.bottom - header_height - 2.0 * pad) / line_height).floor() as usize).max(1);
        let mut fresh_page = false;

        for (index, row) in table.rows.iter().enumerate() {
            let mut cells = wrap_cells(row, &widths, self.regular, size, pad);
            loop {
                let lines = max_lines(&cells);
                let needed = lines as f32 * line_height + 2.0 * pad;
                let fit = ((self.y - self.bottom - 2.0 * pad) / line_height).floor().max(0.0) as usize;

                if self.y - needed >= self.bottom || (fresh_page && fit == 0) {
                    self.table_row(&cells, &widths, needed, index);
                    fresh_page = false;
                    break;
                }
                if (lines <= fresh_capacity && !fresh_page) || fit == 0 {
                    self.new_page();
                    self.table_header(&header, &widths, header_height);
                    fresh_page = true;
                    continue;
                }

                // Row taller than a page: emit what fits and continue below the repeated header
                let (head, tail) = split_cells(cells, fit);
                self.table_row(&head, &widths, fit as f32 * line_height + 2.0 * pad, index);
                cells = tail;
                self.new_page();
                self.table_header(&header, &widths, header_height);
                fresh_page = true;
            }
        }
        self.y -= t.spacing.paragraph_gap;
    }

    fn table_header(&mut self, header: &[Vec<String>], widths: &[f32], height: f32) {
        let colors = self.theme.colors;
        let width = self.content_width();
        self.page
            .save_state()
            .fill_color(colors.table_header)
            .rect(self.left, self.y - height, width, height)
            .fill()
            .restore_state();
        self.cells(header, widths, height, self.bold, colors.table_header_text);
        self.y -= height;
    }

    fn table_row(&mut self, cells: &[Vec<String>], widths: &[f32], height: f32, index: usize) {
        let colors = self.theme.colors;
        let width = self.content_width();
        if index % 2 == 1 {
            self.page
                .save_state()
                .fill_color(colors.table_stripe)
                .rect(self.left, self.y - height, width, height)
                .fill()
                .restore_state();
        }
        self.cells(cells, widths, height, self.regular, colors.text);
        self.y -= height;
    }

    fn cells(&mut self, cells: &[Vec<String>], widths: &[f32], height: f32, font: Base14, color: Rgb) {
        let t = self.theme;
        let size = t.fonts.table;
        let pad = t.spacing.cell_padding;
        let line_height = size * LINE_SPACING;

        let mut x = self.left;
        self.page
            .save_state()
            .stroke_color(t.colors.border)
            .line_width(0.5);
        for width in widths {
            self.page.rect(x, self.y - height, *width, height).stroke();
            x += width;
        }
        self.page.restore_state();

        let mut x = self.left;
        for (lines, width) in cells.iter().zip(widths) {
            for (i, line) in lines.iter().enumerate() {
                let baseline = Self::baseline(self.y - pad, font, size) - i as f32 * line_height;
                self.page.fill_color(color).text(font, size, x + pad, baseline, line);
            }
            x += width;
        }
    }

    fn signature(&mut self, label: &str, name: Option<&str>) {
        let t = self.theme;
        let size = t.fonts.body;
        let line_height = size * LINE_SPACING;
        let space = 36.0;
        self.ensure(space + 2.0 * line_height);
        self.y -= space;
        self.page
            .save_state()
            .stroke_color(t.colors.border)
            .line_width(0.75)
            .line(self.left, self.y, self.left + 220.0, self.y)
            .restore_state();
        self.y -= 4.0;

        let text = match name {
            Some(name) => format!("{}: {}", label, name),
            None => label.to_string(),
        };
        let baseline = Self::baseline(self.y, self.bold, size);
        self.page
            .fill_color(t.colors.text)
            .text(self.bold, size, self.left, baseline, &text);
        self.y -= line_height + t.spacing.paragraph_gap;
    }

    fn image(&mut self, image: &'m ImageBlock) {
        if self.logo.is_some() {
            return;
        }
        self.logo = Some(image);
        let (width, height) = logo_size(image);
        self.ensure(height);
        let (x, y) = (self.left, self.y - height);
        let radius = self.theme.radii.image;
        if radius > 0.0 {
            self.page
                .save_state()
                .rounded_rect(x, y, width, height, radius)
                .clip()
                .draw_xobject(LOGO_RESOURCE, x, y, width, height)
                .restore_state();
        } else {
            self.page.draw_xobject(LOGO_RESOURCE, x, y, width, height);
        }
        self.y -= height + self.theme.spacing.paragraph_gap;
    }

    /// Close the last page and stamp every page with the running footer.
    fn finish(mut self, labels: &Labels, version: &str) -> Vec<Vec<u8>> {
        let last = std::mem::take(&mut self.page);
        self.pages.push(last);

        let t = self.theme;
        let size = t.fonts.footer;
        let total = self.pages.len();
        let rule_y = self.margin + size + 4.0;
        self.pages
            .into_iter()
            .enumerate()
            .map(|(i, mut page)| {
                let text = labels.footer(version, i + 1, total);
                let x = (self.width - self.regular.text_width(&text, size)) / 2.0;
                page.save_state()
                    .stroke_color(t.colors.border)
                    .line_width(0.5)
                    .line(self.left, rule_y, self.right, rule_y)
                    .restore_state();
                page.fill_color(t.colors.muted)
                    .text(self.regular, size, x, self.margin, &text);
                page.build()
            })
            .collect()
    }
}

fn wrap_cells(cells: &[String], widths: &[f32], font: Base14, size: f32, pad: f32) -> Vec<Vec<String>> {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| wrap_text(cell, font, size, (width - 2.0 * pad).max(size)))
        .collect()
}

fn max_lines(cells: &[Vec<String>]) -> usize {
    cells.iter().map(Vec::len).max().unwrap_or(1).max(1)
}

/// Split every cell after its first `at` lines.
fn split_cells(cells: Vec<Vec<String>>, at: usize) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
    cells
        .into_iter()
        .map(|mut lines| {
            let tail = if lines.len() > at { lines.split_off(at) } else { Vec::new() };
            (lines, tail)
        })
        .unzip()
}
