//! WordprocessingML (DOCX) serializer.
//!
//! Produces a minimal OOXML package:
//! - `[Content_Types].xml`, `_rels/.rels`
//! - `word/document.xml`, `word/styles.xml`, `word/footer1.xml`
//! - `word/_rels/document.xml.rels`, optional `word/media/logo.*`
//! - `docProps/core.xml` (no creation or modification dates)
//!
//! Zip entries carry the fixed DOS epoch timestamp so identical models give
//! identical archives.

use super::image_handler::logo_size;
use super::DocumentSerializer;
use crate::artifact::DOCX_CONTENT_TYPE;
use crate::document::{Block, DocumentModel, ImageBlock, ParagraphStyle, Table};
use crate::error::{Error, Result};
use crate::theme::{Rgb, ThemeDescriptor};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_FOOTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const STYLES_RID: &str = "rId1";
const FOOTER_RID: &str = "rId2";
const LOGO_RID: &str = "rId3";

/// A4 in twentieths of a point.
const PAGE_WIDTH_TWIPS: u32 = 11906;
const PAGE_HEIGHT_TWIPS: u32 = 16838;
const EMU_PER_POINT: f32 = 12700.0;

fn twips(points: f32) -> u32 {
    (points * 20.0).round().max(0.0) as u32
}

fn half_points(points: f32) -> String {
    ((points * 2.0).round() as u32).to_string()
}

/// Word font for a base-14 family name.
fn word_font(family: &str) -> &'static str {
    if family.starts_with("Times") {
        "Times New Roman"
    } else {
        "Arial"
    }
}

/// Event-level XML writer with crate errors.
struct Xml {
    writer: Writer<Vec<u8>>,
}

impl Xml {
    fn new() -> Result<Self> {
        let mut xml = Self {
            writer: Writer::new(Vec::new()),
        };
        xml.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(xml)
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(Error::serialize)
    }

    fn element(name: &str, attrs: &[(&str, &str)]) -> BytesStart<'static> {
        let mut element = BytesStart::new(name.to_string());
        for (key, value) in attrs {
            element.push_attribute((*key, &*xml_chars(value)));
        }
        element
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Start(Self::element(name, attrs)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Empty(Self::element(name, attrs)))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name.to_string())))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.event(Event::Text(BytesText::new(&xml_chars(text))))
    }

    fn leaf(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attrs)?;
        self.text(text)?;
        self.end(name)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Whether `c` matches the XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}')
        || c >= '\u{10000}'
}

/// Drop characters XML 1.0 cannot represent, even as references.
fn xml_chars(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

/// Paragraph style definition for `styles.xml`.
#[derive(Default)]
struct StyleDef {
    id: &'static str,
    name: &'static str,
    based_on: Option<&'static str>,
    bold: bool,
    color: Option<Rgb>,
    size: Option<f32>,
    keep_next: bool,
    before: Option<f32>,
    after: Option<f32>,
    shading: Option<Rgb>,
    centered: bool,
    outline_level: Option<u8>,
}

/// Serializes a document model to DOCX.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxWriter;

impl DocxWriter {
    /// Create a writer.
    pub fn new() -> Self {
        DocxWriter
    }

    /// Build the package.
    pub fn write(&self, model: &DocumentModel) -> Result<Vec<u8>> {
        let logo = model.image();
        let mut parts: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".to_string(), content_types(logo)?),
            ("_rels/.rels".to_string(), package_rels()?),
            ("word/document.xml".to_string(), document_xml(model)?),
            ("word/styles.xml".to_string(), styles_xml(model)?),
            ("word/footer1.xml".to_string(), footer_xml(model)?),
            ("word/_rels/document.xml.rels".to_string(), document_rels(logo)?),
            ("docProps/core.xml".to_string(), core_xml(model)?),
        ];
        if let Some(image) = logo {
            parts.push((format!("word/media/logo.{}", image.format.extension()), image.data.clone()));
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in parts {
            zip.start_file(name, file_options()).map_err(Error::serialize)?;
            zip.write_all(&data)?;
        }
        let cursor = zip.finish().map_err(Error::serialize)?;
        Ok(cursor.into_inner())
    }
}

impl DocumentSerializer for DocxWriter {
    fn content_type(&self) -> &'static str {
        DOCX_CONTENT_TYPE
    }

    fn serialize(&self, model: &DocumentModel) -> Result<Vec<u8>> {
        self.write(model)
    }
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
}

fn content_types(logo: Option<&ImageBlock>) -> Result<Vec<u8>> {
    let mut xml = Xml::new()?;
    xml.start("Types", &[("xmlns", NS_TYPES)])?;
    xml.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    xml.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    if let Some(image) = logo {
        xml.empty(
            "Default",
            &[
                ("Extension", image.format.extension()),
                ("ContentType", image.format.content_type()),
            ],
        )?;
    }
    for (part, content_type) in [
        (
            "/word/document.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
        ),
        (
            "/word/styles.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
        ),
        (
            "/word/footer1.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml",
        ),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml",
        ),
    ] {
        xml.empty("Override", &[("PartName", part), ("ContentType", content_type)])?;
    }
    xml.end("Types")?;
    Ok(xml.finish())
}

fn package_rels() -> Result<Vec<u8>> {
    let mut xml = Xml::new()?;
    xml.start("Relationships", &[("xmlns", NS_RELS)])?;
    xml.empty(
        "Relationship",
        &[("Id", "rId1"), ("Type", REL_OFFICE_DOCUMENT), ("Target", "word/document.xml")],
    )?;
    xml.empty(
        "Relationship",
        &[("Id", "rId2"), ("Type", REL_CORE), ("Target", "docProps/core.xml")],
    )?;
    xml.end("Relationships")?;
    Ok(xml.finish())
}

fn document_rels(logo: Option<&ImageBlock>) -> Result<Vec<u8>> {
    let mut xml = Xml::new()?;
    xml.start("Relationships", &[("xmlns", NS_RELS)])?;
    xml.empty(
        "Relationship",
        &[("Id", STYLES_RID), ("Type", REL_STYLES), ("Target", "styles.xml")],
    )?;
    xml.empty(
        "Relationship",
        &[("Id", FOOTER_RID), ("Type", REL_FOOTER), ("Target", "footer1.xml")],
    )?;
    if let Some(image) = logo {
        let target = format!("media/logo.{}", image.format.extension());
        xml.empty(
            "Relationship",
            &[("Id", LOGO_RID), ("Type", REL_IMAGE), ("Target", &target)],
        )?;
    }
    xml.end("Relationships")?;
    Ok(xml.finish())
}

fn core_xml(model: &DocumentModel) -> Result<Vec<u8>> {
    let meta = &model.metadata;
    let mut xml = Xml::new()?;
    xml.start(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    xml.leaf("dc:title", &[], &meta.title)?;
    xml.leaf("dc:subject", &[], &meta.subtitle)?;
    xml.leaf("dc:language", &[], meta.language.code())?;
    xml.leaf("cp:version", &[], &meta.version_label)?;
    xml.end("cp:coreProperties")?;
    Ok(xml.finish())
}

fn lang_tag(model: &DocumentModel) -> &'static str {
    match model.metadata.language.code() {
        "es" => "es-ES",
        _ => "en-US",
    }
}

fn styles_xml(model: &DocumentModel) -> Result<Vec<u8>> {
    let theme = model.metadata.theme;
    let font = word_font(theme.font_family);
    let c = theme.colors;
    let f = theme.fonts;
    let s = theme.spacing;

    let mut xml = Xml::new()?;
    xml.start("w:styles", &[("xmlns:w", NS_W)])?;

    xml.start("w:docDefaults", &[])?;
    xml.start("w:rPrDefault", &[])?;
    xml.start("w:rPr", &[])?;
    xml.empty(
        "w:rFonts",
        &[("w:ascii", font), ("w:hAnsi", font), ("w:cs", font), ("w:eastAsia", font)],
    )?;
    xml.empty("w:color", &[("w:val", &c.text.to_hex())])?;
    xml.empty("w:sz", &[("w:val", &half_points(f.body))])?;
    xml.empty("w:lang", &[("w:val", lang_tag(model))])?;
    xml.end("w:rPr")?;
    xml.end("w:rPrDefault")?;
    xml.start("w:pPrDefault", &[])?;
    xml.start("w:pPr", &[])?;
    xml.empty(
        "w:spacing",
        &[
            ("w:after", &twips(s.paragraph_gap).to_string()),
            ("w:line", "264"),
            ("w:lineRule", "auto"),
        ],
    )?;
    xml.end("w:pPr")?;
    xml.end("w:pPrDefault")?;
    xml.end("w:docDefaults")?;

    let styles = [
        StyleDef {
            id: "Normal",
            name: "Normal",
            ..Default::default()
        },
        StyleDef {
            id: "Title",
            name: "Title",
            based_on: Some("Normal"),
            bold: true,
            color: Some(c.primary),
            size: Some(f.title),
            after: Some(s.paragraph_gap),
            ..Default::default()
        },
        StyleDef {
            id: "Subtitle",
            name: "Subtitle",
            based_on: Some("Normal"),
            color: Some(c.muted),
            size: Some(f.section),
            after: Some(s.section_gap),
            ..Default::default()
        },
        StyleDef {
            id: "Heading1",
            name: "heading 1",
            based_on: Some("Normal"),
            bold: true,
            color: Some(c.primary),
            size: Some(f.section),
            keep_next: true,
            before: Some(s.section_gap),
            after: Some(s.paragraph_gap),
            shading: Some(c.accent),
            outline_level: Some(0),
            ..Default::default()
        },
        StyleDef {
            id: "Label",
            name: "Label",
            based_on: Some("Normal"),
            bold: true,
            keep_next: true,
            after: Some(2.0),
            ..Default::default()
        },
        StyleDef {
            id: "Note",
            name: "Note",
            based_on: Some("Normal"),
            color: Some(c.muted),
            ..Default::default()
        },
        StyleDef {
            id: "TableText",
            name: "Table Text",
            based_on: Some("Normal"),
            size: Some(f.table),
            after: Some(0.0),
            ..Default::default()
        },
        StyleDef {
            id: "TableHeader",
            name: "Table Header",
            based_on: Some("TableText"),
            bold: true,
            color: Some(c.table_header_text),
            ..Default::default()
        },
        StyleDef {
            id: "Footer",
            name: "footer",
            based_on: Some("Normal"),
            color: Some(c.muted),
            size: Some(f.footer),
            after: Some(0.0),
            centered: true,
            ..Default::default()
        },
    ];
    for style in &styles {
        write_style(&mut xml, style)?;
    }

    xml.end("w:styles")?;
    Ok(xml.finish())
}

fn write_style(xml: &mut Xml, style: &StyleDef) -> Result<()> {
    let mut attrs = vec![("w:type", "paragraph"), ("w:styleId", style.id)];
    if style.id == "Normal" {
        attrs.push(("w:default", "1"));
    }
    xml.start("w:style", &attrs)?;
    xml.empty("w:name", &[("w:val", style.name)])?;
    if let Some(base) = style.based_on {
        xml.empty("w:basedOn", &[("w:val", base)])?;
    }
    xml.empty("w:qFormat", &[])?;

    xml.start("w:pPr", &[])?;
    if style.keep_next {
        xml.empty("w:keepNext", &[])?;
    }
    if let Some(fill) = style.shading {
        xml.empty(
            "w:shd",
            &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", &fill.to_hex())],
        )?;
    }
    if style.before.is_some() || style.after.is_some() {
        let before = style.before.map(|v| twips(v).to_string());
        let after = style.after.map(|v| twips(v).to_string());
        let mut spacing = Vec::new();
        if let Some(before) = &before {
            spacing.push(("w:before", before.as_str()));
        }
        if let Some(after) = &after {
            spacing.push(("w:after", after.as_str()));
        }
        xml.empty("w:spacing", &spacing)?;
    }
    if style.centered {
        xml.empty("w:jc", &[("w:val", "center")])?;
    }
    if let Some(level) = style.outline_level {
        xml.empty("w:outlineLvl", &[("w:val", &level.to_string())])?;
    }
    xml.end("w:pPr")?;

    xml.start("w:rPr", &[])?;
    if style.bold {
        xml.empty("w:b", &[])?;
    }
    if let Some(color) = style.color {
        xml.empty("w:color", &[("w:val", &color.to_hex())])?;
    }
    if let Some(size) = style.size {
        xml.empty("w:sz", &[("w:val", &half_points(size))])?;
    }
    xml.end("w:rPr")?;

    xml.end("w:style")
}

fn footer_xml(model: &DocumentModel) -> Result<Vec<u8>> {
    let meta = &model.metadata;
    let labels = meta.labels();
    let border = meta.theme.colors.border.to_hex();

    let mut xml = Xml::new()?;
    xml.start("w:ftr", &[("xmlns:w", NS_W), ("xmlns:r", NS_R)])?;
    xml.start("w:p", &[])?;
    xml.start("w:pPr", &[])?;
    xml.empty("w:pStyle", &[("w:val", "Footer")])?;
    xml.start("w:pBdr", &[])?;
    xml.empty(
        "w:top",
        &[("w:val", "single"), ("w:sz", "4"), ("w:space", "4"), ("w:color", &border)],
    )?;
    xml.end("w:pBdr")?;
    xml.end("w:pPr")?;

    run(&mut xml, &format!("{} {} | {} ", labels.version, meta.version_label, labels.page))?;
    field(&mut xml, " PAGE ")?;
    run(&mut xml, &format!(" {} ", labels.of))?;
    field(&mut xml, " NUMPAGES ")?;

    xml.end("w:p")?;
    xml.end("w:ftr")?;
    Ok(xml.finish())
}

fn field(xml: &mut Xml, instruction: &str) -> Result<()> {
    xml.start("w:fldSimple", &[("w:instr", instruction)])?;
    run(xml, "1")?;
    xml.end("w:fldSimple")
}

/// One run; newlines become line breaks.
fn run(xml: &mut Xml, text: &str) -> Result<()> {
    xml.start("w:r", &[])?;
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            xml.empty("w:br", &[])?;
        }
        xml.leaf("w:t", &[("xml:space", "preserve")], line)?;
    }
    xml.end("w:r")
}

fn paragraph(xml: &mut Xml, style: &str, text: &str) -> Result<()> {
    xml.start("w:p", &[])?;
    xml.start("w:pPr", &[])?;
    xml.empty("w:pStyle", &[("w:val", style)])?;
    xml.end("w:pPr")?;
    run(xml, text)?;
    xml.end("w:p")
}

fn style_id(style: ParagraphStyle) -> &'static str {
    match style {
        ParagraphStyle::Title => "Title",
        ParagraphStyle::Subtitle => "Subtitle",
        ParagraphStyle::Body => "Normal",
        ParagraphStyle::Label => "Label",
        ParagraphStyle::Note => "Note",
    }
}

fn document_xml(model: &DocumentModel) -> Result<Vec<u8>> {
    let theme = model.metadata.theme;
    let margin = twips(theme.spacing.page_margin);
    let content_width = PAGE_WIDTH_TWIPS.saturating_sub(2 * margin) as f32;

    let mut xml = Xml::new()?;
    xml.start(
        "w:document",
        &[
            ("xmlns:w", NS_W),
            ("xmlns:r", NS_R),
            ("xmlns:wp", NS_WP),
            ("xmlns:a", NS_A),
            ("xmlns:pic", NS_PIC),
        ],
    )?;
    xml.start("w:body", &[])?;

    let mut logo_written = false;
    for block in &model.blocks {
        match block {
            Block::SectionHeader { number, title } => {
                paragraph(&mut xml, "Heading1", &format!("{}. {}", number, title))?
            },
            Block::Paragraph { text, style } => paragraph(&mut xml, style_id(*style), text)?,
            Block::Table(table) => write_table(&mut xml, table, theme, content_width)?,
            Block::SignatureLine { label, name } => {
                write_signature(&mut xml, label, name.as_deref(), theme, content_width)?
            },
            Block::Image(image) => {
                if !logo_written {
                    write_image(&mut xml, image, theme)?;
                    logo_written = true;
                }
            },
        }
    }

    let margin = margin.to_string();
    xml.start("w:sectPr", &[])?;
    xml.empty("w:footerReference", &[("w:type", "default"), ("r:id", FOOTER_RID)])?;
    xml.empty(
        "w:pgSz",
        &[
            ("w:w", &PAGE_WIDTH_TWIPS.to_string()),
            ("w:h", &PAGE_HEIGHT_TWIPS.to_string()),
        ],
    )?;
    xml.empty(
        "w:pgMar",
        &[
            ("w:top", &margin),
            ("w:right", &margin),
            ("w:bottom", &margin),
            ("w:left", &margin),
            ("w:header", "360"),
            ("w:footer", "360"),
            ("w:gutter", "0"),
        ],
    )?;
    xml.end("w:sectPr")?;

    xml.end("w:body")?;
    xml.end("w:document")?;
    Ok(xml.finish())
}

fn write_table(xml: &mut Xml, table: &Table, theme: &ThemeDescriptor, content_width: f32) -> Result<()> {
    let c = theme.colors;
    let border = c.border.to_hex();
    let padding = twips(theme.spacing.cell_padding).to_string();
    let widths: Vec<String> = table
        .column_widths(content_width)
        .iter()
        .map(|w| (w.round() as u32).to_string())
        .collect();

    xml.start("w:tbl", &[])?;
    xml.start("w:tblPr", &[])?;
    xml.empty("w:tblW", &[("w:w", "5000"), ("w:type", "pct")])?;
    xml.empty("w:tblLayout", &[("w:type", "fixed")])?;
    xml.start("w:tblBorders", &[])?;
    for edge in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
        xml.empty(
            edge,
            &[("w:val", "single"), ("w:sz", "4"), ("w:space", "0"), ("w:color", &border)],
        )?;
    }
    xml.end("w:tblBorders")?;
    xml.start("w:tblCellMar", &[])?;
    for edge in ["w:top", "w:left", "w:bottom", "w:right"] {
        xml.empty(edge, &[("w:w", &padding), ("w:type", "dxa")])?;
    }
    xml.end("w:tblCellMar")?;
    xml.end("w:tblPr")?;

    xml.start("w:tblGrid", &[])?;
    for width in &widths {
        xml.empty("w:gridCol", &[("w:w", width)])?;
    }
    xml.end("w:tblGrid")?;

    xml.start("w:tr", &[])?;
    xml.start("w:trPr", &[])?;
    xml.empty("w:tblHeader", &[])?;
    xml.end("w:trPr")?;
    for (column, width) in table.columns.iter().zip(&widths) {
        write_cell(xml, &column.header, width, Some(c.table_header), "TableHeader")?;
    }
    xml.end("w:tr")?;

    for (index, row) in table.rows.iter().enumerate() {
        let fill = (index % 2 == 1).then_some(c.table_stripe);
        xml.start("w:tr", &[])?;
        for (cell, width) in row.iter().zip(&widths) {
            write_cell(xml, cell, width, fill, "TableText")?;
        }
        xml.end("w:tr")?;
    }
    xml.end("w:tbl")?;

    // Adjacent tables would merge without a paragraph between them
    xml.empty("w:p", &[])
}

fn write_cell(xml: &mut Xml, text: &str, width: &str, fill: Option<Rgb>, style: &str) -> Result<()> {
    xml.start("w:tc", &[])?;
    xml.start("w:tcPr", &[])?;
    xml.empty("w:tcW", &[("w:w", width), ("w:type", "dxa")])?;
    if let Some(fill) = fill {
        xml.empty(
            "w:shd",
            &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", &fill.to_hex())],
        )?;
    }
    xml.end("w:tcPr")?;
    paragraph(xml, style, text)?;
    xml.end("w:tc")
}

fn write_signature(
    xml: &mut Xml,
    label: &str,
    name: Option<&str>,
    theme: &ThemeDescriptor,
    content_width: f32,
) -> Result<()> {
    let rule_width = twips(220.0) as f32;
    let indent = ((content_width - rule_width).max(0.0) as u32).to_string();
    let text = match name {
        Some(name) => format!("{}: {}", label, name),
        None => label.to_string(),
    };

    xml.start("w:p", &[])?;
    xml.start("w:pPr", &[])?;
    xml.empty("w:pStyle", &[("w:val", "Label")])?;
    xml.start("w:pBdr", &[])?;
    xml.empty(
        "w:top",
        &[
            ("w:val", "single"),
            ("w:sz", "6"),
            ("w:space", "1"),
            ("w:color", &theme.colors.border.to_hex()),
        ],
    )?;
    xml.end("w:pBdr")?;
    xml.empty("w:spacing", &[("w:before", "720")])?;
    xml.empty("w:ind", &[("w:right", &indent)])?;
    xml.end("w:pPr")?;
    run(xml, &text)?;
    xml.end("w:p")
}

fn write_image(xml: &mut Xml, image: &ImageBlock, theme: &ThemeDescriptor) -> Result<()> {
    let (width, height) = logo_size(image);
    let cx = ((width * EMU_PER_POINT).round() as u64).to_string();
    let cy = ((height * EMU_PER_POINT).round() as u64).to_string();
    let file_name = format!("logo.{}", image.format.extension());
    let geometry = if theme.radii.image > 0.0 { "roundRect" } else { "rect" };

    xml.start("w:p", &[])?;
    xml.start("w:r", &[])?;
    xml.start("w:drawing", &[])?;
    xml.start(
        "wp:inline",
        &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
    )?;
    xml.empty("wp:extent", &[("cx", &cx), ("cy", &cy)])?;
    xml.empty("wp:docPr", &[("id", "1"), ("name", "Logo")])?;
    xml.start("wp:cNvGraphicFramePr", &[])?;
    xml.empty("a:graphicFrameLocks", &[("noChangeAspect", "1")])?;
    xml.end("wp:cNvGraphicFramePr")?;
    xml.start("a:graphic", &[])?;
    xml.start("a:graphicData", &[("uri", NS_PIC)])?;
    xml.start("pic:pic", &[])?;
    xml.start("pic:nvPicPr", &[])?;
    xml.empty("pic:cNvPr", &[("id", "0"), ("name", &file_name)])?;
    xml.empty("pic:cNvPicPr", &[])?;
    xml.end("pic:nvPicPr")?;
    xml.start("pic:blipFill", &[])?;
    xml.empty("a:blip", &[("r:embed", LOGO_RID)])?;
    xml.start("a:stretch", &[])?;
    xml.empty("a:fillRect", &[])?;
    xml.end("a:stretch")?;
    xml.end("pic:blipFill")?;
    xml.start("pic:spPr", &[])?;
    xml.start("a:xfrm", &[])?;
    xml.empty("a:off", &[("x", "0"), ("y", "0")])?;
    xml.empty("a:ext", &[("cx", &cx), ("cy", &cy)])?;
    xml.end("a:xfrm")?;
    xml.start("a:prstGeom", &[("prst", geometry)])?;
    xml.empty("a:avLst", &[])?;
    xml.end("a:prstGeom")?;
    xml.end("pic:spPr")?;
    xml.end("pic:pic")?;
    xml.end("a:graphicData")?;
    xml.end("a:graphic")?;
    xml.end("wp:inline")?;
    xml.end("w:drawing")?;
    xml.end("w:r")?;
    xml.end("w:p")
}
