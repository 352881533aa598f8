//! Format-independent document model.
//!
//! A [`DocumentModel`] is built once per export from the plan payload and
//! the resolved theme, then handed to each serializer. Blocks are a closed
//! set: serializers match on [`Block`] exhaustively, so adding a variant is
//! a compile error until every output format handles it.

mod labels;
mod renderer;
mod text;

pub use labels::{Labels, Language};
pub use renderer::render;
pub use text::{clean_field, fold_char, is_process_control_label, normalize_label, NOT_COMPUTED_TOKEN};

use crate::theme::ThemeDescriptor;

/// Number of numbered sections every plan document has.
pub const SECTION_COUNT: u8 = 10;

/// Document-level metadata shown on the cover and in the running footer.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    /// Document title
    pub title: String,
    /// Subtitle (business name)
    pub subtitle: String,
    /// Output language
    pub language: Language,
    /// Generation date, exactly as supplied by the caller
    pub generated_on: Option<String>,
    /// Version label for the footer
    pub version_label: String,
    /// Theme used for every block
    pub theme: &'static ThemeDescriptor,
}

impl DocumentMetadata {
    /// Localized labels for this document.
    pub fn labels(&self) -> &'static Labels {
        self.language.labels()
    }
}

/// Paragraph role, mapped to a font size and weight by each serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    /// Cover title
    Title,
    /// Cover subtitle
    Subtitle,
    /// Regular text
    Body,
    /// Bold run-in label above a body paragraph
    Label,
    /// Muted explanatory text
    Note,
}

/// Table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Header text
    pub header: String,
    /// Relative width
    pub weight: f32,
}

impl Column {
    /// Create a column.
    pub fn new(header: impl Into<String>, weight: f32) -> Self {
        Self {
            header: header.into(),
            weight,
        }
    }
}

/// Table with one header row and any number of body rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Body rows, each exactly `columns.len()` cells
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Whether every row has one cell per column.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| row.len() == self.columns.len())
    }

    /// Relative column widths scaled to `total`.
    pub fn column_widths(&self, total: f32) -> Vec<f32> {
        let sum: f32 = self.columns.iter().map(|c| c.weight.max(0.0)).sum();
        if sum <= 0.0 {
            let n = self.columns.len().max(1) as f32;
            return vec![total / n; self.columns.len()];
        }
        self.columns
            .iter()
            .map(|c| total * c.weight.max(0.0) / sum)
            .collect()
    }
}

/// Encoded image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG
    Png,
    /// JPEG
    Jpeg,
}

impl ImageFormat {
    /// File extension used for the DOCX media part.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    /// MIME type.
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Embedded raster image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    /// Original encoded bytes
    pub data: Vec<u8>,
    /// Encoding
    pub format: ImageFormat,
    /// Pixel width
    pub width_px: u32,
    /// Pixel height
    pub height_px: u32,
}

/// One unit of document content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Numbered section heading
    SectionHeader {
        /// 1-based section number
        number: u8,
        /// Localized title
        title: String,
    },
    /// Paragraph of text
    Paragraph {
        /// Text, may contain newlines
        text: String,
        /// Role
        style: ParagraphStyle,
    },
    /// Table
    Table(Table),
    /// Signature rule with a caption
    SignatureLine {
        /// Caption (e.g. "Prepared by")
        label: String,
        /// Printed name, when known
        name: Option<String>,
    },
    /// Logo image
    Image(ImageBlock),
}

/// Complete document: metadata plus ordered blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentModel {
    /// Metadata
    pub metadata: DocumentMetadata,
    /// Content in reading order
    pub blocks: Vec<Block>,
}

impl DocumentModel {
    /// Section headers in order.
    pub fn sections(&self) -> impl Iterator<Item = (u8, &str)> {
        self.blocks.iter().filter_map(|b| match b {
            Block::SectionHeader { number, title } => Some((*number, title.as_str())),
            _ => None,
        })
    }

    /// All tables in order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Blocks between the header of section `number` and the next header.
    pub fn section_blocks(&self, number: u8) -> &[Block] {
        let start = self.blocks.iter().position(
            |b| matches!(b, Block::SectionHeader { number: n, .. } if *n == number),
        );
        let Some(start) = start else {
            return &[];
        };
        let end = self.blocks[start + 1..]
            .iter()
            .position(|b| matches!(b, Block::SectionHeader { .. } | Block::SignatureLine { .. }))
            .map(|i| start + 1 + i)
            .unwrap_or(self.blocks.len());
        &self.blocks[start + 1..end]
    }

    /// The logo, if one was embedded.
    pub fn image(&self) -> Option<&ImageBlock> {
        self.blocks.iter().find_map(|b| match b {
            Block::Image(img) => Some(img),
            _ => None,
        })
    }

    /// Every piece of text the model renders, in block order.
    pub fn text_content(&self) -> Vec<&str> {
        let mut out = vec![self.metadata.title.as_str(), self.metadata.subtitle.as_str()];
        for block in &self.blocks {
            match block {
                Block::SectionHeader { title, .. } => out.push(title),
                Block::Paragraph { text, .. } => out.push(text),
                Block::Table(t) => {
                    out.extend(t.columns.iter().map(|c| c.header.as_str()));
                    out.extend(t.rows.iter().flatten().map(String::as_str));
                },
                Block::SignatureLine { label, name } => {
                    out.push(label);
                    if let Some(name) = name {
                        out.push(name);
                    }
                },
                Block::Image(_) => {},
            }
        }
        out
    }
}
