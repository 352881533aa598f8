//! Document serializers.
//!
//! ## Architecture
//!
//! ```text
//! DocumentModel
//!     ↓
//! [DocxWriter] ──→ DOCX bytes ──→ (conversion pipeline) ──→ PDF bytes
//!     or
//! [PdfWriter]  ──→ PDF bytes (direct fallback path)
//! ```
//!
//! Both serializers consume the same model and are byte-deterministic: no
//! clock values, random identifiers or hash-map iteration order reach the
//! output.

mod docx;
mod image_handler;
mod pdf_writer;

pub use docx::DocxWriter;
pub use image_handler::{logo_size, EmbeddedImage};
pub use pdf_writer::{PdfWriter, PdfWriterConfig};

use crate::document::DocumentModel;
use crate::error::Result;

/// Turns a document model into the bytes of one output format.
pub trait DocumentSerializer: Send + Sync {
    /// MIME type of the produced bytes.
    fn content_type(&self) -> &'static str;

    /// Serialize the model.
    fn serialize(&self, model: &DocumentModel) -> Result<Vec<u8>>;
}
