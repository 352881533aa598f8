//! Minimal PDF toolkit shared by the fixed-layout serializer and the
//! watermark applier.
//!
//! - [`object`] and [`serializer`]: object model and deterministic output
//! - [`parser`] and [`reader`]: reading converter output
//! - [`incremental`]: appending updates without rewriting the original bytes
//! - [`content`] and [`fonts`]: page drawing with the standard fonts

pub mod content;
pub mod fonts;
pub mod incremental;
pub mod object;
pub mod parser;
pub mod reader;
pub mod serializer;

pub use content::ContentStreamBuilder;
pub use fonts::{encode_win_ansi, wrap_text, Base14};
pub use incremental::IncrementalUpdate;
pub use object::{Dict, Object, ObjectRef};
pub use reader::{PageInfo, PdfFile};
pub use serializer::ObjectSerializer;
