// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::new_without_default)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # plan_export
//!
//! Deterministic export of HACCP plans: a resolved plan payload becomes a
//! DOCX, a PDF or a watermarked PDF preview, and every stage is cached by
//! content fingerprint so the same logical document is never regenerated.
//!
//! ## Pipeline
//!
//! ```text
//! PlanPayload + entitlement
//!     ↓
//! fingerprint ──→ cache ──hit──→ Artifact
//!     ↓ miss
//! render (theme) ──→ DOCX ──→ convert ──→ [watermark] ──→ persist ──→ Artifact
//! ```
//!
//! - **Themes**: four built-in visual themes, resolved from the template id
//! - **Rendering**: fixed cover, ten numbered sections, signature block
//! - **Serializers**: DOCX (WordprocessingML) and a direct PDF fallback
//! - **Conversion**: remote service (feature `remote`) with local office fallback
//! - **Watermark**: incremental-update overlay, original bytes preserved
//! - **Cache**: filesystem or in-memory, addressed by `plan/template/hash/file`
//!
//! ## Quick Start
//!
//! ```ignore
//! use plan_export::{ArtifactExporter, ExportConfig, ExportFormat, ExportRequest, FsCache, PlanPayload};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let payload = PlanPayload::from_json(&std::fs::read("plan.json")?)?;
//! let exporter = ArtifactExporter::from_config(
//!     ExportConfig::from_env(),
//!     Arc::new(FsCache::new("/var/cache/plan-export")),
//! );
//! let artifact = exporter.export(&ExportRequest::new(payload, ExportFormat::Pdf))?;
//! std::fs::write(&artifact.file_name, &artifact.bytes)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Input model
pub mod plan;
pub mod theme;

// Fingerprints and cache
pub mod cache;
pub mod fingerprint;

// Document model and rendering
pub mod document;

// PDF object layer shared by the PDF writer and the watermark
pub mod pdf;

// Serializers
pub mod writer;

// DOCX to PDF conversion
pub mod convert;

// Preview watermark
pub mod watermark;

// Orchestration
pub mod artifact;
pub mod export;

// Re-exports
pub use artifact::{Artifact, ArtifactKind, CacheStatus, ExportFormat};
pub use cache::{CacheStore, CachedBlob, FsCache, MemoryCache};
pub use config::ExportConfig;
pub use convert::{ConversionPipeline, DocumentConverter, LocalConverter};
#[cfg(feature = "remote")]
pub use convert::RemoteConverter;
pub use document::{render, DocumentModel};
pub use error::{Error, Result, Stage};
pub use export::{ArtifactExporter, ExportRequest};
pub use fingerprint::{fingerprint, ContentFingerprint, StoragePath};
pub use plan::PlanPayload;
pub use theme::{resolve_theme, ThemeDescriptor};
pub use watermark::{apply_watermark, is_watermarked, WatermarkConfig};
pub use writer::{DocumentSerializer, DocxWriter, PdfWriter};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
