//! DOCX to PDF conversion.
//!
//! Converters are external collaborators: a remote conversion service
//! (multipart HTTP, behind the `remote` feature) and a locally installed
//! office suite run as a child process. [`ConversionPipeline`] chains them
//! in preference order and guarantees that success always means a
//! non-empty PDF.

mod local;
#[cfg(feature = "remote")]
mod remote;

pub use local::LocalConverter;
#[cfg(feature = "remote")]
pub use remote::{RemoteConverter, CONVERT_ENDPOINT};

use crate::config::ExportConfig;
use crate::error::{Error, Result};

/// Converts a word-processing document to a fixed-layout document.
pub trait DocumentConverter: Send + Sync {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Convert DOCX bytes to PDF bytes.
    fn convert(&self, docx: &[u8]) -> Result<Vec<u8>>;
}

/// Ordered list of converters; the first one producing a valid PDF wins.
pub struct ConversionPipeline {
    converters: Vec<Box<dyn DocumentConverter>>,
}

impl std::fmt::Debug for ConversionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionPipeline")
            .field("converters", &self.names())
            .finish()
    }
}

impl ConversionPipeline {
    /// Pipeline over explicit converters, tried in order.
    pub fn new(converters: Vec<Box<dyn DocumentConverter>>) -> Self {
        Self { converters }
    }

    /// Remote service first when a URL is configured, then the local tool
    /// when enabled.
    pub fn from_config(config: &ExportConfig) -> Self {
        let mut converters: Vec<Box<dyn DocumentConverter>> = Vec::new();

        if let Some(url) = &config.converter_url {
            #[cfg(feature = "remote")]
            match RemoteConverter::new(url.as_str(), config.converter_timeout) {
                Ok(remote) => converters.push(Box::new(remote)),
                Err(e) => log::warn!("Remote converter disabled: {}", e),
            }
            #[cfg(not(feature = "remote"))]
            log::warn!(
                "Converter URL {} ignored: built without the `remote` feature",
                url
            );
        }
        if config.local_converter {
            converters.push(Box::new(LocalConverter::new(
                config.soffice_bin.clone(),
                config.converter_timeout,
            )));
        }

        log::debug!("Conversion pipeline: {:?}", converters.iter().map(|c| c.name()).collect::<Vec<_>>());
        Self { converters }
    }

    /// Names of the configured converters, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.converters.iter().map(|c| c.name()).collect()
    }
}

impl DocumentConverter for ConversionPipeline {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn convert(&self, docx: &[u8]) -> Result<Vec<u8>> {
        let mut last_error = None;
        for converter in &self.converters {
            log::debug!("Converting {} bytes with {}", docx.len(), converter.name());
            match converter
                .convert(docx)
                .and_then(|pdf| check_pdf(converter.name(), pdf))
            {
                Ok(pdf) => {
                    log::info!("Converted with {} ({} bytes)", converter.name(), pdf.len());
                    return Ok(pdf);
                },
                Err(e) => {
                    log::warn!("Converter {} failed: {}", converter.name(), e);
                    last_error = Some(e);
                },
            }
        }
        Err(last_error.unwrap_or_else(|| Error::ConverterUnavailable {
            converter: "pipeline",
            reason: "no converter configured".to_string(),
        }))
    }
}

/// Reject empty or non-PDF converter output.
pub(crate) fn check_pdf(converter: &'static str, pdf: Vec<u8>) -> Result<Vec<u8>> {
    if pdf.is_empty() {
        return Err(Error::ConversionFailed {
            converter,
            status: None,
            context: "converter returned an empty document".to_string(),
        });
    }
    if !pdf.starts_with(b"%PDF-") {
        return Err(Error::ConversionFailed {
            converter,
            status: None,
            context: "converter output is not a PDF".to_string(),
        });
    }
    Ok(pdf)
}
