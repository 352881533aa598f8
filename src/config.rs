//! Configuration for plan export.

use crate::watermark::WatermarkConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for one conversion attempt.
pub const DEFAULT_CONVERTER_TIMEOUT: Duration = Duration::from_secs(45);

/// Default local converter binary.
pub const DEFAULT_SOFFICE_BIN: &str = "soffice";

/// Export configuration.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Base URL of the remote conversion service (None disables it).
    pub converter_url: Option<String>,

    /// Timeout applied to each conversion attempt.
    pub converter_timeout: Duration,

    /// Local office binary used for conversion.
    pub soffice_bin: PathBuf,

    /// Allow the local converter (alone, or as fallback after the remote one).
    pub local_converter: bool,

    /// Fall back to the direct PDF serializer when conversion fails.
    pub direct_pdf_fallback: bool,

    /// Version label printed in footers when the payload has none.
    pub document_version: Option<String>,

    /// Preview watermark appearance.
    pub watermark: WatermarkConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            converter_url: None,
            converter_timeout: DEFAULT_CONVERTER_TIMEOUT,
            soffice_bin: PathBuf::from(DEFAULT_SOFFICE_BIN),
            local_converter: true,
            direct_pdf_fallback: true,
            document_version: None,
            watermark: WatermarkConfig::default(),
        }
    }

    /// Load configuration from `PLAN_EXPORT_*` environment variables.
    ///
    /// Unset or unparseable variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = get("PLAN_EXPORT_CONVERTER_URL") {
            config.converter_url = Some(url);
        }
        if let Some(raw) = get("PLAN_EXPORT_CONVERTER_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.converter_timeout = Duration::from_secs(secs),
                _ => log::warn!("Ignoring invalid PLAN_EXPORT_CONVERTER_TIMEOUT_SECS={}", raw),
            }
        }
        if let Some(bin) = get("PLAN_EXPORT_SOFFICE_BIN") {
            config.soffice_bin = PathBuf::from(bin);
        }
        if let Some(raw) = get("PLAN_EXPORT_LOCAL_CONVERTER") {
            config.local_converter = parse_flag(&raw, config.local_converter);
        }
        if let Some(raw) = get("PLAN_EXPORT_DIRECT_PDF_FALLBACK") {
            config.direct_pdf_fallback = parse_flag(&raw, config.direct_pdf_fallback);
        }
        if let Some(version) = get("PLAN_EXPORT_DOCUMENT_VERSION") {
            config.document_version = Some(version);
        }
        config
    }

    /// Set the remote conversion service URL.
    pub fn with_converter_url(mut self, url: impl Into<String>) -> Self {
        self.converter_url = Some(url.into());
        self
    }

    /// Set the conversion timeout.
    pub fn with_converter_timeout(mut self, timeout: Duration) -> Self {
        self.converter_timeout = timeout;
        self
    }

    /// Set the local office binary.
    pub fn with_soffice_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.soffice_bin = bin.into();
        self
    }

    /// Enable or disable the local converter.
    pub fn with_local_converter(mut self, enable: bool) -> Self {
        self.local_converter = enable;
        self
    }

    /// Enable or disable the direct PDF fallback.
    pub fn with_direct_pdf_fallback(mut self, enable: bool) -> Self {
        self.direct_pdf_fallback = enable;
        self
    }

    /// Set the default document version label.
    pub fn with_document_version(mut self, version: impl Into<String>) -> Self {
        self.document_version = Some(version.into());
        self
    }

    /// Set the watermark appearance.
    pub fn with_watermark(mut self, watermark: WatermarkConfig) -> Self {
        self.watermark = watermark;
        self
    }
}

fn parse_flag(raw: &str, default: bool) -> bool {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            log::warn!("Ignoring invalid boolean value {:?}", raw);
            default
        },
    }
}
