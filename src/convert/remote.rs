//! Remote conversion service client.
//!
//! Speaks the Gotenberg LibreOffice route: the DOCX is posted as a
//! multipart `files` part and the response body is the PDF.

use super::DocumentConverter;
use crate::artifact::DOCX_CONTENT_TYPE;
use crate::error::{Error, Result};
use reqwest::blocking::multipart::{Form, Part};
use std::time::Duration;

/// Route appended to the configured base URL.
pub const CONVERT_ENDPOINT: &str = "/forms/libreoffice/convert";

const NAME: &str = "remote";
const BODY_EXCERPT: usize = 200;

/// HTTP converter with a per-request timeout.
#[derive(Debug, Clone)]
pub struct RemoteConverter {
    endpoint: String,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl RemoteConverter {
    /// Client for the service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::ConverterUnavailable {
                converter: NAME,
                reason: format!("invalid converter URL {:?}", base_url),
            });
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConverterUnavailable {
                converter: NAME,
                reason: e.to_string(),
            })?;
        Ok(Self {
            endpoint: format!("{}{}", base, CONVERT_ENDPOINT),
            timeout,
            client,
        })
    }

    /// Full conversion URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_error(&self, e: reqwest::Error) -> Error {
        let context = if e.is_timeout() {
            format!("timed out after {}s", self.timeout.as_secs_f32())
        } else if e.is_connect() {
            format!("cannot connect to {}: {}", self.endpoint, e)
        } else {
            e.to_string()
        };
        Error::ConversionFailed {
            converter: NAME,
            status: e.status().map(|s| s.as_u16() as i32),
            context,
        }
    }
}

impl DocumentConverter for RemoteConverter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn convert(&self, docx: &[u8]) -> Result<Vec<u8>> {
        let part = Part::bytes(docx.to_vec())
            .file_name("plan.docx")
            .mime_str(DOCX_CONTENT_TYPE)
            .map_err(|e| self.request_error(e))?;
        let form = Form::new().part("files", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let excerpt: String = body.trim().chars().take(BODY_EXCERPT).collect();
            return Err(Error::ConversionFailed {
                converter: NAME,
                status: Some(status.as_u16() as i32),
                context: if excerpt.is_empty() {
                    status.to_string()
                } else {
                    excerpt
                },
            });
        }

        let body = response.bytes().map_err(|e| self.request_error(e))?;
        if body.is_empty() {
            return Err(Error::ConversionFailed {
                converter: NAME,
                status: Some(status.as_u16() as i32),
                context: "empty response body".to_string(),
            });
        }
        Ok(body.to_vec())
    }
}
