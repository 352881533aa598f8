//! Local office-suite converter.
//!
//! Runs `soffice --headless --convert-to pdf` on a copy of the document in a
//! private temporary directory. Each run gets its own user profile so that
//! concurrent conversions do not contend for the profile lock. The directory
//! is removed when the converter returns, on every path.

use super::DocumentConverter;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const NAME: &str = "local";
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_EXCERPT: usize = 400;

/// Converter backed by a local office binary.
#[derive(Debug, Clone)]
pub struct LocalConverter {
    bin: PathBuf,
    timeout: Duration,
    work_root: Option<PathBuf>,
}

impl LocalConverter {
    /// Converter running `bin` with an enforced timeout.
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
            work_root: None,
        }
    }

    /// Create per-run working directories under `root` instead of the
    /// system temporary directory.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    fn failed(status: Option<i32>, context: impl Into<String>) -> Error {
        Error::ConversionFailed {
            converter: NAME,
            status,
            context: context.into(),
        }
    }
}

impl DocumentConverter for LocalConverter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn convert(&self, docx: &[u8]) -> Result<Vec<u8>> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("plan-export-");
        let workdir = match &self.work_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let input = workdir.path().join("plan.docx");
        let output = workdir.path().join("plan.pdf");
        let stderr_path = workdir.path().join("stderr.log");
        std::fs::write(&input, docx)?;

        let profile = format!("-env:UserInstallation=file://{}/profile", workdir.path().display());
        let spawned = Command::new(&self.bin)
            .arg(profile)
            .arg("--headless")
            .arg("--norestore")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(workdir.path())
            .arg(&input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(File::create(&stderr_path)?))
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                return Err(Error::ConverterUnavailable {
                    converter: NAME,
                    reason: format!("cannot run {}: {}", self.bin.display(), e),
                });
            },
            Err(e) => return Err(e.into()),
        };

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    log::warn!("Failed to kill timed out converter: {}", e);
                }
                let _ = child.wait();
                return Err(Self::failed(
                    None,
                    format!("timed out after {}s", self.timeout.as_secs_f32()),
                ));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(Self::failed(
                status.code(),
                if excerpt.is_empty() {
                    "converter exited with an error".to_string()
                } else {
                    excerpt
                },
            ));
        }

        match std::fs::read(&output) {
            Ok(pdf) if !pdf.is_empty() => Ok(pdf),
            Ok(_) => Err(Self::failed(status.code(), "converter produced an empty file")),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Self::failed(status.code(), "converter produced no output"))
            },
            Err(e) => Err(e.into()),
        }
    }
}
