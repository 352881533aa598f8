//! Export a plan payload
//!
//! Reads a plan JSON file, runs it through the export pipeline against a
//! filesystem cache and writes the resulting artifact.
//!
//! Usage:
//!   cargo run --release --bin export_plan -- plan.json
//!   cargo run --release --bin export_plan -- plan.json --format docx --output-dir out --cache-dir .cache
//!
//! Converter settings come from the `PLAN_EXPORT_*` environment variables;
//! set `RUST_LOG=debug` to trace cache and conversion decisions.

use plan_export::{
    ArtifactExporter, CacheStatus, ExportConfig, ExportFormat, ExportRequest, FsCache, PlanPayload,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

struct CliArgs {
    payload: PathBuf,
    format: ExportFormat,
    output_dir: PathBuf,
    cache_dir: PathBuf,
    entitled: Option<bool>,
}

impl CliArgs {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut payload = None;
        let mut format = ExportFormat::Pdf;
        let mut output_dir = PathBuf::from(".");
        let mut cache_dir = PathBuf::from(".plan-export-cache");
        let mut entitled = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--format" | "-f" => {
                    i += 1;
                    let raw = args.get(i).ok_or("--format needs a value")?;
                    format = raw.parse().map_err(|e| format!("{}", e))?;
                },
                "--output-dir" | "-o" => {
                    i += 1;
                    output_dir = PathBuf::from(args.get(i).ok_or("--output-dir needs a value")?);
                },
                "--cache-dir" => {
                    i += 1;
                    cache_dir = PathBuf::from(args.get(i).ok_or("--cache-dir needs a value")?);
                },
                "--entitled" => entitled = Some(true),
                "--preview" => entitled = Some(false),
                other if other.starts_with('-') => return Err(format!("unknown option {}", other)),
                other => payload = Some(PathBuf::from(other)),
            }
            i += 1;
        }

        Ok(Self {
            payload: payload.ok_or("missing payload path")?,
            format,
            output_dir,
            cache_dir,
            entitled,
        })
    }
}

fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut payload = PlanPayload::from_json(&std::fs::read(&args.payload)?)?;
    if let Some(entitled) = args.entitled {
        payload.entitled = entitled;
    }

    let exporter = ArtifactExporter::from_config(
        ExportConfig::from_env(),
        Arc::new(FsCache::new(&args.cache_dir)),
    );

    let start = Instant::now();
    let artifact = exporter.export(&ExportRequest::new(payload, args.format))?;
    let elapsed = start.elapsed();

    std::fs::create_dir_all(&args.output_dir)?;
    let out_path = args.output_dir.join(&artifact.file_name);
    std::fs::write(&out_path, &artifact.bytes)?;

    let status = match artifact.cache_status {
        CacheStatus::Hit => "cache hit",
        CacheStatus::Miss => "generated",
    };
    println!(
        "{} ({}, {} bytes, {}, {:.2}s)",
        out_path.display(),
        artifact.kind,
        artifact.bytes.len(),
        status,
        elapsed.as_secs_f64()
    );
    println!("fingerprint: {}", artifact.fingerprint);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match CliArgs::from_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: export_plan <payload.json> [--format pdf|docx] [--output-dir DIR] [--cache-dir DIR] [--entitled|--preview]");
            return ExitCode::from(2);
        },
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
