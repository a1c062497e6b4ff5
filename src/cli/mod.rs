//! CLI module - Command line interface definitions and handlers

pub mod recover;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::carve::CarveOptions;
use crate::config::Config;
use crate::source::MediumKind;

/// mscz-recover - carve MuseScore .mscz files out of raw bytes
///
/// Scans a disk image, block device, or damaged file for ZIP archives laid
/// out like MuseScore projects and saves each one as `<title>.mscz`. The
/// input is only ever read.
#[derive(Parser, Debug, Clone)]
#[command(name = "mscz-recover")]
#[command(version)]
#[command(about = "Recover .mscz MuseScore files", long_about = None)]
pub struct Cli {
    /// Path to the file or device to parse
    #[arg(long = "file-path", short = 'f', required = true)]
    pub file_path: PathBuf,

    /// Directory for recovered files [default: out]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Start offset in bytes
    #[arg(long, short = 's', default_value = "0")]
    pub seek: u64,

    /// Chunk size in bytes [default: 16000000]
    #[arg(long, short = 'c')]
    pub chunk_size: Option<u64>,

    /// How many bytes to parse (approximately, for progress only)
    #[arg(long, short = 'l')]
    pub parse_len: Option<u64>,

    /// The input is a disk, e.g. /dev/sdb1
    #[arg(long)]
    pub disk: bool,

    /// Log at DEBUG level
    #[arg(long)]
    pub verbose: bool,

    /// Config file (default: platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Scan and report without writing files
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Summary format
    #[arg(long, value_enum, default_value = "human")]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable (default)
    Human,
    /// JSON output
    Json,
}

impl Cli {
    /// Scan options with config-file values filling unset flags
    pub fn carve_options(&self, config: &Config) -> CarveOptions {
        CarveOptions {
            source: self.file_path.clone(),
            medium: if self.disk {
                MediumKind::BlockDevice
            } else {
                MediumKind::File
            },
            seek: self.seek,
            chunk_size: self.chunk_size.unwrap_or(config.scan.chunk_size),
            parse_len: self.parse_len,
        }
    }

    pub fn output_dir(&self, config: &Config) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| config.scan.output_dir.clone())
    }

    /// Log level directive for this run
    pub fn log_level<'a>(&self, config: &'a Config) -> &'a str {
        if self.verbose {
            "debug"
        } else {
            &config.general.log_level
        }
    }
}

const LOG_TARGET: &str = "mscz_recover";

/// Log filter from `RUST_LOG` (if set) and the run's level for this crate.
///
/// The level only fills in when `RUST_LOG` says nothing about
/// `mscz_recover`, so an explicit `RUST_LOG=mscz_recover=trace` wins.
pub fn log_filter(rust_log: Option<&str>, level: &str) -> anyhow::Result<EnvFilter> {
    let default = format!("{LOG_TARGET}={level}");
    let filter = match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) if directives.contains(LOG_TARGET) => {
            EnvFilter::try_new(directives)?
        }
        Some(directives) => EnvFilter::try_new(directives)?.add_directive(default.parse()?),
        None => EnvFilter::try_new(default)?,
    };
    Ok(filter)
}
