//! mscz-recover Library
//!
//! Recovers MuseScore project archives (`.mscz`, which are ZIP files) from
//! raw bytes: disk images, wiped filesystems, block devices, or partially
//! overwritten files. Filesystem metadata is never consulted; archives are
//! found by their ZIP end-of-central-directory records.
//!
//! # Features
//!
//! - **Bounded memory**: chunked scanning with a fixed overlap
//! - **Two-stage acceptance**: 3-entry pre-filter, then a `.mscx` name check
//! - **Read-only input**: the medium is only opened for reading
//! - **Collision-free output**: `title.mscz`, `title_(1).mscz`, ...
//!
//! # Example
//!
//! ```no_run
//! use mscz_recover::carve::{CarveOptions, Carver};
//! use mscz_recover::export::DirectorySink;
//! use std::path::{Path, PathBuf};
//!
//! fn main() -> anyhow::Result<()> {
//!     let carver = Carver::new(CarveOptions {
//!         source: PathBuf::from("/tmp/usb-stick.img"),
//!         ..Default::default()
//!     })?;
//!
//!     let mut sink = DirectorySink::create(Path::new("out"))?;
//!     let (files, _result) = carver.carve(&mut sink)?;
//!
//!     println!("Recovered {} scores", files.len());
//!     Ok(())
//! }
//! ```

pub mod carve;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod progress;
pub mod source;
pub mod zip;

// Re-export commonly used types
pub use carve::{
    ArchiveSink, CarveOptions, CarveResult, Carver, DiscardSink, RecoveredArchive, RecoveredFile,
    ScanCursor, ScanStep,
};
pub use config::Config;
pub use error::{CarveError, Result};
pub use export::{safe_output_path, DirectorySink};
pub use source::{ByteWindow, MediumKind};
pub use zip::{CandidateArchive, EntryName, EocdRecord, SignatureScanner};
