//! Carving driver - recover `.mscz` archives from a raw medium.
//!
//! The medium is read in fixed-size chunks. Each chunk is searched for ZIP
//! end-of-central-directory signatures; every hit goes through the same
//! pipeline:
//!
//! 1. decode the EOCD record (re-read from the medium if the chunk cut it)
//! 2. pre-filter on the 3-entry MuseScore layout
//! 3. compute the archive span backwards from the record
//! 4. re-read the span and take the name of the second local header
//! 5. accept only if that name is a `.mscx` score
//!
//! # Design
//!
//! - **Bounded memory**: one chunk buffer plus, while a candidate is being
//!   checked, one archive buffer
//! - **Overlap**: each chunk after the first starts `OVERLAP_MARGIN` bytes
//!   before the previous one ended, so a signature split by the boundary is
//!   seen whole in the next chunk. Hits that were already whole in the
//!   previous chunk are not processed twice.
//! - **Explicit state**: [`ScanCursor`] is passed into [`Carver::step`],
//!   which returns the next cursor or [`ScanStep::Done`]
//! - **Local failures**: a bad candidate is logged at debug level and
//!   skipped. Only medium I/O errors stop the scan.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{CarveError, Result};
use crate::source::{ByteWindow, MediumKind};
use crate::zip::{
    second_entry_name, EntryName, EocdRecord, SignatureScanner, EOCD_FIXED_SIZE, EOCD_SIGNATURE,
};

/// Default chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: u64 = 16_000_000;

/// Bytes re-read at the start of every chunk after the first
pub const OVERLAP_MARGIN: u64 = 2 * EOCD_SIGNATURE.len() as u64;

/// Options for a carve run
#[derive(Debug, Clone)]
pub struct CarveOptions {
    /// Input medium: disk image, damaged file, or block device
    pub source: PathBuf,
    /// How to size the medium
    pub medium: MediumKind,
    /// Absolute offset where scanning starts
    pub seek: u64,
    /// Bytes read per chunk
    pub chunk_size: u64,
    /// Approximate span to process; only used for progress reporting
    pub parse_len: Option<u64>,
}

impl Default for CarveOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            medium: MediumKind::File,
            seek: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            parse_len: None,
        }
    }
}

/// An accepted archive, read back from the medium
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredArchive {
    /// Absolute offset of the first archive byte
    pub offset: u64,
    /// Raw archive bytes, exactly as found
    pub bytes: Vec<u8>,
    /// Name of the score entry inside the archive
    pub entry_name: EntryName,
    /// `<title>.mscz`, before collision handling
    pub file_name: PathBuf,
    /// Blake3 hex digest of `bytes`
    pub hash: String,
}

impl RecoveredArchive {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Summary record for one recovered archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveredFile {
    pub offset: u64,
    pub size: u64,
    /// Score entry name as stored in the archive
    pub entry_name: String,
    /// Where the archive was written; `None` for a dry run or a failed write
    pub path: Option<PathBuf>,
    pub hash: String,
}

/// Counters for a carve run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarveResult {
    pub medium_size: u64,
    pub bytes_scanned: u64,
    pub chunks: u64,
    pub signatures_found: usize,
    pub candidates: usize,
    pub rejected: usize,
    pub archives_recovered: usize,
    pub archives_written: usize,
    pub write_failures: usize,
    pub bytes_recovered: u64,
    pub duration_ms: u64,
    pub cancelled: bool,
}

/// Output collaborator for accepted archives
pub trait ArchiveSink {
    /// Store `archive`; returns where it went, if anywhere.
    fn persist(&mut self, archive: &RecoveredArchive) -> io::Result<Option<PathBuf>>;
}

/// Sink that keeps nothing (dry run)
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl ArchiveSink for DiscardSink {
    fn persist(&mut self, _archive: &RecoveredArchive) -> io::Result<Option<PathBuf>> {
        Ok(None)
    }
}

impl ArchiveSink for Vec<RecoveredArchive> {
    fn persist(&mut self, archive: &RecoveredArchive) -> io::Result<Option<PathBuf>> {
        self.push(archive.clone());
        Ok(None)
    }
}

/// Scan progress between chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCursor {
    /// Start of the chunk last read (or of the first chunk to read)
    pub chunk_start: u64,
    /// End of the chunk last read; `None` before the first read
    pub chunk_end: Option<u64>,
    pub overlap_margin: u64,
}

impl ScanCursor {
    pub fn new(seek: u64) -> Self {
        Self {
            chunk_start: seek,
            chunk_end: None,
            overlap_margin: OVERLAP_MARGIN,
        }
    }

    /// Where the next chunk begins
    pub fn next_chunk_start(&self) -> u64 {
        match self.chunk_end {
            Some(end) => end - self.overlap_margin,
            None => self.chunk_start,
        }
    }
}

/// Result of one [`Carver::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    /// Chunk processed; continue from this cursor
    Continue(ScanCursor),
    /// Input exhausted
    Done,
}

/// The carving driver
pub struct Carver {
    options: CarveOptions,
    window: ByteWindow,
    eocd: SignatureScanner,
}

impl Carver {
    /// Open the medium named in `options`.
    pub fn new(options: CarveOptions) -> Result<Self> {
        if options.chunk_size <= OVERLAP_MARGIN {
            return Err(CarveError::InvalidArgument(format!(
                "chunk size {} must be larger than the {} byte overlap",
                options.chunk_size, OVERLAP_MARGIN
            )));
        }

        let window = ByteWindow::open(&options.source, options.medium)?;

        Ok(Self {
            options,
            window,
            eocd: SignatureScanner::eocd(),
        })
    }

    pub fn options(&self) -> &CarveOptions {
        &self.options
    }

    pub fn medium_size(&self) -> u64 {
        self.window.total_length()
    }

    pub fn source(&self) -> &Path {
        self.window.path()
    }

    /// Bytes the run is expected to cover, for progress display
    pub fn parse_size(&self) -> u64 {
        self.options
            .parse_len
            .unwrap_or_else(|| self.medium_size().saturating_sub(self.options.seek))
    }

    /// Scan the whole medium, handing accepted archives to `sink`.
    ///
    /// `cancel` is checked between chunks. `on_progress` receives the bytes
    /// processed since `seek` and a short status message.
    pub fn carve_with_progress<S, F>(
        &self,
        sink: &mut S,
        cancel: &AtomicBool,
        mut on_progress: F,
    ) -> Result<(Vec<RecoveredFile>, CarveResult)>
    where
        S: ArchiveSink + ?Sized,
        F: FnMut(u64, &str),
    {
        let start = Instant::now();
        let seek = self.options.seek;

        let mut result = CarveResult {
            medium_size: self.medium_size(),
            ..Default::default()
        };
        let mut files: Vec<RecoveredFile> = Vec::new();
        let mut write_failures = 0usize;

        tracing::info!(
            source = %self.source().display(),
            medium_size = result.medium_size,
            parse_size = self.parse_size(),
            seek,
            chunk_size = self.options.chunk_size,
            "Starting .mscz carve"
        );

        let mut cursor = ScanCursor::new(seek);
        loop {
            if cancel.load(Ordering::Relaxed) {
                tracing::warn!(at = cursor.next_chunk_start(), "Scan cancelled");
                result.cancelled = true;
                break;
            }

            let chunk_start = cursor.next_chunk_start();
            let msg = format!("Reading chunk at {chunk_start:#x}");
            tracing::debug!("{}", msg);
            on_progress(chunk_start.saturating_sub(seek), &msg);

            let step = self.step(cursor, &mut result, &mut |archive: RecoveredArchive| {
                let path = match sink.persist(&archive) {
                    Ok(path) => {
                        if let Some(ref p) = path {
                            tracing::info!(
                                name = %archive.file_name.display(),
                                path = %p.display(),
                                "Saved recovered archive"
                            );
                        }
                        path
                    }
                    Err(e) => {
                        tracing::warn!(
                            name = %archive.file_name.display(),
                            offset = archive.offset,
                            error = %e,
                            "Failed to write recovered archive"
                        );
                        write_failures += 1;
                        None
                    }
                };

                files.push(RecoveredFile {
                    offset: archive.offset,
                    size: archive.len(),
                    entry_name: archive.entry_name.to_string_lossy().into_owned(),
                    path,
                    hash: archive.hash,
                });
            })?;

            match step {
                ScanStep::Continue(next) => cursor = next,
                ScanStep::Done => break,
            }
        }

        if result.cancelled {
            on_progress(cursor.next_chunk_start().saturating_sub(seek), "Cancelled");
        } else {
            on_progress(self.parse_size(), "Reached end of input");
        }

        result.archives_recovered = files.len();
        result.archives_written = files.iter().filter(|f| f.path.is_some()).count();
        result.write_failures = write_failures;
        result.bytes_recovered = files.iter().map(|f| f.size).sum();
        result.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            chunks = result.chunks,
            bytes_scanned = result.bytes_scanned,
            signatures = result.signatures_found,
            candidates = result.candidates,
            rejected = result.rejected,
            recovered = result.archives_recovered,
            write_failures = result.write_failures,
            duration_ms = result.duration_ms,
            "Carve complete"
        );

        Ok((files, result))
    }

    /// Scan without progress or cancellation (tests, library use)
    pub fn carve<S: ArchiveSink + ?Sized>(
        &self,
        sink: &mut S,
    ) -> Result<(Vec<RecoveredFile>, CarveResult)> {
        self.carve_with_progress(sink, &AtomicBool::new(false), |_, _| {})
    }

    /// Read and process the chunk after `cursor`.
    ///
    /// Accepted archives go to `on_archive` in ascending offset order.
    /// Rejected candidates only bump `stats.rejected`.
    pub fn step(
        &self,
        cursor: ScanCursor,
        stats: &mut CarveResult,
        on_archive: &mut dyn FnMut(RecoveredArchive),
    ) -> Result<ScanStep> {
        let chunk_start = cursor.next_chunk_start();
        let chunk = self.window.read_at(chunk_start, self.options.chunk_size)?;

        let expected = self
            .options
            .chunk_size
            .min(self.medium_size().saturating_sub(chunk_start));
        if (chunk.len() as u64) < expected {
            return Err(medium_shrank(chunk_start, chunk.len(), expected));
        }

        if chunk.len() as u64 <= cursor.overlap_margin {
            tracing::debug!(at = chunk_start, read = chunk.len(), "Reached end of input");
            return Ok(ScanStep::Done);
        }

        let chunk_end = chunk_start + chunk.len() as u64;
        stats.chunks += 1;
        stats.bytes_scanned += match cursor.chunk_end {
            Some(prev_end) => chunk_end - prev_end,
            None => chunk.len() as u64,
        };

        let sig_len = EOCD_SIGNATURE.len() as u64;
        for pos in self.eocd.find_all(&chunk) {
            let offset = chunk_start + pos as u64;

            // already seen whole at the tail of the previous chunk
            if cursor.chunk_end.is_some_and(|prev_end| offset + sig_len <= prev_end) {
                continue;
            }
            stats.signatures_found += 1;

            match self.examine(&chunk, pos, offset, stats) {
                Ok(archive) => {
                    tracing::info!(
                        offset = %format!("{:#x}", archive.offset),
                        size = archive.len(),
                        name = %archive.entry_name.to_string_lossy(),
                        "Found a ZIP matching a .mscz file"
                    );
                    on_archive(archive);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    stats.rejected += 1;
                    tracing::debug!(
                        offset = %format!("{offset:#x}"),
                        reason = %e,
                        "Rejected candidate"
                    );
                }
            }
        }

        Ok(ScanStep::Continue(ScanCursor {
            chunk_start,
            chunk_end: Some(chunk_end),
            overlap_margin: cursor.overlap_margin,
        }))
    }

    /// Run one EOCD hit through the acceptance pipeline.
    fn examine(
        &self,
        chunk: &[u8],
        pos: usize,
        offset: u64,
        stats: &mut CarveResult,
    ) -> Result<RecoveredArchive> {
        let record = match EocdRecord::parse(chunk, pos) {
            Ok(record) => record,
            Err(CarveError::TruncatedRecord { .. }) => {
                let fixed = self.window.read_at(offset, EOCD_FIXED_SIZE as u64)?;
                EocdRecord::parse(&fixed, 0)?
            }
            Err(e) => return Err(e),
        };

        if !record.is_mscz_candidate() {
            return Err(CarveError::EntryCountMismatch {
                this_disk: record.entries_this_disk,
                total: record.entries_total,
            });
        }
        stats.candidates += 1;

        let candidate = record.locate(offset)?;
        let medium_size = self.medium_size();
        if candidate.end_offset() > medium_size {
            return Err(CarveError::SpanExceedsInput {
                start: candidate.start_offset,
                length: candidate.length,
                medium_size,
            });
        }

        let bytes = self.window.read_at(candidate.start_offset, candidate.length)?;
        if (bytes.len() as u64) < candidate.length {
            return Err(medium_shrank(
                candidate.start_offset,
                bytes.len(),
                candidate.length,
            ));
        }

        let entry_name = second_entry_name(&bytes)?;
        let file_name = entry_name
            .mscz_file_name()
            .ok_or_else(|| CarveError::NotMuseScore {
                name: entry_name.to_string_lossy().into_owned(),
            })?;

        let hash = hex::encode(blake3::hash(&bytes).as_bytes());

        Ok(RecoveredArchive {
            offset: candidate.start_offset,
            bytes,
            entry_name,
            file_name,
            hash,
        })
    }
}

/// A read inside the medium's known size came back short.
fn medium_shrank(at: u64, got: usize, wanted: u64) -> CarveError {
    CarveError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("medium ended after {got} of {wanted} bytes at {at:#x}"),
    ))
}
