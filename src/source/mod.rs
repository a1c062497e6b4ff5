//! Input medium access.
//!
//! [`ByteWindow`] gives positioned reads over a regular file or a raw block
//! device. Nothing is cached: every [`ByteWindow::read_at`] seeks and reads
//! again, so the memory held at any time is whatever the caller asked for.

pub mod disk;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CarveError, Result};

/// What kind of medium backs a [`ByteWindow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediumKind {
    /// Regular file (disk image, dump, damaged file)
    File,
    /// Raw block device such as `/dev/sdb1`
    BlockDevice,
}

/// Positioned, uncached reader over the input medium
#[derive(Debug)]
pub struct ByteWindow {
    path: PathBuf,
    file: File,
    kind: MediumKind,
    total_length: u64,
}

impl ByteWindow {
    /// Open `path` read-only and work out its size.
    ///
    /// Block devices stat as zero bytes, so their size comes from
    /// [`disk::block_device_size`]. A non-regular file that reports zero
    /// bytes is treated the same way even when `kind` says `File`.
    pub fn open(path: &Path, kind: MediumKind) -> Result<Self> {
        let file = File::open(path)?;
        let metadata = file.metadata()?;

        let (kind, total_length) = match kind {
            MediumKind::BlockDevice => (kind, disk::block_device_size(&file, path)?),
            MediumKind::File if metadata.len() == 0 && !metadata.is_file() => {
                tracing::debug!(
                    path = %path.display(),
                    "Medium reports zero length, trying block device size"
                );
                (
                    MediumKind::BlockDevice,
                    disk::block_device_size(&file, path)?,
                )
            }
            MediumKind::File => (kind, metadata.len()),
        };

        tracing::debug!(path = %path.display(), ?kind, total_length, "Opened medium");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            kind,
            total_length,
        })
    }

    /// Size of the underlying medium in bytes
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn kind(&self) -> MediumKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read `length` bytes starting at `offset`.
    ///
    /// Returns fewer bytes only when the medium ends first. Reading at or
    /// past the end yields an empty buffer, not an error.
    pub fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let capacity = usize::try_from(length).map_err(|_| {
            CarveError::InvalidArgument(format!("read of {length} bytes does not fit in memory"))
        })?;
        let capacity = capacity.min(self.total_length.saturating_sub(offset) as usize);

        let mut handle = &self.file;
        handle.seek(SeekFrom::Start(offset))?;

        let mut buf = Vec::with_capacity(capacity);
        handle.take(length).read_to_end(&mut buf)?;
        Ok(buf)
    }
}
