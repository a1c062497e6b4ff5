//! Local file headers: recover the score's name from a carved archive.
//!
//! A MuseScore package stores `META-INF/container.xml` first, the score
//! `<title>.mscx` second and a thumbnail third. Only the second local header
//! matters here.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::error::{CarveError, Result};
use crate::zip::signatures::SignatureScanner;

/// Fixed part of a local file header, signature included
pub const LOCAL_HEADER_FIXED_SIZE: usize = 30;

/// Offset of the file name length field inside a local header
const NAME_LENGTH_OFFSET: usize = 26;

const SCORE_EXTENSION: &str = "mscx";
const ARCHIVE_EXTENSION: &str = "mscz";

/// Name stored in a local file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryName {
    Utf8(String),
    /// Bytes that are not valid UTF-8, kept as found
    Raw(Vec<u8>),
}

impl EntryName {
    pub fn decode(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(name) => EntryName::Utf8(name.to_string()),
            Err(_) => EntryName::Raw(bytes.to_vec()),
        }
    }

    /// Printable form; invalid sequences become U+FFFD.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match self {
            EntryName::Utf8(name) => Cow::Borrowed(name),
            EntryName::Raw(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            EntryName::Utf8(name) => name.as_bytes(),
            EntryName::Raw(bytes) => bytes,
        }
    }

    /// The name as a path. Raw names keep their exact bytes on Unix.
    pub fn to_path(&self) -> Cow<'_, Path> {
        match self {
            EntryName::Utf8(name) => Cow::Borrowed(Path::new(name)),
            #[cfg(unix)]
            EntryName::Raw(bytes) => {
                use std::ffi::OsStr;
                use std::os::unix::ffi::OsStrExt;
                Cow::Borrowed(Path::new(OsStr::from_bytes(bytes)))
            }
            #[cfg(not(unix))]
            EntryName::Raw(_) => Cow::Owned(PathBuf::from(self.to_string_lossy().into_owned())),
        }
    }

    /// Whether the name is a `.mscx` file (case-sensitive).
    ///
    /// Directory entries end in `/` and never count, whatever precedes it.
    pub fn is_score(&self) -> bool {
        if self.as_bytes().ends_with(b"/") {
            return false;
        }
        self.to_path()
            .extension()
            .is_some_and(|ext| ext == SCORE_EXTENSION)
    }

    /// `<title>.mscz` for a score name, using only its last path component.
    ///
    /// Returns `None` when the name is not a `.mscx` score.
    pub fn mscz_file_name(&self) -> Option<PathBuf> {
        if !self.is_score() {
            return None;
        }
        let path = self.to_path();
        let file_name = path.file_name()?;
        Some(Path::new(file_name).with_extension(ARCHIVE_EXTENSION))
    }
}

/// Decoded view of one local file header
#[derive(Debug, Clone, Copy)]
struct LocalHeaderRef<'a> {
    index: usize,
    name: &'a [u8],
}

impl<'a> LocalHeaderRef<'a> {
    fn parse(archive: &'a [u8], index: usize, at: usize) -> Result<Self> {
        let available = archive.len().saturating_sub(at);
        if available < LOCAL_HEADER_FIXED_SIZE {
            return Err(CarveError::TruncatedRecord {
                structure: "local file header",
                at,
                needed: LOCAL_HEADER_FIXED_SIZE,
                available,
            });
        }

        let name_len = u16::from_le_bytes([
            archive[at + NAME_LENGTH_OFFSET],
            archive[at + NAME_LENGTH_OFFSET + 1],
        ]) as usize;
        let name_start = at + LOCAL_HEADER_FIXED_SIZE;
        let name_end = name_start + name_len;

        if name_end > archive.len() {
            return Err(CarveError::TruncatedRecord {
                structure: "local file name",
                at: name_start,
                needed: name_len,
                available: archive.len() - name_start,
            });
        }

        Ok(Self {
            index,
            name: &archive[name_start..name_end],
        })
    }
}

/// Name of the second entry, or why it could not be read.
pub fn second_entry_name(archive: &[u8]) -> Result<EntryName> {
    let scanner = SignatureScanner::local_header();
    let at = scanner
        .find_all(archive)
        .nth(1)
        .ok_or(CarveError::FewerThanTwoLocalHeaders)?;

    let header = LocalHeaderRef::parse(archive, 1, at)?;
    tracing::trace!(index = header.index, at, name_len = header.name.len(), "Second local header");
    Ok(EntryName::decode(header.name))
}

/// Name of the second entry, `None` for a malformed candidate
pub fn extract_second_entry_name(archive: &[u8]) -> Option<EntryName> {
    second_entry_name(archive).ok()
}
