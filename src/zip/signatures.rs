//! Literal signature search over byte buffers.
//!
//! Matches are plain substring hits. Nothing here checks that the bytes
//! after a hit form a real ZIP structure; callers validate.

use memchr::memmem::{FindIter, Finder};

/// End of central directory record: `50 4B 05 06`
pub const EOCD_SIGNATURE: &[u8; 4] = b"PK\x05\x06";

/// Local file header: `50 4B 03 04`
pub const LOCAL_HEADER_SIGNATURE: &[u8; 4] = b"PK\x03\x04";

/// Precompiled finder for one signature
#[derive(Debug, Clone)]
pub struct SignatureScanner {
    finder: Finder<'static>,
}

impl SignatureScanner {
    pub fn new(signature: &'static [u8]) -> Self {
        Self {
            finder: Finder::new(signature),
        }
    }

    #[must_use]
    pub fn eocd() -> Self {
        Self::new(EOCD_SIGNATURE)
    }

    #[must_use]
    pub fn local_header() -> Self {
        Self::new(LOCAL_HEADER_SIGNATURE)
    }

    pub fn signature(&self) -> &[u8] {
        self.finder.needle()
    }

    /// Start offsets of every non-overlapping occurrence in `buffer`, ascending.
    ///
    /// The iterator borrows `buffer` and leaves it untouched, so calling this
    /// again on the same buffer yields the same offsets.
    pub fn find_all<'s, 'h>(&'s self, buffer: &'h [u8]) -> FindIter<'h, 's> {
        self.finder.find_iter(buffer)
    }
}
