//! The few ZIP structures the carver reads.
//!
//! Only what is needed to find an archive in raw bytes and name it: the
//! end of central directory record and the local file headers. Archives
//! are never decompressed or checked against their CRCs.

pub mod eocd;
pub mod local;
pub mod signatures;

pub use eocd::{CandidateArchive, EocdRecord, EOCD_FIXED_SIZE, MSCZ_ENTRY_COUNT};
pub use local::{extract_second_entry_name, second_entry_name, EntryName};
pub use signatures::{SignatureScanner, EOCD_SIGNATURE, LOCAL_HEADER_SIGNATURE};
