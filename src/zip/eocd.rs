//! End of central directory record: decode, pre-filter, and locate.

use serde::{Deserialize, Serialize};

use crate::error::{CarveError, Result};

/// Fixed part of the EOCD record, signature included
pub const EOCD_FIXED_SIZE: usize = 22;

/// Entries in a MuseScore package: container.xml, the score, a thumbnail
pub const MSCZ_ENTRY_COUNT: u16 = 3;

/// Fields of an EOCD record the carver needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EocdRecord {
    pub entries_this_disk: u16,
    pub entries_total: u16,
    pub central_dir_size: u32,
    pub central_dir_offset: u32,
    pub comment_length: u16,
}

impl EocdRecord {
    /// Decode the record whose signature starts at `buffer[at]`.
    ///
    /// Layout relative to the signature: disk numbers at +4 and +6 (skipped),
    /// entry counts at +8 and +10, directory size at +12, directory offset
    /// at +16, comment length at +20. All little-endian.
    pub fn parse(buffer: &[u8], at: usize) -> Result<Self> {
        let available = buffer.len().saturating_sub(at);
        if available < EOCD_FIXED_SIZE {
            return Err(CarveError::TruncatedRecord {
                structure: "EOCD record",
                at,
                needed: EOCD_FIXED_SIZE,
                available,
            });
        }
        let rec = &buffer[at..at + EOCD_FIXED_SIZE];

        Ok(Self {
            entries_this_disk: u16::from_le_bytes([rec[8], rec[9]]),
            entries_total: u16::from_le_bytes([rec[10], rec[11]]),
            central_dir_size: u32::from_le_bytes([rec[12], rec[13], rec[14], rec[15]]),
            central_dir_offset: u32::from_le_bytes([rec[16], rec[17], rec[18], rec[19]]),
            comment_length: u16::from_le_bytes([rec[20], rec[21]]),
        })
    }

    /// Cheap pre-filter: exactly three entries on this disk and in total.
    ///
    /// Any 3-entry ZIP passes; the `.mscx` name check decides for real.
    pub fn is_mscz_candidate(&self) -> bool {
        self.entries_this_disk == MSCZ_ENTRY_COUNT && self.entries_total == MSCZ_ENTRY_COUNT
    }

    /// Bytes from archive start to the end of the fixed record
    pub fn archive_length(&self) -> u64 {
        u64::from(self.central_dir_size)
            + u64::from(self.central_dir_offset)
            + u64::from(self.comment_length)
            + EOCD_FIXED_SIZE as u64
    }

    /// Work out where the archive that ends with this record begins.
    ///
    /// The span ends right after the fixed record at `eocd_offset`. A length
    /// that reaches before offset 0 means the fields are junk.
    pub fn locate(&self, eocd_offset: u64) -> Result<CandidateArchive> {
        let end = eocd_offset + EOCD_FIXED_SIZE as u64;
        let length = self.archive_length();

        let start_offset = end
            .checked_sub(length)
            .ok_or(CarveError::NegativeSpan { end, length })?;

        Ok(CandidateArchive {
            start_offset,
            length,
        })
    }
}

/// Absolute span of an archive inferred from a validated EOCD record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateArchive {
    pub start_offset: u64,
    pub length: u64,
}

impl CandidateArchive {
    /// Offset just past the fixed EOCD record
    pub fn end_offset(&self) -> u64 {
        self.start_offset + self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::signatures::EOCD_SIGNATURE;

    fn record_bytes(this_disk: u16, total: u16, cd_size: u32, cd_offset: u32, comment: u16) -> Vec<u8> {
        let mut rec = EOCD_SIGNATURE.to_vec();
        rec.extend_from_slice(&0u16.to_le_bytes());
        rec.extend_from_slice(&0u16.to_le_bytes());
        rec.extend_from_slice(&this_disk.to_le_bytes());
        rec.extend_from_slice(&total.to_le_bytes());
        rec.extend_from_slice(&cd_size.to_le_bytes());
        rec.extend_from_slice(&cd_offset.to_le_bytes());
        rec.extend_from_slice(&comment.to_le_bytes());
        rec
    }

    #[test]
    fn parses_fields_at_fixed_offsets() {
        let mut buf = vec![0xEEu8; 5];
        buf.extend(record_bytes(3, 3, 0x0102, 0x0A0B0C0D, 7));

        let rec = EocdRecord::parse(&buf, 5).unwrap();
        assert_eq!(
            rec,
            EocdRecord {
                entries_this_disk: 3,
                entries_total: 3,
                central_dir_size: 0x0102,
                central_dir_offset: 0x0A0B0C0D,
                comment_length: 7,
            }
        );
    }

    #[test]
    fn truncated_record_is_reported() {
        let buf = record_bytes(3, 3, 10, 10, 0);
        let err = EocdRecord::parse(&buf[..21], 0).unwrap_err();
        assert!(matches!(
            err,
            CarveError::TruncatedRecord { needed: 22, available: 21, .. }
        ));
        assert!(EocdRecord::parse(&buf, 30).is_err());
    }

    #[test]
    fn candidate_needs_three_on_both_counts() {
        let rec = |a, b| EocdRecord::parse(&record_bytes(a, b, 0, 0, 0), 0).unwrap();
        assert!(rec(3, 3).is_mscz_candidate());
        assert!(!rec(3, 4).is_mscz_candidate());
        assert!(!rec(2, 3).is_mscz_candidate());
        assert!(!rec(1, 1).is_mscz_candidate());
    }

    #[test]
    fn locate_ends_after_fixed_record() {
        let rec = EocdRecord::parse(&record_bytes(3, 3, 150, 1000, 0), 0).unwrap();
        let cand = rec.locate(5000 + 1000 + 150).unwrap();
        assert_eq!(cand.length, 1000 + 150 + 22);
        assert_eq!(cand.start_offset, 5000);
        assert_eq!(cand.end_offset(), 5000 + 1000 + 150 + 22);
    }

    #[test]
    fn locate_counts_comment_in_length() {
        let rec = EocdRecord::parse(&record_bytes(3, 3, 100, 400, 12), 0).unwrap();
        let cand = rec.locate(10_000).unwrap();
        assert_eq!(cand.length, 100 + 400 + 12 + 22);
        assert_eq!(cand.end_offset(), 10_000 + 22);
    }

    #[test]
    fn locate_rejects_span_before_zero() {
        let rec = EocdRecord::parse(&record_bytes(3, 3, 100, u32::MAX, 0), 0).unwrap();
        let err = rec.locate(64).unwrap_err();
        assert!(matches!(err, CarveError::NegativeSpan { end: 86, .. }));
    }

    #[test]
    fn archive_at_offset_zero() {
        let rec = EocdRecord::parse(&record_bytes(3, 3, 50, 200, 0), 0).unwrap();
        let cand = rec.locate(250).unwrap();
        assert_eq!(cand.start_offset, 0);
    }
}
