//! The 64-byte table record shared by the bucket table and the popular table.

/// Number of pattern slots per record.
pub const D: usize = 16;

/// Serialized size of one record in bytes.
pub const RECORD_BYTES: usize = 64;

/// Serialized header size in bytes (database struct padded to a cache line).
pub const HEADER_BYTES: usize = 64;

/// Safety pad after the last blob string: equality compares run in 16-byte
/// chunks and may touch bytes past the stored pattern.
pub const BLOB_TAIL_PAD: usize = 256;

/// Hard cap on the number of popular suffixes kept in a database.
pub const MAX_POPULAR_SUFFIXES: usize = 256;

/// Headroom added to place-size estimates so an arbitrary caller buffer can
/// be realigned to a cache line.
pub const ALIGN_HEADROOM: usize = 64;

/// Round `x` up to the next multiple of 16.
#[inline]
pub fn round_up16(x: usize) -> usize {
    (x + 15) & !15
}

/// One bucket of the two-stage table. The same layout serves the main table
/// and the popular-suffix table; only the strings it points at differ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRecord {
    /// 16-bit tags of the patterns in this record. The same tag may appear
    /// in several slots when tags collide within the bucket.
    pub tags: [u16; D],
    /// Per-slot offsets in units of `D` bytes from `base_off`.
    pub offsets: [u8; D],
    /// Byte offset of this record's first string in the domains blob.
    pub base_off: u32,
    /// Number of used slots; empty slots sit at the end.
    pub used: u16,
    /// Deepest left-extension any pattern assigned to this bucket required
    /// at calibration. Lookups never scan past it, which keeps pathological
    /// hosts with many short labels from burning CPU.
    pub max_scans: u16,
}

impl TableRecord {
    /// Scan the record for `tag` and compare each candidate slot's stored
    /// pattern against `suffix`. The stored terminating NUL participates in
    /// the compare, so a longer blob pattern sharing the prefix never
    /// produces a false positive.
    #[inline]
    pub fn scan(&self, tag: u16, blob: &[u8], suffix: &[u8]) -> bool {
        let used = usize::from(self.used);
        if used == 0 {
            return false;
        }

        // All 16 lanes compared at once, collapsed to a bitmask and limited
        // to the used slots; candidates are then checked one by one.
        let mut mask = 0u32;
        for i in 0..D {
            mask |= u32::from(self.tags[i] == tag) << i;
        }
        mask &= (1u32 << used) - 1;

        while mask != 0 {
            let i = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            let pos = self.base_off as usize + usize::from(self.offsets[i]) * D;
            let end = pos + suffix.len();
            if end >= blob.len() {
                continue;
            }
            if &blob[pos..end] == suffix && blob[end] == 0 {
                return true;
            }
        }
        false
    }

    /// Encode into a 64-byte little-endian slot.
    pub fn encode_into(&self, dst: &mut [u8]) {
        for (i, tag) in self.tags.iter().enumerate() {
            dst[i * 2..i * 2 + 2].copy_from_slice(&tag.to_le_bytes());
        }
        dst[32..48].copy_from_slice(&self.offsets);
        // Bytes 48..56 mirror the in-memory blob pointer; always zero on disk.
        dst[48..56].fill(0);
        dst[56..58].copy_from_slice(&self.used.to_le_bytes());
        dst[58..60].copy_from_slice(&self.max_scans.to_le_bytes());
        dst[60..64].copy_from_slice(&self.base_off.to_le_bytes());
    }

    /// Decode from a 64-byte little-endian slot.
    pub fn decode_from(src: &[u8]) -> TableRecord {
        let mut rec = TableRecord::default();
        for i in 0..D {
            rec.tags[i] = u16::from_le_bytes([src[i * 2], src[i * 2 + 1]]);
        }
        rec.offsets.copy_from_slice(&src[32..48]);
        rec.used = u16::from_le_bytes([src[56], src[57]]);
        rec.max_scans = u16::from_le_bytes([src[58], src[59]]);
        rec.base_off = u32::from_le_bytes([src[60], src[61], src[62], src[63]]);
        rec
    }
}
