//! Placement-stable serialization.
//!
//! Layout, all little-endian:
//!
//! ```text
//! offset 0  : 4-byte magic 0x53444D48
//! offset 4  : 64-byte header
//! offset 68 : popular_records x 64-byte records
//!           : buckets x 64-byte records
//!           : domains blob
//! ```
//!
//! The header mirrors the in-memory database struct of the original format;
//! its pointer fields are written as zero and never trusted on read. All
//! intra-database references are byte offsets, so deserialization is a
//! validated section copy, not a pointer fixup.

use crate::ascii::MAX_DOMAIN_LEN;
use crate::error::{DomainSetError, Result};
use crate::hash::compute_m_u32;
use crate::record::{
    TableRecord, ALIGN_HEADROOM, BLOB_TAIL_PAD, D, HEADER_BYTES, MAX_POPULAR_SUFFIXES,
    RECORD_BYTES,
};
use crate::set::StaticDomainSet;

/// "HMDS" in little-endian byte order.
const MAGIC: u32 = 0x53444D48;

// Field offsets inside the 64-byte header.
const HDR_FASTMOD_M: usize = 0;
const HDR_BUCKETS: usize = 8;
const HDR_HASH_SEED: usize = 12;
const HDR_POPULAR_RECORDS: usize = 32;
const HDR_POPULAR_COUNT: usize = 36;
const HDR_BLOB_SIZE: usize = 48;

struct Header {
    fastmod_m: u64,
    buckets: u32,
    seed: u32,
    popular_records: u32,
    popular_count: u32,
    blob_size: u64,
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(b)
}

/// Parse magic + header and validate every field that can be checked
/// without the record sections.
fn parse_header(buf: &[u8]) -> Result<Header> {
    if buf.len() < 4 + HEADER_BYTES {
        return Err(DomainSetError::SmallPlace {
            need: 4 + HEADER_BYTES,
            got: buf.len(),
        });
    }
    if read_u32(buf, 0) != MAGIC {
        return Err(DomainSetError::BadValue("bad magic".to_string()));
    }
    let hdr = &buf[4..4 + HEADER_BYTES];
    let header = Header {
        fastmod_m: read_u64(hdr, HDR_FASTMOD_M),
        buckets: read_u32(hdr, HDR_BUCKETS),
        seed: read_u32(hdr, HDR_HASH_SEED),
        popular_records: read_u32(hdr, HDR_POPULAR_RECORDS),
        popular_count: read_u32(hdr, HDR_POPULAR_COUNT),
        blob_size: read_u64(hdr, HDR_BLOB_SIZE),
    };

    if header.buckets == 0 {
        return Err(DomainSetError::BadValue("zero buckets".to_string()));
    }
    if header.fastmod_m != compute_m_u32(header.buckets) {
        return Err(DomainSetError::BadValue(
            "fastmod magic does not match bucket count".to_string(),
        ));
    }
    if header.blob_size % 16 != 0 || header.blob_size < BLOB_TAIL_PAD as u64 {
        return Err(DomainSetError::BadValue("invalid blob size".to_string()));
    }
    if header.popular_count as usize > MAX_POPULAR_SUFFIXES {
        return Err(DomainSetError::BadValue(
            "popular count above cap".to_string(),
        ));
    }
    Ok(header)
}

/// Byte count of the three sections following the header, or `BadValue` on
/// arithmetic overflow of the declared sizes.
fn sections_len(header: &Header) -> Result<usize> {
    let overflow = || DomainSetError::BadValue("section sizes overflow".to_string());
    let table = (header.buckets as usize)
        .checked_mul(RECORD_BYTES)
        .ok_or_else(overflow)?;
    let popular = (header.popular_records as usize)
        .checked_mul(RECORD_BYTES)
        .ok_or_else(overflow)?;
    let blob = usize::try_from(header.blob_size).map_err(|_| overflow())?;
    table
        .checked_add(popular)
        .and_then(|n| n.checked_add(blob))
        .ok_or_else(overflow)
}

/// Validate one decoded record against the blob bounds.
fn validate_record(rec: &TableRecord, blob_size: usize) -> Result<()> {
    if usize::from(rec.used) > D {
        return Err(DomainSetError::BadValue(
            "record used slots above capacity".to_string(),
        ));
    }
    let base_off = rec.base_off as usize;
    if base_off > blob_size {
        return Err(DomainSetError::BadValue(
            "record base offset out of blob".to_string(),
        ));
    }
    for i in 0..usize::from(rec.used) {
        let pos = base_off + usize::from(rec.offsets[i]) * D;
        // The tail pad guarantees every stored pattern fits below this line.
        if pos + MAX_DOMAIN_LEN >= blob_size {
            return Err(DomainSetError::BadValue(
                "record slot offset out of blob".to_string(),
            ));
        }
    }
    Ok(())
}

/// In-memory footprint needed to deserialize `buf`, with the same headroom
/// convention as [`db_place_size`](crate::db_place_size).
pub fn db_place_size_from_serialized(buf: &[u8]) -> Result<usize> {
    let header = parse_header(buf)?;
    let after_header = sections_len(&header)?;
    let need = 4 + HEADER_BYTES + after_header;
    if buf.len() < need {
        return Err(DomainSetError::SmallPlace {
            need,
            got: buf.len(),
        });
    }
    Ok(HEADER_BYTES + after_header + 2 * ALIGN_HEADROOM)
}

impl StaticDomainSet {
    /// Bytes needed by [`serialize_into`](Self::serialize_into).
    pub fn serialized_size(&self) -> usize {
        4 + HEADER_BYTES
            + self.popular.len() * RECORD_BYTES
            + self.table.len() * RECORD_BYTES
            + self.blob.len()
    }

    /// Serialize into a freshly allocated buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.serialized_size()];
        self.write_image(&mut out);
        out
    }

    /// Serialize into `out`, which must hold at least
    /// [`serialized_size`](Self::serialized_size) bytes.
    pub fn serialize_into(&self, out: &mut [u8]) -> Result<()> {
        let need = self.serialized_size();
        if out.len() < need {
            return Err(DomainSetError::SmallPlace {
                need,
                got: out.len(),
            });
        }
        self.write_image(out);
        Ok(())
    }

    fn write_image(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        let hdr = &mut out[4..4 + HEADER_BYTES];
        hdr.fill(0);
        hdr[HDR_FASTMOD_M..HDR_FASTMOD_M + 8].copy_from_slice(&self.fastmod_m.to_le_bytes());
        hdr[HDR_BUCKETS..HDR_BUCKETS + 4]
            .copy_from_slice(&(self.table.len() as u32).to_le_bytes());
        hdr[HDR_HASH_SEED..HDR_HASH_SEED + 4].copy_from_slice(&self.seed.to_le_bytes());
        hdr[HDR_POPULAR_RECORDS..HDR_POPULAR_RECORDS + 4]
            .copy_from_slice(&(self.popular.len() as u32).to_le_bytes());
        hdr[HDR_POPULAR_COUNT..HDR_POPULAR_COUNT + 4]
            .copy_from_slice(&self.popular_count.to_le_bytes());
        hdr[HDR_BLOB_SIZE..HDR_BLOB_SIZE + 8]
            .copy_from_slice(&(self.blob.len() as u64).to_le_bytes());

        let mut at = 4 + HEADER_BYTES;
        for rec in self.popular.iter().chain(self.table.iter()) {
            rec.encode_into(&mut out[at..at + RECORD_BYTES]);
            at += RECORD_BYTES;
        }
        out[at..at + self.blob.len()].copy_from_slice(&self.blob);
    }

    /// Reconstruct a set from a serialized image.
    ///
    /// Every size, count and slot offset in the image is validated against
    /// the blob bounds before the set is returned; the header's pointer
    /// fields are ignored.
    pub fn from_serialized(buf: &[u8]) -> Result<Self> {
        let header = parse_header(buf)?;
        let after_header = sections_len(&header)?;
        let need = 4 + HEADER_BYTES + after_header;
        if buf.len() < need {
            return Err(DomainSetError::SmallPlace {
                need,
                got: buf.len(),
            });
        }

        let blob_size = header.blob_size as usize;
        let mut at = 4 + HEADER_BYTES;

        let mut popular = Vec::with_capacity(header.popular_records as usize);
        for _ in 0..header.popular_records {
            let rec = TableRecord::decode_from(&buf[at..at + RECORD_BYTES]);
            validate_record(&rec, blob_size)?;
            popular.push(rec);
            at += RECORD_BYTES;
        }

        let mut table = Vec::with_capacity(header.buckets as usize);
        for _ in 0..header.buckets {
            let rec = TableRecord::decode_from(&buf[at..at + RECORD_BYTES]);
            validate_record(&rec, blob_size)?;
            table.push(rec);
            at += RECORD_BYTES;
        }

        let popular_slots: u32 = popular.iter().map(|r| u32::from(r.used)).sum();
        if popular_slots != header.popular_count {
            return Err(DomainSetError::BadValue(
                "popular count mismatch".to_string(),
            ));
        }

        let blob = buf[at..at + blob_size].to_vec();

        Ok(StaticDomainSet {
            fastmod_m: header.fastmod_m,
            seed: header.seed,
            popular,
            popular_count: header.popular_count,
            table,
            blob,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::FindResult;

    fn sample_set() -> StaticDomainSet {
        StaticDomainSet::compile(&["example.com", "images.google.com", "site.org"]).unwrap()
    }

    #[test]
    fn test_roundtrip_preserves_lookups() {
        let set = sample_set();
        let image = set.serialize();
        assert_eq!(image.len(), set.serialized_size());

        let set2 = StaticDomainSet::from_serialized(&image).unwrap();
        for q in [
            "example.com",
            "api.example.com",
            "images.google.com",
            "a.b.images.google.com",
            "site.org",
            "google.com",
            "missing.net",
        ] {
            assert_eq!(set.find_str(q), set2.find_str(q), "{q}");
        }
        assert_eq!(set.buckets(), set2.buckets());
        assert_eq!(set.used_total(), set2.used_total());
        assert_eq!(set.hash_seed(), set2.hash_seed());
    }

    #[test]
    fn test_reserialization_is_byte_identical() {
        let set = sample_set();
        let image = set.serialize();
        let set2 = StaticDomainSet::from_serialized(&image).unwrap();
        assert_eq!(image, set2.serialize());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut image = sample_set().serialize();
        image[0] ^= 0xFF;
        assert!(matches!(
            StaticDomainSet::from_serialized(&image),
            Err(DomainSetError::BadValue(_))
        ));
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let image = sample_set().serialize();
        assert!(matches!(
            StaticDomainSet::from_serialized(&image[..image.len() - 1]),
            Err(DomainSetError::SmallPlace { .. })
        ));
        assert!(matches!(
            StaticDomainSet::from_serialized(&image[..10]),
            Err(DomainSetError::SmallPlace { .. })
        ));
    }

    #[test]
    fn test_corrupt_blob_size_rejected() {
        let set = sample_set();
        let mut image = set.serialize();
        // Blob size must stay a multiple of 16 and at least the tail pad.
        image[4 + HDR_BLOB_SIZE] = 1;
        assert!(matches!(
            StaticDomainSet::from_serialized(&image),
            Err(DomainSetError::BadValue(_))
        ));
    }

    #[test]
    fn test_corrupt_used_slots_rejected() {
        let set = sample_set();
        let mut image = set.serialize();
        // First table record's used field (no popular records in this set).
        let rec_at = 4 + HEADER_BYTES;
        image[rec_at + 56] = 200;
        assert!(matches!(
            StaticDomainSet::from_serialized(&image),
            Err(DomainSetError::BadValue(_))
        ));
    }

    #[test]
    fn test_serialize_into_small_buffer() {
        let set = sample_set();
        let mut out = vec![0u8; set.serialized_size() - 1];
        assert!(matches!(
            set.serialize_into(&mut out),
            Err(DomainSetError::SmallPlace { .. })
        ));
    }

    #[test]
    fn test_db_place_size_from_serialized() {
        let set = sample_set();
        let image = set.serialize();
        let place = db_place_size_from_serialized(&image).unwrap();
        // The figure covers the full in-memory footprint plus headroom.
        assert!(place >= set.serialized_size() - 4);
        assert!(matches!(
            db_place_size_from_serialized(&image[..20]),
            Err(DomainSetError::SmallPlace { .. })
        ));
    }

    #[test]
    fn test_header_field_offsets() {
        let set = sample_set();
        let image = set.serialize();
        assert_eq!(read_u32(&image, 0), MAGIC);
        let hdr = &image[4..4 + HEADER_BYTES];
        assert_eq!(read_u32(hdr, HDR_BUCKETS), set.buckets());
        assert_eq!(read_u32(hdr, HDR_HASH_SEED), set.hash_seed());
        assert_eq!(read_u64(hdr, HDR_BLOB_SIZE), set.blob_bytes() as u64);
        // Pointer mirrors are reserved and zeroed.
        assert!(hdr[16..32].iter().all(|&b| b == 0));
        assert!(hdr[40..48].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_roundtrip_with_popular_table() {
        let patterns: Vec<String> = (0..40).map(|i| format!("x{i}.shared.base.tld")).collect();
        let set = StaticDomainSet::compile(&patterns).unwrap();
        assert!(set.popular_count() > 0);

        let image = set.serialize();
        let set2 = StaticDomainSet::from_serialized(&image).unwrap();
        assert_eq!(set.popular_count(), set2.popular_count());
        for p in &patterns {
            assert_eq!(set2.find_str(p), FindResult::Found, "{p}");
        }
        assert_eq!(set2.find_str("shared.base.tld"), FindResult::NotFound);
    }
}
