//! The compiled domain set and its lookup path.

use std::fmt;

use crate::ascii::{domain_to_lower, trim_trailing_dots, MAX_DOMAIN_LEN};
use crate::builder::{calibrate, materialize};
use crate::error::{DomainSetError, Result};
use crate::hash::{fastmod_u32, hash64_span_ci};
use crate::labels::{cut_last_label, cut_two_last_labels};
use crate::popular::find_popular_suffixes;
use crate::preprocess::preprocess_patterns;
use crate::record::{TableRecord, HEADER_BYTES, MAX_POPULAR_SUFFIXES, RECORD_BYTES};

/// Outcome of a lookup. Malformed queries are reported as a value of their
/// own rather than an error object: they are expected traffic on the hot
/// path, never retried, and never mutate anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindResult {
    /// The query or one of its whole-label suffixes is in the set.
    Found,
    /// No stored pattern matches.
    NotFound,
    /// The query is empty after trailing-dot removal, longer than 253
    /// bytes, or contains a byte outside `[A-Za-z0-9-._]`.
    InvalidInput,
}

/// A precompiled, read-only set of domain patterns with whole-label suffix
/// matching.
///
/// Compiled once from an immutable pattern list, then shared freely:
/// lookups take `&self`, allocate nothing, and are bounded by the scan
/// depth fixed at compile time.
pub struct StaticDomainSet {
    /// Precomputed fastmod magic for the bucket count.
    pub(crate) fastmod_m: u64,
    /// Hash seed selected during calibration.
    pub(crate) seed: u32,
    /// Popular-suffix records; their strings sit at the start of the blob.
    pub(crate) popular: Vec<TableRecord>,
    /// Total popular suffixes across all popular records.
    pub(crate) popular_count: u32,
    /// The bucket table.
    pub(crate) table: Vec<TableRecord>,
    /// Concatenated pattern strings, NUL-terminated, 16-byte aligned, with
    /// a 256-byte tail pad.
    pub(crate) blob: Vec<u8>,
}

impl StaticDomainSet {
    /// Compile a set from raw patterns.
    ///
    /// Patterns are ASCII over `[A-Za-z0-9-._]`, case-insensitive, with at
    /// least one dot and at most 253 bytes after trailing-dot removal.
    /// Proper subdomains of another supplied pattern are pruned.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        if patterns.is_empty() {
            return Err(DomainSetError::NoPatterns);
        }
        let views = preprocess_patterns(patterns)?;
        if views.is_empty() {
            return Err(DomainSetError::NoPatterns);
        }

        let popular = find_popular_suffixes(&views);
        if popular.len() > MAX_POPULAR_SUFFIXES {
            return Err(DomainSetError::TooManyPopular(popular.len()));
        }

        let calib = calibrate(&views, popular)?;
        materialize(calib)
    }

    /// Look up `domain`: is it, or any of its whole-label suffixes, in the
    /// set? Case-insensitive; trailing dots are ignored.
    pub fn find(&self, domain: &[u8]) -> FindResult {
        if self.table.is_empty() {
            return FindResult::NotFound;
        }

        let domain = trim_trailing_dots(domain);
        if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
            return FindResult::InvalidInput;
        }

        // Lowercase into a stack buffer; the query path never allocates.
        let mut lower_buf = [0u8; 256];
        let lower = &mut lower_buf[..domain.len()];
        if !domain_to_lower(lower, domain) {
            return FindResult::InvalidInput;
        }
        let lower: &[u8] = lower;

        // Start from the last two labels.
        let mut suffix_start = cut_two_last_labels(lower);
        let mut suffix_hash =
            hash64_span_ci(&lower[suffix_start..], u64::from(self.seed));

        // While the current suffix is popular, extend left one label at a
        // time, folding each label into the chain.
        while suffix_start > 0 {
            let pop_tag = ((suffix_hash >> 32) & 0xFFFF) as u16;
            if !self.popular_suffix_exists(pop_tag, &lower[suffix_start..]) {
                break;
            }
            let label_end = suffix_start - 1;
            let label_start = cut_last_label(&lower[..label_end]);
            suffix_hash = hash64_span_ci(&lower[label_start..label_end], suffix_hash);
            suffix_start = label_start;
        }

        let bucket = fastmod_u32(
            suffix_hash as u32,
            self.fastmod_m,
            self.table.len() as u32,
        );
        let rec = &self.table[bucket as usize];

        // Probe the bucket with the current suffix and every larger one,
        // never exceeding the scan depth recorded at compile time.
        let max_scans = rec.max_scans;
        let mut scan: u16 = 1;
        loop {
            let tag = ((suffix_hash >> 32) & 0xFFFF) as u16;
            if rec.scan(tag, &self.blob, &lower[suffix_start..]) {
                return FindResult::Found;
            }
            if scan >= max_scans {
                // Every pattern in this bucket is shallower than the query.
                return FindResult::NotFound;
            }
            if suffix_start == 0 {
                return FindResult::NotFound;
            }
            let label_end = suffix_start - 1;
            let label_start = cut_last_label(&lower[..label_end]);
            suffix_hash = hash64_span_ci(&lower[label_start..label_end], suffix_hash);
            suffix_start = label_start;
            scan += 1;
        }
    }

    /// Convenience wrapper over [`find`](Self::find) for string queries.
    pub fn find_str(&self, domain: &str) -> FindResult {
        self.find(domain.as_bytes())
    }

    fn popular_suffix_exists(&self, tag: u16, suffix: &[u8]) -> bool {
        self.popular
            .iter()
            .any(|rec| rec.scan(tag, &self.blob, suffix))
    }

    /// Number of buckets in the main table.
    pub fn buckets(&self) -> u32 {
        self.table.len() as u32
    }

    /// Number of popular suffixes stored in the popular table.
    pub fn popular_count(&self) -> u32 {
        self.popular_count
    }

    /// Total patterns stored across all buckets (after pruning).
    pub fn used_total(&self) -> u32 {
        self.table.iter().map(|r| u32::from(r.used)).sum()
    }

    /// Hash seed selected during calibration.
    pub fn hash_seed(&self) -> u32 {
        self.seed
    }

    /// Serialized header size in bytes.
    pub const fn header_bytes() -> usize {
        HEADER_BYTES
    }

    /// Size of the bucket table in bytes.
    pub fn table_bytes(&self) -> usize {
        self.table.len() * RECORD_BYTES
    }

    /// Size of the popular table in bytes.
    pub fn popular_bytes(&self) -> usize {
        self.popular.len() * RECORD_BYTES
    }

    /// Size of the domains blob in bytes, tail pad included.
    pub fn blob_bytes(&self) -> usize {
        self.blob.len()
    }

    /// Total bytes of the materialized database, magic prefix included.
    pub fn allocated_bytes(&self) -> usize {
        4 + HEADER_BYTES + self.popular_bytes() + self.table_bytes() + self.blob_bytes()
    }
}

impl fmt::Display for StaticDomainSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.used_total();
        let cells = self.table.len() * crate::record::D;
        let fill = if cells > 0 {
            f64::from(used) * 100.0 / cells as f64
        } else {
            0.0
        };
        write!(
            f,
            "StaticDomainSet{{domains={}, popular={}, fill={:.1}%, bytes={} (header={}, popular={}, table={}, blob={})}}",
            used,
            self.popular_count,
            fill,
            self.allocated_bytes(),
            HEADER_BYTES,
            self.popular_bytes(),
            self.table_bytes(),
            self.blob_bytes(),
        )
    }
}
