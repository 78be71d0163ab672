//! Seed/size calibration and database materialization.

use crate::error::{DomainSetError, Result};
use crate::hash::{compute_m_u32, fastmod_u32, hash64_span_ci};
use crate::labels::{cut_last_label, cut_two_last_labels};
use crate::popular::find_popular_suffixes;
use crate::preprocess::preprocess_patterns;
use crate::record::{
    round_up16, TableRecord, ALIGN_HEADROOM, BLOB_TAIL_PAD, D, HEADER_BYTES, RECORD_BYTES,
};
use crate::set::StaticDomainSet;

/// Calibration grid: bucket growth steps and seed trials per size.
const CALIB_GROW_STEPS: usize = 60;
const CALIB_SEED_TRIES: usize = 100;
/// Growth factor per step, ~+5%.
const CALIB_GROW_NUM: usize = 21;
const CALIB_GROW_DEN: usize = 20;

/// Base seed for calibration; successive trials increment from here.
const CALIB_BASE_SEED: u32 = 0xA17F2344;

/// Per-bucket contents planned during calibration, before the blob exists.
#[derive(Clone, Default)]
struct PreviewRecord<'a> {
    tags: [u16; D],
    items: Vec<&'a [u8]>,
    max_scans: u16,
}

pub(crate) struct Calibration<'a> {
    popular: Vec<Vec<u8>>,
    buckets: Vec<PreviewRecord<'a>>,
    seed: u32,
}

/// Chained bucket hash, tag, and scan depth for one pattern.
///
/// The hash starts from the last two labels and is extended left through
/// any popular suffix; the 32 low bits of that point in the chain select
/// the bucket. The remaining labels keep chaining into the final hash whose
/// bits 32..48 become the slot tag, and each fold counts one scan.
fn chained_bucket_and_tag(
    pattern: &[u8],
    seed: u32,
    popular: &[Vec<u8>],
) -> (u32, u16, u16) {
    let mut suffix_start = cut_two_last_labels(pattern);
    let mut h = hash64_span_ci(&pattern[suffix_start..], u64::from(seed));

    // Skip past the popular part, if any, by exact suffix match.
    while suffix_start > 0 {
        let cur = &pattern[suffix_start..];
        if popular.binary_search_by(|p| p.as_slice().cmp(cur)).is_err() {
            break;
        }
        let label_end = suffix_start - 1;
        let label_start = cut_last_label(&pattern[..label_end]);
        h = hash64_span_ci(&pattern[label_start..label_end], h);
        suffix_start = label_start;
    }

    let bucket_hash = h as u32;

    // Chain the remaining labels; this mirrors the scans a lookup performs
    // inside the bucket.
    let mut hf = h;
    let mut cur = suffix_start;
    let mut scans: u16 = 1;
    while cur > 0 {
        let label_end = cur - 1;
        let label_start = cut_last_label(&pattern[..label_end]);
        hf = hash64_span_ci(&pattern[label_start..label_end], hf);
        cur = label_start;
        scans += 1;
    }
    let tag = ((hf >> 32) & 0xFFFF) as u16;
    (bucket_hash, tag, scans)
}

/// Tag of a popular suffix: the full label chain with no popular skipping,
/// matching the hash a lookup holds when its current suffix equals this
/// string.
fn chained_tag_full(pattern: &[u8], seed: u32) -> u16 {
    let mut cur = cut_two_last_labels(pattern);
    let mut h = hash64_span_ci(&pattern[cur..], u64::from(seed));
    while cur > 0 {
        let label_end = cur - 1;
        let label_start = cut_last_label(&pattern[..label_end]);
        h = hash64_span_ci(&pattern[label_start..label_end], h);
        cur = label_start;
    }
    ((h >> 32) & 0xFFFF) as u16
}

/// Attempt a placement of all patterns for one (seed, bucket count) pair.
/// Fails as soon as any bucket would take a 17th item.
fn try_build_records<'a>(
    patterns: &'a [Vec<u8>],
    seed: u32,
    buckets_num: u32,
    popular: &[Vec<u8>],
) -> Option<Vec<PreviewRecord<'a>>> {
    let m = compute_m_u32(buckets_num);
    let mut buckets = vec![PreviewRecord::default(); buckets_num as usize];
    for pattern in patterns {
        let (bucket_hash, tag, scans) = chained_bucket_and_tag(pattern, seed, popular);
        let b = fastmod_u32(bucket_hash, m, buckets_num) as usize;
        let rec = &mut buckets[b];
        if rec.items.len() >= D {
            return None;
        }
        rec.tags[rec.items.len()] = tag;
        rec.max_scans = rec.max_scans.max(scans);
        rec.items.push(pattern);
    }
    Some(buckets)
}

/// Search the (seed, bucket count) grid for the smallest viable placement:
/// 100 seeds per size, then grow the table ~5% and retry, for up to 60
/// growth steps.
pub(crate) fn calibrate<'a>(
    patterns: &'a [Vec<u8>],
    popular: Vec<Vec<u8>>,
) -> Result<Calibration<'a>> {
    let mut buckets_num = patterns.len() / D + 1;
    let mut seed = CALIB_BASE_SEED;

    for _ in 0..CALIB_GROW_STEPS {
        for _ in 0..CALIB_SEED_TRIES {
            seed = seed.wrapping_add(1);
            if let Some(buckets) =
                try_build_records(patterns, seed, buckets_num as u32, &popular)
            {
                return Ok(Calibration {
                    popular,
                    buckets,
                    seed,
                });
            }
        }
        buckets_num = grow_buckets(buckets_num);
    }
    Err(DomainSetError::FailedToCalibrate)
}

#[inline]
fn grow_buckets(buckets_num: usize) -> usize {
    (buckets_num * CALIB_GROW_NUM / CALIB_GROW_DEN).max(buckets_num + 1)
}

/// Materialize the runtime database from a successful calibration: size the
/// blob, lay out popular suffix strings then bucket strings (NUL-terminated,
/// 16-byte aligned, 256-byte tail pad), and fill both record tables.
pub(crate) fn materialize(calib: Calibration<'_>) -> Result<StaticDomainSet> {
    let Calibration {
        popular,
        buckets,
        seed,
    } = calib;

    let mut blob_size = 0usize;
    for s in &popular {
        blob_size += round_up16(s.len() + 1);
    }
    for rec in &buckets {
        for item in &rec.items {
            blob_size += round_up16(item.len() + 1);
        }
    }
    blob_size += BLOB_TAIL_PAD;

    let mut blob = vec![0u8; blob_size];
    let mut popular_table =
        vec![TableRecord::default(); popular.len().div_ceil(D)];
    let mut table = vec![TableRecord::default(); buckets.len()];
    let fastmod_m = compute_m_u32(buckets.len() as u32);

    let mut cur = 0usize;
    for (r, rec) in popular_table.iter_mut().enumerate() {
        rec.base_off = cur as u32;
        let base = cur;
        for suffix in popular.iter().skip(r * D).take(D) {
            let off_units = (cur - base) / D;
            if off_units > u8::MAX as usize {
                return Err(DomainSetError::BadValue(
                    "popular slot offset overflow".to_string(),
                ));
            }
            let slot = usize::from(rec.used);
            rec.offsets[slot] = off_units as u8;
            rec.tags[slot] = chained_tag_full(suffix, seed);
            blob[cur..cur + suffix.len()].copy_from_slice(suffix);
            cur = round_up16(cur + suffix.len() + 1);
            rec.used += 1;
        }
    }

    for (b, preview) in buckets.iter().enumerate() {
        let rec = &mut table[b];
        rec.used = preview.items.len() as u16;
        rec.max_scans = preview.max_scans;
        rec.base_off = cur as u32;
        let base = cur;
        for (i, item) in preview.items.iter().enumerate() {
            let off_units = (cur - base) / D;
            if off_units > u8::MAX as usize {
                return Err(DomainSetError::BadValue(
                    "bucket slot offset overflow".to_string(),
                ));
            }
            rec.offsets[i] = off_units as u8;
            rec.tags[i] = preview.tags[i];
            blob[cur..cur + item.len()].copy_from_slice(item);
            cur = round_up16(cur + item.len() + 1);
        }
    }

    debug_assert!(cur + BLOB_TAIL_PAD <= blob.len());

    Ok(StaticDomainSet {
        fastmod_m,
        seed,
        popular: popular_table,
        popular_count: popular.len() as u32,
        table,
        blob,
    })
}

/// Upper bound for the memory a compile of `patterns` materializes.
///
/// Replays the preprocessor, the full bucket growth schedule and popular
/// discovery against the input sizes, then adds pad and alignment headroom.
/// The figure deliberately over-allocates; callers wanting a tight buffer
/// serialize the built set and deserialize it.
pub fn db_place_size<S: AsRef<str>>(patterns: &[S]) -> Result<usize> {
    if patterns.is_empty() {
        return Err(DomainSetError::NoPatterns);
    }
    let views = preprocess_patterns(patterns)?;
    if views.is_empty() {
        return Err(DomainSetError::NoPatterns);
    }

    let mut buckets_num = views.len() / D + 1;
    for _ in 0..CALIB_GROW_STEPS {
        buckets_num = grow_buckets(buckets_num);
    }

    let popular = find_popular_suffixes(&views);

    let mut blob_bytes = 0usize;
    for s in &popular {
        blob_bytes += round_up16(s.len() + 1);
    }
    for s in &views {
        blob_bytes += round_up16(s.len() + 1);
    }
    blob_bytes += BLOB_TAIL_PAD;

    let popular_records = popular.len().div_ceil(D);
    let table_bytes = buckets_num * RECORD_BYTES;
    let popular_bytes = popular_records * RECORD_BYTES;

    Ok(HEADER_BYTES + table_bytes + popular_bytes + blob_bytes + 2 * ALIGN_HEADROOM)
}
