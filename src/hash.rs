//! Seeded span hashing and fast modulus.

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// XXH3-64 over `bytes` with an arbitrary 64-bit seed. No case folding is
/// performed; callers lowercase earlier in the pipeline.
///
/// Passing the previous hash as the seed of the next call chains label
/// spans, encoding label boundaries implicitly:
/// `h_{i+1} = xxh3(label_i, seed = h_i)`.
#[inline]
pub fn hash64_span_ci(bytes: &[u8], seed: u64) -> u64 {
    xxh3_64_with_seed(bytes, seed)
}

/// Lower 16 bits of [`hash64_span_ci`]. Exposed for tests and bindings.
#[inline]
pub fn hash16(bytes: &[u8], seed: u64) -> u16 {
    (hash64_span_ci(bytes, seed) & 0xFFFF) as u16
}

/// Precompute the fastmod magic for divisor `d`: `M = floor(2^64 / d) + 1`.
/// For `d == 1` the increment wraps to `M = 0`, and `fastmod_u32(a, 0, 1)`
/// is 0, which is `a % 1`.
#[inline]
pub fn compute_m_u32(d: u32) -> u64 {
    (u64::MAX / u64::from(d)).wrapping_add(1)
}

/// `a % d` without division: the high 64 bits of `(M * a) * d`.
#[inline]
pub fn fastmod_u32(a: u32, m: u64, d: u32) -> u32 {
    let low = m.wrapping_mul(u64::from(a));
    ((u128::from(low) * u128::from(d)) >> 64) as u32
}
