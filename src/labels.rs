//! Right-to-left label cutters.
//!
//! A label is a maximal substring not containing '.'. Labels may be empty
//! (`a..b` has three labels); no RFC shape is enforced. All cutters expect
//! trailing dots to have been removed already.

use memchr::memrchr;

/// Returns the offset where the last label of `domain` starts: one past the
/// rightmost '.', or 0 if there is no dot.
#[inline]
pub fn cut_last_label(domain: &[u8]) -> usize {
    match memrchr(b'.', domain) {
        Some(dot) => dot + 1,
        None => 0,
    }
}

/// Returns the offset where the last two-label window of `domain` starts.
/// With fewer than two labels this is 0 (the whole domain).
#[inline]
pub fn cut_two_last_labels(domain: &[u8]) -> usize {
    let Some(dot) = memrchr(b'.', domain) else {
        return 0;
    };
    match memrchr(b'.', &domain[..dot]) {
        Some(prev) => prev + 1,
        None => 0,
    }
}

/// Returns the last `k` labels of `domain` (k >= 2), or the whole domain if
/// it has fewer than `k` labels.
pub fn suffix_last_k_labels(domain: &[u8], k: usize) -> &[u8] {
    let mut end = domain.len();
    for _ in 0..k {
        match memrchr(b'.', &domain[..end]) {
            Some(dot) => end = dot,
            None => return domain,
        }
    }
    // `end` sits on the dot preceding the k-label window.
    &domain[end + 1..]
}
