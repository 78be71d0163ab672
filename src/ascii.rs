//! ASCII domain validation and lowercasing.

/// Maximum allowed length of a domain name in bytes. The terminating NUL in
/// the blob and a final '.' are not included.
pub const MAX_DOMAIN_LEN: usize = 253;

/// Validate `src` and write its lowercased form into `dst[..src.len()]`.
///
/// Returns `false` if any byte falls outside `[A-Za-z0-9-._]`. Alphabetic
/// bytes are folded with `| 0x20`; digits, `-`, `.` and `_` pass through
/// unchanged. `dst` must be at least `src.len()` bytes.
pub fn domain_to_lower(dst: &mut [u8], src: &[u8]) -> bool {
    for (d, &c) in dst.iter_mut().zip(src.iter()) {
        let cl = c | 0x20;
        let is_alpha = cl.is_ascii_lowercase();
        let ok = is_alpha || c.is_ascii_digit() || c == b'-' || c == b'.' || c == b'_';
        if !ok {
            return false;
        }
        *d = if is_alpha { cl } else { c };
    }
    true
}

/// Strip trailing dots from a domain, returning the shortened prefix.
pub fn trim_trailing_dots(mut domain: &[u8]) -> &[u8] {
    while let Some((&b'.', rest)) = domain.split_last() {
        domain = rest;
    }
    domain
}
