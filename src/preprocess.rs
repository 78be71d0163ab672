//! Pattern preprocessing: normalization, validation, and subdomain pruning.

use crate::ascii::{domain_to_lower, trim_trailing_dots, MAX_DOMAIN_LEN};
use crate::error::{DomainSetError, Result};

/// Compare two domains character-by-character from the right. In this order
/// a base suffix ("example.com") precedes its own subdomains
/// ("a.example.com"), which lets pruning run in a single pass.
pub fn rev_char_cmp(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    a.iter().rev().cmp(b.iter().rev())
}

/// Returns whether `s` equals `suf` or is a whole-label subdomain of it.
pub fn is_subdomain(s: &[u8], suf: &[u8]) -> bool {
    if s.len() < suf.len() {
        return false;
    }
    if &s[s.len() - suf.len()..] != suf {
        return false;
    }
    if s.len() == suf.len() {
        return true;
    }
    s[s.len() - suf.len() - 1] == b'.'
}

/// Normalize raw patterns into a pruned, lowercased, validated list.
///
/// Per pattern: strip trailing dots, reject empty/overlong/invalid-byte
/// inputs and patterns without a dot, lowercase. The surviving list is
/// sorted by reversed character order and proper subdomains of a present
/// base are dropped (storing only "example.com" when "api.example.com" is
/// also given is smaller and, because lookups always try growing suffixes,
/// semantically equivalent).
pub fn preprocess_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Vec<u8>>> {
    let mut items = Vec::with_capacity(patterns.len());
    for p in patterns {
        let raw = p.as_ref().as_bytes();
        if raw.is_empty() {
            return Err(DomainSetError::BadValue("empty pattern".to_string()));
        }
        let trimmed = trim_trailing_dots(raw);
        if trimmed.is_empty() || trimmed.len() > MAX_DOMAIN_LEN {
            return Err(DomainSetError::BadValue(format!(
                "invalid pattern length: {}",
                trimmed.len()
            )));
        }
        let mut lower = vec![0u8; trimmed.len()];
        if !domain_to_lower(&mut lower, trimmed) {
            return Err(DomainSetError::BadValue(format!(
                "invalid pattern characters: {:?}",
                p.as_ref()
            )));
        }
        if !lower.contains(&b'.') {
            return Err(DomainSetError::TopLevelDomain(
                String::from_utf8_lossy(&lower).into_owned(),
            ));
        }
        items.push(lower);
    }
    Ok(prune_subdomains(items))
}

/// Sort by reversed character order, then keep the first occurrence and drop
/// consecutive entries that are equal to, or label-suffixes of, the last
/// kept item.
fn prune_subdomains(mut patterns: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    if patterns.is_empty() {
        return patterns;
    }
    patterns.sort_by(|a, b| rev_char_cmp(a, b));
    let mut out: Vec<Vec<u8>> = Vec::with_capacity(patterns.len());
    for s in patterns {
        if let Some(base) = out.last() {
            if is_subdomain(&s, base) {
                continue;
            }
        }
        out.push(s);
    }
    out
}
