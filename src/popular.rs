//! Popular-suffix discovery.
//!
//! Suffixes shared by more than `D` patterns would overflow their bucket no
//! matter which seed the calibrator picks: every pattern under the suffix
//! chains the same final labels and lands in the same bucket. Such suffixes
//! are recorded in a dedicated table so the query path can skip past them
//! before selecting a bucket, which bounds intra-bucket scan depth by the
//! unique label chains above the popular parts.

use std::collections::BTreeMap;

use crate::labels::suffix_last_k_labels;
use crate::record::D;

/// Iteratively discover popular suffixes. Starting at depth 2, group the
/// frontier by the last `k` labels and record suffixes whose group exceeds
/// `D` items; only those groups continue to depth `k + 1`. Returns a
/// sorted, deduplicated list.
pub fn find_popular_suffixes(patterns: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut popular: Vec<Vec<u8>> = Vec::new();
    if patterns.is_empty() {
        return popular;
    }

    let mut frontier: Vec<&[u8]> = patterns.iter().map(|p| p.as_slice()).collect();
    let mut depth = 2;
    loop {
        let mut groups: BTreeMap<&[u8], Vec<&[u8]>> = BTreeMap::new();
        for &s in &frontier {
            groups.entry(suffix_last_k_labels(s, depth)).or_default().push(s);
        }
        let mut next_frontier: Vec<&[u8]> = Vec::with_capacity(frontier.len());
        for (key, members) in groups {
            if members.len() > D {
                popular.push(key.to_vec());
                next_frontier.extend(members);
            }
        }
        if next_frontier.is_empty() {
            break;
        }
        frontier = next_frontier;
        depth += 1;
    }

    popular.sort();
    popular.dedup();
    popular
}
