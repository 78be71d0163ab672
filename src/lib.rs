//! Static Domain Set - a precompiled, read-only domain suffix set
//!
//! This library answers "is this hostname, or any of its whole-label
//! suffixes, in the set?" in roughly one cache miss per query:
//! - A two-stage hash table whose seed and size are calibrated at build
//!   time so no bucket holds more than 16 patterns
//! - A popular-suffix table that bounds probe depth under heavily-shared
//!   subtrees (many patterns ending in the same `co.uk`-style suffix)
//! - 64-byte cache-line records with a placement-stable serialization
//!   format (offsets only, no pointers on disk)
//! - An allocation-free lookup that cuts labels right to left with a hard
//!   scan bound fixed at compile time
//!
//! # Example
//!
//! ```rust
//! use static_domain_set::{FindResult, StaticDomainSet};
//!
//! let set = StaticDomainSet::compile(&[
//!     "example.com",
//!     "images.google.com",
//!     "GO.com", // case-insensitive
//! ]).unwrap();
//!
//! assert_eq!(set.find_str("example.com"), FindResult::Found);
//! assert_eq!(set.find_str("api.example.com"), FindResult::Found);
//! assert_eq!(set.find_str("a.b.images.google.com."), FindResult::Found);
//! assert_eq!(set.find_str("go.com"), FindResult::Found);
//! assert_eq!(set.find_str("google.com"), FindResult::NotFound);
//! assert_eq!(set.find_str("white space.com"), FindResult::InvalidInput);
//!
//! // The serialized image round-trips to an identical set.
//! let image = set.serialize();
//! let restored = StaticDomainSet::from_serialized(&image).unwrap();
//! assert_eq!(restored.find_str("api.example.com"), FindResult::Found);
//! ```
//!
//! # Semantics
//!
//! A pattern matches a query when, after both are lowercased and stripped
//! of trailing dots, the query equals the pattern or ends with `"." +
//! pattern`. Patterns are ASCII over `[A-Za-z0-9-._]`, at most 253 bytes,
//! and must contain a dot; labels may be empty (`a..b` is stored and
//! matched literally). Supplying both a base and its subdomain stores only
//! the base.
//!
//! Sets are immutable after [`StaticDomainSet::compile`]: lookups take
//! `&self`, allocate nothing, and are safe to run from many threads at
//! once.

pub mod ascii;
pub mod builder;
pub mod error;
pub mod hash;
pub mod labels;
pub mod popular;
pub mod preprocess;
pub mod record;
pub mod serial;
pub mod set;

// Re-export commonly used items
pub use ascii::MAX_DOMAIN_LEN;
pub use builder::db_place_size;
pub use error::{DomainSetError, Result};
pub use serial::db_place_size_from_serialized;
pub use set::{FindResult, StaticDomainSet};

// Helpers exposed for tests and bindings
pub use hash::{hash16, hash64_span_ci};
pub use labels::{cut_last_label, cut_two_last_labels};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_workflow() {
        let patterns = [
            "example.com",
            "site.com.",
            "images.google.com",
            "GO.com",
        ];

        // Upper-bound planning figure is available before compiling.
        let place = db_place_size(&patterns).unwrap();

        let set = StaticDomainSet::compile(&patterns).unwrap();
        assert!(place >= set.allocated_bytes());
        assert_eq!(set.used_total(), 4);

        // Exact and suffix lookups
        assert_eq!(set.find_str("example.com"), FindResult::Found);
        assert_eq!(set.find_str("api.example.com"), FindResult::Found);
        assert_eq!(set.find_str("site.com"), FindResult::Found);
        assert_eq!(set.find_str("a.b.images.google.com."), FindResult::Found);
        assert_eq!(set.find_str("go.com"), FindResult::Found);

        // Shorter suffixes of stored patterns do not match
        assert_eq!(set.find_str("com"), FindResult::NotFound);
        assert_eq!(set.find_str("google.com"), FindResult::NotFound);
        assert_eq!(set.find_str("not-listed.org"), FindResult::NotFound);

        // Malformed queries
        assert_eq!(set.find_str("white space.com"), FindResult::InvalidInput);

        // Serialize, restore into an owned copy, verify agreement
        let image = set.serialize();
        assert_eq!(image.len(), set.serialized_size());
        let restored = StaticDomainSet::from_serialized(&image).unwrap();
        for q in [
            "example.com",
            "api.example.com",
            "site.com",
            "go.com",
            "google.com",
            "com",
        ] {
            assert_eq!(set.find_str(q), restored.find_str(q), "{q}");
        }
        assert_eq!(image, restored.serialize());
    }
}
