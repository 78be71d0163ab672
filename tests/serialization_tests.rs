//! Serialized-image properties: determinism, round-trips, validation.

use static_domain_set::{
    db_place_size, db_place_size_from_serialized, DomainSetError, FindResult, StaticDomainSet,
};

fn sample_patterns() -> Vec<String> {
    let mut patterns = vec![
        "example.com".to_string(),
        "images.google.com".to_string(),
        "service.internal".to_string(),
        "a..b.com".to_string(),
        "xn--puny-test.com".to_string(),
    ];
    // Enough shared-suffix patterns to light up the popular table.
    patterns.extend((0..24).map(|i| format!("host{i}.shared.zone.example")));
    patterns
}

#[test]
fn test_compile_is_deterministic() {
    // Building the same input list twice yields identical serialized bytes.
    let patterns = sample_patterns();
    let a = StaticDomainSet::compile(&patterns).unwrap();
    let b = StaticDomainSet::compile(&patterns).unwrap();
    assert_eq!(a.serialize(), b.serialize());
    assert_eq!(a.hash_seed(), b.hash_seed());
    assert_eq!(a.buckets(), b.buckets());

    // Input order does not leak into the image: preprocessing sorts before
    // placement, so a permuted list compiles to the same bytes.
    let mut reversed = patterns.clone();
    reversed.reverse();
    let c = StaticDomainSet::compile(&reversed).unwrap();
    assert_eq!(a.serialize(), c.serialize());
}

#[test]
fn test_single_bucket_set_compiles_and_roundtrips() {
    // Few patterns calibrate to a one-bucket table; the fastmod magic for a
    // single divisor wraps to zero and must still compile, serialize, and
    // validate on read.
    let a = StaticDomainSet::compile(&["example.com"]).unwrap();
    let b = StaticDomainSet::compile(&["example.com"]).unwrap();
    assert_eq!(a.buckets(), 1);
    assert_eq!(a.serialize(), b.serialize());

    let restored = StaticDomainSet::from_serialized(&a.serialize()).unwrap();
    assert_eq!(restored.buckets(), 1);
    assert_eq!(restored.find_str("example.com"), FindResult::Found);
    assert_eq!(restored.find_str("api.example.com"), FindResult::Found);
    assert_eq!(restored.find_str("other.org"), FindResult::NotFound);
    assert_eq!(a.serialize(), restored.serialize());
}

#[test]
fn test_roundtrip_find_agreement_and_stability() {
    let patterns = sample_patterns();
    let set = StaticDomainSet::compile(&patterns).unwrap();
    let image = set.serialize();
    let restored = StaticDomainSet::from_serialized(&image).unwrap();

    for p in &patterns {
        assert_eq!(restored.find_str(p), FindResult::Found, "{p}");
        assert_eq!(
            set.find_str(&format!("sub.{p}")),
            restored.find_str(&format!("sub.{p}"))
        );
    }
    assert_eq!(set.popular_count(), restored.popular_count());
    assert_eq!(set.used_total(), restored.used_total());

    // A second round-trip reproduces the image byte for byte.
    assert_eq!(image, restored.serialize());
}

#[test]
fn test_roundtrip_through_serialize_into() {
    let set = StaticDomainSet::compile(&["example.com", "other.net"]).unwrap();
    let mut out = vec![0u8; set.serialized_size()];
    set.serialize_into(&mut out).unwrap();
    assert_eq!(out, set.serialize());

    let restored = StaticDomainSet::from_serialized(&out).unwrap();
    assert_eq!(restored.find_str("api.example.com"), FindResult::Found);
}

#[test]
fn test_section_sizes_add_up() {
    let set = StaticDomainSet::compile(&sample_patterns()).unwrap();
    assert_eq!(
        set.serialized_size(),
        4 + StaticDomainSet::header_bytes()
            + set.popular_bytes()
            + set.table_bytes()
            + set.blob_bytes()
    );
    assert_eq!(set.serialized_size(), set.allocated_bytes());
    assert_eq!(set.blob_bytes() % 16, 0);
    assert!(set.blob_bytes() >= 256);
}

#[test]
fn test_place_size_contracts() {
    let patterns = sample_patterns();
    let estimate = db_place_size(&patterns).unwrap();
    let set = StaticDomainSet::compile(&patterns).unwrap();

    // The pre-compile estimate over-allocates by design.
    assert!(estimate >= set.allocated_bytes());

    // The post-serialize figure covers the restored set's footprint.
    let image = set.serialize();
    let place = db_place_size_from_serialized(&image).unwrap();
    assert!(place >= set.allocated_bytes() - 4);
    assert!(place <= estimate);
}

#[test]
fn test_garbage_input_rejected() {
    assert!(matches!(
        StaticDomainSet::from_serialized(&[]),
        Err(DomainSetError::SmallPlace { .. })
    ));
    let zeros = vec![0u8; 4096];
    assert!(matches!(
        StaticDomainSet::from_serialized(&zeros),
        Err(DomainSetError::BadValue(_))
    ));
    assert!(matches!(
        db_place_size_from_serialized(&zeros),
        Err(DomainSetError::BadValue(_))
    ));
}

#[test]
fn test_corrupt_record_offsets_rejected() {
    let set = StaticDomainSet::compile(&["example.com"]).unwrap();
    let mut image = set.serialize();

    // Find the record with a used slot and point its base offset past the
    // blob; deserialization must refuse rather than index out of bounds.
    let table_start = 4 + StaticDomainSet::header_bytes();
    for rec_at in (table_start..table_start + set.table_bytes()).step_by(64) {
        let used = u16::from_le_bytes([image[rec_at + 56], image[rec_at + 57]]);
        if used > 0 {
            image[rec_at + 60..rec_at + 64]
                .copy_from_slice(&u32::MAX.to_le_bytes());
        }
    }
    assert!(matches!(
        StaticDomainSet::from_serialized(&image),
        Err(DomainSetError::BadValue(_))
    ));
}
