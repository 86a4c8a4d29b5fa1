//! Ordered key enumeration through the in-memory index

use proptest::prelude::*;
use tempfile::TempDir;
use yamldb_rs::{SortOrder, StoreError, YamlDb, YamlDbBuilder};

fn sorted_db(temp: &TempDir, order: SortOrder) -> YamlDb {
    YamlDbBuilder::new()
        .base_path(temp.path().join("test-data"))
        .append_extension(false)
        .sort_keys(order)
        .build()
        .unwrap()
}

#[test]
fn test_reversed_order_in_chunks() {
    let temp = TempDir::new().unwrap();
    let db = sorted_db(&temp, SortOrder::Descending);

    let mut expected: Vec<String> = ('a'..='p').map(|c| c.to_string()).collect();
    for key in &expected {
        db.write_raw(key, key.as_bytes()).unwrap();
    }

    expected.reverse();
    assert_eq!(db.ordered_keys("", "", 10).unwrap(), expected);
}

#[test]
fn test_prefix_filter() {
    let temp = TempDir::new().unwrap();
    let db = sorted_db(&temp, SortOrder::Ascending);

    for key in ["a", "b", "c", "sub/a", "sub/b", "sub/c", "x", "y", "z"] {
        db.write_raw(key, key.as_bytes()).unwrap();
    }

    assert_eq!(
        db.ordered_keys("sub/", "", 10).unwrap(),
        vec!["sub/a", "sub/b", "sub/c"]
    );
}

#[test]
fn test_ascending_and_descending() {
    let temp = TempDir::new().unwrap();

    let asc = sorted_db(&temp, SortOrder::Ascending);
    for key in ["d", "b", "a", "c"] {
        asc.write_raw(key, b"x").unwrap();
    }
    assert_eq!(asc.ordered_keys("", "", 2).unwrap(), vec!["a", "b", "c", "d"]);

    // Same directory, reopened with the other order: index rebuilt from disk
    drop(asc);
    let desc = sorted_db(&temp, SortOrder::Descending);
    assert_eq!(desc.ordered_keys("", "", 2).unwrap(), vec!["d", "c", "b", "a"]);
}

#[test]
fn test_start_after_from() {
    let temp = TempDir::new().unwrap();
    let db = sorted_db(&temp, SortOrder::Ascending);

    for key in ["a", "b", "c", "d"] {
        db.write_raw(key, b"x").unwrap();
    }

    assert_eq!(db.ordered_keys("", "b", 10).unwrap(), vec!["c", "d"]);
    assert!(db.ordered_keys("", "d", 10).unwrap().is_empty());
}

#[test]
fn test_index_tracks_erase_and_purge() {
    let temp = TempDir::new().unwrap();
    let db = sorted_db(&temp, SortOrder::Ascending);

    for key in ["a", "b", "sub/x", "sub/y"] {
        db.write_raw(key, b"x").unwrap();
    }
    // Overwrite doesn't duplicate
    db.write_raw("a", b"y").unwrap();

    db.delete("b").unwrap();
    db.purge("sub").unwrap();
    assert_eq!(db.ordered_keys("", "", 10).unwrap(), vec!["a"]);

    db.purge_all().unwrap();
    assert!(db.ordered_keys("", "", 10).unwrap().is_empty());
}

#[test]
fn test_index_uses_canonical_keys() {
    let temp = TempDir::new().unwrap();
    let db = YamlDbBuilder::new()
        .base_path(temp.path().join("test-data"))
        .sort_keys(SortOrder::Ascending)
        .build()
        .unwrap();

    db.write_raw("a", b"1").unwrap();
    db.write_raw("a.yaml", b"2").unwrap();
    assert_eq!(db.ordered_keys("", "", 10).unwrap(), vec!["a.yaml"]);

    db.delete("a").unwrap();
    assert!(db.ordered_keys("", "", 10).unwrap().is_empty());
}

#[test]
fn test_disabled_index() {
    let temp = TempDir::new().unwrap();
    let db = YamlDbBuilder::new()
        .base_path(temp.path().join("test-data"))
        .build()
        .unwrap();

    db.write_raw("a", b"x").unwrap();
    assert!(matches!(
        db.ordered_keys("", "", 10),
        Err(StoreError::IndexDisabled)
    ));
}

#[test]
fn test_zero_chunk_size() {
    let temp = TempDir::new().unwrap();
    let db = sorted_db(&temp, SortOrder::Ascending);

    for key in ["b", "a"] {
        db.write_raw(key, b"x").unwrap();
    }
    assert_eq!(db.ordered_keys("", "", 0).unwrap(), vec!["a", "b"]);
}

#[test]
fn test_chunking_keeps_comparator_equal_keys() {
    let temp = TempDir::new().unwrap();
    let db = YamlDbBuilder::new()
        .base_path(temp.path().join("test-data"))
        .append_extension(false)
        .order_by(|a, b| a.to_lowercase() < b.to_lowercase())
        .build()
        .unwrap();

    for key in ["a", "B", "b", "c"] {
        db.write_raw(key, key.as_bytes()).unwrap();
    }

    let all = db.ordered_keys("", "", 10).unwrap();
    assert_eq!(all.len(), 4);
    for chunk_size in 1..=4 {
        assert_eq!(db.ordered_keys("", "", chunk_size).unwrap(), all);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_chunk_size_does_not_change_result(
        keys in prop::collection::btree_set("[a-z]{1,6}", 1..40),
        chunk_size in 1usize..20
    ) {
        let temp = TempDir::new().unwrap();
        let db = sorted_db(&temp, SortOrder::Ascending);

        for key in &keys {
            db.write_raw(key, key.as_bytes()).unwrap();
        }

        // BTreeSet iterates in ascending byte order
        let expected: Vec<String> = keys.iter().cloned().collect();
        prop_assert_eq!(db.ordered_keys("", "", chunk_size).unwrap(), expected);
    }
}
