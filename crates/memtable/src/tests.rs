use super::*;

// -------------------- Basic CRUD --------------------

#[test]
fn put_and_get_single_key() {
    let m = Memtable::new();
    m.put(b"k1".to_vec(), b"v1".to_vec());
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(b"k1"), Some(b"v1".to_vec()));
}

#[test]
fn put_overwrites() {
    let m = Memtable::new();
    m.put(b"k1".to_vec(), b"v1".to_vec());
    m.put(b"k1".to_vec(), b"v2".to_vec());
    assert_eq!(m.get(b"k1"), Some(b"v2".to_vec()));
}

#[test]
fn get_missing_key_returns_none() {
    let m = Memtable::new();
    assert!(m.get(b"nonexistent").is_none());
}

#[test]
fn delete_creates_tombstone() {
    let m = Memtable::new();
    m.put(b"k1".to_vec(), b"v1".to_vec());
    m.delete(b"k1".to_vec());
    assert!(is_tombstone(&m.get(b"k1").unwrap()));
    assert_eq!(m.len(), 1); // tombstone still present
}

// -------------------- Load tests --------------------

#[test]
fn write_load_10k_unique_keys() {
    let m = Memtable::new();
    for i in 0..10_000u64 {
        let key = format!("key{}", i).into_bytes();
        m.put(key, vec![b'x'; 100]);
    }
    assert_eq!(m.len(), 10_000);
}

#[test]
fn write_load_with_key_reuse() {
    let m = Memtable::new();
    for i in 0..100_000u64 {
        let key = format!("key{}", i % 1_000).into_bytes();
        m.put(key, vec![b'x'; 50]);
    }
    assert_eq!(m.len(), 1_000);
}

// -------------------- Iterator ordering --------------------

#[test]
fn iter_yields_sorted_keys() {
    let m = Memtable::new();
    m.put(b"c".to_vec(), b"3".to_vec());
    m.put(b"a".to_vec(), b"1".to_vec());
    m.put(b"b".to_vec(), b"2".to_vec());

    let keys: Vec<Vec<u8>> = m.iter().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn iter_includes_tombstones() {
    let m = Memtable::new();
    m.put(b"a".to_vec(), b"1".to_vec());
    m.delete(b"b".to_vec());
    m.put(b"c".to_vec(), b"3".to_vec());

    let entries = m.iter();
    assert_eq!(entries.len(), 3);
    assert!(is_tombstone(&entries[1].1));
}

#[test]
fn iter_empty_memtable() {
    let m = Memtable::new();
    assert_eq!(m.iter().len(), 0);
}

// -------------------- contains_key --------------------

#[test]
fn contains_key_live_value() {
    let m = Memtable::new();
    m.put(b"k".to_vec(), b"v".to_vec());
    assert!(m.contains_key(b"k"));
}

#[test]
fn contains_key_tombstone() {
    let m = Memtable::new();
    m.delete(b"k".to_vec());
    assert!(m.contains_key(b"k"));
}

#[test]
fn contains_key_missing() {
    let m = Memtable::new();
    assert!(!m.contains_key(b"k"));
}

// -------------------- approx_size tracking --------------------

#[test]
fn approx_size_includes_key_and_value() {
    let m = Memtable::new();
    assert_eq!(m.approx_size(), 0);
    m.put(b"ab".to_vec(), b"ccc".to_vec());
    assert_eq!(m.approx_size(), 5);
}

#[test]
fn approx_size_adjusts_on_overwrite() {
    let m = Memtable::new();
    m.put(b"a".to_vec(), b"aaa".to_vec());
    assert_eq!(m.approx_size(), 4);
    m.put(b"a".to_vec(), b"bb".to_vec());
    assert_eq!(m.approx_size(), 3);
}

// -------------------- len / is_empty --------------------

#[test]
fn len_counts_tombstones() {
    let m = Memtable::new();
    m.put(b"a".to_vec(), b"1".to_vec());
    m.delete(b"b".to_vec());
    assert_eq!(m.len(), 2);
}

#[test]
fn is_empty_on_new() {
    let m = Memtable::new();
    assert!(m.is_empty());
}

#[test]
fn is_empty_after_insert() {
    let m = Memtable::new();
    m.put(b"k".to_vec(), b"v".to_vec());
    assert!(!m.is_empty());
}

#[test]
fn default_creates_empty() {
    let m = Memtable::default();
    assert!(m.is_empty());
    assert_eq!(m.approx_size(), 0);
}

// -------------------- Many / stress tests --------------------

#[test]
fn many_distinct_keys_stay_sorted() {
    let m = Memtable::new();
    for i in 0u64..1000 {
        m.put(format!("key{:04}", i).into_bytes(), b"v".to_vec());
    }
    assert_eq!(m.len(), 1000);
    let keys: Vec<Vec<u8>> = m.iter().into_iter().map(|(k, _)| k).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn overwrite_same_key_many_times() {
    let m = Memtable::new();
    for i in 1..=10_000u64 {
        m.put(b"k".to_vec(), format!("v{}", i).into_bytes());
    }
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(b"k"), Some(b"v10000".to_vec()));
}

#[test]
fn alternating_put_delete() {
    let m = Memtable::new();
    for _ in 0..1_000u64 {
        m.put(b"k".to_vec(), b"v".to_vec());
        m.delete(b"k".to_vec());
    }
    assert!(is_tombstone(&m.get(b"k").unwrap()));
    assert_eq!(m.len(), 1);
}

// -------------------- Edge cases --------------------

#[test]
fn empty_key() {
    let m = Memtable::new();
    m.put(b"".to_vec(), b"val".to_vec());
    assert_eq!(m.get(b""), Some(b"val".to_vec()));
}

#[test]
fn empty_value() {
    let m = Memtable::new();
    m.put(b"k".to_vec(), b"".to_vec());
    assert_eq!(m.get(b"k"), Some(Vec::new()));
}

#[test]
fn binary_key_and_value() {
    let m = Memtable::new();
    let key = vec![0x00, 0xFF, 0x80, 0x01];
    let val = vec![0xDE, 0xAD, 0xBE, 0xEF];
    m.put(key.clone(), val.clone());
    assert_eq!(m.get(&key), Some(val));
}

#[test]
fn large_value() {
    let m = Memtable::new();
    let val = vec![b'x'; 1_000_000];
    m.put(b"big".to_vec(), val.clone());
    assert_eq!(m.get(b"big").unwrap().len(), 1_000_000);
    assert_eq!(m.approx_size(), 3 + 1_000_000);
}

#[test]
fn delete_nonexistent_key_creates_tombstone() {
    let m = Memtable::new();
    m.delete(b"k".to_vec());
    assert_eq!(m.len(), 1);
    assert!(m.contains_key(b"k"));
    assert!(is_tombstone(&m.get(b"k").unwrap()));
}

#[test]
fn put_after_delete_resurrects_key() {
    let m = Memtable::new();
    m.put(b"k".to_vec(), b"v1".to_vec());
    m.delete(b"k".to_vec());
    assert!(is_tombstone(&m.get(b"k").unwrap()));

    m.put(b"k".to_vec(), b"v2".to_vec());
    assert_eq!(m.get(b"k"), Some(b"v2".to_vec()));
}

// -------------------- tombstone sentinel --------------------

#[test]
fn is_tombstone_matches_only_sentinel() {
    assert!(is_tombstone(TOMBSTONE));
    assert!(!is_tombstone(b"regular value"));
    assert!(!is_tombstone(b""));
}

#[test]
fn debug_impl_works() {
    let m = Memtable::new();
    m.put(b"k".to_vec(), b"v".to_vec());
    let s = format!("{:?}", m);
    assert!(s.contains("Memtable"));
}
