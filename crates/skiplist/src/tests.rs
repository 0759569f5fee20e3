use super::*;

#[test]
fn insert_then_get() {
    let list = SkipList::new();
    list.insert(b"k1".to_vec(), b"v1".to_vec());
    assert_eq!(list.get(b"k1"), Some(b"v1".to_vec()));
    assert_eq!(list.get(b"missing"), None);
}

#[test]
fn insert_overwrites_existing_key() {
    let list = SkipList::new();
    list.insert(b"k".to_vec(), b"v1".to_vec());
    list.insert(b"k".to_vec(), b"v2".to_vec());
    assert_eq!(list.get(b"k"), Some(b"v2".to_vec()));
    assert_eq!(list.len(), 1);
}

#[test]
fn ordering_is_strictly_ascending() {
    let list = SkipList::new();
    for k in ["banana", "apple", "cherry", "date", "apricot"] {
        list.insert(k.as_bytes().to_vec(), b"x".to_vec());
    }
    let keys: Vec<Vec<u8>> = list.iter().into_iter().map(|(k, _)| k).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    for w in keys.windows(2) {
        assert!(w[0] < w[1]);
    }
}

#[test]
fn delete_removes_key() {
    let list = SkipList::new();
    list.insert(b"a".to_vec(), b"1".to_vec());
    list.insert(b"b".to_vec(), b"2".to_vec());
    assert!(list.delete(b"a"));
    assert_eq!(list.get(b"a"), None);
    assert_eq!(list.get(b"b"), Some(b"2".to_vec()));
    assert!(!list.delete(b"a"));
}

#[test]
fn approx_size_tracks_bytes() {
    let list = SkipList::new();
    assert_eq!(list.approx_size(), 0);
    list.insert(b"key".to_vec(), b"value".to_vec());
    assert_eq!(list.approx_size(), 3 + 5);
    list.insert(b"key".to_vec(), b"longervalue".to_vec());
    assert_eq!(list.approx_size(), 3 + 11);
}

#[test]
fn many_insertions_stay_ordered_and_searchable() {
    let list = SkipList::new();
    let mut keys: Vec<u32> = (0..2000).collect();
    // Deterministic shuffle without external randomness: reverse + interleave.
    keys.rotate_left(777);
    for k in &keys {
        list.insert(k.to_be_bytes().to_vec(), format!("v{k}").into_bytes());
    }
    assert_eq!(list.len(), 2000);
    for k in 0..2000u32 {
        assert_eq!(list.get(&k.to_be_bytes()), Some(format!("v{k}").into_bytes()));
    }
    let ordered = list.iter();
    for w in ordered.windows(2) {
        assert!(w[0].0 < w[1].0);
    }
}
