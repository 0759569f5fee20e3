use super::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn miss_then_hit_invokes_loader_once() {
    let cache = BlockCache::new(100);
    let path = PathBuf::from("/tmp/a.sst");
    let calls = AtomicUsize::new(0);

    let load = || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1, 2, 3])
    };

    let first = cache.get_with(&path, 0, load).unwrap();
    assert_eq!(*first, vec![1, 2, 3]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = cache.get_with(&path, 0, load).unwrap();
    assert_eq!(*second, vec![1, 2, 3]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn different_offsets_are_distinct_keys() {
    let cache = BlockCache::new(100);
    let path = PathBuf::from("/tmp/a.sst");

    let a = cache.get_with(&path, 0, || Ok(vec![1])).unwrap();
    let b = cache.get_with(&path, 4096, || Ok(vec![2])).unwrap();
    assert_eq!(*a, vec![1]);
    assert_eq!(*b, vec![2]);
}

#[test]
fn different_paths_are_distinct_keys() {
    let cache = BlockCache::new(100);
    let a = cache
        .get_with(&PathBuf::from("/tmp/a.sst"), 0, || Ok(vec![1]))
        .unwrap();
    let b = cache
        .get_with(&PathBuf::from("/tmp/b.sst"), 0, || Ok(vec![2]))
        .unwrap();
    assert_eq!(*a, vec![1]);
    assert_eq!(*b, vec![2]);
}

#[test]
fn loader_error_is_propagated() {
    let cache = BlockCache::new(100);
    let path = PathBuf::from("/tmp/a.sst");
    let result = cache.get_with(&path, 0, || {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "nope"))
    });
    assert!(result.is_err());
}

#[test]
fn invalidate_file_removes_all_its_blocks() {
    let cache = BlockCache::new(100);
    let a = PathBuf::from("/tmp/a.sst");
    let b = PathBuf::from("/tmp/b.sst");

    cache.get_with(&a, 0, || Ok(vec![1])).unwrap();
    cache.get_with(&a, 10, || Ok(vec![2])).unwrap();
    cache.get_with(&b, 0, || Ok(vec![3])).unwrap();

    cache.invalidate_file(&a);
    cache.cache.run_pending_tasks();

    let calls = AtomicUsize::new(0);
    cache
        .get_with(&a, 0, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1])
        })
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1, "block for a.sst was reloaded after invalidation");

    let still_calls = AtomicUsize::new(0);
    cache
        .get_with(&b, 0, || {
            still_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![3])
        })
        .unwrap();
    assert_eq!(still_calls.load(Ordering::SeqCst), 0, "b.sst block should still be cached");
}

#[test]
fn empty_cache_reports_empty() {
    let cache = BlockCache::new(10);
    assert!(cache.is_empty());
    cache.get_with(&PathBuf::from("/tmp/a.sst"), 0, || Ok(vec![1])).unwrap();
    assert!(!cache.is_empty());
}
