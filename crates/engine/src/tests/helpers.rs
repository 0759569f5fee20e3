use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

pub fn count_sst_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "sst")
                .unwrap_or(false)
        })
        .count()
}

/// Polls `condition` until it returns `true` or `timeout` elapses. Used by
/// tests that depend on the background flush/compaction threads, which run
/// on their own schedule rather than synchronously with the caller.
pub fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let start = Instant::now();
    loop {
        if condition() {
            return true;
        }
        if start.elapsed() >= timeout {
            return condition();
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}
