//! Background flush and compaction threads.

use crate::Shared;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, warn};

const IDLE_POLL: Duration = Duration::from_millis(100);

/// Polls the immutable memtable queue and flushes each entry to L0 in
/// FIFO order. Exits once `shutting_down` is set and the queue is empty.
pub fn spawn_flush_thread(shared: Arc<Shared>) -> JoinHandle<()> {
    thread::spawn(move || loop {
        let next = { shared.immutable.lock().expect("immutable queue lock poisoned").pop_front() };

        match next {
            Some(mem) => {
                if let Err(e) = shared.sst_manager.flush_memtable(&mem) {
                    error!(error = %e, "background flush failed");
                }
            }
            None => {
                if shared.shutting_down.load(Ordering::SeqCst) {
                    return;
                }
                thread::sleep(IDLE_POLL);
            }
        }
    })
}

/// Wakes every `interval` to run a threshold-gated compaction. Sleeps in
/// short slices so shutdown is noticed promptly instead of after a full
/// `interval`. Runs one final compaction pass before exiting.
pub fn spawn_compaction_thread(shared: Arc<Shared>, interval: Duration) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            if interruptible_sleep(&shared, interval) {
                break;
            }
            if let Err(e) = shared.sst_manager.compact() {
                warn!(error = %e, "background compaction failed");
            }
        }

        if let Err(e) = shared.sst_manager.compact_force() {
            warn!(error = %e, "final compaction on shutdown failed");
        }
    })
}

/// Sleeps for up to `total`, checking the shutdown flag every [`IDLE_POLL`].
/// Returns `true` if shutdown was observed during the sleep.
fn interruptible_sleep(shared: &Shared, total: Duration) -> bool {
    let mut slept = Duration::ZERO;
    while slept < total {
        if shared.shutting_down.load(Ordering::SeqCst) {
            return true;
        }
        let chunk = IDLE_POLL.min(total - slept);
        thread::sleep(chunk);
        slept += chunk;
    }
    shared.shutting_down.load(Ordering::SeqCst)
}
