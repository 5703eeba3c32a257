use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters of successful operations, shared by every clone of a backend.
#[derive(Clone, Default)]
pub struct StoreStats {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    puts: AtomicU64,
    gets: AtomicU64,
    deletes: AtomicU64,
    bytes_written: AtomicU64,
}

impl StoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_put(&self, bytes: u64) {
        self.inner.puts.fetch_add(1, Ordering::Relaxed);
        self.inner.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_get(&self) {
        self.inner.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.inner.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            puts: self.inner.puts.load(Ordering::Relaxed),
            gets: self.inner.gets.load(Ordering::Relaxed),
            deletes: self.inner.deletes.load(Ordering::Relaxed),
            bytes_written: self.inner.bytes_written.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("StoreStats")
            .field("puts", &snapshot.puts)
            .field("gets", &snapshot.gets)
            .field("deletes", &snapshot.deletes)
            .field("bytes_written", &snapshot.bytes_written)
            .finish()
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    pub puts: u64,
    pub gets: u64,
    pub deletes: u64,
    pub bytes_written: u64,
}
