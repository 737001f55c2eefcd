//! Back-pressure gate for the ingestion worker (spec.md §4.4): before
//! accepting a task, check resident memory against a configured cap; if
//! above 80%, request a collection hint and re-check before rejecting.
//!
//! There's no generational collector to hint in Rust the way the source's
//! JVM-hosted worker could; `request_collection_hint` is a no-op unless an
//! allocator that supports trimming is plugged in, kept mainly so the
//! two-phase check/hint/re-check shape survives the re-implementation.

use crate::error::IngestError;

pub const MEMORY_PRESSURE_THRESHOLD: f64 = 0.8;

pub trait MemoryMonitor: Send + Sync + 'static {
    fn resident_bytes(&self) -> u64;

    fn request_collection_hint(&self) {}
}

/// Reads resident set size from `/proc/self/statm`, assuming the common
/// 4 KiB page size. Accurate enough for a soft back-pressure signal; not
/// used for anything safety-critical.
pub struct ProcSelfStatmMonitor {
    page_size: u64,
}

impl ProcSelfStatmMonitor {
    pub fn new() -> Self {
        Self { page_size: 4096 }
    }
}

impl Default for ProcSelfStatmMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMonitor for ProcSelfStatmMonitor {
    fn resident_bytes(&self) -> u64 {
        let Ok(contents) = std::fs::read_to_string("/proc/self/statm") else {
            return 0;
        };
        let resident_pages = contents
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        resident_pages * self.page_size
    }
}

pub struct MemoryGuard<M> {
    monitor: M,
    cap_bytes: u64,
}

impl<M: MemoryMonitor> MemoryGuard<M> {
    pub fn new(monitor: M, cap_bytes: u64) -> Self {
        Self { monitor, cap_bytes }
    }

    /// `Ok(())` if the task may proceed, `Err(MemoryPressure)` if resident
    /// memory is still above the threshold after the collection hint.
    pub fn check(&self) -> Result<(), IngestError> {
        let threshold = (self.cap_bytes as f64 * MEMORY_PRESSURE_THRESHOLD) as u64;
        if self.monitor.resident_bytes() < threshold {
            return Ok(());
        }
        self.monitor.request_collection_hint();
        if self.monitor.resident_bytes() < threshold {
            Ok(())
        } else {
            Err(IngestError::MemoryPressure)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    struct StubMonitor {
        bytes: AtomicU64,
        hinted: AtomicU64,
    }

    impl MemoryMonitor for StubMonitor {
        fn resident_bytes(&self) -> u64 {
            self.bytes.load(Ordering::SeqCst)
        }

        fn request_collection_hint(&self) {
            self.hinted.fetch_add(1, Ordering::SeqCst);
            // simulate a hint that frees memory
            self.bytes.store(10, Ordering::SeqCst);
        }
    }

    #[test]
    fn below_threshold_passes_without_hinting() {
        let monitor = StubMonitor { bytes: AtomicU64::new(10), hinted: AtomicU64::new(0) };
        let guard = MemoryGuard::new(monitor, 100);
        assert!(guard.check().is_ok());
        assert_eq!(guard.monitor.hinted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn above_threshold_hints_then_recovers() {
        let monitor = StubMonitor { bytes: AtomicU64::new(90), hinted: AtomicU64::new(0) };
        let guard = MemoryGuard::new(monitor, 100);
        assert!(guard.check().is_ok());
        assert_eq!(guard.monitor.hinted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn still_above_threshold_after_hint_rejects() {
        struct StuckMonitor;
        impl MemoryMonitor for StuckMonitor {
            fn resident_bytes(&self) -> u64 {
                95
            }
        }
        let guard = MemoryGuard::new(StuckMonitor, 100);
        assert!(matches!(guard.check(), Err(IngestError::MemoryPressure)));
    }
}
