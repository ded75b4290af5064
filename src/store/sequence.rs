use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

/// Monotonic store generation. A reset bumps it; a command that started
/// under an older generation must drop its write-back.
#[derive(Debug, Default)]
pub(crate) struct Generation(AtomicU64);

impl Generation {
    pub fn snapshot(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, seen: u64) -> bool {
        self.snapshot() == seen
    }
}

/// One async mutex per cart-line id. A second mutation targeting the
/// same line queues behind the first instead of racing it, so a slow
/// earlier response can never overwrite a faster later one.
#[derive(Debug, Default)]
pub(crate) struct LineLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl LineLocks {
    pub fn lock_for(&self, line_id: i64) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(line_id)
            .or_default()
            .clone()
    }
}
