use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// All-or-nothing readiness of the GPU resource set.
///
/// Set with `Release` only after the resource set is stored, read with
/// `Acquire`, so a reader that sees `true` also sees every resource the join
/// step created. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct ReadyFlag {
    inner: Arc<AtomicBool>,
}

impl ReadyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self) {
        self.inner.store(true, Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        self.inner.store(false, Ordering::Release);
    }
}
