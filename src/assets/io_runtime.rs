use std::future::Future;
use std::sync::Arc;

use super::io_handle::IoHandle;
use super::source::AssetError;

/// Runtime for spawning asset fetches.
///
/// Bridges the renderer's cooperative, once-per-frame polling with a real
/// async runtime that drives the IO futures: a tokio multi-thread runtime
/// with one worker thread. Clone is cheap (Arc-wrapped).
///
/// # Example
///
/// ```ignore
/// let io = IoRuntime::new()?;
/// let handle = io.run(source.read("model.obj"));
/// // Later, once per frame:
/// if let Some(bytes) = handle.try_recv() { /* ... */ }
/// ```
#[derive(Clone)]
pub struct IoRuntime {
    inner: Arc<IoRuntimeInner>,
}

struct IoRuntimeInner {
    runtime: tokio::runtime::Runtime,
}

impl IoRuntime {
    /// Starts a tokio runtime with one worker thread dedicated to IO.
    pub fn new() -> Result<Self, AssetError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("fogmap-io")
            .enable_all()
            .build()
            .map_err(AssetError::Runtime)?;

        Ok(Self {
            inner: Arc::new(IoRuntimeInner { runtime }),
        })
    }

    /// Spawns an async IO future on the runtime.
    ///
    /// Returns an [`IoHandle`] that can be checked with `try_recv()` or waited
    /// on with `recv_timeout()`. Dropping the handle does not cancel the task;
    /// its result is discarded.
    pub fn run<T, F>(&self, future: F) -> IoHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (sender, receiver) = std::sync::mpsc::channel();

        self.inner.runtime.spawn(async move {
            let result = future.await;
            let _ = sender.send(result);
        });

        IoHandle::new(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const PATIENCE: Duration = Duration::from_secs(5);

    #[test]
    fn run_simple_task() {
        let io = IoRuntime::new().unwrap();
        let handle = io.run(async { 42u32 });
        assert_eq!(handle.recv_timeout(PATIENCE), Ok(42));
    }

    #[test]
    fn run_with_tokio_sleep() {
        let io = IoRuntime::new().unwrap();
        let handle = io.run(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            99u32
        });

        assert!(handle.try_recv().is_err());
        assert_eq!(handle.recv_timeout(PATIENCE), Ok(99));
    }

    #[test]
    fn multiple_concurrent_tasks() {
        let io = IoRuntime::new().unwrap();
        let h1 = io.run(async { 1u32 });
        let h2 = io.run(async { 2u32 });
        let h3 = io.run(async { 3u32 });

        assert_eq!(h3.recv_timeout(PATIENCE), Ok(3));
        assert_eq!(h1.recv_timeout(PATIENCE), Ok(1));
        assert_eq!(h2.recv_timeout(PATIENCE), Ok(2));
    }
}
