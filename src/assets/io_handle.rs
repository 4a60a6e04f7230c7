use std::sync::mpsc;
use std::time::Duration;

/// Handle to an IO task running on the [`IoRuntime`](super::IoRuntime).
///
/// The task runs with real wakers on the runtime's worker thread; only the
/// result travels through a channel, so the handle can be checked from a frame
/// loop without blocking.
pub struct IoHandle<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> IoHandle<T> {
    pub fn new(receiver: mpsc::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Returns the result if the task has completed.
    ///
    /// Consumes the value: later calls return `Empty` or `Disconnected`.
    pub fn try_recv(&self) -> Result<T, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Blocks until the task completes or `timeout` passes.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
