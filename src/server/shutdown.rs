//! Shutdown signalling for the event loop.

use crate::multiplexer::Notify;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Asks a running [`Server`](crate::server::Server) to stop.
///
/// Cheap to clone and safe to use from any thread. Calling
/// [`shutdown`](ShutdownHandle::shutdown) sets a flag and wakes the poll, so
/// `start()` returns at the top of its next iteration.
#[derive(Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    notifier: Arc<dyn Notify>,
}

impl ShutdownHandle {
    pub(crate) fn new(notifier: Arc<dyn Notify>) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            notifier,
        }
    }

    /// Requests shutdown and wakes the event loop.
    pub fn shutdown(&self) {
        self.requested.store(true, Ordering::SeqCst);
        if let Err(e) = self.notifier.notify() {
            warn!(error = %e, "Failed to wake event loop for shutdown");
        }
    }

    /// Returns true once shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("requested", &self.is_requested())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingNotify(AtomicUsize);

    impl Notify for CountingNotify {
        fn notify(&self) -> io::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_shutdown_sets_flag_and_notifies() {
        let notify = Arc::new(CountingNotify::default());
        let handle = ShutdownHandle::new(notify.clone());
        let clone = handle.clone();

        assert!(!handle.is_requested());
        clone.shutdown();

        assert!(handle.is_requested());
        assert_eq!(notify.0.load(Ordering::SeqCst), 1);
    }
}
