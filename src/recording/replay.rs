//! Pending-replay release handle
//!
//! Producers attach a release callback to every recording they hand to the
//! broadcaster. The callback fires exactly once, whichever way the recording
//! leaves the broadcaster (streamed, skipped, evicted or rejected).

/// Release callback owned by the producer of a recording
///
/// `release()` consumes the handle. A handle dropped without an explicit
/// release runs its callback on drop.
pub struct PendingReplay {
    callback: Option<Box<dyn FnOnce() + Send>>,
}

impl PendingReplay {
    /// Create a handle that runs `callback` on release
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// Create a handle with nothing to release
    pub fn none() -> Self {
        Self { callback: None }
    }

    /// Release the pending replay
    pub fn release(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

impl Default for PendingReplay {
    fn default() -> Self {
        Self::none()
    }
}

impl Drop for PendingReplay {
    fn drop(&mut self) {
        self.fire();
    }
}

impl std::fmt::Debug for PendingReplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReplay")
            .field("armed", &self.callback.is_some())
            .finish()
    }
}
