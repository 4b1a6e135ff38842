//! Cooperative cancellation for long-running operations.
//!
//! The core never blocks on I/O, but checking, rewriting, or compiling
//! a very large diagram can take long enough that the caller wants to
//! abandon a stale request when a newer edit supersedes it. Operations
//! poll a shared [`CancelToken`] at coarse boundaries (between phases
//! and between nodes of a walk); on cancellation they return the
//! [`Cancelled`] outcome and no partial result.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// A shared cancellation flag.
///
/// Cloning is cheap and every clone observes the same flag, so a caller
/// can hand one token to an in-flight operation and trip it from
/// another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the flag; every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`cancel`](CancelToken::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Polling helper for `?`-style early exit at a checkpoint.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The outcome of a cancelled operation, distinguishable from any
/// validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_passes_until_cancelled() {
        let token = CancelToken::new();
        assert_eq!(token.checkpoint(), Ok(()));

        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.checkpoint(), Err(Cancelled));
    }
}
