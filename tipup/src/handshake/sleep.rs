//! The settle-interval timer.
//!
//! The Tipup bot is an independent process with no callback, so the handshake
//! waits a flat interval instead of listening for the reply. The wait goes
//! through [`Sleeper`] so tests can replace wall-clock time.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Suspends the current task for a duration.
///
/// Dropping the returned future cancels the wait.
pub trait Sleeper: Send + Sync + Debug {
    /// Completes after `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Wall-clock sleeper backed by [`tokio::time::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}
