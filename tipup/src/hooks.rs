//! Lifecycle hooks for the API key handshake.
//!
//! Hooks observe a handshake at the points where something happens outside the
//! caller's view:
//!
//! - **After probe sent**: the probe is now visible in the channel
//! - **On reply missing**: the settle interval passed without a usable reply
//! - **On cleanup failure**: the probe could not be deleted
//! - **On probe abandoned**: the caller dropped the handshake while its probe
//!   was still posted; deletion continues on a background task
//!
//! Probe deletion is advisory and its failure never fails the handshake, so
//! [`HandshakeHooks::on_cleanup_failure`] is the only place it is reported
//! besides the `telemetry` log.
//!
//! All methods have default no-op implementations. Implement only the hooks
//! you need.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use crate::chat::{ChannelId, ChatError, MessageId};
use crate::protocol::CorrelationTag;

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Context passed to every handshake hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeContext {
    /// Channel the probe was posted in.
    pub channel_id: ChannelId,
    /// The probe message.
    pub message_id: MessageId,
    /// The tag the probe carries.
    pub tag: CorrelationTag,
}

/// Observers for handshake side effects.
///
/// This trait is dyn-compatible so a client can hold a heterogeneous list.
pub trait HandshakeHooks: Send + Sync + Debug {
    /// Called right after the probe was posted.
    fn after_probe_sent<'a>(&'a self, _ctx: &'a ProbeContext) -> BoxFut<'a, ()> {
        Box::pin(async {})
    }

    /// Called when no reply was found among the recent messages.
    fn on_reply_missing<'a>(&'a self, _ctx: &'a ProbeContext) -> BoxFut<'a, ()> {
        Box::pin(async {})
    }

    /// Called when the handshake future was dropped before it deleted its
    /// probe. Runs on the background task that deletes it, before the delete.
    fn on_probe_abandoned<'a>(&'a self, _ctx: &'a ProbeContext) -> BoxFut<'a, ()> {
        Box::pin(async {})
    }

    /// Called when deleting the probe failed.
    fn on_cleanup_failure<'a>(
        &'a self,
        _ctx: &'a ProbeContext,
        _error: &'a ChatError,
    ) -> BoxFut<'a, ()> {
        Box::pin(async {})
    }
}
