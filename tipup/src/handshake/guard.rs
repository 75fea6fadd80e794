//! Deletion of the probe message, including when a handshake is dropped
//! while its probe is still posted.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::chat::ChatClient;
use crate::hooks::{HandshakeHooks, ProbeContext};

pub(super) type Hooks = Arc<[Arc<dyn HandshakeHooks>]>;

/// Owns a posted probe until it is deleted.
///
/// [`ProbeGuard::release`] deletes it in line. If the guard is dropped before
/// that finishes, the delete is spawned on the current Tokio runtime.
pub(super) struct ProbeGuard<C: ChatClient + ?Sized + 'static> {
    chat: Arc<C>,
    hooks: Hooks,
    ctx: ProbeContext,
    armed: bool,
}

impl<C: ChatClient + ?Sized + 'static> ProbeGuard<C> {
    pub(super) fn new(chat: Arc<C>, hooks: Hooks, ctx: ProbeContext) -> Self {
        Self {
            chat,
            hooks,
            ctx,
            armed: true,
        }
    }

    pub(super) const fn ctx(&self) -> &ProbeContext {
        &self.ctx
    }

    /// Deletes the probe and disarms the guard.
    pub(super) async fn release(mut self) {
        delete_probe(&*self.chat, &self.hooks, &self.ctx).await;
        self.armed = false;
    }
}

impl<C: ChatClient + ?Sized + 'static> Drop for ProbeGuard<C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let ctx = self.ctx.clone();
        let Ok(handle) = Handle::try_current() else {
            #[cfg(feature = "telemetry")]
            tracing::warn!(
                channel_id = %ctx.channel_id,
                message_id = %ctx.message_id,
                "Handshake dropped outside a Tokio runtime, probe left in channel"
            );
            return;
        };

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            channel_id = %ctx.channel_id,
            message_id = %ctx.message_id,
            "Handshake dropped, deleting probe in the background"
        );
        let chat = Arc::clone(&self.chat);
        let hooks = Arc::clone(&self.hooks);
        handle.spawn(async move {
            for hook in hooks.iter() {
                hook.on_probe_abandoned(&ctx).await;
            }
            delete_probe(&*chat, &hooks, &ctx).await;
        });
    }
}

/// Deletes the probe. Failure is reported to hooks and logged, never returned.
pub(super) async fn delete_probe<C: ChatClient + ?Sized>(
    chat: &C,
    hooks: &[Arc<dyn HandshakeHooks>],
    ctx: &ProbeContext,
) {
    if let Err(err) = chat.delete_message(&ctx.channel_id, &ctx.message_id).await {
        #[cfg(feature = "telemetry")]
        tracing::warn!(
            channel_id = %ctx.channel_id,
            message_id = %ctx.message_id,
            error = %err,
            "Failed to delete probe message"
        );
        for hook in hooks {
            hook.on_cleanup_failure(ctx, &err).await;
        }
    }
}
