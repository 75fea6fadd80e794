//! The API key handshake.
//!
//! Tipup has no direct relationship with the bot's Discord server, so it proves
//! channel ownership by round-tripping a tagged message through its own bot:
//!
//! 1. Check the connection has a bot identity.
//! 2. Resolve the Tipup bot; if the server never installed it, stop here.
//! 3. Resolve the target channel and check it is text-based.
//! 4. Post the probe.
//! 5. Wait the settle interval.
//! 6. Optionally scan the channel's recent messages for the Tipup bot's reply.
//! 7. Delete the probe, whatever happened in step 6.
//!
//! # Cancel safety
//!
//! Once the probe is posted it is owned by a guard. If the handshake future is
//! dropped before step 7 (a `tokio::time::timeout` or `select!` losing branch),
//! the guard spawns the delete on the current Tokio runtime and reports it
//! through [`HandshakeHooks::on_probe_abandoned`]. Dropped outside a runtime,
//! the probe stays and a warning is logged.
//!
//! Two variants share this flow. [`Handshake::generate_api_key`] only signals
//! Tipup (the key is delivered out of band), while [`Handshake::obtain_api_key`]
//! reads the key back from the channel.
//!
//! The probe is visible to channel members for the whole settle interval.
//! Handshakes in different channels are independent and may run concurrently;
//! two in the same channel may pick up each other's reply unless
//! [`ReplyMatch::EchoSubject`](crate::protocol::ReplyMatch::EchoSubject) is
//! configured.

mod guard;
mod sleep;

pub use sleep::{Sleeper, TokioSleeper};

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chat::{ChannelId, ChatClient, Message, UserId};
use crate::config::TipupConfig;
use crate::credential::ApiKey;
use crate::error::{HandshakeError, PreconditionError};
use crate::hooks::{HandshakeHooks, ProbeContext};
use crate::protocol::CorrelationTag;

use guard::{Hooks, ProbeGuard};

/// Runs API key handshakes over a chat connection.
///
/// Holds no per-invocation state; one instance can serve any number of
/// concurrent handshakes.
pub struct Handshake<C: ?Sized> {
    chat: Arc<C>,
    config: Arc<TipupConfig>,
    sleeper: Arc<dyn Sleeper>,
    hooks: Hooks,
}

impl<C: ?Sized> Clone for Handshake<C> {
    fn clone(&self) -> Self {
        Self {
            chat: Arc::clone(&self.chat),
            config: Arc::clone(&self.config),
            sleeper: Arc::clone(&self.sleeper),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl<C: ?Sized> Debug for Handshake<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handshake")
            .field("config", &self.config)
            .field("sleeper", &self.sleeper)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl<C> Handshake<C>
where
    C: ChatClient + ?Sized + 'static,
{
    /// Creates a handshake runner that waits on wall-clock time.
    #[must_use]
    pub fn new(chat: Arc<C>, config: Arc<TipupConfig>) -> Self {
        Self {
            chat,
            config,
            sleeper: Arc::new(TokioSleeper),
            hooks: Arc::from([]),
        }
    }

    /// Replaces the settle-interval timer.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Adds a lifecycle hook. Hooks run in registration order.
    #[must_use]
    pub fn with_hook(mut self, hook: impl HandshakeHooks + 'static) -> Self {
        let mut hooks = (*self.hooks).to_vec();
        hooks.push(Arc::new(hook));
        self.hooks = Arc::from(hooks);
        self
    }

    /// The configuration this runner was built with.
    #[must_use]
    pub fn config(&self) -> &TipupConfig {
        &self.config
    }

    /// Asks Tipup to issue an API key for `user_id`, the server owner.
    ///
    /// Posts `tipup-api-key:<user_id>` in `channel_id`, waits the settle
    /// interval and deletes the probe. No reply is consumed; Tipup delivers the
    /// key to the owner directly.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError`] if a precondition fails or the chat platform
    /// errors before the probe is posted.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned future after the probe was posted still deletes
    /// the probe, on a spawned task. See the [module docs](self).
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "tipup.handshake.generate_api_key", skip_all, fields(channel_id = %channel_id), err)
    )]
    pub async fn generate_api_key(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
    ) -> Result<(), HandshakeError> {
        let tag = CorrelationTag::api_key_for(user_id.as_str());
        self.run(channel_id, tag, false).await.map(|_| ())
    }

    /// Obtains an API key by reading the Tipup bot's reply to a static probe.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::NoReply`] if the Tipup bot did not answer
    /// within the settle interval (the caller may run the handshake again), or
    /// another [`HandshakeError`] if a precondition or the chat platform fails.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned future after the probe was posted still deletes
    /// the probe, on a spawned task. See the [module docs](self).
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "tipup.handshake.obtain_api_key", skip_all, fields(channel_id = %channel_id), err)
    )]
    pub async fn obtain_api_key(&self, channel_id: &ChannelId) -> Result<ApiKey, HandshakeError> {
        self.obtain(channel_id, CorrelationTag::api_key()).await
    }

    /// Like [`Handshake::obtain_api_key`], with `subject` embedded in the probe.
    ///
    /// Required when the configuration uses
    /// [`ReplyMatch::EchoSubject`](crate::protocol::ReplyMatch::EchoSubject).
    ///
    /// # Errors
    ///
    /// Same as [`Handshake::obtain_api_key`].
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned future after the probe was posted still deletes
    /// the probe, on a spawned task. See the [module docs](self).
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "tipup.handshake.obtain_api_key_for", skip_all, fields(channel_id = %channel_id), err)
    )]
    pub async fn obtain_api_key_for(
        &self,
        channel_id: &ChannelId,
        subject: &UserId,
    ) -> Result<ApiKey, HandshakeError> {
        self.obtain(channel_id, CorrelationTag::api_key_for(subject.as_str()))
            .await
    }

    async fn obtain(
        &self,
        channel_id: &ChannelId,
        tag: CorrelationTag,
    ) -> Result<ApiKey, HandshakeError> {
        self.run(channel_id, tag, true)
            .await?
            .ok_or_else(|| HandshakeError::NoReply(channel_id.clone()))
    }

    async fn run(
        &self,
        channel_id: &ChannelId,
        tag: CorrelationTag,
        read_reply: bool,
    ) -> Result<Option<ApiKey>, HandshakeError> {
        let bot_id = self
            .chat
            .current_user_id()
            .ok_or(PreconditionError::ClientNotReady)?;
        if read_reply {
            self.config.reply_codec().check_tag(&tag)?;
        }

        let tipup_bot_id = self.config.tipup_bot_user_id();
        let tipup_bot = self
            .chat
            .fetch_user(tipup_bot_id)
            .await
            .map_err(HandshakeError::chat("failed to fetch the Tipup bot"))?;
        if tipup_bot.is_none() {
            return Err(HandshakeError::TipupBotMissing {
                bot_id: tipup_bot_id.clone(),
            });
        }

        let channel = self
            .chat
            .fetch_channel(channel_id)
            .await
            .map_err(HandshakeError::chat("failed to fetch the channel"))?
            .ok_or_else(|| HandshakeError::ChannelNotFound(channel_id.clone()))?;
        if !channel.text_based {
            return Err(HandshakeError::ChannelNotText(channel.id));
        }

        let probe = self
            .chat
            .send_message(&channel.id, &tag.encode())
            .await
            .map_err(HandshakeError::chat("failed to post the probe"))?;
        #[cfg(feature = "telemetry")]
        tracing::debug!(bot_id = %bot_id, message_id = %probe.id, tag = %tag, "Posted probe");
        #[cfg(not(feature = "telemetry"))]
        let _ = bot_id;

        let guard = ProbeGuard::new(
            Arc::clone(&self.chat),
            Arc::clone(&self.hooks),
            ProbeContext {
                channel_id: channel.id,
                message_id: probe.id,
                tag,
            },
        );
        for hook in self.hooks.iter() {
            hook.after_probe_sent(guard.ctx()).await;
        }

        self.sleeper.sleep(self.config.settle_interval()).await;

        let outcome = if read_reply {
            self.read_reply(guard.ctx()).await.map(Some)
        } else {
            Ok(None)
        };

        guard.release().await;
        outcome
    }

    /// Scans recent history for the first (most recent) reply by the Tipup bot.
    async fn read_reply(&self, ctx: &ProbeContext) -> Result<ApiKey, HandshakeError> {
        let limit = self.config.history_limit();
        let messages = self
            .chat
            .fetch_recent_messages(&ctx.channel_id, limit)
            .await
            .map_err(HandshakeError::chat("failed to fetch recent messages"))?;

        if let Some(key) = self.select_reply(&messages, ctx) {
            return Ok(key);
        }

        #[cfg(feature = "telemetry")]
        tracing::info!(channel_id = %ctx.channel_id, scanned = messages.len().min(limit), "No reply from the Tipup bot");
        for hook in self.hooks.iter() {
            hook.on_reply_missing(ctx).await;
        }
        Err(HandshakeError::NoReply(ctx.channel_id.clone()))
    }

    fn select_reply(&self, messages: &[Message], ctx: &ProbeContext) -> Option<ApiKey> {
        let tipup_bot_id = self.config.tipup_bot_user_id();
        let codec = self.config.reply_codec();
        messages
            .iter()
            .take(self.config.history_limit())
            .filter(|m| m.author_id == *tipup_bot_id)
            .find_map(|m| codec.decode(&m.content, &ctx.tag))
    }
}
