//! Error types for the Tipup SDK.

use crate::chat::{ChannelId, ChatError, UserId};
use crate::protocol::ProtocolError;

/// Where to send server owners that have not installed the Tipup bot.
pub const INSTALL_URL: &str = "https://tipup.app/add-to-discord";

/// A precondition failed before any network call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    /// The chat connection has no authenticated bot identity yet.
    #[error("client is not ready: the chat connection has no bot identity yet")]
    ClientNotReady,
    /// A payment was requested without an API key configured.
    #[error("API key is not configured")]
    ApiKeyMissing,
}

/// Errors returned by the API key handshake.
///
/// Every variant is terminal for the invocation; nothing is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// A precondition failed.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The Tipup bot could not be resolved by the connection.
    #[error("the Tipup bot ({bot_id}) is not reachable; add it to your server: {}", INSTALL_URL)]
    TipupBotMissing {
        /// The id that was looked up.
        bot_id: UserId,
    },

    /// The target channel does not exist or is not visible to the bot.
    #[error("couldn't find a channel by id {0}")]
    ChannelNotFound(ChannelId),

    /// The target channel exists but does not support text messages.
    #[error("channel {0} is not a text channel")]
    ChannelNotText(ChannelId),

    /// No reply from the Tipup bot was found after the settle interval.
    #[error("no API key reply from the Tipup bot in channel {0}; try again")]
    NoReply(ChannelId),

    /// The probe could not be built for the configured reply policy.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The chat platform failed.
    #[error("{context}: {source}")]
    Chat {
        /// Which step failed.
        context: &'static str,
        /// The platform error.
        #[source]
        source: ChatError,
    },
}

impl HandshakeError {
    /// Whether running the whole handshake again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NoReply(_) | Self::Chat { .. })
    }

    pub(crate) fn chat(context: &'static str) -> impl FnOnce(ChatError) -> Self {
        move |source| Self::Chat { context, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bot_message_has_install_link() {
        let err = HandshakeError::TipupBotMissing {
            bot_id: UserId::from("1211252667553419325"),
        };
        let msg = err.to_string();
        assert!(msg.contains(INSTALL_URL));
        assert!(msg.contains("1211252667553419325"));
    }

    #[test]
    fn test_only_no_reply_and_chat_are_retryable() {
        assert!(HandshakeError::NoReply(ChannelId::from("c")).is_retryable());
        assert!(!HandshakeError::ChannelNotFound(ChannelId::from("c")).is_retryable());
        assert!(!HandshakeError::from(PreconditionError::ClientNotReady).is_retryable());
    }
}
