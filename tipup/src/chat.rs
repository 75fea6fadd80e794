//! Chat-platform collaborator.
//!
//! The SDK never talks to Discord directly. Callers wrap their already connected
//! and authenticated platform client in a [`ChatClient`] implementation, and the
//! handshake drives it through the handful of operations below.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// A platform user (or bot) identifier, carried verbatim.
    UserId
);
string_id!(
    /// A platform channel identifier.
    ChannelId
);
string_id!(
    /// A platform message identifier.
    MessageId
);

/// A resolved platform user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// The user's identifier.
    pub id: UserId,
}

/// A resolved channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// The channel's identifier.
    pub id: ChannelId,
    /// Whether messages can be posted to and read from this channel.
    pub text_based: bool,
}

/// A message as seen in channel history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Handle used to delete the message later.
    pub id: MessageId,
    /// Channel the message was posted in.
    pub channel_id: ChannelId,
    /// Author of the message.
    pub author_id: UserId,
    /// Plain text body.
    pub content: String,
}

/// A failure reported by the chat platform itself.
#[derive(Debug, thiserror::Error)]
#[error("chat platform error: {0}")]
pub struct ChatError(#[source] Box<dyn std::error::Error + Send + Sync>);

impl ChatError {
    /// Wraps a platform-specific error.
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

/// Exposes the identity the bot is logged in as.
///
/// This is the only piece of chat state the payment requester needs.
pub trait BotIdentity: Send + Sync {
    /// Returns the bot's own user id, or `None` if the connection has not
    /// finished authenticating yet.
    fn current_user_id(&self) -> Option<UserId>;
}

/// A bot identity that is known up front, for callers without a live chat
/// connection (scripts, the CLI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity(pub UserId);

impl BotIdentity for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        Some(self.0.clone())
    }
}

/// Operations the handshake needs from a connected chat platform client.
///
/// Lookups that find nothing return `Ok(None)`; `Err` is reserved for the
/// platform failing to answer.
#[async_trait::async_trait]
pub trait ChatClient: BotIdentity {
    /// Resolves a user or bot by id.
    async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>, ChatError>;

    /// Resolves a channel by id.
    async fn fetch_channel(&self, channel_id: &ChannelId) -> Result<Option<Channel>, ChatError>;

    /// Posts a text message and returns it.
    async fn send_message(&self, channel_id: &ChannelId, content: &str)
    -> Result<Message, ChatError>;

    /// Returns up to `limit` of the channel's latest messages, most recent first.
    async fn fetch_recent_messages(
        &self,
        channel_id: &ChannelId,
        limit: usize,
    ) -> Result<Vec<Message>, ChatError>;

    /// Deletes a message.
    async fn delete_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_transparently() {
        let id = UserId::from("1211252667553419325");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"1211252667553419325\""
        );
        let back: UserId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(back.as_str(), "42");
    }

    #[test]
    fn test_static_identity_is_always_ready() {
        let identity = StaticIdentity(UserId::from("bot"));
        assert_eq!(identity.current_user_id(), Some(UserId::from("bot")));
    }
}
