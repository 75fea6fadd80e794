//! In-memory chat platform for tests.
//!
//! [`MockChat`] keeps per-channel message history, records every platform call
//! and can play the Tipup bot: with [`MockChat::with_auto_reply`] a reply is
//! appended to the channel as soon as this bot posts anything there.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::chat::{
    BotIdentity, Channel, ChannelId, ChatClient, ChatError, Message, MessageId, User, UserId,
};
use crate::config::DEFAULT_TIPUP_BOT_USER_ID;
use crate::handshake::Sleeper;

#[derive(Debug, Default)]
struct ChannelState {
    text_based: bool,
    messages: Vec<Message>,
    sent: Vec<String>,
    auto_reply: Option<(UserId, String)>,
}

#[derive(Debug, Default)]
struct State {
    users: HashSet<UserId>,
    channels: HashMap<ChannelId, ChannelState>,
    calls: Vec<&'static str>,
    next_id: u64,
}

impl State {
    fn push(&mut self, channel_id: &ChannelId, author_id: UserId, content: String) -> Message {
        self.next_id += 1;
        let message = Message {
            id: MessageId::new(format!("m{}", self.next_id)),
            channel_id: channel_id.clone(),
            author_id,
            content,
        };
        if let Some(channel) = self.channels.get_mut(channel_id) {
            channel.messages.push(message.clone());
        }
        message
    }
}

/// A scripted chat platform.
#[derive(Debug)]
pub struct MockChat {
    bot_id: Option<UserId>,
    fail_deletes: bool,
    fail_history: bool,
    ignore_limit: bool,
    state: Mutex<State>,
}

impl MockChat {
    /// A connection logged in as `bot_id`, with the Tipup bot installed.
    #[must_use]
    pub fn ready(bot_id: &str) -> Self {
        let mut state = State::default();
        state.users.insert(UserId::from(bot_id));
        state.users.insert(UserId::from(DEFAULT_TIPUP_BOT_USER_ID));
        Self {
            bot_id: Some(UserId::from(bot_id)),
            fail_deletes: false,
            fail_history: false,
            ignore_limit: false,
            state: Mutex::new(state),
        }
    }

    /// A connection that has not authenticated yet.
    #[must_use]
    pub fn not_ready() -> Self {
        Self {
            bot_id: None,
            ..Self::ready("unused")
        }
    }

    /// Removes the default Tipup bot from the server.
    #[must_use]
    pub fn without_tipup_bot(self) -> Self {
        self.lock()
            .users
            .remove(&UserId::from(DEFAULT_TIPUP_BOT_USER_ID));
        self
    }

    /// Adds a text channel.
    #[must_use]
    pub fn with_text_channel(self, channel_id: &str) -> Self {
        self.add_channel(channel_id, true)
    }

    /// Adds a channel that does not support text messages.
    #[must_use]
    pub fn with_voice_channel(self, channel_id: &str) -> Self {
        self.add_channel(channel_id, false)
    }

    /// Answers every message this bot posts in `channel_id` with `content`
    /// authored by `author_id`.
    #[must_use]
    pub fn with_auto_reply(self, channel_id: &str, author_id: &str, content: &str) -> Self {
        if let Some(channel) = self.lock().channels.get_mut(&ChannelId::from(channel_id)) {
            channel.auto_reply = Some((UserId::from(author_id), content.to_owned()));
        }
        self
    }

    /// Makes every `delete_message` call fail.
    #[must_use]
    pub const fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    /// Makes every `fetch_recent_messages` call fail.
    #[must_use]
    pub const fn failing_history(mut self) -> Self {
        self.fail_history = true;
        self
    }

    /// Makes `fetch_recent_messages` return the whole history, whatever limit
    /// is asked for.
    #[must_use]
    pub const fn ignoring_history_limit(mut self) -> Self {
        self.ignore_limit = true;
        self
    }

    /// Appends a message from someone else, without recording a call.
    pub fn post(&self, channel_id: &str, author_id: &str, content: &str) {
        self.lock().push(
            &ChannelId::from(channel_id),
            UserId::from(author_id),
            content.to_owned(),
        );
    }

    /// Everything this bot ever posted in `channel_id`, deleted or not.
    #[must_use]
    pub fn sent(&self, channel_id: &str) -> Vec<String> {
        self.lock()
            .channels
            .get(&ChannelId::from(channel_id))
            .map(|c| c.sent.clone())
            .unwrap_or_default()
    }

    /// Current messages in `channel_id`, oldest first.
    #[must_use]
    pub fn history(&self, channel_id: &str) -> Vec<Message> {
        self.lock()
            .channels
            .get(&ChannelId::from(channel_id))
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// Names of the platform calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    fn add_channel(self, channel_id: &str, text_based: bool) -> Self {
        self.lock().channels.insert(
            ChannelId::from(channel_id),
            ChannelState {
                text_based,
                ..ChannelState::default()
            },
        );
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("mock chat state poisoned")
    }
}

impl BotIdentity for MockChat {
    fn current_user_id(&self) -> Option<UserId> {
        self.bot_id.clone()
    }
}

#[async_trait::async_trait]
impl ChatClient for MockChat {
    async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>, ChatError> {
        let mut state = self.lock();
        state.calls.push("fetch_user");
        Ok(state
            .users
            .contains(user_id)
            .then(|| User { id: user_id.clone() }))
    }

    async fn fetch_channel(&self, channel_id: &ChannelId) -> Result<Option<Channel>, ChatError> {
        let mut state = self.lock();
        state.calls.push("fetch_channel");
        Ok(state.channels.get(channel_id).map(|c| Channel {
            id: channel_id.clone(),
            text_based: c.text_based,
        }))
    }

    async fn send_message(
        &self,
        channel_id: &ChannelId,
        content: &str,
    ) -> Result<Message, ChatError> {
        let author = self
            .bot_id
            .clone()
            .ok_or_else(|| ChatError::new("not logged in"))?;
        let mut state = self.lock();
        state.calls.push("send_message");
        let auto_reply = match state.channels.get_mut(channel_id) {
            Some(channel) => {
                channel.sent.push(content.to_owned());
                channel.auto_reply.clone()
            }
            None => return Err(ChatError::new("unknown channel")),
        };
        let message = state.push(channel_id, author, content.to_owned());
        if let Some((reply_author, reply)) = auto_reply {
            state.push(channel_id, reply_author, reply);
        }
        Ok(message)
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &ChannelId,
        limit: usize,
    ) -> Result<Vec<Message>, ChatError> {
        let mut state = self.lock();
        state.calls.push("fetch_recent_messages");
        if self.fail_history {
            return Err(ChatError::new("history unavailable"));
        }
        let limit = if self.ignore_limit { usize::MAX } else { limit };
        Ok(state
            .channels
            .get(channel_id)
            .map(|c| c.messages.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), ChatError> {
        let mut state = self.lock();
        state.calls.push("delete_message");
        if self.fail_deletes {
            return Err(ChatError::new("missing permissions"));
        }
        let channel = state
            .channels
            .get_mut(channel_id)
            .ok_or_else(|| ChatError::new("unknown channel"))?;
        channel.messages.retain(|m| m.id != *message_id);
        Ok(())
    }
}

/// A [`Sleeper`] that returns immediately and records what it was asked for.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Shared view of the requested durations.
    #[must_use]
    pub fn handle(&self) -> Arc<Mutex<Vec<Duration>>> {
        Arc::clone(&self.slept)
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.slept
            .lock()
            .expect("sleeper state poisoned")
            .push(duration);
        Box::pin(async {})
    }
}
