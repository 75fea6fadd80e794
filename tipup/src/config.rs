//! Client configuration.
//!
//! A [`TipupConfig`] is assembled once through [`TipupConfigBuilder`] and never
//! mutated afterwards. Production defaults point at the public Tipup service;
//! [`DevOverrides`] swaps both the API URL and the Tipup bot id for staging.
//!
//! ```
//! use tipup::config::{DevOverrides, TipupConfig};
//!
//! let config = TipupConfig::builder()
//!     .api_key("tipup_0123")
//!     .dev(DevOverrides::new("http://localhost:8787", "42"))
//!     .build()
//!     .unwrap();
//! assert_eq!(config.api_url().as_str(), "http://localhost:8787/");
//! ```

use std::time::Duration;

use url::Url;

use crate::chat::UserId;
use crate::credential::ApiKey;
use crate::protocol::{REPLY_PREFIX, ReplyCodec, ReplyMatch};

/// Production Tipup API.
pub const DEFAULT_API_URL: &str = "https://api.tipup.app";

/// User id of the production Tipup bot.
pub const DEFAULT_TIPUP_BOT_USER_ID: &str = "1211252667553419325";

/// How long the handshake waits for the Tipup bot to answer a probe.
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_millis(5000);

/// How many recent channel messages are scanned for the reply.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Endpoint overrides for non-production environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevOverrides {
    /// Base URL of the Tipup API.
    pub api_url: String,
    /// User id of the Tipup bot in that environment.
    pub tipup_bot_user_id: UserId,
}

impl DevOverrides {
    /// Creates overrides for both endpoints.
    #[must_use]
    pub fn new(api_url: impl Into<String>, tipup_bot_user_id: impl Into<UserId>) -> Self {
        Self {
            api_url: api_url.into(),
            tipup_bot_user_id: tipup_bot_user_id.into(),
        }
    }
}

/// Errors raised while building a [`TipupConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The API URL could not be parsed.
    #[error("invalid Tipup API URL {url:?}: {source}")]
    InvalidApiUrl {
        /// The rejected value.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The history limit must allow at least one message.
    #[error("history limit must be at least 1")]
    EmptyHistory,
}

/// Immutable client configuration shared by the handshake and payment requests.
#[derive(Debug, Clone)]
pub struct TipupConfig {
    api_url: Url,
    tipup_bot_user_id: UserId,
    api_key: Option<ApiKey>,
    settle_interval: Duration,
    history_limit: usize,
    reply_codec: ReplyCodec,
}

impl TipupConfig {
    /// Starts a builder with production defaults.
    #[must_use]
    pub fn builder() -> TipupConfigBuilder {
        TipupConfigBuilder::default()
    }

    /// Base URL of the Tipup API, always ending in `/`.
    #[must_use]
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// User id of the Tipup bot.
    #[must_use]
    pub const fn tipup_bot_user_id(&self) -> &UserId {
        &self.tipup_bot_user_id
    }

    /// The API key, if one was supplied.
    #[must_use]
    pub const fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    /// Wait between posting a probe and reading the reply.
    #[must_use]
    pub const fn settle_interval(&self) -> Duration {
        self.settle_interval
    }

    /// Number of recent messages scanned for the reply.
    #[must_use]
    pub const fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Decoder for the Tipup bot's reply.
    #[must_use]
    pub const fn reply_codec(&self) -> &ReplyCodec {
        &self.reply_codec
    }
}

/// Builder for [`TipupConfig`].
#[derive(Debug, Clone)]
pub struct TipupConfigBuilder {
    api_url: String,
    tipup_bot_user_id: UserId,
    api_key: Option<ApiKey>,
    settle_interval: Duration,
    history_limit: usize,
    reply_prefix: String,
    reply_match: ReplyMatch,
}

impl Default for TipupConfigBuilder {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            tipup_bot_user_id: UserId::from(DEFAULT_TIPUP_BOT_USER_ID),
            api_key: None,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
            history_limit: DEFAULT_HISTORY_LIMIT,
            reply_prefix: REPLY_PREFIX.to_owned(),
            reply_match: ReplyMatch::default(),
        }
    }
}

impl TipupConfigBuilder {
    /// Sets the API key used for payment requests.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<ApiKey>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Points the client at a non-production Tipup deployment.
    #[must_use]
    pub fn dev(mut self, overrides: DevOverrides) -> Self {
        self.api_url = overrides.api_url;
        self.tipup_bot_user_id = overrides.tipup_bot_user_id;
        self
    }

    /// Overrides only the API URL.
    #[must_use]
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Overrides only the Tipup bot id.
    #[must_use]
    pub fn tipup_bot_user_id(mut self, id: impl Into<UserId>) -> Self {
        self.tipup_bot_user_id = id.into();
        self
    }

    /// Sets the wait between probe and read-back.
    #[must_use]
    pub const fn settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    /// Sets how many recent messages are scanned for the reply.
    #[must_use]
    pub const fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Sets the expected reply prefix.
    #[must_use]
    pub fn reply_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reply_prefix = prefix.into();
        self
    }

    /// Sets how replies are attributed to probes.
    #[must_use]
    pub const fn reply_match(mut self, matching: ReplyMatch) -> Self {
        self.reply_match = matching;
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the API URL does not parse or the history
    /// limit is zero.
    pub fn build(self) -> Result<TipupConfig, ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        // Normalize to exactly one trailing slash so endpoint joins append.
        let mut normalized = self.api_url.trim_end_matches('/').to_owned();
        normalized.push('/');
        let api_url = Url::parse(&normalized).map_err(|source| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            source,
        })?;
        Ok(TipupConfig {
            api_url,
            tipup_bot_user_id: self.tipup_bot_user_id,
            api_key: self.api_key,
            settle_interval: self.settle_interval,
            history_limit: self.history_limit,
            reply_codec: ReplyCodec::new(self.reply_prefix, self.reply_match),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production() {
        let config = TipupConfig::builder().build().unwrap();
        assert_eq!(config.api_url().as_str(), "https://api.tipup.app/");
        assert_eq!(config.tipup_bot_user_id().as_str(), DEFAULT_TIPUP_BOT_USER_ID);
        assert_eq!(config.settle_interval(), Duration::from_secs(5));
        assert_eq!(config.history_limit(), 10);
        assert!(config.api_key().is_none());
        assert_eq!(config.reply_codec().prefix(), "tipup_");
    }

    #[test]
    fn test_dev_overrides_both_endpoints() {
        let config = TipupConfig::builder()
            .dev(DevOverrides::new("http://localhost:3000/api//", "99"))
            .build()
            .unwrap();
        assert_eq!(config.api_url().as_str(), "http://localhost:3000/api/");
        assert_eq!(config.tipup_bot_user_id().as_str(), "99");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = TipupConfig::builder().api_url("not a url").build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApiUrl { .. }));
    }

    #[test]
    fn test_zero_history_is_rejected() {
        let err = TipupConfig::builder().history_limit(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyHistory));
    }
}
