//! The combined Tipup client.

use std::sync::Arc;
use std::time::Duration;

use tipup::chat::{ChannelId, ChatClient, UserId};
use tipup::handshake::{Handshake, Sleeper};
use tipup::hooks::HandshakeHooks;
use tipup::payment::{PaymentIntent, PaymentResult};
use tipup::{ApiKey, HandshakeError, TipupConfig};

use crate::error::PaymentClientError;
use crate::payment_client::PaymentClient;

/// One bot's entry point to Tipup: the API key handshake plus payment requests.
///
/// The two halves share only the chat connection's bot identity and the
/// configuration. Typical use is one handshake to get an API key, then a new
/// client built with that key for payments.
#[derive(Debug)]
pub struct TipupClient<C: ?Sized> {
    handshake: Handshake<C>,
    payments: PaymentClient<C>,
}

impl<C: ?Sized> Clone for TipupClient<C> {
    fn clone(&self) -> Self {
        Self {
            handshake: self.handshake.clone(),
            payments: self.payments.clone(),
        }
    }
}

impl<C> TipupClient<C>
where
    C: ChatClient + ?Sized + 'static,
{
    /// Creates a client over a connected chat platform.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentClientError::UrlParse`] if the payment endpoint URL
    /// cannot be derived from the configured API URL.
    pub fn new(chat: Arc<C>, config: TipupConfig) -> Result<Self, PaymentClientError> {
        let config = Arc::new(config);
        let payments = PaymentClient::try_new(Arc::clone(&chat), Arc::clone(&config))?;
        Ok(Self {
            handshake: Handshake::new(chat, config),
            payments,
        })
    }

    /// Replaces the settle-interval timer used by the handshake.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.handshake = self.handshake.with_sleeper(sleeper);
        self
    }

    /// Adds a handshake lifecycle hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl HandshakeHooks + 'static) -> Self {
        self.handshake = self.handshake.with_hook(hook);
        self
    }

    /// Sets a timeout for payment requests.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.payments = self.payments.with_timeout(timeout);
        self
    }

    /// The client's configuration.
    #[must_use]
    pub fn config(&self) -> &TipupConfig {
        self.handshake.config()
    }

    /// The handshake half.
    #[must_use]
    pub const fn handshake(&self) -> &Handshake<C> {
        &self.handshake
    }

    /// The payment half.
    #[must_use]
    pub const fn payments(&self) -> &PaymentClient<C> {
        &self.payments
    }

    /// See [`Handshake::generate_api_key`].
    ///
    /// # Errors
    ///
    /// See [`Handshake::generate_api_key`].
    pub async fn generate_api_key(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
    ) -> Result<(), HandshakeError> {
        self.handshake.generate_api_key(channel_id, user_id).await
    }

    /// See [`Handshake::obtain_api_key`].
    ///
    /// # Errors
    ///
    /// See [`Handshake::obtain_api_key`].
    pub async fn obtain_api_key(&self, channel_id: &ChannelId) -> Result<ApiKey, HandshakeError> {
        self.handshake.obtain_api_key(channel_id).await
    }

    /// See [`Handshake::obtain_api_key_for`].
    ///
    /// # Errors
    ///
    /// See [`Handshake::obtain_api_key_for`].
    pub async fn obtain_api_key_for(
        &self,
        channel_id: &ChannelId,
        subject: &UserId,
    ) -> Result<ApiKey, HandshakeError> {
        self.handshake.obtain_api_key_for(channel_id, subject).await
    }

    /// See [`PaymentClient::request_payment`].
    ///
    /// # Errors
    ///
    /// See [`PaymentClient::request_payment`].
    pub async fn request_payment(
        &self,
        intent: &PaymentIntent,
    ) -> Result<PaymentResult, PaymentClientError> {
        self.payments.request_payment(intent).await
    }
}
