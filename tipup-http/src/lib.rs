#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport for the Tipup payments SDK.
//!
//! [`PaymentClient`] issues authenticated `POST /request-payment` calls.
//! [`TipupClient`] pairs it with the API key [`Handshake`](tipup::Handshake)
//! over the bot's chat connection, which is the usual entry point:
//!
//! ```no_run
//! # async fn run<C: tipup::chat::ChatClient + 'static>(chat: std::sync::Arc<C>) -> Result<(), Box<dyn std::error::Error>> {
//! use tipup::TipupConfig;
//! use tipup::chat::ChannelId;
//! use tipup::payment::PaymentIntent;
//! use tipup_http::TipupClient;
//!
//! let setup = TipupClient::new(chat.clone(), TipupConfig::builder().build()?)?;
//! let key = setup.obtain_api_key(&ChannelId::from("123")).await?;
//!
//! let client = TipupClient::new(chat, TipupConfig::builder().api_key(key).build()?)?;
//! let result = client
//!     .request_payment(&PaymentIntent::tokens("456", 100))
//!     .await?;
//! println!("request {} is {}", result.request_id, result.status);
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

mod client;
pub mod error;
pub mod payment_client;

pub use client::TipupClient;
pub use error::PaymentClientError;
pub use payment_client::PaymentClient;
