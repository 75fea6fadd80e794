#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the Tipup payments SDK.
//!
//! Tipup lets a Discord bot charge its users in Tipup tokens or gifts. Before a
//! bot can request payments it needs an API key, which the Tipup service hands
//! out through the chat platform itself: the bot posts a tagged probe message in
//! a channel the Tipup bot can see, the Tipup bot answers in the same channel,
//! and the probe is deleted again.
//!
//! This crate holds everything except the HTTP transport, which lives in
//! `tipup-http`.
//!
//! # Modules
//!
//! - [`chat`] - Chat-platform collaborator traits and identifiers
//! - [`config`] - Client configuration and its builder
//! - [`credential`] - The redacted API key type
//! - [`error`] - Error taxonomy shared by the handshake and payment requests
//! - [`handshake`] - The probe / settle / read-back / cleanup exchange
//! - [`hooks`] - Lifecycle hooks for observing handshakes
//! - [`payment`] - Payment intents, results and their wire bodies
//! - [`protocol`] - Encoding of probe bodies and decoding of replies
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring
//! - `test-util` - Exposes [`testing`], an in-memory chat platform for tests

pub mod chat;
pub mod config;
pub mod credential;
pub mod error;
pub mod handshake;
pub mod hooks;
pub mod payment;
pub mod protocol;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::TipupConfig;
pub use credential::ApiKey;
pub use error::{HandshakeError, PreconditionError};
pub use handshake::Handshake;
