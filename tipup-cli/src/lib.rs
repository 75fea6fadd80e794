//! Command-line access to the Tipup payment API.
//!
//! # Modules
//!
//! - [`config`] — TOML configuration with environment variable expansion

pub mod config;
