//! Message bodies exchanged with the Tipup bot.
//!
//! The handshake multiplexes correlation and payload into plain chat messages,
//! so this module is the one place that knows what those messages look like.
//!
//! # Wire format
//!
//! Everything below is version [`WIRE_VERSION`] of the format. A change to
//! either message shape bumps it.
//!
//! Probe (posted by this bot):
//!
//! ```text
//! tipup-api-key              static sentinel
//! tipup-api-key:<subject>    sentinel carrying a subject id (usually the owner's user id)
//! ```
//!
//! The general shape is `<namespace>-<purpose>[:<subject>]`. The namespace is
//! always `tipup`; the purpose has no `:` in it; the subject is opaque and must
//! not be empty when present.
//!
//! Reply (posted by the Tipup bot): text starting with [`REPLY_PREFIX`] and
//! carrying at least one character after it. The whole message content is the
//! API key; a message that is only the prefix carries no key and is skipped.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::credential::ApiKey;

/// Version of the probe/reply wire format implemented here.
pub const WIRE_VERSION: u8 = 1;

/// Namespace every Tipup correlation tag starts with.
pub const NAMESPACE: &str = "tipup";

/// Purpose segment of the API key probe.
pub const API_KEY_PURPOSE: &str = "api-key";

/// Prefix of the Tipup bot's API key reply.
pub const REPLY_PREFIX: &str = "tipup_";

/// Errors raised while parsing a probe body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The body does not start with the `tipup-` namespace.
    #[error("not a tipup correlation tag: {0:?}")]
    ForeignNamespace(String),
    /// The purpose segment is empty.
    #[error("correlation tag has no purpose: {0:?}")]
    MissingPurpose(String),
    /// A `:` separator is present but nothing follows it.
    #[error("correlation tag has an empty subject: {0:?}")]
    EmptySubject(String),
    /// Strict reply matching was requested for a probe that carries no subject.
    #[error("reply matching by subject requires a probe with a subject id")]
    SubjectRequired,
}

/// The marker embedded in a probe message.
///
/// Its literal form is a contract with the Tipup bot, not free text; build it
/// through the constructors and render it with [`CorrelationTag::encode`].
/// Tags are encoded and parsed in wire format version [`WIRE_VERSION`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationTag {
    purpose: String,
    subject: Option<String>,
}

impl CorrelationTag {
    /// The static `tipup-api-key` sentinel.
    #[must_use]
    pub fn api_key() -> Self {
        Self {
            purpose: API_KEY_PURPOSE.to_owned(),
            subject: None,
        }
    }

    /// `tipup-api-key:<subject>`.
    #[must_use]
    pub fn api_key_for(subject: impl Into<String>) -> Self {
        Self {
            purpose: API_KEY_PURPOSE.to_owned(),
            subject: Some(subject.into()),
        }
    }

    /// The purpose segment, e.g. `api-key`.
    #[must_use]
    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// The embedded subject id, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Renders the message body.
    #[must_use]
    pub fn encode(&self) -> String {
        match &self.subject {
            Some(subject) => format!("{NAMESPACE}-{}:{subject}", self.purpose),
            None => format!("{NAMESPACE}-{}", self.purpose),
        }
    }

    /// Parses a message body back into a tag.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the body is not a well-formed tag.
    pub fn parse(body: &str) -> Result<Self, ProtocolError> {
        let rest = body
            .strip_prefix(NAMESPACE)
            .and_then(|r| r.strip_prefix('-'))
            .ok_or_else(|| ProtocolError::ForeignNamespace(body.to_owned()))?;
        let (purpose, subject) = match rest.split_once(':') {
            Some((purpose, subject)) => {
                if subject.is_empty() {
                    return Err(ProtocolError::EmptySubject(body.to_owned()));
                }
                (purpose, Some(subject.to_owned()))
            }
            None => (rest, None),
        };
        if purpose.is_empty() {
            return Err(ProtocolError::MissingPurpose(body.to_owned()));
        }
        Ok(Self {
            purpose: purpose.to_owned(),
            subject,
        })
    }
}

impl Display for CorrelationTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for CorrelationTag {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// How a reply is attributed to a probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplyMatch {
    /// Author and prefix only. This is what the Tipup bot supports today; two
    /// probes racing in the same channel can pick up each other's reply.
    #[default]
    AuthorAndPrefix,
    /// Additionally require the reply to echo the probe's subject id.
    EchoSubject,
}

/// Decoder for the Tipup bot's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyCodec {
    prefix: String,
    matching: ReplyMatch,
}

impl Default for ReplyCodec {
    fn default() -> Self {
        Self::new(REPLY_PREFIX, ReplyMatch::default())
    }
}

impl ReplyCodec {
    /// Creates a decoder for replies starting with `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>, matching: ReplyMatch) -> Self {
        Self {
            prefix: prefix.into(),
            matching,
        }
    }

    /// The expected reply prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The attribution policy.
    #[must_use]
    pub const fn matching(&self) -> ReplyMatch {
        self.matching
    }

    /// Checks that `tag` can be matched under this codec's policy.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SubjectRequired`] for [`ReplyMatch::EchoSubject`]
    /// with a tag that has no subject.
    pub fn check_tag(&self, tag: &CorrelationTag) -> Result<(), ProtocolError> {
        match self.matching {
            ReplyMatch::EchoSubject if tag.subject().is_none() => {
                Err(ProtocolError::SubjectRequired)
            }
            _ => Ok(()),
        }
    }

    /// Extracts the API key from a reply to `tag`, or `None` if `content` is
    /// not such a reply. The full content is the key, and it must be longer
    /// than the prefix alone.
    #[must_use]
    pub fn decode(&self, content: &str, tag: &CorrelationTag) -> Option<ApiKey> {
        if content.len() <= self.prefix.len() || !content.starts_with(&self.prefix) {
            return None;
        }
        if self.matching == ReplyMatch::EchoSubject {
            let subject = tag.subject()?;
            if !content.contains(subject) {
                return None;
            }
        }
        Some(ApiKey::new(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_static_sentinel() {
        assert_eq!(WIRE_VERSION, 1);
        assert_eq!(CorrelationTag::api_key().encode(), "tipup-api-key");
    }

    #[test]
    fn test_encode_with_subject() {
        let tag = CorrelationTag::api_key_for("123456789");
        assert_eq!(tag.encode(), "tipup-api-key:123456789");
        assert_eq!(tag.to_string(), "tipup-api-key:123456789");
    }

    #[test]
    fn test_parse_accepts_both_forms() {
        assert_eq!(
            CorrelationTag::parse("tipup-api-key").unwrap(),
            CorrelationTag::api_key()
        );
        let tag: CorrelationTag = "tipup-api-key:42".parse().unwrap();
        assert_eq!(tag.purpose(), "api-key");
        assert_eq!(tag.subject(), Some("42"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            CorrelationTag::parse("hello"),
            Err(ProtocolError::ForeignNamespace(_))
        ));
        assert!(matches!(
            CorrelationTag::parse("tipupapi-key"),
            Err(ProtocolError::ForeignNamespace(_))
        ));
        assert!(matches!(
            CorrelationTag::parse("tipup-"),
            Err(ProtocolError::MissingPurpose(_))
        ));
        assert!(matches!(
            CorrelationTag::parse("tipup-api-key:"),
            Err(ProtocolError::EmptySubject(_))
        ));
    }

    #[test]
    fn test_decode_returns_full_content() {
        let codec = ReplyCodec::default();
        let key = codec
            .decode("tipup_abc123", &CorrelationTag::api_key())
            .unwrap();
        assert_eq!(key.expose(), "tipup_abc123");
    }

    #[test]
    fn test_decode_ignores_other_messages() {
        let codec = ReplyCodec::default();
        let tag = CorrelationTag::api_key();
        assert!(codec.decode("hello there", &tag).is_none());
        assert!(codec.decode("tipup-api-key", &tag).is_none());
    }

    #[test]
    fn test_bare_prefix_carries_no_key() {
        let codec = ReplyCodec::default();
        let tag = CorrelationTag::api_key();
        assert!(codec.decode(REPLY_PREFIX, &tag).is_none());
        assert_eq!(codec.decode("tipup_x", &tag).unwrap().expose(), "tipup_x");
    }

    #[test]
    fn test_echo_subject_requires_subject_in_reply() {
        let codec = ReplyCodec::new(REPLY_PREFIX, ReplyMatch::EchoSubject);
        let tag = CorrelationTag::api_key_for("owner-7");
        assert!(codec.decode("tipup_xyz", &tag).is_none());
        assert!(codec.decode("tipup_owner-7_xyz", &tag).is_some());
        assert_eq!(
            codec.check_tag(&CorrelationTag::api_key()),
            Err(ProtocolError::SubjectRequired)
        );
        assert!(codec.check_tag(&tag).is_ok());
    }
}
