//! Payment intents, results and the request/response bodies of
//! `POST /request-payment`.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::chat::UserId;

/// What the user is asked to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// A number of Tipup tokens.
    Tokens(u64),
    /// A gift from the Tipup catalog, by slug.
    Gift(String),
}

/// A single payment request for one recipient.
///
/// The payment method is a closed sum type, so a token amount and a gift can
/// never both be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// The user being charged.
    pub user_id: UserId,
    /// The amount kind.
    pub method: PaymentMethod,
}

impl PaymentIntent {
    /// Charges `user_id` a number of tokens.
    #[must_use]
    pub fn tokens(user_id: impl Into<UserId>, tokens: u64) -> Self {
        Self {
            user_id: user_id.into(),
            method: PaymentMethod::Tokens(tokens),
        }
    }

    /// Charges `user_id` one gift.
    #[must_use]
    pub fn gift(user_id: impl Into<UserId>, slug: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            method: PaymentMethod::Gift(slug.into()),
        }
    }
}

/// JSON body of `POST /request-payment`.
///
/// The inactive one of `tokens` / `gift` is absent from the output, not `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPaymentBody {
    /// The requesting bot's own user id.
    pub bot_id: UserId,
    /// The user being charged.
    pub user_id: UserId,
    /// `tokens` or `gift`.
    #[serde(flatten)]
    pub method: PaymentMethod,
}

impl RequestPaymentBody {
    /// Builds the body for `intent` on behalf of `bot_id`.
    #[must_use]
    pub fn new(bot_id: UserId, intent: &PaymentIntent) -> Self {
        Self {
            bot_id,
            user_id: intent.user_id.clone(),
            method: intent.method.clone(),
        }
    }
}

/// Outcome reported by the service.
///
/// Statuses the SDK does not know are kept verbatim in [`PaymentStatus::Other`]
/// rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    /// `PAID`
    Paid,
    /// `DECLINED`
    Declined,
    /// Any other status string.
    Other(String),
}

impl PaymentStatus {
    /// The status as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "PAID",
            Self::Declined => "DECLINED",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PAID" => Self::Paid,
            "DECLINED" => Self::Declined,
            _ => Self::Other(value),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful response of `POST /request-payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    /// Service-side id of the payment request.
    pub request_id: u64,
    /// The payment decision.
    pub status: PaymentStatus,
}

/// Error response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure reason, if the service sent one.
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_tokens_body_omits_gift() {
        let intent = PaymentIntent::tokens("user-1", 25);
        let body = serde_json::to_value(RequestPaymentBody::new(UserId::from("bot-1"), &intent))
            .unwrap();
        assert_eq!(
            body,
            json!({ "botId": "bot-1", "userId": "user-1", "tokens": 25 })
        );
        assert!(body.get("gift").is_none());
    }

    #[test]
    fn test_gift_body_omits_tokens() {
        let intent = PaymentIntent::gift("user-1", "golden-star");
        let body = serde_json::to_value(RequestPaymentBody::new(UserId::from("bot-1"), &intent))
            .unwrap();
        let Value::Object(map) = body else {
            panic!("expected an object");
        };
        assert_eq!(map.get("gift"), Some(&json!("golden-star")));
        assert!(!map.contains_key("tokens"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_result_deserializes_verbatim() {
        let result: PaymentResult =
            serde_json::from_value(json!({ "requestId": 42, "status": "PAID" })).unwrap();
        assert_eq!(
            result,
            PaymentResult {
                request_id: 42,
                status: PaymentStatus::Paid,
            }
        );
    }

    #[test]
    fn test_unknown_status_is_kept() {
        let result: PaymentResult =
            serde_json::from_value(json!({ "requestId": 7, "status": "PENDING" })).unwrap();
        assert_eq!(result.status, PaymentStatus::Other("PENDING".to_owned()));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "requestId": 7, "status": "PENDING" })
        );
    }

    #[test]
    fn test_error_body_tolerates_missing_field() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.error.is_none());
    }
}
