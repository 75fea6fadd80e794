//! A client for the Tipup `POST /request-payment` endpoint.
//!
//! ## Features
//!
//! - Uses `reqwest` for async HTTP requests
//! - Supports an optional per-request timeout and a caller-supplied `reqwest::Client`
//! - Integrates with `tracing` if the `telemetry` feature is enabled
//!
//! ## Error Handling
//!
//! The response body is parsed whatever the status, so a failed request still
//! surfaces the service's own `error` message. Preconditions (bot identity, API
//! key) are checked before anything is sent.

use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tipup::chat::BotIdentity;
use tipup::payment::{ErrorBody, PaymentIntent, PaymentResult, RequestPaymentBody};
use tipup::{ApiKey, PreconditionError, TipupConfig};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::error::{PaymentClientError, UNKNOWN_ERROR_MESSAGE};

/// Sends payment requests on behalf of one bot.
pub struct PaymentClient<I: ?Sized> {
    identity: Arc<I>,
    config: Arc<TipupConfig>,
    /// Full URL of `POST /request-payment`
    request_payment_url: Url,
    client: Client,
    timeout: Option<Duration>,
}

impl<I: ?Sized> Clone for PaymentClient<I> {
    fn clone(&self) -> Self {
        Self {
            identity: Arc::clone(&self.identity),
            config: Arc::clone(&self.config),
            request_payment_url: self.request_payment_url.clone(),
            client: self.client.clone(),
            timeout: self.timeout,
        }
    }
}

impl<I: ?Sized> Debug for PaymentClient<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentClient")
            .field("request_payment_url", &self.request_payment_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<I> PaymentClient<I>
where
    I: BotIdentity + ?Sized,
{
    /// Constructs a client for the API URL in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentClientError::UrlParse`] if the endpoint URL cannot be built.
    pub fn try_new(identity: Arc<I>, config: Arc<TipupConfig>) -> Result<Self, PaymentClientError> {
        let request_payment_url = config
            .api_url()
            .join("./request-payment")
            .map_err(|source| PaymentClientError::UrlParse {
                context: "Failed to construct ./request-payment URL",
                source,
            })?;
        Ok(Self {
            identity,
            config,
            request_payment_url,
            client: Client::new(),
            timeout: None,
        })
    }

    /// Uses a preconfigured `reqwest` client (proxies, TLS, pooling).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the computed `./request-payment` URL.
    #[must_use]
    pub const fn request_payment_url(&self) -> &Url {
        &self.request_payment_url
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Asks Tipup to charge the user described by `intent`.
    ///
    /// Each call is one charge attempt. The service's `status` is returned as
    /// sent, without checking it against the known values.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentClientError::Precondition`] without sending anything if
    /// the bot identity or the API key is missing,
    /// [`PaymentClientError::Remote`] for a non-success response, and
    /// [`PaymentClientError::Http`] for transport failures.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "tipup.payment_client.request_payment",
            skip_all,
            fields(
                user_id = %intent.user_id,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty
            ),
            err
        )
    )]
    pub async fn request_payment(
        &self,
        intent: &PaymentIntent,
    ) -> Result<PaymentResult, PaymentClientError> {
        let bot_id = self
            .identity
            .current_user_id()
            .ok_or(PreconditionError::ClientNotReady)?;
        let api_key = self
            .config
            .api_key()
            .ok_or(PreconditionError::ApiKeyMissing)?;

        let body = RequestPaymentBody::new(bot_id, intent);
        let result = self
            .post_json(&self.request_payment_url, "POST /request-payment", api_key, &body)
            .await;

        record_result_on_span(&result);

        result
    }

    /// POSTs `payload` with bearer auth and decodes the answer.
    async fn post_json<T>(
        &self,
        url: &Url,
        context: &'static str,
        api_key: &ApiKey,
        payload: &T,
    ) -> Result<PaymentResult, PaymentClientError>
    where
        T: serde::Serialize + Sync + ?Sized,
    {
        let mut req = self
            .client
            .post(url.clone())
            .bearer_auth(api_key.expose())
            .json(payload);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|source| PaymentClientError::Http { context, source })?;

        let status = http_response.status();
        let bytes = http_response
            .bytes()
            .await
            .map_err(|source| PaymentClientError::Http { context, source })?;

        if status.is_success() {
            serde_json::from_slice::<PaymentResult>(&bytes)
                .map_err(|source| PaymentClientError::JsonDeserialization { context, source })
        } else {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|body| body.error)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_owned());
            Err(PaymentClientError::Remote { status, message })
        }
    }
}

/// Records the outcome of a request on a tracing span, including status and errors.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tipup::chat::{StaticIdentity, UserId};
    use tipup::config::DevOverrides;
    use tipup::payment::PaymentStatus;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    #[derive(Debug)]
    struct NotReady;

    impl BotIdentity for NotReady {
        fn current_user_id(&self) -> Option<UserId> {
            None
        }
    }

    fn config(server: &MockServer, api_key: Option<&str>) -> Arc<TipupConfig> {
        let mut builder = TipupConfig::builder().dev(DevOverrides::new(server.uri(), "tipup-bot"));
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        Arc::new(builder.build().unwrap())
    }

    fn client(server: &MockServer) -> PaymentClient<StaticIdentity> {
        PaymentClient::try_new(
            Arc::new(StaticIdentity(UserId::from("bot-1"))),
            config(server, Some("tipup_key")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_request_payment_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/request-payment"))
            .and(header("authorization", "Bearer tipup_key"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "botId": "bot-1", "userId": "u-1", "tokens": 50 })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "requestId": 42, "status": "PAID" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .request_payment(&PaymentIntent::tokens("u-1", 50))
            .await
            .unwrap();

        assert_eq!(
            result,
            PaymentResult {
                request_id: 42,
                status: PaymentStatus::Paid,
            }
        );
    }

    #[tokio::test]
    async fn test_request_payment_gift_omits_tokens_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/request-payment"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "requestId": 7, "status": "DECLINED" })),
            )
            .mount(&server)
            .await;

        let result = client(&server)
            .request_payment(&PaymentIntent::gift("u-2", "rose"))
            .await
            .unwrap();
        assert_eq!(result.status, PaymentStatus::Declined);

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent, json!({ "botId": "bot-1", "userId": "u-2", "gift": "rose" }));
        assert!(sent.get("tokens").is_none());
    }

    #[tokio::test]
    async fn test_service_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/request-payment"))
            .respond_with(
                ResponseTemplate::new(402).set_body_json(json!({ "error": "insufficient balance" })),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .request_payment(&PaymentIntent::tokens("u-1", 1_000_000))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("insufficient balance"));
        assert_eq!(err.remote_message(), Some("insufficient balance"));
        assert!(matches!(err, PaymentClientError::Remote { status, .. } if status.as_u16() == 402));
    }

    #[tokio::test]
    async fn test_missing_error_field_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/request-payment"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = client(&server)
            .request_payment(&PaymentIntent::tokens("u-1", 1))
            .await
            .unwrap_err();

        assert_eq!(err.remote_message(), Some(UNKNOWN_ERROR_MESSAGE));
        assert!(err.to_string().contains(UNKNOWN_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_non_json_error_body_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/request-payment"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .request_payment(&PaymentIntent::tokens("u-1", 1))
            .await
            .unwrap_err();

        assert_eq!(err.remote_message(), Some(UNKNOWN_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/request-payment"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let err = client(&server)
            .request_payment(&PaymentIntent::tokens("u-1", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentClientError::JsonDeserialization { .. }));
    }

    #[tokio::test]
    async fn test_not_ready_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client =
            PaymentClient::try_new(Arc::new(NotReady), config(&server, Some("tipup_key"))).unwrap();
        let err = client
            .request_payment(&PaymentIntent::tokens("u-1", 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PaymentClientError::Precondition(PreconditionError::ClientNotReady)
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = PaymentClient::try_new(
            Arc::new(StaticIdentity(UserId::from("bot-1"))),
            config(&server, None),
        )
        .unwrap();
        let err = client
            .request_payment(&PaymentIntent::gift("u-1", "rose"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PaymentClientError::Precondition(PreconditionError::ApiKeyMissing)
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let config = Arc::new(
            TipupConfig::builder()
                .api_url("http://127.0.0.1:1")
                .api_key("tipup_key")
                .build()
                .unwrap(),
        );

        let client =
            PaymentClient::try_new(Arc::new(StaticIdentity(UserId::from("bot-1"))), config)
                .unwrap();
        let err = client
            .request_payment(&PaymentIntent::tokens("u-1", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentClientError::Http { .. }));
    }

    #[test]
    fn test_url_under_base_path() {
        let config = Arc::new(
            TipupConfig::builder()
                .api_url("https://staging.tipup.app/v2")
                .build()
                .unwrap(),
        );
        let client =
            PaymentClient::try_new(Arc::new(StaticIdentity(UserId::from("b"))), config).unwrap();
        assert_eq!(
            client.request_payment_url().as_str(),
            "https://staging.tipup.app/v2/request-payment"
        );
    }
}
