use crate::config::GatewayConfig;
use crate::domain::gateway::{PgCancelRequest, PgCancelResponse, PgPaymentResponse};
use crate::domain::ports::PaymentGatewayClient;
use crate::error::{GatewayError, PaymentError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Toss Payments client built on reqwest.
///
/// Transport failures (connect errors, timeouts) are retried with capped
/// exponential backoff. Error statuses are classified once and never retried.
pub struct TossPaymentsClient {
    http: Client,
    config: GatewayConfig,
}

impl TossPaymentsClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .map_err(|e| PaymentError::Config(format!("cannot build PG HTTP client: {e}")))?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn send_with_retry<F>(
        &self,
        operation: &'static str,
        build: F,
    ) -> std::result::Result<Response, GatewayError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 1;
        loop {
            let request = build().basic_auth(&self.config.secret_key, Some(""));
            match request.send().await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < self.config.max_attempts => {
                    let backoff = self.config.backoff_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "PG request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(operation, attempt, error = %err, "PG request failed, giving up");
                    return Err(GatewayError::Transport(err.to_string()));
                }
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(
    response: Response,
    classify: fn(u16) -> GatewayError,
) -> std::result::Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let err = classify(status.as_u16());
        warn!(status = status.as_u16(), body = %body, error = %err, "PG returned an error status");
        return Err(err);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::MalformedResponse(e.to_string()))
}

#[async_trait]
impl PaymentGatewayClient for TossPaymentsClient {
    async fn get_payment(
        &self,
        payment_key: &str,
    ) -> std::result::Result<PgPaymentResponse, GatewayError> {
        let url = self.url(&format!("/v1/payments/{payment_key}"));
        debug!(pg_payment_key = payment_key, "fetching PG payment");
        let response = self
            .send_with_retry("get_payment", || self.http.get(&url))
            .await?;
        decode(response, GatewayError::from_get_status).await
    }

    async fn cancel_payment(
        &self,
        payment_key: &str,
        request: PgCancelRequest,
    ) -> std::result::Result<PgCancelResponse, GatewayError> {
        let url = self.url(&format!("/v1/payments/{payment_key}/cancel"));
        // Same key on every attempt, so a retried cancel is applied once.
        let idempotency_key = Uuid::new_v4().to_string();
        debug!(pg_payment_key = payment_key, "cancelling PG payment");
        let response = self
            .send_with_retry("cancel_payment", || {
                self.http
                    .post(&url)
                    .header(IDEMPOTENCY_KEY_HEADER, &idempotency_key)
                    .json(&request)
            })
            .await?;
        decode(response, GatewayError::from_cancel_status).await
    }
}
