use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::types::GatewayConfig;
use crate::domain::checkout::{CheckoutRequest, CheckoutSession};
use crate::error::{BookingError, Result};
use crate::ports::payment_gateway::PaymentGateway;

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Hosted checkout sessions created with a form-encoded POST to
/// `/v1/checkout/sessions`. The secret key stays in this process.
pub struct StripeGateway {
    http: Client,
    endpoint: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(config: &GatewayConfig, secret_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BookingError::Config(format!("failed to build gateway client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/v1/checkout/sessions",
                config.base_url.trim_end_matches('/')
            ),
            secret_key,
        })
    }
}

/// Pull `{ "error": { "message": ... } }` out of a failure body.
pub fn gateway_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .filter(|m| !m.is_empty())
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.secret_key)
            .form(&request.to_form_pairs())
            .send()
            .await
            .map_err(|e| BookingError::Gateway {
                reason: format!("checkout request failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| BookingError::Gateway {
            reason: format!("reading checkout response: {e}"),
        })?;

        if !status.is_success() {
            let reason = gateway_error_message(&body)
                .unwrap_or_else(|| format!("checkout returned HTTP {status}"));
            warn!(status = %status, unit_id = %request.unit_id, "Checkout session rejected");
            return Err(BookingError::Gateway { reason });
        }

        let session: SessionResponse =
            serde_json::from_str(&body).map_err(|e| BookingError::Gateway {
                reason: format!("malformed checkout response: {e}"),
            })?;
        let url = session.url.filter(|u| !u.is_empty()).ok_or_else(|| BookingError::Gateway {
            reason: format!("checkout session {} has no redirect url", session.id),
        })?;

        info!(
            session_id = %session.id,
            unit_id = %request.unit_id,
            amount_minor = request.amount_minor,
            "Checkout session created"
        );
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}
