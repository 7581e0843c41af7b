use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::StripeConfig;
use crate::error::DomainError;
use crate::gateways::{
    ChargeAmount, GatewayPaymentStatus, InitiatePaymentRequest, InitiatedPayment,
    PaymentGatewayAdapter, VerifyResult, VerifyStatus, WebhookEvent,
};
use crate::money::{tnd_to_usd, usd_to_cents};

pub const PROVIDER: &str = "stripe";

type HmacSha256 = Hmac<Sha256>;

/// Card-network gateway. Bills in USD cents through hosted Checkout Sessions;
/// webhooks are HMAC-signed and verified before any payload field is trusted.
pub struct StripeGateway {
    config: StripeConfig,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig, client: reqwest::Client) -> Self {
        StripeGateway { config, client }
    }
}

#[async_trait::async_trait]
impl PaymentGatewayAdapter for StripeGateway {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    // bridges the home currency through the configured approximate rate;
    // charge-time pricing only, never refund-exact accounting
    fn charge_amount(&self, amount_home: f64) -> ChargeAmount {
        ChargeAmount {
            amount_minor: usd_to_cents(tnd_to_usd(amount_home, self.config.usd_per_tnd)),
            currency: "USD".to_string(),
        }
    }

    async fn initiate_payment(
        &self,
        request: InitiatePaymentRequest,
    ) -> Result<InitiatedPayment, DomainError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let currency = request.currency.to_lowercase();
        let body: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("client_reference_id".to_string(), request.order_id.clone()),
            ("customer_email".to_string(), request.email.clone()),
            (
                "line_items[0][price_data][currency]".to_string(),
                currency,
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.description.clone(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.config.success_url.clone()),
            ("cancel_url".to_string(), self.config.cancel_url.clone()),
            ("metadata[order_id]".to_string(), request.order_id.clone()),
            (
                "payment_intent_data[metadata][order_id]".to_string(),
                request.order_id.clone(),
            ),
        ];

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.config.secret_key)
            .form(&body)
            .timeout(std::time::Duration::from_millis(self.config.timeout_ms))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => {
                let v: serde_json::Value = r.json().await.map_err(|e| {
                    DomainError::Gateway(format!("stripe returned unreadable session: {e}"))
                })?;
                let session_id = v.get("id").and_then(|id| id.as_str());
                let checkout_url = v.get("url").and_then(|u| u.as_str());
                match (session_id, checkout_url) {
                    (Some(session_id), Some(checkout_url)) => Ok(InitiatedPayment {
                        provider_reference: session_id.to_string(),
                        checkout_url: checkout_url.to_string(),
                        amount_minor: request.amount_minor,
                        order_id: request.order_id,
                    }),
                    _ => Err(DomainError::Gateway(
                        "stripe session is missing id or url".to_string(),
                    )),
                }
            }
            Ok(r) => {
                let status = r.status();
                let body = r.text().await.unwrap_or_default();
                let reason = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")
                            .and_then(|e| e.get("message"))
                            .and_then(|m| m.as_str())
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| body.chars().take(200).collect());
                Err(DomainError::Gateway(format!(
                    "stripe rejected checkout session: HTTP {} {}",
                    status.as_u16(),
                    reason
                )))
            }
            Err(e) if e.is_timeout() => Err(DomainError::GatewayTimeout(format!(
                "stripe checkout session timed out: {e}"
            ))),
            Err(e) => Err(DomainError::Gateway(format!(
                "stripe checkout session request failed: {e}"
            ))),
        }
    }

    async fn verify_payment(&self, provider_reference: &str) -> VerifyResult {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base_url, provider_reference
        );
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.config.secret_key)
            .timeout(std::time::Duration::from_millis(self.config.timeout_ms))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => match r.json::<serde_json::Value>().await {
                Ok(raw) => normalize_session(raw),
                Err(e) => VerifyResult::transport_error(format!(
                    "stripe session response is not valid JSON: {e}"
                )),
            },
            Ok(r) => VerifyResult::transport_error(format!(
                "stripe session retrieval returned HTTP {}",
                r.status().as_u16()
            )),
            Err(e) => VerifyResult::transport_error(format!("stripe session retrieval failed: {e}")),
        }
    }

    /// Stripe-Signature scheme: HMAC-SHA256 over `{t}.{payload}`, hex in v1.
    /// A missing webhook secret is the explicit insecure mode configured at
    /// startup; verification is then skipped entirely.
    fn validate_webhook_signature(&self, payload: &[u8], signature: Option<&str>) -> bool {
        let Some(secret) = &self.config.webhook_secret else {
            return true;
        };
        let Some(header) = signature else {
            return false;
        };

        let mut timestamp: Option<&str> = None;
        let mut provided: Option<&str> = None;
        for part in header.split(',') {
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest);
            } else if let Some(rest) = part.strip_prefix("v1=") {
                provided = Some(rest);
            }
        }
        let (Some(timestamp), Some(provided)) = (timestamp, provided) else {
            return false;
        };
        let Ok(provided) = hex::decode(provided) else {
            return false;
        };

        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();

        expected[..] == provided[..]
    }

    fn process_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookEvent, DomainError> {
        if !self.validate_webhook_signature(payload, signature) {
            return Err(DomainError::SignatureInvalid);
        }

        let raw: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
            DomainError::InvalidState(format!("stripe webhook payload is not valid JSON: {e}"))
        })?;
        let event_type = raw
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string();
        let object = raw
            .pointer("/data/object")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        Ok(normalize_event(&event_type, &object, raw))
    }
}

/// Collapses Stripe's event taxonomy into the normalized event shape. Events
/// outside the handled set map to `Unknown`.
pub fn normalize_event(
    event_type: &str,
    object: &serde_json::Value,
    raw: serde_json::Value,
) -> WebhookEvent {
    let metadata_order_id = object
        .pointer("/metadata/order_id")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let (status, provider_reference, order_id, transaction_id, amount_minor) = match event_type {
        "checkout.session.completed" => (
            GatewayPaymentStatus::Completed,
            object.get("id").and_then(|v| v.as_str()).map(str::to_string),
            object
                .get("client_reference_id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or(metadata_order_id),
            object
                .get("payment_intent")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            object.get("amount_total").and_then(|v| v.as_i64()),
        ),
        "checkout.session.expired" => (
            GatewayPaymentStatus::Cancelled,
            object.get("id").and_then(|v| v.as_str()).map(str::to_string),
            object
                .get("client_reference_id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or(metadata_order_id),
            None,
            object.get("amount_total").and_then(|v| v.as_i64()),
        ),
        "payment_intent.succeeded" => (
            GatewayPaymentStatus::Completed,
            None,
            metadata_order_id,
            object.get("id").and_then(|v| v.as_str()).map(str::to_string),
            object
                .get("amount_received")
                .or_else(|| object.get("amount"))
                .and_then(|v| v.as_i64()),
        ),
        "payment_intent.payment_failed" => (
            GatewayPaymentStatus::Failed,
            None,
            metadata_order_id,
            object.get("id").and_then(|v| v.as_str()).map(str::to_string),
            object.get("amount").and_then(|v| v.as_i64()),
        ),
        "charge.refunded" => (
            GatewayPaymentStatus::Refunded,
            None,
            metadata_order_id,
            object
                .get("payment_intent")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            object.get("amount_refunded").and_then(|v| v.as_i64()),
        ),
        _ => (GatewayPaymentStatus::Unknown, None, metadata_order_id, None, None),
    };

    WebhookEvent {
        provider: PROVIDER,
        event_type: event_type.to_string(),
        status,
        provider_reference,
        order_id,
        transaction_id,
        amount_minor,
        raw,
    }
}

/// Pure normalization of a retrieved Checkout Session.
pub fn normalize_session(raw: serde_json::Value) -> VerifyResult {
    let payment_status = raw.get("payment_status").and_then(|v| v.as_str());
    let session_status = raw.get("status").and_then(|v| v.as_str());

    let status = match (payment_status, session_status) {
        (Some("paid"), _) | (Some("no_payment_required"), _) => VerifyStatus::Completed,
        (_, Some("expired")) => VerifyStatus::Cancelled,
        (Some("unpaid"), Some("open")) => VerifyStatus::Pending,
        (Some("unpaid"), Some("complete")) => VerifyStatus::Pending,
        _ => VerifyStatus::Unknown,
    };

    let payment_date = raw
        .get("created")
        .and_then(|v| v.as_i64())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    VerifyResult {
        success: status == VerifyStatus::Completed,
        status,
        amount_minor: raw.get("amount_total").and_then(|v| v.as_i64()),
        order_id: raw
            .get("client_reference_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| {
                raw.pointer("/metadata/order_id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            }),
        transaction_id: raw
            .get("payment_intent")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        payment_date,
        message: None,
        raw,
    }
}
