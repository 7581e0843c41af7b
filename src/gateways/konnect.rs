use chrono::{DateTime, Utc};
use serde_json::json;

use crate::config::KonnectConfig;
use crate::error::DomainError;
use crate::gateways::{
    ChargeAmount, GatewayPaymentStatus, InitiatePaymentRequest, InitiatedPayment,
    PaymentGatewayAdapter, VerifyResult, VerifyStatus, WebhookEvent,
};
use crate::money::tnd_to_millimes;

pub const PROVIDER: &str = "konnect";

/// Tunisian-market gateway. Bills in TND millimes; issues a payment token
/// (`paymentRef`) and a hosted pay URL.
pub struct KonnectGateway {
    config: KonnectConfig,
    client: reqwest::Client,
}

impl KonnectGateway {
    pub fn new(config: KonnectConfig, client: reqwest::Client) -> Self {
        KonnectGateway { config, client }
    }
}

#[async_trait::async_trait]
impl PaymentGatewayAdapter for KonnectGateway {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn charge_amount(&self, amount_home: f64) -> ChargeAmount {
        ChargeAmount {
            amount_minor: tnd_to_millimes(amount_home),
            currency: "TND".to_string(),
        }
    }

    async fn initiate_payment(
        &self,
        request: InitiatePaymentRequest,
    ) -> Result<InitiatedPayment, DomainError> {
        let url = format!("{}/payments/init-payment", self.config.api_base_url);
        let mut body = json!({
            "receiverWalletId": self.config.receiver_wallet_id,
            "token": request.currency,
            "amount": request.amount_minor,
            "type": "immediate",
            "description": request.description,
            "orderId": request.order_id,
            "firstName": request.first_name,
            "lastName": request.last_name,
            "email": request.email,
            "successUrl": self.config.success_url,
            "failUrl": self.config.fail_url,
        });
        if let Some(phone) = &request.phone {
            body["phoneNumber"] = json!(phone);
        }
        if let Some(webhook) = &self.config.webhook_url {
            body["webhook"] = json!(webhook);
        }

        let resp = self
            .client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.config.timeout_ms))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => {
                let v: serde_json::Value = r.json().await.map_err(|e| {
                    DomainError::Gateway(format!("konnect returned unreadable init response: {e}"))
                })?;
                let pay_url = v.get("payUrl").and_then(|u| u.as_str());
                let payment_ref = v.get("paymentRef").and_then(|p| p.as_str());
                match (pay_url, payment_ref) {
                    (Some(pay_url), Some(payment_ref)) => Ok(InitiatedPayment {
                        provider_reference: payment_ref.to_string(),
                        checkout_url: pay_url.to_string(),
                        amount_minor: request.amount_minor,
                        order_id: request.order_id,
                    }),
                    _ => Err(DomainError::Gateway(
                        "konnect init response is missing payUrl or paymentRef".to_string(),
                    )),
                }
            }
            Ok(r) => {
                let status = r.status();
                let body = r.text().await.unwrap_or_default();
                Err(DomainError::Gateway(format!(
                    "konnect rejected init-payment: HTTP {} {}",
                    status.as_u16(),
                    body.chars().take(200).collect::<String>()
                )))
            }
            Err(e) if e.is_timeout() => Err(DomainError::GatewayTimeout(format!(
                "konnect init-payment timed out: {e}"
            ))),
            Err(e) => Err(DomainError::Gateway(format!(
                "konnect init-payment request failed: {e}"
            ))),
        }
    }

    async fn verify_payment(&self, provider_reference: &str) -> VerifyResult {
        let url = format!("{}/payments/{}", self.config.api_base_url, provider_reference);
        let resp = self
            .client
            .get(url)
            .header("x-api-key", &self.config.api_key)
            .timeout(std::time::Duration::from_millis(self.config.timeout_ms))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => match r.json::<serde_json::Value>().await {
                Ok(raw) => normalize_verify_response(raw),
                Err(e) => VerifyResult::transport_error(format!(
                    "konnect status response is not valid JSON: {e}"
                )),
            },
            Ok(r) => VerifyResult::transport_error(format!(
                "konnect status check returned HTTP {}",
                r.status().as_u16()
            )),
            Err(e) => VerifyResult::transport_error(format!("konnect status check failed: {e}")),
        }
    }

    // Konnect exposes no webhook signature scheme; callers re-verify through
    // the payments API instead of trusting the payload (known trust gap).
    fn validate_webhook_signature(&self, _payload: &[u8], _signature: Option<&str>) -> bool {
        true
    }

    fn process_webhook(
        &self,
        payload: &[u8],
        _signature: Option<&str>,
    ) -> Result<WebhookEvent, DomainError> {
        let raw: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
            DomainError::InvalidState(format!("konnect webhook payload is not valid JSON: {e}"))
        })?;

        let payment_ref = raw
            .get("payment_ref")
            .or_else(|| raw.get("paymentRef"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if payment_ref.is_none() {
            return Err(DomainError::InvalidState(
                "konnect webhook is missing payment_ref".to_string(),
            ));
        }

        // the notification usually carries only the reference; status, when
        // absent, stays Unknown and the caller resolves it via verify
        let status = raw
            .get("status")
            .and_then(|v| v.as_str())
            .map(map_status)
            .unwrap_or(GatewayPaymentStatus::Unknown);

        Ok(WebhookEvent {
            provider: PROVIDER,
            event_type: "payment_notification".to_string(),
            status,
            provider_reference: payment_ref,
            order_id: raw
                .get("orderId")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            transaction_id: None,
            amount_minor: raw.get("amount").and_then(|v| v.as_i64()),
            raw,
        })
    }
}

pub fn map_status(status: &str) -> GatewayPaymentStatus {
    match status {
        "completed" | "paid" | "success" => GatewayPaymentStatus::Completed,
        "failed" | "failed_payment" | "rejected" | "declined" => GatewayPaymentStatus::Failed,
        "pending" | "processing" | "in_progress" => GatewayPaymentStatus::Pending,
        "expired" | "canceled" | "cancelled" | "abandoned" => GatewayPaymentStatus::Cancelled,
        "refunded" => GatewayPaymentStatus::Refunded,
        _ => GatewayPaymentStatus::Unknown,
    }
}

/// Pure normalization of a `GET /payments/:paymentRef` body.
pub fn normalize_verify_response(raw: serde_json::Value) -> VerifyResult {
    let payment = raw.get("payment").cloned().unwrap_or(serde_json::Value::Null);

    let status = match payment.get("status").and_then(|v| v.as_str()) {
        Some(s) => match map_status(s) {
            GatewayPaymentStatus::Pending => VerifyStatus::Pending,
            GatewayPaymentStatus::Completed => VerifyStatus::Completed,
            GatewayPaymentStatus::Failed => VerifyStatus::Failed,
            GatewayPaymentStatus::Cancelled => VerifyStatus::Cancelled,
            GatewayPaymentStatus::Refunded => VerifyStatus::Refunded,
            GatewayPaymentStatus::Unknown => VerifyStatus::Unknown,
        },
        None => VerifyStatus::Unknown,
    };

    let transaction_id = payment
        .get("transactions")
        .and_then(|t| t.as_array())
        .and_then(|t| t.first())
        .and_then(|t| t.get("id").or_else(|| t.get("transactionId")))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let payment_date = payment
        .get("updatedAt")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc));

    VerifyResult {
        success: status == VerifyStatus::Completed,
        status,
        amount_minor: payment.get("amount").and_then(|v| v.as_i64()),
        order_id: payment
            .get("orderId")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        transaction_id,
        payment_date,
        message: None,
        raw,
    }
}
