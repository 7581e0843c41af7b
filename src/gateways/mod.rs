use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

pub mod konnect;
pub mod stripe;

/// Amount owed to the provider, tagged with its native minor unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeAmount {
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct InitiatePaymentRequest {
    /// Provider's native minor unit (millimes for Konnect, cents for Stripe).
    pub amount_minor: i64,
    pub currency: String,
    /// Round-trips through the provider verbatim; later webhooks and
    /// verification calls carry it back.
    pub order_id: String,
    pub description: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub provider_reference: String,
    pub checkout_url: String,
    pub amount_minor: i64,
    pub order_id: String,
}

/// Provider-agnostic payment outcome taxonomy. `Unknown` marks an event the
/// adapter could not classify; it is never coerced into a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    Unknown,
}

/// Verification status. `Error` marks a failed provider round-trip
/// (transport), which is inconclusive and retryable; every other value is an
/// authoritative provider answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    Unknown,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    pub success: bool,
    pub status: VerifyStatus,
    pub amount_minor: Option<i64>,
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub raw: serde_json::Value,
}

impl VerifyResult {
    pub fn transport_error(message: String) -> Self {
        VerifyResult {
            success: false,
            status: VerifyStatus::Error,
            amount_minor: None,
            order_id: None,
            transaction_id: None,
            payment_date: None,
            message: Some(message),
            raw: serde_json::Value::Null,
        }
    }

    /// The event this result feeds into the lifecycle, or None when the
    /// round-trip was inconclusive.
    pub fn event_status(&self) -> Option<GatewayPaymentStatus> {
        match self.status {
            VerifyStatus::Pending => Some(GatewayPaymentStatus::Pending),
            VerifyStatus::Completed => Some(GatewayPaymentStatus::Completed),
            VerifyStatus::Failed => Some(GatewayPaymentStatus::Failed),
            VerifyStatus::Cancelled => Some(GatewayPaymentStatus::Cancelled),
            VerifyStatus::Refunded => Some(GatewayPaymentStatus::Refunded),
            VerifyStatus::Unknown => Some(GatewayPaymentStatus::Unknown),
            VerifyStatus::Error => None,
        }
    }
}

/// One normalized payment-status event, regardless of which provider event
/// produced it.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    pub provider: &'static str,
    pub event_type: String,
    pub status: GatewayPaymentStatus,
    pub provider_reference: Option<String>,
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub amount_minor: Option<i64>,
    pub raw: serde_json::Value,
}

#[async_trait::async_trait]
pub trait PaymentGatewayAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Converts a major-unit amount in the platform's home currency into the
    /// provider's native minor unit.
    fn charge_amount(&self, amount_home: f64) -> ChargeAmount;

    /// Creates the provider-side payment and returns the redirect URL.
    /// Declines surface as `Gateway`; timeouts as `GatewayTimeout` so the
    /// local record can stay pending for reconciliation.
    async fn initiate_payment(
        &self,
        request: InitiatePaymentRequest,
    ) -> Result<InitiatedPayment, DomainError>;

    /// Queries the provider for the authoritative payment state. Transport
    /// failures come back as `status: error`, never as an exception.
    async fn verify_payment(&self, provider_reference: &str) -> VerifyResult;

    /// Side-effect-free signature check, usable for pre-validation.
    fn validate_webhook_signature(&self, payload: &[u8], signature: Option<&str>) -> bool;

    /// Verifies trust (fails closed where the provider signs) and normalizes
    /// the provider event taxonomy into one field set.
    fn process_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookEvent, DomainError>;
}

/// Thin dispatch layer: selects the adapter instance by configured provider
/// name per payment.
#[derive(Clone)]
pub struct GatewayRegistry {
    adapters: Vec<Arc<dyn PaymentGatewayAdapter>>,
}

impl GatewayRegistry {
    pub fn new(adapters: Vec<Arc<dyn PaymentGatewayAdapter>>) -> Self {
        GatewayRegistry { adapters }
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn PaymentGatewayAdapter>> {
        self.adapters.iter().find(|a| a.name() == name).cloned()
    }
}
