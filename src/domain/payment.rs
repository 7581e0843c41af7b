use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    UnderReview,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::UnderReview => "under_review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            "refunded" => Some(PaymentStatus::Refunded),
            "under_review" => Some(PaymentStatus::UnderReview),
            _ => None,
        }
    }

    /// No automatic transition leaves these states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Failed | PaymentStatus::Cancelled | PaymentStatus::Refunded
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    CoursePurchase,
    BundlePurchase,
    Subscription,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::CoursePurchase => "course_purchase",
            PaymentType::BundlePurchase => "bundle_purchase",
            PaymentType::Subscription => "subscription",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "course_purchase" => Some(PaymentType::CoursePurchase),
            "bundle_purchase" => Some(PaymentType::BundlePurchase),
            "subscription" => Some(PaymentType::Subscription),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub course_id: Uuid,
    pub title: String,
    pub price: f64,
}

/// One checkout attempt, before/through gateway processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub order_id: String,
    pub payment_type: PaymentType,
    pub course_id: Option<Uuid>,
    pub cart_items: Option<Vec<CartItem>>,
    pub amount: f64,
    pub original_amount: f64,
    pub promo_code: Option<String>,
    pub promo_code_id: Option<Uuid>,
    pub promo_discount: Option<f64>,
    pub currency: String,
    pub payment_method: String,
    pub payment_gateway: String,
    pub status: PaymentStatus,
    pub provider_reference: Option<String>,
    pub checkout_url: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// amount must equal original_amount minus promo_discount when a promo
    /// was applied.
    pub fn amounts_consistent(&self) -> bool {
        let discount = self.promo_discount.unwrap_or(0.0);
        (self.original_amount - discount - self.amount).abs() < 0.005
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutRequest {
    pub payment_type: PaymentType,
    pub course_id: Option<Uuid>,
    pub course_ids: Option<Vec<Uuid>>,
    pub gateway: String,
    pub payment_method: String,
    pub promo_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub payment_id: Uuid,
    pub order_id: String,
    pub status: PaymentStatus,
    pub amount: f64,
    pub original_amount: f64,
    pub promo_discount: Option<f64>,
    pub currency: String,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    /// False when the provider round-trip was inconclusive (transport error);
    /// the stored status is unchanged and the call may be retried.
    pub conclusive: bool,
    pub message: Option<String>,
}
