use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::money::round2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }

    // closed enum: an unknown stored value is a data error, never a zero discount
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(DiscountType::Percentage),
            "fixed" => Some(DiscountType::Fixed),
            _ => None,
        }
    }
}

/// One promotional offer. Immutable value record; usage counting goes through
/// the repository's atomic increment, not through entity mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub promo_code_id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub min_purchase_amount: f64,
    pub applicable_courses: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PromoCode {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.validity_error(now).is_none()
    }

    /// Why the code cannot be redeemed right now, if it cannot.
    pub fn validity_error(&self, now: DateTime<Utc>) -> Option<String> {
        if !self.is_active {
            return Some(format!("promo code {} is inactive", self.code));
        }
        if self.valid_from.is_some_and(|from| now < from) {
            return Some(format!("promo code {} is not active yet", self.code));
        }
        if self.valid_until.is_some_and(|until| now > until) {
            return Some(format!("promo code {} has expired", self.code));
        }
        if self.max_uses.is_some_and(|cap| self.used_count >= cap) {
            return Some(format!("promo code {} has reached its usage limit", self.code));
        }
        None
    }

    /// An empty course set means the code applies to every course.
    pub fn can_apply_to_course(&self, course_id: Uuid) -> bool {
        self.applicable_courses.is_empty() || self.applicable_courses.contains(&course_id)
    }

    pub fn calculate_discount(&self, subtotal: f64) -> Result<f64, DomainError> {
        if subtotal < self.min_purchase_amount {
            return Err(DomainError::BelowMinimum(format!(
                "subtotal {:.2} is below the minimum purchase amount {:.2} for promo code {}",
                subtotal, self.min_purchase_amount, self.code
            )));
        }
        Ok(match self.discount_type {
            DiscountType::Percentage => round2(subtotal * self.discount_value / 100.0),
            // a fixed discount never exceeds the subtotal
            DiscountType::Fixed => self.discount_value.min(subtotal),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPromoCode {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    #[serde(default)]
    pub min_purchase_amount: f64,
    #[serde(default)]
    pub applicable_courses: Vec<Uuid>,
}

/// Partial admin update. `code` is immutable after creation and absent here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromoCodeUpdate {
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
    pub is_active: Option<bool>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub min_purchase_amount: Option<f64>,
    pub applicable_courses: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromoValidation {
    pub valid: bool,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub discount: f64,
    pub promo_code_id: Uuid,
}
