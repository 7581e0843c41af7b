use chrono::Utc;
use uuid::Uuid;

use crate::domain::auth::AuthUser;
use crate::domain::promo::{NewPromoCode, PromoCode, PromoCodeUpdate, PromoValidation};
use crate::error::DomainError;
use crate::repo::promo_codes_repo::PromoCodesRepo;

#[derive(Clone)]
pub struct PromoService {
    pub promo_codes_repo: PromoCodesRepo,
}

impl PromoService {
    /// Public pricing preview: read-only, no authentication required, and no
    /// usage counting. Codes are matched case-sensitively as stored.
    pub async fn validate(
        &self,
        code: &str,
        subtotal: f64,
        course_id: Option<Uuid>,
    ) -> Result<PromoValidation, DomainError> {
        let promo = self
            .promo_codes_repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("promo code {code} not found")))?;

        if let Some(reason) = promo.validity_error(Utc::now()) {
            return Err(DomainError::InvalidState(reason));
        }

        if let Some(course_id) = course_id {
            if !promo.can_apply_to_course(course_id) {
                return Err(DomainError::Ineligible(format!(
                    "promo code {} does not apply to this course",
                    promo.code
                )));
            }
        }

        let discount = promo.calculate_discount(subtotal)?;

        Ok(PromoValidation {
            valid: true,
            code: promo.code,
            discount_type: promo.discount_type,
            discount_value: promo.discount_value,
            discount,
            promo_code_id: promo.promo_code_id,
        })
    }

    /// Redeems one use. Called only from the payment completion handler, on
    /// the first transition into `completed`, never at validation time.
    /// Rejects when the atomic increment finds the cap already reached.
    pub async fn apply(&self, promo_code_id: Uuid) -> Result<(), DomainError> {
        let incremented = self.promo_codes_repo.increment_usage(promo_code_id).await?;
        if !incremented {
            return Err(DomainError::InvalidState(
                "promo code has reached its usage limit or no longer exists".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(
        &self,
        caller: &AuthUser,
        data: NewPromoCode,
    ) -> Result<PromoCode, DomainError> {
        caller.require_admin()?;

        if data.code.trim().is_empty() {
            return Err(DomainError::InvalidState(
                "promo code must not be empty".to_string(),
            ));
        }
        if data.discount_value < 0.0 {
            return Err(DomainError::InvalidState(
                "discount value must not be negative".to_string(),
            ));
        }
        if data.min_purchase_amount < 0.0 {
            return Err(DomainError::InvalidState(
                "minimum purchase amount must not be negative".to_string(),
            ));
        }
        if self.promo_codes_repo.find_by_code(&data.code).await?.is_some() {
            return Err(DomainError::InvalidState(format!(
                "promo code {} already exists",
                data.code
            )));
        }

        let now = Utc::now();
        let promo = PromoCode {
            promo_code_id: Uuid::new_v4(),
            code: data.code,
            discount_type: data.discount_type,
            discount_value: data.discount_value,
            is_active: true,
            valid_from: data.valid_from,
            valid_until: data.valid_until,
            max_uses: data.max_uses,
            used_count: 0,
            min_purchase_amount: data.min_purchase_amount,
            applicable_courses: data.applicable_courses,
            created_at: now,
            updated_at: now,
        };
        self.promo_codes_repo.insert(&promo).await?;
        Ok(promo)
    }

    pub async fn update(
        &self,
        caller: &AuthUser,
        promo_code_id: Uuid,
        changes: PromoCodeUpdate,
    ) -> Result<PromoCode, DomainError> {
        caller.require_admin()?;
        self.promo_codes_repo
            .update(promo_code_id, &changes)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("promo code {promo_code_id} not found")))
    }

    /// Soft delete: keeps the record and its usage history.
    pub async fn deactivate(
        &self,
        caller: &AuthUser,
        promo_code_id: Uuid,
    ) -> Result<(), DomainError> {
        caller.require_admin()?;
        if !self.promo_codes_repo.deactivate(promo_code_id).await? {
            return Err(DomainError::NotFound(format!(
                "promo code {promo_code_id} not found"
            )));
        }
        Ok(())
    }

    pub async fn delete(&self, caller: &AuthUser, promo_code_id: Uuid) -> Result<(), DomainError> {
        caller.require_admin()?;
        if !self.promo_codes_repo.delete(promo_code_id).await? {
            return Err(DomainError::NotFound(format!(
                "promo code {promo_code_id} not found"
            )));
        }
        Ok(())
    }

    pub async fn get(
        &self,
        caller: &AuthUser,
        promo_code_id: Uuid,
    ) -> Result<PromoCode, DomainError> {
        caller.require_admin()?;
        self.promo_codes_repo
            .find_by_id(promo_code_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("promo code {promo_code_id} not found")))
    }

    pub async fn list_for_course(
        &self,
        caller: &AuthUser,
        course_id: Uuid,
    ) -> Result<Vec<PromoCode>, DomainError> {
        caller.require_admin()?;
        Ok(self.promo_codes_repo.find_by_course(course_id).await?)
    }

    pub async fn list_active(&self, caller: &AuthUser) -> Result<Vec<PromoCode>, DomainError> {
        caller.require_admin()?;
        Ok(self.promo_codes_repo.find_all_active().await?)
    }

    pub async fn list_all(&self, caller: &AuthUser) -> Result<Vec<PromoCode>, DomainError> {
        caller.require_admin()?;
        Ok(self.promo_codes_repo.find_all().await?)
    }
}
