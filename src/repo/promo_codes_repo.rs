use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::promo::{DiscountType, PromoCode, PromoCodeUpdate};

#[derive(Clone)]
pub struct PromoCodesRepo {
    pub pool: PgPool,
}

impl PromoCodesRepo {
    pub async fn insert(&self, promo: &PromoCode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO promo_codes (
                promo_code_id, code, discount_type, discount_value, is_active,
                valid_from, valid_until, max_uses, used_count,
                min_purchase_amount, applicable_courses, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(promo.promo_code_id)
        .bind(&promo.code)
        .bind(promo.discount_type.as_str())
        .bind(promo.discount_value)
        .bind(promo.is_active)
        .bind(promo.valid_from)
        .bind(promo.valid_until)
        .bind(promo.max_uses)
        .bind(promo.used_count)
        .bind(promo.min_purchase_amount)
        .bind(&promo.applicable_courses)
        .bind(promo.created_at)
        .bind(promo.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>> {
        let row = sqlx::query("SELECT * FROM promo_codes WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_promo(&r)).transpose()
    }

    pub async fn find_by_id(&self, promo_code_id: Uuid) -> Result<Option<PromoCode>> {
        let row = sqlx::query("SELECT * FROM promo_codes WHERE promo_code_id = $1")
            .bind(promo_code_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_promo(&r)).transpose()
    }

    pub async fn find_all(&self) -> Result<Vec<PromoCode>> {
        let rows = sqlx::query("SELECT * FROM promo_codes ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_promo).collect()
    }

    pub async fn find_all_active(&self) -> Result<Vec<PromoCode>> {
        let rows =
            sqlx::query("SELECT * FROM promo_codes WHERE is_active = TRUE ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(row_to_promo).collect()
    }

    pub async fn find_by_course(&self, course_id: Uuid) -> Result<Vec<PromoCode>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM promo_codes
            WHERE is_active = TRUE
              AND (cardinality(applicable_courses) = 0 OR $1 = ANY(applicable_courses))
            ORDER BY created_at DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_promo).collect()
    }

    /// Atomic conditional increment: matches no row once the cap is reached,
    /// so N racing redemptions of the last use yield exactly one success.
    pub async fn increment_usage(&self, promo_code_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE promo_codes
            SET used_count = used_count + 1, updated_at = now()
            WHERE promo_code_id = $1
              AND (max_uses IS NULL OR used_count < max_uses)
            "#,
        )
        .bind(promo_code_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Partial update; `code` is immutable and never touched.
    pub async fn update(
        &self,
        promo_code_id: Uuid,
        changes: &PromoCodeUpdate,
    ) -> Result<Option<PromoCode>> {
        let row = sqlx::query(
            r#"
            UPDATE promo_codes SET
                discount_type = COALESCE($2, discount_type),
                discount_value = COALESCE($3, discount_value),
                is_active = COALESCE($4, is_active),
                valid_from = COALESCE($5, valid_from),
                valid_until = COALESCE($6, valid_until),
                max_uses = COALESCE($7, max_uses),
                min_purchase_amount = COALESCE($8, min_purchase_amount),
                applicable_courses = COALESCE($9, applicable_courses),
                updated_at = now()
            WHERE promo_code_id = $1
            RETURNING *
            "#,
        )
        .bind(promo_code_id)
        .bind(changes.discount_type.map(|t| t.as_str()))
        .bind(changes.discount_value)
        .bind(changes.is_active)
        .bind(changes.valid_from)
        .bind(changes.valid_until)
        .bind(changes.max_uses)
        .bind(changes.min_purchase_amount)
        .bind(changes.applicable_courses.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_promo(&r)).transpose()
    }

    /// Recommended soft-delete path.
    pub async fn deactivate(&self, promo_code_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE promo_codes SET is_active = FALSE, updated_at = now() WHERE promo_code_id = $1",
        )
        .bind(promo_code_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(&self, promo_code_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM promo_codes WHERE promo_code_id = $1")
            .bind(promo_code_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn row_to_promo(r: &PgRow) -> Result<PromoCode> {
    let discount_type: String = r.get("discount_type");
    let discount_type = DiscountType::parse(&discount_type)
        .ok_or_else(|| anyhow::anyhow!("unknown discount type stored: {discount_type}"))?;

    Ok(PromoCode {
        promo_code_id: r.get("promo_code_id"),
        code: r.get("code"),
        discount_type,
        discount_value: r.get("discount_value"),
        is_active: r.get("is_active"),
        valid_from: r.get("valid_from"),
        valid_until: r.get("valid_until"),
        max_uses: r.get("max_uses"),
        used_count: r.get("used_count"),
        min_purchase_amount: r.get("min_purchase_amount"),
        applicable_courses: r.get("applicable_courses"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}
