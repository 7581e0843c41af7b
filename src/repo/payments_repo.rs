use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::payment::{Payment, PaymentStatus, PaymentType};

#[derive(Clone)]
pub struct PaymentsRepo {
    pub pool: PgPool,
}

impl PaymentsRepo {
    pub async fn insert(&self, payment: &Payment) -> Result<()> {
        let cart_items = payment
            .cart_items
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, user_id, order_id, payment_type, course_id, cart_items,
                amount, original_amount, promo_code, promo_code_id, promo_discount,
                currency, payment_method, payment_gateway, status,
                provider_reference, checkout_url, failure_reason, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9, $10, $11,
                $12, $13, $14, $15,
                $16, $17, $18, $19, $20
            )
            "#,
        )
        .bind(payment.payment_id)
        .bind(payment.user_id)
        .bind(&payment.order_id)
        .bind(payment.payment_type.as_str())
        .bind(payment.course_id)
        .bind(cart_items)
        .bind(payment.amount)
        .bind(payment.original_amount)
        .bind(&payment.promo_code)
        .bind(payment.promo_code_id)
        .bind(payment.promo_discount)
        .bind(&payment.currency)
        .bind(&payment.payment_method)
        .bind(&payment.payment_gateway)
        .bind(payment.status.as_str())
        .bind(&payment.provider_reference)
        .bind(&payment.checkout_url)
        .bind(&payment.failure_reason)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query("SELECT * FROM payments WHERE payment_id = $1")
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_payment(&r)).transpose()
    }

    pub async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query("SELECT * FROM payments WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_payment(&r)).transpose()
    }

    pub async fn find_by_provider_reference(
        &self,
        payment_gateway: &str,
        provider_reference: &str,
    ) -> Result<Option<Payment>> {
        let row = sqlx::query(
            "SELECT * FROM payments WHERE payment_gateway = $1 AND provider_reference = $2",
        )
        .bind(payment_gateway)
        .bind(provider_reference)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_payment(&r)).transpose()
    }

    pub async fn set_initiated(
        &self,
        payment_id: Uuid,
        provider_reference: &str,
        checkout_url: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET provider_reference = $2, checkout_url = $3, updated_at = now()
            WHERE payment_id = $1 AND status = 'pending'
            "#,
        )
        .bind(payment_id)
        .bind(provider_reference)
        .bind(checkout_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Records a failure reason without touching the status; used when an
    /// initiate call is inconclusive and the record stays pending.
    pub async fn note_failure(&self, payment_id: Uuid, reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE payments SET failure_reason = $2, updated_at = now() WHERE payment_id = $1",
        )
        .bind(payment_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Compare-and-swap on status: the writer that matches `from` owns the
    /// transition and its side effects; everyone else matches zero rows.
    pub async fn claim_transition(
        &self,
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
        failure_reason: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $3, failure_reason = COALESCE($4, failure_reason), updated_at = now()
            WHERE payment_id = $1 AND status = $2
            "#,
        )
        .bind(payment_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(failure_reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn row_to_payment(r: &PgRow) -> Result<Payment> {
    let status: String = r.get("status");
    let status = PaymentStatus::parse(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown payment status stored: {status}"))?;
    let payment_type: String = r.get("payment_type");
    let payment_type = PaymentType::parse(&payment_type)
        .ok_or_else(|| anyhow::anyhow!("unknown payment type stored: {payment_type}"))?;
    let cart_items: Option<serde_json::Value> = r.get("cart_items");
    let cart_items = cart_items.map(serde_json::from_value).transpose()?;

    Ok(Payment {
        payment_id: r.get("payment_id"),
        user_id: r.get("user_id"),
        order_id: r.get("order_id"),
        payment_type,
        course_id: r.get("course_id"),
        cart_items,
        amount: r.get("amount"),
        original_amount: r.get("original_amount"),
        promo_code: r.get("promo_code"),
        promo_code_id: r.get("promo_code_id"),
        promo_discount: r.get("promo_discount"),
        currency: r.get("currency"),
        payment_method: r.get("payment_method"),
        payment_gateway: r.get("payment_gateway"),
        status,
        provider_reference: r.get("provider_reference"),
        checkout_url: r.get("checkout_url"),
        failure_reason: r.get("failure_reason"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}
