use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::transaction::{Transaction, TransactionStatus};

#[derive(Clone)]
pub struct TransactionsRepo {
    pub pool: PgPool,
}

impl TransactionsRepo {
    pub async fn insert(&self, txn: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                transaction_id, payment_id, user_id, course_id, amount, currency,
                status, payment_method, payment_gateway, gateway_transaction_id,
                gateway_response, created_at, updated_at, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(txn.transaction_id)
        .bind(txn.payment_id)
        .bind(txn.user_id)
        .bind(txn.course_id)
        .bind(txn.amount)
        .bind(&txn.currency)
        .bind(txn.status.as_str())
        .bind(&txn.payment_method)
        .bind(&txn.payment_gateway)
        .bind(&txn.gateway_transaction_id)
        .bind(&txn.gateway_response)
        .bind(txn.created_at)
        .bind(txn.updated_at)
        .bind(txn.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_payment(&self, payment_id: Uuid) -> Result<Option<Transaction>> {
        let row = sqlx::query("SELECT * FROM transactions WHERE payment_id = $1")
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_transaction(&r)).transpose()
    }

    pub async fn mark_refunded(&self, payment_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'refunded', updated_at = now()
            WHERE payment_id = $1 AND status = 'completed'
            "#,
        )
        .bind(payment_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn row_to_transaction(r: &PgRow) -> Result<Transaction> {
    let status: String = r.get("status");
    let status = TransactionStatus::parse(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown transaction status stored: {status}"))?;

    Ok(Transaction {
        transaction_id: r.get("transaction_id"),
        payment_id: r.get("payment_id"),
        user_id: r.get("user_id"),
        course_id: r.get("course_id"),
        amount: r.get("amount"),
        currency: r.get("currency"),
        status,
        payment_method: r.get("payment_method"),
        payment_gateway: r.get("payment_gateway"),
        gateway_transaction_id: r.get("gateway_transaction_id"),
        gateway_response: r.get("gateway_response"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
        completed_at: r.get("completed_at"),
    })
}
