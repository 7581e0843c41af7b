use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Server-side price lookup for checkout. Course CRUD lives elsewhere; the
/// payments core only ever reads prices, never trusts client amounts.
#[derive(Debug, Clone)]
pub struct CoursePrice {
    pub course_id: Uuid,
    pub title: String,
    pub price: f64,
}

#[derive(Clone)]
pub struct CoursesRepo {
    pub pool: PgPool,
}

impl CoursesRepo {
    pub async fn find_prices(&self, course_ids: &[Uuid]) -> Result<Vec<CoursePrice>> {
        let rows = sqlx::query(
            "SELECT course_id, title, price FROM courses WHERE course_id = ANY($1)",
        )
        .bind(course_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CoursePrice {
                course_id: r.get("course_id"),
                title: r.get("title"),
                price: r.get("price"),
            })
            .collect())
    }
}
