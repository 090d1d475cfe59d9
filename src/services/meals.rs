use sqlx::PgPool;

use crate::models::meal::Meal;

pub struct MealService;

impl MealService {
    /// All meal slots in time-of-day order.
    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<Meal>> {
        let meals = sqlx::query_as::<_, Meal>(
            "SELECT id, name, default_time FROM meals ORDER BY default_time, id",
        )
        .fetch_all(pool)
        .await?;
        Ok(meals)
    }
}
