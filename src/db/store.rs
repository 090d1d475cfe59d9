use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::{
    models::{draft::DraftMeal, meal::Meal, menu::Menu, recipe::RecipeSummary},
    services::drafts::MealPlanStore,
};

/// PostgreSQL-backed records for the draft workflow.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl MealPlanStore for PgStore {
    async fn menu_for_day(&self, user_id: i64, day: NaiveDate) -> anyhow::Result<Option<Menu>> {
        let menu = sqlx::query_as::<_, Menu>(
            "SELECT id, user_id, menu_date, created_at, submitted_at
             FROM menus
             WHERE user_id = $1 AND menu_date = $2",
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;
        Ok(menu)
    }

    async fn create_menu(&self, user_id: i64, day: NaiveDate) -> anyhow::Result<Option<Menu>> {
        // The (user_id, menu_date) unique index settles races between two initializations.
        let menu = sqlx::query_as::<_, Menu>(
            "INSERT INTO menus (user_id, menu_date)
             VALUES ($1, $2)
             ON CONFLICT (user_id, menu_date) DO NOTHING
             RETURNING id, user_id, menu_date, created_at, submitted_at",
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;
        Ok(menu)
    }

    async fn meal_by_name(&self, name: &str) -> anyhow::Result<Option<Meal>> {
        let meal = sqlx::query_as::<_, Meal>(
            "SELECT id, name, default_time FROM meals WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(meal)
    }

    async fn recipes_for_meal(&self, meal_id: i64) -> anyhow::Result<Vec<RecipeSummary>> {
        let recipes = sqlx::query_as::<_, RecipeSummary>(
            "SELECT id, name, meal_id FROM recipes WHERE meal_id = $1 ORDER BY id",
        )
        .bind(meal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(recipes)
    }

    async fn recipe_summary(&self, recipe_id: i64) -> anyhow::Result<Option<RecipeSummary>> {
        let recipe = sqlx::query_as::<_, RecipeSummary>(
            "SELECT id, name, meal_id FROM recipes WHERE id = $1",
        )
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recipe)
    }

    async fn insert_menu_meal(
        &self,
        entry: &DraftMeal,
        submitted_at: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO menu_meals
                (menu_id, meal_id, recipe_id, meal_time, regenerated_times,
                 if_picked_manually, is_leftover, submitted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(entry.menu_id)
        .bind(entry.meal_id)
        .bind(entry.recipe_id)
        .bind(entry.meal_time)
        .bind(entry.regenerated_times)
        .bind(entry.picked_manually)
        .bind(entry.leftover)
        .bind(submitted_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn submit_menu(&self, menu_id: i64, submitted_at: DateTime<Utc>) -> anyhow::Result<()> {
        let result = sqlx::query("UPDATE menus SET submitted_at = $1 WHERE id = $2")
            .bind(submitted_at)
            .bind(menu_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("Menu {menu_id} not found");
        }
        Ok(())
    }

    async fn clear_menu_meals(&self, menu_id: i64) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "DELETE FROM menu_meals mm
             USING menus m
             WHERE mm.menu_id = m.id AND m.id = $1 AND m.submitted_at IS NULL",
        )
        .bind(menu_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_unsubmitted_menu(&self, menu_id: i64) -> anyhow::Result<bool> {
        // menu_meals rows go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM menus WHERE id = $1 AND submitted_at IS NULL")
            .bind(menu_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
