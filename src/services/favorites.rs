use sqlx::PgPool;

use crate::models::favorite::FavoriteRecipe;

pub struct FavoriteService;

impl FavoriteService {
    pub async fn list(pool: &PgPool, user_id: i64) -> anyhow::Result<Vec<FavoriteRecipe>> {
        let favorites = sqlx::query_as::<_, FavoriteRecipe>(
            "SELECT f.recipe_id, r.name AS recipe_name, m.name AS meal_name, f.added_at
             FROM user_favorite_recipes f
             JOIN recipes r ON r.id = f.recipe_id
             JOIN meals m ON m.id = r.meal_id
             WHERE f.user_id = $1
             ORDER BY f.added_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(favorites)
    }

    pub async fn is_favorite(pool: &PgPool, user_id: i64, recipe_id: i64) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_favorite_recipes WHERE user_id = $1 AND recipe_id = $2)",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Idempotent: marking an existing favorite again is a no-op.
    pub async fn add(pool: &PgPool, user_id: i64, recipe_id: i64) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO user_favorite_recipes (user_id, recipe_id)
             VALUES ($1, $2)
             ON CONFLICT (user_id, recipe_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn remove(pool: &PgPool, user_id: i64, recipe_id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM user_favorite_recipes WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Flip the favorite state; returns whether the recipe is now a favorite.
    pub async fn toggle(pool: &PgPool, user_id: i64, recipe_id: i64) -> anyhow::Result<bool> {
        if Self::is_favorite(pool, user_id, recipe_id).await? {
            Self::remove(pool, user_id, recipe_id).await?;
            Ok(false)
        } else {
            Self::add(pool, user_id, recipe_id).await?;
            Ok(true)
        }
    }
}
