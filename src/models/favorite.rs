use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FavoriteRecipe {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub meal_name: String,
    pub added_at: DateTime<Utc>,
}
