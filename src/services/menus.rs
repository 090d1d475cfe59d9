use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::menu::{Menu, MenuMealRow, MenuWithMeals};

pub struct MenuService;

impl MenuService {
    /// The user's menu for `day` with its persisted meals, if one was created.
    pub async fn for_day(
        pool: &PgPool,
        user_id: i64,
        day: NaiveDate,
    ) -> anyhow::Result<Option<MenuWithMeals>> {
        let menu = sqlx::query_as::<_, Menu>(
            "SELECT id, user_id, menu_date, created_at, submitted_at
             FROM menus
             WHERE user_id = $1 AND menu_date = $2",
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(pool)
        .await?;

        let Some(menu) = menu else {
            return Ok(None);
        };

        let meals = sqlx::query_as::<_, MenuMealRow>(
            "SELECT mm.id, mm.meal_id, m.name AS meal_name, mm.recipe_id, r.name AS recipe_name,
                    mm.meal_time, mm.regenerated_times, mm.if_picked_manually, mm.is_leftover,
                    mm.submitted_at
             FROM menu_meals mm
             JOIN meals m ON m.id = mm.meal_id
             JOIN recipes r ON r.id = mm.recipe_id
             WHERE mm.menu_id = $1
             ORDER BY mm.meal_time, mm.id",
        )
        .bind(menu.id)
        .fetch_all(pool)
        .await?;

        Ok(Some(MenuWithMeals { menu, meals }))
    }
}
