use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One user's menu for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Menu {
    pub id: i64,
    pub user_id: i64,
    pub menu_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// Set once the draft has been finalized.
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Menu {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }
}

/// A persisted menu meal joined with its slot and recipe names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuMealRow {
    pub id: i64,
    pub meal_id: i64,
    pub meal_name: String,
    pub recipe_id: i64,
    pub recipe_name: String,
    pub meal_time: NaiveTime,
    pub regenerated_times: i32,
    pub if_picked_manually: bool,
    pub is_leftover: bool,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct MenuWithMeals {
    pub menu: Menu,
    pub meals: Vec<MenuMealRow>,
}
