use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named time-of-day meal slot (Breakfast, Lunch, ...). Seeded reference data.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Meal {
    pub id: i64,
    pub name: String,
    pub default_time: NaiveTime,
}
