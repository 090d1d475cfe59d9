use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A proposed meal for one slot of today's menu. Lives only in the session
/// until the draft is finalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftMeal {
    pub menu_id: i64,
    pub meal_id: i64,
    pub meal_name: String,
    pub recipe_id: i64,
    pub recipe_name: String,
    pub meal_time: NaiveTime,
    pub regenerated_times: i32,
    pub picked_manually: bool,
    pub leftover: bool,
}

/// The session-held, uncommitted menu.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draft {
    pub menu_id: i64,
    pub entries: Vec<DraftMeal>,
}

impl Draft {
    pub fn entry_mut(&mut self, position: usize) -> Option<&mut DraftMeal> {
        self.entries.get_mut(position)
    }
}

/// Outcome of turning a draft into persisted rows.
#[derive(Debug, Clone)]
pub struct FinalizedMenu {
    pub menu_id: i64,
    pub persisted: usize,
    pub submitted_at: DateTime<Utc>,
}

/// Body of POST /menu/init. The form repeats the `meals` key once per
/// checked slot, so it is read from raw key/value pairs.
#[derive(Debug, Default, PartialEq)]
pub struct InitMenuForm {
    pub meals: Vec<String>,
}

impl InitMenuForm {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let meals = pairs
            .into_iter()
            .filter(|(k, _)| k == "meals" || k == "meals[]")
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        Self { meals }
    }
}

/// Body of POST /menu/draft/{pos}/select
#[derive(Debug, Deserialize)]
pub struct SelectRecipeForm {
    pub recipe_id: i64,
}

/// Body of POST /menu/draft/{pos}/time
#[derive(Debug, Deserialize)]
pub struct MealTimeForm {
    pub meal_time: String,
}

impl MealTimeForm {
    /// Accepts `HH:MM` (what `<input type="time">` sends) or `HH:MM:SS`.
    pub fn parse(&self) -> Option<NaiveTime> {
        let raw = self.meal_time.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }
}
