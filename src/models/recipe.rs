use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub external_id: Option<String>,
    pub country_id: Option<i64>,
    pub meal_id: i64,
    pub category_id: Option<i64>,
    pub n_portions: Option<i32>,
    pub prep_time: Option<i32>, // minutes
    pub cooking_time: Option<i32>, // minutes
    pub area: Option<String>,
    /// Path relative to the static directory.
    pub thumb: Option<String>,
    pub source_url: Option<String>,
    pub youtube: Option<String>,
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// The slice of a recipe the draft workflow needs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub meal_id: i64,
}

/// Row of the recipe listing and browse pages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecipeListItem {
    pub id: i64,
    pub name: String,
    pub meal_id: i64,
    pub meal_name: String,
    pub thumb: Option<String>,
}

/// Recipe search results capped at a page size; `truncated` marks that more
/// recipes matched than are listed.
#[derive(Debug, Clone, Default)]
pub struct RecipeListing {
    pub recipes: Vec<RecipeListItem>,
    pub truncated: bool,
}

impl RecipeListing {
    /// Build from rows fetched with `limit + 1` as the SQL limit.
    pub fn from_rows(mut rows: Vec<RecipeListItem>, limit: usize) -> Self {
        let truncated = rows.len() > limit;
        rows.truncate(limit);
        Self { recipes: rows, truncated }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct IngredientLine {
    pub name: String,
    pub measure: Option<String>,
    pub unit: Option<String>,
}

/// Recipe joined with its reference names and ordered ingredients.
#[derive(Debug, Clone)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub meal_name: String,
    pub category: Option<String>,
    pub country: Option<String>,
    pub ingredients: Vec<IngredientLine>,
}

/// Query params for GET /recipes and the draft browse page.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    /// Kept as text so the "all meals" option (empty value) does not reject the request.
    pub meal_id: Option<String>,
    pub q: Option<String>,
}

impl RecipeQuery {
    pub fn meal_id(&self) -> Option<i64> {
        self.meal_id.as_deref().and_then(|s| s.trim().parse().ok())
    }

    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIngredientLine {
    pub name: String,
    pub measure: Option<String>,
    pub unit: Option<String>,
}

/// Body of POST /recipes/new.
///
/// Ingredient rows arrive as repeated `ingredient_name` / `ingredient_measure` /
/// `ingredient_unit` keys and are matched up by their order in the form.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub name: String,
    pub meal_id: i64,
    pub category: String,
    pub country: Option<String>,
    pub n_portions: Option<i32>,
    pub prep_time: Option<i32>,
    pub cooking_time: Option<i32>,
    pub source_url: Option<String>,
    pub ingredients: Vec<NewIngredientLine>,
}

impl NewRecipe {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> anyhow::Result<Self> {
        let mut name = None;
        let mut meal_id = None;
        let mut category = None;
        let mut country = None;
        let mut n_portions = None;
        let mut prep_time = None;
        let mut cooking_time = None;
        let mut source_url = None;
        let mut names = Vec::new();
        let mut measures = Vec::new();
        let mut units = Vec::new();

        for (key, value) in pairs {
            let value = value.trim().to_string();
            match key.as_str() {
                "name" => name = non_empty(value),
                "meal_id" => meal_id = value.parse::<i64>().ok(),
                "category" => category = non_empty(value),
                "country" => country = non_empty(value),
                "n_portions" => n_portions = value.parse().ok(),
                "prep_time" => prep_time = value.parse().ok(),
                "cooking_time" => cooking_time = value.parse().ok(),
                "source_url" => source_url = non_empty(value),
                "ingredient_name" => names.push(value),
                "ingredient_measure" => measures.push(non_empty(value)),
                "ingredient_unit" => units.push(non_empty(value)),
                _ => {}
            }
        }

        let ingredients = names
            .into_iter()
            .enumerate()
            .filter(|(_, n)| !n.is_empty())
            .map(|(i, n)| NewIngredientLine {
                name: n,
                measure: measures.get(i).cloned().flatten(),
                unit: units.get(i).cloned().flatten(),
            })
            .collect();

        Ok(Self {
            name: name.ok_or_else(|| anyhow::anyhow!("Recipe name is required"))?,
            meal_id: meal_id.ok_or_else(|| anyhow::anyhow!("Please choose a meal"))?,
            category: category.ok_or_else(|| anyhow::anyhow!("Category is required"))?,
            country,
            n_portions,
            prep_time,
            cooking_time,
            source_url,
            ingredients,
        })
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
