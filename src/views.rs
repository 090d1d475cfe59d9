//! Page templates. Handlers map models into the plain view structs below;
//! the templates themselves live in `templates/`.

use askama::Template;
use axum::response::Html;
use chrono::{DateTime, NaiveTime, Utc};

use crate::{
    error::AppError,
    models::{
        draft::{Draft, DraftMeal},
        favorite::FavoriteRecipe,
        meal::Meal,
        menu::{MenuMealRow, MenuWithMeals},
        recipe::{IngredientLine, RecipeDetail, RecipeListItem},
    },
};

pub fn render<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

fn hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn opt_minutes(value: Option<i32>) -> String {
    value.map(|v| format!("{v} min")).unwrap_or_else(|| "-".into())
}

pub struct MealOption {
    pub id: i64,
    pub name: String,
    pub default_time: String,
    pub selected: bool,
}

impl MealOption {
    pub fn list(meals: &[Meal], selected: Option<i64>) -> Vec<Self> {
        meals
            .iter()
            .map(|m| MealOption {
                id: m.id,
                name: m.name.clone(),
                default_time: hhmm(m.default_time),
                selected: Some(m.id) == selected,
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub meals: Vec<MealOption>,
    pub has_draft: bool,
    pub error: Option<String>,
}

pub struct DraftEntryView {
    pub position: usize,
    pub meal_name: String,
    pub recipe_id: i64,
    pub recipe_name: String,
    pub meal_time: String,
    pub regenerated_times: i32,
    pub picked_manually: bool,
    pub leftover: bool,
}

impl DraftEntryView {
    fn new(position: usize, entry: &DraftMeal) -> Self {
        Self {
            position,
            meal_name: entry.meal_name.clone(),
            recipe_id: entry.recipe_id,
            recipe_name: entry.recipe_name.clone(),
            meal_time: hhmm(entry.meal_time),
            regenerated_times: entry.regenerated_times,
            picked_manually: entry.picked_manually,
            leftover: entry.leftover,
        }
    }
}

#[derive(Template)]
#[template(path = "draft.html")]
pub struct DraftTemplate {
    pub menu_id: i64,
    pub entries: Vec<DraftEntryView>,
}

impl From<&Draft> for DraftTemplate {
    fn from(draft: &Draft) -> Self {
        Self {
            menu_id: draft.menu_id,
            entries: draft
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| DraftEntryView::new(i, e))
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "browse.html")]
pub struct BrowseTemplate {
    pub position: usize,
    pub meal_name: String,
    pub current_recipe: String,
    pub query: String,
    pub recipes: Vec<RecipeListItem>,
    pub truncated: bool,
}

pub struct MenuMealView {
    pub meal_name: String,
    pub recipe_id: i64,
    pub recipe_name: String,
    pub meal_time: String,
    pub regenerated_times: i32,
    pub picked_manually: bool,
    pub leftover: bool,
}

impl From<&MenuMealRow> for MenuMealView {
    fn from(row: &MenuMealRow) -> Self {
        Self {
            meal_name: row.meal_name.clone(),
            recipe_id: row.recipe_id,
            recipe_name: row.recipe_name.clone(),
            meal_time: hhmm(row.meal_time),
            regenerated_times: row.regenerated_times,
            picked_manually: row.if_picked_manually,
            leftover: row.is_leftover,
        }
    }
}

#[derive(Template)]
#[template(path = "today.html")]
pub struct TodayTemplate {
    pub date: String,
    pub has_menu: bool,
    pub submitted_at: Option<String>,
    pub has_draft: bool,
    pub meals: Vec<MenuMealView>,
}

impl TodayTemplate {
    pub fn new(date: String, menu: Option<&MenuWithMeals>, has_draft: bool) -> Self {
        Self {
            date,
            has_menu: menu.is_some(),
            submitted_at: menu.and_then(|m| m.menu.submitted_at).map(timestamp),
            has_draft,
            meals: menu
                .map(|m| m.meals.iter().map(MenuMealView::from).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "recipes.html")]
pub struct RecipesTemplate {
    pub meals: Vec<MealOption>,
    pub query: String,
    pub recipes: Vec<RecipeListItem>,
    pub truncated: bool,
}

pub struct IngredientView {
    pub name: String,
    pub amount: String,
}

impl From<&IngredientLine> for IngredientView {
    fn from(line: &IngredientLine) -> Self {
        let amount = [line.measure.as_deref(), line.unit.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            name: line.name.clone(),
            amount,
        }
    }
}

#[derive(Template)]
#[template(path = "recipe.html")]
pub struct RecipeTemplate {
    pub id: i64,
    pub name: String,
    pub meal_name: String,
    pub category: String,
    pub country: String,
    pub portions: String,
    pub prep_time: String,
    pub cooking_time: String,
    pub source_url: Option<String>,
    pub thumb: Option<String>,
    pub ingredients: Vec<IngredientView>,
    pub is_favorite: bool,
    pub error: Option<String>,
}

impl RecipeTemplate {
    pub fn new(detail: &RecipeDetail, is_favorite: bool) -> Self {
        let r = &detail.recipe;
        Self {
            id: r.id,
            name: r.name.clone(),
            meal_name: detail.meal_name.clone(),
            category: detail.category.clone().unwrap_or_else(|| "-".into()),
            country: detail.country.clone().unwrap_or_else(|| "-".into()),
            portions: r.n_portions.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            prep_time: opt_minutes(r.prep_time),
            cooking_time: opt_minutes(r.cooking_time),
            source_url: r.source_url.clone(),
            thumb: r.thumb.clone(),
            ingredients: detail.ingredients.iter().map(IngredientView::from).collect(),
            is_favorite,
            error: None,
        }
    }
}

#[derive(Template)]
#[template(path = "recipe_form.html")]
pub struct RecipeFormTemplate {
    pub meals: Vec<MealOption>,
    pub ingredient_rows: Vec<usize>,
    pub error: Option<String>,
}

impl RecipeFormTemplate {
    pub fn new(meals: &[Meal], error: Option<String>) -> Self {
        Self {
            meals: MealOption::list(meals, None),
            ingredient_rows: (1..=8).collect(),
            error,
        }
    }
}

pub struct FavoriteView {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub meal_name: String,
    pub added_at: String,
}

#[derive(Template)]
#[template(path = "favorites.html")]
pub struct FavoritesTemplate {
    pub favorites: Vec<FavoriteView>,
}

impl From<Vec<FavoriteRecipe>> for FavoritesTemplate {
    fn from(rows: Vec<FavoriteRecipe>) -> Self {
        Self {
            favorites: rows
                .into_iter()
                .map(|f| FavoriteView {
                    recipe_id: f.recipe_id,
                    recipe_name: f.recipe_name,
                    meal_name: f.meal_name,
                    added_at: timestamp(f.added_at),
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: String,
}
