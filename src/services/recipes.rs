use std::io::Read;

use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    models::recipe::{IngredientLine, NewRecipe, Recipe, RecipeDetail, RecipeListItem, RecipeListing},
    services::metrics,
};

const RECIPE_COLS: &str = "id, name, external_id, country_id, meal_id, category_id, n_portions,
     prep_time, cooking_time, area, thumb, source_url, youtube, rating, created_at";

/// Columns a CSV import may fill, with the SQL type each text value is cast to.
pub const IMPORT_COLUMNS: &[(&str, &str)] = &[
    ("name", "TEXT"),
    ("external_id", "TEXT"),
    ("country_id", "BIGINT"),
    ("meal_id", "BIGINT"),
    ("category_id", "BIGINT"),
    ("n_portions", "INT"),
    ("prep_time", "INT"),
    ("cooking_time", "INT"),
    ("area", "TEXT"),
    ("thumb", "TEXT"),
    ("source_url", "TEXT"),
    ("youtube", "TEXT"),
    ("rating", "DOUBLE PRECISION"),
];

/// Rows parsed from a recipe CSV, restricted to the columns both the file and
/// the recipes table know about.
#[derive(Debug, PartialEq)]
pub struct CsvBatch {
    pub columns: Vec<(&'static str, &'static str)>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl CsvBatch {
    fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.columns.iter().map(|(c, _)| *c).collect();
        let placeholders: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, (_, ty))| format!("${}::{}", i + 1, ty))
            .collect();
        format!(
            "INSERT INTO recipes ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        )
    }
}

/// Parse a delimited recipe file. Headers are trimmed (and a leading BOM
/// dropped); blank cells become NULL.
pub fn parse_recipe_csv<R: Read>(reader: R, delimiter: u8) -> anyhow::Result<CsvBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let picked: Vec<(usize, (&'static str, &'static str))> = IMPORT_COLUMNS
        .iter()
        .filter_map(|col| {
            headers
                .iter()
                .position(|h| h == col.0)
                .map(|idx| (idx, *col))
        })
        .collect();

    if picked.is_empty() {
        anyhow::bail!("No matching columns found between the recipes table and the CSV headers");
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let values = picked
            .iter()
            .map(|(idx, _)| {
                record
                    .get(*idx)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            })
            .collect();
        rows.push(values);
    }

    Ok(CsvBatch {
        columns: picked.into_iter().map(|(_, col)| col).collect(),
        rows,
    })
}

/// Most recipes a listing or browse page shows.
pub const LIST_LIMIT: usize = 200;

pub struct RecipeService;

impl RecipeService {
    /// Recipes filtered by meal slot and/or a case-insensitive name fragment,
    /// at most [`LIST_LIMIT`] of them.
    pub async fn list(
        pool: &PgPool,
        meal_id: Option<i64>,
        search: Option<&str>,
    ) -> anyhow::Result<RecipeListing> {
        let rows = sqlx::query_as::<_, RecipeListItem>(
            "SELECT r.id, r.name, r.meal_id, m.name AS meal_name, r.thumb
             FROM recipes r
             JOIN meals m ON m.id = r.meal_id
             WHERE ($1::BIGINT IS NULL OR r.meal_id = $1)
               AND ($2::TEXT IS NULL OR r.name ILIKE '%' || $2 || '%')
             ORDER BY r.name
             LIMIT $3",
        )
        .bind(meal_id)
        .bind(search)
        .bind(LIST_LIMIT as i64 + 1)
        .fetch_all(pool)
        .await?;
        Ok(RecipeListing::from_rows(rows, LIST_LIMIT))
    }

    pub async fn get(pool: &PgPool, id: i64) -> anyhow::Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLS} FROM recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(recipe)
    }

    pub async fn get_with_ingredients(pool: &PgPool, id: i64) -> anyhow::Result<Option<RecipeDetail>> {
        let Some(recipe) = Self::get(pool, id).await? else {
            return Ok(None);
        };

        let (meal_name, category, country): (String, Option<String>, Option<String>) =
            sqlx::query_as(
                "SELECT m.name, c.name, co.name
                 FROM recipes r
                 JOIN meals m ON m.id = r.meal_id
                 LEFT JOIN categories c ON c.id = r.category_id
                 LEFT JOIN countries co ON co.id = r.country_id
                 WHERE r.id = $1",
            )
            .bind(id)
            .fetch_one(pool)
            .await?;

        let ingredients = sqlx::query_as::<_, IngredientLine>(
            "SELECT i.name, ri.measure, ri.unit
             FROM recipe_ingredients ri
             JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id = $1
             ORDER BY ri.sort_order",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(Some(RecipeDetail {
            recipe,
            meal_name,
            category,
            country,
            ingredients,
        }))
    }

    /// Insert a submitted recipe with its ingredient lines, creating any
    /// category, country or ingredient names not seen before.
    pub async fn create(pool: &PgPool, req: &NewRecipe) -> anyhow::Result<Recipe> {
        let mut tx = pool.begin().await?;

        let category_id = upsert_name(&mut tx, NameTable::Categories, &req.category).await?;
        let country_id = match &req.country {
            Some(country) => Some(upsert_name(&mut tx, NameTable::Countries, country).await?),
            None => None,
        };

        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "INSERT INTO recipes
                (name, meal_id, category_id, country_id, n_portions, prep_time, cooking_time, source_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {RECIPE_COLS}"
        ))
        .bind(&req.name)
        .bind(req.meal_id)
        .bind(category_id)
        .bind(country_id)
        .bind(req.n_portions)
        .bind(req.prep_time)
        .bind(req.cooking_time)
        .bind(&req.source_url)
        .fetch_one(&mut *tx)
        .await?;

        for (order, line) in req.ingredients.iter().enumerate() {
            let ingredient_id = upsert_name(&mut tx, NameTable::Ingredients, &line.name).await?;
            sqlx::query(
                "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, sort_order, measure, unit)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(recipe.id)
            .bind(ingredient_id)
            .bind(order as i32)
            .bind(&line.measure)
            .bind(&line.unit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        metrics::RECIPES_CREATED.with_label_values(&["form"]).inc();
        tracing::info!(
            "Created recipe {} '{}' with {} ingredients",
            recipe.id,
            recipe.name,
            req.ingredients.len()
        );
        Ok(recipe)
    }

    /// Record an uploaded image as the recipe thumbnail. Returns false if the recipe is gone.
    pub async fn attach_image(pool: &PgPool, id: i64, path: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE recipes SET thumb = $1 WHERE id = $2")
            .bind(path)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert every parsed CSV row in one transaction; nothing is kept if a row fails.
    pub async fn import(pool: &PgPool, batch: &CsvBatch) -> anyhow::Result<usize> {
        if batch.rows.is_empty() {
            return Ok(0);
        }
        let sql = batch.insert_sql();
        let mut tx = pool.begin().await?;
        for row in &batch.rows {
            let mut query = sqlx::query(&sql);
            for value in row {
                query = query.bind(value.as_deref());
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        metrics::RECIPES_CREATED
            .with_label_values(&["csv"])
            .inc_by(batch.rows.len() as u64);
        Ok(batch.rows.len())
    }
}

#[derive(Debug, Clone, Copy)]
enum NameTable {
    Categories,
    Countries,
    Ingredients,
}

impl NameTable {
    fn table(self) -> &'static str {
        match self {
            NameTable::Categories => "categories",
            NameTable::Countries => "countries",
            NameTable::Ingredients => "ingredients",
        }
    }
}

/// Id of the row named `name`, inserting it first if needed.
async fn upsert_name(
    tx: &mut Transaction<'_, Postgres>,
    table: NameTable,
    name: &str,
) -> anyhow::Result<i64> {
    let table = table.table();
    let id: i64 = sqlx::query_scalar(&format!(
        "INSERT INTO {table} (name) VALUES ($1)
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
         RETURNING id"
    ))
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}
