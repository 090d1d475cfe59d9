use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};

use crate::{
    error::AppError,
    middleware::user::CurrentUser,
    models::recipe::{NewRecipe, RecipeQuery},
    services::{
        favorites::FavoriteService, meals::MealService, recipes::RecipeService,
        uploads::UploadService,
    },
    views::{render, FavoritesTemplate, MealOption, RecipeFormTemplate, RecipeTemplate, RecipesTemplate},
    AppState,
};

/// GET /recipes?meal_id=&q=
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<Html<String>, AppError> {
    let meals = MealService::list(&state.db).await?;
    let listing = RecipeService::list(&state.db, query.meal_id(), query.search()).await?;
    render(&RecipesTemplate {
        meals: MealOption::list(&meals, query.meal_id()),
        query: query.search().unwrap_or_default().to_string(),
        recipes: listing.recipes,
        truncated: listing.truncated,
    })
}

/// GET /recipes/new
pub async fn new_recipe_form(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let meals = MealService::list(&state.db).await?;
    render(&RecipeFormTemplate::new(&meals, None))
}

/// POST /recipes/new
pub async fn create_recipe(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let submission = match NewRecipe::from_pairs(pairs) {
        Ok(submission) => submission,
        Err(e) => {
            let meals = MealService::list(&state.db).await?;
            let page = render(&RecipeFormTemplate::new(&meals, Some(e.to_string())))?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let recipe = RecipeService::create(&state.db, &submission).await?;
    Ok(Redirect::to(&format!("/recipes/{}", recipe.id)).into_response())
}

/// GET /recipes/{id}
pub async fn show_recipe(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let detail = RecipeService::get_with_ingredients(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {id} not found")))?;
    let is_favorite = FavoriteService::is_favorite(&state.db, user.user_id, id).await?;
    render(&RecipeTemplate::new(&detail, is_favorite))
}

/// POST /recipes/{id}/image — multipart, field `file`
pub async fn upload_image(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let detail = RecipeService::get_with_ingredients(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {id} not found")))?;

    let path = match UploadService::save_recipe_image(&state.config.upload_dir, multipart).await {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("image upload for recipe {id} rejected: {e}");
            let is_favorite = FavoriteService::is_favorite(&state.db, user.user_id, id).await?;
            let mut page = RecipeTemplate::new(&detail, is_favorite);
            page.error = Some(e.to_string());
            return Ok((StatusCode::BAD_REQUEST, render(&page)?).into_response());
        }
    };

    if !RecipeService::attach_image(&state.db, id, &path).await? {
        return Err(AppError::NotFound(format!("Recipe {id} not found")));
    }
    Ok(Redirect::to(&format!("/recipes/{id}")).into_response())
}

/// POST /recipes/{id}/favorite — add or remove
pub async fn toggle_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    if RecipeService::get(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!("Recipe {id} not found")));
    }
    let now_favorite = FavoriteService::toggle(&state.db, user.user_id, id).await?;
    tracing::debug!("recipe {id} favorite={now_favorite} for user {}", user.user_id);
    Ok(Redirect::to(&format!("/recipes/{id}")))
}

/// GET /favorites
pub async fn list_favorites(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    let favorites = FavoriteService::list(&state.db, user.user_id).await?;
    render(&FavoritesTemplate::from(favorites))
}
