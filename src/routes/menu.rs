use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::{Local, NaiveDate};

use crate::{
    error::AppError,
    middleware::{session::Session, user::CurrentUser},
    models::{
        draft::{DraftMeal, InitMenuForm, MealTimeForm, SelectRecipeForm},
        recipe::RecipeQuery,
    },
    services::{
        drafts::{DraftError, DraftManager},
        meals::MealService,
        menus::MenuService,
        recipes::RecipeService,
        session::DraftStore,
    },
    views::{render, BrowseTemplate, DraftTemplate, IndexTemplate, MealOption, TodayTemplate},
    AppState,
};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Back to the draft after a successful edit; to the start page when the
/// session has no draft (expired, or already finalized).
fn after_edit(result: Result<DraftMeal, DraftError>) -> Result<Redirect, AppError> {
    match result {
        Ok(_) => Ok(Redirect::to("/menu/draft")),
        Err(DraftError::NoDraft) => Ok(Redirect::to("/")),
        Err(e) => Err(e.into()),
    }
}

async fn index_page(
    state: &AppState,
    has_draft: bool,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    let meals = MealService::list(&state.db).await?;
    render(&IndexTemplate {
        meals: MealOption::list(&meals, None),
        has_draft,
        error,
    })
}

/// GET / — meal slot selection
pub async fn index(
    State(state): State<AppState>,
    Session(session): Session,
) -> Result<Html<String>, AppError> {
    let has_draft = state.drafts().load(session).await?.is_some();
    index_page(&state, has_draft, None).await
}

/// POST /menu/init — create today's menu and draft it
pub async fn init_menu(
    State(state): State<AppState>,
    Session(session): Session,
    user: CurrentUser,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = InitMenuForm::from_pairs(pairs);
    let store = state.store();
    let drafts = state.drafts();
    let manager = DraftManager::new(&store, &drafts);

    match manager.initialize(session, user.user_id, today(), &form.meals).await {
        Ok(_) => Ok(Redirect::to("/menu/draft").into_response()),
        Err(e) if e.is_user_facing() => {
            tracing::info!("menu init rejected for user {}: {e}", user.user_id);
            let has_draft = manager.current(session).await?.is_some();
            let page = index_page(&state, has_draft, Some(e.to_string())).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /menu/draft
pub async fn show_draft(
    State(state): State<AppState>,
    Session(session): Session,
) -> Result<Response, AppError> {
    match state.drafts().load(session).await? {
        Some(draft) => Ok(render(&DraftTemplate::from(&draft))?.into_response()),
        None => Ok(Redirect::to("/").into_response()),
    }
}

/// POST /menu/draft/{pos}/regenerate
pub async fn regenerate(
    State(state): State<AppState>,
    Session(session): Session,
    Path(position): Path<usize>,
) -> Result<Redirect, AppError> {
    let store = state.store();
    let drafts = state.drafts();
    after_edit(DraftManager::new(&store, &drafts).regenerate(session, position).await)
}

/// GET /menu/draft/{pos}/browse?q= — recipes to hand-pick from, same slot by default
pub async fn browse(
    State(state): State<AppState>,
    Session(session): Session,
    Path(position): Path<usize>,
    Query(query): Query<RecipeQuery>,
) -> Result<Response, AppError> {
    let Some(draft) = state.drafts().load(session).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    let entry = draft
        .entries
        .get(position)
        .ok_or(DraftError::PositionOutOfRange(position))?;

    let meal_id = query.meal_id().unwrap_or(entry.meal_id);
    let listing = RecipeService::list(&state.db, Some(meal_id), query.search()).await?;

    let page = BrowseTemplate {
        position,
        meal_name: entry.meal_name.clone(),
        current_recipe: entry.recipe_name.clone(),
        query: query.search().unwrap_or_default().to_string(),
        recipes: listing.recipes,
        truncated: listing.truncated,
    };
    Ok(render(&page)?.into_response())
}

/// POST /menu/draft/{pos}/select
pub async fn select_recipe(
    State(state): State<AppState>,
    Session(session): Session,
    Path(position): Path<usize>,
    Form(body): Form<SelectRecipeForm>,
) -> Result<Redirect, AppError> {
    let store = state.store();
    let drafts = state.drafts();
    after_edit(
        DraftManager::new(&store, &drafts)
            .select_manual(session, position, body.recipe_id)
            .await,
    )
}

/// POST /menu/draft/{pos}/time
pub async fn set_time(
    State(state): State<AppState>,
    Session(session): Session,
    Path(position): Path<usize>,
    Form(body): Form<MealTimeForm>,
) -> Result<Redirect, AppError> {
    let time = body
        .parse()
        .ok_or_else(|| AppError::BadRequest(format!("Invalid time: {}", body.meal_time)))?;
    let store = state.store();
    let drafts = state.drafts();
    after_edit(DraftManager::new(&store, &drafts).set_time(session, position, time).await)
}

/// POST /menu/draft/{pos}/leftover
pub async fn toggle_leftover(
    State(state): State<AppState>,
    Session(session): Session,
    Path(position): Path<usize>,
) -> Result<Redirect, AppError> {
    let store = state.store();
    let drafts = state.drafts();
    after_edit(DraftManager::new(&store, &drafts).toggle_leftover(session, position).await)
}

/// POST /menu/finalize
pub async fn finalize(
    State(state): State<AppState>,
    Session(session): Session,
) -> Result<Redirect, AppError> {
    let store = state.store();
    let drafts = state.drafts();
    match DraftManager::new(&store, &drafts).finalize(session).await {
        Ok(_) => Ok(Redirect::to("/menu/today")),
        Err(DraftError::NoDraft) => Ok(Redirect::to("/")),
        Err(e) => Err(e.into()),
    }
}

/// POST /menu/discard
pub async fn discard(
    State(state): State<AppState>,
    Session(session): Session,
) -> Result<Redirect, AppError> {
    let store = state.store();
    let drafts = state.drafts();
    DraftManager::new(&store, &drafts).discard(session).await?;
    Ok(Redirect::to("/"))
}

/// GET /menu/today
pub async fn today_menu(
    State(state): State<AppState>,
    Session(session): Session,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    let day = today();
    let menu = MenuService::for_day(&state.db, user.user_id, day).await?;
    let has_draft = state.drafts().load(session).await?.is_some();
    render(&TodayTemplate::new(
        day.format("%A %-d %B %Y").to_string(),
        menu.as_ref(),
        has_draft,
    ))
}
