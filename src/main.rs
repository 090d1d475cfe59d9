use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use menu_planner::{
    config::Config,
    db,
    middleware::session::ensure_session,
    routes, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;
    let test_user_id = db::resolve_test_user(&pool, &config.test_user_email).await?;
    info!("Database connected and migrations applied (acting as user {})", test_user_id);

    let redis_client = redis::Client::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let state = AppState {
        db: pool,
        redis: redis_conn,
        config: config.clone(),
        test_user_id,
    };

    let app = Router::new()
        .route("/", get(routes::menu::index))
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Draft workflow
        .route("/menu/init", post(routes::menu::init_menu))
        .route("/menu/draft", get(routes::menu::show_draft))
        .route("/menu/draft/{pos}/regenerate", post(routes::menu::regenerate))
        .route("/menu/draft/{pos}/browse", get(routes::menu::browse))
        .route("/menu/draft/{pos}/select", post(routes::menu::select_recipe))
        .route("/menu/draft/{pos}/time", post(routes::menu::set_time))
        .route("/menu/draft/{pos}/leftover", post(routes::menu::toggle_leftover))
        .route("/menu/finalize", post(routes::menu::finalize))
        .route("/menu/discard", post(routes::menu::discard))
        .route("/menu/today", get(routes::menu::today_menu))
        // Recipes
        .route("/recipes", get(routes::recipes::list_recipes))
        .route("/recipes/new", get(routes::recipes::new_recipe_form).post(routes::recipes::create_recipe))
        .route("/recipes/{id}", get(routes::recipes::show_recipe))
        .route("/recipes/{id}/image", post(routes::recipes::upload_image))
        .route("/recipes/{id}/favorite", post(routes::recipes::toggle_favorite))
        .route("/favorites", get(routes::recipes::list_favorites))
        // Uploaded images
        .nest_service("/static", ServeDir::new(&config.upload_dir))
        .layer(axum::middleware::from_fn(ensure_session))
        .layer(TraceLayer::new_for_http())
        // Recipe photos; 10 MB
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("menu planner listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
