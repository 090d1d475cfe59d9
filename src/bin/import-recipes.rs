//! Import recipes from a delimited file into the recipes table.
//!
//! Only columns present both in the file header and in the recipes table are
//! used; blank cells are stored as NULL. The whole file goes in one transaction.
//!
//! Usage: import-recipes [--delimiter ';'] data/recipes.csv

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use menu_planner::{db, services::recipes::{parse_recipe_csv, RecipeService}};

#[derive(Parser)]
#[command(name = "import-recipes", about = "Load recipes from a CSV file")]
struct Args {
    /// CSV file to import
    path: PathBuf,

    /// Field delimiter
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// Skip running migrations before importing
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    if !args.delimiter.is_ascii() {
        anyhow::bail!("Delimiter must be a single ASCII character");
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL required")?;
    let pool = db::create_pool(&database_url, 2).await?;
    if !args.no_migrate {
        db::run_migrations(&pool).await?;
    }

    let file = std::fs::File::open(&args.path)
        .with_context(|| format!("Failed to open {:?}", args.path))?;
    let batch = parse_recipe_csv(file, args.delimiter as u8)?;
    let columns: Vec<&str> = batch.columns.iter().map(|(c, _)| *c).collect();
    tracing::info!("Importing {} rows using columns {:?}", batch.rows.len(), columns);

    let count = RecipeService::import(&pool, &batch).await?;
    tracing::info!("Imported {} recipes from {:?}", count, args.path);

    Ok(())
}
