pub mod health;
pub mod menu;
pub mod metrics;
pub mod recipes;
