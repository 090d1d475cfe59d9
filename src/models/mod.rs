pub mod draft;
pub mod favorite;
pub mod meal;
pub mod menu;
pub mod recipe;
