pub mod drafts;
pub mod favorites;
pub mod meals;
pub mod menus;
pub mod metrics;
pub mod recipes;
pub mod session;
pub mod uploads;
