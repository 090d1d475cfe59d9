use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

lazy_static! {
    // ── Draft workflow ──────────────────────────────────────────────────────
    pub static ref MENUS_INITIALIZED: IntCounter = register_int_counter!(
        "menus_initialized_total",
        "Daily menus drafted"
    ).unwrap();

    pub static ref DRAFT_REGENERATIONS: IntCounterVec = register_int_counter_vec!(
        "draft_regenerations_total",
        "Draft meals re-rolled, by meal slot",
        &["meal"]
    ).unwrap();

    pub static ref MANUAL_PICKS: IntCounterVec = register_int_counter_vec!(
        "draft_manual_picks_total",
        "Draft meals replaced by a hand-picked recipe, by meal slot",
        &["meal"]
    ).unwrap();

    pub static ref MENUS_FINALIZED: IntCounter = register_int_counter!(
        "menus_finalized_total",
        "Drafts committed to the database"
    ).unwrap();

    pub static ref MENU_MEALS_PERSISTED: IntCounter = register_int_counter!(
        "menu_meals_persisted_total",
        "Menu meal rows written on finalize"
    ).unwrap();

    // ── Recipes ─────────────────────────────────────────────────────────────
    pub static ref RECIPES_CREATED: IntCounterVec = register_int_counter_vec!(
        "recipes_created_total",
        "Recipes added, by source (form or csv)",
        &["source"]
    ).unwrap();
}
