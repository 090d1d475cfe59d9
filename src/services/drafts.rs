//! Draft menu workflow: initialize a day's menu with one random recipe per
//! selected meal slot, let the user regenerate or hand-pick entries, then
//! persist everything on finalize.
//!
//! A menu goes `NONE -> DRAFTING -> SUBMITTED`. Drafting exists only as the
//! session-held [`Draft`]; the database only ever sees the menu row (created
//! on initialize) and its meals (written on finalize).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::{
    models::{
        draft::{Draft, DraftMeal, FinalizedMenu},
        meal::Meal,
        menu::Menu,
        recipe::RecipeSummary,
    },
    services::{
        metrics,
        session::{DraftStore, SessionId},
    },
};

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Please select at least one meal")]
    NoMealsSelected,
    #[error("A menu for today already exists")]
    MenuAlreadyExists,
    #[error("Unknown meal: {0}")]
    UnknownMeal(String),
    #[error("No recipes available for {0}")]
    NoRecipesForMeal(String),
    #[error("No menu is being drafted")]
    NoDraft,
    #[error("No meal at position {0} in the draft")]
    PositionOutOfRange(usize),
    #[error("Recipe {0} not found")]
    RecipeNotFound(i64),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl DraftError {
    /// Errors the user caused and can fix from the page they are on.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            DraftError::NoMealsSelected
                | DraftError::MenuAlreadyExists
                | DraftError::UnknownMeal(_)
                | DraftError::NoRecipesForMeal(_)
        )
    }
}

/// Persistent records the draft workflow reads and writes.
#[allow(async_fn_in_trait)]
pub trait MealPlanStore {
    async fn menu_for_day(&self, user_id: i64, day: NaiveDate) -> anyhow::Result<Option<Menu>>;
    /// Returns `None` when a menu for that user and day already exists.
    async fn create_menu(&self, user_id: i64, day: NaiveDate) -> anyhow::Result<Option<Menu>>;
    async fn meal_by_name(&self, name: &str) -> anyhow::Result<Option<Meal>>;
    async fn recipes_for_meal(&self, meal_id: i64) -> anyhow::Result<Vec<RecipeSummary>>;
    async fn recipe_summary(&self, recipe_id: i64) -> anyhow::Result<Option<RecipeSummary>>;
    async fn insert_menu_meal(
        &self,
        entry: &DraftMeal,
        submitted_at: DateTime<Utc>,
    ) -> anyhow::Result<i64>;
    async fn submit_menu(&self, menu_id: i64, submitted_at: DateTime<Utc>) -> anyhow::Result<()>;
    /// Remove meal rows left by an earlier failed finalize of an unsubmitted menu.
    async fn clear_menu_meals(&self, menu_id: i64) -> anyhow::Result<u64>;
    /// Delete a menu that was never submitted. Returns whether a row went away.
    async fn delete_unsubmitted_menu(&self, menu_id: i64) -> anyhow::Result<bool>;
}

/// Uniform pick, avoiding `exclude` whenever another candidate exists.
fn pick_recipe(candidates: &[RecipeSummary], exclude: Option<i64>) -> Option<&RecipeSummary> {
    let fresh: Vec<&RecipeSummary> = candidates
        .iter()
        .filter(|r| Some(r.id) != exclude)
        .collect();
    let mut rng = rand::thread_rng();
    if fresh.is_empty() {
        candidates.choose(&mut rng)
    } else {
        fresh.choose(&mut rng).copied()
    }
}

pub struct DraftManager<'a, S, D> {
    store: &'a S,
    drafts: &'a D,
}

impl<'a, S, D> DraftManager<'a, S, D>
where
    S: MealPlanStore,
    D: DraftStore,
{
    pub fn new(store: &'a S, drafts: &'a D) -> Self {
        Self { store, drafts }
    }

    /// Create today's menu row and draft one random recipe per selected slot.
    pub async fn initialize(
        &self,
        session: SessionId,
        user_id: i64,
        today: NaiveDate,
        selected: &[String],
    ) -> Result<Draft, DraftError> {
        if selected.is_empty() {
            return Err(DraftError::NoMealsSelected);
        }
        if self.store.menu_for_day(user_id, today).await?.is_some() {
            return Err(DraftError::MenuAlreadyExists);
        }

        // Resolve every slot before writing so a bad selection leaves no menu row behind.
        let mut slots = Vec::with_capacity(selected.len());
        for name in selected {
            let meal = self
                .store
                .meal_by_name(name)
                .await?
                .ok_or_else(|| DraftError::UnknownMeal(name.clone()))?;
            let pool = self.store.recipes_for_meal(meal.id).await?;
            if pool.is_empty() {
                return Err(DraftError::NoRecipesForMeal(meal.name));
            }
            slots.push((meal, pool));
        }

        let menu = self
            .store
            .create_menu(user_id, today)
            .await?
            .ok_or(DraftError::MenuAlreadyExists)?;

        let entries = slots
            .iter()
            .filter_map(|(meal, pool)| {
                pick_recipe(pool, None).map(|recipe| DraftMeal {
                    menu_id: menu.id,
                    meal_id: meal.id,
                    meal_name: meal.name.clone(),
                    recipe_id: recipe.id,
                    recipe_name: recipe.name.clone(),
                    meal_time: meal.default_time,
                    regenerated_times: 0,
                    picked_manually: false,
                    leftover: false,
                })
            })
            .collect();

        let draft = Draft { menu_id: menu.id, entries };
        if let Err(e) = self.drafts.save(session, &draft).await {
            // Without a draft nothing could ever finalize this menu.
            if let Err(cleanup) = self.store.delete_unsubmitted_menu(menu.id).await {
                tracing::error!("Failed to remove orphaned menu {}: {cleanup}", menu.id);
            }
            return Err(e.into());
        }

        metrics::MENUS_INITIALIZED.inc();
        tracing::info!(
            "Drafted menu {} for user {} with {} meals",
            menu.id,
            user_id,
            draft.entries.len()
        );
        Ok(draft)
    }

    pub async fn current(&self, session: SessionId) -> Result<Option<Draft>, DraftError> {
        Ok(self.drafts.load(session).await?)
    }

    async fn require_draft(&self, session: SessionId) -> Result<Draft, DraftError> {
        self.drafts.load(session).await?.ok_or(DraftError::NoDraft)
    }

    /// Swap the recipe at `position` for another random one from the same slot.
    pub async fn regenerate(
        &self,
        session: SessionId,
        position: usize,
    ) -> Result<DraftMeal, DraftError> {
        let mut draft = self.require_draft(session).await?;
        let (meal_id, meal_name, current) = {
            let entry = draft
                .entries
                .get(position)
                .ok_or(DraftError::PositionOutOfRange(position))?;
            (entry.meal_id, entry.meal_name.clone(), entry.recipe_id)
        };

        let pool = self.store.recipes_for_meal(meal_id).await?;
        let recipe = pick_recipe(&pool, Some(current))
            .cloned()
            .ok_or(DraftError::NoRecipesForMeal(meal_name))?;

        let entry = draft
            .entry_mut(position)
            .ok_or(DraftError::PositionOutOfRange(position))?;
        entry.recipe_id = recipe.id;
        entry.recipe_name = recipe.name;
        entry.regenerated_times += 1;
        let updated = entry.clone();

        self.drafts.save(session, &draft).await?;
        metrics::DRAFT_REGENERATIONS
            .with_label_values(&[updated.meal_name.as_str()])
            .inc();
        tracing::debug!(
            "Regenerated {} in menu {} ({} times)",
            updated.meal_name,
            draft.menu_id,
            updated.regenerated_times
        );
        Ok(updated)
    }

    /// Put an explicitly chosen recipe at `position`.
    pub async fn select_manual(
        &self,
        session: SessionId,
        position: usize,
        recipe_id: i64,
    ) -> Result<DraftMeal, DraftError> {
        let mut draft = self.require_draft(session).await?;
        if position >= draft.entries.len() {
            return Err(DraftError::PositionOutOfRange(position));
        }
        let recipe = self
            .store
            .recipe_summary(recipe_id)
            .await?
            .ok_or(DraftError::RecipeNotFound(recipe_id))?;

        let entry = draft
            .entry_mut(position)
            .ok_or(DraftError::PositionOutOfRange(position))?;
        entry.recipe_id = recipe.id;
        entry.recipe_name = recipe.name;
        entry.picked_manually = true;
        let updated = entry.clone();

        self.drafts.save(session, &draft).await?;
        metrics::MANUAL_PICKS
            .with_label_values(&[updated.meal_name.as_str()])
            .inc();
        Ok(updated)
    }

    pub async fn set_time(
        &self,
        session: SessionId,
        position: usize,
        time: NaiveTime,
    ) -> Result<DraftMeal, DraftError> {
        self.update_entry(session, position, |entry| entry.meal_time = time)
            .await
    }

    pub async fn toggle_leftover(
        &self,
        session: SessionId,
        position: usize,
    ) -> Result<DraftMeal, DraftError> {
        self.update_entry(session, position, |entry| entry.leftover = !entry.leftover)
            .await
    }

    async fn update_entry<F>(
        &self,
        session: SessionId,
        position: usize,
        apply: F,
    ) -> Result<DraftMeal, DraftError>
    where
        F: FnOnce(&mut DraftMeal),
    {
        let mut draft = self.require_draft(session).await?;
        let entry = draft
            .entry_mut(position)
            .ok_or(DraftError::PositionOutOfRange(position))?;
        apply(entry);
        let updated = entry.clone();
        self.drafts.save(session, &draft).await?;
        Ok(updated)
    }

    /// Write every draft entry, stamp the menu as submitted and drop the draft.
    ///
    /// The inserts are not wrapped in a transaction: a failure part-way through
    /// leaves the rows written so far and keeps the draft in the session. A
    /// retry first removes those rows so the menu ends with one row per entry.
    pub async fn finalize(&self, session: SessionId) -> Result<FinalizedMenu, DraftError> {
        let draft = self.require_draft(session).await?;
        let submitted_at = Utc::now();

        let stale = self.store.clear_menu_meals(draft.menu_id).await?;
        if stale > 0 {
            tracing::warn!(
                "Removed {} meal rows from an earlier attempt on menu {}",
                stale,
                draft.menu_id
            );
        }

        for entry in &draft.entries {
            self.store.insert_menu_meal(entry, submitted_at).await?;
        }
        self.store.submit_menu(draft.menu_id, submitted_at).await?;
        self.drafts.clear(session).await?;

        metrics::MENUS_FINALIZED.inc();
        metrics::MENU_MEALS_PERSISTED.inc_by(draft.entries.len() as u64);
        tracing::info!(
            "Finalized menu {} with {} meals",
            draft.menu_id,
            draft.entries.len()
        );
        Ok(FinalizedMenu {
            menu_id: draft.menu_id,
            persisted: draft.entries.len(),
            submitted_at,
        })
    }

    /// Drop the session draft along with its unsubmitted menu row, so the day
    /// can be planned again.
    pub async fn discard(&self, session: SessionId) -> Result<(), DraftError> {
        if let Some(draft) = self.drafts.load(session).await? {
            if self.store.delete_unsubmitted_menu(draft.menu_id).await? {
                tracing::info!("Discarded draft menu {}", draft.menu_id);
            }
        }
        self.drafts.clear(session).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        meals: Vec<Meal>,
        recipes: Vec<RecipeSummary>,
        menus: Mutex<Vec<Menu>>,
        menu_meals: Mutex<Vec<(DraftMeal, DateTime<Utc>)>>,
        /// Fail the insert made when this many rows exist, once.
        fail_insert_after: Mutex<Option<usize>>,
    }

    impl MemoryStore {
        fn seeded() -> Self {
            let meal = |id, name: &str, h, m| Meal {
                id,
                name: name.to_string(),
                default_time: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            };
            let recipe = |id, name: &str, meal_id| RecipeSummary {
                id,
                name: name.to_string(),
                meal_id,
            };
            Self {
                meals: vec![
                    meal(1, "Breakfast", 7, 0),
                    meal(3, "Lunch", 12, 30),
                    meal(5, "Dinner", 19, 0),
                    meal(6, "Evening Snack", 21, 0),
                ],
                recipes: vec![
                    recipe(10, "Porridge", 1),
                    recipe(11, "Pancakes", 1),
                    recipe(12, "Omelette", 1),
                    recipe(20, "Caesar Salad", 3),
                    recipe(21, "Lentil Soup", 3),
                    recipe(30, "Risotto", 5),
                ],
                ..Default::default()
            }
        }
    }

    impl MealPlanStore for MemoryStore {
        async fn menu_for_day(&self, user_id: i64, day: NaiveDate) -> anyhow::Result<Option<Menu>> {
            Ok(self
                .menus
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.user_id == user_id && m.menu_date == day)
                .cloned())
        }

        async fn create_menu(&self, user_id: i64, day: NaiveDate) -> anyhow::Result<Option<Menu>> {
            let mut menus = self.menus.lock().unwrap();
            if menus.iter().any(|m| m.user_id == user_id && m.menu_date == day) {
                return Ok(None);
            }
            let menu = Menu {
                id: menus.len() as i64 + 100,
                user_id,
                menu_date: day,
                created_at: Utc::now(),
                submitted_at: None,
            };
            menus.push(menu.clone());
            Ok(Some(menu))
        }

        async fn meal_by_name(&self, name: &str) -> anyhow::Result<Option<Meal>> {
            Ok(self.meals.iter().find(|m| m.name == name).cloned())
        }

        async fn recipes_for_meal(&self, meal_id: i64) -> anyhow::Result<Vec<RecipeSummary>> {
            Ok(self
                .recipes
                .iter()
                .filter(|r| r.meal_id == meal_id)
                .cloned()
                .collect())
        }

        async fn recipe_summary(&self, recipe_id: i64) -> anyhow::Result<Option<RecipeSummary>> {
            Ok(self.recipes.iter().find(|r| r.id == recipe_id).cloned())
        }

        async fn insert_menu_meal(
            &self,
            entry: &DraftMeal,
            submitted_at: DateTime<Utc>,
        ) -> anyhow::Result<i64> {
            let mut rows = self.menu_meals.lock().unwrap();
            let mut fail = self.fail_insert_after.lock().unwrap();
            if *fail == Some(rows.len()) {
                *fail = None;
                anyhow::bail!("connection reset");
            }
            rows.push((entry.clone(), submitted_at));
            Ok(rows.len() as i64)
        }

        async fn submit_menu(&self, menu_id: i64, submitted_at: DateTime<Utc>) -> anyhow::Result<()> {
            let mut menus = self.menus.lock().unwrap();
            let menu = menus
                .iter_mut()
                .find(|m| m.id == menu_id)
                .ok_or_else(|| anyhow::anyhow!("menu {menu_id} missing"))?;
            menu.submitted_at = Some(submitted_at);
            Ok(())
        }

        async fn clear_menu_meals(&self, menu_id: i64) -> anyhow::Result<u64> {
            let submitted = self
                .menus
                .lock()
                .unwrap()
                .iter()
                .any(|m| m.id == menu_id && m.is_submitted());
            if submitted {
                return Ok(0);
            }
            let mut rows = self.menu_meals.lock().unwrap();
            let before = rows.len();
            rows.retain(|(entry, _)| entry.menu_id != menu_id);
            Ok((before - rows.len()) as u64)
        }

        async fn delete_unsubmitted_menu(&self, menu_id: i64) -> anyhow::Result<bool> {
            let mut menus = self.menus.lock().unwrap();
            let before = menus.len();
            menus.retain(|m| m.id != menu_id || m.is_submitted());
            let deleted = menus.len() < before;
            if deleted {
                self.menu_meals
                    .lock()
                    .unwrap()
                    .retain(|(entry, _)| entry.menu_id != menu_id);
            }
            Ok(deleted)
        }
    }

    /// Looks like no menu exists yet but loses the insert, as when another
    /// request creates the day's menu in between.
    struct RacedStore(MemoryStore);

    impl MealPlanStore for RacedStore {
        async fn menu_for_day(&self, _user_id: i64, _day: NaiveDate) -> anyhow::Result<Option<Menu>> {
            Ok(None)
        }

        async fn create_menu(&self, _user_id: i64, _day: NaiveDate) -> anyhow::Result<Option<Menu>> {
            Ok(None)
        }

        async fn meal_by_name(&self, name: &str) -> anyhow::Result<Option<Meal>> {
            self.0.meal_by_name(name).await
        }

        async fn recipes_for_meal(&self, meal_id: i64) -> anyhow::Result<Vec<RecipeSummary>> {
            self.0.recipes_for_meal(meal_id).await
        }

        async fn recipe_summary(&self, recipe_id: i64) -> anyhow::Result<Option<RecipeSummary>> {
            self.0.recipe_summary(recipe_id).await
        }

        async fn insert_menu_meal(
            &self,
            entry: &DraftMeal,
            submitted_at: DateTime<Utc>,
        ) -> anyhow::Result<i64> {
            self.0.insert_menu_meal(entry, submitted_at).await
        }

        async fn submit_menu(&self, menu_id: i64, submitted_at: DateTime<Utc>) -> anyhow::Result<()> {
            self.0.submit_menu(menu_id, submitted_at).await
        }

        async fn clear_menu_meals(&self, menu_id: i64) -> anyhow::Result<u64> {
            self.0.clear_menu_meals(menu_id).await
        }

        async fn delete_unsubmitted_menu(&self, menu_id: i64) -> anyhow::Result<bool> {
            self.0.delete_unsubmitted_menu(menu_id).await
        }
    }

    #[derive(Default)]
    struct MemoryDrafts {
        drafts: Mutex<HashMap<SessionId, Draft>>,
    }

    impl DraftStore for MemoryDrafts {
        async fn load(&self, session: SessionId) -> anyhow::Result<Option<Draft>> {
            Ok(self.drafts.lock().unwrap().get(&session).cloned())
        }

        async fn save(&self, session: SessionId, draft: &Draft) -> anyhow::Result<()> {
            self.drafts.lock().unwrap().insert(session, draft.clone());
            Ok(())
        }

        async fn clear(&self, session: SessionId) -> anyhow::Result<()> {
            self.drafts.lock().unwrap().remove(&session);
            Ok(())
        }
    }

    /// Session storage that is down for writes.
    struct UnwritableDrafts;

    impl DraftStore for UnwritableDrafts {
        async fn load(&self, _session: SessionId) -> anyhow::Result<Option<Draft>> {
            Ok(None)
        }

        async fn save(&self, _session: SessionId, _draft: &Draft) -> anyhow::Result<()> {
            anyhow::bail!("redis unavailable")
        }

        async fn clear(&self, _session: SessionId) -> anyhow::Result<()> {
            Ok(())
        }
    }

    const USER: i64 = 1;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 14).unwrap()
    }

    fn names(slots: &[&str]) -> Vec<String> {
        slots.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn initialize_drafts_one_entry_per_slot_from_that_slot() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();

        let draft = manager
            .initialize(session, USER, today(), &names(&["Breakfast", "Lunch", "Dinner"]))
            .await
            .unwrap();

        assert_eq!(draft.entries.len(), 3);
        let slots: Vec<&str> = draft.entries.iter().map(|e| e.meal_name.as_str()).collect();
        assert_eq!(slots, vec!["Breakfast", "Lunch", "Dinner"]);
        for entry in &draft.entries {
            let recipe = store.recipes.iter().find(|r| r.id == entry.recipe_id).unwrap();
            assert_eq!(recipe.meal_id, entry.meal_id);
            assert_eq!(entry.menu_id, draft.menu_id);
            assert_eq!(entry.regenerated_times, 0);
            assert!(!entry.picked_manually);
            assert!(!entry.leftover);
        }
        assert_eq!(draft.entries[1].meal_time, NaiveTime::from_hms_opt(12, 30, 0).unwrap());
        assert_eq!(store.menus.lock().unwrap().len(), 1);
        assert_eq!(manager.current(session).await.unwrap(), Some(draft));
        assert!(store.menu_meals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn initialize_twice_on_same_day_is_rejected() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);

        manager
            .initialize(SessionId::new(), USER, today(), &names(&["Breakfast"]))
            .await
            .unwrap();
        let err = manager
            .initialize(SessionId::new(), USER, today(), &names(&["Lunch"]))
            .await
            .unwrap_err();

        assert!(matches!(err, DraftError::MenuAlreadyExists));
        assert_eq!(err.to_string(), "A menu for today already exists");
        assert_eq!(store.menus.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn initialize_on_another_day_is_allowed() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);

        manager
            .initialize(SessionId::new(), USER, today(), &names(&["Breakfast"]))
            .await
            .unwrap();
        manager
            .initialize(SessionId::new(), USER, today().succ_opt().unwrap(), &names(&["Breakfast"]))
            .await
            .unwrap();

        assert_eq!(store.menus.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn initialize_rejects_empty_and_unusable_selections_without_writing() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);

        let err = manager.initialize(SessionId::new(), USER, today(), &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Please select at least one meal");

        let err = manager
            .initialize(SessionId::new(), USER, today(), &names(&["Brunch"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::UnknownMeal(ref n) if n == "Brunch"));

        let err = manager
            .initialize(SessionId::new(), USER, today(), &names(&["Breakfast", "Evening Snack"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::NoRecipesForMeal(_)));
        assert!(err.is_user_facing());

        assert!(store.menus.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn regenerate_changes_only_the_target_position() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();
        let before = manager
            .initialize(session, USER, today(), &names(&["Breakfast", "Lunch", "Dinner"]))
            .await
            .unwrap();

        let updated = manager.regenerate(session, 0).await.unwrap();

        assert_ne!(updated.recipe_id, before.entries[0].recipe_id);
        assert_eq!(updated.meal_id, before.entries[0].meal_id);
        assert_eq!(updated.regenerated_times, 1);
        let after = manager.current(session).await.unwrap().unwrap();
        assert_eq!(after.entries[0], updated);
        assert_eq!(after.entries[1..], before.entries[1..]);

        let again = manager.regenerate(session, 0).await.unwrap();
        assert_eq!(again.regenerated_times, 2);
        assert_ne!(again.recipe_id, updated.recipe_id);
    }

    #[tokio::test]
    async fn regenerate_with_single_candidate_keeps_recipe_and_counts() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();
        manager
            .initialize(session, USER, today(), &names(&["Dinner"]))
            .await
            .unwrap();

        let updated = manager.regenerate(session, 0).await.unwrap();
        assert_eq!(updated.recipe_id, 30);
        assert_eq!(updated.regenerated_times, 1);
    }

    #[tokio::test]
    async fn mutations_without_draft_or_bad_position_fail() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();

        assert!(matches!(manager.regenerate(session, 0).await, Err(DraftError::NoDraft)));
        assert!(matches!(manager.finalize(session).await, Err(DraftError::NoDraft)));

        manager
            .initialize(session, USER, today(), &names(&["Breakfast"]))
            .await
            .unwrap();
        assert!(matches!(
            manager.regenerate(session, 4).await,
            Err(DraftError::PositionOutOfRange(4))
        ));
        assert!(matches!(
            manager.select_manual(session, 1, 20).await,
            Err(DraftError::PositionOutOfRange(1))
        ));
    }

    #[tokio::test]
    async fn select_manual_sets_flag_and_keeps_counter() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();
        manager
            .initialize(session, USER, today(), &names(&["Breakfast", "Lunch"]))
            .await
            .unwrap();
        manager.regenerate(session, 1).await.unwrap();

        let updated = manager.select_manual(session, 1, 21).await.unwrap();

        assert_eq!(updated.recipe_id, 21);
        assert_eq!(updated.recipe_name, "Lentil Soup");
        assert!(updated.picked_manually);
        assert_eq!(updated.regenerated_times, 1);

        let err = manager.select_manual(session, 0, 999).await.unwrap_err();
        assert!(matches!(err, DraftError::RecipeNotFound(999)));
    }

    #[tokio::test]
    async fn time_and_leftover_edits_persist_in_draft() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();
        manager
            .initialize(session, USER, today(), &names(&["Lunch"]))
            .await
            .unwrap();

        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        manager.set_time(session, 0, noon).await.unwrap();
        manager.toggle_leftover(session, 0).await.unwrap();

        let entry = &manager.current(session).await.unwrap().unwrap().entries[0];
        assert_eq!(entry.meal_time, noon);
        assert!(entry.leftover);
        assert_eq!(entry.regenerated_times, 0);
    }

    #[tokio::test]
    async fn finalize_persists_one_row_per_entry_and_clears_draft() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();
        let draft = manager
            .initialize(session, USER, today(), &names(&["Breakfast", "Lunch", "Dinner"]))
            .await
            .unwrap();

        let done = manager.finalize(session).await.unwrap();

        assert_eq!(done.menu_id, draft.menu_id);
        assert_eq!(done.persisted, 3);
        let rows = store.menu_meals.lock().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|(_, at)| *at == done.submitted_at));
        let persisted: Vec<DraftMeal> = rows.iter().map(|(e, _)| e.clone()).collect();
        assert_eq!(persisted, draft.entries);
        drop(rows);

        let menu = store.menu_for_day(USER, today()).await.unwrap().unwrap();
        assert!(menu.is_submitted());
        assert_eq!(manager.current(session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_finalize_keeps_draft_and_leaves_menu_unsubmitted() {
        let store = MemoryStore {
            fail_insert_after: Mutex::new(Some(1)),
            ..MemoryStore::seeded()
        };
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();
        manager
            .initialize(session, USER, today(), &names(&["Breakfast", "Lunch"]))
            .await
            .unwrap();

        let err = manager.finalize(session).await.unwrap_err();

        assert!(matches!(err, DraftError::Store(_)));
        assert_eq!(store.menu_meals.lock().unwrap().len(), 1);
        let menu = store.menu_for_day(USER, today()).await.unwrap().unwrap();
        assert!(!menu.is_submitted());
        assert!(manager.current(session).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn finalize_retry_after_failure_writes_each_entry_once() {
        let store = MemoryStore {
            fail_insert_after: Mutex::new(Some(1)),
            ..MemoryStore::seeded()
        };
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();
        let draft = manager
            .initialize(session, USER, today(), &names(&["Breakfast", "Lunch"]))
            .await
            .unwrap();

        assert!(manager.finalize(session).await.is_err());
        let done = manager.finalize(session).await.unwrap();

        assert_eq!(done.persisted, 2);
        let persisted: Vec<DraftMeal> = store
            .menu_meals
            .lock()
            .unwrap()
            .iter()
            .map(|(e, _)| e.clone())
            .collect();
        assert_eq!(persisted, draft.entries);
        let menu = store.menu_for_day(USER, today()).await.unwrap().unwrap();
        assert!(menu.is_submitted());
    }

    #[tokio::test]
    async fn discard_drops_draft_and_frees_the_day() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();
        manager
            .initialize(session, USER, today(), &names(&["Breakfast"]))
            .await
            .unwrap();

        manager.discard(session).await.unwrap();

        assert_eq!(manager.current(session).await.unwrap(), None);
        assert!(store.menus.lock().unwrap().is_empty());

        let again = manager
            .initialize(session, USER, today(), &names(&["Lunch"]))
            .await
            .unwrap();
        assert_eq!(again.entries[0].meal_name, "Lunch");
    }

    #[tokio::test]
    async fn discard_without_draft_is_a_no_op() {
        let store = MemoryStore::seeded();
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);

        manager.discard(SessionId::new()).await.unwrap();
        assert!(store.menus.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn initialize_losing_the_insert_race_reports_existing_menu() {
        let store = RacedStore(MemoryStore::seeded());
        let drafts = MemoryDrafts::default();
        let manager = DraftManager::new(&store, &drafts);
        let session = SessionId::new();

        let err = manager
            .initialize(session, USER, today(), &names(&["Breakfast"]))
            .await
            .unwrap_err();

        assert!(matches!(err, DraftError::MenuAlreadyExists));
        assert_eq!(manager.current(session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn initialize_removes_menu_when_draft_cannot_be_saved() {
        let store = MemoryStore::seeded();
        let drafts = UnwritableDrafts;
        let manager = DraftManager::new(&store, &drafts);

        let err = manager
            .initialize(SessionId::new(), USER, today(), &names(&["Breakfast"]))
            .await
            .unwrap_err();

        assert!(matches!(err, DraftError::Store(_)));
        assert!(store.menus.lock().unwrap().is_empty());
    }

    #[test]
    fn pick_recipe_avoids_excluded_when_possible() {
        let pool = vec![
            RecipeSummary { id: 1, name: "A".into(), meal_id: 1 },
            RecipeSummary { id: 2, name: "B".into(), meal_id: 1 },
        ];
        for _ in 0..20 {
            assert_eq!(pick_recipe(&pool, Some(1)).map(|r| r.id), Some(2));
        }
        assert_eq!(pick_recipe(&pool[..1], Some(1)).map(|r| r.id), Some(1));
        assert!(pick_recipe(&[], None).is_none());
    }
}
