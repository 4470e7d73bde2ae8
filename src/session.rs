//! The `Session` owns the ledger, the templates and the save tasks, and exposes everything a user
//! can do: move between months, edit rows and manage templates.

use crate::ledger::Ledger;
use crate::model::{
    Category, DebtTemplate, Field, FixedExpenseTemplate, MonthRecord, Theme, YearMonth,
    EMPTY_RECORD,
};
use crate::persist::{Persistence, SaveFailure};
use crate::store::{Dataset, Store};
use crate::summary::{efficiency_trend, summarize, Summary, TrendPoint};
use crate::templates::{
    apply_template_to_month, available_templates, materialize, AvailableTemplate, Materialized,
    TemplateKind, TemplateRegistry,
};
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The outcome of a request to change months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    /// The month is now the current month.
    Loaded(YearMonth),
    /// Another navigation was in progress, so this one did nothing.
    Ignored,
}

/// An editing session over the persisted budget.
///
/// Opening a session loads every dataset from the `Store` and then loads the current month. Edits
/// are applied in memory and saved in the background after a quiet period. Changing months saves
/// everything that is pending first.
pub struct Session {
    persistence: Persistence,
    ledger: Ledger,
    registry: TemplateRegistry,
    theme: Theme,
    current: YearMonth,
    today: YearMonth,
    navigation: NavigationGate,
}

impl Session {
    /// Loads the datasets from `store` and opens the month `today`. Templates are only
    /// materialized into `today` and later months.
    pub async fn open(store: Arc<dyn Store>, debounce: Duration, today: YearMonth) -> Result<Self> {
        let ledger = Ledger::from_json(load(store.as_ref(), Dataset::Ledger).await?);
        let (registry, healed) = TemplateRegistry::from_json(
            load(store.as_ref(), Dataset::FixedTemplates).await?,
            load(store.as_ref(), Dataset::DebtTemplates).await?,
            today,
        );
        let theme = Theme::from_json(&load(store.as_ref(), Dataset::Theme).await?);

        let mut session = Self {
            persistence: Persistence::new(store, debounce),
            ledger,
            registry,
            theme,
            current: today,
            today,
            navigation: NavigationGate::default(),
        };
        if healed {
            info!("Some templates had to be repaired, saving them again");
            session.save_templates();
        }
        session.load_month(today).await?;
        Ok(session)
    }

    /// The month being viewed and edited.
    pub fn current(&self) -> YearMonth {
        self.current
    }

    /// The month the session considers to be now.
    pub fn today(&self) -> YearMonth {
        self.today
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// The record of the current month.
    pub fn record(&self) -> &MonthRecord {
        self.ledger.get(self.current).unwrap_or(&EMPTY_RECORD)
    }

    /// Makes `ym` the current month: saves anything pending, recomputes its carried balance and
    /// materializes templates into it. Ignored if another navigation is in progress.
    pub async fn load_month(&mut self, ym: YearMonth) -> Result<Navigation> {
        let Some(_guard) = self.navigation.try_enter() else {
            debug!("Ignoring navigation to {ym}, another navigation is in progress");
            return Ok(Navigation::Ignored);
        };

        if let Err(e) = self.persistence.flush_all().await {
            warn!("Not everything could be saved before moving to {ym}: {e:#}");
        }

        self.current = ym;
        let carried = self.ledger.carry_into(ym);
        let materialized = self.materialize_current();
        debug!("Loaded {ym} with a carried balance of {carried} ({materialized:?})");
        self.save_ledger();
        Ok(Navigation::Loaded(ym))
    }

    /// Same as `load_month`.
    pub async fn go_to(&mut self, ym: YearMonth) -> Result<Navigation> {
        self.load_month(ym).await
    }

    /// Moves `delta` months forward (or backward when negative) from the current month.
    pub async fn navigate(&mut self, delta: i32) -> Result<Navigation> {
        self.load_month(self.current.offset(delta)).await
    }

    /// Adds a blank row to `category` of the current month, or finds the blank row that is
    /// already there. Returns its index.
    pub fn add_row(&mut self, category: Category) -> usize {
        let index = self.ledger.month_mut(self.current).add_row(category);
        self.save_ledger();
        index
    }

    /// Sets one field of one row of the current month from user input.
    pub fn set_field(
        &mut self,
        category: Category,
        index: usize,
        field: Field,
        value: &str,
    ) -> Result<()> {
        self.ledger
            .month_mut(self.current)
            .set_field(category, index, field, value)?;
        self.save_ledger();
        Ok(())
    }

    /// Deletes rows of the current month. Returns the number deleted.
    pub fn delete_rows(&mut self, category: Category, indices: &[usize]) -> usize {
        let removed = self
            .ledger
            .month_mut(self.current)
            .delete_rows(category, indices);
        if removed > 0 {
            self.save_ledger();
        }
        removed
    }

    /// Deletes every row of `category` in the current month. Returns the number deleted.
    pub fn clear(&mut self, category: Category) -> usize {
        let removed = self.ledger.month_mut(self.current).clear(category);
        if removed > 0 {
            self.save_ledger();
        }
        removed
    }

    /// Adds the row of one template to the current month on request, even in the past. Returns
    /// false when there was nothing to add.
    pub fn apply_template(&mut self, kind: TemplateKind, index: usize) -> Result<bool> {
        let record = self.ledger.month_mut(self.current);
        let added = apply_template_to_month(record, self.current, &self.registry, kind, index)?;
        if added {
            self.save_ledger();
        }
        Ok(added)
    }

    /// The templates that could still be added to the current month.
    pub fn available_templates(&self) -> Vec<AvailableTemplate> {
        available_templates(self.record(), self.current, &self.registry)
    }

    pub fn add_fixed_template(&mut self, template: FixedExpenseTemplate) -> Result<usize> {
        let index = self.registry.add_fixed(template)?;
        self.after_template_change();
        Ok(index)
    }

    pub fn add_debt_template(&mut self, template: DebtTemplate) -> Result<usize> {
        let index = self.registry.add_debt(template)?;
        self.after_template_change();
        Ok(index)
    }

    /// Replaces a fixed expense template. Rows of the old version are removed from every month
    /// and the current month picks up the new version. Returns the old template.
    pub fn update_fixed_template(
        &mut self,
        index: usize,
        template: FixedExpenseTemplate,
    ) -> Result<FixedExpenseTemplate> {
        let old = self
            .registry
            .update_fixed(index, template, &mut self.ledger)?;
        self.after_template_change();
        Ok(old)
    }

    /// Replaces a debt template. Rows of the old version are removed from every month and the
    /// current month picks up the new version. Returns the old template.
    pub fn update_debt_template(
        &mut self,
        index: usize,
        template: DebtTemplate,
    ) -> Result<DebtTemplate> {
        let old = self.registry.update_debt(index, template, &mut self.ledger)?;
        self.after_template_change();
        Ok(old)
    }

    pub fn remove_fixed_template(&mut self, index: usize) -> Result<FixedExpenseTemplate> {
        let old = self.registry.remove_fixed(index, &mut self.ledger)?;
        self.after_template_change();
        Ok(old)
    }

    pub fn remove_debt_template(&mut self, index: usize) -> Result<DebtTemplate> {
        let old = self.registry.remove_debt(index, &mut self.ledger)?;
        self.after_template_change();
        Ok(old)
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        match serde_json::to_value(theme).context("Unable to serialize the theme") {
            Ok(value) => self.persistence.schedule(Dataset::Theme, value),
            Err(e) => error!("{e:#}"),
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let theme = self.theme.toggled();
        self.set_theme(theme);
        theme
    }

    /// The summary of the current month.
    pub fn summary(&self) -> Summary {
        summarize(self.record())
    }

    /// The efficiency of the `months` months ending with the current month.
    pub fn trend(&self, months: u16) -> Vec<TrendPoint> {
        efficiency_trend(&self.ledger, self.current, months)
    }

    /// Save failures reported since the last call.
    pub fn failures(&mut self) -> Vec<SaveFailure> {
        self.persistence.failures()
    }

    /// Saves everything that is pending now.
    pub async fn flush(&self) -> Result<()> {
        self.persistence.flush_all().await
    }

    /// Saves everything that is pending and stops the save tasks.
    pub async fn close(self) -> Result<()> {
        self.persistence.shutdown().await
    }

    fn materialize_current(&mut self) -> Materialized {
        let record = self.ledger.month_mut(self.current);
        materialize(record, self.current, &self.registry, self.today)
    }

    fn after_template_change(&mut self) {
        self.materialize_current();
        self.save_templates();
        self.save_ledger();
    }

    fn save_ledger(&self) {
        match self.ledger.to_json() {
            Ok(value) => self.persistence.schedule(Dataset::Ledger, value),
            Err(e) => error!("{e:#}"),
        }
    }

    fn save_templates(&self) {
        match self.registry.fixed_to_json() {
            Ok(value) => self.persistence.schedule(Dataset::FixedTemplates, value),
            Err(e) => error!("{e:#}"),
        }
        match self.registry.debt_to_json() {
            Ok(value) => self.persistence.schedule(Dataset::DebtTemplates, value),
            Err(e) => error!("{e:#}"),
        }
    }
}

async fn load(store: &dyn Store, dataset: Dataset) -> Result<serde_json::Value> {
    Ok(store
        .load(dataset.key())
        .await
        .with_context(|| format!("Unable to load '{}'", dataset.key()))?
        .unwrap_or_default())
}

/// Allows one navigation at a time. The guard releases the gate when dropped, including when a
/// navigation future is dropped before it finishes.
#[derive(Debug, Clone, Default)]
struct NavigationGate(Arc<AtomicBool>);

impl NavigationGate {
    fn try_enter(&self) -> Option<NavigationGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| NavigationGuard(self.0.clone()))
    }
}

struct NavigationGuard(Arc<AtomicBool>);

impl Drop for NavigationGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Origin};
    use crate::store::MemoryStore;
    use serde_json::json;

    const QUIET: Duration = Duration::from_millis(500);

    fn ym(year: i32, month: u8) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn today() -> YearMonth {
        ym(2024, 4)
    }

    async fn open(store: &Arc<MemoryStore>) -> Session {
        Session::open(store.clone(), QUIET, today()).await.unwrap()
    }

    fn fixed_names(session: &Session, month: YearMonth) -> Vec<(String, f64)> {
        session
            .ledger()
            .get(month)
            .map(|r| {
                r.fixed_expenses
                    .iter()
                    .map(|e| (e.name.clone(), e.planned.value()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_empty_store() {
        let store = Arc::new(MemoryStore::new());
        let session = open(&store).await;
        assert_eq!(session.current(), today());
        assert!(session.ledger().contains(ym(2024, 0)));
        assert!(session.record().is_empty());
        assert_eq!(session.theme(), Theme::Light);
        session.close().await.unwrap();
        assert!(store.get("budget-data").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_edits_are_saved_before_navigation() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        session.flush().await.unwrap();
        let saves_before = store.save_count("budget-data");

        let start = tokio::time::Instant::now();
        session
            .set_field(Category::Income, 0, Field::Name, "Salary")
            .unwrap();
        session
            .set_field(Category::Income, 0, Field::Amount, "1000")
            .unwrap();
        let nav = session.navigate(1).await.unwrap();
        assert_eq!(nav, Navigation::Loaded(ym(2024, 5)));
        assert!(start.elapsed() < QUIET);

        assert_eq!(store.save_count("budget-data"), saves_before + 1);
        let saved = store.get("budget-data").unwrap();
        assert_eq!(saved["2024"]["4"]["income"][0]["name"], json!("Salary"));
        assert_eq!(session.record().carried_balance().value(), 1000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_while_navigating_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        let held = session.navigation.try_enter().unwrap();
        assert_eq!(session.navigate(1).await.unwrap(), Navigation::Ignored);
        assert_eq!(session.current(), today());
        drop(held);
        assert_eq!(
            session.navigate(1).await.unwrap(),
            Navigation::Loaded(ym(2024, 5))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_navigation_releases_the_gate() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        store.set_latency(Duration::from_secs(10));
        session.add_row(Category::Debt);
        let timed_out =
            tokio::time::timeout(Duration::from_secs(1), session.navigate(1)).await;
        assert!(timed_out.is_err());
        assert_eq!(session.current(), today());

        store.set_latency(Duration::ZERO);
        assert_eq!(
            session.navigate(1).await.unwrap(),
            Navigation::Loaded(ym(2024, 5))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_templates_materialize_once() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        session
            .add_fixed_template(FixedExpenseTemplate::new("Rent", 1200.0))
            .unwrap();
        session
            .add_debt_template(DebtTemplate::new("Car", 300.0, 2, today()))
            .unwrap();
        assert_eq!(session.record().fixed_expenses.len(), 1);
        assert_eq!(session.record().debt.len(), 1);

        session.navigate(1).await.unwrap();
        session.navigate(-1).await.unwrap();
        session.navigate(0).await.unwrap();
        assert_eq!(session.record().fixed_expenses.len(), 1);
        assert_eq!(session.record().debt.len(), 1);

        // the car loan runs for May and June only
        session.go_to(ym(2024, 6)).await.unwrap();
        assert!(session.record().debt.is_empty());
        assert_eq!(session.record().fixed_expenses.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_months_are_not_materialized() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        session
            .add_fixed_template(FixedExpenseTemplate::new("Rent", 1200.0))
            .unwrap();
        session.go_to(ym(2024, 2)).await.unwrap();
        assert!(session.record().is_empty());
        assert_eq!(session.available_templates().len(), 1);
        assert!(session.apply_template(TemplateKind::Fixed, 0).unwrap());
        assert!(session.available_templates().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_template_update_retracts_and_reapplies() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        session
            .add_fixed_template(FixedExpenseTemplate::new("Rent", 500.0))
            .unwrap();
        session.navigate(1).await.unwrap();
        session.navigate(-1).await.unwrap();
        assert_eq!(fixed_names(&session, ym(2024, 5)), vec![("Rent".to_string(), 500.0)]);

        session
            .update_fixed_template(0, FixedExpenseTemplate::new("Rent", 700.0))
            .unwrap();
        assert_eq!(fixed_names(&session, ym(2024, 4)), vec![("Rent".to_string(), 700.0)]);
        assert!(fixed_names(&session, ym(2024, 5)).is_empty());

        session.navigate(1).await.unwrap();
        assert_eq!(fixed_names(&session, ym(2024, 5)), vec![("Rent".to_string(), 700.0)]);
        let rent = &session.record().fixed_expenses[0];
        assert_eq!(rent.origin, Origin::Template { template_id: Some(0) });
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_debt_template_leaves_no_rows() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        session
            .add_debt_template(DebtTemplate::new("Card", 40.0, 0, today()))
            .unwrap();
        session.navigate(1).await.unwrap();
        session.remove_debt_template(0).unwrap();
        for (_, record) in session.ledger().months() {
            assert!(record.debt.is_empty());
        }
        session.close().await.unwrap();
        assert_eq!(store.get("budget-debt-templates"), Some(json!([])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_template_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        session
            .add_fixed_template(FixedExpenseTemplate::new("Rent", 500.0))
            .unwrap();
        assert!(session
            .add_fixed_template(FixedExpenseTemplate::new("RENT", 600.0))
            .is_err());
        assert_eq!(session.registry().fixed().len(), 1);
        assert_eq!(session.record().fixed_expenses.len(), 1);
        assert_eq!(session.record().fixed_expenses[0].planned, Amount::new(500.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_reported_and_retried() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        session.flush().await.unwrap();

        store.set_failing(true);
        session
            .set_field(Category::Investment, 0, Field::Name, "Index fund")
            .unwrap();
        tokio::time::sleep(QUIET * 2).await;
        let failures = session.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key, "budget-data");
        assert_eq!(session.record().investment.len(), 1);

        store.set_failing(false);
        session
            .set_field(Category::Investment, 0, Field::Amount, "250")
            .unwrap();
        tokio::time::sleep(QUIET * 2).await;
        let saved = store.get("budget-data").unwrap();
        assert_eq!(
            saved["2024"]["4"]["investment"],
            json!([{"name": "Index fund", "amount": 250.0}])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_restores_everything() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        session
            .set_field(Category::OtherExpenses, 0, Field::Name, "Food")
            .unwrap();
        session
            .add_debt_template(DebtTemplate::new("Loan", 100.0, 12, ym(2024, 1)))
            .unwrap();
        assert_eq!(session.toggle_theme(), Theme::Dark);
        session.close().await.unwrap();

        let session = open(&store).await;
        assert_eq!(session.theme(), Theme::Dark);
        assert_eq!(session.record().names(Category::OtherExpenses), vec!["Food"]);
        assert_eq!(session.registry().debt()[0].start, ym(2024, 1));
        assert_eq!(session.record().debt.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_legacy_debt_templates_are_healed_and_saved() {
        let store = Arc::new(MemoryStore::with_data([(
            "budget-debt-templates",
            json!([{"name": "Phone", "amount": 45, "monthsRemaining": 2}]),
        )]));
        let session = open(&store).await;
        assert_eq!(session.registry().debt()[0].start, today());
        session.close().await.unwrap();
        let saved = store.get("budget-debt-templates").unwrap();
        assert_eq!(saved[0]["startMonth"], json!(4));
        assert_eq!(saved[0]["startYear"], json!(2024));
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_and_trend_follow_current_month() {
        let store = Arc::new(MemoryStore::new());
        let mut session = open(&store).await;
        session.set_field(Category::Income, 0, Field::Amount, "2000").unwrap();
        session
            .set_field(Category::OtherExpenses, 0, Field::Amount, "500")
            .unwrap();
        let summary = session.summary();
        assert_eq!(summary.remaining, 1500.0);
        assert_eq!(summary.efficiency_pct, 75.0);

        let trend = session.trend(6);
        assert_eq!(trend.len(), 6);
        assert_eq!(trend[5].month, today());
        assert_eq!(trend[5].efficiency_pct, 75.0);
    }
}
