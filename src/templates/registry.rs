use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::model::{same_name, DebtTemplate, FixedExpenseTemplate, WireDebtTemplate, YearMonth};
use crate::templates::materialize::{retract_debt, retract_fixed};
use crate::Result;
use anyhow::Context;
use tracing::{debug, warn};

const FIXED: &str = "fixed expense";
const DEBT: &str = "debt";

/// The two ordered collections of templates. Names are unique within each collection, ignoring
/// case and surrounding whitespace.
///
/// Editing or removing a template first retracts the rows the old version produced from every
/// month of the ledger, which is why those operations borrow the `Ledger`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateRegistry {
    fixed: Vec<FixedExpenseTemplate>,
    debt: Vec<DebtTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from the persisted template datasets. Debt templates persisted without a
    /// start month get `default_start`. Unreadable, invalid or duplicate templates are dropped
    /// with a warning. The returned flag is true when anything had to be healed, meaning the
    /// datasets should be saved again.
    pub fn from_json(
        fixed: serde_json::Value,
        debt: serde_json::Value,
        default_start: YearMonth,
    ) -> (Self, bool) {
        let mut registry = Self::new();
        let mut healed = false;

        for value in json_items(fixed, FIXED) {
            let template = match serde_json::from_value::<FixedExpenseTemplate>(value) {
                Ok(t) => FixedExpenseTemplate::new(t.name, t.planned),
                Err(e) => {
                    warn!("Dropping unreadable {FIXED} template: {e}");
                    healed = true;
                    continue;
                }
            };
            if let Err(e) = registry.add_fixed(template) {
                warn!("Dropping persisted {FIXED} template: {e}");
                healed = true;
            }
        }

        for value in json_items(debt, DEBT) {
            let wire = match serde_json::from_value::<WireDebtTemplate>(value) {
                Ok(wire) => wire,
                Err(e) => {
                    warn!("Dropping unreadable {DEBT} template: {e}");
                    healed = true;
                    continue;
                }
            };
            if !wire.has_start() {
                debug!("A {DEBT} template has no start month, starting it in {default_start}");
                healed = true;
            }
            if let Err(e) = registry.add_debt(wire.heal(default_start)) {
                warn!("Dropping persisted {DEBT} template: {e}");
                healed = true;
            }
        }

        (registry, healed)
    }

    pub fn fixed_to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.fixed).context("Unable to serialize the fixed expense templates")
    }

    pub fn debt_to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.debt).context("Unable to serialize the debt templates")
    }

    pub fn fixed(&self) -> &[FixedExpenseTemplate] {
        &self.fixed
    }

    pub fn debt(&self) -> &[DebtTemplate] {
        &self.debt
    }

    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty() && self.debt.is_empty()
    }

    /// Finds a fixed expense template by name, ignoring case.
    pub fn find_fixed(&self, name: &str) -> Option<(usize, &FixedExpenseTemplate)> {
        self.fixed
            .iter()
            .enumerate()
            .find(|(_, t)| same_name(&t.name, name))
    }

    /// Finds a debt template by name, ignoring case.
    pub fn find_debt(&self, name: &str) -> Option<(usize, &DebtTemplate)> {
        self.debt
            .iter()
            .enumerate()
            .find(|(_, t)| same_name(&t.name, name))
    }

    /// Adds a fixed expense template and returns its index. Rejected without any change if the
    /// template is invalid or its name is taken.
    pub fn add_fixed(&mut self, template: FixedExpenseTemplate) -> Result<usize> {
        template.validate()?;
        if self.find_fixed(&template.name).is_some() {
            return Err(duplicate(FIXED, &template.name));
        }
        self.fixed.push(template);
        Ok(self.fixed.len() - 1)
    }

    /// Adds a debt template and returns its index. Rejected without any change if the template
    /// is invalid or its name is taken.
    pub fn add_debt(&mut self, template: DebtTemplate) -> Result<usize> {
        template.validate()?;
        if self.find_debt(&template.name).is_some() {
            return Err(duplicate(DEBT, &template.name));
        }
        self.debt.push(template);
        Ok(self.debt.len() - 1)
    }

    /// Replaces the fixed expense template at `index`, retracting the rows the old version
    /// produced across the whole ledger. Returns the old template.
    pub fn update_fixed(
        &mut self,
        index: usize,
        template: FixedExpenseTemplate,
        ledger: &mut Ledger,
    ) -> Result<FixedExpenseTemplate> {
        check_index(FIXED, index, self.fixed.len())?;
        template.validate()?;
        if let Some((other, _)) = self.find_fixed(&template.name) {
            if other != index {
                return Err(duplicate(FIXED, &template.name));
            }
        }
        let removed = retract_fixed(ledger, &self.fixed[index]);
        debug!(
            "Retracted {removed} rows of {FIXED} template '{}'",
            self.fixed[index].name
        );
        Ok(std::mem::replace(&mut self.fixed[index], template))
    }

    /// Replaces the debt template at `index`, retracting the rows the old version produced across
    /// the whole ledger. Returns the old template.
    pub fn update_debt(
        &mut self,
        index: usize,
        template: DebtTemplate,
        ledger: &mut Ledger,
    ) -> Result<DebtTemplate> {
        check_index(DEBT, index, self.debt.len())?;
        template.validate()?;
        if let Some((other, _)) = self.find_debt(&template.name) {
            if other != index {
                return Err(duplicate(DEBT, &template.name));
            }
        }
        let removed = retract_debt(ledger, &self.debt[index]);
        debug!(
            "Retracted {removed} rows of {DEBT} template '{}'",
            self.debt[index].name
        );
        Ok(std::mem::replace(&mut self.debt[index], template))
    }

    /// Removes the fixed expense template at `index` and retracts its rows from every month.
    pub fn remove_fixed(&mut self, index: usize, ledger: &mut Ledger) -> Result<FixedExpenseTemplate> {
        check_index(FIXED, index, self.fixed.len())?;
        let removed = retract_fixed(ledger, &self.fixed[index]);
        debug!(
            "Retracted {removed} rows of {FIXED} template '{}'",
            self.fixed[index].name
        );
        Ok(self.fixed.remove(index))
    }

    /// Removes the debt template at `index` and retracts its rows from every month.
    pub fn remove_debt(&mut self, index: usize, ledger: &mut Ledger) -> Result<DebtTemplate> {
        check_index(DEBT, index, self.debt.len())?;
        let removed = retract_debt(ledger, &self.debt[index]);
        debug!(
            "Retracted {removed} rows of {DEBT} template '{}'",
            self.debt[index].name
        );
        Ok(self.debt.remove(index))
    }
}

fn json_items(value: serde_json::Value, kind: &str) -> Vec<serde_json::Value> {
    match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Null => Vec::new(),
        other => {
            warn!("The {kind} templates are not a list ({other}), ignoring them");
            Vec::new()
        }
    }
}

fn check_index(kind: &'static str, index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(LedgerError::TemplateIndex { kind, index, len }.into());
    }
    Ok(())
}

fn duplicate(kind: &'static str, name: &str) -> crate::Error {
    LedgerError::DuplicateTemplate {
        kind,
        name: name.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, DebtEntry, FixedExpense};
    use crate::templates::materialize;
    use serde_json::json;

    fn ym(year: i32, month: u8) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn ledger_error(e: &crate::Error) -> Option<&LedgerError> {
        e.downcast_ref::<LedgerError>()
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut registry = TemplateRegistry::new();
        registry.add_fixed(FixedExpenseTemplate::new("Rent", 1200.0)).unwrap();
        let err = registry
            .add_fixed(FixedExpenseTemplate::new("  rent ", 900.0))
            .unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::DuplicateTemplate { .. })
        ));
        assert_eq!(registry.fixed().len(), 1);
        assert_eq!(registry.fixed()[0].planned.value(), 1200.0);
    }

    #[test]
    fn test_update_rejects_name_of_another_template() {
        let mut registry = TemplateRegistry::new();
        let mut ledger = Ledger::new();
        let start = ym(2024, 0);
        registry.add_debt(DebtTemplate::new("Car", 300.0, 0, start)).unwrap();
        registry.add_debt(DebtTemplate::new("Phone", 40.0, 0, start)).unwrap();
        let err = registry
            .update_debt(1, DebtTemplate::new("CAR", 40.0, 0, start), &mut ledger)
            .unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::DuplicateTemplate { .. })
        ));

        // keeping its own name is fine
        registry
            .update_debt(1, DebtTemplate::new("phone", 45.0, 0, start), &mut ledger)
            .unwrap();
        assert_eq!(registry.debt()[1].amount.value(), 45.0);
    }

    #[test]
    fn test_bad_index() {
        let mut registry = TemplateRegistry::new();
        let mut ledger = Ledger::new();
        let err = registry.remove_fixed(0, &mut ledger).unwrap_err();
        assert_eq!(
            ledger_error(&err),
            Some(&LedgerError::TemplateIndex {
                kind: FIXED,
                index: 0,
                len: 0
            })
        );
    }

    #[test]
    fn test_update_retracts_old_rows_everywhere() {
        let mut registry = TemplateRegistry::new();
        let mut ledger = Ledger::new();
        registry.add_fixed(FixedExpenseTemplate::new("Rent", 500.0)).unwrap();
        for month in [ym(2023, 11), ym(2024, 3)] {
            let record = ledger.month_mut(month);
            record.fixed_expenses.push(FixedExpense::new("Rent", 500.0, 0.0));
            record.fixed_expenses.push(FixedExpense::new("Gym", 30.0, 30.0));
        }
        registry
            .update_fixed(0, FixedExpenseTemplate::new("Rent", 700.0), &mut ledger)
            .unwrap();
        for (_, record) in ledger.months() {
            assert!(record.fixed_expenses.iter().all(|r| r.name != "Rent"));
        }
        assert_eq!(ledger.get(ym(2024, 3)).unwrap().fixed_expenses.len(), 1);
    }

    #[test]
    fn test_update_debt_retracts_old_amount_everywhere() {
        let mut registry = TemplateRegistry::new();
        let mut ledger = Ledger::new();
        let start = ym(2024, 0);
        registry.add_debt(DebtTemplate::new("Loan", 500.0, 0, start)).unwrap();
        let months = [ym(2024, 0), ym(2024, 1), ym(2024, 5)];
        for month in months {
            let record = ledger.month_mut(month);
            record.debt.push(DebtEntry::new("Loan", 500.0));
            record.debt.push(DebtEntry::new("Mortgage", 900.0));
        }

        let old = registry
            .update_debt(0, DebtTemplate::new("Loan", 700.0, 0, start), &mut ledger)
            .unwrap();
        assert_eq!(old.amount.value(), 500.0);
        for (_, record) in ledger.months() {
            assert!(record.debt.iter().all(|r| !r.amount.matches(500.0.into())));
        }
        assert_eq!(ledger.get(ym(2024, 1)).unwrap().names(Category::Debt), vec!["Mortgage"]);

        let today = ym(2024, 5);
        materialize(ledger.month_mut(today), today, &registry, today);
        let loans: Vec<&DebtEntry> = ledger
            .get(today)
            .unwrap()
            .debt
            .iter()
            .filter(|r| r.name == "Loan")
            .collect();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].amount.value(), 700.0);
        // past months are not refilled
        assert_eq!(ledger.get(ym(2024, 1)).unwrap().debt.len(), 1);
    }

    #[test]
    fn test_remove_debt_retracts_rows() {
        let mut registry = TemplateRegistry::new();
        let mut ledger = Ledger::new();
        registry
            .add_debt(DebtTemplate::new("Loan", 250.0, 3, ym(2024, 0)))
            .unwrap();
        ledger
            .month_mut(ym(2024, 1))
            .debt
            .push(DebtEntry::new("loan", 250.0));
        let removed = registry.remove_debt(0, &mut ledger).unwrap();
        assert_eq!(removed.name, "Loan");
        assert!(registry.debt().is_empty());
        assert!(ledger.get(ym(2024, 1)).unwrap().debt.is_empty());
    }

    #[test]
    fn test_from_json_heals_templates() {
        let (registry, healed) = TemplateRegistry::from_json(
            json!([
                {"name": "Rent", "planned": 1200},
                {"name": "rent", "planned": 5},
                {"name": "", "planned": 5},
                "junk"
            ]),
            json!([
                {"name": "Car", "amount": 300, "monthsRemaining": 12, "startMonth": 2, "startYear": 2024},
                {"name": "Card", "amount": 20, "monthsRemaining": 0}
            ]),
            ym(2025, 4),
        );
        assert!(healed);
        assert_eq!(registry.fixed().len(), 1);
        assert_eq!(registry.debt().len(), 2);
        assert_eq!(registry.debt()[0].start, ym(2024, 2));
        assert_eq!(registry.debt()[1].start, ym(2025, 4));
        assert_eq!(
            registry.debt_to_json().unwrap()[1]["startMonth"],
            json!(4)
        );
    }

    #[test]
    fn test_from_json_clean_data_is_not_healed() {
        let (registry, healed) = TemplateRegistry::from_json(
            json!([{"name": "Rent", "planned": 1200.0}]),
            serde_json::Value::Null,
            ym(2025, 4),
        );
        assert!(!healed);
        assert_eq!(
            registry.fixed_to_json().unwrap(),
            json!([{"name": "Rent", "planned": 1200.0}])
        );
    }
}
