use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::model::{
    same_name, Amount, DebtEntry, DebtTemplate, FixedExpense, FixedExpenseTemplate, MonthRecord,
    Origin, YearMonth,
};
use crate::templates::{TemplateKind, TemplateRegistry};
use crate::Result;
use serde::Serialize;
use tracing::{debug, trace};

/// What a call to `materialize` changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Materialized {
    pub fixed_added: usize,
    pub debt_removed: usize,
    pub debt_added: usize,
    /// True when the debt rows differ from before the call.
    pub debt_changed: bool,
    /// False when the month was before `today` and left alone.
    pub applied: bool,
}

impl Materialized {
    /// True if the record differs from before the call.
    pub fn changed(&self) -> bool {
        self.fixed_added > 0 || self.debt_changed
    }
}

/// Reconciles the template-derived rows of `record` (the month `ym`) with the registry.
///
/// Months before `today` are never touched. Otherwise fixed expense templates are added when no
/// row of the same name exists, and the template-derived debt rows are replaced by one row per
/// debt template that applies to `ym`. Running this twice in a row changes nothing the second
/// time.
pub fn materialize(
    record: &mut MonthRecord,
    ym: YearMonth,
    registry: &TemplateRegistry,
    today: YearMonth,
) -> Materialized {
    let mut result = Materialized::default();
    if ym < today {
        trace!("Not materializing templates into {ym}, it is in the past");
        return result;
    }
    result.applied = true;

    for (index, template) in registry.fixed().iter().enumerate() {
        if has_fixed(record, &template.name) {
            continue;
        }
        record.fixed_expenses.push(fixed_row(template, index));
        result.fixed_added += 1;
    }

    let before = record.debt.clone();
    record.debt.retain(|row| !row.origin.is_template());
    result.debt_removed = before.len() - record.debt.len();
    for (index, template) in registry.debt().iter().enumerate() {
        if template.should_apply(ym) {
            record.debt.push(debt_row(template, index));
            result.debt_added += 1;
        }
    }
    result.debt_changed = record.debt != before;

    if result.changed() {
        debug!(
            "Materialized templates into {ym}: {} fixed added, {} debt rows replaced by {}",
            result.fixed_added, result.debt_removed, result.debt_added
        );
    }
    result
}

/// Removes, from every month of the ledger, the fixed expense rows that `template` would have
/// produced: same name ignoring case and the same planned amount. Rows typed in by the user that
/// look exactly like a template row are removed as well. Returns the number of rows removed.
pub fn retract_fixed(ledger: &mut Ledger, template: &FixedExpenseTemplate) -> usize {
    let mut removed = 0;
    for (_, record) in ledger.months_mut() {
        let before = record.fixed_expenses.len();
        record
            .fixed_expenses
            .retain(|row| !produced_by(&row.name, row.planned, &template.name, template.planned));
        removed += before - record.fixed_expenses.len();
    }
    removed
}

/// Removes, from every month of the ledger, the debt rows that `template` would have produced:
/// same name ignoring case and the same amount. Returns the number of rows removed.
pub fn retract_debt(ledger: &mut Ledger, template: &DebtTemplate) -> usize {
    let mut removed = 0;
    for (_, record) in ledger.months_mut() {
        let before = record.debt.len();
        record
            .debt
            .retain(|row| !produced_by(&row.name, row.amount, &template.name, template.amount));
        removed += before - record.debt.len();
    }
    removed
}

fn produced_by(name: &str, amount: Amount, template_name: &str, template_amount: Amount) -> bool {
    same_name(name, template_name) && amount.matches(template_amount)
}

/// Adds the row of one template to `record` on request, even when the month is in the past.
/// Nothing is added when a row with the same name already exists or, for debt, when the template
/// does not apply to `ym`. Returns true if a row was added.
pub fn apply_template_to_month(
    record: &mut MonthRecord,
    ym: YearMonth,
    registry: &TemplateRegistry,
    kind: TemplateKind,
    index: usize,
) -> Result<bool> {
    match kind {
        TemplateKind::Fixed => {
            let template = registry.fixed().get(index).ok_or(LedgerError::TemplateIndex {
                kind: kind.label(),
                index,
                len: registry.fixed().len(),
            })?;
            if has_fixed(record, &template.name) {
                return Ok(false);
            }
            record.fixed_expenses.push(fixed_row(template, index));
        }
        TemplateKind::Debt => {
            let template = registry.debt().get(index).ok_or(LedgerError::TemplateIndex {
                kind: kind.label(),
                index,
                len: registry.debt().len(),
            })?;
            if has_debt(record, &template.name) {
                return Ok(false);
            }
            if !template.should_apply(ym) {
                debug!("Debt template '{}' does not apply to {ym}", template.name);
                return Ok(false);
            }
            record.debt.push(debt_row(template, index));
        }
    }
    Ok(true)
}

/// A template that applies to a month but has no row there yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableTemplate {
    pub kind: TemplateKind,
    pub index: usize,
    pub name: String,
    pub amount: Amount,
}

/// The templates that could still be applied to `record` with `apply_template_to_month`.
pub fn available_templates(
    record: &MonthRecord,
    ym: YearMonth,
    registry: &TemplateRegistry,
) -> Vec<AvailableTemplate> {
    let fixed = registry
        .fixed()
        .iter()
        .enumerate()
        .filter(|(_, t)| !has_fixed(record, &t.name))
        .map(|(index, t)| AvailableTemplate {
            kind: TemplateKind::Fixed,
            index,
            name: t.name.clone(),
            amount: t.planned,
        });
    let debt = registry
        .debt()
        .iter()
        .enumerate()
        .filter(|(_, t)| t.should_apply(ym) && !has_debt(record, &t.name))
        .map(|(index, t)| AvailableTemplate {
            kind: TemplateKind::Debt,
            index,
            name: t.name.clone(),
            amount: t.amount,
        });
    fixed.chain(debt).collect()
}

fn has_fixed(record: &MonthRecord, name: &str) -> bool {
    record.fixed_expenses.iter().any(|r| same_name(&r.name, name))
}

fn has_debt(record: &MonthRecord, name: &str) -> bool {
    record.debt.iter().any(|r| same_name(&r.name, name))
}

fn fixed_row(template: &FixedExpenseTemplate, index: usize) -> FixedExpense {
    FixedExpense::new(template.name.clone(), template.planned, Amount::ZERO).with_origin(
        Origin::Template {
            template_id: Some(index),
        },
    )
}

fn debt_row(template: &DebtTemplate, index: usize) -> DebtEntry {
    DebtEntry::new(template.name.clone(), template.amount).with_origin(Origin::Template {
        template_id: Some(index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u8) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn registry() -> TemplateRegistry {
        let mut registry = TemplateRegistry::new();
        registry
            .add_fixed(FixedExpenseTemplate::new("Rent", 1200.0))
            .unwrap();
        registry
            .add_debt(DebtTemplate::new("Loan", 250.0, 3, ym(2024, 0)))
            .unwrap();
        registry
            .add_debt(DebtTemplate::new("Card", 40.0, 0, ym(2024, 0)))
            .unwrap();
        registry
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let registry = registry();
        let mut record = MonthRecord::default();
        let first = materialize(&mut record, ym(2024, 1), &registry, ym(2024, 1));
        assert!(first.changed());
        assert_eq!(first.fixed_added, 1);
        assert_eq!(first.debt_added, 2);
        let snapshot = record.clone();

        let second = materialize(&mut record, ym(2024, 1), &registry, ym(2024, 1));
        assert!(!second.changed());
        assert_eq!(record, snapshot);
    }

    #[test]
    fn test_replacing_a_debt_row_counts_as_a_change() {
        let mut registry = TemplateRegistry::new();
        registry
            .add_debt(DebtTemplate::new("Loan", 700.0, 0, ym(2024, 0)))
            .unwrap();
        let mut record = MonthRecord::default();
        record.debt.push(
            DebtEntry::new("Loan", 500.0).with_origin(Origin::Template {
                template_id: Some(0),
            }),
        );
        let result = materialize(&mut record, ym(2024, 1), &registry, ym(2024, 1));
        assert_eq!((result.debt_removed, result.debt_added), (1, 1));
        assert!(result.changed());
        assert_eq!(record.debt[0].amount.value(), 700.0);
    }

    #[test]
    fn test_debt_window_is_respected() {
        let registry = registry();
        let today = ym(2023, 0);
        let names = |month: YearMonth| {
            let mut record = MonthRecord::default();
            materialize(&mut record, month, &registry, today);
            let names = record.names(crate::model::Category::Debt).join(",");
            names
        };
        assert_eq!(names(ym(2023, 11)), "Card");
        assert_eq!(names(ym(2024, 0)), "Loan,Card");
        assert_eq!(names(ym(2024, 2)), "Loan,Card");
        assert_eq!(names(ym(2024, 3)), "Card");
    }

    #[test]
    fn test_existing_fixed_rows_are_not_overwritten() {
        let registry = registry();
        let mut record = MonthRecord::default();
        record
            .fixed_expenses
            .push(FixedExpense::new("RENT", 1000.0, 1000.0));
        materialize(&mut record, ym(2024, 1), &registry, ym(2024, 1));
        assert_eq!(record.fixed_expenses.len(), 1);
        assert_eq!(record.fixed_expenses[0].planned.value(), 1000.0);
        assert_eq!(record.fixed_expenses[0].origin, Origin::User);
    }

    #[test]
    fn test_template_debt_rows_are_replaced_but_user_rows_stay() {
        let registry = registry();
        let mut record = MonthRecord::default();
        record.debt.push(DebtEntry::new("Mortgage", 900.0));
        record.debt.push(
            DebtEntry::new("Loan", 999.0).with_origin(Origin::Template { template_id: None }),
        );
        materialize(&mut record, ym(2024, 1), &registry, ym(2024, 0));
        let loan: Vec<&DebtEntry> = record.debt.iter().filter(|r| r.name == "Loan").collect();
        assert_eq!(loan.len(), 1);
        assert_eq!(loan[0].amount.value(), 250.0);
        assert_eq!(record.debt[0].name, "Mortgage");
    }

    #[test]
    fn test_past_months_are_untouched() {
        let registry = registry();
        let mut record = MonthRecord::default();
        let result = materialize(&mut record, ym(2024, 1), &registry, ym(2024, 2));
        assert!(!result.applied);
        assert!(record.is_empty());
    }

    #[test]
    fn test_retract_matches_name_and_amount() {
        let mut ledger = Ledger::new();
        let record = ledger.month_mut(ym(2024, 0));
        record.debt.push(DebtEntry::new("loan ", 250.004));
        record.debt.push(DebtEntry::new("Loan", 251.0));
        record.debt.push(DebtEntry::new("Other", 250.0));
        let template = DebtTemplate::new("Loan", 250.0, 3, ym(2024, 0));
        assert_eq!(retract_debt(&mut ledger, &template), 1);
        assert_eq!(
            ledger.get(ym(2024, 0)).unwrap().names(crate::model::Category::Debt),
            vec!["Loan", "Other"]
        );
    }

    #[test]
    fn test_apply_template_to_past_month() {
        let registry = registry();
        let mut record = MonthRecord::default();
        let month = ym(2024, 5);
        assert!(apply_template_to_month(&mut record, month, &registry, TemplateKind::Fixed, 0).unwrap());
        assert!(!apply_template_to_month(&mut record, month, &registry, TemplateKind::Fixed, 0).unwrap());
        // the loan ended in March
        assert!(!apply_template_to_month(&mut record, month, &registry, TemplateKind::Debt, 0).unwrap());
        assert!(apply_template_to_month(&mut record, month, &registry, TemplateKind::Debt, 1).unwrap());
        assert!(apply_template_to_month(&mut record, month, &registry, TemplateKind::Debt, 7).is_err());
    }

    #[test]
    fn test_available_templates() {
        let registry = registry();
        let mut record = MonthRecord::default();
        record.debt.push(DebtEntry::new("card", 40.0));
        let available = available_templates(&record, ym(2024, 6), &registry);
        let names: Vec<&str> = available.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Rent"]);
    }
}
