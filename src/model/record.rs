//! The data for one calendar month.

use crate::error::LedgerError;
use crate::model::entry::{AmountEntry, DebtEntry, FixedExpense, PlannedEntry, Row};
use crate::model::{Amount, Category, Field};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Everything entered for one month, plus the balance carried in from the month before.
///
/// All six categories always exist (possibly empty) and `carried_balance` is never negative.
/// Deserialization heals persisted data that violates this rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRecord {
    #[serde(default, deserialize_with = "healed_rows")]
    pub income: Vec<AmountEntry>,
    #[serde(default, deserialize_with = "healed_rows")]
    pub fixed_expenses: Vec<FixedExpense>,
    #[serde(default, deserialize_with = "healed_rows")]
    pub other_expenses: Vec<AmountEntry>,
    #[serde(default, deserialize_with = "healed_rows")]
    pub debt: Vec<DebtEntry>,
    #[serde(default, deserialize_with = "healed_rows")]
    pub investment: Vec<AmountEntry>,
    #[serde(default, deserialize_with = "healed_rows")]
    pub travel_entertainment: Vec<PlannedEntry>,
    #[serde(default, deserialize_with = "healed_balance")]
    carried_balance: Amount,
}

/// An empty month, for reading months that have not been realized.
pub(crate) static EMPTY_RECORD: MonthRecord = MonthRecord {
    income: Vec::new(),
    fixed_expenses: Vec::new(),
    other_expenses: Vec::new(),
    debt: Vec::new(),
    investment: Vec::new(),
    travel_entertainment: Vec::new(),
    carried_balance: Amount::ZERO,
};

impl MonthRecord {
    /// The opening balance inherited from the previous month.
    pub fn carried_balance(&self) -> Amount {
        self.carried_balance
    }

    /// Sets the opening balance, clamping negative values to zero.
    pub fn set_carried_balance(&mut self, value: impl Into<Amount>) {
        self.carried_balance = value.into().clamp_non_negative();
    }

    /// The number of rows in `category`.
    pub fn len(&self, category: Category) -> usize {
        match category {
            Category::Income => self.income.len(),
            Category::FixedExpenses => self.fixed_expenses.len(),
            Category::OtherExpenses => self.other_expenses.len(),
            Category::Debt => self.debt.len(),
            Category::Investment => self.investment.len(),
            Category::TravelEntertainment => self.travel_entertainment.len(),
        }
    }

    /// True when no category has any rows.
    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.len(*c) == 0)
    }

    /// The names of the rows in `category`, in order.
    pub fn names(&self, category: Category) -> Vec<&str> {
        match category {
            Category::Income => names(&self.income),
            Category::FixedExpenses => names(&self.fixed_expenses),
            Category::OtherExpenses => names(&self.other_expenses),
            Category::Debt => names(&self.debt),
            Category::Investment => names(&self.investment),
            Category::TravelEntertainment => names(&self.travel_entertainment),
        }
    }

    /// Appends a blank row to `category` unless a blank row is already there. Returns the index of
    /// the blank row.
    pub fn add_row(&mut self, category: Category) -> usize {
        match category {
            Category::Income => add_blank(&mut self.income),
            Category::FixedExpenses => add_blank(&mut self.fixed_expenses),
            Category::OtherExpenses => add_blank(&mut self.other_expenses),
            Category::Debt => add_blank(&mut self.debt),
            Category::Investment => add_blank(&mut self.investment),
            Category::TravelEntertainment => add_blank(&mut self.travel_entertainment),
        }
    }

    /// Sets one field of one row from user input. Setting a field on the row just past the end
    /// creates that row. Numeric input that does not parse is stored as zero.
    pub fn set_field(
        &mut self,
        category: Category,
        index: usize,
        field: Field,
        value: &str,
    ) -> Result<()> {
        match category {
            Category::Income => set_field(&mut self.income, category, index, field, value),
            Category::FixedExpenses => {
                set_field(&mut self.fixed_expenses, category, index, field, value)
            }
            Category::OtherExpenses => {
                set_field(&mut self.other_expenses, category, index, field, value)
            }
            Category::Debt => set_field(&mut self.debt, category, index, field, value),
            Category::Investment => set_field(&mut self.investment, category, index, field, value),
            Category::TravelEntertainment => {
                set_field(&mut self.travel_entertainment, category, index, field, value)
            }
        }
    }

    /// Removes the rows at `indices` from `category`. Indices that are out of range are ignored.
    /// Returns the number of rows removed.
    pub fn delete_rows(&mut self, category: Category, indices: &[usize]) -> usize {
        match category {
            Category::Income => delete_rows(&mut self.income, indices),
            Category::FixedExpenses => delete_rows(&mut self.fixed_expenses, indices),
            Category::OtherExpenses => delete_rows(&mut self.other_expenses, indices),
            Category::Debt => delete_rows(&mut self.debt, indices),
            Category::Investment => delete_rows(&mut self.investment, indices),
            Category::TravelEntertainment => delete_rows(&mut self.travel_entertainment, indices),
        }
    }

    /// Removes every row from `category`. Returns the number of rows removed.
    pub fn clear(&mut self, category: Category) -> usize {
        let removed = self.len(category);
        match category {
            Category::Income => self.income.clear(),
            Category::FixedExpenses => self.fixed_expenses.clear(),
            Category::OtherExpenses => self.other_expenses.clear(),
            Category::Debt => self.debt.clear(),
            Category::Investment => self.investment.clear(),
            Category::TravelEntertainment => self.travel_entertainment.clear(),
        }
        removed
    }
}

fn names<R: Row>(rows: &[R]) -> Vec<&str> {
    rows.iter().map(|r| r.name()).collect()
}

fn add_blank<R: Row>(rows: &mut Vec<R>) -> usize {
    if let Some(index) = rows.iter().position(Row::is_blank) {
        return index;
    }
    rows.push(R::default());
    rows.len() - 1
}

fn set_field<R: Row>(
    rows: &mut Vec<R>,
    category: Category,
    index: usize,
    field: Field,
    value: &str,
) -> Result<()> {
    let len = rows.len();
    if index > len {
        return Err(LedgerError::EntryIndex {
            category: category.to_string(),
            index,
            len,
        }
        .into());
    }
    let mut row = if index == len {
        R::default()
    } else {
        std::mem::take(&mut rows[index])
    };
    let applied = row.set(field, value);
    if index == len {
        if applied {
            rows.push(row);
        }
    } else {
        rows[index] = row;
    }
    if !applied {
        return Err(LedgerError::FieldNotApplicable {
            category: category.to_string(),
            field: field.to_string(),
        }
        .into());
    }
    Ok(())
}

fn delete_rows<R>(rows: &mut Vec<R>, indices: &[usize]) -> usize {
    let mut sorted: Vec<usize> = indices.iter().copied().filter(|i| *i < rows.len()).collect();
    sorted.sort_unstable();
    sorted.dedup();
    for index in sorted.iter().rev() {
        rows.remove(*index);
    }
    sorted.len()
}

/// Deserializes a category array. A missing or non-array value becomes empty and rows that cannot
/// be read are dropped.
fn healed_rows<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Null => return Ok(Vec::new()),
        other => {
            warn!("Expected a list of rows but found {other}, treating it as empty");
            return Ok(Vec::new());
        }
    };
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(row) => rows.push(row),
            Err(e) => warn!("Dropping a row that could not be read: {e}"),
        }
    }
    Ok(rows)
}

fn healed_balance<'de, D>(deserializer: D) -> std::result::Result<Amount, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Amount::deserialize(deserializer)?.clamp_non_negative())
}
