//! Derived figures for a month: totals, remaining balance and savings efficiency.

use crate::ledger::Ledger;
use crate::model::{Amount, Category, MonthRecord, YearMonth};
use serde::Serialize;

/// The number of months shown by the efficiency trend when none is given.
pub const DEFAULT_TREND_MONTHS: u16 = 6;

/// The longest trend the CLI will compute, fifty years.
pub const MAX_TREND_MONTHS: u16 = 600;

/// The sum of each category of a month. Planned categories count what was actually spent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub income: f64,
    pub fixed_expenses: f64,
    pub other_expenses: f64,
    pub debt: f64,
    pub investment: f64,
    pub travel_entertainment: f64,
}

impl CategoryTotals {
    pub fn of(record: &MonthRecord) -> Self {
        Self {
            income: sum(record.income.iter().map(|r| r.amount)),
            fixed_expenses: sum(record.fixed_expenses.iter().map(|r| r.actual)),
            other_expenses: sum(record.other_expenses.iter().map(|r| r.amount)),
            debt: sum(record.debt.iter().map(|r| r.amount)),
            investment: sum(record.investment.iter().map(|r| r.amount)),
            travel_entertainment: sum(record.travel_entertainment.iter().map(|r| r.actual)),
        }
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Income => self.income,
            Category::FixedExpenses => self.fixed_expenses,
            Category::OtherExpenses => self.other_expenses,
            Category::Debt => self.debt,
            Category::Investment => self.investment,
            Category::TravelEntertainment => self.travel_entertainment,
        }
    }

    /// Everything that leaves the account: all categories except income.
    pub fn expenses(&self) -> f64 {
        self.fixed_expenses
            + self.other_expenses
            + self.travel_entertainment
            + self.debt
            + self.investment
    }
}

fn sum(amounts: impl Iterator<Item = Amount>) -> f64 {
    amounts.map(f64::from).sum()
}

/// The headline figures of a month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub remaining: f64,
    pub efficiency_pct: f64,
    pub carried_balance: f64,
    pub totals: CategoryTotals,
}

impl Summary {
    /// Money available to spend this month: income plus what was carried in.
    pub fn available(&self) -> f64 {
        self.total_income + self.carried_balance
    }
}

/// Computes the summary of `record`. Pure.
pub fn summarize(record: &MonthRecord) -> Summary {
    let totals = CategoryTotals::of(record);
    let total_income = totals.income;
    let total_expenses = totals.expenses();
    let carried_balance = record.carried_balance().value();
    Summary {
        total_income,
        total_expenses,
        remaining: total_income - total_expenses + carried_balance,
        efficiency_pct: efficiency(total_income, total_expenses),
        carried_balance,
        totals,
    }
}

/// The share of income that was not spent, as a percentage. Zero when there is no income and
/// never negative.
fn efficiency(income: f64, expenses: f64) -> f64 {
    if income > 0.0 {
        ((income - expenses) / income * 100.0).max(0.0)
    } else {
        0.0
    }
}

/// One point of the efficiency chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: YearMonth,
    pub efficiency_pct: f64,
}

/// The savings efficiency of the `months` months ending with `end`, oldest first. Months that
/// have never been realized count as zero and are not created.
pub fn efficiency_trend(ledger: &Ledger, end: YearMonth, months: u16) -> Vec<TrendPoint> {
    (0..months)
        .rev()
        .map(|back| {
            let month = end.offset(-i32::from(back));
            let efficiency_pct = ledger
                .get(month)
                .map(|record| summarize(record).efficiency_pct)
                .unwrap_or_default();
            TrendPoint {
                month,
                efficiency_pct,
            }
        })
        .collect()
}
