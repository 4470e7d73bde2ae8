use crate::args::{MonthArgs, TrendArgs};
use crate::commands::{close, open, Out};
use crate::model::{Amount, Category, MonthRecord, Origin, YearMonth};
use crate::session::Session;
use crate::store::Mode;
use crate::summary::{Summary, TrendPoint};
use crate::templates::AvailableTemplate;
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Write;

/// Everything `show` knows about a month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub month: YearMonth,
    pub record: MonthRecord,
    pub summary: Summary,
    pub available: Vec<AvailableTemplate>,
}

impl MonthView {
    pub(super) fn of(session: &Session) -> Self {
        Self {
            month: session.current(),
            record: session.record().clone(),
            summary: session.summary(),
            available: session.available_templates(),
        }
    }

    /// The month as text, one line per row.
    pub fn render(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "{}", self.month);
        let _ = writeln!(
            s,
            "Carried balance: {}",
            Amount::new(self.summary.carried_balance)
        );
        for category in Category::ALL {
            render_category(&mut s, &self.record, category);
        }
        let _ = writeln!(
            s,
            "\nIncome {} | Expenses {} | Remaining {} | Efficiency {:.1}%",
            Amount::new(self.summary.total_income),
            Amount::new(self.summary.total_expenses),
            Amount::new(self.summary.remaining),
            self.summary.efficiency_pct
        );
        if !self.available.is_empty() {
            let _ = writeln!(s, "Templates that can be added with `entry apply`:");
            for t in &self.available {
                let _ = writeln!(s, "  {} [{}] {} {}", t.kind, t.index, t.name, t.amount);
            }
        }
        s
    }
}

fn render_category(s: &mut String, record: &MonthRecord, category: Category) {
    let _ = writeln!(s, "\n{}", category.label());
    if record.len(category) == 0 {
        let _ = writeln!(s, "  (none)");
        return;
    }
    let lines: Vec<String> = match category {
        Category::Income => amount_lines(record.income.iter().map(|r| (&r.name, r.amount))),
        Category::OtherExpenses => {
            amount_lines(record.other_expenses.iter().map(|r| (&r.name, r.amount)))
        }
        Category::Investment => {
            amount_lines(record.investment.iter().map(|r| (&r.name, r.amount)))
        }
        Category::Debt => record
            .debt
            .iter()
            .map(|r| {
                format!(
                    "{:<24} {:>12}{}",
                    r.name,
                    r.amount.to_string(),
                    marker(r.origin)
                )
            })
            .collect(),
        Category::FixedExpenses => record
            .fixed_expenses
            .iter()
            .map(|r| {
                format!(
                    "{:<24} planned {:>12} actual {:>12} left {:>12}{}",
                    r.name,
                    r.planned.to_string(),
                    r.actual.to_string(),
                    r.variance().to_string(),
                    marker(r.origin)
                )
            })
            .collect(),
        Category::TravelEntertainment => record
            .travel_entertainment
            .iter()
            .map(|r| {
                format!(
                    "{:<24} planned {:>12} actual {:>12} left {:>12}",
                    r.name,
                    r.planned.to_string(),
                    r.actual.to_string(),
                    r.variance().to_string()
                )
            })
            .collect(),
    };
    for (index, line) in lines.iter().enumerate() {
        let _ = writeln!(s, "  [{index}] {line}");
    }
}

fn amount_lines<'a>(rows: impl Iterator<Item = (&'a String, Amount)>) -> Vec<String> {
    rows.map(|(name, amount)| format!("{name:<24} {:>12}", amount.to_string()))
        .collect()
}

fn marker(origin: Origin) -> &'static str {
    match origin {
        Origin::User => "",
        Origin::Template { .. } => "  (template)",
    }
}

/// Opens a month, carrying the balance in and applying templates, and shows it.
pub async fn show(config: Config, mode: Mode, args: &MonthArgs) -> Result<Out<MonthView>> {
    let month = args.resolve(YearMonth::today())?;
    let session = open(&config, mode, month).await?;
    let view = MonthView::of(&session);
    close(session).await?;
    Ok(Out::new(view.render(), view))
}

/// Shows the savings efficiency of the months ending with the selected month.
pub async fn trend(config: Config, mode: Mode, args: &TrendArgs) -> Result<Out<Vec<TrendPoint>>> {
    let month = args.month().resolve(YearMonth::today())?;
    let session = open(&config, mode, month).await?;
    let points = session.trend(args.months());
    close(session).await?;

    let mut message = format!("Savings efficiency through {month}");
    for point in &points {
        let _ = write!(
            message,
            "\n  {:<16} {:>6.1}%",
            point.month.to_string(),
            point.efficiency_pct
        );
    }
    Ok(Out::new(message, points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::SetArgs;
    use crate::commands::entry_set;
    use crate::model::Field;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_show_empty_month() {
        let env = TestEnv::new().await;
        let out = show(env.config(), Mode::File, &MonthArgs::default())
            .await
            .unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.month, YearMonth::today());
        assert!(view.record.is_empty());
        assert!(out.message().contains("Carried balance: 0.00"));
        assert!(out.message().contains("(none)"));
    }

    #[tokio::test]
    async fn test_show_carries_balance_from_previous_month() {
        let env = TestEnv::new().await;
        let last = YearMonth::today().prev();
        let last_args = MonthArgs::new(Some(last.year()), Some(last.month() + 1));
        entry_set(
            env.config(),
            Mode::File,
            &SetArgs::new(last_args, Category::Income, 0, Field::Amount, "1500"),
        )
        .await
        .unwrap();

        let out = show(env.config(), Mode::File, &MonthArgs::default())
            .await
            .unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.summary.carried_balance, 1500.0);
        assert_eq!(view.summary.remaining, 1500.0);
    }

    #[tokio::test]
    async fn test_trend() {
        let env = TestEnv::new().await;
        entry_set(
            env.config(),
            Mode::File,
            &SetArgs::new(MonthArgs::default(), Category::Income, 0, Field::Amount, "100"),
        )
        .await
        .unwrap();
        let out = trend(env.config(), Mode::File, &TrendArgs::new(MonthArgs::default(), 3))
            .await
            .unwrap();
        let points = out.structure().unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2].efficiency_pct, 100.0);
        assert!(out.message().contains("100.0%"));
    }
}
