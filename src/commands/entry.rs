use crate::args::{ApplyArgs, DeleteArgs, RowArgs, SetArgs};
use crate::commands::show::MonthView;
use crate::commands::{close, open, Out};
use crate::model::YearMonth;
use crate::store::Mode;
use crate::{Config, Result};

/// Adds a blank row to a category, unless there already is one.
pub async fn entry_add(config: Config, mode: Mode, args: &RowArgs) -> Result<Out<MonthView>> {
    let month = args.month().resolve(YearMonth::today())?;
    let mut session = open(&config, mode, month).await?;
    let index = session.add_row(args.category());
    let view = MonthView::of(&session);
    close(session).await?;
    Ok(Out::new(
        format!("Row {index} of {} in {month} is ready", args.category().label()),
        view,
    ))
}

/// Sets one field of a row.
pub async fn entry_set(config: Config, mode: Mode, args: &SetArgs) -> Result<Out<MonthView>> {
    let month = args.month().resolve(YearMonth::today())?;
    let mut session = open(&config, mode, month).await?;
    session.set_field(args.category(), args.index(), args.field(), args.value())?;
    let view = MonthView::of(&session);
    close(session).await?;
    Ok(Out::new(
        format!(
            "Set {} of row {} of {} in {month}",
            args.field(),
            args.index(),
            args.category().label()
        ),
        view,
    ))
}

/// Deletes rows of a category.
pub async fn entry_delete(config: Config, mode: Mode, args: &DeleteArgs) -> Result<Out<MonthView>> {
    let month = args.month().resolve(YearMonth::today())?;
    let mut session = open(&config, mode, month).await?;
    let removed = session.delete_rows(args.category(), args.indices());
    let view = MonthView::of(&session);
    close(session).await?;
    Ok(Out::new(
        format!(
            "Deleted {removed} rows of {} in {month}",
            args.category().label()
        ),
        view,
    ))
}

/// Deletes every row of a category.
pub async fn entry_clear(config: Config, mode: Mode, args: &RowArgs) -> Result<Out<MonthView>> {
    let month = args.month().resolve(YearMonth::today())?;
    let mut session = open(&config, mode, month).await?;
    let removed = session.clear(args.category());
    let view = MonthView::of(&session);
    close(session).await?;
    Ok(Out::new(
        format!(
            "Cleared {} in {month}, {removed} rows deleted",
            args.category().label()
        ),
        view,
    ))
}

/// Adds the row of one template to a month.
pub async fn entry_apply(config: Config, mode: Mode, args: &ApplyArgs) -> Result<Out<MonthView>> {
    let month = args.month().resolve(YearMonth::today())?;
    let mut session = open(&config, mode, month).await?;
    let added = session.apply_template(args.kind(), args.index())?;
    let view = MonthView::of(&session);
    close(session).await?;
    let message = if added {
        format!("Added {} template {} to {month}", args.kind(), args.index())
    } else {
        format!(
            "{} template {} is already in {month} or does not apply to it",
            args.kind(),
            args.index()
        )
    };
    Ok(Out::new(message, view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{FixedTemplateArgs, MonthArgs};
    use crate::commands::template_add_fixed;
    use crate::model::{Category, Field};
    use crate::templates::TemplateKind;
    use crate::test::TestEnv;

    fn last_month() -> MonthArgs {
        let last = YearMonth::today().prev();
        MonthArgs::new(Some(last.year()), Some(last.month() + 1))
    }

    #[tokio::test]
    async fn test_entry_set_add_delete_clear() {
        let env = TestEnv::new().await;
        let set = |index: usize, field: Field, value: &str| {
            SetArgs::new(MonthArgs::default(), Category::OtherExpenses, index, field, value)
        };
        entry_set(env.config(), Mode::File, &set(0, Field::Name, "Food"))
            .await
            .unwrap();
        entry_set(env.config(), Mode::File, &set(0, Field::Amount, "$45.10"))
            .await
            .unwrap();
        let out = entry_add(
            env.config(),
            Mode::File,
            &RowArgs::new(MonthArgs::default(), Category::OtherExpenses),
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().record.other_expenses.len(), 2);

        let out = entry_delete(
            env.config(),
            Mode::File,
            &DeleteArgs::new(MonthArgs::default(), Category::OtherExpenses, vec![1]),
        )
        .await
        .unwrap();
        let record = &out.structure().unwrap().record;
        assert_eq!(record.other_expenses.len(), 1);
        assert_eq!(record.other_expenses[0].amount.value(), 45.1);

        let out = entry_clear(
            env.config(),
            Mode::File,
            &RowArgs::new(MonthArgs::default(), Category::OtherExpenses),
        )
        .await
        .unwrap();
        assert!(out.message().contains("1 rows deleted"));
    }

    #[tokio::test]
    async fn test_entry_set_bad_index() {
        let env = TestEnv::new().await;
        let args = SetArgs::new(MonthArgs::default(), Category::Debt, 3, Field::Name, "x");
        assert!(entry_set(env.config(), Mode::File, &args).await.is_err());
    }

    #[tokio::test]
    async fn test_entry_apply_to_past_month() {
        let env = TestEnv::new().await;
        template_add_fixed(env.config(), Mode::File, &FixedTemplateArgs::new("Rent", 900.0))
            .await
            .unwrap();
        let args = ApplyArgs::new(last_month(), TemplateKind::Fixed, 0);
        let out = entry_apply(env.config(), Mode::File, &args).await.unwrap();
        assert!(out.message().starts_with("Added"));
        assert_eq!(out.structure().unwrap().record.fixed_expenses.len(), 1);

        let out = entry_apply(env.config(), Mode::File, &args).await.unwrap();
        assert!(out.message().contains("already"));
    }
}
