use crate::args::{DebtTemplateArgs, FixedTemplateArgs, IndexArgs, UpdateDebtArgs, UpdateFixedArgs};
use crate::commands::{close, open, Out};
use crate::model::{DebtTemplate, FixedExpenseTemplate, YearMonth};
use crate::session::Session;
use crate::store::Mode;
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Write;

/// Both template collections, in index order.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateList {
    pub fixed: Vec<FixedExpenseTemplate>,
    pub debt: Vec<DebtTemplate>,
}

impl TemplateList {
    fn of(session: &Session) -> Self {
        Self {
            fixed: session.registry().fixed().to_vec(),
            debt: session.registry().debt().to_vec(),
        }
    }

    fn render(&self) -> String {
        let mut s = String::from("Fixed expense templates");
        if self.fixed.is_empty() {
            s.push_str("\n  (none)");
        }
        for (index, t) in self.fixed.iter().enumerate() {
            let _ = write!(s, "\n  [{index}] {:<24} {:>12}", t.name, t.planned.to_string());
        }
        s.push_str("\nDebt templates");
        if self.debt.is_empty() {
            s.push_str("\n  (none)");
        }
        for (index, t) in self.debt.iter().enumerate() {
            let term = if t.is_unlimited() {
                format!("every month from {}", t.start)
            } else {
                format!("{} months from {}", t.months_remaining, t.start)
            };
            let _ = write!(
                s,
                "\n  [{index}] {:<24} {:>12}  {term}",
                t.name,
                t.amount.to_string()
            );
        }
        s
    }
}

/// Lists the templates.
pub async fn template_list(config: Config, mode: Mode) -> Result<Out<TemplateList>> {
    let session = open(&config, mode, YearMonth::today()).await?;
    let list = TemplateList::of(&session);
    close(session).await?;
    Ok(Out::new(list.render(), list))
}

/// Adds a fixed expense template and applies it to the current month.
pub async fn template_add_fixed(
    config: Config,
    mode: Mode,
    args: &FixedTemplateArgs,
) -> Result<Out<TemplateList>> {
    let mut session = open(&config, mode, YearMonth::today()).await?;
    let index = session.add_fixed_template(fixed(args))?;
    finish(session, format!("Added fixed expense template {index}")).await
}

/// Adds a debt template and applies it to the current month.
pub async fn template_add_debt(
    config: Config,
    mode: Mode,
    args: &DebtTemplateArgs,
) -> Result<Out<TemplateList>> {
    let mut session = open(&config, mode, YearMonth::today()).await?;
    let start = args.start(session.today())?;
    let index = session.add_debt_template(debt(args, start))?;
    finish(session, format!("Added debt template {index}")).await
}

/// Replaces a fixed expense template.
pub async fn template_update_fixed(
    config: Config,
    mode: Mode,
    args: &UpdateFixedArgs,
) -> Result<Out<TemplateList>> {
    let mut session = open(&config, mode, YearMonth::today()).await?;
    let old = session.update_fixed_template(args.index(), fixed(args.template()))?;
    finish(
        session,
        format!("Updated fixed expense template '{}'", old.name),
    )
    .await
}

/// Replaces a debt template. The start month is kept unless a new one is given.
pub async fn template_update_debt(
    config: Config,
    mode: Mode,
    args: &UpdateDebtArgs,
) -> Result<Out<TemplateList>> {
    let mut session = open(&config, mode, YearMonth::today()).await?;
    let start = match session.registry().debt().get(args.index()) {
        Some(existing) if !args.template().has_start() => existing.start,
        _ => args.template().start(session.today())?,
    };
    let old = session.update_debt_template(args.index(), debt(args.template(), start))?;
    finish(session, format!("Updated debt template '{}'", old.name)).await
}

/// Removes a fixed expense template and its rows.
pub async fn template_remove_fixed(
    config: Config,
    mode: Mode,
    args: &IndexArgs,
) -> Result<Out<TemplateList>> {
    let mut session = open(&config, mode, YearMonth::today()).await?;
    let old = session.remove_fixed_template(args.index())?;
    finish(
        session,
        format!("Removed fixed expense template '{}'", old.name),
    )
    .await
}

/// Removes a debt template and its rows.
pub async fn template_remove_debt(
    config: Config,
    mode: Mode,
    args: &IndexArgs,
) -> Result<Out<TemplateList>> {
    let mut session = open(&config, mode, YearMonth::today()).await?;
    let old = session.remove_debt_template(args.index())?;
    finish(session, format!("Removed debt template '{}'", old.name)).await
}

fn fixed(args: &FixedTemplateArgs) -> FixedExpenseTemplate {
    FixedExpenseTemplate::new(args.name(), args.planned())
}

fn debt(args: &DebtTemplateArgs, start: YearMonth) -> DebtTemplate {
    DebtTemplate::new(args.name(), args.amount(), args.months(), start)
}

async fn finish(session: Session, message: String) -> Result<Out<TemplateList>> {
    let list = TemplateList::of(&session);
    close(session).await?;
    Ok(Out::new(message, list))
}
