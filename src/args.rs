//! These structs provide the CLI interface for the carryover CLI.

use crate::model::{Amount, Category, Field, Theme, YearMonth};
use crate::summary::{DEFAULT_TREND_MONTHS, MAX_TREND_MONTHS};
use crate::templates::TemplateKind;
use crate::Result;
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// carryover: A command-line monthly budget ledger.
///
/// Keep track of income, fixed and other expenses, debt payments, investments and travel for each
/// month. Whatever is left at the end of a month is carried into the next one. Recurring expenses
/// and time-limited debts can be set up once as templates and they will show up in every current
/// and future month they apply to.
///
/// Months are given with --year and --month (1-12) and default to the current month. Row and
/// template indices are the ones printed by `show` and `template list`, starting at 0.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// This is the first command you should run. By default the data lives in $HOME/carryover;
    /// pass --home or set CARRYOVER_HOME to put it somewhere else.
    Init(InitArgs),
    /// Show a month: its carried balance, its rows and its summary.
    Show(MonthArgs),
    /// Show the savings efficiency of the last few months.
    Trend(TrendArgs),
    /// Add, change or delete the rows of a month.
    Entry(EntryArgs),
    /// Manage fixed expense and debt templates.
    Template(TemplateArgs),
    /// Show or change the display theme.
    Theme(ThemeArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where carryover data and configuration is held. Defaults to ~/carryover
    #[arg(long, env = "CARRYOVER_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `carryover init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Milliseconds to wait after the last edit before saving. Defaults to 500.
    #[arg(long)]
    debounce_ms: Option<u64>,
}

impl InitArgs {
    pub fn new(debounce_ms: Option<u64>) -> Self {
        Self { debounce_ms }
    }

    pub fn debounce_ms(&self) -> Option<u64> {
        self.debounce_ms
    }
}

/// Selects a month. Anything not given is taken from the current month.
#[derive(Debug, Parser, Clone, Default)]
pub struct MonthArgs {
    /// The year, e.g. 2025
    #[arg(long)]
    year: Option<i32>,

    /// The month, 1 (January) through 12 (December)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
    month: Option<u8>,
}

impl MonthArgs {
    pub fn new(year: Option<i32>, month: Option<u8>) -> Self {
        Self { year, month }
    }

    /// The selected month, filling in whatever was not given from `today`.
    pub fn resolve(&self, today: YearMonth) -> Result<YearMonth> {
        let year = self.year.unwrap_or(today.year());
        let month = self.month.unwrap_or(today.month() + 1);
        YearMonth::from_human(year, month)
            .with_context(|| format!("'{month}' is not a month, use 1 through 12"))
    }
}

/// Args for the `carryover trend` command.
#[derive(Debug, Parser, Clone)]
pub struct TrendArgs {
    #[clap(flatten)]
    month: MonthArgs,

    /// How many months to show, ending with the selected month
    #[arg(
        long,
        default_value_t = DEFAULT_TREND_MONTHS,
        value_parser = clap::value_parser!(u16).range(1..=MAX_TREND_MONTHS as i64)
    )]
    months: u16,
}

impl TrendArgs {
    pub fn new(month: MonthArgs, months: u16) -> Self {
        Self { month, months }
    }

    pub fn month(&self) -> &MonthArgs {
        &self.month
    }

    pub fn months(&self) -> u16 {
        self.months
    }
}

/// Args for the `carryover entry` command.
#[derive(Debug, Parser, Clone)]
pub struct EntryArgs {
    #[command(subcommand)]
    action: EntrySubcommand,
}

impl EntryArgs {
    pub fn action(&self) -> &EntrySubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum EntrySubcommand {
    /// Add a blank row to a category. If there already is a blank row, nothing is added.
    Add(RowArgs),
    /// Set one field of a row. Setting a field on the row just past the last one adds a row.
    Set(SetArgs),
    /// Delete one or more rows of a category.
    Delete(DeleteArgs),
    /// Delete every row of a category.
    Clear(RowArgs),
    /// Add the row of a template to the month, even when the month is in the past.
    Apply(ApplyArgs),
}

/// Selects a category of a month.
#[derive(Debug, Parser, Clone)]
pub struct RowArgs {
    #[clap(flatten)]
    month: MonthArgs,

    /// The category
    category: Category,
}

impl RowArgs {
    pub fn new(month: MonthArgs, category: Category) -> Self {
        Self { month, category }
    }

    pub fn month(&self) -> &MonthArgs {
        &self.month
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

/// Args for `carryover entry set`.
#[derive(Debug, Parser, Clone)]
pub struct SetArgs {
    #[clap(flatten)]
    month: MonthArgs,

    /// The category
    category: Category,

    /// The row index
    index: usize,

    /// The field to change. Income, other expenses, debt and investment rows have a name and an
    /// amount. Fixed expense and travel rows have a name, planned and actual.
    field: Field,

    /// The new value. Amounts that cannot be read are stored as 0.
    #[arg(allow_hyphen_values = true)]
    value: String,
}

impl SetArgs {
    pub fn new(
        month: MonthArgs,
        category: Category,
        index: usize,
        field: Field,
        value: impl Into<String>,
    ) -> Self {
        Self {
            month,
            category,
            index,
            field,
            value: value.into(),
        }
    }

    pub fn month(&self) -> &MonthArgs {
        &self.month
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Args for `carryover entry delete`.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    #[clap(flatten)]
    month: MonthArgs,

    /// The category
    category: Category,

    /// The indices of the rows to delete
    #[arg(required = true, num_args = 1..)]
    indices: Vec<usize>,
}

impl DeleteArgs {
    pub fn new(month: MonthArgs, category: Category, indices: Vec<usize>) -> Self {
        Self {
            month,
            category,
            indices,
        }
    }

    pub fn month(&self) -> &MonthArgs {
        &self.month
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

/// Args for `carryover entry apply`.
#[derive(Debug, Parser, Clone)]
pub struct ApplyArgs {
    #[clap(flatten)]
    month: MonthArgs,

    /// The kind of template
    kind: TemplateKind,

    /// The template index, as shown by `template list`
    index: usize,
}

impl ApplyArgs {
    pub fn new(month: MonthArgs, kind: TemplateKind, index: usize) -> Self {
        Self { month, kind, index }
    }

    pub fn month(&self) -> &MonthArgs {
        &self.month
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Args for the `carryover template` command.
#[derive(Debug, Parser, Clone)]
pub struct TemplateArgs {
    #[command(subcommand)]
    action: TemplateSubcommand,
}

impl TemplateArgs {
    pub fn action(&self) -> &TemplateSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum TemplateSubcommand {
    /// List all templates.
    List,
    /// Add a fixed expense template, e.g. rent.
    AddFixed(FixedTemplateArgs),
    /// Add a debt template, e.g. a loan with 12 payments left.
    AddDebt(DebtTemplateArgs),
    /// Change a fixed expense template. Its rows are removed from every month and it is applied
    /// again to the current month.
    UpdateFixed(UpdateFixedArgs),
    /// Change a debt template. Its rows are removed from every month and it is applied again to
    /// the current month.
    UpdateDebt(UpdateDebtArgs),
    /// Remove a fixed expense template and its rows in every month.
    RemoveFixed(IndexArgs),
    /// Remove a debt template and its rows in every month.
    RemoveDebt(IndexArgs),
}

/// The fields of a fixed expense template.
#[derive(Debug, Parser, Clone)]
pub struct FixedTemplateArgs {
    /// The name of the expense
    name: String,

    /// The planned amount each month
    planned: Amount,
}

impl FixedTemplateArgs {
    pub fn new(name: impl Into<String>, planned: impl Into<Amount>) -> Self {
        Self {
            name: name.into(),
            planned: planned.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn planned(&self) -> Amount {
        self.planned
    }
}

/// The fields of a debt template.
#[derive(Debug, Parser, Clone)]
pub struct DebtTemplateArgs {
    /// The name of the debt
    name: String,

    /// The payment each month
    amount: Amount,

    /// The number of payments left, 0 for no end
    #[arg(long, default_value_t = 0)]
    months: u32,

    /// The year of the first payment. Defaults to the current year.
    #[arg(long)]
    start_year: Option<i32>,

    /// The month of the first payment, 1-12. Defaults to the current month.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
    start_month: Option<u8>,
}

impl DebtTemplateArgs {
    pub fn new(
        name: impl Into<String>,
        amount: impl Into<Amount>,
        months: u32,
        start: MonthArgs,
    ) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
            months,
            start_year: start.year,
            start_month: start.month,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    /// True when either part of the start month was given.
    pub fn has_start(&self) -> bool {
        self.start_year.is_some() || self.start_month.is_some()
    }

    /// The start month, filling in whatever was not given from `default`.
    pub fn start(&self, default: YearMonth) -> Result<YearMonth> {
        MonthArgs::new(self.start_year, self.start_month).resolve(default)
    }
}

/// Args for `carryover template update-fixed`.
#[derive(Debug, Parser, Clone)]
pub struct UpdateFixedArgs {
    /// The template index, as shown by `template list`
    index: usize,

    #[clap(flatten)]
    template: FixedTemplateArgs,
}

impl UpdateFixedArgs {
    pub fn new(index: usize, template: FixedTemplateArgs) -> Self {
        Self { index, template }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn template(&self) -> &FixedTemplateArgs {
        &self.template
    }
}

/// Args for `carryover template update-debt`. The start month is kept unless a new one is given.
#[derive(Debug, Parser, Clone)]
pub struct UpdateDebtArgs {
    /// The template index, as shown by `template list`
    index: usize,

    #[clap(flatten)]
    template: DebtTemplateArgs,
}

impl UpdateDebtArgs {
    pub fn new(index: usize, template: DebtTemplateArgs) -> Self {
        Self { index, template }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn template(&self) -> &DebtTemplateArgs {
        &self.template
    }
}

/// Selects a template by index.
#[derive(Debug, Parser, Clone)]
pub struct IndexArgs {
    /// The template index, as shown by `template list`
    index: usize,
}

impl IndexArgs {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// What to do with the theme.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ThemeChoice {
    Light,
    Dark,
    Toggle,
}

serde_plain::derive_display_from_serialize!(ThemeChoice);
serde_plain::derive_fromstr_from_deserialize!(ThemeChoice);

impl ThemeChoice {
    /// The theme to switch to, given the `current` one.
    pub fn apply(&self, current: Theme) -> Theme {
        match self {
            ThemeChoice::Light => Theme::Light,
            ThemeChoice::Dark => Theme::Dark,
            ThemeChoice::Toggle => current.toggled(),
        }
    }
}

/// Args for the `carryover theme` command.
#[derive(Debug, Parser, Clone)]
pub struct ThemeArgs {
    /// The theme to switch to. Prints the current theme when left out.
    choice: Option<ThemeChoice>,
}

impl ThemeArgs {
    pub fn new(choice: Option<ThemeChoice>) -> Self {
        Self { choice }
    }

    pub fn choice(&self) -> Option<ThemeChoice> {
        self.choice
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("carryover"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or CARRYOVER_HOME instead of relying on the default \
                carryover home directory. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from("carryover")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
