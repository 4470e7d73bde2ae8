//! Types that represent the core data model, such as `MonthRecord` and the templates.
mod amount;
mod entry;
mod month;
mod record;
mod template;
mod theme;

pub use amount::{Amount, AmountError};
pub(crate) use entry::same_name;
pub use entry::{
    AmountEntry, Category, DebtEntry, Field, FixedExpense, Origin, PlannedEntry, Row,
};
pub use month::YearMonth;
pub use record::MonthRecord;
pub(crate) use record::EMPTY_RECORD;
pub(crate) use template::WireDebtTemplate;
pub use template::{DebtTemplate, FixedExpenseTemplate};
pub use theme::Theme;
