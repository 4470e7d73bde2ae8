//! carryover: a monthly budget ledger.
//!
//! Months hold income, expenses, debt payments and investments. Whatever is left over at the end
//! of a month is carried into the next. Fixed expense and debt templates are materialized into
//! the current and future months they apply to, and every edit is saved in the background after
//! a short quiet period.
//!
//! The entry point for library users is `session::Session`.

pub mod args;
pub mod carry;
pub mod commands;
mod config;
mod error;
pub mod ledger;
pub mod model;
pub mod persist;
pub mod session;
pub mod store;
pub mod summary;
pub mod templates;
mod utils;

#[cfg(test)]
mod test;

pub use config::Config;
pub use error::{Error, LedgerError, Result};
pub use store::Mode;
