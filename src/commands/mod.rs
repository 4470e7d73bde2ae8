//! Command handlers for the carryover CLI.
//!
//! This module contains implementations for all CLI subcommands. Every command that touches the
//! budget opens a `Session`, does its work and closes the session, which saves everything.

mod entry;
mod init;
mod show;
mod template;
mod theme;

use crate::model::YearMonth;
use crate::session::Session;
use crate::store::{self, Mode};
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info, warn};

pub use entry::{entry_add, entry_apply, entry_clear, entry_delete, entry_set};
pub use init::init;
pub use show::{show, trend, MonthView};
pub use template::{
    template_add_debt, template_add_fixed, template_list, template_remove_debt,
    template_remove_fixed, template_update_debt, template_update_fixed, TemplateList,
};
pub use theme::theme;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Opens a session on the data in `config` and moves it to `month`.
async fn open(config: &Config, mode: Mode, month: YearMonth) -> Result<Session> {
    let mut session = Session::open(
        store::store(config, mode),
        config.debounce(),
        YearMonth::today(),
    )
    .await?;
    if session.current() != month {
        session.go_to(month).await?;
    }
    Ok(session)
}

/// Saves everything and reports any save that failed along the way.
async fn close(mut session: Session) -> Result<()> {
    for failure in session.failures() {
        warn!("Saving '{}' failed earlier: {}", failure.key, failure.reason);
    }
    session.close().await
}
