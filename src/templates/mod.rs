//! Recurring rows: the template registry and the code that projects templates into months.

mod materialize;
mod registry;

pub use materialize::{
    apply_template_to_month, available_templates, materialize, retract_debt, retract_fixed,
    AvailableTemplate, Materialized,
};
pub use registry::TemplateRegistry;

use serde::{Deserialize, Serialize};

/// The two kinds of template.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Fixed,
    Debt,
}

serde_plain::derive_display_from_serialize!(TemplateKind);
serde_plain::derive_fromstr_from_deserialize!(TemplateKind);

impl TemplateKind {
    pub fn label(&self) -> &'static str {
        match self {
            TemplateKind::Fixed => "fixed expense",
            TemplateKind::Debt => "debt",
        }
    }
}
