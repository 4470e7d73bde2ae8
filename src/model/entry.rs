//! The rows that make up the categories of a month.

use crate::model::Amount;
use serde::{Deserialize, Deserializer, Serialize};

/// The six categories of a month.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Income,
    FixedExpenses,
    OtherExpenses,
    Debt,
    Investment,
    TravelEntertainment,
}

serde_plain::derive_display_from_serialize!(Category);
serde_plain::derive_fromstr_from_deserialize!(Category);

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Income,
        Category::FixedExpenses,
        Category::OtherExpenses,
        Category::Debt,
        Category::Investment,
        Category::TravelEntertainment,
    ];

    /// A human-readable label, e.g. "Travel and Entertainment".
    pub fn label(&self) -> &'static str {
        match self {
            Category::Income => "Income",
            Category::FixedExpenses => "Fixed Expenses",
            Category::OtherExpenses => "Other Expenses",
            Category::Debt => "Debt",
            Category::Investment => "Investment",
            Category::TravelEntertainment => "Travel and Entertainment",
        }
    }

    /// Whether rows in this category have `planned` and `actual` rather than `amount`.
    pub fn is_planned(&self) -> bool {
        matches!(self, Category::FixedExpenses | Category::TravelEntertainment)
    }
}

/// The editable fields of a row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Amount,
    Planned,
    Actual,
}

serde_plain::derive_display_from_serialize!(Field);
serde_plain::derive_fromstr_from_deserialize!(Field);

/// Where a row came from. Template-derived rows keep a weak back-reference to the template that
/// produced them; nothing is owned through it and the row outlives the template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Typed in by the user (or legacy data with no template marker).
    #[default]
    User,
    /// Produced by materializing a template. `template_id` is the template's index at the time.
    Template { template_id: Option<usize> },
}

impl Origin {
    pub fn is_template(&self) -> bool {
        matches!(self, Origin::Template { .. })
    }

    fn from_wire(from_template: bool, template_id: Option<usize>) -> Self {
        if from_template {
            Origin::Template { template_id }
        } else {
            Origin::User
        }
    }

    fn to_wire(self) -> (bool, Option<usize>) {
        match self {
            Origin::User => (false, None),
            Origin::Template { template_id } => (true, template_id),
        }
    }
}

/// Operations shared by every kind of row so that month editing can be written once.
pub trait Row: Default {
    fn name(&self) -> &str;

    /// Sets `field` from user input. Numeric input that does not parse becomes zero. Returns
    /// `false` if this kind of row has no such field.
    fn set(&mut self, field: Field, value: &str) -> bool;

    /// A row with no name and no money in it.
    fn is_blank(&self) -> bool;
}

/// A row with a single amount: income, other expenses and investments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountEntry {
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default)]
    pub amount: Amount,
}

impl AmountEntry {
    pub fn new(name: impl Into<String>, amount: impl Into<Amount>) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
        }
    }
}

impl Row for AmountEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&mut self, field: Field, value: &str) -> bool {
        match field {
            Field::Name => self.name = value.to_string(),
            Field::Amount => self.amount = Amount::parse_input(value),
            Field::Planned | Field::Actual => return false,
        }
        true
    }

    fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.amount.is_zero()
    }
}

/// A row with a planned and an actual amount: travel and entertainment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedEntry {
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default)]
    pub planned: Amount,
    #[serde(default)]
    pub actual: Amount,
}

impl PlannedEntry {
    pub fn new(name: impl Into<String>, planned: impl Into<Amount>, actual: impl Into<Amount>) -> Self {
        Self {
            name: name.into(),
            planned: planned.into(),
            actual: actual.into(),
        }
    }

    /// What is left of the plan: `planned - actual`. Negative when overspent.
    pub fn variance(&self) -> Amount {
        Amount::new(self.planned.value() - self.actual.value())
    }
}

impl Row for PlannedEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&mut self, field: Field, value: &str) -> bool {
        set_planned_field(&mut self.name, &mut self.planned, &mut self.actual, field, value)
    }

    fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.planned.is_zero() && self.actual.is_zero()
    }
}

/// A fixed expense row. These can be materialized from fixed expense templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireFixedExpense", into = "WireFixedExpense")]
pub struct FixedExpense {
    pub name: String,
    pub planned: Amount,
    pub actual: Amount,
    pub origin: Origin,
}

impl FixedExpense {
    pub fn new(name: impl Into<String>, planned: impl Into<Amount>, actual: impl Into<Amount>) -> Self {
        Self {
            name: name.into(),
            planned: planned.into(),
            actual: actual.into(),
            origin: Origin::User,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// What is left of the plan: `planned - actual`. Negative when overspent.
    pub fn variance(&self) -> Amount {
        Amount::new(self.planned.value() - self.actual.value())
    }
}

impl Row for FixedExpense {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&mut self, field: Field, value: &str) -> bool {
        set_planned_field(&mut self.name, &mut self.planned, &mut self.actual, field, value)
    }

    fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.planned.is_zero() && self.actual.is_zero()
    }
}

/// A debt payment row. These can be materialized from debt templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireDebtEntry", into = "WireDebtEntry")]
pub struct DebtEntry {
    pub name: String,
    pub amount: Amount,
    pub origin: Origin,
}

impl DebtEntry {
    pub fn new(name: impl Into<String>, amount: impl Into<Amount>) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
            origin: Origin::User,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}

impl Row for DebtEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&mut self, field: Field, value: &str) -> bool {
        match field {
            Field::Name => self.name = value.to_string(),
            Field::Amount => self.amount = Amount::parse_input(value),
            Field::Planned | Field::Actual => return false,
        }
        true
    }

    fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.amount.is_zero()
    }
}

fn set_planned_field(
    name: &mut String,
    planned: &mut Amount,
    actual: &mut Amount,
    field: Field,
    value: &str,
) -> bool {
    match field {
        Field::Name => *name = value.to_string(),
        Field::Planned => *planned = Amount::parse_input(value),
        Field::Actual => *actual = Amount::parse_input(value),
        Field::Amount => return false,
    }
    true
}

/// Case-insensitive name comparison used for template matching.
pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// The persisted shape of a fixed expense, which carries the legacy `fromTemplate` and
/// `templateId` fields instead of `Origin`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFixedExpense {
    #[serde(default, deserialize_with = "lenient_name")]
    name: String,
    #[serde(default)]
    planned: Amount,
    #[serde(default)]
    actual: Amount,
    #[serde(default, deserialize_with = "lenient_flag", skip_serializing_if = "is_false")]
    from_template: bool,
    #[serde(default, deserialize_with = "lenient_index", skip_serializing_if = "Option::is_none")]
    template_id: Option<usize>,
}

impl From<WireFixedExpense> for FixedExpense {
    fn from(w: WireFixedExpense) -> Self {
        Self {
            name: w.name,
            planned: w.planned,
            actual: w.actual,
            origin: Origin::from_wire(w.from_template, w.template_id),
        }
    }
}

impl From<FixedExpense> for WireFixedExpense {
    fn from(e: FixedExpense) -> Self {
        let (from_template, template_id) = e.origin.to_wire();
        Self {
            name: e.name,
            planned: e.planned,
            actual: e.actual,
            from_template,
            template_id,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDebtEntry {
    #[serde(default, deserialize_with = "lenient_name")]
    name: String,
    #[serde(default)]
    amount: Amount,
    #[serde(default, deserialize_with = "lenient_flag", skip_serializing_if = "is_false")]
    from_template: bool,
    #[serde(default, deserialize_with = "lenient_index", skip_serializing_if = "Option::is_none")]
    template_id: Option<usize>,
}

impl From<WireDebtEntry> for DebtEntry {
    fn from(w: WireDebtEntry) -> Self {
        Self {
            name: w.name,
            amount: w.amount,
            origin: Origin::from_wire(w.from_template, w.template_id),
        }
    }
}

impl From<DebtEntry> for WireDebtEntry {
    fn from(e: DebtEntry) -> Self {
        let (from_template, template_id) = e.origin.to_wire();
        Self {
            name: e.name,
            amount: e.amount,
            from_template,
            template_id,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Names are usually strings, but anything else is tolerated: numbers keep their text and
/// everything else becomes empty.
pub(crate) fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(
        serde_json::Value::deserialize(deserializer)?,
        serde_json::Value::Bool(true)
    ))
}

fn lenient_index<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(serde_json::Value::deserialize(deserializer)?
        .as_u64()
        .and_then(|n| usize::try_from(n).ok()))
}
