//! Reusable definitions of recurring rows.

use crate::error::LedgerError;
use crate::model::entry::lenient_name;
use crate::model::{Amount, YearMonth};
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};

/// A fixed expense that should appear in every current and future month, e.g. rent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedExpenseTemplate {
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default)]
    pub planned: Amount,
}

impl FixedExpenseTemplate {
    pub fn new(name: impl Into<String>, planned: impl Into<Amount>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            planned: planned.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate("fixed expense", &self.name, self.planned)
    }
}

/// A debt payment that applies for a number of months starting at `start`, or forever when
/// `months_remaining` is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "WireDebtTemplate")]
pub struct DebtTemplate {
    pub name: String,
    pub amount: Amount,
    pub months_remaining: u32,
    pub start: YearMonth,
}

impl DebtTemplate {
    pub fn new(
        name: impl Into<String>,
        amount: impl Into<Amount>,
        months_remaining: u32,
        start: YearMonth,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            amount: amount.into(),
            months_remaining,
            start,
        }
    }

    /// True when `months_remaining` is zero, meaning the template applies to every month.
    pub fn is_unlimited(&self) -> bool {
        self.months_remaining == 0
    }

    /// Whether this template produces a row in `month`. Unlimited templates always apply;
    /// otherwise the template applies to the `months_remaining` months beginning with `start`.
    pub fn should_apply(&self, month: YearMonth) -> bool {
        if self.is_unlimited() {
            return true;
        }
        let elapsed = month.months_since(self.start);
        (0..i64::from(self.months_remaining)).contains(&elapsed)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate("debt", &self.name, self.amount)
    }
}

fn validate(kind: &'static str, name: &str, amount: Amount) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::InvalidTemplate {
            kind,
            reason: "the name is empty".to_string(),
        }
        .into());
    }
    if amount.is_negative() {
        return Err(LedgerError::InvalidTemplate {
            kind,
            reason: format!("the amount {amount} is negative"),
        }
        .into());
    }
    Ok(())
}

/// The persisted shape of a debt template. Older data may lack the start month, which is filled
/// in when the template is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDebtTemplate {
    #[serde(default, deserialize_with = "lenient_name")]
    name: String,
    #[serde(default)]
    amount: Amount,
    #[serde(default, deserialize_with = "lenient_months")]
    months_remaining: u32,
    #[serde(default, deserialize_with = "lenient_start_month")]
    start_month: Option<u8>,
    #[serde(default, deserialize_with = "lenient_start_year")]
    start_year: Option<i32>,
}

impl WireDebtTemplate {
    /// Builds the template, using `default_start` if the start month or year is missing.
    pub(crate) fn heal(self, default_start: YearMonth) -> DebtTemplate {
        let start = match (self.start_year, self.start_month) {
            (Some(year), Some(month)) => YearMonth::new(year, month).unwrap_or(default_start),
            _ => default_start,
        };
        DebtTemplate::new(self.name, self.amount, self.months_remaining, start)
    }

    pub(crate) fn has_start(&self) -> bool {
        matches!(
            (self.start_year, self.start_month),
            (Some(_), Some(month)) if month < 12
        )
    }
}

impl From<DebtTemplate> for WireDebtTemplate {
    fn from(t: DebtTemplate) -> Self {
        Self {
            name: t.name,
            amount: t.amount,
            months_remaining: t.months_remaining,
            start_month: Some(t.start.month()),
            start_year: Some(t.start.year()),
        }
    }
}

/// Zero or negative means unlimited, fractions are truncated and text is parsed.
fn lenient_months<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let n = match &value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or_default(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or_default(),
        _ => 0.0,
    };
    if n.is_finite() && n > 0.0 {
        Ok(n.min(f64::from(u32::MAX)) as u32)
    } else {
        Ok(0)
    }
}

fn lenient_start_month<'de, D>(deserializer: D) -> std::result::Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(serde_json::Value::deserialize(deserializer)?
        .as_u64()
        .and_then(|n| u8::try_from(n).ok()))
}

fn lenient_start_year<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(serde_json::Value::deserialize(deserializer)?
        .as_i64()
        .and_then(|n| i32::try_from(n).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ym(year: i32, month: u8) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_debt_window_boundary() {
        let loan = DebtTemplate::new("Loan", 250.0, 3, ym(2024, 0));
        assert!(!loan.should_apply(ym(2023, 11)));
        assert!(loan.should_apply(ym(2024, 0)));
        assert!(loan.should_apply(ym(2024, 1)));
        assert!(loan.should_apply(ym(2024, 2)));
        assert!(!loan.should_apply(ym(2024, 3)));
    }

    #[test]
    fn test_unlimited_debt_always_applies() {
        let card = DebtTemplate::new("Card", 50.0, 0, ym(2030, 5));
        assert!(card.is_unlimited());
        assert!(card.should_apply(ym(1999, 0)));
        assert!(card.should_apply(ym(2100, 11)));
    }

    #[test]
    fn test_debt_template_wire_format() {
        let loan = DebtTemplate::new(" Loan ", 500.0, 12, ym(2024, 4));
        assert_eq!(loan.name, "Loan");
        let value = serde_json::to_value(&loan).unwrap();
        assert_eq!(
            value,
            json!({"name": "Loan", "amount": 500.0, "monthsRemaining": 12, "startMonth": 4, "startYear": 2024})
        );
        let wire: WireDebtTemplate = serde_json::from_value(value).unwrap();
        assert!(wire.has_start());
        assert_eq!(wire.heal(ym(1970, 0)), loan);
    }

    #[test]
    fn test_legacy_debt_template_is_healed() {
        let wire: WireDebtTemplate = serde_json::from_value(json!({
            "name": "Phone",
            "amount": "45",
            "monthsRemaining": -2
        }))
        .unwrap();
        assert!(!wire.has_start());
        let healed = wire.heal(ym(2025, 6));
        assert_eq!(healed.start, ym(2025, 6));
        assert_eq!(healed.amount.value(), 45.0);
        assert!(healed.is_unlimited());
    }

    #[test]
    fn test_validate() {
        assert!(FixedExpenseTemplate::new("Rent", 1200.0).validate().is_ok());
        assert!(FixedExpenseTemplate::new("Rent", 0.0).validate().is_ok());
        let err = FixedExpenseTemplate::new("   ", 1.0).validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InvalidTemplate { .. })
        ));
        assert!(DebtTemplate::new("Loan", -1.0, 0, ym(2024, 0))
            .validate()
            .is_err());
    }
}
