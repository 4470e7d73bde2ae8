//! The ledger store: every month the user has touched, keyed by year and month.

use crate::carry::compute_carry;
use crate::model::{Amount, MonthRecord, YearMonth};
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{trace, warn};

type Months = BTreeMap<u8, MonthRecord>;

/// Owns all `MonthRecord`s. Years are created whole (all twelve months, empty) the first time any
/// of their months is touched, so a realized month always has every category.
///
/// Persisted as `{ "<year>": { "<month 0-11>": MonthRecord } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ledger {
    years: BTreeMap<i32, Months>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from persisted JSON, healing anything malformed instead of failing. Keys
    /// that are not years or months are dropped, months that cannot be read become empty months
    /// and missing months of a known year are filled in.
    pub fn from_json(value: serde_json::Value) -> Self {
        let mut ledger = Self::new();
        let years = match value {
            serde_json::Value::Object(years) => years,
            serde_json::Value::Null => return ledger,
            other => {
                warn!("Ledger data is not an object ({other}), starting with an empty ledger");
                return ledger;
            }
        };

        for (year_key, months_value) in years {
            let Ok(year) = year_key.trim().parse::<i32>() else {
                warn!("Dropping ledger entry with invalid year '{year_key}'");
                continue;
            };
            let serde_json::Value::Object(months) = months_value else {
                warn!("Ledger year {year} is not an object, resetting it");
                ledger.ensure_year(year);
                continue;
            };
            for (month_key, record_value) in months {
                let Some(ym) = month_key
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .and_then(|m| YearMonth::new(year, m))
                else {
                    warn!("Dropping ledger entry with invalid month '{month_key}' in {year}");
                    continue;
                };
                let record = match serde_json::from_value::<MonthRecord>(record_value) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Unable to read {ym}, resetting it: {e}");
                        MonthRecord::default()
                    }
                };
                ledger.years.entry(year).or_default().insert(ym.month(), record);
            }
            ledger.ensure_year(year);
        }
        ledger
    }

    /// Serializes the whole ledger for persistence.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).context("Unable to serialize the ledger")
    }

    /// Creates `year` with twelve empty months if it does not exist. Existing months are kept.
    pub fn ensure_year(&mut self, year: i32) {
        let months = self.years.entry(year).or_default();
        for month in 0..12u8 {
            months.entry(month).or_default();
        }
    }

    /// The record for `ym`, if that month has been realized. Never creates anything.
    pub fn get(&self, ym: YearMonth) -> Option<&MonthRecord> {
        self.years.get(&ym.year()).and_then(|m| m.get(&ym.month()))
    }

    pub fn contains(&self, ym: YearMonth) -> bool {
        self.get(ym).is_some()
    }

    /// The record for `ym`, realizing its year first if needed.
    pub fn month_mut(&mut self, ym: YearMonth) -> &mut MonthRecord {
        if !self.years.contains_key(&ym.year()) {
            trace!("Initializing year {}", ym.year());
        }
        self.ensure_year(ym.year());
        self.years
            .entry(ym.year())
            .or_default()
            .entry(ym.month())
            .or_default()
    }

    /// The years present in the ledger, in order.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    /// Every realized month in chronological order.
    pub fn months(&self) -> impl Iterator<Item = (YearMonth, &MonthRecord)> {
        self.years.iter().flat_map(|(year, months)| {
            months.iter().filter_map(move |(month, record)| {
                YearMonth::new(*year, *month).map(|ym| (ym, record))
            })
        })
    }

    /// Every realized month in chronological order, mutably.
    pub fn months_mut(&mut self) -> impl Iterator<Item = (YearMonth, &mut MonthRecord)> {
        self.years.iter_mut().flat_map(|(year, months)| {
            let year = *year;
            months.iter_mut().filter_map(move |(month, record)| {
                YearMonth::new(year, *month).map(|ym| (ym, record))
            })
        })
    }

    /// Recomputes the opening balance of `ym` from the month before it and stores it. The previous
    /// month is only read, never created. Returns the carried balance.
    pub fn carry_into(&mut self, ym: YearMonth) -> Amount {
        let carried = Amount::new(compute_carry(self.get(ym.prev())));
        self.month_mut(ym).set_carried_balance(carried);
        carried
    }
}
