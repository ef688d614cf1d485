//! The wide monthly panel: one date axis, one column per indicator.
//!
//! Missing values are `None`, never NaN, so "the series had no observation
//! that month" stays distinguishable from a numeric value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::series::Observation;

/// Header of the date column in persisted panels.
pub const DATE_COLUMN: &str = "data";

/// Shape violations when assembling a panel from external data.
#[derive(Debug, Error, PartialEq)]
pub enum PanelError {
    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("dates are not strictly increasing at row {row}")]
    UnorderedDates { row: usize },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
}

/// One indicator column of a [`Panel`], aligned to the panel's date axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl PanelColumn {
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// Monthly multi-indicator table.
///
/// Invariants: `dates` is strictly increasing, and every column has exactly
/// `dates.len()` values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    dates: Vec<NaiveDate>,
    columns: Vec<PanelColumn>,
}

impl Panel {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assemble a panel, checking the date ordering and column lengths.
    pub fn from_parts(
        dates: Vec<NaiveDate>,
        columns: Vec<PanelColumn>,
    ) -> Result<Self, PanelError> {
        if let Some(row) = dates.windows(2).position(|w| w[0] >= w[1]) {
            return Err(PanelError::UnorderedDates { row: row + 1 });
        }
        for (i, column) in columns.iter().enumerate() {
            if column.values.len() != dates.len() {
                return Err(PanelError::LengthMismatch {
                    column: column.name.clone(),
                    expected: dates.len(),
                    actual: column.values.len(),
                });
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(PanelError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self { dates, columns })
    }

    /// Single-indicator panel from already-resampled monthly observations.
    pub(crate) fn from_monthly(name: &str, monthly: &[Observation]) -> Self {
        Self {
            dates: monthly.iter().map(|o| o.date).collect(),
            columns: vec![PanelColumn {
                name: name.to_string(),
                values: monthly.iter().map(|o| Some(o.value)).collect(),
            }],
        }
    }

    /// Used by the merger, which maintains the invariants itself.
    pub(crate) fn from_parts_unchecked(dates: Vec<NaiveDate>, columns: Vec<PanelColumn>) -> Self {
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(columns.iter().all(|c| c.values.len() == dates.len()));
        Self { dates, columns }
    }

    pub(crate) fn into_parts(self) -> (Vec<NaiveDate>, Vec<PanelColumn>) {
        (self.dates, self.columns)
    }

    /// True when the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of rows (months).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Number of indicator columns, excluding the date column.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[PanelColumn] {
        &self.columns
    }

    /// Indicator names in column order.
    pub fn indicators(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Value of `name` at `date`; `None` when the month or the value is missing.
    pub fn value(&self, date: NaiveDate, name: &str) -> Option<f64> {
        let row = self.dates.binary_search(&date).ok()?;
        self.column(name)?.get(row).copied().flatten()
    }

    /// Values of every column at `row`, in column order.
    pub fn row(&self, row: usize) -> Option<(NaiveDate, Vec<Option<f64>>)> {
        let date = *self.dates.get(row)?;
        Some((date, self.columns.iter().map(|c| c.values[row]).collect()))
    }

    /// First and last month covered.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }

    /// Missing-value count per indicator, in column order.
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.missing_count()))
            .collect()
    }
}
