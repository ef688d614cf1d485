//! Monthly resampling and outer-join of indicator series into a [`Panel`].
//!
//! Each series is collapsed to one value per calendar month (the observation
//! with the latest date in the month wins) and stamped with the month's last
//! day. Series are then outer-joined one after another on that date, so
//! every month covered by any series gets a row and gaps stay `None`.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::{month_end, Observation, Panel, PanelColumn, Series};

/// Collected series in merge order; the name becomes the column header.
pub type Indicators = Vec<(String, Series)>;

/// Collapse `series` to one observation per month, dated at month end.
///
/// Within a month the observation with the latest original date wins; on
/// equal dates the one seen last wins. Output is sorted ascending.
pub fn resample_monthly(series: &Series) -> Vec<Observation> {
    let mut by_month: BTreeMap<NaiveDate, Observation> = BTreeMap::new();
    for obs in series.iter() {
        let month = month_end(obs.date);
        match by_month.get(&month) {
            Some(kept) if kept.date > obs.date => {}
            _ => {
                by_month.insert(month, *obs);
            }
        }
    }
    by_month
        .into_iter()
        .map(|(month, obs)| Observation::new(month, obs.value))
        .collect()
}

/// Outer-join a monthly series onto `acc` as a new column `name`.
///
/// `monthly` must be sorted ascending without duplicate dates, which is what
/// [`resample_monthly`] produces. The result's dates are the sorted union of
/// both sides.
pub fn outer_join(acc: Panel, name: &str, monthly: &[Observation]) -> Panel {
    let (left_dates, left_columns) = acc.into_parts();

    let capacity = left_dates.len() + monthly.len();
    let mut dates = Vec::with_capacity(capacity);
    let mut left_rows: Vec<Option<usize>> = Vec::with_capacity(capacity);
    let mut right_values: Vec<Option<f64>> = Vec::with_capacity(capacity);

    let (mut i, mut j) = (0, 0);
    loop {
        let left = left_dates.get(i).copied();
        let right = monthly.get(j);
        match (left, right) {
            (Some(l), Some(r)) if l == r.date => {
                dates.push(l);
                left_rows.push(Some(i));
                right_values.push(Some(r.value));
                i += 1;
                j += 1;
            }
            (Some(l), Some(r)) if l < r.date => {
                dates.push(l);
                left_rows.push(Some(i));
                right_values.push(None);
                i += 1;
            }
            (Some(l), None) => {
                dates.push(l);
                left_rows.push(Some(i));
                right_values.push(None);
                i += 1;
            }
            (_, Some(r)) => {
                dates.push(r.date);
                left_rows.push(None);
                right_values.push(Some(r.value));
                j += 1;
            }
            (None, None) => break,
        }
    }

    let mut columns: Vec<PanelColumn> = left_columns
        .into_iter()
        .map(|column| PanelColumn {
            values: left_rows
                .iter()
                .map(|row| row.and_then(|k| column.values[k]))
                .collect(),
            name: column.name,
        })
        .collect();
    columns.push(PanelColumn {
        name: name.to_string(),
        values: right_values,
    });

    Panel::from_parts_unchecked(dates, columns)
}

/// Merge named series into one monthly panel.
///
/// Empty series are skipped. The first non-empty series seeds the panel and
/// the rest are outer-joined in order, so columns follow input order. A name
/// already present in the panel is skipped. Returns an empty panel when
/// nothing is left to merge.
pub fn merge_indicators(indicators: &[(String, Series)]) -> Panel {
    tracing::info!(series = indicators.len(), "merging indicators");

    let mut merged: Option<Panel> = None;
    for (name, series) in indicators {
        if series.is_empty() {
            tracing::debug!(key = %name, "skipping empty series");
            continue;
        }
        let monthly = resample_monthly(series);
        merged = Some(match merged {
            None => Panel::from_monthly(name, &monthly),
            Some(acc) if acc.has_column(name) => {
                tracing::warn!(key = %name, "duplicate indicator name, keeping the first");
                acc
            }
            Some(acc) => outer_join(acc, name, &monthly),
        });
    }

    merged.unwrap_or_default()
}
