//! Property tests for the merge.
//!
//! Uses proptest to verify:
//! 1. Outer-join completeness: panel dates are the union of resampled dates
//! 2. Monotonicity: panel dates strictly ascending
//! 3. Resample stability: resampling a month-end series changes nothing
//! 4. Alignment: every panel cell matches its resampled source value

use brmacro_core::domain::{month_end, Observation, Series};
use brmacro_core::merge::{merge_indicators, resample_monthly};
use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::BTreeSet;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + chrono::Duration::days(offset)
    })
}

fn arb_series() -> impl Strategy<Value = Series> {
    prop::collection::vec((arb_date(), -100.0..100.0_f64), 0..40).prop_map(|points| {
        Series::from_unsorted(
            points
                .into_iter()
                .map(|(date, value)| Observation::new(date, value))
                .collect(),
        )
    })
}

fn arb_indicators() -> impl Strategy<Value = Vec<(String, Series)>> {
    prop::collection::vec(arb_series(), 0..5).prop_map(|all| {
        all.into_iter()
            .enumerate()
            .map(|(i, series)| (format!("s{i}"), series))
            .collect()
    })
}

// ── 1 & 2. Completeness and monotonicity ─────────────────────────────

proptest! {
    #[test]
    fn panel_dates_are_the_union_of_months(indicators in arb_indicators()) {
        let panel = merge_indicators(&indicators);

        let expected: BTreeSet<NaiveDate> = indicators
            .iter()
            .flat_map(|(_, s)| s.iter().map(|o| month_end(o.date)))
            .collect();
        let actual: Vec<NaiveDate> = panel.dates().to_vec();

        prop_assert_eq!(actual, expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn panel_dates_strictly_increase(indicators in arb_indicators()) {
        let panel = merge_indicators(&indicators);
        for pair in panel.dates().windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for column in panel.columns() {
            prop_assert_eq!(column.values.len(), panel.len());
        }
    }

    #[test]
    fn only_non_empty_series_become_columns(indicators in arb_indicators()) {
        let panel = merge_indicators(&indicators);
        let expected: Vec<&str> = indicators
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(name, _)| name.as_str())
            .collect();
        prop_assert_eq!(panel.indicators(), expected);
    }
}

// ── 3. Resample stability ────────────────────────────────────────────

proptest! {
    #[test]
    fn resampling_is_idempotent(series in arb_series()) {
        let once = resample_monthly(&series);
        let again = resample_monthly(&Series::from_unsorted(once.clone()));
        prop_assert_eq!(once, again);
    }

    #[test]
    fn resampled_dates_are_month_ends(series in arb_series()) {
        for obs in resample_monthly(&series) {
            prop_assert_eq!(month_end(obs.date), obs.date);
        }
    }
}

// ── 4. Alignment ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn cells_match_resampled_values(indicators in arb_indicators()) {
        let panel = merge_indicators(&indicators);
        for (name, series) in indicators.iter().filter(|(_, s)| !s.is_empty()) {
            let monthly = resample_monthly(series);
            let present: BTreeSet<NaiveDate> = monthly.iter().map(|o| o.date).collect();
            for obs in &monthly {
                prop_assert_eq!(panel.value(obs.date, name), Some(obs.value));
            }
            for date in panel.dates() {
                if !present.contains(date) {
                    prop_assert_eq!(panel.value(*date, name), None);
                }
            }
        }
    }
}
