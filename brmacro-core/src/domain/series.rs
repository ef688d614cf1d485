//! Observations and per-indicator series.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single dated value parsed from a provider response.
///
/// Sentinel and null values never become an `Observation`; they are dropped
/// by the provider parsers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Observations for one indicator, sorted ascending by date.
///
/// Several observations may share a calendar month (daily series); they are
/// collapsed by the monthly resampler, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    observations: Vec<Observation>,
}

impl Series {
    /// Build a series from observations in any order.
    ///
    /// The sort is stable so that observations sharing a date keep their
    /// arrival order.
    pub fn from_unsorted(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.date);
        Self { observations }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }
}

impl FromIterator<Observation> for Series {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Self::from_unsorted(iter.into_iter().collect())
    }
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn from_unsorted_orders_by_date() {
        let series = Series::from_unsorted(vec![
            Observation::new(d(2023, 3, 1), 3.0),
            Observation::new(d(2023, 1, 1), 1.0),
            Observation::new(d(2023, 2, 1), 2.0),
        ]);

        let values: Vec<f64> = series.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.first_date(), Some(d(2023, 1, 1)));
        assert_eq!(series.last_date(), Some(d(2023, 3, 1)));
    }

    #[test]
    fn equal_dates_keep_arrival_order() {
        let series = Series::from_unsorted(vec![
            Observation::new(d(2023, 1, 5), 1.0),
            Observation::new(d(2023, 1, 5), 2.0),
        ]);
        assert_eq!(series.observations()[1].value, 2.0);
    }

    #[test]
    fn month_end_handles_december_and_leap_years() {
        assert_eq!(month_end(d(2023, 12, 15)), d(2023, 12, 31));
        assert_eq!(month_end(d(2024, 2, 1)), d(2024, 2, 29));
        assert_eq!(month_end(d(2023, 2, 28)), d(2023, 2, 28));
        assert_eq!(month_end(d(2023, 4, 30)), d(2023, 4, 30));
    }
}
