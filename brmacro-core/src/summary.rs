//! Summary report over the processed panel.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::Panel;
use crate::store::{SeriesStore, StoreError};

/// Status reported when there is no processed data.
pub const NO_DATA_STATUS: &str = "Nenhum dado encontrado";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    /// Panel rows, one per month.
    pub total_records: usize,
    pub date_range: DateRange,
    /// Column names in panel order.
    pub indicators: Vec<String>,
    /// Missing cells per indicator.
    pub missing_data: BTreeMap<String, usize>,
    /// When the summary was generated, `YYYY-MM-DD HH:MM:SS`.
    pub last_update: String,
}

/// Serializes either as the summary fields or as `{"status": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryReport {
    Available(DataSummary),
    NoData { status: String },
}

impl SummaryReport {
    pub fn no_data() -> Self {
        SummaryReport::NoData {
            status: NO_DATA_STATUS.to_string(),
        }
    }

    pub fn from_panel(panel: &Panel) -> Self {
        summarize(panel)
            .map(SummaryReport::Available)
            .unwrap_or_else(SummaryReport::no_data)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SummaryReport::Available(_))
    }
}

/// Summarize `panel`, stamped with the current local time. `None` when the
/// panel has no rows.
pub fn summarize(panel: &Panel) -> Option<DataSummary> {
    summarize_at(panel, chrono::Local::now().naive_local())
}

pub fn summarize_at(panel: &Panel, generated_at: NaiveDateTime) -> Option<DataSummary> {
    let (start, end) = panel.date_range()?;
    Some(DataSummary {
        total_records: panel.len(),
        date_range: DateRange { start, end },
        indicators: panel.indicators().into_iter().map(str::to_string).collect(),
        missing_data: panel.missing_counts().into_iter().collect(),
        last_update: generated_at.format(TIMESTAMP_FORMAT).to_string(),
    })
}

/// Load the processed panel from `store` and summarize it.
pub fn get_data_summary(store: &SeriesStore) -> Result<SummaryReport, StoreError> {
    let panel = store.load_panel()?;
    Ok(SummaryReport::from_panel(&panel))
}
