//! Domain types: observations, series and the monthly panel.

pub mod panel;
pub mod series;

pub use panel::{Panel, PanelColumn, PanelError, DATE_COLUMN};
pub use series::{month_end, Observation, Series};
