//! brmacro core: Brazilian macro series collection and monthly panel merge.
//!
//! This crate contains:
//! - The series catalog and TOML configuration
//! - Fetchers for the IBGE aggregates API and the BCB SGS API
//! - Monthly resampling and the outer-join merge into a wide panel
//! - Raw and processed storage (CSV, metadata sidecars, Parquet snapshot)
//! - The update orchestrator and the summary report

pub mod catalog;
pub mod config;
pub mod data;
pub mod domain;
pub mod merge;
pub mod store;
pub mod summary;
pub mod update;

pub use catalog::{Catalog, Provider, SeriesDescriptor};
pub use config::{AppConfig, ConfigError};
pub use data::{DataError, FetchOutcome, HttpFetcher, SeriesSource};
pub use domain::{Observation, Panel, PanelColumn, Series};
pub use merge::{merge_indicators, resample_monthly};
pub use store::{SeriesStore, StoreError};
pub use summary::{get_data_summary, DataSummary, SummaryReport};
pub use update::{TracingObserver, UpdateError, UpdateObserver, Updater};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: data types can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Series>();
        require_sync::<Series>();
        require_send::<Panel>();
        require_sync::<Panel>();
        require_send::<Catalog>();
        require_sync::<Catalog>();
        require_send::<FetchOutcome>();
        require_send::<AppConfig>();
        require_send::<SeriesStore>();
        require_send::<HttpFetcher>();
    }
}
