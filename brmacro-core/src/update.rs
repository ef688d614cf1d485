//! Update orchestrator: fetch every catalog series, save the raw files,
//! merge into a monthly panel and save it.
//!
//! Strictly sequential. After every fetch, successful or not, the updater
//! pauses for the configured rate-limit delay.

use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::Catalog;
use crate::config::ApiConfig;
use crate::data::{FetchOutcome, SeriesSource};
use crate::domain::Panel;
use crate::merge::{merge_indicators, Indicators};
use crate::store::{SeriesStore, StoreError};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("unknown series '{0}'")]
    UnknownSeries(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Progress callback for an update run.
pub trait UpdateObserver {
    /// Called before fetching a series.
    fn on_start(&self, key: &str, index: usize, total: usize);

    /// Called after a fetch returns.
    fn on_complete(&self, key: &str, index: usize, total: usize, outcome: &FetchOutcome);

    /// Called once every series has been tried.
    fn on_batch_complete(&self, collected: usize, total: usize);
}

/// Reports progress as `tracing` events.
pub struct TracingObserver;

impl UpdateObserver for TracingObserver {
    fn on_start(&self, key: &str, index: usize, total: usize) {
        tracing::debug!(key, position = index + 1, total, "fetching series");
    }

    fn on_complete(&self, key: &str, _index: usize, _total: usize, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Success(series) if series.is_empty() => {
                tracing::warn!(key, "no data returned")
            }
            FetchOutcome::Success(series) => {
                tracing::info!(key, records = series.len(), "series fetched")
            }
            FetchOutcome::SourceUnavailable { reason } => {
                tracing::warn!(key, reason = %reason, "source unavailable")
            }
        }
    }

    fn on_batch_complete(&self, collected: usize, total: usize) {
        tracing::info!(collected, total, "collection finished");
    }
}

/// Runs collection and merge over a catalog.
pub struct Updater<'a> {
    source: &'a dyn SeriesSource,
    store: &'a SeriesStore,
    catalog: &'a Catalog,
    since: NaiveDate,
    delay: Duration,
    observer: &'a dyn UpdateObserver,
}

impl<'a> Updater<'a> {
    pub fn new(
        source: &'a dyn SeriesSource,
        store: &'a SeriesStore,
        catalog: &'a Catalog,
        api: &ApiConfig,
    ) -> Self {
        Self {
            source,
            store,
            catalog,
            since: api.since_date(),
            delay: api.rate_limit_delay(),
            observer: &TracingObserver,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn UpdateObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_since(mut self, since: NaiveDate) -> Self {
        self.since = since;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn pause(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }

    /// Fetch every series in collection order and save the non-empty ones.
    ///
    /// Returns the collected series keyed by catalog key, in fetch order.
    pub fn collect_indicators(&self) -> Result<Indicators, StoreError> {
        let order = self.catalog.collection_order();
        let total = order.len();
        let mut indicators: Indicators = Vec::with_capacity(total);

        for (i, descriptor) in order.into_iter().enumerate() {
            self.observer.on_start(&descriptor.key, i, total);
            let outcome = self.source.fetch_descriptor(descriptor, self.since);
            self.observer.on_complete(&descriptor.key, i, total, &outcome);

            let series = outcome.into_series();
            if !series.is_empty() {
                self.store.write_raw(descriptor, &series)?;
                indicators.push((descriptor.key.clone(), series));
            }
            self.pause();
        }

        self.observer.on_batch_complete(indicators.len(), total);
        Ok(indicators)
    }

    /// Fetch a single catalog entry and save it when it has data.
    pub fn collect_one(&self, key: &str) -> Result<FetchOutcome, UpdateError> {
        let descriptor = self
            .catalog
            .get(key)
            .ok_or_else(|| UpdateError::UnknownSeries(key.to_string()))?;

        self.observer.on_start(key, 0, 1);
        let outcome = self.source.fetch_descriptor(descriptor, self.since);
        self.observer.on_complete(key, 0, 1, &outcome);

        if let FetchOutcome::Success(series) = &outcome {
            if !series.is_empty() {
                self.store.write_raw(descriptor, series)?;
            }
        }
        self.observer
            .on_batch_complete(usize::from(!outcome.is_empty()), 1);
        Ok(outcome)
    }

    /// Full run: collect, merge, save the panel when it has rows.
    ///
    /// Fetch failures only shrink the panel. Storage failures abort the run.
    /// An empty panel is returned (and the previous processed file left in
    /// place) when nothing could be collected.
    pub fn update_all(&self) -> Result<Panel, StoreError> {
        tracing::info!(series = self.catalog.len(), since = %self.since, "starting update");

        let indicators = self.collect_indicators()?;
        let panel = merge_indicators(&indicators);

        match panel.date_range() {
            Some((start, end)) => {
                self.store.write_panel(&panel)?;
                tracing::info!(
                    start = %start,
                    end = %end,
                    records = panel.len(),
                    indicators = %panel.indicators().join(", "),
                    "update finished"
                );
            }
            None => tracing::warn!("no data collected, processed panel not updated"),
        }

        Ok(panel)
    }
}
