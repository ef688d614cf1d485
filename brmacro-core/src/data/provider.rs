//! Series source trait, fetch outcomes and structured fetch errors.
//!
//! The `SeriesSource` trait abstracts over the HTTP providers so the update
//! orchestrator can run against an in-memory stub in tests.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::{Provider, SeriesDescriptor};
use crate::domain::Series;

/// Why a provider call produced no usable data.
///
/// These never reach the orchestrator as errors: the fetcher turns them into
/// [`FetchOutcome::SourceUnavailable`].
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result of one fetch call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The provider answered; the series may still be empty when every item
    /// was a sentinel.
    Success(Series),
    /// Network failure, error status or malformed body.
    SourceUnavailable { reason: String },
}

impl FetchOutcome {
    pub fn unavailable(err: &DataError) -> Self {
        FetchOutcome::SourceUnavailable {
            reason: err.to_string(),
        }
    }

    /// Collapse to a series; unavailability becomes an empty series.
    pub fn into_series(self) -> Series {
        match self {
            FetchOutcome::Success(series) => series,
            FetchOutcome::SourceUnavailable { .. } => Series::empty(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    /// Number of observations, zero when unavailable.
    pub fn len(&self) -> usize {
        match self {
            FetchOutcome::Success(series) => series.len(),
            FetchOutcome::SourceUnavailable { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Result<Series, DataError>> for FetchOutcome {
    fn from(result: Result<Series, DataError>) -> Self {
        match result {
            Ok(series) => FetchOutcome::Success(series),
            Err(err) => FetchOutcome::unavailable(&err),
        }
    }
}

/// A numeric field that providers send either as a JSON string or number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawValue {
    Text(String),
    Number(f64),
}

/// Anything that can fetch a provider series.
pub trait SeriesSource {
    /// Fetch `code` from `provider`, starting at `since`.
    ///
    /// Implementations must not fail: errors are reported as
    /// [`FetchOutcome::SourceUnavailable`].
    fn fetch(&self, provider: Provider, code: &str, since: NaiveDate) -> FetchOutcome;

    /// Fetch the series a catalog entry points at.
    fn fetch_descriptor(&self, descriptor: &SeriesDescriptor, since: NaiveDate) -> FetchOutcome {
        self.fetch(descriptor.provider, &descriptor.code, since)
    }

    /// Fetch and collapse to a series, empty when the source is unavailable.
    fn fetch_series(&self, provider: Provider, code: &str, since: NaiveDate) -> Series {
        self.fetch(provider, code, since).into_series()
    }
}
