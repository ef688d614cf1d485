//! Provider access: request building, response parsing and the HTTP fetcher.

pub mod bcb;
pub mod http;
pub mod ibge;
pub mod provider;

pub use http::HttpFetcher;
pub use provider::{DataError, FetchOutcome, SeriesSource};
