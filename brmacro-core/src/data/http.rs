//! Blocking HTTP fetcher for both providers.
//!
//! One GET per series with a fixed timeout. Connect and timeout failures are
//! retried up to `max_retries` times after the fixed rate-limit pause; any
//! HTTP response, successful or not, ends the attempt loop.

use chrono::NaiveDate;
use reqwest::blocking::Client;
use std::time::Duration;

use super::provider::{DataError, FetchOutcome, SeriesSource};
use super::{bcb, ibge};
use crate::catalog::{Provider, SeriesDescriptor, DEFAULT_SIDRA_VARIABLE};
use crate::config::ApiConfig;
use crate::domain::Series;

const USER_AGENT: &str = concat!("brmacro/", env!("CARGO_PKG_VERSION"));

/// HTTP source for the IBGE and BCB APIs.
pub struct HttpFetcher {
    client: Client,
    ibge_base_url: String,
    bcb_base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(api: &ApiConfig) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(api.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            ibge_base_url: api.ibge_base_url.clone(),
            bcb_base_url: api.bcb_base_url.clone(),
            max_retries: api.max_retries,
            retry_delay: api.rate_limit_delay(),
        })
    }

    /// Fetch without collapsing errors.
    pub fn try_fetch(
        &self,
        provider: Provider,
        code: &str,
        variable: Option<&str>,
        since: NaiveDate,
    ) -> Result<Series, DataError> {
        let until = chrono::Local::now().date_naive();
        if since > until {
            return Err(DataError::InvalidRequest(format!(
                "start date {since} is in the future"
            )));
        }

        let observations = match provider {
            Provider::StatisticsAgency => {
                let variable = variable.unwrap_or(DEFAULT_SIDRA_VARIABLE);
                let url = ibge::request_url(&self.ibge_base_url, code, variable, since, until);
                let query: Vec<(&str, String)> = ibge::QUERY
                    .iter()
                    .map(|(k, v)| (*k, v.to_string()))
                    .collect();
                let body = self.get_text(&url, &query)?;
                ibge::parse_body(&body)?
            }
            Provider::CentralBank => {
                let url = bcb::request_url(&self.bcb_base_url, code);
                let body = self.get_text(&url, &bcb::query(since, until))?;
                bcb::parse_body(&body)?
            }
        };

        Ok(Series::from_unsorted(observations))
    }

    /// Execute a GET with the connect/timeout retry policy and return the body.
    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.retry_delay);
            }

            match self.client.get(url).query(query).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if !status.is_success() {
                        return Err(DataError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                    return resp.text().map_err(|e| {
                        DataError::ResponseFormatChanged(format!("failed to read body: {e}"))
                    });
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    tracing::warn!(url, attempt, error = %e, "request failed, will retry");
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            }
        }

        Err(last_error
            .unwrap_or_else(|| DataError::NetworkUnreachable("max retries exceeded".into())))
    }

    fn fetch_logged(
        &self,
        provider: Provider,
        code: &str,
        variable: Option<&str>,
        since: NaiveDate,
    ) -> FetchOutcome {
        tracing::info!(provider = %provider, code, "collecting series");
        match self.try_fetch(provider, code, variable, since) {
            Ok(series) => {
                tracing::info!(
                    provider = %provider,
                    code,
                    records = series.len(),
                    "series collected"
                );
                FetchOutcome::Success(series)
            }
            Err(err) => {
                tracing::error!(
                    provider = %provider,
                    code,
                    error = %err,
                    "failed to collect series"
                );
                FetchOutcome::unavailable(&err)
            }
        }
    }
}

impl SeriesSource for HttpFetcher {
    fn fetch(&self, provider: Provider, code: &str, since: NaiveDate) -> FetchOutcome {
        self.fetch_logged(provider, code, None, since)
    }

    fn fetch_descriptor(&self, descriptor: &SeriesDescriptor, since: NaiveDate) -> FetchOutcome {
        self.fetch_logged(
            descriptor.provider,
            &descriptor.code,
            descriptor.variable.as_deref(),
            since,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> ApiConfig {
        ApiConfig {
            timeout_secs: 1,
            max_retries: 0,
            rate_limit_delay_secs: 0,
            // Port 9 (discard) on localhost refuses connections.
            ibge_base_url: "http://127.0.0.1:9/agregados".into(),
            bcb_base_url: "http://127.0.0.1:9/serie".into(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn connection_failure_degrades_to_unavailable() {
        let fetcher = HttpFetcher::new(&unreachable_config()).unwrap();
        let since = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();

        let outcome = fetcher.fetch(Provider::CentralBank, "432", since);
        assert!(!outcome.is_available());
        assert!(fetcher
            .fetch_series(Provider::StatisticsAgency, "4099", since)
            .is_empty());
    }

    #[test]
    fn future_start_date_is_rejected_before_any_request() {
        let fetcher = HttpFetcher::new(&unreachable_config()).unwrap();
        let since = chrono::Local::now().date_naive() + chrono::Duration::days(30);
        let err = fetcher
            .try_fetch(Provider::CentralBank, "432", None, since)
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidRequest(_)));
    }
}
