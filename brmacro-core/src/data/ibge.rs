//! IBGE (SIDRA aggregates API) request building and response parsing.
//!
//! The response is an array of variables, each with `resultados[].series[]`
//! per locality. Only the first variable, result block and locality are
//! read. The `serie` payload arrives either as a list of
//! `{periodo, valor}` items or as a `{"YYYYMM": "valor"}` object.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::provider::{DataError, RawValue};
use crate::domain::Observation;

/// Values IBGE publishes in place of a number.
const SENTINELS: [&str; 6] = ["...", "…", "-", "..", "X", ""];

/// Query parameters: all national localities, JSON body.
pub const QUERY: [(&str, &str); 2] = [("localidades", "N1[all]"), ("formato", "json")];

#[derive(Debug, Deserialize)]
struct Variable {
    resultados: Vec<ResultBlock>,
}

#[derive(Debug, Deserialize)]
struct ResultBlock {
    series: Vec<LocalitySeries>,
}

#[derive(Debug, Deserialize)]
struct LocalitySeries {
    serie: SeriePayload,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeriePayload {
    Items(Vec<PeriodItem>),
    ByPeriod(BTreeMap<String, Option<RawValue>>),
}

#[derive(Debug, Deserialize)]
struct PeriodItem {
    #[serde(alias = "period")]
    periodo: String,
    #[serde(alias = "value")]
    valor: Option<RawValue>,
}

/// Request URL for an aggregate, restricted to `since..=until` by month.
pub fn request_url(
    base_url: &str,
    code: &str,
    variable: &str,
    since: NaiveDate,
    until: NaiveDate,
) -> String {
    format!(
        "{}/{code}/periodos/{}-{}/variaveis/{variable}",
        base_url.trim_end_matches('/'),
        compact_period(since),
        compact_period(until),
    )
}

fn compact_period(date: NaiveDate) -> String {
    format!("{:04}{:02}", date.year(), date.month())
}

/// Parse a `YYYYMM` period into the first day of that month.
///
/// Returns `None` for anything that is not six digits forming a valid month.
pub fn parse_period(period: &str) -> Option<NaiveDate> {
    if period.len() != 6 || !period.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = period[..4].parse().ok()?;
    let month: u32 = period[4..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Parse a locale-formatted value. `Ok(None)` for sentinels.
fn parse_value(raw: &RawValue) -> Result<Option<f64>, DataError> {
    let text = match raw {
        RawValue::Number(v) => return Ok(Some(*v).filter(|v| v.is_finite())),
        RawValue::Text(text) => text.trim(),
    };
    if SENTINELS.contains(&text) {
        return Ok(None);
    }
    text.replace(',', ".")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| DataError::ResponseFormatChanged(format!("non-numeric IBGE value '{text}'")))
}

/// Parse a SIDRA response body into observations, in response order.
pub fn parse_body(body: &str) -> Result<Vec<Observation>, DataError> {
    let variables: Vec<Variable> = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("IBGE body: {e}")))?;

    let payload = variables
        .into_iter()
        .next()
        .and_then(|v| v.resultados.into_iter().next())
        .and_then(|r| r.series.into_iter().next())
        .map(|s| s.serie)
        .ok_or_else(|| {
            DataError::ResponseFormatChanged("IBGE body has no resultados/series entry".into())
        })?;

    let items: Vec<(String, Option<RawValue>)> = match payload {
        SeriePayload::Items(items) => items.into_iter().map(|i| (i.periodo, i.valor)).collect(),
        SeriePayload::ByPeriod(map) => map.into_iter().collect(),
    };

    let mut out = Vec::with_capacity(items.len());
    for (period, value) in items {
        let Some(date) = parse_period(&period) else {
            tracing::debug!(period = %period, "skipping malformed IBGE period");
            continue;
        };
        let Some(raw) = value else {
            continue;
        };
        if let Some(value) = parse_value(&raw)? {
            out.push(Observation::new(date, value));
        }
    }
    Ok(out)
}
