//! Banco Central SGS request building and response parsing.
//!
//! The SGS endpoint returns a flat array of `{"data": "DD/MM/YYYY", "valor": "1.23"}`.

use chrono::NaiveDate;
use serde::Deserialize;

use super::provider::{DataError, RawValue};
use crate::domain::Observation;

const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Deserialize)]
struct SgsItem {
    data: String,
    valor: Option<RawValue>,
}

/// Per-series endpoint: `{base}/bcdata.sgs.{code}/dados`.
pub fn request_url(base_url: &str, code: &str) -> String {
    format!("{}/bcdata.sgs.{code}/dados", base_url.trim_end_matches('/'))
}

/// Query parameters for the `since..=until` window.
pub fn query(since: NaiveDate, until: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("formato", "json".to_string()),
        ("dataInicial", since.format(DATE_FORMAT).to_string()),
        ("dataFinal", until.format(DATE_FORMAT).to_string()),
    ]
}

fn parse_value(raw: &RawValue) -> Result<Option<f64>, DataError> {
    match raw {
        RawValue::Number(v) => Ok(Some(*v).filter(|v| v.is_finite())),
        RawValue::Text(text) if text.trim().is_empty() => Ok(None),
        RawValue::Text(text) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| {
                DataError::ResponseFormatChanged(format!("non-numeric SGS value '{text}'"))
            }),
    }
}

/// Parse an SGS response body into observations, in response order.
pub fn parse_body(body: &str) -> Result<Vec<Observation>, DataError> {
    let items: Vec<SgsItem> = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("SGS body: {e}")))?;

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(raw) = item.valor else {
            continue;
        };
        let Some(value) = parse_value(&raw)? else {
            continue;
        };
        let date = NaiveDate::parse_from_str(item.data.trim(), DATE_FORMAT).map_err(|e| {
            DataError::ResponseFormatChanged(format!("invalid SGS date '{}': {e}", item.data))
        })?;
        out.push(Observation::new(date, value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn null_values_are_skipped() {
        let body = r#"[{"data":"15/01/2023","valor":"13.75"},{"data":"15/02/2023","valor":null}]"#;
        let obs = parse_body(body).unwrap();
        assert_eq!(obs, vec![Observation::new(d(2023, 1, 15), 13.75)]);
    }

    #[test]
    fn numeric_values_are_accepted() {
        let body = r#"[{"data":"02/01/2024","valor":4.8526}]"#;
        let obs = parse_body(body).unwrap();
        assert_eq!(obs, vec![Observation::new(d(2024, 1, 2), 4.8526)]);
    }

    #[test]
    fn daily_series_keep_every_observation() {
        let body = r#"[{"data":"02/01/2024","valor":"4.85"},{"data":"03/01/2024","valor":"4.91"},
                      {"data":"31/01/2024","valor":"4.95"}]"#;
        assert_eq!(parse_body(body).unwrap().len(), 3);
    }

    #[test]
    fn bad_date_is_a_format_error() {
        let body = r#"[{"data":"2023-01-15","valor":"13.75"}]"#;
        assert!(matches!(
            parse_body(body).unwrap_err(),
            DataError::ResponseFormatChanged(_)
        ));
    }

    #[test]
    fn error_envelope_is_a_format_error() {
        let body = r#"{"error":"Value(s) not found","message":"série inexistente"}"#;
        assert!(parse_body(body).is_err());
    }

    #[test]
    fn url_and_query() {
        assert_eq!(
            request_url("https://api.bcb.gov.br/dados/serie", "432"),
            "https://api.bcb.gov.br/dados/serie/bcdata.sgs.432/dados"
        );
        let q = query(d(2012, 1, 1), d(2024, 6, 30));
        assert_eq!(
            q,
            vec![
                ("formato", "json".to_string()),
                ("dataInicial", "01/01/2012".to_string()),
                ("dataFinal", "30/06/2024".to_string()),
            ]
        );
    }
}
