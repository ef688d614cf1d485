//! Series catalog: which indicators exist and where each one comes from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream statistical provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// IBGE, the national statistics agency (SIDRA aggregates API).
    StatisticsAgency,
    /// Banco Central do Brasil time-series service (SGS).
    CentralBank,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::CentralBank, Provider::StatisticsAgency];

    /// Short provider tag used in log lines and raw file names.
    pub fn tag(self) -> &'static str {
        match self {
            Provider::StatisticsAgency => "ibge",
            Provider::CentralBank => "bcb",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::StatisticsAgency => write!(f, "IBGE"),
            Provider::CentralBank => write!(f, "BCB"),
        }
    }
}

/// One indicator of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    /// Short unique name, also the panel column header.
    pub key: String,
    pub provider: Provider,
    /// The provider's own series identifier.
    pub code: String,
    /// Human label.
    pub name: String,
    pub unit: String,
    /// Survey or system the series is published under.
    pub source: String,
    /// SIDRA variable id; only meaningful for the statistics agency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

impl SeriesDescriptor {
    pub fn new(
        key: &str,
        provider: Provider,
        code: &str,
        name: &str,
        unit: &str,
        source: &str,
    ) -> Self {
        Self {
            key: key.to_string(),
            provider,
            code: code.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            source: source.to_string(),
            variable: None,
        }
    }

    pub fn with_variable(mut self, variable: &str) -> Self {
        self.variable = Some(variable.to_string());
        self
    }
}

/// SIDRA variable requested when a descriptor does not name one.
pub const DEFAULT_SIDRA_VARIABLE: &str = "4099";

/// Ordered set of descriptors with unique keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    series: Vec<SeriesDescriptor>,
}

impl Catalog {
    /// Build a catalog; returns the first duplicated key on conflict.
    pub fn new(series: Vec<SeriesDescriptor>) -> Result<Self, String> {
        for (i, desc) in series.iter().enumerate() {
            if series[..i].iter().any(|other| other.key == desc.key) {
                return Err(desc.key.clone());
            }
        }
        Ok(Self { series })
    }

    /// The indicators collected by default.
    pub fn builtin() -> Self {
        Self {
            series: builtin_series(),
        }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SeriesDescriptor> {
        self.series.iter().find(|d| d.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesDescriptor> {
        self.series.iter()
    }

    pub fn by_provider(&self, provider: Provider) -> impl Iterator<Item = &SeriesDescriptor> {
        self.series.iter().filter(move |d| d.provider == provider)
    }

    /// Collection order: every central bank series, then every statistics
    /// agency series, each group in catalog order.
    pub fn collection_order(&self) -> Vec<&SeriesDescriptor> {
        Provider::ALL
            .iter()
            .flat_map(|p| self.by_provider(*p))
            .collect()
    }

    pub fn into_inner(self) -> Vec<SeriesDescriptor> {
        self.series
    }
}

pub(crate) fn builtin_series() -> Vec<SeriesDescriptor> {
    use Provider::{CentralBank, StatisticsAgency};

    vec![
        SeriesDescriptor::new("selic", CentralBank, "432", "Taxa Selic", "% a.a.", "BCB-SGS"),
        SeriesDescriptor::new("ipca", CentralBank, "433", "IPCA", "% a.m.", "BCB-SGS"),
        SeriesDescriptor::new("pib", CentralBank, "4380", "PIB mensal", "Índice", "BCB-SGS"),
        SeriesDescriptor::new("cambio", CentralBank, "1", "Taxa de câmbio", "R$/US$", "BCB-SGS"),
        SeriesDescriptor::new("igpm", CentralBank, "189", "IGP-M", "% a.m.", "BCB-SGS"),
        SeriesDescriptor::new(
            "desemprego",
            StatisticsAgency,
            "4099",
            "Taxa de desemprego",
            "%",
            "PNAD Contínua",
        )
        .with_variable(DEFAULT_SIDRA_VARIABLE),
        SeriesDescriptor::new(
            "ocupacao",
            StatisticsAgency,
            "4092",
            "Taxa de ocupação",
            "%",
            "PNAD Contínua",
        )
        .with_variable(DEFAULT_SIDRA_VARIABLE),
        SeriesDescriptor::new(
            "participacao",
            StatisticsAgency,
            "4093",
            "Taxa de participação",
            "%",
            "PNAD Contínua",
        )
        .with_variable(DEFAULT_SIDRA_VARIABLE),
        SeriesDescriptor::new(
            "rendimento",
            StatisticsAgency,
            "5434",
            "Rendimento médio real",
            "R$",
            "PNAD Contínua",
        )
        .with_variable(DEFAULT_SIDRA_VARIABLE),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_keys_are_unique() {
        let catalog = Catalog::builtin();
        assert!(Catalog::new(catalog.clone().into_inner()).is_ok());
        assert_eq!(catalog.len(), 9);
    }

    #[test]
    fn duplicate_key_is_reported() {
        let series = vec![
            SeriesDescriptor::new("selic", Provider::CentralBank, "432", "Selic", "%", "BCB"),
            SeriesDescriptor::new(
                "selic",
                Provider::CentralBank,
                "11",
                "Selic diária",
                "%",
                "BCB",
            ),
        ];
        assert_eq!(Catalog::new(series).unwrap_err(), "selic");
    }

    #[test]
    fn collection_order_puts_central_bank_first() {
        let series = vec![
            SeriesDescriptor::new("desemprego", Provider::StatisticsAgency, "4099", "", "%", ""),
            SeriesDescriptor::new("selic", Provider::CentralBank, "432", "", "%", ""),
            SeriesDescriptor::new("ocupacao", Provider::StatisticsAgency, "4092", "", "%", ""),
            SeriesDescriptor::new("ipca", Provider::CentralBank, "433", "", "%", ""),
        ];
        let catalog = Catalog::new(series).unwrap();

        let keys: Vec<&str> = catalog
            .collection_order()
            .iter()
            .map(|d| d.key.as_str())
            .collect();
        assert_eq!(keys, vec!["selic", "ipca", "desemprego", "ocupacao"]);
    }

    #[test]
    fn lookup_by_key() {
        let catalog = Catalog::builtin();
        let ipca = catalog.get("ipca").unwrap();
        assert_eq!(ipca.code, "433");
        assert_eq!(ipca.provider, Provider::CentralBank);
        assert!(catalog.get("missing").is_none());
    }
}
