//! Raw and processed storage.
//!
//! Layout under the data directory:
//! - `raw/{key}_{provider}.csv`: one file per series, columns `data,{key}`
//! - `raw/{key}_{provider}.meta.json`: sidecar (date range, count, hash)
//! - `processed/indicadores_economicos.csv`: the merged panel
//! - `processed/indicadores_economicos.parquet`: the same panel as Parquet
//!
//! Every file is overwritten on each run. Writes go to a `.tmp` sibling and
//! are renamed into place. Missing panel values are empty CSV fields and
//! Parquet nulls.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::{Column, DataFrame, DataType, ParquetReader, ParquetWriter, SerReader};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::{Provider, SeriesDescriptor};
use crate::config::PathsConfig;
use crate::domain::{Panel, PanelColumn, PanelError, Series, DATE_COLUMN};

const PANEL_FILE_STEM: &str = "indicadores_economicos";
const DATE_FORMAT: &str = "%Y-%m-%d";
/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("invalid panel: {0}")]
    Shape(#[from] PanelError),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Sidecar written next to each raw series file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMeta {
    pub key: String,
    pub provider: Provider,
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub record_count: usize,
    pub data_hash: String,
    pub fetched_at: NaiveDateTime,
}

/// File-backed store for raw series and the processed panel.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl SeriesStore {
    /// Open a store rooted at `data_dir`, creating `raw/` and `processed/`.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        let store = Self {
            raw_dir: data_dir.join("raw"),
            processed_dir: data_dir.join("processed"),
        };
        fs::create_dir_all(&store.raw_dir).map_err(io_err(&store.raw_dir))?;
        fs::create_dir_all(&store.processed_dir).map_err(io_err(&store.processed_dir))?;
        Ok(store)
    }

    pub fn from_config(paths: &PathsConfig) -> Result<Self, StoreError> {
        Self::new(&paths.data_dir)
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    /// `raw/{key}_{provider}.csv`
    pub fn raw_path(&self, descriptor: &SeriesDescriptor) -> PathBuf {
        self.raw_dir
            .join(format!("{}_{}.csv", descriptor.key, descriptor.provider.tag()))
    }

    fn raw_meta_path(&self, descriptor: &SeriesDescriptor) -> PathBuf {
        self.raw_dir
            .join(format!("{}_{}.meta.json", descriptor.key, descriptor.provider.tag()))
    }

    pub fn panel_path(&self) -> PathBuf {
        self.processed_dir.join(format!("{PANEL_FILE_STEM}.csv"))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.processed_dir.join(format!("{PANEL_FILE_STEM}.parquet"))
    }

    /// Write one fetched series and its metadata sidecar. Empty series are
    /// rejected: there is nothing to record.
    pub fn write_raw(
        &self,
        descriptor: &SeriesDescriptor,
        series: &Series,
    ) -> Result<PathBuf, StoreError> {
        let path = self.raw_path(descriptor);
        let (Some(start_date), Some(end_date)) = (series.first_date(), series.last_date()) else {
            return Err(StoreError::Format {
                path,
                reason: "refusing to write an empty series".into(),
            });
        };

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record([DATE_COLUMN, descriptor.key.as_str()])?;
        for obs in series.iter() {
            wtr.write_record([obs.date.format(DATE_FORMAT).to_string(), obs.value.to_string()])?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| StoreError::Csv(e.into_error().into()))?;
        write_atomic(&path, &bytes)?;

        let meta = RawMeta {
            key: descriptor.key.clone(),
            provider: descriptor.provider,
            code: descriptor.code.clone(),
            start_date,
            end_date,
            record_count: series.len(),
            data_hash: blake3::hash(&serde_json::to_vec(series)?).to_hex().to_string(),
            fetched_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)?;
        write_atomic(&self.raw_meta_path(descriptor), meta_json.as_bytes())?;

        tracing::info!(
            key = %descriptor.key,
            path = %path.display(),
            records = series.len(),
            "raw series saved"
        );
        Ok(path)
    }

    /// Metadata of the last raw write for `descriptor`, if any.
    pub fn raw_meta(&self, descriptor: &SeriesDescriptor) -> Option<RawMeta> {
        let content = fs::read_to_string(self.raw_meta_path(descriptor)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Persist the panel as CSV plus a Parquet snapshot.
    pub fn write_panel(&self, panel: &Panel) -> Result<PathBuf, StoreError> {
        let path = self.panel_path();

        let mut wtr = csv::Writer::from_writer(vec![]);
        let mut header = vec![DATE_COLUMN];
        header.extend(panel.indicators());
        wtr.write_record(&header)?;
        for row in 0..panel.len() {
            let Some((date, values)) = panel.row(row) else {
                break;
            };
            let mut record = Vec::with_capacity(values.len() + 1);
            record.push(date.format(DATE_FORMAT).to_string());
            record.extend(values.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
            wtr.write_record(&record)?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| StoreError::Csv(e.into_error().into()))?;
        write_atomic(&path, &bytes)?;

        write_parquet_snapshot(panel, &self.snapshot_path())?;

        tracing::info!(path = %path.display(), rows = panel.len(), "merged panel saved");
        Ok(path)
    }

    /// Load the processed panel CSV. A missing file is not an error: it is
    /// logged and an empty panel is returned.
    pub fn load_panel(&self) -> Result<Panel, StoreError> {
        let path = self.panel_path();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "processed data not found");
            return Ok(Panel::empty());
        }
        tracing::info!(path = %path.display(), "loading processed data");
        read_panel_csv(&path)
    }

    /// Load the Parquet snapshot, with the same missing-file policy as
    /// [`SeriesStore::load_panel`].
    pub fn load_panel_snapshot(&self) -> Result<Panel, StoreError> {
        let path = self.snapshot_path();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "processed snapshot not found");
            return Ok(Panel::empty());
        }
        tracing::info!(path = %path.display(), "loading processed snapshot");
        read_parquet_snapshot(&path)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).map_err(io_err(&tmp))?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

// ── CSV panel I/O ───────────────────────────────────────────────────

/// Dates are read from the first ten characters so that timestamps written
/// as `YYYY-MM-DD HH:MM:SS` still load.
fn parse_csv_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), DATE_FORMAT).ok()
}

fn parse_csv_value(raw: &str) -> Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("non-numeric value '{raw}'"))
}

fn read_panel_csv(path: &Path) -> Result<Panel, StoreError> {
    let format_err = |reason: String| StoreError::Format {
        path: path.to_path_buf(),
        reason,
    };

    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    match headers.get(0) {
        Some(first) if first == DATE_COLUMN => {}
        other => {
            return Err(format_err(format!(
                "first column must be '{DATE_COLUMN}', found {other:?}"
            )))
        }
    }

    let mut dates = Vec::new();
    let mut columns: Vec<PanelColumn> = headers
        .iter()
        .skip(1)
        .map(|name| PanelColumn {
            name: name.to_string(),
            values: Vec::new(),
        })
        .collect();

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = parse_csv_date(raw_date)
            .ok_or_else(|| format_err(format!("row {}: invalid date '{raw_date}'", line + 1)))?;
        dates.push(date);
        for (i, column) in columns.iter_mut().enumerate() {
            let raw = record.get(i + 1).unwrap_or_default();
            let value =
                parse_csv_value(raw).map_err(|e| format_err(format!("row {}: {e}", line + 1)))?;
            column.values.push(value);
        }
    }

    Ok(Panel::from_parts(dates, columns)?)
}

// ── Parquet snapshot I/O ────────────────────────────────────────────

fn panel_to_dataframe(panel: &Panel) -> Result<DataFrame, StoreError> {
    let days: Vec<i32> = panel
        .dates()
        .iter()
        .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
        .collect();

    let mut columns = Vec::with_capacity(panel.width() + 1);
    columns.push(
        Column::new(DATE_COLUMN.into(), days)
            .cast(&DataType::Date)
            .map_err(|e| StoreError::Parquet(format!("date cast: {e}")))?,
    );
    for column in panel.columns() {
        columns.push(Column::new(column.name.as_str().into(), column.values.clone()));
    }

    DataFrame::new(columns).map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet_snapshot(panel: &Panel, path: &Path) -> Result<(), StoreError> {
    let mut df = panel_to_dataframe(panel)?;
    let tmp = tmp_path(path);
    let file = fs::File::create(&tmp).map_err(io_err(&tmp))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn read_parquet_snapshot(path: &Path) -> Result<Panel, StoreError> {
    let file = fs::File::open(path).map_err(io_err(path))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::Parquet(format!("read: {e}")))?;

    let date_col = df
        .column(DATE_COLUMN)
        .map_err(|e| StoreError::Parquet(format!("missing date column: {e}")))?;
    let date_ca = date_col
        .date()
        .map_err(|e| StoreError::Parquet(format!("date column type: {e}")))?;

    let mut dates = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null date at row {i}")))?;
        let date = NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
            .ok_or_else(|| StoreError::Parquet(format!("date out of range at row {i}")))?;
        dates.push(date);
    }

    let mut columns = Vec::with_capacity(df.width().saturating_sub(1));
    for column in df.get_columns() {
        let name = column.name().as_str();
        if name == DATE_COLUMN {
            continue;
        }
        let values = column
            .cast(&DataType::Float64)
            .map_err(|e| StoreError::Parquet(format!("{name} column cast: {e}")))?;
        let ca = values
            .f64()
            .map_err(|e| StoreError::Parquet(format!("{name} column type: {e}")))?;
        columns.push(PanelColumn {
            name: name.to_string(),
            values: (0..df.height()).map(|i| ca.get(i)).collect(),
        });
    }

    Ok(Panel::from_parts(dates, columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observation;
    use crate::merge::merge_indicators;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn selic() -> SeriesDescriptor {
        SeriesDescriptor::new(
            "selic",
            Provider::CentralBank,
            "432",
            "Taxa Selic",
            "% a.a.",
            "BCB-SGS",
        )
    }

    fn sample_panel() -> Panel {
        merge_indicators(&[
            (
                "selic".into(),
                Series::from_unsorted(vec![
                    Observation::new(d(2023, 1, 15), 13.75),
                    Observation::new(d(2023, 2, 15), 13.75),
                ]),
            ),
            (
                "desemprego".into(),
                Series::from_unsorted(vec![Observation::new(d(2023, 3, 1), 8.8)]),
            ),
        ])
    }

    #[test]
    fn new_creates_directories() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path().join("data")).unwrap();
        assert!(store.raw_dir().is_dir());
        assert!(store.processed_dir().is_dir());
    }

    #[test]
    fn raw_write_produces_csv_and_meta() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path()).unwrap();
        let series = Series::from_unsorted(vec![
            Observation::new(d(2023, 1, 15), 13.75),
            Observation::new(d(2023, 2, 15), 13.5),
        ]);

        let path = store.write_raw(&selic(), &series).unwrap();

        assert_eq!(path.file_name().unwrap(), "selic_bcb.csv");
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "data,selic\n2023-01-15,13.75\n2023-02-15,13.5\n");

        let meta = store.raw_meta(&selic()).unwrap();
        assert_eq!(meta.record_count, 2);
        assert_eq!(meta.start_date, d(2023, 1, 15));
        assert_eq!(meta.end_date, d(2023, 2, 15));
        assert_eq!(meta.data_hash.len(), 64);
        assert!(!path.with_file_name("selic_bcb.csv.tmp").exists());
    }

    #[test]
    fn raw_write_overwrites_previous_run() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path()).unwrap();
        let first = Series::from_unsorted(vec![Observation::new(d(2023, 1, 15), 1.0)]);
        let second = Series::from_unsorted(vec![Observation::new(d(2024, 1, 15), 2.0)]);

        store.write_raw(&selic(), &first).unwrap();
        let path = store.write_raw(&selic(), &second).unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "data,selic\n2024-01-15,2\n");
    }

    #[test]
    fn empty_raw_series_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.write_raw(&selic(), &Series::empty()),
            Err(StoreError::Format { .. })
        ));
    }

    #[test]
    fn panel_csv_marks_missing_as_empty_fields() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path()).unwrap();

        let path = store.write_panel(&sample_panel()).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(
            content,
            "data,selic,desemprego\n2023-01-31,13.75,\n2023-02-28,13.75,\n2023-03-31,,8.8\n"
        );
    }

    #[test]
    fn panel_survives_csv_and_parquet() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path()).unwrap();
        let panel = sample_panel();

        store.write_panel(&panel).unwrap();

        assert_eq!(store.load_panel().unwrap(), panel);
        assert_eq!(store.load_panel_snapshot().unwrap(), panel);
    }

    #[test]
    fn missing_processed_file_loads_empty_panel() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path()).unwrap();
        assert!(store.load_panel().unwrap().is_empty());
        assert!(store.load_panel_snapshot().unwrap().is_empty());
    }

    #[test]
    fn legacy_timestamps_and_nan_are_read() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path()).unwrap();
        fs::write(
            store.panel_path(),
            "data,selic,ipca\n2023-01-31 23:59:59.999999999,13.75,NaN\n2023-02-28 23:59:59.999999999,,0.84\n",
        )
        .unwrap();

        let panel = store.load_panel().unwrap();
        assert_eq!(panel.dates(), &[d(2023, 1, 31), d(2023, 2, 28)]);
        assert_eq!(panel.column("selic").unwrap(), &[Some(13.75), None]);
        assert_eq!(panel.column("ipca").unwrap(), &[None, Some(0.84)]);
    }

    #[test]
    fn wrong_first_header_is_a_format_error() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path()).unwrap();
        fs::write(store.panel_path(), "date,selic\n2023-01-31,13.75\n").unwrap();
        assert!(matches!(store.load_panel(), Err(StoreError::Format { .. })));
    }

    #[test]
    fn empty_panel_is_persisted_as_header_only() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path()).unwrap();

        store.write_panel(&Panel::empty()).unwrap();

        assert_eq!(fs::read_to_string(store.panel_path()).unwrap(), "data\n");
        assert!(store.load_panel().unwrap().is_empty());
    }

    #[test]
    fn epoch_offset_matches_chrono() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(epoch.num_days_from_ce(), UNIX_EPOCH_DAYS_FROM_CE);
    }
}
