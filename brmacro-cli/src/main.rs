//! brmacro CLI: collect Brazilian macro series and build the monthly panel.
//!
//! Commands:
//! - `update`: fetch every catalog series, save raw files, merge and save the panel
//! - `fetch`: fetch and save a single catalog series
//! - `summary`: print the summary of the processed panel as JSON
//! - `catalog`: list the configured series and their last raw fetch
//! - `show`: print the last rows of the processed panel

use anyhow::{bail, Context, Result};
use brmacro_core::{
    get_data_summary, AppConfig, FetchOutcome, HttpFetcher, Panel, SeriesStore, SummaryReport,
    Updater,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "brmacro",
    about = "brmacro: IBGE and BCB series collection into a monthly panel"
)]
struct Cli {
    /// TOML config file. Defaults to the built-in catalog and settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory, overriding `paths.data_dir`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all series, merge them and save raw and processed data.
    Update,
    /// Fetch and save a single series from the catalog.
    Fetch {
        /// Catalog key (e.g., selic, desemprego).
        key: String,
    },
    /// Print the processed data summary as JSON.
    Summary {
        /// Read the Parquet snapshot instead of the CSV.
        #[arg(long, default_value_t = false)]
        snapshot: bool,
    },
    /// List the configured series.
    Catalog,
    /// Print the most recent rows of the processed panel.
    Show {
        /// Number of rows to print.
        #[arg(long, default_value_t = 12)]
        rows: usize,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.paths.data_dir = dir.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Update => run_update(&config),
        Commands::Fetch { key } => run_fetch(&config, &key),
        Commands::Summary { snapshot } => run_summary(&config, snapshot),
        Commands::Catalog => run_catalog(&config),
        Commands::Show { rows } => run_show(&config, rows),
    }
}

fn open_store(config: &AppConfig) -> Result<SeriesStore> {
    SeriesStore::from_config(&config.paths).with_context(|| {
        format!(
            "failed to prepare data directory {}",
            config.paths.data_dir.display()
        )
    })
}

fn run_update(config: &AppConfig) -> Result<()> {
    let catalog = config.catalog()?;
    let store = open_store(config)?;
    let fetcher = HttpFetcher::new(&config.api)?;

    let panel = Updater::new(&fetcher, &store, &catalog, &config.api)
        .update_all()
        .context("update failed")?;

    let report = SummaryReport::from_panel(&panel);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_fetch(config: &AppConfig, key: &str) -> Result<()> {
    let catalog = config.catalog()?;
    let store = open_store(config)?;
    let fetcher = HttpFetcher::new(&config.api)?;

    let outcome = Updater::new(&fetcher, &store, &catalog, &config.api).collect_one(key)?;
    match outcome {
        FetchOutcome::Success(series) if series.is_empty() => {
            println!("{key}: no observations returned");
        }
        FetchOutcome::Success(series) => {
            let descriptor = catalog.get(key).context("series vanished from catalog")?;
            println!(
                "{key}: {} observations saved to {}",
                series.len(),
                store.raw_path(descriptor).display()
            );
        }
        FetchOutcome::SourceUnavailable { reason } => bail!("{key}: source unavailable: {reason}"),
    }
    Ok(())
}

fn run_summary(config: &AppConfig, snapshot: bool) -> Result<()> {
    let store = open_store(config)?;
    let report = if snapshot {
        SummaryReport::from_panel(&store.load_panel_snapshot()?)
    } else {
        get_data_summary(&store)?
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_catalog(config: &AppConfig) -> Result<()> {
    let catalog = config.catalog()?;
    let store = open_store(config)?;

    println!(
        "{:<14} {:<5} {:>6}  {:<26} {:<25} {:>8}",
        "Key", "Src", "Code", "Name", "Last Fetch", "Records"
    );
    println!("{}", "-".repeat(90));
    for descriptor in catalog.collection_order() {
        let (fetched, records) = match store.raw_meta(descriptor) {
            Some(meta) => (
                meta.fetched_at.format("%Y-%m-%d %H:%M").to_string(),
                meta.record_count.to_string(),
            ),
            None => ("(never)".into(), "-".into()),
        };
        println!(
            "{:<14} {:<5} {:>6}  {:<26} {:<25} {:>8}",
            descriptor.key,
            descriptor.provider.to_string(),
            descriptor.code,
            truncate(&descriptor.name, 26),
            fetched,
            records
        );
    }
    Ok(())
}

fn run_show(config: &AppConfig, rows: usize) -> Result<()> {
    let store = open_store(config)?;
    let panel = store.load_panel()?;
    if panel.is_empty() {
        println!("No processed data. Run `brmacro update` first.");
        return Ok(());
    }
    print_panel_tail(&panel, rows);
    Ok(())
}

fn print_panel_tail(panel: &Panel, rows: usize) {
    let indicators = panel.indicators();
    print!("{:<10}", "data");
    for name in &indicators {
        print!(" {:>12}", truncate(name, 12));
    }
    println!();
    println!("{}", "-".repeat(10 + 13 * indicators.len()));

    let start = panel.len().saturating_sub(rows);
    for i in start..panel.len() {
        let Some((date, values)) = panel.row(i) else {
            break;
        };
        print!("{:<10}", date.format("%Y-%m-%d"));
        for value in values {
            match value {
                Some(v) => print!(" {v:>12.4}"),
                None => print!(" {:>12}", "-"),
            }
        }
        println!();
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
