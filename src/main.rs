//! alpr-harvest: binary entrypoint.
//!
//! `fetch` walks the region list against the Overpass mirrors and publishes
//! one GeoJSON file per region plus `index.json`; `transform` turns a raw
//! export of unknown shape into `cameras.geojson`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use alpr_harvest::config::regions::load_regions;
use alpr_harvest::config::HarvestConfig;
use alpr_harvest::ingest::raw_export::run_transform;
use alpr_harvest::metrics::Metrics;

#[derive(Debug, Parser)]
#[command(name = "alpr-harvest", version, about)]
struct Cli {
    /// Config file (TOML or JSON). Defaults to config/harvest.{toml,json}.
    #[arg(long, global = true, env = "HARVEST_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Query every region and publish per-region collections plus the index.
    Fetch {
        /// Region list (JSON array or TOML `regions = [...]`).
        #[arg(long)]
        regions: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Normalize a raw export into a single collection.
    Transform {
        /// Raw export to read instead of the configured candidates.
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Pipeline events log under the `ingest` target, everything else under the crate.
const DEFAULT_LOG_FILTER: &str = "ingest=info,alpr_harvest=info,warn";

/// Compact logs by default; `HARVEST_LOG_FORMAT=json` for machine-readable lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("HARVEST_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

fn load_config(explicit: Option<&PathBuf>) -> Result<HarvestConfig> {
    match explicit {
        Some(p) => HarvestConfig::load_from(p),
        None => HarvestConfig::load_default(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut cfg = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Fetch {
            regions,
            output_dir,
        } => {
            if let Some(dir) = output_dir {
                cfg.run.output_dir = dir;
            }
            let regions_path = regions.unwrap_or_else(|| cfg.run.regions_path.clone());
            let regions = load_regions(&regions_path)?;

            let metrics = match &cfg.run.metrics_path {
                Some(_) => Some(Metrics::init()?),
                None => None,
            };

            let harvester = alpr_harvest::build_harvester(&cfg)?;
            // Per-region failures are already in the index; only an unwritable
            // index ends up here.
            let index = harvester.run(&regions).await?;
            tracing::info!(
                ok = index.ok_count(),
                failed = index.failed_count(),
                "fetch finished"
            );

            if let (Some(metrics), Some(path)) = (metrics, &cfg.run.metrics_path) {
                metrics
                    .write_textfile(path)
                    .with_context(|| format!("writing metrics to {}", path.display()))?;
            }
        }
        Command::Transform { input, output } => {
            if let Some(out) = output {
                cfg.transform.output = out;
            }
            let summary = run_transform(&cfg.transform, &cfg.meta, input.as_deref())?;
            tracing::info!(
                source = %summary.source.display(),
                output = %summary.output.display(),
                records = summary.records,
                written = summary.written,
                "transform finished"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses_and_covers_ingest_target() {
        let filter = EnvFilter::try_new(DEFAULT_LOG_FILTER).expect("valid directives");
        let rendered = filter.to_string();
        assert!(rendered.contains("ingest=info"), "{rendered}");
        assert!(rendered.contains("alpr_harvest=info"), "{rendered}");
    }

    #[test]
    fn cli_parses_both_subcommands() {
        let cli = Cli::try_parse_from(["alpr-harvest", "fetch", "--regions", "r.json"]).unwrap();
        assert!(matches!(cli.command, Command::Fetch { regions: Some(_), .. }));
        let cli = Cli::try_parse_from(["alpr-harvest", "transform", "--input", "raw.json"]).unwrap();
        assert!(matches!(cli.command, Command::Transform { input: Some(_), .. }));
    }
}
