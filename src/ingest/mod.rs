// src/ingest/mod.rs
pub mod dedup;
pub mod fetch;
pub mod ledger;
pub mod normalize;
pub mod output;
pub mod providers;
pub mod query;
pub mod raw_export;
pub mod types;

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{HarvestConfig, MetaConfig};
use crate::ingest::dedup::dedup_by_id;
use crate::ingest::fetch::ResilientFetchClient;
use crate::ingest::ledger::{IndexAggregator, RegionWritten, RunIndex};
use crate::ingest::normalize::Normalizer;
use crate::ingest::output::{region_file_name, write_collection, write_json, CollectionMeta};
use crate::ingest::providers::overpass::node_records;
use crate::ingest::query::QueryBuilder;

/// One-time metrics registration (so series show up in the textfile).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "harvest_fetch_attempts_total",
            "Requests issued against Overpass mirrors."
        );
        describe_counter!(
            "harvest_fetch_failures_total",
            "Mirror attempts that failed (status, transport or body)."
        );
        describe_histogram!("harvest_fetch_ms", "Mirror round-trip time in milliseconds.");
        describe_counter!("harvest_records_total", "Raw records handed to the normalizer.");
        describe_counter!(
            "harvest_rejected_total",
            "Records dropped for missing or out-of-range coordinates."
        );
        describe_counter!("harvest_dedup_total", "Features dropped as repeated ids.");
        describe_counter!(
            "harvest_features_written_total",
            "Features written to artifacts."
        );
        describe_counter!("harvest_regions_ok_total", "Regions written successfully.");
        describe_counter!("harvest_regions_failed_total", "Regions recorded as failed.");
        describe_gauge!("harvest_last_run_ts", "Unix ts when the region run finished.");
    });
}

/// Sequential region harvester: query → fetch → normalize → dedup → write,
/// with every outcome recorded in the run index.
pub struct Harvester {
    client: ResilientFetchClient,
    queries: QueryBuilder,
    normalizer: Normalizer,
    output_dir: PathBuf,
    collection_dir: String,
    meta: MetaConfig,
    region_pause: Duration,
}

impl Harvester {
    pub fn new(client: ResilientFetchClient, cfg: &HarvestConfig) -> Self {
        Self {
            client,
            queries: QueryBuilder::new(cfg.fetch.query_timeout_secs),
            normalizer: Normalizer::new(cfg.transform.default_kind.clone()),
            output_dir: cfg.run.output_dir.clone(),
            collection_dir: cfg.run.collection_dir.clone(),
            meta: cfg.meta.clone(),
            region_pause: cfg.run.region_pause(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.output_dir.join("index.json")
    }

    /// Fetch, normalize and persist one region.
    pub async fn harvest_region(&self, region: &str) -> Result<RegionWritten> {
        let query = self.queries.build(region);
        let payload = self
            .client
            .fetch(&query)
            .await
            .with_context(|| format!("fetching {region}"))?;

        let records = node_records(&payload);
        counter!("harvest_records_total").increment(records.len() as u64);

        let (features, rejected) = self.normalizer.normalize_all(&records, region);
        let (features, duplicates) = dedup_by_id(features);
        counter!("harvest_rejected_total").increment(rejected as u64);
        counter!("harvest_dedup_total").increment(duplicates as u64);

        let file = region_file_name(&self.collection_dir, region);
        let meta = CollectionMeta::new(&self.meta, Utc::now());
        write_collection(&self.output_dir.join(&file), &features, Some(&meta))?;
        counter!("harvest_features_written_total").increment(features.len() as u64);

        tracing::info!(
            target: "ingest",
            region,
            records = records.len(),
            rejected,
            duplicates,
            written = features.len(),
            file = file.as_str(),
            "region written"
        );

        Ok(RegionWritten {
            file,
            count: features.len(),
        })
    }

    /// Process every region in order, one at a time, then write `index.json`.
    /// A failing region is recorded and skipped; it never aborts the run.
    pub async fn run(&self, regions: &[String]) -> Result<RunIndex> {
        ensure_metrics_described();

        let mut ledger = IndexAggregator::new();
        for region in regions {
            tracing::info!(target: "ingest", region = region.as_str(), "fetching region");
            let outcome = self.harvest_region(region).await;
            match &outcome {
                Ok(_) => counter!("harvest_regions_ok_total").increment(1),
                Err(e) => {
                    counter!("harvest_regions_failed_total").increment(1);
                    tracing::warn!(
                        target: "ingest",
                        region = region.as_str(),
                        error = %format!("{e:#}"),
                        "skipping region"
                    );
                }
            }
            ledger.observe(region, outcome);

            // Be kind to the mirrors.
            tokio::time::sleep(self.region_pause).await;
        }

        let finished = Utc::now();
        let index = ledger.finish(finished);
        let index_path = self.index_path();
        write_json(&index_path, &index)
            .with_context(|| format!("writing run index {}", index_path.display()))?;
        gauge!("harvest_last_run_ts").set(finished.timestamp().max(0) as f64);

        tracing::info!(
            target: "ingest",
            ok = index.ok_count(),
            failed = index.failed_count(),
            features = index.feature_count(),
            index = %index_path.display(),
            "run index written"
        );
        Ok(index)
    }
}
