// tests/metrics_textfile.rs
// One test per binary: the Prometheus recorder is process-global.
use alpr_harvest::config::HarvestConfig;
use alpr_harvest::errors::EndpointFailure;
use alpr_harvest::ingest::fetch::{ResilientFetchClient, RetryPolicy};
use alpr_harvest::ingest::providers::scripted::ScriptedTransport;
use alpr_harvest::ingest::Harvester;
use alpr_harvest::metrics::Metrics;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn harvest_series_land_in_the_textfile() {
    let metrics = Metrics::init().expect("recorder");

    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = HarvestConfig::default();
    cfg.run.output_dir = tmp.path().join("public");
    cfg.run.region_pause_ms = 0;

    let transport = ScriptedTransport::new(
        vec![Ok(json!({"elements": [
            {"type": "node", "id": 1, "lat": 41.88, "lon": -87.63},
            {"type": "node", "id": 1, "lat": 41.88, "lon": -87.63}
        ]}))],
        Err(EndpointFailure::Status {
            endpoint: "m".into(),
            status: 429,
        }),
    );
    let policy = RetryPolicy::new(vec!["m".into()], 1, Duration::ZERO);
    let harvester = Harvester::new(ResilientFetchClient::new(Box::new(transport), policy), &cfg);

    let regions = vec!["Illinois".to_string(), "Indiana".to_string()];
    let index = harvester.run(&regions).await.unwrap();
    assert_eq!(index.ok_count(), 1);
    assert_eq!(index.failed_count(), 1);

    let path = tmp.path().join("metrics/harvest.prom");
    metrics.write_textfile(&path).unwrap();
    let out = std::fs::read_to_string(&path).unwrap();

    for name in [
        "harvest_fetch_attempts_total",
        "harvest_fetch_failures_total",
        "harvest_fetch_ms",
        "harvest_records_total",
        "harvest_dedup_total",
        "harvest_features_written_total",
        "harvest_regions_ok_total",
        "harvest_regions_failed_total",
        "harvest_last_run_ts",
    ] {
        assert!(out.contains(name), "missing {name} in:\n{out}");
    }
    assert!(out.contains("harvest_fetch_attempts_total 2"), "{out}");
}
