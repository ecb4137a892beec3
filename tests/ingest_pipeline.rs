// tests/ingest_pipeline.rs
use alpr_harvest::config::HarvestConfig;
use alpr_harvest::errors::EndpointFailure;
use alpr_harvest::ingest::fetch::{ResilientFetchClient, RetryPolicy};
use alpr_harvest::ingest::ledger::RunIndex;
use alpr_harvest::ingest::providers::scripted::ScriptedTransport;
use alpr_harvest::ingest::Harvester;
use alpr_harvest::RegionStatus;
use serde_json::{json, Value};
use std::fs;
use std::time::Duration;

fn overpass_payload(ids: &[u64]) -> Value {
    let mut elements: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "type": "node",
                "id": id,
                "lat": 39.5,
                "lon": -104.0 - *id as f64,
                "tags": {
                    "man_made": "surveillance",
                    "surveillance:type": "ALPR",
                    "camera:direction": "270",
                    "brand": "Flock Safety"
                }
            })
        })
        .collect();
    // skeleton output from `>; out skel qt;` and a node with broken coordinates
    elements.push(json!({"type": "way", "id": 77, "nodes": [1, 2]}));
    elements.push(json!({"type": "node", "id": 999, "lat": 95.0, "lon": 40.0}));
    json!({ "elements": elements })
}

fn mirror_down() -> Result<Value, EndpointFailure> {
    Err(EndpointFailure::Status {
        endpoint: "https://mirror.test/api/interpreter".into(),
        status: 504,
    })
}

fn config(out: &std::path::Path) -> HarvestConfig {
    let mut cfg = HarvestConfig::default();
    cfg.run.output_dir = out.to_path_buf();
    cfg.run.region_pause_ms = 0;
    cfg.fetch.base_delay_ms = 0;
    cfg
}

#[tokio::test]
async fn failed_region_is_recorded_and_run_continues() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path());

    // 1 mirror x 2 attempts: Colorado ok, Utah fails twice, then Ohio ok
    let transport = ScriptedTransport::new(
        vec![
            Ok(overpass_payload(&[1, 2, 2])),
            mirror_down(),
            mirror_down(),
            Ok(overpass_payload(&[5])),
        ],
        mirror_down(),
    );
    let calls = transport.calls_handle();
    let policy = RetryPolicy::new(vec!["https://mirror.test/api/interpreter".into()], 2, Duration::ZERO);
    let harvester = Harvester::new(ResilientFetchClient::new(Box::new(transport), policy), &cfg);

    let regions = vec!["Colorado".to_string(), "Utah".to_string(), "Ohio".to_string()];
    let index = harvester.run(&regions).await.expect("index written");

    assert_eq!(index.regions.len(), 3);
    let names: Vec<&str> = index.regions.iter().map(|r| r.region.as_str()).collect();
    assert_eq!(names, ["Colorado", "Utah", "Ohio"]);

    let co = &index.regions[0];
    assert_eq!(co.status, RegionStatus::Ok);
    assert_eq!(co.file.as_deref(), Some("usa/Colorado.json"));
    // ids 1, 2, 2 (dup) + swapped node 999
    assert_eq!(co.count, Some(3));

    let ut = &index.regions[1];
    assert_eq!(ut.status, RegionStatus::Failed);
    assert_eq!(ut.count, None);
    let err = ut.error.as_deref().unwrap();
    assert!(err.contains("fetching Utah"), "{err}");
    assert!(err.contains("HTTP 504"), "{err}");

    assert_eq!(index.regions[2].count, Some(2));

    // queries are region-scoped and issued in order
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 4);
    assert!(calls[0].query.contains(r#"["name"="Colorado"]"#));
    assert!(calls[1].query.contains(r#"["name"="Utah"]"#));
    assert!(calls[3].query.contains(r#"["name"="Ohio"]"#));

    // artifacts on disk
    assert!(!tmp.path().join("usa/Utah.json").exists());
    let fc: Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("usa/Colorado.json")).unwrap())
            .unwrap();
    assert_eq!(fc["type"], "FeatureCollection");
    assert_eq!(fc["meta"]["source"], "OpenStreetMap (via Overpass)");
    let first = &fc["features"][0];
    assert_eq!(first["geometry"]["coordinates"], json!([-105.0, 39.5]));
    assert_eq!(first["properties"]["id"], "1");
    assert_eq!(first["properties"]["region"], "Colorado");
    assert_eq!(first["properties"]["dir"], json!(270.0));
    assert_eq!(first["properties"]["type"], "ALPR");
    assert_eq!(first["properties"]["tags"]["brand"], "Flock Safety");
    assert_eq!(first["properties"]["brand"], "Flock Safety");
    let swapped = &fc["features"][2];
    assert_eq!(swapped["geometry"]["coordinates"], json!([95.0, 40.0]));

    let on_disk: RunIndex =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("index.json")).unwrap())
            .unwrap();
    assert_eq!(on_disk, index);
}

#[tokio::test]
async fn every_region_fails_but_index_is_still_written() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path());
    let transport = ScriptedTransport::new(Vec::new(), mirror_down());
    let policy = RetryPolicy::new(vec!["a".into(), "b".into()], 1, Duration::ZERO);
    let harvester = Harvester::new(ResilientFetchClient::new(Box::new(transport), policy), &cfg);

    let regions = vec!["Texas".to_string(), "New Mexico".to_string()];
    let index = harvester.run(&regions).await.unwrap();
    assert_eq!(index.failed_count(), 2);
    assert!(index.regions.iter().all(|r| r.error.is_some()));
    assert!(tmp.path().join("index.json").exists());
}

#[tokio::test]
async fn empty_result_still_writes_an_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path());
    let transport = ScriptedTransport::new(Vec::new(), Ok(json!({"elements": []})));
    let policy = RetryPolicy::new(vec!["a".into()], 1, Duration::ZERO);
    let harvester = Harvester::new(ResilientFetchClient::new(Box::new(transport), policy), &cfg);

    let written = harvester.harvest_region("Rhode Island").await.unwrap();
    assert_eq!(written.file, "usa/Rhode_Island.json");
    assert_eq!(written.count, 0);
    assert!(tmp.path().join("usa/Rhode_Island.json").exists());
}

#[tokio::test(start_paused = true)]
async fn pause_follows_every_region_including_failures() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = config(tmp.path());
    cfg.run.region_pause_ms = 800;

    let transport = ScriptedTransport::new(
        vec![Ok(overpass_payload(&[1])), mirror_down(), Ok(overpass_payload(&[2]))],
        mirror_down(),
    );
    let policy = RetryPolicy::new(vec!["a".into()], 1, Duration::ZERO);
    let harvester = Harvester::new(ResilientFetchClient::new(Box::new(transport), policy), &cfg);

    let regions = vec!["Idaho".to_string(), "Montana".to_string(), "Wyoming".to_string()];
    let start = tokio::time::Instant::now();
    let index = harvester.run(&regions).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(index.regions[1].status, RegionStatus::Failed);
    // 3 x 800ms; a pause skipped on the failed region would give 1600ms
    assert!(
        elapsed >= Duration::from_millis(2_400) && elapsed < Duration::from_millis(2_450),
        "unexpected total pause {elapsed:?}"
    );
}
