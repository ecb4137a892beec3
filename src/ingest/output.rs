// src/ingest/output.rs
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use crate::config::MetaConfig;
use crate::ingest::types::CanonicalFeature;

/// ISO-8601 UTC with millisecond precision, e.g. `2026-10-16T03:00:00.000Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub generated_at: String,
    pub source: String,
    pub license: String,
    pub attribution: String,
}

impl CollectionMeta {
    pub fn new(meta: &MetaConfig, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at: iso_timestamp(generated_at),
            source: meta.source.clone(),
            license: meta.license.clone(),
            attribution: meta.attribution.clone(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// GeoJSON `FeatureCollection`; `meta` is omitted when `None`.
pub fn feature_collection(features: &[CanonicalFeature], meta: Option<&CollectionMeta>) -> Value {
    let features: Vec<Value> = features.iter().map(CanonicalFeature::to_geojson).collect();
    let mut fc = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    if let Some(meta) = meta {
        fc["meta"] = json!(meta);
    }
    fc
}

/// Serialize a collection to `path`, creating parent directories.
pub fn write_collection(
    path: &Path,
    features: &[CanonicalFeature],
    meta: Option<&CollectionMeta>,
) -> Result<()> {
    let fc = feature_collection(features, meta);
    write_json(path, &fc)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).context("serializing json artifact")?;
    write_bytes(path, &bytes)
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    write_bytes(path, text.as_bytes())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

/// Artifact path for a region relative to the output root: `usa/New_York.json`.
pub fn region_file_name(collection_dir: &str, region: &str) -> String {
    let stem = region.trim().replace(' ', "_");
    let dir = collection_dir.trim_matches('/');
    if dir.is_empty() {
        format!("{stem}.json")
    } else {
        format!("{dir}/{stem}.json")
    }
}
