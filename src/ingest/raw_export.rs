// src/ingest/raw_export.rs
//! Raw-export pipeline: pick the first existing candidate file, load it as
//! JSON (falling back to newline-delimited JSON), normalize every item and
//! write one FeatureCollection.

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::counter;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{MetaConfig, TransformConfig};
use crate::errors::HarvestError;
use crate::ingest::dedup::dedup_by_id;
use crate::ingest::ensure_metrics_described;
use crate::ingest::normalize::Normalizer;
use crate::ingest::output::{write_collection, CollectionMeta};
use crate::ingest::types::{CanonicalFeature, RawRecord};

/// Conventional keys under which exports nest their record array.
pub const ITEM_KEYS: [&str; 5] = ["features", "records", "data", "items", "results"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSummary {
    pub source: PathBuf,
    pub output: PathBuf,
    pub records: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub written: usize,
}

pub fn select_input(candidates: &[PathBuf]) -> Result<PathBuf, HarvestError> {
    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| HarvestError::NoRawInput {
            candidates: candidates.to_vec(),
        })
}

/// Whole-document JSON, or one JSON value per line when that fails.
/// Blank and unparsable lines are skipped.
pub fn parse_document(text: &str) -> Value {
    if let Ok(doc) = serde_json::from_str::<Value>(text) {
        return doc;
    }
    let items = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|l| serde_json::from_str::<Value>(l).ok())
        .collect();
    Value::Array(items)
}

/// A bare array, or the first conventional key holding an array.
pub fn extract_items(doc: Value) -> Vec<RawRecord> {
    match doc {
        Value::Array(items) => items,
        Value::Object(mut obj) => ITEM_KEYS
            .iter()
            .find_map(|k| match obj.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

pub fn load_records(path: &Path) -> Result<Vec<RawRecord>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading raw export {}", path.display()))?;
    Ok(extract_items(parse_document(&text)))
}

/// Normalize + dedup one pass over a loaded export.
/// Returns (features, rejected, duplicates).
pub fn normalize_records(
    records: &[RawRecord],
    normalizer: &Normalizer,
) -> (Vec<CanonicalFeature>, usize, usize) {
    let (features, rejected) = normalizer.normalize_all(records, "");
    let (features, duplicates) = dedup_by_id(features);
    (features, rejected, duplicates)
}

/// Run the whole transform. `input` overrides the candidate list.
pub fn run_transform(
    cfg: &TransformConfig,
    meta: &MetaConfig,
    input: Option<&Path>,
) -> Result<TransformSummary> {
    ensure_metrics_described();

    let source = match input {
        Some(p) => select_input(&[p.to_path_buf()])?,
        None => select_input(&cfg.candidates)?,
    };
    let records = load_records(&source)?;
    counter!("harvest_records_total").increment(records.len() as u64);

    let normalizer = Normalizer::new(cfg.default_kind.clone());
    let (features, rejected, duplicates) = normalize_records(&records, &normalizer);
    counter!("harvest_rejected_total").increment(rejected as u64);
    counter!("harvest_dedup_total").increment(duplicates as u64);

    if !records.is_empty() && features.is_empty() {
        return Err(HarvestError::NoUsableInput {
            path: source,
            records: records.len(),
        }
        .into());
    }

    let meta = CollectionMeta::new(meta, Utc::now())
        .with_source(format!("raw export ({})", source.display()));
    write_collection(&cfg.output, &features, Some(&meta))?;
    counter!("harvest_features_written_total").increment(features.len() as u64);

    tracing::info!(
        target: "ingest",
        source = %source.display(),
        output = %cfg.output.display(),
        records = records.len(),
        rejected,
        duplicates,
        written = features.len(),
        "raw export transformed"
    );

    Ok(TransformSummary {
        source,
        output: cfg.output.clone(),
        records: records.len(),
        rejected,
        duplicates,
        written: features.len(),
    })
}
