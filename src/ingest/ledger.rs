// src/ingest/ledger.rs
//! Run-level index: exactly one entry per requested region, in request order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::output::iso_timestamp;
use crate::ingest::types::{RegionResult, RegionStatus};

/// What a successful region produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionWritten {
    pub file: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIndex {
    pub generated_at: String,
    pub regions: Vec<RegionResult>,
}

impl RunIndex {
    pub fn ok_count(&self) -> usize {
        self.regions.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.regions.len() - self.ok_count()
    }

    pub fn feature_count(&self) -> usize {
        self.regions.iter().filter_map(|r| r.count).sum()
    }
}

/// Append-only ledger of region outcomes.
#[derive(Debug, Default)]
pub struct IndexAggregator {
    entries: Vec<RegionResult>,
}

impl IndexAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, region: &str, written: RegionWritten) {
        self.entries.push(RegionResult {
            region: region.to_string(),
            file: Some(written.file),
            status: RegionStatus::Ok,
            count: Some(written.count),
            error: None,
        });
    }

    pub fn record_failure(&mut self, region: &str, error: &anyhow::Error) {
        self.entries.push(RegionResult {
            region: region.to_string(),
            file: None,
            status: RegionStatus::Failed,
            count: None,
            error: Some(format!("{error:#}")),
        });
    }

    /// Record whatever happened; never fails.
    pub fn observe(&mut self, region: &str, outcome: anyhow::Result<RegionWritten>) {
        match outcome {
            Ok(written) => self.record_success(region, written),
            Err(e) => self.record_failure(region, &e),
        }
    }

    pub fn entries(&self) -> &[RegionResult] {
        &self.entries
    }

    pub fn finish(self, generated_at: DateTime<Utc>) -> RunIndex {
        RunIndex {
            generated_at: iso_timestamp(generated_at),
            regions: self.entries,
        }
    }
}
