// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod errors;
pub mod ingest;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::config::HarvestConfig;
pub use crate::errors::{EndpointFailure, HarvestError};
pub use crate::ingest::fetch::{ResilientFetchClient, RetryPolicy};
pub use crate::ingest::ledger::{IndexAggregator, RunIndex};
pub use crate::ingest::normalize::Normalizer;
pub use crate::ingest::types::{CanonicalFeature, RegionResult, RegionStatus};
pub use crate::ingest::Harvester;

use crate::ingest::providers::overpass::HttpTransport;

/// Wire the real HTTP transport and retry policy from config.
pub fn build_harvester(cfg: &HarvestConfig) -> anyhow::Result<Harvester> {
    let transport = HttpTransport::from_config(&cfg.fetch)?;
    let client =
        ResilientFetchClient::new(Box::new(transport), RetryPolicy::from_config(&cfg.fetch));
    Ok(Harvester::new(client, cfg))
}
