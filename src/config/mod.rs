// src/config/mod.rs
pub mod regions;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "HARVEST_CONFIG_PATH";

pub const DEFAULT_ENDPOINTS: [&str; 2] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
];

pub const DEFAULT_RAW_CANDIDATES: [&str; 4] = [
    "data/raw_deflock.geojson",
    "data/raw_deflock.json",
    "data/deflock.raw.json",
    "data/flock_raw.json",
];

fn default_attempts() -> u32 {
    2
}
fn default_base_delay_ms() -> u64 {
    1_500
}
fn default_region_pause_ms() -> u64 {
    800
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub fetch: FetchConfig,
    pub run: RunConfig,
    pub transform: TransformConfig,
    pub meta: MetaConfig,
}

/// Overpass mirrors and retry knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Tried strictly in this order.
    pub endpoints: Vec<String>,
    pub attempts_per_endpoint: u32,
    /// Linear backoff unit: the n-th retry on a mirror waits `n * base_delay_ms`.
    pub base_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Server-side `[timeout:..]` written into every query.
    pub query_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            attempts_per_endpoint: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_secs: 180,
            query_timeout_secs: 120,
            user_agent: format!("alpr-harvest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub regions_path: PathBuf,
    pub output_dir: PathBuf,
    /// Sub-directory (relative to `output_dir`) holding one artifact per region.
    pub collection_dir: String,
    /// Politeness pause after every region, success or not.
    pub region_pause_ms: u64,
    /// When set, a Prometheus textfile is written here at the end of a run.
    pub metrics_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            regions_path: PathBuf::from("states.json"),
            output_dir: PathBuf::from("public"),
            collection_dir: "usa".to_string(),
            region_pause_ms: default_region_pause_ms(),
            metrics_path: None,
        }
    }
}

impl RunConfig {
    pub fn region_pause(&self) -> Duration {
        Duration::from_millis(self.region_pause_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// First existing path wins.
    pub candidates: Vec<PathBuf>,
    pub output: PathBuf,
    pub default_kind: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_RAW_CANDIDATES.iter().map(PathBuf::from).collect(),
            output: PathBuf::from("data/cameras.geojson"),
            default_kind: crate::ingest::normalize::DEFAULT_KIND.to_string(),
        }
    }
}

/// Provenance block stamped onto every artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    pub source: String,
    pub license: String,
    pub attribution: String,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            source: "OpenStreetMap (via Overpass)".to_string(),
            license: "ODbL 1.0".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
        }
    }
}

impl HarvestConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading harvest config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing harvest config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load config using env var + fallbacks:
    /// 1) $HARVEST_CONFIG_PATH
    /// 2) config/harvest.toml
    /// 3) config/harvest.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/harvest.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/harvest.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    fn sanitized(mut self) -> Self {
        self.fetch.endpoints = self
            .fetch
            .endpoints
            .iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        if self.fetch.endpoints.is_empty() {
            tracing::warn!("no endpoints configured, falling back to the default mirrors");
            self.fetch.endpoints = FetchConfig::default().endpoints;
        }
        if self.fetch.attempts_per_endpoint == 0 {
            self.fetch.attempts_per_endpoint = default_attempts();
        }
        if self.transform.default_kind.trim().is_empty() {
            self.transform.default_kind = TransformConfig::default().default_kind;
        }
        self
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<HarvestConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => toml::from_str(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| serde_json::from_str(s).map_err(anyhow::Error::from))
            .map_err(|_| anyhow!("unsupported harvest config format")),
    }
}
