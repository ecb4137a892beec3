// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::EndpointFailure;

/// Opaque input record; nothing is assumed about its shape.
pub type RawRecord = Value;

/// Free-form key/value bag carried through untouched.
pub type Tags = Map<String, Value>;

/// Result of one attempt against one endpoint.
pub type FetchOutcome = Result<Value, EndpointFailure>;

/// Tags map frontends read straight off `properties`.
pub const LIFTED_TAGS: [&str; 2] = ["brand", "operator"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lng: f64,
    pub lat: f64,
}

/// Normalized camera location. Only `ingest::normalize` constructs these,
/// so `|lng| <= 180`, `|lat| <= 90` and `0 <= direction < 360` always hold.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFeature {
    pub(crate) id: String,
    pub(crate) point: Point,
    pub(crate) direction: f64,
    pub(crate) kind: String,
    pub(crate) timestamp: String,
    pub(crate) region: Option<String>,
    pub(crate) tags: Tags,
}

impl CanonicalFeature {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn point(&self) -> Point {
        self.point
    }

    /// Degrees clockwise from true north.
    pub fn direction(&self) -> f64 {
        self.direction
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// GeoJSON `Feature` with a `Point` geometry.
    pub fn to_geojson(&self) -> Value {
        let mut props = Map::new();
        props.insert("id".into(), Value::String(self.id.clone()));
        if let Some(region) = &self.region {
            props.insert("region".into(), Value::String(region.clone()));
        }
        props.insert("type".into(), Value::String(self.kind.clone()));
        props.insert("dir".into(), json!(self.direction));
        props.insert("last_seen".into(), Value::String(self.timestamp.clone()));
        for key in LIFTED_TAGS {
            if let Some(v) = self.tags.get(key) {
                props.insert(key.into(), v.clone());
            }
        }
        props.insert("tags".into(), Value::Object(self.tags.clone()));

        json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [self.point.lng, self.point.lat],
            },
            "properties": props,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionStatus {
    Ok,
    Failed,
}

/// One ledger row per requested region, whatever happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionResult {
    pub region: String,
    /// Artifact path relative to the output directory.
    pub file: Option<String>,
    pub status: RegionStatus,
    pub count: Option<usize>,
    pub error: Option<String>,
}

impl RegionResult {
    pub fn is_ok(&self) -> bool {
        self.status == RegionStatus::Ok
    }
}

/// Executes one query against one endpoint.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn post_query(&self, endpoint: &str, query: &str) -> FetchOutcome;
}
