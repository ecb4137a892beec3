// src/ingest/normalize.rs
//! Schema-agnostic normalization of raw camera records.
//!
//! Every lookup is an ordered alias chain. Coordinates are resolved by a
//! fixed list of strategies, each a pure function returning `Some` on the
//! first shape it recognises:
//!
//! 1. `geometry: { type: "Point", coordinates: [x, y] }`
//! 2. flat alias fields (`lng`/`lat` and friends) on `properties` or the record
//! 3. a nested container under `coordinates`/`coord`/`location`/`loc`/`pos`
//!    holding an array, a keyed object or a string with embedded numbers
//!
//! Alias order matters (`lng` wins over `lon`); do not reorder the tables.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::{Map, Value};

use crate::ingest::types::{CanonicalFeature, Point, RawRecord, Tags};

pub const LNG_ALIASES: [&str; 5] = ["lng", "lon", "long", "longitude", "x"];
pub const LAT_ALIASES: [&str; 3] = ["lat", "latitude", "y"];
pub const CONTAINER_KEYS: [&str; 5] = ["coordinates", "coord", "location", "loc", "pos"];
pub const DIRECTION_ALIASES: [&str; 7] = [
    "dir",
    "direction",
    "bearing",
    "heading",
    "azimuth",
    "angle",
    "yaw",
];
pub const ID_ALIASES: [&str; 3] = ["id", "camera_id", "cam_id"];
pub const KIND_ALIASES: [&str; 3] = ["type", "kind", "camera_type"];
pub const TIMESTAMP_ALIASES: [&str; 4] = ["last_seen", "updated_at", "timestamp", "seen_at"];

pub const DEFAULT_KIND: &str = "flock";

/// Why a record produced no feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No strategy found two numeric values.
    NoCoordinates,
    /// Coordinates found but outside `|lng| <= 180, |lat| <= 90` after swap correction.
    OutOfBounds,
}

type CoordinateStrategy = fn(&RawRecord) -> Option<(f64, f64)>;

const COORDINATE_STRATEGIES: [(&str, CoordinateStrategy); 3] = [
    ("point_geometry", point_geometry),
    ("flat_fields", flat_fields),
    ("nested_container", nested_container),
];

#[derive(Debug, Clone)]
pub struct Normalizer {
    default_kind: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_KIND)
    }
}

impl Normalizer {
    pub fn new(default_kind: impl Into<String>) -> Self {
        Self {
            default_kind: default_kind.into(),
        }
    }

    /// Turn one raw record into a feature, or say why not.
    ///
    /// `context` is the region label (empty for none); `index` is the record's
    /// position in its batch and only feeds the synthetic id fallback.
    pub fn normalize(
        &self,
        record: &RawRecord,
        context: &str,
        index: usize,
    ) -> Result<CanonicalFeature, Rejection> {
        let (x, y) = resolve_coordinates(record).ok_or(Rejection::NoCoordinates)?;
        let point = validate_bounds(correct_swap(x, y)).ok_or(Rejection::OutOfBounds)?;

        let props = props_of(record);
        let context = context.trim();

        Ok(CanonicalFeature {
            id: resolve_id(record).unwrap_or_else(|| synthetic_id(index)),
            point,
            direction: props.map(resolve_direction).unwrap_or(0.0),
            kind: props
                .and_then(resolve_kind)
                .unwrap_or_else(|| self.default_kind.clone()),
            timestamp: props.and_then(resolve_timestamp).unwrap_or_default(),
            region: (!context.is_empty()).then(|| context.to_string()),
            tags: props.map(resolve_tags).unwrap_or_default(),
        })
    }

    /// Normalize a batch in order, dropping rejected records.
    /// Returns the accepted features and the number rejected.
    pub fn normalize_all(
        &self,
        records: &[RawRecord],
        context: &str,
    ) -> (Vec<CanonicalFeature>, usize) {
        let mut out = Vec::with_capacity(records.len());
        let mut rejected = 0usize;
        for (i, rec) in records.iter().enumerate() {
            match self.normalize(rec, context, i) {
                Ok(f) => out.push(f),
                Err(reason) => {
                    rejected += 1;
                    tracing::debug!(index = i, ?reason, "record rejected");
                }
            }
        }
        (out, rejected)
    }
}

/// First strategy that yields two numbers wins.
pub fn resolve_coordinates(record: &RawRecord) -> Option<(f64, f64)> {
    COORDINATE_STRATEGIES
        .iter()
        .find_map(|(_, strategy)| strategy(record))
}

/// `[lat, lng]` transposition fix: a latitude can never exceed 90 in magnitude.
/// Pairs with both values within 90 are ambiguous and left alone.
pub fn correct_swap(x: f64, y: f64) -> (f64, f64) {
    if x.abs() <= 90.0 && y.abs() > 90.0 {
        (y, x)
    } else {
        (x, y)
    }
}

pub fn validate_bounds((x, y): (f64, f64)) -> Option<Point> {
    (x.abs() <= 180.0 && y.abs() <= 90.0).then_some(Point { lng: x, lat: y })
}

/// Fold any angle into `[0, 360)`.
pub fn normalize_bearing(v: f64) -> f64 {
    let d = ((v % 360.0) + 360.0) % 360.0;
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Finite numbers, or strings that parse to one. Everything else is "absent".
pub fn coerce_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                return None;
            }
            t.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// The `properties` object when there is one, otherwise the record itself.
fn props_of(record: &RawRecord) -> Option<&Map<String, Value>> {
    match record.get("properties") {
        Some(Value::Object(p)) => Some(p),
        _ => record.as_object(),
    }
}

fn first_number(obj: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .find_map(|k| obj.get(*k).and_then(coerce_number))
}

fn lng_lat_fields(obj: &Map<String, Value>) -> Option<(f64, f64)> {
    Some((
        first_number(obj, &LNG_ALIASES)?,
        first_number(obj, &LAT_ALIASES)?,
    ))
}

fn pair_from_slice(values: &[Value]) -> Option<(f64, f64)> {
    match values {
        [a, b, ..] => Some((coerce_number(a)?, coerce_number(b)?)),
        _ => None,
    }
}

fn numeric_substrings(s: &str) -> Option<(f64, f64)> {
    static RE_NUM: OnceCell<Regex> = OnceCell::new();
    let re = RE_NUM.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("static regex"));
    let mut nums = re.find_iter(s).filter_map(|m| m.as_str().parse::<f64>().ok());
    Some((nums.next()?, nums.next()?))
}

fn point_geometry(record: &RawRecord) -> Option<(f64, f64)> {
    let g = record.get("geometry")?;
    if g.get("type").and_then(Value::as_str) != Some("Point") {
        return None;
    }
    pair_from_slice(g.get("coordinates")?.as_array()?)
}

fn flat_fields(record: &RawRecord) -> Option<(f64, f64)> {
    if let Some(Value::Object(p)) = record.get("properties") {
        if let Some(pair) = lng_lat_fields(p) {
            return Some(pair);
        }
    }
    lng_lat_fields(record.as_object()?)
}

fn nested_container(record: &RawRecord) -> Option<(f64, f64)> {
    let props = props_of(record)?;
    let c = CONTAINER_KEYS
        .iter()
        .find_map(|k| props.get(*k).filter(|v| !v.is_null()))?;
    match c {
        Value::Array(items) => pair_from_slice(items),
        Value::Object(obj) => lng_lat_fields(obj),
        Value::String(s) => numeric_substrings(s),
        _ => None,
    }
}

fn resolve_direction(props: &Map<String, Value>) -> f64 {
    first_number(props, &DIRECTION_ALIASES)
        .map(normalize_bearing)
        .unwrap_or(0.0)
}

fn identity_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Explicit ids, looked up on `properties` first and then on the record
/// (GeoJSON keeps a feature id at the top level).
fn resolve_id(record: &RawRecord) -> Option<String> {
    let scopes = [
        record.get("properties").and_then(Value::as_object),
        record.as_object(),
    ];
    scopes
        .into_iter()
        .flatten()
        .find_map(|obj| ID_ALIASES.iter().find_map(|k| obj.get(*k).and_then(identity_of)))
}

/// Stable within one pass over the same input: `cam_000042`.
pub fn synthetic_id(index: usize) -> String {
    format!("cam_{index:06}")
}

/// GeoJSON object types; a bare Feature's own `type` is not a camera kind.
const GEOJSON_TYPES: [&str; 2] = ["Feature", "FeatureCollection"];

fn resolve_kind(props: &Map<String, Value>) -> Option<String> {
    KIND_ALIASES.iter().find_map(|k| match props.get(*k) {
        Some(Value::String(s)) => {
            let t = s.trim();
            (!t.is_empty() && !GEOJSON_TYPES.contains(&t)).then(|| t.to_string())
        }
        _ => None,
    })
}

fn resolve_timestamp(props: &Map<String, Value>) -> Option<String> {
    TIMESTAMP_ALIASES.iter().find_map(|k| match props.get(*k) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn resolve_tags(props: &Map<String, Value>) -> Tags {
    match props.get("tags") {
        Some(Value::Object(t)) => t.clone(),
        _ => Tags::new(),
    }
}
