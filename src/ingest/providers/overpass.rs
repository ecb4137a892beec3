// src/ingest/providers/overpass.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::FetchConfig;
use crate::errors::EndpointFailure;
use crate::ingest::normalize::coerce_number;
use crate::ingest::types::{FetchOutcome, RawRecord, Transport};

/// Tag keys OSM mappers use for camera orientation.
const DIRECTION_TAGS: [&str; 3] = ["direction", "camera:direction", "surveillance:direction"];
const KIND_TAGS: [&str; 2] = ["surveillance:type", "camera:type"];

/// POSTs form-encoded Overpass QL (`data=<query>`) with reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("building overpass http client")?;
        Ok(Self { client })
    }

    pub fn from_config(cfg: &FetchConfig) -> Result<Self> {
        Self::new(cfg.request_timeout(), &cfg.user_agent)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_query(&self, endpoint: &str, query: &str) -> FetchOutcome {
        let resp = self
            .client
            .post(endpoint)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| EndpointFailure::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EndpointFailure::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| EndpointFailure::InvalidResponse {
                endpoint: endpoint.to_string(),
                message: format!("body is not JSON: {e}"),
            })?;
        check_response(endpoint, body)
    }
}

/// A 2xx body still has to carry an `elements` array. Overpass also answers
/// 200 with an empty result and a `remark` when the query hit a runtime error
/// (timeout, memory); those count as failed attempts too.
pub fn check_response(endpoint: &str, body: Value) -> FetchOutcome {
    let elements = match body.get("elements") {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(EndpointFailure::InvalidResponse {
                endpoint: endpoint.to_string(),
                message: "missing `elements` array".to_string(),
            })
        }
    };

    if let Some(remark) = body.get("remark").and_then(Value::as_str) {
        if elements.is_empty() && remark.contains("runtime error") {
            return Err(EndpointFailure::InvalidResponse {
                endpoint: endpoint.to_string(),
                message: remark.trim().to_string(),
            });
        }
    }

    Ok(body)
}

/// Raw records for every `node` element, in response order. Ways, relations
/// and skeleton-only entries are ignored.
pub fn node_records(response: &Value) -> Vec<RawRecord> {
    response
        .get("elements")
        .and_then(Value::as_array)
        .map(|els| els.iter().filter_map(node_to_record).collect())
        .unwrap_or_default()
}

fn node_to_record(el: &Value) -> Option<RawRecord> {
    if el.get("type").and_then(Value::as_str) != Some("node") {
        return None;
    }
    let tags = el.get("tags").and_then(Value::as_object);

    let mut rec = Map::new();
    for key in ["id", "lat", "lon", "timestamp"] {
        if let Some(v) = el.get(key) {
            rec.insert(key.to_string(), v.clone());
        }
    }

    if let Some(tags) = tags {
        if let Some(dir) = DIRECTION_TAGS
            .iter()
            .filter_map(|k| tags.get(*k))
            .find(|v| coerce_number(v).is_some())
        {
            rec.insert("direction".to_string(), dir.clone());
        }
        if let Some(kind) = KIND_TAGS.iter().find_map(|k| tags.get(*k)) {
            rec.insert("type".to_string(), kind.clone());
        }
        rec.insert("tags".to_string(), Value::Object(tags.clone()));
    }

    Some(Value::Object(rec))
}
