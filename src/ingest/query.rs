// src/ingest/query.rs
//! Overpass QL for one administrative region.

#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    timeout_secs: u64,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

impl QueryBuilder {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    /// ALPR surveillance nodes inside the state/province-level area named `region`.
    pub fn build(&self, region: &str) -> String {
        let name = escape_ql(region.trim());
        format!(
            r#"
[out:json][timeout:{timeout}];
area
  ["name"="{name}"]
  ["boundary"="administrative"]
  ["admin_level"~"4|5"];
(
  node(area)["man_made"="surveillance"]["surveillance:type"="ALPR"];
  node(area)["man_made"="surveillance"]["camera:type"="ALPR"];
  node(area)["man_made"="surveillance"]["brand"="Flock Safety"];
);
out body; >; out skel qt;"#,
            timeout = self.timeout_secs,
        )
    }
}

/// Escape a value for a double-quoted Overpass string literal.
fn escape_ql(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
