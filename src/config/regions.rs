// src/config/regions.rs
//! Static list of regions (US states, DC) to query.

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Load region names from a JSON array or a TOML `regions = [...]` table.
/// Request order is preserved.
pub fn load_regions(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading regions from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let raw = if ext == "toml" {
        parse_toml(&content)?
    } else {
        parse_json(&content).or_else(|_| parse_toml(&content))?
    };
    let regions = clean_list(raw);
    if regions.is_empty() {
        return Err(anyhow!("region list {} is empty", path.display()));
    }
    Ok(regions)
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(s)?)
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlRegions {
        regions: Vec<String>,
    }
    let v: TomlRegions = toml::from_str(s).map_err(|e| anyhow!("unsupported region list: {e}"))?;
    Ok(v.regions)
}

/// Trim, drop blanks, keep the first occurrence of repeated names.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}
