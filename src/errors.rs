// src/errors.rs
//! Typed failures for the harvest pipelines.
//!
//! Record-level problems never show up here: a record that cannot be
//! normalized is simply dropped (see `ingest::normalize::Rejection`).

use std::path::PathBuf;
use thiserror::Error;

/// A single attempt against a single endpoint failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointFailure {
    #[error("HTTP {status} @ {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("unusable response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

impl EndpointFailure {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Status { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::InvalidResponse { endpoint, .. } => endpoint,
        }
    }
}

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Every endpoint/attempt combination failed. Only the most recent cause is kept.
    #[error("all {attempts} fetch attempts failed; last error: {last}")]
    FetchExhausted { attempts: u32, last: EndpointFailure },

    #[error("no query endpoints configured")]
    NoEndpoints,

    #[error("no raw input found, expected one of: {}", join_paths(.candidates))]
    NoRawInput { candidates: Vec<PathBuf> },

    /// Records were read but none survived normalization.
    #[error("no usable input: {records} raw records in {} yielded zero features", .path.display())]
    NoUsableInput { path: PathBuf, records: usize },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
