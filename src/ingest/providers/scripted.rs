// src/ingest/providers/scripted.rs
//! Replays canned outcomes instead of talking to a mirror.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::ingest::types::{FetchOutcome, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub endpoint: String,
    pub query: String,
}

/// Pops one scripted outcome per call; once the script runs dry every call
/// gets `fallback`.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<FetchOutcome>>,
    fallback: FetchOutcome,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<FetchOutcome>, fallback: FetchOutcome) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared view of the calls made so far; stays valid after the transport
    /// is boxed into a client.
    pub fn calls_handle(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_query(&self, endpoint: &str, query: &str) -> FetchOutcome {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                endpoint: endpoint.to_string(),
                query: query.to_string(),
            });
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
