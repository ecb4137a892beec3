// src/ingest/fetch.rs
//! Resilient query execution across equivalent Overpass mirrors.
//!
//! Mirrors are tried strictly in order, each up to `attempts_per_endpoint`
//! times. Between failed attempts on the same mirror the client sleeps
//! `backoff(base_delay, attempt)` (linear by default). The first successful
//! payload short-circuits everything; if every attempt fails the last cause
//! is surfaced as `HarvestError::FetchExhausted`.

use metrics::{counter, histogram};
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::config::FetchConfig;
use crate::errors::{EndpointFailure, HarvestError};
use crate::ingest::ensure_metrics_described;
use crate::ingest::types::Transport;

/// Delay before retry number `attempt + 1`, given the base unit.
pub type Backoff = fn(Duration, u32) -> Duration;

pub fn linear_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    endpoints: Vec<String>,
    attempts_per_endpoint: u32,
    base_delay: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(endpoints: Vec<String>, attempts_per_endpoint: u32, base_delay: Duration) -> Self {
        Self {
            endpoints,
            attempts_per_endpoint: attempts_per_endpoint.max(1),
            base_delay,
            backoff: linear_backoff,
        }
    }

    pub fn from_config(cfg: &FetchConfig) -> Self {
        Self::new(
            cfg.endpoints.clone(),
            cfg.attempts_per_endpoint,
            cfg.base_delay(),
        )
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn attempts_per_endpoint(&self) -> u32 {
        self.attempts_per_endpoint
    }

    /// Upper bound on requests issued for one query.
    pub fn max_attempts(&self) -> u32 {
        self.attempts_per_endpoint
            .saturating_mul(self.endpoints.len() as u32)
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        (self.backoff)(self.base_delay, attempt)
    }
}

pub struct ResilientFetchClient {
    transport: Box<dyn Transport>,
    policy: RetryPolicy,
}

impl ResilientFetchClient {
    pub fn new(transport: Box<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn fetch(&self, query: &str) -> Result<Value, HarvestError> {
        ensure_metrics_described();

        let per_endpoint = self.policy.attempts_per_endpoint;
        let mut attempts = 0u32;
        let mut last: Option<EndpointFailure> = None;

        for endpoint in &self.policy.endpoints {
            for attempt in 1..=per_endpoint {
                attempts += 1;
                counter!("harvest_fetch_attempts_total").increment(1);

                let t0 = Instant::now();
                let outcome = self.transport.post_query(endpoint, query).await;
                histogram!("harvest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

                match outcome {
                    Ok(payload) => {
                        if attempts > 1 {
                            tracing::info!(
                                target: "ingest",
                                endpoint = endpoint.as_str(),
                                attempt,
                                total_attempts = attempts,
                                "query succeeded after retry"
                            );
                        }
                        return Ok(payload);
                    }
                    Err(failure) => {
                        counter!("harvest_fetch_failures_total").increment(1);
                        tracing::warn!(
                            target: "ingest",
                            endpoint = endpoint.as_str(),
                            attempt,
                            error = %failure,
                            "endpoint attempt failed"
                        );
                        last = Some(failure);

                        if attempt < per_endpoint {
                            let delay = self.policy.delay_after(attempt);
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        match last {
            Some(last) => Err(HarvestError::FetchExhausted { attempts, last }),
            None => Err(HarvestError::NoEndpoints),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff_scales_with_attempt() {
        let base = Duration::from_millis(1_500);
        assert_eq!(linear_backoff(base, 1), Duration::from_millis(1_500));
        assert_eq!(linear_backoff(base, 3), Duration::from_millis(4_500));
    }

    #[test]
    fn policy_clamps_attempts_and_counts_total() {
        let p = RetryPolicy::new(vec!["a".into(), "b".into()], 0, Duration::ZERO);
        assert_eq!(p.attempts_per_endpoint(), 1);
        assert_eq!(p.max_attempts(), 2);
    }

    #[test]
    fn custom_backoff_is_used() {
        fn flat(base: Duration, _attempt: u32) -> Duration {
            base
        }
        let p = RetryPolicy::new(vec!["a".into()], 3, Duration::from_millis(10)).with_backoff(flat);
        assert_eq!(p.delay_after(2), Duration::from_millis(10));
    }
}
