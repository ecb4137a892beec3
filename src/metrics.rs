use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;

use crate::ingest::output::write_text;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        Ok(Self { handle })
    }

    /// Current exposition text.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Dump the exposition text for a node_exporter textfile collector.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        write_text(path, &self.render())
    }
}
