// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

/// Endpoint agent configuration.
///
/// Every field here is a recognized option; there is no escape hatch for an
/// unrecognized one — `clap` rejects unknown flags and `--config` rejects
/// unknown JSON keys (`deny_unknown_fields` in [`FileConfig`]). Flattened
/// into the top-level CLI in `main.rs` so every subcommand shares the same
/// flag set.
#[derive(Debug, Clone, Args)]
pub struct AgentConfig {
    /// Base URL of the ingestion server.
    #[arg(long, env = "BEACON_API_URL")]
    pub api_url: String,

    /// Opaque tenant api-key.
    #[arg(long, env = "BEACON_API_KEY")]
    pub api_key: String,

    /// Optional JSON file overlaying the above (rejects unknown keys).
    #[arg(long, env = "BEACON_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Directory holding the durable queue and dead-letter store.
    #[arg(long, env = "BEACON_DATA_DIR", default_value = "./beacon-data")]
    pub data_dir: PathBuf,

    /// Foreground/process sampling period, in seconds (1..=300).
    #[arg(long, env = "BEACON_SAMPLE_PERIOD_SECONDS", default_value_t = 10)]
    pub sample_period_seconds: u32,

    /// Network-connection sampling period, in seconds.
    #[arg(long, env = "BEACON_NETWORK_PERIOD_SECONDS", default_value_t = 30)]
    pub network_period_seconds: u32,

    /// Dedup suppression window, in seconds.
    #[arg(long, env = "BEACON_SUPPRESSION_SECONDS", default_value_t = 60)]
    pub suppression_seconds: u32,

    /// Queue soft cap.
    #[arg(long, env = "BEACON_QUEUE_SOFT_CAP", default_value_t = 10_000)]
    pub queue_soft_cap: u64,

    /// Queue prune threshold.
    #[arg(long, env = "BEACON_QUEUE_PRUNE_THRESHOLD", default_value_t = 8_000)]
    pub queue_prune_threshold: u64,

    /// Retry ceiling before an event moves to the dead-letter region.
    #[arg(long, env = "BEACON_RETRY_CEILING", default_value_t = 10)]
    pub retry_ceiling: u32,

    /// How often HTTP_ONLY re-probes the stream channel, in seconds.
    #[arg(long, env = "BEACON_STREAM_RECONNECT_PROBE_SECONDS", default_value_t = 300)]
    pub stream_reconnect_probe_seconds: u32,

    /// Pacing between HTTP-fallback requests, in milliseconds.
    #[arg(long, env = "BEACON_HTTP_PACING_MS", default_value_t = 700)]
    pub http_pacing_ms: u64,

    /// Process names the sampler treats as licensed applications.
    #[arg(long, env = "BEACON_APPLICATION_ALLOW_LIST", value_delimiter = ',')]
    pub application_allow_list: Vec<String>,

    /// Queue depth above which the sampler is asked to slow down.
    #[arg(long, env = "BEACON_BACKPRESSURE_WATERMARK", default_value_t = 5_000)]
    pub backpressure_watermark: u64,
}

/// The subset of [`AgentConfig`] that may also be supplied via `--config-file`
/// as JSON. Unknown keys are rejected outright.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub sample_period_seconds: Option<u32>,
    pub network_period_seconds: Option<u32>,
    pub suppression_seconds: Option<u32>,
    pub queue_soft_cap: Option<u64>,
    pub queue_prune_threshold: Option<u64>,
    pub retry_ceiling: Option<u32>,
    pub stream_reconnect_probe_seconds: Option<u32>,
    pub http_pacing_ms: Option<u64>,
    pub application_allow_list: Option<Vec<String>>,
}

impl AgentConfig {
    /// Validate the configuration and apply any `--config-file` overlay.
    /// Fatal configuration problems are reported here, not discovered deep
    /// in a running worker.
    pub fn load(mut self) -> anyhow::Result<Self> {
        if let Some(ref path) = self.config_file {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
            let file: FileConfig = serde_json::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
            self.apply_overlay(file);
        }
        self.validate()?;
        Ok(self)
    }

    fn apply_overlay(&mut self, file: FileConfig) {
        if let Some(v) = file.api_url {
            self.api_url = v;
        }
        if let Some(v) = file.api_key {
            self.api_key = v;
        }
        if let Some(v) = file.sample_period_seconds {
            self.sample_period_seconds = v;
        }
        if let Some(v) = file.network_period_seconds {
            self.network_period_seconds = v;
        }
        if let Some(v) = file.suppression_seconds {
            self.suppression_seconds = v;
        }
        if let Some(v) = file.queue_soft_cap {
            self.queue_soft_cap = v;
        }
        if let Some(v) = file.queue_prune_threshold {
            self.queue_prune_threshold = v;
        }
        if let Some(v) = file.retry_ceiling {
            self.retry_ceiling = v;
        }
        if let Some(v) = file.stream_reconnect_probe_seconds {
            self.stream_reconnect_probe_seconds = v;
        }
        if let Some(v) = file.http_pacing_ms {
            self.http_pacing_ms = v;
        }
        if let Some(v) = file.application_allow_list {
            self.application_allow_list = v;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_url.trim().is_empty() {
            anyhow::bail!("--api-url must not be empty");
        }
        if self.api_key.trim().is_empty() {
            anyhow::bail!("--api-key must not be empty");
        }
        if !(1..=300).contains(&self.sample_period_seconds) {
            anyhow::bail!("--sample-period-seconds must be within 1..=300");
        }
        if self.queue_prune_threshold >= self.queue_soft_cap {
            anyhow::bail!("--queue-prune-threshold must be less than --queue-soft-cap");
        }
        Ok(())
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_secs(self.sample_period_seconds as u64)
    }

    pub fn network_period(&self) -> Duration {
        Duration::from_secs(self.network_period_seconds as u64)
    }

    pub fn suppression_window(&self) -> Duration {
        Duration::from_secs(self.suppression_seconds as u64)
    }

    pub fn http_pacing(&self) -> Duration {
        Duration::from_millis(self.http_pacing_ms)
    }

    pub fn stream_reconnect_probe(&self) -> Duration {
        Duration::from_secs(self.stream_reconnect_probe_seconds as u64)
    }

    /// Derive the `/ws/ingest` stream URL from the configured HTTP(S) api
    /// url.
    pub fn stream_url(&self) -> String {
        let trimmed = self.api_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = trimmed.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{trimmed}")
        };
        format!("{ws_base}/ws/ingest")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
