// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn base() -> AgentConfig {
    AgentConfig {
        api_url: "https://ingest.example.com".to_owned(),
        api_key: "00000000-0000-0000-0000-000000000000".to_owned(),
        config_file: None,
        data_dir: PathBuf::from("./beacon-data"),
        sample_period_seconds: 10,
        network_period_seconds: 30,
        suppression_seconds: 60,
        queue_soft_cap: 10_000,
        queue_prune_threshold: 8_000,
        retry_ceiling: 10,
        stream_reconnect_probe_seconds: 300,
        http_pacing_ms: 700,
        application_allow_list: vec![],
        backpressure_watermark: 5_000,
    }
}

#[test]
fn rejects_out_of_range_sample_period() {
    let mut cfg = base();
    cfg.sample_period_seconds = 0;
    assert!(cfg.validate().is_err());
    cfg.sample_period_seconds = 301;
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_prune_threshold_above_cap() {
    let mut cfg = base();
    cfg.queue_prune_threshold = cfg.queue_soft_cap;
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_defaults() {
    assert!(base().validate().is_ok());
}

#[test]
fn derives_wss_stream_url_from_https_api_url() {
    let cfg = base();
    assert_eq!(cfg.stream_url(), "wss://ingest.example.com/ws/ingest");
}
