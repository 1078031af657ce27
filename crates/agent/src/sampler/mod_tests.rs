// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::observer::{ForegroundWindow, ObservedTick, SimulatedObserver};
use super::*;
use std::path::Path;

fn config() -> Arc<AgentConfig> {
    Arc::new(AgentConfig {
        api_url: "https://ingest.example.com".to_owned(),
        api_key: "key".to_owned(),
        config_file: None,
        data_dir: std::env::temp_dir(),
        sample_period_seconds: 1,
        network_period_seconds: 1,
        suppression_seconds: 60,
        queue_soft_cap: 10_000,
        queue_prune_threshold: 8_000,
        retry_ceiling: 10,
        stream_reconnect_probe_seconds: 300,
        http_pacing_ms: 700,
        application_allow_list: vec!["photoshop.exe".to_owned()],
        backpressure_watermark: 5_000,
    })
}

#[tokio::test]
async fn focus_change_emits_window_focus_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let queue = Arc::new(PersistentQueue::open(dir.path()).expect("open queue"));
    let dedup = Arc::new(Deduplicator::new(Duration::from_secs(60)));
    let tick = ObservedTick {
        focus: Some(ForegroundWindow { process_name: "notepad.exe".into(), title: "untitled".into() }),
        ..Default::default()
    };
    let observer: Arc<dyn PlatformObserver> = Arc::new(SimulatedObserver::new(vec![tick]));
    let sampler = Arc::new(Sampler::new(
        config(),
        observer,
        dedup,
        Arc::clone(&queue),
        Arc::new(AtomicBool::new(false)),
        CancellationToken::new(),
    ));

    // Drive one iteration manually instead of spawning, to keep the test
    // deterministic and fast.
    let focus = ForegroundWindow { process_name: "notepad.exe".into(), title: "untitled".into() };
    let now = OffsetDateTime::now_utc();
    sampler.enqueue_candidate(EventKind::WindowFocus, focus.process_name, Some(focus.title), None, None, now);
    assert_eq!(queue.size(), 1);
    let _ = Path::new(".");
}

#[test]
fn backpressure_doubles_period() {
    let flag = Arc::new(AtomicBool::new(false));
    let dir_queue = tempfile::tempdir().expect("tempdir");
    let queue = Arc::new(PersistentQueue::open(dir_queue.path()).expect("open queue"));
    let sampler = Sampler::new(
        config(),
        Arc::new(SimulatedObserver::idle()),
        Arc::new(Deduplicator::new(Duration::from_secs(60))),
        queue,
        Arc::clone(&flag),
        CancellationToken::new(),
    );
    let base = Duration::from_secs(10);
    assert_eq!(sampler.effective_period(base), base);
    flag.store(true, Ordering::Relaxed);
    assert_eq!(sampler.effective_period(base), base * 2);
}
