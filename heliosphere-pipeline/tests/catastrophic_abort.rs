use std::time::Duration;

use chrono::{TimeZone, Utc};
use heliosphere_core::Config;
use heliosphere_pipeline::{run, PipelineError, RunContext};
use tokio_util::sync::CancellationToken;
use url::Url;

fn unreachable_upstream_cfg() -> Config {
    Config {
        total_days: 1,
        social_days: 1,
        safe_delay_days: 0,
        // Two grid points/day, so there would be a second one to (wrongly)
        // fetch if escalation didn't stop the run after the first.
        interval_minutes: 720,
        max_retries: 1,
        retry_backoff: Duration::from_millis(1),
        // Only the exact-match offset is tried, so one grid index fails fast.
        max_fallback_minutes: 0,
        max_consecutive_resolve_failures: 1,
        ..Config::default()
    }
}

/// A run whose upstream is entirely unreachable must escalate to
/// `CatastrophicUpstream` after `max_consecutive_resolve_failures` and stop
/// dispatching further grid indices (distilled spec §8 scenario 5).
#[tokio::test]
async fn catastrophic_abort_after_consecutive_failures() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = unreachable_upstream_cfg();
    let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();

    let ctx = RunContext {
        cfg,
        // Nothing listens on port 1: every fetch fails with connection refused.
        base_url: Url::parse("http://127.0.0.1:1").unwrap(),
        proxy_url: None,
        frames_dir: tmp.path().join("frames"),
        videos_dir: tmp.path().join("videos"),
        scratch_dir: tmp.path().join("scratch"),
        manifest_path: tmp.path().join("manifest.json"),
        now,
    };

    let err = run(ctx, CancellationToken::new()).await.unwrap_err();

    match err {
        PipelineError::CatastrophicUpstream { threshold, .. } => assert_eq!(threshold, 1),
        other => panic!("expected CatastrophicUpstream, got {other:?}"),
    }
}
