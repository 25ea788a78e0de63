use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use heliosphere_core::{build_grid, Config, Layer};
use heliosphere_fetch::{resolve, ResolveError, SourceClient};
use heliosphere_manifest::{FrameRecord, ManifestStore};
use heliosphere_video::{assemble_full, assemble_social, AssemblyReport};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::PipelineError;
use crate::manifest_handle::ManifestHandle;
use crate::paths::{frame_path, write_frame_atomically};

/// Everything the orchestrator needs for one run; the `now` field is
/// explicit (rather than read from the clock inside `run`) so grid
/// planning stays a pure, testable function of its inputs.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub cfg: Config,
    pub base_url: Url,
    pub proxy_url: Option<Url>,
    pub frames_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub now: DateTime<Utc>,
}

impl RunContext {
    /// Builds a context from environment variables plus the paths/clock the
    /// caller already knows: `HELIOSPHERE_BASE_URL` (required) and
    /// `HELIOSPHERE_PROXY_URL` (optional). Everything else is config, not
    /// secrets, so it stays a constructor argument rather than more env vars.
    pub fn from_env(
        cfg: Config,
        frames_dir: PathBuf,
        videos_dir: PathBuf,
        scratch_dir: PathBuf,
        manifest_path: PathBuf,
        now: DateTime<Utc>,
    ) -> Result<Self, PipelineError> {
        let base_url = Url::parse(&shared_utils::env::get_env_var("HELIOSPHERE_BASE_URL")?)?;
        let proxy_url = match std::env::var("HELIOSPHERE_PROXY_URL") {
            Ok(raw) => Some(Url::parse(&raw)?),
            Err(_) => None,
        };
        Ok(Self {
            cfg,
            base_url,
            proxy_url,
            frames_dir,
            videos_dir,
            scratch_dir,
            manifest_path,
            now,
        })
    }
}

/// Summary of one orchestrator run (distilled spec §4.6, §6 exit codes).
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub planned_frames: usize,
    pub skipped_already_complete: usize,
    pub committed_frames: usize,
    pub missing_frames: usize,
    pub fallbacks_used: u32,
    pub cancelled: bool,
    pub catastrophic: bool,
    pub full_video: Option<AssemblyReport>,
    pub social_video: Option<AssemblyReport>,
}

/// The result of fetching both layers for one grid index, ready for C5.
struct FetchedUnit {
    grid_index: u32,
    requested: DateTime<Utc>,
    corona: heliosphere_fetch::RawImage,
    corona_offset: i64,
    sun_disk: heliosphere_fetch::RawImage,
    sun_disk_offset: i64,
}

/// Drives the grid through fetch → compose → persist with two bounded
/// worker pools and backpressure between them (distilled spec §4.6, §5).
/// Single public entry point for the frame-production pipeline.
pub async fn run(ctx: RunContext, cancel: CancellationToken) -> Result<RunOutcome, PipelineError> {
    let grid = build_grid(ctx.now, &ctx.cfg)?;
    let manifest = ManifestHandle::new(ManifestStore::load(ctx.manifest_path.clone()));
    let client = Arc::new(SourceClient::new(ctx.base_url.clone(), ctx.proxy_url.clone(), &ctx.cfg)?);

    {
        let timeout_cancel = cancel.clone();
        let wall_clock = ctx.cfg.wall_clock_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(wall_clock).await;
            warn!("wall clock timeout reached, cancelling run");
            timeout_cancel.cancel();
        });
    }

    let to_process: Vec<_> = grid
        .iter()
        .filter(|point| {
            let complete = manifest.has_frame(point.index)
                && frame_path(&ctx.frames_dir, point.timestamp).exists();
            !complete
        })
        .cloned()
        .collect();
    let skipped_already_complete = grid.len() - to_process.len();
    info!(
        planned = grid.len(),
        skipped_already_complete,
        to_fetch = to_process.len(),
        "grid planned"
    );

    let (tx, mut rx) = mpsc::channel::<FetchedUnit>(ctx.cfg.process_concurrency * 2);
    let fetch_semaphore = Arc::new(Semaphore::new(ctx.cfg.fetch_concurrency));
    let consecutive_failures = Arc::new(AtomicU32::new(0));
    let catastrophic_hit = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let mut fetch_tasks = JoinSet::new();
    for point in to_process {
        if cancel.is_cancelled() {
            break;
        }
        let permit = fetch_semaphore.clone().acquire_owned().await.expect("semaphore not closed");
        let client = Arc::clone(&client);
        let manifest = manifest.clone();
        let tx = tx.clone();
        let cfg = ctx.cfg.clone();
        let consecutive_failures = Arc::clone(&consecutive_failures);
        let catastrophic_hit = Arc::clone(&catastrophic_hit);
        let cancel = cancel.clone();

        fetch_tasks.spawn(async move {
            let _permit = permit;
            let corona_fut = resolve(&client, &manifest, Layer::Corona, point.timestamp, point.index, &cfg);
            let sun_disk_fut = resolve(&client, &manifest, Layer::SunDisk, point.timestamp, point.index, &cfg);
            let (corona_res, sun_disk_res) = tokio::join!(corona_fut, sun_disk_fut);

            match (corona_res, sun_disk_res) {
                (Ok(corona), Ok(sun_disk)) => {
                    consecutive_failures.store(0, Ordering::SeqCst);
                    let unit = FetchedUnit {
                        grid_index: point.index,
                        requested: point.timestamp,
                        corona_offset: corona.offset_minutes,
                        corona: corona.image,
                        sun_disk_offset: sun_disk.offset_minutes,
                        sun_disk: sun_disk.image,
                    };
                    let _ = tx.send(unit).await;
                    false
                }
                (corona_res, sun_disk_res) => {
                    log_resolve_failure(point.index, Layer::Corona, corona_res.err());
                    log_resolve_failure(point.index, Layer::SunDisk, sun_disk_res.err());
                    let failures = consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                    if failures >= cfg.max_consecutive_resolve_failures {
                        catastrophic_hit.store(true, Ordering::SeqCst);
                        cancel.cancel();
                    }
                    true
                }
            }
        });
    }
    drop(tx);

    let process_semaphore = Arc::new(Semaphore::new(ctx.cfg.process_concurrency));
    let mut process_tasks = JoinSet::new();
    let committed = Arc::new(AtomicU32::new(0));
    let missing = Arc::new(AtomicU32::new(0));

    while let Some(unit) = rx.recv().await {
        if cancel.is_cancelled() {
            missing.fetch_add(1, Ordering::SeqCst);
            continue;
        }
        let permit = process_semaphore.clone().acquire_owned().await.expect("semaphore not closed");
        let manifest = manifest.clone();
        let frames_dir = ctx.frames_dir.clone();
        let cfg = ctx.cfg.clone();
        let committed = Arc::clone(&committed);
        let missing = Arc::clone(&missing);

        process_tasks.spawn(async move {
            let _permit = permit;
            match process_unit(unit, &frames_dir, &cfg, &manifest).await {
                Ok(()) => {
                    committed.fetch_add(1, Ordering::SeqCst);
                    let count = manifest.stats().completed_frames;
                    if count % cfg.batch_size as u32 == 0 {
                        if let Err(err) = manifest.checkpoint().await {
                            warn!(%err, "periodic checkpoint failed");
                        }
                    }
                }
                Err(err) => {
                    warn!(%err, "compositing failed, marking grid index missing");
                    missing.fetch_add(1, Ordering::SeqCst);
                }
            }
        });
    }

    while let Some(res) = fetch_tasks.join_next().await {
        if let Ok(true) = res {
            missing.fetch_add(1, Ordering::SeqCst);
        }
    }
    while process_tasks.join_next().await.is_some() {}

    manifest.checkpoint().await?;

    let cancelled = cancel.is_cancelled() && !catastrophic_hit.load(Ordering::SeqCst);
    let is_catastrophic = catastrophic_hit.load(Ordering::SeqCst);

    let mut outcome = RunOutcome {
        planned_frames: grid.len(),
        skipped_already_complete,
        committed_frames: committed.load(Ordering::SeqCst) as usize,
        missing_frames: missing.load(Ordering::SeqCst) as usize,
        fallbacks_used: manifest.stats().fallbacks_used,
        cancelled,
        catastrophic: is_catastrophic,
        full_video: None,
        social_video: None,
    };

    if is_catastrophic {
        return Err(PipelineError::CatastrophicUpstream {
            threshold: ctx.cfg.max_consecutive_resolve_failures,
            grid_index: grid.last().map(|p| p.index).unwrap_or(0),
        });
    }

    if !cancelled {
        let records = manifest.frames_ordered_cloned();
        let refs: Vec<&FrameRecord> = records.iter().collect();
        std::fs::create_dir_all(&ctx.videos_dir)?;
        let date_tag = ctx.now.format("%Y-%m-%d").to_string();

        match assemble_full(
            &refs,
            &ctx.scratch_dir,
            &ctx.videos_dir.join(format!("heliosphere_full_{date_tag}.mp4")),
            &ctx.cfg,
        )
        .await
        {
            Ok(report) => outcome.full_video = Some(report),
            Err(err) => warn!(%err, "full video assembly failed"),
        }

        match assemble_social(
            &refs,
            &ctx.scratch_dir,
            &ctx.videos_dir.join(format!("heliosphere_social_{date_tag}.mp4")),
            &ctx.cfg,
        )
        .await
        {
            Ok(report) => outcome.social_video = Some(report),
            Err(err) => warn!(%err, "social video assembly failed"),
        }
    }

    Ok(outcome)
}

fn log_resolve_failure(grid_index: u32, layer: Layer, err: Option<ResolveError>) {
    if let Some(err) = err {
        debug!(grid_index, %layer, attempts = err.attempted().len(), "resolve failed");
    }
}

#[derive(Debug, thiserror::Error)]
enum ProcessError {
    #[error("compositing: {0}")]
    Composite(#[from] heliosphere_compositor::CompositeError),
    #[error("writing frame to disk: {0}")]
    Io(#[from] std::io::Error),
}

async fn process_unit(
    unit: FetchedUnit,
    frames_dir: &std::path::Path,
    cfg: &Config,
    manifest: &ManifestHandle,
) -> Result<(), ProcessError> {
    let jpeg = heliosphere_compositor::composite(&unit.corona.bytes, &unit.sun_disk.bytes, cfg)?;
    let path = frame_path(frames_dir, unit.requested);
    write_frame_atomically(&path, &jpeg)?;

    let record = FrameRecord {
        grid_index: unit.grid_index,
        requested: unit.requested,
        corona_resolved: unit.requested + chrono::Duration::minutes(unit.corona_offset),
        sun_disk_resolved: unit.requested + chrono::Duration::minutes(unit.sun_disk_offset),
        corona_fallback_minutes: unit.corona_offset,
        sun_disk_fallback_minutes: unit.sun_disk_offset,
        corona_checksum: unit.corona.content_hash,
        sun_disk_checksum: unit.sun_disk.content_hash,
        file_size: jpeg.len() as u64,
        created: Utc::now(),
        path,
    };

    if let Err(err) = manifest.commit_frame(record) {
        warn!(%err, grid_index = unit.grid_index, "commit failed (already committed?)");
    }
    Ok(())
}
