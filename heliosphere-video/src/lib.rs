pub mod concat;
pub mod encoder;
pub mod error;

use std::path::Path;

use heliosphere_core::Config;
use heliosphere_manifest::FrameRecord;

pub use concat::{select_window, write_concat_file, FrameSelection};
pub use encoder::{run_ffmpeg_concat, AssemblyReport};
pub use error::VideoError;

/// Square crop applied to the social product (distilled spec §4.5/§9 open
/// question, resolved to 1200×1200 — see SPEC_FULL.md).
const SOCIAL_CROP_SIZE: u32 = 1200;

/// Produces the full-window video product: the last `cfg.full_window_frames()`
/// committed frames, encoded per distilled spec §4.7.
pub async fn assemble_full(
    ordered_records: &[&FrameRecord],
    scratch_dir: &Path,
    output_path: &Path,
    cfg: &Config,
) -> Result<AssemblyReport, VideoError> {
    assemble(
        ordered_records,
        cfg.full_window_frames() as usize,
        scratch_dir,
        "heliosphere_full_concat.txt",
        output_path,
        cfg,
        None,
    )
    .await
}

/// Produces the social-window video product: the last
/// `cfg.social_window_frames()` committed frames, square-cropped.
pub async fn assemble_social(
    ordered_records: &[&FrameRecord],
    scratch_dir: &Path,
    output_path: &Path,
    cfg: &Config,
) -> Result<AssemblyReport, VideoError> {
    let crop = format!(
        "crop={size}:{size}:(in_w-{size})/2:(in_h-{size})/2",
        size = SOCIAL_CROP_SIZE
    );
    assemble(
        ordered_records,
        cfg.social_window_frames() as usize,
        scratch_dir,
        "heliosphere_social_concat.txt",
        output_path,
        cfg,
        Some(&crop),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn assemble(
    ordered_records: &[&FrameRecord],
    window_frames: usize,
    scratch_dir: &Path,
    concat_file_name: &str,
    output_path: &Path,
    cfg: &Config,
    crop_filter: Option<&str>,
) -> Result<AssemblyReport, VideoError> {
    let expected = window_frames.max(1);
    let selection = select_window(ordered_records, window_frames);
    let missing = expected.saturating_sub(selection.present.len());
    let percent_missing = missing_percent(missing, expected);

    if percent_missing > cfg.max_missing_frames_percent {
        return Err(VideoError::InsufficientFrames {
            present: selection.present.len(),
            expected,
            percent_missing,
            max_missing_percent: cfg.max_missing_frames_percent,
        });
    }

    std::fs::create_dir_all(scratch_dir)?;
    let paths: Vec<_> = selection.present.iter().map(|r| r.path.clone()).collect();
    let concat_path = write_concat_file(scratch_dir, concat_file_name, &paths)?;

    run_ffmpeg_concat(&concat_path, output_path, cfg.fps, crop_filter).await?;

    Ok(AssemblyReport {
        output_path: output_path.to_path_buf(),
        frames_included: selection.present.len(),
        frames_missing: missing,
        duration_secs: selection.present.len() as f64 / cfg.fps as f64,
    })
}

/// `missing` out of `expected`, as a percentage. `expected` is the full
/// configured window, not how many records were actually committed, so a
/// shortfall from upstream resolve failures (grid indices never committed
/// at all) counts against the missing percentage exactly like a committed
/// frame later lost from disk (distilled spec §8 scenario 6).
fn missing_percent(missing: usize, expected: usize) -> f64 {
    100.0 * missing as f64 / expected as f64
}
