use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::VideoError;

/// Report of one successfully assembled video product.
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub output_path: PathBuf,
    pub frames_included: usize,
    pub frames_missing: usize,
    pub duration_secs: f64,
}

/// Invokes ffmpeg against a concat descriptor with the fixed encode
/// parameters from distilled spec §4.7 (H.264, yuv420p, CRF 18, faststart).
/// `crop_filter` is an optional `-vf` value layered on for the social
/// product's square crop.
pub async fn run_ffmpeg_concat(
    concat_path: &Path,
    output_path: &Path,
    fps: u32,
    crop_filter: Option<&str>,
) -> Result<(), VideoError> {
    let mut command = Command::new("ffmpeg");
    command
        .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-y"])
        .args(["-f", "concat", "-safe", "0"])
        .args(["-r", &fps.to_string()])
        .arg("-i")
        .arg(concat_path)
        .args(["-c:v", "libx264"])
        .args(["-pix_fmt", "yuv420p"])
        .args(["-crf", "18"])
        .args(["-movflags", "+faststart"]);

    if let Some(filter) = crop_filter {
        command.args(["-vf", filter]);
    }

    command
        .arg(output_path)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = command.output().await.map_err(VideoError::Spawn)?;

    if !output.status.success() {
        return Err(VideoError::EncoderFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}
