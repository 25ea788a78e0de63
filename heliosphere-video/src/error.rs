use thiserror::Error;

/// C7 video-assembly errors (distilled spec §7).
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("writing concat descriptor: {0}")]
    Io(#[from] std::io::Error),

    #[error("spawning ffmpeg: {0}")]
    Spawn(std::io::Error),

    #[error("ffmpeg exited with status {status}: {stderr}")]
    EncoderFailed { status: String, stderr: String },

    #[error(
        "only {present}/{expected} frames present ({percent_missing:.1}% missing, max {max_missing_percent:.1}%)"
    )]
    InsufficientFrames {
        present: usize,
        expected: usize,
        percent_missing: f64,
        max_missing_percent: f64,
    },
}
