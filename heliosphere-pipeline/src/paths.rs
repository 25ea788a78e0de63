use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// `FRAMES_DIR/YYYY-MM-DD/frame_HHMM.jpg` for one grid timestamp (distilled spec §6).
pub fn frame_path(frames_dir: &Path, timestamp: DateTime<Utc>) -> PathBuf {
    frames_dir
        .join(timestamp.format("%Y-%m-%d").to_string())
        .join(format!("frame_{}.jpg", timestamp.format("%H%M")))
}

/// Writes `bytes` to `path` atomically: temp file in the same directory,
/// fsync, then rename. Mirrors the manifest store's own checkpoint
/// discipline (distilled spec §4.4) applied to frame output.
pub fn write_frame_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_frame_path() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 5, 4, 46, 0).unwrap();
        let path = frame_path(Path::new("/base/frames"), ts);
        assert_eq!(path, PathBuf::from("/base/frames/2026-03-05/frame_0446.jpg"));
    }

    #[test]
    fn atomic_write_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        write_frame_atomically(&path, b"hello").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }
}
