use std::path::{Path, PathBuf};

use heliosphere_manifest::FrameRecord;

use crate::error::VideoError;

/// One product's frame selection: the subset of committed records (already
/// in ascending order) that contribute to a given output, and which of
/// those are missing their file on disk.
pub struct FrameSelection<'a> {
    pub present: Vec<&'a FrameRecord>,
    pub missing_count: usize,
}

/// Takes the last `window_frames` committed records (ascending order) and
/// splits them into present/missing by filesystem existence, matching
/// distilled spec §4.7's divergence handling.
pub fn select_window<'a>(
    ordered_records: &[&'a FrameRecord],
    window_frames: usize,
) -> FrameSelection<'a> {
    let start = ordered_records.len().saturating_sub(window_frames);
    let window = &ordered_records[start..];

    let mut present = Vec::with_capacity(window.len());
    let mut missing_count = 0;
    for record in window {
        if record.path.exists() {
            present.push(*record);
        } else {
            tracing::warn!(path = %record.path.display(), "committed frame missing on disk, omitting from concat");
            missing_count += 1;
        }
    }

    FrameSelection {
        present,
        missing_count,
    }
}

/// Writes an ffmpeg concat-demuxer descriptor listing `paths` in order.
pub fn write_concat_file(dir: &Path, file_name: &str, paths: &[PathBuf]) -> Result<PathBuf, VideoError> {
    let path = dir.join(file_name);
    let mut body = String::new();
    for p in paths {
        body.push_str(&format!("file '{}'\n", escape_single_quotes(p)));
    }
    std::fs::write(&path, body)?;
    Ok(path)
}

fn escape_single_quotes(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn record(grid_index: u32, path: PathBuf) -> FrameRecord {
        let now = Utc::now();
        FrameRecord {
            grid_index,
            requested: now,
            corona_resolved: now,
            sun_disk_resolved: now,
            corona_fallback_minutes: 0,
            sun_disk_fallback_minutes: 0,
            corona_checksum: "c".into(),
            sun_disk_checksum: "s".into(),
            path,
            file_size: 10,
            created: now,
        }
    }

    #[test]
    fn selects_last_n_frames_and_flags_missing() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("frame_0000.jpg");
        std::fs::write(&existing, b"x").unwrap();
        let missing = dir.path().join("frame_0001.jpg");

        let r0 = record(0, existing);
        let r1 = record(1, missing);
        let ordered: Vec<&FrameRecord> = vec![&r0, &r1];

        let selection = select_window(&ordered, 2);
        assert_eq!(selection.present.len(), 1);
        assert_eq!(selection.missing_count, 1);
    }

    #[test]
    fn window_smaller_than_available_takes_the_tail() {
        let dir = tempdir().unwrap();
        let records: Vec<FrameRecord> = (0..5)
            .map(|i| {
                let p = dir.path().join(format!("frame_{i:04}.jpg"));
                std::fs::write(&p, b"x").unwrap();
                record(i, p)
            })
            .collect();
        let ordered: Vec<&FrameRecord> = records.iter().collect();

        let selection = select_window(&ordered, 2);
        assert_eq!(selection.present.len(), 2);
        assert_eq!(selection.present[0].grid_index, 3);
        assert_eq!(selection.present[1].grid_index, 4);
    }
}
