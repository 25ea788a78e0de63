use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// The authoritative provenance for one committed output frame (distilled spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// Grid index this record was produced for; also its key in [`crate::store::ManifestStore`].
    pub grid_index: u32,
    /// The requested grid timestamp.
    pub requested: DateTime<Utc>,
    /// Resolved (possibly fallback-shifted) timestamp actually used for the corona layer.
    pub corona_resolved: DateTime<Utc>,
    /// Resolved timestamp actually used for the sun-disk layer.
    pub sun_disk_resolved: DateTime<Utc>,
    /// Minute offset from `requested` to `corona_resolved`; 0 when an exact match was used.
    pub corona_fallback_minutes: i64,
    pub sun_disk_fallback_minutes: i64,
    pub corona_checksum: String,
    pub sun_disk_checksum: String,
    pub path: PathBuf,
    pub file_size: u64,
    pub created: DateTime<Utc>,
}

impl FrameRecord {
    pub fn used_fallback(&self) -> bool {
        self.corona_fallback_minutes != 0 || self.sun_disk_fallback_minutes != 0
    }
}

/// Run-level counters persisted alongside the manifest (distilled spec §3, §6 `stats`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub completed_frames: u32,
    pub fallbacks_used: u32,
}
