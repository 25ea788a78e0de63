//! The on-disk JSON shape of the manifest (distilled spec §6). Field names
//! here are stable API and must not be renamed without a version bump.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MANIFEST_VERSION: &str = "1";

#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestWire {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub frames: BTreeMap<String, FrameWire>,
    pub checksums: ChecksumsWire,
    pub stats: StatsWire,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FrameWire {
    pub path: String,
    /// Resolved timestamp for the sun-disk layer (field name `date` is inherited
    /// from the upstream manifest schema this format mirrors).
    pub date: DateTime<Utc>,
    pub frame_number: u32,
    pub corona_checksum: String,
    pub sun_disk_checksum: String,
    pub corona_fallback_minutes: i64,
    pub sun_disk_fallback_minutes: i64,
    pub file_size: u64,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ChecksumsWire {
    pub corona: BTreeMap<String, Vec<u32>>,
    pub sun_disk: BTreeMap<String, Vec<u32>>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy)]
pub struct StatsWire {
    pub completed_frames: u32,
    pub fallbacks_used: u32,
}
