use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use heliosphere_core::Layer;

use crate::dedup::DedupSets;
use crate::error::ManifestError;
use crate::model::{FrameRecord, Stats};
use crate::wire::{ChecksumsWire, FrameWire, ManifestWire, StatsWire, MANIFEST_VERSION};

/// The checksum & manifest store (C4): frame records, per-layer dedup sets,
/// run-level counters, and the last checkpoint time. A single in-memory
/// value; all mutation goes through `commit_frame` (single-writer
/// discipline is the caller's job — see distilled spec §5).
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    frames: BTreeMap<u32, FrameRecord>,
    dedup: DedupSets,
    stats: Stats,
    last_checkpoint: Option<DateTime<Utc>>,
}

fn backup_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".backup");
    PathBuf::from(s)
}

impl ManifestStore {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frames: BTreeMap::new(),
            dedup: DedupSets::new(),
            stats: Stats::default(),
            last_checkpoint: None,
        }
    }

    /// Hydrates the store from `path`. Missing file yields an empty store.
    /// A corrupted manifest falls back to `path.backup`; if both are
    /// unreadable, the store starts empty and the run proceeds as a fresh
    /// build (distilled spec §4.4, §7 `ManifestCorrupt`).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.exists() {
            return Self::empty(path);
        }

        match read_wire(&path) {
            Ok(wire) => return Self::from_wire(path, wire),
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "manifest corrupt, trying backup");
            }
        }

        let backup = backup_path(&path);
        if backup.exists() {
            match read_wire(&backup) {
                Ok(wire) => return Self::from_wire(path, wire),
                Err(err) => {
                    tracing::warn!(error = %err, path = %backup.display(), "backup manifest also corrupt");
                }
            }
        }

        tracing::warn!(path = %path.display(), "manifest and backup both unreadable, starting fresh");
        Self::empty(path)
    }

    pub fn has_frame(&self, grid_index: u32) -> bool {
        self.frames.contains_key(&grid_index)
    }

    pub fn is_duplicate(&self, layer: Layer, hash: &str, grid_index: u32) -> bool {
        self.dedup.is_duplicate(layer, hash, grid_index)
    }

    /// Checks `hash` against the dedup set and, if it is not a duplicate,
    /// records it immediately. `commit_frame` also records both layers'
    /// hashes, idempotently, for grid indices committed without going
    /// through `try_reserve` first (e.g. restored from the wire format).
    pub fn try_reserve(&mut self, layer: Layer, hash: &str, grid_index: u32) -> bool {
        if self.dedup.is_duplicate(layer, hash, grid_index) {
            return false;
        }
        self.dedup.record(layer, hash, grid_index);
        true
    }

    /// Inserts `record` and updates both dedup sets. Atomic with respect to
    /// this in-memory store (distilled spec §4.4): either the whole commit
    /// lands, or (on `AlreadyCommitted`) nothing changes.
    pub fn commit_frame(&mut self, record: FrameRecord) -> Result<(), ManifestError> {
        if self.frames.contains_key(&record.grid_index) {
            return Err(ManifestError::AlreadyCommitted {
                grid_index: record.grid_index,
            });
        }

        self.dedup
            .record(Layer::Corona, &record.corona_checksum, record.grid_index);
        self.dedup
            .record(Layer::SunDisk, &record.sun_disk_checksum, record.grid_index);

        self.stats.completed_frames += 1;
        if record.used_fallback() {
            self.stats.fallbacks_used += 1;
        }

        self.frames.insert(record.grid_index, record);
        Ok(())
    }

    /// Frame records in ascending grid-index (== requested-timestamp) order.
    pub fn frames_ordered(&self) -> impl Iterator<Item = &FrameRecord> {
        self.frames.values()
    }

    pub fn frame(&self, grid_index: u32) -> Option<&FrameRecord> {
        self.frames.get(&grid_index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn last_checkpoint(&self) -> Option<DateTime<Utc>> {
        self.last_checkpoint
    }

    /// Drops dedup-set entries whose indices are all outside the retained
    /// window, per the manifest's documented garbage-collection lifecycle.
    pub fn gc_dedup_outside(&mut self, retained: std::ops::Range<u32>) {
        self.dedup.prune_outside(&retained);
    }

    /// Serializes the store atomically: write-to-temp + fsync + rename,
    /// rotating the previous file to `.backup` first (distilled spec §4.4, §3).
    pub fn checkpoint(&mut self) -> Result<(), ManifestError> {
        let wire = self.to_wire();
        let json = serde_json::to_vec_pretty(&wire)?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;

        if self.path.exists() {
            fs::rename(&self.path, backup_path(&self.path))?;
        }
        tmp.persist(&self.path)
            .map_err(|e| ManifestError::Io(e.error))?;

        self.last_checkpoint = Some(Utc::now());
        Ok(())
    }

    fn to_wire(&self) -> ManifestWire {
        let mut frames = BTreeMap::new();
        for record in self.frames.values() {
            frames.insert(
                record.requested.to_rfc3339(),
                FrameWire {
                    path: record.path.to_string_lossy().into_owned(),
                    date: record.sun_disk_resolved,
                    frame_number: record.grid_index,
                    corona_checksum: record.corona_checksum.clone(),
                    sun_disk_checksum: record.sun_disk_checksum.clone(),
                    corona_fallback_minutes: record.corona_fallback_minutes,
                    sun_disk_fallback_minutes: record.sun_disk_fallback_minutes,
                    file_size: record.file_size,
                    created: record.created,
                },
            );
        }

        let mut checksums = ChecksumsWire::default();
        for (hash, indices) in self.dedup.iter(Layer::Corona) {
            checksums.corona.insert(hash.to_string(), indices);
        }
        for (hash, indices) in self.dedup.iter(Layer::SunDisk) {
            checksums.sun_disk.insert(hash.to_string(), indices);
        }

        ManifestWire {
            version: MANIFEST_VERSION.to_string(),
            generated_at: Utc::now(),
            frames,
            checksums,
            stats: StatsWire {
                completed_frames: self.stats.completed_frames,
                fallbacks_used: self.stats.fallbacks_used,
            },
        }
    }

    fn from_wire(path: PathBuf, wire: ManifestWire) -> Self {
        let mut frames = BTreeMap::new();
        for (requested_str, frame) in wire.frames {
            let Ok(requested) = DateTime::parse_from_rfc3339(&requested_str) else {
                tracing::warn!(key = %requested_str, "skipping frame with unparsable requested timestamp");
                continue;
            };
            let requested = requested.with_timezone(&Utc);
            let corona_resolved =
                requested + ChronoDuration::minutes(frame.corona_fallback_minutes);

            frames.insert(
                frame.frame_number,
                FrameRecord {
                    grid_index: frame.frame_number,
                    requested,
                    corona_resolved,
                    sun_disk_resolved: frame.date,
                    corona_fallback_minutes: frame.corona_fallback_minutes,
                    sun_disk_fallback_minutes: frame.sun_disk_fallback_minutes,
                    corona_checksum: frame.corona_checksum,
                    sun_disk_checksum: frame.sun_disk_checksum,
                    path: PathBuf::from(frame.path),
                    file_size: frame.file_size,
                    created: frame.created,
                },
            );
        }

        let mut dedup = DedupSets::new();
        for (hash, indices) in wire.checksums.corona {
            dedup.insert_from_wire(Layer::Corona, &hash, &indices);
        }
        for (hash, indices) in wire.checksums.sun_disk {
            dedup.insert_from_wire(Layer::SunDisk, &hash, &indices);
        }

        Self {
            path,
            frames,
            dedup,
            stats: Stats {
                completed_frames: wire.stats.completed_frames,
                fallbacks_used: wire.stats.fallbacks_used,
            },
            last_checkpoint: Some(wire.generated_at),
        }
    }
}

fn read_wire(path: &Path) -> Result<ManifestWire, ManifestError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record(grid_index: u32) -> FrameRecord {
        let requested = Utc::now();
        FrameRecord {
            grid_index,
            requested,
            corona_resolved: requested,
            sun_disk_resolved: requested,
            corona_fallback_minutes: 0,
            sun_disk_fallback_minutes: 0,
            corona_checksum: format!("corona-{grid_index}"),
            sun_disk_checksum: format!("sundisk-{grid_index}"),
            path: PathBuf::from(format!("/frames/frame_{grid_index}.jpg")),
            file_size: 12_345,
            created: requested,
        }
    }

    #[test]
    fn missing_file_yields_empty_store() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::load(dir.path().join("frame_manifest.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn commit_then_checkpoint_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame_manifest.json");

        let mut store = ManifestStore::empty(&path);
        store.commit_frame(sample_record(0)).unwrap();
        store.commit_frame(sample_record(1)).unwrap();
        store.checkpoint().unwrap();

        let reloaded = ManifestStore::load(&path);
        assert!(reloaded.has_frame(0));
        assert!(reloaded.has_frame(1));
        assert_eq!(reloaded.stats().completed_frames, 2);
        assert!(path.with_extension("json.backup").exists() == false); // no prior file to back up yet
    }

    #[test]
    fn second_checkpoint_rotates_a_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame_manifest.json");

        let mut store = ManifestStore::empty(&path);
        store.commit_frame(sample_record(0)).unwrap();
        store.checkpoint().unwrap();
        store.commit_frame(sample_record(1)).unwrap();
        store.checkpoint().unwrap();

        let backup = backup_path(&path);
        assert!(backup.exists());
    }

    #[test]
    fn corrupt_manifest_falls_back_to_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame_manifest.json");

        let mut store = ManifestStore::empty(&path);
        store.commit_frame(sample_record(0)).unwrap();
        store.checkpoint().unwrap(); // no backup yet
        store.commit_frame(sample_record(1)).unwrap();
        store.checkpoint().unwrap(); // now path has 2 frames, backup has 1

        fs::write(&path, b"{ not json").unwrap();

        let reloaded = ManifestStore::load(&path);
        assert!(reloaded.has_frame(0));
        assert!(!reloaded.has_frame(1));
    }

    #[test]
    fn double_commit_of_same_index_is_rejected() {
        let mut store = ManifestStore::empty("/tmp/does-not-matter.json");
        store.commit_frame(sample_record(5)).unwrap();
        let err = store.commit_frame(sample_record(5)).unwrap_err();
        assert!(matches!(err, ManifestError::AlreadyCommitted { grid_index: 5 }));
    }
}
