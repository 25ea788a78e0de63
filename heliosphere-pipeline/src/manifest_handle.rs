use std::sync::{Arc, RwLock};

use heliosphere_core::{DuplicateOracle, Layer};
use heliosphere_manifest::{FrameRecord, ManifestError, ManifestStore, Stats};

/// Shared handle to the manifest store (distilled spec §5's "mutex around
/// the store" option). Reads (`has_frame`, `is_duplicate`) take a read
/// lock and never block each other; `commit_frame` takes a brief write
/// lock for an in-memory-only mutation; `checkpoint` runs its file I/O on
/// a blocking thread so it never stalls the async runtime.
#[derive(Clone)]
pub struct ManifestHandle(Arc<RwLock<ManifestStore>>);

impl ManifestHandle {
    pub fn new(store: ManifestStore) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    pub fn has_frame(&self, grid_index: u32) -> bool {
        self.0.read().expect("manifest lock poisoned").has_frame(grid_index)
    }

    pub fn commit_frame(&self, record: FrameRecord) -> Result<(), ManifestError> {
        self.0
            .write()
            .expect("manifest lock poisoned")
            .commit_frame(record)
    }

    pub async fn checkpoint(&self) -> Result<(), ManifestError> {
        let inner = Arc::clone(&self.0);
        tokio::task::spawn_blocking(move || {
            inner
                .write()
                .expect("manifest lock poisoned")
                .checkpoint()
        })
        .await
        .expect("checkpoint task panicked")
    }

    pub fn stats(&self) -> Stats {
        self.0.read().expect("manifest lock poisoned").stats()
    }

    pub fn frames_ordered_cloned(&self) -> Vec<FrameRecord> {
        self.0
            .read()
            .expect("manifest lock poisoned")
            .frames_ordered()
            .cloned()
            .collect()
    }
}

impl DuplicateOracle for ManifestHandle {
    fn is_duplicate(&self, layer: Layer, hash: &str, grid_index: u32) -> bool {
        self.0
            .read()
            .expect("manifest lock poisoned")
            .is_duplicate(layer, hash, grid_index)
    }

    fn try_reserve(&self, layer: Layer, hash: &str, grid_index: u32) -> bool {
        self.0
            .write()
            .expect("manifest lock poisoned")
            .try_reserve(layer, hash, grid_index)
    }
}
