//! Per-layer dedup sets: `hex hash -> grid indices that accepted it`.
//!
//! The grid-index side of each entry is stored as a [`RoaringBitmap`] rather
//! than a `Vec<u32>` so that adjacency checks and inserts stay cheap even
//! when a hash has been accepted at many grid points (see distilled spec
//! §3's "Dedup sets" definition). The wire form in the manifest JSON is a
//! plain sorted array (distilled spec §6); conversion between the two lives
//! at the edge, in `wire.rs`, not here.

use std::collections::HashMap;

use heliosphere_core::Layer;
use roaring::RoaringBitmap;

#[derive(Debug, Clone, Default)]
pub struct DedupSets {
    corona: HashMap<String, RoaringBitmap>,
    sun_disk: HashMap<String, RoaringBitmap>,
}

impl DedupSets {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, layer: Layer) -> &HashMap<String, RoaringBitmap> {
        match layer {
            Layer::Corona => &self.corona,
            Layer::SunDisk => &self.sun_disk,
        }
    }

    fn set_mut(&mut self, layer: Layer) -> &mut HashMap<String, RoaringBitmap> {
        match layer {
            Layer::Corona => &mut self.corona,
            Layer::SunDisk => &mut self.sun_disk,
        }
    }

    /// A hash is a duplicate for `grid_index` iff it's already bound to some
    /// *other* grid index whose distance from `grid_index` exceeds 1.
    /// Grid-adjacent repeats (`|Δindex| == 1`) are tolerated (distilled spec §3).
    pub fn is_duplicate(&self, layer: Layer, hash: &str, grid_index: u32) -> bool {
        match self.set(layer).get(hash) {
            Some(indices) => indices
                .iter()
                .any(|i| (i as i64 - grid_index as i64).abs() > 1),
            None => false,
        }
    }

    pub fn record(&mut self, layer: Layer, hash: &str, grid_index: u32) {
        self.set_mut(layer)
            .entry(hash.to_string())
            .or_default()
            .insert(grid_index);
    }

    pub fn remove_index(&mut self, layer: Layer, hash: &str, grid_index: u32) {
        if let Some(indices) = self.set_mut(layer).get_mut(hash) {
            indices.remove(grid_index);
            if indices.is_empty() {
                self.set_mut(layer).remove(hash);
            }
        }
    }

    pub fn iter(&self, layer: Layer) -> impl Iterator<Item = (&str, Vec<u32>)> {
        self.set(layer)
            .iter()
            .map(|(h, bm)| (h.as_str(), bm.iter().collect()))
    }

    pub fn insert_from_wire(&mut self, layer: Layer, hash: &str, indices: &[u32]) {
        let bm = self.set_mut(layer).entry(hash.to_string()).or_default();
        for &i in indices {
            bm.insert(i);
        }
    }

    /// Drops dedup entries whose referenced grid indices are all outside
    /// `retained`. Part of the manifest's documented lifecycle (distilled
    /// spec §3): dedup sets grow monotonically within the retention window,
    /// but entries fully outside it may be garbage-collected.
    pub fn prune_outside(&mut self, retained: &std::ops::Range<u32>) {
        for set in [&mut self.corona, &mut self.sun_disk] {
            set.retain(|_, indices| indices.iter().any(|i| retained.contains(&i)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_repeat_is_tolerated() {
        let mut sets = DedupSets::new();
        sets.record(Layer::Corona, "abc", 10);
        assert!(!sets.is_duplicate(Layer::Corona, "abc", 11));
        assert!(!sets.is_duplicate(Layer::Corona, "abc", 9));
    }

    #[test]
    fn non_adjacent_repeat_is_a_duplicate() {
        let mut sets = DedupSets::new();
        sets.record(Layer::Corona, "abc", 10);
        assert!(sets.is_duplicate(Layer::Corona, "abc", 12));
        assert!(sets.is_duplicate(Layer::Corona, "abc", 8));
    }

    #[test]
    fn layers_are_independent() {
        let mut sets = DedupSets::new();
        sets.record(Layer::Corona, "abc", 10);
        assert!(!sets.is_duplicate(Layer::SunDisk, "abc", 50));
    }

    #[test]
    fn same_grid_index_is_never_a_duplicate_of_itself() {
        let mut sets = DedupSets::new();
        sets.record(Layer::Corona, "abc", 10);
        assert!(!sets.is_duplicate(Layer::Corona, "abc", 10));
    }
}
