use crate::layer::Layer;

/// Lets consumers outside `heliosphere-manifest` query duplicate status
/// without depending on that crate directly, avoiding a cycle between
/// fetch (needs to know) and manifest (owns the answer).
pub trait DuplicateOracle: Send + Sync {
    fn is_duplicate(&self, layer: Layer, hash: &str, grid_index: u32) -> bool;

    /// Atomically checks `hash` against the dedup set and, if it is not a
    /// duplicate, records it immediately, closing the window where two
    /// concurrently-resolving grid indices could both accept the same
    /// upstream duplicate before either commits (distilled spec §4.3 step 3:
    /// the dedup set is updated as part of acceptance, not only at commit).
    /// Returns `true` iff `hash` was accepted (and thus now reserved) for
    /// `grid_index`.
    fn try_reserve(&self, layer: Layer, hash: &str, grid_index: u32) -> bool;
}

/// An oracle that never reports a duplicate; useful for tests and for
/// the first frame of a run, where no prior state exists yet.
pub struct NeverDuplicate;

impl DuplicateOracle for NeverDuplicate {
    fn is_duplicate(&self, _layer: Layer, _hash: &str, _grid_index: u32) -> bool {
        false
    }

    fn try_reserve(&self, _layer: Layer, _hash: &str, _grid_index: u32) -> bool {
        true
    }
}
