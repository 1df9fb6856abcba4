//! Gravity cells and the atomically-swappable leaf slot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use nalgebra::{Point3, Vector3};

use field_octree::NodeId;

/// Aggregated mass and accumulated force for one force-tree leaf.
///
/// Immutable value type: the synthesis pass never mutates a published cell,
/// it builds a replacement and swaps the leaf's [`CellSlot`] to point at it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GravityCell {
    /// Id of the force-tree leaf this cell belongs to, used to match cells
    /// back to their leaves during the substitution pass.
    pub token: NodeId,
    /// Aggregated mass: samples stored at the leaf plus the redistributed
    /// share of every straddling ancestor sample.
    pub mass: f64,
    /// Geometric center of the leaf's bounding box.
    pub position: Point3<f64>,
    /// Accumulated force. Zero until the synthesis pass completes.
    pub force: Vector3<f64>,
}

impl GravityCell {
    /// Creates a cell with zero accumulated force.
    #[must_use]
    pub fn unsynthesized(token: NodeId, mass: f64, position: Point3<f64>) -> Self {
        Self {
            token,
            mass,
            position,
            force: Vector3::zeros(),
        }
    }

    /// Returns a copy of this cell carrying the given force.
    #[must_use]
    pub fn with_force(&self, force: Vector3<f64>) -> Self {
        Self { force, ..*self }
    }
}

/// The one mutable facet of the force tree: an atomically-replaceable
/// handle to a leaf's [`GravityCell`].
///
/// Readers dereference the handle exactly once per visit and therefore
/// always observe a complete, internally-consistent cell; the swap itself
/// never touches tree topology.
#[derive(Debug)]
pub struct CellSlot(ArcSwap<GravityCell>);

impl CellSlot {
    /// Creates a slot holding the given cell.
    #[must_use]
    pub fn new(cell: GravityCell) -> Self {
        Self(ArcSwap::from_pointee(cell))
    }

    /// Loads the current cell.
    #[must_use]
    pub fn load(&self) -> Arc<GravityCell> {
        self.0.load_full()
    }

    /// Atomically replaces the cell.
    pub fn store(&self, cell: GravityCell) {
        self.0.store(Arc::new(cell));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_swap_replaces_whole_cell() {
        let token = NodeId::next();
        let slot = CellSlot::new(GravityCell::unsynthesized(
            token,
            5.0,
            Point3::new(1.0, 2.0, 3.0),
        ));
        let before = slot.load();
        assert_eq!(before.force, Vector3::zeros());

        slot.store(before.with_force(Vector3::new(1.0, 0.0, 0.0)));
        let after = slot.load();
        assert_eq!(after.force, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(after.token, token);
        assert_eq!(after.mass, 5.0);
        // The previously loaded cell is unaffected by the swap.
        assert_eq!(before.force, Vector3::zeros());
    }
}
