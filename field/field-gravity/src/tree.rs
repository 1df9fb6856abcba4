//! Force-field tree: derivation from a snapshot tree and force synthesis.
//!
//! The force tree mirrors the shape of the snapshot tree it was derived
//! from, with two differences:
//!
//! - it is **dense**: a non-leaf always has all eight children, even where
//!   the snapshot tree had none, because every point in the root volume
//!   must resolve to some leaf;
//! - each leaf carries a [`GravityCell`] behind an atomic [`CellSlot`],
//!   the only mutable facet of the whole structure.
//!
//! # Straddling-mass redistribution
//!
//! Samples stored at interior snapshot nodes straddle a split plane and
//! were never pushed into a child. Their mass is redistributed into the
//! force-tree leaves below them in proportion to the fraction of the
//! sample's AABB volume that overlaps each leaf. Since a straddler's AABB
//! lies fully inside the node that stores it, and the leaves below a node
//! tile its volume exactly, the fractions sum to one and total mass is
//! conserved.
//!
//! The ancestor chain is threaded through the recursion as an explicit
//! accumulator (one slice pushed per level) rather than rebuilt per node.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::debug;

use field_octree::{
    octant_bounds, Aabb, NodeId, OctreeNode, SnapshotNode, SnapshotTree, SpatialSample,
    OCTANT_COUNT,
};

use crate::cell::{CellSlot, GravityCell};

/// Below this leaf count the pairwise pass runs serially; rayon overhead
/// outweighs the win for small trees.
const PAR_LEAF_THRESHOLD: usize = 64;

/// A force-tree node: interior nodes carry no payload, leaves carry an
/// atomically-swappable gravity cell.
pub type ForceNode = OctreeNode<Option<CellSlot>>;

/// An immutable-shape octree of gravity cells, congruent with the snapshot
/// tree it was derived from.
#[derive(Debug)]
pub struct ForceTree {
    root: ForceNode,
    built_from: NodeId,
    leaf_count: usize,
}

impl ForceTree {
    /// Derives the dense cell tree from a snapshot tree and runs the
    /// pairwise synthesis pass.
    #[must_use]
    pub fn build(snapshot: &SnapshotTree, gravitational_constant: f64) -> Self {
        let started = Instant::now();
        let tree = Self::derive(snapshot);
        tree.synthesize(gravitational_constant);
        debug!(
            snapshot_id = snapshot.id().0,
            leaves = tree.leaf_count,
            elapsed_us = started.elapsed().as_micros() as u64,
            "force tree built"
        );
        tree
    }

    /// Derives the congruent dense tree with aggregated masses and zero
    /// forces. Exposed separately so the aggregation pass can be tested
    /// without running the O(n²) synthesis.
    #[must_use]
    pub fn derive(snapshot: &SnapshotTree) -> Self {
        let mut ancestors: Vec<&[SpatialSample]> = Vec::new();
        let mut leaf_count = 0;
        let root = derive_node(snapshot.root(), &mut ancestors, &mut leaf_count);
        debug_assert!(ancestors.is_empty());
        Self {
            root,
            built_from: snapshot.id(),
            leaf_count,
        }
    }

    /// Computes pairwise forces between all leaf cells and swaps each
    /// leaf's cell for one carrying its accumulated force.
    ///
    /// Topology is untouched; a concurrent reader mid-traversal sees either
    /// a leaf's previous cell or its replacement, never a partial one.
    pub fn synthesize(&self, gravitational_constant: f64) {
        let slots = self.leaf_slots();
        let cells: Vec<GravityCell> = slots.iter().map(|s| *s.load()).collect();
        let forces = pairwise_forces(&cells, gravitational_constant);
        for (slot, (cell, force)) in slots.iter().zip(cells.iter().zip(forces)) {
            slot.store(cell.with_force(force));
        }
    }

    /// Id of the snapshot tree this field was derived from.
    #[must_use]
    pub fn built_from(&self) -> NodeId {
        self.built_from
    }

    /// Root node.
    #[must_use]
    pub fn root(&self) -> &ForceNode {
        &self.root
    }

    /// Root bounding box (matches the source snapshot tree).
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.root.bounds
    }

    /// Number of leaf cells.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Current cells of all leaves, in traversal order.
    #[must_use]
    pub fn leaf_cells(&self) -> Vec<Arc<GravityCell>> {
        self.leaf_slots().iter().map(|s| s.load()).collect()
    }

    /// Sum of all leaf cell masses.
    #[must_use]
    pub fn total_mass(&self) -> f64 {
        self.leaf_cells().iter().map(|c| c.mass).sum()
    }

    /// Force stored at the leaf containing `point`, or `None` when the
    /// point lies outside the root volume.
    ///
    /// Never an error: out-of-range force queries are an expected boundary
    /// condition for physics callers, unlike the snapshot tree's
    /// `leaf_at` contract.
    #[must_use]
    pub fn force_at(&self, point: &Point3<f64>) -> Option<Vector3<f64>> {
        let leaf = self.root.leaf_at(point).ok()?;
        let slot = leaf.payload.as_ref()?;
        Some(slot.load().force)
    }

    fn leaf_slots(&self) -> Vec<&CellSlot> {
        let mut slots = Vec::with_capacity(self.leaf_count);
        self.root.visit(&mut |node| {
            if let Some(slot) = node.payload.as_ref() {
                slots.push(slot);
            }
        });
        slots
    }
}

/// Computes the accumulated force on each cell from all other cells.
///
/// For each unordered pair `(a, b)` at positive distance `d`:
/// `magnitude = G · mass(a) · mass(b) / d` (the denominator is the
/// distance itself, not its square), directed from each cell toward the
/// other, equal and opposite. Coincident cells contribute nothing (force
/// undefined at zero separation).
#[must_use]
pub fn pairwise_forces(cells: &[GravityCell], gravitational_constant: f64) -> Vec<Vector3<f64>> {
    let force_on = |i: usize| -> Vector3<f64> {
        let a = &cells[i];
        let mut total = Vector3::zeros();
        for (j, b) in cells.iter().enumerate() {
            if j == i {
                continue;
            }
            let offset = b.position - a.position;
            let distance = offset.norm();
            if distance > 0.0 {
                let magnitude = gravitational_constant * a.mass * b.mass / distance;
                total += offset * (magnitude / distance);
            }
        }
        total
    };

    if cells.len() >= PAR_LEAF_THRESHOLD {
        (0..cells.len()).into_par_iter().map(force_on).collect()
    } else {
        (0..cells.len()).map(force_on).collect()
    }
}

fn derive_node<'a>(
    snap: &'a SnapshotNode,
    ancestors: &mut Vec<&'a [SpatialSample]>,
    leaf_count: &mut usize,
) -> ForceNode {
    if snap.is_leaf() {
        return cell_leaf(snap.bounds, &snap.payload, ancestors, leaf_count);
    }

    ancestors.push(&snap.payload);
    let mut children: [Option<Box<ForceNode>>; OCTANT_COUNT] = std::array::from_fn(|_| None);
    for octant in 0..OCTANT_COUNT {
        let child = match snap.child(octant) {
            Some(child) => derive_node(child, ancestors, leaf_count),
            // Octant absent in the sparse snapshot tree: still gets a leaf,
            // carrying only redistributed ancestor mass.
            None => cell_leaf(
                octant_bounds(&snap.bounds, &snap.center, octant),
                &[],
                ancestors,
                leaf_count,
            ),
        };
        children[octant] = Some(Box::new(child));
    }
    ancestors.pop();
    OctreeNode::interior(snap.bounds, snap.center, None, children)
}

fn cell_leaf(
    bounds: Aabb,
    own_items: &[SpatialSample],
    ancestors: &[&[SpatialSample]],
    leaf_count: &mut usize,
) -> ForceNode {
    let own_mass: f64 = own_items.iter().map(|s| s.mass).sum();
    let mass = own_mass + redistributed_mass(&bounds, ancestors);
    *leaf_count += 1;
    let center = bounds.center();
    OctreeNode::leaf_with(bounds, |id| {
        Some(CellSlot::new(GravityCell::unsynthesized(id, mass, center)))
    })
}

/// Share of the straddling ancestor samples' mass that falls inside
/// `bounds`, by exact AABB-overlap volume fraction.
fn redistributed_mass(bounds: &Aabb, ancestors: &[&[SpatialSample]]) -> f64 {
    let mut mass = 0.0;
    for level in ancestors {
        for sample in *level {
            let volume = sample.aabb.volume();
            if volume > 0.0 {
                mass += sample.mass * (sample.aabb.overlap_volume(bounds) / volume);
            } else if bounds.contains(&sample.position) {
                // Degenerate sample AABBs never straddle a split plane in
                // practice; attribute the whole mass by containment if one
                // ever shows up here.
                mass += sample.mass;
            }
        }
    }
    mass
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use field_octree::{SampleToken, SnapshotConfig};

    fn sample(token: u64, x: f64, y: f64, z: f64, mass: f64, radius: f64) -> SpatialSample {
        SpatialSample::new(
            SampleToken(token),
            Point3::new(x, y, z),
            Vector3::zeros(),
            mass,
            radius,
        )
    }

    fn cell(x: f64, y: f64, z: f64, mass: f64) -> GravityCell {
        GravityCell::unsynthesized(NodeId::next(), mass, Point3::new(x, y, z))
    }

    fn grid_batch(n_per_axis: u64, spacing: f64, mass: f64, radius: f64) -> Vec<SpatialSample> {
        let mut out = Vec::new();
        let mut token = 0;
        for i in 0..n_per_axis {
            for j in 0..n_per_axis {
                for k in 0..n_per_axis {
                    out.push(sample(
                        token,
                        i as f64 * spacing,
                        j as f64 * spacing,
                        k as f64 * spacing,
                        mass,
                        radius,
                    ));
                    token += 1;
                }
            }
        }
        out
    }

    #[test]
    fn test_two_body_pairwise_magnitude() {
        // Mass 100 each, 10 apart, G = 1: magnitude is 1·100·100/10 = 1000
        // (denominator is the distance, not its square), along the axis,
        // equal and opposite.
        let cells = vec![cell(-5.0, 0.0, 0.0, 100.0), cell(5.0, 0.0, 0.0, 100.0)];
        let forces = pairwise_forces(&cells, 1.0);
        assert_relative_eq!(forces[0].x, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(forces[0].y, 0.0);
        assert_relative_eq!(forces[0].z, 0.0);
        assert_eq!(forces[1], -forces[0]);
    }

    #[test]
    fn test_third_law_exact_negation() {
        let cells = vec![cell(1.0, 2.0, 3.0, 7.0), cell(-4.0, 0.5, 2.0, 11.0)];
        let forces = pairwise_forces(&cells, 6.674e-11);
        assert_eq!(forces[0], -forces[1]);
    }

    #[test]
    fn test_net_force_sums_to_zero() {
        let cells = vec![
            cell(0.0, 0.0, 0.0, 10.0),
            cell(4.0, 1.0, 0.0, 20.0),
            cell(-2.0, 3.0, 5.0, 5.0),
            cell(1.0, -6.0, 2.0, 40.0),
        ];
        let forces = pairwise_forces(&cells, 1.0);
        let net: Vector3<f64> = forces.iter().sum();
        assert_relative_eq!(net.norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_coincident_cells_are_skipped() {
        let cells = vec![cell(1.0, 1.0, 1.0, 50.0), cell(1.0, 1.0, 1.0, 50.0)];
        let forces = pairwise_forces(&cells, 1.0);
        assert_eq!(forces[0], Vector3::zeros());
        assert_eq!(forces[1], Vector3::zeros());
    }

    #[test]
    fn test_single_body_yields_single_leaf_and_zero_force() {
        let batch = vec![sample(0, 0.0, 0.0, 0.0, 100.0, 1.0)];
        let snapshot = SnapshotTree::build(batch, &SnapshotConfig::default());
        let tree = ForceTree::build(&snapshot, 1.0);
        assert_eq!(tree.leaf_count(), 1);
        let cells = tree.leaf_cells();
        assert_relative_eq!(cells[0].mass, 100.0);
        assert_eq!(cells[0].force, Vector3::zeros());
    }

    #[test]
    fn test_mass_conserved_with_straddlers() {
        // Large radii force plenty of samples to straddle split planes and
        // stay at interior nodes; redistribution must not lose or double
        // any of that mass.
        let batch = grid_batch(4, 2.0, 3.5, 1.4);
        let expected: f64 = batch.iter().map(|s| s.mass).sum();
        let config = SnapshotConfig {
            max_items_per_node: 2,
            jitter_centers: false,
        };
        let snapshot = SnapshotTree::build(batch, &config);
        let tree = ForceTree::derive(&snapshot);
        assert_relative_eq!(tree.total_mass(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_mass_conserved_with_jitter() {
        let batch = grid_batch(3, 1.0, 2.0, 0.6);
        let expected: f64 = batch.iter().map(|s| s.mass).sum();
        let config = SnapshotConfig {
            max_items_per_node: 1,
            jitter_centers: true,
        };
        let snapshot = SnapshotTree::build(batch, &config);
        let tree = ForceTree::derive(&snapshot);
        assert_relative_eq!(tree.total_mass(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_tree_is_dense_below_root() {
        let batch = grid_batch(3, 4.0, 1.0, 0.3);
        let config = SnapshotConfig {
            max_items_per_node: 2,
            jitter_centers: false,
        };
        let snapshot = SnapshotTree::build(batch, &config);
        let tree = ForceTree::derive(&snapshot);
        let mut violations = 0;
        tree.root().visit(&mut |node| {
            if !node.is_leaf() && node.children().count() != OCTANT_COUNT {
                violations += 1;
            }
            // Interior nodes carry no cell; leaves always do.
            assert_eq!(node.payload.is_some(), node.is_leaf());
        });
        assert_eq!(violations, 0);
    }

    #[test]
    fn test_every_interior_point_resolves_to_a_cell() {
        let batch = grid_batch(3, 3.0, 1.0, 0.5);
        let config = SnapshotConfig {
            max_items_per_node: 1,
            jitter_centers: false,
        };
        let snapshot = SnapshotTree::build(batch, &config);
        let tree = ForceTree::build(&snapshot, 1.0);
        let bounds = tree.bounds();
        for i in 1..8 {
            for j in 1..8 {
                let p = Point3::new(
                    bounds.min.x + bounds.extents().x * (i as f64 / 8.0),
                    bounds.min.y + bounds.extents().y * (j as f64 / 8.0),
                    bounds.center().z,
                );
                assert!(tree.force_at(&p).is_some());
            }
        }
    }

    #[test]
    fn test_force_at_outside_bounds_is_none() {
        let snapshot = SnapshotTree::build(
            vec![sample(0, 0.0, 0.0, 0.0, 1.0, 1.0)],
            &SnapshotConfig::default(),
        );
        let tree = ForceTree::build(&snapshot, 1.0);
        assert!(tree.force_at(&Point3::new(500.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_synthesize_swaps_cells_in_place() {
        let batch = grid_batch(2, 10.0, 100.0, 0.0);
        let config = SnapshotConfig {
            max_items_per_node: 1,
            jitter_centers: false,
        };
        let snapshot = SnapshotTree::build(batch, &config);
        let tree = ForceTree::derive(&snapshot);
        let before = tree.leaf_cells();
        assert!(before.iter().all(|c| c.force == Vector3::zeros()));

        tree.synthesize(1.0);
        let after = tree.leaf_cells();
        assert!(after.iter().any(|c| c.force != Vector3::zeros()));
        // Token, mass, and position survive the swap untouched.
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.token, a.token);
            assert_eq!(b.mass, a.mass);
            assert_eq!(b.position, a.position);
        }
    }

    #[test]
    fn test_built_from_records_snapshot_id() {
        let snapshot = SnapshotTree::build(
            vec![sample(0, 0.0, 0.0, 0.0, 1.0, 1.0)],
            &SnapshotConfig::default(),
        );
        let tree = ForceTree::build(&snapshot, 1.0);
        assert_eq!(tree.built_from(), snapshot.id());
    }
}
