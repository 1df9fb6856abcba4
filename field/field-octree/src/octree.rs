//! Generic octree node shared by the snapshot and force trees.
//!
//! Both trees have the same shape fields (bounds, split center, eight
//! optional children) but carry different payloads: the snapshot tree holds
//! sample lists, the force tree holds an atomically-swappable gravity cell
//! at each leaf. The node is therefore generic over its payload, and the
//! descent, visitation, and octant arithmetic live here exactly once.
//!
//! # Octant indexing
//!
//! Children are indexed 0..8 by three axis bits: bit 0 set means the child
//! is on the high-X side of the split center, bit 1 high-Y, bit 2 high-Z.
//! Point classification uses a consistent tie-break: a coordinate equal to
//! the center routes to the low side, so a point lying exactly on a split
//! plane always resolves deterministically.

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Point3;

use crate::aabb::Aabb;
use crate::error::OctreeError;

/// Number of children per octree node.
pub const OCTANT_COUNT: usize = 8;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique, monotonically assigned node identifier.
///
/// Ids are drawn from a process-global counter, so they are unique across
/// rebuilds as well as within one tree. The root's id doubles as the tree's
/// generation token for cheap staleness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u64);

impl NodeId {
    /// Allocates the next id from the global counter.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Returns the octant index for a point relative to a split center.
///
/// Coordinates equal to the center route to the low side.
#[must_use]
pub fn octant_for_point(center: &Point3<f64>, point: &Point3<f64>) -> usize {
    let mut index = 0;
    if point.x > center.x {
        index |= 1;
    }
    if point.y > center.y {
        index |= 2;
    }
    if point.z > center.z {
        index |= 4;
    }
    index
}

/// Returns the octant an AABB falls entirely into, or `None` if it
/// straddles a split plane on any axis.
///
/// The per-axis rule mirrors [`octant_for_point`]: a box whose maximum is
/// at most the center lies on the low side, a box whose minimum is strictly
/// past the center lies on the high side, anything else straddles.
#[must_use]
pub fn octant_for_aabb(center: &Point3<f64>, aabb: &Aabb) -> Option<usize> {
    let mut index = 0;
    for axis in 0..3 {
        if aabb.max[axis] <= center[axis] {
            // low side, bit stays clear
        } else if aabb.min[axis] > center[axis] {
            index |= 1 << axis;
        } else {
            return None;
        }
    }
    Some(index)
}

/// Returns the bounds of the given octant of a parent box split at `center`.
///
/// The center may be off-midpoint (jittered); the eight octants still tile
/// the parent exactly.
#[must_use]
pub fn octant_bounds(bounds: &Aabb, center: &Point3<f64>, octant: usize) -> Aabb {
    debug_assert!(octant < OCTANT_COUNT);
    let mut min = bounds.min;
    let mut max = *center;
    for axis in 0..3 {
        if octant & (1 << axis) != 0 {
            min[axis] = center[axis];
            max[axis] = bounds.max[axis];
        }
    }
    Aabb { min, max }
}

/// One node of an octree, generic over its payload.
///
/// Fully immutable after construction: the only mutability anywhere in
/// either tree lives inside the force tree's leaf payload, behind an atomic
/// handle, never in the node structure itself.
#[derive(Debug)]
pub struct OctreeNode<P> {
    /// Unique node id.
    pub id: NodeId,
    /// Axis-aligned bounding volume of this node.
    pub bounds: Aabb,
    /// Split point. Equals `bounds.center()` for leaves; may be jittered
    /// off-midpoint for interior nodes.
    pub center: Point3<f64>,
    /// Node payload.
    pub payload: P,
    children: [Option<Box<OctreeNode<P>>>; OCTANT_COUNT],
}

impl<P> OctreeNode<P> {
    /// Creates a leaf node. Its split center is the bounds midpoint.
    #[must_use]
    pub fn leaf(bounds: Aabb, payload: P) -> Self {
        Self {
            id: NodeId::next(),
            center: bounds.center(),
            bounds,
            payload,
            children: std::array::from_fn(|_| None),
        }
    }

    /// Creates a leaf node whose payload needs to know the node's id (the
    /// force tree stamps each cell with the leaf it belongs to).
    #[must_use]
    pub fn leaf_with(bounds: Aabb, payload_for: impl FnOnce(NodeId) -> P) -> Self {
        let id = NodeId::next();
        Self {
            id,
            center: bounds.center(),
            bounds,
            payload: payload_for(id),
            children: std::array::from_fn(|_| None),
        }
    }

    /// Creates an interior node with the given children.
    #[must_use]
    pub fn interior(
        bounds: Aabb,
        center: Point3<f64>,
        payload: P,
        children: [Option<Box<OctreeNode<P>>>; OCTANT_COUNT],
    ) -> Self {
        Self {
            id: NodeId::next(),
            bounds,
            center,
            payload,
            children,
        }
    }

    /// Whether this node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Returns the child in the given octant, if present.
    #[must_use]
    pub fn child(&self, octant: usize) -> Option<&OctreeNode<P>> {
        self.children[octant].as_deref()
    }

    /// Iterates over the present children.
    pub fn children(&self) -> impl Iterator<Item = &OctreeNode<P>> {
        self.children.iter().filter_map(|c| c.as_deref())
    }

    /// Descends to the deepest node containing `point`, following the
    /// low-on-tie octant rule at each level.
    ///
    /// On a sparse tree the descent ends either at a leaf or at the node
    /// whose matching octant was never created; in a dense tree it always
    /// ends at a leaf. Fails if `point` lies outside this node's bounds.
    pub fn leaf_at(&self, point: &Point3<f64>) -> Result<&OctreeNode<P>, OctreeError> {
        if !self.bounds.contains(point) {
            return Err(OctreeError::OutOfBounds {
                point: *point,
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }
        let mut node = self;
        loop {
            let octant = octant_for_point(&node.center, point);
            match node.child(octant) {
                Some(child) => node = child,
                None => return Ok(node),
            }
        }
    }

    /// Visits every node in the subtree, pre-order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a OctreeNode<P>)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    /// Counts the nodes in the subtree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children().map(OctreeNode::node_count).sum::<usize>()
    }
}
