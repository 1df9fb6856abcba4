//! Snapshot tree construction and queries.
//!
//! A [`SnapshotTree`] is an immutable octree over one batch of
//! [`SpatialSample`]s. It is built once, on a background worker, and then
//! published by reference swap; every query below is safe to run from any
//! number of threads against a published tree because nothing in it can
//! change.
//!
//! # Partitioning
//!
//! The root box is the union of all sample bounds, padded by 5% per axis so
//! no sample touches the boundary exactly. A node with more samples than
//! `max_items_per_node` splits at its (optionally jittered) center; each
//! sample moves into the one octant that fully contains its AABB, or stays
//! at this node if it straddles a split plane. Straddlers therefore live at
//! the shallowest node whose split planes they cross, which keeps them
//! visible to coarse-level queries and gives the force builder a single
//! well-defined home for every sample.

use nalgebra::{Point3, Vector3};
use rand::Rng;
use tracing::debug;

use crate::aabb::Aabb;
use crate::error::OctreeError;
use crate::octree::{octant_bounds, octant_for_aabb, NodeId, OctreeNode, OCTANT_COUNT};
use crate::sample::SpatialSample;

/// Fraction of the batch extent added as padding around the root box.
const PAD_FRACTION: f64 = 0.05;

/// Maximum jitter applied to a split center, as a fraction of cell width.
const JITTER_FRACTION: f64 = 0.05;

/// Depth cap. Coincident samples can defeat the octant split (every sample
/// keeps landing in the same child); past this depth a node becomes a leaf
/// regardless of item count.
const MAX_DEPTH: u32 = 64;

/// Configuration for snapshot tree construction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotConfig {
    /// A node holding at most this many samples becomes a leaf.
    pub max_items_per_node: usize,
    /// Jitter split centers by up to 5% of the cell width per axis, to
    /// avoid persistent resonance artifacts on symmetric inputs.
    pub jitter_centers: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_items_per_node: 8,
            jitter_centers: false,
        }
    }
}

/// A snapshot-tree node: payload is the samples stored at that node.
pub type SnapshotNode = OctreeNode<Vec<SpatialSample>>;

/// An immutable octree of spatial samples.
///
/// Every sample of the input batch appears in the payload of exactly one
/// node: a leaf, or the shallowest interior node whose split plane it
/// straddles.
#[derive(Debug)]
pub struct SnapshotTree {
    root: SnapshotNode,
    sample_count: usize,
}

impl SnapshotTree {
    /// Builds a tree from a batch of samples.
    ///
    /// An empty batch yields a single empty leaf over a unit box at the
    /// origin, so downstream consumers never have to special-case "no tree".
    #[must_use]
    pub fn build(samples: Vec<SpatialSample>, config: &SnapshotConfig) -> Self {
        let sample_count = samples.len();
        let bounds = samples
            .iter()
            .map(|s| s.aabb)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| Aabb::from_center(Point3::origin(), Vector3::new(0.5, 0.5, 0.5)))
            .padded(PAD_FRACTION);

        let mut rng = rand::thread_rng();
        let root = build_node(samples, bounds, config, &mut rng, 0);
        debug!(
            samples = sample_count,
            nodes = root.node_count(),
            "snapshot tree built"
        );
        Self { root, sample_count }
    }

    /// Generation token of this tree (the root's unique id).
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.root.id
    }

    /// Root node.
    #[must_use]
    pub fn root(&self) -> &SnapshotNode {
        &self.root
    }

    /// Root bounding box (batch bounds plus padding).
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.root.bounds
    }

    /// Number of samples the tree was built from.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Returns every sample in the tree, in traversal order.
    #[must_use]
    pub fn all_items(&self) -> Vec<SpatialSample> {
        let mut out = Vec::with_capacity(self.sample_count);
        self.root.visit(&mut |node| out.extend_from_slice(&node.payload));
        out
    }

    /// Returns the samples whose bounds intersect the given sphere.
    ///
    /// Subtrees whose node AABB misses the sphere are pruned without
    /// descending.
    #[must_use]
    pub fn items_in_radius(&self, center: &Point3<f64>, radius: f64) -> Vec<SpatialSample> {
        let mut out = Vec::new();
        collect_in_radius(&self.root, center, radius, &mut out);
        out
    }

    /// Returns the samples whose bounds intersect the given box.
    #[must_use]
    pub fn items_in_box(&self, min: Point3<f64>, max: Point3<f64>) -> Vec<SpatialSample> {
        let query = Aabb::new(min, max);
        let mut out = Vec::new();
        collect_in_box(&self.root, &query, &mut out);
        out
    }

    /// Locates the deepest node containing `point`.
    ///
    /// # Errors
    ///
    /// [`OctreeError::OutOfBounds`] if `point` lies outside the root box.
    /// Callers are expected to bounds-check before calling; force queries
    /// that must not fail go through the field facade instead.
    pub fn leaf_at(&self, point: &Point3<f64>) -> Result<&SnapshotNode, OctreeError> {
        self.root.leaf_at(point)
    }
}

fn split_center(bounds: &Aabb, jitter: bool, rng: &mut impl Rng) -> Point3<f64> {
    let mut center = bounds.center();
    if jitter {
        let extents = bounds.extents();
        for axis in 0..3 {
            let amplitude = extents[axis] * JITTER_FRACTION;
            center[axis] += rng.gen_range(-1.0..=1.0) * amplitude;
        }
    }
    center
}

fn build_node(
    samples: Vec<SpatialSample>,
    bounds: Aabb,
    config: &SnapshotConfig,
    rng: &mut impl Rng,
    depth: u32,
) -> SnapshotNode {
    if samples.len() <= config.max_items_per_node || depth >= MAX_DEPTH {
        return OctreeNode::leaf(bounds, samples);
    }

    let center = split_center(&bounds, config.jitter_centers, rng);
    let mut straddlers = Vec::new();
    let mut buckets: [Vec<SpatialSample>; OCTANT_COUNT] = std::array::from_fn(|_| Vec::new());
    for sample in samples {
        match octant_for_aabb(&center, &sample.aabb) {
            Some(octant) => buckets[octant].push(sample),
            None => straddlers.push(sample),
        }
    }

    let mut children: [Option<Box<SnapshotNode>>; OCTANT_COUNT] = std::array::from_fn(|_| None);
    for (octant, bucket) in buckets.into_iter().enumerate() {
        if !bucket.is_empty() {
            let child_bounds = octant_bounds(&bounds, &center, octant);
            children[octant] = Some(Box::new(build_node(
                bucket,
                child_bounds,
                config,
                rng,
                depth + 1,
            )));
        }
    }
    OctreeNode::interior(bounds, center, straddlers, children)
}

fn collect_in_radius(
    node: &SnapshotNode,
    center: &Point3<f64>,
    radius: f64,
    out: &mut Vec<SpatialSample>,
) {
    if !node.bounds.intersects_sphere(center, radius) {
        return;
    }
    out.extend(
        node.payload
            .iter()
            .filter(|s| s.aabb.intersects_sphere(center, radius)),
    );
    for child in node.children() {
        collect_in_radius(child, center, radius, out);
    }
}

fn collect_in_box(node: &SnapshotNode, query: &Aabb, out: &mut Vec<SpatialSample>) {
    if !node.bounds.intersects(query) {
        return;
    }
    out.extend(node.payload.iter().filter(|s| s.aabb.intersects(query)));
    for child in node.children() {
        collect_in_box(child, query, out);
    }
}
