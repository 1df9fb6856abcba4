//! Background build worker and the published tree handles.
//!
//! Builds run off the owning thread on dedicated workers fed through
//! channels. A worker publishes each finished tree with a single atomic
//! reference swap and reports completion (with elapsed time) back to the
//! owner, whose completion handling rearms the corresponding timer. No
//! partial tree is ever observable: publication happens only after the
//! build, including force synthesis, has fully finished.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, Sender};
use tracing::info;

use field_gravity::ForceTree;
use field_octree::{NodeId, SnapshotConfig, SnapshotTree, SpatialSample};

/// The atomically-swappable roots of both published trees.
///
/// Readers load a root exactly once per query; writers store a fully built
/// replacement. Before the first build each slot holds `None`.
#[derive(Debug, Default)]
pub struct Published {
    /// Latest snapshot tree, if any.
    pub snapshot: ArcSwapOption<SnapshotTree>,
    /// Latest force tree, if any.
    pub field: ArcSwapOption<ForceTree>,
}

/// Work handed to the build worker.
pub(crate) enum BuildJob {
    Snapshot {
        samples: Vec<SpatialSample>,
        config: SnapshotConfig,
    },
    Field {
        snapshot: Arc<SnapshotTree>,
        gravitational_constant: f64,
    },
    Shutdown,
}

/// Completion report sent back to the owning thread.
pub(crate) enum BuildOutcome {
    Snapshot {
        elapsed: Duration,
        sample_count: usize,
    },
    Field {
        elapsed: Duration,
        leaf_count: usize,
        built_from: NodeId,
    },
}

/// Spawns one build worker. The engine runs two (one per tree) so a slow
/// snapshot build never delays a force rebuild; the per-tree "at most one
/// in flight" guarantee comes from the timers, not from here.
pub(crate) fn spawn_worker(
    name: &str,
    published: Arc<Published>,
    jobs: Receiver<BuildJob>,
    done: Sender<BuildOutcome>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            for job in jobs.iter() {
                let outcome = match job {
                    BuildJob::Shutdown => break,
                    BuildJob::Snapshot { samples, config } => {
                        let started = Instant::now();
                        let tree = SnapshotTree::build(samples, &config);
                        let sample_count = tree.sample_count();
                        let elapsed = started.elapsed();
                        published.snapshot.store(Some(Arc::new(tree)));
                        info!(
                            samples = sample_count,
                            elapsed_us = elapsed.as_micros() as u64,
                            "snapshot tree published"
                        );
                        BuildOutcome::Snapshot {
                            elapsed,
                            sample_count,
                        }
                    }
                    BuildJob::Field {
                        snapshot,
                        gravitational_constant,
                    } => {
                        let started = Instant::now();
                        let tree = ForceTree::build(&snapshot, gravitational_constant);
                        let leaf_count = tree.leaf_count();
                        let built_from = tree.built_from();
                        let elapsed = started.elapsed();
                        published.field.store(Some(Arc::new(tree)));
                        info!(
                            leaves = leaf_count,
                            snapshot_id = built_from.0,
                            elapsed_us = elapsed.as_micros() as u64,
                            "force tree published"
                        );
                        BuildOutcome::Field {
                            elapsed,
                            leaf_count,
                            built_from,
                        }
                    }
                };
                if done.send(outcome).is_err() {
                    // Owner dropped its receiver; nothing left to pace.
                    break;
                }
            }
        })
}
