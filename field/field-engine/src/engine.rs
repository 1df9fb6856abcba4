//! The field owner: scheduling, publication, and reader handles.
//!
//! One thread owns the live bodies and drives the engine by calling
//! [`FieldEngine::pump`] from its update loop. `pump` does the only
//! synchronous work of a cycle (sample extraction via [`SampleSource`]),
//! then hands work to the background build workers and processes completion
//! reports, rearming each pipeline's timer with `period − elapsed`.
//!
//! Any number of other threads hold [`FieldReader`] clones and query
//! [`FieldReader::get_force`] without locks; they observe at worst a
//! previous-cycle tree, never a partial one.

use std::error::Error;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use nalgebra::{Point3, Unit, Vector3};
use tracing::{debug, warn};

use field_gravity::{BoundaryField, CompositeField, ForceTree, SwirlField};
use field_octree::{NodeId, SnapshotConfig, SnapshotTree, SpatialSample};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::timer::{next_delay, RearmTimer};
use crate::worker::{spawn_worker, BuildJob, BuildOutcome, Published};

/// Supplies the current batch of spatial samples.
///
/// Called synchronously from [`FieldEngine::pump`], on the owning thread
/// only: live bodies are not safe to read concurrently with their own
/// mutation, so this is the single point of contact between the engine and
/// mutable simulation state.
pub trait SampleSource {
    /// Materializes one sample per live body.
    ///
    /// # Errors
    ///
    /// A failed extraction aborts only the current cycle; the engine logs
    /// it and rearms the snapshot timer for the next period.
    fn collect(&mut self) -> Result<Vec<SpatialSample>, Box<dyn Error + Send + Sync>>;
}

/// Cumulative engine counters. Owner-thread bookkeeping, read via
/// [`FieldEngine::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Snapshot trees built and published.
    pub snapshot_builds: u64,
    /// Force trees built and published.
    pub field_builds: u64,
    /// Force rebuilds skipped because the snapshot id was unchanged.
    pub field_skips: u64,
    /// Sample extractions that returned an error.
    pub failed_extractions: u64,
}

/// The concurrent spatial snapshot and force-field engine.
///
/// Owned and driven by the body-owning thread; hand out [`FieldReader`]s
/// to everyone else.
#[derive(Debug)]
pub struct FieldEngine {
    snapshot_config: SnapshotConfig,
    gravitational_constant: f64,
    composite: CompositeField,
    published: Arc<Published>,
    snapshot_jobs: Sender<BuildJob>,
    field_jobs: Sender<BuildJob>,
    done: Receiver<BuildOutcome>,
    workers: Vec<JoinHandle<()>>,
    snapshot_period: Duration,
    field_period: Duration,
    snapshot_timer: RearmTimer,
    field_timer: RearmTimer,
    snapshot_in_flight: bool,
    field_in_flight: bool,
    last_field_built_from: Option<NodeId>,
    stats: EngineStats,
}

impl FieldEngine {
    /// Validates the configuration, spawns the build worker, and arms both
    /// timers to fire on the first [`pump`](Self::pump).
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidSwirlAxis`] or a boundary-field validation
    /// error for unusable analytic-field parameters;
    /// [`EngineError::WorkerSpawn`] if the worker thread cannot start.
    pub fn start(config: EngineConfig) -> Result<Self, EngineError> {
        let composite = build_composite(&config)?;
        let published = Arc::new(Published::default());
        let (snapshot_tx, snapshot_rx) = crossbeam_channel::unbounded();
        let (field_tx, field_rx) = crossbeam_channel::unbounded();
        let (done_tx, done_rx) = crossbeam_channel::unbounded();
        let workers = vec![
            spawn_worker(
                "field-snapshot-build",
                Arc::clone(&published),
                snapshot_rx,
                done_tx.clone(),
            )
            .map_err(EngineError::WorkerSpawn)?,
            spawn_worker(
                "field-force-build",
                Arc::clone(&published),
                field_rx,
                done_tx,
            )
            .map_err(EngineError::WorkerSpawn)?,
        ];

        Ok(Self {
            snapshot_config: SnapshotConfig {
                max_items_per_node: config.max_items_per_node,
                jitter_centers: config.should_jitter_centers,
            },
            gravitational_constant: config.gravitational_constant,
            composite,
            published,
            snapshot_jobs: snapshot_tx,
            field_jobs: field_tx,
            done: done_rx,
            workers,
            snapshot_period: Duration::from_millis(config.snapshot_period_ms),
            field_period: Duration::from_millis(config.field_period_ms),
            snapshot_timer: RearmTimer::armed_in(Duration::ZERO),
            field_timer: RearmTimer::armed_in(Duration::ZERO),
            snapshot_in_flight: false,
            field_in_flight: false,
            last_field_built_from: None,
            stats: EngineStats::default(),
        })
    }

    /// Drives both rebuild pipelines: drains completion reports, then
    /// fires whichever timers are due.
    ///
    /// Call from the owning thread's update loop. Cheap when nothing is
    /// due. Never blocks on builds; at most one build per tree is in
    /// flight at any time.
    ///
    /// # Errors
    ///
    /// [`EngineError::WorkerDisconnected`] if the build worker has died.
    pub fn pump(&mut self, source: &mut dyn SampleSource) -> Result<(), EngineError> {
        self.drain_completions();
        let now = Instant::now();

        if !self.snapshot_in_flight && self.snapshot_timer.fire_if_due(now) {
            match source.collect() {
                Ok(samples) => {
                    send(
                        &self.snapshot_jobs,
                        BuildJob::Snapshot {
                            samples,
                            config: self.snapshot_config,
                        },
                    )?;
                    self.snapshot_in_flight = true;
                }
                Err(error) => {
                    // Transient failure must not leave the field
                    // permanently stale: keep the cadence going.
                    warn!(%error, "sample extraction failed, skipping cycle");
                    self.stats.failed_extractions += 1;
                    self.snapshot_timer.rearm(self.snapshot_period);
                }
            }
        }

        if !self.field_in_flight && self.field_timer.fire_if_due(now) {
            match self.published.snapshot.load_full() {
                None => {
                    // Nothing to derive from yet; retry shortly.
                    self.field_timer.rearm(crate::timer::MIN_DELAY);
                }
                Some(snapshot) if Some(snapshot.id()) == self.last_field_built_from => {
                    debug!(snapshot_id = snapshot.id().0, "snapshot unchanged, skipping field rebuild");
                    self.stats.field_skips += 1;
                    self.field_timer.rearm(self.field_period);
                }
                Some(snapshot) => {
                    send(
                        &self.field_jobs,
                        BuildJob::Field {
                            snapshot,
                            gravitational_constant: self.gravitational_constant,
                        },
                    )?;
                    self.field_in_flight = true;
                }
            }
        }

        Ok(())
    }

    /// Makes both timers due immediately (in-flight builds are unaffected;
    /// there is never more than one per tree).
    pub fn request_rebuild_now(&mut self) {
        if !self.snapshot_in_flight {
            self.snapshot_timer.fire_now();
        }
        if !self.field_in_flight {
            self.field_timer.fire_now();
        }
    }

    /// Changes the snapshot rebuild cadence, effective from the next rearm.
    pub fn set_snapshot_period(&mut self, period: Duration) {
        self.snapshot_period = period;
    }

    /// Changes the force-field rebuild cadence, effective from the next rearm.
    pub fn set_field_period(&mut self, period: Duration) {
        self.field_period = period;
    }

    /// Cumulative counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// A clonable, lock-free handle for reader threads.
    #[must_use]
    pub fn reader(&self) -> FieldReader {
        FieldReader {
            published: Arc::clone(&self.published),
            composite: self.composite,
        }
    }

    /// Shuts the worker down and waits for it to finish any in-flight
    /// build.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn drain_completions(&mut self) {
        while let Ok(outcome) = self.done.try_recv() {
            match outcome {
                BuildOutcome::Snapshot { elapsed, .. } => {
                    self.snapshot_in_flight = false;
                    self.stats.snapshot_builds += 1;
                    self.snapshot_timer
                        .rearm(next_delay(self.snapshot_period, elapsed));
                }
                BuildOutcome::Field {
                    elapsed,
                    built_from,
                    ..
                } => {
                    self.field_in_flight = false;
                    self.stats.field_builds += 1;
                    self.last_field_built_from = Some(built_from);
                    self.field_timer
                        .rearm(next_delay(self.field_period, elapsed));
                }
            }
        }
    }

    fn shutdown(&mut self) {
        let _ = self.snapshot_jobs.send(BuildJob::Shutdown);
        let _ = self.field_jobs.send(BuildJob::Shutdown);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn send(jobs: &Sender<BuildJob>, job: BuildJob) -> Result<(), EngineError> {
    jobs.send(job).map_err(|_| EngineError::WorkerDisconnected)
}

impl Drop for FieldEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lock-free force and snapshot access for reader threads.
///
/// Clones share the engine's published tree handles; every query loads a
/// root exactly once and works against that immutable tree.
#[derive(Debug, Clone)]
pub struct FieldReader {
    published: Arc<Published>,
    composite: CompositeField,
}

impl FieldReader {
    /// Total force at `point`: analytic fields plus the force-tree term.
    ///
    /// Never fails and never blocks. Before the first force tree is
    /// published, or for points outside the tree's extent, the tree term
    /// is simply omitted: physics queries must keep working through
    /// warm-up and at the fringes.
    #[must_use]
    pub fn get_force(&self, point: &Point3<f64>) -> Vector3<f64> {
        let mut force = self.composite.force(point);
        if let Some(tree) = &*self.published.field.load() {
            if let Some(tree_force) = tree.force_at(point) {
                force += tree_force;
            }
        }
        force
    }

    /// Latest published snapshot tree, for the range-query family.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<SnapshotTree>> {
        self.published.snapshot.load_full()
    }

    /// Latest published force tree.
    #[must_use]
    pub fn field(&self) -> Option<Arc<ForceTree>> {
        self.published.field.load_full()
    }
}

fn build_composite(config: &EngineConfig) -> Result<CompositeField, EngineError> {
    let swirl = match &config.swirl {
        None => None,
        Some(swirl) => {
            let axis = Unit::try_new(Vector3::from(swirl.axis), 1e-12)
                .ok_or(EngineError::InvalidSwirlAxis)?;
            Some(SwirlField::new(swirl.strength, axis, swirl.angle))
        }
    };
    let boundary = match &config.boundary {
        None => None,
        Some(boundary) => Some(BoundaryField::new(
            boundary.start_percent,
            boundary.strength_half,
            boundary.exponent,
            Point3::from(boundary.map_min),
            Point3::from(boundary.map_max),
        )?),
    };
    Ok(CompositeField { swirl, boundary })
}
