//! Self-pacing snapshot/force-field rebuild engine with lock-free
//! publication.
//!
//! Ties the two tree crates together into the full pipeline:
//!
//! ```text
//! live bodies ──(owning thread, SampleSource)──► sample batch
//!   ──(worker)──► SnapshotTree ──(worker)──► ForceTree
//!   ──(atomic swap)──► FieldReader::get_force from any thread
//! ```
//!
//! # Concurrency Model
//!
//! - **One owning thread** mutates bodies and calls [`FieldEngine::pump`];
//!   sample extraction is the only synchronous per-cycle work it does.
//! - **Two build workers** (one per tree) construct trees and publish each
//!   finished root with a single atomic reference swap.
//! - **Any number of reader threads** hold [`FieldReader`] clones; queries
//!   never block and never fail. Readers may observe a previous-cycle
//!   tree (eventual consistency at rebuild-period granularity), but never
//!   a partially built one.
//!
//! Rebuild pacing is `next_delay = max(1ms, period − elapsed)`, rearmed on
//! completion, so builds never overlap and the cadence stretches when
//! building is slow. Force rebuilds are additionally gated on the snapshot
//! tree's id: an unchanged snapshot just reschedules.
//!
//! # Example
//!
//! ```
//! use field_engine::{EngineConfig, FieldEngine, SampleSource};
//! use field_octree::{SampleToken, SpatialSample};
//! use nalgebra::{Point3, Vector3};
//!
//! struct TwoBodies;
//!
//! impl SampleSource for TwoBodies {
//!     fn collect(
//!         &mut self,
//!     ) -> Result<Vec<SpatialSample>, Box<dyn std::error::Error + Send + Sync>> {
//!         Ok(vec![
//!             SpatialSample::new(
//!                 SampleToken(0),
//!                 Point3::new(-5.0, 0.0, 0.0),
//!                 Vector3::zeros(),
//!                 100.0,
//!                 0.0,
//!             ),
//!             SpatialSample::new(
//!                 SampleToken(1),
//!                 Point3::new(5.0, 0.0, 0.0),
//!                 Vector3::zeros(),
//!                 100.0,
//!                 0.0,
//!             ),
//!         ])
//!     }
//! }
//!
//! let mut engine = FieldEngine::start(EngineConfig::default()).unwrap();
//! let reader = engine.reader(); // hand clones to any thread
//!
//! let mut source = TwoBodies;
//! engine.pump(&mut source).unwrap(); // owning-thread update loop
//!
//! // Safe immediately, even before the first tree is published.
//! let force = reader.get_force(&Point3::origin());
//! assert!(force.norm().is_finite());
//! engine.stop();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod timer;
pub mod worker;

pub use config::{BoundaryConfig, EngineConfig, SwirlConfig};
pub use engine::{EngineStats, FieldEngine, FieldReader, SampleSource};
pub use error::EngineError;
pub use timer::{next_delay, RearmTimer, MIN_DELAY};
pub use worker::Published;
