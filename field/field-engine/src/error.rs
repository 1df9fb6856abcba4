//! Error types for the field engine.

use field_gravity::FieldError;

/// Errors that can occur while starting or driving the engine.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The build worker thread could not be spawned.
    #[error("failed to spawn build worker")]
    WorkerSpawn(#[source] std::io::Error),

    /// The build worker is gone; the engine can no longer rebuild.
    #[error("build worker disconnected")]
    WorkerDisconnected,

    /// The configured swirl axis has zero length.
    #[error("swirl axis must be non-zero")]
    InvalidSwirlAxis,

    /// The boundary-field configuration was rejected.
    #[error(transparent)]
    Field(#[from] FieldError),
}
