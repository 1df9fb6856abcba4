//! Error types for field configuration.

/// Errors that can occur while constructing analytic fields.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FieldError {
    /// The boundary-field parameters are geometrically unusable.
    #[error("invalid boundary field: {reason}")]
    InvalidBoundary {
        /// What was wrong with the parameters.
        reason: &'static str,
    },
}
