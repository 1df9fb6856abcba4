//! Engine configuration surface.
//!
//! Plain-data config types, serde-ready behind the `serde` feature; the
//! engine converts them into the math types at startup. Axis and corner
//! fields use `[f64; 3]` arrays so configs round-trip cleanly.

/// Swirl-field parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwirlConfig {
    /// Constant force magnitude.
    pub strength: f64,
    /// Rotation axis. Must be non-zero; normalized at engine startup.
    pub axis: [f64; 3],
    /// Rotation angle in radians applied to the inward direction.
    pub angle: f64,
}

/// Boundary-field parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryConfig {
    /// Fraction of the map half-extent where the field begins, in `[0, 1)`.
    pub start_percent: f64,
    /// Magnitude exactly halfway between the boundary start and the map edge.
    pub strength_half: f64,
    /// Ramp exponent.
    pub exponent: f64,
    /// Minimum corner of the map.
    pub map_min: [f64; 3],
    /// Maximum corner of the map.
    pub map_max: [f64; 3],
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Target cadence for snapshot-tree rebuilds, in milliseconds.
    pub snapshot_period_ms: u64,
    /// Target cadence for force-tree rebuilds, in milliseconds.
    pub field_period_ms: u64,
    /// Jitter octree split centers to break symmetric-input resonance.
    pub should_jitter_centers: bool,
    /// Leaf threshold for the snapshot partition.
    pub max_items_per_node: usize,
    /// Gravitational constant used in pairwise synthesis.
    pub gravitational_constant: f64,
    /// Optional swirl field.
    pub swirl: Option<SwirlConfig>,
    /// Optional boundary field.
    pub boundary: Option<BoundaryConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_period_ms: 250,
            field_period_ms: 250,
            should_jitter_centers: true,
            max_items_per_node: 8,
            gravitational_constant: 1.0,
            swirl: None,
            boundary: None,
        }
    }
}

impl EngineConfig {
    /// Config with both rebuild cadences set to the same period.
    #[must_use]
    pub fn with_period_ms(period_ms: u64) -> Self {
        Self {
            snapshot_period_ms: period_ms,
            field_period_ms: period_ms,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_period_sets_both_cadences() {
        let config = EngineConfig::with_period_ms(40);
        assert_eq!(config.snapshot_period_ms, 40);
        assert_eq!(config.field_period_ms, 40);
    }
}
