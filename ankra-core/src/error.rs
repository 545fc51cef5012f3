//! Error types for anchor-watch operations

use thiserror::Error;

/// Errors surfaced synchronously to the caller of a configuration
/// operation (drop/raise/set). Per-cycle evaluation never returns these;
/// evaluation errors degrade to a safe default instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnchorError {
    /// Rejected configuration; in-memory state is unchanged
    #[error("Invalid anchor configuration: {0}")]
    InvalidConfig(String),

    /// No current vessel position available when one was required
    #[error("No vessel position available")]
    MissingPosition,

    /// Operation requires an active anchor watch
    #[error("No anchor is set")]
    NotWatching,

    /// Config save failed; in-memory state was NOT rolled back
    #[error("Failed to persist configuration: {0}")]
    Persistence(String),
}

/// Why a sector-polygon containment evaluation could not produce an
/// answer. Callers fall back to the plain radius check for that cycle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentFailure {
    /// A coordinate or parameter was NaN or infinite
    #[error("Non-finite input to containment computation")]
    NonFiniteInput,

    /// The sector polygon collapsed to fewer than three vertices
    #[error("Degenerate sector polygon")]
    DegeneratePolygon,
}
