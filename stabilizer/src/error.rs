//! Configuration errors raised at the integration boundary.
//!
//! The stabilization algorithm itself never fails: every degenerate case is a
//! "no correction this tick" outcome. Only bad settings and malformed world
//! definitions are reported, and only when they are handed to the crate.

use thiserror::Error;

/// Invalid [`StabilizerSettings`](crate::settings::StabilizerSettings).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SettingsError {
    #[error("max climb step must be finite and positive, got {0}")]
    ClimbStep(f32),
    #[error("ground detection offset must be finite and non-negative, got {0}")]
    GroundDetectionOffset(f32),
    #[error("minimum wheelbase must be finite and positive, got {0}")]
    MinWheelbase(f32),
    #[error("client collision noise depth must be finite and non-negative, got {0}")]
    NoiseDepth(f32),
}

/// Malformed static world definition passed to
/// [`RapierQueryWorld::build`](crate::world::RapierQueryWorld::build).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldBuildError {
    #[error("world static {id} has a non-finite pose")]
    NonFinitePose { id: u32 },
    #[error("world static {id} has a degenerate shape dimension {value}")]
    DegenerateShape { id: u32, value: f32 },
    #[error("world static id {0} is defined more than once")]
    DuplicateId(u32),
}
