/*!
Stabilizer settings and tolerances.

These constants centralize the parameters used by the ground-device boxes and the
pitch/roll stabilization search. Keeping them together makes tuning easier and helps
ensure identical behavior on the authoritative and non-authoritative sides.

Notes
- Distances are in meters, angles in radians.
- Hosts usually load their own values; these are the defaults they fall back to.
*/

use crate::error::SettingsError;

/// Maximum height (meters) a probe may be lifted or lowered by a single stabilization
/// rotation. The step search starts here and walks down in quarter steps.
pub const DEFAULT_CLIMB_STEP: f32 = 0.125;

/// Shortest lever arm (meters) the stabilization search will rotate about.
/// Defaults to the climb step: `asin(step / arm)` is undefined for shorter arms.
pub const DEFAULT_MIN_WHEELBASE: f32 = DEFAULT_CLIMB_STEP;

/// Vertical ground-detection tolerance (meters).
///
/// A probe counts as grounded when its bounds, shifted down by this amount, touch solid
/// geometry. It is also the floor of the step search and the downward offset applied to
/// axle contact points.
pub const DEFAULT_GROUND_DETECTION_OFFSET: f32 = 0.05;

/// Collision depth (meters) below which a non-authoritative side ignores a collided
/// probe during pitch correction. Keeps visual noise from rocking the vehicle.
pub const CLIENT_COLLISION_NOISE_DEPTH: f32 = 0.1;

/// Practical small distance for comparisons (meters).
pub const DIST_EPS: f32 = 1.0e-6;

/// Tunables consumed by the ground-device collection.
///
/// Treated as constants for the lifetime of a collection. Build with [`Default`] and
/// override fields, then pass through [`StabilizerSettings::validate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StabilizerSettings {
    /// Lever arms shorter than this abort the search with no effect.
    pub min_wheelbase: f32,
    /// First (largest) step tried by the search.
    pub max_climb_step: f32,
    /// Ground tolerance, search floor and contact-point offset.
    pub ground_detection_offset: f32,
    /// See [`CLIENT_COLLISION_NOISE_DEPTH`].
    pub client_collision_noise_depth: f32,
}

impl Default for StabilizerSettings {
    fn default() -> Self {
        Self {
            min_wheelbase: DEFAULT_MIN_WHEELBASE,
            max_climb_step: DEFAULT_CLIMB_STEP,
            ground_detection_offset: DEFAULT_GROUND_DETECTION_OFFSET,
            client_collision_noise_depth: CLIENT_COLLISION_NOISE_DEPTH,
        }
    }
}

impl StabilizerSettings {
    /// Decrement applied between search attempts.
    #[inline]
    pub fn quarter_step(&self) -> f32 {
        self.max_climb_step / 4.0
    }

    /// Reject values that would make the search meaningless or unbounded.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.max_climb_step.is_finite() || self.max_climb_step <= 0.0 {
            return Err(SettingsError::ClimbStep(self.max_climb_step));
        }
        if !self.ground_detection_offset.is_finite() || self.ground_detection_offset < 0.0 {
            return Err(SettingsError::GroundDetectionOffset(
                self.ground_detection_offset,
            ));
        }
        if !self.min_wheelbase.is_finite() || self.min_wheelbase <= 0.0 {
            return Err(SettingsError::MinWheelbase(self.min_wheelbase));
        }
        if !self.client_collision_noise_depth.is_finite() || self.client_collision_noise_depth < 0.0
        {
            return Err(SettingsError::NoiseDepth(self.client_collision_noise_depth));
        }
        Ok(())
    }

    /// Downward offset added to axle contact points.
    #[inline]
    pub fn ground_detection_vector(&self) -> crate::types::Vec3 {
        crate::types::Vec3::new(0.0, -self.ground_detection_offset, 0.0)
    }
}
