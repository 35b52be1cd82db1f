/*!
Ground contact and pitch/roll stabilization for wheeled, tracked and floating vehicles.

A vehicle's ground devices are grouped into four corner probes. Each tick the probes are
placed at the vehicle's tentative pose and classified against the world, then the
collection rotates the vehicle so that airborne or penetrating corners meet the ground.

- types:       math aliases, corners, parts and vehicle state
- settings:    tolerances and climb-step configuration
- world:       collision queries, with a rapier-backed static world
- ground_box:  one corner probe
- correction:  the shared angle search
- collection:  the four probes and the pitch/roll policies
*/

pub mod collection;
pub mod correction;
pub mod error;
pub mod ground_box;
pub mod settings;
pub mod types;
pub mod world;

#[cfg(test)]
mod testing;

pub use collection::GroundDeviceCollection;
pub use correction::{Correction, RotationAxis};
pub use error::{SettingsError, WorldBuildError};
pub use ground_box::GroundDeviceBox;
pub use settings::{
    CLIENT_COLLISION_NOISE_DEPTH, DEFAULT_CLIMB_STEP, DEFAULT_GROUND_DETECTION_OFFSET,
    DEFAULT_MIN_WHEELBASE, StabilizerSettings,
};
pub use types::{
    Corner, Drivetrain, GroundDeviceKind, GroundDevicePart, PartId, TowLink, VehicleState,
};
pub use world::{ColliderShapeDef, RapierQueryWorld, WorldCollision, WorldStaticDef};
