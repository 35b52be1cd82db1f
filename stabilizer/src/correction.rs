//! Pitch/roll angle search shared by both correction policies.
//!
//! Algorithm:
//! - Measure the lever arm from the pivot probe to each target probe, in the Y/Z plane
//!   for pitch and the X/Y plane for roll. Arms shorter than the minimum wheelbase abort.
//! - Walk the climb step down from its maximum in quarter steps while it stays above the
//!   ground-detection tolerance. Each step becomes `angle = asin(step / arm)` about the
//!   pivot's contact point.
//! - The first angle for which neither target probe would collide is accepted (largest
//!   feasible first, not smallest). If every angle collides nothing is applied.

use nalgebra as na;

use crate::ground_box::GroundDeviceBox;
use crate::settings::{DIST_EPS, StabilizerSettings};
use crate::types::{Corner, Iso, Point3, Quat, Vec3, VehicleState};
use crate::world::WorldCollision;

/// Which vehicle angle a correction drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationAxis {
    /// About the lateral X axis.
    Pitch,
    /// About the longitudinal Z axis.
    Roll,
}

impl RotationAxis {
    /// Planar distance between two contact points in this axis' rotation plane.
    #[inline]
    pub fn lever_arm(self, from: &Vec3, to: &Vec3) -> f32 {
        match self {
            RotationAxis::Pitch => (from.z - to.z).hypot(from.y - to.y),
            RotationAxis::Roll => (from.x - to.x).hypot(from.y - to.y),
        }
    }

    #[inline]
    pub fn rotation(self, angle: f32) -> Quat {
        let axis = match self {
            RotationAxis::Pitch => na::Vector3::x_axis(),
            RotationAxis::Roll => na::Vector3::z_axis(),
        };
        Quat::from_axis_angle(&axis, angle)
    }
}

/// A rotation about one probe, tested against two others.
#[derive(Clone, Copy, Debug)]
pub struct RotationRequest<'a> {
    pub pivot: &'a GroundDeviceBox,
    pub targets: [&'a GroundDeviceBox; 2],
    pub axis: RotationAxis,
    /// Positive angles when true, negative otherwise.
    pub clockwise: bool,
}

/// An accepted rotation and the linear motion it induces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correction {
    pub axis: RotationAxis,
    /// Corner whose contact point the vehicle turned about.
    pub pivot: Corner,
    /// Signed angle in radians.
    pub angle: f32,
    /// The climb step that produced `angle`.
    pub step: f32,
    /// World-space displacement of the vehicle reference point.
    pub translation: Vec3,
}

impl Correction {
    /// Add the angle to the vehicle's pitch (x) or roll (z) accumulator and the
    /// translation to `ground_motion`.
    pub fn apply(&self, vehicle: &mut VehicleState, ground_motion: &mut Vec3) {
        match self.axis {
            RotationAxis::Pitch => vehicle.rotation.x += self.angle,
            RotationAxis::Roll => vehicle.rotation.z += self.angle,
        }
        *ground_motion += self.translation;
    }
}

/// Climb steps in the order the search tries them.
///
/// Starts at `max_climb_step`, decreases by a quarter of it, and stops before reaching
/// `ground_detection_offset`. Settings must be validated; a non-positive step never ends.
pub fn candidate_steps(settings: &StabilizerSettings) -> impl Iterator<Item = f32> {
    let quarter = settings.quarter_step();
    let floor = settings.ground_detection_offset;
    std::iter::successors(Some(settings.max_climb_step), move |step| {
        Some(step - quarter)
    })
    .take_while(move |step| *step > floor)
}

/// Rigid transform rotating by `angle` about `pivot`, in vehicle-local space.
#[inline]
pub fn rotation_about(axis: RotationAxis, angle: f32, pivot: &Vec3) -> Iso {
    Iso::rotation_wrt_point(axis.rotation(angle), Point3::from(*pivot))
}

/// Run the step search for `request` without mutating anything.
///
/// `motion_hint` is the ground motion accumulated so far this tick; candidate volumes are
/// tested at their would-be positions after that motion.
pub fn search_rotation<W: WorldCollision + ?Sized>(
    world: &W,
    vehicle: &VehicleState,
    settings: &StabilizerSettings,
    request: &RotationRequest<'_>,
    motion_hint: &Vec3,
) -> Option<Correction> {
    let pivot = request.pivot.contact_point();
    let [first, second] = request.targets;

    let furthest = request
        .axis
        .lever_arm(&pivot, &first.contact_point())
        .max(request.axis.lever_arm(&pivot, &second.contact_point()));
    if furthest < settings.min_wheelbase || furthest <= DIST_EPS {
        log::trace!(
            "{:?} about {:?}: lever arm {furthest} below minimum wheelbase",
            request.axis,
            request.pivot.corner()
        );
        return None;
    }

    for step in candidate_steps(settings) {
        // Short arms with a permissive minimum wheelbase would leave asin's domain.
        let mut angle = (step / furthest).min(1.0).asin();
        if !request.clockwise {
            angle = -angle;
        }

        let transform = rotation_about(request.axis, angle, &pivot);
        if !first.collided_with_transform(world, vehicle, &transform, motion_hint)
            && !second.collided_with_transform(world, vehicle, &transform, motion_hint)
        {
            // How the vehicle origin moves when the body turns about the pivot.
            let local = transform * Point3::origin();
            let translation = vehicle.orientation * local.coords;

            log::debug!(
                "{:?} about {:?}: accepted step {step}, angle {angle} rad",
                request.axis,
                request.pivot.corner()
            );
            return Some(Correction {
                axis: request.axis,
                pivot: request.pivot.corner(),
                angle,
                step,
                translation,
            });
        }
    }

    log::debug!(
        "{:?} about {:?}: every step collides, no correction",
        request.axis,
        request.pivot.corner()
    );
    None
}
