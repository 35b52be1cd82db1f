//! The four ground-device boxes of a vehicle and the pitch/roll correction policies.
//!
//! The owning vehicle calls, once per tick and in this order:
//! 1. [`GroundDeviceCollection::update_members`]
//! 2. [`GroundDeviceCollection::update_bounds`]
//! 3. [`GroundDeviceCollection::update_collisions`]
//! 4. [`GroundDeviceCollection::perform_pitch_correction`]
//! 5. [`GroundDeviceCollection::perform_roll_correction`]
//!
//! or [`GroundDeviceCollection::run_tick`], which does all of the above.
//!
//! Corrections rotate the vehicle's per-tick angle accumulator and add the induced
//! displacement to a caller-owned ground-motion vector; the vehicle's position itself is
//! never changed here.

use std::collections::BTreeSet;

use rapier3d::parry::bounding_volume::Aabb;

use crate::correction::{Correction, RotationAxis, RotationRequest, search_rotation};
use crate::error::SettingsError;
use crate::ground_box::GroundDeviceBox;
use crate::settings::StabilizerSettings;
use crate::types::{Corner, GroundDevicePart, PartId, Vec3, VehicleState};
use crate::world::WorldCollision;

use Corner::{FrontLeft, FrontRight, RearLeft, RearRight};

#[derive(Clone, Debug)]
pub struct GroundDeviceCollection {
    settings: StabilizerSettings,
    /// Indexed by [`Corner::index`]; never resized or reordered.
    boxes: [GroundDeviceBox; 4],
    grounded_ground_devices: BTreeSet<PartId>,
    driven_wheels: BTreeSet<PartId>,
}

impl GroundDeviceCollection {
    pub fn new(settings: StabilizerSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            settings,
            boxes: Corner::ALL.map(GroundDeviceBox::new),
            grounded_ground_devices: BTreeSet::new(),
            driven_wheels: BTreeSet::new(),
        })
    }

    #[inline]
    pub fn settings(&self) -> &StabilizerSettings {
        &self.settings
    }

    #[inline]
    pub fn ground_box(&self, corner: Corner) -> &GroundDeviceBox {
        &self.boxes[corner.index()]
    }

    /// Parts whose box was grounded at the last collision update.
    #[inline]
    pub fn grounded_ground_devices(&self) -> &BTreeSet<PartId> {
        &self.grounded_ground_devices
    }

    /// Parts receiving drive torque, as of the last membership update.
    #[inline]
    pub fn driven_wheels(&self) -> &BTreeSet<PartId> {
        &self.driven_wheels
    }

    /// Refresh box membership, then rebuild the driven-wheel set.
    ///
    /// A part is driven when it is not a spare, is active, is a wheel or tread, and the
    /// vehicle drives the axle of the box holding it.
    pub fn update_members(&mut self, vehicle: &VehicleState, parts: &[GroundDevicePart]) {
        for b in &mut self.boxes {
            b.update_members(parts);
        }

        self.driven_wheels.clear();
        for b in &self.boxes {
            if !vehicle.drivetrain.drives(b.corner()) {
                continue;
            }
            self.driven_wheels.extend(
                b.members()
                    .iter()
                    .filter(|p| !p.is_spare && p.is_active && p.kind.is_drivable())
                    .map(|p| p.id),
            );
        }
    }

    pub fn update_bounds(&mut self, vehicle: &VehicleState) {
        for b in &mut self.boxes {
            b.update_bounds(vehicle);
        }
    }

    /// Reclassify every box and rebuild the grounded set.
    pub fn update_collisions<W: WorldCollision + ?Sized>(&mut self, world: &W) {
        self.grounded_ground_devices.clear();
        for b in &mut self.boxes {
            b.update_collision_statuses(world, &self.settings, &mut self.grounded_ground_devices);
        }
    }

    pub fn max_collision_depth(&self) -> f32 {
        self.boxes
            .iter()
            .map(GroundDeviceBox::collision_depth)
            .fold(0.0, f32::max)
    }

    /// Boxes floating on liquid while also resting on solid ground beneath it.
    pub fn number_collided_liquid_boxes(&self) -> usize {
        self.boxes
            .iter()
            .filter(|b| b.is_grounded_liquid() && b.is_liquid_collided_with_ground())
            .count()
    }

    /// Boxes touching liquid at all. Only floating boxes ever do.
    pub fn number_boxes_in_liquid(&self) -> usize {
        self.boxes
            .iter()
            .filter(|b| b.is_collided_liquid() || b.is_grounded_liquid())
            .count()
    }

    /// World bounds of every occupied box, in corner order.
    pub fn ground_bounds(&self) -> Vec<Aabb> {
        self.boxes.iter().filter_map(GroundDeviceBox::bounds).collect()
    }

    pub fn is_anything_on_ground(&self) -> bool {
        self.boxes.iter().any(GroundDeviceBox::is_grounded)
    }

    /// First corner, in fan-out order, whose box holds `part`.
    pub fn corner_of(&self, part: PartId) -> Option<Corner> {
        Corner::ALL
            .into_iter()
            .find(|c| self.ground_box(*c).is_part_of_box(part))
    }

    /// The real on-ground state of the box holding `part`.
    ///
    /// Unlike [`Self::grounded_ground_devices`], which only lists parts usable for
    /// physics, this answers for a single part and is false for unknown parts.
    pub fn is_actually_on_ground(&self, part: PartId) -> bool {
        self.corner_of(part)
            .is_some_and(|c| self.ground_box(c).is_grounded())
    }

    /// Vehicle-local contact point of the front or rear axle.
    ///
    /// The midpoint of both sides when both are occupied, the occupied side otherwise,
    /// lowered by the ground-detection offset. `None` when the axle has no devices.
    pub fn contact_point(&self, front: bool) -> Option<Vec3> {
        let (left, right) = if front {
            (FrontLeft, FrontRight)
        } else {
            (RearLeft, RearRight)
        };
        let left = self.ground_box(left).contact_point();
        let right = self.ground_box(right).contact_point();
        let offset = self.settings.ground_detection_vector();

        match (left != Vec3::zeros(), right != Vec3::zeros()) {
            (false, false) => None,
            (true, false) => Some(left + offset),
            (false, true) => Some(right + offset),
            (true, true) => Some((right - left) * 0.5 + left + offset),
        }
    }

    /// Whether the boxes can support ground calculations: a front point, a rear point,
    /// and either a second point on an axle or an off-centerline point.
    ///
    /// The walk is order dependent: a ready rear-left box overwrites the center flag set
    /// by the front axle. This is not the same as counting occupied boxes.
    pub fn is_ready(&self) -> bool {
        let mut have_front = false;
        let mut have_rear = false;
        let mut have_center = false;

        let fl = self.ground_box(FrontLeft);
        if fl.is_ready() {
            have_front = true;
            have_center = fl.contact_point().x != 0.0;
        }
        let fr = self.ground_box(FrontRight);
        if fr.is_ready() {
            if have_front {
                have_center = true;
            } else {
                have_front = true;
            }
            if !have_center {
                have_center = fr.contact_point().x != 0.0;
            }
        }
        if have_front {
            let rl = self.ground_box(RearLeft);
            if rl.is_ready() {
                have_rear = true;
                have_center = rl.contact_point().x != 0.0;
            }
            let rr = self.ground_box(RearRight);
            if rr.is_ready() {
                if have_rear {
                    have_center = true;
                } else {
                    have_rear = true;
                }
                if !have_center {
                    have_center = rr.contact_point().x != 0.0;
                }
            }
        }
        have_front && have_rear && have_center
    }

    /// False when every contact point sits on the centerline, where roll is undefined.
    pub fn can_do_roll_checks(&self) -> bool {
        self.boxes.iter().any(|b| b.contact_point().x != 0.0)
    }

    fn request(
        &self,
        pivot: Corner,
        targets: [Corner; 2],
        axis: RotationAxis,
        clockwise: bool,
    ) -> RotationRequest<'_> {
        RotationRequest {
            pivot: self.ground_box(pivot),
            targets: targets.map(|c| self.ground_box(c)),
            axis,
            clockwise,
        }
    }

    /// Search `request` and apply the result if one is found.
    fn adjust_angles<W: WorldCollision + ?Sized>(
        &self,
        world: &W,
        vehicle: &mut VehicleState,
        request: RotationRequest<'_>,
        ground_motion: &mut Vec3,
    ) -> Option<Correction> {
        let correction = search_rotation(world, vehicle, &self.settings, &request, ground_motion)?;
        correction.apply(vehicle, ground_motion);
        Some(correction)
    }

    /// Rotate the vehicle about the X axis so airborne or collided axles meet the ground.
    ///
    /// Checks, first match wins:
    /// - rear axle airborne, front down: counter-clockwise about the front,
    /// - front axle airborne, rear down: clockwise about the rear,
    /// - front collided, rear resting: counter-clockwise about the rear,
    /// - rear collided, front resting: clockwise about the front.
    ///
    /// Collided checks on the non-authoritative side only fire past the noise depth.
    /// Towed vehicles are left alone.
    pub fn perform_pitch_correction<W: WorldCollision + ?Sized>(
        &self,
        world: &W,
        vehicle: &mut VehicleState,
        ground_motion: &mut Vec3,
    ) -> Option<Correction> {
        if vehicle.is_towed() {
            // TODO: pivot trailers about the tow hookup point instead of skipping them.
            log::trace!("pitch correction skipped for towed vehicle");
            return None;
        }

        let fl = self.ground_box(FrontLeft);
        let fr = self.ground_box(FrontRight);
        let rl = self.ground_box(RearLeft);
        let rr = self.ground_box(RearRight);
        let pitch = RotationAxis::Pitch;
        let front_pivot = if fl.contact_point().z > fr.contact_point().x {
            FrontLeft
        } else {
            FrontRight
        };
        let rear_pivot = if rl.contact_point().z < rr.contact_point().x {
            RearLeft
        } else {
            RearRight
        };
        let noise = self.settings.client_collision_noise_depth;

        if rl.is_airborne() && rl.is_ready() && rr.is_airborne() && rr.is_ready() {
            let pivot = match (fl.is_airborne(), fr.is_airborne()) {
                (false, false) => Some(front_pivot),
                (false, true) => Some(FrontLeft),
                (true, false) => Some(FrontRight),
                (true, true) => None,
            };
            if let Some(pivot) = pivot {
                return self.adjust_angles(
                    world,
                    vehicle,
                    self.request(pivot, [RearLeft, RearRight], pitch, false),
                    ground_motion,
                );
            }
        }

        if fl.is_airborne() && fl.is_ready() && fr.is_airborne() && fr.is_ready() {
            let pivot = match (rl.is_airborne(), rr.is_airborne()) {
                (false, false) => Some(rear_pivot),
                (false, true) => Some(RearLeft),
                (true, false) => Some(RearRight),
                (true, true) => None,
            };
            if let Some(pivot) = pivot {
                return self.adjust_angles(
                    world,
                    vehicle,
                    self.request(pivot, [FrontLeft, FrontRight], pitch, true),
                    ground_motion,
                );
            }
        }

        if (fl.is_collided() || fr.is_collided())
            && (vehicle.authoritative
                || fl.collision_depth() > noise
                || fr.collision_depth() > noise)
            && resting(rl)
            && resting(rr)
        {
            return self.adjust_angles(
                world,
                vehicle,
                self.request(rear_pivot, [FrontLeft, FrontRight], pitch, false),
                ground_motion,
            );
        }

        if (rl.is_collided() || rr.is_collided())
            && (vehicle.authoritative
                || rl.collision_depth() > noise
                || rr.collision_depth() > noise)
            && resting(fl)
            && resting(fr)
        {
            return self.adjust_angles(
                world,
                vehicle,
                self.request(front_pivot, [RearLeft, RearRight], pitch, true),
                ground_motion,
            );
        }

        None
    }

    /// Rotate the vehicle about the Z axis when one side is free and the other is down.
    ///
    /// Both left probes free: counter-clockwise about the right side. Both right probes
    /// free: clockwise about the left side. The two cases exclude each other.
    pub fn perform_roll_correction<W: WorldCollision + ?Sized>(
        &self,
        world: &W,
        vehicle: &mut VehicleState,
        ground_motion: &mut Vec3,
    ) -> Option<Correction> {
        if !self.can_do_roll_checks() {
            log::trace!("roll correction skipped: all contact points on the centerline");
            return None;
        }

        let fl = self.ground_box(FrontLeft);
        let fr = self.ground_box(FrontRight);
        let rl = self.ground_box(RearLeft);
        let rr = self.ground_box(RearRight);
        let roll = RotationAxis::Roll;

        if fl.is_free() && fl.is_ready() && rl.is_free() && rl.is_ready() {
            let pivot = match (down(fr), down(rr)) {
                (true, true) if fr.contact_point().z < rr.contact_point().x => Some(FrontRight),
                (true, true) => Some(RearRight),
                (true, false) => Some(FrontRight),
                (false, true) => Some(RearRight),
                (false, false) => None,
            };
            if let Some(pivot) = pivot {
                return self.adjust_angles(
                    world,
                    vehicle,
                    self.request(pivot, [FrontLeft, RearLeft], roll, false),
                    ground_motion,
                );
            }
        }

        if fr.is_free() && fr.is_ready() && rr.is_free() && rr.is_ready() {
            let pivot = match (down(fl), down(rl)) {
                (true, true) if fl.contact_point().z < rl.contact_point().x => Some(FrontLeft),
                (true, true) => Some(RearLeft),
                (true, false) => Some(FrontLeft),
                (false, true) => Some(RearLeft),
                (false, false) => None,
            };
            if let Some(pivot) = pivot {
                return self.adjust_angles(
                    world,
                    vehicle,
                    self.request(pivot, [FrontRight, RearRight], roll, true),
                    ground_motion,
                );
            }
        }

        None
    }

    /// One full stabilization tick against the vehicle's tentative pose.
    ///
    /// Returns the ground motion the vehicle should add to its position. Corrections
    /// only run once the boxes are ready.
    pub fn run_tick<W: WorldCollision + ?Sized>(
        &mut self,
        world: &W,
        vehicle: &mut VehicleState,
        parts: &[GroundDevicePart],
    ) -> Vec3 {
        self.update_members(vehicle, parts);
        self.update_bounds(vehicle);
        self.update_collisions(world);

        let mut ground_motion = Vec3::zeros();
        if self.is_ready() {
            self.perform_pitch_correction(world, vehicle, &mut ground_motion);
            self.perform_roll_correction(world, vehicle, &mut ground_motion);
        }
        ground_motion
    }
}

/// Grounded without penetrating.
#[inline]
fn resting(b: &GroundDeviceBox) -> bool {
    b.is_grounded() && !b.is_collided()
}

/// Grounded or collided.
#[inline]
fn down(b: &GroundDeviceBox) -> bool {
    b.is_grounded() || b.is_collided()
}
