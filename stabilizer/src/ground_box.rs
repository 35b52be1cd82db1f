//! Per-corner ground-device probe.
//!
//! A box owns the ground-device parts mapped to one corner of the vehicle, keeps their
//! union as a vehicle-local bounding volume, and classifies that volume against the
//! world every tick:
//! - grounded: the bounds shifted down by the ground tolerance touch solid geometry
//!   (or liquid, for floating probes),
//! - collided: the bounds themselves penetrate solid geometry (or liquid, when floating),
//! - airborne: neither.
//!
//! Grounded and collided can both hold at once; a shallow penetration still supports
//! the vehicle.

use std::collections::BTreeSet;

use rapier3d::parry::bounding_volume::Aabb;

use crate::settings::{DIST_EPS, StabilizerSettings};
use crate::types::{Corner, GroundDevicePart, Iso, PartId, Point3, Vec3, VehicleState};
use crate::world::WorldCollision;

#[derive(Clone, Debug)]
pub struct GroundDeviceBox {
    corner: Corner,
    members: Vec<GroundDevicePart>,
    floats: bool,
    /// Union of the member volumes, vehicle-local.
    local_bounds: Option<Aabb>,
    /// World-space bounds from the last `update_bounds`.
    bounds: Option<Aabb>,
    contact_point: Vec3,
    collision_depth: f32,
    is_grounded: bool,
    is_airborne: bool,
    is_collided: bool,
    is_grounded_liquid: bool,
    is_collided_liquid: bool,
    is_liquid_collided_with_ground: bool,
    /// Set once a collision update has run with members present.
    classified: bool,
}

impl GroundDeviceBox {
    pub fn new(corner: Corner) -> Self {
        Self {
            corner,
            members: Vec::new(),
            floats: false,
            local_bounds: None,
            bounds: None,
            contact_point: Vec3::zeros(),
            collision_depth: 0.0,
            is_grounded: false,
            is_airborne: true,
            is_collided: false,
            is_grounded_liquid: false,
            is_collided_liquid: false,
            is_liquid_collided_with_ground: false,
            classified: false,
        }
    }

    /// Recompute which parts map to this corner and the resulting local volume.
    ///
    /// With no members the contact point resets to zero and the box returns to the
    /// empty airborne state.
    pub fn update_members(&mut self, parts: &[GroundDevicePart]) {
        self.members.clear();
        self.members.extend(
            parts
                .iter()
                .filter(|p| self.corner.contains_offset(&p.local_offset))
                .copied(),
        );
        self.floats = self.members.iter().any(|p| p.floats);

        self.local_bounds = self
            .members
            .iter()
            .map(|p| Aabb::from_half_extents(Point3::from(p.local_offset), p.half_extents()))
            .reduce(|a, b| Aabb::new(a.mins.inf(&b.mins), a.maxs.sup(&b.maxs)));

        match self.local_bounds {
            Some(local) => {
                let center = local.center();
                self.contact_point = Vec3::new(center.x, local.mins.y, center.z);
            }
            None => self.reset(),
        }
    }

    fn reset(&mut self) {
        self.bounds = None;
        self.contact_point = Vec3::zeros();
        self.collision_depth = 0.0;
        self.is_grounded = false;
        self.is_airborne = true;
        self.is_collided = false;
        self.is_grounded_liquid = false;
        self.is_collided_liquid = false;
        self.is_liquid_collided_with_ground = false;
        self.classified = false;
    }

    /// Place the local volume in the world using the vehicle's tentative pose.
    pub fn update_bounds(&mut self, vehicle: &VehicleState) {
        self.bounds = self.local_bounds.map(|local| {
            let center = vehicle.to_world(&local.center().coords);
            Aabb::from_half_extents(Point3::from(center), local.half_extents())
        });
    }

    /// Classify the current bounds against `world`.
    ///
    /// Every member of a grounded box is added to `grounded`.
    pub fn update_collision_statuses<W: WorldCollision + ?Sized>(
        &mut self,
        world: &W,
        settings: &StabilizerSettings,
        grounded: &mut BTreeSet<PartId>,
    ) {
        // Empty, or not placed yet.
        let Some(bounds) = self.bounds else {
            return;
        };

        let below = shifted_down(&bounds, settings.ground_detection_offset);

        self.collision_depth = world.solid_penetration(&bounds);
        let solid_ground = world.solid_penetration(&below) > DIST_EPS;

        self.is_collided_liquid = self.floats && world.touches_liquid(&bounds);
        self.is_grounded_liquid = self.floats && world.touches_liquid(&below);
        self.is_liquid_collided_with_ground = self.is_grounded_liquid && solid_ground;

        self.is_collided = self.collision_depth > DIST_EPS || self.is_collided_liquid;
        self.is_grounded = solid_ground || self.is_grounded_liquid;
        self.is_airborne = !self.is_grounded && !self.is_collided;
        self.classified = true;

        if self.is_grounded {
            grounded.extend(self.members.iter().map(|p| p.id));
        }
    }

    /// Occupied and classified at least once.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.classified && self.contact_point != Vec3::zeros()
    }

    #[inline]
    pub fn is_part_of_box(&self, part: PartId) -> bool {
        self.members.iter().any(|p| p.id == part)
    }

    /// What-if test used by the stabilization search.
    ///
    /// Applies the vehicle-local `transform` to this probe's volume, places it in the
    /// world offset by `motion_hint`, and reports whether it would penetrate solid
    /// geometry (or liquid, for floating probes). Persistent state is not touched.
    pub fn collided_with_transform<W: WorldCollision + ?Sized>(
        &self,
        world: &W,
        vehicle: &VehicleState,
        transform: &Iso,
        motion_hint: &Vec3,
    ) -> bool {
        let Some(local) = self.local_bounds else {
            return false;
        };

        let moved = transform * local.center();
        let center = vehicle.to_world(&moved.coords) + motion_hint;
        let candidate = Aabb::from_half_extents(Point3::from(center), local.half_extents());

        world.solid_penetration(&candidate) > DIST_EPS
            || (self.floats && world.touches_liquid(&candidate))
    }

    #[inline]
    pub fn corner(&self) -> Corner {
        self.corner
    }

    #[inline]
    pub fn members(&self) -> &[GroundDevicePart] {
        &self.members
    }

    /// World-space bounds, `None` when the box is empty or not yet placed.
    #[inline]
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Vehicle-local contact point; zero when nothing occupies the box.
    #[inline]
    pub fn contact_point(&self) -> Vec3 {
        self.contact_point
    }

    #[inline]
    pub fn collision_depth(&self) -> f32 {
        self.collision_depth
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.is_grounded
    }

    #[inline]
    pub fn is_airborne(&self) -> bool {
        self.is_airborne
    }

    #[inline]
    pub fn is_collided(&self) -> bool {
        self.is_collided
    }

    #[inline]
    pub fn is_grounded_liquid(&self) -> bool {
        self.is_grounded_liquid
    }

    #[inline]
    pub fn is_collided_liquid(&self) -> bool {
        self.is_collided_liquid
    }

    #[inline]
    pub fn is_liquid_collided_with_ground(&self) -> bool {
        self.is_liquid_collided_with_ground
    }

    /// Neither grounded nor collided.
    #[inline]
    pub fn is_free(&self) -> bool {
        !self.is_grounded && !self.is_collided
    }
}

fn shifted_down(bounds: &Aabb, distance: f32) -> Aabb {
    let offset = Vec3::new(0.0, distance, 0.0);
    Aabb::new(bounds.mins - offset, bounds.maxs - offset)
}
