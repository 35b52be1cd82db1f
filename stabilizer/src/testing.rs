//! Scripted worlds and vehicle layouts shared by the unit tests.

use rapier3d::parry::bounding_volume::Aabb;

use crate::types::{GroundDevicePart, Vec3, VehicleState};
use crate::world::WorldCollision;

/// Flat ground at `ground_y`, optional solid blocks, optional liquid slab.
///
/// Penetration is the vertical overlap of the probe with the deepest obstacle.
#[derive(Clone, Debug, Default)]
pub struct ScriptedWorld {
    pub ground_y: Option<f32>,
    pub blocks: Vec<Aabb>,
    /// Liquid occupies everything below this height.
    pub liquid_top: Option<f32>,
}

impl ScriptedWorld {
    pub fn flat(ground_y: f32) -> Self {
        Self {
            ground_y: Some(ground_y),
            ..Self::default()
        }
    }

    pub fn with_block(mut self, mins: [f32; 3], maxs: [f32; 3]) -> Self {
        self.blocks.push(Aabb::new(mins.into(), maxs.into()));
        self
    }
}

fn overlaps_xz(a: &Aabb, b: &Aabb) -> bool {
    a.mins.x < b.maxs.x && a.maxs.x > b.mins.x && a.mins.z < b.maxs.z && a.maxs.z > b.mins.z
}

impl WorldCollision for ScriptedWorld {
    fn solid_penetration(&self, bounds: &Aabb) -> f32 {
        let mut deepest = 0.0f32;
        if let Some(y) = self.ground_y {
            deepest = deepest.max(y - bounds.mins.y);
        }
        for block in &self.blocks {
            if overlaps_xz(bounds, block) {
                let overlap = block.maxs.y.min(bounds.maxs.y) - block.mins.y.max(bounds.mins.y);
                deepest = deepest.max(overlap);
            }
        }
        deepest.max(0.0)
    }

    fn touches_liquid(&self, bounds: &Aabb) -> bool {
        self.liquid_top.is_some_and(|top| bounds.mins.y < top)
    }
}

/// Four wheels of diameter 0.5 at `x = ±half_track`, `z = ±half_base`, hub height 0.25
/// so the wheel bottoms sit on `y = 0` in vehicle space.
pub fn four_wheels(half_track: f32, half_base: f32) -> Vec<GroundDevicePart> {
    vec![
        GroundDevicePart::wheel(1, Vec3::new(half_track, 0.25, half_base), 0.2, 0.5),
        GroundDevicePart::wheel(2, Vec3::new(-half_track, 0.25, half_base), 0.2, 0.5),
        GroundDevicePart::wheel(3, Vec3::new(half_track, 0.25, -half_base), 0.2, 0.5),
        GroundDevicePart::wheel(4, Vec3::new(-half_track, 0.25, -half_base), 0.2, 0.5),
    ]
}

/// Vehicle whose local origin sits at `y` in the world.
pub fn vehicle_at_height(y: f32) -> VehicleState {
    VehicleState::at(Vec3::new(0.0, y, 0.0))
}
