//! World collision surface consumed by the ground-device boxes, plus a Rapier-backed
//! implementation for immutable static geometry.
//!
//! Design goals
//! - The stabilizer only ever asks two read-only questions about a world-space box:
//!   how deep does solid geometry penetrate it, and does it touch liquid.
//! - Deterministic: given the same inputs (sorted by `id`), build identical in-memory sets.
//! - Immutable world: the Rapier builder assumes statics do not move after construction.

// Re-export Rapier so hosts can build definitions without depending on `rapier3d` directly.
pub use rapier3d;

use std::collections::HashSet;

use rapier3d::na::{Translation3, UnitQuaternion};
use rapier3d::parry::{
    bounding_volume::Aabb,
    query,
    shape::{Cuboid, HalfSpace},
};
use rapier3d::prelude::*;

use crate::error::WorldBuildError;

/// Read-only collision queries against the host world.
pub trait WorldCollision {
    /// Deepest penetration (meters) of solid geometry into `bounds`; `0.0` when clear.
    fn solid_penetration(&self, bounds: &Aabb) -> f32;

    /// Whether `bounds` overlaps any liquid volume.
    fn touches_liquid(&self, bounds: &Aabb) -> bool;
}

impl<W: WorldCollision + ?Sized> WorldCollision for &W {
    fn solid_penetration(&self, bounds: &Aabb) -> f32 {
        (**self).solid_penetration(bounds)
    }

    fn touches_liquid(&self, bounds: &Aabb) -> bool {
        (**self).touches_liquid(bounds)
    }
}

/// Canonical, schema-agnostic definition of an immutable world collider.
///
/// Conventions
/// - Units are meters.
/// - Rotation is a unit quaternion.
/// - For planes the solid side is below `rotation * +Y`, raised by `offset_along_normal`.
#[derive(Clone, Debug)]
pub struct WorldStaticDef {
    /// Stable unique identifier used to ensure deterministic insertion order.
    pub id: u32,
    /// World-space translation.
    pub translation: Vector<f32>,
    /// World-space rotation (unit quaternion).
    pub rotation: UnitQuaternion<f32>,
    /// Collider shape parameters.
    pub shape: ColliderShapeDef,
    /// Liquid volumes are queried separately from solid geometry and never block probes
    /// that do not float.
    pub liquid: bool,
}

impl WorldStaticDef {
    /// An axis-aligned solid block.
    pub fn block(id: u32, center: Vector<f32>, half_extents: Vector<f32>) -> Self {
        Self {
            id,
            translation: center,
            rotation: UnitQuaternion::identity(),
            shape: ColliderShapeDef::Cuboid { half_extents },
            liquid: false,
        }
    }

    /// A horizontal solid ground plane at height `y`.
    pub fn ground(id: u32, y: f32) -> Self {
        Self {
            id,
            translation: vector![0.0, y, 0.0],
            rotation: UnitQuaternion::identity(),
            shape: ColliderShapeDef::Plane {
                offset_along_normal: 0.0,
            },
            liquid: false,
        }
    }

    fn validate(&self) -> Result<(), WorldBuildError> {
        let id = self.id;
        let pose_finite = self.translation.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite());
        if !pose_finite {
            return Err(WorldBuildError::NonFinitePose { id });
        }

        let positive = |value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(WorldBuildError::DegenerateShape { id, value })
            }
        };
        match &self.shape {
            ColliderShapeDef::Plane {
                offset_along_normal,
            } => {
                if !offset_along_normal.is_finite() {
                    return Err(WorldBuildError::DegenerateShape {
                        id,
                        value: *offset_along_normal,
                    });
                }
            }
            ColliderShapeDef::Cuboid { half_extents } => {
                for v in half_extents.iter() {
                    positive(*v)?;
                }
            }
            ColliderShapeDef::Sphere { radius } => positive(*radius)?,
            ColliderShapeDef::CapsuleY {
                radius,
                half_height,
            }
            | ColliderShapeDef::CylinderY {
                radius,
                half_height,
            } => {
                positive(*radius)?;
                positive(*half_height)?;
            }
        }
        Ok(())
    }
}

/// Supported static collider shapes.
///
/// Keep this intentionally small and deterministic. Extend as needed.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite plane (half-space) with normal `rotation * +Y`, shifted along that normal.
    Plane { offset_along_normal: f32 },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vector<f32> },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },

    /// Y-aligned capsule (meters).
    CapsuleY { radius: f32, half_height: f32 },

    /// Y-aligned cylinder (meters).
    CylinderY { radius: f32, half_height: f32 },
}

/// In-memory Rapier structures needed for scene queries against a static world.
///
/// This stores:
/// - `RigidBodySet`/`ColliderSet` containing the static world geometry.
/// - `NarrowPhase` and `BroadPhaseBvh` used to create a borrowed `QueryPipeline`.
///
/// Liquids are inserted as sensor colliders so solid and liquid queries can be filtered
/// apart.
pub struct RapierQueryWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
}

impl RapierQueryWorld {
    /// Build a query world from a list of static collider definitions.
    ///
    /// The input is sorted by `id` before insertion. Definitions with non-finite poses,
    /// non-positive dimensions or repeated ids are rejected.
    pub fn build(mut defs: Vec<WorldStaticDef>) -> Result<Self, WorldBuildError> {
        defs.sort_by_key(|d| d.id);

        let mut seen = HashSet::with_capacity(defs.len());
        for def in &defs {
            def.validate()?;
            if !seen.insert(def.id) {
                return Err(WorldBuildError::DuplicateId(def.id));
            }
        }

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Each static is a fixed rigid-body carrying the pose, with the collider attached
        // at an identity (or, for planes, normal-offset) local transform.
        for def in defs.into_iter() {
            let iso = Isometry::from_parts(Translation3::from(def.translation), def.rotation);

            let rb = RigidBodyBuilder::fixed().pose(iso).build();
            let rb_handle = bodies.insert(rb);

            let collider = collider_from_def(&def);
            colliders.insert_with_parent(collider, rb_handle, &mut bodies);
        }

        // Collision-detection only (no dynamics): updates the broad-phase BVH and the
        // narrow-phase contact graph so scene queries can run.
        let mut broad_phase = BroadPhaseBvh::new();
        let mut narrow_phase = NarrowPhase::new();
        let mut collision_pipeline = CollisionPipeline::new();

        let hooks = ();
        let events = ();

        collision_pipeline.step(
            0.0,
            &mut broad_phase,
            &mut narrow_phase,
            &mut bodies,
            &mut colliders,
            &hooks,
            &events,
        );

        Ok(Self {
            bodies,
            colliders,
            broad_phase,
            narrow_phase,
        })
    }

    /// Number of colliders in the world.
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Create a borrowed `QueryPipeline` view. The returned pipeline borrows `self`.
    pub fn query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }
}

/// Axis-aligned cuboid shape and pose matching `bounds`.
fn probe_shape(bounds: &Aabb) -> (Isometry<f32>, Cuboid) {
    let center = bounds.center();
    let iso = Isometry::translation(center.x, center.y, center.z);
    (iso, Cuboid::new(bounds.half_extents()))
}

/// How far the lowest corner of `bounds`, along the plane normal, sits below a half-space.
fn halfspace_depth(pose: &Isometry<f32>, halfspace: &HalfSpace, bounds: &Aabb) -> f32 {
    let normal = pose.rotation * halfspace.normal.into_inner();
    let half = bounds.half_extents();
    let reach = normal.x.abs() * half.x + normal.y.abs() * half.y + normal.z.abs() * half.z;
    let height = normal.dot(&(bounds.center().coords - pose.translation.vector));
    reach - height
}

impl WorldCollision for RapierQueryWorld {
    fn solid_penetration(&self, bounds: &Aabb) -> f32 {
        let (iso, cuboid) = probe_shape(bounds);
        let pipeline = self.query_pipeline(QueryFilter::default().exclude_sensors());

        let mut deepest = 0.0f32;
        for (_handle, collider) in pipeline.intersect_shape(iso, &cuboid) {
            let depth = match collider.shape().as_halfspace() {
                Some(halfspace) => halfspace_depth(collider.position(), halfspace, bounds),
                // Touching-but-not-penetrating pairs report a non-negative distance.
                None => query::contact(collider.position(), collider.shape(), &iso, &cuboid, 0.0)
                    .ok()
                    .flatten()
                    .map_or(0.0, |contact| -contact.dist),
            };
            deepest = deepest.max(depth);
        }
        deepest
    }

    fn touches_liquid(&self, bounds: &Aabb) -> bool {
        let (iso, cuboid) = probe_shape(bounds);
        let pipeline = self.query_pipeline(QueryFilter::default().exclude_solids());
        pipeline.intersect_shape(iso, &cuboid).next().is_some()
    }
}

/// Build a Rapier collider from a `WorldStaticDef`.
///
/// The pose lives on the parent rigid-body, so the collider is created with an identity
/// local transform. Planes keep their offset as a local translation along +Y, which the
/// parent rotation turns into the world normal.
fn collider_from_def(def: &WorldStaticDef) -> Collider {
    let builder = match &def.shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => ColliderBuilder::halfspace(Vector::y_axis())
            .translation(vector![0.0, *offset_along_normal, 0.0]),

        ColliderShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }

        ColliderShapeDef::Sphere { radius } => ColliderBuilder::ball(*radius),

        ColliderShapeDef::CapsuleY {
            radius,
            half_height,
        } => ColliderBuilder::capsule_y(*half_height, *radius),

        ColliderShapeDef::CylinderY {
            radius,
            half_height,
        } => ColliderBuilder::cylinder(*half_height, *radius),
    };

    builder.sensor(def.liquid).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(center: [f32; 3], half: [f32; 3]) -> Aabb {
        Aabb::from_half_extents(
            point![center[0], center[1], center[2]],
            vector![half[0], half[1], half[2]],
        )
    }

    fn ground_world() -> RapierQueryWorld {
        let water = WorldStaticDef {
            id: 3,
            translation: vector![20.0, 0.0, 0.0],
            rotation: UnitQuaternion::identity(),
            shape: ColliderShapeDef::Cuboid {
                half_extents: vector![5.0, 1.0, 5.0],
            },
            liquid: true,
        };
        RapierQueryWorld::build(vec![
            water,
            WorldStaticDef::block(2, vector![0.0, 0.5, 5.0], vector![1.0, 0.5, 1.0]),
            WorldStaticDef::ground(1, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn build_counts_colliders() {
        let world = ground_world();
        assert_eq!(world.len(), 3);
        assert!(!world.is_empty());
    }

    #[test]
    fn probe_above_ground_is_clear() {
        let world = ground_world();
        let probe = aabb([0.0, 0.5, 0.0], [0.2, 0.2, 0.2]);
        assert_eq!(world.solid_penetration(&probe), 0.0);
        assert!(!world.touches_liquid(&probe));
    }

    #[test]
    fn probe_sunk_into_ground_reports_depth() {
        let world = ground_world();
        // Bottom face 0.1 below the plane.
        let probe = aabb([0.0, 0.1, 0.0], [0.2, 0.2, 0.2]);
        let depth = world.solid_penetration(&probe);
        assert!((depth - 0.1).abs() < 1.0e-3, "depth = {depth}");
    }

    #[test]
    fn shallow_sink_into_ground_reports_shallow_depth() {
        let world = ground_world();
        for (bottom, half_y) in [(-0.01, 0.2), (-0.05, 0.25)] {
            let probe = aabb([0.0, bottom + half_y, 0.0], [0.2, half_y, 0.2]);
            let depth = world.solid_penetration(&probe);
            assert!((depth + bottom).abs() < 1.0e-3, "bottom = {bottom}, depth = {depth}");
        }
    }

    #[test]
    fn block_depth_measures_overlap() {
        let world = ground_world();
        // Bottom face 0.1 below the block top at y = 1.0.
        let probe = aabb([0.0, 1.1, 5.0], [0.2, 0.2, 0.2]);
        let depth = world.solid_penetration(&probe);
        assert!((depth - 0.1).abs() < 1.0e-3, "depth = {depth}");
    }

    #[test]
    fn probe_inside_block_penetrates() {
        let world = ground_world();
        let probe = aabb([0.0, 0.9, 5.0], [0.2, 0.2, 0.2]);
        assert!(world.solid_penetration(&probe) > 0.0);
    }

    #[test]
    fn liquid_is_not_solid() {
        let world = ground_world();
        let probe = aabb([20.0, 0.9, 0.0], [0.2, 0.2, 0.2]);
        assert!(world.touches_liquid(&probe));
        assert_eq!(world.solid_penetration(&probe), 0.0);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = RapierQueryWorld::build(vec![
            WorldStaticDef::ground(7, 0.0),
            WorldStaticDef::ground(7, 1.0),
        ])
        .err();
        assert_eq!(err, Some(WorldBuildError::DuplicateId(7)));
    }

    #[test]
    fn degenerate_shapes_are_rejected() {
        let err = RapierQueryWorld::build(vec![WorldStaticDef::block(
            1,
            vector![0.0, 0.0, 0.0],
            vector![1.0, 0.0, 1.0],
        )])
        .err();
        assert_eq!(
            err,
            Some(WorldBuildError::DegenerateShape { id: 1, value: 0.0 })
        );
    }

    #[test]
    fn non_finite_pose_is_rejected() {
        let mut def = WorldStaticDef::ground(4, 0.0);
        def.translation.x = f32::NAN;
        let err = RapierQueryWorld::build(vec![def]).err();
        assert_eq!(err, Some(WorldBuildError::NonFinitePose { id: 4 }));
    }
}
