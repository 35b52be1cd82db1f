/*!
Core types and math aliases shared by the stabilizer modules.

This module intentionally contains no algorithms. It defines the data exchanged
between the host vehicle and:
- the ground-device boxes (part layout, corner roles),
- the collection (vehicle pose, rotation accumulator, drivetrain, towing).

Coordinate conventions (vehicle-local)
- +X is left, +Y is up, +Z is forward.
- Pitch rotates about X, roll rotates about Z. Angles are radians.
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Point3 = na::Point3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// One of the four fixed probe roles.
///
/// Used as the lookup key for boxes instead of comparing box identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Corner {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Corner {
    /// Fan-out order used by every collection-wide operation.
    pub const ALL: [Corner; 4] = [
        Corner::FrontLeft,
        Corner::FrontRight,
        Corner::RearLeft,
        Corner::RearRight,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn is_front(self) -> bool {
        matches!(self, Corner::FrontLeft | Corner::FrontRight)
    }

    #[inline]
    pub const fn is_left(self) -> bool {
        matches!(self, Corner::FrontLeft | Corner::RearLeft)
    }

    /// Whether a part placed at `offset` (vehicle-local) belongs to this corner.
    ///
    /// Front is `z > 0`, rear is `z <= 0`. Left is `x >= 0`, right is `x <= 0`, so parts
    /// on the centerline sit in both boxes of their axle.
    #[inline]
    pub fn contains_offset(self, offset: &Vec3) -> bool {
        let axle = if self.is_front() {
            offset.z > 0.0
        } else {
            offset.z <= 0.0
        };
        let side = if self.is_left() {
            offset.x >= 0.0
        } else {
            offset.x <= 0.0
        };
        axle && side
    }
}

/// Stable identifier of a ground-device part, assigned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(pub u32);

/// What kind of ground device a part is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroundDeviceKind {
    Wheel,
    Tread,
    Skid,
    Pontoon,
}

impl GroundDeviceKind {
    /// Wheels and treads can transmit drive torque.
    #[inline]
    pub const fn is_drivable(self) -> bool {
        matches!(self, GroundDeviceKind::Wheel | GroundDeviceKind::Tread)
    }
}

/// A ground-device part as seen by the stabilizer.
#[derive(Clone, Copy, Debug)]
pub struct GroundDevicePart {
    pub id: PartId,
    /// Placement of the part center in vehicle-local space (meters).
    pub local_offset: Vec3,
    /// Lateral extent (meters).
    pub width: f32,
    /// Vertical and longitudinal extent, e.g. a wheel diameter (meters).
    pub height: f32,
    pub kind: GroundDeviceKind,
    pub is_spare: bool,
    pub is_active: bool,
    /// Floats on liquids (pontoons, amphibious wheels).
    pub floats: bool,
}

impl GroundDevicePart {
    /// An active, non-spare wheel that does not float.
    pub fn wheel(id: u32, local_offset: Vec3, width: f32, height: f32) -> Self {
        Self {
            id: PartId(id),
            local_offset,
            width,
            height,
            kind: GroundDeviceKind::Wheel,
            is_spare: false,
            is_active: true,
            floats: false,
        }
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.width * 0.5, self.height * 0.5, self.height * 0.5)
    }
}

/// Which axles receive drive torque.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Drivetrain {
    pub front_wheel_drive: bool,
    pub rear_wheel_drive: bool,
}

impl Drivetrain {
    #[inline]
    pub const fn drives(&self, corner: Corner) -> bool {
        if corner.is_front() {
            self.front_wheel_drive
        } else {
            self.rear_wheel_drive
        }
    }
}

/// Link to the vehicle towing this one.
///
/// Its presence alone disables pitch correction. The hookup point is carried for hosts
/// and for pivoting trailers about the hitch, which the collection does not do yet.
#[derive(Clone, Copy, Debug)]
pub struct TowLink {
    /// Hookup point in vehicle-local space (meters).
    pub hookup_point: Vec3,
}

/// Vehicle-level state owned by the host and lent to the collection each tick.
#[derive(Clone, Debug)]
pub struct VehicleState {
    /// World-space position of the vehicle reference point.
    pub position: Vec3,
    pub orientation: Quat,
    /// Per-tick rotation accumulator in radians: x = pitch, y = yaw, z = roll.
    pub rotation: Vec3,
    pub towed_by: Option<TowLink>,
    pub drivetrain: Drivetrain,
    /// True on the authoritative simulation side (server). Non-authoritative sides
    /// ignore shallow collisions during pitch correction.
    pub authoritative: bool,
}

impl VehicleState {
    /// An untowed, authoritative vehicle at `position` with no rotation.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::identity(),
            rotation: Vec3::zeros(),
            towed_by: None,
            drivetrain: Drivetrain::default(),
            authoritative: true,
        }
    }

    #[inline]
    pub fn is_towed(&self) -> bool {
        self.towed_by.is_some()
    }

    /// World-space position of a vehicle-local point.
    #[inline]
    pub fn to_world(&self, local: &Vec3) -> Vec3 {
        self.position + self.orientation * local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_order_matches_indices() {
        for (i, c) in Corner::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn centerline_parts_belong_to_both_sides() {
        let center_front = Vec3::new(0.0, 0.0, 1.5);
        assert!(Corner::FrontLeft.contains_offset(&center_front));
        assert!(Corner::FrontRight.contains_offset(&center_front));
        assert!(!Corner::RearLeft.contains_offset(&center_front));
        assert!(!Corner::RearRight.contains_offset(&center_front));
    }

    #[test]
    fn zero_z_is_rear() {
        let p = Vec3::new(1.0, 0.0, 0.0);
        assert!(Corner::RearLeft.contains_offset(&p));
        assert!(!Corner::FrontLeft.contains_offset(&p));
    }

    #[test]
    fn drivetrain_is_per_axle() {
        let rwd = Drivetrain {
            front_wheel_drive: false,
            rear_wheel_drive: true,
        };
        assert!(!rwd.drives(Corner::FrontLeft));
        assert!(!rwd.drives(Corner::FrontRight));
        assert!(rwd.drives(Corner::RearLeft));
        assert!(rwd.drives(Corner::RearRight));
    }

    #[test]
    fn to_world_applies_orientation_then_position() {
        let mut v = VehicleState::at(Vec3::new(10.0, 0.0, 0.0));
        v.orientation = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        let w = v.to_world(&Vec3::new(0.0, 0.0, 1.0));
        assert!((w - Vec3::new(11.0, 0.0, 0.0)).norm() < 1.0e-5);
    }
}
