//! Rigid obstacles the fluid collides with.
//!
//! Bodies share one struct; the shape is a closed enum dispatched by `match`.
//! Collision tests are swept: a particle moving from `position` by
//! `displacement` hits the body at the first parameter `t` in `[0, 1]` where it
//! touches the surface.

use bevy::prelude::*;

use super::error::{FluidError, Result};

/// Stable index of a body inside the simulation arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub usize);

/// Geometry of a rigid body.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub enum BodyShape {
    Sphere { radius: f32 },
    /// Axis-aligned box with full edge lengths `size`.
    Box { size: Vec3 },
    /// Box with full edge lengths `size`, oriented by the body rotation.
    RotatingBox { size: Vec3 },
}

/// Result of a swept particle test against a body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyContact {
    /// Contact point relative to the body center, in world orientation.
    pub offset: Vec3,
    /// Outward unit surface normal at the contact.
    pub normal: Vec3,
    /// Sweep parameter of the contact in `[0, 1]`.
    pub time: f32,
    /// Distance travelled past the contact point.
    pub depth: f32,
}

/// A rigid obstacle.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidBody {
    pub shape: BodyShape,
    pub center: Vec3,
    pub velocity: Vec3,
    /// Force accumulator, zeroed at the start of every step.
    pub force: Vec3,
    pub mass: f32,
    /// Axis-angle rotation; the length is the angle in radians.
    /// Only rotating boxes use it.
    pub rotation: Vec3,
    /// Angular velocity in radians per second. Only rotating boxes use it.
    pub angular_velocity: Vec3,
    /// Center before the last integration.
    pub(crate) previous_center: Vec3,
}

impl RigidBody {
    fn with_shape(shape: BodyShape, center: Vec3, mass: f32) -> Self {
        Self {
            shape,
            center,
            velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            mass,
            rotation: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            previous_center: center,
        }
    }

    /// Create a sphere.
    pub fn sphere(center: Vec3, radius: f32, mass: f32) -> Self {
        Self::with_shape(BodyShape::Sphere { radius }, center, mass)
    }

    /// Create an axis-aligned box.
    pub fn cuboid(center: Vec3, size: Vec3, mass: f32) -> Self {
        Self::with_shape(BodyShape::Box { size }, center, mass)
    }

    /// Create a box that can rotate.
    pub fn rotating_box(center: Vec3, size: Vec3, mass: f32) -> Self {
        Self::with_shape(BodyShape::RotatingBox { size }, center, mass)
    }

    /// Set the linear velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the axis-angle rotation.
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the angular velocity.
    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Rejects bodies with non-physical mass or dimensions.
    pub fn validate(&self) -> Result<()> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(FluidError::NonPositiveMass(self.mass));
        }
        match self.shape {
            BodyShape::Sphere { radius } => {
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(FluidError::InvalidShape(format!(
                        "sphere radius must be positive, got {radius}"
                    )));
                }
            }
            BodyShape::Box { size } | BodyShape::RotatingBox { size } => {
                if !(size.is_finite() && size.min_element() > 0.0) {
                    return Err(FluidError::InvalidShape(format!(
                        "box size must be positive, got {size}"
                    )));
                }
            }
        }
        if !(self.center.is_finite()
            && self.velocity.is_finite()
            && self.rotation.is_finite()
            && self.angular_velocity.is_finite())
        {
            return Err(FluidError::NonFinite("body state"));
        }
        Ok(())
    }

    /// Current orientation. Identity for shapes that do not rotate.
    pub fn orientation(&self) -> Quat {
        match self.shape {
            BodyShape::RotatingBox { .. } => Quat::from_scaled_axis(self.rotation),
            BodyShape::Sphere { .. } | BodyShape::Box { .. } => Quat::IDENTITY,
        }
    }

    /// Half extents of an axis-aligned box enclosing the body.
    pub fn bounding_half_extents(&self) -> Vec3 {
        match self.shape {
            BodyShape::Sphere { radius } => Vec3::splat(radius),
            BodyShape::Box { size } => size * 0.5,
            BodyShape::RotatingBox { size } => Vec3::splat(size.length() * 0.5),
        }
    }

    /// Linear velocity of the body.
    pub fn linear_velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Velocity contributed by rotation at a point `offset` from the center.
    pub fn angular_velocity_at(&self, offset: Vec3) -> Vec3 {
        match self.shape {
            BodyShape::RotatingBox { .. } => self.angular_velocity.cross(offset),
            BodyShape::Sphere { .. } | BodyShape::Box { .. } => Vec3::ZERO,
        }
    }

    /// Velocity of the body surface at a point `offset` from the center.
    pub fn surface_velocity(&self, offset: Vec3) -> Vec3 {
        self.linear_velocity() + self.angular_velocity_at(offset)
    }

    /// Maps a body-relative contact offset to a world position.
    pub fn contact_to_world(&self, offset: Vec3) -> Vec3 {
        self.center + offset
    }

    /// Movement of the center over the last integration.
    pub fn displacement(&self) -> Vec3 {
        self.center - self.previous_center
    }

    /// Swept test of a point moving from `position` by `displacement`.
    ///
    /// `epsilon` bounds the squared sweep length (sphere) or a displacement
    /// component (box) below which the motion counts as stationary.
    pub fn sweep(&self, position: Vec3, displacement: Vec3, epsilon: f32) -> Option<BodyContact> {
        match self.shape {
            BodyShape::Sphere { radius } => {
                sweep_sphere(position - self.center, displacement, radius, epsilon)
            }
            BodyShape::Box { size } | BodyShape::RotatingBox { size } => {
                let orientation = self.orientation();
                let inverse = orientation.inverse();
                let contact = sweep_box(
                    inverse * (position - self.center),
                    inverse * displacement,
                    size * 0.5,
                    epsilon,
                )?;
                Some(BodyContact {
                    offset: orientation * contact.offset,
                    normal: orientation * contact.normal,
                    ..contact
                })
            }
        }
    }
}

/// Solves `|start + t * d|² = radius²` for the smaller root in `[0, 1]`.
///
/// A sweep that starts and ends inside is projected radially onto the surface.
fn sweep_sphere(start: Vec3, d: Vec3, radius: f32, epsilon: f32) -> Option<BodyContact> {
    let c = start.length_squared() - radius * radius;
    if c < 0.0 {
        return push_out_of_sphere(start + d, radius);
    }

    let a = d.length_squared();
    if a <= epsilon {
        return None;
    }
    let b = 2.0 * start.dot(d);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant <= 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let near = (-b - root) / (2.0 * a);
    let far = (-b + root) / (2.0 * a);
    let in_range = |t: f32| (0.0..=1.0).contains(&t);
    let time = if in_range(near) {
        near
    } else if in_range(far) {
        far
    } else {
        return None;
    };

    let offset = start + d * time;
    Some(BodyContact {
        offset,
        normal: offset / radius,
        time,
        depth: d.length() * (1.0 - time),
    })
}

fn push_out_of_sphere(end: Vec3, radius: f32) -> Option<BodyContact> {
    let distance = end.length();
    if distance >= radius {
        return None;
    }
    // Dead center has no preferred direction.
    let normal = end.try_normalize().unwrap_or(Vec3::Y);
    Some(BodyContact {
        offset: normal * radius,
        normal,
        time: 1.0,
        depth: radius - distance,
    })
}

/// Slab test of a sweep against the box `±half` in its own frame.
///
/// An axis whose displacement component is below `epsilon` does not narrow
/// the interval; it only requires the start to lie within that slab.
fn sweep_box(start: Vec3, d: Vec3, half: Vec3, epsilon: f32) -> Option<BodyContact> {
    let mut enter = 0.0_f32;
    let mut exit = 1.0_f32;
    let mut entry_axis = None;

    for axis in 0..3 {
        if d[axis].abs() <= epsilon {
            if start[axis] < -half[axis] || start[axis] > half[axis] {
                return None;
            }
            continue;
        }

        let mut low = (-half[axis] - start[axis]) / d[axis];
        let mut high = (half[axis] - start[axis]) / d[axis];
        if low > high {
            std::mem::swap(&mut low, &mut high);
        }
        if low > enter {
            enter = low;
            entry_axis = Some(axis);
        }
        exit = exit.min(high);
        if enter >= exit {
            return None;
        }
    }

    let Some(axis) = entry_axis else {
        return push_out_of_box(start + d, half);
    };
    let mut normal = Vec3::ZERO;
    normal[axis] = if start[axis] > 0.0 { 1.0 } else { -1.0 };

    Some(BodyContact {
        offset: start + d * enter,
        normal,
        time: enter,
        depth: d.length() * (exit - enter),
    })
}

/// A sweep that started inside the box. If it also ends inside, the point is
/// moved to the face of least penetration.
fn push_out_of_box(end: Vec3, half: Vec3) -> Option<BodyContact> {
    let penetration = half - end.abs();
    if penetration.min_element() < 0.0 {
        return None;
    }

    let axis = (0..3)
        .min_by(|&a, &b| penetration[a].total_cmp(&penetration[b]))
        .unwrap_or(0);
    let side = if end[axis] >= 0.0 { 1.0 } else { -1.0 };
    let mut normal = Vec3::ZERO;
    normal[axis] = side;
    let mut offset = end;
    offset[axis] = side * half[axis];

    Some(BodyContact {
        offset,
        normal,
        time: 1.0,
        depth: penetration[axis],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1e-9;

    #[test]
    fn test_sphere_sweep_hits_front_face() {
        let sphere = RigidBody::sphere(Vec3::ZERO, 10.0, 1.0);
        let contact = sphere
            .sweep(Vec3::new(15.0, 0.0, 0.0), Vec3::new(-10.0, 0.0, 0.0), EPS)
            .unwrap();

        assert!((contact.time - 0.5).abs() < 1e-5);
        let point = sphere.contact_to_world(contact.offset);
        assert!((point - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
        assert!((contact.normal - Vec3::X).length() < 1e-5);
        assert!((contact.depth - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_sphere_sweep_misses() {
        let sphere = RigidBody::sphere(Vec3::ZERO, 10.0, 1.0);
        // Stops short of the surface.
        assert!(sphere
            .sweep(Vec3::new(15.0, 0.0, 0.0), Vec3::new(-4.0, 0.0, 0.0), EPS)
            .is_none());
        // Passes beside it.
        assert!(sphere
            .sweep(Vec3::new(15.0, 11.0, 0.0), Vec3::new(-30.0, 0.0, 0.0), EPS)
            .is_none());
        // Moving away.
        assert!(sphere
            .sweep(Vec3::new(15.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0), EPS)
            .is_none());
    }

    #[test]
    fn test_sphere_stationary_sweep_is_no_collision() {
        let sphere = RigidBody::sphere(Vec3::ZERO, 10.0, 1.0);
        assert!(sphere
            .sweep(Vec3::new(15.0, 0.0, 0.0), Vec3::ZERO, EPS)
            .is_none());
    }

    #[test]
    fn test_sphere_start_inside_pushes_to_surface() {
        let sphere = RigidBody::sphere(Vec3::ZERO, 5.0, 1.0);

        // Stationary relative to the body, as when the host moves it onto a particle.
        let contact = sphere
            .sweep(Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO, EPS)
            .unwrap();
        assert_eq!(contact.normal, Vec3::X);
        assert!((contact.offset - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-6);
        assert!((contact.depth - 4.5).abs() < 1e-6);

        // Moving deeper resolves at the end point.
        let contact = sphere
            .sweep(Vec3::new(0.0, -3.0, 0.0), Vec3::new(0.0, 1.0, 0.0), EPS)
            .unwrap();
        assert_eq!(contact.normal, Vec3::NEG_Y);
        assert!((contact.offset.y + 5.0).abs() < 1e-6);

        // Leaving the sphere is not a contact.
        assert!(sphere
            .sweep(Vec3::new(4.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), EPS)
            .is_none());
    }

    #[test]
    fn test_sphere_sweep_relative_to_center() {
        let sphere = RigidBody::sphere(Vec3::new(0.0, 50.0, 0.0), 2.0, 1.0);
        let contact = sphere
            .sweep(Vec3::new(0.0, 60.0, 0.0), Vec3::new(0.0, -10.0, 0.0), EPS)
            .unwrap();
        assert!((contact.offset - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-4);
        let point = sphere.contact_to_world(contact.offset);
        assert!((point.y - 52.0).abs() < 1e-4);
    }

    #[test]
    fn test_box_sweep_entry_axis_gives_normal() {
        let cuboid = RigidBody::cuboid(Vec3::ZERO, Vec3::splat(2.0), 1.0);
        let contact = cuboid
            .sweep(Vec3::new(0.2, 3.0, -0.1), Vec3::new(0.0, -4.0, 0.1), EPS)
            .unwrap();

        assert_eq!(contact.normal, Vec3::Y);
        assert!((contact.time - 0.5).abs() < 1e-6);
        assert!((contact.offset.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_box_zero_axis_outside_slab_misses() {
        let cuboid = RigidBody::cuboid(Vec3::ZERO, Vec3::splat(2.0), 1.0);
        // No motion along y and the start lies above the box.
        assert!(cuboid
            .sweep(Vec3::new(-3.0, 5.0, 0.0), Vec3::new(6.0, 0.0, 0.0), EPS)
            .is_none());
    }

    #[test]
    fn test_box_zero_axis_inside_slab_still_hits() {
        let cuboid = RigidBody::cuboid(Vec3::ZERO, Vec3::splat(2.0), 1.0);
        let contact = cuboid
            .sweep(Vec3::new(-3.0, 0.5, 0.5), Vec3::new(4.0, 0.0, 0.0), EPS)
            .unwrap();
        assert_eq!(contact.normal, Vec3::NEG_X);
        assert!((contact.offset.x + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_box_start_inside_pushes_to_nearest_face() {
        let cuboid = RigidBody::cuboid(Vec3::ZERO, Vec3::splat(2.0), 1.0);
        let contact = cuboid
            .sweep(Vec3::new(0.0, -0.5, 0.0), Vec3::new(0.0, -0.2, 0.1), EPS)
            .unwrap();
        assert_eq!(contact.normal, Vec3::NEG_Y);
        assert!((contact.offset - Vec3::new(0.0, -1.0, 0.1)).length() < 1e-6);
        assert!((contact.depth - 0.3).abs() < 1e-6);

        // Stationary inside also resolves.
        let contact = cuboid
            .sweep(Vec3::new(0.9, 0.0, 0.0), Vec3::ZERO, EPS)
            .unwrap();
        assert_eq!(contact.normal, Vec3::X);
    }

    #[test]
    fn test_box_sweep_leaving_the_box_is_no_collision() {
        let cuboid = RigidBody::cuboid(Vec3::ZERO, Vec3::splat(2.0), 1.0);
        assert!(cuboid
            .sweep(Vec3::new(0.5, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), EPS)
            .is_none());
    }

    #[test]
    fn test_box_sweep_too_short_misses() {
        let cuboid = RigidBody::cuboid(Vec3::ZERO, Vec3::splat(2.0), 1.0);
        assert!(cuboid
            .sweep(Vec3::new(5.0, 0.0, 0.0), Vec3::new(-2.0, 0.0, 0.0), EPS)
            .is_none());
    }

    #[test]
    fn test_rotating_box_sweeps_in_body_frame() {
        // Long thin box along x, rotated a quarter turn about z so it lies along y.
        let body = RigidBody::rotating_box(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0), 1.0)
            .with_rotation(Vec3::Z * FRAC_PI_2);

        // Coming down from above hits the top end of the rotated box.
        let contact = body
            .sweep(Vec3::new(0.0, 8.0, 0.0), Vec3::new(0.0, -6.0, 0.0), EPS)
            .unwrap();
        assert!((contact.offset.y - 5.0).abs() < 1e-4);
        assert!((contact.normal - Vec3::Y).length() < 1e-5);

        // The unrotated footprint at x = 4 is now empty space.
        assert!(body
            .sweep(Vec3::new(4.0, 3.0, 0.0), Vec3::new(0.0, -6.0, 0.0), EPS)
            .is_none());
    }

    #[test]
    fn test_angular_velocity_only_for_rotating_box() {
        let spin = Vec3::new(0.0, 0.0, 2.0);
        let offset = Vec3::new(1.0, 0.0, 0.0);

        let rotating = RigidBody::rotating_box(Vec3::ZERO, Vec3::ONE, 1.0)
            .with_angular_velocity(spin)
            .with_velocity(Vec3::X);
        assert_eq!(
            rotating.angular_velocity_at(offset),
            Vec3::new(0.0, 2.0, 0.0)
        );
        assert_eq!(rotating.surface_velocity(offset), Vec3::new(1.0, 2.0, 0.0));

        let sphere = RigidBody::sphere(Vec3::ZERO, 1.0, 1.0).with_angular_velocity(spin);
        assert_eq!(sphere.angular_velocity_at(offset), Vec3::ZERO);
    }

    #[test]
    fn test_body_validation() {
        assert!(RigidBody::sphere(Vec3::ZERO, 1.0, 1.0).validate().is_ok());
        assert_eq!(
            RigidBody::sphere(Vec3::ZERO, 1.0, 0.0).validate(),
            Err(FluidError::NonPositiveMass(0.0))
        );
        assert!(matches!(
            RigidBody::sphere(Vec3::ZERO, -1.0, 1.0).validate(),
            Err(FluidError::InvalidShape(_))
        ));
        assert!(matches!(
            RigidBody::cuboid(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0), 1.0).validate(),
            Err(FluidError::InvalidShape(_))
        ));
    }
}
