//! Semi-implicit Euler integration.

use bevy::prelude::*;

use super::body::{BodyShape, RigidBody};
use super::particle::Particle;

/// Zero every force accumulator.
pub fn clear_forces(particles: &mut [Particle], bodies: &mut [RigidBody]) {
    for particle in particles {
        particle.force = Vec3::ZERO;
    }
    for body in bodies {
        body.force = Vec3::ZERO;
    }
}

/// `v += F/m * dt`, then `x += v * dt` with the updated velocity.
/// The pre-step position is kept for swept collision tests.
pub fn integrate_particles(particles: &mut [Particle], dt: f32) {
    for particle in particles {
        particle.previous_position = particle.position;
        particle.velocity += particle.force / particle.mass * dt;
        particle.position += particle.velocity * dt;
    }
}

/// Same update for bodies. Rotating boxes also advance their rotation.
pub fn integrate_bodies(bodies: &mut [RigidBody], dt: f32) {
    for body in bodies {
        body.previous_center = body.center;
        body.velocity += body.force / body.mass * dt;
        body.center += body.velocity * dt;
        if let BodyShape::RotatingBox { .. } = body.shape {
            body.rotation += body.angular_velocity * dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semi_implicit_euler_uses_updated_velocity() {
        let mut particles = vec![Particle::new(Vec3::ZERO, 2.0, 1.0).with_velocity(Vec3::X)];
        particles[0].force = Vec3::new(0.0, 4.0, 0.0);

        integrate_particles(&mut particles, 0.5);

        // v = (1, 0, 0) + (0, 2, 0) * 0.5
        assert_eq!(particles[0].velocity, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(particles[0].position, Vec3::new(0.5, 0.5, 0.0));
        assert_eq!(particles[0].displacement(), Vec3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn test_clear_forces() {
        let mut particles = vec![Particle::new(Vec3::ZERO, 1.0, 1.0)];
        let mut bodies = vec![RigidBody::sphere(Vec3::ZERO, 1.0, 1.0)];
        particles[0].force = Vec3::ONE;
        bodies[0].force = Vec3::ONE;

        clear_forces(&mut particles, &mut bodies);

        assert_eq!(particles[0].force, Vec3::ZERO);
        assert_eq!(bodies[0].force, Vec3::ZERO);
    }

    #[test]
    fn test_only_rotating_boxes_turn() {
        let spin = Vec3::new(0.0, 1.0, 0.0);
        let mut bodies = vec![
            RigidBody::rotating_box(Vec3::ZERO, Vec3::ONE, 1.0).with_angular_velocity(spin),
            RigidBody::cuboid(Vec3::ZERO, Vec3::ONE, 1.0).with_angular_velocity(spin),
        ];
        bodies[1].force = Vec3::new(0.0, -10.0, 0.0);

        integrate_bodies(&mut bodies, 0.1);

        let turned = bodies[0].rotation - Vec3::new(0.0, 0.1, 0.0);
        assert!(turned.length() < 1e-7);
        assert_eq!(bodies[1].rotation, Vec3::ZERO);
        assert!((bodies[1].velocity.y + 1.0).abs() < 1e-6);
        assert!((bodies[1].center.y + 0.1).abs() < 1e-6);
        assert!((bodies[1].displacement().y + 0.1).abs() < 1e-6);
    }
}
