//! Collision response against the bounding volume and rigid bodies.
//!
//! Runs after integration. Restitution only acts on approaching motion, so a
//! particle already moving back into free space is left alone.

use bevy::prelude::*;

use super::body::{BodyContact, RigidBody};
use super::boundary::{outside_box, BoundaryContact, BoundingVolume};
use super::params::FluidParams;
use super::particle::Particle;

/// Reflect `velocity` about `normal` if it moves along it, i.e. out through
/// the surface the normal belongs to.
fn reflect_outgoing(velocity: Vec3, normal: Vec3, restitution: f32) -> Vec3 {
    let along = velocity.dot(normal);
    if along > 0.0 {
        velocity - (1.0 + restitution) * along * normal
    } else {
        velocity
    }
}

pub struct CollisionResolver<'a> {
    params: &'a FluidParams,
    bounds: &'a BoundingVolume,
}

impl<'a> CollisionResolver<'a> {
    pub fn new(params: &'a FluidParams, bounds: &'a BoundingVolume) -> Self {
        Self { params, bounds }
    }

    /// Snap escaped particles back onto the volume surface. Returns the number
    /// of contacts.
    pub fn contain_particles(&self, particles: &mut [Particle]) -> usize {
        let restitution = self.params.restitution;
        let mut contacts = 0;
        for particle in particles {
            if let Some(BoundaryContact { point, normal, .. }) =
                self.bounds.outside(particle.position)
            {
                particle.position = point;
                particle.velocity = reflect_outgoing(particle.velocity, normal, restitution);
                contacts += 1;
            }
        }
        contacts
    }

    /// Keep each body's bounding box inside the volume.
    pub fn contain_bodies(&self, bodies: &mut [RigidBody]) -> usize {
        let restitution = self.params.restitution;
        let mut contacts = 0;
        for body in bodies {
            let (min, max) = self.bounds.shrunk(body.bounding_half_extents());
            let center = (min + max) * 0.5;
            if let Some(contact) = outside_box(center, (max - min) * 0.5, body.center) {
                body.center = contact.point;
                body.velocity = reflect_outgoing(body.velocity, contact.normal, restitution);
                contacts += 1;
            }
        }
        contacts
    }

    /// Swept particle-body collisions. Each particle responds to the earliest
    /// contact among all bodies. Returns the number of contacts.
    pub fn collide_bodies(&self, particles: &mut [Particle], bodies: &[RigidBody]) -> usize {
        if bodies.is_empty() {
            return 0;
        }
        let restitution = self.params.restitution;
        let skin = self.params.collision_skin;
        let epsilon = self.params.sweep_epsilon;
        let mut contacts = 0;

        for particle in particles {
            let earliest = bodies
                .iter()
                .filter_map(|body| {
                    // Sweep the relative motion, ending at the current positions.
                    let start = particle.previous_position + body.displacement();
                    body.sweep(start, particle.position - start, epsilon)
                        .map(|contact| (body, contact))
                })
                .min_by(|(_, a), (_, b)| a.time.total_cmp(&b.time));

            let Some((body, BodyContact { offset, normal, .. })) = earliest else {
                continue;
            };

            let relative = particle.velocity - body.surface_velocity(offset);
            let approach = relative.dot(normal);
            if approach < 0.0 {
                particle.velocity -= (1.0 + restitution) * approach * normal;
            }
            particle.position = body.contact_to_world(offset) + normal * skin;
            // A body against a wall can push the particle through it.
            if let Some(wall) = self.bounds.outside(particle.position) {
                particle.position = wall.point;
                particle.velocity = reflect_outgoing(particle.velocity, wall.normal, restitution);
            }
            contacts += 1;
        }
        contacts
    }
}
