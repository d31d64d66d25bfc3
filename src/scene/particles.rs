use rand::Rng;

use crate::maths::{Color, Range, Vec3};

use super::object::{Object, ObjectId};
use super::primitives::particle;
use super::texture::TextureId;

pub type ParticleBehavior = Box<dyn FnMut(&mut Object, i32) + Send + Sync>;

/// Owns a fixed set of particle quads and drives their respawn and
/// per-frame behavior. The particles themselves live in the scene's
/// object list (in one contiguous run) once the system is added.
pub struct ParticleSystem {
    pub position: Vec3,
    particles: Vec<Object>,
    particle_ids: Vec<ObjectId>,
    behavior: Option<ParticleBehavior>,
    x_spawn_range: Range<f32>,
    y_spawn_range: Range<f32>,
    z_spawn_range: Range<f32>,
}

impl ParticleSystem {
    pub fn new(size: usize) -> Self {
        Self {
            position: Vec3::default(),
            particles: (0..size).map(|_| particle()).collect(),
            particle_ids: Vec::with_capacity(size),
            behavior: None,
            x_spawn_range: Range::default(),
            y_spawn_range: Range::default(),
            z_spawn_range: Range::default(),
        }
    }

    pub fn particle_ids(&self) -> &[ObjectId] {
        &self.particle_ids
    }

    pub fn set_particle_behavior(&mut self, handler: ParticleBehavior) {
        self.behavior = Some(handler);
    }

    pub fn set_particle_color(&mut self, color: Color) {
        for particle in &mut self.particles {
            particle.set_color(color);
        }
    }

    pub fn set_particle_size(&mut self, width: f32, height: f32) {
        for particle in &mut self.particles {
            particle.scale_axes(Vec3::new(width / 2.0, height / 2.0, 1.0));
        }
    }

    pub fn set_particle_texture(&mut self, texture: TextureId) {
        for particle in &mut self.particles {
            particle.set_texture(texture);
        }
    }

    pub fn set_spawn_location(&mut self, location: Vec3) {
        self.x_spawn_range = Range {
            start: location.x,
            end: location.x,
        };
        self.y_spawn_range = Range {
            start: location.y,
            end: location.y,
        };
        self.z_spawn_range = Range {
            start: location.z,
            end: location.z,
        };
    }

    pub fn set_spawn_range(
        &mut self,
        x_spawn_range: Range<f32>,
        y_spawn_range: Range<f32>,
        z_spawn_range: Range<f32>,
    ) {
        self.x_spawn_range = x_spawn_range;
        self.y_spawn_range = y_spawn_range;
        self.z_spawn_range = z_spawn_range;
    }

    /// Hands the owned particles over for insertion into a scene's
    /// object list, recording their ids for updates and removal.
    pub(crate) fn take_particles(&mut self) -> Vec<Object> {
        let particles = std::mem::take(&mut self.particles);

        self.particle_ids = particles.iter().map(|particle| particle.id()).collect();

        particles
    }

    fn random_in(range: Range<f32>) -> f32 {
        if range.start == range.end {
            return range.start;
        }

        rand::rng().random_range(range.start.min(range.end)..=range.start.max(range.end))
    }

    fn reset_particle(&self, particle: &mut Object) {
        particle.position = Vec3::new(
            self.position.x + Self::random_in(self.x_spawn_range),
            self.position.y + Self::random_in(self.y_spawn_range),
            self.position.z + Self::random_in(self.z_spawn_range),
        );

        particle.rotate_deg(Vec3::new(0.0, rand::rng().random_range(0.0..360.0), 0.0));
        particle.should_reset = false;
    }

    /// Steps one particle: respawn if flagged, then run the behavior.
    pub(crate) fn update_particle(&mut self, particle: &mut Object, dt: i32) {
        if particle.should_reset {
            self.reset_particle(particle);
        }

        if let Some(behavior) = &mut self.behavior {
            behavior(particle, dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_places_particle_inside_spawn_range() {
        let mut system = ParticleSystem::new(1);

        system.position = Vec3::new(100.0, 0.0, 0.0);
        system.set_spawn_range(
            Range {
                start: -10.0,
                end: 10.0,
            },
            Range {
                start: 5.0,
                end: 6.0,
            },
            Range {
                start: 0.0,
                end: 0.0,
            },
        );

        let mut particle = particle();

        particle.should_reset = true;
        system.update_particle(&mut particle, 16);

        assert!(!particle.should_reset);
        assert!(particle.position.x >= 90.0 && particle.position.x <= 110.0);
        assert!(particle.position.y >= 5.0 && particle.position.y <= 6.0);
        assert_eq!(particle.position.z, 0.0);
    }

    #[test]
    fn behavior_runs_each_update() {
        let mut system = ParticleSystem::new(1);

        system.set_particle_behavior(Box::new(|particle, dt| {
            particle.position.y += dt as f32;
        }));

        let mut particle = particle();

        particle.should_reset = false;
        system.update_particle(&mut particle, 16);
        system.update_particle(&mut particle, 16);

        assert_eq!(particle.position.y, 32.0);
    }
}
