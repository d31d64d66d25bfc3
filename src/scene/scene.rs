use std::collections::HashMap;

use crate::maths::Vec3;

use super::camera::{Camera, MAX_CAMERA_PITCH};
use super::obj_file::ModelData;
use super::object::{Object, ObjectId};
use super::particles::ParticleSystem;
use super::texture::{Texture, TextureId};
use super::{ControlMode, GLOBAL_SECTOR_ID, Input, Keys, Sector, Settings};

/// Nominal units per 16 ms tick while a movement key is held.
pub const MOVEMENT_SPEED: f32 = 5.0;

/// The world the renderer draws: an ordered object list with keyed
/// lookup, lights, sectors, textures and particle systems. The scene is
/// passive with respect to the renderer; game logic mutates it between
/// frames only.
#[derive(Default)]
pub struct Scene {
    pub settings: Settings,
    pub camera: Camera,
    objects: Vec<Object>,
    slots: HashMap<ObjectId, usize>,
    lights: Vec<ObjectId>,
    sectors: Vec<Sector>,
    object_keys: HashMap<String, ObjectId>,
    textures: Vec<Option<Texture>>,
    texture_keys: HashMap<String, TextureId>,
    model_data: HashMap<String, ModelData>,
    particle_systems: HashMap<String, ParticleSystem>,
    current_occupied_sectors: Vec<i32>,
    running_time: i32,
    is_paused: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut object: Object) -> ObjectId {
        object.sync_lods();
        object.recompute_surface_normals();

        let id = object.id();

        if object.is_light() {
            self.lights.push(id);
        }

        self.slots.insert(id, self.objects.len());
        self.objects.push(object);

        id
    }

    pub fn add_keyed(&mut self, key: &str, object: Object) -> ObjectId {
        let id = self.add(object);

        self.object_keys.insert(key.to_string(), id);

        id
    }

    pub fn add_sector(&mut self, sector: Sector) {
        self.sectors.push(sector);
    }

    pub fn add_texture(&mut self, key: &str, texture: Texture) -> TextureId {
        let id = TextureId(self.textures.len() as u32);

        self.textures.push(Some(texture));
        self.texture_keys.insert(key.to_string(), id);

        id
    }

    /// Inserts a particle system's objects as one contiguous run of the
    /// object list, then tracks the system under its key.
    pub fn add_particle_system(&mut self, key: &str, mut system: ParticleSystem) {
        for particle in system.take_particles() {
            self.add(particle);
        }

        self.particle_systems.insert(key.to_string(), system);
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [Object] {
        &mut self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.slots.get(&id).map(|&slot| &self.objects[slot])
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        match self.slots.get(&id) {
            Some(&slot) => Some(&mut self.objects[slot]),
            None => None,
        }
    }

    pub fn get_object(&self, key: &str) -> Option<&Object> {
        self.object(*self.object_keys.get(key)?)
    }

    pub fn get_object_mut(&mut self, key: &str) -> Option<&mut Object> {
        let id = *self.object_keys.get(key)?;

        self.object_mut(id)
    }

    pub fn lights(&self) -> &[ObjectId] {
        &self.lights
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0 as usize)?.as_ref()
    }

    pub fn get_texture(&self, key: &str) -> Option<TextureId> {
        self.texture_keys.get(key).copied()
    }

    pub fn get_particle_system(&mut self, key: &str) -> Option<&mut ParticleSystem> {
        self.particle_systems.get_mut(key)
    }

    /// Keeps decoded model geometry around so several objects (or LOD
    /// variants) can be built from one parse.
    pub fn add_model_data(&mut self, key: &str, data: ModelData) {
        self.model_data.insert(key.to_string(), data);
    }

    pub fn get_model_data(&self, key: &str) -> Option<&ModelData> {
        self.model_data.get(key)
    }

    /// Loads any textures that have not been decoded yet; runs between
    /// frames so the render stages see immutable texture data.
    pub fn confirm_textures(&mut self) {
        for texture in self.textures.iter_mut().flatten() {
            texture.confirm();
        }
    }

    /// Removes whatever the key refers to: an object (and its light
    /// entry), a particle system (with its contiguous particle run), or
    /// a texture. A missing key is a silent no-op.
    pub fn remove(&mut self, key: &str) {
        if let Some(id) = self.object_keys.remove(key) {
            self.remove_object_by_id(id);
        }

        if let Some(system) = self.particle_systems.remove(key) {
            for &id in system.particle_ids() {
                self.remove_object_by_id(id);
            }
        }

        if let Some(id) = self.texture_keys.remove(key) {
            self.textures[id.0 as usize] = None;
        }

        self.model_data.remove(key);
    }

    fn remove_object_by_id(&mut self, id: ObjectId) {
        self.lights.retain(|&light_id| light_id != id);

        if let Some(slot) = self.slots.remove(&id) {
            self.objects.remove(slot);
            self.rebuild_slots();
        }
    }

    fn rebuild_slots(&mut self) {
        self.slots = self
            .objects
            .iter()
            .enumerate()
            .map(|(slot, object)| (object.id(), slot))
            .collect();
    }

    pub fn is_in_current_occupied_sector(&self, sector_id: i32) -> bool {
        sector_id == GLOBAL_SECTOR_ID || self.current_occupied_sectors.contains(&sector_id)
    }

    fn update_current_occupied_sectors(&mut self) {
        self.current_occupied_sectors.clear();

        for sector in &self.sectors {
            if sector.bounds.has_point_inside(self.camera.position) {
                self.current_occupied_sectors.push(sector.id);
            }
        }
    }

    fn handle_control(&mut self, dt: i32, input: &Input) {
        if self.settings.control_mode.contains(ControlMode::MOUSE) {
            let delta_factor = 1.0 / 500.0;

            self.camera.yaw += -input.mouse_dx * delta_factor;
            self.camera.pitch = (self.camera.pitch + -input.mouse_dy * delta_factor)
                .clamp(-MAX_CAMERA_PITCH, MAX_CAMERA_PITCH);
        }

        if self.settings.control_mode.contains(ControlMode::WASD) {
            self.handle_wasd_control(dt, input);
        }
    }

    fn handle_wasd_control(&mut self, dt: i32, input: &Input) {
        let mut velocity = Vec3::default();

        if input.keys.contains(Keys::W) {
            velocity.z = 1.0;
        } else if input.keys.contains(Keys::S) {
            velocity.z = -1.0;
        }

        if input.keys.contains(Keys::A) {
            velocity.x = -1.0;
        } else if input.keys.contains(Keys::D) {
            velocity.x = 1.0;
        }

        velocity = velocity.unit();
        velocity *= MOVEMENT_SPEED * (dt as f32 / 16.0);

        if input.keys.contains(Keys::SHIFT) {
            velocity *= 4.0;
        }

        let sy = self.camera.yaw.sin();
        let cy = self.camera.yaw.cos();

        self.camera.position.x += cy * velocity.x + sy * -velocity.z;
        self.camera.position.z += cy * velocity.z + sy * velocity.x;
    }

    pub fn update(&mut self, dt: i32, input: &Input) {
        if self.is_paused {
            return;
        }

        self.running_time += dt;

        self.run_follow_handlers();

        for object in &mut self.objects {
            object.update(dt);
        }

        self.sweep_expired_objects();
        self.update_particle_systems(dt);
        self.update_current_occupied_sectors();
        self.handle_control(dt, input);

        for object in &mut self.objects {
            object.sync_lods();
        }
    }

    fn run_follow_handlers(&mut self) {
        let follow_updates: Vec<(usize, Vec3)> = self
            .objects
            .iter()
            .enumerate()
            .filter_map(|(index, object)| {
                let target = object.follow_target?;
                let &slot = self.slots.get(&target)?;

                Some((index, self.objects[slot].position))
            })
            .collect();

        for (index, target_position) in follow_updates {
            let mut handler = self.objects[index].follow_handler.take();

            if let Some(handler) = &mut handler {
                handler(target_position, &mut self.objects[index].position);
            }

            if self.objects[index].follow_handler.is_none() {
                self.objects[index].follow_handler = handler;
            }
        }
    }

    fn sweep_expired_objects(&mut self) {
        let expired: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|object| object.is_expired())
            .map(|object| object.id())
            .collect();

        for id in expired {
            self.object_keys.retain(|_, &mut keyed_id| keyed_id != id);
            self.remove_object_by_id(id);
        }
    }

    fn update_particle_systems(&mut self, dt: i32) {
        let Self {
            objects,
            slots,
            particle_systems,
            ..
        } = self;

        for system in particle_systems.values_mut() {
            for index in 0..system.particle_ids().len() {
                let id = system.particle_ids()[index];

                if let Some(&slot) = slots.get(&id) {
                    system.update_particle(&mut objects[slot], dt);
                }
            }
        }
    }

    pub fn running_time(&self) -> i32 {
        self.running_time
    }

    pub fn toggle_pause(&mut self) {
        self.is_paused = !self.is_paused;
    }

    pub fn suspend(&mut self) {
        self.is_paused = true;
    }

    pub fn resume(&mut self) {
        self.is_paused = false;
    }
}
