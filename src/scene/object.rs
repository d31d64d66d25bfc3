use std::sync::atomic::{AtomicU32, Ordering};

use crate::maths::{Color, DEG_TO_RAD, Quaternion, Rotation, Vec2, Vec3};

use super::TextureId;

pub const NEAR_PLANE_DISTANCE: f32 = 30.0;
pub const LOD_DISTANCE_THRESHOLD: f32 = 2500.0;
pub const GLOBAL_SECTOR_ID: i32 = -1;

static NEXT_OBJECT_ID: AtomicU32 = AtomicU32::new(1);

/// Stable handle for an object added to a scene. Frame-scope triangles
/// reference their source geometry through these rather than borrows,
/// so pool slots can be recycled freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u32);

pub type UpdateHandler = Box<dyn FnMut(&mut Object, i32) + Send + Sync>;
pub type FollowHandler = Box<dyn FnMut(Vec3, &mut Vec3) + Send + Sync>;

/// A point in an object's mesh. Morph target positions are alternate
/// vectors for the same vertex, blended over time while a morph plays.
#[derive(Debug, Clone, Default)]
pub struct Vertex3d {
    pub vector: Vec3,
    pub uv: Vec2,
    pub color: Color,
    pub normal: Vec3,
    pub morph_targets: Vec<Vec3>,
    /// Indices of polygons sharing this vertex, for normal averaging.
    pub connected_polygons: Vec<u32>,
}

impl Vertex3d {
    /// Interpolates the renderable attributes; morph and connectivity
    /// data stay empty since interpolated vertices are frame-scoped.
    pub fn lerp(v1: &Vertex3d, v2: &Vertex3d, r: f32) -> Vertex3d {
        Vertex3d {
            vector: Vec3::lerp(v1.vector, v2.vector, r),
            uv: Vec2::lerp(v1.uv, v2.uv, r),
            color: Color::lerp(v1.color, v2.color, r),
            normal: Vec3::lerp(v1.normal, v2.normal, r),
            morph_targets: Vec::new(),
            connected_polygons: Vec::new(),
        }
    }

    fn morph(&mut self, start: usize, end: usize, progress: f32) {
        self.vector = Vec3::lerp(self.morph_targets[start], self.morph_targets[end], progress);
    }
}

/// Three ordered vertex indices into the owning object's vertex buffer,
/// wound counter-clockwise in world space.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub vertices: [u32; 3],
    pub normal: Vec3,
    /// Color intensities computed once for static objects under static
    /// lighting; valid only while the owning object stays static.
    pub cached_vertex_intensities: [Vec3; 3],
}

#[derive(Debug, Clone)]
pub struct Light {
    color: Color,
    cached_color_ratios: Vec3,
    pub power: f32,
    pub range: f32,
    pub is_disabled: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            color: Color::default(),
            cached_color_ratios: Vec3::new(1.0, 1.0, 1.0),
            power: 1.0,
            range: 500.0,
            is_disabled: false,
        }
    }
}

impl Light {
    pub fn color(&self) -> Color {
        self.color
    }

    /// Every vertex of every triangle within range reads the ratios, so
    /// they are cached on write rather than derived per sample.
    pub fn color_ratios(&self) -> Vec3 {
        self.cached_color_ratios
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.cached_color_ratios = color.ratios();
    }
}

#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub light: Light,
    direction: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            light: Light::default(),
            direction: Vec3::new(0.0, -1.0, 0.0),
        }
    }
}

impl DirectionalLight {
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.unit();
    }
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Mesh { rows: usize, columns: usize },
    Model,
    Cube,
    Particle,
    Skybox,
    Light(Light),
    DirectionalLight(DirectionalLight),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    #[default]
    Linear,
    QuadOut,
}

#[derive(Debug, Clone, Default)]
struct Tween {
    start: Vec3,
    end: Vec3,
    time: i32,
    duration: i32,
    ease: Ease,
    is_active: bool,
}

impl Tween {
    fn alpha(&self) -> f32 {
        let t = (self.time as f32 / self.duration as f32).clamp(0.0, 1.0);

        match self.ease {
            Ease::Linear => t,
            Ease::QuadOut => t * (2.0 - t),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Morph {
    time: i32,
    duration: i32,
    should_loop: bool,
    is_active: bool,
    is_reversed: bool,
}

/// A positionable mesh in the scene. Objects exclusively own their
/// vertices, polygons, LOD variants and morph targets.
pub struct Object {
    pub kind: ObjectKind,
    pub position: Vec3,
    pub transform_origin: Vec3,
    pub is_static: bool,
    pub is_flat_shaded: bool,
    pub has_lighting: bool,
    pub can_occlude_surfaces: bool,
    pub fresnel_factor: f32,
    pub texture: Option<TextureId>,
    pub sector_id: i32,
    /// Per-object override of the near plane, remedying depth-range
    /// problems across the span of extremely large triangles.
    pub near_clipping_distance: f32,
    /// Remaining lifetime in milliseconds; expired objects are swept by
    /// the scene. `None` lives forever.
    pub lifetime: Option<i32>,
    /// Particles flag themselves for respawn through this.
    pub should_reset: bool,
    pub on_update: Option<UpdateHandler>,
    pub(crate) follow_target: Option<ObjectId>,
    pub(crate) follow_handler: Option<FollowHandler>,
    id: ObjectId,
    vertices: Vec<Vertex3d>,
    polygons: Vec<Polygon>,
    lods: Vec<Object>,
    total_morph_targets: usize,
    morph: Morph,
    tween: Tween,
}

impl Object {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            position: Vec3::default(),
            transform_origin: Vec3::default(),
            is_static: false,
            is_flat_shaded: false,
            has_lighting: true,
            can_occlude_surfaces: true,
            fresnel_factor: 0.0,
            texture: None,
            sector_id: GLOBAL_SECTOR_ID,
            near_clipping_distance: NEAR_PLANE_DISTANCE,
            lifetime: None,
            should_reset: false,
            on_update: None,
            follow_target: None,
            follow_handler: None,
            id: ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)),
            vertices: Vec::new(),
            polygons: Vec::new(),
            lods: Vec::new(),
            total_morph_targets: 0,
            morph: Morph::default(),
            tween: Tween::default(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn light(&self) -> Option<&Light> {
        match &self.kind {
            ObjectKind::Light(light) => Some(light),
            ObjectKind::DirectionalLight(directional) => Some(&directional.light),
            _ => None,
        }
    }

    pub fn light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            ObjectKind::Light(light) => Some(light),
            ObjectKind::DirectionalLight(directional) => Some(&mut directional.light),
            _ => None,
        }
    }

    pub fn is_light(&self) -> bool {
        self.light().is_some()
    }

    pub fn vertices(&self) -> &[Vertex3d] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn polygons_mut(&mut self) -> &mut [Polygon] {
        &mut self.polygons
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn lods(&self) -> &[Object] {
        &self.lods
    }

    pub fn lods_mut(&mut self) -> &mut [Object] {
        &mut self.lods
    }

    pub fn has_lods(&self) -> bool {
        !self.lods.is_empty()
    }

    pub fn add_lod(&mut self, lod: Object) {
        self.lods.push(lod);
    }

    /// Picks the LOD band for a camera distance: -1 is the main mesh,
    /// otherwise an index into the LOD list.
    pub fn lod_index_for_distance(&self, distance: f32) -> i8 {
        if self.lods.is_empty() {
            return -1;
        }

        let distance_ratio = distance / LOD_DISTANCE_THRESHOLD;

        if distance_ratio < 1.0 {
            return -1;
        }

        (distance_ratio as usize - 1).min(self.lods.len() - 1) as i8
    }

    pub fn lod_variant(&self, index: i8) -> &Object {
        if index < 0 { self } else { &self.lods[index as usize] }
    }

    pub fn lod_variant_mut(&mut self, index: i8) -> &mut Object {
        if index < 0 {
            self
        } else {
            &mut self.lods[index as usize]
        }
    }

    pub fn add_vertex(&mut self, vector: Vec3) {
        self.vertices.push(Vertex3d {
            vector,
            ..Vertex3d::default()
        });
    }

    pub fn add_vertex_color(&mut self, vector: Vec3, color: Color) {
        self.vertices.push(Vertex3d {
            vector,
            color,
            ..Vertex3d::default()
        });
    }

    pub fn add_vertex_uv(&mut self, vector: Vec3, uv: Vec2) {
        self.vertices.push(Vertex3d {
            vector,
            uv,
            ..Vertex3d::default()
        });
    }

    pub fn add_polygon(&mut self, v1: u32, v2: u32, v3: u32) {
        let vertices = [v1, v2, v3];
        let polygon_index = self.polygons.len() as u32;

        for index in vertices {
            self.vertices[index as usize]
                .connected_polygons
                .push(polygon_index);
        }

        self.polygons.push(Polygon {
            vertices,
            normal: self.compute_polygon_normal(vertices),
            cached_vertex_intensities: [Vec3::default(); 3],
        });
    }

    fn compute_polygon_normal(&self, vertices: [u32; 3]) -> Vec3 {
        let v0 = self.vertices[vertices[0] as usize].vector;
        let v1 = self.vertices[vertices[1] as usize].vector;
        let v2 = self.vertices[vertices[2] as usize].vector;

        Vec3::cross(v1 - v0, v2 - v0).unit()
    }

    pub fn recompute_surface_normals(&mut self) {
        for i in 0..self.polygons.len() {
            self.polygons[i].normal = self.compute_polygon_normal(self.polygons[i].vertices);
        }

        for i in 0..self.vertices.len() {
            let mut average = Vec3::default();

            for &polygon_index in &self.vertices[i].connected_polygons {
                average += self.polygons[polygon_index as usize].normal;
            }

            self.vertices[i].normal = average.unit();
        }

        for lod in &mut self.lods {
            lod.recompute_surface_normals();
        }
    }

    /// Rotations apply around `transform_origin` and are mirrored into
    /// every morph target so playing morphs stay aligned.
    pub fn apply_rotation_matrix(&mut self, matrix: &Rotation) {
        let origin = self.transform_origin;

        for vertex in &mut self.vertices {
            vertex.vector += origin;
            vertex.vector.rotate(matrix);
            vertex.vector -= origin;

            for morph_target in &mut vertex.morph_targets {
                *morph_target += origin;
                morph_target.rotate(matrix);
                *morph_target -= origin;
            }
        }

        self.recompute_surface_normals();

        for lod in &mut self.lods {
            lod.apply_rotation_matrix(matrix);
        }
    }

    pub fn rotate(&mut self, rotation: Vec3) {
        self.apply_rotation_matrix(&Rotation::from_euler(rotation));
    }

    pub fn rotate_deg(&mut self, rotation: Vec3) {
        self.rotate(rotation * DEG_TO_RAD);
    }

    pub fn rotate_on_axis(&mut self, angle_deg: f32, axis: Vec3) {
        let axis = axis.unit();
        let matrix = Quaternion::from_axis_angle(angle_deg * DEG_TO_RAD, axis.x, axis.y, axis.z)
            .to_rotation_matrix();

        self.apply_rotation_matrix(&matrix);
    }

    pub fn scale(&mut self, scalar: f32) {
        self.scale_axes(Vec3::new(scalar, scalar, scalar));
    }

    pub fn scale_axes(&mut self, factors: Vec3) {
        for vertex in &mut self.vertices {
            vertex.vector.x *= factors.x;
            vertex.vector.y *= factors.y;
            vertex.vector.z *= factors.z;

            for morph_target in &mut vertex.morph_targets {
                morph_target.x *= factors.x;
                morph_target.y *= factors.y;
                morph_target.z *= factors.z;
            }
        }

        for lod in &mut self.lods {
            lod.scale_axes(factors);
        }
    }

    pub fn set_color(&mut self, color: Color) {
        for vertex in &mut self.vertices {
            vertex.color = color;
        }

        for lod in &mut self.lods {
            lod.set_color(color);
        }
    }

    pub fn set_texture(&mut self, texture: TextureId) {
        self.texture = Some(texture);
        self.set_color(Color::BLACK);

        for lod in &mut self.lods {
            lod.set_texture(texture);
        }
    }

    /// Copies a morph target's vertex positions from another object with
    /// identical topology; only its vertex vectors are retained.
    pub fn add_morph_target(&mut self, morph_target: Object) {
        self.total_morph_targets += 1;

        for (vertex, target_vertex) in self.vertices.iter_mut().zip(morph_target.vertices.iter()) {
            vertex.morph_targets.push(target_vertex.vector);
        }
    }

    pub fn total_morph_targets(&self) -> usize {
        self.total_morph_targets
    }

    pub fn set_morph_target(&mut self, target_index: usize) {
        if target_index >= self.total_morph_targets {
            return;
        }

        for vertex in &mut self.vertices {
            vertex.vector = vertex.morph_targets[target_index];
        }

        self.recompute_surface_normals();
    }

    pub fn start_morph(&mut self, duration: i32, should_loop: bool) {
        if self.total_morph_targets == 0 {
            return;
        }

        self.morph.time = 0;
        self.morph.duration = duration;
        self.morph.should_loop = should_loop;
        self.morph.is_reversed = false;
        self.morph.is_active = true;
    }

    pub fn stop_morph(&mut self) {
        self.morph.is_active = false;
    }

    pub fn is_morphing(&self) -> bool {
        self.morph.is_active
    }

    fn update_morph(&mut self, dt: i32) {
        let total = self.total_morph_targets;
        let morph_progress = self.morph.time as f32 / self.morph.duration as f32;
        let frame_progress =
            (morph_progress * (total as f32 - 1.0)).clamp(0.0, total as f32 - 1.0);
        let start_frame = frame_progress as usize;
        let end_frame = (start_frame + 1).min(total - 1);
        let progress = frame_progress - start_frame as f32;

        for vertex in &mut self.vertices {
            vertex.morph(start_frame, end_frame, progress);
        }

        self.morph.time += if self.morph.is_reversed { -dt } else { dt };

        let is_morph_complete = if self.morph.is_reversed {
            self.morph.time <= 0
        } else {
            self.morph.time >= self.morph.duration
        };

        if is_morph_complete {
            if self.morph.should_loop {
                self.morph.time = if self.morph.is_reversed {
                    0
                } else {
                    self.morph.duration - dt
                };
                self.morph.is_reversed = !self.morph.is_reversed;
            } else {
                self.set_morph_target(0);

                self.morph.time = 0;
                self.morph.is_active = false;
            }
        }

        self.recompute_surface_normals();
    }

    /// Spreads a repeating texture across a grid mesh, one full UV tile
    /// per `row_interval` x `column_interval` cells. No-op on other kinds.
    pub fn set_texture_interval(&mut self, row_interval: usize, column_interval: usize) {
        let ObjectKind::Mesh { rows, columns } = &self.kind else {
            return;
        };
        let (rows, columns) = (*rows, *columns);

        let vertices_per_row = columns + 1;
        let vertices_per_column = rows + 1;

        for i in 0..vertices_per_column {
            let v = i as f32 / column_interval as f32;

            for j in 0..vertices_per_row {
                let u = j as f32 / row_interval as f32;

                self.vertices[i * vertices_per_row + j].uv = Vec2::new(u, v);
            }
        }
    }

    /// Runs an offset handler over every grid vertex, then refreshes the
    /// surface normals. No-op on non-mesh kinds.
    pub fn set_vertex_offsets(&mut self, mut offset_handler: impl FnMut(usize, usize, &mut Vec3)) {
        let ObjectKind::Mesh { rows, columns } = &self.kind else {
            return;
        };
        let (rows, columns) = (*rows, *columns);

        let vertices_per_row = columns + 1;
        let vertices_per_column = rows + 1;

        for i in 0..vertices_per_column {
            for j in 0..vertices_per_row {
                offset_handler(i, j, &mut self.vertices[i * vertices_per_row + j].vector);
            }
        }

        self.recompute_surface_normals();
    }

    /// Assigns the same UV rectangle to all six cube faces. No-op on
    /// non-cube kinds.
    pub fn set_face_uv_coordinates(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        if !matches!(self.kind, ObjectKind::Cube) {
            return;
        }

        for face in 0..6 {
            let offset = face * 4;

            self.vertices[offset + 2].uv = Vec2::new(x1, y1);
            self.vertices[offset + 3].uv = Vec2::new(x2, y1);
            self.vertices[offset].uv = Vec2::new(x1, y2);
            self.vertices[offset + 1].uv = Vec2::new(x2, y2);
        }
    }

    pub fn tween_to(&mut self, target: Vec3, duration: i32, ease: Ease) {
        self.tween = Tween {
            start: self.position,
            end: target,
            time: 0,
            duration,
            ease,
            is_active: true,
        };
    }

    pub fn follow(&mut self, target: ObjectId, handler: FollowHandler) {
        self.follow_target = Some(target);
        self.follow_handler = Some(handler);
    }

    fn update_position(&mut self, dt: i32) {
        if self.tween.is_active {
            self.tween.time += dt;

            let alpha = self.tween.alpha();

            if alpha == 1.0 {
                self.tween.is_active = false;
            }

            self.position = Vec3::lerp(self.tween.start, self.tween.end, alpha);
        }
    }

    pub fn update(&mut self, dt: i32) {
        self.update_position(dt);

        if self.morph.is_active {
            self.update_morph(dt);
        }

        if self.on_update.is_some() {
            let mut handler = self.on_update.take().unwrap();

            handler(self, dt);

            if self.on_update.is_none() {
                self.on_update = Some(handler);
            }
        }

        if let Some(lifetime) = self.lifetime {
            self.lifetime = Some((lifetime - dt).max(0));
        }

        for lod in &mut self.lods {
            lod.update(dt);
        }
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime == Some(0)
    }

    /// LODs mirror the characteristics of their parent, emphasizing
    /// those modified without accessors. Synced on scene add and prior
    /// to screen projection each frame.
    pub fn sync_lods(&mut self) {
        let position = self.position;
        let is_static = self.is_static;
        let is_flat_shaded = self.is_flat_shaded;
        let has_lighting = self.has_lighting;
        let can_occlude_surfaces = self.can_occlude_surfaces;
        let fresnel_factor = self.fresnel_factor;
        let sector_id = self.sector_id;
        let transform_origin = self.transform_origin;
        let near_clipping_distance = self.near_clipping_distance;

        for lod in &mut self.lods {
            lod.position = position;
            lod.is_static = is_static;
            lod.is_flat_shaded = is_flat_shaded;
            lod.has_lighting = has_lighting;
            lod.can_occlude_surfaces = can_occlude_surfaces;
            lod.fresnel_factor = fresnel_factor;
            lod.sector_id = sector_id;
            lod.transform_origin = transform_origin;
            lod.near_clipping_distance = near_clipping_distance;
        }
    }
}
