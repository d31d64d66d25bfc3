use crate::maths::{PI, Vec3};
use crate::scene::{ObjectKind, Scene, Settings};

use super::triangle_buffer::Triangle;

const PI_HALF: f32 = PI / 2.0;

/// Everything a light contributes to shading, captured once per frame
/// so the parallel illumination stage reads plain data instead of
/// chasing scene references.
#[derive(Debug, Clone, Copy)]
struct LightSnapshot {
    position: Vec3,
    color_ratios: Vec3,
    power: f32,
    range: f32,
    is_disabled: bool,
    is_static: bool,
    direction: Option<Vec3>,
}

/// Computes per-vertex color intensity from ambient, point and
/// directional light, honoring the static-intensity cache on polygons
/// of static objects.
#[derive(Default)]
pub struct Illuminator {
    lights: Vec<LightSnapshot>,
    settings: Settings,
}

impl Illuminator {
    pub fn new() -> Self {
        Self {
            lights: Vec::new(),
            settings: Settings::default(),
        }
    }

    /// Snapshots the scene's lights and settings; must run before any
    /// illumination calls of the frame, while the scene is stable.
    pub fn begin_frame(&mut self, scene: &Scene) {
        self.settings = scene.settings.clone();
        self.lights.clear();

        for &light_id in scene.lights() {
            let Some(object) = scene.object(light_id) else {
                continue;
            };
            let Some(light) = object.light() else {
                continue;
            };

            let direction = match &object.kind {
                ObjectKind::DirectionalLight(directional) => Some(directional.direction()),
                _ => None,
            };

            self.lights.push(LightSnapshot {
                position: object.position,
                color_ratios: light.color_ratios(),
                power: light.power,
                range: light.range,
                is_disabled: light.is_disabled,
                is_static: object.is_static,
                direction,
            });
        }
    }

    fn incidence(dot: f32) -> f32 {
        ((1.0 + dot) * PI_HALF).cos()
    }

    fn compute_ambient_light_intensity(
        settings: &Settings,
        normal: Vec3,
        fresnel_factor: f32,
        color_intensity: &mut Vec3,
    ) {
        if settings.ambient_light_factor <= 0.0 {
            return;
        }

        let dot = Vec3::dot(normal, settings.ambient_light_vector.unit());

        if dot < 0.0 {
            let incidence = Self::incidence(dot);
            let intensity = incidence * settings.ambient_light_factor * (1.0 + fresnel_factor);
            let color_ratios = settings.ambient_light_color.ratios();

            color_intensity.x *= 1.0 + (intensity * color_ratios.x) / settings.brightness;
            color_intensity.y *= 1.0 + (intensity * color_ratios.y) / settings.brightness;
            color_intensity.z *= 1.0 + (intensity * color_ratios.z) / settings.brightness;
        }
    }

    fn compute_light_intensity(
        settings: &Settings,
        light: &LightSnapshot,
        vertex_position: Vec3,
        normal: Vec3,
        fresnel_factor: f32,
        color_intensity: &mut Vec3,
    ) {
        if light.is_disabled
            || light.power == 0.0
            || (light.position.x - vertex_position.x).abs() > light.range
            || (light.position.y - vertex_position.y).abs() > light.range
            || (light.position.z - vertex_position.z).abs() > light.range
        {
            // Intensity is unaffected by lights that are disabled, at
            // zero power, or beyond axial range.
            return;
        }

        let mut light_source_vector = vertex_position - light.position;
        let light_distance = light_source_vector.magnitude();

        if light_distance > light.range {
            return;
        }

        light_source_vector /= light_distance;

        let normal_dot = Vec3::dot(normal, light_source_vector);

        if normal_dot >= 0.0 {
            // Vertex faces away from the light
            return;
        }

        // Directional lights compare their direction against the
        // light-to-vertex vector, flipped so it points back toward the
        // light for a sign convention consistent with the normal check.
        let directional_dot = match light.direction {
            Some(direction) => Vec3::dot(direction, -light_source_vector),
            None => 0.0,
        };

        if light.direction.is_some() && directional_dot >= 0.0 {
            // Vertex lies behind the light's direction vector
            return;
        }

        let incidence = Self::incidence(normal_dot)
            * match light.direction {
                Some(_) => directional_dot.powi(4),
                None => 1.0,
            };
        let illuminance = (1.0 - light_distance / light.range).powi(2);
        let intensity = light.power * incidence * illuminance * (1.0 + fresnel_factor);

        color_intensity.x *= 1.0 + (intensity * light.color_ratios.x) / settings.brightness;
        color_intensity.y *= 1.0 + (intensity * light.color_ratios.y) / settings.brightness;
        color_intensity.z *= 1.0 + (intensity * light.color_ratios.z) / settings.brightness;
    }

    fn vertex_color_intensity(
        &self,
        triangle: &Triangle,
        vertex_index: usize,
        is_static_triangle: bool,
        is_flat_shaded: bool,
        polygon_normal: Vec3,
        cached_intensities: &[Vec3; 3],
    ) -> Vec3 {
        let vertex = &triangle.vertices[vertex_index];
        let normal = if is_flat_shaded {
            polygon_normal
        } else {
            vertex.normal
        };
        let settings = &self.settings;

        let mut color_intensity = if is_static_triangle {
            cached_intensities[vertex_index]
        } else {
            Vec3::new(settings.brightness, settings.brightness, settings.brightness)
        };

        if settings.brightness > 0.0 {
            let should_recompute_ambient = settings.ambient_light_factor > 0.0
                && (!is_static_triangle || !settings.has_static_ambient_light);

            if should_recompute_ambient {
                Self::compute_ambient_light_intensity(
                    settings,
                    normal,
                    triangle.fresnel_factor,
                    &mut color_intensity,
                );
            }

            for light in &self.lights {
                if !is_static_triangle || !light.is_static {
                    Self::compute_light_intensity(
                        settings,
                        light,
                        vertex.world_vector,
                        normal,
                        triangle.fresnel_factor,
                        &mut color_intensity,
                    );
                }
            }
        }

        color_intensity
    }

    /// Shades one buffered triangle in place: the color path multiplies
    /// vertex colors and fades them toward the background with distance;
    /// the texture path stores per-channel intensities for the sampler.
    pub fn illuminate_triangle(&self, triangle: &mut Triangle, scene: &Scene) {
        let Some(object) = scene.object(triangle.source.object) else {
            return;
        };

        if !object.has_lighting {
            // Clear any previous lighting values, since triangles are
            // recycled from the pool
            for vertex in &mut triangle.vertices {
                vertex.texture_intensity = Vec3::new(1.0, 1.0, 1.0);
            }

            return;
        }

        let lod_object = object.lod_variant(triangle.source.lod);
        let polygon = &lod_object.polygons()[triangle.source.polygon as usize];
        let is_static_triangle = !triangle.is_synthetic && object.is_static;
        let is_flat_shaded = object.is_flat_shaded;
        let polygon_normal = polygon.normal;
        let cached_intensities = polygon.cached_vertex_intensities;

        if object.texture.is_some() {
            for i in 0..3 {
                triangle.vertices[i].texture_intensity = self.vertex_color_intensity(
                    triangle,
                    i,
                    is_static_triangle,
                    is_flat_shaded,
                    polygon_normal,
                    &cached_intensities,
                );
            }
        } else {
            let settings = &self.settings;

            for i in 0..3 {
                let color_intensity = self.vertex_color_intensity(
                    triangle,
                    i,
                    is_static_triangle,
                    is_flat_shaded,
                    polygon_normal,
                    &cached_intensities,
                );
                let vertex = &mut triangle.vertices[i];

                vertex.color = vertex.color.modulate(color_intensity);

                let visibility_ratio = (vertex.z / settings.visibility as f32).min(1.0);

                vertex.color =
                    crate::maths::Color::lerp(vertex.color, settings.background_color, visibility_ratio);
            }
        }
    }

    /// One-time illumination of polygons belonging to static, lit
    /// objects. Only static ambient light (when enabled) and static
    /// light sources factor into the cache, without fresnel; non-static
    /// sources are recomputed at runtime on top of it.
    pub fn precompute_static_intensities(scene: &mut Scene) {
        let mut snapshot = Illuminator::new();

        snapshot.begin_frame(scene);
        snapshot.lights.retain(|light| light.is_static);

        let settings = snapshot.settings.clone();

        for object in scene.objects_mut() {
            if !object.is_static || !object.has_lighting {
                continue;
            }

            let lod_count = object.lods().len() as i8;

            for lod_index in -1..lod_count {
                let target = object.lod_variant_mut(lod_index);
                let position = target.position;
                let is_flat_shaded = target.is_flat_shaded;
                let brightness = settings.brightness;

                for polygon_index in 0..target.polygon_count() {
                    let polygon_normal = target.polygons()[polygon_index].normal;
                    let vertex_indices = target.polygons()[polygon_index].vertices;
                    let mut cached = [Vec3::default(); 3];

                    for (i, &vertex_index) in vertex_indices.iter().enumerate() {
                        let vertex = &target.vertices()[vertex_index as usize];
                        let vertex_position = position + vertex.vector;
                        let normal = if is_flat_shaded {
                            polygon_normal
                        } else {
                            vertex.normal
                        };
                        let mut color_intensity = Vec3::new(brightness, brightness, brightness);

                        if settings.has_static_ambient_light && settings.ambient_light_factor > 0.0
                        {
                            Self::compute_ambient_light_intensity(
                                &settings,
                                normal,
                                0.0,
                                &mut color_intensity,
                            );
                        }

                        for light in &snapshot.lights {
                            Self::compute_light_intensity(
                                &settings,
                                light,
                                vertex_position,
                                normal,
                                0.0,
                                &mut color_intensity,
                            );
                        }

                        cached[i] = color_intensity;
                    }

                    target.polygons_mut()[polygon_index].cached_vertex_intensities = cached;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maths::Color;
    use crate::scene::{Light, Object};

    fn scene_with_point_light(position: Vec3, color: Color, power: f32, range: f32) -> Scene {
        let mut scene = Scene::new();
        let mut light = Light::default();

        light.set_color(color);
        light.power = power;
        light.range = range;

        let mut object = Object::new(ObjectKind::Light(light));

        object.position = position;
        scene.add(object);

        scene
    }

    fn lit_vertex_intensity(scene: &Scene, vertex_position: Vec3, normal: Vec3) -> Vec3 {
        let mut illuminator = Illuminator::new();

        illuminator.begin_frame(scene);

        let mut intensity = Vec3::new(1.0, 1.0, 1.0);

        for light in &illuminator.lights {
            Illuminator::compute_light_intensity(
                &illuminator.settings,
                light,
                vertex_position,
                normal,
                0.0,
                &mut intensity,
            );
        }

        intensity
    }

    #[test]
    fn light_at_exact_range_contributes_nothing() {
        let scene = scene_with_point_light(
            Vec3::new(0.0, 0.0, 0.0),
            Color::new(255, 255, 255),
            1.0,
            100.0,
        );

        let intensity = lit_vertex_intensity(
            &scene,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 0.0, -1.0),
        );

        assert_eq!(intensity, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn light_beyond_range_is_rejected() {
        let scene = scene_with_point_light(
            Vec3::new(0.0, 0.0, 0.0),
            Color::new(255, 255, 255),
            1.0,
            100.0,
        );

        let intensity = lit_vertex_intensity(
            &scene,
            Vec3::new(0.0, 0.0, 150.0),
            Vec3::new(0.0, 0.0, -1.0),
        );

        assert_eq!(intensity, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn facing_vertex_inside_range_is_brightened() {
        let scene = scene_with_point_light(
            Vec3::new(0.0, 0.0, 0.0),
            Color::new(255, 255, 255),
            1.0,
            100.0,
        );

        let intensity = lit_vertex_intensity(
            &scene,
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::new(0.0, 0.0, -1.0),
        );

        assert!(intensity.x > 1.0);
        assert_eq!(intensity.x, intensity.y);
        assert_eq!(intensity.y, intensity.z);
    }

    #[test]
    fn colored_light_boosts_its_own_channels_only() {
        let scene = scene_with_point_light(
            Vec3::new(0.0, 0.0, 0.0),
            Color::new(255, 0, 0),
            1.0,
            100.0,
        );

        let intensity = lit_vertex_intensity(
            &scene,
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::new(0.0, 0.0, -1.0),
        );

        assert!(intensity.x > 1.0);
        assert_eq!(intensity.y, 1.0);
        assert_eq!(intensity.z, 1.0);
    }

    #[test]
    fn vertex_facing_away_is_unlit() {
        let scene = scene_with_point_light(
            Vec3::new(0.0, 0.0, 0.0),
            Color::new(255, 255, 255),
            1.0,
            100.0,
        );

        let intensity = lit_vertex_intensity(
            &scene,
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::new(0.0, 0.0, 1.0),
        );

        assert_eq!(intensity, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn disabled_light_is_ignored() {
        let mut scene = scene_with_point_light(
            Vec3::new(0.0, 0.0, 0.0),
            Color::new(255, 255, 255),
            1.0,
            100.0,
        );

        let light_id = scene.lights()[0];

        scene
            .object_mut(light_id)
            .unwrap()
            .light_mut()
            .unwrap()
            .is_disabled = true;

        let intensity = lit_vertex_intensity(
            &scene,
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::new(0.0, 0.0, -1.0),
        );

        assert_eq!(intensity, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn directional_light_needs_alignment() {
        let mut scene = Scene::new();
        let mut directional = crate::scene::DirectionalLight::default();

        directional.light.set_color(Color::new(255, 255, 255));
        directional.light.power = 1.0;
        directional.light.range = 1000.0;
        directional.set_direction(Vec3::new(0.0, 0.0, 1.0));

        let mut object = Object::new(ObjectKind::DirectionalLight(directional));

        object.position = Vec3::new(0.0, 0.0, 0.0);
        scene.add(object);

        // Vertex in front of the light, facing back toward it.
        let lit = lit_vertex_intensity(
            &scene,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 0.0, -1.0),
        );

        assert!(lit.x > 1.0);

        // Vertex behind the light direction gets nothing.
        let unlit = lit_vertex_intensity(
            &scene,
            Vec3::new(0.0, 0.0, -100.0),
            Vec3::new(0.0, 0.0, 1.0),
        );

        assert_eq!(unlit, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn static_precompute_fills_polygon_caches() {
        let mut scene = Scene::new();
        let mut quad = crate::scene::cube(50.0);

        quad.is_static = true;
        quad.position = Vec3::new(0.0, 0.0, 200.0);
        scene.add(quad);

        let mut light = Light::default();

        light.set_color(Color::new(255, 255, 255));
        light.power = 2.0;
        light.range = 1000.0;

        let mut light_object = Object::new(ObjectKind::Light(light));

        light_object.position = Vec3::new(0.0, 0.0, 0.0);
        light_object.is_static = true;
        scene.add(light_object);

        Illuminator::precompute_static_intensities(&mut scene);

        let cube = &scene.objects()[0];
        let brightness = scene.settings.brightness;

        // The camera-facing side of the cube picks up cached intensity
        // above the base brightness.
        let any_brightened = cube.polygons().iter().any(|polygon| {
            polygon
                .cached_vertex_intensities
                .iter()
                .any(|intensity| intensity.x > brightness)
        });

        assert!(any_brightened);

        // Every cache entry was initialized away from its default.
        assert!(cube.polygons().iter().all(|polygon| {
            polygon
                .cached_vertex_intensities
                .iter()
                .all(|intensity| intensity.x > 0.0)
        }));
    }
}
