use crate::maths::{Color, DEG_TO_RAD, PI, Vec2, Vec3};
use crate::scene::{Object, Scene, Vertex3d};
use crate::stats::DebugStats;

use super::raster_filter::RasterFilter;
use super::triangle_buffer::{PolygonRef, TrianglePool};

/// Counts polygon vertices culled on each side of the viewing frustum.
///
/// A polygon is only rejected when all of its vertices fall outside the
/// same side: per-vertex checks on different sides can still belong to
/// a polygon spreading across the screen, which matters when viewing
/// polygons from extremely close up.
#[derive(Debug, Default, Clone, Copy)]
struct FrustumCuller {
    top: u8,
    bottom: u8,
    left: u8,
    right: u8,
    near: u8,
    far: u8,
}

impl FrustumCuller {
    fn is_culled(&self) -> bool {
        self.left == 3
            || self.right == 3
            || self.top == 3
            || self.bottom == 3
            || self.near == 3
            || self.far == 3
    }
}

/// A polygon vertex carried through camera-space transform and
/// near-plane clipping. `vector` is the camera-space position; the
/// normal stays in world space for lighting.
#[derive(Debug, Clone, Copy, Default)]
struct ClipVertex {
    vector: Vec3,
    uv: Vec2,
    color: Color,
    normal: Vec3,
}

impl ClipVertex {
    fn from_vertex(vertex: &Vertex3d, camera_space: Vec3) -> Self {
        Self {
            vector: camera_space,
            uv: vertex.uv,
            color: vertex.color,
            normal: vertex.normal,
        }
    }

    fn lerp(v1: Self, v2: Self, r: f32) -> Self {
        Self {
            vector: Vec3::lerp(v1.vector, v2.vector, r),
            uv: Vec2::lerp(v1.uv, v2.uv, r),
            color: Color::lerp(v1.color, v2.color, r),
            normal: Vec3::lerp(v1.normal, v2.normal, r),
        }
    }
}

/// Transforms scene polygons into screen-space triangles: world to
/// camera space, frustum culling, near-plane clipping, projection, and
/// hand-off to the raster filter.
pub struct Projector {
    raster_width: usize,
    raster_height: usize,
}

impl Projector {
    pub fn new(raster_width: usize, raster_height: usize) -> Self {
        Self {
            raster_width,
            raster_height,
        }
    }

    pub fn project_scene(
        &self,
        scene: &Scene,
        pool: &mut TrianglePool,
        filter: &mut RasterFilter,
        stats: &mut DebugStats,
    ) {
        let camera = &scene.camera;
        let projection_scale =
            self.raster_width.max(self.raster_height) as f32 * (180.0 / camera.fov as f32);
        let fov_angle_range = (DEG_TO_RAD * camera.fov as f32 / 2.0).sin();
        let camera_rotation_matrix = camera.rotation_matrix();
        let visibility = scene.settings.visibility as f32;

        for object in scene.objects() {
            if !scene.is_in_current_occupied_sector(object.sector_id) {
                continue;
            }

            let relative_object_position = object.position - camera.position;
            let lod_index = object.lod_index_for_distance(relative_object_position.magnitude());
            let lod_object = object.lod_variant(lod_index);

            stats.count_polygons(lod_object.polygon_count());
            stats.count_vertices(lod_object.vertex_count());

            for (polygon_index, polygon) in lod_object.polygons().iter().enumerate() {
                let vertices = [
                    &lod_object.vertices()[polygon.vertices[0] as usize],
                    &lod_object.vertices()[polygon.vertices[1] as usize],
                    &lod_object.vertices()[polygon.vertices[2] as usize],
                ];

                let relative_polygon_position =
                    relative_object_position + vertices[0].vector;
                let normalized_dot_product =
                    Vec3::dot(polygon.normal, relative_polygon_position.unit());

                // As a hack to fix polygons viewed at or near glancing
                // angles being rendered as holes in meshes, marginally
                // back-facing polygons are still let through.
                let is_facing_camera = normalized_dot_product < 0.05;

                if !is_facing_camera {
                    continue;
                }

                let mut culler = FrustumCuller::default();
                let mut t_verts = [ClipVertex::default(); 3];
                let mut u_vecs = [Vec3::default(); 3];
                let mut w_vecs = [Vec3::default(); 3];

                for i in 0..3 {
                    let camera_space = camera_rotation_matrix
                        * (relative_object_position + vertices[i].vector);

                    t_verts[i] = ClipVertex::from_vertex(vertices[i], camera_space);
                    u_vecs[i] = camera_space.unit();
                    w_vecs[i] = object.position + vertices[i].vector;

                    if camera_space.z < lod_object.near_clipping_distance {
                        culler.near += 1;
                    } else if camera_space.z > visibility {
                        culler.far += 1;
                    }

                    if u_vecs[i].x < -fov_angle_range {
                        culler.left += 1;
                    } else if u_vecs[i].x > fov_angle_range {
                        culler.right += 1;
                    }

                    if u_vecs[i].y < -fov_angle_range {
                        culler.bottom += 1;
                    } else if u_vecs[i].y > fov_angle_range {
                        culler.top += 1;
                    }
                }

                if culler.is_culled() {
                    continue;
                }

                let source = PolygonRef {
                    object: object.id(),
                    lod: lod_index,
                    polygon: polygon_index as u32,
                };

                if culler.near > 0 {
                    self.clip_against_near_plane(
                        &culler,
                        &mut t_verts,
                        &mut u_vecs,
                        &mut w_vecs,
                        object,
                        source,
                        normalized_dot_product,
                        projection_scale,
                        pool,
                        filter,
                    );
                } else {
                    self.project_and_queue_triangle(
                        &t_verts,
                        &u_vecs,
                        &w_vecs,
                        object,
                        source,
                        normalized_dot_product,
                        projection_scale,
                        false,
                        pool,
                        filter,
                    );
                }
            }
        }
    }

    /// Clips a polygon with vertices behind the near plane, emitting one
    /// or two synthetic triangles whose geometry stops at the plane.
    /// Necessary to prevent erroneous screen projections at z <= 0.
    #[allow(clippy::too_many_arguments)]
    fn clip_against_near_plane(
        &self,
        culler: &FrustumCuller,
        t_verts: &mut [ClipVertex; 3],
        u_vecs: &mut [Vec3; 3],
        w_vecs: &mut [Vec3; 3],
        object: &Object,
        source: PolygonRef,
        normalized_dot_product: f32,
        projection_scale: f32,
        pool: &mut TrianglePool,
        filter: &mut RasterFilter,
    ) {
        let near = object.near_clipping_distance;

        // Sort vertices by descending z so the interpolation anchors on
        // the vertices still in front of the plane.
        if t_verts[0].vector.z < t_verts[1].vector.z {
            t_verts.swap(0, 1);
            u_vecs.swap(0, 1);
            w_vecs.swap(0, 1);
        }

        if t_verts[1].vector.z < t_verts[2].vector.z {
            t_verts.swap(1, 2);
            u_vecs.swap(1, 2);
            w_vecs.swap(1, 2);
        }

        if t_verts[0].vector.z < t_verts[1].vector.z {
            t_verts.swap(0, 1);
            u_vecs.swap(0, 1);
            w_vecs.swap(0, 1);
        }

        if culler.near == 2 {
            // Two vertices behind the near plane clip the polygon into a
            // smaller triangle at the plane boundary. The frontmost
            // vertex needs no interpolation.
            let deltas = [
                0.0,
                (t_verts[0].vector.z - near) / (t_verts[0].vector.z - t_verts[1].vector.z),
                (t_verts[0].vector.z - near) / (t_verts[0].vector.z - t_verts[2].vector.z),
            ];

            for i in 1..3 {
                t_verts[i] = ClipVertex::lerp(t_verts[0], t_verts[i], deltas[i]);
                u_vecs[i] = t_verts[i].vector.unit();
                w_vecs[i] = Vec3::lerp(w_vecs[0], w_vecs[i], deltas[i]);
            }

            self.project_and_queue_triangle(
                t_verts,
                u_vecs,
                w_vecs,
                object,
                source,
                normalized_dot_product,
                projection_scale,
                true,
                pool,
                filter,
            );
        } else if culler.near == 1 {
            // One vertex behind the plane clips the polygon into a quad:
            // the first two vertices survive, the latter two interpolate
            // toward the clipped third. The quad then splits into two
            // synthetic triangles.
            let v2_delta =
                (t_verts[1].vector.z - near) / (t_verts[1].vector.z - t_verts[2].vector.z);
            let v3_delta =
                (t_verts[0].vector.z - near) / (t_verts[0].vector.z - t_verts[2].vector.z);

            let quad_verts = [
                t_verts[0],
                t_verts[1],
                ClipVertex::lerp(t_verts[1], t_verts[2], v2_delta),
                ClipVertex::lerp(t_verts[0], t_verts[2], v3_delta),
            ];

            let u_quad = [
                quad_verts[0].vector.unit(),
                quad_verts[1].vector.unit(),
                quad_verts[2].vector.unit(),
                quad_verts[3].vector.unit(),
            ];

            let w_quad = [
                w_vecs[0],
                w_vecs[1],
                Vec3::lerp(w_vecs[1], w_vecs[2], v2_delta),
                Vec3::lerp(w_vecs[0], w_vecs[2], v3_delta),
            ];

            self.project_and_queue_triangle(
                &[quad_verts[0], quad_verts[1], quad_verts[2]],
                &[u_quad[0], u_quad[1], u_quad[2]],
                &[w_quad[0], w_quad[1], w_quad[2]],
                object,
                source,
                normalized_dot_product,
                projection_scale,
                true,
                pool,
                filter,
            );

            self.project_and_queue_triangle(
                &[quad_verts[0], quad_verts[2], quad_verts[3]],
                &[u_quad[0], u_quad[2], u_quad[3]],
                &[w_quad[0], w_quad[2], w_quad[3]],
                object,
                source,
                normalized_dot_product,
                projection_scale,
                true,
                pool,
                filter,
            );
        }
    }

    /// Writes one screen-space triangle into the pool and hands it to
    /// the raster filter.
    #[allow(clippy::too_many_arguments)]
    fn project_and_queue_triangle(
        &self,
        t_verts: &[ClipVertex; 3],
        u_vecs: &[Vec3; 3],
        w_vecs: &[Vec3; 3],
        object: &Object,
        source: PolygonRef,
        normalized_dot_product: f32,
        projection_scale: f32,
        is_synthetic: bool,
        pool: &mut TrianglePool,
        filter: &mut RasterFilter,
    ) {
        let half_width = self.raster_width as f32 / 2.0;
        let half_height = self.raster_height as f32 / 2.0;
        let fresnel_factor = if object.fresnel_factor > 0.0 {
            (normalized_dot_product * (PI / 2.0)).cos() * object.fresnel_factor
        } else {
            0.0
        };

        let (index, triangle) = pool.request();

        triangle.source = source;
        triangle.is_synthetic = is_synthetic;
        triangle.fresnel_factor = fresnel_factor;

        for i in 0..3 {
            let clip_vertex = &t_verts[i];
            let unit = u_vecs[i];
            let inverse_depth = 1.0 / clip_vertex.vector.z;
            let vertex = &mut triangle.vertices[i];

            vertex.coordinate.x = (projection_scale * unit.x / unit.z + half_width) as i32;
            vertex.coordinate.y = (projection_scale * -unit.y / unit.z + half_height) as i32;
            vertex.z = clip_vertex.vector.z;
            vertex.inverse_depth = inverse_depth;
            vertex.perspective_uv = clip_vertex.uv * inverse_depth;
            vertex.color = clip_vertex.color;
            vertex.texture_intensity = Vec3::new(1.0, 1.0, 1.0);
            vertex.world_vector = w_vecs[i];
            vertex.normal = clip_vertex.normal;
        }

        let triangle = &pool.triangles[index as usize];

        filter.add_triangle(index, triangle, object.can_occlude_surfaces);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maths::Vec3;
    use crate::rasterizer::raster_filter::RasterFilter;
    use crate::rasterizer::triangle_buffer::TriangleBuffer;
    use crate::scene::{Object, ObjectKind, Sector, Aabb};

    fn triangle_object(positions: [Vec3; 3]) -> Object {
        let mut object = Object::new(ObjectKind::Model);

        for position in positions {
            object.add_vertex(position);
        }

        object.add_polygon(0, 1, 2);

        object
    }

    fn project(scene: &mut Scene) -> (Vec<crate::rasterizer::triangle_buffer::Triangle>, usize) {
        let buffer = TriangleBuffer::new();
        let mut pool = buffer.primary();
        let mut filter = RasterFilter::new(100, 100);
        let mut stats = DebugStats::default();
        let projector = Projector::new(100, 100);

        scene.update(0, &Default::default());
        projector.project_scene(scene, &mut pool, &mut filter, &mut stats);

        while let Some(index) = filter.next(&pool.triangles) {
            pool.buffer(index);
        }

        let triangles = pool
            .queue
            .iter()
            .map(|&i| pool.triangles[i as usize])
            .collect();
        let requested = pool.requested;

        (triangles, requested)
    }

    #[test]
    fn unclipped_triangle_projects_once() {
        let mut scene = Scene::new();
        // Counter-clockwise when viewed from the origin, facing -z.
        let object = triangle_object([
            Vec3::new(-10.0, -10.0, 100.0),
            Vec3::new(0.0, 10.0, 100.0),
            Vec3::new(10.0, -10.0, 100.0),
        ]);

        scene.camera.position = Vec3::default();
        scene.camera.fov = 90;
        scene.add(object);

        let (triangles, requested) = project(&mut scene);

        assert_eq!(requested, 1);
        assert_eq!(triangles.len(), 1);
        assert!(!triangles[0].is_synthetic);

        // All camera-space depths preserved.
        for vertex in &triangles[0].vertices {
            assert!((vertex.z - 100.0).abs() < 1e-3);
            assert!((vertex.inverse_depth - 0.01).abs() < 1e-6);
        }
    }

    const NEAR_CLIP_TEST_MIN: f32 = 30.0 - 1e-3;

    #[test]
    fn one_vertex_behind_near_plane_yields_two_synthetic_triangles() {
        let mut scene = Scene::new();
        let object = triangle_object([
            Vec3::new(-50.0, -10.0, 200.0),
            Vec3::new(0.0, 5.0, 10.0),
            Vec3::new(50.0, -10.0, 200.0),
        ]);

        scene.camera.position = Vec3::default();
        scene.add(object);

        let (triangles, requested) = project(&mut scene);

        assert_eq!(requested, 2);

        for triangle in &triangles {
            assert!(triangle.is_synthetic);

            for vertex in &triangle.vertices {
                assert!(vertex.z >= NEAR_CLIP_TEST_MIN);
            }
        }
    }

    #[test]
    fn two_vertices_behind_near_plane_yield_one_synthetic_triangle() {
        let mut scene = Scene::new();
        let object = triangle_object([
            Vec3::new(-50.0, -10.0, 10.0),
            Vec3::new(0.0, 5.0, 200.0),
            Vec3::new(50.0, -10.0, 10.0),
        ]);

        scene.camera.position = Vec3::default();
        scene.add(object);

        let (triangles, requested) = project(&mut scene);

        assert_eq!(requested, 1);
        assert_eq!(triangles.len(), 1);
        assert!(triangles[0].is_synthetic);

        for vertex in &triangles[0].vertices {
            assert!(vertex.z >= NEAR_CLIP_TEST_MIN);
        }
    }

    #[test]
    fn fully_near_culled_polygon_is_rejected() {
        let mut scene = Scene::new();
        let object = triangle_object([
            Vec3::new(-10.0, -10.0, 5.0),
            Vec3::new(0.0, 10.0, 5.0),
            Vec3::new(10.0, -10.0, 5.0),
        ]);

        scene.camera.position = Vec3::default();
        scene.add(object);

        let (_, requested) = project(&mut scene);

        assert_eq!(requested, 0);
    }

    #[test]
    fn back_facing_polygon_is_culled() {
        let mut scene = Scene::new();
        // Clockwise from the camera's point of view: faces away.
        let object = triangle_object([
            Vec3::new(10.0, -10.0, 100.0),
            Vec3::new(0.0, 10.0, 100.0),
            Vec3::new(-10.0, -10.0, 100.0),
        ]);

        scene.camera.position = Vec3::default();
        scene.add(object);

        let (_, requested) = project(&mut scene);

        assert_eq!(requested, 0);
    }

    #[test]
    fn sector_assignment_gates_projection() {
        let mut scene = Scene::new();
        let mut object = triangle_object([
            Vec3::new(-10.0, -10.0, 100.0),
            Vec3::new(0.0, 10.0, 100.0),
            Vec3::new(10.0, -10.0, 100.0),
        ]);

        object.sector_id = 1;

        scene.add_sector(Sector {
            id: 1,
            bounds: Aabb {
                corner_a: Vec3::new(1000.0, -100.0, -100.0),
                corner_b: Vec3::new(1200.0, 100.0, 100.0),
            },
        });
        scene.camera.position = Vec3::default();
        scene.add(object);

        let (_, requested) = project(&mut scene);
        assert_eq!(requested, 0);

        scene.camera.position = Vec3::new(1100.0, 0.0, 0.0);
        scene.objects_mut()[0].position = Vec3::new(1100.0, 0.0, 0.0);

        let (_, requested) = project(&mut scene);
        assert_eq!(requested, 1);
    }

    #[test]
    fn lod_band_switches_with_distance() {
        let mut scene = Scene::new();
        let mut object = triangle_object([
            Vec3::new(-100.0, -100.0, 100.0),
            Vec3::new(0.0, 100.0, 100.0),
            Vec3::new(100.0, -100.0, 100.0),
        ]);

        // A LOD with two polygons so the chosen variant is observable
        // through the projected triangle count.
        let mut lod = triangle_object([
            Vec3::new(-100.0, -100.0, 100.0),
            Vec3::new(0.0, 100.0, 100.0),
            Vec3::new(100.0, -100.0, 100.0),
        ]);
        lod.add_polygon(0, 1, 2);
        object.add_lod(lod);

        object.position = Vec3::new(0.0, 0.0, 1000.0);
        scene.camera.position = Vec3::default();
        scene.settings.visibility = 100_000;
        let id = scene.add(object);

        let (_, requested) = project(&mut scene);
        assert_eq!(requested, 1);

        scene.object_mut(id).unwrap().position = Vec3::new(0.0, 0.0, 3000.0);

        let (_, requested) = project(&mut scene);
        assert_eq!(requested, 2);
    }
}
