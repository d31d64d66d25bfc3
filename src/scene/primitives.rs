use rand::Rng;

use crate::maths::{Color, Vec2, Vec3};

use super::obj_file::ModelData;
use super::object::{Object, ObjectKind};

fn random_color() -> Color {
    let mut rng = rand::rng();

    Color::new(
        rng.random_range(0..255),
        rng.random_range(0..255),
        rng.random_range(0..255),
    )
}

/// Builds a flat grid mesh of `rows` x `columns` tiles, two polygons per
/// tile:
///
/// ```text
///   ----------------
///   |1 / |3 / |5 / |
///   | / 2| / 4| / 6| . . .
///   ----------------
/// ```
///
/// Counter-clockwise vertex order matters for surface normal
/// determination:
///
/// ```text
///  0--2     0
///  | /     /|
///  |/     / |
///  1     1--2
/// ```
pub fn grid_mesh(rows: usize, columns: usize, tile_size: f32) -> Object {
    let mut object = Object::new(ObjectKind::Mesh { rows, columns });
    let vertices_per_row = columns + 1;
    let vertices_per_column = rows + 1;

    for z in 0..vertices_per_column {
        for x in 0..vertices_per_row {
            object.add_vertex_color(
                Vec3::new(x as f32 * tile_size, 0.0, z as f32 * tile_size),
                random_color(),
            );
        }
    }

    let polygons_per_row = 2 * columns;

    for row in 0..rows {
        for p in 1..=polygons_per_row {
            let is_lower_polygon = p % 2 == 0;
            let first_vertex_index = row * vertices_per_row + p / 2;
            let vertex_below_first_index = first_vertex_index + vertices_per_row;
            let v1 = first_vertex_index;
            let v2 = vertex_below_first_index - if is_lower_polygon { 1 } else { 0 };
            let v3 = if is_lower_polygon {
                vertex_below_first_index
            } else {
                first_vertex_index + 1
            };

            object.add_polygon(v1 as u32, v2 as u32, v3 as u32);
        }
    }

    object
}

/// Positions for the 24 vertices constituting a cube. Cubes need 24
/// vertices so each face can carry its own texture coordinates at the
/// corners; some vertices therefore share positions.
///
/// ```text
///        __3__
///    __--     --__
///   0__         __2
///   |  --_____--  |
///   |      1      |
///   |             |
///   |    __7__    |              y+
///   |__--     --__|              |
///   4__         __6              |
///      --__ __--         z+__    |    __x+
///          5                 --__|__--
/// ```
#[rustfmt::skip]
const CUBE_VERTEX_POSITIONS: [Vec3; 24] = [
    // Side faces
    Vec3::new(-1.0, 1.0, 1.0),     // 0
    Vec3::new(-1.0, 1.0, -1.0),    // 1
    Vec3::new(-1.0, -1.0, 1.0),    // 4
    Vec3::new(-1.0, -1.0, -1.0),   // 5

    Vec3::new(-1.0, 1.0, -1.0),    // 1
    Vec3::new(1.0, 1.0, -1.0),     // 2
    Vec3::new(-1.0, -1.0, -1.0),   // 5
    Vec3::new(1.0, -1.0, -1.0),    // 6

    Vec3::new(1.0, 1.0, -1.0),     // 2
    Vec3::new(1.0, 1.0, 1.0),      // 3
    Vec3::new(1.0, -1.0, -1.0),    // 6
    Vec3::new(1.0, -1.0, 1.0),     // 7

    Vec3::new(1.0, 1.0, 1.0),      // 3
    Vec3::new(-1.0, 1.0, 1.0),     // 0
    Vec3::new(1.0, -1.0, 1.0),     // 7
    Vec3::new(-1.0, -1.0, 1.0),    // 4

    // Top face
    Vec3::new(-1.0, 1.0, 1.0),     // 0
    Vec3::new(1.0, 1.0, 1.0),      // 3
    Vec3::new(-1.0, 1.0, -1.0),    // 1
    Vec3::new(1.0, 1.0, -1.0),     // 2

    // Bottom face
    Vec3::new(-1.0, -1.0, -1.0),   // 5
    Vec3::new(1.0, -1.0, -1.0),    // 6
    Vec3::new(-1.0, -1.0, 1.0),    // 4
    Vec3::new(1.0, -1.0, 1.0),     // 7
];

#[rustfmt::skip]
const CUBE_POLYGON_VERTICES: [[u32; 3]; 12] = [
    // Side faces
    [0, 2, 1],
    [1, 2, 3],
    [4, 6, 5],
    [5, 6, 7],
    [8, 10, 9],
    [9, 10, 11],
    [12, 14, 13],
    [13, 14, 15],
    // Top face
    [16, 19, 17],
    [16, 18, 19],
    // Bottom face
    [22, 21, 20],
    [22, 23, 21],
];

pub fn cube(radius: f32) -> Object {
    let mut object = Object::new(ObjectKind::Cube);

    for position in CUBE_VERTEX_POSITIONS {
        let vector = Vec3::new(position.x * radius, -position.y * radius, position.z * radius);

        object.add_vertex_color(vector, random_color());
    }

    for [v1, v2, v3] in CUBE_POLYGON_VERTICES {
        object.add_polygon(v1, v2, v3);
    }

    object
}

/// A double-sided unit quad used by particle systems.
pub fn particle() -> Object {
    let mut object = Object::new(ObjectKind::Particle);

    object.add_vertex(Vec3::new(-1.0, 1.0, 0.0));
    object.add_vertex(Vec3::new(1.0, 1.0, 0.0));
    object.add_vertex(Vec3::new(-1.0, -1.0, 0.0));
    object.add_vertex(Vec3::new(1.0, -1.0, 0.0));

    // 'Front' face
    object.add_polygon(0, 2, 1);
    object.add_polygon(1, 2, 3);

    // 'Back' face
    object.add_polygon(0, 1, 2);
    object.add_polygon(1, 3, 2);

    object.is_flat_shaded = true;
    object.should_reset = true;

    object
}

#[rustfmt::skip]
const SKYBOX_VERTEX_POSITIONS: [Vec3; 14] = [
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(-1.0, 1.0, 1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(-1.0, 1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
];

#[rustfmt::skip]
const SKYBOX_UVS: [Vec2; 14] = [
    Vec2::new(0.749978, 0.666474),
    Vec2::new(0.999934, 0.333523),
    Vec2::new(0.999934, 0.666474),
    Vec2::new(0.499000, 0.666474),
    Vec2::new(0.749978, 0.333523),
    Vec2::new(0.250006, 0.666476),
    Vec2::new(0.499000, 0.333525),
    Vec2::new(0.000108, 0.666476),
    Vec2::new(0.250064, 0.333525),
    Vec2::new(0.250064, 0.999427),
    Vec2::new(0.499000, 0.999427),
    Vec2::new(0.499000, 0.000572),
    Vec2::new(0.000108, 0.333525),
    Vec2::new(0.250064, 0.000572),
];

#[rustfmt::skip]
const SKYBOX_POLYGONS: [[u32; 3]; 12] = [
    [0, 1, 2],
    [3, 4, 0],
    [5, 6, 3],
    [7, 8, 5],
    [9, 3, 10],
    [8, 11, 6],
    [0, 4, 1],
    [3, 6, 4],
    [5, 8, 6],
    [7, 12, 8],
    [9, 5, 3],
    [8, 13, 11],
];

pub fn skybox() -> Object {
    let mut object = Object::new(ObjectKind::Skybox);

    for (position, uv) in SKYBOX_VERTEX_POSITIONS.iter().zip(SKYBOX_UVS) {
        object.add_vertex_uv(*position, uv);
    }

    for [v1, v2, v3] in SKYBOX_POLYGONS {
        object.add_polygon(v1, v2, v3);
    }

    object
}

/// Builds a model object from decoded OBJ data.
///
/// With texture coordinates present, the number of defined position
/// vectors and texture coordinates can differ (owing to the way .obj
/// files store vertex information), so each unique (position index,
/// uv index) pair referenced by a face becomes its own vertex.
pub fn model(data: &ModelData) -> Object {
    use std::collections::HashMap;

    let mut object = Object::new(ObjectKind::Model);

    if data.uvs.is_empty() {
        // Normals are computed independently of those in the file, so a
        // textureless model only needs the raw position list.
        for &position in &data.positions {
            object.add_vertex_color(position, random_color());
        }

        for face in &data.faces {
            object.add_polygon(face[0].0, face[1].0, face[2].0);
        }
    } else {
        let mut unique_vertex_indices: HashMap<(u32, u32), u32> = HashMap::new();
        let mut polygon_vertex_indices = Vec::with_capacity(data.faces.len());

        for face in &data.faces {
            let mut vertex_indices = [0u32; 3];

            for (slot, &(v_index, vt_index)) in vertex_indices.iter_mut().zip(face.iter()) {
                *slot = *unique_vertex_indices.entry((v_index, vt_index)).or_insert_with(|| {
                    let index = object.vertex_count() as u32;

                    object.add_vertex_uv(
                        data.positions[v_index as usize],
                        data.uvs[vt_index as usize],
                    );

                    index
                });
            }

            polygon_vertex_indices.push(vertex_indices);
        }

        for [v1, v2, v3] in polygon_vertex_indices {
            object.add_polygon(v1, v2, v3);
        }
    }

    object
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_mesh_counts() {
        let mesh = grid_mesh(3, 5, 10.0);

        assert_eq!(mesh.vertex_count(), 4 * 6);
        assert_eq!(mesh.polygon_count(), 2 * 3 * 5);
    }

    #[test]
    fn cube_counts_and_extent() {
        let cube = cube(25.0);

        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.polygon_count(), 12);
        assert!(cube
            .vertices()
            .iter()
            .all(|v| v.vector.x.abs() == 25.0 && v.vector.y.abs() == 25.0));
    }

    #[test]
    fn cube_face_uvs_cover_all_corners() {
        let mut cube = cube(1.0);

        cube.set_face_uv_coordinates(0.0, 0.0, 0.5, 1.0);

        for face in 0..6 {
            let uvs: Vec<Vec2> = cube.vertices()[face * 4..face * 4 + 4]
                .iter()
                .map(|v| v.uv)
                .collect();

            assert!(uvs.contains(&Vec2::new(0.0, 0.0)));
            assert!(uvs.contains(&Vec2::new(0.5, 0.0)));
            assert!(uvs.contains(&Vec2::new(0.0, 1.0)));
            assert!(uvs.contains(&Vec2::new(0.5, 1.0)));
        }
    }

    #[test]
    fn model_with_uvs_splits_unique_pairs() {
        let data = ModelData {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            uvs: vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
            faces: vec![
                [(0, 0), (1, 1), (2, 2)],
                // Same positions, one distinct uv pairing for vertex 0.
                [(0, 1), (1, 1), (2, 2)],
            ],
        };

        let model = model(&data);

        assert_eq!(model.vertex_count(), 4);
        assert_eq!(model.polygon_count(), 2);
    }
}
