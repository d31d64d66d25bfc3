use std::{fs::File, io::BufReader, path::Path};

use obj::raw::{object::Polygon, parse_obj};

use crate::maths::{Vec2, Vec3};

/// Decoded OBJ geometry, normalized for the renderer: positions are
/// left-handed (x negated on import) and texture coordinates carry a
/// flipped v. Face entries are (position index, uv index) pairs; the uv
/// index is 0 when the file defines no texture coordinates.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub faces: Vec<[(u32, u32); 3]>,
}

/// Parses an OBJ file into `ModelData`. A missing or malformed file is
/// non-fatal: it logs and yields empty geometry.
pub fn load_model_data<P: AsRef<Path>>(obj_path: P) -> ModelData {
    let path = obj_path.as_ref();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            log::warn!("could not open model file {}: {error}", path.display());
            return ModelData::default();
        }
    };

    let raw = match parse_obj(BufReader::new(file)) {
        Ok(raw) => raw,
        Err(error) => {
            log::warn!("could not parse model file {}: {error}", path.display());
            return ModelData::default();
        }
    };

    log::info!(
        "loaded model {}: {} polygons from {} points",
        path.display(),
        raw.polygons.len(),
        raw.positions.len(),
    );

    let positions = raw
        .positions
        .iter()
        .map(|&(x, y, z, _)| Vec3::new(-x, y, z))
        .collect();

    let uvs = raw
        .tex_coords
        .iter()
        .map(|&(u, v, _)| Vec2::new(u, 1.0 - v))
        .collect();

    let mut faces = Vec::with_capacity(raw.polygons.len());

    for polygon in &raw.polygons {
        let face = match polygon {
            Polygon::P(vec) if vec.len() == 3 => {
                [(vec[0] as u32, 0), (vec[1] as u32, 0), (vec[2] as u32, 0)]
            }
            Polygon::PT(vec) if vec.len() == 3 => [
                (vec[0].0 as u32, vec[0].1 as u32),
                (vec[1].0 as u32, vec[1].1 as u32),
                (vec[2].0 as u32, vec[2].1 as u32),
            ],
            Polygon::PN(vec) if vec.len() == 3 => {
                [(vec[0].0 as u32, 0), (vec[1].0 as u32, 0), (vec[2].0 as u32, 0)]
            }
            Polygon::PTN(vec) if vec.len() == 3 => [
                (vec[0].0 as u32, vec[0].1 as u32),
                (vec[1].0 as u32, vec[1].1 as u32),
                (vec[2].0 as u32, vec[2].1 as u32),
            ],
            _ => {
                log::warn!("skipping non-triangulated face in {}", path.display());
                continue;
            }
        };

        faces.push(face);
    }

    ModelData {
        positions,
        uvs,
        faces,
    }
}
