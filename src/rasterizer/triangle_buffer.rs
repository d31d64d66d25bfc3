use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{EngineError, fatal};
use crate::maths::{Color, Coordinate, Vec2, Vec3, lerp};
use crate::scene::ObjectId;

pub const TRIANGLE_POOL_SIZE: usize = 100_000;
pub const SERIAL_ILLUMINATION_NONSTATIC_TRIANGLE_LIMIT: usize = 2500;

/// A screen-projected vertex carrying everything the illumination and
/// scanline stages need. Texture coordinates are stored divided by
/// camera-space depth so interpolation stays perspective-correct.
#[derive(Debug, Clone, Copy)]
pub struct Vertex2d {
    pub coordinate: Coordinate,
    pub z: f32,
    pub inverse_depth: f32,
    pub perspective_uv: Vec2,
    pub color: Color,
    pub texture_intensity: Vec3,
    pub world_vector: Vec3,
    pub normal: Vec3,
}

impl Default for Vertex2d {
    fn default() -> Self {
        Self {
            coordinate: Coordinate::default(),
            z: 0.0,
            inverse_depth: 0.0,
            perspective_uv: Vec2::default(),
            color: Color::default(),
            texture_intensity: Vec3::new(1.0, 1.0, 1.0),
            world_vector: Vec3::default(),
            normal: Vec3::default(),
        }
    }
}

impl Vertex2d {
    /// Interpolates the attributes consumed by the scanline stage.
    pub fn lerp(v1: &Vertex2d, v2: &Vertex2d, r: f32) -> Vertex2d {
        Vertex2d {
            coordinate: Coordinate::lerp(v1.coordinate, v2.coordinate, r),
            z: lerp(v1.z, v2.z, r),
            inverse_depth: lerp(v1.inverse_depth, v2.inverse_depth, r),
            perspective_uv: Vec2::lerp(v1.perspective_uv, v2.perspective_uv, r),
            color: Color::lerp(v1.color, v2.color, r),
            texture_intensity: Vec3::lerp(v1.texture_intensity, v2.texture_intensity, r),
            world_vector: Vec3::lerp(v1.world_vector, v2.world_vector, r),
            normal: Vec3::lerp(v1.normal, v2.normal, r),
        }
    }
}

/// Addresses a polygon without borrowing it: the scene object, an LOD
/// slot (-1 for the main mesh) and the polygon index within it. Pool
/// slots can then be recycled with no dangling-reference risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolygonRef {
    pub object: ObjectId,
    pub lod: i8,
    pub polygon: u32,
}

impl Default for PolygonRef {
    fn default() -> Self {
        Self {
            object: ObjectId(0),
            lod: -1,
            polygon: 0,
        }
    }
}

/// A pool-allocated, frame-scoped triangle. Synthetic triangles are the
/// product of near-plane clipping and skip the static light cache due
/// to their ephemeral geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Triangle {
    pub vertices: [Vertex2d; 3],
    pub source: PolygonRef,
    pub fresnel_factor: f32,
    pub is_synthetic: bool,
    pub(crate) is_queued: bool,
}

impl Triangle {
    pub fn max_z(&self) -> f32 {
        self.vertices[0]
            .z
            .max(self.vertices[1].z)
            .max(self.vertices[2].z)
    }
}

/// One side of the double buffer: a fixed slot pool plus the queue of
/// slot indices emitted by the raster filter, in zone order.
pub struct TrianglePool {
    pub triangles: Vec<Triangle>,
    pub requested: usize,
    pub queue: Vec<u32>,
}

impl TrianglePool {
    fn new() -> Self {
        Self {
            triangles: vec![Triangle::default(); TRIANGLE_POOL_SIZE],
            requested: 0,
            queue: Vec::new(),
        }
    }

    /// Hands out the next slot. The pool must be sized for the peak
    /// scene; running out is fatal.
    pub fn request(&mut self) -> (u32, &mut Triangle) {
        if self.requested >= self.triangles.len() {
            fatal(EngineError::Capacity("triangle pool overflow"));
        }

        let index = self.requested;

        self.requested += 1;

        let triangle = &mut self.triangles[index];

        triangle.is_queued = false;

        (index as u32, triangle)
    }

    /// Queues a slot for rendering once the raster filter has let it
    /// through.
    pub fn buffer(&mut self, index: u32) {
        self.triangles[index as usize].is_queued = true;
        self.queue.push(index);
    }
}

/// Double-buffered pool + queue pair. The projector writes the primary
/// side while the renderer consumes the secondary; the flip bit swaps
/// roles at each frame boundary, so a triangle is never mutated by one
/// pipeline stage while the other reads it.
///
/// In single-threaded mode the swap still occurs, at no cost and no
/// utility.
pub struct TriangleBuffer {
    pools: [Mutex<TrianglePool>; 2],
    is_swapped: AtomicBool,
}

impl Default for TriangleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TriangleBuffer {
    pub fn new() -> Self {
        Self {
            pools: [Mutex::new(TrianglePool::new()), Mutex::new(TrianglePool::new())],
            is_swapped: AtomicBool::new(false),
        }
    }

    fn primary_index(&self) -> usize {
        self.is_swapped.load(Ordering::Acquire) as usize
    }

    /// The side the projector fills this frame. Held only by the main
    /// thread.
    pub fn primary(&self) -> std::sync::MutexGuard<'_, TrianglePool> {
        self.pools[self.primary_index()].lock().unwrap()
    }

    /// The side filled last frame, consumed by the renderer.
    pub fn secondary(&self) -> std::sync::MutexGuard<'_, TrianglePool> {
        self.pools[1 - self.primary_index()].lock().unwrap()
    }

    /// Frame-boundary swap: flips the buffers, then prepares the new
    /// primary side for projection.
    pub fn reset(&self) {
        self.is_swapped
            .store(!self.is_swapped.load(Ordering::Acquire), Ordering::Release);

        let mut primary = self.primary();

        primary.requested = 0;
        primary.queue.clear();
    }

    /// Clears both sides; used when switching scenes.
    pub fn reset_all(&self) {
        for pool in &self.pools {
            let mut pool = pool.lock().unwrap();

            pool.requested = 0;
            pool.queue.clear();
        }

        self.is_swapped.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_reads_what_the_projector_wrote_last_frame() {
        let buffer = TriangleBuffer::new();
        let written: Vec<u32> = {
            let mut pool = buffer.primary();
            let mut written = Vec::new();

            for _ in 0..5 {
                let (index, triangle) = pool.request();

                triangle.fresnel_factor = index as f32;
                written.push(index);
            }

            for &index in &written {
                pool.buffer(index);
            }

            written
        };

        buffer.reset();

        let pool = buffer.secondary();

        assert_eq!(pool.queue, written);
        assert_eq!(pool.requested, 5);
        assert!(pool.queue.iter().all(|&i| pool.triangles[i as usize].is_queued));
    }

    #[test]
    fn reset_prepares_a_fresh_primary_side() {
        let buffer = TriangleBuffer::new();

        {
            let mut pool = buffer.primary();
            let (index, _) = pool.request();

            pool.buffer(index);
        }

        buffer.reset();

        let primary = buffer.primary();

        assert_eq!(primary.requested, 0);
        assert!(primary.queue.is_empty());
    }

    #[test]
    fn request_recycles_slots_in_order() {
        let buffer = TriangleBuffer::new();
        let mut pool = buffer.primary();

        let (first, _) = pool.request();
        let (second, _) = pool.request();

        assert_eq!((first, second), (0, 1));

        pool.requested = 0;

        let (again, triangle) = pool.request();

        assert_eq!(again, 0);
        assert!(!triangle.is_queued);
    }
}
