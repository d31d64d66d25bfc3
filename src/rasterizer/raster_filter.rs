use crate::maths::Coordinate;

use super::triangle_buffer::Triangle;

pub const MAX_RASTER_FILTER_ZONES: usize = 50;
pub const RASTER_FILTER_ZONE_RANGE: f32 = 250.0;
pub const MIN_COVER_TRIANGLE_SIZE: i32 = 150;

/// The screen coverage of a larger triangle capable of occluding
/// triangles in zones behind it, valid for the remainder of the frame.
#[derive(Debug, Clone, Copy)]
pub struct Cover {
    c0: Coordinate,
    c1: Coordinate,
    c2: Coordinate,
    zone: usize,
    is_clockwise: bool,
}

/// Receives projected triangles into depth-bucketed zones and dispenses
/// them in zone order, suppressing triangles fully hidden behind closer
/// covers. Runs on the projector thread only.
pub struct RasterFilter {
    zones: Vec<Vec<u32>>,
    covers: Vec<Cover>,
    current_zone_index: usize,
    highest_zone_index: usize,
    current_element_index: usize,
    raster_width: i32,
    raster_height: i32,
}

impl RasterFilter {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            zones: (0..MAX_RASTER_FILTER_ZONES).map(|_| Vec::new()).collect(),
            covers: Vec::new(),
            current_zone_index: 0,
            highest_zone_index: 0,
            current_element_index: 0,
            raster_width: width as i32,
            raster_height: height as i32,
        }
    }

    pub fn add_triangle(&mut self, index: u32, triangle: &Triangle, can_occlude_surfaces: bool) {
        let target_zone_index = (triangle.max_z() / RASTER_FILTER_ZONE_RANGE) as usize;
        let zone_index = target_zone_index.min(MAX_RASTER_FILTER_ZONES - 1);

        if zone_index > self.highest_zone_index {
            self.highest_zone_index = zone_index;
        }

        if can_occlude_surfaces && self.is_triangle_coverable(triangle) {
            self.add_cover(triangle, zone_index);
        }

        self.zones[zone_index].push(index);
    }

    fn add_cover(&mut self, triangle: &Triangle, zone: usize) {
        self.covers.push(Cover {
            c0: triangle.vertices[0].coordinate,
            c1: triangle.vertices[1].coordinate,
            c2: triangle.vertices[2].coordinate,
            zone,
            is_clockwise: Self::is_triangle_clockwise(triangle),
        });
    }

    fn is_point_inside_edge(x: i32, y: i32, ex1: i32, ey1: i32, ex2: i32, ey2: i32) -> bool {
        (x - ex1) * (ey2 - ey1) - (y - ey1) * (ex2 - ex1) >= 0
    }

    fn is_triangle_clockwise(triangle: &Triangle) -> bool {
        let c0 = triangle.vertices[0].coordinate;
        let c1 = triangle.vertices[1].coordinate;
        let c2 = triangle.vertices[2].coordinate;

        Self::is_point_inside_edge(c2.x, c2.y, c0.x, c0.y, c1.x, c1.y)
    }

    fn is_triangle_coverable(&self, triangle: &Triangle) -> bool {
        let c0 = triangle.vertices[0].coordinate;
        let c1 = triangle.vertices[1].coordinate;
        let c2 = triangle.vertices[2].coordinate;

        let min_x = c0.x.min(c1.x).min(c2.x);
        let max_x = c0.x.max(c1.x).max(c2.x);

        if (max_x - min_x) < MIN_COVER_TRIANGLE_SIZE {
            // Optimize for triangles too horizontally small
            return false;
        }

        let min_y = c0.y.min(c1.y).min(c2.y);
        let max_y = c0.y.max(c1.y).max(c2.y);

        if (max_y - min_y) < MIN_COVER_TRIANGLE_SIZE {
            // Optimize for triangles too vertically small
            return false;
        }

        // Ensure that the triangle extends far enough into the screen
        // that distant triangles are likely to be covered by it
        min_x < (self.raster_width - MIN_COVER_TRIANGLE_SIZE)
            && max_x > MIN_COVER_TRIANGLE_SIZE
            && min_y < (self.raster_height - MIN_COVER_TRIANGLE_SIZE)
            && max_y > MIN_COVER_TRIANGLE_SIZE
    }

    /// A triangle is hidden by a cover only when all three vertices lie
    /// strictly inside all three of the cover's directed edges.
    /// Clockwise here means clockwise in raster space with its inverted
    /// y axis, so the winding picks which edge order to walk.
    fn is_triangle_occluded(triangle: &Triangle, cover: &Cover) -> bool {
        for vertex in &triangle.vertices {
            let tc = vertex.coordinate;

            let outside = if cover.is_clockwise {
                // Compare against edges v0 -> v2, v2 -> v1, v1 -> v0
                Self::is_point_inside_edge(tc.x, tc.y, cover.c0.x, cover.c0.y, cover.c2.x, cover.c2.y)
                    || Self::is_point_inside_edge(tc.x, tc.y, cover.c2.x, cover.c2.y, cover.c1.x, cover.c1.y)
                    || Self::is_point_inside_edge(tc.x, tc.y, cover.c1.x, cover.c1.y, cover.c0.x, cover.c0.y)
            } else {
                // Compare against edges v0 -> v1, v1 -> v2, v2 -> v0
                Self::is_point_inside_edge(tc.x, tc.y, cover.c0.x, cover.c0.y, cover.c1.x, cover.c1.y)
                    || Self::is_point_inside_edge(tc.x, tc.y, cover.c1.x, cover.c1.y, cover.c2.x, cover.c2.y)
                    || Self::is_point_inside_edge(tc.x, tc.y, cover.c2.x, cover.c2.y, cover.c0.x, cover.c0.y)
            };

            if outside {
                return false;
            }
        }

        true
    }

    fn is_triangle_on_screen(&self, triangle: &Triangle) -> bool {
        let c0 = triangle.vertices[0].coordinate;
        let c1 = triangle.vertices[1].coordinate;
        let c2 = triangle.vertices[2].coordinate;

        let min_x = c0.x.min(c1.x).min(c2.x);
        let max_x = c0.x.max(c1.x).max(c2.x);

        if min_x >= self.raster_width || max_x < 0 {
            // Optimize for horizontally offscreen triangles
            return false;
        }

        let min_y = c0.y.min(c1.y).min(c2.y);
        let max_y = c0.y.max(c1.y).max(c2.y);

        min_y < self.raster_height && max_y > 0
    }

    fn is_triangle_visible(&self, triangle: &Triangle) -> bool {
        if !self.is_triangle_on_screen(triangle) {
            return false;
        }

        for cover in &self.covers {
            if cover.zone < self.current_zone_index && Self::is_triangle_occluded(triangle, cover) {
                return false;
            }
        }

        true
    }

    /// Emits the next visible triangle index, walking zones from the
    /// nearest upward. Drained zones clear as the cursor leaves them;
    /// exhaustion resets the filter and returns `None`.
    pub fn next(&mut self, triangles: &[Triangle]) -> Option<u32> {
        loop {
            let is_end_of_zone =
                self.current_element_index >= self.zones[self.current_zone_index].len();

            if is_end_of_zone {
                self.zones[self.current_zone_index].clear();
                self.current_element_index = 0;

                if self.current_zone_index < self.highest_zone_index {
                    self.current_zone_index += 1;
                    continue;
                }

                self.reset();

                return None;
            }

            let index = self.zones[self.current_zone_index][self.current_element_index];

            self.current_element_index += 1;

            if self.is_triangle_visible(&triangles[index as usize]) {
                return Some(index);
            }
        }
    }

    pub fn reset(&mut self) {
        self.current_zone_index = 0;
        self.highest_zone_index = 0;
        self.current_element_index = 0;

        self.covers.clear();
    }
}
