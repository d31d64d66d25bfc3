use std::sync::Arc;

use crate::maths::{Color, Range, Vec2, Vec3, lerp};
use crate::scene::{Scene, TextureId};

use super::buffers::FrameBuffers;
use super::triangle_buffer::{Triangle, Vertex2d};

pub const MIPMAP_DISTANCE_INTERVAL: f32 = 800.0;

/// One horizontal run of a triangle, queued by the dispatch phase and
/// painted by the scanline phase. Attribute ranges interpolate from the
/// left endpoint to the right.
#[derive(Debug, Clone)]
pub struct Scanline {
    pub x: i32,
    pub y: i32,
    pub length: i32,
    pub color: Range<Color>,
    pub inverse_depth: Range<f32>,
    pub perspective_uv: Range<Vec2>,
    pub texture_intensity: Range<Vec3>,
    pub texture: Option<TextureId>,
}

/// Converts buffered triangles into scanlines (serial) and paints them
/// into the frame buffers (parallelizable by row).
pub struct Rasterizer {
    buffers: Arc<FrameBuffers>,
    scanlines: Vec<Scanline>,
    background_color: Color,
    visibility: i32,
    width: i32,
    height: i32,
}

impl Rasterizer {
    pub fn new(buffers: Arc<FrameBuffers>) -> Self {
        let width = buffers.width() as i32;
        let height = buffers.height() as i32;

        Self {
            buffers,
            scanlines: Vec::new(),
            background_color: Color::BLACK,
            visibility: crate::scene::MAX_VISIBILITY,
            width,
            height,
        }
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background_color = color;
    }

    pub fn set_visibility(&mut self, visibility: i32) {
        self.visibility = visibility;
    }

    pub fn scanlines(&self) -> &[Scanline] {
        &self.scanlines
    }

    pub fn total_buffered_scanlines(&self) -> usize {
        self.scanlines.len()
    }

    pub fn clear_scanlines(&mut self) {
        self.scanlines.clear();
    }

    /// Splits a triangle into flat-top/flat-bottom halves and queues one
    /// scanline per covered screen row. Triangles sharing a single row
    /// take the trivial paths with no mid-vertex synthesis.
    pub fn dispatch_triangle(&mut self, triangle: &Triangle, texture: Option<TextureId>) {
        let mut top = &triangle.vertices[0];
        let mut middle = &triangle.vertices[1];
        let mut bottom = &triangle.vertices[2];

        if top.coordinate.y > middle.coordinate.y {
            std::mem::swap(&mut top, &mut middle);
        }

        if middle.coordinate.y > bottom.coordinate.y {
            std::mem::swap(&mut middle, &mut bottom);
        }

        if top.coordinate.y > middle.coordinate.y {
            std::mem::swap(&mut top, &mut middle);
        }

        if top.coordinate.y >= self.height || bottom.coordinate.y < 0 {
            // Optimize for vertically offscreen triangles
            return;
        }

        if top.coordinate.y == middle.coordinate.y {
            // Trivial case #1: a flat top edge
            if top.coordinate.x > middle.coordinate.x {
                std::mem::swap(&mut top, &mut middle);
            }

            self.dispatch_flat_triangle(bottom, top, middle, texture);
        } else if bottom.coordinate.y == middle.coordinate.y {
            // Trivial case #2: a flat bottom edge
            if bottom.coordinate.x < middle.coordinate.x {
                std::mem::swap(&mut bottom, &mut middle);
            }

            self.dispatch_flat_triangle(top, middle, bottom, texture);
        } else {
            // Nontrivial case: split into a flat-bottom and a flat-top
            // half by synthesizing a vertex on the long edge, level with
            // the middle vertex.
            let hypotenuse_slope = (bottom.coordinate.y - top.coordinate.y) as f32
                / (bottom.coordinate.x - top.coordinate.x) as f32;
            let middle_y_progress = (middle.coordinate.y - top.coordinate.y) as f32
                / (bottom.coordinate.y - top.coordinate.y) as f32;

            let mut hypotenuse_vertex = Vertex2d::lerp(top, bottom, middle_y_progress);

            hypotenuse_vertex.coordinate.x = top.coordinate.x
                + ((middle.coordinate.y - top.coordinate.y) as f32 / hypotenuse_slope) as i32;
            hypotenuse_vertex.coordinate.y = middle.coordinate.y;

            let mut middle_left = middle;
            let mut middle_right = &hypotenuse_vertex;

            if middle_left.coordinate.x > middle_right.coordinate.x {
                std::mem::swap(&mut middle_left, &mut middle_right);
            }

            self.dispatch_flat_triangle(top, middle_left, middle_right, texture);
            self.dispatch_flat_triangle(bottom, middle_left, middle_right, texture);
        }
    }

    /// Walks the rows of a flat triangle, interpolating each attribute
    /// from the lone corner toward the flat edge's two vertices.
    fn dispatch_flat_triangle(
        &mut self,
        corner: &Vertex2d,
        left: &Vertex2d,
        right: &Vertex2d,
        texture: Option<TextureId>,
    ) {
        let is_horizontally_offscreen = (corner.coordinate.x >= self.width
            && left.coordinate.x >= self.width)
            || (corner.coordinate.x < 0 && right.coordinate.x < 0);

        if is_horizontally_offscreen {
            return;
        }

        let triangle_height = (left.coordinate.y - corner.coordinate.y).abs();

        if triangle_height == 0 {
            return;
        }

        let top_y = corner.coordinate.y.min(left.coordinate.y);
        let start = top_y.max(0);
        let end = (top_y + triangle_height).min(self.height);
        let left_slope = triangle_height as f32 / (left.coordinate.x - corner.coordinate.x) as f32;
        let right_slope =
            triangle_height as f32 / (right.coordinate.x - corner.coordinate.x) as f32;
        let has_flat_top = corner.coordinate.y > left.coordinate.y;

        for y in start..end {
            let step = if has_flat_top {
                triangle_height - (y - top_y)
            } else {
                y - top_y
            };
            let progress = step as f32 / triangle_height as f32;
            let start_x = corner.coordinate.x + (step as f32 / left_slope) as i32;
            let end_x = corner.coordinate.x + (step as f32 / right_slope) as i32;

            self.scanlines.push(Scanline {
                x: start_x,
                y,
                length: end_x - start_x,
                color: Range {
                    start: Color::lerp(corner.color, left.color, progress),
                    end: Color::lerp(corner.color, right.color, progress),
                },
                inverse_depth: Range {
                    start: lerp(corner.inverse_depth, left.inverse_depth, progress),
                    end: lerp(corner.inverse_depth, right.inverse_depth, progress),
                },
                perspective_uv: Range {
                    start: Vec2::lerp(corner.perspective_uv, left.perspective_uv, progress),
                    end: Vec2::lerp(corner.perspective_uv, right.perspective_uv, progress),
                },
                texture_intensity: Range {
                    start: Vec3::lerp(corner.texture_intensity, left.texture_intensity, progress),
                    end: Vec3::lerp(corner.texture_intensity, right.texture_intensity, progress),
                },
                texture,
            });
        }
    }

    /// Paints one scanline. This is the innermost pixel loop of the
    /// renderer; every pixel steps the inverse depth, tests the depth
    /// buffer, and only then resolves its color.
    pub fn triangle_scanline(&self, scanline: &Scanline, scene: &Scene) {
        if scanline.y >= self.height || scanline.y < 0 || scanline.length == 0 {
            // Vertically offscreen and zero-length lines exit up front;
            // fully offscreen horizontal lines were already dropped at
            // dispatch.
            return;
        }

        let start = scanline.x.max(0);
        let end = (scanline.x + scanline.length).min(self.width - 1);
        let pixel_index_offset = (scanline.y * self.width) as usize;

        let depth_step =
            (scanline.inverse_depth.end - scanline.inverse_depth.start) / scanline.length as f32;
        let mut inverse_depth =
            scanline.inverse_depth.start + depth_step * (start - scanline.x) as f32;

        // Deriving a lerp update interval from the color change across
        // the line amortizes color interpolation; a counter outperforms
        // modulo in this loop.
        let color_delta = ((scanline.color.end.r as i32 - scanline.color.start.r as i32).abs()
            + (scanline.color.end.g as i32 - scanline.color.start.g as i32).abs()
            + (scanline.color.end.b as i32 - scanline.color.start.b as i32).abs())
            / 3;
        let lerp_interval = if color_delta > 0 {
            (scanline.length / color_delta).max(1)
        } else {
            scanline.length
        };
        let mut lerp_interval_counter = lerp_interval;
        let mut current_color = scanline.color.start.to_argb();

        let texture = scanline.texture.map(|id| scene.texture(id));

        for x in start..=end {
            let index = pixel_index_offset + x as usize;
            let pixel_inverse_depth = inverse_depth;

            inverse_depth += depth_step;

            if self.buffers.depth_at(index) >= pixel_inverse_depth {
                continue;
            }

            match texture {
                Some(texture) => {
                    // An unconfirmed or removed texture samples as
                    // transparent black, leaving the background through.
                    let Some(texture) = texture else {
                        continue;
                    };

                    let progress = (x - scanline.x) as f32 / scanline.length as f32;
                    let uv = Vec2::lerp(
                        scanline.perspective_uv.start,
                        scanline.perspective_uv.end,
                        progress,
                    ) / pixel_inverse_depth;
                    let pixel_depth = 1.0 / pixel_inverse_depth;
                    let level = (pixel_depth / MIPMAP_DISTANCE_INTERVAL) as usize;
                    let sample = texture.sample(uv.x, uv.y, level);

                    if sample >> 24 == 0 {
                        // Color-keyed or unavailable texel
                        continue;
                    }

                    let intensity = Vec3::lerp(
                        scanline.texture_intensity.start,
                        scanline.texture_intensity.end,
                        progress,
                    );
                    let mut color = Color::from_argb(sample).modulate(intensity);

                    let visibility_ratio =
                        (1.0 / (pixel_inverse_depth * self.visibility as f32)).min(1.0);

                    color = Color::lerp(color, self.background_color, visibility_ratio);

                    self.buffers.write(index, color.to_argb(), pixel_inverse_depth);
                }
                None => {
                    lerp_interval_counter += 1;

                    if lerp_interval_counter > lerp_interval || x == end {
                        let progress = (x - scanline.x) as f32 / scanline.length as f32;

                        current_color =
                            Color::lerp(scanline.color.start, scanline.color.end, progress)
                                .to_argb();
                        lerp_interval_counter = 0;
                    }

                    self.buffers.write(index, current_color, pixel_inverse_depth);
                }
            }
        }
    }

    /// Wireframe rendering: three lines per triangle straight into the
    /// pixel buffer, skipping illumination and scanlines entirely.
    pub fn triangle_outline(&self, triangle: &Triangle, argb: u32) {
        let [v0, v1, v2] = &triangle.vertices;

        self.buffers.draw_line(
            v0.coordinate.x,
            v0.coordinate.y,
            v1.coordinate.x,
            v1.coordinate.y,
            argb,
        );
        self.buffers.draw_line(
            v1.coordinate.x,
            v1.coordinate.y,
            v2.coordinate.x,
            v2.coordinate.y,
            argb,
        );
        self.buffers.draw_line(
            v2.coordinate.x,
            v2.coordinate.y,
            v0.coordinate.x,
            v0.coordinate.y,
            argb,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maths::Coordinate;

    fn flat_triangle(coords: [(i32, i32); 3], color: Color, inverse_depth: f32) -> Triangle {
        let mut triangle = Triangle::default();

        for (vertex, (x, y)) in triangle.vertices.iter_mut().zip(coords) {
            vertex.coordinate = Coordinate { x, y };
            vertex.color = color;
            vertex.inverse_depth = inverse_depth;
            vertex.z = 1.0 / inverse_depth;
        }

        triangle
    }

    fn rasterizer(width: usize, height: usize) -> Rasterizer {
        Rasterizer::new(Arc::new(FrameBuffers::new(width, height)))
    }

    #[test]
    fn dispatch_rejects_vertically_offscreen_triangles() {
        let mut rasterizer = rasterizer(100, 100);

        rasterizer.dispatch_triangle(
            &flat_triangle([(0, 120), (50, 130), (20, 150)], Color::BLACK, 0.01),
            None,
        );
        rasterizer.dispatch_triangle(
            &flat_triangle([(0, -50), (50, -40), (20, -10)], Color::BLACK, 0.01),
            None,
        );

        assert_eq!(rasterizer.total_buffered_scanlines(), 0);
    }

    #[test]
    fn single_row_triangle_emits_no_scanlines() {
        let mut rasterizer = rasterizer(100, 100);

        rasterizer.dispatch_triangle(
            &flat_triangle([(10, 50), (30, 50), (50, 50)], Color::BLACK, 0.01),
            None,
        );

        assert_eq!(rasterizer.total_buffered_scanlines(), 0);
    }

    #[test]
    fn dispatch_covers_the_triangle_span() {
        let mut rasterizer = rasterizer(100, 100);

        rasterizer.dispatch_triangle(
            &flat_triangle([(50, 10), (20, 60), (80, 60)], Color::new(255, 0, 0), 0.01),
            None,
        );

        let scanlines = rasterizer.scanlines();

        assert!(!scanlines.is_empty());
        assert!(scanlines.iter().all(|s| s.y >= 10 && s.y < 60));

        // Rows widen toward the flat bottom edge.
        let first = scanlines.iter().find(|s| s.y == 11).unwrap();
        let last = scanlines.iter().find(|s| s.y == 59).unwrap();

        assert!(last.length > first.length);
    }

    #[test]
    fn depth_test_keeps_the_nearer_pixel() {
        let mut rasterizer = rasterizer(100, 100);
        let scene = Scene::new();

        let far = flat_triangle([(0, 10), (0, 40), (90, 40)], Color::new(0, 0, 255), 0.005);
        let near = flat_triangle([(0, 10), (0, 40), (90, 40)], Color::new(0, 255, 0), 0.01);

        rasterizer.dispatch_triangle(&near, None);
        rasterizer.dispatch_triangle(&far, None);

        let scanlines: Vec<Scanline> = rasterizer.scanlines().to_vec();

        for scanline in &scanlines {
            rasterizer.triangle_scanline(scanline, &scene);
        }

        // The far triangle painted second cannot overwrite the near one.
        assert_eq!(rasterizer.buffers.pixel_at(10, 35), 0xff00ff00);
    }

    #[test]
    fn zero_length_scanline_is_skipped() {
        let rasterizer = rasterizer(100, 100);
        let scene = Scene::new();
        let scanline = Scanline {
            x: 10,
            y: 10,
            length: 0,
            color: Range {
                start: Color::new(255, 255, 255),
                end: Color::new(255, 255, 255),
            },
            inverse_depth: Range {
                start: 0.01,
                end: 0.01,
            },
            perspective_uv: Range {
                start: Vec2::default(),
                end: Vec2::default(),
            },
            texture_intensity: Range {
                start: Vec3::new(1.0, 1.0, 1.0),
                end: Vec3::new(1.0, 1.0, 1.0),
            },
            texture: None,
        };

        rasterizer.triangle_scanline(&scanline, &scene);

        assert_eq!(rasterizer.buffers.pixel_at(10, 10), 0);
    }

    #[test]
    fn scanline_clips_against_buffer_edges() {
        let rasterizer = rasterizer(100, 100);
        let scene = Scene::new();
        let scanline = Scanline {
            x: -20,
            y: 5,
            length: 200,
            color: Range {
                start: Color::new(200, 0, 0),
                end: Color::new(200, 0, 0),
            },
            inverse_depth: Range {
                start: 0.01,
                end: 0.01,
            },
            perspective_uv: Range {
                start: Vec2::default(),
                end: Vec2::default(),
            },
            texture_intensity: Range {
                start: Vec3::new(1.0, 1.0, 1.0),
                end: Vec3::new(1.0, 1.0, 1.0),
            },
            texture: None,
        };

        rasterizer.triangle_scanline(&scanline, &scene);

        assert_eq!(rasterizer.buffers.pixel_at(0, 5), 0xffc80000);
        assert_eq!(rasterizer.buffers.pixel_at(99, 5), 0xffc80000);
        assert_eq!(rasterizer.buffers.pixel_at(0, 4), 0);
    }

    #[test]
    fn color_interpolation_reaches_the_far_endpoint() {
        let rasterizer = rasterizer(100, 100);
        let scene = Scene::new();
        let scanline = Scanline {
            x: 0,
            y: 0,
            length: 99,
            color: Range {
                start: Color::new(0, 0, 0),
                end: Color::new(200, 200, 200),
            },
            inverse_depth: Range {
                start: 0.01,
                end: 0.01,
            },
            perspective_uv: Range {
                start: Vec2::default(),
                end: Vec2::default(),
            },
            texture_intensity: Range {
                start: Vec3::new(1.0, 1.0, 1.0),
                end: Vec3::new(1.0, 1.0, 1.0),
            },
            texture: None,
        };

        rasterizer.triangle_scanline(&scanline, &scene);

        // Within lerp-interval tolerance at both ends.
        let first = Color::from_argb(rasterizer.buffers.pixel_at(0, 0));
        let last = Color::from_argb(rasterizer.buffers.pixel_at(99, 0));

        assert!(first.r <= 16);
        assert_eq!(last.r, 200);
    }
}
