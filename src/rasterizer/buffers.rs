use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

/// The CPU-resident render target: a 32-bit ARGB pixel plane and a
/// matching inverse-depth plane, both held as atomics so scanline
/// workers can write their disjoint rows without locking. Depth stores
/// f32 bits; larger inverse depth means nearer, and 0 is infinity.
pub struct FrameBuffers {
    width: usize,
    height: usize,
    pixels: Vec<AtomicU32>,
    depth: Vec<AtomicU32>,
}

pub const fn depth_to_bits(inverse_depth: f32) -> u32 {
    inverse_depth.to_bits()
}

impl FrameBuffers {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        let mut pixels = Vec::with_capacity(size);
        let mut depth = Vec::with_capacity(size);

        pixels.resize_with(size, || AtomicU32::new(0));
        depth.resize_with(size, || AtomicU32::new(0));

        Self {
            width,
            height,
            pixels,
            depth,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Resets every pixel to the background and every depth entry to
    /// infinity. Runs before any render stage touches the frame.
    pub fn clear(&self, background_argb: u32) {
        self.pixels
            .par_iter()
            .for_each(|pixel| pixel.store(background_argb, Ordering::Relaxed));
        self.depth
            .par_iter()
            .for_each(|depth| depth.store(depth_to_bits(0.0), Ordering::Relaxed));
    }

    pub fn depth_at(&self, index: usize) -> f32 {
        f32::from_bits(self.depth[index].load(Ordering::Relaxed))
    }

    pub fn write(&self, index: usize, argb: u32, inverse_depth: f32) {
        self.pixels[index].store(argb, Ordering::Relaxed);
        self.depth[index].store(depth_to_bits(inverse_depth), Ordering::Relaxed);
    }

    /// Pixel-only write used by the wireframe and HUD paths.
    pub fn write_pixel(&self, index: usize, argb: u32) {
        self.pixels[index].store(argb, Ordering::Relaxed);
    }

    pub fn blend_pixel(&self, index: usize, argb: u32) {
        self.pixels[index].fetch_or(argb, Ordering::Relaxed);
    }

    pub fn pixel_at(&self, x: usize, y: usize) -> u32 {
        self.pixels[self.index(x, y)].load(Ordering::Relaxed)
    }

    /// Copies the frame out for presentation, magnifying by an integer
    /// factor when the raster area runs at reduced resolution.
    pub fn present_into(&self, out: &mut [u32], size_factor: usize) {
        if size_factor == 1 {
            for (index, pixel) in self.pixels.iter().enumerate() {
                if index >= out.len() {
                    break;
                }

                out[index] = pixel.load(Ordering::Relaxed);
            }

            return;
        }

        let out_width = self.width * size_factor;

        for y in 0..self.height {
            for x in 0..self.width {
                let color = self.pixels[self.index(x, y)].load(Ordering::Relaxed);

                for dy in 0..size_factor {
                    for dx in 0..size_factor {
                        let out_index = (y * size_factor + dy) * out_width + x * size_factor + dx;

                        if out_index < out.len() {
                            out[out_index] = color;
                        }
                    }
                }
            }
        }
    }

    /// Plots a straight segment into the pixel plane, stepping by
    /// progress so steep and shallow lines cover evenly. Stops early
    /// once the line leaves the raster area for good.
    pub fn draw_line(&self, x1: i32, y1: i32, x2: i32, y2: i32, argb: u32) {
        let width = self.width as i32;
        let height = self.height as i32;
        let is_off_screen = x1.max(x2) < 0 || x1.min(x2) >= width || y1.max(y2) < 0 || y1.min(y2) >= height;

        if is_off_screen {
            return;
        }

        let delta_x = x2 - x1;
        let delta_y = y2 - y1;
        let is_going_left = delta_x < 0;
        let is_going_up = delta_y < 0;
        let total_pixels = delta_x.abs() + delta_y.abs();

        for i in 0..total_pixels {
            let progress = i as f32 / total_pixels as f32;
            let x = x1 + (delta_x as f32 * progress) as i32;
            let y = y1 + (delta_y as f32 * progress) as i32;

            let is_going_off_screen = (is_going_left && x < 0)
                || (!is_going_left && x >= width)
                || (is_going_up && y < 0)
                || (!is_going_up && y >= height);

            if is_going_off_screen {
                break;
            } else if x < 0 || x >= width || y < 0 || y >= height {
                continue;
            }

            self.write_pixel(self.index(x as usize, y as usize), argb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_pixels_and_depth() {
        let buffers = FrameBuffers::new(4, 4);

        buffers.write(5, 0xff00ff00, 0.5);
        buffers.clear(0xff101010);

        assert_eq!(buffers.pixel_at(1, 1), 0xff101010);
        assert_eq!(buffers.depth_at(5), 0.0);
    }

    #[test]
    fn present_scales_by_factor() {
        let buffers = FrameBuffers::new(2, 2);

        buffers.write_pixel(0, 0xffaa0000);

        let mut out = vec![0u32; 16];

        buffers.present_into(&mut out, 2);

        assert_eq!(out[0], 0xffaa0000);
        assert_eq!(out[1], 0xffaa0000);
        assert_eq!(out[4], 0xffaa0000);
        assert_eq!(out[5], 0xffaa0000);
        assert_eq!(out[2], 0);
    }

    #[test]
    fn line_stays_inside_bounds() {
        let buffers = FrameBuffers::new(8, 8);

        buffers.draw_line(-5, 3, 20, 3, 0xffffffff);

        for x in 0..8 {
            assert_eq!(buffers.pixel_at(x, 3), 0xffffffff);
        }
        assert_eq!(buffers.pixel_at(0, 2), 0);
    }
}
