use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::error::EngineError;
use crate::rasterizer::FrameBuffers;

const PX: f32 = 14.0;
const BASE_X: usize = 10;
const BASE_Y: usize = 10;

/// Rasterizes HUD text straight into the pixel buffer. The glyph
/// coverage is folded in with a bitwise OR so text stays legible over
/// whatever the frame contains.
pub struct TextWriter {
    font: Font,
}

impl TextWriter {
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let bytes = std::fs::read(path)
            .map_err(|error| EngineError::Asset(format!("unable to load font {}: {error}", path.display())))?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|error| EngineError::Asset(format!("unable to parse font {}: {error}", path.display())))?;

        Ok(Self { font })
    }

    fn draw_line(&self, buffers: &FrameBuffers, line_index: usize, base_y: usize, text: &str) {
        let width = buffers.width();
        let height = buffers.height();
        let mut start_x = BASE_X;
        let start_y = base_y + line_index * PX as usize;

        for character in text.chars() {
            let (metrics, image) = self.font.rasterize(character, PX);

            if metrics.width > 0 {
                for (row, row_pixels) in image.chunks(metrics.width).enumerate() {
                    for (column, &coverage) in row_pixels.iter().enumerate() {
                        if coverage == 0 {
                            continue;
                        }

                        let x = metrics.xmin as isize + column as isize + start_x as isize;
                        let y = PX as isize - metrics.height as isize - metrics.ymin as isize
                            + row as isize
                            + start_y as isize;

                        if x >= 0 && (x as usize) < width && y >= 0 && (y as usize) < height {
                            let gray = (0x00ffffff_u32 * coverage as u32) / 255;

                            buffers.blend_pixel(
                                buffers.index(x as usize, y as usize),
                                0xff000000 | gray,
                            );
                        }
                    }
                }
            }

            start_x += metrics.advance_width.ceil() as usize;
        }
    }

    /// Draws a block of text lines from the top-left HUD corner.
    pub fn draw(&self, buffers: &FrameBuffers, text: &str) {
        for (line_index, line) in text.lines().enumerate() {
            self.draw_line(buffers, line_index, BASE_Y, line);
        }
    }

    /// Draws a single line anchored near the bottom of the raster area,
    /// used by the command prompt.
    pub fn draw_bottom_line(&self, buffers: &FrameBuffers, text: &str) {
        let base_y = buffers.height().saturating_sub(2 * PX as usize);

        self.draw_line(buffers, 0, base_y, text);
    }
}
