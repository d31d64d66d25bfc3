use std::path::PathBuf;

use crate::maths::Color;

pub const COLOR_KEY_TRANSPARENT: Color = Color::new(255, 0, 255);

/// Index into the scene's texture arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u32);

#[derive(Debug, Clone)]
struct MipLevel {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl MipLevel {
    /// 2x2 box filter into a half-size level. Alpha participates in the
    /// average so color-keyed regions stay mostly transparent.
    fn downsized(&self) -> MipLevel {
        let width = self.width >> 1;
        let height = self.height >> 1;
        let mut pixels = vec![0u32; (width * height) as usize];

        for y in 0..height {
            for x in 0..width {
                let mut sums = [0u32; 4];

                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let source = self.pixels[((y * 2 + dy) * self.width + x * 2 + dx) as usize];

                    sums[0] += source >> 24;
                    sums[1] += (source >> 16) & 0xff;
                    sums[2] += (source >> 8) & 0xff;
                    sums[3] += source & 0xff;
                }

                pixels[(y * width + x) as usize] = ((sums[0] / 4) << 24)
                    | ((sums[1] / 4) << 16)
                    | ((sums[2] / 4) << 8)
                    | (sums[3] / 4);
            }
        }

        MipLevel {
            width,
            height,
            pixels,
        }
    }
}

/// A deferred-loaded image surface with a precomputed mipmap chain.
///
/// Sampling an unconfirmed (or failed) texture returns transparent
/// black; the color key (255, 0, 255) decodes to transparent texels.
#[derive(Debug, Clone)]
pub struct Texture {
    file: PathBuf,
    is_confirmed: bool,
    mipmaps: Vec<MipLevel>,
}

impl Texture {
    pub fn new<P: Into<PathBuf>>(file: P) -> Self {
        Self {
            file: file.into(),
            is_confirmed: false,
            mipmaps: Vec::new(),
        }
    }

    /// Builds a ready-to-sample texture from a tightly packed ARGB8888
    /// surface, generating its mipmap chain immediately.
    pub fn from_argb(width: u32, height: u32, pixels: Vec<u32>) -> Self {
        let mut texture = Self {
            file: PathBuf::new(),
            is_confirmed: true,
            mipmaps: Vec::new(),
        };

        texture.install_pixels(width, height, pixels);

        texture
    }

    pub fn is_confirmed(&self) -> bool {
        self.is_confirmed
    }

    /// Loads the image and generates the mipmap chain on first call.
    /// A missing file leaves the texture confirmed-but-empty; sampling
    /// then falls back to transparent black.
    pub fn confirm(&mut self) {
        if self.is_confirmed {
            return;
        }

        self.is_confirmed = true;

        let image = match image::open(&self.file) {
            Ok(image) => image.to_rgba8(),
            Err(error) => {
                log::warn!("could not load texture {}: {error}", self.file.display());
                return;
            }
        };

        let (width, height) = image.dimensions();
        let key = COLOR_KEY_TRANSPARENT;
        let mut pixels = Vec::with_capacity((width * height) as usize);

        for pixel in image.pixels() {
            let [r, g, b, _] = pixel.0;

            if r == key.r && g == key.g && b == key.b {
                pixels.push(0);
            } else {
                pixels.push(Color::new(r, g, b).to_argb());
            }
        }

        self.install_pixels(width, height, pixels);
    }

    fn install_pixels(&mut self, width: u32, height: u32, pixels: Vec<u32>) {
        let mut level = MipLevel {
            width,
            height,
            pixels,
        };

        while level.width > 2 && level.height > 2 {
            let next = level.downsized();

            self.mipmaps.push(level);
            level = next;
        }

        self.mipmaps.push(level);
    }

    pub fn level_count(&self) -> usize {
        self.mipmaps.len()
    }

    pub fn mipmap_width(&self, level: usize) -> u32 {
        self.mipmaps.get(level).map_or(0, |mip| mip.width)
    }

    pub fn mipmap_height(&self, level: usize) -> u32 {
        self.mipmaps.get(level).map_or(0, |mip| mip.height)
    }

    /// Samples the given mipmap at repeat-wrapped uv. Returns ARGB with
    /// zero alpha for transparent or unavailable texels.
    pub fn sample(&self, u: f32, v: f32, level: usize) -> u32 {
        if self.mipmaps.is_empty() || !u.is_finite() || !v.is_finite() {
            return 0;
        }

        let mip = &self.mipmaps[level.min(self.mipmaps.len() - 1)];
        let u = u - u.floor();
        let v = v - v.floor();
        let x = ((u * mip.width as f32) as u32).min(mip.width - 1);
        let y = ((v * mip.height as f32) as u32).min(mip.height - 1);

        mip.pixels[(y * mip.width + x) as usize]
    }
}
