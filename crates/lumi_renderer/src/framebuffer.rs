//! Output pixel buffer.

use std::path::Path;

use lumi_math::Vec3;

use crate::error::{TraceError, TraceResult};

/// Row-major RGB float image. Row 0 is the bottom of the picture.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec3>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec3::ZERO; width as usize * height as usize],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Linear index of `(x, y)`.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// `(x, y)` of a linear index.
    #[inline]
    pub fn coords(&self, index: usize) -> (u32, u32) {
        let width = self.width.max(1) as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    pub fn get(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Vec3) {
        let index = self.index(x, y);
        self.pixels[index] = color;
    }

    pub fn fill(&mut self, color: Vec3) {
        self.pixels.fill(color);
    }

    /// 8-bit RGBA, top row first, as image files and textures expect.
    ///
    /// Values are clamped to `[0, 1]`; no tone mapping is applied here.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let c = self.get(x, y).clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
                bytes.extend_from_slice(&[c.x.round() as u8, c.y.round() as u8, c.z.round() as u8, 255]);
            }
        }
        bytes
    }

    /// Write the buffer as a PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> TraceResult<()> {
        let image = image::RgbaImage::from_raw(self.width, self.height, self.to_rgba8()).ok_or_else(|| {
            TraceError::ImageSizeMismatch {
                width: self.width,
                height: self.height,
                expected: self.width as usize * self.height as usize,
                actual: self.pixels.len(),
            }
        })?;
        image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}
