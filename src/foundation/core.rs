use crate::foundation::error::{TexprepError, TexprepResult};

pub use kurbo::{Line, Point, Rect, Vec2};

/// 32-bit ARGB pixel, one byte per channel (alpha in the top byte).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Argb32(pub u32);

impl Argb32 {
    /// Fully transparent black, the value out-of-range bilinear taps read as.
    pub const TRANSPARENT: Self = Self(0);

    /// Pack four channels.
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// Opaque pixel from three colour channels.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(0xff, r, g, b)
    }

    /// Alpha channel.
    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red channel.
    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel.
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel.
    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    /// Same colour with the alpha channel replaced.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self((self.0 & 0x00ff_ffff) | ((a as u32) << 24))
    }

    /// Luma-like brightness of the colour channels, ignoring alpha.
    pub fn brightness(self) -> u8 {
        let sum = u32::from(self.r()) * 222 + u32::from(self.g()) * 707 + u32::from(self.b()) * 71;
        (sum / 1000) as u8
    }
}

/// Owned ARGB raster with an explicit row stride.
///
/// `rowpixels >= width` always holds; the slots past `width` on each row are padding and are
/// never read by the resampler or written by the loaders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    rowpixels: u32,
    pixels: Vec<Argb32>,
}

impl Bitmap {
    /// Empty (invalid) bitmap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bitmap of the given size with tightly packed rows, cleared to transparent black.
    pub fn with_size(width: u32, height: u32) -> Self {
        let mut out = Self::new();
        out.allocate(width, height);
        out
    }

    /// Wrap tightly packed row-major pixels.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Argb32>) -> TexprepResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| TexprepError::validation("bitmap size overflow"))?;
        if pixels.len() != expected {
            return Err(TexprepError::validation(
                "bitmap pixels must match width*height",
            ));
        }
        Ok(Self {
            width,
            height,
            rowpixels: width,
            pixels,
        })
    }

    /// (Re)allocate to `width` x `height`, dropping previous content.
    pub fn allocate(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.rowpixels = width;
        self.pixels = vec![Argb32::TRANSPARENT; (width as usize) * (height as usize)];
    }

    /// (Re)allocate with a row stride wider than the visible width.
    pub fn allocate_with_rowpixels(
        &mut self,
        width: u32,
        height: u32,
        rowpixels: u32,
    ) -> TexprepResult<()> {
        if rowpixels < width {
            return Err(TexprepError::validation("rowpixels must be >= width"));
        }
        let len = (rowpixels as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| TexprepError::validation("bitmap size overflow"))?;
        self.width = width;
        self.height = height;
        self.rowpixels = rowpixels;
        self.pixels = vec![Argb32::TRANSPARENT; len];
        Ok(())
    }

    /// Release storage and return to the empty state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Visible width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Visible height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel slots per row in the backing storage.
    pub fn rowpixels(&self) -> u32 {
        self.rowpixels
    }

    /// True when the bitmap holds at least one pixel.
    pub fn valid(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.pixels.is_empty()
    }

    /// Pixel at row `y`, column `x`.
    ///
    /// Panics when out of range, like slice indexing.
    pub fn pix(&self, y: u32, x: u32) -> Argb32 {
        self.pixels[self.index(y, x)]
    }

    /// Mutable pixel at row `y`, column `x`.
    pub fn pix_mut(&mut self, y: u32, x: u32) -> &mut Argb32 {
        let idx = self.index(y, x);
        &mut self.pixels[idx]
    }

    /// Visible part of row `y`.
    pub fn row(&self, y: u32) -> &[Argb32] {
        let start = (y as usize) * (self.rowpixels as usize);
        &self.pixels[start..start + self.width as usize]
    }

    /// Mutable visible part of row `y`.
    pub fn row_mut(&mut self, y: u32) -> &mut [Argb32] {
        let start = (y as usize) * (self.rowpixels as usize);
        let width = self.width as usize;
        &mut self.pixels[start..start + width]
    }

    /// Set every visible pixel to `color`.
    pub fn fill(&mut self, color: Argb32) {
        for y in 0..self.height {
            self.row_mut(y).fill(color);
        }
    }

    fn index(&self, y: u32, x: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y as usize) * (self.rowpixels as usize) + (x as usize)
    }
}

/// Floating-point tint applied multiplicatively to sampled pixels; `a` also drives blending.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderColor {
    /// Alpha, in [0, 1].
    pub a: f32,
    /// Red, in [0, 1].
    pub r: f32,
    /// Green, in [0, 1].
    pub g: f32,
    /// Blue, in [0, 1].
    pub b: f32,
}

impl RenderColor {
    /// Identity tint.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Build a tint from alpha and colour channels.
    pub const fn new(a: f32, r: f32, g: f32, b: f32) -> Self {
        Self { a, r, g, b }
    }
}

impl Default for RenderColor {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
