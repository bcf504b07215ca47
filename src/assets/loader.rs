use std::io::{Read, Seek};

use anyhow::Context;

use crate::assets::detect::{ImageFormat, detect_format};
use crate::assets::png::PngLoadMode;
use crate::assets::{dib, jpeg, png};
use crate::foundation::core::Bitmap;
use crate::foundation::error::{TexprepError, TexprepResult};

/// Decoder limits shared by every loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadOpts {
    /// Memory ceiling for a single decode, also the upper bound on `width * height * 4`.
    pub max_decode_bytes: usize,
}

impl Default for LoadOpts {
    fn default() -> Self {
        Self {
            max_decode_bytes: 128 * 1024 * 1024,
        }
    }
}

impl LoadOpts {
    /// Return options with a different decode memory ceiling.
    pub fn with_max_decode_bytes(mut self, bytes: usize) -> Self {
        self.max_decode_bytes = bytes;
        self
    }

    /// Parse options from a JSON object; missing fields keep their defaults.
    pub fn from_json(text: &str) -> TexprepResult<Self> {
        let opts = serde_json::from_str(text).context("parse loader options JSON")?;
        Ok(opts)
    }

    pub(crate) fn check_dimensions(&self, width: u32, height: u32) -> TexprepResult<()> {
        if width == 0 || height == 0 {
            return Err(TexprepError::decode(format!(
                "image has empty dimensions {width}x{height}"
            )));
        }
        let bytes = u64::from(width) * u64::from(height) * 4;
        if bytes > self.max_decode_bytes as u64 {
            return Err(TexprepError::validation(format!(
                "{width}x{height} image needs {bytes} bytes, limit is {}",
                self.max_decode_bytes
            )));
        }
        Ok(())
    }
}

/// Whether a load produced any pixel with alpha below 0xff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Transparency {
    /// Every written alpha value was 0xff.
    Opaque,
    /// At least one pixel is not fully opaque; downstream alpha testing is needed.
    Transparent,
}

impl Transparency {
    /// Classify the bitwise AND of every alpha value written.
    pub fn from_accumulated_alpha(accum: u8) -> Self {
        if accum == 0xff {
            Self::Opaque
        } else {
            Self::Transparent
        }
    }

    /// `true` for [`Transparency::Transparent`].
    pub fn has_alpha(self) -> bool {
        self == Self::Transparent
    }
}

/// Entry point for format detection and image loading.
///
/// Replacing loads (`load_dib`, `load_jpeg`, `load_png` in [`PngLoadMode::Replace`], `load`)
/// reset the target bitmap first and leave it reset on failure. An alpha overlay never touches
/// the bitmap unless it succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageLoader {
    opts: LoadOpts,
}

impl ImageLoader {
    /// Loader with the given limits.
    pub fn new(opts: LoadOpts) -> Self {
        Self { opts }
    }

    /// Limits in effect.
    pub fn opts(&self) -> &LoadOpts {
        &self.opts
    }

    /// Same as [`detect_format`].
    pub fn detect<R: Read + Seek>(&self, stream: &mut R) -> ImageFormat {
        detect_format(stream)
    }

    /// Load an uncompressed Microsoft DIB.
    #[tracing::instrument(skip_all)]
    pub fn load_dib<R: Read + Seek>(
        &self,
        bitmap: &mut Bitmap,
        stream: &mut R,
    ) -> TexprepResult<()> {
        bitmap.reset();
        let loaded = dib::read_bitmap(stream, &self.opts);
        replace_or_reset(bitmap, loaded, "Microsoft DIB")
    }

    /// Load a gray or RGB JPEG; alpha is always opaque.
    #[tracing::instrument(skip_all)]
    pub fn load_jpeg<R: Read>(&self, bitmap: &mut Bitmap, stream: &mut R) -> TexprepResult<()> {
        bitmap.reset();
        let loaded = jpeg::read_bitmap(stream, &self.opts);
        replace_or_reset(bitmap, loaded, "JPEG")
    }

    /// Load a PNG, either replacing `bitmap` or applying it as an alpha mask.
    #[tracing::instrument(skip(self, bitmap, stream))]
    pub fn load_png<R: Read + Seek>(
        &self,
        bitmap: &mut Bitmap,
        stream: &mut R,
        mode: PngLoadMode,
    ) -> TexprepResult<Transparency> {
        match mode {
            PngLoadMode::Replace => {
                bitmap.reset();
                match png::read_bitmap(stream, &self.opts) {
                    Ok((loaded, transparency)) => {
                        *bitmap = loaded;
                        Ok(transparency)
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "error reading PNG file");
                        bitmap.reset();
                        Err(err)
                    }
                }
            }
            PngLoadMode::OverlayAlpha => {
                let applied = png::overlay_alpha(bitmap, stream, &self.opts);
                if let Err(err) = &applied {
                    tracing::error!(error = %err, "error applying PNG alpha");
                }
                applied
            }
        }
    }

    /// Detect the format, then run the matching replacing loader.
    ///
    /// DIB and JPEG loads report [`Transparency::Opaque`] unless a 32-bit DIB carries alpha.
    #[tracing::instrument(skip_all)]
    pub fn load<R: Read + Seek>(
        &self,
        bitmap: &mut Bitmap,
        stream: &mut R,
    ) -> TexprepResult<Transparency> {
        match self.detect(stream) {
            ImageFormat::Png => self.load_png(bitmap, stream, PngLoadMode::Replace),
            ImageFormat::Jpeg => self
                .load_jpeg(bitmap, stream)
                .map(|()| Transparency::Opaque),
            ImageFormat::Dib => {
                self.load_dib(bitmap, stream)?;
                Ok(scan_transparency(bitmap))
            }
            ImageFormat::Unknown => {
                bitmap.reset();
                let err = TexprepError::validation("unrecognised image format");
                tracing::error!(error = %err, "cannot load image");
                Err(err)
            }
        }
    }
}

fn replace_or_reset(
    bitmap: &mut Bitmap,
    loaded: TexprepResult<Bitmap>,
    what: &str,
) -> TexprepResult<()> {
    match loaded {
        Ok(loaded) => {
            *bitmap = loaded;
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %err, "error reading {what} file");
            bitmap.reset();
            Err(err)
        }
    }
}

fn scan_transparency(bitmap: &Bitmap) -> Transparency {
    let accum = (0..bitmap.height())
        .flat_map(|y| bitmap.row(y).iter())
        .fold(0xffu8, |acc, px| acc & px.a());
    Transparency::from_accumulated_alpha(accum)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
