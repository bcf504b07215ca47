use std::io::{BufReader, Read, Seek};

use anyhow::Context;

use crate::assets::loader::{LoadOpts, Transparency};
use crate::foundation::core::{Argb32, Bitmap};
use crate::foundation::error::{TexprepError, TexprepResult};
use crate::foundation::math::expand_sample_to_u8;

pub(crate) const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// How [`ImageLoader::load_png`](crate::ImageLoader::load_png) treats the target bitmap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PngLoadMode {
    /// Replace the bitmap with the decoded image.
    #[default]
    Replace,
    /// Use the PNG as an alpha mask for an already-loaded bitmap of the same size; RGB is kept.
    OverlayAlpha,
}

/// Succeeds when the stream starts with the PNG signature.
pub(crate) fn verify_header<R: Read>(stream: &mut R) -> TexprepResult<()> {
    let mut sig = [0u8; PNG_SIGNATURE.len()];
    stream
        .read_exact(&mut sig)
        .map_err(|_| TexprepError::decode("truncated PNG signature"))?;
    if sig != PNG_SIGNATURE {
        return Err(TexprepError::decode("missing PNG signature"));
    }
    Ok(())
}

/// Decode a PNG into a fresh ARGB bitmap, reporting whether any pixel is non-opaque.
pub(crate) fn read_bitmap<R: Read + Seek>(
    stream: &mut R,
    opts: &LoadOpts,
) -> TexprepResult<(Bitmap, Transparency)> {
    let mut reader =
        image::ImageReader::with_format(BufReader::new(stream), image::ImageFormat::Png);
    let mut limits = image::Limits::default();
    limits.max_alloc = Some(opts.max_decode_bytes as u64);
    reader.limits(limits);

    let rgba = reader.decode().context("decode PNG image")?.to_rgba8();
    let (width, height) = rgba.dimensions();
    opts.check_dimensions(width, height)?;

    let mut accum = 0xffu8;
    let pixels = rgba
        .pixels()
        .map(|p| {
            accum &= p[3];
            Argb32::new(p[3], p[0], p[1], p[2])
        })
        .collect();

    let bitmap = Bitmap::from_pixels(width, height, pixels)?;
    Ok((bitmap, Transparency::from_accumulated_alpha(accum)))
}

/// PNG colour types; the set is fixed by the format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PngColor {
    Palette,
    Gray,
    GrayAlpha,
    Truecolor,
    TruecolorAlpha,
}

impl PngColor {
    fn samples(self) -> usize {
        match self {
            Self::Palette | Self::Gray => 1,
            Self::GrayAlpha => 2,
            Self::Truecolor => 3,
            Self::TruecolorAlpha => 4,
        }
    }
}

impl From<::png::ColorType> for PngColor {
    fn from(c: ::png::ColorType) -> Self {
        match c {
            ::png::ColorType::Indexed => Self::Palette,
            ::png::ColorType::Grayscale => Self::Gray,
            ::png::ColorType::GrayscaleAlpha => Self::GrayAlpha,
            ::png::ColorType::Rgb => Self::Truecolor,
            ::png::ColorType::Rgba => Self::TruecolorAlpha,
        }
    }
}

/// One Adam7 pass: sub-image size and the mapping back to image coordinates.
#[derive(Clone, Copy, Debug)]
struct Pass {
    x_bias: u32,
    y_bias: u32,
    x_shift: u32,
    y_shift: u32,
}

const ADAM7: [Pass; 7] = [
    Pass::new(7, 7, 3, 3),
    Pass::new(3, 7, 3, 3),
    Pass::new(3, 3, 2, 3),
    Pass::new(1, 3, 2, 2),
    Pass::new(1, 1, 1, 2),
    Pass::new(0, 1, 1, 1),
    Pass::new(0, 0, 0, 1),
];

const SINGLE_PASS: Pass = Pass::new(0, 0, 0, 0);

impl Pass {
    const fn new(x_bias: u32, y_bias: u32, x_shift: u32, y_shift: u32) -> Self {
        Self {
            x_bias,
            y_bias,
            x_shift,
            y_shift,
        }
    }

    fn size(self, width: u32, height: u32) -> (u32, u32) {
        (
            (width + self.x_bias) >> self.x_shift,
            (height + self.y_bias) >> self.y_shift,
        )
    }

    fn image_x(self, x: u32) -> u32 {
        (x << self.x_shift) + ((1 << self.x_shift) - self.x_bias - 1)
    }

    fn image_y(self, y: u32) -> u32 {
        (y << self.y_shift) + ((1 << self.y_shift) - self.y_bias - 1)
    }
}

/// Unpack a (possibly sub-byte) row into one byte per sample. Grayscale samples are scaled to
/// 0..=255; palette indices are kept as-is.
fn unpack_row(data: &[u8], count: usize, bits: u8, color: PngColor, out: &mut Vec<u8>) {
    out.clear();
    if bits == 8 {
        out.extend_from_slice(&data[..count.min(data.len())]);
        return;
    }
    let bits = usize::from(bits);
    let mask = (1u16 << bits) as u8 - 1;
    for i in 0..count {
        let bit = i * bits;
        let Some(&byte) = data.get(bit / 8) else {
            break;
        };
        let v = (byte >> (8 - bits - bit % 8)) & mask;
        out.push(match color {
            PngColor::Palette => v,
            _ => expand_sample_to_u8(v, bits as u8),
        });
    }
}

/// Alpha for one unpacked pixel. Colour types with an alpha sample use it directly instead of
/// the gray value or RGB brightness, so "opaque" means the PNG's own alpha is 0xff.
fn pixel_alpha(color: PngColor, px: &[u8], palette: &[u8]) -> TexprepResult<u8> {
    Ok(match color {
        PngColor::Palette => {
            let at = usize::from(px[0]) * 3;
            let rgb = palette
                .get(at..at + 3)
                .ok_or_else(|| TexprepError::decode("PNG palette index out of range"))?;
            Argb32::opaque(rgb[0], rgb[1], rgb[2]).brightness()
        }
        PngColor::Gray => px[0],
        PngColor::GrayAlpha => px[1],
        PngColor::Truecolor => Argb32::opaque(px[0], px[1], px[2]).brightness(),
        PngColor::TruecolorAlpha => px[3],
    })
}

/// Decode a PNG as an alpha plane and copy it into `bitmap`'s alpha channel.
///
/// The PNG must match the bitmap's size and be at most 8 bits per sample. The whole plane is
/// decoded before the bitmap is touched, so a failure leaves it unchanged.
pub(crate) fn overlay_alpha<R: Read>(
    bitmap: &mut Bitmap,
    stream: &mut R,
    opts: &LoadOpts,
) -> TexprepResult<Transparency> {
    let limits = ::png::Limits {
        bytes: opts.max_decode_bytes,
    };
    let mut decoder = ::png::Decoder::new_with_limits(BufReader::new(stream), limits);
    decoder.set_transformations(::png::Transformations::IDENTITY);
    let mut reader = decoder.read_info().context("read PNG header")?;

    let info = reader.info();
    let (width, height) = (info.width, info.height);
    let bits = info.bit_depth as u8;
    let color = PngColor::from(info.color_type);
    let interlaced = info.interlaced;
    let palette = info.palette.as_deref().unwrap_or_default().to_vec();

    if width != bitmap.width() || height != bitmap.height() {
        return Err(TexprepError::validation(format!(
            "alpha PNG is {width}x{height}, bitmap is {}x{}",
            bitmap.width(),
            bitmap.height()
        )));
    }
    if bits > 8 {
        return Err(TexprepError::unsupported(format!(
            "bit depth {bits} (8 bit max)"
        )));
    }

    let passes: &[Pass] = if interlaced { &ADAM7 } else { &[SINGLE_PASS] };
    let samples = color.samples();
    let mut alpha = vec![0u8; width as usize * height as usize];
    let mut unpacked = Vec::new();

    for &pass in passes {
        let (pass_w, pass_h) = pass.size(width, height);
        if pass_w == 0 || pass_h == 0 {
            continue;
        }
        for y in 0..pass_h {
            let row = reader
                .next_row()
                .context("decode PNG row")?
                .ok_or_else(|| TexprepError::decode("PNG image data ended early"))?;
            let count = pass_w as usize * samples;
            unpack_row(row.data(), count, bits, color, &mut unpacked);
            if unpacked.len() < count {
                return Err(TexprepError::decode("short PNG row"));
            }

            let iy = pass.image_y(y) as usize;
            for (x, px) in unpacked.chunks_exact(samples).enumerate() {
                let ix = pass.image_x(x as u32) as usize;
                alpha[iy * width as usize + ix] = pixel_alpha(color, px, &palette)?;
            }
        }
    }

    let mut accum = 0xffu8;
    for y in 0..height {
        let src = &alpha[(y * width) as usize..((y + 1) * width) as usize];
        for (dst, &a) in bitmap.row_mut(y).iter_mut().zip(src) {
            accum &= a;
            *dst = dst.with_alpha(a);
        }
    }

    Ok(Transparency::from_accumulated_alpha(accum))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/png.rs"]
mod tests;
