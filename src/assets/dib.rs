//! Microsoft DIB (`.bmp`) reader for uncompressed 24, 32 and 48-bit images.

use std::io::{Read, Seek, SeekFrom};

use anyhow::Context;

use crate::assets::loader::LoadOpts;
use crate::foundation::core::{Argb32, Bitmap};
use crate::foundation::error::{TexprepError, TexprepResult};

const FILE_HEADER_SIZE: u32 = 14;
const CORE_HEADER_SIZE: u32 = 12;
const INFO_HEADER_SIZES: [u32; 5] = [40, 52, 56, 108, 124];

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;

struct FileHeader {
    pixel_offset: u32,
    header_size: u32,
}

#[derive(Clone, Copy, Debug)]
struct MaskInfo {
    mask: u32,
    shift: u32,
    max: u32,
}

impl MaskInfo {
    /// Contiguous, non-empty masks only (e.g. `0x00ff_0000`).
    fn new(mask: u32) -> Option<Self> {
        if mask == 0 {
            return None;
        }
        let shift = mask.trailing_zeros();
        let max = mask >> shift;
        if (max & max.wrapping_add(1)) != 0 {
            return None;
        }
        Some(Self { mask, shift, max })
    }

    fn extract(self, value: u32) -> u8 {
        let raw = u64::from((value & self.mask) >> self.shift);
        let max = u64::from(self.max);
        ((raw * 255 + max / 2) / max) as u8
    }
}

#[derive(Clone, Copy, Debug)]
enum PixelLayout {
    Bgr24,
    Bgra32,
    Bitfields32 {
        r: MaskInfo,
        g: MaskInfo,
        b: MaskInfo,
        a: Option<MaskInfo>,
    },
    Bgr48,
}

impl PixelLayout {
    fn bits(self) -> u32 {
        match self {
            Self::Bgr24 => 24,
            Self::Bgra32 | Self::Bitfields32 { .. } => 32,
            Self::Bgr48 => 48,
        }
    }
}

struct InfoHeader {
    width: u32,
    height: u32,
    top_down: bool,
    layout: PixelLayout,
}

fn le_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn le_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn le_i32(b: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn read_file_header<R: Read>(stream: &mut R) -> TexprepResult<FileHeader> {
    let mut raw = [0u8; FILE_HEADER_SIZE as usize + 4];
    stream
        .read_exact(&mut raw)
        .map_err(|_| TexprepError::decode("truncated DIB file header"))?;

    if &raw[0..2] != b"BM" {
        return Err(TexprepError::decode("missing BM signature"));
    }
    let pixel_offset = le_u32(&raw, 10);
    let header_size = le_u32(&raw, 14);

    if header_size != CORE_HEADER_SIZE && !INFO_HEADER_SIZES.contains(&header_size) {
        return Err(TexprepError::decode(format!(
            "unknown DIB header size {header_size}"
        )));
    }
    if pixel_offset < FILE_HEADER_SIZE + header_size {
        return Err(TexprepError::decode("DIB pixel data overlaps the headers"));
    }

    Ok(FileHeader {
        pixel_offset,
        header_size,
    })
}

/// Succeeds when the stream starts with a plausible DIB file and info header.
pub(crate) fn verify_header<R: Read>(stream: &mut R) -> TexprepResult<()> {
    read_file_header(stream).map(|_| ())
}

fn read_info_header<R: Read>(stream: &mut R, header_size: u32) -> TexprepResult<InfoHeader> {
    // the size field has already been consumed
    let mut raw = vec![0u8; header_size as usize - 4];
    stream
        .read_exact(&mut raw)
        .map_err(|_| TexprepError::decode("truncated DIB info header"))?;

    if header_size == CORE_HEADER_SIZE {
        let (width, height) = (u32::from(le_u16(&raw, 0)), u32::from(le_u16(&raw, 2)));
        if le_u16(&raw, 4) != 1 {
            return Err(TexprepError::decode("DIB must have exactly one plane"));
        }
        let layout = match le_u16(&raw, 6) {
            24 => PixelLayout::Bgr24,
            bits => {
                return Err(TexprepError::unsupported(format!("{bits}-bit core DIB")));
            }
        };
        return Ok(InfoHeader {
            width,
            height,
            top_down: false,
            layout,
        });
    }

    let width = le_i32(&raw, 0);
    let height = le_i32(&raw, 4);
    if width <= 0 || height == 0 {
        return Err(TexprepError::decode("DIB has empty dimensions"));
    }
    if le_u16(&raw, 8) != 1 {
        return Err(TexprepError::decode("DIB must have exactly one plane"));
    }
    let bits = le_u16(&raw, 10);
    let compression = le_u32(&raw, 12);

    let layout = match (bits, compression) {
        (24, BI_RGB) => PixelLayout::Bgr24,
        (32, BI_RGB) => PixelLayout::Bgra32,
        (48, BI_RGB) => PixelLayout::Bgr48,
        (32, BI_BITFIELDS) => {
            let masks = if header_size >= 52 {
                let a = if header_size >= 56 {
                    le_u32(&raw, 48)
                } else {
                    0
                };
                [le_u32(&raw, 36), le_u32(&raw, 40), le_u32(&raw, 44), a]
            } else {
                let mut extra = [0u8; 12];
                stream
                    .read_exact(&mut extra)
                    .map_err(|_| TexprepError::decode("truncated DIB colour masks"))?;
                [le_u32(&extra, 0), le_u32(&extra, 4), le_u32(&extra, 8), 0]
            };
            let channel = |m: u32| {
                MaskInfo::new(m)
                    .ok_or_else(|| TexprepError::unsupported("non-contiguous DIB colour mask"))
            };
            PixelLayout::Bitfields32 {
                r: channel(masks[0])?,
                g: channel(masks[1])?,
                b: channel(masks[2])?,
                a: MaskInfo::new(masks[3]),
            }
        }
        _ => {
            return Err(TexprepError::unsupported(format!(
                "{bits}-bit DIB with compression {compression}"
            )));
        }
    };

    Ok(InfoHeader {
        width: width.unsigned_abs(),
        height: height.unsigned_abs(),
        top_down: height < 0,
        layout,
    })
}

fn decode_row(layout: PixelLayout, src: &[u8], dst: &mut [Argb32]) {
    match layout {
        PixelLayout::Bgr24 => {
            for (d, s) in dst.iter_mut().zip(src.chunks_exact(3)) {
                *d = Argb32::opaque(s[2], s[1], s[0]);
            }
        }
        PixelLayout::Bgra32 => {
            for (d, s) in dst.iter_mut().zip(src.chunks_exact(4)) {
                *d = Argb32::new(s[3], s[2], s[1], s[0]);
            }
        }
        PixelLayout::Bitfields32 { r, g, b, a } => {
            for (d, s) in dst.iter_mut().zip(src.chunks_exact(4)) {
                let v = le_u32(s, 0);
                let alpha = a.map_or(0xff, |a| a.extract(v));
                *d = Argb32::new(alpha, r.extract(v), g.extract(v), b.extract(v));
            }
        }
        PixelLayout::Bgr48 => {
            // keep the high byte of each little-endian 16-bit sample
            for (d, s) in dst.iter_mut().zip(src.chunks_exact(6)) {
                *d = Argb32::opaque(s[5], s[3], s[1]);
            }
        }
    }
}

/// Read a complete DIB file from the stream's current position.
pub(crate) fn read_bitmap<R: Read + Seek>(
    stream: &mut R,
    opts: &LoadOpts,
) -> TexprepResult<Bitmap> {
    let start = stream
        .stream_position()
        .context("query DIB stream position")?;
    let file = read_file_header(stream)?;
    let info = read_info_header(stream, file.header_size)?;
    opts.check_dimensions(info.width, info.height)?;

    let row_bytes = (info.width as usize * info.layout.bits() as usize).div_ceil(32) * 4;
    stream
        .seek(SeekFrom::Start(start + u64::from(file.pixel_offset)))
        .context("seek to DIB pixel data")?;

    let mut bitmap = Bitmap::with_size(info.width, info.height);
    let mut row = vec![0u8; row_bytes];
    let mut alpha_seen = 0u8;
    for r in 0..info.height {
        stream
            .read_exact(&mut row)
            .map_err(|_| TexprepError::decode("truncated DIB pixel data"))?;
        let y = if info.top_down {
            r
        } else {
            info.height - 1 - r
        };
        let dst = bitmap.row_mut(y);
        decode_row(info.layout, &row, dst);
        alpha_seen |= dst.iter().fold(0, |acc, px| acc | px.a());
    }

    // 32-bit BI_RGB writers commonly leave the fourth byte zeroed; treat that as opaque.
    if matches!(info.layout, PixelLayout::Bgra32) && alpha_seen == 0 {
        for y in 0..info.height {
            for px in bitmap.row_mut(y) {
                *px = px.with_alpha(0xff);
            }
        }
    }

    Ok(bitmap)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/dib.rs"]
mod tests;
