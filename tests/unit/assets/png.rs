use std::io::Cursor;

use super::*;

const GRAY: u8 = 0;
const RGB: u8 = 2;
const PALETTE: u8 = 3;
const GRAY_ALPHA: u8 = 4;
const RGBA: u8 = 6;

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &b in bytes {
        crc ^= u32::from(b);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xedb8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

fn adler32(bytes: &[u8]) -> u32 {
    let (mut a, mut b) = (1u32, 0u32);
    for &x in bytes {
        a = (a + u32::from(x)) % 65521;
        b = (b + a) % 65521;
    }
    (b << 16) | a
}

/// zlib stream made of stored (uncompressed) deflate blocks.
fn zlib_stored(raw: &[u8]) -> Vec<u8> {
    let mut out = vec![0x78, 0x01];
    let mut chunks = raw.chunks(0xffff).peekable();
    if chunks.peek().is_none() {
        out.extend_from_slice(&[1, 0, 0, 0xff, 0xff]);
    }
    while let Some(chunk) = chunks.next() {
        out.push(u8::from(chunks.peek().is_none()));
        let len = chunk.len() as u16;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(!len).to_le_bytes());
        out.extend_from_slice(chunk);
    }
    out.extend_from_slice(&adler32(raw).to_be_bytes());
    out
}

fn push_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let start = out.len();
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let crc = crc32(&out[start..]);
    out.extend_from_slice(&crc.to_be_bytes());
}

fn channels(color_type: u8) -> usize {
    match color_type {
        GRAY | PALETTE => 1,
        GRAY_ALPHA => 2,
        RGB => 3,
        RGBA => 4,
        _ => unreachable!(),
    }
}

/// Filter-type-0 scanline for the given pixels (sample values, `channels` per pixel).
fn scanline(samples: &[u16], bit_depth: u8) -> Vec<u8> {
    let mut row = vec![0u8];
    match bit_depth {
        8 => row.extend(samples.iter().map(|&s| s as u8)),
        16 => {
            for &s in samples {
                row.extend_from_slice(&s.to_be_bytes());
            }
        }
        bits => {
            let per_byte = 8 / bits as usize;
            for group in samples.chunks(per_byte) {
                let mut byte = 0u8;
                for (i, &s) in group.iter().enumerate() {
                    byte |= (s as u8) << (8 - bits as usize * (i + 1));
                }
                row.push(byte);
            }
        }
    }
    row
}

/// Encode a PNG from row-major samples, optionally Adam7-interlaced.
fn encode_png(
    width: u32,
    height: u32,
    color_type: u8,
    bit_depth: u8,
    interlaced: bool,
    palette: &[u8],
    samples: &[u16],
) -> Vec<u8> {
    let ch = channels(color_type);
    assert_eq!(samples.len(), width as usize * height as usize * ch);

    let pixel = |x: u32, y: u32| {
        let at = (y as usize * width as usize + x as usize) * ch;
        &samples[at..at + ch]
    };

    let mut raw = Vec::new();
    let passes: &[(u32, u32, u32, u32)] = if interlaced {
        &[
            (0, 0, 8, 8),
            (4, 0, 8, 8),
            (0, 4, 4, 8),
            (2, 0, 4, 4),
            (0, 2, 2, 4),
            (1, 0, 2, 2),
            (0, 1, 1, 2),
        ]
    } else {
        &[(0, 0, 1, 1)]
    };
    for &(x0, y0, dx, dy) in passes {
        if x0 >= width || y0 >= height {
            continue;
        }
        for y in (y0..height).step_by(dy as usize) {
            let row: Vec<u16> = (x0..width)
                .step_by(dx as usize)
                .flat_map(|x| pixel(x, y).to_vec())
                .collect();
            raw.extend(scanline(&row, bit_depth));
        }
    }

    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[bit_depth, color_type, 0, 0, u8::from(interlaced)]);

    let mut out = PNG_SIGNATURE.to_vec();
    push_chunk(&mut out, b"IHDR", &ihdr);
    if !palette.is_empty() {
        push_chunk(&mut out, b"PLTE", palette);
    }
    push_chunk(&mut out, b"IDAT", &zlib_stored(&raw));
    push_chunk(&mut out, b"IEND", &[]);
    out
}

fn base_bitmap(width: u32, height: u32) -> Bitmap {
    let mut bitmap = Bitmap::with_size(width, height);
    for y in 0..height {
        for x in 0..width {
            *bitmap.pix_mut(y, x) = Argb32::opaque(x as u8 * 10, y as u8 * 10, 200);
        }
    }
    bitmap
}

fn overlay(bitmap: &mut Bitmap, data: &[u8]) -> TexprepResult<Transparency> {
    overlay_alpha(bitmap, &mut Cursor::new(data), &LoadOpts::default())
}

fn decode(data: &[u8]) -> TexprepResult<(Bitmap, Transparency)> {
    read_bitmap(&mut Cursor::new(data), &LoadOpts::default())
}

fn alphas(bitmap: &Bitmap) -> Vec<u8> {
    (0..bitmap.height())
        .flat_map(|y| bitmap.row(y).iter().map(|p| p.a()))
        .collect()
}

#[test]
fn verify_header_checks_signature() {
    let png = encode_png(1, 1, GRAY, 8, false, &[], &[0]);
    assert!(verify_header(&mut Cursor::new(&png)).is_ok());
    let mut wrong = Cursor::new(b"\x89PNX\r\n\x1a\n");
    assert!(verify_header(&mut wrong).is_err());
    assert!(verify_header(&mut Cursor::new(b"\x89PN")).is_err());
}

#[test]
fn replace_mode_decodes_rgba_straight_alpha() {
    let img = image::RgbaImage::from_raw(2, 1, vec![10, 20, 30, 255, 40, 50, 60, 128]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let (bitmap, transparency) = decode(&buf).unwrap();
    assert_eq!((bitmap.width(), bitmap.height()), (2, 1));
    assert_eq!(bitmap.pix(0, 0), Argb32::new(255, 10, 20, 30));
    assert_eq!(bitmap.pix(0, 1), Argb32::new(128, 40, 50, 60));
    assert_eq!(transparency, Transparency::Transparent);
}

#[test]
fn replace_mode_rgb_is_opaque() {
    let img = image::RgbImage::from_raw(1, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let (bitmap, transparency) = decode(&buf).unwrap();
    assert_eq!(bitmap.pix(1, 0), Argb32::opaque(4, 5, 6));
    assert_eq!(transparency, Transparency::Opaque);
}

#[test]
fn replace_mode_rejects_garbage() {
    let err = read_bitmap(&mut Cursor::new(b"not a png at all"), &LoadOpts::default());
    assert!(err.is_err());
}

#[test]
fn overlay_gray_copies_values_and_keeps_rgb() {
    let mut bitmap = base_bitmap(2, 2);
    let before = bitmap.clone();
    let png = encode_png(2, 2, GRAY, 8, false, &[], &[255, 0, 128, 255]);

    let transparency = overlay(&mut bitmap, &png).unwrap();
    assert_eq!(transparency, Transparency::Transparent);
    assert_eq!(alphas(&bitmap), vec![255, 0, 128, 255]);
    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(
                bitmap.pix(y, x).0 & 0x00ff_ffff,
                before.pix(y, x).0 & 0x00ff_ffff
            );
        }
    }
}

#[test]
fn overlay_fully_opaque_reports_no_transparency() {
    let mut bitmap = base_bitmap(3, 1);
    let png = encode_png(3, 1, GRAY, 8, false, &[], &[255, 255, 255]);
    assert_eq!(overlay(&mut bitmap, &png).unwrap(), Transparency::Opaque);
    assert_eq!(alphas(&bitmap), vec![255; 3]);
}

#[test]
fn overlay_rgb_uses_brightness() {
    let mut bitmap = base_bitmap(2, 1);
    let png = encode_png(2, 1, RGB, 8, false, &[], &[255, 255, 255, 10, 20, 30]);
    assert_eq!(
        overlay(&mut bitmap, &png).unwrap(),
        Transparency::Transparent
    );
    assert_eq!(alphas(&bitmap), vec![255, 18]);
}

#[test]
fn overlay_palette_uses_entry_brightness() {
    let palette = [0, 0, 0, 255, 255, 255, 255, 0, 0];
    let mut bitmap = base_bitmap(3, 1);
    let png = encode_png(3, 1, PALETTE, 8, false, &palette, &[1, 2, 0]);
    overlay(&mut bitmap, &png).unwrap();
    assert_eq!(alphas(&bitmap), vec![255, 56, 0]);
}

#[test]
fn overlay_palette_index_out_of_range_fails_untouched() {
    let palette = [255, 255, 255];
    let mut bitmap = base_bitmap(2, 1);
    let before = bitmap.clone();
    let png = encode_png(2, 1, PALETTE, 8, false, &palette, &[0, 5]);
    assert!(overlay(&mut bitmap, &png).is_err());
    assert_eq!(bitmap, before);
}

#[test]
fn overlay_alpha_color_types_use_alpha_sample() {
    let mut bitmap = base_bitmap(2, 1);
    let png = encode_png(2, 1, GRAY_ALPHA, 8, false, &[], &[0, 255, 255, 64]);
    overlay(&mut bitmap, &png).unwrap();
    assert_eq!(alphas(&bitmap), vec![255, 64]);

    let mut bitmap = base_bitmap(2, 1);
    let samples = [0, 0, 0, 255, 255, 255, 255, 255];
    let png = encode_png(2, 1, RGBA, 8, false, &[], &samples);
    assert_eq!(overlay(&mut bitmap, &png).unwrap(), Transparency::Opaque);
    assert_eq!(alphas(&bitmap), vec![255, 255]);
}

#[test]
fn overlay_unpacks_sub_byte_gray() {
    let mut bitmap = base_bitmap(3, 1);
    let png = encode_png(3, 1, GRAY, 1, false, &[], &[1, 0, 1]);
    overlay(&mut bitmap, &png).unwrap();
    assert_eq!(alphas(&bitmap), vec![255, 0, 255]);

    let mut bitmap = base_bitmap(5, 1);
    let png = encode_png(5, 1, GRAY, 2, false, &[], &[0, 1, 2, 3, 3]);
    overlay(&mut bitmap, &png).unwrap();
    assert_eq!(alphas(&bitmap), vec![0, 0x55, 0xaa, 0xff, 0xff]);

    let mut bitmap = base_bitmap(3, 1);
    let png = encode_png(3, 1, GRAY, 4, false, &[], &[0, 7, 15]);
    overlay(&mut bitmap, &png).unwrap();
    assert_eq!(alphas(&bitmap), vec![0, 0x77, 0xff]);
}

#[test]
fn overlay_sub_byte_palette_keeps_indices() {
    let palette = [0, 0, 0, 255, 255, 255];
    let mut bitmap = base_bitmap(4, 2);
    let png = encode_png(4, 2, PALETTE, 1, false, &palette, &[0, 1, 1, 0, 1, 1, 1, 1]);
    let transparency = overlay(&mut bitmap, &png).unwrap();
    assert_eq!(transparency, Transparency::Transparent);
    assert_eq!(alphas(&bitmap), vec![0, 255, 255, 0, 255, 255, 255, 255]);
}

#[test]
fn overlay_adam7_places_every_pixel() {
    let (w, h) = (11u32, 9u32);
    let values: Vec<u16> = (0..w * h).map(|i| (i * 7 % 256) as u16).collect();
    let png = encode_png(w, h, GRAY, 8, true, &[], &values);

    let mut bitmap = base_bitmap(w, h);
    overlay(&mut bitmap, &png).unwrap();
    let expected: Vec<u8> = values.iter().map(|&v| v as u8).collect();
    assert_eq!(alphas(&bitmap), expected);
}

#[test]
fn overlay_adam7_small_image_skips_empty_passes() {
    let png = encode_png(1, 1, RGBA, 8, true, &[], &[9, 9, 9, 77]);
    let mut bitmap = base_bitmap(1, 1);
    overlay(&mut bitmap, &png).unwrap();
    assert_eq!(alphas(&bitmap), vec![77]);

    let values = [0u16, 1, 1, 0, 0, 1];
    let png = encode_png(3, 2, GRAY, 1, true, &[], &values);
    let mut bitmap = base_bitmap(3, 2);
    overlay(&mut bitmap, &png).unwrap();
    assert_eq!(alphas(&bitmap), vec![0, 255, 255, 0, 0, 255]);
}

#[test]
fn overlay_respects_bitmap_stride() {
    let mut bitmap = Bitmap::new();
    bitmap.allocate_with_rowpixels(2, 2, 4).unwrap();
    bitmap.fill(Argb32::opaque(1, 2, 3));
    let png = encode_png(2, 2, GRAY, 8, false, &[], &[10, 20, 30, 40]);
    overlay(&mut bitmap, &png).unwrap();
    assert_eq!(alphas(&bitmap), vec![10, 20, 30, 40]);
    assert_eq!(bitmap.pix(1, 1), Argb32::new(40, 1, 2, 3));
}

#[test]
fn overlay_sixteen_bit_is_rejected_untouched() {
    let mut bitmap = base_bitmap(1, 1);
    let before = bitmap.clone();
    let png = encode_png(1, 1, GRAY, 16, false, &[], &[0x1234]);
    let err = overlay(&mut bitmap, &png).unwrap_err();
    assert!(matches!(err, TexprepError::Unsupported(_)));
    assert_eq!(bitmap, before);
}

#[test]
fn overlay_dimension_mismatch_is_rejected_untouched() {
    let mut bitmap = base_bitmap(2, 2);
    let before = bitmap.clone();
    let png = encode_png(2, 1, GRAY, 8, false, &[], &[0, 0]);
    let err = overlay(&mut bitmap, &png).unwrap_err();
    assert!(matches!(err, TexprepError::Validation(_)));
    assert_eq!(bitmap, before);
}

#[test]
fn overlay_truncated_data_is_rejected_untouched() {
    let mut bitmap = base_bitmap(4, 4);
    let before = bitmap.clone();
    let png = encode_png(4, 4, GRAY, 8, false, &[], &[0; 16]);
    let truncated = &png[..png.len() - 30];
    assert!(overlay(&mut bitmap, truncated).is_err());
    assert_eq!(bitmap, before);
}
