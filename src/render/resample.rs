//! Fixed-point ARGB resampling with tint and "over" compositing.
//!
//! Positions and step ratios use 12 fractional bits (`0x1000` == one source pixel). Every
//! sampled colour is scaled by the premultiplied tint factors (8.8 fixed point) and, when the
//! tint alpha is below one, blended over whatever the destination already holds. Callers that
//! want replacement must clear the destination first.

use crate::foundation::core::{Argb32, Bitmap, RenderColor};
use crate::foundation::math::{
    FIXED_FRAC_MASK, FIXED_ONE, FIXED_SHIFT, fixed_ratio_ceil, fixed_ratio_floor, unit_to_q8,
};

/// Sampling strategy chosen by [`resample`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResampleStrategy {
    /// Exact area-weighted average of every covered source pixel.
    Average,
    /// Each destination pixel copies exactly one source pixel (integer upscale or 1:1).
    Replicate,
    /// Four-tap bilinear filter; taps outside the source read as transparent black.
    Bilinear,
}

/// Strategy [`resample`] uses for the given source and destination sizes.
///
/// Any zero size selects [`ResampleStrategy::Average`]; [`resample`] draws nothing in that case.
pub fn select_strategy(
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
    force_average: bool,
) -> ResampleStrategy {
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return ResampleStrategy::Average;
    }
    let dx = fixed_ratio_floor(src_width, dst_width);
    let dy = fixed_ratio_floor(src_height, dst_height);
    if dx > FIXED_ONE || dy > FIXED_ONE || force_average {
        ResampleStrategy::Average
    } else if dst_width % src_width == 0 && dst_height % src_height == 0 {
        ResampleStrategy::Replicate
    } else {
        ResampleStrategy::Bilinear
    }
}

/// Resample `source` into the whole of `dest`, tinted by `tint`.
///
/// Downscales (or `force_average`) use exact area averaging; otherwise integer multiples are
/// block-replicated and everything else is filtered bilinearly. A destination or source without
/// pixels is left untouched.
pub fn resample(dest: &mut Bitmap, source: &Bitmap, tint: RenderColor, force_average: bool) {
    if !dest.valid() || !source.valid() {
        return;
    }

    let (sw, sh) = (source.width(), source.height());
    let (dw, dh) = (dest.width(), dest.height());
    let factors = TintFactors::from_color(tint);

    match select_strategy(sw, sh, dw, dh, force_average) {
        ResampleStrategy::Average => {
            let dx = fixed_ratio_floor(sw, dw).max(1);
            let dy = fixed_ratio_floor(sh, dh).max(1);
            resample_average(dest, source, factors, dx, dy);
        }
        ResampleStrategy::Replicate => resample_replicate(dest, source, factors),
        ResampleStrategy::Bilinear => {
            let dx = fixed_ratio_ceil(sw, dw);
            let dy = fixed_ratio_ceil(sh, dh);
            resample_bilinear(dest, source, factors, dx, dy);
        }
    }
}

/// Premultiplied tint factors in 8.8 fixed point (256 == 1.0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TintFactors {
    a: u32,
    r: u32,
    g: u32,
    b: u32,
}

impl TintFactors {
    fn from_color(color: RenderColor) -> Self {
        // NaN survives the clamp and becomes a zero factor in `unit_to_q8`
        let unit = |v: f32| v.clamp(0.0, 1.0);
        let a = unit(color.a);
        Self {
            a: unit_to_q8(a),
            r: unit_to_q8(unit(color.r) * a),
            g: unit_to_q8(unit(color.g) * a),
            b: unit_to_q8(unit(color.b) * a),
        }
    }

    /// Scale an `[a, r, g, b]` sample (each 0..=255) and blend it over `dst`.
    fn compose(self, sample: [u32; 4], dst: Argb32) -> Argb32 {
        let mut a = sample[0] * self.a / 256;
        let mut r = sample[1] * self.r / 256;
        let mut g = sample[2] * self.g / 256;
        let mut b = sample[3] * self.b / 256;

        if self.a < 256 {
            let inv = 256 - self.a;
            a += u32::from(dst.a()) * inv / 256;
            r += u32::from(dst.r()) * inv / 256;
            g += u32::from(dst.g()) * inv / 256;
            b += u32::from(dst.b()) * inv / 256;
        }

        Argb32::new(sat_u8(a), sat_u8(r), sat_u8(g), sat_u8(b))
    }
}

fn sat_u8(v: u32) -> u8 {
    v.min(255) as u8
}

fn channels(px: Argb32) -> [u32; 4] {
    [
        u32::from(px.a()),
        u32::from(px.r()),
        u32::from(px.g()),
        u32::from(px.b()),
    ]
}

fn resample_replicate(dest: &mut Bitmap, source: &Bitmap, factors: TintFactors) {
    let (sw, sh) = (u64::from(source.width()), u64::from(source.height()));
    let (dw, dh) = (u64::from(dest.width()), u64::from(dest.height()));

    for y in 0..dest.height() {
        let sy = (u64::from(y) * sh / dh) as u32;
        let src_row = source.row(sy);
        for (x, d) in dest.row_mut(y).iter_mut().enumerate() {
            let sx = (x as u64 * sw / dw) as usize;
            *d = factors.compose(channels(src_row[sx]), *d);
        }
    }
}

fn resample_average(dest: &mut Bitmap, source: &Bitmap, factors: TintFactors, dx: u32, dy: u32) {
    let sumscale = u64::from(dx) * u64::from(dy);
    let (last_x, last_y) = (source.width() - 1, source.height() - 1);

    for y in 0..dest.height() {
        let starty = y * dy;
        for x in 0..dest.width() {
            let startx = x * dx;
            let mut sum = [0u64; 4];

            let mut cury = starty;
            let mut yremaining = dy;
            while yremaining > 0 {
                let ychunk = (FIXED_ONE - (cury & FIXED_FRAC_MASK)).min(yremaining);
                yremaining -= ychunk;
                let row = source.row((cury >> FIXED_SHIFT).min(last_y));

                let mut curx = startx;
                let mut xremaining = dx;
                while xremaining > 0 {
                    let xchunk = (FIXED_ONE - (curx & FIXED_FRAC_MASK)).min(xremaining);
                    xremaining -= xchunk;

                    let factor = u64::from(xchunk) * u64::from(ychunk);
                    let px = channels(row[(curx >> FIXED_SHIFT).min(last_x) as usize]);
                    for c in 0..4 {
                        sum[c] += factor * u64::from(px[c]);
                    }
                    curx += xchunk;
                }
                cury += ychunk;
            }

            let sample = sum.map(|s| (s / sumscale) as u32);
            let d = dest.pix_mut(y, x);
            *d = factors.compose(sample, *d);
        }
    }
}

fn resample_bilinear(dest: &mut Bitmap, source: &Bitmap, factors: TintFactors, dx: u32, dy: u32) {
    let maxx = i64::from(source.width()) << FIXED_SHIFT;
    let maxy = i64::from(source.height()) << FIXED_SHIFT;
    let one = i64::from(FIXED_ONE);
    let half = one / 2;

    // Out-of-range taps contribute transparent black, which fades the outer ring of pixels.
    let fetch = |cx: i64, cy: i64| -> [u32; 4] {
        if (0..maxx).contains(&cx) && (0..maxy).contains(&cy) {
            channels(source.pix((cy >> FIXED_SHIFT) as u32, (cx >> FIXED_SHIFT) as u32))
        } else {
            [0; 4]
        }
    };

    for y in 0..dest.height() {
        // Back-project to the centre of the destination pixel, half a texel up-left of it.
        let cury = i64::from(y) * i64::from(dy) + i64::from(dy / 2) - half;
        let nexty = cury + one;
        let fy = (cury & i64::from(FIXED_FRAC_MASK)) as u64;

        for x in 0..dest.width() {
            let curx = i64::from(x) * i64::from(dx) + i64::from(dx / 2) - half;
            let nextx = curx + one;
            let fx = (curx & i64::from(FIXED_FRAC_MASK)) as u64;

            let taps = [
                (fetch(curx, cury), (one as u64 - fx) * (one as u64 - fy)),
                (fetch(nextx, cury), fx * (one as u64 - fy)),
                (fetch(curx, nexty), (one as u64 - fx) * fy),
                (fetch(nextx, nexty), fx * fy),
            ];

            let mut sum = [0u64; 4];
            for (px, weight) in taps {
                for c in 0..4 {
                    sum[c] += weight * u64::from(px[c]);
                }
            }

            let sample = sum.map(|s| (s >> (2 * FIXED_SHIFT)) as u32);
            let d = dest.pix_mut(y, x);
            *d = factors.compose(sample, *d);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/resample.rs"]
mod tests;
