/// Fractional bits of the resampler's fixed-point positions and ratios.
pub(crate) const FIXED_SHIFT: u32 = 12;
/// 1.0 in 12-bit fixed point.
pub(crate) const FIXED_ONE: u32 = 1 << FIXED_SHIFT;
pub(crate) const FIXED_FRAC_MASK: u32 = FIXED_ONE - 1;

/// `num / den` in 12-bit fixed point, rounded down. `den` must be non-zero.
///
/// Ratios of 2^20 and above do not fit in 32 bits and saturate to `u32::MAX`.
pub(crate) fn fixed_ratio_floor(num: u32, den: u32) -> u32 {
    saturate_u32((u64::from(num) << FIXED_SHIFT) / u64::from(den))
}

/// `num / den` in 12-bit fixed point, rounded up. `den` must be non-zero; saturates like
/// [`fixed_ratio_floor`].
pub(crate) fn fixed_ratio_ceil(num: u32, den: u32) -> u32 {
    saturate_u32((u64::from(num) << FIXED_SHIFT).div_ceil(u64::from(den)))
}

fn saturate_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Unit-interval float to an 8.8 fixed-point factor (1.0 -> 256).
pub(crate) fn unit_to_q8(v: f32) -> u32 {
    if !v.is_finite() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 256.0) as u32
}

/// Scale an 8-bit sample of `bits` depth up to the full 0..=255 range.
pub(crate) fn expand_sample_to_u8(v: u8, bits: u8) -> u8 {
    match bits {
        1 => v * 0xff,
        2 => v * 0x55,
        4 => v * 0x11,
        _ => v,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
