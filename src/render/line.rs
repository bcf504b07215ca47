use crate::foundation::core::{Line, Vec2};

/// `1 / sqrt(2)`: length of each component of the unit vector `(1, 1)`.
const DIAGONAL_UNIT: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Expand a line of the given `width` into the two edges of a quad.
///
/// With `u` the unit direction from `p0` to `p1` and `n` the perpendicular scaled to half the
/// width, the result is `(p0 - n .. p0 + n, p1 - n .. p1 + n)`, where `n = (u.y, -u.x) * w/2`.
/// A positive `length_extension` first pushes both endpoints outward by half of it along `u`.
///
/// A zero-length line becomes a diamond around the point whose tips sit `width / sqrt(2)` away
/// along each axis.
pub fn line_to_quad(line: Line, width: f64, length_extension: f64) -> (Line, Line) {
    let half_width = width * 0.5;
    let mut p0 = line.p0;
    let mut p1 = line.p1;
    let mut unit = p1 - p0;

    if unit.x == 0.0 && unit.y == 0.0 {
        let d = DIAGONAL_UNIT * half_width;
        unit = Vec2::new(d, d);
        p0 -= unit;
        p1 += unit;
    } else {
        let length = unit.hypot();

        if length_extension > 0.0 {
            let ext = (unit / length) * (length_extension * 0.5);
            p0 -= ext;
            p1 += ext;
        }

        unit *= half_width / length;
    }

    // rotate by +90 and -90 degrees around each endpoint
    let perp = Vec2::new(unit.y, -unit.x);
    (
        Line::new(p0 - perp, p0 + perp),
        Line::new(p1 - perp, p1 + perp),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/render/line.rs"]
mod tests;
