use crate::foundation::core::{Line, Point, Rect};

/// Result of clipping a primitive against a rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipOutcome {
    /// Entirely inside; the primitive was not modified.
    Inside,
    /// Partially inside; the primitive was shrunk to the visible part.
    Clipped,
    /// Entirely outside; the primitive was not modified and should not be drawn.
    Rejected,
}

impl ClipOutcome {
    /// True when nothing of the primitive is visible.
    pub fn is_rejected(self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// Texture coordinates for the four corners of an axis-aligned quad.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuadTexUv {
    /// Top-left.
    pub tl: Point,
    /// Top-right.
    pub tr: Point,
    /// Bottom-left.
    pub bl: Point,
    /// Bottom-right.
    pub br: Point,
}

impl Default for QuadTexUv {
    fn default() -> Self {
        Self {
            tl: Point::new(0.0, 0.0),
            tr: Point::new(1.0, 0.0),
            bl: Point::new(0.0, 1.0),
            br: Point::new(1.0, 1.0),
        }
    }
}

const OUT_BOTTOM: u8 = 1;
const OUT_TOP: u8 = 2;
const OUT_RIGHT: u8 = 4;
const OUT_LEFT: u8 = 8;

fn outcode(p: Point, clip: &Rect) -> u8 {
    let mut code = 0;
    if p.y > clip.y1 {
        code |= OUT_BOTTOM;
    }
    if p.y < clip.y0 {
        code |= OUT_TOP;
    }
    if p.x > clip.x1 {
        code |= OUT_RIGHT;
    }
    if p.x < clip.x0 {
        code |= OUT_LEFT;
    }
    code
}

/// Cohen-Sutherland clip of `line` against `clip`.
///
/// `line` is only written when the outcome is [`ClipOutcome::Clipped`].
pub fn clip_line(line: &mut Line, clip: &Rect) -> ClipOutcome {
    let mut work = *line;
    let mut changed = false;

    loop {
        let code0 = outcode(work.p0, clip);
        let code1 = outcode(work.p1, clip);

        if (code0 | code1) == 0 {
            if !changed {
                return ClipOutcome::Inside;
            }
            *line = work;
            return ClipOutcome::Clipped;
        }
        if (code0 & code1) != 0 {
            return ClipOutcome::Rejected;
        }

        let (p0, p1) = (work.p0, work.p1);
        let this = if code0 != 0 { code0 } else { code1 };

        let fixed = if this & OUT_BOTTOM != 0 {
            Point::new(
                p0.x + (p1.x - p0.x) * (clip.y1 - p0.y) / (p1.y - p0.y),
                clip.y1,
            )
        } else if this & OUT_TOP != 0 {
            Point::new(
                p0.x + (p1.x - p0.x) * (clip.y0 - p0.y) / (p1.y - p0.y),
                clip.y0,
            )
        } else if this & OUT_RIGHT != 0 {
            Point::new(
                clip.x1,
                p0.y + (p1.y - p0.y) * (clip.x1 - p0.x) / (p1.x - p0.x),
            )
        } else {
            Point::new(
                clip.x0,
                p0.y + (p1.y - p0.y) * (clip.x0 - p0.x) / (p1.x - p0.x),
            )
        };

        if this == code0 {
            work.p0 = fixed;
        } else {
            work.p1 = fixed;
        }
        changed = true;
    }
}

/// Clip an axis-aligned quad to `clip`, reparameterizing `texcoords` along each cut.
///
/// `bounds` must satisfy `x0 <= x1` and `y0 <= y1`. Edges are cut top, bottom, left, right in
/// that order. A rejected quad leaves `bounds` and `texcoords` untouched.
pub fn clip_quad(
    bounds: &mut Rect,
    clip: &Rect,
    mut texcoords: Option<&mut QuadTexUv>,
) -> ClipOutcome {
    debug_assert!(bounds.x0 <= bounds.x1 && bounds.y0 <= bounds.y1);

    if bounds.y1 < clip.y0 || bounds.y0 > clip.y1 || bounds.x1 < clip.x0 || bounds.x0 > clip.x1 {
        return ClipOutcome::Rejected;
    }

    let mut outcome = ClipOutcome::Inside;

    if bounds.y0 < clip.y0 {
        let frac = (clip.y0 - bounds.y0) / (bounds.y1 - bounds.y0);
        bounds.y0 = clip.y0;
        if let Some(uv) = texcoords.as_deref_mut() {
            uv.tl = uv.tl.lerp(uv.bl, frac);
            uv.tr = uv.tr.lerp(uv.br, frac);
        }
        outcome = ClipOutcome::Clipped;
    }

    if bounds.y1 > clip.y1 {
        let frac = (bounds.y1 - clip.y1) / (bounds.y1 - bounds.y0);
        bounds.y1 = clip.y1;
        if let Some(uv) = texcoords.as_deref_mut() {
            uv.bl = uv.bl.lerp(uv.tl, frac);
            uv.br = uv.br.lerp(uv.tr, frac);
        }
        outcome = ClipOutcome::Clipped;
    }

    if bounds.x0 < clip.x0 {
        let frac = (clip.x0 - bounds.x0) / (bounds.x1 - bounds.x0);
        bounds.x0 = clip.x0;
        if let Some(uv) = texcoords.as_deref_mut() {
            uv.tl = uv.tl.lerp(uv.tr, frac);
            uv.bl = uv.bl.lerp(uv.br, frac);
        }
        outcome = ClipOutcome::Clipped;
    }

    if bounds.x1 > clip.x1 {
        let frac = (bounds.x1 - clip.x1) / (bounds.x1 - bounds.x0);
        bounds.x1 = clip.x1;
        if let Some(uv) = texcoords.as_deref_mut() {
            uv.tr = uv.tr.lerp(uv.tl, frac);
            uv.br = uv.br.lerp(uv.bl, frac);
        }
        outcome = ClipOutcome::Clipped;
    }

    outcome
}

#[cfg(test)]
#[path = "../../tests/unit/render/clip.rs"]
mod tests;
