use super::*;

fn uniform(width: u32, height: u32, px: Argb32) -> Bitmap {
    let mut bmp = Bitmap::with_size(width, height);
    bmp.fill(px);
    bmp
}

fn gradient(width: u32, height: u32) -> Bitmap {
    let mut bmp = Bitmap::with_size(width, height);
    for y in 0..height {
        for x in 0..width {
            *bmp.pix_mut(y, x) = Argb32::new(
                (255 - x * 7) as u8,
                (x * 20) as u8,
                (y * 30) as u8,
                ((x + y) * 5) as u8,
            );
        }
    }
    bmp
}

#[test]
fn strategy_selection_follows_scale_direction() {
    use ResampleStrategy::*;
    assert_eq!(select_strategy(4, 4, 2, 2, false), Average);
    assert_eq!(select_strategy(4, 2, 2, 4, false), Average);
    assert_eq!(select_strategy(2, 2, 4, 4, false), Replicate);
    assert_eq!(select_strategy(4, 4, 4, 4, false), Replicate);
    assert_eq!(select_strategy(2, 2, 3, 3, false), Bilinear);
    assert_eq!(select_strategy(2, 2, 4, 4, true), Average);
}

#[test]
fn zero_sizes_select_average_without_dividing() {
    let cases = [
        (0, 4, 2, 2),
        (4, 0, 2, 2),
        (4, 4, 0, 2),
        (4, 4, 2, 0),
        (0, 0, 0, 0),
    ];
    for (sw, sh, dw, dh) in cases {
        assert_eq!(
            select_strategy(sw, sh, dw, dh, false),
            ResampleStrategy::Average
        );
    }
}

#[test]
fn identity_size_reproduces_source_exactly() {
    let mut src = Bitmap::new();
    src.allocate_with_rowpixels(5, 4, 8).unwrap();
    let grad = gradient(5, 4);
    for y in 0..4 {
        src.row_mut(y).copy_from_slice(grad.row(y));
    }

    let mut dst = Bitmap::with_size(5, 4);
    resample(&mut dst, &src, RenderColor::WHITE, false);

    for y in 0..4 {
        assert_eq!(dst.row(y), grad.row(y));
    }
}

#[test]
fn integer_upscale_replicates_blocks() {
    let a = Argb32::new(255, 10, 20, 30);
    let b = Argb32::new(128, 40, 50, 60);
    let src = Bitmap::from_pixels(2, 1, vec![a, b]).unwrap();

    let mut dst = Bitmap::with_size(4, 2);
    resample(&mut dst, &src, RenderColor::WHITE, false);

    for y in 0..2 {
        assert_eq!(dst.row(y), &[a, a, b, b]);
    }
}

#[test]
fn zero_alpha_tint_leaves_destination_untouched() {
    let tint = RenderColor::new(0.0, 1.0, 1.0, 1.0);
    let src = gradient(6, 6);
    let cases = [
        (3u32, 3u32, false),
        (12, 12, false),
        (9, 9, false),
        (6, 6, true),
    ];

    for (w, h, force) in cases {
        let before = gradient(w, h);
        let mut dst = before.clone();
        resample(&mut dst, &src, tint, force);
        assert_eq!(dst, before, "{w}x{h} force={force}");
    }
}

#[test]
fn uniform_downscale_keeps_the_colour() {
    let px = Argb32::new(200, 10, 20, 30);
    for (sw, sh, dw, dh) in [(7, 5, 3, 2), (10, 10, 3, 3), (5, 5, 1, 1), (9, 4, 2, 4)] {
        let src = uniform(sw, sh, px);
        let mut dst = Bitmap::with_size(dw, dh);
        resample(&mut dst, &src, RenderColor::WHITE, false);
        for y in 0..dh {
            for x in 0..dw {
                assert_eq!(dst.pix(y, x), px, "{sw}x{sh} -> {dw}x{dh} at ({x},{y})");
            }
        }
    }
}

#[test]
fn forced_average_on_upscale_keeps_uniform_colour() {
    let px = Argb32::new(255, 90, 80, 70);
    let src = uniform(3, 2, px);
    let mut dst = Bitmap::with_size(7, 5);
    resample(&mut dst, &src, RenderColor::WHITE, true);
    for y in 0..5 {
        assert!(dst.row(y).iter().all(|&p| p == px));
    }
}

#[test]
fn average_mixes_covered_pixels() {
    let src = Bitmap::from_pixels(
        2,
        1,
        vec![Argb32::new(255, 0, 0, 0), Argb32::new(255, 200, 100, 50)],
    )
    .unwrap();
    let mut dst = Bitmap::with_size(1, 1);
    resample(&mut dst, &src, RenderColor::WHITE, false);
    assert_eq!(dst.pix(0, 0), Argb32::new(255, 100, 50, 25));
}

#[test]
fn bilinear_keeps_interior_and_fades_edges() {
    let white = Argb32::new(255, 255, 255, 255);
    let src = uniform(2, 2, white);
    let mut dst = Bitmap::with_size(3, 3);
    resample(&mut dst, &src, RenderColor::WHITE, false);

    assert_eq!(dst.pix(1, 1), white);
    let corner = dst.pix(0, 0);
    assert_eq!(corner.a(), 177);
    assert!(dst.pix(2, 2).a() < 255);
    assert!(dst.pix(0, 1).a() > corner.a());
}

#[test]
fn translucent_tint_blends_over_destination() {
    let src = uniform(1, 1, Argb32::new(255, 255, 255, 255));
    let mut dst = uniform(1, 1, Argb32::new(255, 0, 0, 0));
    resample(&mut dst, &src, RenderColor::new(0.5, 1.0, 1.0, 1.0), false);
    assert_eq!(dst.pix(0, 0), Argb32::new(254, 127, 127, 127));
}

#[test]
fn tint_channels_scale_the_source() {
    let src = uniform(2, 2, Argb32::new(255, 100, 150, 200));
    let mut dst = Bitmap::with_size(2, 2);
    resample(&mut dst, &src, RenderColor::new(1.0, 0.0, 1.0, 1.0), false);
    assert_eq!(dst.pix(1, 1), Argb32::new(255, 0, 150, 200));
}

#[test]
fn empty_destination_is_a_noop() {
    let src = uniform(2, 2, Argb32::new(255, 1, 2, 3));
    let mut dst = Bitmap::new();
    resample(&mut dst, &src, RenderColor::WHITE, false);
    assert!(!dst.valid());

    let mut dst = uniform(2, 2, Argb32::new(1, 1, 1, 1));
    resample(&mut dst, &Bitmap::new(), RenderColor::WHITE, false);
    assert_eq!(dst.pix(0, 0), Argb32::new(1, 1, 1, 1));
}
