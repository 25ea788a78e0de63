use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

/// Resizes `sun_disk` to a square `canvas_size` canvas and applies an
/// analytic radial feather: fully opaque inside `composite_radius -
/// feather_radius`, fully transparent outside `composite_radius`, linear
/// in between. Replaces the upstream's SVG-rasterized mask (distilled
/// spec §9 redesign note) with a closed-form per-pixel computation.
pub fn feather_sun_disk(
    sun_disk: &RgbaImage,
    canvas_size: u32,
    composite_radius: f64,
    feather_radius: f64,
) -> RgbaImage {
    let resized = image::imageops::resize(sun_disk, canvas_size, canvas_size, FilterType::Lanczos3);

    let center = canvas_size as f64 / 2.0;
    let inner = (composite_radius - feather_radius).max(0.0);

    let mut out = resized;
    for y in 0..canvas_size {
        for x in 0..canvas_size {
            let dx = x as f64 + 0.5 - center;
            let dy = y as f64 + 0.5 - center;
            let r = (dx * dx + dy * dy).sqrt();

            let alpha = feather_alpha(r, inner, composite_radius);
            let Rgba([rr, gg, bb, a]) = *out.get_pixel(x, y);
            let a = (a as f64 * alpha).round().clamp(0.0, 255.0) as u8;
            out.put_pixel(x, y, Rgba([rr, gg, bb, a]));
        }
    }
    out
}

/// `alpha(r) = clamp01((outer - r) / feather_width)`, with the inner radius
/// fully opaque and the region beyond `outer` fully transparent.
fn feather_alpha(r: f64, inner: f64, outer: f64) -> f64 {
    if r <= inner {
        1.0
    } else if r >= outer {
        0.0
    } else {
        let feather_width = (outer - inner).max(f64::EPSILON);
        ((outer - r) / feather_width).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_is_opaque_inside_inner_radius() {
        assert_eq!(feather_alpha(10.0, 360.0, 400.0), 1.0);
    }

    #[test]
    fn alpha_is_transparent_outside_outer_radius() {
        assert_eq!(feather_alpha(450.0, 360.0, 400.0), 0.0);
    }

    #[test]
    fn alpha_is_monotonically_decreasing_in_the_feather_band() {
        let a1 = feather_alpha(370.0, 360.0, 400.0);
        let a2 = feather_alpha(390.0, 360.0, 400.0);
        assert!(a1 > a2);
    }

    #[test]
    fn feathered_canvas_has_requested_size() {
        let src = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 255]));
        let out = feather_sun_disk(&src, 1435, 400.0, 40.0);
        assert_eq!(out.dimensions(), (1435, 1435));
    }

    #[test]
    fn feathered_canvas_corner_is_transparent() {
        let src = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 255]));
        let out = feather_sun_disk(&src, 1435, 400.0, 40.0);
        let corner = out.get_pixel(0, 0);
        assert_eq!(corner.0[3], 0);
    }
}
