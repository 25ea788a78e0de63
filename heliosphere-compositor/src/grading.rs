use heliosphere_core::Layer;
use image::{Rgba, RgbaImage};

/// Fixed color-grade parameters for one layer (distilled spec §4.5 steps 1–2).
/// All layers use the same operation order: saturation, hue, brightness,
/// tint, contrast, gamma.
#[derive(Debug, Clone, Copy)]
pub struct GradeParams {
    pub saturation: f32,
    pub brightness: f32,
    pub hue_shift_deg: f32,
    pub tint: (u8, u8, u8),
    pub contrast_gain: f32,
    pub contrast_bias: f32,
    pub gamma: f32,
}

impl GradeParams {
    pub fn for_layer(layer: Layer) -> Self {
        match layer {
            Layer::Corona => GradeParams {
                saturation: 0.3,
                brightness: 1.0,
                hue_shift_deg: -5.0,
                tint: (220, 230, 240),
                contrast_gain: 1.2,
                contrast_bias: -12.0,
                gamma: 1.2,
            },
            Layer::SunDisk => GradeParams {
                saturation: 1.2,
                brightness: 1.4,
                hue_shift_deg: 15.0,
                tint: (255, 200, 120),
                contrast_gain: 1.7,
                contrast_bias: -30.0,
                gamma: 1.15,
            },
        }
    }
}

/// A tint blend weight applied uniformly to every pixel; the upstream
/// implementation does not expose a stronger/weaker tint knob per layer, so
/// this is a fixed constant rather than part of `GradeParams`.
const TINT_WEIGHT: f32 = 0.12;

/// Applies the full per-layer grade in place, in the fixed order the
/// distilled spec lists: saturation/hue/brightness (as one HSV pass), tint,
/// linear contrast, gamma.
pub fn apply_grade(image: &mut RgbaImage, params: GradeParams) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let (mut rf, mut gf, mut bf) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);

        (rf, gf, bf) = apply_hsv(rf, gf, bf, params.hue_shift_deg, params.saturation, params.brightness);
        (rf, gf, bf) = apply_tint(rf, gf, bf, params.tint, TINT_WEIGHT);
        (rf, gf, bf) = apply_contrast(rf, gf, bf, params.contrast_gain, params.contrast_bias / 255.0);
        (rf, gf, bf) = apply_gamma(rf, gf, bf, params.gamma);

        *pixel = Rgba([to_u8(rf), to_u8(gf), to_u8(bf), a]);
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn apply_hsv(r: f32, g: f32, b: f32, hue_shift_deg: f32, saturation: f32, brightness: f32) -> (f32, f32, f32) {
    let (h, s, v) = rgb_to_hsv(r, g, b);
    let h = (h + hue_shift_deg).rem_euclid(360.0);
    let s = (s * saturation).clamp(0.0, 1.0);
    let v = (v * brightness).clamp(0.0, 1.0);
    hsv_to_rgb(h, s, v)
}

fn apply_tint(r: f32, g: f32, b: f32, tint: (u8, u8, u8), weight: f32) -> (f32, f32, f32) {
    let (tr, tg, tb) = (tint.0 as f32 / 255.0, tint.1 as f32 / 255.0, tint.2 as f32 / 255.0);
    (
        r * (1.0 - weight) + tr * weight,
        g * (1.0 - weight) + tg * weight,
        b * (1.0 - weight) + tb * weight,
    )
}

fn apply_contrast(r: f32, g: f32, b: f32, gain: f32, bias: f32) -> (f32, f32, f32) {
    (r * gain + bias, g * gain + bias, b * gain + bias)
}

fn apply_gamma(r: f32, g: f32, b: f32, gamma: f32) -> (f32, f32, f32) {
    let inv = 1.0 / gamma;
    (
        r.clamp(0.0, 1.0).powf(inv),
        g.clamp(0.0, 1.0).powf(inv),
        b.clamp(0.0, 1.0).powf(inv),
    )
}

fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta.abs() < f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };

    let s = if max.abs() < f32::EPSILON { 0.0 } else { delta / max };
    (h, s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - (((h / 60.0) % 2.0) - 1.0).abs());
    let m = v - c;

    let (r1, g1, b1) = match h as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (r1 + m, g1 + m, b1 + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_roundtrips_through_hsv_with_zero_shift() {
        let (r, g, b) = apply_hsv(0.5, 0.5, 0.5, 0.0, 1.0, 1.0);
        assert!((r - 0.5).abs() < 1e-3);
        assert!((g - 0.5).abs() < 1e-3);
        assert!((b - 0.5).abs() < 1e-3);
    }

    #[test]
    fn zero_saturation_produces_gray() {
        let (r, g, b) = apply_hsv(1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert!((r - g).abs() < 1e-3);
        assert!((g - b).abs() < 1e-3);
    }

    #[test]
    fn corona_and_sun_disk_params_differ() {
        let corona = GradeParams::for_layer(Layer::Corona);
        let sun_disk = GradeParams::for_layer(Layer::SunDisk);
        assert_ne!(corona.tint, sun_disk.tint);
        assert_ne!(corona.hue_shift_deg, sun_disk.hue_shift_deg);
    }
}
