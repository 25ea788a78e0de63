use heliosphere_core::{Config, Layer};
use image::{ImageReader, Rgba, RgbaImage};
use jpeg_encoder::{ColorType, Encoder};
use std::io::Cursor;

use crate::error::CompositeError;
use crate::feather::feather_sun_disk;
use crate::grading::{apply_grade, GradeParams};

const CANVAS_WIDTH: u32 = 1920;
const CANVAS_HEIGHT: u32 = 1435;
const FEATHER_CANVAS_SIZE: u32 = 1435;
const CROP_OFFSET_X: u32 = 230;
const CROP_OFFSET_Y: u32 = 117;

/// Composites a corona/sun-disk raw image pair into one encoded JPEG
/// (distilled spec §4.5). Deterministic: identical inputs and `cfg`
/// produce byte-identical output, since every step is fixed arithmetic
/// with no randomness.
pub fn composite(
    corona_bytes: &[u8],
    sun_disk_bytes: &[u8],
    cfg: &Config,
) -> Result<Vec<u8>, CompositeError> {
    let mut corona = decode(corona_bytes, "corona")?;
    let mut sun_disk = decode(sun_disk_bytes, "sun_disk")?;

    apply_grade(&mut corona, GradeParams::for_layer(Layer::Corona));
    apply_grade(&mut sun_disk, GradeParams::for_layer(Layer::SunDisk));

    let feathered = feather_sun_disk(
        &sun_disk,
        FEATHER_CANVAS_SIZE,
        cfg.composite_radius,
        cfg.feather_radius,
    );

    let mut canvas = RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, Rgba([0, 0, 0, 0]));
    place_centered(&mut canvas, &corona);
    screen_blend_onto(&mut canvas, &feathered);

    if CROP_OFFSET_X + cfg.frame_width > CANVAS_WIDTH || CROP_OFFSET_Y + cfg.frame_height > CANVAS_HEIGHT {
        return Err(CompositeError::CropOutOfBounds);
    }
    let cropped = image::imageops::crop_imm(
        &canvas,
        CROP_OFFSET_X,
        CROP_OFFSET_Y,
        cfg.frame_width,
        cfg.frame_height,
    )
    .to_image();

    encode_progressive_jpeg(&cropped, cfg.jpeg_quality)
}

fn decode(bytes: &[u8], layer: &'static str) -> Result<RgbaImage, CompositeError> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompositeError::Decode {
            layer,
            source: image::ImageError::IoError(e),
        })?
        .decode()
        .map_err(|source| CompositeError::Decode { layer, source })?;
    Ok(image.to_rgba8())
}

/// Places `layer` into `canvas` centered on both axes, clipping to the
/// canvas bounds if the layer is larger (it never is, for the fixed request
/// geometries this system uses).
fn place_centered(canvas: &mut RgbaImage, layer: &RgbaImage) {
    let (cw, ch) = canvas.dimensions();
    let (lw, lh) = layer.dimensions();
    let x0 = (cw.saturating_sub(lw)) / 2;
    let y0 = (ch.saturating_sub(lh)) / 2;

    for y in 0..lh.min(ch.saturating_sub(y0)) {
        for x in 0..lw.min(cw.saturating_sub(x0)) {
            canvas.put_pixel(x0 + x, y0 + y, *layer.get_pixel(x, y));
        }
    }
}

/// Overlays `overlay` (already feathered, same aspect as its own canvas)
/// centered on `base` using a screen blend, alpha-weighted by the overlay's
/// own alpha channel.
fn screen_blend_onto(base: &mut RgbaImage, overlay: &RgbaImage) {
    let (cw, ch) = base.dimensions();
    let (ow, oh) = overlay.dimensions();
    let x0 = (cw.saturating_sub(ow)) / 2;
    let y0 = (ch.saturating_sub(oh)) / 2;

    for y in 0..oh.min(ch.saturating_sub(y0)) {
        for x in 0..ow.min(cw.saturating_sub(x0)) {
            let Rgba([or, og, ob, oa]) = *overlay.get_pixel(x, y);
            if oa == 0 {
                continue;
            }
            let weight = oa as f32 / 255.0;
            let dst = base.get_pixel(x0 + x, y0 + y);
            let Rgba([dr, dg, db, da]) = *dst;

            let blended = [
                screen(dr, or),
                screen(dg, og),
                screen(db, ob),
            ];
            let out = [
                lerp(dr, blended[0], weight),
                lerp(dg, blended[1], weight),
                lerp(db, blended[2], weight),
                da.max(oa),
            ];
            base.put_pixel(x0 + x, y0 + y, Rgba(out));
        }
    }
}

fn screen(a: u8, b: u8) -> u8 {
    let (af, bf) = (a as f32 / 255.0, b as f32 / 255.0);
    ((1.0 - (1.0 - af) * (1.0 - bf)) * 255.0).round() as u8
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

fn encode_progressive_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, CompositeError> {
    let (width, height) = image.dimensions();
    let rgb: Vec<u8> = image
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();

    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out, quality);
    encoder.set_progressive(true);
    encoder.encode(&rgb, width as u16, height as u16, ColorType::Rgb)?;
    Ok(out)
}
