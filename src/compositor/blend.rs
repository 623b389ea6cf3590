use image::{Rgb, RgbImage};

use crate::compositor::OverlayBuffer;

/// `source * (1 - alpha) + overlay * alpha` on painted pixels only.
///
/// Unpainted pixels are copied from `source` unchanged, so `alpha = 1.0`
/// replaces masked pixels with the overlay colour and leaves the rest of the
/// frame intact rather than black.
pub fn blend_footprint(source: &RgbImage, overlay: &OverlayBuffer, alpha: f32) -> RgbImage {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut output = source.clone();
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        if !overlay.is_painted(x, y) {
            continue;
        }
        let over = overlay.pixels().get_pixel(x, y);
        *pixel = Rgb([
            mix(pixel.0[0], over.0[0], alpha),
            mix(pixel.0[1], over.0[1], alpha),
            mix(pixel.0[2], over.0[2], alpha),
        ]);
    }
    output
}

#[inline]
fn mix(source: u8, overlay: u8, alpha: f32) -> u8 {
    (source as f32 * (1.0 - alpha) + overlay as f32 * alpha)
        .round()
        .clamp(0.0, 255.0) as u8
}
