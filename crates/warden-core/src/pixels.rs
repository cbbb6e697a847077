//! Pixel-level auxiliary analyzers.
//!
//! Cheap signals for false-positive compensation: cartoons, landscapes,
//! and objects carry little skin-toned area, while drawings show bold
//! outlines the classifier sometimes mistakes for explicit material.

use image::DynamicImage;

/// Pixel sampling stride for skin analysis.
const SKIN_SAMPLE_RATE: u32 = 4;
/// Pixel sampling stride for edge analysis.
const EDGE_SAMPLE_RATE: u32 = 3;
/// Sobel gradient magnitude above which a pixel counts as an edge.
const EDGE_THRESHOLD: f64 = 50.0;

/// Ratio of skin-colored pixels in the image (0.0 - 1.0).
///
/// Samples every few pixels; a low ratio (< 0.15) is a strong indicator
/// of a false positive for explicit-content detection.
pub fn skin_ratio(image: &DynamicImage) -> f32 {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut skin = 0u32;
    let mut total = 0u32;

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let pixel = rgb.get_pixel(x, y).0;
            total += 1;
            if is_skin_color(pixel[0], pixel[1], pixel[2]) {
                skin += 1;
            }
            x += SKIN_SAMPLE_RATE;
        }
        y += SKIN_SAMPLE_RATE;
    }

    if total > 0 {
        skin as f32 / total as f32
    } else {
        0.0
    }
}

/// RGB + HSV skin tone check. Skin has R dominant over G over B, a
/// red-to-yellow hue, and moderate saturation.
fn is_skin_color(r: u8, g: u8, b: u8) -> bool {
    let (ri, gi, bi) = (r as i32, g as i32, b as i32);

    let rgb_match = ri > 95
        && gi > 40
        && bi > 20
        && ri > gi
        && ri > bi
        && ri - gi > 15
        && ri - bi > 15;
    if !rgb_match {
        return false;
    }

    let (hue, saturation, value) = rgb_to_hsv(r, g, b);
    hue <= 50.0 && (0.15..=0.75).contains(&saturation) && value >= 0.20
}

fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    (hue, saturation, max)
}

/// Edge density of the image (0.0 - 1.0) via Sobel gradients.
///
/// Real photographs have lower edge density than drawings, which carry
/// bold outlines and sharp color transitions; above 0.60 the image is
/// likely cartoon/illustration style.
pub fn edge_density(image: &DynamicImage) -> f32 {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();

    if width < 3 || height < 3 {
        return 0.0;
    }

    let luma = |x: u32, y: u32| gray.get_pixel(x, y).0[0] as i32;

    let mut edges = 0u32;
    let mut total = 0u32;

    let mut y = 1;
    while y < height - 1 {
        let mut x = 1;
        while x < width - 1 {
            total += 1;

            let gx = -luma(x - 1, y - 1) + luma(x + 1, y - 1)
                - 2 * luma(x - 1, y)
                + 2 * luma(x + 1, y)
                - luma(x - 1, y + 1)
                + luma(x + 1, y + 1);
            let gy = -luma(x - 1, y - 1) - 2 * luma(x, y - 1) - luma(x + 1, y - 1)
                + luma(x - 1, y + 1)
                + 2 * luma(x, y + 1)
                + luma(x + 1, y + 1);

            let magnitude = ((gx * gx + gy * gy) as f64).sqrt();
            if magnitude > EDGE_THRESHOLD {
                edges += 1;
            }

            x += EDGE_SAMPLE_RATE;
        }
        y += EDGE_SAMPLE_RATE;
    }

    if total > 0 {
        edges as f32 / total as f32
    } else {
        0.0
    }
}
