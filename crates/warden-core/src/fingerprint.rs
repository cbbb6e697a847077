//! Perceptual image fingerprint.
//!
//! Produces a compact 64-bit digest that is stable under rescaling and
//! small perturbations: the image is downsampled to 8x8 grayscale and each
//! pixel contributes one bit by comparing its luma against the mean.
//! Perceptually similar images are expected, not guaranteed, to collide.

use image::imageops::FilterType;
use image::DynamicImage;

/// Computes the 64-bit perceptual fingerprint of an image.
///
/// Deterministic and pure: the same pixels always produce the same value.
pub fn fingerprint(image: &DynamicImage) -> u64 {
    let small = image.resize_exact(8, 8, FilterType::Triangle).to_luma8();

    let mut lumas = [0u32; 64];
    for (i, pixel) in small.pixels().enumerate().take(64) {
        lumas[i] = pixel.0[0] as u32;
    }
    let mean = lumas.iter().sum::<u32>() / 64;

    let mut hash = 0u64;
    for luma in lumas {
        hash <<= 1;
        if luma >= mean {
            hash |= 1;
        }
    }
    hash
}

/// Formats a fingerprint as the fixed-width hex key used by the persisted
/// cache store.
pub fn fingerprint_key(fp: u64) -> String {
    format!("{:016x}", fp)
}

/// Parses a persisted cache key back into a fingerprint.
pub fn parse_fingerprint_key(key: &str) -> Option<u64> {
    u64::from_str_radix(key, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let v = ((x + y) * 255 / (width + height)) as u8;
            *pixel = Rgb([v, v, v]);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let img = gradient_image(64, 64);
        assert_eq!(fingerprint(&img), fingerprint(&img));
    }

    #[test]
    fn fingerprint_survives_lossless_reencoding() {
        let img = gradient_image(64, 64);

        let mut encoded = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut encoded),
            image::ImageFormat::Png,
        )
        .unwrap();
        let decoded = image::load_from_memory(&encoded).unwrap();

        assert_eq!(fingerprint(&img), fingerprint(&decoded));
    }

    #[test]
    fn different_images_differ() {
        let gradient = gradient_image(64, 64);

        let mut img = RgbImage::new(64, 64);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            let v = if x < 32 { 0 } else { 255 };
            *pixel = Rgb([v, v, v]);
        }
        let split = DynamicImage::ImageRgb8(img);

        assert_ne!(fingerprint(&gradient), fingerprint(&split));
    }

    #[test]
    fn key_round_trips() {
        let fp = 0xdead_beef_cafe_f00d_u64;
        assert_eq!(parse_fingerprint_key(&fingerprint_key(fp)), Some(fp));
        assert_eq!(fingerprint_key(fp).len(), 16);
    }

    #[test]
    fn malformed_key_is_rejected() {
        assert_eq!(parse_fingerprint_key("not-hex"), None);
    }
}
