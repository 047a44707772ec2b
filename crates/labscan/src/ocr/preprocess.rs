//! Image preprocessing ahead of optical recognition.
//!
//! The fixed pipeline: contrast boost, sharpness boost, grayscale
//! conversion. When advanced cleanup is enabled (the default), a Gaussian
//! blur removes sensor noise, Otsu-thresholded binarization separates ink
//! from paper, and a morphological close-then-open removes speckling.

use image::{DynamicImage, GrayImage};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{close, open};
use serde::{Deserialize, Serialize};

/// Preprocessing knobs.
///
/// The boost factors are fixed defaults tuned for scanned lab reports;
/// `advanced_cleanup` gates the blur/binarize/morphology steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessOptions {
    /// Contrast adjustment passed to the image pipeline
    pub contrast_boost: f32,
    /// Unsharp-mask sigma for sharpness enhancement
    pub sharpen_sigma: f32,
    /// Unsharp-mask threshold
    pub sharpen_threshold: i32,
    /// Gaussian blur sigma for noise removal (advanced cleanup)
    pub blur_sigma: f32,
    /// Enable blur + Otsu binarization + morphological cleanup
    pub advanced_cleanup: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            contrast_boost: 25.0,
            sharpen_sigma: 2.0,
            sharpen_threshold: 2,
            blur_sigma: 0.8,
            advanced_cleanup: true,
        }
    }
}

/// Run the preprocessing pipeline, producing the grayscale image handed to
/// the recognizer.
pub fn preprocess(image: &DynamicImage, options: &PreprocessOptions) -> GrayImage {
    let enhanced = image.adjust_contrast(options.contrast_boost);
    let sharpened = enhanced.unsharpen(options.sharpen_sigma, options.sharpen_threshold);
    let mut gray = sharpened.to_luma8();

    if options.advanced_cleanup {
        gray = gaussian_blur_f32(&gray, options.blur_sigma);
        let level = otsu_level(&gray);
        gray = threshold(&gray, level, ThresholdType::Binary);
        gray = close(&gray, Norm::LInf, 1);
        gray = open(&gray, Norm::LInf, 1);
    }

    gray
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn test_image() -> DynamicImage {
        let mut img = RgbImage::new(32, 32);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            // Dark "text" block on light background
            if (8..24).contains(&x) && (12..20).contains(&y) {
                *pixel = Rgb([20, 20, 20]);
            } else {
                *pixel = Rgb([235, 235, 235]);
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_preprocess_preserves_dimensions() {
        let gray = preprocess(&test_image(), &PreprocessOptions::default());
        assert_eq!(gray.dimensions(), (32, 32));
    }

    #[test]
    fn test_advanced_cleanup_binarizes() {
        let gray = preprocess(&test_image(), &PreprocessOptions::default());
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_without_advanced_cleanup_stays_grayscale() {
        let options = PreprocessOptions {
            advanced_cleanup: false,
            ..Default::default()
        };
        let gray = preprocess(&test_image(), &options);
        assert_eq!(gray.dimensions(), (32, 32));
        // Contrast/sharpen only: both dark and light regions survive
        let (min, max) = gray
            .pixels()
            .fold((u8::MAX, u8::MIN), |(min, max), p| (min.min(p.0[0]), max.max(p.0[0])));
        assert!(min < 128);
        assert!(max > 128);
    }
}
