//! # rastervec-core
//!
//! Core raster-to-vector conversion algorithms: palette building, pixel
//! classification, layer construction, Marching Squares contour tracing,
//! simplification, corner detection, smoothing, and cubic Bézier fitting,
//! assembled into layered SVG output by the pipeline coordinator.

pub mod algorithms;
pub mod config;
pub mod error;
pub mod execution;
pub mod presets;
pub mod svg;

pub use algorithms::{analyze_image, Layer, Path, Recommendation, VectorResult};
pub use config::{ContourMethod, FitMode, Options, Preset};
pub use error::{VectorizeError, VectorizeResult};

use image::RgbaImage;

const MAX_DIMENSION: u32 = 16_384;

/// Vectorize `image` with caller-supplied `options`.
///
/// Validates dimensions and `options` before running the pipeline (§7 class
/// 1 errors); anything past that point is handled internally by the
/// Coordinator (degenerate fully-transparent input, K larger than the
/// distinct-color count, and so on all produce a valid, possibly empty,
/// result rather than an error).
pub fn vectorize(image: &RgbaImage, options: &Options) -> VectorizeResult<VectorResult> {
    validate_image(image)?;
    options.validate()?;
    algorithms::pipeline::run(image, options)
}

/// Vectorize `image` using a named preset bundle, with no further override.
pub fn vectorize_with_preset(image: &RgbaImage, preset: Preset) -> VectorizeResult<VectorResult> {
    let options = presets::options_for(preset);
    vectorize(image, &options)
}

/// Vectorize `image` without a caller-chosen preset: run the Image Analyzer
/// first and use its recommendation, remapping `photo` to `illustration`
/// per §4.2 (the analyzer reports the raw detection; only an explicit
/// `photo` request from a caller should produce photo-preset output).
pub fn vectorize_auto(image: &RgbaImage) -> VectorizeResult<VectorResult> {
    validate_image(image)?;
    let recommendation = algorithms::analyze_image(image);
    let preset = match recommendation.preset {
        Preset::Photo => Preset::Illustration,
        other => other,
    };
    log::info!(
        "auto-detected preset {:?} (analyzer recommended {:?}, suggested_k={})",
        preset,
        recommendation.preset,
        recommendation.suggested_k
    );

    let mut options = presets::options_for(preset);
    options.num_colors = recommendation.suggested_k.clamp(1, 64);
    vectorize(image, &options)
}

fn validate_image(image: &RgbaImage) -> VectorizeResult<()> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(VectorizeError::invalid_dimensions(width, height, "dimensions must be non-zero"));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(VectorizeError::invalid_dimensions(
            width,
            height,
            format!("dimensions must not exceed {MAX_DIMENSION}"),
        ));
    }

    let expected = width as usize * height as usize * 4;
    let actual = image.as_raw().len();
    if actual != expected {
        return Err(VectorizeError::insufficient_data(expected, actual));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn rejects_zero_dimensions() {
        let image = RgbaImage::new(0, 10);
        let err = vectorize(&image, &Options::default()).unwrap_err();
        assert!(matches!(err, VectorizeError::InvalidDimensions { .. }));
    }

    #[test]
    fn rejects_dimensions_over_the_limit() {
        let huge =
            image::ImageBuffer::from_raw(MAX_DIMENSION + 1, 1, vec![0u8; (MAX_DIMENSION as usize + 1) * 4]).unwrap();
        let err = vectorize(&huge, &Options::default()).unwrap_err();
        assert!(matches!(err, VectorizeError::InvalidDimensions { .. }));
    }

    #[test]
    fn rejects_invalid_options() {
        let image = RgbaImage::new(4, 4);
        let mut options = Options::default();
        options.num_colors = 0;
        let err = vectorize(&image, &options).unwrap_err();
        assert!(matches!(err, VectorizeError::ConfigError { .. }));
    }

    #[test]
    fn vectorize_with_preset_runs_end_to_end() {
        let image = RgbaImage::from_fn(8, 8, |_, _| Rgba([20, 20, 20, 255]));
        let result = vectorize_with_preset(&image, Preset::Lineart).unwrap();
        assert!(!result.svg.is_empty());
        assert_eq!(result.layers.len(), 1);
    }

    #[test]
    fn vectorize_auto_remaps_photo_recommendation_to_illustration() {
        let image = RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([((x * 4) % 256) as u8, ((y * 4) % 256) as u8, 128, 255])
        });
        let result = vectorize_auto(&image).unwrap();
        assert!(!result.colors.is_empty());
    }
}
