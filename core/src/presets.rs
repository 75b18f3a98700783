//! Named option bundles (§6). Presets are code-defined, not loaded from
//! disk — the on-disk preset lookup table is an external collaborator's
//! concern; this module is the in-memory table it would read from.

use crate::config::{ContourMethod, FitMode, Options, Preset};
use once_cell::sync::Lazy;
use std::collections::HashMap;

static TABLE: Lazy<HashMap<Preset, Options>> = Lazy::new(build_table);

/// Resolve a preset tag to its fixed `Options` bundle.
pub fn options_for(preset: Preset) -> Options {
    TABLE
        .get(&preset)
        .cloned()
        .expect("all Preset variants are populated in build_table")
}

fn build_table() -> HashMap<Preset, Options> {
    let mut table = HashMap::new();

    table.insert(
        Preset::Lineart,
        Options {
            num_colors: 2,
            color_tolerance: 35.0,
            path_tolerance: 0.75,
            smoothness: 0,
            min_path_length: 0,
            mode: FitMode::Spline,
            binary_mode: true,
            blur_sigma: 0.6,
            morphology: true,
            contour_method: ContourMethod::Marching,
            dilate_pixels: 0,
            aggressive_corners: true,
            preset: Some(Preset::Lineart),
        },
    );

    table.insert(
        Preset::Logo,
        Options {
            num_colors: 8,
            color_tolerance: 45.0,
            path_tolerance: 1.0,
            smoothness: 1,
            min_path_length: 0,
            mode: FitMode::Spline,
            binary_mode: false,
            blur_sigma: 0.5,
            morphology: true,
            contour_method: ContourMethod::Marching,
            dilate_pixels: 0,
            aggressive_corners: true,
            preset: Some(Preset::Logo),
        },
    );

    table.insert(
        Preset::Illustration,
        Options {
            num_colors: 24,
            color_tolerance: 35.0,
            path_tolerance: 1.2,
            smoothness: 2,
            min_path_length: 0,
            mode: FitMode::Spline,
            binary_mode: false,
            blur_sigma: 0.8,
            morphology: false,
            contour_method: ContourMethod::Marching,
            dilate_pixels: 0,
            aggressive_corners: false,
            preset: Some(Preset::Illustration),
        },
    );

    table.insert(
        Preset::Photo,
        Options {
            num_colors: 48,
            color_tolerance: 35.0,
            path_tolerance: 1.5,
            smoothness: 2,
            min_path_length: 0,
            mode: FitMode::Spline,
            binary_mode: false,
            blur_sigma: 1.0,
            morphology: false,
            contour_method: ContourMethod::Marching,
            dilate_pixels: 0,
            aggressive_corners: false,
            preset: Some(Preset::Photo),
        },
    );

    table.insert(
        Preset::Pixel,
        Options {
            num_colors: 32,
            color_tolerance: 25.0,
            path_tolerance: 0.75,
            smoothness: 0,
            min_path_length: 0,
            mode: FitMode::Polygon,
            binary_mode: false,
            blur_sigma: 0.0,
            morphology: false,
            contour_method: ContourMethod::Marching,
            dilate_pixels: 0,
            aggressive_corners: false,
            preset: Some(Preset::Pixel),
        },
    );

    table.insert(
        Preset::Simple,
        Options {
            num_colors: 6,
            color_tolerance: 45.0,
            path_tolerance: 1.0,
            smoothness: 1,
            min_path_length: 0,
            mode: FitMode::Spline,
            binary_mode: false,
            blur_sigma: 0.4,
            morphology: false,
            contour_method: ContourMethod::Marching,
            dilate_pixels: 0,
            aggressive_corners: false,
            preset: Some(Preset::Simple),
        },
    );

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_has_a_bundle_and_validates() {
        for &preset in Preset::all() {
            let opts = options_for(preset);
            assert_eq!(opts.preset, Some(preset));
            assert!(opts.validate().is_ok(), "{preset:?} options should validate");
        }
    }

    #[test]
    fn pixel_preset_forces_polygon_mode() {
        assert_eq!(options_for(Preset::Pixel).mode, FitMode::Polygon);
    }

    #[test]
    fn lineart_preset_is_binary_mode() {
        assert!(options_for(Preset::Lineart).binary_mode);
    }
}
