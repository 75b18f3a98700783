//! Public configuration types: `Options`, presets, and the small closed
//! enums that back the `contourMethod` / `mode` option keys (§6).

use serde::{Deserialize, Serialize};

/// Curve-fitting mode for the final stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitMode {
    /// Simplify, detect corners, smooth, and fit cubic Béziers.
    Spline,
    /// Emit straight-line polygons (no smoothing or fitting).
    Polygon,
}

impl Default for FitMode {
    fn default() -> Self {
        FitMode::Spline
    }
}

/// Contour extraction backend. `Marching` is the only one implemented in
/// this crate; selecting `VTracer` or `Hybrid` is a recognized but
/// unimplemented request and the Coordinator rejects it with
/// `VectorizeError::UnsupportedFormat` rather than silently running
/// Marching instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContourMethod {
    Marching,
    VTracer,
    Hybrid,
}

impl Default for ContourMethod {
    fn default() -> Self {
        ContourMethod::Marching
    }
}

/// Named option bundles (§6). Each fixes every field of `Options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    Lineart,
    Logo,
    Illustration,
    Photo,
    Pixel,
    Simple,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Lineart => "lineart",
            Preset::Logo => "logo",
            Preset::Illustration => "illustration",
            Preset::Photo => "photo",
            Preset::Pixel => "pixel",
            Preset::Simple => "simple",
        }
    }

    pub fn all() -> &'static [Preset] {
        &[
            Preset::Lineart,
            Preset::Logo,
            Preset::Illustration,
            Preset::Photo,
            Preset::Pixel,
            Preset::Simple,
        ]
    }
}

impl std::str::FromStr for Preset {
    type Err = crate::error::VectorizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lineart" => Ok(Preset::Lineart),
            "logo" => Ok(Preset::Logo),
            "illustration" => Ok(Preset::Illustration),
            "photo" => Ok(Preset::Photo),
            "pixel" => Ok(Preset::Pixel),
            "simple" => Ok(Preset::Simple),
            other => Err(crate::error::VectorizeError::unknown_preset(other)),
        }
    }
}

/// The full set of recognized tunables (§6). Presets are just named
/// `Options` values (see `crate::presets`); callers may also start from a
/// preset and override individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Target palette size, 1..=64.
    pub num_colors: u32,
    /// Binary-mode color threshold (squared-distance merge scale uses this).
    pub color_tolerance: f64,
    /// RDP epsilon / fit-error base.
    pub path_tolerance: f64,
    /// Chaikin iteration count, clamped to [0, 3].
    pub smoothness: u8,
    /// Drop layers whose foreground pixel count is below this.
    pub min_path_length: u32,
    /// Force fitting (`Spline`) or straight-line emission (`Polygon`).
    pub mode: FitMode,
    /// Force the K=2 luminance binary path regardless of `num_colors`.
    pub binary_mode: bool,
    /// Gaussian sigma applied to the alpha field.
    pub blur_sigma: f64,
    /// Apply closing morphology after thresholding.
    pub morphology: bool,
    /// Contour extraction backend.
    pub contour_method: ContourMethod,
    /// Color-constrained dilation pass count (§9 Open Question: exposed,
    /// default 0, no preset currently sets it above 0).
    pub dilate_pixels: u32,
    /// Request "aggressive corner preservation" (raises the corner angle
    /// threshold from 130° to 140°, per §4.7).
    pub aggressive_corners: bool,
    /// Named bundle this `Options` was derived from, if any. Drives the
    /// Coordinator's preset-specific heuristics (denoise skip, staircase
    /// removal, fragmented-layer drop) independently of the individual
    /// field values above.
    pub preset: Option<Preset>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            num_colors: 16,
            color_tolerance: 25.0,
            path_tolerance: 1.0,
            smoothness: 1,
            min_path_length: 0,
            mode: FitMode::Spline,
            binary_mode: false,
            blur_sigma: 0.0,
            morphology: false,
            contour_method: ContourMethod::Marching,
            dilate_pixels: 0,
            aggressive_corners: false,
            preset: None,
        }
    }
}

impl Options {
    /// Validate fields that would otherwise make the pipeline behave
    /// nonsensically; this is the class-1 ("invalid input") boundary check
    /// from §7 for the `Options` half of the public API.
    pub fn validate(&self) -> crate::error::VectorizeResult<()> {
        use crate::error::VectorizeError;

        if self.num_colors == 0 || self.num_colors > 64 {
            return Err(VectorizeError::config_error(format!(
                "numColors must be in [1, 64], got {}",
                self.num_colors
            )));
        }
        if self.color_tolerance < 0.0 {
            return Err(VectorizeError::config_error(
                "colorTolerance must be non-negative",
            ));
        }
        if self.path_tolerance <= 0.0 {
            return Err(VectorizeError::config_error(
                "pathTolerance must be positive",
            ));
        }
        if self.smoothness > 3 {
            return Err(VectorizeError::config_error(
                "smoothness must be in [0, 3]",
            ));
        }
        if self.blur_sigma < 0.0 {
            return Err(VectorizeError::config_error(
                "blurSigma must be non-negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn default_options_validate() {
        assert!(Options::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_num_colors() {
        let opts = Options {
            num_colors: 0,
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = Options {
            num_colors: 65,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn preset_from_str_roundtrips() {
        for preset in Preset::all() {
            assert_eq!(Preset::from_str(preset.as_str()).unwrap(), *preset);
        }
        assert!(Preset::from_str("nonexistent").is_err());
    }
}
