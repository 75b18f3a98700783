//! Vectorization algorithms module
//!
//! This module contains all the vectorization algorithms and related utilities.

pub mod geometry;
pub mod palette;
pub mod analyzer;
pub mod classifier;
pub mod layer;
pub mod contour;
pub mod simplify;
pub mod corner;
pub mod smooth;
pub mod fit;
pub mod pipeline;

pub use geometry::{Color, Contour, Point};
pub use palette::{build_palette, Palette};
pub use analyzer::{analyze_image, Recommendation};
pub use pipeline::{Layer, Path, VectorResult};
