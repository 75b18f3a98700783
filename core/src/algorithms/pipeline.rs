//! §4.10 Pipeline Coordinator: upscaling, palette/binary-mode selection,
//! the per-layer loop (the one parallel stage, §5), noise floors,
//! fragmented- and global small-layer filters, and final ordering.

use crate::algorithms::classifier::{classify_pixels, denoise_pass, TRANSPARENT};
use crate::algorithms::contour::{trace_contours, TracedContour};
use crate::algorithms::corner::detect_corners_with;
use crate::algorithms::fit::{fit_contour, CubicBezier};
use crate::algorithms::geometry::{Color, Contour, Point};
use crate::algorithms::layer::{binary_gray_field, build_layer};
use crate::algorithms::palette::{build_palette, Palette};
use crate::algorithms::simplify::simplify_contour;
use crate::algorithms::smooth::smooth_path;
use crate::config::{FitMode, Options, Preset};
use crate::error::VectorizeResult;
use crate::execution::execute_parallel;
use image::{imageops::FilterType, RgbaImage};

/// A single rendered vector path: geometry plus style, §3 "Path".
#[derive(Debug, Clone)]
pub struct Path {
    pub d: String,
    pub fill: Color,
    pub fill_rule: &'static str,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    /// Bounding-box area in working-resolution coordinates; used by the
    /// small-layer filters so they never have to re-parse `d` (§9 Open
    /// Question 3).
    pub bbox_area: f64,
}

/// One palette color plus its rendered paths, §3 "Layer".
#[derive(Debug, Clone)]
pub struct Layer {
    pub color: Color,
    pub paths: Vec<Path>,
}

/// Top-level pipeline output, §3 "Vector result".
#[derive(Debug, Clone)]
pub struct VectorResult {
    pub svg: String,
    pub width: u32,
    pub height: u32,
    pub view_box_width: u32,
    pub view_box_height: u32,
    /// Stored dark→bright (ascending luma), per the §3 ordering contract.
    pub layers: Vec<Layer>,
    pub paths: Vec<Path>,
    pub colors: Palette,
    pub engine: String,
}

const ENGINE_NAME: &str = "rastervec-core";

/// Run the full coordinator over an already-validated image and options.
pub fn run(image: &RgbaImage, options: &Options) -> VectorizeResult<VectorResult> {
    match options.contour_method {
        crate::config::ContourMethod::Marching => {}
        other => {
            return Err(crate::error::VectorizeError::unsupported_format(format!("{other:?}")));
        }
    }

    let src_width = image.width();
    let src_height = image.height();

    if is_fully_transparent(image) {
        log::info!("image has no opaque pixels; returning background-only result");
        return Ok(background_only_result(src_width, src_height, Color::new(255, 255, 255)));
    }

    let pixel_preset = options.preset == Some(Preset::Pixel);
    let (working, scale_factor) = maybe_upscale(image, pixel_preset);
    let work_width = working.width();
    let work_height = working.height();

    log::info!(
        "starting vectorization: preset={:?} src={src_width}x{src_height} work={work_width}x{work_height} scale={scale_factor}",
        options.preset
    );

    let binary_mode_active = options.binary_mode || options.num_colors <= 2;

    let (palette, map, shared_gray) = if binary_mode_active {
        let threshold = otsu_threshold(&working);
        let gray = binary_gray_field(&working, options.blur_sigma, threshold);
        let map = classify_binary(&working, &gray, threshold, !pixel_preset);
        (vec![Color::new(0, 0, 0)], map, Some(gray))
    } else {
        let palette = build_palette(&working, options.num_colors, options.preset);
        let map = classify_pixels(&working, &palette, pixel_preset);
        (palette, map, None)
    };

    // Noise-floor bounds (§4.10) are expressed in original-pixel terms. The
    // `maybe_upscale` step above inflates fragment areas by `scale_factor^2`
    // without growing `work_area` proportionally (it's pinned near 256^2),
    // so floors must be computed from `src_area` and contour areas rescaled
    // back down by `scale_sq` at comparison time, not the other way around.
    let scale_sq = (scale_factor as f64) * (scale_factor as f64);
    let src_area = (src_width as f64) * (src_height as f64);
    // Cap at half the source area so the floor's absolute minimum can never
    // exceed the one shape a tiny source image is actually made of.
    let noise_floor = match options.preset {
        Some(Preset::Pixel) => 1.0,
        Some(Preset::Logo) => (src_area * 0.001).clamp(25.0, 200.0).min(src_area * 0.5),
        _ => (src_area * 0.0001).clamp(4.0, 50.0).min(src_area * 0.5),
    };
    let hole_floor = noise_floor / 2.0;

    let indices: Vec<u8> = (0..palette.len() as u8).collect();
    let built_layers: Vec<Option<Layer>> = execute_parallel(indices, |index| {
        build_one_layer(
            &working,
            &map,
            &palette,
            index,
            options,
            shared_gray.as_deref(),
            noise_floor,
            hole_floor,
            work_width as usize,
            work_height as usize,
            scale_sq,
            binary_mode_active,
        )
    });

    let mut layers: Vec<Layer> = built_layers.into_iter().flatten().collect();

    global_small_layer_filter(&mut layers, options.preset, scale_sq);

    let background = if binary_mode_active {
        Color::new(255, 255, 255)
    } else {
        *palette.last().unwrap()
    };

    let svg = crate::svg::render_svg(src_width, src_height, work_width, work_height, &layers, background);
    let paths: Vec<Path> = layers.iter().flat_map(|l| l.paths.clone()).collect();

    Ok(VectorResult {
        svg,
        width: src_width,
        height: src_height,
        view_box_width: work_width,
        view_box_height: work_height,
        layers,
        paths,
        colors: palette,
        engine: ENGINE_NAME.to_string(),
    })
}

fn is_fully_transparent(image: &RgbaImage) -> bool {
    image.pixels().all(|p| p.0[3] < 128)
}

fn background_only_result(width: u32, height: u32, background: Color) -> VectorResult {
    let svg = crate::svg::render_svg(width, height, width, height, &[], background);
    VectorResult {
        svg,
        width,
        height,
        view_box_width: width,
        view_box_height: height,
        layers: Vec::new(),
        paths: Vec::new(),
        colors: Vec::new(),
        engine: ENGINE_NAME.to_string(),
    }
}

/// Upscale by `ceil(256 / max(W,H))` when the source is smaller than 256 in
/// its larger dimension; bilinear normally, nearest-neighbor for `pixel`.
fn maybe_upscale(image: &RgbaImage, pixel_preset: bool) -> (RgbaImage, u32) {
    let max_dim = image.width().max(image.height()).max(1);
    if max_dim >= 256 {
        return (image.clone(), 1);
    }
    let factor = (256 + max_dim - 1) / max_dim;
    let filter = if pixel_preset { FilterType::Nearest } else { FilterType::Triangle };
    let resized = image::imageops::resize(image, image.width() * factor, image.height() * factor, filter);
    (resized, factor)
}

/// Standard Otsu's method over the luminance histogram of opaque pixels.
fn otsu_threshold(image: &RgbaImage) -> u8 {
    let mut histogram = [0u64; 256];
    let mut total = 0u64;
    for pixel in image.pixels() {
        if pixel.0[3] < 128 {
            continue;
        }
        let luma = (0.299 * pixel.0[0] as f64 + 0.587 * pixel.0[1] as f64 + 0.114 * pixel.0[2] as f64).round() as usize;
        histogram[luma.min(255)] += 1;
        total += 1;
    }
    if total == 0 {
        return 128;
    }

    let sum_total: f64 = histogram.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();
    let mut sum_background = 0.0;
    let mut weight_background = 0u64;
    let mut best_variance = -1.0;
    let mut best_threshold = 128u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }
        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;
        let between_variance =
            weight_background as f64 * weight_foreground as f64 * (mean_background - mean_foreground).powi(2);
        if between_variance > best_variance {
            best_variance = between_variance;
            best_threshold = t as u8;
        }
    }
    best_threshold
}

/// Binary-mode pixel classification: opaque pixels darker than `threshold`
/// become the single ink color (index 0); everything else is transparent.
fn classify_binary(image: &RgbaImage, gray: &[u8], threshold: u8, denoise: bool) -> Vec<u8> {
    let mut map: Vec<u8> = image
        .pixels()
        .zip(gray.iter())
        .map(|(p, &g)| {
            if p.0[3] < 128 || g >= threshold {
                TRANSPARENT
            } else {
                0
            }
        })
        .collect();

    if denoise {
        let width = image.width() as usize;
        let height = image.height() as usize;
        for _ in 0..2 {
            denoise_pass(&mut map, width, height);
        }
    }
    map
}

#[allow(clippy::too_many_arguments)]
fn build_one_layer(
    image: &RgbaImage,
    map: &[u8],
    palette: &Palette,
    index: u8,
    options: &Options,
    shared_gray: Option<&[u8]>,
    noise_floor: f64,
    hole_floor: f64,
    width: usize,
    height: usize,
    scale_sq: f64,
    binary_mode_active: bool,
) -> Option<Layer> {
    let built = build_layer(image, map, palette, index, options, shared_gray);
    let traced = trace_contours(&built.bitmap, &built.alpha, width, height);

    let kept: Vec<TracedContour> = traced
        .into_iter()
        .filter(|c| {
            let floor = if c.is_outer { noise_floor } else { hole_floor };
            (c.area.abs() / scale_sq) >= floor
        })
        .collect();

    if kept.is_empty() {
        return None;
    }

    if fragmented_layer_should_drop(&kept, options.preset, width, height, scale_sq) {
        log::debug!("dropping fragmented layer for palette index {index}");
        return None;
    }

    let color = palette[index as usize];
    let add_stroke = options.preset != Some(Preset::Pixel);
    // Binary/luminance layers are traced with explicit outer/hole contours
    // that self-intersect by construction (§3 "Path"); alpha-field color
    // layers from the other presets don't nest that way.
    let fill_rule = if binary_mode_active { "evenodd" } else { "nonzero" };

    let outers: Vec<&TracedContour> = kept.iter().filter(|c| c.is_outer).collect();
    let holes: Vec<&TracedContour> = kept.iter().filter(|c| !c.is_outer).collect();

    let mut paths = Vec::with_capacity(outers.len());
    for outer in &outers {
        let mut d = render_contour_fragment(outer, options);
        let mut bbox = bounding_box(&outer.points);

        for hole in &holes {
            if point_in_polygon(hole.points[0], &outer.points) {
                d.push(' ');
                d.push_str(&render_contour_fragment(hole, options));
                bbox = bbox.max(bounding_box(&hole.points));
            }
        }

        paths.push(Path {
            d,
            fill: color,
            fill_rule,
            stroke: if add_stroke { Some(color) } else { None },
            stroke_width: 1.0,
            bbox_area: bbox,
        });
    }

    if paths.is_empty() {
        return None;
    }
    Some(Layer { color, paths })
}

/// Contour-size policy (§4.9): tiny contours and `mode = polygon` skip
/// straight to a polygon; `pixel` always emits a coarse polygon; otherwise
/// run the full simplify→corner→smooth→fit chain, upscaled 3× for small
/// contours to improve numeric precision, then scaled back down.
fn render_contour_fragment(contour: &TracedContour, options: &Options) -> String {
    let area = contour.area.abs();
    let point_count = contour.points.len().saturating_sub(1);
    let is_outer = contour.is_outer;

    if options.preset == Some(Preset::Pixel) {
        let simplified = simplify_contour(&contour.points, 0.75, false);
        return polyline_to_path_data(&simplified);
    }

    if options.mode == FitMode::Polygon || area < 30.0 || point_count < 12 {
        let simplified = simplify_contour(&contour.points, options.path_tolerance.max(0.5), false);
        return polyline_to_path_data(&simplified);
    }

    let upscale = area < 500.0 || perimeter(&contour.points) < 40.0;
    let scale = if upscale { 3.0 } else { 1.0 };

    let scaled: Contour = contour.points.iter().map(|p| p.scale(scale)).collect();
    let remove_staircases = matches!(options.preset, Some(Preset::Lineart) | Some(Preset::Logo));
    let simplified = simplify_contour(&scaled, options.path_tolerance * scale, remove_staircases);

    let corners = detect_corners_with(&simplified, options.aggressive_corners, 4);
    let body = closed_body(&simplified);
    let corner_positions: Vec<Point> = corners.iter().map(|&i| body[i]).collect();

    let smoothed = smooth_path(&simplified, options.smoothness, &corner_positions);
    let smoothed_body = closed_body(&smoothed);
    let smoothed_corners = reindex_corners(&smoothed_body, &corner_positions);

    let fitter = crate::algorithms::fit::resolve_fitter();
    let perim = perimeter(&simplified);
    let curves = fit_contour(
        &smoothed_body,
        &smoothed_corners,
        perim,
        options.path_tolerance,
        is_outer,
        fitter.as_ref(),
    );

    bezier_path_data(&curves, scale)
}

fn closed_body(points: &Contour) -> Vec<Point> {
    if points.len() >= 2 && points[0] == *points.last().unwrap() {
        points[..points.len() - 1].to_vec()
    } else {
        points.clone()
    }
}

/// Find each preserved corner's index in the (possibly longer, after
/// Chaikin subdivision) smoothed body by exact position match — the
/// smoother emits flagged corner points unchanged, so this is a lookup,
/// not an approximation.
fn reindex_corners(smoothed_body: &[Point], corner_positions: &[Point]) -> Vec<usize> {
    corner_positions
        .iter()
        .filter_map(|c| smoothed_body.iter().position(|p| p.distance_to(c) < 1e-6))
        .collect()
}

fn perimeter(points: &Contour) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

fn polyline_to_path_data(points: &Contour) -> String {
    use std::fmt::Write;
    let mut d = String::new();
    if let Some(first) = points.first() {
        let _ = write!(d, "M {:.2},{:.2}", first.x, first.y);
        for p in &points[1..] {
            let _ = write!(d, " L {:.2},{:.2}", p.x, p.y);
        }
        d.push_str(" Z");
    }
    d
}

fn bezier_path_data(curves: &[CubicBezier], scale: f64) -> String {
    use std::fmt::Write;
    let mut d = String::new();
    if let Some(first) = curves.first() {
        let p0 = first.p0.scale(1.0 / scale);
        let _ = write!(d, "M {:.2},{:.2}", p0.x, p0.y);
    }
    for curve in curves {
        let c1 = curve.c1.scale(1.0 / scale);
        let c2 = curve.c2.scale(1.0 / scale);
        let p3 = curve.p3.scale(1.0 / scale);
        let _ = write!(d, " C {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}", c1.x, c1.y, c2.x, c2.y, p3.x, p3.y);
    }
    d.push_str(" Z");
    d
}

fn bounding_box(points: &Contour) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    (max_x - min_x).max(0.0) * (max_y - min_y).max(0.0)
}

fn point_in_polygon(p: Point, polygon: &Contour) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_intersect = (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x;
            if p.x < x_intersect {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn fragmented_layer_should_drop(
    contours: &[TracedContour],
    preset: Option<Preset>,
    width: usize,
    height: usize,
    scale_sq: f64,
) -> bool {
    if !matches!(preset, Some(Preset::Logo) | Some(Preset::Lineart)) {
        return false;
    }
    let total_area: f64 = contours.iter().map(|c| c.area.abs()).sum();
    let max_area = contours.iter().map(|c| c.area.abs()).fold(0.0, f64::max);
    let image_area = (width * height) as f64;
    total_area < 0.005 * image_area && (max_area / scale_sq) < 300.0 && contours.len() > 10
}

fn global_small_layer_filter(layers: &mut Vec<Layer>, preset: Option<Preset>, scale_sq: f64) {
    if preset == Some(Preset::Pixel) {
        return;
    }
    let max_native_bbox = layers
        .iter()
        .flat_map(|l| l.paths.iter())
        .map(|p| p.bbox_area / scale_sq)
        .fold(0.0, f64::max);
    if max_native_bbox <= 0.0 {
        return;
    }
    let cutoff_native = (max_native_bbox / 500.0).clamp(4.0, 100.0);
    layers.retain(|l| {
        let total_native: f64 = l.paths.iter().map(|p| p.bbox_area / scale_sq).sum();
        total_native >= cutoff_native
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid_image(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_fn(w, h, |_, _| Rgba(color))
    }

    #[test]
    fn fully_transparent_image_yields_background_only() {
        let img = RgbaImage::new(16, 16);
        let result = run(&img, &Options::default()).unwrap();
        assert!(result.layers.is_empty());
        assert!(result.svg.contains("#ffffff"));
        assert!(!result.svg.contains("<path"));
    }

    #[test]
    fn solid_black_image_yields_one_layer_one_path() {
        let img = solid_image(2, 2, [0, 0, 0, 255]);
        let result = run(&img, &Options::default()).unwrap();
        assert_eq!(result.layers.len(), 1);
        assert_eq!(result.layers[0].color, Color::new(0, 0, 0));
        assert_eq!(result.layers[0].paths.len(), 1);
    }

    #[test]
    fn small_image_is_upscaled_past_256() {
        let img = solid_image(10, 10, [0, 0, 0, 255]);
        let result = run(&img, &Options::default()).unwrap();
        assert!(result.view_box_width > result.width);
        assert!(result.view_box_width >= 256);
    }

    #[test]
    fn unimplemented_contour_method_is_rejected() {
        let img = solid_image(8, 8, [0, 0, 0, 255]);
        let mut opts = Options::default();
        opts.contour_method = crate::config::ContourMethod::VTracer;
        let err = run(&img, &opts).unwrap_err();
        assert!(matches!(err, crate::error::VectorizeError::UnsupportedFormat { .. }));
    }

    #[test]
    fn lineart_rectangle_outline_has_hole_path() {
        let mut img = RgbaImage::from_fn(32, 32, |_, _| Rgba([255, 255, 255, 255]));
        for y in 4..28 {
            for x in 4..28 {
                let border = x == 4 || x == 27 || y == 4 || y == 27;
                if border {
                    img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
                }
            }
        }
        let opts = crate::presets::options_for(Preset::Lineart);
        let result = run(&img, &opts).unwrap();
        assert_eq!(result.layers.len(), 1);
        assert_eq!(result.layers[0].paths.len(), 1);
        assert!(result.layers[0].paths[0].d.matches(" M ").count() >= 1);
        assert_eq!(result.layers[0].paths[0].fill_rule, "evenodd");
    }
}
