//! §4.9 Curve Fitter: corner-segmented cubic Bézier fitting with an
//! injectable external-fitter seam, a built-in least-squares fallback, a
//! Catmull-Rom last resort, and handle retraction on outer contours.

use crate::algorithms::geometry::Point;
use crate::error::VectorizeError;
use nalgebra::Matrix2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: Point,
    pub c1: Point,
    pub c2: Point,
    pub p3: Point,
}

impl CubicBezier {
    /// `"C"` path-data segment with 2-decimal coordinates, per §6.
    pub fn to_svg_segment(&self) -> String {
        format!(
            "C {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}",
            self.c1.x, self.c1.y, self.c2.x, self.c2.y, self.p3.x, self.p3.y
        )
    }
}

/// Fixed external-fitter contract (§9 Design Notes): a compile-time
/// dependency with a stable `fit` signature rather than runtime library
/// loading. `Err` or an empty result both fall back to the built-in fitter.
pub trait CurveFitter: Send + Sync {
    fn fit(&self, points: &[Point], max_error: f64) -> Result<Vec<CubicBezier>, VectorizeError>;
}

/// The only `CurveFitter` compiled into this crate by default. Always
/// succeeds; numeric degeneracy is absorbed internally (§7 class 3).
pub struct BuiltinFitter;

impl CurveFitter for BuiltinFitter {
    fn fit(&self, points: &[Point], max_error: f64) -> Result<Vec<CubicBezier>, VectorizeError> {
        Ok(vec![fit_single_segment(points, max_error)])
    }
}

/// Feature-gated seam for a linked-in external fitter. No such crate is in
/// this workspace's dependency stack (see DESIGN.md), so the seam exists
/// but is never enabled; it documents where one would plug in, the way the
/// teacher's `ExternalAlgorithms` wrapper documents its vtracer/potrace
/// seam with the same always-`Err` shape when the feature is off.
#[cfg(feature = "external-fitter")]
pub struct ExternalFitter;

#[cfg(feature = "external-fitter")]
impl CurveFitter for ExternalFitter {
    fn fit(&self, _points: &[Point], _max_error: f64) -> Result<Vec<CubicBezier>, VectorizeError> {
        Err(VectorizeError::algorithm_error(
            "external curve fitter feature compiled without a backing implementation",
        ))
    }
}

/// Resolve the fitter to use, fixed at build time.
pub fn resolve_fitter() -> Box<dyn CurveFitter> {
    #[cfg(feature = "external-fitter")]
    {
        Box::new(ExternalFitter)
    }
    #[cfg(not(feature = "external-fitter"))]
    {
        Box::new(BuiltinFitter)
    }
}

/// Fit a closed, corner-segmented polyline to cubic Béziers.
///
/// `body` is the simplified/smoothed point list with no closing repeat;
/// `corners` are sorted indices into `body` the fit must pass through
/// exactly. An empty corner set fits the whole loop as one segment.
pub fn fit_contour(
    body: &[Point],
    corners: &[usize],
    perimeter: f64,
    path_tolerance: f64,
    is_outer: bool,
    fitter: &dyn CurveFitter,
) -> Vec<CubicBezier> {
    if body.len() < 3 {
        return Vec::new();
    }

    let fit_error = (path_tolerance.max(0.8) + ((perimeter - 100.0) / 500.0).min(0.5)).max(0.1);
    let segments = segment_by_corners(body, corners);

    let mut beziers = Vec::with_capacity(segments.len());
    for segment in &segments {
        let mut curve = fit_with_fallback(fitter, segment, fit_error);
        if is_outer {
            retract_handles(&mut curve);
        }
        beziers.push(curve);
    }
    beziers
}

fn segment_by_corners<'a>(body: &'a [Point], corners: &[usize]) -> Vec<Vec<Point>> {
    let n = body.len();
    if corners.is_empty() {
        let mut whole: Vec<Point> = body.to_vec();
        whole.push(body[0]);
        return vec![whole];
    }

    let mut sorted = corners.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut segments = Vec::with_capacity(sorted.len());
    for w in 0..sorted.len() {
        let start = sorted[w];
        let end = sorted[(w + 1) % sorted.len()];
        let mut segment = Vec::new();
        let mut i = start;
        loop {
            segment.push(body[i]);
            if i == end {
                break;
            }
            i = (i + 1) % n;
        }
        if segment.len() >= 2 {
            segments.push(segment);
        }
    }
    segments
}

fn fit_with_fallback(fitter: &dyn CurveFitter, points: &[Point], max_error: f64) -> CubicBezier {
    match fitter.fit(points, max_error) {
        Ok(curves) if !curves.is_empty() => curves[0],
        _ => {
            log::warn!("curve fitter produced no result; falling back to built-in least squares");
            match BuiltinFitter.fit(points, max_error) {
                Ok(curves) if !curves.is_empty() => curves[0],
                _ => catmull_rom_handles(points),
            }
        }
    }
}

/// Chord-length parametrize, estimate end tangents from up to four offset
/// vectors, solve the 2×2 normal equations (Graphics-Gems-style curve
/// fit) for the two handle magnitudes, clamp to `[0.1·L, 0.6·L]`. Falls
/// back to `L/3` handles when the system is singular.
fn fit_single_segment(points: &[Point], _max_error: f64) -> CubicBezier {
    let p0 = points[0];
    let p3 = *points.last().unwrap();
    let l = p0.distance_to(&p3).max(1e-6);

    if points.len() < 3 {
        return catmull_rom_handles(points);
    }

    let t_hat1 = estimate_tangent(points, false);
    let t_hat2 = estimate_tangent(points, true);

    let params = chord_length_parametrize(points);

    let mut c00 = 0.0;
    let mut c01 = 0.0;
    let mut c11 = 0.0;
    let mut x0 = 0.0;
    let mut x1 = 0.0;

    for (point, &u) in points.iter().zip(params.iter()) {
        let b0 = (1.0 - u).powi(3);
        let b1 = 3.0 * u * (1.0 - u).powi(2);
        let b2 = 3.0 * u * u * (1.0 - u);
        let b3 = u.powi(3);

        let a1 = t_hat1.scale(b1);
        let a2 = t_hat2.scale(b2);

        let endpoint_term = Point::new(
            p0.x * (b0 + b1) + p3.x * (b2 + b3),
            p0.y * (b0 + b1) + p3.y * (b2 + b3),
        );
        let tmp = point.sub(&endpoint_term);

        c00 += a1.x * a1.x + a1.y * a1.y;
        c01 += a1.x * a2.x + a1.y * a2.y;
        c11 += a2.x * a2.x + a2.y * a2.y;
        x0 += a1.x * tmp.x + a1.y * tmp.y;
        x1 += a2.x * tmp.x + a2.y * tmp.y;
    }

    let matrix = Matrix2::new(c00, c01, c01, c11);
    let det = matrix.determinant();

    let (mut alpha1, mut alpha2) = if det.abs() > 1e-6 {
        let rhs = nalgebra::Vector2::new(x0, x1);
        match matrix.lu().solve(&rhs) {
            Some(solution) => (solution[0], solution[1]),
            None => (l / 3.0, l / 3.0),
        }
    } else {
        (l / 3.0, l / 3.0)
    };

    let min_handle = 0.1 * l;
    let max_handle = 0.6 * l;
    alpha1 = alpha1.clamp(min_handle, max_handle);
    alpha2 = alpha2.clamp(min_handle, max_handle);

    CubicBezier {
        p0,
        c1: p0.add(&t_hat1.scale(alpha1)),
        c2: p3.add(&t_hat2.scale(alpha2)),
        p3,
    }
}

fn estimate_tangent(points: &[Point], from_end: bool) -> Point {
    let n = points.len();
    let count = 4.min(n - 1).max(1);
    let mut sum = Point::new(0.0, 0.0);

    for k in 0..count {
        let v = if from_end {
            points[n - 1 - k].sub(&points[n - 2 - k])
        } else {
            points[k + 1].sub(&points[k])
        };
        sum = sum.add(&v);
    }
    sum.normalized()
}

fn chord_length_parametrize(points: &[Point]) -> Vec<f64> {
    let mut cumulative = vec![0.0; points.len()];
    for i in 1..points.len() {
        cumulative[i] = cumulative[i - 1] + points[i].distance_to(&points[i - 1]);
    }
    let total = *cumulative.last().unwrap();
    if total < 1e-9 {
        return (0..points.len())
            .map(|i| i as f64 / (points.len() - 1).max(1) as f64)
            .collect();
    }
    cumulative.into_iter().map(|c| c / total).collect()
}

/// Last-resort handle placement: tangent estimated directly from the
/// endpoints-adjacent samples, scaled by `L/3` with no least-squares pass.
fn catmull_rom_handles(points: &[Point]) -> CubicBezier {
    let p0 = points[0];
    let p3 = *points.last().unwrap();
    let l = p0.distance_to(&p3).max(1e-6);

    let second = points.get(1).copied().unwrap_or(p3);
    let second_last = points.get(points.len().saturating_sub(2)).copied().unwrap_or(p0);

    let t1 = second.sub(&p0).normalized();
    let t2 = p3.sub(&second_last).normalized();

    CubicBezier {
        p0,
        c1: p0.add(&t1.scale(l / 3.0)),
        c2: p3.sub(&t2.scale(l / 3.0)),
        p3,
    }
}

/// Clamp each handle length to `max(2, L·ratio)` where `ratio` is 0.6 for
/// short chords (<20) and 0.4 otherwise. Hole (inner) contours skip this
/// entirely — callers only invoke it for outer contours.
fn retract_handles(curve: &mut CubicBezier) {
    let l = curve.p0.distance_to(&curve.p3);
    let ratio = if l < 20.0 { 0.6 } else { 0.4 };
    let max_len = (l * ratio).max(2.0);

    let h1 = curve.c1.sub(&curve.p0);
    let h1_len = h1.length();
    if h1_len > max_len && h1_len > 1e-9 {
        curve.c1 = curve.p0.add(&h1.normalized().scale(max_len));
    }

    let h2 = curve.c2.sub(&curve.p3);
    let h2_len = h2.length();
    if h2_len > max_len && h2_len > 1e-9 {
        curve.c2 = curve.p3.add(&h2.normalized().scale(max_len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_segment_fits_with_collinear_handles() {
        let points = vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)];
        let curve = fit_single_segment(&points, 1.0);
        assert!((curve.p0.y).abs() < 1e-6);
        assert!((curve.p3.y).abs() < 1e-6);
    }

    #[test]
    fn fit_contour_with_no_corners_produces_one_closed_loop() {
        let body = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let fitter = BuiltinFitter;
        let curves = fit_contour(&body, &[], 40.0, 1.0, true, &fitter);
        assert_eq!(curves.len(), 1);
        assert_eq!(curves[0].p0, curves[0].p3);
    }

    #[test]
    fn fit_contour_with_corners_produces_one_segment_per_corner() {
        let body = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let fitter = BuiltinFitter;
        let curves = fit_contour(&body, &[0, 1, 2, 3], 40.0, 1.0, true, &fitter);
        assert_eq!(curves.len(), 4);
    }

    #[test]
    fn handle_retraction_bounds_handle_length() {
        let mut curve = CubicBezier {
            p0: Point::new(0.0, 0.0),
            c1: Point::new(100.0, 0.0),
            c2: Point::new(10.0, 10.0),
            p3: Point::new(10.0, 10.0),
        };
        retract_handles(&mut curve);
        let l = curve.p0.distance_to(&curve.p3);
        assert!(curve.c1.sub(&curve.p0).length() <= (l * 0.6).max(2.0) + 1e-6);
    }
}
