//! §4.7 Corner Detector: multi-scale turning-angle analysis with
//! local-minimum gating and cyclic non-maximum suppression.

use crate::algorithms::geometry::{Contour, Point};

const SCALES: [usize; 2] = [4, 6];
const DEFAULT_MIN_DIST: usize = 4;

/// Detect corner indices in a simplified closed polyline. `aggressive`
/// raises the angle threshold from 130° to 140° (more points qualify as
/// corners, per §4.7 "aggressive corner preservation").
pub fn detect_corners(points: &Contour, aggressive: bool) -> Vec<usize> {
    detect_corners_with(points, aggressive, DEFAULT_MIN_DIST)
}

pub fn detect_corners_with(points: &Contour, aggressive: bool, min_dist: usize) -> Vec<usize> {
    let body = closed_body(points);
    let n = body.len();
    if n < 5 {
        return Vec::new();
    }

    let threshold_deg = if aggressive { 140.0 } else { 130.0 };
    let window = min_dist.min(2);

    let mut candidates: Vec<(usize, f64)> = Vec::new();

    for &r in SCALES.iter() {
        if 2 * r + 1 > n {
            continue;
        }
        let angles: Vec<f64> = (0..n).map(|i| interior_angle_deg(&body, i, r, n)).collect();

        for i in 0..n {
            if angles[i] >= threshold_deg {
                continue;
            }
            let is_local_min = (0..=2 * window).all(|k| {
                let j = (i + n + k - window) % n;
                angles[i] <= angles[j]
            });
            if is_local_min {
                candidates.push((i, angles[i]));
            }
        }
    }

    non_max_suppress(candidates, n, min_dist)
}

fn closed_body(points: &Contour) -> Contour {
    if points.len() >= 2 && points[0] == *points.last().unwrap() {
        points[..points.len() - 1].to_vec()
    } else {
        points.clone()
    }
}

fn interior_angle_deg(body: &[Point], i: usize, r: usize, n: usize) -> f64 {
    let a = body[(i + n - r) % n];
    let b = body[i];
    let c = body[(i + r) % n];

    let u = a.sub(&b);
    let v = c.sub(&b);
    let u_len = u.length();
    let v_len = v.length();
    if u_len < 1e-9 || v_len < 1e-9 {
        return 180.0;
    }
    let cos_theta = ((u.x * v.x + u.y * v.y) / (u_len * v_len)).clamp(-1.0, 1.0);
    cos_theta.acos().to_degrees()
}

/// Keep the sharpest (lowest angle) candidate in each cyclic-distance
/// cluster of width `min_dist`.
fn non_max_suppress(mut candidates: Vec<(usize, f64)>, n: usize, min_dist: usize) -> Vec<usize> {
    candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

    let mut kept: Vec<usize> = Vec::new();
    for (idx, _angle) in candidates {
        let far_enough = kept.iter().all(|&k| cyclic_distance(idx, k, n) >= min_dist);
        if far_enough {
            kept.push(idx);
        }
    }
    kept.sort_unstable();
    kept
}

fn cyclic_distance(a: usize, b: usize, n: usize) -> usize {
    let diff = if a > b { a - b } else { b - a };
    diff.min(n - diff)
}
