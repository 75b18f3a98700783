//! §4.8 Smoother: Chaikin corner-cutting that preserves flagged corner
//! points exactly across every iteration.

use crate::algorithms::geometry::{Contour, Point};

const CORNER_PROXIMITY: f64 = 0.5;

/// Apply `k` Chaikin iterations (clamped to [0, 3]) to a closed polyline,
/// preserving points near any of `corner_positions` unchanged.
pub fn smooth_path(points: &Contour, k: u8, corner_positions: &[Point]) -> Contour {
    let k = k.min(3);
    if k == 0 || points.len() < 4 {
        return points.clone();
    }

    let mut current = points.clone();
    for _ in 0..k {
        current = chaikin_iteration(&current, corner_positions);
    }
    current
}

fn chaikin_iteration(points: &Contour, corner_positions: &[Point]) -> Contour {
    let body = if points[0] == *points.last().unwrap() {
        &points[..points.len() - 1]
    } else {
        &points[..]
    };
    let n = body.len();
    if n < 3 {
        return points.clone();
    }

    let mut out = Contour::with_capacity(n * 2);
    for i in 0..n {
        let p_i = body[i];
        let p_next = body[(i + 1) % n];

        if is_near_corner(p_i, corner_positions) {
            out.push(p_i);
            out.push(p_i.lerp(&p_next, 0.5));
        } else {
            out.push(p_i.lerp(&p_next, 0.25));
            out.push(p_i.lerp(&p_next, 0.75));
        }
    }
    out.push(out[0]);
    out
}

fn is_near_corner(p: Point, corner_positions: &[Point]) -> bool {
    corner_positions.iter().any(|c| p.distance_to(c) <= CORNER_PROXIMITY)
}
