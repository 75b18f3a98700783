//! §4.6 Contour Simplifier: radial pre-filter, closed-path Ramer-Douglas-
//! Peucker, and an optional staircase removal pass for hard-edged presets.

use crate::algorithms::geometry::{Contour, Point};

/// Run the full simplification chain for a closed polyline (`points[0] ==
/// points[last]`). `epsilon` is the RDP tolerance; `remove_staircases`
/// enables the lineart/logo-only staircase pass.
pub fn simplify_contour(points: &Contour, epsilon: f64, remove_staircases: bool) -> Contour {
    if points.len() < 4 {
        return points.clone();
    }

    let radial = radial_filter(points, epsilon);
    let mut simplified = douglas_peucker_closed(&radial, epsilon);

    if remove_staircases {
        simplified = remove_staircase_corners(simplified);
    }

    simplified
}

/// Drop consecutive points within `sqrt(epsilon^2 / 2)` of each other.
fn radial_filter(points: &Contour, epsilon: f64) -> Contour {
    let tolerance = (epsilon * epsilon / 2.0).sqrt();
    let tolerance_sq = tolerance * tolerance;

    let mut out = Contour::with_capacity(points.len());
    out.push(points[0]);
    for &p in &points[1..] {
        if p.distance_squared_to(out.last().unwrap()) > tolerance_sq {
            out.push(p);
        }
    }
    if out.len() < 2 {
        return points.clone();
    }
    // ensure still closed
    if out.last().unwrap().distance_squared_to(&out[0]) > 1e-9 {
        out.push(out[0]);
    }
    out
}

/// Closed-path RDP: split first at the point farthest from `P[0]`, then
/// recurse normally on the two halves.
fn douglas_peucker_closed(points: &Contour, epsilon: f64) -> Contour {
    if points.len() < 4 {
        return points.clone();
    }

    let anchor = points[0];
    let (split_idx, _) = points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.distance_squared_to(&anchor)
                .partial_cmp(&b.distance_squared_to(&anchor))
                .unwrap()
        })
        .unwrap();

    let split_idx = split_idx.max(1).min(points.len() - 2);

    let mut first_half = points[0..=split_idx].to_vec();
    let second_half = points[split_idx..points.len()].to_vec();

    let mut simplified_first = douglas_peucker(&first_half, epsilon);
    let simplified_second = douglas_peucker(&second_half, epsilon);

    simplified_first.pop(); // avoid duplicating the shared split point
    simplified_first.extend(simplified_second);
    first_half.clear();
    simplified_first
}

fn douglas_peucker(points: &[Point], epsilon: f64) -> Contour {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let last = *points.last().unwrap();

    let mut max_dist = 0.0;
    let mut split_idx = 0;
    for (i, &p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let d = perpendicular_distance(p, first, last);
        if d > max_dist {
            max_dist = d;
            split_idx = i;
        }
    }

    if max_dist > epsilon {
        let mut left = douglas_peucker(&points[0..=split_idx], epsilon);
        let right = douglas_peucker(&points[split_idx..points.len()], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-12 {
        return p.distance_to(&a);
    }
    ((p.x - a.x) * dy - (p.y - a.y) * dx).abs() / len_sq.sqrt()
}

/// Drop the middle point of any horizontal-then-vertical or vertical-then-
/// horizontal transition whose segments are both shorter than 2.5 units.
/// Aborts (returns the input unchanged) if more than 70% of points would
/// be removed.
fn remove_staircase_corners(points: Contour) -> Contour {
    if points.len() < 5 {
        return points;
    }

    let body = &points[0..points.len() - 1]; // drop the closing repeat for scanning
    let n = body.len();
    let mut drop = vec![false; n];

    for i in 0..n {
        let prev = body[(i + n - 1) % n];
        let cur = body[i];
        let next = body[(i + 1) % n];

        let seg1_horizontal = (cur.y - prev.y).abs() < 1e-6;
        let seg1_vertical = (cur.x - prev.x).abs() < 1e-6;
        let seg2_horizontal = (next.y - cur.y).abs() < 1e-6;
        let seg2_vertical = (next.x - cur.x).abs() < 1e-6;

        let is_staircase = (seg1_horizontal && seg2_vertical) || (seg1_vertical && seg2_horizontal);
        if !is_staircase {
            continue;
        }

        let len1 = cur.distance_to(&prev);
        let len2 = next.distance_to(&cur);
        if len1 < 2.5 && len2 < 2.5 {
            drop[i] = true;
        }
    }

    let removed = drop.iter().filter(|&&d| d).count();
    if removed as f64 / n as f64 > 0.7 {
        return points;
    }

    let mut out: Contour = body
        .iter()
        .zip(drop.iter())
        .filter(|(_, &d)| !d)
        .map(|(&p, _)| p)
        .collect();

    if out.len() < 3 {
        return points;
    }
    out.push(out[0]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Contour {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ]
    }

    #[test]
    fn square_with_colinear_midpoints_simplifies_back_to_corners() {
        let mut noisy = vec![Point::new(0.0, 0.0)];
        for i in 1..10 {
            noisy.push(Point::new(i as f64, 0.0));
        }
        for i in 1..10 {
            noisy.push(Point::new(10.0, i as f64));
        }
        for i in (1..10).rev() {
            noisy.push(Point::new(i as f64, 10.0));
        }
        for i in (1..10).rev() {
            noisy.push(Point::new(0.0, i as f64));
        }
        noisy.push(Point::new(0.0, 0.0));

        let simplified = simplify_contour(&noisy, 1.0, false);
        assert!(simplified.len() <= 6);
    }

    #[test]
    fn already_simple_square_is_left_mostly_unchanged() {
        let square = square();
        let simplified = simplify_contour(&square, 0.5, false);
        assert!(simplified.len() >= 4);
        assert_eq!(simplified[0], simplified[simplified.len() - 1]);
    }

    #[test]
    fn staircase_removal_respects_abort_guard() {
        // A genuine staircase shape should shrink; this is a degenerate,
        // all-staircase tiny contour that should trip the 70% abort guard.
        let tiny = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, 0.0),
        ];
        let out = simplify_contour(&tiny, 0.1, true);
        assert!(!out.is_empty());
    }
}
