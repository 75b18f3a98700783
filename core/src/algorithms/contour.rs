//! §4.5 Contour Tracer: Marching Squares over the binary bitmap with
//! sub-pixel edge placement interpolated from the alpha field. When the
//! table walk fails to close a loop, a pixel-grid-aligned Moore-neighborhood
//! tracer runs over the whole bitmap as a fallback, and any region it finds
//! that isn't already covered by a successfully closed contour is kept.

use crate::algorithms::geometry::{signed_area, Contour, Point};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

pub struct TracedContour {
    pub points: Contour,
    pub area: f64,
    pub is_outer: bool,
}

/// Trace every boundary in `bitmap`, sub-pixel placed using `gray`. Returns
/// contours sorted by `|area|` descending; anything with fewer than 3
/// distinct points is dropped (§4.5).
pub fn trace_contours(bitmap: &[bool], gray: &[u8], width: usize, height: usize) -> Vec<TracedContour> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut visited: HashSet<(i32, i32, Edge)> = HashSet::new();
    let mut contours = Vec::new();
    let mut any_walk_failed = false;

    for cy in -1..height as i32 {
        for cx in -1..width as i32 {
            let config = config_at(bitmap, width, height, cx, cy);
            if config == 0 || config == 15 {
                continue;
            }
            for &(e1, e2) in transition_pairs(config).iter() {
                for start_edge in [e1, e2] {
                    if visited.contains(&(cx, cy, start_edge)) {
                        continue;
                    }
                    match walk_from(cx, cy, start_edge, bitmap, gray, width, height, &mut visited) {
                        Some(points) => {
                            let area = signed_area(&points);
                            if points.len() >= 4 {
                                contours.push(TracedContour {
                                    points,
                                    area,
                                    is_outer: area >= 0.0,
                                });
                            }
                        }
                        None => any_walk_failed = true,
                    }
                }
            }
        }
    }

    if any_walk_failed {
        log::warn!("marching squares left unresolved cells; falling back to Moore-neighborhood tracing for uncovered regions");
        let outers: Vec<&Contour> = contours.iter().filter(|c| c.is_outer).map(|c| &c.points).collect();
        for raw in moore_neighborhood_trace(bitmap, width, height) {
            if raw.len() < 4 {
                continue;
            }
            let sample = Point::new(raw[0].x + 0.5, raw[0].y + 0.5);
            if outers.iter().any(|o| point_in_contour(sample, o)) {
                continue;
            }
            let area = signed_area(&raw);
            contours.push(TracedContour {
                points: raw,
                area,
                is_outer: area >= 0.0,
            });
        }
    }

    contours.sort_by(|a, b| b.area.abs().partial_cmp(&a.area.abs()).unwrap());
    contours
}

/// Ray-casting point-in-polygon test used only to de-duplicate the
/// Moore-tracer fallback against contours the marching-squares walk already
/// closed successfully.
fn point_in_contour(p: Point, polygon: &Contour) -> bool {
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

fn walk_from(
    cx0: i32,
    cy0: i32,
    out_edge0: Edge,
    bitmap: &[bool],
    gray: &[u8],
    width: usize,
    height: usize,
    visited: &mut HashSet<(i32, i32, Edge)>,
) -> Option<Contour> {
    let start = (cx0, cy0, out_edge0);
    let mut current = start;
    let mut points = Contour::new();
    let max_steps = 4 * (width + 2) * (height + 2) + 16;

    for _ in 0..max_steps {
        let (cx, cy, edge) = current;
        visited.insert(current);
        points.push(interpolate_edge(cx, cy, edge, gray, width, height));

        let (ncx, ncy, next_in_edge) = neighbor(cx, cy, edge);
        let config = config_at(bitmap, width, height, ncx, ncy);
        if config == 0 || config == 15 {
            log::warn!("marching squares walk left the boundary at ({ncx},{ncy}); discarding partial contour");
            return None;
        }

        let next_out_edge = partner_edge(config, next_in_edge)?;
        let next_state = (ncx, ncy, next_out_edge);

        if next_state == start {
            points.push(points[0]);
            return Some(points);
        }
        if visited.contains(&next_state) {
            log::warn!("marching squares walk revisited a state without closing; discarding partial contour");
            return None;
        }
        current = next_state;
    }

    log::warn!("marching squares walk exceeded the step budget; discarding partial contour");
    None
}

fn neighbor(cx: i32, cy: i32, edge: Edge) -> (i32, i32, Edge) {
    match edge {
        Edge::Top => (cx, cy - 1, Edge::Bottom),
        Edge::Right => (cx + 1, cy, Edge::Left),
        Edge::Bottom => (cx, cy + 1, Edge::Top),
        Edge::Left => (cx - 1, cy, Edge::Right),
    }
}

fn partner_edge(config: u8, in_edge: Edge) -> Option<Edge> {
    for (e1, e2) in transition_pairs(config) {
        if e1 == in_edge {
            return Some(e2);
        }
        if e2 == in_edge {
            return Some(e1);
        }
    }
    None
}

/// The standard 14-entry marching-squares transition table. Saddle
/// configurations 5 and 10 return two disjoint edge pairs.
fn transition_pairs(config: u8) -> Vec<(Edge, Edge)> {
    use Edge::*;
    match config {
        1 => vec![(Left, Bottom)],
        2 => vec![(Bottom, Right)],
        3 => vec![(Left, Right)],
        4 => vec![(Top, Right)],
        5 => vec![(Top, Right), (Left, Bottom)],
        6 => vec![(Top, Bottom)],
        7 => vec![(Top, Left)],
        8 => vec![(Top, Left)],
        9 => vec![(Top, Bottom)],
        10 => vec![(Top, Left), (Bottom, Right)],
        11 => vec![(Top, Right)],
        12 => vec![(Left, Right)],
        13 => vec![(Bottom, Right)],
        14 => vec![(Left, Bottom)],
        _ => Vec::new(),
    }
}

fn config_at(bitmap: &[bool], width: usize, height: usize, cx: i32, cy: i32) -> u8 {
    let tl = b_at(bitmap, width, height, cx, cy);
    let tr = b_at(bitmap, width, height, cx + 1, cy);
    let br = b_at(bitmap, width, height, cx + 1, cy + 1);
    let bl = b_at(bitmap, width, height, cx, cy + 1);
    (tl as u8) * 8 + (tr as u8) * 4 + (br as u8) * 2 + (bl as u8)
}

fn b_at(bitmap: &[bool], width: usize, height: usize, x: i32, y: i32) -> bool {
    if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
        false
    } else {
        bitmap[y as usize * width + x as usize]
    }
}

fn gray_at(gray: &[u8], width: usize, height: usize, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
        255
    } else {
        gray[y as usize * width + x as usize]
    }
}

fn edge_t(g1: u8, g2: u8) -> f64 {
    let g1 = g1 as f64;
    let g2 = g2 as f64;
    if (g2 - g1).abs() < 1.0 {
        0.5
    } else {
        ((128.0 - g1) / (g2 - g1)).clamp(0.1, 0.9)
    }
}

fn interpolate_edge(cx: i32, cy: i32, edge: Edge, gray: &[u8], width: usize, height: usize) -> Point {
    let g = |x: i32, y: i32| gray_at(gray, width, height, x, y);
    match edge {
        Edge::Top => {
            let t = edge_t(g(cx, cy), g(cx + 1, cy));
            Point::new(cx as f64 + t, cy as f64)
        }
        Edge::Right => {
            let t = edge_t(g(cx + 1, cy), g(cx + 1, cy + 1));
            Point::new(cx as f64 + 1.0, cy as f64 + t)
        }
        Edge::Bottom => {
            let t = edge_t(g(cx, cy + 1), g(cx + 1, cy + 1));
            Point::new(cx as f64 + t, cy as f64 + 1.0)
        }
        Edge::Left => {
            let t = edge_t(g(cx, cy), g(cx, cy + 1));
            Point::new(cx as f64, cy as f64 + t)
        }
    }
}

/// Moore-neighborhood boundary trace, run by `trace_contours` as a fallback
/// when the table walk above fails to close (§4.5). Returns pixel-grid-
/// aligned contours with no sub-pixel placement.
pub fn moore_neighborhood_trace(bitmap: &[bool], width: usize, height: usize) -> Vec<Contour> {
    let mut visited = vec![false; bitmap.len()];
    let mut contours = Vec::new();

    for start_idx in 0..bitmap.len() {
        if !bitmap[start_idx] || visited[start_idx] {
            continue;
        }
        let start_x = (start_idx % width) as i32;
        let start_y = (start_idx / width) as i32;
        // Only start at a boundary pixel whose west neighbor is background
        // or out of bounds, to avoid re-tracing interior pixels.
        if start_x > 0 && bitmap[start_idx - 1] {
            continue;
        }

        let contour = trace_one_component(bitmap, &mut visited, width, height, start_x, start_y);
        if contour.len() >= 3 {
            let mut points = contour;
            points.push(points[0]);
            contours.push(points);
        }
    }
    contours
}

fn trace_one_component(
    bitmap: &[bool],
    visited: &mut [bool],
    width: usize,
    height: usize,
    start_x: i32,
    start_y: i32,
) -> Contour {
    const DIRS: [(i32, i32); 8] = [
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ];

    let is_set = |x: i32, y: i32| -> bool {
        x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height && bitmap[y as usize * width + x as usize]
    };

    let mut points = Vec::new();
    let mut cx = start_x;
    let mut cy = start_y;
    let mut backtrack_dir = 6usize; // arrived "from the west", so start search going north

    loop {
        let idx = cy as usize * width + cx as usize;
        visited[idx] = true;
        points.push(Point::new(cx as f64, cy as f64));

        let mut found = None;
        for step in 0..8 {
            let dir = (backtrack_dir + step) % 8;
            let (dx, dy) = DIRS[dir];
            if is_set(cx + dx, cy + dy) {
                found = Some((cx + dx, cy + dy, dir));
                break;
            }
        }

        match found {
            Some((nx, ny, dir)) => {
                backtrack_dir = (dir + 6) % 8; // look starting just past where we came from
                cx = nx;
                cy = ny;
                if cx == start_x && cy == start_y {
                    break;
                }
                if points.len() > width * height * 4 {
                    break; // safety valve against pathological inputs
                }
            }
            None => break,
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_bitmap(w: usize, h: usize) -> Vec<bool> {
        vec![true; w * h]
    }

    fn binary_gray(bitmap: &[bool]) -> Vec<u8> {
        bitmap.iter().map(|&b| if b { 0 } else { 255 }).collect()
    }

    #[test]
    fn solid_2x2_yields_one_outer_contour() {
        let bitmap = solid_bitmap(2, 2);
        let gray = binary_gray(&bitmap);
        let contours = trace_contours(&bitmap, &gray, 2, 2);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].is_outer);
        assert!(contours[0].points.len() >= 4);
    }

    #[test]
    fn isolated_pixel_in_larger_field_yields_small_contour() {
        let mut bitmap = vec![false; 5 * 5];
        bitmap[2 * 5 + 2] = true;
        let gray = binary_gray(&bitmap);
        let contours = trace_contours(&bitmap, &gray, 5, 5);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points.len(), 5); // 4 distinct + closing repeat
    }

    #[test]
    fn ring_with_hole_yields_outer_and_inner() {
        let w = 6;
        let h = 6;
        let mut bitmap = vec![false; w * h];
        for y in 0..h {
            for x in 0..w {
                let is_border = x == 0 || y == 0 || x == w - 1 || y == h - 1;
                let is_ring = (1..w - 1).contains(&x) && (1..h - 1).contains(&y) && !is_border;
                if is_ring {
                    bitmap[y * w + x] = true;
                }
            }
        }
        // carve a 2x2 hole in the middle
        bitmap[2 * w + 2] = false;
        bitmap[2 * w + 3] = false;
        bitmap[3 * w + 2] = false;
        bitmap[3 * w + 3] = false;
        let gray = binary_gray(&bitmap);
        let contours = trace_contours(&bitmap, &gray, w, h);
        assert!(contours.iter().any(|c| c.is_outer));
        assert!(contours.iter().any(|c| !c.is_outer));
    }

    #[test]
    fn moore_trace_closes_on_solid_square() {
        let bitmap = solid_bitmap(3, 3);
        let contours = moore_neighborhood_trace(&bitmap, 3, 3);
        assert_eq!(contours.len(), 1);
    }
}
