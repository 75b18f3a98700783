//! §4.4 Layer Builder: for each palette index, a binary bitmap plus a
//! continuous alpha field used by the Marching Squares tracer for
//! sub-pixel edge placement.

use crate::algorithms::classifier::{PixelColorMap, TRANSPARENT};
use crate::algorithms::geometry::Color;
use crate::algorithms::palette::Palette;
use crate::config::Options;
use image::RgbaImage;

pub struct BuiltLayer {
    pub bitmap: Vec<bool>,
    pub alpha: Vec<u8>,
}

/// Build the bitmap + alpha field for palette index `i`.
///
/// `binary_mode` callers (K ≤ 2 or preset `lineart`) pass the same
/// `shared_gray` field for every index, computed once from luminance;
/// otherwise the continuous per-index distance field is computed here.
pub fn build_layer(
    image: &RgbaImage,
    map: &PixelColorMap,
    palette: &Palette,
    index: u8,
    options: &Options,
    shared_gray: Option<&[u8]>,
) -> BuiltLayer {
    let width = image.width() as usize;
    let height = image.height() as usize;

    let mut bitmap: Vec<bool> = map.iter().map(|&v| v == index).collect();

    let alpha = match shared_gray {
        Some(gray) => gray.to_vec(),
        None => continuous_alpha_field(image, map, palette, index, options.blur_sigma),
    };

    let max_component = largest_component_size(&bitmap, width, height);
    let min_keep = (max_component / 4).max(4);
    remove_small_components(&mut bitmap, width, height, min_keep);

    if options.morphology {
        closing_morphology(&mut bitmap, width, height);
    }

    if options.dilate_pixels > 0 {
        constrained_dilate(&mut bitmap, map, index, width, height, options.dilate_pixels);
    }

    BuiltLayer { bitmap, alpha }
}

/// Shared binary-mode gray field: luminance after optional blur, auto-
/// inverted when more than 40% of opaque pixels fall below `threshold`.
pub fn binary_gray_field(image: &RgbaImage, blur_sigma: f64, threshold: u8) -> Vec<u8> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let mut gray: Vec<u8> = image
        .pixels()
        .map(|p| luminance_u8(p.0[0], p.0[1], p.0[2]))
        .collect();

    if blur_sigma > 0.0 {
        gray = gaussian_blur_gray(&gray, width, height, blur_sigma);
    }

    let mut below = 0u64;
    let mut opaque_count = 0u64;
    for (i, pixel) in image.pixels().enumerate() {
        if pixel.0[3] < 128 {
            continue;
        }
        opaque_count += 1;
        if gray[i] < threshold {
            below += 1;
        }
    }

    if opaque_count > 0 && (below as f64 / opaque_count as f64) > 0.4 {
        for g in gray.iter_mut() {
            *g = 255 - *g;
        }
    }

    gray
}

fn luminance_u8(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round() as u8
}

/// t = sqrt(d_i / (d_i + d_other)); G = 255 * (3t^2 - 2t^3) (smoothstep).
fn continuous_alpha_field(
    image: &RgbaImage,
    map: &PixelColorMap,
    palette: &Palette,
    index: u8,
    blur_sigma: f64,
) -> Vec<u8> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let this_color = palette[index as usize];

    let mut gray = vec![255u8; width * height];
    for (i, pixel) in image.pixels().enumerate() {
        if pixel.0[3] < 128 {
            continue;
        }
        let color = Color::new(pixel.0[0], pixel.0[1], pixel.0[2]);
        let d_i = color.distance_squared(&this_color);

        let d_other = palette
            .iter()
            .enumerate()
            .filter(|(j, _)| *j as u8 != index)
            .map(|(_, c)| color.distance_squared(c))
            .fold(f64::INFINITY, f64::min);

        let denom = d_i + d_other;
        let t = if denom > 1e-9 { (d_i / denom).sqrt() } else { 0.0 };
        let smooth = 3.0 * t * t - 2.0 * t * t * t;
        gray[i] = (255.0 * smooth).clamp(0.0, 255.0).round() as u8;

        if map[i] == TRANSPARENT {
            gray[i] = 255;
        }
    }

    if blur_sigma > 0.0 {
        gray = gaussian_blur_gray(&gray, width, height, blur_sigma.min(1.0));
    }
    gray
}

/// Separable Gaussian blur, radius ⌈3σ⌉, boundary-clamped sampling.
fn gaussian_blur_gray(input: &[u8], width: usize, height: usize, sigma: f64) -> Vec<u8> {
    if sigma <= 0.0 || width == 0 || height == 0 {
        return input.to_vec();
    }
    let radius = (3.0 * sigma).ceil() as i32;
    let mut kernel = Vec::with_capacity((2 * radius + 1) as usize);
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut sum = 0.0;
    for offset in -radius..=radius {
        let w = (-(offset as f64 * offset as f64) / two_sigma_sq).exp();
        kernel.push(w);
        sum += w;
    }
    for w in kernel.iter_mut() {
        *w /= sum;
    }

    let clamp_idx = |v: i32, max: i32| v.clamp(0, max - 1);

    let mut horizontal = vec![0.0f64; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let offset = k as i32 - radius;
                let sx = clamp_idx(x as i32 + offset, width as i32) as usize;
                acc += input[y * width + sx] as f64 * w;
            }
            horizontal[y * width + x] = acc;
        }
    }

    let mut output = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let offset = k as i32 - radius;
                let sy = clamp_idx(y as i32 + offset, height as i32) as usize;
                acc += horizontal[sy * width + x] * w;
            }
            output[y * width + x] = acc.clamp(0.0, 255.0).round() as u8;
        }
    }
    output
}

fn largest_component_size(bitmap: &[bool], width: usize, height: usize) -> usize {
    let mut visited = vec![false; bitmap.len()];
    let mut largest = 0usize;
    for start in 0..bitmap.len() {
        if !bitmap[start] || visited[start] {
            continue;
        }
        let size = flood_fill_size(bitmap, &mut visited, start, width, height);
        largest = largest.max(size);
    }
    largest
}

fn remove_small_components(bitmap: &mut [bool], width: usize, height: usize, min_keep: usize) {
    let mut visited = vec![false; bitmap.len()];
    let mut to_clear = Vec::new();
    for start in 0..bitmap.len() {
        if !bitmap[start] || visited[start] {
            continue;
        }
        let mut component = Vec::new();
        flood_fill_collect(bitmap, &mut visited, start, width, height, &mut component);
        if component.len() < min_keep {
            to_clear.extend(component);
        }
    }
    for idx in to_clear {
        bitmap[idx] = false;
    }
}

fn flood_fill_size(bitmap: &[bool], visited: &mut [bool], start: usize, width: usize, height: usize) -> usize {
    let mut component = Vec::new();
    flood_fill_collect(bitmap, visited, start, width, height, &mut component);
    component.len()
}

fn flood_fill_collect(
    bitmap: &[bool],
    visited: &mut [bool],
    start: usize,
    width: usize,
    height: usize,
    out: &mut Vec<usize>,
) {
    let mut stack = vec![start];
    visited[start] = true;
    while let Some(idx) = stack.pop() {
        out.push(idx);
        let x = (idx % width) as i32;
        let y = (idx / width) as i32;
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            let nx = x + dx;
            let ny = y + dy;
            if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
                continue;
            }
            let nidx = ny as usize * width + nx as usize;
            if bitmap[nidx] && !visited[nidx] {
                visited[nidx] = true;
                stack.push(nidx);
            }
        }
    }
}

/// Dilate then erode, 4-neighborhood, never "open" (per §4.4 step 6).
fn closing_morphology(bitmap: &mut Vec<bool>, width: usize, height: usize) {
    let dilated = dilate4(bitmap, width, height);
    let eroded = erode4(&dilated, width, height);
    *bitmap = eroded;
}

fn dilate4(bitmap: &[bool], width: usize, height: usize) -> Vec<bool> {
    let mut out = bitmap.to_vec();
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if bitmap[idx] {
                continue;
            }
            let has_neighbor = [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)].iter().any(|(dx, dy)| {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                nx >= 0
                    && ny >= 0
                    && (nx as usize) < width
                    && (ny as usize) < height
                    && bitmap[ny as usize * width + nx as usize]
            });
            if has_neighbor {
                out[idx] = true;
            }
        }
    }
    out
}

fn erode4(bitmap: &[bool], width: usize, height: usize) -> Vec<bool> {
    let mut out = bitmap.to_vec();
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if !bitmap[idx] {
                continue;
            }
            let all_set = [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)].iter().all(|(dx, dy)| {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                nx >= 0
                    && ny >= 0
                    && (nx as usize) < width
                    && (ny as usize) < height
                    && bitmap[ny as usize * width + nx as usize]
            });
            if !all_set {
                out[idx] = false;
            }
        }
    }
    out
}

/// Dilate `bitmap` but only into pixels whose map entry isn't transparent
/// (§4.4 step 7), repeated `passes` times.
fn constrained_dilate(
    bitmap: &mut Vec<bool>,
    map: &PixelColorMap,
    _index: u8,
    width: usize,
    height: usize,
    passes: u32,
) {
    for _ in 0..passes {
        let mut next = bitmap.clone();
        for y in 0..height {
            for x in 0..width {
                let idx = y * width + x;
                if bitmap[idx] || map[idx] == TRANSPARENT {
                    continue;
                }
                let has_neighbor = [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)].iter().any(|(dx, dy)| {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    nx >= 0
                        && ny >= 0
                        && (nx as usize) < width
                        && (ny as usize) < height
                        && bitmap[ny as usize * width + nx as usize]
                });
                if has_neighbor {
                    next[idx] = true;
                }
            }
        }
        *bitmap = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::classifier::classify_pixels;
    use image::Rgba;

    fn palette() -> Palette {
        vec![Color::new(0, 0, 0), Color::new(255, 255, 255)]
    }

    #[test]
    fn solid_black_layer_has_full_bitmap() {
        let img = RgbaImage::from_fn(4, 4, |_, _| Rgba([0, 0, 0, 255]));
        let opts = Options::default();
        let map = classify_pixels(&img, &palette(), false);
        let layer = build_layer(&img, &map, &palette(), 0, &opts, None);
        assert!(layer.bitmap.iter().all(|&b| b));
    }

    #[test]
    fn single_stray_pixel_removed_as_small_component() {
        let mut img = RgbaImage::from_fn(10, 10, |_, _| Rgba([255, 255, 255, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        for y in 4..8 {
            for x in 4..8 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let opts = Options::default();
        let map = classify_pixels(&img, &palette(), true);
        let layer = build_layer(&img, &map, &palette(), 0, &opts, None);
        assert!(!layer.bitmap[0]);
        assert!(layer.bitmap[4 * 10 + 4]);
    }

    #[test]
    fn binary_gray_field_inverts_when_majority_dark() {
        let img = RgbaImage::from_fn(4, 4, |_, _| Rgba([10, 10, 10, 255]));
        let gray = binary_gray_field(&img, 0.0, 128);
        assert!(gray.iter().all(|&g| g > 200));
    }
}
