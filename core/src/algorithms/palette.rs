//! §4.1 Palette Builder: weighted K-Means++ over quantized sample colors,
//! post-merge of near-neighbors, and an edge-color filter that drops
//! anti-aliasing artifacts lying on a segment between two dominant colors.

use crate::algorithms::geometry::Color;
use crate::config::Preset;
use image::RgbaImage;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// An ordered sequence of colors, ascending by `r+g+b`. See `spec.md` §3.
pub type Palette = Vec<Color>;

const OPAQUE_THRESHOLD: u8 = 128;
const SAMPLE_CAP: usize = 500_000;

#[derive(Debug, Clone, Copy)]
struct WeightedColor {
    color: Color,
    weight: u64,
}

/// Build a palette of at most `target_k` colors from `image`.
///
/// `preset` only affects the post-merge threshold (logo/simple use a wider
/// merge radius, §4.1).
pub fn build_palette(image: &RgbaImage, target_k: u32, preset: Option<Preset>) -> Palette {
    let weighted = sample_weighted_colors(image);
    if weighted.is_empty() {
        log::warn!("Palette sampling found no opaque pixels; falling back to mid-gray");
        return vec![Color::new(128, 128, 128)];
    }

    let k = (target_k as usize).clamp(1, 64).min(weighted.len());
    let mut seed = ChaCha8Rng::seed_from_u64(0xC0FFEE);
    let mut centers = kmeans_plus_plus_seed(&weighted, k, &mut seed);
    lloyd_iterate(&weighted, &mut centers);

    let use_logo_threshold = matches!(preset, Some(Preset::Logo) | Some(Preset::Simple));
    let mut palette: Vec<WeightedColor> = centers
        .into_iter()
        .map(|c| WeightedColor {
            color: c,
            weight: 1,
        })
        .collect();
    // Recompute weights from final assignment so the post-merge step can
    // compute a correctly weighted mean.
    recompute_weights(&weighted, &mut palette);
    post_merge(&mut palette, use_logo_threshold);

    let k_for_filter = palette.len() as u32;
    if k_for_filter <= 16 {
        filter_edge_colors(&mut palette);
    }

    finalize_palette(palette)
}

fn sample_weighted_colors(image: &RgbaImage) -> Vec<WeightedColor> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let n = width * height;
    if n == 0 {
        return Vec::new();
    }
    let stride = n.div_ceil(SAMPLE_CAP).max(1);

    let mut freq: HashMap<u32, u64> = HashMap::new();
    let raw = image.as_raw();
    let mut idx = 0usize;
    while idx < n {
        let off = idx * 4;
        let a = raw[off + 3];
        if a >= OPAQUE_THRESHOLD {
            let r = quantize7(raw[off]);
            let g = quantize7(raw[off + 1]);
            let b = quantize7(raw[off + 2]);
            let packed = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
            *freq.entry(packed).or_insert(0) += 1;
        }
        idx += stride;
    }

    freq.into_iter()
        .map(|(packed, weight)| {
            let r = ((packed >> 16) & 0xFF) as u8;
            let g = ((packed >> 8) & 0xFF) as u8;
            let b = (packed & 0xFF) as u8;
            WeightedColor {
                color: Color::new(r, g, b),
                weight,
            }
        })
        .collect()
}

/// Snap a channel to the nearest multiple of 2 (7-bit quantization).
fn quantize7(channel: u8) -> u8 {
    ((channel as u16 + 1) / 2 * 2).min(255) as u8
}

fn kmeans_plus_plus_seed(
    weighted: &[WeightedColor],
    k: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<Color> {
    let mut by_weight: Vec<&WeightedColor> = weighted.iter().collect();
    by_weight.sort_by(|a, b| b.weight.cmp(&a.weight));

    let mut centers = vec![by_weight[0].color];
    let distinct = by_weight.len();

    while centers.len() < k && centers.len() < distinct {
        if let Some(next) = select_next_center(&by_weight, &centers, rng) {
            centers.push(next);
        } else {
            break;
        }
    }
    centers
}

/// Roulette-select the next K-Means++ seed by `D² · w`, falling back to the
/// farthest-point argmax when the roulette draw fails to land in any
/// bucket (the "always-true guard" Open Question in spec.md §9: we make
/// the fallback an explicit, named path rather than a dead branch).
fn select_next_center(
    candidates: &[&WeightedColor],
    centers: &[Color],
    rng: &mut ChaCha8Rng,
) -> Option<Color> {
    let scores: Vec<f64> = candidates
        .iter()
        .map(|wc| {
            let d2 = nearest_center_distance_sq(wc.color, centers);
            d2 * wc.weight as f64
        })
        .collect();

    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        let mut draw = rng.gen_range(0.0..total);
        for (i, &score) in scores.iter().enumerate() {
            if draw < score {
                return Some(candidates[i].color);
            }
            draw -= score;
        }
    }

    // Farthest-point fallback: roulette failed to select (total is zero, or
    // floating point rounding walked past the end of the bucket list).
    scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| candidates[i].color)
}

fn nearest_center_distance_sq(color: Color, centers: &[Color]) -> f64 {
    centers
        .iter()
        .map(|c| color.distance_squared(c))
        .fold(f64::INFINITY, f64::min)
}

fn lloyd_iterate(weighted: &[WeightedColor], centers: &mut Vec<Color>) {
    for _round in 0..10 {
        let mut sums = vec![(0.0f64, 0.0f64, 0.0f64, 0u64); centers.len()];
        for wc in weighted {
            let nearest = nearest_center_index(wc.color, centers);
            let w = wc.weight as f64;
            sums[nearest].0 += wc.color.r as f64 * w;
            sums[nearest].1 += wc.color.g as f64 * w;
            sums[nearest].2 += wc.color.b as f64 * w;
            sums[nearest].3 += wc.weight;
        }

        let mut max_move_sq = 0.0f64;
        for (i, (sr, sg, sb, count)) in sums.into_iter().enumerate() {
            if count == 0 {
                continue;
            }
            let new_color = Color::new(
                (sr / count as f64).round() as u8,
                (sg / count as f64).round() as u8,
                (sb / count as f64).round() as u8,
            );
            let moved = centers[i].distance_squared(&new_color);
            max_move_sq = max_move_sq.max(moved);
            centers[i] = new_color;
        }

        if max_move_sq <= 4.0 {
            log::debug!("K-means converged after {} round(s)", _round + 1);
            break;
        }
    }
}

fn nearest_center_index(color: Color, centers: &[Color]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, c) in centers.iter().enumerate() {
        let d = color.distance_squared(c);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

fn recompute_weights(weighted: &[WeightedColor], palette: &mut [WeightedColor]) {
    let centers: Vec<Color> = palette.iter().map(|p| p.color).collect();
    let mut totals = vec![0u64; palette.len()];
    for wc in weighted {
        let nearest = nearest_center_index(wc.color, &centers);
        totals[nearest] += wc.weight;
    }
    for (p, total) in palette.iter_mut().zip(totals) {
        p.weight = total.max(1);
    }
}

fn luminance(c: Color) -> f64 {
    (c.r as f64 + c.g as f64 + c.b as f64) / 3.0
}

fn post_merge(palette: &mut Vec<WeightedColor>, logo_threshold: bool) {
    let base_t = if logo_threshold { 45.0 } else { 35.0 };
    let base_t_sq = base_t * base_t;

    loop {
        palette.sort_by_key(|wc| wc.color.luma_sum());

        if let Some(last) = palette.last_mut() {
            let c = last.color;
            if c.r > 230 && c.g > 230 && c.b > 230 {
                last.color = Color::new(255, 255, 255);
            }
        }

        let mut merged_any = false;
        'outer: for i in 0..palette.len() {
            for j in (i + 1)..palette.len() {
                let a = palette[i].color;
                let b = palette[j].color;
                let d2 = a.distance_squared(&b);

                let both_neutral = a.is_neutral(30) && b.is_neutral(30);
                let threshold = if both_neutral {
                    base_t_sq * 16.0
                } else {
                    base_t_sq
                };

                let both_bright = luminance(a) > 210.0 && luminance(b) > 210.0;
                let force_bright_merge = both_bright && d2 < 2500.0;

                if d2 < threshold || force_bright_merge {
                    let merged = if force_bright_merge {
                        let brighter = if luminance(a) >= luminance(b) { i } else { j };
                        palette[brighter]
                    } else {
                        weighted_mean(palette[i], palette[j])
                    };
                    let weight = palette[i].weight + palette[j].weight;
                    palette[i] = WeightedColor {
                        color: merged.color,
                        weight,
                    };
                    palette.remove(j);
                    merged_any = true;
                    break 'outer;
                }
            }
        }

        if !merged_any {
            break;
        }
    }
}

fn weighted_mean(a: WeightedColor, b: WeightedColor) -> WeightedColor {
    let wa = a.weight as f64;
    let wb = b.weight as f64;
    let total = wa + wb;
    let r = (a.color.r as f64 * wa + b.color.r as f64 * wb) / total;
    let g = (a.color.g as f64 * wa + b.color.g as f64 * wb) / total;
    let b_ = (a.color.b as f64 * wa + b.color.b as f64 * wb) / total;
    WeightedColor {
        color: Color::new(r.round() as u8, g.round() as u8, b_.round() as u8),
        weight: a.weight + b.weight,
    }
}

fn filter_edge_colors(palette: &mut Vec<WeightedColor>) {
    let total_weight: u64 = palette.iter().map(|p| p.weight).sum();
    if total_weight == 0 {
        return;
    }

    let k = palette.len() as f64;
    let main_share = (0.005f64).max(0.1 / k);
    let mut main_idx: Vec<usize> = palette
        .iter()
        .enumerate()
        .filter(|(_, wc)| wc.weight as f64 / total_weight as f64 >= main_share)
        .map(|(i, _)| i)
        .collect();

    if main_idx.len() < 2 {
        let mut by_weight: Vec<usize> = (0..palette.len()).collect();
        by_weight.sort_by(|&a, &b| palette[b].weight.cmp(&palette[a].weight));
        main_idx = by_weight.into_iter().take(2.min(palette.len())).collect();
    }

    let mains: Vec<Color> = main_idx.iter().map(|&i| palette[i].color).collect();

    let mut keep = vec![true; palette.len()];
    for (i, wc) in palette.iter().enumerate() {
        if main_idx.contains(&i) {
            continue;
        }
        if is_edge_color(wc.color, &mains) {
            keep[i] = false;
        }
    }

    let mut kept = Vec::with_capacity(palette.len());
    for (i, wc) in palette.iter().enumerate() {
        if keep[i] {
            kept.push(*wc);
        }
    }
    if !kept.is_empty() {
        *palette = kept;
    }
}

fn is_edge_color(candidate: Color, mains: &[Color]) -> bool {
    let mut min_dist_to_any_main = f64::INFINITY;
    for &m in mains {
        min_dist_to_any_main = min_dist_to_any_main.min(candidate.distance(&m));
    }
    if min_dist_to_any_main > 60.0 {
        return false; // "independent": preserved
    }

    for i in 0..mains.len() {
        for j in (i + 1)..mains.len() {
            let a = mains[i];
            let b = mains[j];
            let (ax, ay, az) = (a.r as f64, a.g as f64, a.b as f64);
            let (bx, by, bz) = (b.r as f64, b.g as f64, b.b as f64);
            let (cx, cy, cz) = (candidate.r as f64, candidate.g as f64, candidate.b as f64);

            let abx = bx - ax;
            let aby = by - ay;
            let abz = bz - az;
            let ab_len_sq = abx * abx + aby * aby + abz * abz;
            if ab_len_sq < 1e-9 {
                continue;
            }

            let acx = cx - ax;
            let acy = cy - ay;
            let acz = cz - az;
            let t = (acx * abx + acy * aby + acz * abz) / ab_len_sq;

            if (0.1..=0.9).contains(&t) {
                let proj_x = ax + t * abx;
                let proj_y = ay + t * aby;
                let proj_z = az + t * abz;
                let perp = ((cx - proj_x).powi(2) + (cy - proj_y).powi(2) + (cz - proj_z).powi(2))
                    .sqrt();
                if perp < 50.0 {
                    return true;
                }
            }
        }
    }
    false
}

fn finalize_palette(palette: Vec<WeightedColor>) -> Palette {
    let mut colors: Vec<Color> = palette.into_iter().map(|wc| wc.color).collect();
    colors.sort_by_key(|c| c.luma_sum());

    if let Some(last) = colors.last_mut() {
        if last.r > 230 && last.g > 230 && last.b > 230 {
            *last = Color::new(255, 255, 255);
        }
    }

    if colors.is_empty() {
        colors.push(Color::new(128, 128, 128));
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid_image(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_fn(w, h, |_, _| Rgba(color))
    }

    #[test]
    fn empty_image_yields_single_gray() {
        let img = RgbaImage::new(4, 4); // all-zero alpha => transparent
        let palette = build_palette(&img, 8, None);
        assert_eq!(palette, vec![Color::new(128, 128, 128)]);
    }

    #[test]
    fn single_color_image_yields_one_entry() {
        let img = solid_image(10, 10, [10, 20, 30, 255]);
        let palette = build_palette(&img, 8, None);
        assert_eq!(palette.len(), 1);
    }

    #[test]
    fn near_white_palette_collapses_to_pure_white() {
        let img = solid_image(4, 4, [240, 245, 250, 255]);
        let palette = build_palette(&img, 4, None);
        assert_eq!(palette, vec![Color::new(255, 255, 255)]);
    }

    #[test]
    fn palette_is_sorted_ascending_by_luma() {
        let mut img = RgbaImage::new(4, 2);
        for x in 0..4 {
            img.put_pixel(x, 0, Rgba([10, 10, 10, 255]));
            img.put_pixel(x, 1, Rgba([200, 200, 200, 255]));
        }
        let palette = build_palette(&img, 4, None);
        for w in palette.windows(2) {
            assert!(w[0].luma_sum() <= w[1].luma_sum());
        }
    }

    #[test]
    fn k_larger_than_distinct_samples_does_not_loop() {
        let img = solid_image(3, 3, [50, 60, 70, 255]);
        let palette = build_palette(&img, 64, None);
        assert!(palette.len() <= 64);
        assert!(!palette.is_empty());
    }
}
