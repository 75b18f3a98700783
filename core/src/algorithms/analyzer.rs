//! §4.2 Image Analyzer: a cheap greedy-clustering heuristic that recommends
//! a preset and a starting palette size before the real (K-Means++) palette
//! builder ever runs.

use crate::config::Preset;
use image::RgbaImage;
use std::collections::HashMap;

const OPAQUE_THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recommendation {
    pub preset: Preset,
    pub suggested_k: u32,
}

/// Classify an image's color complexity and recommend a preset + palette
/// size. Mirrors the teacher's `analyze_image_content` heuristic shape:
/// histogram, greedy cluster, fixed thresholds.
pub fn analyze_image(image: &RgbaImage) -> Recommendation {
    let histogram = quantized_histogram(image);
    let u = histogram.len() as u32;

    let clusters = greedy_cluster(&histogram, 25.0);
    let c = clusters.len() as u32;
    let v = u as f64 / c.max(1) as f64;

    log::debug!("analyzer: U={u} C={c} V={v:.2}");

    if c <= 4 {
        return Recommendation {
            preset: Preset::Lineart,
            suggested_k: 2,
        };
    }
    if u < 256 && c < 64 && v < 3.0 {
        return Recommendation {
            preset: Preset::Pixel,
            suggested_k: c.clamp(2, 32),
        };
    }
    if u > 5000 && c > 100 {
        // The Coordinator remaps this to `illustration` unless the caller
        // explicitly requested `photo` (§4.2); the analyzer itself reports
        // the raw detection.
        return Recommendation {
            preset: Preset::Photo,
            suggested_k: 48,
        };
    }

    if (5..64).contains(&c) {
        let reclustered = greedy_cluster(&histogram, 90.0);
        let c2 = reclustered.len() as u32;
        let preset = if c2 <= 8 {
            Preset::Simple
        } else if c2 <= 32 {
            Preset::Logo
        } else {
            Preset::Illustration
        };
        return Recommendation {
            preset,
            suggested_k: c2.clamp(2, 48),
        };
    }

    let preset = if c <= 8 {
        Preset::Simple
    } else if c <= 32 {
        Preset::Logo
    } else {
        Preset::Illustration
    };
    Recommendation {
        preset,
        suggested_k: c.clamp(2, 48),
    }
}

/// 5-bit per-channel histogram of opaque pixels, with bins of fewer than 10
/// samples discarded as noise.
fn quantized_histogram(image: &RgbaImage) -> HashMap<(u8, u8, u8), u64> {
    let mut histogram: HashMap<(u8, u8, u8), u64> = HashMap::new();
    for pixel in image.pixels() {
        if pixel.0[3] < OPAQUE_THRESHOLD {
            continue;
        }
        let key = (quantize5(pixel.0[0]), quantize5(pixel.0[1]), quantize5(pixel.0[2]));
        *histogram.entry(key).or_insert(0) += 1;
    }
    histogram.retain(|_, count| *count >= 10);
    histogram
}

fn quantize5(channel: u8) -> u8 {
    (channel / 8) * 8
}

/// Greedy single-link clustering: each bin joins the first existing cluster
/// within `threshold` Euclidean distance of its centroid, else starts a new
/// one. Order of iteration is the (arbitrary but stable within a run) bin
/// insertion order; the classification thresholds are wide enough that
/// this does not affect the bracket chosen.
fn greedy_cluster(histogram: &HashMap<(u8, u8, u8), u64>, threshold: f64) -> Vec<(f64, f64, f64)> {
    let mut centroids: Vec<(f64, f64, f64)> = Vec::new();
    let threshold_sq = threshold * threshold;

    for (&(r, g, b), _count) in histogram {
        let point = (r as f64, g as f64, b as f64);
        let joined = centroids.iter().any(|c| dist_sq(*c, point) < threshold_sq);
        if !joined {
            centroids.push(point);
        }
    }
    centroids
}

fn dist_sq(a: (f64, f64, f64), b: (f64, f64, f64)) -> f64 {
    let dr = a.0 - b.0;
    let dg = a.1 - b.1;
    let db = a.2 - b.2;
    dr * dr + dg * dg + db * db
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid_image(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_fn(w, h, |_, _| Rgba(color))
    }

    #[test]
    fn solid_black_recommends_lineart() {
        let img = solid_image(8, 8, [0, 0, 0, 255]);
        let rec = analyze_image(&img);
        assert_eq!(rec.preset, Preset::Lineart);
    }

    #[test]
    fn checkerboard_two_colors_recommends_lineart_or_pixel() {
        let mut img = RgbaImage::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                let c = if (x + y) % 2 == 0 {
                    [0, 0, 0, 255]
                } else {
                    [255, 255, 255, 255]
                };
                img.put_pixel(x, y, Rgba(c));
            }
        }
        let rec = analyze_image(&img);
        assert!(matches!(rec.preset, Preset::Lineart | Preset::Pixel));
    }

    #[test]
    fn gradient_recommends_many_color_preset() {
        let img = RgbaImage::from_fn(64, 64, |x, _| Rgba([(x * 4) as u8, (x * 4) as u8, (x * 4) as u8, 255]));
        let rec = analyze_image(&img);
        assert!(matches!(
            rec.preset,
            Preset::Photo | Preset::Illustration | Preset::Logo | Preset::Simple
        ));
    }
}
