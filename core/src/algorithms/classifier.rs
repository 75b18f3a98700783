//! §4.3 Pixel Classifier: nearest-palette assignment plus a 3×3 mode-filter
//! denoise pass (skipped for the `pixel` preset, where every pixel matters).

use crate::algorithms::palette::Palette;
use image::RgbaImage;

/// Sentinel for "transparent / not assigned" in the pixel-color map.
pub const TRANSPARENT: u8 = 255;
const OPAQUE_THRESHOLD: u8 = 128;
const DENOISE_PASSES: usize = 2;

/// `W·H` array of palette indices (or `TRANSPARENT`).
pub type PixelColorMap = Vec<u8>;

/// Assign each opaque pixel to its nearest palette color by squared RGB
/// distance; transparent pixels get the sentinel. Runs the mode-filter
/// denoise afterward unless `skip_denoise` (set for the `pixel` preset).
pub fn classify_pixels(image: &RgbaImage, palette: &Palette, skip_denoise: bool) -> PixelColorMap {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let mut map = vec![TRANSPARENT; width * height];

    for (i, pixel) in image.pixels().enumerate() {
        if pixel.0[3] < OPAQUE_THRESHOLD {
            continue;
        }
        let color = crate::algorithms::geometry::Color::new(pixel.0[0], pixel.0[1], pixel.0[2]);
        map[i] = nearest_palette_index(color, palette);
    }

    if !skip_denoise {
        for _ in 0..DENOISE_PASSES {
            denoise_pass(&mut map, width, height);
        }
    }

    map
}

fn nearest_palette_index(color: crate::algorithms::geometry::Color, palette: &Palette) -> u8 {
    let mut best = 0usize;
    let mut best_d = f64::INFINITY;
    for (i, p) in palette.iter().enumerate() {
        let d = color.distance_squared(p);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best as u8
}

/// One double-buffered mode-filter pass: for every non-transparent pixel,
/// compute the mode of its 3×3 non-transparent neighborhood and replace the
/// center when it is isolated (neighborhood count for its own color is 1)
/// or when some other color appears at least 5 times.
pub(crate) fn denoise_pass(map: &mut PixelColorMap, width: usize, height: usize) {
    let source = map.clone();
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let center = source[idx];
            if center == TRANSPARENT {
                continue;
            }

            let mut counts = [0u32; 256];
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
                        continue;
                    }
                    let value = source[ny as usize * width + nx as usize];
                    if value != TRANSPARENT {
                        counts[value as usize] += 1;
                    }
                }
            }

            let center_count = counts[center as usize];
            let (mode_color, mode_count) = counts
                .iter()
                .enumerate()
                .max_by_key(|(_, &count)| count)
                .map(|(c, &count)| (c as u8, count))
                .unwrap_or((center, center_count));

            if center_count == 1 || (mode_color != center && mode_count >= 5) {
                map[idx] = mode_color;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geometry::Color;
    use image::Rgba;

    fn palette() -> Palette {
        vec![Color::new(0, 0, 0), Color::new(255, 255, 255)]
    }

    #[test]
    fn transparent_pixels_get_sentinel() {
        let img = RgbaImage::new(2, 2);
        let map = classify_pixels(&img, &palette(), false);
        assert!(map.iter().all(|&v| v == TRANSPARENT));
    }

    #[test]
    fn opaque_pixel_assigned_nearest_color() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([10, 10, 10, 255]));
        let map = classify_pixels(&img, &palette(), false);
        assert_eq!(map[0], 0);
    }

    #[test]
    fn isolated_pixel_denoised_when_not_pixel_preset() {
        let mut img = RgbaImage::new(3, 3);
        for y in 0..3 {
            for x in 0..3 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let map = classify_pixels(&img, &palette(), false);
        assert_eq!(map[1 * 3 + 1], 0);
    }

    #[test]
    fn isolated_pixel_preserved_for_pixel_preset() {
        let mut img = RgbaImage::new(3, 3);
        for y in 0..3 {
            for x in 0..3 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let map = classify_pixels(&img, &palette(), true);
        assert_eq!(map[1 * 3 + 1], 1);
    }
}
