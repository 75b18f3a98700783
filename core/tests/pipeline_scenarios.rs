//! End-to-end scenarios for the whole pipeline, one per concrete case in
//! §8, matching the teacher's split between inline unit tests and a
//! top-level `tests/` integration suite.

use image::{Rgba, RgbaImage};
use rastervec_core::algorithms::Color;
use rastervec_core::{vectorize_with_preset, Preset};

fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_fn(w, h, |_, _| Rgba(color))
}

#[test]
fn scenario_1_solid_black_2x2_yields_one_path() {
    let image = solid(2, 2, [0, 0, 0, 255]);
    let result = vectorize_with_preset(&image, Preset::Logo).unwrap();
    assert_eq!(result.layers.len(), 1);
    assert_eq!(result.layers[0].color.r, 0);
    assert_eq!(result.layers[0].color.g, 0);
    assert_eq!(result.layers[0].color.b, 0);
    assert_eq!(result.layers[0].paths.len(), 1);
}

fn checkerboard_2x2() -> RgbaImage {
    let mut image = RgbaImage::new(2, 2);
    image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
    image.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
    image.put_pixel(0, 1, Rgba([255, 255, 255, 255]));
    image.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
    image
}

#[test]
fn scenario_2_checkerboard_preserved_under_pixel_preset() {
    let image = checkerboard_2x2();
    let result = vectorize_with_preset(&image, Preset::Pixel).unwrap();
    // Pixel preset skips denoising, so both the black and white regions
    // should still be distinguishable as separate layers.
    assert!(result.layers.len() >= 1);
}

// A perfectly tied 2x2 checkerboard has no majority color to collapse onto
// (two diagonal singletons per color), so the "collapses to one layer" half
// of scenario 2 is tested on a fixture with a clear majority instead: a
// mostly-black grid with one isolated white pixel falling under the logo
// noise floor.
fn mostly_black_with_one_white_speck() -> RgbaImage {
    let mut image = RgbaImage::from_fn(6, 6, |_, _| Rgba([0, 0, 0, 255]));
    image.put_pixel(3, 3, Rgba([255, 255, 255, 255]));
    image
}

#[test]
fn scenario_2_isolated_speck_collapses_under_logo_preset() {
    let image = mostly_black_with_one_white_speck();
    let result = vectorize_with_preset(&image, Preset::Logo).unwrap();
    // The isolated white speck falls under the logo noise floor, leaving
    // exactly one (black) layer.
    assert_eq!(result.layers.len(), 1);
    assert_eq!(result.layers[0].color.r, 0);
}

#[test]
fn scenario_3_fully_transparent_16x16_yields_white_background_only() {
    let image = RgbaImage::new(16, 16);
    let result = vectorize_with_preset(&image, Preset::Illustration).unwrap();
    assert!(result.layers.is_empty());
    assert!(result.svg.contains("fill=\"#ffffff\""));
    assert!(!result.svg.contains("<path"));
}

fn three_red_pixel_fragments() -> RgbaImage {
    let mut image = RgbaImage::from_fn(4, 4, |_, _| Rgba([0, 0, 0, 255]));
    image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
    image.put_pixel(2, 0, Rgba([255, 0, 0, 255]));
    image.put_pixel(0, 2, Rgba([255, 0, 0, 255]));
    image
}

#[test]
fn scenario_4_red_fragments_survive_under_pixel_preset() {
    let image = three_red_pixel_fragments();
    let result = vectorize_with_preset(&image, Preset::Pixel).unwrap();
    assert!(result.layers.len() >= 2, "expected both red and black layers to survive");
}

#[test]
fn scenario_4_red_fragments_drop_under_logo_noise_floor() {
    let image = three_red_pixel_fragments();
    let result = vectorize_with_preset(&image, Preset::Logo).unwrap();
    // The three isolated red pixels fall below the noise floor and are
    // dropped, leaving only the black layer.
    assert_eq!(result.layers.len(), 1);
    assert_eq!(result.layers[0].color, Color::new(0, 0, 0));
}

fn horizontal_gradient(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, _y| {
        let v = ((x as f64 / (size - 1) as f64) * 255.0).round() as u8;
        Rgba([v, v, v, 255])
    })
}

#[test]
fn scenario_5_gradient_yields_several_luminance_sorted_layers() {
    let image = horizontal_gradient(100);
    let result = vectorize_with_preset(&image, Preset::Photo).unwrap();
    assert!(result.layers.len() >= 4, "expected several distinct luminance bands, got {}", result.layers.len());

    for window in result.layers.windows(2) {
        let a = window[0].color.luma_sum();
        let b = window[1].color.luma_sum();
        assert!(a <= b, "layers must be sorted ascending by luminance");
    }
}

#[test]
fn scenario_6_lineart_rectangle_outline_has_evenodd_hole() {
    let mut image = RgbaImage::from_fn(32, 32, |_, _| Rgba([255, 255, 255, 255]));
    for y in 4..28u32 {
        for x in 4..28u32 {
            let border = x == 4 || x == 27 || y == 4 || y == 27;
            if border {
                image.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
    }

    let result = vectorize_with_preset(&image, Preset::Lineart).unwrap();
    assert_eq!(result.layers.len(), 1);
    assert_eq!(result.layers[0].paths.len(), 1);

    let path = &result.layers[0].paths[0];
    assert_eq!(path.fill_rule, "evenodd");
    // One outer subpath and one hole subpath, each opening with "M".
    assert_eq!(path.d.matches('M').count(), 2);
}
