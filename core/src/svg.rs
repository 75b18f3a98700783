//! SVG string serialization per §6: a single `<svg>` document, one
//! background `<rect>`, then one `<path>` per vector path ordered bright→
//! dark (the Coordinator stores `layers` dark→bright, so this walks them in
//! reverse) so darker layers paint on top of brighter ones.

use crate::algorithms::pipeline::Layer;
use crate::algorithms::Color;
use std::fmt::Write;

/// Render the final SVG document. `view_width`/`view_height` are the
/// working-resolution dimensions paths were traced in; `out_width`/
/// `out_height` are the caller-facing (possibly smaller, pre-upscale)
/// dimensions used for the outer `width`/`height` attributes, with
/// coordinates rescaled via `viewBox`.
pub fn render_svg(
    out_width: u32,
    out_height: u32,
    view_width: u32,
    view_height: u32,
    layers: &[Layer],
    background: Color,
) -> String {
    let mut svg = String::with_capacity(256 + layers.len() * 128);

    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_width}\" height=\"{out_height}\" viewBox=\"0 0 {view_width} {view_height}\">\n"
    );

    let _ = write!(
        svg,
        "  <rect x=\"0\" y=\"0\" width=\"{view_width}\" height=\"{view_height}\" fill=\"{}\"/>\n",
        hex_color(background)
    );

    for layer in layers.iter().rev() {
        for path in &layer.paths {
            svg.push_str("  <path d=\"");
            svg.push_str(&path.d);
            svg.push_str("\" fill=\"");
            svg.push_str(&hex_color(path.fill));
            svg.push_str("\" fill-rule=\"");
            svg.push_str(path.fill_rule);
            svg.push('"');

            if let Some(stroke) = path.stroke {
                let _ = write!(svg, " stroke=\"{}\" stroke-width=\"{:.2}\"", hex_color(stroke), path.stroke_width);
            }
            svg.push_str("/>\n");
        }
    }

    svg.push_str("</svg>\n");
    svg
}

fn hex_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::pipeline::Path;

    #[test]
    fn empty_layers_yields_svg_with_only_background() {
        let svg = render_svg(10, 10, 10, 10, &[], Color::new(255, 255, 255));
        assert!(svg.contains("<rect"));
        assert!(!svg.contains("<path"));
        assert!(svg.contains("#ffffff"));
    }

    #[test]
    fn path_without_stroke_omits_stroke_attribute() {
        let layer = Layer {
            color: Color::new(0, 0, 0),
            paths: vec![Path {
                d: "M 0,0 L 1,1 Z".to_string(),
                fill: Color::new(0, 0, 0),
                fill_rule: "evenodd",
                stroke: None,
                stroke_width: 0.0,
                bbox_area: 1.0,
            }],
        };
        let svg = render_svg(10, 10, 10, 10, &[layer], Color::new(255, 255, 255));
        assert!(svg.contains("fill=\"#000000\""));
        assert!(!svg.contains("stroke="));
    }
}
