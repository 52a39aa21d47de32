//! SVG document assembly.
//!
//! The positioned tree is painted back-to-front: background, faint grid,
//! connectors, then node boxes and label text, so connectors always sit
//! under nodes.

use std::fmt::Write as _;

use crate::layout::Bounds;
use crate::theme::{NodeStyle, Theme};
use crate::tree::{Node, Tree};

use super::sketch::{self, Wobble};

/// Gap kept between a leaf connector's end and the label text.
const LEAF_TEXT_CLEARANCE: f32 = 4.0;
/// Step of the faint background grid.
const GRID_STEP: f32 = 40.0;
const CONNECTOR_WIDTH: f32 = 1.2;
const OUTLINE_WIDTH: f32 = 1.0;
/// Baseline drop from a line slot's vertical center, as a font-size factor.
const BASELINE_SHIFT: f32 = 0.35;

pub(super) fn build_document(
    tree: &Tree,
    theme: &Theme,
    bounds: &Bounds,
    px_width: u32,
    px_height: u32,
    font_family: &str,
) -> String {
    let width = bounds.width();
    let height = bounds.height();
    let mut out = String::with_capacity(2048 + tree.node_count() * 512);

    let _ = write!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{px_width}\" height=\"{px_height}\" \
         viewBox=\"0 0 {width:.2} {height:.2}\">",
    );
    let _ = write!(
        out,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.colors.background
    );
    push_grid(&mut out, width, height);

    let mut wobble = None;
    if let Some(params) = &theme.sketch {
        if let Some(pattern) = params.fill_pattern {
            let _ = write!(
                out,
                "<defs>{}</defs>",
                sketch::pattern_def(pattern, theme.colors.connector)
            );
        }
        wobble = Some(Wobble::new(params));
    }

    push_connectors(&mut out, tree, theme, wobble.as_mut());
    push_nodes(&mut out, tree, theme, wobble.as_mut(), font_family);

    out.push_str("</svg>");
    out
}

/// Very light grid lines over the background.
fn push_grid(out: &mut String, width: f32, height: f32) {
    let _ = write!(
        out,
        "<g stroke=\"#000000\" stroke-opacity=\"0.02\" stroke-width=\"1\">"
    );
    let mut x = GRID_STEP;
    while x < width {
        let _ = write!(out, "<line x1=\"{x:.0}\" y1=\"0\" x2=\"{x:.0}\" y2=\"{height:.0}\"/>");
        x += GRID_STEP;
    }
    let mut y = GRID_STEP;
    while y < height {
        let _ = write!(out, "<line x1=\"0\" y1=\"{y:.0}\" x2=\"{width:.0}\" y2=\"{y:.0}\"/>");
        y += GRID_STEP;
    }
    out.push_str("</g>");
}

/// One smooth curve per parent-child pair, drawn before any node.
fn push_connectors(out: &mut String, tree: &Tree, theme: &Theme, mut wobble: Option<&mut Wobble>) {
    let color = theme.colors.connector;
    let repeats = theme.sketch.map_or(1, |s| s.repeats.max(1));

    for id in tree.pre_order() {
        let parent = tree.node(id);
        for &child_id in &parent.children {
            let child = tree.node(child_id);
            let (start, c1, c2, end) = connector_curve(parent, child);
            for _ in 0..repeats {
                let d = match wobble.as_mut() {
                    Some(w) => w.cubic(start, c1, c2, end),
                    None => format!(
                        "M {:.2} {:.2} C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                        start.0, start.1, c1.0, c1.1, c2.0, c2.1, end.0, end.1
                    ),
                };
                let _ = write!(
                    out,
                    "<path d=\"{d}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{CONNECTOR_WIDTH}\" \
                     stroke-linecap=\"round\"/>"
                );
            }
        }
    }
}

/// Control points for the parent-to-child curve.
///
/// The curve leaves the parent's facing edge at its vertical center and
/// lands on the child's facing edge; for leaf children it stops short of
/// the label text instead of the box edge.
fn connector_curve(
    parent: &Node,
    child: &Node,
) -> ((f32, f32), (f32, f32), (f32, f32), (f32, f32)) {
    let dir = if child.x >= parent.x { 1.0 } else { -1.0 };
    let start = (parent.x + dir * parent.dims.width / 2.0, parent.y);
    let reach = if child.is_leaf() {
        child.dims.widest_line / 2.0 + LEAF_TEXT_CLEARANCE
    } else {
        child.dims.width / 2.0
    };
    let end = (child.x - dir * reach, child.y);
    let mid_x = (start.0 + end.0) / 2.0;
    (start, (mid_x, start.1), (mid_x, end.1), end)
}

fn push_nodes(
    out: &mut String,
    tree: &Tree,
    theme: &Theme,
    mut wobble: Option<&mut Wobble>,
    font_family: &str,
) {
    let use_pattern = theme
        .sketch
        .is_some_and(|s| s.fill_pattern.is_some());
    let repeats = theme.sketch.map_or(1, |s| s.repeats.max(1));

    for id in tree.pre_order() {
        let node = tree.node(id);
        let style = node
            .style
            .as_ref()
            .unwrap_or_else(|| theme.style_for(node.dims.class));

        let x = node.x - node.dims.width / 2.0;
        let y = node.y - node.dims.height / 2.0;
        let w = node.dims.width;
        let h = node.dims.height;
        let r = theme.layout.corner_radius;

        match wobble.as_mut() {
            Some(wobble) => {
                let _ = write!(
                    out,
                    "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" \
                     rx=\"{r:.2}\" ry=\"{r:.2}\" fill=\"{}\"/>",
                    style.fill
                );
                if use_pattern {
                    let _ = write!(
                        out,
                        "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" \
                         rx=\"{r:.2}\" ry=\"{r:.2}\" fill=\"url(#sketch-fill)\"/>"
                    );
                }
                for _ in 0..repeats {
                    let d = wobble.rounded_rect(x, y, w, h, r);
                    let _ = write!(
                        out,
                        "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" \
                         stroke-width=\"{OUTLINE_WIDTH}\" stroke-linejoin=\"round\"/>",
                        style.stroke
                    );
                }
            }
            None => {
                // Soft two-layer shadow under the box.
                let _ = write!(
                    out,
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" \
                     rx=\"{r:.2}\" ry=\"{r:.2}\" fill=\"#000000\" fill-opacity=\"0.03\"/>",
                    x + 2.5,
                    y + 2.5
                );
                let _ = write!(
                    out,
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" \
                     rx=\"{r:.2}\" ry=\"{r:.2}\" fill=\"#000000\" fill-opacity=\"0.02\"/>",
                    x + 4.0,
                    y + 4.0
                );
                let _ = write!(
                    out,
                    "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" \
                     rx=\"{r:.2}\" ry=\"{r:.2}\" fill=\"{}\" stroke=\"{}\" \
                     stroke-width=\"{OUTLINE_WIDTH}\"/>",
                    style.fill, style.stroke
                );
            }
        }

        push_label(out, node, style, theme, font_family);
    }
}

/// Wrapped label lines, centered in the box.
fn push_label(out: &mut String, node: &Node, style: &NodeStyle, theme: &Theme, font_family: &str) {
    let line_height = theme.layout.line_height;
    let total = node.dims.lines.len() as f32 * line_height;
    for (i, line) in node.dims.lines.iter().enumerate() {
        let slot_center = node.y - total / 2.0 + (i as f32 + 0.5) * line_height;
        let baseline = theme.layout.font_size.mul_add(BASELINE_SHIFT, slot_center);
        let _ = write!(
            out,
            "<text x=\"{:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" \
             font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            node.x,
            escape_xml_attr(font_family),
            theme.layout.font_size,
            style.text,
            escape_xml(line)
        );
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_xml_attr(input: &str) -> String {
    escape_xml(input).replace('"', "&quot;").replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{self, LayoutMode};
    use crate::text::{self, FontBook, Measurer};
    use crate::theme;

    fn build(theme_id: &str, input: &str) -> String {
        let theme = theme::store().get(theme_id).unwrap();
        let mut tree = crate::outline::parse(input);
        let mut measurer = Measurer::new(FontBook::shared(), theme.layout.font_size);
        text::shape_tree(&mut tree, &theme, &mut measurer);
        let bounds = layout::layout_tree(&mut tree, &theme.layout, LayoutMode::Right);
        build_document(&tree, &theme, &bounds, 800, 600, "sans-serif")
    }

    #[test]
    fn test_document_structure_and_label_text() {
        let svg = build("default", "Main\n  First\n  Second");
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(">Main</text>"));
        assert!(svg.contains(">First</text>"));
        // Two connectors in plain style.
        assert_eq!(svg.matches("<path").count(), 2);
    }

    #[test]
    fn test_connectors_precede_nodes() {
        let svg = build("default", "Main\n  Leaf");
        let connector = svg.find("<path").expect("connector present");
        let node_box = svg.find("rx=").expect("node box present");
        assert!(connector < node_box);
    }

    #[test]
    fn test_sketch_theme_redraws_strokes_and_fills_pattern() {
        let svg = build("sketch", "Main\n  Leaf");
        assert!(svg.contains("sketch-fill"));
        // Two children strokes x repeats, plus outline repeats per node:
        // more paths than the plain style would produce.
        assert!(svg.matches("<path").count() > 3);
    }

    #[test]
    fn test_labels_are_escaped() {
        let svg = build("default", "a < b & c");
        assert!(svg.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_leaf_connector_stops_at_text_edge() {
        let theme = theme::store().get("default").unwrap();
        let mut tree = crate::outline::parse("Main\n  tiny");
        let mut measurer = Measurer::new(FontBook::shared(), theme.layout.font_size);
        text::shape_tree(&mut tree, &theme, &mut measurer);
        layout::layout_tree(&mut tree, &theme.layout, LayoutMode::Right);

        let root = tree.node(tree.root());
        let leaf_id = tree.children(tree.root())[0];
        let leaf = tree.node(leaf_id);
        let (_, _, _, end) = connector_curve(root, leaf);
        let box_edge = leaf.x - leaf.dims.width / 2.0;
        let text_edge = leaf.x - leaf.dims.widest_line / 2.0;
        assert!(end.0 > box_edge, "curve reaches past the box edge");
        assert!(end.0 <= text_edge, "curve stops before the text");
    }
}
