//! Rendering.
//!
//! Walks a positioned tree into an SVG document, rasterizes it with resvg
//! against the process font database, and encodes the pixels as PNG into a
//! caller-supplied sink. Encoding happens only after the full tree is
//! drawn, so a failed render never emits partial image bytes.

mod sketch;
mod svg;

use std::io::Write;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;
use tracing::debug;

use crate::layout::{self, LayoutMode};
use crate::outline;
use crate::text::{self, FontBook, Measurer};
use crate::theme;
use crate::tree::Tree;

/// Hard ceiling on either pixel dimension of the output canvas.
const MAX_CANVAS_DIM: u32 = 16_384;

/// Ways a render can fail. Font and theme anomalies degrade with a logged
/// warning instead; only I/O and allocation problems abort.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("theme '{0}' is not registered and no default theme exists")]
    ThemeNotFound(String),
    #[error("computed canvas size {width}x{height} is not renderable")]
    CanvasAllocation { width: u32, height: u32 },
    #[error("failed to write PNG to the output sink")]
    Io(#[from] image::ImageError),
    #[error("generated drawing was rejected by the rasterizer")]
    Rasterize(#[from] resvg::usvg::Error),
}

/// Render a parsed outline tree as a PNG image.
///
/// The tree is annotated in place (dimensions, then positions) and painted
/// once. An unknown `theme_id` falls back to the default theme.
///
/// # Errors
///
/// Fails when the theme id is unknown with no default registered, when the
/// computed canvas is degenerate or larger than the renderer accepts, or
/// when writing to `sink` fails.
pub fn render_tree<W: Write>(
    tree: &mut Tree,
    theme_id: &str,
    mode: LayoutMode,
    sink: W,
) -> Result<(), RenderError> {
    let theme = theme::store()
        .get(theme_id)
        .ok_or_else(|| RenderError::ThemeNotFound(theme_id.to_string()))?;

    let book = FontBook::shared();
    let mut measurer = Measurer::new(book, theme.layout.font_size);
    text::shape_tree(tree, &theme, &mut measurer);
    let bounds = layout::layout_tree(tree, &theme.layout, mode);

    let scale = theme.layout.scale;
    let px_width = (bounds.width() * scale).ceil();
    let px_height = (bounds.height() * scale).ceil();
    if !(px_width >= 1.0
        && px_height >= 1.0
        && px_width <= MAX_CANVAS_DIM as f32
        && px_height <= MAX_CANVAS_DIM as f32)
    {
        return Err(RenderError::CanvasAllocation {
            width: px_width.max(0.0) as u32,
            height: px_height.max(0.0) as u32,
        });
    }
    let px_width = px_width as u32;
    let px_height = px_height as u32;

    let document = svg::build_document(tree, &theme, &bounds, px_width, px_height, book.family());
    debug!(
        nodes = tree.node_count(),
        px_width, px_height, "rasterizing mind map"
    );
    rasterize_and_encode(&document, px_width, px_height, book, sink)
}

/// Parse outline text and render it in one call.
///
/// # Errors
///
/// Same failure modes as [`render_tree`]; parsing itself never fails.
pub fn render_outline<W: Write>(
    input: &str,
    theme_id: &str,
    mode: LayoutMode,
    sink: W,
) -> Result<(), RenderError> {
    let mut tree = outline::parse(input);
    render_tree(&mut tree, theme_id, mode, sink)
}

fn rasterize_and_encode<W: Write>(
    document: &str,
    px_width: u32,
    px_height: u32,
    book: &FontBook,
    sink: W,
) -> Result<(), RenderError> {
    let options = resvg::usvg::Options {
        fontdb: book.database(),
        font_family: book.family().to_string(),
        ..resvg::usvg::Options::default()
    };
    let rtree = resvg::usvg::Tree::from_str(document, &options)?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(px_width, px_height).ok_or(
        RenderError::CanvasAllocation {
            width: px_width,
            height: px_height,
        },
    )?;
    resvg::render(
        &rtree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );

    PngEncoder::new(sink).write_image(
        pixmap.data(),
        px_width,
        px_height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    #[test]
    fn test_render_outline_writes_png() {
        let mut buf = Vec::new();
        render_outline("Main\n  A\n  B", "default", LayoutMode::Right, &mut buf).unwrap();
        assert_eq!(&buf[..8], &PNG_MAGIC);
    }

    #[test]
    fn test_render_sketch_theme() {
        let mut buf = Vec::new();
        render_outline("Main\n  A\n    A1\n  B", "sketch", LayoutMode::Both, &mut buf).unwrap();
        assert_eq!(&buf[..8], &PNG_MAGIC);
    }

    #[test]
    fn test_unknown_theme_falls_back_to_default() {
        let mut buf = Vec::new();
        render_outline("Main", "no-such-theme", LayoutMode::Right, &mut buf).unwrap();
        assert_eq!(&buf[..8], &PNG_MAGIC);
    }

    #[test]
    fn test_failed_sink_aborts_without_partial_output() {
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("sink closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let err = render_outline("Main\n  A", "default", LayoutMode::Right, FailingSink)
            .unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }

    #[test]
    fn test_oversized_canvas_is_rejected() {
        // Enough nodes to blow past the pixel ceiling at 3x scale.
        let mut outline = String::from("Main\n");
        for i in 0..600 {
            outline.push_str(&format!("  branch number {i}\n"));
        }
        let mut buf = Vec::new();
        let err = render_outline(&outline, "default", LayoutMode::Right, &mut buf).unwrap_err();
        assert!(matches!(err, RenderError::CanvasAllocation { .. }));
        assert!(buf.is_empty(), "no partial image bytes on failure");
    }

    #[test]
    fn test_left_and_right_renders_have_equal_dimensions() {
        let mut right = Vec::new();
        let mut left = Vec::new();
        render_outline("Main\n  A\n  B", "default", LayoutMode::Right, &mut right).unwrap();
        render_outline("Main\n  A\n  B", "default", LayoutMode::Left, &mut left).unwrap();
        // Mirrored layouts produce identical canvas sizes; compare the PNG
        // IHDR chunk (bytes 16..24 hold width and height).
        assert_eq!(&right[16..24], &left[16..24]);
    }
}
