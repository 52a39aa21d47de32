// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. tree::TreeNode)
    clippy::module_name_repetitions
)]

//! # Inkmap
//!
//! Render plain-text outlines as mind-map PNG images.
//!
//! Inkmap takes an indented outline (or the simplified flow-chart mindmap
//! markup) and produces a raster mind map with:
//! - Word-wrapped multi-script labels (Latin + CJK)
//! - A tidy one- or two-sided horizontal tree layout
//! - Named themes, including an optional hand-drawn sketch style
//!
//! ## Architecture
//!
//! The pipeline runs Parser → Text Shaper → Layout Engine → Renderer; a
//! read-only theme store is consulted by the shaper and renderer. Each call
//! owns its tree, so renders are safe to run concurrently.
//!
//! ## Modules
//!
//! - [`outline`]: Outline text parsing
//! - [`tree`]: Node arena and traversals
//! - [`theme`]: Theme bundles and the process-wide store
//! - [`text`]: Label measurement and word wrapping
//! - [`layout`]: Tree positioning
//! - [`render`]: SVG assembly, rasterization, PNG encoding
//! - [`gate`]: Admission control for concurrent callers

pub mod gate;
pub mod layout;
pub mod outline;
pub mod render;
pub mod text;
pub mod theme;
pub mod tree;

pub use layout::LayoutMode;
pub use render::{RenderError, render_outline, render_tree};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::layout::LayoutMode;
    pub use crate::outline::parse;
    pub use crate::render::{RenderError, render_outline, render_tree};
    pub use crate::theme::Theme;
    pub use crate::tree::{Node, NodeId, Tree};
}
