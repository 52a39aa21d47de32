//! Text shaping.
//!
//! Word-wraps node labels against theme width bounds and records the
//! resulting box dimensions on each node. Latin text segments on spaces;
//! contiguous runs of CJK ideographs travel as single words and are
//! re-split per line when they grow too long, since those scripts carry no
//! inter-word spaces to break on.

mod metrics;

pub use metrics::FontBook;
pub(crate) use metrics::Measurer;

use crate::theme::Theme;
use crate::tree::{Dimensions, NodeClass, NodeId, Tree};

/// A packed line containing more than this many ideographs is re-split.
const MAX_CJK_PER_LINE: usize = 20;
/// Forced re-split stride for over-long ideograph runs.
const CJK_SPLIT_STRIDE: usize = 10;

/// Whether a character is a CJK ideograph for segmentation purposes.
pub(crate) fn is_cjk(c: char) -> bool {
    matches!(
        u32::from(c),
        0x4E00..=0x9FFF      // CJK Unified Ideographs
        | 0x3400..=0x4DBF    // Extension A
        | 0xF900..=0xFAFF    // Compatibility Ideographs
        | 0x20000..=0x2EBEF  // Extensions B..F
    )
}

/// Compute and cache dimensions plus the style class for every node.
pub(crate) fn shape_tree(tree: &mut Tree, theme: &Theme, measurer: &mut Measurer<'_>) {
    for id in tree.pre_order() {
        let class = classify(tree, id);
        let dims = shape_label(&tree.node(id).label, theme, measurer, class);
        tree.node_mut(id).dims = dims;
    }
}

/// Resolve the closed style tag for one node.
fn classify(tree: &Tree, id: NodeId) -> NodeClass {
    if id == tree.root() {
        return NodeClass::Root;
    }
    let node = tree.node(id);
    if node.is_leaf() {
        return NodeClass::Leaf;
    }
    let has_grandchildren = node
        .children
        .iter()
        .any(|&child| !tree.node(child).is_leaf());
    if has_grandchildren {
        NodeClass::BranchWithGrandchildren
    } else {
        NodeClass::BranchLeafParent
    }
}

/// Wrap one label and derive its box dimensions.
fn shape_label(
    label: &str,
    theme: &Theme,
    measurer: &mut Measurer<'_>,
    class: NodeClass,
) -> Dimensions {
    let l = &theme.layout;
    let words = split_words(label);
    if words.is_empty() {
        return Dimensions {
            width: l.min_node_width,
            height: l.min_node_height,
            lines: Vec::new(),
            widest_line: 0.0,
            class,
        };
    }

    let space_width = measurer.width(" ");
    let mut text_width: f32 = words.iter().map(|w| measurer.width(w)).sum();
    text_width += space_width * (words.len() - 1) as f32;

    let width = (text_width + 2.0 * l.text_padding).clamp(l.min_node_width, l.max_node_width);
    let available = width - 2.0 * l.text_padding;

    // Long labels pack against a slightly narrower target so the final box
    // doesn't end with one orphan word on its own line.
    let packing_width = if text_width > l.max_node_width * 1.5 {
        available * 0.85
    } else if text_width > l.max_node_width {
        available * 0.9
    } else {
        available
    };

    let lines = resplit_cjk(pack_lines(&words, packing_width, measurer));
    let widest_line = lines
        .iter()
        .map(|line| measurer.width(line))
        .fold(0.0_f32, f32::max);
    let height = (lines.len() as f32)
        .mul_add(l.line_height, 2.0 * l.text_padding)
        .max(l.min_node_height);

    Dimensions {
        width,
        height,
        lines,
        widest_line,
        class,
    }
}

/// Split a label into words: maximal non-space runs, except that entering
/// or leaving a contiguous ideograph run also ends a word.
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_cjk_run = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            in_cjk_run = false;
        } else if is_cjk(c) {
            if !in_cjk_run && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(c);
            in_cjk_run = true;
        } else {
            if in_cjk_run && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(c);
            in_cjk_run = false;
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Greedily pack words into lines no wider than `available`.
fn pack_lines(words: &[String], available: f32, measurer: &mut Measurer<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0_f32;
    let space_width = measurer.width(" ");

    for word in words {
        let word_width = measurer.width(word);
        let join_width = if line.is_empty() { 0.0 } else { space_width };
        if line_width + word_width + join_width <= available {
            if !line.is_empty() {
                line.push(' ');
                line_width += space_width;
            }
            line.push_str(word);
            line_width += word_width;
        } else {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            line = word.clone();
            line_width = word_width;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Re-split any line whose ideograph count exceeds [`MAX_CJK_PER_LINE`] at
/// every [`CJK_SPLIT_STRIDE`]th ideograph; other characters ride along.
fn resplit_cjk(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let cjk_count = line.chars().filter(|&c| is_cjk(c)).count();
        if cjk_count <= MAX_CJK_PER_LINE {
            out.push(line);
            continue;
        }
        let mut part = String::new();
        let mut seen = 0usize;
        for c in line.chars() {
            part.push(c);
            if is_cjk(c) {
                seen += 1;
                if seen >= CJK_SPLIT_STRIDE {
                    out.push(std::mem::take(&mut part));
                    seen = 0;
                }
            }
        }
        if !part.is_empty() {
            out.push(part);
        }
    }
    out
}
