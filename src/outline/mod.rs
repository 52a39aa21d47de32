//! Outline parsing.
//!
//! Turns indented text (or the simplified flow-chart mindmap markup) into a
//! [`Tree`]. Parsing never fails: empty or unusable input falls back to a
//! default single-node tree.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::tree::{NodeId, Tree};

/// `root((Label))` bubble syntax on the root line of flow-chart input.
static ROOT_BUBBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^root\(\((.*)\)\)$").expect("root bubble regex"));

/// Dominant indentation unit of a document, detected once from the whole
/// input and applied uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentUnit {
    Tabs,
    Spaces,
}

impl IndentUnit {
    /// Tabs win only when strictly more lines start with a tab than with
    /// two spaces.
    fn detect(input: &str) -> Self {
        let mut tabs = 0usize;
        let mut spaces = 0usize;
        for line in input.lines() {
            if line.starts_with('\t') {
                tabs += 1;
            } else if line.starts_with("  ") {
                spaces += 1;
            }
        }
        if tabs > spaces { Self::Tabs } else { Self::Spaces }
    }

    /// Indentation depth of one line under this unit.
    fn depth_of(self, line: &str) -> usize {
        match self {
            Self::Tabs => line.chars().take_while(|&c| c == '\t').count(),
            Self::Spaces => {
                let mut count = 0usize;
                for c in line.chars() {
                    match c {
                        ' ' => count += 1,
                        // A stray tab in a space-indented document counts
                        // as one two-space group.
                        '\t' => count += 2,
                        _ => break,
                    }
                }
                count / 2
            }
        }
    }
}

/// Parse outline text into a tree.
///
/// Blank lines are skipped and a literal `mindmap` header line is consumed
/// as metadata. Without the header the first depth-0 line becomes the root;
/// with it, the first depth-1 line does. Indentation jumps of more than one
/// level reattach to the nearest recorded shallower ancestor. Input that
/// never yields a root produces a single node labeled `Root`.
pub fn parse(input: &str) -> Tree {
    let unit = IndentUnit::detect(input);
    let mut tree = Tree::new("Root");
    let mut have_root = false;
    let mut last_at_depth: HashMap<usize, NodeId> = HashMap::new();
    let mut prev_depth = 0usize;
    let mut saw_header = false;

    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "mindmap" {
            saw_header = true;
            continue;
        }

        let depth = unit.depth_of(line);
        let label = clean_label(trimmed);

        if !have_root {
            let root_depth = usize::from(saw_header);
            if depth == root_depth {
                let root = tree.root();
                tree.node_mut(root).label = clean_root_label(&label);
                have_root = true;
                last_at_depth.insert(depth, root);
                prev_depth = depth;
            }
            // Lines before any root are dropped.
            continue;
        }

        if depth > prev_depth {
            // Deeper, by any amount: child of the last node recorded at the
            // previous depth.
            if let Some(&parent) = last_at_depth.get(&prev_depth) {
                let id = tree.add_child(parent, label);
                last_at_depth.insert(depth, id);
            }
        } else if let Some(&parent) = depth.checked_sub(1).and_then(|d| last_at_depth.get(&d)) {
            // Equal or shallower: sibling chain through the recorded parent
            // one level up. Recorded nodes deeper than this line are stale.
            let id = tree.add_child(parent, label);
            for stale in depth + 1..=prev_depth {
                last_at_depth.remove(&stale);
            }
            last_at_depth.insert(depth, id);
        } else {
            // No valid parent exists (another line at the root's own depth);
            // the first qualifying line already won the root.
            debug!(%label, depth, "dropping outline line with no parent");
        }
        prev_depth = depth;
    }

    if !have_root {
        debug!("no usable outline lines; falling back to default tree");
    }
    tree
}

/// Strip leading spaces, tabs, and list dashes, then trim.
fn clean_label(text: &str) -> String {
    text.trim_start_matches([' ', '\t', '-']).trim().to_string()
}

/// Unwrap the `root((Label))` bubble when the root line uses it.
fn clean_root_label(text: &str) -> String {
    match ROOT_BUBBLE.captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.to_string(),
    }
}

/// Regenerate two-space-indented outline text from a tree.
///
/// Re-parsing the result yields a tree isomorphic to the input (style
/// overrides are not carried).
pub fn format_outline(tree: &Tree) -> String {
    let mut out = String::new();
    let mut stack = vec![(tree.root(), 0usize)];
    while let Some((id, depth)) = stack.pop() {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&tree.node(id).label);
        out.push('\n');
        for &child in tree.children(id).iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    out
}
