//! Tidy-tree layout for horizontal mind maps.
//!
//! Positions are a pure function of tree shape, node dimensions, and theme
//! spacing: subtree heights are accumulated bottom-up, then nodes are
//! placed top-down with each parent centered vertically on its children's
//! combined extent. All walks use explicit stacks.

use tracing::debug;

use crate::theme::LayoutMetrics;
use crate::tree::{NodeId, Tree};

/// Horizontal fan-out direction for children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    #[default]
    Right,
    Left,
    /// Root children split across both sides; deeper levels keep their side.
    Both,
}

impl LayoutMode {
    /// Parse a mode parameter; unknown values fall back to the default.
    pub fn from_param(value: &str) -> Self {
        match value.trim() {
            "left" => Self::Left,
            "both" => Self::Both,
            "right" | "" => Self::Right,
            other => {
                debug!(mode = other, "unknown layout mode, using 'right'");
                Self::Right
            }
        }
    }
}

/// Extra bounds margin around every node box; leaves get more room so
/// connectors that run under their labels stay inside the canvas.
const NODE_MARGIN: f32 = 5.0;
const LEAF_MARGIN: f32 = 15.0;
/// Fixed outer margin around the whole content box.
const OUTER_MARGIN: f32 = 50.0;

/// Content bounding box in layout units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    const fn empty() -> Self {
        Self {
            min_x: f32::MAX,
            min_y: f32::MAX,
            max_x: f32::MIN,
            max_y: f32::MIN,
        }
    }

    fn include(&mut self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) {
        self.min_x = self.min_x.min(min_x);
        self.min_y = self.min_y.min(min_y);
        self.max_x = self.max_x.max(max_x);
        self.max_y = self.max_y.max(max_y);
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Assign a center position to every node, then translate the whole tree
/// into non-negative canvas coordinates.
///
/// Returns the translated content bounds (origin at `(0, 0)`), which the
/// renderer turns into a canvas size.
pub fn layout_tree(tree: &mut Tree, metrics: &LayoutMetrics, mode: LayoutMode) -> Bounds {
    let heights = subtree_heights(tree, metrics);

    let root = tree.root();
    {
        let node = tree.node_mut(root);
        node.x = 0.0;
        node.y = 0.0;
    }

    match mode {
        LayoutMode::Right => {
            let children = tree.children(root).to_vec();
            place_branch(tree, root, &children, 1.0, &heights, metrics);
        }
        LayoutMode::Left => {
            let children = tree.children(root).to_vec();
            place_branch(tree, root, &children, -1.0, &heights, metrics);
        }
        LayoutMode::Both => {
            let (right, left) = partition_sides(tree, root, &heights);
            place_branch(tree, root, &right, 1.0, &heights, metrics);
            place_branch(tree, root, &left, -1.0, &heights, metrics);
        }
    }

    let bounds = content_bounds(tree);
    translate(tree, -bounds.min_x, -bounds.min_y);
    Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: bounds.width(),
        max_y: bounds.height(),
    }
}

/// Bottom-up pass: vertical space each node's full subtree occupies.
///
/// A childless node's subtree height is its own height; a single child adds
/// no inter-child gap.
fn subtree_heights(tree: &Tree, metrics: &LayoutMetrics) -> Vec<f32> {
    let mut heights = vec![0.0_f32; tree.node_count()];
    for id in tree.post_order() {
        let node = tree.node(id);
        let own = node.dims.height;
        if node.children.is_empty() {
            heights[id.index()] = own;
            continue;
        }
        let children_total: f32 = node
            .children
            .iter()
            .map(|c| heights[c.index()])
            .sum::<f32>()
            + metrics.node_spacing * (node.children.len() - 1) as f32;
        heights[id.index()] = own.max(children_total);
    }
    heights
}

/// Greedily assign each root child to whichever side currently has the
/// smaller accumulated subtree height (ties go right). Returns
/// `(right, left)` in original sibling order.
fn partition_sides(tree: &Tree, root: NodeId, heights: &[f32]) -> (Vec<NodeId>, Vec<NodeId>) {
    let mut right = Vec::new();
    let mut left = Vec::new();
    let mut right_height = 0.0_f32;
    let mut left_height = 0.0_f32;
    for &child in tree.children(root) {
        if right_height <= left_height {
            right.push(child);
            right_height += heights[child.index()];
        } else {
            left.push(child);
            left_height += heights[child.index()];
        }
    }
    (right, left)
}

/// Place `children` around `parent` on one side, then keep descending with
/// an explicit stack.
fn place_branch(
    tree: &mut Tree,
    parent: NodeId,
    children: &[NodeId],
    dir: f32,
    heights: &[f32],
    metrics: &LayoutMetrics,
) {
    place_band(tree, parent, children, dir, heights, metrics);
    let mut stack: Vec<NodeId> = children.to_vec();
    while let Some(id) = stack.pop() {
        let kids = tree.children(id).to_vec();
        if kids.is_empty() {
            continue;
        }
        place_band(tree, id, &kids, dir, heights, metrics);
        stack.extend(kids);
    }
}

/// Position one set of direct children: vertically centered as a block on
/// the parent, each child centered within its own subtree band, placed one
/// level further out horizontally.
fn place_band(
    tree: &mut Tree,
    parent: NodeId,
    children: &[NodeId],
    dir: f32,
    heights: &[f32],
    metrics: &LayoutMetrics,
) {
    if children.is_empty() {
        return;
    }
    let (parent_x, parent_y, parent_width) = {
        let node = tree.node(parent);
        (node.x, node.y, node.dims.width)
    };
    let total: f32 = children.iter().map(|c| heights[c.index()]).sum::<f32>()
        + metrics.node_spacing * (children.len() - 1) as f32;

    let mut cursor = parent_y - total / 2.0;
    for &child in children {
        let band = heights[child.index()];
        let child_width = tree.node(child).dims.width;
        let node = tree.node_mut(child);
        node.x = dir.mul_add(
            parent_width / 2.0 + metrics.level_spacing + child_width / 2.0,
            parent_x,
        );
        node.y = cursor + band / 2.0;
        cursor += band + metrics.node_spacing;
    }
}

/// Running box over all node rectangles plus margins.
fn content_bounds(tree: &Tree) -> Bounds {
    let mut bounds = Bounds::empty();
    for id in tree.pre_order() {
        let node = tree.node(id);
        let margin = if node.is_leaf() { LEAF_MARGIN } else { NODE_MARGIN };
        bounds.include(
            node.x - node.dims.width / 2.0 - margin,
            node.y - node.dims.height / 2.0 - margin,
            node.x + node.dims.width / 2.0 + margin,
            node.y + node.dims.height / 2.0 + margin,
        );
    }
    bounds.min_x -= OUTER_MARGIN;
    bounds.min_y -= OUTER_MARGIN;
    bounds.max_x += OUTER_MARGIN;
    bounds.max_y += OUTER_MARGIN;
    bounds
}

fn translate(tree: &mut Tree, dx: f32, dy: f32) {
    for id in tree.pre_order() {
        let node = tree.node_mut(id);
        node.x += dx;
        node.y += dy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    /// Give every node fixed dimensions so positions are easy to reason
    /// about without a font.
    fn size_all(tree: &mut Tree, width: f32, height: f32) {
        for id in tree.pre_order() {
            let node = tree.node_mut(id);
            node.dims.width = width;
            node.dims.height = height;
        }
    }

    fn metrics() -> LayoutMetrics {
        theme::store().get("default").unwrap().layout
    }

    #[test]
    fn test_mode_parsing_falls_back_to_right() {
        assert_eq!(LayoutMode::from_param("left"), LayoutMode::Left);
        assert_eq!(LayoutMode::from_param("both"), LayoutMode::Both);
        assert_eq!(LayoutMode::from_param("sideways"), LayoutMode::Right);
        assert_eq!(LayoutMode::from_param(""), LayoutMode::Right);
    }

    #[test]
    fn test_childless_subtree_height_is_own_height() {
        let mut tree = Tree::new("only");
        size_all(&mut tree, 100.0, 36.0);
        let heights = subtree_heights(&tree, &metrics());
        assert!((heights[tree.root().index()] - 36.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_single_child_adds_no_gap() {
        let mut tree = Tree::new("r");
        tree.add_child(tree.root(), "a");
        size_all(&mut tree, 100.0, 36.0);
        let heights = subtree_heights(&tree, &metrics());
        assert!((heights[tree.root().index()] - 36.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_children_placed_one_level_out_to_the_right() {
        let mut tree = Tree::new("r");
        let a = tree.add_child(tree.root(), "a");
        let b = tree.add_child(tree.root(), "b");
        size_all(&mut tree, 100.0, 36.0);
        let m = metrics();
        layout_tree(&mut tree, &m, LayoutMode::Right);

        let root = tree.node(tree.root());
        let a = tree.node(a);
        let b = tree.node(b);
        let expected_dx = 100.0 / 2.0 + m.level_spacing + 100.0 / 2.0;
        assert!((a.x - root.x - expected_dx).abs() < 0.01);
        assert!((b.x - root.x - expected_dx).abs() < 0.01);
        // Children centered vertically on the parent.
        assert!(((a.y + b.y) / 2.0 - root.y).abs() < 0.01);
        assert!(a.y < b.y);
    }

    #[test]
    fn test_left_mirrors_right() {
        let build = || {
            let mut tree = Tree::new("r");
            let a = tree.add_child(tree.root(), "a");
            tree.add_child(a, "a1");
            tree.add_child(a, "a2");
            tree.add_child(tree.root(), "b");
            size_all(&mut tree, 120.0, 40.0);
            tree
        };
        let m = metrics();
        let mut right = build();
        let mut left = build();
        layout_tree(&mut right, &m, LayoutMode::Right);
        layout_tree(&mut left, &m, LayoutMode::Left);

        let r_root = (right.node(right.root()).x, right.node(right.root()).y);
        let l_root = (left.node(left.root()).x, left.node(left.root()).y);
        for (r_id, l_id) in right.pre_order().into_iter().zip(left.pre_order()) {
            let r = right.node(r_id);
            let l = left.node(l_id);
            let r_dx = r.x - r_root.0;
            let l_dx = l.x - l_root.0;
            assert!((r_dx + l_dx).abs() < 0.01, "x offsets must mirror");
            assert!(((r.y - r_root.1) - (l.y - l_root.1)).abs() < 0.01);
        }
    }

    #[test]
    fn test_both_mode_splits_four_equal_children_evenly() {
        let mut tree = Tree::new("r");
        for label in ["a", "b", "c", "d"] {
            tree.add_child(tree.root(), label);
        }
        size_all(&mut tree, 100.0, 36.0);
        let m = metrics();
        layout_tree(&mut tree, &m, LayoutMode::Both);

        let root_x = tree.node(tree.root()).x;
        let rights = tree
            .children(tree.root())
            .iter()
            .filter(|&&c| tree.node(c).x > root_x)
            .count();
        let lefts = tree
            .children(tree.root())
            .iter()
            .filter(|&&c| tree.node(c).x < root_x)
            .count();
        assert_eq!(rights, 2);
        assert_eq!(lefts, 2);
    }

    #[test]
    fn test_deeper_levels_keep_their_side_in_both_mode() {
        let mut tree = Tree::new("r");
        let a = tree.add_child(tree.root(), "a");
        let a1 = tree.add_child(a, "a1");
        let b = tree.add_child(tree.root(), "b");
        let b1 = tree.add_child(b, "b1");
        size_all(&mut tree, 100.0, 36.0);
        layout_tree(&mut tree, &metrics(), LayoutMode::Both);

        let root_x = tree.node(tree.root()).x;
        let (a_x, b_x) = (tree.node(a).x, tree.node(b).x);
        assert!((a_x > root_x) != (b_x > root_x), "a and b on opposite sides");
        assert_eq!(tree.node(a1).x > root_x, a_x > root_x);
        assert_eq!(tree.node(b1).x > root_x, b_x > root_x);
    }

    #[test]
    fn test_layout_lands_in_non_negative_canvas_space() {
        let mut tree = Tree::new("r");
        let a = tree.add_child(tree.root(), "a");
        tree.add_child(a, "deep");
        size_all(&mut tree, 100.0, 36.0);
        let bounds = layout_tree(&mut tree, &metrics(), LayoutMode::Left);
        assert!(bounds.width() > 0.0 && bounds.height() > 0.0);
        for id in tree.pre_order() {
            let node = tree.node(id);
            assert!(node.x - node.dims.width / 2.0 >= 0.0);
            assert!(node.y - node.dims.height / 2.0 >= 0.0);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        /// Random bushy trees: each entry is the parent index of node i+1.
        fn arb_parents() -> impl Strategy<Value = Vec<usize>> {
            prop::collection::vec(0..100usize, 0..40)
        }

        proptest! {
            #[test]
            fn sibling_subtrees_never_overlap(parents in arb_parents()) {
                let mut tree = Tree::new("root");
                let mut ids = vec![tree.root()];
                for (i, p) in parents.iter().enumerate() {
                    let parent = ids[p % ids.len()];
                    ids.push(tree.add_child(parent, format!("n{i}")));
                }
                size_all(&mut tree, 100.0, 36.0);
                let m = metrics();
                layout_tree(&mut tree, &m, LayoutMode::Right);
                let heights = subtree_heights(&tree, &m);

                for id in tree.pre_order() {
                    let children = tree.children(id);
                    for pair in children.windows(2) {
                        let top = tree.node(pair[0]);
                        let bottom = tree.node(pair[1]);
                        let top_end = top.y + heights[pair[0].index()] / 2.0;
                        let bottom_start = bottom.y - heights[pair[1].index()] / 2.0;
                        prop_assert!(
                            bottom_start - top_end >= m.node_spacing - 0.01,
                            "sibling bands must keep the configured gap"
                        );
                    }
                }
            }

            #[test]
            fn layout_is_deterministic(parents in arb_parents()) {
                let build = |parents: &[usize]| {
                    let mut tree = Tree::new("root");
                    let mut ids = vec![tree.root()];
                    for (i, p) in parents.iter().enumerate() {
                        let parent = ids[p % ids.len()];
                        ids.push(tree.add_child(parent, format!("n{i}")));
                    }
                    size_all(&mut tree, 100.0, 36.0);
                    tree
                };
                let m = metrics();
                let mut first = build(&parents);
                let mut second = build(&parents);
                layout_tree(&mut first, &m, LayoutMode::Both);
                layout_tree(&mut second, &m, LayoutMode::Both);
                for (a, b) in first.pre_order().into_iter().zip(second.pre_order()) {
                    prop_assert!((first.node(a).x - second.node(b).x).abs() < f32::EPSILON);
                    prop_assert!((first.node(a).y - second.node(b).y).abs() < f32::EPSILON);
                }
            }
        }
    }
}
