//! Small geometry helpers shared by layout, routing and dragging.

use crate::config::LayoutConfig;
use crate::model::{Node, NodeKind};

/// A point in board-local coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    /// Same size, moved to `(x, y)`.
    pub fn at(&self, x: f32, y: f32) -> Self {
        Self { x, y, ..*self }
    }
}

/// Estimated panel size, before placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}

/// Check whether two rectangles overlap once each is inflated by `gap`.
///
/// Rectangles that are exactly `gap` apart do not overlap.
pub fn rects_overlap(a: &Rect, b: &Rect, gap: f32) -> bool {
    if a.x + a.w + gap <= b.x {
        return false;
    }
    if b.x + b.w + gap <= a.x {
        return false;
    }
    if a.y + a.h + gap <= b.y {
        return false;
    }
    if b.y + b.h + gap <= a.y {
        return false;
    }
    true
}

/// Clamp `value` into `[min, max]`.
///
/// Unlike `f32::clamp` this never panics when `min > max`; the lower bound wins.
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        return min;
    }
    if value > max {
        return max;
    }
    value
}

/// Estimate a panel size from its title and item labels.
///
/// Wider labels give a wider panel and more rows a taller one, both capped.
/// Source-outline panels get a higher height cap.
pub fn estimate_node_size(node: &Node, config: &LayoutConfig) -> Size {
    let longest = std::iter::once(node.title.as_str())
        .chain(node.items.iter().map(|item| item.label.as_str()))
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(0)
        .max(config.min_label_chars);

    let width = (config.base_width + longest as f32 * config.width_per_char)
        .max(config.min_width)
        .min(config.max_width)
        .round();

    let line_count = node.items.len() + 1;
    let max_height = if node.kind == NodeKind::Source {
        config.max_source_height
    } else {
        config.max_height
    };
    let height = (config.header_height + line_count as f32 * config.row_height)
        .max(config.min_height)
        .min(max_height)
        .round();

    Size { w: width, h: height }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, Node, NodeKind};

    fn node_with(kind: NodeKind, title: &str, labels: &[&str]) -> Node {
        let items = labels
            .iter()
            .enumerate()
            .map(|(i, label)| Item::text(format!("row:{i}"), *label))
            .collect();
        Node::new(1, title, items, None, 1, kind)
    }

    // ========================================================================
    // rects_overlap()
    // ========================================================================

    #[test]
    fn test_overlapping_rects() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(50.0, 25.0, 100.0, 50.0);
        assert!(rects_overlap(&a, &b, 0.0));
        assert!(rects_overlap(&b, &a, 0.0));
    }

    #[test]
    fn test_separated_rects() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(200.0, 0.0, 100.0, 50.0);
        assert!(!rects_overlap(&a, &b, 10.0));
    }

    #[test]
    fn test_gap_makes_near_rects_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(105.0, 0.0, 100.0, 50.0);
        assert!(!rects_overlap(&a, &b, 0.0));
        assert!(rects_overlap(&a, &b, 10.0));
    }

    #[test]
    fn test_rects_exactly_gap_apart_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(0.0, 60.0, 100.0, 50.0);
        assert!(!rects_overlap(&a, &b, 10.0));
    }

    // ========================================================================
    // clamp()
    // ========================================================================

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(clamp(-5.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(15.0, 0.0, 10.0), 10.0);
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
    }

    #[test]
    fn test_clamp_inverted_bounds_prefers_min() {
        assert_eq!(clamp(5.0, 10.0, 0.0), 10.0);
    }

    // ========================================================================
    // estimate_node_size()
    // ========================================================================

    #[test]
    fn test_small_node_uses_minimums() {
        let config = LayoutConfig::default();
        let node = node_with(NodeKind::Loop, "Loop", &["a"]);
        let size = estimate_node_size(&node, &config);
        assert_eq!(size.w, 300.0);
        assert_eq!(size.h, 112.0);
    }

    #[test]
    fn test_long_labels_widen_up_to_cap() {
        let config = LayoutConfig::default();
        let long = "x".repeat(60);
        let node = node_with(NodeKind::Sibling, "Param", &[long.as_str()]);
        // 210 + 60 * 3.2 = 402
        assert_eq!(estimate_node_size(&node, &config).w, 402.0);

        let huge = "x".repeat(500);
        let node = node_with(NodeKind::Sibling, "Param", &[huge.as_str()]);
        assert_eq!(estimate_node_size(&node, &config).w, 560.0);
    }

    #[test]
    fn test_many_rows_capped_by_kind() {
        let config = LayoutConfig::default();
        let labels: Vec<&str> = std::iter::repeat("row").take(40).collect();
        let plain = node_with(NodeKind::Loop, "Loop", &labels);
        let source = node_with(NodeKind::Source, "Source", &labels);
        assert_eq!(estimate_node_size(&plain, &config).h, 500.0);
        assert_eq!(estimate_node_size(&source, &config).h, 620.0);
    }

    #[test]
    fn test_height_grows_with_rows() {
        let config = LayoutConfig::default();
        let labels: Vec<&str> = std::iter::repeat("row").take(5).collect();
        let node = node_with(NodeKind::Odl, "ODL", &labels);
        // 50 + 6 * 24 = 194
        assert_eq!(estimate_node_size(&node, &config).h, 194.0);
    }
}
