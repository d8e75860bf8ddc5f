//! Depth-column layout of the mind map.
//!
//! Each depth is a column as wide as its widest block. Blocks stack top to
//! bottom in creation order. Dragged blocks keep their manual position, and a
//! push-down pass separates automatically placed blocks from everything placed
//! before them. The pass gives up after a bounded number of pushes, so residual
//! overlap is possible for pathological inputs.

use crate::config::LayoutConfig;
use crate::geometry::{estimate_node_size, rects_overlap, Rect, Size};
use crate::model::ROOT_ID;
use crate::store::TreeStore;
use std::collections::BTreeMap;

/// Overall board extent after a layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardSize {
    pub width: f32,
    pub height: f32,
}

/// Position every block and return the board size.
///
/// Writes each node's `layout` rect in place.
pub fn layout_tree(store: &mut TreeStore, config: &LayoutConfig) -> BoardSize {
    let sizes: BTreeMap<i32, Size> = store
        .nodes()
        .map(|node| (node.id, estimate_node_size(node, config)))
        .collect();

    // Columns, in creation order within each depth.
    let mut columns: BTreeMap<usize, Vec<i32>> = BTreeMap::new();
    for node in store.nodes() {
        columns.entry(node.depth).or_default().push(node.id);
    }

    let mut auto: BTreeMap<i32, Rect> = BTreeMap::new();
    let mut column_x = config.left_pad;
    for ids in columns.values() {
        let column_width = ids
            .iter()
            .filter_map(|id| sizes.get(id))
            .map(|size| size.w)
            .fold(0.0_f32, f32::max);
        let mut y = config.top_pad;
        for &id in ids {
            let size = sizes.get(&id).copied().unwrap_or(Size {
                w: config.fallback_width,
                h: config.fallback_height,
            });
            auto.insert(id, Rect::new(column_x, y, size.w, size.h));
            y += size.h + config.row_gap;
        }
        let column_width = if column_width > 0.0 {
            column_width
        } else {
            config.fallback_width
        };
        column_x += column_width + config.column_gap;
    }

    for node in store.nodes_mut() {
        let rect = auto.get(&node.id).copied().unwrap_or(Rect::new(
            config.left_pad,
            config.top_pad,
            config.fallback_width,
            config.fallback_height,
        ));
        node.layout = match node.manual_pos {
            Some(pos) => rect.at(pos.x, pos.y),
            None => rect,
        };
    }

    resolve_overlaps(store, config);
    recenter_root(store, config);
    board_size(store, config)
}

/// Push automatically placed blocks down until they clear earlier blocks.
///
/// Dragged blocks are placed first and never moved. The root is left out.
fn resolve_overlaps(store: &mut TreeStore, config: &LayoutConfig) {
    let mut placed: Vec<Rect> = store
        .nodes()
        .filter(|node| node.id != ROOT_ID && node.manual_pos.is_some())
        .map(|node| node.layout)
        .collect();

    let mut pending: Vec<(i32, Rect)> = store
        .nodes()
        .filter(|node| node.id != ROOT_ID && node.manual_pos.is_none())
        .map(|node| (node.id, node.layout))
        .collect();
    pending.sort_by(|(_, a), (_, b)| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

    for (id, rect) in pending {
        let (rect, clear) = push_until_clear(rect, &placed, config);
        if !clear {
            tracing::warn!(
                id,
                attempts = config.overlap_attempts,
                "Overlap budget exhausted; accepting residual overlap"
            );
        }
        store.set_layout(id, rect);
        placed.push(rect);
    }
}

/// Step `rect` down until it clears `placed` or the budget runs out.
/// Returns the final rect and whether it is clear.
fn push_until_clear(mut rect: Rect, placed: &[Rect], config: &LayoutConfig) -> (Rect, bool) {
    let overlaps = |rect: &Rect| placed.iter().any(|other| rects_overlap(rect, other, config.overlap_gap));
    let mut attempts = 0;
    while attempts < config.overlap_attempts && overlaps(&rect) {
        rect.y += config.push_step;
        attempts += 1;
    }
    let clear = !overlaps(&rect);
    (rect, clear)
}

/// Center the root on its direct children unless it was dragged.
fn recenter_root(store: &mut TreeStore, config: &LayoutConfig) {
    let Some(root) = store.root() else {
        return;
    };
    if root.manual_pos.is_some() {
        return;
    }
    let mut span: Option<(f32, f32)> = None;
    for node in store.nodes().filter(|node| node.depth == 1) {
        let (min_y, max_y) = span.unwrap_or((node.layout.y, node.layout.bottom()));
        span = Some((min_y.min(node.layout.y), max_y.max(node.layout.bottom())));
    }
    let Some((min_y, max_y)) = span else {
        return;
    };
    let rect = root.layout;
    let y = ((min_y + max_y - rect.h) / 2.0).round().max(config.top_pad);
    store.set_layout(ROOT_ID, rect.at(rect.x, y));
}

fn board_size(store: &TreeStore, config: &LayoutConfig) -> BoardSize {
    let (width, height) = store.nodes().fold((0.0_f32, 0.0_f32), |(w, h), node| {
        (
            w.max(node.layout.right() + config.board_margin),
            h.max(node.layout.bottom() + config.board_margin),
        )
    });
    BoardSize {
        width: width.max(config.min_board_width),
        height: height.max(config.min_board_height),
    }
}
