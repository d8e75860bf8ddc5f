//! Spatial state of the mind map: where blocks, headers and item rows are.
//!
//! Connector anchors need board coordinates for two things: the input side of
//! a child block and the output side of the item row that opened it. A
//! [`GeometryProvider`] answers both. [`GeometryCache`] is filled from measured
//! UI reports; [`ModelGeometry`] derives the same answers from the layout pass
//! when nothing was measured (headless use, tests, first frame).

use crate::config::LayoutConfig;
use crate::geometry::Rect;
use crate::model::LinkKey;
use crate::store::TreeStore;
use std::collections::HashMap;

/// Source of block, header and item rectangles in board coordinates.
pub trait GeometryProvider {
    fn block_rect(&self, node_id: i32) -> Option<Rect>;

    /// Header band of a block. `None` lets the router fall back to a fixed
    /// offset from the block top.
    fn header_rect(&self, node_id: i32) -> Option<Rect>;

    /// Row of an item, already shifted by the owning block's scroll offset.
    fn item_rect(&self, key: &LinkKey) -> Option<Rect>;
}

/// Scroll offsets of a block's item list.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollOffset {
    pub top: f32,
    pub left: f32,
}

/// Measured geometry reported by the UI.
///
/// Block rects are absolute. Header and item rects are relative to their
/// block and item rects ignore scrolling; the scroll offset is applied when
/// they are resolved.
#[derive(Debug, Default)]
pub struct GeometryCache {
    pub block_rects: HashMap<i32, Rect>,
    pub header_rects: HashMap<i32, Rect>,
    pub item_rects: HashMap<LinkKey, Rect>,
    pub scroll: HashMap<i32, ScrollOffset>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_block_rect_report(&mut self, id: i32, x: f32, y: f32, w: f32, h: f32) {
        self.block_rects.insert(id, Rect::new(x, y, w, h));
    }

    pub fn handle_header_report(&mut self, id: i32, rel_x: f32, rel_y: f32, w: f32, h: f32) {
        self.header_rects.insert(id, Rect::new(rel_x, rel_y, w, h));
    }

    pub fn handle_item_report(
        &mut self,
        node_id: i32,
        item_id: &str,
        rel_x: f32,
        rel_y: f32,
        w: f32,
        h: f32,
    ) {
        self.item_rects
            .insert(LinkKey::new(node_id, item_id), Rect::new(rel_x, rel_y, w, h));
    }

    pub fn handle_scroll_report(&mut self, node_id: i32, top: f32, left: f32) {
        self.scroll.insert(node_id, ScrollOffset { top, left });
    }

    /// Forget where a block was measured, after the layout moved it.
    ///
    /// Header and item rects are block-relative and stay; they resolve again
    /// once the block reports its new rect.
    pub fn invalidate_block(&mut self, id: i32) {
        self.block_rects.remove(&id);
    }

    /// Drop everything measured for blocks the predicate rejects.
    ///
    /// Called after collapses so removed blocks stop producing anchors.
    pub fn retain_blocks(&mut self, keep: impl Fn(i32) -> bool) {
        self.block_rects.retain(|id, _| keep(*id));
        self.header_rects.retain(|id, _| keep(*id));
        self.item_rects.retain(|key, _| keep(key.parent));
        self.scroll.retain(|id, _| keep(*id));
    }

    pub fn clear(&mut self) {
        self.block_rects.clear();
        self.header_rects.clear();
        self.item_rects.clear();
        self.scroll.clear();
    }
}

impl GeometryProvider for GeometryCache {
    fn block_rect(&self, node_id: i32) -> Option<Rect> {
        self.block_rects.get(&node_id).copied()
    }

    fn header_rect(&self, node_id: i32) -> Option<Rect> {
        let block = self.block_rects.get(&node_id)?;
        let rel = self.header_rects.get(&node_id)?;
        Some(Rect::new(block.x + rel.x, block.y + rel.y, rel.w, rel.h))
    }

    fn item_rect(&self, key: &LinkKey) -> Option<Rect> {
        let block = self.block_rects.get(&key.parent)?;
        let rel = self.item_rects.get(key)?;
        let scroll = self.scroll.get(&key.parent).copied().unwrap_or_default();
        Some(Rect::new(
            block.x + rel.x - scroll.left,
            block.y + rel.y - scroll.top,
            rel.w,
            rel.h,
        ))
    }
}

/// Geometry derived from the last layout pass.
///
/// Item rows sit below a header band of `header_height`, one `row_height`
/// apart, spanning the block width. No header rect is reported.
pub struct ModelGeometry<'a> {
    store: &'a TreeStore,
    config: &'a LayoutConfig,
}

impl<'a> ModelGeometry<'a> {
    pub fn new(store: &'a TreeStore, config: &'a LayoutConfig) -> Self {
        Self { store, config }
    }
}

impl GeometryProvider for ModelGeometry<'_> {
    fn block_rect(&self, node_id: i32) -> Option<Rect> {
        self.store.node(node_id).map(|node| node.layout)
    }

    fn header_rect(&self, _node_id: i32) -> Option<Rect> {
        None
    }

    fn item_rect(&self, key: &LinkKey) -> Option<Rect> {
        let node = self.store.node(key.parent)?;
        let row = node.items.iter().position(|item| item.id == key.item)?;
        let rect = node.layout;
        let y = rect.y + self.config.header_height + row as f32 * self.config.row_height
            - node.scroll_top;
        Some(Rect::new(
            rect.x - node.scroll_left,
            y,
            rect.w,
            self.config.row_height,
        ))
    }
}

/// Measured geometry where available, another provider for the rest.
///
/// Blocks the UI has not reported yet (first frame after an expand) still get
/// anchors from the layout.
pub struct LayeredGeometry<'a> {
    measured: &'a dyn GeometryProvider,
    fallback: &'a dyn GeometryProvider,
}

impl<'a> LayeredGeometry<'a> {
    pub fn new(measured: &'a dyn GeometryProvider, fallback: &'a dyn GeometryProvider) -> Self {
        Self { measured, fallback }
    }
}

impl GeometryProvider for LayeredGeometry<'_> {
    fn block_rect(&self, node_id: i32) -> Option<Rect> {
        self.measured
            .block_rect(node_id)
            .or_else(|| self.fallback.block_rect(node_id))
    }

    fn header_rect(&self, node_id: i32) -> Option<Rect> {
        self.measured
            .header_rect(node_id)
            .or_else(|| self.fallback.header_rect(node_id))
    }

    fn item_rect(&self, key: &LinkKey) -> Option<Rect> {
        self.measured
            .item_rect(key)
            .or_else(|| self.fallback.item_rect(key))
    }
}
