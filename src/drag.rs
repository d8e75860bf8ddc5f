//! Drag-to-reposition for mind map blocks.
//!
//! `Idle -> Dragging -> Idle`. Pointer moves only record the latest pointer;
//! the position is recomputed once per frame. A frame clamps the candidate to
//! the board, then probes downward for a free slot, wrapping to the next band
//! to the right when it runs off the bottom. When no slot is found the frame
//! changes nothing.

use crate::config::DragConfig;
use crate::frame::{FrameCoalescer, FrameToken};
use crate::geometry::{clamp, rects_overlap, Point, Rect, Size};
use crate::layout::BoardSize;
use crate::model::Node;
use crate::store::TreeStore;

/// Ephemeral state of one pointer-down-to-up gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct DragSession {
    pub node_id: i32,
    /// Pointer position relative to the block's top-left at drag start.
    pub offset: Point,
    /// On-screen size of the block at drag start.
    pub size: Size,
    /// Last position written back to the store.
    pub last: Point,
}

#[derive(Debug, Default)]
pub struct DragController {
    session: Option<DragSession>,
    frame: FrameCoalescer<Point>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn node_id(&self) -> Option<i32> {
        self.session.as_ref().map(|s| s.node_id)
    }

    /// Enter `Dragging` for `node`.
    ///
    /// `measured` is the rendered size; the layout size is used when it is
    /// missing or empty. Any previous gesture is replaced and its pending frame
    /// token returned for cancellation.
    pub fn start(
        &mut self,
        node: &Node,
        pointer: Point,
        measured: Option<Size>,
    ) -> Option<FrameToken> {
        let stale = self.frame.cancel();
        let size = match measured {
            Some(size) if size.w > 0.0 && size.h > 0.0 => Size {
                w: size.w.round(),
                h: size.h.round(),
            },
            _ => Size {
                w: node.layout.w.round(),
                h: node.layout.h.round(),
            },
        };
        self.session = Some(DragSession {
            node_id: node.id,
            offset: Point::new(pointer.x - node.layout.x, pointer.y - node.layout.y),
            size,
            last: Point::new(node.layout.x, node.layout.y),
        });
        tracing::debug!(node_id = node.id, "Drag started");
        stale
    }

    /// Record a pointer move. Returns `true` when the caller must request a
    /// frame; `false` when idle or a frame is already pending.
    pub fn queue_move(&mut self, pointer: Point) -> bool {
        if self.session.is_none() {
            return false;
        }
        self.frame.push(pointer)
    }

    pub fn frame_requested(&mut self, token: FrameToken) {
        self.frame.set_pending(token);
    }

    pub fn has_pending_frame(&self) -> bool {
        self.frame.is_pending()
    }

    /// Frame callback body. Writes the resolved position as the node's manual
    /// position and returns it, or returns `None` when nothing changed.
    pub fn apply_frame(
        &mut self,
        store: &mut TreeStore,
        board: BoardSize,
        config: &DragConfig,
    ) -> Option<Point> {
        let pointer = self.frame.take()?;
        let session = self.session.as_mut()?;
        if !store.contains(session.node_id) {
            return None;
        }

        let size = session.size;
        let max_x = (board.width - size.w - config.edge_inset).max(0.0);
        let max_y = (board.height - size.h - config.edge_inset).max(0.0);
        let candidate = Point::new(
            clamp((pointer.x - session.offset.x).round(), 0.0, max_x),
            clamp((pointer.y - session.offset.y).round(), 0.0, max_y),
        );

        let Some(position) = resolve_non_overlap_position(
            store,
            session.node_id,
            candidate,
            size,
            Point::new(max_x, max_y),
            config,
        ) else {
            tracing::warn!(node_id = session.node_id, "No free slot for dragged block; frame dropped");
            return None;
        };

        store.set_manual_pos(session.node_id, position);
        session.last = position;
        Some(position)
    }

    /// Back to `Idle`. Returns the pending frame token the caller must cancel.
    pub fn stop(&mut self) -> Option<FrameToken> {
        let session = self.session.take()?;
        tracing::debug!(node_id = session.node_id, "Drag stopped");
        self.frame.cancel()
    }
}

fn overlaps_others(
    store: &TreeStore,
    node_id: i32,
    probe: &Rect,
    gap: f32,
) -> bool {
    store
        .nodes()
        .filter(|other| other.id != node_id)
        .any(|other| rects_overlap(probe, &other.layout, gap))
}

/// Nearest free slot for a block of `size` starting at `candidate`.
///
/// Probes downward by `step_y`; past `max.y` it wraps to the top and shifts
/// right by `step_x`. Returns `None` after `attempts` probes.
pub fn resolve_non_overlap_position(
    store: &TreeStore,
    node_id: i32,
    candidate: Point,
    size: Size,
    max: Point,
    config: &DragConfig,
) -> Option<Point> {
    let mut x = clamp(candidate.x, 0.0, max.x);
    let mut y = clamp(candidate.y, 0.0, max.y);
    let gap = config.overlap_gap;

    if !overlaps_others(store, node_id, &Rect::new(x, y, size.w, size.h), gap) {
        return Some(Point::new(x, y));
    }

    for _ in 0..config.attempts {
        y += config.step_y;
        if y > max.y {
            y = 0.0;
            x = clamp(x + config.step_x, 0.0, max.x);
        }
        if !overlaps_others(store, node_id, &Rect::new(x, y, size.w, size.h), gap) {
            return Some(Point::new(x, y));
        }
    }
    None
}
