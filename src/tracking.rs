//! Ready-made Slint callbacks that feed a [`GeometryCache`].
//!
//! ```ignore
//! let tracker = GeometryTracker::new();
//! window.on_block_rect_changed(tracker.block_rect_callback());
//! window.on_header_rect_changed(tracker.header_rect_callback());
//! window.on_item_rect_changed(tracker.item_rect_callback());
//! window.on_block_scrolled(tracker.scroll_callback());
//! ```

use crate::state::GeometryCache;
use slint::SharedString;
use std::cell::RefCell;
use std::rc::Rc;

type ChangeHook = Rc<RefCell<Option<Rc<dyn Fn()>>>>;

/// Shares one [`GeometryCache`] between UI callbacks and the connector router.
#[derive(Clone, Default)]
pub struct GeometryTracker {
    cache: Rc<RefCell<GeometryCache>>,
    on_change: ChangeHook,
}

impl GeometryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing cache.
    pub fn with_cache(cache: Rc<RefCell<GeometryCache>>) -> Self {
        Self {
            cache,
            on_change: ChangeHook::default(),
        }
    }

    pub fn cache(&self) -> Rc<RefCell<GeometryCache>> {
        self.cache.clone()
    }

    /// Called after every report, once the cache is updated.
    pub fn on_change(&self, hook: impl Fn() + 'static) {
        *self.on_change.borrow_mut() = Some(Rc::new(hook));
    }

    fn notify(hook: &ChangeHook) {
        let hook = hook.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    // === Callback factories ===

    /// `(node_id, x, y, width, height)` in board coordinates.
    pub fn block_rect_callback(&self) -> impl Fn(i32, f32, f32, f32, f32) + Clone {
        let cache = self.cache.clone();
        let hook = self.on_change.clone();
        move |id, x, y, width, height| {
            cache
                .borrow_mut()
                .handle_block_rect_report(id, x, y, width, height);
            Self::notify(&hook);
        }
    }

    /// `(node_id, rel_x, rel_y, width, height)` relative to the block.
    pub fn header_rect_callback(&self) -> impl Fn(i32, f32, f32, f32, f32) + Clone {
        let cache = self.cache.clone();
        let hook = self.on_change.clone();
        move |id, rel_x, rel_y, width, height| {
            cache
                .borrow_mut()
                .handle_header_report(id, rel_x, rel_y, width, height);
            Self::notify(&hook);
        }
    }

    /// `(node_id, item_id, rel_x, rel_y, width, height)` relative to the
    /// unscrolled item list origin of the block.
    pub fn item_rect_callback(
        &self,
    ) -> impl Fn(i32, SharedString, f32, f32, f32, f32) + Clone {
        let cache = self.cache.clone();
        let hook = self.on_change.clone();
        move |node_id, item_id, rel_x, rel_y, width, height| {
            cache
                .borrow_mut()
                .handle_item_report(node_id, item_id.as_str(), rel_x, rel_y, width, height);
            Self::notify(&hook);
        }
    }

    /// `(node_id, scroll_top, scroll_left)`.
    pub fn scroll_callback(&self) -> impl Fn(i32, f32, f32) + Clone {
        let cache = self.cache.clone();
        let hook = self.on_change.clone();
        move |node_id, top, left| {
            cache.borrow_mut().handle_scroll_report(node_id, top, left);
            Self::notify(&hook);
        }
    }
}
