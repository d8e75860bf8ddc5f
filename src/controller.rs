//! Slint bridge for the mind map.
//!
//! [`MindMapController`] owns the session, the geometry tracker and the
//! connector set, and hands out callbacks to wire into a window:
//!
//! ```ignore
//! slint::include_modules!();
//!
//! let window = MainWindow::new()?;
//! let ctrl = MindMapController::new(MindMapConfig::default(), Rc::new(source));
//!
//! let blocks = Rc::new(VecModel::<BlockData>::default());
//! ctrl.bind_blocks(blocks.clone(), |block| BlockData::from_view(block));
//! let connectors = Rc::new(VecModel::<ConnectorPath>::default());
//! ctrl.bind_connectors(connectors.clone(), |c, style| ConnectorPath::new(c, style));
//! window.set_blocks(ModelRc::from(blocks));
//! window.set_connectors(ModelRc::from(connectors));
//!
//! let tracker = ctrl.tracker();
//! window.on_block_rect_changed(tracker.block_rect_callback());
//! window.on_item_rect_changed(tracker.item_rect_callback());
//! window.on_item_clicked(ctrl.item_clicked_callback());
//! window.on_collapse_clicked(ctrl.collapse_clicked_callback());
//! window.on_block_pointer_down(ctrl.block_pointer_down_callback());
//! window.on_pointer_moved(ctrl.pointer_moved_callback());
//! window.on_pointer_released(ctrl.pointer_released_callback());
//!
//! let w = window.as_weak();
//! ctrl.on_redraw(move |view| {
//!     if let Some(w) = w.upgrade() {
//!         w.set_hint(view.hint.as_str().into());
//!     }
//! });
//! ctrl.bootstrap()?;
//! window.run()?;
//! ```

use crate::config::MindMapConfig;
use crate::error::DataFetchError;
use crate::frame::{FrameScheduler, FrameToken, SlintFrameScheduler};
use crate::geometry::{Point, Rect, Size};
use crate::links::{Connector, ConnectorSet, ConnectorStyle};
use crate::session::{MindMapSession, ViewState};
use crate::source::{DataSource, TimelineFilter};
use crate::state::{GeometryCache, LayeredGeometry};
use crate::tracking::GeometryTracker;
use crate::view::BlockView;
use slint::{Model, SharedString, VecModel};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

trait BlockSyncer {
    fn sync(&self, blocks: &[BlockView]);
}

struct ConcreteBlockSyncer<P, F> {
    model: Rc<VecModel<P>>,
    constructor: F,
}

impl<P, F> BlockSyncer for ConcreteBlockSyncer<P, F>
where
    P: Clone + 'static,
    F: Fn(&BlockView) -> P,
{
    fn sync(&self, blocks: &[BlockView]) {
        for (i, block) in blocks.iter().enumerate() {
            let row = (self.constructor)(block);
            if i < self.model.row_count() {
                self.model.set_row_data(i, row);
            } else {
                self.model.push(row);
            }
        }
        while self.model.row_count() > blocks.len() {
            self.model.remove(self.model.row_count() - 1);
        }
    }
}

type RedrawFn = Box<dyn Fn(&ViewState)>;

/// Route connectors against measured geometry, layout for the rest.
///
/// `placed` remembers each block's layout rect from the previous pass. A block
/// the layout moved since then drops its measured rect until the UI reports
/// the new one.
fn route_connectors(
    session: &MindMapSession,
    cache: &RefCell<GeometryCache>,
    placed: &RefCell<HashMap<i32, Rect>>,
    connectors: &RefCell<ConnectorSet>,
) {
    let store = session.store();
    let mut cache = cache.borrow_mut();
    cache.retain_blocks(|id| store.contains(id));
    {
        let mut placed = placed.borrow_mut();
        placed.retain(|id, _| store.contains(*id));
        for node in store.nodes() {
            let moved = placed
                .insert(node.id, node.layout)
                .is_some_and(|old| old.x != node.layout.x || old.y != node.layout.y);
            if moved {
                cache.invalidate_block(node.id);
            }
        }
    }

    let model = session.model_geometry();
    let geometry = LayeredGeometry::new(&*cache, &model);
    connectors.borrow_mut().update(store, &geometry);
}

/// Parts a deferred frame needs besides the session.
#[derive(Clone)]
struct Renderer {
    tracker: GeometryTracker,
    connectors: Rc<RefCell<ConnectorSet>>,
    placed: Rc<RefCell<HashMap<i32, Rect>>>,
    blocks: Rc<RefCell<Option<Box<dyn BlockSyncer>>>>,
    redraw: Rc<RefCell<Option<RedrawFn>>>,
}

impl Renderer {
    fn render(&self, session: &RefCell<MindMapSession>) {
        let view = {
            let session = session.borrow();
            route_connectors(
                &session,
                &self.tracker.cache(),
                &self.placed,
                &self.connectors,
            );
            session.view()
        };
        if let Some(blocks) = self.blocks.borrow().as_ref() {
            blocks.sync(&view.blocks);
        }
        if let Some(redraw) = self.redraw.borrow().as_ref() {
            redraw(&view);
        }
    }

    /// Geometry reports schedule one re-route per frame.
    ///
    /// The hook lives inside the tracker, so it only holds weak handles.
    fn reroute_on_reports(
        &self,
        session: &Rc<RefCell<MindMapSession>>,
        scheduler: Rc<dyn FrameScheduler>,
    ) {
        let session = Rc::downgrade(session);
        let cache = Rc::downgrade(&self.tracker.cache());
        let placed = Rc::downgrade(&self.placed);
        let connectors = Rc::downgrade(&self.connectors);
        let pending: Rc<Cell<Option<FrameToken>>> = Rc::default();

        self.tracker.on_change(move || {
            if pending.get().is_some() {
                return;
            }
            let (session, cache, placed, connectors) =
                (session.clone(), cache.clone(), placed.clone(), connectors.clone());
            let done = pending.clone();
            let token = scheduler.request_frame(Box::new(move || {
                done.set(None);
                let (Some(session), Some(cache), Some(placed), Some(connectors)) = (
                    session.upgrade(),
                    cache.upgrade(),
                    placed.upgrade(),
                    connectors.upgrade(),
                ) else {
                    return;
                };
                let Ok(session) = session.try_borrow() else {
                    tracing::debug!("Session busy, skipping connector re-route");
                    return;
                };
                route_connectors(&session, &cache, &placed, &connectors);
            }));
            pending.set(Some(token));
        });
    }
}

/// Controller sharing one mind map session across UI callbacks.
///
/// Clone it freely; clones share state.
#[derive(Clone)]
pub struct MindMapController {
    session: Rc<RefCell<MindMapSession>>,
    source: Rc<dyn DataSource>,
    renderer: Renderer,
}

impl MindMapController {
    /// Controller whose drag frames run on [`slint::Timer`]s.
    pub fn new(config: MindMapConfig, source: Rc<dyn DataSource>) -> Self {
        let scheduler = Rc::new(SlintFrameScheduler::new(config.drag.frame_interval()));
        Self::with_scheduler(config, source, scheduler)
    }

    pub fn with_scheduler(
        config: MindMapConfig,
        source: Rc<dyn DataSource>,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Self {
        let connectors = ConnectorSet::new(config.route.clone());
        let session = Rc::new(RefCell::new(MindMapSession::new(config, scheduler.clone())));
        let renderer = Renderer {
            tracker: GeometryTracker::new(),
            connectors: Rc::new(RefCell::new(connectors)),
            placed: Rc::default(),
            blocks: Rc::new(RefCell::new(None)),
            redraw: Rc::new(RefCell::new(None)),
        };
        renderer.reroute_on_reports(&session, scheduler);
        Self {
            session,
            source,
            renderer,
        }
    }

    pub fn session(&self) -> Rc<RefCell<MindMapSession>> {
        self.session.clone()
    }

    pub fn tracker(&self) -> GeometryTracker {
        self.renderer.tracker.clone()
    }

    pub fn cache(&self) -> Rc<RefCell<GeometryCache>> {
        self.renderer.tracker.cache()
    }

    /// Connectors from the last redraw or geometry-driven re-route.
    pub fn connectors(&self) -> Vec<Connector> {
        self.renderer.connectors.borrow().connectors().to_vec()
    }

    pub fn bind_connectors<P, F>(&self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(&Connector, &ConnectorStyle) -> P + 'static,
    {
        self.renderer
            .connectors
            .borrow_mut()
            .bind_model(model, constructor);
    }

    pub fn bind_blocks<P, F>(&self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(&BlockView) -> P + 'static,
    {
        *self.renderer.blocks.borrow_mut() =
            Some(Box::new(ConcreteBlockSyncer { model, constructor }));
    }

    /// Called with the fresh view after every state change.
    pub fn on_redraw(&self, redraw: impl Fn(&ViewState) + 'static) {
        *self.renderer.redraw.borrow_mut() = Some(Box::new(redraw));
    }

    pub fn redraw(&self) {
        self.renderer.render(&self.session);
    }

    // === Direct handlers ===

    pub fn bootstrap(&self) -> Result<(), DataFetchError> {
        let result = self.session.borrow_mut().bootstrap(self.source.as_ref());
        self.redraw();
        result
    }

    pub fn load_run(&self, run_id: &str) -> Result<(), DataFetchError> {
        let result = self
            .session
            .borrow_mut()
            .load_run(self.source.as_ref(), run_id);
        self.redraw();
        result
    }

    pub fn select_path(&self, path: &str) -> bool {
        let changed = self.session.borrow_mut().select_path(path);
        if changed {
            self.redraw();
        }
        changed
    }

    pub fn apply_filter(&self, filter: TimelineFilter) -> Result<(), DataFetchError> {
        let result = self
            .session
            .borrow_mut()
            .apply_filter(self.source.as_ref(), filter);
        self.redraw();
        result
    }

    pub fn select_event(&self, index: usize) -> Result<usize, DataFetchError> {
        let result = self
            .session
            .borrow_mut()
            .select_event(self.source.as_ref(), index);
        self.redraw();
        result
    }

    /// Playback tick: advance with wrap-around.
    pub fn step_next(&self) -> Result<(), DataFetchError> {
        let next = self.session.borrow().timeline().next_index();
        match next {
            Some(index) => self.select_event(index).map(|_| ()),
            None => Ok(()),
        }
    }

    pub fn step_prev(&self) -> Result<(), DataFetchError> {
        let prev = self.session.borrow().timeline().prev_index();
        match prev {
            Some(index) => self.select_event(index).map(|_| ()),
            None => Ok(()),
        }
    }

    pub fn toggle_item(&self, parent_id: i32, item_id: &str) -> bool {
        let changed = self.session.borrow_mut().toggle_item(parent_id, item_id);
        if changed {
            self.redraw();
        }
        changed
    }

    pub fn collapse_block(&self, node_id: i32) -> bool {
        let changed = self.session.borrow_mut().collapse_block(node_id);
        if changed {
            self.redraw();
        }
        changed
    }

    pub fn show_node_detail(&self, flow_node_id: &str) -> Result<bool, DataFetchError> {
        let result = self
            .session
            .borrow_mut()
            .show_node_detail(self.source.as_ref(), flow_node_id);
        self.redraw();
        result
    }

    /// A block's item list scrolled: keep the offset and re-anchor connectors.
    pub fn handle_scroll(&self, node_id: i32, top: f32, left: f32) {
        self.renderer
            .tracker
            .cache()
            .borrow_mut()
            .handle_scroll_report(node_id, top, left);
        self.session.borrow_mut().set_scroll(node_id, top, left);
        self.redraw();
    }

    /// Pointer went down on a block body. `width`/`height` are its rendered
    /// size, or zero when unknown.
    pub fn drag_start(&self, node_id: i32, x: f32, y: f32, width: f32, height: f32) -> bool {
        let measured = (width > 0.0 && height > 0.0).then_some(Size { w: width, h: height });
        self.session
            .borrow_mut()
            .start_drag(node_id, Point::new(x, y), measured)
    }

    /// Pointer moved. At most one frame is scheduled until it runs.
    pub fn drag_move(&self, x: f32, y: f32) {
        let weak: Weak<RefCell<MindMapSession>> = Rc::downgrade(&self.session);
        let renderer = self.renderer.clone();
        self.session
            .borrow_mut()
            .queue_drag(Point::new(x, y), move || {
                let Some(session) = weak.upgrade() else {
                    return;
                };
                let moved = session.borrow_mut().apply_drag_frame();
                if moved {
                    renderer.render(&session);
                }
            });
    }

    pub fn drag_end(&self) {
        self.session.borrow_mut().stop_drag();
        self.redraw();
    }

    // === Callback factories ===

    /// `(parent_id, item_id)`: expand or collapse an item.
    pub fn item_clicked_callback(&self) -> impl Fn(i32, SharedString) + Clone {
        let ctrl = self.clone();
        move |parent_id, item_id| {
            ctrl.toggle_item(parent_id, item_id.as_str());
        }
    }

    /// `(node_id)`: header collapse button.
    pub fn collapse_clicked_callback(&self) -> impl Fn(i32) + Clone {
        let ctrl = self.clone();
        move |node_id| {
            ctrl.collapse_block(node_id);
        }
    }

    /// `(index)`: timeline row clicked.
    pub fn event_selected_callback(&self) -> impl Fn(i32) + Clone {
        let ctrl = self.clone();
        move |index| {
            let index = usize::try_from(index).unwrap_or(0);
            if let Err(err) = ctrl.select_event(index) {
                tracing::warn!(%err, "Event detail fetch failed");
            }
        }
    }

    /// `(flow_node_id)`: drill into a flow node.
    pub fn node_selected_callback(&self) -> impl Fn(SharedString) + Clone {
        let ctrl = self.clone();
        move |node_id| {
            if let Err(err) = ctrl.show_node_detail(node_id.as_str()) {
                tracing::warn!(%err, "Node detail fetch failed");
            }
        }
    }

    /// `(path)`: path selector changed.
    pub fn path_selected_callback(&self) -> impl Fn(SharedString) + Clone {
        let ctrl = self.clone();
        move |path| {
            ctrl.select_path(path.as_str());
        }
    }

    /// `(run_id)`: run selector changed.
    pub fn run_selected_callback(&self) -> impl Fn(SharedString) + Clone {
        let ctrl = self.clone();
        move |run_id| {
            if let Err(err) = ctrl.load_run(run_id.as_str()) {
                tracing::warn!(%err, "Run load failed");
            }
        }
    }

    /// `(phase, tool, keyword)`: filter applied.
    pub fn filter_applied_callback(
        &self,
    ) -> impl Fn(SharedString, SharedString, SharedString) + Clone {
        let ctrl = self.clone();
        move |phase, tool, keyword| {
            let filter = TimelineFilter {
                phase: phase.to_string(),
                tool: tool.to_string(),
                keyword: keyword.to_string(),
            };
            if let Err(err) = ctrl.apply_filter(filter) {
                tracing::warn!(%err, "Timeline refresh failed");
            }
        }
    }

    /// `(node_id, scroll_top, scroll_left)`.
    pub fn block_scrolled_callback(&self) -> impl Fn(i32, f32, f32) + Clone {
        let ctrl = self.clone();
        move |node_id, top, left| ctrl.handle_scroll(node_id, top, left)
    }

    /// `(node_id, x, y, width, height)`: pointer down on a block body.
    pub fn block_pointer_down_callback(&self) -> impl Fn(i32, f32, f32, f32, f32) + Clone {
        let ctrl = self.clone();
        move |node_id, x, y, width, height| {
            ctrl.drag_start(node_id, x, y, width, height);
        }
    }

    /// `(x, y)` in board coordinates.
    pub fn pointer_moved_callback(&self) -> impl Fn(f32, f32) + Clone {
        let ctrl = self.clone();
        move |x, y| ctrl.drag_move(x, y)
    }

    pub fn pointer_released_callback(&self) -> impl Fn() + Clone {
        let ctrl = self.clone();
        move || ctrl.drag_end()
    }
}
