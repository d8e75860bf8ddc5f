//! The single owned state of one mind map view.
//!
//! [`MindMapSession`] holds the loaded run, the filtered timeline, the tree
//! store and the drag controller. Every handler mutates it synchronously and
//! leaves the layout up to date; hosts redraw from [`MindMapSession::view`].
//! Data fetching goes through a [`DataSource`] passed per call.

use crate::builders::BuildContext;
use crate::config::MindMapConfig;
use crate::drag::DragController;
use crate::error::DataFetchError;
use crate::frame::FrameScheduler;
use crate::geometry::{Point, Size};
use crate::layout::{layout_tree, BoardSize};
use crate::links::{route_all, Connector};
use crate::model::{HlapiContext, NodeDetail, RunGraph, RunMeta, RunSummary, TraceEvent};
use crate::source::{DataSource, TimelineFilter};
use crate::state::{GeometryProvider, ModelGeometry};
use crate::store::TreeStore;
use crate::timeline::Timeline;
use crate::view::{block_views, hint_line, stats_line, BlockView, DetailPanel};
use std::rc::Rc;

/// Everything content builders read.
#[derive(Debug, Default)]
struct Inputs {
    selected_path: String,
    context: HlapiContext,
    timeline: Timeline,
    graph: RunGraph,
}

impl Inputs {
    fn ctx<'a>(&'a self, config: &'a MindMapConfig) -> BuildContext<'a> {
        BuildContext {
            selected_path: &self.selected_path,
            path: self.context.find(&self.selected_path),
            timeline: &self.timeline,
            graph: &self.graph,
            config: &config.builder,
        }
    }
}

/// What a pending detail fetch is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailTarget {
    Event(String),
    Node(String),
}

/// Ticket of one detail fetch. Only the most recent ticket may update the
/// detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub generation: u64,
    pub run_id: String,
    pub target: DetailTarget,
}

/// Render-ready snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub board: BoardSize,
    pub blocks: Vec<BlockView>,
    pub hint: String,
    pub stats: String,
    pub detail: DetailPanel,
}

pub struct MindMapSession {
    config: MindMapConfig,
    runs: Vec<RunSummary>,
    run: Option<RunMeta>,
    filter: TimelineFilter,
    inputs: Inputs,
    store: TreeStore,
    board: BoardSize,
    drag: DragController,
    scheduler: Rc<dyn FrameScheduler>,
    detail: DetailPanel,
    detail_generation: u64,
}

impl MindMapSession {
    pub fn new(config: MindMapConfig, scheduler: Rc<dyn FrameScheduler>) -> Self {
        let board = BoardSize {
            width: config.layout.min_board_width,
            height: config.layout.min_board_height,
        };
        Self {
            config,
            runs: Vec::new(),
            run: None,
            filter: TimelineFilter::default(),
            inputs: Inputs::default(),
            store: TreeStore::new(),
            board,
            drag: DragController::new(),
            scheduler,
            detail: DetailPanel::no_event(),
            detail_generation: 0,
        }
    }

    // === Accessors ===

    pub fn config(&self) -> &MindMapConfig {
        &self.config
    }

    pub fn runs(&self) -> &[RunSummary] {
        &self.runs
    }

    pub fn run(&self) -> Option<&RunMeta> {
        self.run.as_ref()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run.as_ref().map(|run| run.run_id.as_str())
    }

    pub fn filter(&self) -> &TimelineFilter {
        &self.filter
    }

    pub fn selected_path(&self) -> &str {
        &self.inputs.selected_path
    }

    pub fn context(&self) -> &HlapiContext {
        &self.inputs.context
    }

    pub fn paths(&self) -> Vec<&str> {
        self.inputs
            .context
            .path_contexts
            .iter()
            .map(|context| context.path.as_str())
            .collect()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.inputs.timeline
    }

    pub fn graph(&self) -> &RunGraph {
        &self.inputs.graph
    }

    pub fn store(&self) -> &TreeStore {
        &self.store
    }

    pub fn board(&self) -> BoardSize {
        self.board
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn detail(&self) -> &DetailPanel {
        &self.detail
    }

    // === Loading ===

    /// Fetch the run list and path contexts, then load the first run.
    pub fn bootstrap(&mut self, source: &dyn DataSource) -> Result<(), DataFetchError> {
        self.runs = source.list_runs()?;
        self.inputs.context = source.hlapi_context()?;
        if self.inputs.selected_path.is_empty() {
            if let Some(first) = self.inputs.context.path_contexts.first() {
                self.inputs.selected_path = first.path.clone();
            }
        }
        match self.runs.first().map(|run| run.run_id.clone()) {
            Some(run_id) => self.load_run(source, &run_id),
            None => {
                self.init_tree();
                Ok(())
            }
        }
    }

    /// Load a run: metadata, path choice, graph, timeline, fresh tree.
    ///
    /// The path becomes the run's default path when the context knows it;
    /// otherwise a still-valid current path is kept, else the first path.
    pub fn load_run(&mut self, source: &dyn DataSource, run_id: &str) -> Result<(), DataFetchError> {
        let run = source.run(run_id)?;
        let graph = source.graph(run_id)?;
        let events = source.timeline(run_id, &self.filter)?;

        self.stop_drag();
        let context = &self.inputs.context;
        if context.contains(&run.default_path) {
            self.inputs.selected_path = run.default_path.clone();
        } else if !context.contains(&self.inputs.selected_path) {
            self.inputs.selected_path = context
                .path_contexts
                .first()
                .map(|first| first.path.clone())
                .unwrap_or_default();
        }

        let mut timeline = Timeline::new(events);
        timeline.set_active(0);
        self.inputs.graph = graph;
        self.inputs.timeline = timeline;
        self.run = Some(run);
        tracing::info!(
            run_id,
            path = %self.inputs.selected_path,
            events = self.inputs.timeline.len(),
            "Run loaded"
        );
        self.init_tree();
        self.refresh_event_detail(source)
    }

    /// Re-query the timeline with `filter`, keeping the active event when it
    /// survives. The call-flow chain is rebuilt for the new backbone.
    pub fn apply_filter(
        &mut self,
        source: &dyn DataSource,
        filter: TimelineFilter,
    ) -> Result<(), DataFetchError> {
        self.filter = filter;
        self.fetch_timeline(source)?;
        self.store.rebuild_runtime_flow(&self.inputs.ctx(&self.config));
        self.relayout();
        self.refresh_event_detail(source)
    }

    fn fetch_timeline(&mut self, source: &dyn DataSource) -> Result<(), DataFetchError> {
        let Some(run_id) = self.run_id().map(str::to_owned) else {
            return Ok(());
        };
        let active_id = self
            .inputs
            .timeline
            .selected()
            .map(|event| event.id.clone());
        let mut timeline = Timeline::new(source.timeline(&run_id, &self.filter)?);
        let index = active_id
            .and_then(|id| timeline.position_of(&id))
            .unwrap_or(0);
        timeline.set_active(index);
        self.inputs.timeline = timeline;
        Ok(())
    }

    /// Switch the selected path and rebuild the tree. Unknown paths are
    /// ignored.
    pub fn select_path(&mut self, path: &str) -> bool {
        if !self.inputs.context.contains(path) {
            tracing::debug!(path, "Ignoring unknown path");
            return false;
        }
        self.stop_drag();
        self.inputs.selected_path = path.to_owned();
        tracing::info!(path, "Path selected");
        self.init_tree();
        true
    }

    fn init_tree(&mut self) {
        self.store.create_root(&self.inputs.ctx(&self.config));
        self.relayout();
    }

    // === Playback ===

    /// Make `index` the active event (clamped) and refresh the call-flow
    /// block in place. Returns the new index.
    pub fn set_active(&mut self, index: usize) -> usize {
        let index = self.inputs.timeline.set_active(index);
        self.store.refresh_runtime_flow(&self.inputs.ctx(&self.config));
        self.relayout();
        index
    }

    /// Advance to the next event, wrapping to the first.
    pub fn step_next(&mut self) -> Option<usize> {
        let next = self.inputs.timeline.next_index()?;
        Some(self.set_active(next))
    }

    /// Go back to the previous event, wrapping to the last.
    pub fn step_prev(&mut self) -> Option<usize> {
        let prev = self.inputs.timeline.prev_index()?;
        Some(self.set_active(prev))
    }

    /// [`set_active`](Self::set_active) followed by an event detail refresh.
    pub fn select_event(
        &mut self,
        source: &dyn DataSource,
        index: usize,
    ) -> Result<usize, DataFetchError> {
        let index = self.set_active(index);
        self.refresh_event_detail(source)?;
        Ok(index)
    }

    // === Structure ===

    pub fn toggle_item(&mut self, parent_id: i32, item_id: &str) -> bool {
        let changed = self
            .store
            .toggle(parent_id, item_id, &self.inputs.ctx(&self.config));
        if changed {
            self.relayout();
        }
        changed
    }

    pub fn collapse_block(&mut self, node_id: i32) -> bool {
        let changed = self.store.collapse(node_id);
        if changed {
            self.relayout();
        }
        changed
    }

    pub fn set_scroll(&mut self, node_id: i32, top: f32, left: f32) -> bool {
        self.store.set_scroll(node_id, top, left)
    }

    /// Recompute every block position and the board size.
    pub fn relayout(&mut self) -> BoardSize {
        self.board = layout_tree(&mut self.store, &self.config.layout);
        self.board
    }

    // === Drag ===

    /// Start dragging `node_id` from `pointer` (board coordinates).
    pub fn start_drag(&mut self, node_id: i32, pointer: Point, measured: Option<Size>) -> bool {
        let Some(node) = self.store.node(node_id) else {
            return false;
        };
        if let Some(stale) = self.drag.start(node, pointer, measured) {
            self.scheduler.cancel_frame(stale);
        }
        true
    }

    /// Record a pointer move. When no frame is pending, `on_frame` is
    /// scheduled; it should call [`apply_drag_frame`](Self::apply_drag_frame).
    pub fn queue_drag(&mut self, pointer: Point, on_frame: impl FnOnce() + 'static) -> bool {
        if !self.drag.queue_move(pointer) {
            return false;
        }
        let token = self.scheduler.request_frame(Box::new(on_frame));
        self.drag.frame_requested(token);
        true
    }

    /// Frame body: move the dragged block and relayout. Returns whether the
    /// block moved.
    pub fn apply_drag_frame(&mut self) -> bool {
        let moved = self
            .drag
            .apply_frame(&mut self.store, self.board, &self.config.drag)
            .is_some();
        if moved {
            self.relayout();
        }
        moved
    }

    /// End the gesture and cancel its pending frame.
    pub fn stop_drag(&mut self) {
        if let Some(token) = self.drag.stop() {
            self.scheduler.cancel_frame(token);
        }
    }

    // === Detail panel ===

    fn next_request(&mut self, target: DetailTarget) -> Option<DetailRequest> {
        let run_id = self.run_id()?.to_owned();
        self.detail_generation += 1;
        Some(DetailRequest {
            generation: self.detail_generation,
            run_id,
            target,
        })
    }

    fn is_current(&self, request: &DetailRequest) -> bool {
        if request.generation != self.detail_generation {
            tracing::warn!(
                generation = request.generation,
                latest = self.detail_generation,
                "Discarding stale detail result"
            );
            return false;
        }
        true
    }

    /// Ticket for the active event's detail. Without an active event the
    /// panel shows the no-event placeholder and `None` is returned.
    pub fn begin_event_detail(&mut self) -> Option<DetailRequest> {
        let event_id = self.inputs.timeline.selected().map(|event| event.id.clone());
        let request = event_id.and_then(|id| self.next_request(DetailTarget::Event(id)));
        if request.is_none() {
            self.detail = DetailPanel::no_event();
        }
        request
    }

    /// Apply a fetched event detail. Returns `Ok(false)` for a stale ticket.
    /// A missing record falls back to the timeline's copy of the event.
    pub fn complete_event_detail(
        &mut self,
        request: &DetailRequest,
        result: Result<Option<TraceEvent>, DataFetchError>,
    ) -> Result<bool, DataFetchError> {
        if !self.is_current(request) {
            return Ok(false);
        }
        let DetailTarget::Event(event_id) = &request.target else {
            return Ok(false);
        };
        let fetched = match result {
            Ok(fetched) => fetched,
            Err(err) => {
                self.detail = DetailPanel::error(err.to_string());
                return Err(err);
            }
        };
        let timeline = &self.inputs.timeline;
        let Some(event) = fetched.or_else(|| {
            timeline
                .events()
                .iter()
                .find(|event| &event.id == event_id)
                .cloned()
        }) else {
            self.detail = DetailPanel::no_event();
            return Ok(true);
        };
        let run_status = self
            .runs
            .iter()
            .find(|run| Some(run.run_id.as_str()) == self.run_id())
            .map_or("unknown", |run| run.status.as_str());
        self.detail = DetailPanel::event(
            &event,
            timeline,
            self.run.as_ref(),
            run_status,
            &self.inputs.graph,
        );
        Ok(true)
    }

    pub fn refresh_event_detail(&mut self, source: &dyn DataSource) -> Result<(), DataFetchError> {
        let Some(request) = self.begin_event_detail() else {
            return Ok(());
        };
        let DetailTarget::Event(event_id) = &request.target else {
            return Ok(());
        };
        let result = source.event_detail(&request.run_id, event_id);
        self.complete_event_detail(&request, result).map(|_| ())
    }

    /// Ticket for a flow node drill-down.
    pub fn begin_node_detail(&mut self, node_id: &str) -> Option<DetailRequest> {
        self.next_request(DetailTarget::Node(node_id.to_owned()))
    }

    /// Apply a fetched node detail. Unknown nodes leave the panel unchanged.
    pub fn complete_node_detail(
        &mut self,
        request: &DetailRequest,
        result: Result<Option<NodeDetail>, DataFetchError>,
    ) -> Result<bool, DataFetchError> {
        if !self.is_current(request) {
            return Ok(false);
        }
        match result {
            Ok(Some(detail)) => {
                self.detail = DetailPanel::node(&detail, &self.inputs.timeline);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => {
                self.detail = DetailPanel::error(err.to_string());
                Err(err)
            }
        }
    }

    pub fn show_node_detail(
        &mut self,
        source: &dyn DataSource,
        node_id: &str,
    ) -> Result<bool, DataFetchError> {
        let Some(request) = self.begin_node_detail(node_id) else {
            return Ok(false);
        };
        let result = source.node_detail(&request.run_id, node_id);
        self.complete_node_detail(&request, result)
    }

    // === Rendering ===

    /// Connectors anchored on `geometry`.
    pub fn route_connectors(&self, geometry: &dyn GeometryProvider) -> Vec<Connector> {
        route_all(&self.store, geometry, &self.config.route)
    }

    /// Geometry derived from the current layout, for hosts without
    /// measurements.
    pub fn model_geometry(&self) -> ModelGeometry<'_> {
        ModelGeometry::new(&self.store, &self.config.layout)
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            board: self.board,
            blocks: block_views(&self.store, &self.inputs.timeline),
            hint: hint_line(&self.inputs.selected_path, &self.inputs.timeline),
            stats: stats_line(&self.inputs.timeline),
            detail: self.detail.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ManualFrameScheduler;
    use crate::model::{PathContext, ROOT_ID, RUNTIME_FLOW_ITEM};
    use crate::source::BundleDataSource;

    fn source() -> BundleDataSource {
        let runs = r#"{"runs": [
            {"run_id": "r1", "target_id": "t1", "status": "pass"},
            {"run_id": "r2", "target_id": "t1", "status": "fail"}
        ]}"#;
        let context = r#"{"path_contexts": [
            {"path": "Device.A", "siblings": ["Foo"]},
            {"path": "Device.B"}
        ]}"#;
        let bundle = r#"{
            "run": {"run_id": "r1", "target_id": "t1", "summary": "s", "default_path": "Device.B"},
            "nodes": [{"id": "a", "label": "Alpha", "type": "fn"}],
            "edges": [],
            "events": [
                {"id": "E1", "phase": "probe", "tool": "gdb", "flow": ["a", "b"], "status": "ok"},
                {"id": "E2", "phase": "patch", "tool": "gdb", "flow": ["b", "c"], "status": "warn"}
            ]
        }"#;
        let mut source = BundleDataSource::from_json_strs(runs, context).unwrap();
        source.insert_bundle_json("r1", bundle).unwrap();
        let other = r#"{
            "run": {"run_id": "r2", "target_id": "t1", "default_path": "Device.A"},
            "events": [{"id": "E7", "phase": "verify", "tool": "objdump", "flow": ["z"]}]
        }"#;
        source.insert_bundle_json("r2", other).unwrap();
        source
    }

    /// Delegates to the fixture but fails one query.
    struct BrokenSource {
        inner: BundleDataSource,
        broken: &'static str,
    }

    impl BrokenSource {
        fn check(&self, query: &str) -> Result<(), DataFetchError> {
            if self.broken == query {
                return Err(DataFetchError::Unavailable(format!("{query} offline")));
            }
            Ok(())
        }
    }

    impl DataSource for BrokenSource {
        fn list_runs(&self) -> Result<Vec<RunSummary>, DataFetchError> {
            self.inner.list_runs()
        }

        fn run(&self, run_id: &str) -> Result<RunMeta, DataFetchError> {
            self.check("run")?;
            self.inner.run(run_id)
        }

        fn graph(&self, run_id: &str) -> Result<RunGraph, DataFetchError> {
            self.check("graph")?;
            self.inner.graph(run_id)
        }

        fn timeline(
            &self,
            run_id: &str,
            filter: &TimelineFilter,
        ) -> Result<Vec<TraceEvent>, DataFetchError> {
            self.check("timeline")?;
            self.inner.timeline(run_id, filter)
        }

        fn event_detail(
            &self,
            run_id: &str,
            event_id: &str,
        ) -> Result<Option<TraceEvent>, DataFetchError> {
            self.inner.event_detail(run_id, event_id)
        }

        fn node_detail(
            &self,
            run_id: &str,
            node_id: &str,
        ) -> Result<Option<NodeDetail>, DataFetchError> {
            self.inner.node_detail(run_id, node_id)
        }

        fn hlapi_context(&self) -> Result<HlapiContext, DataFetchError> {
            self.inner.hlapi_context()
        }
    }

    fn session() -> MindMapSession {
        MindMapSession::new(MindMapConfig::default(), Rc::new(ManualFrameScheduler::new()))
    }

    // ========================================================================
    // Loading
    // ========================================================================

    #[test]
    fn test_bootstrap_prefers_run_default_path() {
        let mut session = session();
        session.bootstrap(&source()).unwrap();
        assert_eq!(session.selected_path(), "Device.B");
        assert_eq!(session.run_id(), Some("r1"));
        assert_eq!(session.timeline().len(), 2);
        assert_eq!(session.store().root().unwrap().title, "Device.B");
        assert_eq!(session.view().stats, "2 events");
        assert_eq!(session.detail().field("Event"), Some("Step 1 (E1)"));
    }

    #[test]
    fn test_load_unknown_run_propagates() {
        let mut session = session();
        session.bootstrap(&source()).unwrap();
        let err = session.load_run(&source(), "r9").unwrap_err();
        assert!(matches!(err, DataFetchError::RunNotFound(_)));
    }

    #[test]
    fn test_select_path_rebuilds_tree() {
        let mut session = session();
        session.bootstrap(&source()).unwrap();
        assert!(session.select_path("Device.A"));
        assert!(session.toggle_item(ROOT_ID, "sibling:Foo"));
        assert!(!session.select_path("Device.Z"));
        assert!(session.store().is_expanded(ROOT_ID, "sibling:Foo"));
        assert!(session.select_path("Device.A"));
        assert!(!session.store().is_expanded(ROOT_ID, "sibling:Foo"));
        assert!(session.store().is_expanded(ROOT_ID, RUNTIME_FLOW_ITEM));
    }

    #[test]
    fn test_failed_load_leaves_session_unchanged() {
        for broken in ["graph", "timeline"] {
            let mut session = session();
            session.bootstrap(&source()).unwrap();
            let len = session.store().len();

            let failing = BrokenSource {
                inner: source(),
                broken,
            };
            let err = session.load_run(&failing, "r2").unwrap_err();
            assert!(matches!(err, DataFetchError::Unavailable(_)), "{broken}");

            assert_eq!(session.run_id(), Some("r1"));
            assert_eq!(session.selected_path(), "Device.B");
            assert_eq!(session.timeline().len(), 2);
            assert_eq!(session.timeline().selected().unwrap().id, "E1");
            assert_eq!(session.store().root().unwrap().title, "Device.B");
            assert_eq!(session.store().len(), len);
        }
    }

    #[test]
    fn test_load_switches_everything_together() {
        let mut session = session();
        let source = source();
        session.bootstrap(&source).unwrap();
        session.load_run(&source, "r2").unwrap();
        assert_eq!(session.run_id(), Some("r2"));
        assert_eq!(session.selected_path(), "Device.A");
        assert_eq!(session.timeline().selected().unwrap().id, "E7");
        assert_eq!(session.store().root().unwrap().title, "Device.A");
    }

    // ========================================================================
    // Playback and filters
    // ========================================================================

    #[test]
    fn test_stepping_wraps() {
        let mut session = session();
        session.bootstrap(&source()).unwrap();
        assert_eq!(session.step_prev(), Some(1));
        assert_eq!(session.step_next(), Some(0));
        assert_eq!(session.set_active(10), 1);
        assert!(session.view().hint.ends_with("/ patch / from Step 1 (E1)"));
    }

    #[test]
    fn test_filter_keeps_active_event() {
        let mut session = session();
        let source = source();
        session.bootstrap(&source).unwrap();
        session.select_event(&source, 1).unwrap();
        let filter = TimelineFilter {
            phase: "patch".into(),
            ..Default::default()
        };
        session.apply_filter(&source, filter).unwrap();
        assert_eq!(session.timeline().len(), 1);
        assert_eq!(session.timeline().selected().unwrap().id, "E2");
        assert_eq!(session.detail().field("Event"), Some("Step 1 (E2)"));
    }

    // ========================================================================
    // Detail guard
    // ========================================================================

    #[test]
    fn test_stale_detail_is_discarded() {
        let mut session = session();
        let source = source();
        session.bootstrap(&source).unwrap();

        let first = session.begin_event_detail().unwrap();
        session.set_active(1);
        let second = session.begin_event_detail().unwrap();

        let newer = source.event_detail("r1", "E2");
        assert!(session.complete_event_detail(&second, newer).unwrap());
        let older = source.event_detail("r1", "E1");
        assert!(!session.complete_event_detail(&first, older).unwrap());
        assert_eq!(session.detail().field("Event"), Some("Step 2 (E2)"));
    }

    #[test]
    fn test_node_detail() {
        let mut session = session();
        let source = source();
        session.bootstrap(&source).unwrap();
        assert!(session.show_node_detail(&source, "a").unwrap());
        assert_eq!(session.detail().field("Label"), Some("Alpha"));
        assert!(!session.show_node_detail(&source, "zz").unwrap());
        assert_eq!(session.detail().field("Label"), Some("Alpha"));
    }

    #[test]
    fn test_fetch_error_shows_indicator() {
        let mut session = session();
        session.bootstrap(&source()).unwrap();
        let request = session.begin_event_detail().unwrap();
        let err = session
            .complete_event_detail(&request, Err(DataFetchError::Unavailable("down".into())))
            .unwrap_err();
        assert!(matches!(err, DataFetchError::Unavailable(_)));
        assert_eq!(session.detail().badges[0].text, "ERROR");
    }

    // ========================================================================
    // Without data
    // ========================================================================

    #[test]
    fn test_empty_session() {
        let mut session = session();
        let empty = BundleDataSource::new(
            Vec::new(),
            HlapiContext {
                path_contexts: vec![PathContext {
                    path: "Device.A".into(),
                    ..Default::default()
                }],
            },
        );
        session.bootstrap(&empty).unwrap();
        assert!(session.begin_event_detail().is_none());
        let generation = session.detail_generation;
        assert!(session.begin_node_detail("a").is_none());
        assert_eq!(session.detail_generation, generation);
        assert_eq!(session.detail().badges[0].text, "NO EVENT");
        assert_eq!(session.view().hint, "HLAPI: Device.A / no active event");
        assert!(session.store().root().is_some());
    }
}
