//! # Trace Mind Map
//!
//! An expandable mind-map diagram engine for exploring recorded debug trace
//! runs, with Slint bindings.
//!
//! A run is a timeline of trace events, each carrying the call chain it went
//! through. The map starts from a single root block describing the selected
//! HLAPI path; expanding an item opens a child block to its right, linked by
//! a curved connector from the item row to the child's header. A dedicated
//! call-flow block follows playback and marks every step of the chain as
//! added, removed or kept relative to the previous event.
//!
//! ## Features
//!
//! - **Tree store** - Blocks keyed by parent item, with subtree collapse
//! - **Content builders** - Root, function, ODL and call-flow blocks
//! - **Depth-column layout** - Deterministic placement with overlap pushing
//! - **Connector routing** - Cubic curves between measured anchors
//! - **Frame-coalesced dragging** - Non-overlapping snap inside the board
//! - **Stale-result guard** - Only the newest detail fetch reaches the panel
//!
//! ## Rust Helpers
//!
//! - [`MindMapSession`] - All state of one view, driven by plain handlers
//! - [`MindMapController`] - Slint callback factories around a session
//! - [`GeometryTracker`] - Collects measured block and item rects
//! - [`ConnectorSet`] - Syncs routed connectors into a `VecModel`
//! - [`BundleDataSource`] - In-memory [`DataSource`] over JSON bundles
//! - [`diff_flow`], [`backbone`] - Call-chain comparison

pub mod builders;
pub mod config;
pub mod controller;
pub mod drag;
pub mod error;
pub mod flow;
pub mod frame;
pub mod geometry;
pub mod layout;
pub mod links;
pub mod model;
#[cfg(feature = "layout")]
pub mod overview;
pub mod path;
pub mod session;
pub mod source;
pub mod state;
pub mod store;
pub mod timeline;
pub mod tracking;
pub mod view;

pub use builders::{build_child, build_root, runtime_flow_label, BuildContext};
pub use config::{BuilderConfig, DragConfig, LayoutConfig, MindMapConfig, RouteConfig};
pub use controller::MindMapController;
pub use drag::{resolve_non_overlap_position, DragController, DragSession};
pub use error::{ConfigError, DataFetchError};
pub use flow::{backbone, diff_flow, FlowDiff, FlowFocus, FlowStatus};
pub use frame::{FrameCoalescer, FrameScheduler, FrameToken, ManualFrameScheduler, SlintFrameScheduler};
pub use geometry::{estimate_node_size, rects_overlap, Point, Rect, Size};
pub use layout::{layout_tree, BoardSize};
pub use links::{input_anchor, output_anchor, route_all, Connector, ConnectorSet, ConnectorStyle};
pub use model::{
    HlapiContext, Item, ItemKind, LinkKey, Node, NodeDetail, NodeKind, PathContext, RunGraph,
    RunMeta, RunSummary, TraceEvent, ROOT_ID, RUNTIME_FLOW_ITEM,
};
#[cfg(feature = "layout")]
pub use overview::{graph_overview, NodePosition, SugiyamaConfig};
pub use path::{generate_connector_path, CubicBezier};
pub use session::{DetailRequest, DetailTarget, MindMapSession, ViewState};
pub use source::{BundleDataSource, DataSource, RunBundle, TimelineFilter, FILTER_ALL};
pub use state::{GeometryCache, GeometryProvider, LayeredGeometry, ModelGeometry, ScrollOffset};
pub use store::TreeStore;
pub use timeline::Timeline;
pub use tracking::GeometryTracker;
pub use view::{BlockView, DetailPanel, ItemView};
