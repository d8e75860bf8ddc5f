//! Edge routing for the mind map.
//!
//! Every active link (parent item -> child block) becomes one [`Connector`]:
//! an output anchor on the item row, an input anchor on the child block and a
//! cubic curve between them. [`ConnectorSet`] recomputes the whole set on each
//! redraw and can push the result into a Slint `VecModel`:
//!
//! ```ignore
//! let mut connectors = ConnectorSet::new(config.route.clone());
//! let model = Rc::new(VecModel::<ConnectorPath>::default());
//! connectors.bind_model(model.clone(), |c, style| ConnectorPath {
//!     child_id: c.child,
//!     path_commands: c.path_commands.as_str().into(),
//!     stroke: style.stroke,
//!     stroke_width: style.stroke_width,
//!     ..Default::default()
//! });
//! window.set_connectors(ModelRc::from(model));
//!
//! connectors.update(&store, &*tracker.cache().borrow());
//! ```

use crate::config::RouteConfig;
use crate::geometry::Point;
use crate::model::LinkKey;
use crate::path::CubicBezier;
use crate::state::GeometryProvider;
use crate::store::TreeStore;
use slint::{Color, Model, VecModel};
use std::rc::Rc;

/// Stroke and endpoint marker styling shared by all connectors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectorStyle {
    pub stroke: Color,
    pub stroke_width: f32,
    pub marker: Color,
    pub marker_radius: f32,
}

impl ConnectorStyle {
    pub fn from_config(config: &RouteConfig) -> Self {
        Self {
            stroke: Color::from_rgb_u8(0x4a, 0x69, 0x89),
            stroke_width: config.stroke_width,
            marker: Color::from_rgb_u8(0x6c, 0xa7, 0xda),
            marker_radius: config.marker_radius,
        }
    }
}

/// One routed link. Markers are drawn at `start` and `end`.
#[derive(Clone, Debug, PartialEq)]
pub struct Connector {
    pub link: LinkKey,
    pub child: i32,
    pub start: Point,
    pub end: Point,
    pub curve: CubicBezier,
    pub path_commands: String,
}

/// Output anchor: right edge of the item row, vertically centred.
pub fn output_anchor(geometry: &dyn GeometryProvider, key: &LinkKey) -> Option<Point> {
    let rect = geometry.item_rect(key)?;
    Some(Point::new(rect.right(), rect.center_y()))
}

/// Input anchor: left edge of the block at its header's vertical centre.
///
/// Without a measured header the anchor sits `header_fallback` below the block
/// top, or half way down blocks shorter than twice that.
pub fn input_anchor(
    geometry: &dyn GeometryProvider,
    node_id: i32,
    config: &RouteConfig,
) -> Option<Point> {
    let block = geometry.block_rect(node_id)?;
    let y = match geometry.header_rect(node_id) {
        Some(header) => header.center_y(),
        None => block.y + config.header_fallback.min(block.h / 2.0),
    };
    Some(Point::new(block.x, y))
}

/// Route every link in the store. Links with a missing anchor are skipped.
pub fn route_all(
    store: &TreeStore,
    geometry: &dyn GeometryProvider,
    config: &RouteConfig,
) -> Vec<Connector> {
    store
        .links()
        .into_iter()
        .filter_map(|(key, child)| {
            let start = output_anchor(geometry, key)?;
            let end = input_anchor(geometry, child, config)?;
            let curve = CubicBezier::route(start, end, config);
            Some(Connector {
                link: key.clone(),
                child,
                start,
                end,
                path_commands: curve.to_path_commands(),
                curve,
            })
        })
        .collect()
}

trait ModelSyncer {
    fn sync(&self, connectors: &[Connector], style: &ConnectorStyle);
}

struct ConcreteModelSyncer<P, F> {
    model: Rc<VecModel<P>>,
    constructor: F,
}

impl<P, F> ModelSyncer for ConcreteModelSyncer<P, F>
where
    P: Clone + 'static,
    F: Fn(&Connector, &ConnectorStyle) -> P,
{
    fn sync(&self, connectors: &[Connector], style: &ConnectorStyle) {
        for (i, connector) in connectors.iter().enumerate() {
            let item = (self.constructor)(connector, style);
            if i < self.model.row_count() {
                self.model.set_row_data(i, item);
            } else {
                self.model.push(item);
            }
        }
        while self.model.row_count() > connectors.len() {
            self.model.remove(self.model.row_count() - 1);
        }
    }
}

/// The routed connectors of the current tree.
///
/// [`update`](Self::update) replaces the whole set; there is no incremental
/// patching. A bound model is re-synced after each update.
pub struct ConnectorSet {
    connectors: Vec<Connector>,
    config: RouteConfig,
    style: ConnectorStyle,
    syncer: Option<Box<dyn ModelSyncer>>,
}

impl ConnectorSet {
    pub fn new(config: RouteConfig) -> Self {
        Self {
            style: ConnectorStyle::from_config(&config),
            connectors: Vec::new(),
            config,
            syncer: None,
        }
    }

    /// Sync every future update into `model`, building rows with `constructor`.
    pub fn bind_model<P, F>(&mut self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(&Connector, &ConnectorStyle) -> P + 'static,
    {
        self.syncer = Some(Box::new(ConcreteModelSyncer { model, constructor }));
    }

    pub fn update(&mut self, store: &TreeStore, geometry: &dyn GeometryProvider) {
        self.connectors = route_all(store, geometry, &self.config);
        tracing::debug!(count = self.connectors.len(), "Connectors routed");
        if let Some(syncer) = &self.syncer {
            syncer.sync(&self.connectors, &self.style);
        }
    }

    pub fn clear(&mut self) {
        self.connectors.clear();
        if let Some(syncer) = &self.syncer {
            syncer.sync(&self.connectors, &self.style);
        }
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn style(&self) -> &ConnectorStyle {
        &self.style
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Connector leading into `child`.
    pub fn find(&self, child: i32) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.child == child)
    }
}
