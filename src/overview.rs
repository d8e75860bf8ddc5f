//! Layered overview of a run's node/edge graph.
//!
//! The mind map shows one call chain at a time; the overview places every
//! node of [`RunGraph`] in Sugiyama layers via the `rust-sugiyama` crate.
//!
//! Coordinates are `f64` because `rust-sugiyama` works in `f64`. Convert with
//! `as f32` before handing positions to Slint.
//!
//! Requires the `layout` feature.

use std::collections::{BTreeSet, HashMap};

use crate::model::RunGraph;

/// Layer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum Direction {
    /// Callers on the left, callees on the right (default).
    #[default]
    LeftToRight,
    TopToBottom,
}

/// A positioned flow node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePosition {
    /// Flow node id from the run graph.
    pub id: String,
    pub label: String,
    /// Top-left corner.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct SugiyamaConfig {
    /// Minimum spacing between vertices; 0 keeps the `rust-sugiyama` default.
    pub vertex_spacing: f64,
    /// Minimum edge length in layers; 0 keeps the `rust-sugiyama` default.
    pub minimum_length: u32,
    pub dummy_vertices: bool,
    pub direction: Direction,
    pub char_width: f64,
    pub min_node_width: f64,
    pub node_height: f64,
}

impl Default for SugiyamaConfig {
    fn default() -> Self {
        Self {
            vertex_spacing: 0.0,
            minimum_length: 0,
            dummy_vertices: false,
            direction: Direction::LeftToRight,
            char_width: 7.0,
            min_node_width: 80.0,
            node_height: 32.0,
        }
    }
}

impl SugiyamaConfig {
    /// Box size of a node showing `label`.
    pub fn node_size(&self, label: &str) -> (f64, f64) {
        let width = (label.chars().count() as f64 * self.char_width + 24.0).max(self.min_node_width);
        (width.round(), self.node_height)
    }
}

/// Lay out every node of `graph`.
///
/// Nodes only named by edges are included with their id as label. Self
/// loops and repeated edges are dropped. Returns one position per distinct
/// node, in first-seen order of layout output.
pub fn graph_overview(graph: &RunGraph, config: &SugiyamaConfig) -> Vec<NodePosition> {
    let mut ids: Vec<&str> = Vec::new();
    let mut index: HashMap<&str, u32> = HashMap::new();
    let endpoints = graph
        .edges
        .iter()
        .flat_map(|(src, dst)| [src.as_str(), dst.as_str()]);
    for id in graph.nodes.iter().map(|node| node.id.as_str()).chain(endpoints) {
        if let std::collections::hash_map::Entry::Vacant(e) = index.entry(id) {
            e.insert(ids.len() as u32);
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Vec::new();
    }

    let horizontal = config.direction == Direction::LeftToRight;
    let sizes: Vec<(f64, f64)> = ids
        .iter()
        .map(|id| config.node_size(graph.label(id)))
        .collect();

    // Layers run along y in rust-sugiyama; swap for left-to-right.
    let vertices: Vec<(u32, (f64, f64))> = sizes
        .iter()
        .enumerate()
        .map(|(i, &(w, h))| (i as u32, if horizontal { (h, w) } else { (w, h) }))
        .collect();

    let edges: Vec<(u32, u32)> = graph
        .edges
        .iter()
        .filter_map(|(src, dst)| {
            let src = *index.get(src.as_str())?;
            let dst = *index.get(dst.as_str())?;
            (src != dst).then_some((src, dst))
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut sg_config = rust_sugiyama::configure::Config {
        dummy_vertices: config.dummy_vertices,
        ..Default::default()
    };
    if config.vertex_spacing > 0.0 {
        sg_config.vertex_spacing = config.vertex_spacing;
    }
    if config.minimum_length > 0 {
        sg_config.minimum_length = config.minimum_length;
    }

    let subgraphs = rust_sugiyama::from_vertices_and_edges(&vertices, &edges, &sg_config);
    tracing::debug!(
        nodes = ids.len(),
        edges = edges.len(),
        components = subgraphs.len(),
        "Graph overview laid out"
    );

    let mut results = Vec::with_capacity(ids.len());
    for (layout, _width, _height) in &subgraphs {
        for &(idx, (x, y)) in layout {
            let (Some(id), Some(&(width, height))) = (ids.get(idx), sizes.get(idx)) else {
                continue;
            };
            let (x, y) = if horizontal { (y, x) } else { (x, y) };
            results.push(NodePosition {
                id: id.to_string(),
                label: graph.label(id).to_string(),
                x,
                y,
                width,
                height,
            });
        }
    }
    results
}
