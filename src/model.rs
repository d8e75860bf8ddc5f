//! Diagram data model and the shapes consumed from the trace data source.
//!
//! The diagram side ([`Node`], [`Item`], [`ItemKind`], [`LinkKey`]) is owned
//! exclusively by the [`TreeStore`](crate::store::TreeStore). The data-source
//! side ([`TraceEvent`], [`RunGraph`], [`PathContext`], ...) is read-only input
//! deserialized with `serde`.

use crate::geometry::{Point, Rect};
use serde::Deserialize;
use std::fmt;
use std::rc::Rc;

/// Identifier of the single root block.
pub const ROOT_ID: i32 = 0;

/// Item id of the root's protected call-flow row.
pub const RUNTIME_FLOW_ITEM: &str = "runtime-flow";

// ============================================================================
// Diagram model
// ============================================================================

/// What expanding an item produces. Each variant carries its own payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    /// Another parameter at the same level as the selected path.
    Sibling { name: String },
    /// The ODL mapping of the selected path.
    OdlEntry,
    /// A source function outline, either the mapped one or a sibling function.
    SourceFn { function: String },
    /// The statement lines of one loop inside an outline.
    Loop { lines: Vec<String> },
    /// Call-flow summary of the active event.
    RuntimeFlow,
    /// One position of the backbone; expanding advances to `index + 1`.
    FlowStep { backbone: Rc<[String]>, index: usize },
}

impl ItemKind {
    /// Short tag, mostly for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            ItemKind::Sibling { .. } => "sibling",
            ItemKind::OdlEntry => "odl_entry",
            ItemKind::SourceFn { .. } => "source_fn",
            ItemKind::Loop { .. } => "loop",
            ItemKind::RuntimeFlow => "runtime_flow",
            ItemKind::FlowStep { .. } => "flow_step",
        }
    }
}

/// One row inside a block. Ids are unique within the owning block only.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub label: String,
    /// `None` for plain text rows.
    pub kind: Option<ItemKind>,
}

impl Item {
    pub fn text(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: None,
        }
    }

    pub fn expandable(id: impl Into<String>, label: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: Some(kind),
        }
    }

    pub fn is_expandable(&self) -> bool {
        self.kind.is_some()
    }
}

/// Block flavour. Drives styling and whether a collapse control is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Sibling,
    Odl,
    Source,
    Loop,
    Runtime,
    FlowStep,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Sibling => "sibling",
            NodeKind::Odl => "odl",
            NodeKind::Source => "source",
            NodeKind::Loop => "loop",
            NodeKind::Runtime => "runtime",
            NodeKind::FlowStep => "flow-step",
        }
    }

    /// Root and runtime blocks cannot be closed from their header.
    pub fn shows_collapse_control(&self) -> bool {
        !matches!(self, NodeKind::Root | NodeKind::Runtime)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backbone position shown by a flow-step block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStepTag {
    pub flow_node_id: String,
    pub step_index: usize,
}

/// A rendered panel ("block").
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i32,
    pub title: String,
    pub items: Vec<Item>,
    pub parent_id: Option<i32>,
    pub depth: usize,
    pub kind: NodeKind,
    /// Set by dragging; opts the block out of automatic placement.
    pub manual_pos: Option<Point>,
    pub scroll_top: f32,
    pub scroll_left: f32,
    /// Position and size from the most recent layout pass.
    pub layout: Rect,
    pub flow_step: Option<FlowStepTag>,
}

impl Node {
    pub fn new(
        id: i32,
        title: impl Into<String>,
        items: Vec<Item>,
        parent_id: Option<i32>,
        depth: usize,
        kind: NodeKind,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            items,
            parent_id,
            depth,
            kind,
            manual_pos: None,
            scroll_top: 0.0,
            scroll_left: 0.0,
            layout: Rect::default(),
            flow_step: None,
        }
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Block content produced by a content builder; the store assigns identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    pub title: String,
    pub items: Vec<Item>,
    pub kind: NodeKind,
    pub flow_step: Option<FlowStepTag>,
}

impl NodeDraft {
    pub fn new(title: impl Into<String>, items: Vec<Item>, kind: NodeKind) -> Self {
        Self {
            title: title.into(),
            items,
            kind,
            flow_step: None,
        }
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

/// Composite key of an expandable item: owning block plus item id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    pub parent: i32,
    pub item: String,
}

impl LinkKey {
    pub fn new(parent: i32, item: impl Into<String>) -> Self {
        Self {
            parent,
            item: item.into(),
        }
    }

    /// The root's call-flow link, which is never collapsed.
    pub fn runtime_flow() -> Self {
        Self::new(ROOT_ID, RUNTIME_FLOW_ITEM)
    }

    pub fn is_protected(&self) -> bool {
        self.parent == ROOT_ID && self.item == RUNTIME_FLOW_ITEM
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.parent, self.item)
    }
}

// ============================================================================
// Data-source shapes
// ============================================================================

/// Entry of the run list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunSummary {
    pub run_id: String,
    pub target_id: String,
    pub status: String,
}

/// Run metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunMeta {
    pub run_id: String,
    pub target_id: String,
    pub summary: String,
    pub default_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
}

/// Node/edge graph of a run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<(String, String)>,
}

impl RunGraph {
    /// Display label of a flow node, falling back to its id.
    pub fn label<'a>(&'a self, node_id: &'a str) -> &'a str {
        self.nodes
            .iter()
            .find(|node| node.id == node_id)
            .map(|node| node.label.as_str())
            .unwrap_or(node_id)
    }

    /// Labels of `node_ids` joined with arrows, or `(none)`.
    pub fn label_list(&self, node_ids: &[String]) -> String {
        if node_ids.is_empty() {
            return "(none)".to_owned();
        }
        node_ids
            .iter()
            .map(|id| self.label(id))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// One recorded trace event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TraceEvent {
    pub id: String,
    pub time: String,
    pub phase: String,
    pub tool: String,
    pub title: String,
    pub symbol: String,
    pub address: String,
    pub evidence: Vec<String>,
    /// Ordered flow node ids the event passed through.
    pub flow: Vec<String>,
    pub status: String,
    pub consensus: String,
}

/// Graph node plus every event whose flow includes it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeDetail {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(rename = "relatedEvents")]
    pub related_events: Vec<TraceEvent>,
}

/// A line reference that may be recorded as a number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LineRef {
    Number(u64),
    Text(String),
}

impl fmt::Display for LineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRef::Number(n) => write!(f, "{n}"),
            LineRef::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlineKind {
    Loop,
    #[default]
    #[serde(other)]
    Statement,
}

/// One entry of a source outline.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutlineEntry {
    pub kind: OutlineKind,
    pub text: String,
    /// Statement lines of a loop body.
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceMapping {
    pub source_function: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiblingFunction {
    pub name: String,
    pub outline: Vec<OutlineEntry>,
}

/// Everything known about one HLAPI path.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathContext {
    pub path: String,
    pub siblings: Vec<String>,
    pub odl_file: Option<String>,
    pub odl_entry_line: Option<LineRef>,
    pub odl_line: Option<LineRef>,
    pub odl_stats_line: Option<LineRef>,
    pub entry_function: Option<String>,
    pub object_scope: Option<String>,
    pub source_mapping: Option<SourceMapping>,
    pub source_outline: Vec<OutlineEntry>,
    pub sibling_functions: Vec<SiblingFunction>,
}

impl PathContext {
    /// The mapped source function, if any.
    pub fn source_function(&self) -> Option<&str> {
        self.source_mapping
            .as_ref()
            .and_then(|mapping| mapping.source_function.as_deref())
            .filter(|name| !name.is_empty())
    }

    pub fn entry_function(&self) -> Option<&str> {
        self.entry_function.as_deref().filter(|name| !name.is_empty())
    }

    pub fn odl_file(&self) -> Option<&str> {
        self.odl_file.as_deref().filter(|file| !file.is_empty())
    }

    /// Object scope, falling back to the entry function.
    pub fn scope(&self) -> &str {
        self.object_scope
            .as_deref()
            .filter(|scope| !scope.is_empty())
            .or_else(|| self.entry_function())
            .unwrap_or("-")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HlapiContext {
    pub path_contexts: Vec<PathContext>,
}

impl HlapiContext {
    pub fn find(&self, path: &str) -> Option<&PathContext> {
        self.path_contexts.iter().find(|context| context.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        !path.is_empty() && self.find(path).is_some()
    }
}

/// Last segment of a slash-separated path, or `-` when empty.
pub fn basename(path: &str) -> &str {
    if path.is_empty() {
        return "-";
    }
    match path.rsplit('/').next() {
        Some(last) if !last.is_empty() => last,
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_key_protection() {
        assert!(LinkKey::runtime_flow().is_protected());
        assert!(!LinkKey::new(3, RUNTIME_FLOW_ITEM).is_protected());
        assert!(!LinkKey::new(ROOT_ID, "sibling:Foo").is_protected());
    }

    #[test]
    fn test_collapse_control_visibility() {
        assert!(!NodeKind::Root.shows_collapse_control());
        assert!(!NodeKind::Runtime.shows_collapse_control());
        assert!(NodeKind::FlowStep.shows_collapse_control());
        assert!(NodeKind::Source.shows_collapse_control());
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("a/b/c.odl"), "c.odl");
        assert_eq!(basename("c.odl"), "c.odl");
        assert_eq!(basename(""), "-");
        assert_eq!(basename("dir/"), "dir/");
    }

    #[test]
    fn test_graph_label_falls_back_to_id() {
        let graph = RunGraph {
            nodes: vec![GraphNode {
                id: "a".into(),
                label: "Alpha".into(),
                node_type: "fn".into(),
            }],
            edges: vec![],
        };
        assert_eq!(graph.label("a"), "Alpha");
        assert_eq!(graph.label("zz"), "zz");
    }

    #[test]
    fn test_path_context_deserializes_mixed_line_refs() {
        let json = r#"{
            "path": "Device.WiFi.Radio",
            "siblings": ["Enable", "Channel"],
            "odl_file": "odl/wifi.odl",
            "odl_entry_line": 42,
            "odl_stats_line": "L120",
            "source_outline": [
                {"kind": "statement", "text": "init()"},
                {"kind": "loop", "text": "for radio", "children": ["probe()"]},
                {"kind": "branch", "text": "if x"}
            ]
        }"#;
        let context: PathContext = serde_json::from_str(json).unwrap();
        assert_eq!(context.odl_entry_line, Some(LineRef::Number(42)));
        assert_eq!(context.odl_stats_line.as_ref().unwrap().to_string(), "L120");
        assert_eq!(context.source_outline[1].kind, OutlineKind::Loop);
        assert_eq!(context.source_outline[2].kind, OutlineKind::Statement);
        assert_eq!(context.scope(), "-");
    }

    #[test]
    fn test_event_deserializes_with_missing_fields() {
        let event: TraceEvent = serde_json::from_str(r#"{"id": "e1", "flow": ["a", "b"]}"#).unwrap();
        assert_eq!(event.id, "e1");
        assert_eq!(event.flow, vec!["a", "b"]);
        assert!(event.evidence.is_empty());
    }
}
