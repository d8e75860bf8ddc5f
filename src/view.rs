//! Pure view state derived from the tree store and timeline.
//!
//! Nothing here mutates the diagram. Hosts render these structs however they
//! like; the Slint bridge converts them into model rows.

use crate::flow::FlowStatus;
use crate::geometry::Rect;
use crate::model::{ItemKind, NodeDetail, NodeKind, RunGraph, RunMeta, TraceEvent};
use crate::store::TreeStore;
use crate::timeline::Timeline;
use slint::Color;

pub const EXPANDED_GLYPH: char = '▾';
pub const COLLAPSED_GLYPH: char = '▸';

/// One row of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub node_id: i32,
    pub item_id: String,
    /// Display text; expandable rows carry the expand glyph.
    pub text: String,
    pub expandable: bool,
    pub expanded: bool,
    /// The root's call-flow row while an event is active.
    pub flow_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockView {
    pub id: i32,
    pub title: String,
    pub kind: NodeKind,
    pub rect: Rect,
    pub collapsible: bool,
    pub flow_node_id: Option<String>,
    pub flow_status: Option<FlowStatus>,
    pub scroll_top: f32,
    pub scroll_left: f32,
    pub items: Vec<ItemView>,
}

/// Blocks in creation order, using each node's last layout.
pub fn block_views(store: &TreeStore, timeline: &Timeline) -> Vec<BlockView> {
    let focus = timeline.focus();
    let has_event = timeline.selected().is_some();
    store
        .nodes()
        .map(|node| {
            let items = node
                .items
                .iter()
                .map(|item| {
                    let expanded = item.is_expandable() && store.is_expanded(node.id, &item.id);
                    let text = if item.is_expandable() {
                        let glyph = if expanded { EXPANDED_GLYPH } else { COLLAPSED_GLYPH };
                        format!("{glyph} {}", item.label)
                    } else {
                        item.label.clone()
                    };
                    ItemView {
                        node_id: node.id,
                        item_id: item.id.clone(),
                        text,
                        expandable: item.is_expandable(),
                        expanded,
                        flow_active: has_event && matches!(item.kind, Some(ItemKind::RuntimeFlow)),
                    }
                })
                .collect();
            let flow_node_id = node.flow_step.as_ref().map(|tag| tag.flow_node_id.clone());
            BlockView {
                id: node.id,
                title: node.title.clone(),
                kind: node.kind,
                rect: node.layout,
                collapsible: !node.is_root() && node.kind.shows_collapse_control(),
                flow_status: flow_node_id.as_deref().map(|id| focus.status(id)),
                flow_node_id,
                scroll_top: node.scroll_top,
                scroll_left: node.scroll_left,
                items,
            }
        })
        .collect()
}

// ============================================================================
// Badges
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Ok,
    Warn,
    Danger,
    Info,
}

impl BadgeTone {
    pub fn class_name(&self) -> &'static str {
        match self {
            BadgeTone::Ok => "b-ok",
            BadgeTone::Warn => "b-warn",
            BadgeTone::Danger => "b-danger",
            BadgeTone::Info => "b-info",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            BadgeTone::Ok => Color::from_rgb_u8(72, 187, 120),
            BadgeTone::Warn => Color::from_rgb_u8(236, 201, 75),
            BadgeTone::Danger => Color::from_rgb_u8(229, 62, 62),
            BadgeTone::Info => Color::from_rgb_u8(99, 179, 237),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub tone: BadgeTone,
}

impl Badge {
    fn new(text: impl Into<String>, tone: BadgeTone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

/// Event outcome: `ok`, `warn`, anything else is an error.
pub fn status_badge(status: &str) -> Badge {
    match status {
        "ok" => Badge::new("OK", BadgeTone::Ok),
        "warn" => Badge::new("WARN", BadgeTone::Warn),
        _ => Badge::new("ERR", BadgeTone::Danger),
    }
}

pub fn consensus_badge(consensus: &str) -> Badge {
    match consensus {
        "pass" => Badge::new("CONSENSUS:PASS", BadgeTone::Ok),
        "veto" => Badge::new("CONSENSUS:VETO", BadgeTone::Danger),
        _ => Badge::new("CONSENSUS:PENDING", BadgeTone::Info),
    }
}

pub fn run_badge(status: &str) -> Badge {
    match status {
        "pass" => Badge::new("RUN:PASS", BadgeTone::Ok),
        "warn" => Badge::new("RUN:WARN", BadgeTone::Warn),
        _ => Badge::new("RUN:UNKNOWN", BadgeTone::Info),
    }
}

// ============================================================================
// Detail panel
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailField {
    pub label: &'static str,
    pub value: String,
    /// Rendered in a monospace font.
    pub mono: bool,
}

impl DetailField {
    fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            mono: false,
        }
    }

    fn mono(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            mono: true,
        }
    }
}

/// Side panel content: badges, labelled fields and free lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetailPanel {
    pub badges: Vec<Badge>,
    pub fields: Vec<DetailField>,
    pub lines: Vec<String>,
}

impl DetailPanel {
    pub fn no_event() -> Self {
        Self {
            badges: vec![Badge::new("NO EVENT", BadgeTone::Warn)],
            ..Default::default()
        }
    }

    /// Visible indicator for a failed fetch.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            badges: vec![Badge::new("ERROR", BadgeTone::Danger)],
            lines: vec![message.into()],
            ..Default::default()
        }
    }

    /// Detail of `event`, diffed against the timeline's previous event.
    pub fn event(
        event: &TraceEvent,
        timeline: &Timeline,
        run: Option<&RunMeta>,
        run_status: &str,
        graph: &RunGraph,
    ) -> Self {
        let previous = timeline.previous();
        let empty: &[String] = &[];
        let diff = crate::flow::diff_flow(
            previous.map_or(empty, |prev| prev.flow.as_slice()),
            &event.flow,
        );
        let from = previous
            .map(|prev| timeline.event_tag(&prev.id))
            .unwrap_or_else(|| "(start of run)".to_owned());
        let (run_id, target_id, summary) = run
            .map(|run| (run.run_id.as_str(), run.target_id.as_str(), run.summary.as_str()))
            .unwrap_or(("-", "-", ""));

        Self {
            badges: vec![
                status_badge(&event.status),
                consensus_badge(&event.consensus),
                run_badge(run_status),
            ],
            fields: vec![
                DetailField::mono("Run", run_id),
                DetailField::mono("Target", target_id),
                DetailField::text("Summary", summary),
                DetailField::mono("Event", timeline.event_tag(&event.id)),
                DetailField::text("Time", event.time.as_str()),
                DetailField::text("Tool", event.tool.as_str()),
                DetailField::text("Title", event.title.as_str()),
                DetailField::mono("Symbol", event.symbol.as_str()),
                DetailField::mono("Address", event.address.as_str()),
                DetailField::mono("Evidence", event.evidence.join(", ")),
                DetailField::mono("Flow", event.flow.join(" -> ")),
                DetailField::mono("From", from),
                DetailField::mono("Transition +", graph.label_list(&diff.entered)),
                DetailField::mono("Transition -", graph.label_list(&diff.exited)),
                DetailField::mono("Transition =", graph.label_list(&diff.kept)),
            ],
            lines: Vec::new(),
        }
    }

    /// Node drill-down: the node plus one line per related event.
    pub fn node(detail: &NodeDetail, timeline: &Timeline) -> Self {
        Self {
            badges: vec![Badge::new("NODE DRILLDOWN", BadgeTone::Info)],
            fields: vec![
                DetailField::mono("Node", detail.id.as_str()),
                DetailField::text("Label", detail.label.as_str()),
                DetailField::text("Type", detail.node_type.as_str()),
                DetailField::text("Related Events", detail.related_events.len().to_string()),
            ],
            lines: detail
                .related_events
                .iter()
                .map(|event| {
                    format!(
                        "{} {} {} {}",
                        event.time,
                        timeline.event_tag(&event.id),
                        event.tool,
                        event.consensus
                    )
                })
                .collect(),
        }
    }

    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.value.as_str())
    }
}

// ============================================================================
// Status lines
// ============================================================================

/// `HLAPI: path / Step N (id) / phase / from Step M (id)`.
pub fn hint_line(selected_path: &str, timeline: &Timeline) -> String {
    let path = if selected_path.is_empty() { "-" } else { selected_path };
    let Some(event) = timeline.selected() else {
        return format!("HLAPI: {path} / no active event");
    };
    let from = timeline
        .previous()
        .map(|prev| format!(" / from {}", timeline.event_tag(&prev.id)))
        .unwrap_or_default();
    format!(
        "HLAPI: {path} / {} / {}{from}",
        timeline.event_tag(&event.id),
        event.phase
    )
}

pub fn stats_line(timeline: &Timeline) -> String {
    format!("{} events", timeline.len())
}
