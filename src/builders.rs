//! Content builders: materialize a child block from an expandable item.
//!
//! Builders are pure. They read the selected [`PathContext`], the timeline
//! snapshot and the run graph through a [`BuildContext`] and return a
//! [`NodeDraft`]; the [`TreeStore`](crate::store::TreeStore) assigns identity
//! and links. `None` means "do not create a link".

use crate::config::BuilderConfig;
use crate::flow::FlowFocus;
use crate::model::{
    basename, FlowStepTag, Item, ItemKind, NodeDraft, NodeKind, OutlineEntry, OutlineKind,
    PathContext, RunGraph, RUNTIME_FLOW_ITEM,
};
use crate::timeline::Timeline;
use std::rc::Rc;

/// Read-only inputs shared by every builder.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub selected_path: &'a str,
    pub path: Option<&'a PathContext>,
    pub timeline: &'a Timeline,
    pub graph: &'a RunGraph,
    pub config: &'a BuilderConfig,
}

impl<'a> BuildContext<'a> {
    /// `label (id)` for a flow node.
    fn node_ref(&self, node_id: &str) -> String {
        format!("{} ({})", self.graph.label(node_id), node_id)
    }

    /// Flow node labels joined with arrows, or `(none)`.
    fn node_list(&self, node_ids: &[String]) -> String {
        self.graph.label_list(node_ids)
    }
}

/// Label of the root's call-flow row for the active event.
pub fn runtime_flow_label(timeline: &Timeline) -> String {
    let Some(event) = timeline.selected() else {
        return "Call Flow Focus (no active event)".to_owned();
    };
    let tag = timeline.event_tag(&event.id);
    match timeline.previous() {
        Some(prev) => format!("Call Flow Focus: {tag} (from {})", timeline.event_tag(&prev.id)),
        None => format!("Call Flow Focus: {tag}"),
    }
}

/// Content of the root block. Always produced, even without a path context.
pub fn build_root(ctx: &BuildContext<'_>) -> NodeDraft {
    let mut items: Vec<Item> = ctx
        .path
        .map(|path| {
            path.siblings
                .iter()
                .filter(|name| !name.is_empty())
                .map(|name| {
                    Item::expandable(
                        format!("sibling:{name}"),
                        name.as_str(),
                        ItemKind::Sibling { name: name.clone() },
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    if items.is_empty() {
        items.push(Item::text("no-sibling", "(no sibling HLAPI)"));
    }

    items.push(Item::expandable(
        RUNTIME_FLOW_ITEM,
        runtime_flow_label(ctx.timeline),
        ItemKind::RuntimeFlow,
    ));

    if let Some(path) = ctx.path {
        if let Some(entry) = path.entry_function() {
            items.push(Item::expandable(
                format!("odl-entry:{entry}"),
                format!("ODL Entry: {entry}"),
                ItemKind::OdlEntry,
            ));
        } else if let Some(file) = path.odl_file() {
            let base = basename(file);
            items.push(Item::expandable(
                format!("odl-file:{base}"),
                format!("ODL File: {base}"),
                ItemKind::OdlEntry,
            ));
        }
        if let Some(function) = path.source_function() {
            items.push(source_item(format!("source-fn:{function}"), function));
        }
    }

    let title = if ctx.selected_path.is_empty() {
        "HLAPI Path"
    } else {
        ctx.selected_path
    };
    NodeDraft::new(title, items, NodeKind::Root)
}

/// Build the child block for `item`, dispatching on its kind.
pub fn build_child(ctx: &BuildContext<'_>, item: &Item) -> Option<NodeDraft> {
    let path = ctx.path?;
    match item.kind.as_ref()? {
        ItemKind::Sibling { name } => Some(build_sibling(ctx, path, name)),
        ItemKind::OdlEntry => Some(build_odl_entry(path)),
        ItemKind::SourceFn { function } => Some(build_source_fn(ctx, path, function)),
        ItemKind::Loop { lines } => Some(build_loop(lines)),
        ItemKind::RuntimeFlow => Some(build_runtime_flow(ctx)),
        ItemKind::FlowStep { backbone, index } => build_flow_step(ctx, backbone, *index),
    }
}

fn source_item(id: String, function: &str) -> Item {
    Item::expandable(
        id,
        format!("Source: {function}()"),
        ItemKind::SourceFn {
            function: function.to_owned(),
        },
    )
}

fn build_sibling(ctx: &BuildContext<'_>, path: &PathContext, name: &str) -> NodeDraft {
    let mut items = vec![
        Item::text(format!("path:{name}"), format!("Path: {}", ctx.selected_path)),
        Item::text(
            format!("odl:{name}"),
            format!("ODL: {}", basename(path.odl_file().unwrap_or_default())),
        ),
        Item::text(format!("scope:{name}"), format!("Scope: {}", path.scope())),
    ];
    if let Some(entry) = path.entry_function() {
        items.push(Item::expandable(
            format!("odl-entry:{name}"),
            format!("ODL Entry: {entry}"),
            ItemKind::OdlEntry,
        ));
    }
    if let Some(function) = path.source_function() {
        items.push(source_item(format!("src-fn:{name}:{function}"), function));
    }

    let peers: Vec<&String> = path
        .siblings
        .iter()
        .filter(|peer| !peer.is_empty() && peer.as_str() != name)
        .collect();
    let limit = ctx.config.peer_limit;
    for peer in peers.iter().take(limit) {
        items.push(Item::expandable(
            format!("peer:{name}:{peer}"),
            peer.as_str(),
            ItemKind::Sibling {
                name: (*peer).clone(),
            },
        ));
    }
    if peers.len() > limit {
        items.push(Item::text(
            format!("peer-more:{name}"),
            format!("... +{}", peers.len() - limit),
        ));
    }

    NodeDraft::new(format!("Param: {name}"), items, NodeKind::Sibling)
}

fn build_odl_entry(path: &PathContext) -> NodeDraft {
    let entry_line = path
        .odl_entry_line
        .as_ref()
        .or(path.odl_line.as_ref())
        .map_or_else(|| "-".to_owned(), ToString::to_string);
    let stats_line = path
        .odl_stats_line
        .as_ref()
        .map_or_else(|| "-".to_owned(), ToString::to_string);

    let mut items = vec![
        Item::text("odl-file", format!("File: {}", path.odl_file().unwrap_or("-"))),
        Item::text("odl-entry-line", format!("EntryLine: {entry_line}")),
        Item::text("odl-stats-line", format!("StatsLine: {stats_line}")),
        Item::text("scope", format!("Scope: {}", path.scope())),
    ];
    if let Some(function) = path.source_function() {
        items.push(source_item(format!("source-fn:{function}"), function));
    }
    NodeDraft::new("ODL Mapping", items, NodeKind::Odl)
}

/// Outline of `function`: the mapped outline, else a named sibling function's.
fn resolve_outline<'p>(path: &'p PathContext, function: &str) -> &'p [OutlineEntry] {
    if path.source_function() == Some(function) {
        return &path.source_outline;
    }
    path.sibling_functions
        .iter()
        .find(|candidate| candidate.name == function)
        .map(|candidate| candidate.outline.as_slice())
        .unwrap_or_default()
}

fn build_source_fn(ctx: &BuildContext<'_>, path: &PathContext, function: &str) -> NodeDraft {
    let function = if function.is_empty() {
        path.source_function().unwrap_or_default()
    } else {
        function
    };

    let mut items: Vec<Item> = resolve_outline(path, function)
        .iter()
        .enumerate()
        .map(|(index, entry)| match entry.kind {
            OutlineKind::Loop => Item::expandable(
                format!("loop:{function}:{index}"),
                entry.text.as_str(),
                ItemKind::Loop {
                    lines: entry.children.clone(),
                },
            ),
            OutlineKind::Statement => Item::text(format!("line:{function}:{index}"), entry.text.as_str()),
        })
        .collect();

    items.extend(
        path.sibling_functions
            .iter()
            .filter(|candidate| candidate.name != function)
            .take(ctx.config.function_jump_limit)
            .map(|candidate| {
                Item::expandable(
                    format!("source-fn:{}", candidate.name),
                    format!("Fn: {}()", candidate.name),
                    ItemKind::SourceFn {
                        function: candidate.name.clone(),
                    },
                )
            }),
    );

    if items.is_empty() {
        items.push(Item::text(format!("no-outline:{function}"), "(no source outline)"));
    }

    let title = if function.is_empty() { "unknown" } else { function };
    NodeDraft::new(format!("Source: {title}"), items, NodeKind::Source)
}

fn build_loop(lines: &[String]) -> NodeDraft {
    let mut items: Vec<Item> = lines
        .iter()
        .enumerate()
        .map(|(index, line)| Item::text(format!("loop-line:{index}"), line.as_str()))
        .collect();
    if items.is_empty() {
        items.push(Item::text("loop-empty", "(empty loop)"));
    }
    NodeDraft::new("Loop Expand", items, NodeKind::Loop)
}

fn build_runtime_flow(ctx: &BuildContext<'_>) -> NodeDraft {
    let timeline = ctx.timeline;
    let Some(event) = timeline.selected() else {
        return NodeDraft::new(
            "Call Flow Focus",
            vec![Item::text("runtime-none", "(no active event)")],
            NodeKind::Runtime,
        );
    };
    let previous = timeline.previous();
    let diff = timeline.diff();
    let backbone: Rc<[String]> = timeline.backbone().into();

    let from = previous.map_or_else(|| "(start of run)".to_owned(), |prev| timeline.event_tag(&prev.id));
    let mut items = vec![
        Item::text("runtime-event", format!("Event: {}", timeline.event_tag(&event.id))),
        Item::text("runtime-prev", format!("From: {from}")),
        Item::text("runtime-phase", format!("Phase/Tool: {} / {}", event.phase, event.tool)),
        Item::text("runtime-now", format!("Current Flow: {}", ctx.node_list(&event.flow))),
        Item::text(
            "runtime-diff-entered",
            format!("Transition + Entered: {}", ctx.node_list(&diff.entered)),
        ),
        Item::text(
            "runtime-diff-exited",
            format!("Transition - Exited: {}", ctx.node_list(&diff.exited)),
        ),
        Item::text(
            "runtime-diff-kept",
            format!("Transition = Kept: {}", ctx.node_list(&diff.kept)),
        ),
        Item::text(
            "runtime-guide",
            "Legend: + entered this step, - exited from previous, = continuous.",
        ),
    ];

    if let Some(first) = backbone.first() {
        items.push(Item::expandable(
            "flow-step:0",
            format!("Step 1: {}", ctx.node_ref(first)),
            ItemKind::FlowStep {
                backbone: Rc::clone(&backbone),
                index: 0,
            },
        ));
    }

    items.push(Item::text(
        "backbone-title",
        format!("Backbone ({} nodes):", backbone.len()),
    ));
    let focus = FlowFocus::new(Some(event), previous);
    for (index, (node_id, status)) in backbone.iter().zip(focus.statuses(&backbone)).enumerate() {
        items.push(Item::text(
            format!("backbone-line:{index}"),
            format!("{} {}. {}", status.marker(), index + 1, ctx.node_ref(node_id)),
        ));
    }

    NodeDraft::new("Call Flow Focus", items, NodeKind::Runtime)
}

fn build_flow_step(ctx: &BuildContext<'_>, backbone: &Rc<[String]>, index: usize) -> Option<NodeDraft> {
    let node_id = backbone.get(index)?;
    let prev_id = index.checked_sub(1).and_then(|i| backbone.get(i));
    let next_id = backbone.get(index + 1);

    let seen_in = ctx.timeline.events_through(node_id);
    let seen_in = if seen_in.is_empty() {
        "(none)".to_owned()
    } else {
        seen_in.join(", ")
    };

    let mut items = vec![
        Item::text("flow-step-node", format!("Node: {}", ctx.node_ref(node_id))),
        Item::text(
            "flow-step-marker",
            "Focus State: color highlight (entered/kept/exited)",
        ),
        Item::text(
            "flow-step-prev",
            format!(
                "From Node: {}",
                prev_id.map_or_else(|| "(flow start)".to_owned(), |id| ctx.node_ref(id))
            ),
        ),
        Item::text(
            "flow-step-next",
            format!(
                "To Node: {}",
                next_id.map_or_else(|| "(flow end)".to_owned(), |id| ctx.node_ref(id))
            ),
        ),
        Item::text("flow-step-related", format!("Seen In: {seen_in}")),
    ];
    if let Some(next_id) = next_id {
        items.push(Item::expandable(
            format!("flow-step:{}", index + 1),
            format!("Step {}: {}", index + 2, ctx.node_ref(next_id)),
            ItemKind::FlowStep {
                backbone: Rc::clone(backbone),
                index: index + 1,
            },
        ));
    }

    let mut draft = NodeDraft::new(format!("Flow Step {}", index + 1), items, NodeKind::FlowStep);
    draft.flow_step = Some(FlowStepTag {
        flow_node_id: node_id.clone(),
        step_index: index,
    });
    Some(draft)
}
