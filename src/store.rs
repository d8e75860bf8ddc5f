//! The expand/collapse tree.
//!
//! [`TreeStore`] owns every [`Node`]. Links record which child block an
//! expandable item produced; at most one child exists per item. Both link
//! directions are kept in sync, plus a parent→children index so collapsing a
//! subtree only visits the nodes it removes.

use crate::builders::{self, BuildContext};
use crate::geometry::{Point, Rect};
use crate::model::{ItemKind, LinkKey, Node, NodeDraft, ROOT_ID};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct TreeStore {
    /// Id order is creation order, which is also the column stacking order.
    nodes: BTreeMap<i32, Node>,
    item_to_child: HashMap<LinkKey, i32>,
    child_to_link: HashMap<i32, LinkKey>,
    children: HashMap<i32, Vec<i32>>,
    next_id: i32,
}

impl TreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Queries ===

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(&ROOT_ID)
    }

    pub fn node(&self, id: i32) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> + '_ {
        self.nodes.values_mut()
    }

    /// Active links as `(item key, child id)`, ordered by child id.
    pub fn links(&self) -> Vec<(&LinkKey, i32)> {
        let mut links: Vec<(&LinkKey, i32)> = self
            .item_to_child
            .iter()
            .map(|(key, &child)| (key, child))
            .collect();
        links.sort_by_key(|&(_, child)| child);
        links
    }

    pub fn link_count(&self) -> usize {
        self.item_to_child.len()
    }

    /// Child block currently expanded from `(parent_id, item_id)`.
    pub fn child_of(&self, parent_id: i32, item_id: &str) -> Option<i32> {
        self.item_to_child.get(&LinkKey::new(parent_id, item_id)).copied()
    }

    pub fn is_expanded(&self, parent_id: i32, item_id: &str) -> bool {
        self.child_of(parent_id, item_id).is_some()
    }

    /// Inbound link of a child block.
    pub fn link_of(&self, child_id: i32) -> Option<&LinkKey> {
        self.child_to_link.get(&child_id)
    }

    pub fn children_of(&self, id: i32) -> &[i32] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Id of the runtime-flow block, if the root's call-flow item is expanded.
    pub fn runtime_node_id(&self) -> Option<i32> {
        self.item_to_child.get(&LinkKey::runtime_flow()).copied()
    }

    // === Per-node view state ===

    /// Pin a block to a dragged position. Returns `false` for unknown ids.
    pub fn set_manual_pos(&mut self, id: i32, pos: Point) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.manual_pos = Some(pos);
                true
            }
            None => false,
        }
    }

    pub fn set_scroll(&mut self, id: i32, top: f32, left: f32) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.scroll_top = top;
                node.scroll_left = left;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_layout(&mut self, id: i32, rect: Rect) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.layout = rect;
        }
    }

    // === Structure ===

    /// Drop everything and start over with a fresh root.
    ///
    /// The root's call-flow item is expanded immediately and the flow-step
    /// chain below it is auto-expanded.
    pub fn create_root(&mut self, ctx: &BuildContext<'_>) -> i32 {
        self.nodes.clear();
        self.item_to_child.clear();
        self.child_to_link.clear();
        self.children.clear();
        self.next_id = ROOT_ID + 1;

        let draft = builders::build_root(ctx);
        let mut root = Node::new(ROOT_ID, draft.title, draft.items, None, 0, draft.kind);
        root.flow_step = draft.flow_step;
        self.nodes.insert(ROOT_ID, root);
        tracing::info!(path = ctx.selected_path, "Mind map tree rebuilt");

        self.sync_runtime_flow(ctx);
        ROOT_ID
    }

    /// Expand an item into a new child block.
    ///
    /// Returns the new block id, or `None` when nothing changed: unknown
    /// parent or item, text item, already expanded, the protected call-flow
    /// item, or the builder produced nothing.
    pub fn expand(&mut self, parent_id: i32, item_id: &str, ctx: &BuildContext<'_>) -> Option<i32> {
        let key = LinkKey::new(parent_id, item_id);
        if key.is_protected() {
            tracing::debug!(%key, "Ignoring expand of protected call-flow item");
            return None;
        }
        if self.item_to_child.contains_key(&key) {
            tracing::debug!(%key, "Item already expanded");
            return None;
        }
        self.expand_key(key, ctx)
    }

    /// Remove a block and every descendant.
    ///
    /// Returns `false` for the root, unknown blocks, and the runtime-flow
    /// block (its link is protected).
    pub fn collapse(&mut self, node_id: i32) -> bool {
        if node_id == ROOT_ID {
            tracing::debug!("Ignoring collapse of root");
            return false;
        }
        match self.child_to_link.get(&node_id) {
            None => {
                tracing::debug!(node_id, "No inbound link to collapse");
                false
            }
            Some(key) if key.is_protected() => {
                tracing::debug!(node_id, "Ignoring collapse of call-flow block");
                false
            }
            Some(_) => {
                self.remove_subtree(node_id);
                true
            }
        }
    }

    /// Collapse the item's child if it has one, else expand it.
    ///
    /// Returns whether the tree changed.
    pub fn toggle(&mut self, parent_id: i32, item_id: &str, ctx: &BuildContext<'_>) -> bool {
        match self.child_of(parent_id, item_id) {
            Some(child) => self.collapse(child),
            None => self.expand(parent_id, item_id, ctx).is_some(),
        }
    }

    // === Runtime flow ===

    /// Make sure the call-flow block exists and its flow-step chain is
    /// expanded to the end of the backbone. Returns the number of new blocks.
    pub fn sync_runtime_flow(&mut self, ctx: &BuildContext<'_>) -> usize {
        let mut created = 0;
        let runtime_key = LinkKey::runtime_flow();
        let mut current = match self.item_to_child.get(&runtime_key) {
            Some(&id) => id,
            None => match self.expand_key(runtime_key, ctx) {
                Some(id) => {
                    created += 1;
                    id
                }
                None => return 0,
            },
        };

        loop {
            let Some(step_item) = self.nodes.get(&current).and_then(|node| {
                node.items
                    .iter()
                    .find(|item| matches!(item.kind, Some(ItemKind::FlowStep { .. })))
                    .map(|item| item.id.clone())
            }) else {
                break;
            };
            let key = LinkKey::new(current, step_item);
            current = match self.item_to_child.get(&key) {
                Some(&child) => child,
                None => match self.expand_key(key, ctx) {
                    Some(child) => {
                        created += 1;
                        child
                    }
                    None => break,
                },
            };
        }

        if created > 0 {
            tracing::debug!(created, "Call-flow chain extended");
        }
        created
    }

    /// Update the call-flow label and summary after the active event changed.
    ///
    /// Only the runtime block's own items change. Subtrees of items that are
    /// still offered stay as the user left them, collapsed steps included.
    /// Subtrees of items that disappeared are removed.
    pub fn refresh_runtime_flow(&mut self, ctx: &BuildContext<'_>) {
        self.update_runtime_label(ctx);
        let Some(runtime_id) = self.runtime_node_id() else {
            self.sync_runtime_flow(ctx);
            return;
        };
        if let Some(draft) = self.runtime_item_draft(runtime_id, ctx) {
            self.replace_items(runtime_id, draft);
        }
    }

    /// Rebuild the flow-step chain after the timeline itself changed.
    ///
    /// The backbone may differ, so every block below the runtime block is
    /// discarded before re-chaining.
    pub fn rebuild_runtime_flow(&mut self, ctx: &BuildContext<'_>) {
        if let Some(runtime_id) = self.runtime_node_id() {
            for child in self.children_of(runtime_id).to_vec() {
                self.remove_subtree(child);
            }
        }
        self.refresh_runtime_flow(ctx);
        self.sync_runtime_flow(ctx);
    }

    fn update_runtime_label(&mut self, ctx: &BuildContext<'_>) {
        let label = builders::runtime_flow_label(ctx.timeline);
        if let Some(item) = self
            .nodes
            .get_mut(&ROOT_ID)
            .and_then(|root| root.item_mut(crate::model::RUNTIME_FLOW_ITEM))
        {
            item.label = label;
        }
    }

    fn runtime_item_draft(&self, runtime_id: i32, ctx: &BuildContext<'_>) -> Option<NodeDraft> {
        let key = self.child_to_link.get(&runtime_id)?;
        let item = self.nodes.get(&key.parent)?.item(&key.item)?;
        builders::build_child(ctx, item)
    }

    fn replace_items(&mut self, node_id: i32, draft: NodeDraft) {
        let stale: Vec<i32> = self
            .children_of(node_id)
            .iter()
            .copied()
            .filter(|child| {
                self.child_to_link
                    .get(child)
                    .map_or(true, |key| draft.item(&key.item).map_or(true, |item| !item.is_expandable()))
            })
            .collect();
        for child in stale {
            self.remove_subtree(child);
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.title = draft.title;
            node.items = draft.items;
            node.flow_step = draft.flow_step;
        }
    }

    // === Internals ===

    fn expand_key(&mut self, key: LinkKey, ctx: &BuildContext<'_>) -> Option<i32> {
        let Some(parent) = self.nodes.get(&key.parent) else {
            tracing::debug!(%key, "Expand on unknown block");
            return None;
        };
        let Some(item) = parent.item(&key.item).filter(|item| item.is_expandable()) else {
            tracing::debug!(%key, "Item missing or not expandable");
            return None;
        };
        let Some(draft) = builders::build_child(ctx, item) else {
            tracing::debug!(%key, "Builder produced no block");
            return None;
        };

        let depth = parent.depth + 1;
        let id = self.next_id;
        self.next_id += 1;

        let mut node = Node::new(id, draft.title, draft.items, Some(key.parent), depth, draft.kind);
        node.flow_step = draft.flow_step;
        self.nodes.insert(id, node);
        self.children.entry(key.parent).or_default().push(id);
        self.child_to_link.insert(id, key.clone());
        self.item_to_child.insert(key, id);
        Some(id)
    }

    fn remove_subtree(&mut self, top: i32) {
        if let Some(parent) = self.nodes.get(&top).and_then(|node| node.parent_id) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|&child| child != top);
            }
        }

        let mut stack = vec![top];
        let mut removed = 0usize;
        while let Some(id) = stack.pop() {
            if let Some(children) = self.children.remove(&id) {
                stack.extend(children);
            }
            if let Some(key) = self.child_to_link.remove(&id) {
                self.item_to_child.remove(&key);
            }
            if self.nodes.remove(&id).is_some() {
                removed += 1;
            }
        }
        tracing::debug!(top, removed, "Subtree collapsed");
    }
}
