//! Level 3: Layout & Connector Tests
//!
//! Column placement, board extent, and connector anchoring from both layout
//! and measured geometry.

mod common;

use common::{loaded_session, TestHarness};
use proptest::prelude::*;
use slint::SharedString;
use trace_mindmap::{rects_overlap, MindMapSession, Point, RouteConfig, ROOT_ID};

fn assert_no_overlap(session: &MindMapSession) {
    let nodes: Vec<_> = session.store().nodes().collect();
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            assert!(
                !rects_overlap(&a.layout, &b.layout, 0.0),
                "blocks {} and {} overlap: {:?} / {:?}",
                a.id,
                b.id,
                a.layout,
                b.layout
            );
        }
    }
}

// ============================================================================
// Columns
// ============================================================================

#[test]
fn test_children_sit_right_of_parents() {
    let (mut session, _) = loaded_session();
    session.toggle_item(ROOT_ID, "sibling:Enable");
    session.toggle_item(ROOT_ID, "odl-entry:_ssid_write");
    let store = session.store();
    for node in store.nodes() {
        if let Some(parent) = node.parent_id.and_then(|id| store.node(id)) {
            assert!(node.layout.x >= parent.layout.right(), "block {} left of parent", node.id);
        }
    }
    assert_no_overlap(&session);
}

#[test]
fn test_board_covers_every_block() {
    let (mut session, _) = loaded_session();
    session.toggle_item(ROOT_ID, "source-fn:wld_ssid_setSsid");
    let board = session.board();
    let config = session.config().layout.clone();
    assert!(board.width >= config.min_board_width);
    assert!(board.height >= config.min_board_height);
    for node in session.store().nodes() {
        assert!(node.layout.right() + config.board_margin <= board.width);
        assert!(node.layout.bottom() + config.board_margin <= board.height);
    }
}

#[test]
fn test_root_is_centred_on_children() {
    let (session, _) = loaded_session();
    let store = session.store();
    let root = store.root().unwrap().layout;
    let children: Vec<_> = store.nodes().filter(|node| node.depth == 1).collect();
    let top = children.iter().map(|n| n.layout.y).fold(f32::MAX, f32::min);
    let bottom = children.iter().map(|n| n.layout.bottom()).fold(f32::MIN, f32::max);
    let expected = ((top + bottom - root.h) / 2.0).round().max(session.config().layout.top_pad);
    assert_eq!(root.y, expected);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_random_expansions_never_overlap(ops in proptest::collection::vec((0usize..16, 0usize..16), 0..12)) {
        let (mut session, _) = loaded_session();
        for (pick_node, pick_item) in ops {
            let target = {
                let store = session.store();
                let nodes: Vec<_> = store.nodes().collect();
                let node = nodes[pick_node % nodes.len()];
                let expandable: Vec<&str> = node
                    .items
                    .iter()
                    .filter(|item| item.is_expandable())
                    .map(|item| item.id.as_str())
                    .collect();
                if expandable.is_empty() {
                    None
                } else {
                    Some((node.id, expandable[pick_item % expandable.len()].to_owned()))
                }
            };
            if let Some((node_id, item_id)) = target {
                session.toggle_item(node_id, &item_id);
            }
        }
        assert_no_overlap(&session);
        let connectors = session.route_connectors(&session.model_geometry());
        prop_assert_eq!(connectors.len(), session.store().link_count());
    }
}

// ============================================================================
// Connectors
// ============================================================================

#[test]
fn test_layout_connectors_use_header_fallback() {
    let (session, _) = loaded_session();
    let runtime = session.store().runtime_node_id().unwrap();
    let block = session.store().node(runtime).unwrap().layout;
    let connector = session
        .route_connectors(&session.model_geometry())
        .into_iter()
        .find(|c| c.child == runtime)
        .unwrap();
    assert_eq!(connector.end, Point::new(block.x, block.y + 24.0));
    assert!(connector.path_commands.starts_with("M "));
    assert!(connector.end.x > connector.start.x);
}

#[test]
fn test_measured_geometry_anchors() {
    let harness = TestHarness::new();
    let runtime = harness
        .ctrl
        .session()
        .borrow()
        .store()
        .runtime_node_id()
        .unwrap();

    let tracker = harness.ctrl.tracker();
    tracker.block_rect_callback()(ROOT_ID, 20.0, 100.0, 300.0, 240.0);
    tracker.item_rect_callback()(
        ROOT_ID,
        SharedString::from(trace_mindmap::RUNTIME_FLOW_ITEM),
        0.0,
        120.0,
        300.0,
        24.0,
    );
    tracker.block_rect_callback()(runtime, 420.0, 40.0, 320.0, 400.0);
    tracker.header_rect_callback()(runtime, 0.0, 0.0, 320.0, 36.0);
    harness.ctrl.redraw();

    let connector = harness
        .ctrl
        .connectors()
        .into_iter()
        .find(|c| c.child == runtime)
        .unwrap();
    assert_eq!(connector.start, Point::new(320.0, 232.0));
    assert_eq!(connector.end, Point::new(420.0, 58.0));
    // dx 100 * 0.42 = 42
    assert_eq!(connector.path_commands, "M 320 232 C 362 232 378 58 420 58");

    // Scrolling the root's item list drags the output anchor with it.
    tracker.scroll_callback()(ROOT_ID, 30.0, 0.0);
    harness.ctrl.redraw();
    let connector = harness
        .ctrl
        .connectors()
        .into_iter()
        .find(|c| c.child == runtime)
        .unwrap();
    assert_eq!(connector.start, Point::new(320.0, 202.0));
}

#[test]
fn test_reports_alone_reroute_connectors() {
    let harness = TestHarness::new();
    let runtime = harness
        .ctrl
        .session()
        .borrow()
        .store()
        .runtime_node_id()
        .unwrap();
    let end_of = |harness: &TestHarness| {
        harness
            .ctrl
            .connectors()
            .into_iter()
            .find(|c| c.child == runtime)
            .unwrap()
            .end
    };

    let tracker = harness.ctrl.tracker();
    tracker.block_rect_callback()(runtime, 900.0, 700.0, 300.0, 200.0);
    harness.scheduler.run_frame();
    assert_eq!(end_of(&harness), Point::new(900.0, 724.0));

    tracker.header_rect_callback()(runtime, 0.0, 0.0, 300.0, 30.0);
    harness.scheduler.run_frame();
    assert_eq!(end_of(&harness), Point::new(900.0, 715.0));
}

#[test]
fn test_backwards_link_uses_midpoint() {
    let config = RouteConfig::default();
    let curve = trace_mindmap::CubicBezier::route(Point::new(300.0, 10.0), Point::new(296.0, 90.0), &config);
    assert_eq!(curve.p1, (298.0, 10.0));
    assert_eq!(curve.p2, (298.0, 90.0));
}

#[test]
fn test_collapsed_blocks_leave_cache() {
    let harness = TestHarness::new();
    harness.ctrl.toggle_item(ROOT_ID, "sibling:Alias");
    let child = harness
        .ctrl
        .session()
        .borrow()
        .store()
        .child_of(ROOT_ID, "sibling:Alias")
        .unwrap();
    harness.ctrl.tracker().block_rect_callback()(child, 500.0, 0.0, 300.0, 200.0);
    assert!(harness.ctrl.collapse_block(child));
    assert!(!harness.ctrl.cache().borrow().block_rects.contains_key(&child));
}
