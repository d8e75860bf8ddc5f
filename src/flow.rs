//! Flow diff between consecutive events and the stable backbone ordering.

use crate::model::TraceEvent;
use slint::Color;
use std::collections::HashSet;

/// Node-set difference between the previous and the current event's flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowDiff {
    /// In current, not in previous (current's order).
    pub entered: Vec<String>,
    /// In previous, not in current (previous's order).
    pub exited: Vec<String>,
    /// In both (current's order).
    pub kept: Vec<String>,
}

/// Classify flow nodes as entered, exited or kept. Flows are compared as sets.
pub fn diff_flow<P, C>(previous: &[P], current: &[C]) -> FlowDiff
where
    P: AsRef<str>,
    C: AsRef<str>,
{
    let prev_set: HashSet<&str> = previous.iter().map(AsRef::as_ref).collect();
    let curr_set: HashSet<&str> = current.iter().map(AsRef::as_ref).collect();

    let entered = current
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| !prev_set.contains(id))
        .map(str::to_owned)
        .collect();
    let exited = previous
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| !curr_set.contains(id))
        .map(str::to_owned)
        .collect();
    let kept = current
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| prev_set.contains(id))
        .map(str::to_owned)
        .collect();

    FlowDiff {
        entered,
        exited,
        kept,
    }
}

/// Every flow node of the timeline in first-seen order, without repeats.
pub fn backbone(events: &[TraceEvent]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for node_id in events.iter().flat_map(|event| event.flow.iter()) {
        if seen.insert(node_id.as_str()) {
            ordered.push(node_id.clone());
        }
    }
    ordered
}

/// Membership of a backbone node relative to the current and previous event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowStatus {
    Entered,
    Kept,
    Exited,
    Idle,
}

impl FlowStatus {
    pub fn classify(in_current: bool, in_previous: bool) -> Self {
        match (in_current, in_previous) {
            (true, true) => FlowStatus::Kept,
            (true, false) => FlowStatus::Entered,
            (false, true) => FlowStatus::Exited,
            (false, false) => FlowStatus::Idle,
        }
    }

    /// Prefix used in the backbone listing.
    pub fn marker(&self) -> char {
        match self {
            FlowStatus::Entered => '+',
            FlowStatus::Kept => '=',
            FlowStatus::Exited => '-',
            FlowStatus::Idle => '.',
        }
    }

    /// Visual class applied to blocks tagged with the node.
    pub fn class_name(&self) -> &'static str {
        match self {
            FlowStatus::Entered => "flow-entered",
            FlowStatus::Kept => "flow-kept",
            FlowStatus::Exited => "flow-exited",
            FlowStatus::Idle => "flow-idle",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            FlowStatus::Entered => Color::from_rgb_u8(72, 187, 120),
            FlowStatus::Kept => Color::from_rgb_u8(108, 167, 218),
            FlowStatus::Exited => Color::from_rgb_u8(229, 115, 115),
            FlowStatus::Idle => Color::from_rgb_u8(96, 108, 122),
        }
    }
}

/// Membership sets of the current and previous flow, for repeated lookups.
#[derive(Debug, Clone, Default)]
pub struct FlowFocus {
    current: HashSet<String>,
    previous: HashSet<String>,
}

impl FlowFocus {
    pub fn new(current: Option<&TraceEvent>, previous: Option<&TraceEvent>) -> Self {
        let collect = |event: Option<&TraceEvent>| {
            event
                .map(|event| event.flow.iter().cloned().collect())
                .unwrap_or_default()
        };
        Self {
            current: collect(current),
            previous: collect(previous),
        }
    }

    pub fn status(&self, node_id: &str) -> FlowStatus {
        FlowStatus::classify(self.current.contains(node_id), self.previous.contains(node_id))
    }

    /// Status of every backbone position, in backbone order.
    pub fn statuses<'a>(&'a self, backbone: &'a [String]) -> impl Iterator<Item = FlowStatus> + 'a {
        backbone.iter().map(move |node_id| self.status(node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, flow: &[&str]) -> TraceEvent {
        TraceEvent {
            id: id.into(),
            flow: flow.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    // ========================================================================
    // diff_flow()
    // ========================================================================

    #[test]
    fn test_diff_consecutive_events() {
        let diff = diff_flow(&["a", "b", "c"], &["b", "c", "d"]);
        assert_eq!(diff.entered, vec!["d"]);
        assert_eq!(diff.exited, vec!["a"]);
        assert_eq!(diff.kept, vec!["b", "c"]);
    }

    #[test]
    fn test_diff_from_start_of_run() {
        let none: [&str; 0] = [];
        let diff = diff_flow(&none, &["a", "b"]);
        assert_eq!(diff.entered, vec!["a", "b"]);
        assert!(diff.exited.is_empty());
        assert!(diff.kept.is_empty());
    }

    #[test]
    fn test_diff_keeps_current_order_for_kept() {
        let diff = diff_flow(&["c", "b", "a"], &["a", "b"]);
        assert_eq!(diff.kept, vec!["a", "b"]);
        assert_eq!(diff.exited, vec!["c"]);
    }

    // ========================================================================
    // backbone()
    // ========================================================================

    #[test]
    fn test_backbone_first_seen_order() {
        let events = vec![
            event("e1", &["a", "b", "c"]),
            event("e2", &["b", "c", "d"]),
            event("e3", &["e", "a"]),
        ];
        assert_eq!(backbone(&events), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_backbone_ignores_repeats_inside_one_flow() {
        let events = vec![event("e1", &["a", "b", "a"])];
        assert_eq!(backbone(&events), vec!["a", "b"]);
    }

    #[test]
    fn test_backbone_is_stable() {
        let events = vec![event("e1", &["x", "y"]), event("e2", &["y", "z"])];
        assert_eq!(backbone(&events), backbone(&events));
    }

    // ========================================================================
    // FlowStatus / FlowFocus
    // ========================================================================

    #[test]
    fn test_markers() {
        let e1 = event("e1", &["a", "b", "c"]);
        let e2 = event("e2", &["b", "c", "d"]);
        let focus = FlowFocus::new(Some(&e2), Some(&e1));
        let spine = backbone(&[e1.clone(), e2.clone()]);
        let markers: String = focus.statuses(&spine).map(|s| s.marker()).collect();
        assert_eq!(markers, "-==+");
    }

    #[test]
    fn test_idle_when_in_neither() {
        let focus = FlowFocus::new(None, None);
        assert_eq!(focus.status("a"), FlowStatus::Idle);
        assert_eq!(FlowStatus::Idle.class_name(), "flow-idle");
    }
}
