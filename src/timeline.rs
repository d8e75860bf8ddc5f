//! Snapshot of the filtered event timeline and the active selection.

use crate::flow::{self, FlowDiff, FlowFocus};
use crate::model::TraceEvent;

/// Ordered events plus the index of the active one.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Vec<TraceEvent>,
    active: usize,
}

impl Timeline {
    pub fn new(events: Vec<TraceEvent>) -> Self {
        Self { events, active: 0 }
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Select an event, clamping into range. Returns the new index.
    pub fn set_active(&mut self, index: usize) -> usize {
        self.active = if self.events.is_empty() {
            0
        } else {
            index.min(self.events.len() - 1)
        };
        self.active
    }

    /// Index of the event after the active one, wrapping to the start.
    pub fn next_index(&self) -> Option<usize> {
        if self.events.is_empty() {
            return None;
        }
        Some((self.active + 1) % self.events.len())
    }

    /// Index of the event before the active one, wrapping to the end.
    pub fn prev_index(&self) -> Option<usize> {
        if self.events.is_empty() {
            return None;
        }
        Some(if self.active == 0 {
            self.events.len() - 1
        } else {
            self.active - 1
        })
    }

    pub fn position_of(&self, event_id: &str) -> Option<usize> {
        self.events.iter().position(|event| event.id == event_id)
    }

    pub fn selected(&self) -> Option<&TraceEvent> {
        self.events.get(self.active)
    }

    /// The event just before the active one, if any.
    pub fn previous(&self) -> Option<&TraceEvent> {
        if self.active == 0 {
            return None;
        }
        self.events.get(self.active - 1)
    }

    /// 1-based timeline position, 0 when the event is not in the timeline.
    pub fn step_no(&self, event_id: &str) -> usize {
        self.position_of(event_id).map_or(0, |index| index + 1)
    }

    /// `Step N (id)`, the bare id when unknown, `-` when empty.
    pub fn event_tag(&self, event_id: &str) -> String {
        if event_id.is_empty() {
            return "-".to_owned();
        }
        match self.step_no(event_id) {
            0 => event_id.to_owned(),
            step => format!("Step {step} ({event_id})"),
        }
    }

    pub fn backbone(&self) -> Vec<String> {
        flow::backbone(&self.events)
    }

    /// Diff of the previous event's flow against the active one's.
    pub fn diff(&self) -> FlowDiff {
        let empty: &[String] = &[];
        let previous = self.previous().map_or(empty, |event| event.flow.as_slice());
        let current = self.selected().map_or(empty, |event| event.flow.as_slice());
        flow::diff_flow(previous, current)
    }

    pub fn focus(&self) -> FlowFocus {
        FlowFocus::new(self.selected(), self.previous())
    }

    /// Tags of every event whose flow passes through `node_id`.
    pub fn events_through(&self, node_id: &str) -> Vec<String> {
        self.events
            .iter()
            .filter(|event| event.flow.iter().any(|id| id == node_id))
            .map(|event| self.event_tag(&event.id))
            .collect()
    }

    /// Distinct phases in timeline order, prefixed with `ALL`.
    pub fn phase_options(&self) -> Vec<String> {
        distinct_with_all(self.events.iter().map(|event| event.phase.as_str()))
    }

    /// Distinct tools in timeline order, prefixed with `ALL`.
    pub fn tool_options(&self) -> Vec<String> {
        distinct_with_all(self.events.iter().map(|event| event.tool.as_str()))
    }
}

fn distinct_with_all<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut options = vec!["ALL".to_owned()];
    for value in values {
        if !options.iter().any(|existing| existing == value) {
            options.push(value.to_owned());
        }
    }
    options
}
