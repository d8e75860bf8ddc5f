//! The trace data collaborator.
//!
//! The diagram core only reads from a [`DataSource`]. [`BundleDataSource`]
//! serves everything from JSON documents held in memory: a run list, a path
//! context document and one bundle per run.

use crate::error::DataFetchError;
use crate::model::{
    GraphNode, HlapiContext, NodeDetail, RunGraph, RunMeta, RunSummary, TraceEvent,
};
use serde::Deserialize;
use std::collections::HashMap;

/// Value of a phase or tool filter that matches every event.
pub const FILTER_ALL: &str = "ALL";

/// Timeline filter: exact phase, exact tool, case-insensitive keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineFilter {
    pub phase: String,
    pub tool: String,
    pub keyword: String,
}

impl Default for TimelineFilter {
    fn default() -> Self {
        Self {
            phase: FILTER_ALL.to_string(),
            tool: FILTER_ALL.to_string(),
            keyword: String::new(),
        }
    }
}

impl TimelineFilter {
    pub fn matches(&self, event: &TraceEvent) -> bool {
        if self.phase != FILTER_ALL && !self.phase.is_empty() && event.phase != self.phase {
            return false;
        }
        if self.tool != FILTER_ALL && !self.tool.is_empty() && event.tool != self.tool {
            return false;
        }
        let keyword = self.keyword.trim();
        keyword.is_empty() || contains_keyword(event, keyword)
    }
}

fn contains_keyword(event: &TraceEvent, keyword: &str) -> bool {
    let haystack = [
        event.id.as_str(),
        event.phase.as_str(),
        event.tool.as_str(),
        event.title.as_str(),
        event.symbol.as_str(),
        event.address.as_str(),
    ]
    .into_iter()
    .chain(event.evidence.iter().map(String::as_str))
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();
    haystack.contains(&keyword.to_lowercase())
}

/// Read-only access to recorded runs.
///
/// Missing single records are `Ok(None)`; transport or decode failures are
/// errors and are never retried by the core.
pub trait DataSource {
    fn list_runs(&self) -> Result<Vec<RunSummary>, DataFetchError>;
    fn run(&self, run_id: &str) -> Result<RunMeta, DataFetchError>;
    fn graph(&self, run_id: &str) -> Result<RunGraph, DataFetchError>;
    fn timeline(
        &self,
        run_id: &str,
        filter: &TimelineFilter,
    ) -> Result<Vec<TraceEvent>, DataFetchError>;
    fn event_detail(&self, run_id: &str, event_id: &str)
        -> Result<Option<TraceEvent>, DataFetchError>;
    fn node_detail(&self, run_id: &str, node_id: &str)
        -> Result<Option<NodeDetail>, DataFetchError>;
    fn hlapi_context(&self) -> Result<HlapiContext, DataFetchError>;
}

/// Everything recorded for one run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunBundle {
    pub run: RunMeta,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<(String, String)>,
    pub events: Vec<TraceEvent>,
}

#[derive(Deserialize)]
struct RunList {
    #[serde(default)]
    runs: Vec<RunSummary>,
}

/// In-memory [`DataSource`] over JSON documents.
#[derive(Debug, Clone, Default)]
pub struct BundleDataSource {
    runs: Vec<RunSummary>,
    bundles: HashMap<String, RunBundle>,
    context: HlapiContext,
}

impl BundleDataSource {
    pub fn new(runs: Vec<RunSummary>, context: HlapiContext) -> Self {
        Self {
            runs,
            bundles: HashMap::new(),
            context,
        }
    }

    /// Build from a `{"runs": [...]}` list and a `{"path_contexts": [...]}`
    /// document.
    pub fn from_json_strs(runs: &str, context: &str) -> Result<Self, DataFetchError> {
        let list: RunList = serde_json::from_str(runs)?;
        let context: HlapiContext = serde_json::from_str(context)?;
        Ok(Self::new(list.runs, context))
    }

    pub fn insert_bundle(&mut self, run_id: impl Into<String>, bundle: RunBundle) {
        self.bundles.insert(run_id.into(), bundle);
    }

    /// Parse and register the bundle of `run_id`.
    pub fn insert_bundle_json(&mut self, run_id: &str, json: &str) -> Result<(), DataFetchError> {
        let bundle: RunBundle = serde_json::from_str(json)?;
        tracing::debug!(run_id, events = bundle.events.len(), "Run bundle loaded");
        self.insert_bundle(run_id, bundle);
        Ok(())
    }

    fn bundle(&self, run_id: &str) -> Result<&RunBundle, DataFetchError> {
        self.bundles
            .get(run_id)
            .ok_or_else(|| DataFetchError::RunNotFound(run_id.to_string()))
    }
}

impl DataSource for BundleDataSource {
    fn list_runs(&self) -> Result<Vec<RunSummary>, DataFetchError> {
        Ok(self.runs.clone())
    }

    fn run(&self, run_id: &str) -> Result<RunMeta, DataFetchError> {
        Ok(self.bundle(run_id)?.run.clone())
    }

    fn graph(&self, run_id: &str) -> Result<RunGraph, DataFetchError> {
        let bundle = self.bundle(run_id)?;
        Ok(RunGraph {
            nodes: bundle.nodes.clone(),
            edges: bundle.edges.clone(),
        })
    }

    fn timeline(
        &self,
        run_id: &str,
        filter: &TimelineFilter,
    ) -> Result<Vec<TraceEvent>, DataFetchError> {
        Ok(self
            .bundle(run_id)?
            .events
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect())
    }

    fn event_detail(
        &self,
        run_id: &str,
        event_id: &str,
    ) -> Result<Option<TraceEvent>, DataFetchError> {
        Ok(self
            .bundle(run_id)?
            .events
            .iter()
            .find(|event| event.id == event_id)
            .cloned())
    }

    fn node_detail(
        &self,
        run_id: &str,
        node_id: &str,
    ) -> Result<Option<NodeDetail>, DataFetchError> {
        let bundle = self.bundle(run_id)?;
        let Some(node) = bundle.nodes.iter().find(|node| node.id == node_id) else {
            return Ok(None);
        };
        Ok(Some(NodeDetail {
            id: node.id.clone(),
            label: node.label.clone(),
            node_type: node.node_type.clone(),
            related_events: bundle
                .events
                .iter()
                .filter(|event| event.flow.iter().any(|id| id == node_id))
                .cloned()
                .collect(),
        }))
    }

    fn hlapi_context(&self) -> Result<HlapiContext, DataFetchError> {
        Ok(self.context.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNS: &str = r#"{"runs": [{"run_id": "r1", "target_id": "t1", "status": "pass"}]}"#;
    const CONTEXT: &str = r#"{"path_contexts": [{"path": "Device.WiFi.SSID", "siblings": ["Enable"]}]}"#;
    const BUNDLE: &str = r#"{
        "run": {"run_id": "r1", "target_id": "t1", "summary": "ok", "default_path": "Device.WiFi.SSID"},
        "nodes": [{"id": "a", "label": "Alpha", "type": "fn"}, {"id": "b", "label": "Beta", "type": "fn"}],
        "edges": [["a", "b"]],
        "events": [
            {"id": "E1", "phase": "probe", "tool": "gdb", "title": "Break at set", "flow": ["a"],
             "evidence": ["ssid_write"]},
            {"id": "E2", "phase": "patch", "tool": "objdump", "title": "Disasm", "flow": ["a", "b"],
             "symbol": "wld_set_ssid"}
        ]
    }"#;

    fn source() -> BundleDataSource {
        let mut source = BundleDataSource::from_json_strs(RUNS, CONTEXT).unwrap();
        source.insert_bundle_json("r1", BUNDLE).unwrap();
        source
    }

    fn ids(events: &[TraceEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    // ========================================================================
    // Loading
    // ========================================================================

    #[test]
    fn test_load_runs_and_context() {
        let source = source();
        assert_eq!(source.list_runs().unwrap()[0].run_id, "r1");
        assert!(source.hlapi_context().unwrap().contains("Device.WiFi.SSID"));
        assert_eq!(source.run("r1").unwrap().default_path, "Device.WiFi.SSID");
        let graph = source.graph("r1").unwrap();
        assert_eq!(graph.edges, vec![("a".to_string(), "b".to_string())]);
        assert_eq!(graph.label("b"), "Beta");
    }

    #[test]
    fn test_unknown_run() {
        let err = source().run("nope").unwrap_err();
        assert!(matches!(err, DataFetchError::RunNotFound(id) if id == "nope"));
    }

    #[test]
    fn test_malformed_bundle() {
        let mut source = source();
        let err = source.insert_bundle_json("r2", "{").unwrap_err();
        assert!(matches!(err, DataFetchError::Decode(_)));
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    #[test]
    fn test_default_filter_keeps_all() {
        let events = source().timeline("r1", &TimelineFilter::default()).unwrap();
        assert_eq!(ids(&events), vec!["E1", "E2"]);
    }

    #[test]
    fn test_phase_and_tool_filters() {
        let source = source();
        let filter = TimelineFilter {
            phase: "patch".into(),
            ..Default::default()
        };
        assert_eq!(ids(&source.timeline("r1", &filter).unwrap()), vec!["E2"]);
        let filter = TimelineFilter {
            tool: "gdb".into(),
            ..Default::default()
        };
        assert_eq!(ids(&source.timeline("r1", &filter).unwrap()), vec!["E1"]);
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        let source = source();
        let filter = TimelineFilter {
            keyword: "  WLD_SET ".into(),
            ..Default::default()
        };
        assert_eq!(ids(&source.timeline("r1", &filter).unwrap()), vec!["E2"]);
        let filter = TimelineFilter {
            keyword: "ssid_write".into(),
            ..Default::default()
        };
        assert_eq!(ids(&source.timeline("r1", &filter).unwrap()), vec!["E1"]);
    }

    // ========================================================================
    // Details
    // ========================================================================

    #[test]
    fn test_event_detail() {
        let source = source();
        assert_eq!(source.event_detail("r1", "E2").unwrap().unwrap().title, "Disasm");
        assert!(source.event_detail("r1", "E9").unwrap().is_none());
    }

    #[test]
    fn test_node_detail_collects_related_events() {
        let source = source();
        let detail = source.node_detail("r1", "b").unwrap().unwrap();
        assert_eq!(detail.label, "Beta");
        assert_eq!(ids(&detail.related_events), vec!["E2"]);
        let detail = source.node_detail("r1", "a").unwrap().unwrap();
        assert_eq!(ids(&detail.related_events), vec!["E1", "E2"]);
        assert!(source.node_detail("r1", "zz").unwrap().is_none());
    }
}
