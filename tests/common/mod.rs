//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::rc::Rc;

use slint::{Model, VecModel};
use trace_mindmap::{
    BlockView, BundleDataSource, ManualFrameScheduler, MindMapConfig, MindMapController,
    MindMapSession,
};

pub const SSID_PATH: &str = "Device.WiFi.SSID.1.SSID";
pub const CHANNEL_PATH: &str = "Device.WiFi.Radio.1.Channel";

pub const RUNS: &str = r#"{"runs": [
    {"run_id": "r1", "target_id": "gw-01", "status": "pass"},
    {"run_id": "r2", "target_id": "gw-02", "status": "fail"}
]}"#;

pub const CONTEXT: &str = r#"{"path_contexts": [
    {
        "path": "Device.WiFi.SSID.1.SSID",
        "siblings": ["Enable", "Alias", "SSID"],
        "odl_file": "/etc/amx/wld/wld_ssid.odl",
        "odl_entry_line": 212,
        "odl_stats_line": "n/a",
        "entry_function": "_ssid_write",
        "object_scope": "SSID",
        "source_mapping": {"source_function": "wld_ssid_setSsid"},
        "source_outline": [
            {"kind": "statement", "text": "check arguments"},
            {"kind": "loop", "text": "for each radio", "children": ["update radio", "commit"]}
        ],
        "sibling_functions": [
            {"name": "wld_ssid_enable", "outline": [{"kind": "statement", "text": "toggle"}]}
        ]
    },
    {"path": "Device.WiFi.Radio.1.Channel"}
]}"#;

pub const BUNDLE_R1: &str = r#"{
    "run": {"run_id": "r1", "target_id": "gw-01", "summary": "ssid rename",
            "default_path": "Device.WiFi.SSID.1.SSID"},
    "nodes": [
        {"id": "a", "label": "dm_set", "type": "fn"},
        {"id": "b", "label": "wld_ssid_setSsid", "type": "fn"},
        {"id": "c", "label": "hostapd_reload", "type": "fn"}
    ],
    "edges": [["a", "b"], ["b", "c"]],
    "events": [
        {"id": "E1", "time": "10:00:01", "phase": "probe", "tool": "gdb",
         "title": "Break on set", "flow": ["a", "b"], "status": "ok", "consensus": "agree"},
        {"id": "E2", "time": "10:00:02", "phase": "patch", "tool": "gdb",
         "title": "Reload", "flow": ["b", "c"], "status": "warn"},
        {"id": "E3", "time": "10:00:03", "phase": "verify", "tool": "objdump",
         "title": "Disasm reload", "symbol": "hostapd_reload", "flow": ["a", "c"]}
    ]
}"#;

pub const BUNDLE_R2: &str = r#"{
    "run": {"run_id": "r2", "target_id": "gw-02", "default_path": "Device.WiFi.Radio.1.Channel"},
    "events": []
}"#;

pub fn fixture_source() -> BundleDataSource {
    let mut source = BundleDataSource::from_json_strs(RUNS, CONTEXT).expect("fixture documents");
    source.insert_bundle_json("r1", BUNDLE_R1).expect("r1 bundle");
    source.insert_bundle_json("r2", BUNDLE_R2).expect("r2 bundle");
    source
}

/// A bootstrapped session driven by a manual frame clock.
pub fn loaded_session() -> (MindMapSession, ManualFrameScheduler) {
    let scheduler = ManualFrameScheduler::new();
    let mut session = MindMapSession::new(MindMapConfig::default(), Rc::new(scheduler.clone()));
    session.bootstrap(&fixture_source()).expect("bootstrap");
    (session, scheduler)
}

/// Controller plus the block model it keeps in sync.
pub struct TestHarness {
    pub ctrl: MindMapController,
    pub scheduler: ManualFrameScheduler,
    pub blocks: Rc<VecModel<BlockView>>,
}

impl TestHarness {
    pub fn new() -> Self {
        let scheduler = ManualFrameScheduler::new();
        let ctrl = MindMapController::with_scheduler(
            MindMapConfig::default(),
            Rc::new(fixture_source()),
            Rc::new(scheduler.clone()),
        );
        let blocks = Rc::new(VecModel::<BlockView>::default());
        ctrl.bind_blocks(blocks.clone(), BlockView::clone);
        ctrl.bootstrap().expect("bootstrap");
        Self {
            ctrl,
            scheduler,
            blocks,
        }
    }

    pub fn block_titles(&self) -> Vec<String> {
        self.blocks.iter().map(|block| block.title).collect()
    }

    pub fn block(&self, id: i32) -> Option<BlockView> {
        self.blocks.iter().find(|block| block.id == id)
    }
}
