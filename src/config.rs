//! Tunables for layout, connector routing, dragging and content builders.
//!
//! Every struct implements [`Default`] with the values the diagram was tuned
//! with, and deserializes with `#[serde(default)]` so a host only has to
//! override what it cares about:
//!
//! ```ignore
//! let config = MindMapConfig::from_json_str(r#"{ "layout": { "column_gap": 96 } }"#)?;
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MindMapConfig {
    pub layout: LayoutConfig,
    pub route: RouteConfig,
    pub drag: DragConfig,
    pub builder: BuilderConfig,
}

impl MindMapConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MindMapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the layout and snap searches cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        positive("layout.push_step", layout.push_step)?;
        positive("layout.row_height", layout.row_height)?;
        positive("layout.min_width", layout.min_width)?;
        if layout.max_width < layout.min_width {
            return Err(ConfigError::Invalid {
                field: "layout.max_width",
                reason: format!("{} is below min_width {}", layout.max_width, layout.min_width),
            });
        }
        if layout.max_height < layout.min_height || layout.max_source_height < layout.min_height {
            return Err(ConfigError::Invalid {
                field: "layout.max_height",
                reason: "height caps must not be below min_height".into(),
            });
        }
        non_negative("layout.overlap_gap", layout.overlap_gap)?;
        non_negative("layout.column_gap", layout.column_gap)?;

        let route = &self.route;
        if route.bend_max < route.bend_min {
            return Err(ConfigError::Invalid {
                field: "route.bend_max",
                reason: format!("{} is below bend_min {}", route.bend_max, route.bend_min),
            });
        }
        non_negative("route.bend_factor", route.bend_factor)?;

        let drag = &self.drag;
        positive("drag.step_y", drag.step_y)?;
        positive("drag.step_x", drag.step_x)?;
        if drag.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "drag.frame_interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be positive, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must not be negative, got {value}"),
        })
    }
}

/// Column placement, overlap resolution and size estimation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub left_pad: f32,
    pub top_pad: f32,
    /// Horizontal gap between depth columns.
    pub column_gap: f32,
    /// Vertical gap between stacked blocks in one column.
    pub row_gap: f32,
    /// Margin two blocks must keep during overlap resolution.
    pub overlap_gap: f32,
    pub push_step: f32,
    /// Pushes tried per block before residual overlap is accepted.
    pub overlap_attempts: usize,
    pub board_margin: f32,
    pub min_board_width: f32,
    pub min_board_height: f32,
    /// Size used for blocks that have not been laid out yet.
    pub fallback_width: f32,
    pub fallback_height: f32,

    pub min_label_chars: usize,
    pub base_width: f32,
    pub width_per_char: f32,
    pub min_width: f32,
    pub max_width: f32,
    pub header_height: f32,
    pub row_height: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub max_source_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            left_pad: 24.0,
            top_pad: 18.0,
            column_gap: 76.0,
            row_gap: 18.0,
            overlap_gap: 10.0,
            push_step: 18.0,
            overlap_attempts: 200,
            board_margin: 40.0,
            min_board_width: 860.0,
            min_board_height: 520.0,
            fallback_width: 340.0,
            fallback_height: 120.0,
            min_label_chars: 16,
            base_width: 210.0,
            width_per_char: 3.2,
            min_width: 300.0,
            max_width: 560.0,
            header_height: 50.0,
            row_height: 24.0,
            min_height: 112.0,
            max_height: 500.0,
            max_source_height: 620.0,
        }
    }
}

/// Connector curve shape and styling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Horizontal delta at or below which the midpoint routing is used.
    pub reversal_threshold: f32,
    pub bend_factor: f32,
    pub bend_min: f32,
    pub bend_max: f32,
    pub marker_radius: f32,
    pub stroke_width: f32,
    /// Input anchor offset from the block top when no header was measured.
    pub header_fallback: f32,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            reversal_threshold: 8.0,
            bend_factor: 0.42,
            bend_min: 28.0,
            bend_max: 180.0,
            marker_radius: 2.0,
            stroke_width: 1.6,
            header_fallback: 24.0,
        }
    }
}

/// Drag snapping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    pub overlap_gap: f32,
    pub step_y: f32,
    /// Shift applied when the downward probe wraps to the next band.
    pub step_x: f32,
    pub attempts: usize,
    /// Distance kept from the right and bottom board edges.
    pub edge_inset: f32,
    pub frame_interval_ms: u64,
}

impl DragConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            overlap_gap: 8.0,
            step_y: 18.0,
            step_x: 26.0,
            attempts: 420,
            edge_inset: 4.0,
            frame_interval_ms: 16,
        }
    }
}

/// Fan-out limits of the content builders.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Peer parameters listed in a sibling block before the overflow row.
    pub peer_limit: usize,
    /// Other sibling functions offered as jumps from a source block.
    pub function_jump_limit: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            peer_limit: 6,
            function_jump_limit: 4,
        }
    }
}
