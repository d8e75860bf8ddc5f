//! Connector curves between an item's output anchor and a block's input anchor.

use crate::config::RouteConfig;
use crate::geometry::{clamp, Point};

/// Cubic bezier curve of one connector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicBezier {
    pub p0: (f32, f32),
    pub p1: (f32, f32),
    pub p2: (f32, f32),
    pub p3: (f32, f32),
}

impl CubicBezier {
    /// Route a connector from `start` (output anchor) to `end` (input anchor).
    ///
    /// When the child sits level with or left of the output anchor, both
    /// control points share the horizontal midpoint so the curve turns through
    /// a vertical run instead of looping back. Otherwise the control points
    /// bend outward horizontally by a clamped fraction of the distance.
    pub fn route(start: Point, end: Point, config: &RouteConfig) -> Self {
        let dx = end.x - start.x;
        let (c1x, c2x) = if dx <= config.reversal_threshold {
            let mid_x = ((start.x + end.x) / 2.0).round();
            (mid_x, mid_x)
        } else {
            let bend = clamp(dx * config.bend_factor, config.bend_min, config.bend_max).round();
            (start.x + bend, end.x - bend)
        };
        Self {
            p0: (start.x, start.y),
            p1: (c1x, start.y),
            p2: (c2x, end.y),
            p3: (end.x, end.y),
        }
    }

    /// Evaluate the curve at `t` in `[0, 1]`.
    pub fn eval(&self, t: f32) -> (f32, f32) {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * self.p0.0 + 3.0 * mt2 * t * self.p1.0 + 3.0 * mt * t2 * self.p2.0 + t3 * self.p3.0;
        let y = mt3 * self.p0.1 + 3.0 * mt2 * t * self.p1.1 + 3.0 * mt * t2 * self.p2.1 + t3 * self.p3.1;
        (x, y)
    }

    /// SVG path command, e.g. `"M 10 20 C 60 20 90 80 140 80"`.
    pub fn to_path_commands(&self) -> String {
        format!(
            "M {} {} C {} {} {} {} {} {}",
            self.p0.0, self.p0.1, self.p1.0, self.p1.1, self.p2.0, self.p2.1, self.p3.0, self.p3.1
        )
    }
}

/// Path commands for a connector between two anchors.
pub fn generate_connector_path(start: Point, end: Point, config: &RouteConfig) -> String {
    CubicBezier::route(start, end, config).to_path_commands()
}
