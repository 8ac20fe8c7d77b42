use serde::{Deserialize, Serialize};

use crate::hex::HexLayout;

/// Pan/zoom limits. Partial JSON falls back to the defaults field by field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Multiplier applied per zoom-in step.
    pub zoom_in_factor: f64,
    /// Multiplier applied per zoom-out step.
    pub zoom_out_factor: f64,
    /// Smallest pan offset `center_on` will produce.
    pub min_pan_x: f64,
    pub min_pan_y: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.2,
            max_scale: 3.0,
            zoom_in_factor: 1.1,
            zoom_out_factor: 0.9,
            min_pan_x: 50.0,
            min_pan_y: 100.0,
        }
    }
}

impl ViewportConfig {
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Viewport manages the pan/zoom transformation from world coordinates to screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
    config: ViewportConfig,
    drag_anchor: Option<(f64, f64)>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: config.clamp_scale(1.0),
            config,
            drag_anchor: None,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Swap limits and re-clamp the current scale.
    pub fn set_config(&mut self, config: ViewportConfig) {
        self.config = config;
        self.scale = config.clamp_scale(self.scale);
    }

    /// Convert world coordinates to screen coordinates.
    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            wx * self.scale + self.offset_x,
            wy * self.scale + self.offset_y,
        )
    }

    /// Convert screen coordinates to world coordinates.
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.offset_x) / self.scale,
            (sy - self.offset_y) / self.scale,
        )
    }

    /// Zoom toward a focus point (screen coordinates). A negative wheel delta
    /// zooms in, anything else zooms out.
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let direction = if delta < 0.0 {
            ZoomDirection::In
        } else {
            ZoomDirection::Out
        };
        self.zoom_step(direction, screen_x, screen_y);
    }

    /// One discrete zoom step about a focus point, as used by the keyboard.
    pub fn zoom_step(&mut self, direction: ZoomDirection, screen_x: f64, screen_y: f64) {
        let factor = match direction {
            ZoomDirection::In => self.config.zoom_in_factor,
            ZoomDirection::Out => self.config.zoom_out_factor,
        };
        let new_scale = self.config.clamp_scale(self.scale * factor);
        if new_scale == self.scale {
            return;
        }
        let ratio = new_scale / self.scale;

        // Adjust offset so the point under the cursor stays fixed
        self.offset_x = screen_x - (screen_x - self.offset_x) * ratio;
        self.offset_y = screen_y - (screen_y - self.offset_y) * ratio;
        self.scale = new_scale;
    }

    /// Pan by screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    pub fn begin_drag(&mut self, pointer_x: f64, pointer_y: f64) {
        self.drag_anchor = Some((pointer_x - self.offset_x, pointer_y - self.offset_y));
    }

    /// No-op unless a drag is in progress.
    pub fn continue_drag(&mut self, pointer_x: f64, pointer_y: f64) {
        if let Some((anchor_x, anchor_y)) = self.drag_anchor {
            self.offset_x = pointer_x - anchor_x;
            self.offset_y = pointer_y - anchor_y;
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// Center the grid's bounding box in the container, never placing it
    /// closer to the top-left than the configured floor.
    pub fn center_on(
        &mut self,
        rows: u32,
        cols: u32,
        layout: &HexLayout,
        container_w: f64,
        container_h: f64,
    ) {
        let (grid_w, grid_h) = layout.bounding_size(rows, cols);
        let centered_x = (container_w - grid_w * self.scale) / 2.0;
        let centered_y = (container_h - grid_h * self.scale) / 2.0;
        self.offset_x = centered_x.max(self.config.min_pan_x);
        self.offset_y = centered_y.max(self.config.min_pan_y);
    }

    /// Scale as a whole percentage, for the zoom hint.
    pub fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-6,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    #[test]
    fn zoom_keeps_focus_point_fixed() {
        for start in [0.2, 0.35, 1.0, 2.5, 3.0] {
            for delta in [-120.0, 120.0] {
                let mut viewport = Viewport::default();
                viewport.scale = start;
                viewport.offset_x = 40.0;
                viewport.offset_y = -25.0;
                let focus = (310.0, 220.0);
                let world_before = viewport.screen_to_world(focus.0, focus.1);
                viewport.zoom_at(delta, focus.0, focus.1);
                let world_after = viewport.screen_to_world(focus.0, focus.1);
                assert_close(world_after.0, world_before.0);
                assert_close(world_after.1, world_before.1);
                assert!(viewport.offset_x.is_finite() && viewport.offset_y.is_finite());
            }
        }
    }

    #[test]
    fn zoom_direction_follows_delta_sign() {
        let mut viewport = Viewport::default();
        viewport.zoom_at(-1.0, 0.0, 0.0);
        assert_close(viewport.scale, 1.1);
        viewport.zoom_at(1.0, 0.0, 0.0);
        assert_close(viewport.scale, 0.99);
    }

    #[test]
    fn scale_clamps_at_both_bounds() {
        let mut viewport = Viewport::default();
        for _ in 0..100 {
            viewport.zoom_step(ZoomDirection::In, 10.0, 10.0);
        }
        assert_close(viewport.scale, 3.0);
        let pinned = viewport.clone();
        viewport.zoom_step(ZoomDirection::In, 10.0, 10.0);
        assert_eq!(viewport, pinned);

        for _ in 0..100 {
            viewport.zoom_step(ZoomDirection::Out, 500.0, 500.0);
        }
        assert_close(viewport.scale, 0.2);
        let pinned = viewport.clone();
        viewport.zoom_step(ZoomDirection::Out, 500.0, 500.0);
        assert_eq!(viewport, pinned);
        assert_eq!(viewport.zoom_percent(), 20);
    }

    #[test]
    fn drag_tracks_pointer_from_anchor() {
        let mut viewport = Viewport::default();
        viewport.offset_x = 10.0;
        viewport.offset_y = 20.0;

        viewport.continue_drag(400.0, 400.0);
        assert_eq!((viewport.offset_x, viewport.offset_y), (10.0, 20.0));

        viewport.begin_drag(100.0, 100.0);
        assert!(viewport.is_dragging());
        viewport.continue_drag(130.0, 90.0);
        assert_eq!((viewport.offset_x, viewport.offset_y), (40.0, 10.0));
        viewport.continue_drag(100.0, 100.0);
        assert_eq!((viewport.offset_x, viewport.offset_y), (10.0, 20.0));

        viewport.end_drag();
        viewport.continue_drag(0.0, 0.0);
        assert_eq!((viewport.offset_x, viewport.offset_y), (10.0, 20.0));
    }

    #[test]
    fn center_on_floors_pan() {
        let mut viewport = Viewport::default();
        let layout = HexLayout::new(70.0);
        viewport.center_on(10, 10, &layout, 1000.0, 800.0);
        let (grid_w, _) = layout.bounding_size(10, 10);
        assert_close(viewport.offset_x, (1000.0 - grid_w) / 2.0);
        assert_close(viewport.offset_y, 100.0);

        viewport.center_on(10, 10, &layout, 300.0, 300.0);
        assert_close(viewport.offset_x, 50.0);
        assert_close(viewport.offset_y, 100.0);
    }

    #[test]
    fn world_screen_round_trip() {
        let mut viewport = Viewport::default();
        viewport.scale = 1.7;
        viewport.pan(12.0, -8.0);
        let (sx, sy) = viewport.world_to_screen(100.0, 50.0);
        let (wx, wy) = viewport.screen_to_world(sx, sy);
        assert_close(wx, 100.0);
        assert_close(wy, 50.0);
    }

    #[test]
    fn config_accepts_partial_json() {
        let config: ViewportConfig = serde_json::from_str(r#"{"max_scale": 5.0}"#).unwrap();
        assert_eq!(config.max_scale, 5.0);
        assert_eq!(config.min_scale, 0.2);

        let mut viewport = Viewport::default();
        viewport.scale = 3.0;
        viewport.set_config(ViewportConfig {
            max_scale: 2.0,
            ..ViewportConfig::default()
        });
        assert_close(viewport.scale, 2.0);
    }
}
