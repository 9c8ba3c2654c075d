// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! Pointer positions arrive in surface pixels relative to the top-left corner
//! of an image's display area. Boxes are stored as percentages of that area,
//! so they stay valid whatever size the image is rendered at.

use serde::{Deserialize, Serialize};

/// Boxes narrower or shorter than this (in percent) are never committed.
pub const MIN_BOX_PERCENT: f64 = 2.0;

/// A pointer position in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pos {
    pub x: f64,
    pub y: f64,
}

impl Pos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size of a drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Box geometry in percent of the surface, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxGeometry {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Whether both dimensions reach the commit threshold.
    pub fn meets_threshold(&self) -> bool {
        self.width >= MIN_BOX_PERCENT && self.height >= MIN_BOX_PERCENT
    }

    /// Clamp into the unit square so that `left + width <= 100` and
    /// `top + height <= 100`.
    pub fn clamped(&self) -> Self {
        let left = self.left.clamp(0.0, 100.0);
        let top = self.top.clamp(0.0, 100.0);
        Self {
            left,
            top,
            width: self.width.max(0.0).min(100.0 - left),
            height: self.height.max(0.0).min(100.0 - top),
        }
    }

    /// Whether a percentage point lies inside the box (edges included).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.left + self.width && y >= self.top && y <= self.top + self.height
    }
}

/// Convert a surface pixel position to percent of the surface.
pub fn to_percent(pos: Pos, container: Size) -> (f64, f64) {
    (
        axis_percent(pos.x, container.width),
        axis_percent(pos.y, container.height),
    )
}

fn axis_percent(value: f64, extent: f64) -> f64 {
    if extent <= 0.0 {
        return 0.0;
    }
    value.clamp(0.0, extent) / extent * 100.0
}

/// Compute box geometry from the gesture start and the current pointer.
///
/// Both points are clamped to the surface first, since the pointer may leave
/// the drawing surface during a drag. Used for live preview and for the
/// commit decision alike.
pub fn compute_box(start: Pos, current: Pos, container: Size) -> BoxGeometry {
    let (sx, sy) = to_percent(start, container);
    let (cx, cy) = to_percent(current, container);
    let left = sx.min(cx);
    let top = sy.min(cy);
    BoxGeometry {
        left,
        top,
        width: (cx - sx).abs(),
        height: (cy - sy).abs(),
    }
    .clamped()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> Size {
        Size::new(1000.0, 500.0)
    }

    #[test]
    fn test_compute_box_forward_drag() {
        let geometry = compute_box(Pos::new(100.0, 50.0), Pos::new(500.0, 250.0), surface());
        assert!((geometry.left - 10.0).abs() < 1e-9);
        assert!((geometry.top - 10.0).abs() < 1e-9);
        assert!((geometry.width - 40.0).abs() < 1e-9);
        assert!((geometry.height - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_box_reverse_drag_normalizes_corner() {
        let forward = compute_box(Pos::new(100.0, 50.0), Pos::new(500.0, 250.0), surface());
        let reverse = compute_box(Pos::new(500.0, 250.0), Pos::new(100.0, 50.0), surface());
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_compute_box_clamps_outside_pointer() {
        let geometry = compute_box(Pos::new(900.0, 400.0), Pos::new(1500.0, -80.0), surface());
        assert!((geometry.left - 90.0).abs() < 1e-9);
        assert_eq!(geometry.top, 0.0);
        assert!(geometry.left + geometry.width <= 100.0);
        assert!(geometry.top + geometry.height <= 100.0);
        assert!((geometry.width - 10.0).abs() < 1e-9);
        assert!((geometry.height - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold() {
        assert!(!BoxGeometry::new(0.0, 0.0, 1.0, 1.0).meets_threshold());
        assert!(!BoxGeometry::new(0.0, 0.0, 50.0, 1.99).meets_threshold());
        assert!(BoxGeometry::new(0.0, 0.0, 2.0, 2.0).meets_threshold());
    }

    #[test]
    fn test_zero_sized_surface_yields_empty_box() {
        let geometry = compute_box(Pos::new(1.0, 1.0), Pos::new(5.0, 5.0), Size::new(0.0, 0.0));
        assert_eq!(geometry, BoxGeometry::default());
    }

    #[test]
    fn test_contains_edges() {
        let geometry = BoxGeometry::new(10.0, 10.0, 20.0, 20.0);
        assert!(geometry.contains(10.0, 30.0));
        assert!(!geometry.contains(31.0, 15.0));
    }
}
