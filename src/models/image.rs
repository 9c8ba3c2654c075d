// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image and bounding box data structures.
//!
//! An image owns its boxes exclusively. Box coordinates are percentages of
//! the image's display area (see [`crate::util::geometry`]).

use super::class::{ClassId, Color};
use crate::util::geometry::BoxGeometry;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of an imported image.
pub type ImageId = Uuid;

/// Identifier of a box within an image.
pub type BoxId = Uuid;

/// Displayable image data as it was imported.
///
/// The encoded file bytes are kept for export; the decoded RGBA pixels are
/// what the canvas uploads as a texture.
#[derive(Debug, Clone)]
pub struct PixelSource {
    pub media_type: String,
    pub encoded: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
}

/// An axis-aligned box tagged with a class.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub id: BoxId,
    pub class_id: ClassId,
    /// Copy of the class color, rewritten whenever the class is edited.
    pub color: Color,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    pub fn new(class_id: ClassId, color: Color, geometry: BoxGeometry) -> Self {
        Self {
            id: Uuid::new_v4(),
            class_id,
            color,
            x: geometry.left,
            y: geometry.top,
            w: geometry.width,
            h: geometry.height,
        }
    }

    pub fn geometry(&self) -> BoxGeometry {
        BoxGeometry::new(self.x, self.y, self.w, self.h)
    }
}

/// An imported image with its annotations.
#[derive(Debug, Clone)]
pub struct Image {
    pub id: ImageId,
    pub name: String,
    pub pixels: PixelSource,
    pub boxes: Vec<BoundingBox>,
}

impl Image {
    pub fn new(name: impl Into<String>, pixels: PixelSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            pixels,
            boxes: Vec::new(),
        }
    }

    pub fn find_box(&self, box_id: BoxId) -> Option<&BoundingBox> {
        self.boxes.iter().find(|b| b.id == box_id)
    }

    /// Topmost box under a percentage point. Later boxes paint on top.
    pub fn box_at(&self, x: f64, y: f64) -> Option<&BoundingBox> {
        self.boxes.iter().rev().find(|b| b.geometry().contains(x, y))
    }
}

#[cfg(test)]
pub(crate) fn test_pixels() -> PixelSource {
    PixelSource {
        media_type: "image/png".to_string(),
        encoded: Arc::from(vec![0u8; 4]),
        width: 1,
        height: 1,
        rgba: Arc::from(vec![0u8; 4]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::class::PALETTE;

    #[test]
    fn test_box_at_prefers_topmost() {
        let mut image = Image::new("a.png", test_pixels());
        let class_id = Uuid::new_v4();
        let lower = BoundingBox::new(class_id, PALETTE[0], BoxGeometry::new(0.0, 0.0, 50.0, 50.0));
        let upper = BoundingBox::new(class_id, PALETTE[1], BoxGeometry::new(20.0, 20.0, 50.0, 50.0));
        let upper_id = upper.id;
        image.boxes.push(lower);
        image.boxes.push(upper);

        assert_eq!(image.box_at(30.0, 30.0).map(|b| b.id), Some(upper_id));
        assert!(image.box_at(90.0, 90.0).is_none());
    }
}
