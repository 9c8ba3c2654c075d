// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Entity store for classes, images and boxes.
//!
//! The store is the single source of truth for what exists. It keeps
//! referential integrity: a box never outlives its class, and class color
//! edits are written through to every box that carries the class.

use super::class::{Class, ClassId, Color};
use super::image::{BoundingBox, BoxId, Image, ImageId, PixelSource};
use crate::error::{EditorError, EditorResult};
use crate::util::geometry::BoxGeometry;

/// In-memory collections of classes and images.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    classes: Vec<Class>,
    images: Vec<Image>,
    /// Class new boxes are tagged with.
    active_class: Option<ClassId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn class(&self, id: ClassId) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn active_class_id(&self) -> Option<ClassId> {
        self.active_class
    }

    pub fn active_class(&self) -> Option<&Class> {
        self.active_class.and_then(|id| self.class(id))
    }

    /// Make `id` the class new boxes are tagged with.
    pub fn set_active_class(&mut self, id: ClassId) -> EditorResult<()> {
        if self.class(id).is_none() {
            return Err(EditorError::NotFound(format!("Class {}", id)));
        }
        self.active_class = Some(id);
        Ok(())
    }

    fn label_taken(&self, label: &str, except: Option<ClassId>) -> bool {
        self.classes
            .iter()
            .any(|c| Some(c.id) != except && c.label_matches(label))
    }

    /// Create a class. Becomes active if no class is active yet.
    pub fn add_class(&mut self, label: &str, color: Color) -> EditorResult<Class> {
        let label = validate_label(label)?;
        if self.label_taken(label, None) {
            return Err(EditorError::DuplicateLabel(label.to_string()));
        }

        let class = Class::new(label, color);
        self.classes.push(class.clone());
        if self.active_class.is_none() {
            self.active_class = Some(class.id);
        }
        log::info!("Added class \"{}\", total: {}", class.label, self.classes.len());
        Ok(class)
    }

    /// Insert a class keeping its id. Used when restoring transferred classes.
    pub(crate) fn insert_class(&mut self, class: Class) -> EditorResult<()> {
        if self.class(class.id).is_some() {
            return Err(EditorError::ValidationFailed(format!(
                "Class id {} is already in use",
                class.id
            )));
        }
        if self.label_taken(&class.label, None) {
            return Err(EditorError::DuplicateLabel(class.label));
        }
        if self.active_class.is_none() {
            self.active_class = Some(class.id);
        }
        self.classes.push(class);
        Ok(())
    }

    /// Rename and recolor a class. Returns the number of recolored boxes.
    pub fn update_class(&mut self, id: ClassId, label: &str, color: Color) -> EditorResult<usize> {
        if self.class(id).is_none() {
            return Err(EditorError::NotFound(format!("Class {}", id)));
        }
        let label = validate_label(label)?;
        if self.label_taken(label, Some(id)) {
            return Err(EditorError::DuplicateLabel(label.to_string()));
        }

        if let Some(class) = self.classes.iter_mut().find(|c| c.id == id) {
            class.label = label.to_string();
            class.color = color;
        }

        let mut recolored = 0;
        for image in &mut self.images {
            for bbox in image.boxes.iter_mut().filter(|b| b.class_id == id) {
                bbox.color = color;
                recolored += 1;
            }
        }
        log::info!("Updated class \"{}\", recolored {} box(es)", label, recolored);
        Ok(recolored)
    }

    /// Remove a class and every box tagged with it. No-op if absent.
    pub fn remove_class(&mut self, id: ClassId) -> Option<Class> {
        let index = self.classes.iter().position(|c| c.id == id)?;
        let class = self.classes.remove(index);

        let mut removed_boxes = 0;
        for image in &mut self.images {
            let before = image.boxes.len();
            image.boxes.retain(|b| b.class_id != id);
            removed_boxes += before - image.boxes.len();
        }

        if self.active_class == Some(id) {
            self.active_class = self.classes.first().map(|c| c.id);
        }
        log::info!(
            "Removed class \"{}\" and {} box(es), classes left: {}",
            class.label,
            removed_boxes,
            self.classes.len()
        );
        Some(class)
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    /// Images in display (insertion) order.
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.images.iter().find(|i| i.id == id)
    }

    pub fn contains_image(&self, id: ImageId) -> bool {
        self.image(id).is_some()
    }

    pub fn contains_box(&self, image_id: ImageId, box_id: BoxId) -> bool {
        self.image(image_id)
            .is_some_and(|image| image.find_box(box_id).is_some())
    }

    /// Append an imported image.
    pub fn add_image(&mut self, name: &str, pixels: PixelSource) -> ImageId {
        let image = Image::new(name, pixels);
        let id = image.id;
        self.images.push(image);
        log::info!("Added image \"{}\", total: {}", name, self.images.len());
        id
    }

    /// Remove an image with its boxes. No-op if absent.
    pub fn remove_image(&mut self, id: ImageId) -> Option<Image> {
        let index = self.images.iter().position(|i| i.id == id)?;
        let image = self.images.remove(index);
        log::info!("Removed image \"{}\", total: {}", image.name, self.images.len());
        Some(image)
    }

    // ------------------------------------------------------------------
    // Boxes
    // ------------------------------------------------------------------

    /// Append a box with the class's current color.
    ///
    /// Sub-threshold geometry is discarded without error (`Ok(None)`).
    pub fn add_box(
        &mut self,
        image_id: ImageId,
        class_id: ClassId,
        geometry: BoxGeometry,
    ) -> EditorResult<Option<BoxId>> {
        let color = self
            .class(class_id)
            .map(|c| c.color)
            .ok_or_else(|| EditorError::NotFound(format!("Class {}", class_id)))?;
        let image = self
            .images
            .iter_mut()
            .find(|i| i.id == image_id)
            .ok_or_else(|| EditorError::NotFound(format!("Image {}", image_id)))?;

        let geometry = geometry.clamped();
        if !geometry.meets_threshold() {
            log::debug!(
                "Discarded box {:.2}x{:.2}% below threshold",
                geometry.width,
                geometry.height
            );
            return Ok(None);
        }

        let bbox = BoundingBox::new(class_id, color, geometry);
        let id = bbox.id;
        image.boxes.push(bbox);
        log::info!("Added box to \"{}\", total: {}", image.name, image.boxes.len());
        Ok(Some(id))
    }

    /// Remove a box. No-op if absent.
    pub fn remove_box(&mut self, image_id: ImageId, box_id: BoxId) -> Option<BoundingBox> {
        let image = self.images.iter_mut().find(|i| i.id == image_id)?;
        let index = image.boxes.iter().position(|b| b.id == box_id)?;
        let bbox = image.boxes.remove(index);
        log::info!("Removed box from \"{}\", total: {}", image.name, image.boxes.len());
        Some(bbox)
    }
}

fn validate_label(label: &str) -> EditorResult<&str> {
    let label = label.trim();
    if label.is_empty() {
        return Err(EditorError::ValidationFailed(
            "Class name must not be empty".to_string(),
        ));
    }
    Ok(label)
}
