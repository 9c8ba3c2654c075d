// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation editor state.
//!
//! [`Editor`] bundles the entity store, the selection and the drawing gesture
//! of one annotation page. Every user operation goes through it so the
//! cross-component rules (selection pruning, gesture cancellation) are
//! applied in one place.

pub mod drawing;
pub mod selection;

use crate::error::{EditorError, EditorResult};
use crate::io::export::ExportRequest;
use crate::io::transfer::RestoredClasses;
use crate::models::class::{Class, ClassId, Color};
use crate::models::image::{BoxId, ImageId, PixelSource};
use crate::models::store::EntityStore;
use crate::util::geometry::{BoxGeometry, Pos, Size};
use drawing::{DrawOutcome, DrawingMachine};
use selection::Selection;

/// Result of merging transferred classes into an editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefillSummary {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// State of one annotation page.
#[derive(Debug, Default)]
pub struct Editor {
    store: EntityStore,
    selection: Selection,
    drawing: DrawingMachine,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn drawing(&self) -> &DrawingMachine {
        &self.drawing
    }

    /// Drop selection entries that no longer resolve. Called every frame.
    pub fn reconcile(&mut self) {
        self.selection.reconcile(&self.store);
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    pub fn add_class(&mut self, label: &str, color: Color) -> EditorResult<Class> {
        self.store.add_class(label, color)
    }

    /// Color suggested for the next class.
    pub fn next_class_color(&self) -> Color {
        Color::from_palette(self.store.classes().len())
    }

    pub fn update_class(&mut self, id: ClassId, label: &str, color: Color) -> EditorResult<usize> {
        self.store.update_class(id, label, color)
    }

    pub fn remove_class(&mut self, id: ClassId) -> Option<Class> {
        let removed = self.store.remove_class(id)?;
        self.selection.reconcile(&self.store);
        Some(removed)
    }

    pub fn set_active_class(&mut self, id: ClassId) -> EditorResult<()> {
        self.store.set_active_class(id)
    }

    /// Merge classes handed over from another page.
    ///
    /// A class with a known id is relabeled and recolored, a class whose
    /// label is already taken is skipped, anything else is added with its
    /// original id.
    pub fn prefill_classes(&mut self, restored: RestoredClasses) -> PrefillSummary {
        let mut summary = PrefillSummary::default();
        for class in restored.classes {
            let result = if self.store.class(class.id).is_some() {
                self.store
                    .update_class(class.id, &class.label, class.color)
                    .map(|_| summary.updated += 1)
            } else {
                self.store.insert_class(class).map(|_| summary.added += 1)
            };
            if let Err(e) = result {
                log::debug!("Skipped transferred class: {}", e);
                summary.skipped += 1;
            }
        }

        let restored_active = restored
            .active_class_id
            .filter(|id| self.store.class(*id).is_some());
        if let Some(id) = restored_active {
            // Existence checked just above
            let _ = self.store.set_active_class(id);
        }
        log::info!(
            "Prefilled classes: {} added, {} updated, {} skipped",
            summary.added,
            summary.updated,
            summary.skipped
        );
        summary
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    pub fn add_image(&mut self, name: &str, pixels: PixelSource) -> ImageId {
        self.store.add_image(name, pixels)
    }

    pub fn remove_image(&mut self, id: ImageId) -> bool {
        self.drawing.cancel_on_image(id);
        self.selection.prune_image(id);
        self.store.remove_image(id).is_some()
    }

    pub fn toggle_image_selection(&mut self, id: ImageId, included: bool) {
        self.selection.toggle_image_selection(id, included);
    }

    pub fn select_all_images(&mut self) {
        self.selection.select_all_images(&self.store);
    }

    pub fn clear_image_selection(&mut self) {
        self.selection.clear_image_selection();
    }

    /// Remove every selected image. Returns how many were removed.
    pub fn delete_selected_images(&mut self) -> EditorResult<usize> {
        if self.selection.selected_images().is_empty() {
            return Err(EditorError::NothingSelected);
        }
        let ids: Vec<ImageId> = self.selection.selected_images().iter().copied().collect();
        let removed = ids.into_iter().filter(|id| self.remove_image(*id)).count();
        self.selection.clear_image_selection();
        log::info!("Deleted {} selected image(s)", removed);
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Boxes
    // ------------------------------------------------------------------

    pub fn add_box(
        &mut self,
        image_id: ImageId,
        class_id: ClassId,
        geometry: BoxGeometry,
    ) -> EditorResult<Option<BoxId>> {
        self.store.add_box(image_id, class_id, geometry)
    }

    pub fn select_box(&mut self, image_id: ImageId, box_id: BoxId) {
        self.selection.select_box(image_id, box_id);
    }

    pub fn clear_box_selection(&mut self) {
        self.selection.clear_box_selection();
    }

    pub fn remove_box(&mut self, image_id: ImageId, box_id: BoxId) -> bool {
        self.selection.prune_box(image_id, box_id);
        self.store.remove_box(image_id, box_id).is_some()
    }

    /// Remove the box that currently shows the delete affordance.
    pub fn remove_active_box(&mut self) -> bool {
        match self.selection.active_box() {
            Some(r) => self.remove_box(r.image_id, r.box_id),
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    pub fn pointer_down(&mut self, image_id: ImageId, pos: Pos, container: Size) -> EditorResult<()> {
        self.drawing
            .pointer_down(&self.store, &mut self.selection, image_id, pos, container)
    }

    pub fn pointer_move(&mut self, pos: Pos) -> Option<BoxGeometry> {
        self.drawing.pointer_move(pos)
    }

    pub fn pointer_up(&mut self, pos: Pos) -> EditorResult<Option<DrawOutcome>> {
        self.drawing.pointer_up(&mut self.store, pos)
    }

    pub fn pointer_leave(&mut self) -> Option<DrawOutcome> {
        self.drawing.pointer_leave()
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    pub fn export_request(&self) -> ExportRequest {
        ExportRequest::from_store(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::class::PALETTE;
    use crate::models::image::test_pixels;

    fn surface() -> Size {
        Size::new(1000.0, 1000.0)
    }

    /// Drag between two points given in percent of a 1000x1000 surface.
    fn drag(editor: &mut Editor, image_id: ImageId, from: (f64, f64), to: (f64, f64)) -> Option<DrawOutcome> {
        editor
            .pointer_down(image_id, Pos::new(from.0 * 10.0, from.1 * 10.0), surface())
            .unwrap();
        editor.pointer_move(Pos::new(to.0 * 10.0, to.1 * 10.0));
        editor
            .pointer_up(Pos::new(to.0 * 10.0, to.1 * 10.0))
            .unwrap()
    }

    #[test]
    fn test_draw_then_delete_class_scenario() {
        let mut editor = Editor::new();
        let cat = editor.add_class("cat", PALETTE[0]).unwrap();
        editor.add_class("dog", PALETTE[1]).unwrap();
        let image_id = editor.add_image("a.png", test_pixels());
        assert_eq!(editor.store().active_class_id(), Some(cat.id));

        let outcome = drag(&mut editor, image_id, (10.0, 10.0), (50.0, 50.0));
        assert!(matches!(outcome, Some(DrawOutcome::Committed(_))));

        let boxes = &editor.store().image(image_id).unwrap().boxes;
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].class_id, cat.id);
        assert!((boxes[0].x - 10.0).abs() < 1e-9);
        assert!((boxes[0].y - 10.0).abs() < 1e-9);
        assert!((boxes[0].w - 40.0).abs() < 1e-9);
        assert!((boxes[0].h - 40.0).abs() < 1e-9);

        editor.remove_class(cat.id);
        assert!(editor.store().image(image_id).unwrap().boxes.is_empty());
    }

    #[test]
    fn test_duplicate_class_scenario() {
        let mut editor = Editor::new();
        editor.add_class("cat", PALETTE[0]).unwrap();
        let result = editor.add_class("Cat", PALETTE[1]);
        assert!(matches!(result, Err(EditorError::DuplicateLabel(_))));
        assert_eq!(editor.store().classes().len(), 1);
    }

    #[test]
    fn test_tiny_drag_scenario() {
        let mut editor = Editor::new();
        editor.add_class("cat", PALETTE[0]).unwrap();
        let image_id = editor.add_image("a.png", test_pixels());
        let outcome = drag(&mut editor, image_id, (0.0, 0.0), (1.0, 1.0));
        assert_eq!(outcome, Some(DrawOutcome::Cancelled));
        assert!(editor.store().image(image_id).unwrap().boxes.is_empty());
    }

    #[test]
    fn test_bulk_delete_scenario() {
        let mut editor = Editor::new();
        let class = editor.add_class("cat", PALETTE[0]).unwrap();
        let ids: Vec<ImageId> = (0..5)
            .map(|i| editor.add_image(&format!("{}.png", i), test_pixels()))
            .collect();
        let box_id = editor
            .add_box(ids[1], class.id, BoxGeometry::new(5.0, 5.0, 20.0, 20.0))
            .unwrap()
            .unwrap();
        editor.select_box(ids[1], box_id);
        for id in &ids[0..3] {
            editor.toggle_image_selection(*id, true);
        }

        assert_eq!(editor.delete_selected_images(), Ok(3));
        assert_eq!(editor.store().images().len(), 2);
        assert!(editor.selection().selected_images().is_empty());
        assert!(editor.selection().active_box().is_none());
    }

    #[test]
    fn test_delete_selected_requires_selection() {
        let mut editor = Editor::new();
        editor.add_image("a.png", test_pixels());
        assert_eq!(editor.delete_selected_images(), Err(EditorError::NothingSelected));
        assert_eq!(editor.store().images().len(), 1);
    }

    #[test]
    fn test_remove_class_clears_selected_box_of_that_class() {
        let mut editor = Editor::new();
        let cat = editor.add_class("cat", PALETTE[0]).unwrap();
        let image_id = editor.add_image("a.png", test_pixels());
        let box_id = editor
            .add_box(image_id, cat.id, BoxGeometry::new(5.0, 5.0, 20.0, 20.0))
            .unwrap()
            .unwrap();
        editor.select_box(image_id, box_id);
        editor.remove_class(cat.id);
        assert!(editor.selection().active_box().is_none());
    }

    #[test]
    fn test_remove_active_box() {
        let mut editor = Editor::new();
        let cat = editor.add_class("cat", PALETTE[0]).unwrap();
        let image_id = editor.add_image("a.png", test_pixels());
        let box_id = editor
            .add_box(image_id, cat.id, BoxGeometry::new(5.0, 5.0, 20.0, 20.0))
            .unwrap()
            .unwrap();
        assert!(!editor.remove_active_box());
        editor.select_box(image_id, box_id);
        assert!(editor.remove_active_box());
        assert!(editor.store().image(image_id).unwrap().boxes.is_empty());
        assert!(editor.selection().active_box().is_none());
    }

    #[test]
    fn test_removing_image_mid_gesture_cancels_it() {
        let mut editor = Editor::new();
        editor.add_class("cat", PALETTE[0]).unwrap();
        let image_id = editor.add_image("a.png", test_pixels());
        editor.pointer_down(image_id, Pos::new(10.0, 10.0), surface()).unwrap();
        editor.remove_image(image_id);
        assert!(!editor.drawing().is_drawing());
        assert_eq!(editor.pointer_up(Pos::new(500.0, 500.0)), Ok(None));
    }

    #[test]
    fn test_import_during_gesture_is_independent() {
        let mut editor = Editor::new();
        editor.add_class("cat", PALETTE[0]).unwrap();
        let first = editor.add_image("a.png", test_pixels());
        editor.pointer_down(first, Pos::new(100.0, 100.0), surface()).unwrap();
        let second = editor.add_image("b.png", test_pixels());
        editor.pointer_up(Pos::new(400.0, 400.0)).unwrap();
        assert_eq!(editor.store().image(first).unwrap().boxes.len(), 1);
        assert!(editor.store().image(second).unwrap().boxes.is_empty());
    }

    #[test]
    fn test_prefill_merges_classes() {
        let mut editor = Editor::new();
        let existing = editor.add_class("cat", PALETTE[0]).unwrap();

        let renamed = Class {
            id: existing.id,
            label: "kitten".to_string(),
            color: PALETTE[4],
        };
        let clash = Class::new("KITTEN", PALETTE[5]);
        let fresh = Class::new("dog", PALETTE[6]);
        let summary = editor.prefill_classes(RestoredClasses {
            classes: vec![renamed, clash, fresh.clone()],
            active_class_id: Some(fresh.id),
        });

        assert_eq!(summary, PrefillSummary { added: 1, updated: 1, skipped: 1 });
        let labels: Vec<&str> = editor.store().classes().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["kitten", "dog"]);
        assert_eq!(editor.store().class(fresh.id).map(|c| c.color), Some(PALETTE[6]));
        assert_eq!(editor.store().active_class_id(), Some(fresh.id));
    }

    #[test]
    fn test_prefill_into_empty_editor_activates_first() {
        let mut editor = Editor::new();
        let first = Class::new("cat", PALETTE[0]);
        editor.prefill_classes(RestoredClasses {
            classes: vec![first.clone(), Class::new("dog", PALETTE[1])],
            active_class_id: None,
        });
        assert_eq!(editor.store().active_class_id(), Some(first.id));
    }

    #[test]
    fn test_next_class_color_rotates() {
        let mut editor = Editor::new();
        assert_eq!(editor.next_class_color(), PALETTE[0]);
        editor.add_class("cat", PALETTE[0]).unwrap();
        assert_eq!(editor.next_class_color(), PALETTE[1]);
    }
}
