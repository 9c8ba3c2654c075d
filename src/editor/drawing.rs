// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Box drawing gesture state machine.
//!
//! `Idle -> Drawing -> {Committed, Cancelled} -> Idle`. The committed and
//! cancelled states are transient: they are reported as a [`DrawOutcome`]
//! and the machine is back in `Idle` when the call returns.

use super::selection::{BoxRef, Selection};
use crate::error::{EditorError, EditorResult};
use crate::models::class::{ClassId, Color};
use crate::models::image::ImageId;
use crate::models::store::EntityStore;
use crate::util::geometry::{compute_box, BoxGeometry, Pos, Size};

/// A drawing gesture in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub image_id: ImageId,
    pub class_id: ClassId,
    /// Color of the live preview rectangle.
    pub color: Color,
    pub start: Pos,
    pub container: Size,
    /// Live preview geometry, recomputed on every pointer move.
    pub preview: BoxGeometry,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DrawState {
    #[default]
    Idle,
    Drawing(Gesture),
}

/// How a gesture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Committed(BoxRef),
    Cancelled,
}

/// Single drawing gesture shared by all image surfaces.
///
/// Pointer input is serialized, so at most one surface is ever mid-draw.
#[derive(Debug, Clone, Default)]
pub struct DrawingMachine {
    state: DrawState,
}

impl DrawingMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        match &self.state {
            DrawState::Drawing(gesture) => Some(gesture),
            DrawState::Idle => None,
        }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Drawing(_))
    }

    /// Pointer-down on empty canvas.
    ///
    /// Rejected (staying `Idle`) when there is no active class to tag the box
    /// with. On entry the box selection is cleared.
    pub fn pointer_down(
        &mut self,
        store: &EntityStore,
        selection: &mut Selection,
        image_id: ImageId,
        pos: Pos,
        container: Size,
    ) -> EditorResult<()> {
        if store.classes().is_empty() {
            return Err(EditorError::ValidationFailed(
                "Add a class before drawing boxes".to_string(),
            ));
        }
        let class = store.active_class().ok_or_else(|| {
            EditorError::ValidationFailed("Select a class before drawing boxes".to_string())
        })?;
        if !store.contains_image(image_id) {
            return Err(EditorError::NotFound(format!("Image {}", image_id)));
        }

        if self.is_drawing() {
            log::debug!("Replacing unfinished gesture");
        }
        selection.clear_box_selection();
        self.state = DrawState::Drawing(Gesture {
            image_id,
            class_id: class.id,
            color: class.color,
            start: pos,
            container,
            preview: compute_box(pos, pos, container),
        });
        log::debug!("Started drawing on image {}", image_id);
        Ok(())
    }

    /// Pointer-move while drawing. Returns the updated preview.
    pub fn pointer_move(&mut self, pos: Pos) -> Option<BoxGeometry> {
        match &mut self.state {
            DrawState::Drawing(gesture) => {
                gesture.preview = compute_box(gesture.start, pos, gesture.container);
                Some(gesture.preview)
            }
            DrawState::Idle => None,
        }
    }

    /// Pointer-up: commit the box or cancel if it is too small.
    ///
    /// Returns `Ok(None)` when no gesture was in progress.
    pub fn pointer_up(
        &mut self,
        store: &mut EntityStore,
        pos: Pos,
    ) -> EditorResult<Option<DrawOutcome>> {
        let gesture = match std::mem::take(&mut self.state) {
            DrawState::Drawing(gesture) => gesture,
            DrawState::Idle => return Ok(None),
        };

        let geometry = compute_box(gesture.start, pos, gesture.container);
        if !geometry.meets_threshold() {
            log::debug!("Gesture cancelled: box below threshold");
            return Ok(Some(DrawOutcome::Cancelled));
        }

        match store.add_box(gesture.image_id, gesture.class_id, geometry)? {
            Some(box_id) => Ok(Some(DrawOutcome::Committed(BoxRef {
                image_id: gesture.image_id,
                box_id,
            }))),
            None => Ok(Some(DrawOutcome::Cancelled)),
        }
    }

    /// Pointer left the surface before release.
    pub fn pointer_leave(&mut self) -> Option<DrawOutcome> {
        match std::mem::take(&mut self.state) {
            DrawState::Drawing(_) => {
                log::debug!("Gesture cancelled: pointer left the surface");
                Some(DrawOutcome::Cancelled)
            }
            DrawState::Idle => None,
        }
    }

    /// Abandon a gesture on `image_id`, e.g. because the image was removed.
    pub fn cancel_on_image(&mut self, image_id: ImageId) {
        if self.gesture().is_some_and(|g| g.image_id == image_id) {
            self.state = DrawState::Idle;
        }
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

    fn setup() -> (EntityStore, Selection, ImageId, ClassId) {
        let mut store = EntityStore::new();
        let class_id = store.add_class("cat", PALETTE[0]).unwrap().id;
        let image_id = store.add_image("a.png", test_pixels());
        (store, Selection::new(), image_id, class_id)
    }

    #[test]
    fn test_rejects_without_classes() {
        let mut store = EntityStore::new();
        let image_id = store.add_image("a.png", test_pixels());
        let mut machine = DrawingMachine::new();
        let result = machine.pointer_down(
            &store,
            &mut Selection::new(),
            image_id,
            Pos::new(10.0, 10.0),
            surface(),
        );
        assert!(matches!(result, Err(EditorError::ValidationFailed(_))));
        assert_eq!(machine.state(), &DrawState::Idle);
    }

    #[test]
    fn test_full_gesture_commits_one_box() {
        let (mut store, mut selection, image_id, class_id) = setup();
        let mut machine = DrawingMachine::new();
        machine
            .pointer_down(&store, &mut selection, image_id, Pos::new(100.0, 100.0), surface())
            .unwrap();
        let preview = machine.pointer_move(Pos::new(300.0, 250.0)).unwrap();
        assert!((preview.width - 20.0).abs() < 1e-9);
        assert!(store.image(image_id).unwrap().boxes.is_empty());

        let outcome = machine.pointer_up(&mut store, Pos::new(500.0, 500.0)).unwrap();
        assert!(matches!(outcome, Some(DrawOutcome::Committed(_))));
        assert!(!machine.is_drawing());

        let boxes = &store.image(image_id).unwrap().boxes;
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].class_id, class_id);
        assert!((boxes[0].x - 10.0).abs() < 1e-9);
        assert!((boxes[0].w - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_drag_is_cancelled() {
        let (mut store, mut selection, image_id, _) = setup();
        let mut machine = DrawingMachine::new();
        machine
            .pointer_down(&store, &mut selection, image_id, Pos::new(0.0, 0.0), surface())
            .unwrap();
        let outcome = machine.pointer_up(&mut store, Pos::new(10.0, 10.0)).unwrap();
        assert_eq!(outcome, Some(DrawOutcome::Cancelled));
        assert!(store.image(image_id).unwrap().boxes.is_empty());
    }

    #[test]
    fn test_pointer_leave_cancels() {
        let (mut store, mut selection, image_id, _) = setup();
        let mut machine = DrawingMachine::new();
        machine
            .pointer_down(&store, &mut selection, image_id, Pos::new(0.0, 0.0), surface())
            .unwrap();
        machine.pointer_move(Pos::new(600.0, 600.0));
        assert_eq!(machine.pointer_leave(), Some(DrawOutcome::Cancelled));
        assert_eq!(machine.pointer_up(&mut store, Pos::new(600.0, 600.0)), Ok(None));
        assert!(store.image(image_id).unwrap().boxes.is_empty());
    }

    #[test]
    fn test_pointer_down_clears_box_selection() {
        let (store, mut selection, image_id, _) = setup();
        selection.select_box(image_id, uuid::Uuid::new_v4());
        let mut machine = DrawingMachine::new();
        machine
            .pointer_down(&store, &mut selection, image_id, Pos::new(5.0, 5.0), surface())
            .unwrap();
        assert!(selection.active_box().is_none());
    }

    #[test]
    fn test_release_outside_surface_is_clamped() {
        let (mut store, mut selection, image_id, _) = setup();
        let mut machine = DrawingMachine::new();
        machine
            .pointer_down(&store, &mut selection, image_id, Pos::new(800.0, 800.0), surface())
            .unwrap();
        machine.pointer_up(&mut store, Pos::new(2000.0, 1500.0)).unwrap();
        let bbox = &store.image(image_id).unwrap().boxes[0];
        assert!(bbox.x + bbox.w <= 100.0);
        assert!(bbox.y + bbox.h <= 100.0);
    }

    #[test]
    fn test_cancel_on_removed_image() {
        let (store, mut selection, image_id, _) = setup();
        let mut machine = DrawingMachine::new();
        machine
            .pointer_down(&store, &mut selection, image_id, Pos::new(5.0, 5.0), surface())
            .unwrap();
        machine.cancel_on_image(uuid::Uuid::new_v4());
        assert!(machine.is_drawing());
        machine.cancel_on_image(image_id);
        assert!(!machine.is_drawing());
    }
}
