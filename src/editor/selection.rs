// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Box and image selection.
//!
//! Selection holds ids only. Existence is always decided by the
//! [`EntityStore`]; stale ids are pruned by [`Selection::reconcile`].

use crate::models::image::{BoxId, ImageId};
use crate::models::store::EntityStore;
use std::collections::HashSet;

/// A box addressed through its owning image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxRef {
    pub image_id: ImageId,
    pub box_id: BoxId,
}

/// The two independent selection axes.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Box showing the delete affordance.
    active_box: Option<BoxRef>,
    /// Images marked for bulk operations.
    selected_images: HashSet<ImageId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_box(&self) -> Option<BoxRef> {
        self.active_box
    }

    pub fn is_box_active(&self, image_id: ImageId, box_id: BoxId) -> bool {
        self.active_box == Some(BoxRef { image_id, box_id })
    }

    pub fn select_box(&mut self, image_id: ImageId, box_id: BoxId) {
        self.active_box = Some(BoxRef { image_id, box_id });
    }

    pub fn clear_box_selection(&mut self) {
        self.active_box = None;
    }

    pub fn selected_images(&self) -> &HashSet<ImageId> {
        &self.selected_images
    }

    pub fn is_image_selected(&self, image_id: ImageId) -> bool {
        self.selected_images.contains(&image_id)
    }

    pub fn toggle_image_selection(&mut self, image_id: ImageId, included: bool) {
        if included {
            self.selected_images.insert(image_id);
        } else {
            self.selected_images.remove(&image_id);
        }
    }

    pub fn select_all_images(&mut self, store: &EntityStore) {
        self.selected_images = store.images().iter().map(|i| i.id).collect();
    }

    pub fn clear_image_selection(&mut self) {
        self.selected_images.clear();
    }

    /// Forget everything that points at `image_id`.
    pub fn prune_image(&mut self, image_id: ImageId) {
        self.selected_images.remove(&image_id);
        if self.active_box.is_some_and(|r| r.image_id == image_id) {
            self.active_box = None;
        }
    }

    pub fn prune_box(&mut self, image_id: ImageId, box_id: BoxId) {
        if self.is_box_active(image_id, box_id) {
            self.active_box = None;
        }
    }

    /// Drop ids the store no longer knows about.
    pub fn reconcile(&mut self, store: &EntityStore) {
        self.selected_images.retain(|id| store.contains_image(*id));
        if let Some(r) = self.active_box {
            if !store.contains_box(r.image_id, r.box_id) {
                self.active_box = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::image::test_pixels;
    use uuid::Uuid;

    #[test]
    fn test_axes_are_independent() {
        let mut selection = Selection::new();
        let image_id = Uuid::new_v4();
        selection.toggle_image_selection(image_id, true);
        assert!(selection.active_box().is_none());

        selection.select_box(image_id, Uuid::new_v4());
        selection.clear_image_selection();
        assert!(selection.active_box().is_some());
    }

    #[test]
    fn test_toggle_image_selection() {
        let mut selection = Selection::new();
        let image_id = Uuid::new_v4();
        selection.toggle_image_selection(image_id, true);
        selection.toggle_image_selection(image_id, true);
        assert_eq!(selection.selected_images().len(), 1);
        selection.toggle_image_selection(image_id, false);
        assert!(!selection.is_image_selected(image_id));
    }

    #[test]
    fn test_select_all_uses_current_images() {
        let mut store = EntityStore::new();
        let a = store.add_image("a.png", test_pixels());
        let b = store.add_image("b.png", test_pixels());
        let mut selection = Selection::new();
        selection.select_all_images(&store);
        assert!(selection.is_image_selected(a));
        assert!(selection.is_image_selected(b));

        let c = store.add_image("c.png", test_pixels());
        assert!(!selection.is_image_selected(c));
    }

    #[test]
    fn test_prune_image_clears_box_on_that_image() {
        let mut selection = Selection::new();
        let image_id = Uuid::new_v4();
        selection.select_box(image_id, Uuid::new_v4());
        selection.toggle_image_selection(image_id, true);
        selection.prune_image(image_id);
        assert!(selection.active_box().is_none());
        assert!(selection.selected_images().is_empty());
    }

    #[test]
    fn test_reconcile_drops_stale_refs() {
        let mut store = EntityStore::new();
        let kept = store.add_image("a.png", test_pixels());
        let mut selection = Selection::new();
        selection.toggle_image_selection(kept, true);
        selection.toggle_image_selection(Uuid::new_v4(), true);
        selection.select_box(kept, Uuid::new_v4());

        selection.reconcile(&store);
        assert_eq!(selection.selected_images().len(), 1);
        assert!(selection.is_image_selected(kept));
        assert!(selection.active_box().is_none());
    }
}
