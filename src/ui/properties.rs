// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Class management panel.
//!
//! This module provides the side panel for creating, editing, deleting and
//! activating annotation classes.

use crate::models::class::{ClassId, Color};
use crate::models::store::EntityStore;

/// Contents of the class form.
pub struct ClassForm {
    pub label: String,
    pub color: [u8; 3],
    /// Class being edited, `None` when the form creates a new class.
    pub editing: Option<ClassId>,
}

impl ClassForm {
    pub fn new(color: Color) -> Self {
        Self {
            label: String::new(),
            color: color.0,
            editing: None,
        }
    }

    /// Clear the form for the next new class.
    pub fn reset(&mut self, color: Color) {
        *self = Self::new(color);
    }
}

/// Result of class panel interaction.
pub enum PropertiesAction {
    None,
    AddClass { label: String, color: Color },
    UpdateClass { id: ClassId, label: String, color: Color },
    RemoveClass(ClassId),
    SetActive(ClassId),
    CancelEdit,
}

/// Display the class panel.
pub fn show(ui: &mut egui::Ui, store: &EntityStore, form: &mut ClassForm) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading("Classes");
    ui.separator();

    // Create / edit form
    ui.horizontal(|ui| {
        ui.color_edit_button_srgb(&mut form.color);
        let response = ui.add(
            egui::TextEdit::singleline(&mut form.label)
                .hint_text("Class name")
                .desired_width(140.0),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

        let button = if form.editing.is_some() { "Save" } else { "Add" };
        if ui.button(button).clicked() || submitted {
            let label = form.label.clone();
            let color = Color(form.color);
            action = match form.editing {
                Some(id) => PropertiesAction::UpdateClass { id, label, color },
                None => PropertiesAction::AddClass { label, color },
            };
        }
    });
    if form.editing.is_some() && ui.small_button("Cancel editing").clicked() {
        action = PropertiesAction::CancelEdit;
    }

    ui.add_space(8.0);

    if store.classes().is_empty() {
        ui.label(egui::RichText::new("No classes yet").weak());
        return action;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        for class in store.classes() {
            let active = store.active_class_id() == Some(class.id);
            let box_count: usize = store
                .images()
                .iter()
                .map(|image| image.boxes.iter().filter(|b| b.class_id == class.id).count())
                .sum();

            ui.horizontal(|ui| {
                let (swatch, _) = ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
                ui.painter().rect_filled(swatch, 3.0, class.color.to_egui());

                let text = format!("{} ({})", class.label, box_count);
                if ui.selectable_label(active, text).clicked() && !active {
                    action = PropertiesAction::SetActive(class.id);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("🗑").on_hover_text("Delete class and its boxes").clicked() {
                        action = PropertiesAction::RemoveClass(class.id);
                    }
                    if ui.small_button("✏").on_hover_text("Edit class").clicked() {
                        form.label = class.label.clone();
                        form.color = class.color.0;
                        form.editing = Some(class.id);
                    }
                });
            });
        }
    });

    action
}
