// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Page navigation and annotation page actions.

use crate::app::{Page, Stage};
use crate::editor::Editor;
use crate::io::transfer::Destination;

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    ImportImages,
    SelectAll,
    ClearSelection,
    DeleteSelected,
    Export,
    /// Hand the current classes to another page and go there.
    SendClasses(Destination),
}

/// Display the page tabs. Returns the page the user switched to.
pub fn show_navigation(ui: &mut egui::Ui, current: Page) -> Option<Page> {
    let mut target = None;
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;
        for page in [Page::Home, Page::Train, Page::Val, Page::Inference] {
            if ui.selectable_label(current == page, page.title()).clicked() && current != page {
                target = Some(page);
            }
        }
    });
    target
}

/// Display the action bar of an annotation page.
pub fn show_annotation(
    ui: &mut egui::Ui,
    stage: Stage,
    editor: &Editor,
    export_in_flight: bool,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;
    let store = editor.store();
    let selected = editor.selection().selected_images().len();

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        if ui.button("📂 Import images...").clicked() {
            action = ToolbarAction::ImportImages;
        }

        ui.separator();

        if ui.button("Select all").clicked() {
            action = ToolbarAction::SelectAll;
        }
        if ui.button("Clear selection").clicked() {
            action = ToolbarAction::ClearSelection;
        }
        if ui.button(format!("Delete selected ({})", selected)).clicked() {
            action = ToolbarAction::DeleteSelected;
        }

        ui.separator();

        let export_label = if export_in_flight {
            "Exporting...".to_string()
        } else {
            format!("Export {}", stage.slug())
        };
        if ui.add_enabled(!export_in_flight, egui::Button::new(export_label)).clicked() {
            action = ToolbarAction::Export;
        }
        if export_in_flight {
            ui.spinner();
        }

        if stage == Stage::Train {
            ui.separator();
            if ui.button("Continue to Val →").clicked() {
                action = ToolbarAction::SendClasses(Destination::Val);
            }
            if ui.button("Use classes for inference →").clicked() {
                action = ToolbarAction::SendClasses(Destination::Inference);
            }
        }

        ui.separator();

        let boxes: usize = store.images().iter().map(|i| i.boxes.len()).sum();
        let active = store
            .active_class()
            .map(|c| c.label.as_str())
            .unwrap_or("none");
        ui.label(
            egui::RichText::new(format!(
                "{} image(s), {} box(es), active class: {}",
                store.images().len(),
                boxes,
                active
            ))
            .italics()
            .weak(),
        );
    });

    action
}
