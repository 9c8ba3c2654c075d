// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image grid with box overlays.
//!
//! Every imported image is shown as a card whose picture is a drawing
//! surface. The canvas only reports what the pointer did; the app feeds those
//! actions to the [`Editor`], and the next frame paints the new state.

use crate::editor::Editor;
use crate::models::image::{BoxId, Image, ImageId};
use crate::util::geometry::{to_percent, BoxGeometry, Pos, Size};
use std::collections::HashMap;

/// Width of an image card in points.
const CARD_WIDTH: f32 = 320.0;
/// Side of the delete control shown on the active box.
const DELETE_CONTROL_SIZE: f32 = 16.0;

/// Result of canvas interaction.
pub enum CanvasAction {
    None,
    PointerDown {
        image_id: ImageId,
        pos: Pos,
        size: Size,
    },
    PointerMove(Pos),
    PointerUp(Pos),
    /// The pointer left the application viewport mid-gesture.
    ///
    /// Leaving a single image surface does not cancel; the gesture keeps
    /// tracking and its geometry is clamped to the surface it started on.
    PointerLeave,
    SelectBox(ImageId, BoxId),
    DeleteBox(ImageId, BoxId),
    ToggleImage(ImageId, bool),
    RemoveImage(ImageId),
}

/// GPU textures for imported images, keyed by image id.
#[derive(Default)]
pub struct TextureCache {
    textures: HashMap<ImageId, egui::TextureHandle>,
}

impl TextureCache {
    fn get_or_load(&mut self, ctx: &egui::Context, image: &Image) -> egui::TextureHandle {
        self.textures
            .entry(image.id)
            .or_insert_with(|| {
                let size = [image.pixels.width as usize, image.pixels.height as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &image.pixels.rgba);
                ctx.load_texture(image.id.to_string(), color_image, egui::TextureOptions::LINEAR)
            })
            .clone()
    }

    /// Free textures of images that are gone.
    pub fn retain_images(&mut self, editor: &Editor) {
        self.textures.retain(|id, _| editor.store().contains_image(*id));
    }
}

/// Display the image grid and handle pointer interaction.
pub fn show(ui: &mut egui::Ui, editor: &Editor, textures: &mut TextureCache) -> CanvasAction {
    let mut action = CanvasAction::None;

    // A gesture is cancelled when the pointer leaves the window entirely
    if editor.drawing().is_drawing() && !ui.input(|i| i.pointer.has_pointer()) {
        return CanvasAction::PointerLeave;
    }

    if editor.store().images().is_empty() {
        ui.centered_and_justified(|ui| {
            ui.label(
                egui::RichText::new("Import images to start annotating")
                    .color(egui::Color32::from_gray(180)),
            );
        });
        return action;
    }

    egui::ScrollArea::vertical()
        .drag_to_scroll(false)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.spacing_mut().item_spacing = egui::vec2(12.0, 12.0);
                for image in editor.store().images() {
                    let card_action = show_card(ui, editor, image, textures);
                    if !matches!(card_action, CanvasAction::None) {
                        action = card_action;
                    }
                }
            });
        });

    action
}

/// One image card: header row plus drawing surface.
fn show_card(
    ui: &mut egui::Ui,
    editor: &Editor,
    image: &Image,
    textures: &mut TextureCache,
) -> CanvasAction {
    let mut action = CanvasAction::None;
    let texture = textures.get_or_load(ui.ctx(), image);

    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(CARD_WIDTH);
        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                let mut selected = editor.selection().is_image_selected(image.id);
                if ui.checkbox(&mut selected, "").changed() {
                    action = CanvasAction::ToggleImage(image.id, selected);
                }
                ui.label(egui::RichText::new(&image.name).strong());
                ui.label(
                    egui::RichText::new(format!("{} box(es)", image.boxes.len())).weak(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("🗑").on_hover_text("Remove image").clicked() {
                        action = CanvasAction::RemoveImage(image.id);
                    }
                });
            });

            let surface_action = show_surface(ui, editor, image, &texture);
            if !matches!(surface_action, CanvasAction::None) {
                action = surface_action;
            }
        });
    });

    action
}

/// Paint the image with its boxes and translate pointer input.
fn show_surface(
    ui: &mut egui::Ui,
    editor: &Editor,
    image: &Image,
    texture: &egui::TextureHandle,
) -> CanvasAction {
    let mut action = CanvasAction::None;

    let aspect = image.pixels.height.max(1) as f32 / image.pixels.width.max(1) as f32;
    let display_size = egui::vec2(CARD_WIDTH, CARD_WIDTH * aspect);
    let (rect, response) = ui.allocate_exact_size(display_size, egui::Sense::click_and_drag());
    let size = Size::new(rect.width() as f64, rect.height() as f64);

    let painter = ui.painter_at(rect);
    painter.image(
        texture.id(),
        rect,
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        egui::Color32::WHITE,
    );

    // Committed boxes
    let mut delete_control = None;
    for bbox in &image.boxes {
        let box_rect = percent_rect(rect, bbox.geometry());
        let active = editor.selection().is_box_active(image.id, bbox.id);
        let color = bbox.color.to_egui();
        painter.rect_filled(box_rect, 0.0, color.gamma_multiply(0.15));
        painter.rect_stroke(box_rect, 0.0, egui::Stroke::new(if active { 3.0 } else { 2.0 }, color));

        if let Some(class) = editor.store().class(bbox.class_id) {
            painter.text(
                box_rect.left_top() + egui::vec2(3.0, 2.0),
                egui::Align2::LEFT_TOP,
                &class.label,
                egui::FontId::proportional(12.0),
                color,
            );
        }

        if active {
            let control = delete_control_rect(box_rect);
            painter.rect_filled(control, 3.0, egui::Color32::from_rgb(220, 38, 38));
            painter.text(
                control.center(),
                egui::Align2::CENTER_CENTER,
                "×",
                egui::FontId::proportional(13.0),
                egui::Color32::WHITE,
            );
            delete_control = Some((control, bbox.id));
        }
    }

    // Live preview of the gesture on this surface
    if let Some(gesture) = editor.drawing().gesture().filter(|g| g.image_id == image.id) {
        let preview = percent_rect(rect, gesture.preview);
        let color = gesture.color.to_egui();
        painter.rect_filled(preview, 0.0, color.gamma_multiply(0.25));
        painter.rect_stroke(preview, 0.0, egui::Stroke::new(2.0, color));
    }

    let (pressed, released, pointer_pos, delta) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.interact_pos(),
            i.pointer.delta(),
        )
    });
    let Some(pointer_pos) = pointer_pos else {
        return action;
    };
    let local = Pos::new(
        (pointer_pos.x - rect.min.x) as f64,
        (pointer_pos.y - rect.min.y) as f64,
    );

    let drawing_here = editor
        .drawing()
        .gesture()
        .is_some_and(|g| g.image_id == image.id);

    if drawing_here {
        if released {
            action = CanvasAction::PointerUp(local);
        } else if delta != egui::Vec2::ZERO {
            action = CanvasAction::PointerMove(local);
        }
    } else if pressed && response.hovered() {
        let (px, py) = to_percent(local, size);
        action = match delete_control {
            Some((control, box_id)) if control.contains(pointer_pos) => {
                CanvasAction::DeleteBox(image.id, box_id)
            }
            _ => match image.box_at(px, py) {
                Some(bbox) => CanvasAction::SelectBox(image.id, bbox.id),
                None => CanvasAction::PointerDown {
                    image_id: image.id,
                    pos: local,
                    size,
                },
            },
        };
    }

    if drawing_here || response.hovered() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::Crosshair);
    }

    action
}

/// Delete control of a box, tucked inside its top-right corner so it stays
/// on the surface even for boxes touching the image edge.
fn delete_control_rect(box_rect: egui::Rect) -> egui::Rect {
    egui::Align2::RIGHT_TOP.anchor_size(
        box_rect.right_top(),
        egui::vec2(DELETE_CONTROL_SIZE, DELETE_CONTROL_SIZE),
    )
}

/// Screen rectangle of percentage geometry inside `rect`.
fn percent_rect(rect: egui::Rect, geometry: BoxGeometry) -> egui::Rect {
    let min = egui::pos2(
        rect.min.x + (geometry.left / 100.0) as f32 * rect.width(),
        rect.min.y + (geometry.top / 100.0) as f32 * rect.height(),
    );
    let size = egui::vec2(
        (geometry.width / 100.0) as f32 * rect.width(),
        (geometry.height / 100.0) as f32 * rect.height(),
    );
    egui::Rect::from_min_size(min, size)
}
