// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait. It routes between pages, owns one editor per
//! annotation stage, runs imports, exports and inference on background
//! threads, and turns editor errors into on-screen notices.

use crate::config::AppConfig;
use crate::editor::drawing::DrawOutcome;
use crate::editor::Editor;
use crate::error::{EditorError, EditorResult};
use crate::io::export::{send_export, ExportRequest};
use crate::io::inference::{run_inference, InferenceJob, InferenceResponse};
use crate::io::media::{accept_images, load_image, FileEntry};
use crate::io::transfer::{Destination, MemorySessionStorage, TransferChannel};
use crate::models::class::Color;
use crate::models::image::PixelSource;
use crate::ui::{canvas, inference, properties, toolbar};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

/// Image file extensions offered by the import dialog.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tif", "tiff"];

/// Application pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Train,
    Val,
    Inference,
}

impl Page {
    pub fn title(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Train => "Train",
            Page::Val => "Val",
            Page::Inference => "Inference",
        }
    }
}

/// Dataset split an annotation page produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Train,
    Val,
}

impl Stage {
    pub fn slug(self) -> &'static str {
        match self {
            Stage::Train => "train",
            Stage::Val => "val",
        }
    }
}

/// A transient message for the user.
struct Notice {
    text: String,
    is_error: bool,
    shown_at: Instant,
}

/// Messages sent back by background threads.
enum WorkerMessage {
    ImageLoaded {
        stage: Stage,
        name: String,
        result: Result<PixelSource, String>,
    },
    ExportFinished {
        stage: Stage,
        result: EditorResult<Vec<u8>>,
    },
    InferenceFinished(Result<InferenceResponse, String>),
}

/// One annotation page: its editor plus page-local UI state.
struct AnnotationPage {
    stage: Stage,
    editor: Editor,
    class_form: properties::ClassForm,
    textures: canvas::TextureCache,
    export_in_flight: bool,
    confirm_delete: bool,
    /// Imports dispatched but not yet completed.
    pending_imports: usize,
    imported: usize,
}

impl AnnotationPage {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            editor: Editor::new(),
            class_form: properties::ClassForm::new(Color::from_palette(0)),
            textures: canvas::TextureCache::default(),
            export_in_flight: false,
            confirm_delete: false,
            pending_imports: 0,
            imported: 0,
        }
    }
}

/// Main application state.
pub struct AnnoboxApp {
    config: AppConfig,

    /// Currently displayed page
    page: Page,

    train: AnnotationPage,
    val: AnnotationPage,
    inference: inference::InferencePage,

    /// Session-scoped class hand-over between pages
    transfer: TransferChannel<MemorySessionStorage>,

    notices: Vec<Notice>,

    /// Background work reports back through this channel
    worker_tx: Sender<WorkerMessage>,
    worker_rx: Receiver<WorkerMessage>,
}

impl AnnoboxApp {
    /// Create a new application instance.
    pub fn new(config: AppConfig) -> Self {
        let (worker_tx, worker_rx) = channel();
        Self {
            inference: inference::InferencePage::new(config.inference.clone()),
            config,
            page: Page::Home,
            train: AnnotationPage::new(Stage::Train),
            val: AnnotationPage::new(Stage::Val),
            transfer: TransferChannel::new(MemorySessionStorage::new()),
            notices: Vec::new(),
            worker_tx,
            worker_rx,
        }
    }

    fn stage_page(&mut self, stage: Stage) -> &mut AnnotationPage {
        match stage {
            Stage::Train => &mut self.train,
            Stage::Val => &mut self.val,
        }
    }

    fn notify(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{}", text);
        self.notices.push(Notice {
            text,
            is_error: false,
            shown_at: Instant::now(),
        });
    }

    fn notify_error(&mut self, error: impl std::fmt::Display) {
        let text = error.to_string();
        log::warn!("{}", text);
        self.notices.push(Notice {
            text,
            is_error: true,
            shown_at: Instant::now(),
        });
    }

    /// Switch pages, consuming any classes handed to the new page.
    fn navigate(&mut self, page: Page) {
        log::info!("Navigating to {}", page.title());
        self.page = page;
        match page {
            Page::Val => match self.transfer.receive(Destination::Val) {
                Ok(Some(restored)) => {
                    let summary = self.val.editor.prefill_classes(restored);
                    let color = self.val.editor.next_class_color();
                    self.val.class_form.reset(color);
                    self.notify(format!(
                        "Loaded {} class(es) from Train",
                        summary.added + summary.updated
                    ));
                }
                Ok(None) => {}
                Err(e) => self.notify_error(e),
            },
            Page::Inference => match self.transfer.receive(Destination::Inference) {
                Ok(Some(restored)) => {
                    let names: Vec<String> =
                        restored.classes.iter().map(|c| c.label.clone()).collect();
                    self.inference.set_class_names(&names);
                    self.notify(format!("Using {} class name(s) from Train", names.len()));
                }
                Ok(None) => {}
                Err(e) => self.notify_error(e),
            },
            Page::Home | Page::Train => {}
        }
    }

    /// Drain results of background work.
    fn poll_workers(&mut self) {
        while let Ok(message) = self.worker_rx.try_recv() {
            match message {
                WorkerMessage::ImageLoaded { stage, name, result } => {
                    let page = self.stage_page(stage);
                    page.pending_imports = page.pending_imports.saturating_sub(1);
                    let failure = match result {
                        Ok(pixels) => {
                            page.editor.add_image(&name, pixels);
                            page.imported += 1;
                            None
                        }
                        Err(e) => Some(format!("Could not import {}: {}", name, e)),
                    };
                    let finished = (page.pending_imports == 0).then(|| std::mem::take(&mut page.imported));
                    if let Some(msg) = failure {
                        self.notify_error(msg);
                    }
                    if let Some(count) = finished.filter(|n| *n > 0) {
                        self.notify(format!("Imported {} image(s)", count));
                    }
                }
                WorkerMessage::ExportFinished { stage, result } => {
                    self.stage_page(stage).export_in_flight = false;
                    match result {
                        Ok(archive) => self.save_archive(stage, &archive),
                        Err(e) => self.notify_error(e),
                    }
                }
                WorkerMessage::InferenceFinished(result) => {
                    self.inference.running = false;
                    match result {
                        Ok(response) => {
                            let detections = response.stats.total_detections;
                            self.inference.set_response(response);
                            self.notify(format!("Inference found {} detection(s)", detections));
                        }
                        Err(e) => self.notify_error(format!("Inference failed: {}", e)),
                    }
                }
            }
        }
    }

    /// Let the user pick images and decode each on its own thread.
    ///
    /// Images are added in completion order, not selection order.
    fn import_images(&mut self, stage: Stage, ctx: &egui::Context) {
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_files()
        else {
            return;
        };

        let entries = accept_images(paths.into_iter().map(FileEntry::from_path).collect());
        if entries.is_empty() {
            return;
        }
        self.stage_page(stage).pending_imports += entries.len();

        for entry in entries {
            let sender = self.worker_tx.clone();
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                let result = load_image(&entry).map_err(|e| format!("{:#}", e));
                let _ = sender.send(WorkerMessage::ImageLoaded {
                    stage,
                    name: entry.display_name(),
                    result,
                });
                ctx.request_repaint();
            });
        }
    }

    /// Snapshot the editor and post it without blocking the UI.
    fn export(&mut self, stage: Stage, ctx: &egui::Context) {
        let path = match stage {
            Stage::Train => self.config.train_export_path.clone(),
            Stage::Val => self.config.val_export_path.clone(),
        };
        let url = self.config.endpoint(&path);
        let page = self.stage_page(stage);
        if page.export_in_flight {
            return;
        }
        let request: ExportRequest = page.editor.export_request();
        page.export_in_flight = true;

        let sender = self.worker_tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = send_export(&url, &request);
            let _ = sender.send(WorkerMessage::ExportFinished { stage, result });
            ctx.request_repaint();
        });
    }

    fn save_archive(&mut self, stage: Stage, archive: &[u8]) {
        let filename = match stage {
            Stage::Train => self.config.train_export_filename.clone(),
            Stage::Val => self.config.val_export_filename.clone(),
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Zip archive", &["zip"])
            .set_file_name(filename.as_str())
            .save_file()
        else {
            return;
        };
        match std::fs::write(&path, archive) {
            Ok(()) => self.notify(format!("Saved {}", path.display())),
            Err(e) => self.notify_error(EditorError::ExportFailed(format!(
                "Could not write {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn run_inference(&mut self, ctx: &egui::Context) {
        let Some(model_path) = self.inference.model_path.clone() else {
            return;
        };
        let job = InferenceJob {
            model_path,
            images: self.inference.images.clone(),
            settings: self.inference.effective_settings(),
        };
        let url = self.config.endpoint(&self.config.inference_path);
        self.inference.running = true;

        let sender = self.worker_tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = run_inference(&url, job).map_err(|e| format!("{:#}", e));
            let _ = sender.send(WorkerMessage::InferenceFinished(result));
            ctx.request_repaint();
        });
    }

    fn handle_inference_action(&mut self, action: inference::InferenceAction, ctx: &egui::Context) {
        match action {
            inference::InferenceAction::PickModel => {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Detector checkpoint", &["pt", "pth", "ckpt"])
                    .pick_file()
                {
                    self.inference.model_path = Some(path);
                }
            }
            inference::InferenceAction::AddImages => {
                if let Some(paths) = rfd::FileDialog::new()
                    .add_filter("Images", IMAGE_EXTENSIONS)
                    .pick_files()
                {
                    let entries = accept_images(paths.into_iter().map(FileEntry::from_path).collect());
                    self.inference.images.extend(entries);
                }
            }
            inference::InferenceAction::ClearImages => self.inference.images.clear(),
            inference::InferenceAction::Run => self.run_inference(ctx),
            inference::InferenceAction::None => {}
        }
    }

    fn handle_toolbar_action(&mut self, stage: Stage, action: toolbar::ToolbarAction, ctx: &egui::Context) {
        match action {
            toolbar::ToolbarAction::ImportImages => self.import_images(stage, ctx),
            toolbar::ToolbarAction::SelectAll => self.stage_page(stage).editor.select_all_images(),
            toolbar::ToolbarAction::ClearSelection => {
                self.stage_page(stage).editor.clear_image_selection()
            }
            toolbar::ToolbarAction::DeleteSelected => {
                let page = self.stage_page(stage);
                if page.editor.selection().selected_images().is_empty() {
                    self.notify_error(EditorError::NothingSelected);
                } else {
                    page.confirm_delete = true;
                }
            }
            toolbar::ToolbarAction::Export => self.export(stage, ctx),
            toolbar::ToolbarAction::SendClasses(destination) => {
                let store = self.stage_page(stage).editor.store();
                let classes = store.classes().to_vec();
                let active = store.active_class_id();
                if classes.is_empty() {
                    self.notify_error(EditorError::ValidationFailed(
                        "Add at least one class first".to_string(),
                    ));
                    return;
                }
                match self.transfer.send(destination, &classes, active) {
                    Ok(()) => self.navigate(match destination {
                        Destination::Val => Page::Val,
                        Destination::Inference => Page::Inference,
                    }),
                    Err(e) => self.notify_error(format!("Could not hand over classes: {:#}", e)),
                }
            }
            toolbar::ToolbarAction::None => {}
        }
    }

    fn handle_properties_action(&mut self, stage: Stage, action: properties::PropertiesAction) {
        let page = self.stage_page(stage);
        let result = match action {
            properties::PropertiesAction::AddClass { label, color } => {
                page.editor.add_class(&label, color).map(|_| {
                    let next = page.editor.next_class_color();
                    page.class_form.reset(next);
                })
            }
            properties::PropertiesAction::UpdateClass { id, label, color } => {
                page.editor.update_class(id, &label, color).map(|_| {
                    let next = page.editor.next_class_color();
                    page.class_form.reset(next);
                })
            }
            properties::PropertiesAction::RemoveClass(id) => {
                if page.class_form.editing == Some(id) {
                    let next = page.editor.next_class_color();
                    page.class_form.reset(next);
                }
                page.editor.remove_class(id);
                Ok(())
            }
            properties::PropertiesAction::SetActive(id) => page.editor.set_active_class(id),
            properties::PropertiesAction::CancelEdit => {
                let next = page.editor.next_class_color();
                page.class_form.reset(next);
                Ok(())
            }
            properties::PropertiesAction::None => Ok(()),
        };
        if let Err(e) = result {
            self.notify_error(e);
        }
    }

    fn handle_canvas_action(&mut self, stage: Stage, action: canvas::CanvasAction) {
        let editor = &mut self.stage_page(stage).editor;
        let result = match action {
            canvas::CanvasAction::PointerDown { image_id, pos, size } => {
                // A press on empty canvas always deselects, drawing or not
                editor.clear_box_selection();
                editor.pointer_down(image_id, pos, size)
            }
            canvas::CanvasAction::PointerMove(pos) => {
                editor.pointer_move(pos);
                Ok(())
            }
            canvas::CanvasAction::PointerUp(pos) => editor.pointer_up(pos).map(|outcome| {
                if let Some(DrawOutcome::Committed(r)) = outcome {
                    log::debug!("Committed box {} on image {}", r.box_id, r.image_id);
                }
            }),
            canvas::CanvasAction::PointerLeave => {
                editor.pointer_leave();
                Ok(())
            }
            canvas::CanvasAction::SelectBox(image_id, box_id) => {
                editor.select_box(image_id, box_id);
                Ok(())
            }
            canvas::CanvasAction::DeleteBox(image_id, box_id) => {
                editor.remove_box(image_id, box_id);
                Ok(())
            }
            canvas::CanvasAction::ToggleImage(image_id, included) => {
                editor.toggle_image_selection(image_id, included);
                Ok(())
            }
            canvas::CanvasAction::RemoveImage(image_id) => {
                editor.remove_image(image_id);
                Ok(())
            }
            canvas::CanvasAction::None => Ok(()),
        };
        if let Err(e) = result {
            self.notify_error(e);
        }
    }

    /// Keyboard shortcuts of annotation pages.
    fn handle_keys(&mut self, stage: Stage, ctx: &egui::Context) {
        // Only process if no text field is focused (to avoid deleting while editing names)
        if ctx.wants_keyboard_input() {
            return;
        }
        let editor = &mut self.stage_page(stage).editor;
        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            editor.remove_active_box();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            editor.clear_box_selection();
        }
    }

    fn show_annotation_page(&mut self, stage: Stage, ctx: &egui::Context) {
        {
            let page = self.stage_page(stage);
            page.editor.reconcile();
            page.textures.retain_images(&page.editor);
        }

        let toolbar_action = egui::TopBottomPanel::top(format!("{}_toolbar", stage.slug()))
            .show(ctx, |ui| {
                let page = self.stage_page(stage);
                toolbar::show_annotation(ui, page.stage, &page.editor, page.export_in_flight)
            })
            .inner;
        self.handle_toolbar_action(stage, toolbar_action, ctx);

        let properties_action = egui::SidePanel::right(format!("{}_classes", stage.slug()))
            .default_width(250.0)
            .show(ctx, |ui| {
                let page = self.stage_page(stage);
                properties::show(ui, page.editor.store(), &mut page.class_form)
            })
            .inner;
        self.handle_properties_action(stage, properties_action);

        self.handle_keys(stage, ctx);

        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                let page = self.stage_page(stage);
                canvas::show(ui, &page.editor, &mut page.textures)
            })
            .inner;
        self.handle_canvas_action(stage, canvas_action);

        self.show_delete_confirmation(stage, ctx);
    }

    fn show_delete_confirmation(&mut self, stage: Stage, ctx: &egui::Context) {
        let page = self.stage_page(stage);
        if !page.confirm_delete {
            return;
        }
        let count = page.editor.selection().selected_images().len();
        let mut confirmed = false;
        let mut cancelled = false;
        egui::Window::new("Delete images")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(format!("Delete {} selected image(s) and their boxes?", count));
                ui.horizontal(|ui| {
                    confirmed = ui.button("Delete").clicked();
                    cancelled = ui.button("Cancel").clicked();
                });
            });

        if confirmed {
            page.confirm_delete = false;
            match page.editor.delete_selected_images() {
                Ok(n) => self.notify(format!("Deleted {} image(s)", n)),
                Err(e) => self.notify_error(e),
            }
        } else if cancelled {
            page.confirm_delete = false;
        }
    }

    fn show_home(&mut self, ctx: &egui::Context) {
        let mut target = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                ui.heading(
                    egui::RichText::new("Annobox")
                        .size(32.0)
                        .color(egui::Color32::from_gray(200)),
                );
                ui.label(
                    egui::RichText::new("Bounding box annotation for detection datasets")
                        .size(14.0)
                        .color(egui::Color32::from_gray(150)),
                );
                ui.add_space(24.0);
                if ui.button("Annotate training images").clicked() {
                    target = Some(Page::Train);
                }
                if ui.button("Annotate validation images").clicked() {
                    target = Some(Page::Val);
                }
                if ui.button("Run inference with a trained model").clicked() {
                    target = Some(Page::Inference);
                }
            });
        });
        if let Some(page) = target {
            self.navigate(page);
        }
    }

    fn show_notices(&mut self, ctx: &egui::Context) {
        let lifetime = Duration::from_secs_f32(self.config.notice_seconds.max(0.5));
        self.notices.retain(|n| n.shown_at.elapsed() < lifetime);
        if self.notices.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("notices"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
            .show(ctx, |ui| {
                for notice in &self.notices {
                    let fill = if notice.is_error {
                        egui::Color32::from_rgb(127, 29, 29)
                    } else {
                        egui::Color32::from_rgb(30, 58, 95)
                    };
                    egui::Frame::popup(ui.style()).fill(fill).show(ui, |ui| {
                        ui.label(egui::RichText::new(&notice.text).color(egui::Color32::WHITE));
                    });
                }
            });
        // Keep repainting so notices expire on time
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

impl eframe::App for AnnoboxApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_workers();

        let nav_target = egui::TopBottomPanel::top("navigation")
            .show(ctx, |ui| toolbar::show_navigation(ui, self.page))
            .inner;
        if let Some(page) = nav_target {
            self.navigate(page);
        }

        match self.page {
            Page::Home => self.show_home(ctx),
            Page::Train => self.show_annotation_page(Stage::Train, ctx),
            Page::Val => self.show_annotation_page(Stage::Val, ctx),
            Page::Inference => {
                let action = egui::CentralPanel::default()
                    .show(ctx, |ui| inference::show(ui, &mut self.inference))
                    .inner;
                self.handle_inference_action(action, ctx);
            }
        }

        self.show_notices(ctx);
    }
}
