// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Inference form and results panel.
//!
//! Results are computed by the inference service; this panel only collects
//! the inputs and displays what comes back.

use crate::io::inference::{InferenceResponse, InferenceSettings};
use crate::io::media::{decode_data_url, decode_pixels, FileEntry};
use std::collections::HashMap;
use std::path::PathBuf;

/// State of the inference page.
pub struct InferencePage {
    pub model_path: Option<PathBuf>,
    pub images: Vec<FileEntry>,
    pub settings: InferenceSettings,
    /// One class name per line, overriding the checkpoint's names.
    pub class_names_text: String,
    pub running: bool,
    pub response: Option<InferenceResponse>,
    /// Decoded result images; `None` marks one that failed to decode.
    result_textures: HashMap<String, Option<egui::TextureHandle>>,
}

impl InferencePage {
    pub fn new(settings: InferenceSettings) -> Self {
        let class_names_text = settings
            .class_names
            .as_ref()
            .map(|names| names.join("\n"))
            .unwrap_or_default();
        Self {
            model_path: None,
            images: Vec::new(),
            settings,
            class_names_text,
            running: false,
            response: None,
            result_textures: HashMap::new(),
        }
    }

    /// Settings as they will be sent, including the class name override.
    pub fn effective_settings(&self) -> InferenceSettings {
        let names: Vec<String> = self
            .class_names_text
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        InferenceSettings {
            class_names: (!names.is_empty()).then_some(names),
            ..self.settings.clone()
        }
        .sanitized()
    }

    pub fn set_class_names(&mut self, names: &[String]) {
        self.class_names_text = names.join("\n");
    }

    pub fn set_response(&mut self, response: InferenceResponse) {
        self.result_textures.clear();
        self.response = Some(response);
    }
}

/// Result of inference panel interaction.
pub enum InferenceAction {
    None,
    PickModel,
    AddImages,
    ClearImages,
    Run,
}

/// Display the inference page.
pub fn show(ui: &mut egui::Ui, page: &mut InferencePage) -> InferenceAction {
    let mut action = InferenceAction::None;

    ui.heading("Run inference");
    ui.separator();

    egui::Grid::new("inference_inputs")
        .num_columns(2)
        .spacing([12.0, 6.0])
        .show(ui, |ui| {
            ui.label("Model");
            ui.horizontal(|ui| {
                let name = page
                    .model_path
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "no model selected".to_string());
                ui.label(name);
                if ui.button("Choose...").clicked() {
                    action = InferenceAction::PickModel;
                }
            });
            ui.end_row();

            ui.label("Images");
            ui.horizontal(|ui| {
                ui.label(format!("{} selected", page.images.len()));
                if ui.button("Add...").clicked() {
                    action = InferenceAction::AddImages;
                }
                if ui.button("Clear").clicked() {
                    action = InferenceAction::ClearImages;
                }
            });
            ui.end_row();

            ui.label("Image size");
            ui.add(egui::DragValue::new(&mut page.settings.image_size).clamp_range(32..=2048).speed(32));
            ui.end_row();

            ui.label("Workers");
            ui.add(egui::DragValue::new(&mut page.settings.worker_count).clamp_range(0..=128));
            ui.end_row();

            ui.label("Min confidence");
            ui.add(egui::Slider::new(&mut page.settings.min_confidence, 0.0..=1.0));
            ui.end_row();

            ui.label("Min IoU");
            ui.add(egui::Slider::new(&mut page.settings.min_iou, 0.0..=1.0));
            ui.end_row();

            ui.label("Max boxes per image");
            ui.add(egui::DragValue::new(&mut page.settings.max_boxes_per_image).clamp_range(1..=2000));
            ui.end_row();

            ui.label("Class names");
            ui.add(
                egui::TextEdit::multiline(&mut page.class_names_text)
                    .hint_text("One per line (optional)")
                    .desired_rows(3),
            );
            ui.end_row();
        });

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        let ready = page.model_path.is_some() && !page.images.is_empty() && !page.running;
        if ui.add_enabled(ready, egui::Button::new("▶ Run")).clicked() {
            action = InferenceAction::Run;
        }
        if page.running {
            ui.spinner();
            ui.label("Running...");
        }
    });

    ui.separator();
    show_results(ui, page);

    action
}

fn show_results(ui: &mut egui::Ui, page: &mut InferencePage) {
    let Some(response) = &page.response else {
        return;
    };

    ui.label(format!(
        "{} image(s), {} detection(s), {:.1} ms on {}",
        response.stats.total_images,
        response.stats.total_detections,
        response.stats.total_time_ms,
        response.device
    ));

    let textures = &mut page.result_textures;
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for result in &response.results {
                ui.add_space(8.0);
                ui.strong(format!(
                    "{}: {} detection(s), {:.1} ms",
                    result.filename, result.num_detections, result.duration_ms
                ));

                if let Some(url) = &result.result_image {
                    let key = format!("{}:{}", result.image_id, result.filename);
                    let texture = textures.entry(key.clone()).or_insert_with(|| {
                        load_result_texture(ui.ctx(), &key, url)
                            .inspect_err(|e| {
                                log::warn!("Cannot show result for {}: {:#}", result.filename, e)
                            })
                            .ok()
                    });
                    if let Some(texture) = texture {
                        let [w, h] = texture.size();
                        let width = ui.available_width().min(w as f32);
                        let height = width * h as f32 / w.max(1) as f32;
                        ui.image((texture.id(), egui::vec2(width, height)));
                    }
                }

                if result.detections.is_empty() {
                    ui.label(egui::RichText::new("No detections").weak());
                    continue;
                }
                egui::Grid::new(format!("detections_{}", result.image_id))
                    .striped(true)
                    .num_columns(3)
                    .show(ui, |ui| {
                        ui.strong("Class");
                        ui.strong("Confidence");
                        ui.strong("Box (x1, y1, x2, y2)");
                        ui.end_row();
                        for detection in &result.detections {
                            ui.label(format!("{} ({})", detection.class_name, detection.class_id));
                            ui.label(format!("{:.2}", detection.confidence));
                            ui.label(format!(
                                "{:.0}, {:.0}, {:.0}, {:.0}",
                                detection.bbox.x1, detection.bbox.y1, detection.bbox.x2, detection.bbox.y2
                            ));
                            ui.end_row();
                        }
                    });
            }
        });
}

fn load_result_texture(ctx: &egui::Context, key: &str, url: &str) -> anyhow::Result<egui::TextureHandle> {
    let (media_type, bytes) = decode_data_url(url)?;
    let pixels = decode_pixels(&media_type, bytes)?;
    let size = [pixels.width as usize, pixels.height as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &pixels.rgba);
    Ok(ctx.load_texture(key, color_image, egui::TextureOptions::LINEAR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_settings_uses_class_name_lines() {
        let mut page = InferencePage::new(InferenceSettings::default());
        page.set_class_names(&["cat".to_string(), "dog".to_string()]);
        page.class_names_text.push_str("\n   \n");
        let settings = page.effective_settings();
        assert_eq!(settings.class_names, Some(vec!["cat".to_string(), "dog".to_string()]));
    }

    #[test]
    fn test_effective_settings_without_names() {
        let page = InferencePage::new(InferenceSettings::default());
        assert_eq!(page.effective_settings().class_names, None);
    }

    #[test]
    fn test_configured_class_names_prefill_text() {
        let settings = InferenceSettings {
            class_names: Some(vec!["a".to_string(), "b".to_string()]),
            ..Default::default()
        };
        assert_eq!(InferencePage::new(settings).class_names_text, "a\nb");
    }
}
