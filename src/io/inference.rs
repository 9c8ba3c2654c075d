// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Detector inference boundary.
//!
//! A trained detector checkpoint and a batch of images are posted to the
//! inference service, which returns per-image detections, an annotated
//! rendering of each image and aggregate timing statistics.

use super::export::post_json;
use super::media::FileEntry;
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Inference parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub image_size: u32,
    pub worker_count: u32,
    pub min_confidence: f64,
    pub min_iou: f64,
    pub max_boxes_per_image: u32,
    /// Overrides the class names stored in the checkpoint.
    pub class_names: Option<Vec<String>>,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            image_size: 640,
            worker_count: 4,
            min_confidence: 0.25,
            min_iou: 0.45,
            max_boxes_per_image: 300,
            class_names: None,
        }
    }
}

impl InferenceSettings {
    /// Clamp every field into the range the service accepts.
    pub fn sanitized(&self) -> Self {
        let mut image_size = self.image_size.clamp(32, 2048);
        // The detector works on strides of 32
        image_size -= image_size % 32;
        let class_names = self.class_names.as_ref().and_then(|names| {
            let kept: Vec<String> = names
                .iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect();
            (!kept.is_empty()).then_some(kept)
        });

        Self {
            image_size: image_size.max(32),
            worker_count: self.worker_count.min(128),
            min_confidence: clamp_unit(self.min_confidence, 0.25),
            min_iou: clamp_unit(self.min_iou, 0.45),
            max_boxes_per_image: self.max_boxes_per_image.clamp(1, 2000),
            class_names,
        }
    }
}

fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

#[derive(Debug, Clone, Serialize)]
struct UploadedFile {
    name: String,
    /// Base64 file content.
    data: String,
}

#[derive(Debug, Clone, Serialize)]
struct UploadedImage {
    id: String,
    name: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
struct InferenceRequest {
    model: UploadedFile,
    images: Vec<UploadedImage>,
    settings: InferenceSettings,
}

/// Detection box corners in source image pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectionBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    pub class_id: i64,
    pub class_name: String,
    pub confidence: f64,
    pub bbox: DetectionBox,
}

/// Detections for one image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageResult {
    pub image_id: String,
    pub filename: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub num_detections: usize,
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// Annotated rendering as a `data:` URL.
    #[serde(default)]
    pub result_image: Option<String>,
    #[serde(default)]
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InferenceStats {
    pub total_images: usize,
    pub total_detections: usize,
    pub total_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InferenceResponse {
    #[serde(default)]
    pub results: Vec<ImageResult>,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub class_names: Vec<String>,
    #[serde(default)]
    pub stats: InferenceStats,
}

/// Everything one inference run needs.
#[derive(Debug, Clone)]
pub struct InferenceJob {
    pub model_path: PathBuf,
    pub images: Vec<FileEntry>,
    pub settings: InferenceSettings,
}

impl InferenceJob {
    fn into_request(self) -> Result<InferenceRequest> {
        if self.images.is_empty() {
            return Err(anyhow!("Add at least one image to run inference"));
        }
        let model_bytes = std::fs::read(&self.model_path)
            .with_context(|| format!("Failed to read model {}", self.model_path.display()))?;
        if model_bytes.is_empty() {
            return Err(anyhow!("The model file is empty"));
        }
        let model_name = self
            .model_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "uploaded.pt".to_string());

        let images = self
            .images
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let bytes = std::fs::read(&entry.path)
                    .with_context(|| format!("Failed to read {}", entry.path.display()))?;
                Ok(UploadedImage {
                    id: index.to_string(),
                    name: entry.display_name(),
                    data: STANDARD.encode(bytes),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(InferenceRequest {
            model: UploadedFile {
                name: model_name,
                data: STANDARD.encode(model_bytes),
            },
            images,
            settings: self.settings.sanitized(),
        })
    }
}

/// Run a job against the inference endpoint. Blocking.
pub fn run_inference(url: &str, job: InferenceJob) -> Result<InferenceResponse> {
    let request = job.into_request()?;
    log::info!(
        "Running inference on {} image(s) with {}",
        request.images.len(),
        request.model.name
    );
    let response = post_json(url, &request).map_err(|msg| anyhow!(msg))?;
    let body = response
        .into_string()
        .context("Failed to read inference response")?;
    parse_response(&body)
}

/// Parse a successful response body.
pub fn parse_response(body: &str) -> Result<InferenceResponse> {
    let parsed: InferenceResponse =
        serde_json::from_str(body).context("Malformed inference response")?;
    log::info!(
        "Inference finished: {} detection(s) over {} image(s) on {}",
        parsed.stats.total_detections,
        parsed.stats.total_images,
        parsed.device
    );
    Ok(parsed)
}
