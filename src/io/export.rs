// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation export.
//!
//! The editor snapshots its classes and images into a JSON request body and
//! posts it to the dataset packaging endpoint, which answers with a zip
//! archive. The snapshot is taken up front, so edits made while a request is
//! in flight are simply not part of it.

use crate::error::{EditorError, EditorResult};
use crate::io::media::to_data_url;
use crate::models::class::{ClassId, Color};
use crate::models::image::{BoxId, ImageId};
use crate::models::store::EntityStore;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Shown when the server gives no reason of its own.
pub const GENERIC_FAILURE: &str = "The server could not process the request";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportClass {
    pub id: ClassId,
    pub label: String,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportBox {
    pub id: BoxId,
    #[serde(rename = "classId")]
    pub class_id: ClassId,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportImage {
    pub id: ImageId,
    pub name: String,
    pub boxes: Vec<ExportBox>,
    /// Image bytes as a `data:` URL.
    pub src: String,
}

/// Request body for the export endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub classes: Vec<ExportClass>,
    pub images: Vec<ExportImage>,
}

impl ExportRequest {
    /// Snapshot the store.
    pub fn from_store(store: &EntityStore) -> Self {
        Self {
            classes: store
                .classes()
                .iter()
                .map(|c| ExportClass {
                    id: c.id,
                    label: c.label.clone(),
                    color: c.color,
                })
                .collect(),
            images: store
                .images()
                .iter()
                .map(|image| ExportImage {
                    id: image.id,
                    name: image.name.clone(),
                    boxes: image
                        .boxes
                        .iter()
                        .map(|b| ExportBox {
                            id: b.id,
                            class_id: b.class_id,
                            x: b.x,
                            y: b.y,
                            w: b.w,
                            h: b.h,
                            color: b.color,
                        })
                        .collect(),
                    src: to_data_url(&image.pixels.media_type, &image.pixels.encoded),
                })
                .collect(),
        }
    }

    pub fn box_count(&self) -> usize {
        self.images.iter().map(|i| i.boxes.len()).sum()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// User-facing message for a failed response body.
pub fn server_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .map(|msg| msg.trim().to_string())
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

/// POST a JSON body, turning non-success statuses into readable errors.
pub(crate) fn post_json<T: Serialize>(url: &str, body: &T) -> Result<ureq::Response, String> {
    match ureq::post(url)
        .set("Content-Type", "application/json")
        .send_json(body)
    {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            log::warn!("{} answered HTTP {}", url, code);
            Err(server_error_message(&body))
        }
        Err(ureq::Error::Transport(transport)) => {
            log::warn!("Request to {} failed: {}", url, transport);
            Err(format!("Could not reach the server: {}", transport))
        }
    }
}

/// Post an export and return the archive bytes.
pub fn send_export(url: &str, request: &ExportRequest) -> EditorResult<Vec<u8>> {
    log::info!(
        "Exporting {} class(es), {} image(s), {} box(es) to {}",
        request.classes.len(),
        request.images.len(),
        request.box_count(),
        url
    );
    let response = post_json(url, request).map_err(EditorError::ExportFailed)?;

    let mut archive = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut archive)
        .map_err(|e| EditorError::ExportFailed(format!("Failed to read archive: {}", e)))?;
    log::info!("Received export archive ({} bytes)", archive.len());
    Ok(archive)
}
