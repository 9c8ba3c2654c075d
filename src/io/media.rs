// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading.
//!
//! This module handles the image import boundary: filtering files by media
//! type, decoding them into RGBA pixels for display, and converting between
//! raw bytes and `data:` URLs used on the wire.

use crate::models::image::PixelSource;
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A file handed to the import boundary.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub media_type: String,
}

impl FileEntry {
    pub fn from_path(path: PathBuf) -> Self {
        let media_type = media_type_for_path(&path);
        Self { path, media_type }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string())
    }
}

/// Declared media type of a file, derived from its extension.
pub fn media_type_for_path(path: &Path) -> String {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// Keep only entries whose media type is `image/*`.
pub fn accept_images(entries: Vec<FileEntry>) -> Vec<FileEntry> {
    let total = entries.len();
    let accepted: Vec<FileEntry> = entries.into_iter().filter(FileEntry::is_image).collect();
    if accepted.len() < total {
        log::debug!("Skipped {} non-image file(s)", total - accepted.len());
    }
    accepted
}

/// Read and decode an image file.
pub fn load_image(entry: &FileEntry) -> Result<PixelSource> {
    let bytes = std::fs::read(&entry.path)
        .with_context(|| format!("Failed to read {}", entry.path.display()))?;
    decode_pixels(&entry.media_type, bytes)
}

/// Decode encoded image bytes into a displayable pixel source.
pub fn decode_pixels(media_type: &str, bytes: Vec<u8>) -> Result<PixelSource> {
    let decoded = image::load_from_memory(&bytes).context("Unsupported or corrupt image data")?;
    let rgba = decoded.to_rgba8();
    Ok(PixelSource {
        media_type: media_type.to_string(),
        width: rgba.width(),
        height: rgba.height(),
        encoded: Arc::from(bytes),
        rgba: Arc::from(rgba.into_raw()),
    })
}

/// Encode bytes as a base64 `data:` URL.
pub fn to_data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}

/// Split a base64 `data:` URL into its media type and bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("Not a data URL"))?;
    let (header, encoded) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("Data URL has no payload"))?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("Data URL is not base64 encoded"))?;
    let bytes = STANDARD
        .decode(encoded.trim())
        .context("Invalid base64 in data URL")?;
    Ok((media_type.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_media_type_from_extension() {
        assert_eq!(media_type_for_path(Path::new("a/b.PNG")), "image/png");
        assert_eq!(media_type_for_path(Path::new("photo.jpg")), "image/jpeg");
        assert_eq!(media_type_for_path(Path::new("notes.txt")), "application/octet-stream");
        assert_eq!(media_type_for_path(Path::new("no_extension")), "application/octet-stream");
    }

    #[test]
    fn test_accept_images_skips_other_types() {
        let entries = vec![
            FileEntry::from_path(PathBuf::from("a.png")),
            FileEntry::from_path(PathBuf::from("model.pt")),
            FileEntry::from_path(PathBuf::from("b.jpeg")),
        ];
        let accepted = accept_images(entries);
        let names: Vec<String> = accepted.iter().map(FileEntry::display_name).collect();
        assert_eq!(names, ["a.png", "b.jpeg"]);
    }

    #[test]
    fn test_decode_pixels() {
        let pixels = decode_pixels("image/png", png_bytes()).unwrap();
        assert_eq!((pixels.width, pixels.height), (3, 2));
        assert_eq!(pixels.rgba.len(), 3 * 2 * 4);
        assert_eq!(&pixels.rgba[0..4], &[10, 20, 30, 255]);
        assert!(decode_pixels("image/png", vec![1, 2, 3]).is_err());
    }

    #[test]
    fn test_data_url_roundtrip() {
        let url = to_data_url("image/png", &[1, 2, 3, 250]);
        assert!(url.starts_with("data:image/png;base64,"));
        let (media_type, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(media_type, "image/png");
        assert_eq!(bytes, [1, 2, 3, 250]);
    }

    #[test]
    fn test_decode_data_url_rejects_garbage() {
        assert!(decode_data_url("http://example.com/a.png").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("data:text/plain,hello").is_err());
    }
}
