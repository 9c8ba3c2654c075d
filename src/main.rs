// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annobox - bounding box annotation for object detection datasets
//!
//! A desktop application for labelling images with class boxes, exporting
//! train/val splits to a dataset server and running inference on it.

mod app;
mod config;
mod editor;
mod error;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::AnnoboxApp;
use config::AppConfig;

fn main() -> Result<()> {
    let (config, warning) = AppConfig::load();

    // Initialize logging; RUST_LOG overrides the configured level
    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_env(env_logger::Env::default())
        .init();

    if let Some(warning) = warning {
        log::warn!("Using default configuration: {}", warning);
    }
    log::info!("Dataset server at {}", config.server_url);

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Annobox - Bounding Box Annotation"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Annobox",
        options,
        Box::new(|_cc| Ok(Box::new(AnnoboxApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
