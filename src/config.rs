// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration.
//!
//! Settings are read from a YAML file at startup. Every field has a default,
//! so a missing or partial file still yields a usable configuration.

use crate::io::inference::InferenceSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at an alternative config file.
pub const CONFIG_ENV_VAR: &str = "ANNOBOX_CONFIG";

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the dataset/inference server.
    pub server_url: String,
    pub train_export_path: String,
    pub val_export_path: String,
    pub inference_path: String,
    /// Suggested file name for the downloaded train archive.
    pub train_export_filename: String,
    pub val_export_filename: String,
    /// How long notices stay on screen.
    pub notice_seconds: f32,
    pub log_level: LogLevel,
    /// Initial values of the inference form.
    pub inference: InferenceSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            train_export_path: "/train/export/".to_string(),
            val_export_path: "/val/export/".to_string(),
            inference_path: "/inference/run/".to_string(),
            train_export_filename: "train.zip".to_string(),
            val_export_filename: "val.zip".to_string(),
            notice_seconds: 4.0,
            log_level: LogLevel::default(),
            inference: InferenceSettings::default(),
        }
    }
}

impl AppConfig {
    /// Join the server URL with an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Invalid configuration")
    }

    /// `$ANNOBOX_CONFIG`, else `<config dir>/annobox/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("annobox").join("config.yaml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&yaml)
    }

    /// Load the config file, falling back to defaults.
    ///
    /// Runs before the logger exists, so problems are returned as warnings
    /// for the caller to log.
    pub fn load() -> (Self, Option<String>) {
        let Some(path) = Self::default_path() else {
            return (Self::default(), None);
        };
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load_from(&path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(format!("{:#}", e))),
        }
    }
}
