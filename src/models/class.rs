// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation class definitions.
//!
//! A class is a named, colored category that boxes are tagged with. Colors
//! travel as `#rrggbb` strings so exported data stays readable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Identifier of a class.
pub type ClassId = Uuid;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 3]);

/// Default class colors, handed out in rotation.
pub const PALETTE: [Color; 10] = [
    Color([0xef, 0x44, 0x44]),
    Color([0x3b, 0x82, 0xf6]),
    Color([0x22, 0xc5, 0x5e]),
    Color([0xf5, 0x9e, 0x0b]),
    Color([0xa8, 0x55, 0xf7]),
    Color([0xec, 0x48, 0x99]),
    Color([0x14, 0xb8, 0xa6]),
    Color([0xf9, 0x73, 0x16]),
    Color([0x63, 0x66, 0xf1]),
    Color([0x84, 0xcc, 0x16]),
];

impl Color {
    /// Palette color for the class at `index`.
    pub fn from_palette(index: usize) -> Self {
        PALETTE[index % PALETTE.len()]
    }

    /// Parse `#rgb` or `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    let v = c.to_digit(16)? as u8;
                    rgb[i] = v * 16 + v;
                }
                Some(Color(rgb))
            }
            6 if hex.is_ascii() => Some(Color([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            ])),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }

    pub fn to_egui(self) -> egui::Color32 {
        egui::Color32::from_rgb(self.0[0], self.0[1], self.0[2])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Color::parse_hex(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color: {}", raw)))
    }
}

/// A labeled, colored annotation category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub label: String,
    pub color: Color,
}

impl Class {
    /// Create a class with a fresh id.
    pub fn new(label: impl Into<String>, color: Color) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            color,
        }
    }

    /// Case-insensitive label comparison used for uniqueness checks.
    pub fn label_matches(&self, label: &str) -> bool {
        self.label.to_lowercase() == label.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Color::parse_hex("#ff0080"), Some(Color([255, 0, 128])));
        assert_eq!(Color::parse_hex("FF0080"), Some(Color([255, 0, 128])));
        assert_eq!(Color::parse_hex("#f08"), Some(Color([255, 0, 136])));
        assert_eq!(Color::parse_hex("#12345"), None);
        assert_eq!(Color::parse_hex("#gg0000"), None);
    }

    #[test]
    fn test_color_serializes_as_hex_string() {
        let json = serde_json::to_string(&Color([1, 2, 255])).unwrap();
        assert_eq!(json, "\"#0102ff\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color([1, 2, 255]));
    }

    #[test]
    fn test_palette_rotates() {
        assert_eq!(Color::from_palette(0), PALETTE[0]);
        assert_eq!(Color::from_palette(PALETTE.len() + 3), PALETTE[3]);
    }

    #[test]
    fn test_label_matches_ignores_case() {
        let class = Class::new("Cat", PALETTE[0]);
        assert!(class.label_matches("cAT"));
        assert!(!class.label_matches("dog"));
    }
}
