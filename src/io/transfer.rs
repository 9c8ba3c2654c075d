// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Class hand-over between pages.
//!
//! The Train page writes a snapshot of its classes into a session-scoped
//! slot named after the destination page; the destination reads it once when
//! it is entered. Reading always deletes the slot, parsed or not, so a stale
//! payload is never replayed.

use crate::error::{EditorError, EditorResult};
use crate::models::class::{Class, ClassId, Color};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Prefix of the session storage keys holding pending payloads.
pub const TRANSFER_KEY_PREFIX: &str = "annobox.classTransfer.";

/// Page a payload is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Val,
    Inference,
}

impl Destination {
    pub fn storage_key(self) -> String {
        let page = match self {
            Destination::Val => "val",
            Destination::Inference => "inference",
        };
        format!("{}{}", TRANSFER_KEY_PREFIX, page)
    }
}

/// Session-scoped string key/value storage.
pub trait SessionStorage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: String);
    fn remove_item(&mut self, key: &str);
}

/// Storage that lives as long as the process, i.e. the session.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: HashMap<String, String>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.items.insert(key.to_string(), value);
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}

/// One class entry on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferClass {
    pub id: String,
    pub label: String,
    pub color: String,
}

/// Snapshot of class definitions handed to another page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPayload {
    pub classes: Vec<TransferClass>,
    #[serde(rename = "activeClassId")]
    pub active_class_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Classes recovered from a payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoredClasses {
    pub classes: Vec<Class>,
    pub active_class_id: Option<ClassId>,
}

/// Build a payload stamped with the current time.
pub fn serialize(classes: &[Class], active_class_id: Option<ClassId>) -> TransferPayload {
    TransferPayload {
        classes: classes
            .iter()
            .map(|c| TransferClass {
                id: c.id.to_string(),
                label: c.label.clone(),
                color: c.color.to_hex(),
            })
            .collect(),
        active_class_id: active_class_id.map(|id| id.to_string()),
        timestamp: chrono::Utc::now().timestamp_millis(),
    }
}

/// Parse a raw payload.
///
/// Only a payload that is not JSON, or whose `classes` is not a list, is
/// rejected. Broken entries get a fallback label and palette color instead.
pub fn deserialize(raw: &str) -> EditorResult<RestoredClasses> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| EditorError::TransferMalformed(e.to_string()))?;
    let entries = value
        .get("classes")
        .and_then(Value::as_array)
        .ok_or_else(|| EditorError::TransferMalformed("classes is not a list".to_string()))?;

    let mut seen = HashSet::new();
    // Incoming ids need not be uuids; remember which id each raw one became
    let mut assigned: HashMap<&str, ClassId> = HashMap::new();
    let classes: Vec<Class> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let raw_id = entry.get("id").and_then(Value::as_str);
            let id = raw_id
                .and_then(|s| Uuid::parse_str(s).ok())
                .filter(|id| !seen.contains(id))
                .unwrap_or_else(Uuid::new_v4);
            seen.insert(id);
            if let Some(raw_id) = raw_id {
                assigned.entry(raw_id).or_insert(id);
            }

            let label = entry
                .get("label")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Class {}", index + 1));

            let color = entry
                .get("color")
                .and_then(Value::as_str)
                .and_then(Color::parse_hex)
                .unwrap_or_else(|| Color::from_palette(index));

            Class { id, label, color }
        })
        .collect();

    let active_class_id = value
        .get("activeClassId")
        .and_then(Value::as_str)
        .and_then(|raw| assigned.get(raw).copied())
        .or_else(|| classes.first().map(|c| c.id));

    Ok(RestoredClasses {
        classes,
        active_class_id,
    })
}

/// Single-read message channel on top of session storage.
#[derive(Debug, Default)]
pub struct TransferChannel<S: SessionStorage> {
    storage: S,
}

impl<S: SessionStorage> TransferChannel<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Leave a class snapshot for `destination`, replacing any pending one.
    pub fn send(
        &mut self,
        destination: Destination,
        classes: &[Class],
        active_class_id: Option<ClassId>,
    ) -> anyhow::Result<()> {
        let payload = serialize(classes, active_class_id);
        let json = serde_json::to_string(&payload)?;
        self.storage.set_item(&destination.storage_key(), json);
        log::info!("Queued {} class(es) for {:?}", payload.classes.len(), destination);
        Ok(())
    }

    /// Consume the pending payload for `destination`.
    ///
    /// `Ok(None)` when nothing was pending. The slot is gone afterwards in
    /// every case.
    pub fn receive(&mut self, destination: Destination) -> EditorResult<Option<RestoredClasses>> {
        let key = destination.storage_key();
        let Some(raw) = self.storage.get_item(&key) else {
            return Ok(None);
        };
        self.storage.remove_item(&key);

        let restored = deserialize(&raw).inspect_err(|e| {
            log::warn!("Discarding class transfer for {:?}: {}", destination, e);
        })?;
        log::info!("Received {} class(es) for {:?}", restored.classes.len(), destination);
        Ok(Some(restored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::class::PALETTE;

    fn channel() -> TransferChannel<MemorySessionStorage> {
        TransferChannel::new(MemorySessionStorage::new())
    }

    #[test]
    fn test_send_then_receive_restores_classes() {
        let classes = vec![Class::new("cat", PALETTE[0]), Class::new("dog", PALETTE[1])];
        let mut channel = channel();
        channel.send(Destination::Val, &classes, Some(classes[1].id)).unwrap();

        let restored = channel.receive(Destination::Val).unwrap().unwrap();
        assert_eq!(restored.classes, classes);
        assert_eq!(restored.active_class_id, Some(classes[1].id));
    }

    #[test]
    fn test_payload_is_consumed_once() {
        let mut channel = channel();
        channel.send(Destination::Val, &[Class::new("cat", PALETTE[0])], None).unwrap();
        assert!(channel.receive(Destination::Val).unwrap().is_some());
        assert_eq!(channel.receive(Destination::Val), Ok(None));
    }

    #[test]
    fn test_destinations_are_separate_slots() {
        let mut channel = channel();
        channel.send(Destination::Inference, &[Class::new("cat", PALETTE[0])], None).unwrap();
        assert_eq!(channel.receive(Destination::Val), Ok(None));
        assert!(channel.receive(Destination::Inference).unwrap().is_some());
    }

    #[test]
    fn test_malformed_payload_is_deleted_anyway() {
        let mut storage = MemorySessionStorage::new();
        storage.set_item(&Destination::Val.storage_key(), "{not json".to_string());
        let mut channel = TransferChannel::new(storage);

        assert!(matches!(
            channel.receive(Destination::Val),
            Err(EditorError::TransferMalformed(_))
        ));
        assert_eq!(channel.receive(Destination::Val), Ok(None));
    }

    #[test]
    fn test_classes_must_be_a_list() {
        let result = deserialize(r#"{"classes": {"id": "x"}, "timestamp": 0}"#);
        assert!(matches!(result, Err(EditorError::TransferMalformed(_))));
        let result = deserialize(r#"{"timestamp": 0}"#);
        assert!(matches!(result, Err(EditorError::TransferMalformed(_))));
    }

    #[test]
    fn test_empty_classes_restore_nothing() {
        let restored = deserialize(r#"{"classes": [], "activeClassId": null, "timestamp": 0}"#).unwrap();
        assert!(restored.classes.is_empty());
        assert_eq!(restored.active_class_id, None);
    }

    #[test]
    fn test_broken_entries_get_fallbacks() {
        let raw = r##"{
            "classes": [
                {"id": "not-a-uuid", "label": "  ", "color": "blue"},
                42,
                {"label": "dog", "color": "#00ff00"}
            ],
            "activeClassId": "also-not-a-uuid",
            "timestamp": 0
        }"##;
        let restored = deserialize(raw).unwrap();
        assert_eq!(restored.classes.len(), 3);
        assert_eq!(restored.classes[0].label, "Class 1");
        assert_eq!(restored.classes[0].color, PALETTE[0]);
        assert_eq!(restored.classes[1].label, "Class 2");
        assert_eq!(restored.classes[1].color, PALETTE[1]);
        assert_eq!(restored.classes[2].label, "dog");
        assert_eq!(restored.classes[2].color, Color([0, 255, 0]));
        assert_eq!(restored.active_class_id, Some(restored.classes[0].id));
    }

    #[test]
    fn test_active_class_resolves_through_opaque_ids() {
        let raw = r##"{
            "classes": [
                {"id": "c1", "label": "cat", "color": "#ff0000"},
                {"id": "c2", "label": "dog", "color": "#00ff00"}
            ],
            "activeClassId": "c2",
            "timestamp": 0
        }"##;
        let restored = deserialize(raw).unwrap();
        assert_eq!(restored.classes.len(), 2);
        assert_ne!(restored.classes[0].id, restored.classes[1].id);
        let active = restored
            .classes
            .iter()
            .find(|c| Some(c.id) == restored.active_class_id)
            .unwrap();
        assert_eq!(active.label, "dog");
    }

    #[test]
    fn test_duplicate_ids_are_replaced() {
        let id = Uuid::new_v4();
        let raw = format!(
            r##"{{"classes": [{{"id": "{id}", "label": "a", "color": "#000"}}, {{"id": "{id}", "label": "b", "color": "#000"}}], "timestamp": 0}}"##
        );
        let restored = deserialize(&raw).unwrap();
        assert_eq!(restored.classes[0].id, id);
        assert_ne!(restored.classes[1].id, id);
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let class = Class::new("cat", PALETTE[2]);
        let json = serde_json::to_value(serialize(&[class.clone()], Some(class.id))).unwrap();
        assert_eq!(json["activeClassId"], class.id.to_string());
        assert_eq!(json["classes"][0]["color"], PALETTE[2].to_hex());
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }
}
