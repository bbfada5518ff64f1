//! Registry snapshot loading
//!
//! The snapshot is a JSON file written by the registry fetch job: either a
//! bare array of records or an object holding the array under `products` or
//! `entities`. Each record needs an identifier (`identifier`, `model` or
//! `id`, string or number); `sku`, `name` and `url` are picked up when they
//! are strings or numbers, everything else goes into the attribute map.
//!
//! Records that are not objects or carry no identifier are skipped and
//! returned with the snapshot. Records repeating an identifier are kept, so
//! every loaded record is accounted for by the reverse pass.

use crate::error::{CardMatchError, Result};
use cardmatch_common::CanonicalEntity;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

const IDENTIFIER_KEYS: &[&str] = &["identifier", "model", "id"];
const ARRAY_KEYS: &[&str] = &["products", "entities"];

/// A snapshot record that did not become an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Position in the snapshot array
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub entities: Vec<CanonicalEntity>,
    pub skipped: Vec<SkippedRecord>,
    /// Records whose identifier was already taken by an earlier record
    pub duplicate_identifiers: usize,
}

impl RegistrySnapshot {
    /// Every record in the snapshot array
    pub fn record_count(&self) -> usize {
        self.entities.len() + self.skipped.len()
    }
}

pub fn load_registry(path: &Path) -> Result<RegistrySnapshot> {
    if !path.exists() {
        return Err(CardMatchError::FileNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| CardMatchError::InvalidRegistry(format!("{}: {}", path.display(), e)))?;

    let snapshot = parse_registry(&value)?;
    info!(
        path = %path.display(),
        entities = snapshot.entities.len(),
        skipped = snapshot.skipped.len(),
        duplicates = snapshot.duplicate_identifiers,
        "loaded registry snapshot"
    );
    Ok(snapshot)
}

pub fn parse_registry(value: &Value) -> Result<RegistrySnapshot> {
    let records = match value {
        Value::Array(records) => records,
        Value::Object(map) => ARRAY_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or_else(|| {
                CardMatchError::InvalidRegistry("expected an array or a `products`/`entities` array".into())
            })?,
        _ => {
            return Err(CardMatchError::InvalidRegistry(
                "expected an array or an object".into(),
            ))
        }
    };

    let mut snapshot = RegistrySnapshot {
        entities: Vec::with_capacity(records.len()),
        ..Default::default()
    };
    let mut seen = HashSet::new();

    for (position, record) in records.iter().enumerate() {
        let Some(map) = record.as_object() else {
            warn!(position, "registry record is not an object, skipped");
            snapshot.skipped.push(SkippedRecord {
                position,
                reason: "not an object".into(),
            });
            continue;
        };
        let Some(entity) = parse_entity(map) else {
            warn!(position, "registry record has no identifier, skipped");
            snapshot.skipped.push(SkippedRecord {
                position,
                reason: "no identifier".into(),
            });
            continue;
        };

        if !seen.insert(entity.identifier.clone()) {
            warn!(identifier = %entity.identifier, position, "duplicate registry identifier");
            snapshot.duplicate_identifiers += 1;
        }
        snapshot.entities.push(entity);
    }

    Ok(snapshot)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_entity(map: &Map<String, Value>) -> Option<CanonicalEntity> {
    let (id_key, identifier) = IDENTIFIER_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(scalar_text).map(|id| (*key, id)))?;

    let mut entity = CanonicalEntity::new(identifier);
    for (key, value) in map {
        match key.as_str() {
            k if k == id_key => {}
            "sku" => entity.sku = scalar_text(value),
            "name" => entity.name = scalar_text(value),
            "url" => entity.url = scalar_text(value),
            _ => entity = entity.with_attribute(key.clone(), value.clone()),
        }
    }
    Some(entity)
}
