//! Reading, writing and extending artifact documents.
//!
//! Artifacts are kept as `serde_json::Value` so fields written by other tools
//! survive a pass through a stage untouched.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use placeseo_shared::{
    ArtifactKind, BrandPaths, CURRENT_SCHEMA_VERSION, Intake, PlaceSeoError, Result,
};

/// Read a JSON file. A missing file is `NotFound`, bad JSON is `Parse`.
pub fn read_json(path: &Path, what: &str) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PlaceSeoError::not_found(what, path)
        } else {
            PlaceSeoError::io(path, e)
        }
    })?;
    serde_json::from_str(&content)
        .map_err(|e| PlaceSeoError::parse(format!("{}: {e}", path.display())))
}

pub fn read_artifact(paths: &BrandPaths, kind: ArtifactKind) -> Result<Value> {
    read_json(&paths.artifact(kind), kind.file_name())
}

pub fn read_intake(paths: &BrandPaths) -> Result<Intake> {
    let value = read_artifact(paths, ArtifactKind::Intake)?;
    serde_json::from_value(value).map_err(|e| {
        PlaceSeoError::parse(format!("{}: {e}", paths.artifact(ArtifactKind::Intake).display()))
    })
}

/// Write `data` as pretty JSON: temp file first, then rename over the target.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| PlaceSeoError::parse(format!("JSON serialization failed: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PlaceSeoError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));
    std::fs::write(&temp, json).map_err(|e| PlaceSeoError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| PlaceSeoError::io(path, e))?;

    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

pub fn write_artifact(paths: &BrandPaths, kind: ArtifactKind, doc: &Value) -> Result<PathBuf> {
    let path = paths.artifact(kind);
    write_json(&path, doc)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Document helpers
// ---------------------------------------------------------------------------

/// Set `meta.schema_version`, `meta.generated_at` and `meta.stage`.
pub fn stamp(doc: &mut Value, kind: ArtifactKind) {
    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    merge(
        doc,
        serde_json::json!({
            "meta": {
                "schema_version": CURRENT_SCHEMA_VERSION,
                "generated_at": generated_at,
                "stage": kind.stage_tag(),
            }
        }),
    );
}

/// Deep-merge `patch` into `target`: objects merge key by key, anything else
/// in the patch replaces what was there.
pub fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

/// String at a JSON pointer, or `""`.
pub fn str_at<'a>(doc: &'a Value, pointer: &str) -> &'a str {
    doc.pointer(pointer).and_then(Value::as_str).unwrap_or("")
}

/// String elements of the array at a JSON pointer; other elements are skipped.
pub fn strings_at(doc: &Value, pointer: &str) -> Vec<String> {
    doc.pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Array at a JSON pointer, or an empty slice.
pub fn array_at<'a>(doc: &'a Value, pointer: &str) -> &'a [Value] {
    doc.pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Mutable object at a JSON pointer, creating it (and replacing non-objects).
pub fn object_at<'a>(doc: &'a mut Value, pointer: &str) -> &'a mut Map<String, Value> {
    let mut cur = doc;
    for key in pointer.split('/').skip(1) {
        cur = ensure_object(cur).entry(key).or_insert(Value::Null);
    }
    ensure_object(cur)
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}
