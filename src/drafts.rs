//! Draft export/import: a flat JSON snapshot of form values.
//!
//! The file is one object keyed by form field name. Every known field is
//! written, unset ones as `null`. On import only known keys are applied and
//! the whole document is validated before anything is applied, so a bad
//! file never leaves a half-merged form behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::error::DraftError;
use crate::models::form::{Field, FieldValue, Form};

/// Flat JSON object with one entry per allow-listed field.
///
/// A non-finite number has no JSON form and fails the export rather than
/// being written as `null`.
pub fn export(form: &Form) -> Result<Value, DraftError> {
    let mut object = Map::new();
    for field in Field::ALL {
        let value = match form.get(field) {
            Some(FieldValue::Number(n)) => match serde_json::Number::from_f64(*n) {
                Some(number) => Value::Number(number),
                None => {
                    return Err(DraftError::InvalidValue {
                        key: field.as_str().to_string(),
                    })
                }
            },
            Some(FieldValue::Text(text)) => Value::String(text.clone()),
            Some(FieldValue::Flag(flag)) => Value::Bool(*flag),
            None => Value::Null,
        };
        object.insert(field.as_str().to_string(), value);
    }
    Ok(Value::Object(object))
}

pub fn to_json_string(form: &Form) -> Result<String, DraftError> {
    Ok(serde_json::to_string_pretty(&export(form)?)?)
}

/// One validated change from a draft.
enum Change {
    Set(Field, FieldValue),
    Clear(Field),
}

fn parse_changes(raw: &str) -> Result<Vec<Change>, DraftError> {
    let document: Value = serde_json::from_str(raw)?;
    let Value::Object(object) = document else {
        return Err(DraftError::NotAnObject);
    };

    let mut changes = Vec::with_capacity(object.len());
    for (key, value) in object {
        let Ok(field) = key.parse::<Field>() else {
            warn!(key = %key, "ignoring unknown draft key");
            continue;
        };
        let change = match value {
            Value::Null => Change::Clear(field),
            Value::Bool(flag) => Change::Set(field, FieldValue::Flag(flag)),
            Value::String(text) => Change::Set(field, FieldValue::Text(text)),
            Value::Number(number) => match number.as_f64() {
                Some(n) => Change::Set(field, FieldValue::Number(n)),
                None => return Err(DraftError::InvalidValue { key }),
            },
            Value::Array(_) | Value::Object(_) => return Err(DraftError::InvalidValue { key }),
        };
        changes.push(change);
    }
    Ok(changes)
}

/// Apply a draft document on top of `current`.
///
/// Keys absent from the document keep their current value; `null` clears.
/// On error `current` is untouched and no form is returned.
pub fn import(current: &Form, raw: &str) -> Result<Form, DraftError> {
    let changes = parse_changes(raw)?;

    let mut form = current.clone();
    for change in changes {
        match change {
            Change::Set(field, value) => form.set(field, value),
            Change::Clear(field) => form.clear(field),
        }
    }
    Ok(form)
}

#[instrument(skip(form), fields(path = %path.display()))]
pub fn save(path: &Path, form: &Form) -> Result<(), DraftError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json_string(form)?)?;
    info!("draft saved");
    Ok(())
}

#[instrument(skip(current), fields(path = %path.display()))]
pub fn load(path: &Path, current: &Form) -> Result<Form, DraftError> {
    let raw = fs::read_to_string(path)?;
    let form = import(current, &raw)?;
    info!("draft loaded");
    Ok(form)
}

/// Timestamped draft file name inside `dir`, to the millisecond.
pub fn default_draft_path(dir: &Path) -> PathBuf {
    dir.join(format!("draft-{}.json", Local::now().format("%Y%m%d-%H%M%S-%3f")))
}
