//! Dot-joined flattening for tabular consumers
//!
//! Nested objects become `parent.child` columns; arrays and scalars are kept
//! as single values. A joined track record flattens to columns such as
//! `track.name`, `track.album.name`, `audio_features.energy`, `user.id`.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::Record;

/// Flatten nested objects of a record into dot-joined keys
///
/// Key order follows a depth-first walk of the record. An empty nested object
/// produces no columns.
///
/// # Errors
/// Returns [`Error::Shape`] if two paths flatten to the same column, e.g. a
/// literal `"a.b"` key next to `{"a": {"b": ..}}`.
///
/// ```
/// use listen_harvest::flatten::flatten_record;
/// use serde_json::json;
///
/// let record = json!({"track": {"id": "a", "album": {"name": "B"}}, "audio_features": null});
/// let flat = flatten_record(record.as_object().unwrap()).unwrap();
/// assert_eq!(flat["track.album.name"], "B");
/// assert!(flat["audio_features"].is_null());
/// ```
pub fn flatten_record(record: &Record) -> Result<Map<String, Value>> {
    let mut flat = Map::new();
    flatten_into(&mut flat, None, record)?;
    Ok(flat)
}

fn flatten_into(
    flat: &mut Map<String, Value>,
    prefix: Option<&str>,
    fields: &Map<String, Value>,
) -> Result<()> {
    for (key, value) in fields {
        let column = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(flat, Some(&column), nested)?,
            other => {
                if flat.contains_key(&column) {
                    return Err(Error::shape(
                        format!("column '{column}' appears twice after flattening"),
                        Value::Object(fields.clone()),
                    ));
                }
                flat.insert(column, other.clone());
            }
        }
    }
    Ok(())
}
