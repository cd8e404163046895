//! JSON wrappers for classifier entities and parsed documents.
//!
//! Thin delegation to `serde_json` so callers get [`ClassifierError`]
//! instead of a raw `serde_json::Error`. The CLI uses these to read entities
//! for the writer and to print what the reader found.
//!
//! [`ClassifierError`]: crate::error::ClassifierError

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Deserialize an entity or document from a JSON string.
///
/// # Examples
///
/// ```
/// use omero_classifier::json::from_json_str;
/// use omero_classifier::ClassifierEntity;
///
/// let json = r#"{"FeatureSet": {"algorithm": {"id": 4}, "tableId": 9}}"#;
/// let entity: ClassifierEntity = from_json_str(json).unwrap();
/// assert_eq!(entity.tag(), "FeatureSet");
/// ```
pub fn from_json_str<'a, T>(s: &'a str) -> Result<T>
where
    T: Deserialize<'a>,
{
    Ok(serde_json::from_str(s)?)
}

/// Deserialize an entity or document from a reader.
pub fn from_json_reader<R, T>(reader: R) -> Result<T>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    Ok(serde_json::from_reader(reader)?)
}

/// Serialize to a compact JSON string.
pub fn to_json_string<T>(value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    Ok(serde_json::to_string(value)?)
}

/// Serialize to a pretty-printed JSON string.
pub fn to_json_string_pretty<T>(value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    Ok(serde_json::to_string_pretty(value)?)
}
