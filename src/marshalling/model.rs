//! Auto-marshalling Models
//!
//! Models are plain serde structs. Implementing [`AutoMarshallingModel`]
//! declares how they appear on the wire (root element, known and required
//! field names, supported formats) and provides JSON/XML conversion.
//!
//! Deserialization never fails loudly: a body that cannot be parsed, has the
//! wrong root, or (under [`DeserializePolicy::Strict`]) carries unexpected
//! fields or lacks required ones yields `None` and a logged warning.
//!
//! # Example
//!
//! ```
//! use cloudcafe::marshalling::{AutoMarshallingModel, DeserializePolicy, Format};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Image {
//!     id: String,
//!     #[serde(rename = "type")]
//!     type_: String,
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     checksum: Option<String>,
//! }
//!
//! impl AutoMarshallingModel for Image {
//!     const ROOT_TAG: &'static str = "image";
//!     const FIELDS: &'static [&'static str] = &["id", "type", "checksum"];
//!     const REQUIRED_FIELDS: &'static [&'static str] = &["id", "type"];
//! }
//!
//! let body = r#"{"image": {"id": "abc", "type": "snapshot"}}"#;
//! let image = Image::unmarshal(body, Format::Json, DeserializePolicy::Strict).unwrap();
//! assert_eq!(image.type_, "snapshot");
//! assert_eq!(image.marshal(Format::Json).unwrap(), body.replace(' ', ""));
//! ```

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CafeError, Result};

use super::format::{DeserializePolicy, Format};
use super::xml;

/// Wire contract of a marshallable model.
pub trait AutoMarshallingModel: Serialize + DeserializeOwned {
    /// JSON wrapper key and XML root element.
    const ROOT_TAG: &'static str;

    /// Every wire name the model knows.
    const FIELDS: &'static [&'static str];

    /// Wire names a strict body must carry.
    const REQUIRED_FIELDS: &'static [&'static str] = &[];

    /// Whether JSON bodies are wrapped as `{ROOT_TAG: {...}}`.
    const JSON_WRAPPED: bool = true;

    /// Wrapper key of JSON list bodies; `None` means a bare array.
    const COLLECTION_TAG: Option<&'static str> = None;

    const FORMATS: &'static [Format] = &[Format::Json, Format::Xml];

    fn model_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    fn supports(format: Format) -> bool {
        Self::FORMATS.contains(&format)
    }

    /// JSON value of the model with unset and empty members removed.
    fn to_json_value(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        prune_empty(&mut value);
        Ok(value)
    }

    /// Serializes the model for a request body.
    fn marshal(&self, format: Format) -> Result<String> {
        if !Self::supports(format) {
            return Err(CafeError::UnsupportedFormat {
                model: Self::model_name(),
                format,
            });
        }

        match format {
            Format::Json => {
                let value = self.to_json_value()?;
                let body = if Self::JSON_WRAPPED {
                    wrap(Self::ROOT_TAG, value)
                } else {
                    value
                };
                Ok(serde_json::to_string(&body)?)
            }
            Format::Xml => Ok(xml::to_xml(Self::ROOT_TAG, self)?),
        }
    }

    /// Serializes a list of models as a JSON body.
    fn marshal_list(items: &[Self]) -> Result<String> {
        let values = items
            .iter()
            .map(|item| item.to_json_value())
            .collect::<Result<Vec<_>>>()?;

        let body = match Self::COLLECTION_TAG {
            Some(tag) => wrap(tag, Value::Array(values)),
            None => Value::Array(values),
        };
        Ok(serde_json::to_string(&body)?)
    }

    /// Deserializes a response body, or `None` if it does not fit the model.
    ///
    /// XML bodies may carry fields as root attributes or child elements.
    /// Prefixed wire names are matched by their local part, so such fields
    /// need `#[serde(alias = "<local name>")]`; a prefixed field that was
    /// present but not read rejects the body under the strict policy.
    fn unmarshal(body: &str, format: Format, policy: DeserializePolicy) -> Option<Self> {
        if !Self::supports(format) {
            warn!("{} does not support the {} format", Self::model_name(), format);
            return None;
        }

        match format {
            Format::Json => unmarshal_json(body, policy),
            Format::Xml => unmarshal_xml(body, policy),
        }
    }

    /// Deserializes an already unwrapped JSON object.
    fn from_json_value(value: Value, policy: DeserializePolicy) -> Option<Self> {
        let Value::Object(map) = value else {
            warn!("{}: expected a JSON object", Self::model_name());
            return None;
        };

        let present: Vec<&str> = map.keys().map(String::as_str).collect();
        if !fields_acceptable::<Self>(&present, policy) {
            return None;
        }

        serde_json::from_value(Value::Object(map))
            .map_err(|e| warn!("{}: failed to deserialize JSON: {}", Self::model_name(), e))
            .ok()
    }

    /// Deserializes a JSON list body.
    ///
    /// Any element that does not fit the model makes the whole list `None`.
    fn unmarshal_list(body: &str, policy: DeserializePolicy) -> Option<Vec<Self>> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| warn!("{}: invalid JSON list body: {}", Self::model_name(), e))
            .ok()?;

        let items = match (Self::COLLECTION_TAG, value) {
            (Some(tag), Value::Object(mut map)) => map.remove(tag),
            (None, value @ Value::Array(_)) => Some(value),
            _ => None,
        };

        let Some(Value::Array(items)) = items else {
            warn!(
                "{}: list body is not {}",
                Self::model_name(),
                Self::COLLECTION_TAG
                    .map(|tag| format!("wrapped in '{}'", tag))
                    .unwrap_or_else(|| "an array".to_string())
            );
            return None;
        };

        items
            .into_iter()
            .map(|item| Self::from_json_value(item, policy))
            .collect()
    }
}

fn wrap(tag: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(tag.to_string(), value);
    Value::Object(map)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Removes `null` members and empty containers from objects, recursively.
pub fn prune_empty(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for member in map.values_mut() {
                prune_empty(member);
            }
            map.retain(|_, member| !is_empty_value(member));
        }
        Value::Array(items) => items.iter_mut().for_each(prune_empty),
        _ => {}
    }
}

fn fields_acceptable<M: AutoMarshallingModel>(present: &[&str], policy: DeserializePolicy) -> bool {
    check_fields(M::model_name(), present, M::FIELDS, M::REQUIRED_FIELDS, policy)
}

fn check_fields(
    model: &str,
    present: &[&str],
    known: &[&str],
    required: &[&str],
    policy: DeserializePolicy,
) -> bool {
    let unexpected: Vec<&str> = present
        .iter()
        .copied()
        .filter(|field| !known.contains(field))
        .collect();

    if policy == DeserializePolicy::Relaxed {
        if !unexpected.is_empty() {
            debug!("{}: ignoring unknown fields {:?}", model, unexpected);
        }
        return true;
    }

    if !unexpected.is_empty() {
        warn!("{}: unexpected fields {:?}", model, unexpected);
        return false;
    }

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|field| !present.contains(field))
        .collect();

    if !missing.is_empty() {
        warn!("{}: missing required fields {:?}", model, missing);
        return false;
    }

    true
}

fn unmarshal_json<M: AutoMarshallingModel>(body: &str, policy: DeserializePolicy) -> Option<M> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| warn!("{}: invalid JSON body: {}", M::model_name(), e))
        .ok()?;

    let inner = if M::JSON_WRAPPED {
        match value {
            Value::Object(mut map) => map.remove(M::ROOT_TAG),
            _ => None,
        }
    } else {
        Some(value)
    };

    let Some(inner) = inner else {
        warn!("{}: body is not wrapped in '{}'", M::model_name(), M::ROOT_TAG);
        return None;
    };

    M::from_json_value(inner, policy)
}

fn unmarshal_xml<M: AutoMarshallingModel>(body: &str, policy: DeserializePolicy) -> Option<M> {
    let body = match xml::attributes_to_elements(body) {
        Ok(body) => body,
        Err(e) => {
            warn!("{}: invalid XML body: {}", M::model_name(), e);
            return None;
        }
    };

    let shape = match xml::read_shape(&body) {
        Ok(Some(shape)) => shape,
        Ok(None) => {
            warn!("{}: XML body has no root element", M::model_name());
            return None;
        }
        Err(e) => {
            warn!("{}: invalid XML body: {}", M::model_name(), e);
            return None;
        }
    };

    if shape.root != xml::local_name(M::ROOT_TAG) {
        warn!(
            "{}: expected root element '{}', found '{}'",
            M::model_name(),
            M::ROOT_TAG,
            shape.root
        );
        return None;
    }

    // Elements are matched by local name on this path.
    let known: Vec<&str> = M::FIELDS.iter().map(|field| xml::local_name(field)).collect();
    let required: Vec<&str> = M::REQUIRED_FIELDS
        .iter()
        .map(|field| xml::local_name(field))
        .collect();
    let present: Vec<&str> = shape.fields.iter().map(String::as_str).collect();
    if !check_fields(M::model_name(), &present, &known, &required, policy) {
        return None;
    }

    let model: M = xml::from_xml(&body)
        .map_err(|e| warn!("{}: failed to deserialize XML: {}", M::model_name(), e))
        .ok()?;

    let dropped = dropped_prefixed_fields(&model, &present);
    if !dropped.is_empty() {
        warn!(
            "{}: XML fields {:?} were present but not read; the model needs a serde alias for their local names",
            M::model_name(),
            dropped
        );
        if policy == DeserializePolicy::Strict {
            return None;
        }
    }

    Some(model)
}

/// Prefixed wire names whose local name appears in the body but which the
/// deserialized model does not carry.
fn dropped_prefixed_fields<M: AutoMarshallingModel>(model: &M, present: &[&str]) -> Vec<&'static str> {
    let kept = match serde_json::to_value(model) {
        Ok(Value::Object(map)) => map,
        _ => return Vec::new(),
    };

    M::FIELDS
        .iter()
        .copied()
        .filter(|field| field.contains(':'))
        .filter(|field| present.contains(&xml::local_name(field)))
        .filter(|field| kept.get(*field).map_or(true, Value::is_null))
        .collect()
}
