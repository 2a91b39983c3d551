//! JSON representation of host values.
//!
//! Used for archiving models and for printing script results. Decimals are
//! written as strings so no digits are lost; bridged objects are written
//! through their `dictionaryValue` when they have one.

use crate::value::{HostValue, MapKey, Mapping};
use core_types::{BridgeError, BridgeResult};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, Serializer};

/// Selector used to archive bridged objects.
pub const DICTIONARY_SELECTOR: &str = "dictionaryValue";

impl HostValue {
    /// Converts to a `serde_json::Value`.
    ///
    /// Fails for opaque references, non-finite numbers and objects without a
    /// dictionary representation.
    pub fn to_json(&self) -> BridgeResult<serde_json::Value> {
        use serde_json::Value as Json;
        Ok(match self {
            HostValue::Null => Json::Null,
            HostValue::Bool(b) => Json::Bool(*b),
            HostValue::Integer(i) => Json::from(*i),
            HostValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .ok_or_else(|| BridgeError::Config(format!("{} has no JSON encoding", n)))?,
            HostValue::Decimal(d) => Json::String(d.to_string()),
            HostValue::Text(text) => Json::String(text.clone()),
            HostValue::Sequence(items) => Json::Array(
                items
                    .iter()
                    .map(HostValue::to_json)
                    .collect::<BridgeResult<Vec<_>>>()?,
            ),
            HostValue::Mapping(mapping) => {
                let mut object = serde_json::Map::with_capacity(mapping.len());
                for (key, value) in mapping {
                    object.insert(key.to_string(), value.to_json()?);
                }
                Json::Object(object)
            }
            HostValue::Object(object) => {
                let class = object.class_name().to_string();
                match object.clone().perform(DICTIONARY_SELECTOR, &[]) {
                    Some(dictionary) => dictionary?.to_json()?,
                    None => {
                        return Err(BridgeError::Config(format!(
                            "{} instances cannot be archived",
                            class
                        )))
                    }
                }
            }
            HostValue::Opaque(_) => {
                return Err(BridgeError::Config(
                    "opaque references cannot be archived".to_string(),
                ))
            }
        })
    }

    /// Converts from a `serde_json::Value`. Object keys become text keys.
    pub fn from_json(json: &serde_json::Value) -> HostValue {
        use serde_json::Value as Json;
        match json {
            Json::Null => HostValue::Null,
            Json::Bool(b) => HostValue::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => HostValue::Integer(i),
                None => HostValue::Number(n.as_f64().unwrap_or(0.0)),
            },
            Json::String(s) => HostValue::Text(s.clone()),
            Json::Array(items) => HostValue::Sequence(items.iter().map(Self::from_json).collect()),
            Json::Object(object) => HostValue::Mapping(
                object
                    .iter()
                    .map(|(key, value)| (MapKey::Text(key.clone()), Self::from_json(value)))
                    .collect::<Mapping>(),
            ),
        }
    }
}

impl Serialize for HostValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HostValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(|json| HostValue::from_json(&json))
    }
}
