//! Archival of models through their dictionary representation.

use crate::class::{Model, ModelClass};
use bridge::HostValue;
use core_types::{BridgeError, BridgeResult};
use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize, Serializer};

impl<C: ModelClass> Serialize for Model<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        HostValue::Mapping(self.dictionary_value()).serialize(serializer)
    }
}

impl<'de, C: ModelClass> Deserialize<'de> for Model<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match HostValue::deserialize(deserializer)? {
            HostValue::Mapping(dictionary) => {
                Model::from_dictionary(&dictionary).map_err(D::Error::custom)
            }
            other => Err(D::Error::custom(format!(
                "{} archive must be a dictionary, found {:?}",
                C::CLASS_NAME,
                other.value_type()
            ))),
        }
    }
}

impl<C: ModelClass> Model<C> {
    /// Archives the model as JSON.
    ///
    /// Decimal properties are archived as strings, so they come back as
    /// text; validation sees them in that form on [`decode`](Self::decode).
    pub fn encode(&self) -> BridgeResult<String> {
        serde_json::to_string(self).map_err(|err| BridgeError::Config(err.to_string()))
    }

    /// Rebuilds a model from its JSON archive, validating every property.
    pub fn decode(archive: &str) -> BridgeResult<Self> {
        let dictionary = match serde_json::from_str::<HostValue>(archive) {
            Ok(HostValue::Mapping(dictionary)) => dictionary,
            Ok(other) => {
                return Err(BridgeError::Config(format!(
                    "{} archive must be a dictionary, found {}",
                    C::CLASS_NAME,
                    other.value_type()
                )))
            }
            Err(err) => return Err(BridgeError::Config(err.to_string())),
        };
        Model::from_dictionary(&dictionary)
    }
}
