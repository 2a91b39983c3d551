//! Model classes and dictionary construction.

use bridge::{BridgedClass, ExecutionContext, HostMethods, HostValue, MapKey, Mapping};
use core_types::{BridgeError, BridgeResult, ScriptSource};
use log::warn;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Declares the properties of a model and how they are validated.
pub trait ModelClass: Sized + 'static {
    /// Class name; also names the class script.
    const CLASS_NAME: &'static str;

    /// Declared property keys, in presentation order.
    const PROPERTY_KEYS: &'static [&'static str];

    /// Checks a value before it is assigned to `key`.
    fn validate(_key: &str, _value: &HostValue) -> Result<(), String> {
        Ok(())
    }

    /// Extra host methods beyond the property getters.
    fn register_methods(_methods: &mut HostMethods<Model<Self>>) {}

    /// Where the interpreter-side implementation lives; see
    /// [`BridgedClass::implementation_source`].
    fn implementation_source(context: &ExecutionContext) -> Option<ScriptSource> {
        context
            .resolve_script(Self::CLASS_NAME)
            .map(ScriptSource::File)
    }
}

/// An immutable model instance.
pub struct Model<C: ModelClass> {
    properties: BTreeMap<String, HostValue>,
    class: PhantomData<fn() -> C>,
}

impl<C: ModelClass> Model<C> {
    /// Builds a model from a dictionary.
    ///
    /// Every declared key present in `dictionary` is validated before it is
    /// assigned; the first rejection fails the whole construction. Keys the
    /// class does not declare are ignored. Null values leave the property
    /// unset.
    pub fn from_dictionary(dictionary: &Mapping) -> BridgeResult<Self> {
        let mut properties = BTreeMap::new();
        for (key, value) in dictionary {
            let declared = key
                .as_str()
                .and_then(|key| C::PROPERTY_KEYS.iter().find(|declared| **declared == key));
            let Some(key) = declared else {
                warn!("{} ignores undeclared key `{}`", C::CLASS_NAME, key);
                continue;
            };
            if value.is_null() {
                continue;
            }
            C::validate(key, value).map_err(|reason| BridgeError::Validation {
                key: key.to_string(),
                reason,
            })?;
            properties.insert(key.to_string(), value.clone());
        }
        Ok(Self {
            properties,
            class: PhantomData,
        })
    }

    /// Builds a shared model from a dictionary.
    pub fn shared(dictionary: &Mapping) -> BridgeResult<Rc<Self>> {
        Self::from_dictionary(dictionary).map(Rc::new)
    }

    /// The value of a property, if it is set.
    pub fn get(&self, key: &str) -> Option<&HostValue> {
        self.properties.get(key)
    }

    /// Follows a dotted key path: the first segment names a property, the
    /// rest index into nested mappings.
    pub fn value_for_key_path(&self, path: &str) -> Option<&HostValue> {
        match path.split_once('.') {
            Some((key, rest)) => self.get(key)?.value_at_path(rest),
            None => self.get(path),
        }
    }

    /// Every declared property as a mapping; unset properties are Null.
    pub fn dictionary_value(&self) -> Mapping {
        C::PROPERTY_KEYS
            .iter()
            .map(|key| {
                let value = self.get(key).cloned().unwrap_or(HostValue::Null);
                (MapKey::from(*key), value)
            })
            .collect()
    }

    /// Properties that are set.
    pub fn properties(&self) -> &BTreeMap<String, HostValue> {
        &self.properties
    }
}

impl<C: ModelClass> Clone for Model<C> {
    fn clone(&self) -> Self {
        Self {
            properties: self.properties.clone(),
            class: PhantomData,
        }
    }
}

impl<C: ModelClass> fmt::Debug for Model<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(C::CLASS_NAME)
            .field("properties", &self.properties)
            .finish()
    }
}

impl<C: ModelClass> BridgedClass for Model<C> {
    const CLASS_NAME: &'static str = C::CLASS_NAME;

    fn register_methods(methods: &mut HostMethods<Self>) {
        for key in C::PROPERTY_KEYS {
            methods.add(key, move |this, _| Ok(this.get(key).cloned().unwrap_or_default()));
        }
        methods.add(bridge::DICTIONARY_SELECTOR, |this, _| {
            Ok(HostValue::Mapping(this.dictionary_value()))
        });
        C::register_methods(methods);
    }

    fn implementation_source(context: &ExecutionContext) -> Option<ScriptSource> {
        C::implementation_source(context)
    }

    fn host_equals(this: &Rc<Self>, other: &Rc<Self>) -> bool {
        crate::equality::equals(this, other)
    }

    fn host_hash(this: &Rc<Self>) -> u64 {
        crate::equality::hash(this)
    }
}
