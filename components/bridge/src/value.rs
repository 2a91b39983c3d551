//! Dynamic host values.
//!
//! [`HostValue`] is what crosses the bridge when the static type is not known
//! in advance: forwarded arguments, return values declared as
//! [`ValueType::Any`], elements of sequences and values of mappings.

use crate::object::{BridgedClass, ObjectRef};
use core_types::ValueType;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Keys a decoded mapping may have.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    /// Boolean key
    Bool(bool),
    /// Integer key (integral float keys normalize to this too)
    Integer(i64),
    /// String key
    Text(String),
}

impl MapKey {
    /// The key as text, if it is a text key.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MapKey::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(b) => write!(f, "{}", b),
            MapKey::Integer(i) => write!(f, "{}", i),
            MapKey::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for MapKey {
    fn from(key: &str) -> Self {
        MapKey::Text(key.to_string())
    }
}

impl From<String> for MapKey {
    fn from(key: String) -> Self {
        MapKey::Text(key)
    }
}

impl From<i64> for MapKey {
    fn from(key: i64) -> Self {
        MapKey::Integer(key)
    }
}

impl From<bool> for MapKey {
    fn from(key: bool) -> Self {
        MapKey::Bool(key)
    }
}

/// The integer a float stands for, when it is integral and inside the
/// `i64` range; the interpreter's `math.tointeger` draws the same line.
pub(crate) fn integral(n: f64) -> Option<i64> {
    const BOUND: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if n.fract() == 0.0 && (-BOUND..BOUND).contains(&n) {
        Some(n as i64)
    } else {
        None
    }
}

/// Key-value mapping with deterministic iteration order.
pub type Mapping = BTreeMap<MapKey, HostValue>;

/// A host value of any bridgeable shape.
#[derive(Clone, Default)]
pub enum HostValue {
    /// Explicit null marker
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// Exact decimal
    Decimal(Decimal),
    /// UTF-8 text
    Text(String),
    /// Ordered sequence (0-based on the host side)
    Sequence(Vec<HostValue>),
    /// Key-value mapping
    Mapping(Mapping),
    /// Bridged host object
    Object(ObjectRef),
    /// Host value with no interpreter encoding
    Opaque(Rc<dyn Any>),
}

impl HostValue {
    /// Wraps a bridged instance.
    pub fn object<C: BridgedClass>(object: Rc<C>) -> Self {
        HostValue::Object(object)
    }

    /// Wraps an arbitrary host value as an opaque reference.
    pub fn opaque<T: Any>(value: T) -> Self {
        HostValue::Opaque(Rc::new(value))
    }

    /// Declared type this value satisfies.
    pub fn value_type(&self) -> ValueType {
        match self {
            HostValue::Null => ValueType::Any,
            HostValue::Bool(_) => ValueType::Bool,
            HostValue::Integer(_) => ValueType::Integer,
            HostValue::Number(_) => ValueType::Number,
            HostValue::Decimal(_) => ValueType::Decimal,
            HostValue::Text(_) => ValueType::Text,
            HostValue::Sequence(_) => ValueType::Sequence,
            HostValue::Mapping(_) => ValueType::Mapping,
            HostValue::Object(_) => ValueType::Object,
            HostValue::Opaque(_) => ValueType::Any,
        }
    }

    /// Returns true for [`HostValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view; integral numbers and decimals convert, others do not.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HostValue::Integer(i) => Some(*i),
            HostValue::Number(n) => integral(*n),
            HostValue::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    /// Floating point view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Integer(i) => Some(*i as f64),
            HostValue::Number(n) => Some(*n),
            HostValue::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            HostValue::Decimal(d) => Some(*d),
            HostValue::Integer(i) => Some(Decimal::from(*i)),
            HostValue::Number(n) => Decimal::from_f64_retain(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            HostValue::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            HostValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The bridged instance, if it is a `C`.
    pub fn downcast_object<C: BridgedClass>(&self) -> Option<Rc<C>> {
        let object = self.as_object()?.clone();
        object.into_any().downcast::<C>().ok()
    }

    /// The opaque value, if it is a `T`.
    pub fn downcast_opaque<T: Any>(&self) -> Option<Rc<T>> {
        match self {
            HostValue::Opaque(value) => value.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Follows a dotted key path (`"price.amount"`) through nested mappings.
    ///
    /// # Example
    ///
    /// ```
    /// use bridge::{HostValue, Mapping};
    ///
    /// let mut inner = Mapping::new();
    /// inner.insert("amount".into(), HostValue::Integer(3));
    /// let mut outer = Mapping::new();
    /// outer.insert("price".into(), HostValue::Mapping(inner));
    ///
    /// let value = HostValue::Mapping(outer);
    /// assert_eq!(value.value_at_path("price.amount"), Some(&HostValue::Integer(3)));
    /// assert_eq!(value.value_at_path("price.currency"), None);
    /// ```
    pub fn value_at_path(&self, path: &str) -> Option<&HostValue> {
        path.split('.').try_fold(self, |value, key| {
            value.as_mapping()?.get(&MapKey::Text(key.to_string()))
        })
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => f.write_str("Null"),
            HostValue::Bool(b) => write!(f, "Bool({})", b),
            HostValue::Integer(i) => write!(f, "Integer({})", i),
            HostValue::Number(n) => write!(f, "Number({})", n),
            HostValue::Decimal(d) => write!(f, "Decimal({})", d),
            HostValue::Text(text) => write!(f, "Text({:?})", text),
            HostValue::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            HostValue::Mapping(mapping) => f.debug_tuple("Mapping").field(mapping).finish(),
            HostValue::Object(object) => {
                write!(f, "Object({}@{:#x})", object.class_name(), object.identity())
            }
            HostValue::Opaque(value) => write!(f, "Opaque({:p})", Rc::as_ptr(value)),
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Integer(a), HostValue::Integer(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b,
            (HostValue::Integer(i), HostValue::Number(n))
            | (HostValue::Number(n), HostValue::Integer(i)) => *i as f64 == *n,
            (HostValue::Decimal(a), HostValue::Decimal(b)) => a == b,
            (HostValue::Text(a), HostValue::Text(b)) => a == b,
            (HostValue::Sequence(a), HostValue::Sequence(b)) => a == b,
            (HostValue::Mapping(a), HostValue::Mapping(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => a.clone().is_equal(b),
            (HostValue::Opaque(a), HostValue::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Hash for HostValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            HostValue::Null => 0u8.hash(state),
            HostValue::Bool(b) => b.hash(state),
            // integers and integral floats compare equal, so they hash alike
            HostValue::Integer(i) => i.hash(state),
            HostValue::Number(n) if n.fract() == 0.0 && n.is_finite() => (*n as i64).hash(state),
            HostValue::Number(n) => n.to_bits().hash(state),
            HostValue::Decimal(d) => d.hash(state),
            HostValue::Text(text) => text.hash(state),
            HostValue::Sequence(items) => items.hash(state),
            HostValue::Mapping(mapping) => mapping.hash(state),
            HostValue::Object(object) => object.clone().hash_value().hash(state),
            HostValue::Opaque(value) => (Rc::as_ptr(value) as *const () as usize).hash(state),
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Integer(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Integer(value as i64)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Number(value)
    }
}

impl From<Decimal> for HostValue {
    fn from(value: Decimal) -> Self {
        HostValue::Decimal(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Text(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Text(value)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(value: Vec<HostValue>) -> Self {
        HostValue::Sequence(value)
    }
}

impl From<Mapping> for HostValue {
    fn from(value: Mapping) -> Self {
        HostValue::Mapping(value)
    }
}

impl From<ObjectRef> for HostValue {
    fn from(value: ObjectRef) -> Self {
        HostValue::Object(value)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(HostValue::Null)
    }
}
