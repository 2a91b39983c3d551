//! Declared host types for marshalled values.

use std::fmt;

/// The host type an argument or return value is declared with.
///
/// This is the per-type descriptor the bridge consults when it has to coerce
/// an interpreter value into something the host caller expects.
///
/// # Examples
///
/// ```
/// use core_types::ValueType;
///
/// assert!(ValueType::Void.is_void());
/// assert!(!ValueType::Number.is_void());
/// assert_eq!(ValueType::Decimal.to_string(), "decimal");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// No value
    Void,
    /// Boolean, coerced by interpreter truthiness
    Bool,
    /// Signed integer
    Integer,
    /// Unsigned integer (hash values)
    Unsigned,
    /// Floating point number
    Number,
    /// Exact decimal number
    Decimal,
    /// UTF-8 text
    Text,
    /// Ordered sequence
    Sequence,
    /// Key-value mapping
    Mapping,
    /// Bridged host object
    Object,
    /// Whatever the value decodes to
    #[default]
    Any,
}

impl ValueType {
    /// Whether the type declares no value at all.
    pub fn is_void(self) -> bool {
        matches!(self, ValueType::Void)
    }

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Void => "void",
            ValueType::Bool => "bool",
            ValueType::Integer => "integer",
            ValueType::Unsigned => "unsigned",
            ValueType::Number => "number",
            ValueType::Decimal => "decimal",
            ValueType::Text => "text",
            ValueType::Sequence => "sequence",
            ValueType::Mapping => "mapping",
            ValueType::Object => "object",
            ValueType::Any => "any",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
