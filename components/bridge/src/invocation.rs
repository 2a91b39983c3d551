//! Invocation records.

use crate::value::HostValue;
use core_types::ValueType;

/// A single method call awaiting dispatch.
///
/// The receiver is not part of the record; it is supplied when the
/// invocation is sent. Argument types are derived from the argument values.
///
/// # Example
///
/// ```
/// use bridge::Invocation;
/// use core_types::ValueType;
///
/// let invocation = Invocation::new("scaledBy")
///     .with_argument(2.0)
///     .returning(ValueType::Number);
/// assert_eq!(invocation.selector(), "scaledBy");
/// assert_eq!(invocation.argument_types(), vec![ValueType::Number]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    selector: String,
    arguments: Vec<HostValue>,
    return_type: ValueType,
}

impl Invocation {
    /// A call with no arguments whose result is taken as is.
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            arguments: Vec::new(),
            return_type: ValueType::Any,
        }
    }

    /// Appends one argument.
    pub fn with_argument(mut self, argument: impl Into<HostValue>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Appends several arguments.
    pub fn with_arguments<I>(mut self, arguments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<HostValue>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    /// Declares the return type.
    pub fn returning(mut self, return_type: ValueType) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn arguments(&self) -> &[HostValue] {
        &self.arguments
    }

    pub fn return_type(&self) -> ValueType {
        self.return_type
    }

    /// Declared type of each argument, in order.
    pub fn argument_types(&self) -> Vec<ValueType> {
        self.arguments.iter().map(HostValue::value_type).collect()
    }
}
