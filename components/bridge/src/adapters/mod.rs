//! [`LuaValue`](crate::LuaValue) implementations for the host types the
//! bridge understands, and coercion to declared types.

mod decimal;
mod host_value;
mod mapping;
mod number;
mod sequence;
mod text;

use crate::context::ExecutionContext;
use crate::value::{HostValue, Mapping};
use core_types::ValueType;
use mlua::Value;
use rust_decimal::Decimal;

/// Pops the top value coerced to `value_type`.
///
/// Values of the wrong shape give the zero value of the type. `Void`
/// consumes nothing; `Bool` follows interpreter truthiness; `Unsigned`
/// carries the bit pattern of a signed integer.
pub(crate) fn pop_coerced(context: &ExecutionContext, value_type: ValueType) -> HostValue {
    match value_type {
        ValueType::Void => HostValue::Null,
        ValueType::Bool => {
            let value = context.pop_raw();
            HostValue::Bool(!matches!(value, Value::Nil | Value::Boolean(false)))
        }
        ValueType::Integer | ValueType::Unsigned => {
            HostValue::Integer(context.pop::<i64>().unwrap_or(0))
        }
        ValueType::Number => HostValue::Number(context.pop::<f64>().unwrap_or(0.0)),
        ValueType::Decimal => HostValue::Decimal(context.pop::<Decimal>().unwrap_or(Decimal::ZERO)),
        ValueType::Text => HostValue::Text(context.pop::<String>().unwrap_or_default()),
        ValueType::Sequence => HostValue::Sequence(context.pop::<Vec<HostValue>>().unwrap_or_default()),
        ValueType::Mapping => HostValue::Mapping(context.pop::<Mapping>().unwrap_or_default()),
        ValueType::Object => match context.pop_value() {
            Some(object @ HostValue::Object(_)) => object,
            _ => HostValue::Null,
        },
        ValueType::Any => context.pop_value().unwrap_or(HostValue::Null),
    }
}
