//! Dynamic decoding and encoding of [`HostValue`].

use super::mapping::decode_mapping;
use super::sequence::decode_sequence;
use crate::context::ExecutionContext;
use crate::protocol::LuaValue;
use crate::value::HostValue;
use mlua::{Table, Value};

/// A non-empty table whose pairs are exactly `1..n` is a sequence; any other
/// table, including the empty one, is a mapping.
fn decode_table(context: &ExecutionContext, table: &Table) -> HostValue {
    let length = table.raw_len();
    if length > 0 && table.pairs::<Value, Value>().count() == length {
        HostValue::Sequence(decode_sequence(context, table))
    } else {
        HostValue::Mapping(decode_mapping(context, table))
    }
}

impl LuaValue for HostValue {
    fn is_on_stack(context: &ExecutionContext) -> bool {
        match context.top() {
            Some(Value::UserData(userdata)) => context.bound_object(&userdata).is_some(),
            Some(Value::String(string)) => string.to_str().is_ok(),
            Some(
                Value::Nil
                | Value::Boolean(_)
                | Value::Integer(_)
                | Value::Number(_)
                | Value::Table(_)
                | Value::LightUserData(_),
            ) => true,
            _ => false,
        }
    }

    fn pop_from_stack(context: &ExecutionContext) -> Option<Self> {
        match context.pop_raw() {
            Value::Nil => Some(HostValue::Null),
            Value::Boolean(b) => Some(HostValue::Bool(b)),
            Value::Integer(i) => Some(HostValue::Integer(i)),
            Value::Number(n) => Some(HostValue::Number(n)),
            Value::String(string) => string
                .to_str()
                .ok()
                .map(|text| HostValue::Text(text.to_string())),
            Value::Table(table) => context.nested(&table, || decode_table(context, &table)),
            Value::LightUserData(pointer) if pointer.0.is_null() => Some(HostValue::Null),
            Value::LightUserData(pointer) => Some(
                context
                    .opaque(pointer.0 as usize)
                    .map(HostValue::Opaque)
                    .unwrap_or(HostValue::Null),
            ),
            Value::UserData(userdata) => context.bound_object(&userdata).map(HostValue::Object),
            _ => None,
        }
    }

    fn push_onto_stack(&self, context: &ExecutionContext) {
        match self {
            HostValue::Null => context.push_raw(Value::Nil),
            HostValue::Bool(b) => b.push_onto_stack(context),
            HostValue::Integer(i) => i.push_onto_stack(context),
            HostValue::Number(n) => n.push_onto_stack(context),
            HostValue::Decimal(d) => d.push_onto_stack(context),
            HostValue::Text(text) => context.push_bytes(text.as_bytes()),
            HostValue::Sequence(items) => items.push_onto_stack(context),
            HostValue::Mapping(mapping) => mapping.push_onto_stack(context),
            HostValue::Object(object) => context.push_bound(object),
            HostValue::Opaque(value) => context.push_opaque(value),
        }
    }
}
