//! Sequence adapter: tables keyed `1..n` on the interpreter side, 0-based
//! vectors on the host side.

use crate::context::ExecutionContext;
use crate::protocol::LuaValue;
use crate::value::HostValue;
use log::warn;
use mlua::{LightUserData, Table, Value};

/// The explicit null marker, for slots that must not become holes.
fn null_marker() -> Value {
    Value::LightUserData(LightUserData(std::ptr::null_mut()))
}

/// Decodes entries `1..=raw_len` of a table. Non-numeric keys are ignored
/// and elements that do not decode become [`HostValue::Null`].
pub(crate) fn decode_sequence(context: &ExecutionContext, table: &Table) -> Vec<HostValue> {
    let length = table.raw_len();
    let mut items = Vec::with_capacity(length);
    for index in 1..=length {
        let element = table.raw_get::<Value>(index).unwrap_or(Value::Nil);
        items.push(context.decode(element).unwrap_or(HostValue::Null));
    }
    items
}

impl LuaValue for Vec<HostValue> {
    fn is_on_stack(context: &ExecutionContext) -> bool {
        matches!(context.top(), Some(Value::Table(_)))
    }

    fn pop_from_stack(context: &ExecutionContext) -> Option<Self> {
        match context.pop_raw() {
            Value::Table(table) => context.nested(&table, || decode_sequence(context, &table)),
            _ => None,
        }
    }

    fn push_onto_stack(&self, context: &ExecutionContext) {
        let table = match context.lua().create_table_with_capacity(self.len(), 0) {
            Ok(table) => table,
            Err(err) => {
                warn!("could not allocate sequence of {}: {}", self.len(), err);
                context.push_raw(Value::Nil);
                return;
            }
        };
        for (index, item) in self.iter().enumerate() {
            let element = match item {
                HostValue::Null => null_marker(),
                other => context.encode(other),
            };
            if let Err(err) = table.raw_set(index + 1, element) {
                warn!("could not store sequence element {}: {}", index + 1, err);
            }
        }
        context.push_raw(Value::Table(table));
    }
}
