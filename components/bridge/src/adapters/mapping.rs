//! Mapping adapter.

use crate::context::ExecutionContext;
use crate::protocol::LuaValue;
use crate::value::{integral, MapKey, Mapping};
use log::warn;
use mlua::{Table, Value};

impl LuaValue for MapKey {
    fn is_on_stack(context: &ExecutionContext) -> bool {
        match context.top() {
            Some(Value::Boolean(_) | Value::Integer(_)) => true,
            Some(Value::Number(n)) => integral(n).is_some(),
            Some(Value::String(string)) => string.to_str().is_ok(),
            _ => false,
        }
    }

    fn pop_from_stack(context: &ExecutionContext) -> Option<Self> {
        match context.pop_raw() {
            Value::Boolean(b) => Some(MapKey::Bool(b)),
            Value::Integer(i) => Some(MapKey::Integer(i)),
            Value::Number(n) => integral(n).map(MapKey::Integer),
            Value::String(string) => string.to_str().ok().map(|key| MapKey::Text(key.to_string())),
            _ => None,
        }
    }

    fn push_onto_stack(&self, context: &ExecutionContext) {
        match self {
            MapKey::Bool(b) => b.push_onto_stack(context),
            MapKey::Integer(i) => i.push_onto_stack(context),
            MapKey::Text(text) => context.push_bytes(text.as_bytes()),
        }
    }
}

/// Decodes every pair of a table; pairs whose key or value does not decode
/// are left out.
pub(crate) fn decode_mapping(context: &ExecutionContext, table: &Table) -> Mapping {
    let pairs: Vec<(Value, Value)> = table.pairs::<Value, Value>().filter_map(Result::ok).collect();
    let mut mapping = Mapping::new();
    for (key, value) in pairs {
        context.push_raw(key);
        let Some(key) = context.pop::<MapKey>() else {
            continue;
        };
        if let Some(value) = context.decode(value) {
            mapping.insert(key, value);
        }
    }
    mapping
}

impl LuaValue for Mapping {
    fn is_on_stack(context: &ExecutionContext) -> bool {
        matches!(context.top(), Some(Value::Table(_)))
    }

    fn pop_from_stack(context: &ExecutionContext) -> Option<Self> {
        match context.pop_raw() {
            Value::Table(table) => context.nested(&table, || decode_mapping(context, &table)),
            _ => None,
        }
    }

    /// Null values are left out, since the interpreter cannot store nil.
    fn push_onto_stack(&self, context: &ExecutionContext) {
        let table = match context.lua().create_table_with_capacity(0, self.len()) {
            Ok(table) => table,
            Err(err) => {
                warn!("could not allocate mapping of {}: {}", self.len(), err);
                context.push_raw(Value::Nil);
                return;
            }
        };
        for (key, value) in self {
            if value.is_null() {
                continue;
            }
            context.push(key);
            let key = context.pop_raw();
            let value = context.encode(value);
            if let Err(err) = table.raw_set(key, value) {
                warn!("could not store mapping entry: {}", err);
            }
        }
        context.push_raw(Value::Table(table));
    }
}
