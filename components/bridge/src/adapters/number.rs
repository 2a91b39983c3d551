//! Number and boolean adapters.
//!
//! Numbers accept numeric strings the way the interpreter's own arithmetic
//! does. Booleans are never numbers.

use crate::context::ExecutionContext;
use crate::protocol::LuaValue;
use crate::value::integral;
use mlua::Value;

fn is_numeric(context: &ExecutionContext) -> bool {
    match context.top() {
        Some(Value::Integer(_) | Value::Number(_)) => true,
        Some(string @ Value::String(_)) => matches!(context.lua().coerce_number(string), Ok(Some(_))),
        _ => false,
    }
}

impl LuaValue for f64 {
    fn is_on_stack(context: &ExecutionContext) -> bool {
        is_numeric(context)
    }

    fn pop_from_stack(context: &ExecutionContext) -> Option<Self> {
        match context.pop_raw() {
            Value::Integer(i) => Some(i as f64),
            Value::Number(n) => Some(n),
            string @ Value::String(_) => context.lua().coerce_number(string).ok().flatten(),
            _ => None,
        }
    }

    fn push_onto_stack(&self, context: &ExecutionContext) {
        context.push_raw(Value::Number(*self));
    }
}

impl LuaValue for i64 {
    fn is_on_stack(context: &ExecutionContext) -> bool {
        is_numeric(context)
    }

    /// Floats decode only when integral and in range.
    fn pop_from_stack(context: &ExecutionContext) -> Option<Self> {
        match context.pop_raw() {
            Value::Integer(i) => Some(i),
            Value::Number(n) => integral(n),
            string @ Value::String(_) => context.lua().coerce_integer(string).ok().flatten(),
            _ => None,
        }
    }

    fn push_onto_stack(&self, context: &ExecutionContext) {
        context.push_raw(Value::Integer(*self));
    }
}

impl LuaValue for bool {
    fn is_on_stack(context: &ExecutionContext) -> bool {
        matches!(context.top(), Some(Value::Boolean(_)))
    }

    fn pop_from_stack(context: &ExecutionContext) -> Option<Self> {
        match context.pop_raw() {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    fn push_onto_stack(&self, context: &ExecutionContext) {
        context.push_raw(Value::Boolean(*self));
    }
}
