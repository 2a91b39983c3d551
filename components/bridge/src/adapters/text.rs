//! Text adapter.

use crate::context::ExecutionContext;
use crate::protocol::LuaValue;
use mlua::Value;

impl LuaValue for String {
    fn is_on_stack(context: &ExecutionContext) -> bool {
        matches!(
            context.top(),
            Some(Value::String(_) | Value::Integer(_) | Value::Number(_))
        )
    }

    /// Strings and numbers decode; numbers use the interpreter's own
    /// formatting. Invalid UTF-8 does not decode.
    fn pop_from_stack(context: &ExecutionContext) -> Option<Self> {
        let value = context.pop_raw();
        let string = match value {
            Value::String(string) => string,
            number @ (Value::Integer(_) | Value::Number(_)) => {
                context.lua().coerce_string(number).ok().flatten()?
            }
            _ => return None,
        };
        string.to_str().ok().map(|text| text.to_string())
    }

    fn push_onto_stack(&self, context: &ExecutionContext) {
        context.push_bytes(self.as_bytes());
    }
}
