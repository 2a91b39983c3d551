//! Decimal adapter.
//!
//! Decimals travel as strings so every digit (and the scale) survives the
//! trip through the interpreter, whose numbers are binary floats.

use crate::context::ExecutionContext;
use crate::protocol::LuaValue;
use mlua::Value;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses decimal text, accepting exponent notation.
fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Numerals only the interpreter understands, such as hexadecimal.
fn coerce(context: &ExecutionContext, string: mlua::String) -> Option<Decimal> {
    context
        .lua()
        .coerce_number(Value::String(string))
        .ok()
        .flatten()
        .and_then(Decimal::from_f64)
}

impl LuaValue for Decimal {
    fn is_on_stack(context: &ExecutionContext) -> bool {
        match context.top() {
            Some(Value::Integer(_) | Value::Number(_)) => true,
            Some(Value::String(string)) => {
                let parsed = string
                    .to_str()
                    .map(|text| parse_decimal(&text).is_some())
                    .unwrap_or(false);
                parsed || coerce(context, string).is_some()
            }
            _ => false,
        }
    }

    fn pop_from_stack(context: &ExecutionContext) -> Option<Self> {
        match context.pop_raw() {
            Value::Integer(i) => Some(Decimal::from(i)),
            Value::Number(n) => Decimal::from_f64(n),
            Value::String(string) => {
                let parsed = string.to_str().ok().and_then(|text| parse_decimal(&text));
                match parsed {
                    Some(decimal) => Some(decimal),
                    None => coerce(context, string),
                }
            }
            _ => None,
        }
    }

    fn push_onto_stack(&self, context: &ExecutionContext) {
        context.push_bytes(self.to_string().as_bytes());
    }
}
