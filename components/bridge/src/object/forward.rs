//! Forwarding of invocations the host class does not implement.

use super::class::{BridgedClass, HostObject, ObjectRef};
use super::state::class_state;
use crate::context::{ExecutionContext, ResultCount};
use crate::invocation::Invocation;
use crate::value::HostValue;
use core_types::{BridgeError, BridgeResult};
use mlua::{Table, Value};
use std::rc::Rc;

/// Sends `invocation` to the class table of `C` in its per-class context.
///
/// A function entry is called with the instance, the selector and then the
/// arguments; its first result is coerced to the declared return type. A
/// void invocation asks for no results, and any the function returns are
/// dropped. A non-function entry is itself the result. A missing entry is
/// [`BridgeError::UnrecognizedSelector`].
pub fn forward_invocation<C: BridgedClass>(
    object: &Rc<C>,
    invocation: &Invocation,
) -> BridgeResult<HostValue> {
    let state = class_state::<C>()?;
    let object: ObjectRef = object.clone();
    forward_in(state.context(), state.class_table(), &object, invocation)
}

/// Runs the host-native method for the selector if there is one, and
/// forwards otherwise.
pub fn send<C: BridgedClass>(object: &Rc<C>, invocation: &Invocation) -> BridgeResult<HostValue> {
    match object
        .clone()
        .perform(invocation.selector(), invocation.arguments())
    {
        Some(result) => result,
        None => forward_invocation(object, invocation),
    }
}

/// Whether `selector` is handled natively or by the class table.
pub fn responds_to<C: BridgedClass>(object: &Rc<C>, selector: &str) -> bool {
    if HostObject::responds_to(&**object, selector) {
        return true;
    }
    class_state::<C>()
        .map(|state| state.lookup(selector).is_some())
        .unwrap_or(false)
}

/// Forwards within an explicit context and class table.
pub fn forward_in(
    context: &ExecutionContext,
    class_table: &Table,
    object: &ObjectRef,
    invocation: &Invocation,
) -> BridgeResult<HostValue> {
    context.enforce_stack_delta(0, |context| {
        context.push_object(&HostValue::Object(object.clone()));
        let receiver = context.pop_raw();
        let resolved = resolve(context, class_table, &receiver, invocation.selector());
        let resolved = resolved.ok_or_else(|| BridgeError::UnrecognizedSelector {
            class: object.class_name().to_string(),
            selector: invocation.selector().to_string(),
        })?;

        match resolved {
            Value::Function(function) => {
                let argument_count = invocation.arguments().len() + 2;
                context.grow_stack(argument_count + 1);
                context.push_raw(Value::Function(function));
                context.push_raw(receiver);
                context.push_bytes(invocation.selector().as_bytes());
                context.push_arguments(invocation);

                let wanted = if invocation.return_type().is_void() { 0 } else { 1 };
                if let Err(err) = context.call_function(argument_count, ResultCount::Exactly(wanted)) {
                    context.discard(1);
                    return Err(err);
                }
                Ok(context.pop_return_value(invocation))
            }
            _ if invocation.return_type().is_void() => Ok(HostValue::Null),
            value => {
                context.push_raw(value);
                Ok(context.pop_return_value(invocation))
            }
        }
    })
}

/// Looks the selector up in the class table.
///
/// Resolved functions are cached per instance, and a cached function is
/// used only while the class table still holds it under the selector, so
/// scripts that replace an entry are seen on the next forward. Other values
/// are never cached.
fn resolve(
    context: &ExecutionContext,
    class_table: &Table,
    receiver: &Value,
    selector: &str,
) -> Option<Value> {
    let entry = match receiver {
        Value::UserData(userdata) => context.bound_entry(userdata),
        _ => None,
    };
    let cached = entry
        .as_ref()
        .and_then(|entry| entry.forwards.borrow().get(selector).cloned());
    if let Some(function) = cached {
        match class_table.raw_get::<Value>(selector) {
            Ok(Value::Function(current)) if current == function => {
                return Some(Value::Function(function));
            }
            _ => {
                if let Some(entry) = &entry {
                    entry.forwards.borrow_mut().remove(selector);
                }
            }
        }
    }

    let value = match class_table.get::<Value>(selector) {
        Ok(Value::Nil) | Err(_) => return None,
        Ok(value) => value,
    };
    if let (Some(entry), Value::Function(function)) = (&entry, &value) {
        entry
            .forwards
            .borrow_mut()
            .insert(selector.to_string(), function.clone());
    }
    Some(value)
}
