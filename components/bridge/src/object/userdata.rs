//! Interpreter side of a bound instance.
//!
//! Every bound instance is one full userdata holding a [`BoundHandle`]. The
//! userdata metatable is shared by all bound instances of a context:
//!
//! - finalizer: dropping the handle releases the arena entry, at most once
//! - `__index`: the class table first, otherwise a trampoline for the key
//! - `__eq`: host-level equality
//! - `__tostring`: class name and handle

use super::arena::{Arena, BoundEntry};
use super::class::{HostObject, ObjectRef};
use crate::context::{ExecutionContext, CLASS_TABLES_KEY};
use crate::lua_error::{bridge_error, lua_error};
use crate::value::HostValue;
use core_types::{BridgeError, BridgeResult};
use log::{debug, warn};
use mlua::{
    AnyUserData, Function, Lua, MetaMethod, MultiValue, Table, UserData, UserDataMethods, Value,
};
use std::rc::{Rc, Weak};

/// Binding state of a host instance within one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// No userdata exists for the instance
    Unbound,
    /// A userdata holds the interpreter-side reference
    Bound,
}

/// Payload of a bound instance's userdata.
pub(crate) struct BoundHandle {
    handle: i64,
    class_name: &'static str,
    arena: Weak<Arena>,
}

impl Drop for BoundHandle {
    fn drop(&mut self) {
        let released = self
            .arena
            .upgrade()
            .map(|arena| arena.release(self.handle))
            .unwrap_or(false);
        if released {
            debug!("{} #{} finalized", self.class_name, self.handle);
        }
    }
}

impl UserData for BoundHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_function(MetaMethod::Index, |lua, (userdata, key): (AnyUserData, Value)| {
            index(lua, &userdata, key)
        });
        methods.add_meta_function(MetaMethod::Eq, |lua, (a, b): (Value, Value)| {
            let context = ExecutionContext::from_lua(lua);
            let object = |value: &Value| match (value, &context) {
                (Value::UserData(userdata), Some(context)) => context.bound_object(userdata),
                _ => None,
            };
            Ok(match (object(&a), object(&b)) {
                (Some(a), Some(b)) => a.is_equal(&b),
                _ => false,
            })
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}: #{}", this.class_name, this.handle))
        });
    }
}

fn index(lua: &Lua, userdata: &AnyUserData, key: Value) -> mlua::Result<Value> {
    let (handle, class_name, arena) = {
        let this = userdata.borrow::<BoundHandle>()?;
        (this.handle, this.class_name, this.arena.clone())
    };
    let finalized = || lua_error(BridgeError::Finalized {
        class: class_name.to_string(),
    });
    let entry = arena
        .upgrade()
        .and_then(|arena| arena.get(handle))
        .ok_or_else(finalized)?;

    if let Some(class_table) = class_table(lua, class_name)? {
        let value: Value = class_table.get(key.clone())?;
        if !value.is_nil() {
            return Ok(value);
        }
    }

    let selector = match &key {
        Value::String(string) => string.to_str()?.to_string(),
        _ => return Ok(Value::Nil),
    };
    let cached = entry.trampolines.borrow().get(&selector).cloned();
    let function = match cached {
        Some(function) => function,
        None => {
            let function = trampoline(lua, handle, class_name, selector.clone(), arena)?;
            entry
                .trampolines
                .borrow_mut()
                .insert(selector, function.clone());
            function
        }
    };
    Ok(Value::Function(function))
}

/// A function bound to (handle, selector) that dispatches to the host-native
/// method of that name.
fn trampoline(
    lua: &Lua,
    handle: i64,
    class_name: &'static str,
    selector: String,
    arena: Weak<Arena>,
) -> mlua::Result<Function> {
    lua.create_function(move |lua, arguments: MultiValue| {
        let object = arena
            .upgrade()
            .and_then(|arena| arena.get(handle))
            .map(|entry| entry.object.clone())
            .ok_or_else(|| {
                lua_error(BridgeError::Finalized {
                    class: class_name.to_string(),
                })
            })?;
        let context = ExecutionContext::from_lua(lua)
            .ok_or_else(|| lua_error(BridgeError::runtime("execution context has been closed")))?;

        let mut arguments: Vec<Value> = arguments.into_iter().collect();
        // method-call syntax passes the receiver first
        let is_receiver = match arguments.first() {
            Some(Value::UserData(userdata)) => userdata
                .borrow::<BoundHandle>()
                .map(|bound| bound.handle == handle)
                .unwrap_or(false),
            _ => false,
        };
        if is_receiver {
            arguments.remove(0);
        }
        let arguments: Vec<HostValue> = arguments
            .into_iter()
            .map(|argument| context.decode(argument).unwrap_or(HostValue::Null))
            .collect();

        match object.perform(&selector, &arguments) {
            Some(Ok(result)) => Ok(context.encode(&result)),
            Some(Err(err)) => Err(lua_error(err)),
            None => Err(lua_error(BridgeError::UnrecognizedSelector {
                class: class_name.to_string(),
                selector: selector.clone(),
            })),
        }
    })
}

fn class_table(lua: &Lua, class_name: &str) -> mlua::Result<Option<Table>> {
    let tables: Table = lua.named_registry_value(CLASS_TABLES_KEY)?;
    tables.raw_get(class_name)
}

impl ExecutionContext {
    /// Pushes the userdata of a bound instance, binding it first if needed.
    pub(crate) fn push_bound(&self, object: &ObjectRef) {
        let value = match self.bind(object) {
            Ok(userdata) => Value::UserData(userdata),
            Err(err) => {
                warn!("could not bind {} instance: {}", object.class_name(), err);
                Value::Nil
            }
        };
        self.push_raw(value);
    }

    fn bind(&self, object: &ObjectRef) -> BridgeResult<AnyUserData> {
        if let Some(handle) = self.arena.handle_for(object.identity()) {
            // a missing cache entry means the old userdata awaits finalization
            if let Ok(Some(userdata)) = self.userdata_cache.raw_get::<Option<AnyUserData>>(handle) {
                return Ok(userdata);
            }
        }

        let handle = self.arena.bind(object.clone());
        let bound = BoundHandle {
            handle,
            class_name: object.class_name(),
            arena: Rc::downgrade(&self.arena),
        };
        let userdata = match self.lua.create_userdata(bound) {
            Ok(userdata) => userdata,
            Err(err) => {
                self.arena.release(handle);
                return Err(bridge_error(err));
            }
        };
        self.userdata_cache
            .raw_set(handle, userdata.clone())
            .map_err(bridge_error)?;
        debug!("{} bound as #{}", object.class_name(), handle);
        Ok(userdata)
    }

    /// The host instance behind a userdata, if it is a live bound instance.
    pub(crate) fn bound_object(&self, userdata: &AnyUserData) -> Option<ObjectRef> {
        self.bound_entry(userdata).map(|entry| entry.object.clone())
    }

    pub(crate) fn bound_entry(&self, userdata: &AnyUserData) -> Option<Rc<BoundEntry>> {
        let bound = userdata.borrow::<BoundHandle>().ok()?;
        bound.arena.upgrade()?.get(bound.handle)
    }

    /// Whether `object` currently has a userdata in this context.
    pub fn binding_state(&self, object: &dyn HostObject) -> BindingState {
        match self.arena.handle_for(object.identity()) {
            Some(_) => BindingState::Bound,
            None => BindingState::Unbound,
        }
    }

    /// Number of instances currently bound.
    pub fn bound_count(&self) -> usize {
        self.arena.len()
    }

    /// Registers the interpreter-side table of a class.
    pub fn register_class_table(&self, class_name: &str, table: &Table) -> BridgeResult<()> {
        let tables: Table = self
            .lua
            .named_registry_value(CLASS_TABLES_KEY)
            .map_err(bridge_error)?;
        tables.raw_set(class_name, table).map_err(bridge_error)
    }

    /// The interpreter-side table of a class, if one was registered.
    pub fn class_table(&self, class_name: &str) -> Option<Table> {
        class_table(&self.lua, class_name).ok().flatten()
    }
}
