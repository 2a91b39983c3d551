//! Per-class execution contexts.
//!
//! Each bridged class lazily gets a private context in which its
//! implementation script is loaded. The registry is thread-local: contexts
//! and bound instances are `Rc`-based and never leave the thread that made
//! them.

use super::class::BridgedClass;
use crate::context::{ExecutionContext, ResultCount};
use crate::lua_error::bridge_error;
use core_types::{BridgeResult, ScriptSource};
use log::debug;
use mlua::{Table, Value};
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

thread_local! {
    static CLASS_STATES: RefCell<HashMap<TypeId, Rc<ClassState>>> = RefCell::new(HashMap::new());
}

/// The private context of a class and the table its script produced.
pub struct ClassState {
    class_name: &'static str,
    class_table: Table,
    context: Rc<ExecutionContext>,
}

impl ClassState {
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn context(&self) -> &Rc<ExecutionContext> {
        &self.context
    }

    pub fn class_table(&self) -> &Table {
        &self.class_table
    }

    /// The class table entry for `key`, if it is set.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        match self.class_table.get::<Value>(key) {
            Ok(Value::Nil) | Err(_) => None,
            Ok(value) => Some(value),
        }
    }
}

impl std::fmt::Debug for ClassState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassState")
            .field("class_name", &self.class_name)
            .field("context", &self.context)
            .finish()
    }
}

/// The state of `C`, creating its context and loading its script on first
/// use. A failed load is not cached.
pub fn class_state<C: BridgedClass>() -> BridgeResult<Rc<ClassState>> {
    let id = TypeId::of::<C>();
    if let Some(state) = CLASS_STATES.with(|states| states.borrow().get(&id).cloned()) {
        return Ok(state);
    }

    let context = ExecutionContext::new()?;
    let class_table = install_class::<C>(&context)?;
    let state = Rc::new(ClassState {
        class_name: C::CLASS_NAME,
        class_table,
        context,
    });
    // loading may have run code that created the state already
    Ok(CLASS_STATES.with(|states| states.borrow_mut().entry(id).or_insert(state).clone()))
}

/// The per-class execution context of `C`.
pub fn state<C: BridgedClass>() -> BridgeResult<Rc<ExecutionContext>> {
    class_state::<C>().map(|state| state.context.clone())
}

/// Loads the implementation of `C` into `context` and registers the
/// resulting class table.
///
/// The script's return value is used when it is a table; otherwise a global
/// named after the class; otherwise an empty table. A class without a script
/// gets an empty table.
pub fn install_class<C: BridgedClass>(context: &ExecutionContext) -> BridgeResult<Table> {
    let class_table = match C::implementation_source(context) {
        Some(source) => context.enforce_stack_delta(0, |context| {
            load_class_table(context, C::CLASS_NAME, &source)
        })?,
        None => {
            debug!("{} has no interpreter implementation", C::CLASS_NAME);
            context.lua().create_table().map_err(bridge_error)?
        }
    };
    context.register_class_table(C::CLASS_NAME, &class_table)?;
    Ok(class_table)
}

fn load_class_table(
    context: &ExecutionContext,
    class_name: &str,
    source: &ScriptSource,
) -> BridgeResult<Table> {
    debug!("loading {} implementation from {:?}", class_name, source);
    context.load(source)?;
    if let Err(err) = context.call_function(0, ResultCount::Exactly(1)) {
        context.discard(1);
        return Err(err);
    }
    if let Value::Table(table) = context.pop_raw() {
        return Ok(table);
    }
    match context.lua().globals().get::<Value>(class_name) {
        Ok(Value::Table(table)) => Ok(table),
        _ => context.lua().create_table().map_err(bridge_error),
    }
}

/// Drops every per-class context on this thread.
///
/// Instances bound in those contexts are released as the contexts close.
/// Later use of a class creates a fresh context.
pub fn shutdown() {
    let states = CLASS_STATES.with(|states| std::mem::take(&mut *states.borrow_mut()));
    if !states.is_empty() {
        debug!("shutting down {} class contexts", states.len());
    }
    drop(states);
}
