//! Execution context: the single point of contact with the interpreter stack.
//!
//! An [`ExecutionContext`] owns one Lua VM and a value stack through which
//! every marshalled value flows. All stack arithmetic funnels through this
//! type so the depth contract of each operation can be checked in one place:
//!
//! | Operation | Delta on success | Delta on failure |
//! |---|---|---|
//! | [`load_script`](ExecutionContext::load_script) | +1 | 0 |
//! | [`call_function`](ExecutionContext::call_function) | −(args + 1) + results | −args (error value on top) |
//! | [`push_object`](ExecutionContext::push_object) | +1 | |
//! | [`pop_value`](ExecutionContext::pop_value) | −1 | −1 |
//! | [`push_arguments`](ExecutionContext::push_arguments) | +args | |
//! | [`pop_return_value`](ExecutionContext::pop_return_value) | −1 (0 for void) | −1 |
//!
//! Interior mutability keeps every method on `&self`, so interpreter code
//! can call back into the host (and the host back into the interpreter)
//! through the same context. No borrow of the stack is held across a call
//! into the interpreter.

use crate::adapters;
use crate::config::BridgeConfig;
use crate::invocation::Invocation;
use crate::lua_error::bridge_error;
use crate::object::Arena;
use crate::protocol::LuaValue;
use crate::search::{package_path_templates, SearchPathLocator, ScriptLocator};
use crate::value::HostValue;
use core_types::{BridgeError, BridgeResult, Fault, ScriptSource, Syntax};
use log::{debug, warn};
use mlua::{ChunkMode, Function, LightUserData, Lua, MultiValue, Table, Value};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// Registry key of the table mapping class names to class tables.
pub(crate) const CLASS_TABLES_KEY: &str = "moonlit.class_tables";

/// Deepest table nesting decoded before giving up on a value.
const MAX_DECODE_NESTING: usize = 128;

/// Markers of errors about the interpreter exhausting its stacks.
const STACK_OVERFLOW_MARKERS: [&str; 2] = ["stack overflow", "out of Lua stack"];

/// How many results a call should leave on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCount {
    /// Exactly this many; missing results are padded with nil
    Exactly(usize),
    /// However many the callee returned
    All,
}

impl From<usize> for ResultCount {
    fn from(count: usize) -> Self {
        ResultCount::Exactly(count)
    }
}

/// Links a VM back to the context wrapping it, for use inside callbacks.
struct ContextLink(Weak<ExecutionContext>);

/// Host values exposed as light userdata, keyed by handle.
#[derive(Default)]
struct OpaqueTable {
    next_handle: usize,
    entries: HashMap<usize, Rc<dyn Any>>,
    by_identity: HashMap<usize, usize>,
}

/// One interpreter execution context.
pub struct ExecutionContext {
    stack: RefCell<Vec<Value>>,
    opaque: RefCell<OpaqueTable>,
    search_paths: RefCell<Vec<PathBuf>>,
    decoding: RefCell<Vec<usize>>,
    calls: Cell<usize>,
    max_stack_depth: usize,
    extended_compiler: String,
    owns_state: bool,
    call_helper: Function,
    pub(crate) userdata_cache: Table,
    pub(crate) lua: Lua,
    // declared after `lua` so finalizers running during close still find it
    pub(crate) arena: Rc<Arena>,
}

impl ExecutionContext {
    /// Creates a context with a fresh VM and the process-wide default config.
    ///
    /// # Example
    ///
    /// ```
    /// use bridge::{ExecutionContext, ResultCount};
    ///
    /// let context = ExecutionContext::new().unwrap();
    /// context.load_script("return 6 * 7").unwrap();
    /// context.call_function(0, ResultCount::Exactly(1)).unwrap();
    /// assert_eq!(context.pop::<i64>(), Some(42));
    /// assert_eq!(context.depth(), 0);
    /// ```
    pub fn new() -> BridgeResult<Rc<Self>> {
        Self::with_config(&BridgeConfig::current())
    }

    /// Creates a context with a fresh VM, which it closes when dropped.
    pub fn with_config(config: &BridgeConfig) -> BridgeResult<Rc<Self>> {
        Self::build(Lua::new(), true, config)
    }

    /// Wraps an existing VM.
    ///
    /// If `close_when_done` is false the VM is left open when the context is
    /// dropped; objects it bound are released at that point, and their
    /// userdata in the VM become inert.
    pub fn with_lua(lua: Lua, close_when_done: bool) -> BridgeResult<Rc<Self>> {
        Self::build(lua, close_when_done, &BridgeConfig::current())
    }

    fn build(lua: Lua, owns_state: bool, config: &BridgeConfig) -> BridgeResult<Rc<Self>> {
        let userdata_cache: Table = lua
            .load("return setmetatable({}, { __mode = 'v' })")
            .set_name("=moonlit.cache")
            .eval()
            .map_err(bridge_error)?;
        let call_helper: Function = lua
            .load("return function(f, ...) return f(...) end")
            .set_name("=moonlit.call")
            .eval()
            .map_err(bridge_error)?;
        let class_tables = lua.create_table().map_err(bridge_error)?;
        lua.set_named_registry_value(CLASS_TABLES_KEY, class_tables)
            .map_err(bridge_error)?;

        let context = Rc::new(ExecutionContext {
            stack: RefCell::new(Vec::with_capacity(32)),
            opaque: RefCell::new(OpaqueTable::default()),
            search_paths: RefCell::new(config.search_paths.clone()),
            decoding: RefCell::new(Vec::new()),
            calls: Cell::new(0),
            max_stack_depth: config.max_stack_depth,
            extended_compiler: config.extended_compiler.clone(),
            owns_state,
            call_helper,
            userdata_cache,
            lua,
            arena: Rc::new(Arena::default()),
        });
        context
            .lua
            .set_app_data(ContextLink(Rc::downgrade(&context)));
        context.extend_package_path(&config.search_paths)?;

        debug!(
            "execution context created (owns state: {}, {} search paths)",
            owns_state,
            config.search_paths.len()
        );
        Ok(context)
    }

    /// The context wrapping `lua`, if it is still alive.
    pub fn from_lua(lua: &Lua) -> Option<Rc<Self>> {
        lua.app_data_ref::<ContextLink>()
            .and_then(|link| link.0.upgrade())
    }

    /// The wrapped VM.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Whether the VM is closed together with this context.
    pub fn owns_state(&self) -> bool {
        self.owns_state
    }

    // ------------------------------------------------------------------
    // Stack primitives
    // ------------------------------------------------------------------

    /// Current stack depth.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Configured maximum depth.
    pub fn max_stack_depth(&self) -> usize {
        self.max_stack_depth
    }

    /// Ensures `size` more slots are available.
    ///
    /// Running out of stack is a [`Fault::StackOverflow`], never an error: it
    /// means something recursed without bound through the bridge.
    pub fn grow_stack(&self, size: usize) {
        let depth = self.depth();
        if depth.saturating_add(size) > self.max_stack_depth {
            Fault::StackOverflow {
                requested: size,
                depth,
                limit: self.max_stack_depth,
            }
            .raise();
        }
        self.stack.borrow_mut().reserve(size);
    }

    /// Runs `operation` and checks it changed the depth by exactly
    /// `expected_delta`. A mismatch is a [`Fault::StackImbalance`].
    ///
    /// # Example
    ///
    /// ```
    /// use bridge::ExecutionContext;
    ///
    /// let context = ExecutionContext::new().unwrap();
    /// context.enforce_stack_delta(1, |ctx| ctx.push(&"moon".to_string()));
    /// assert_eq!(context.depth(), 1);
    /// ```
    pub fn enforce_stack_delta<R, F>(&self, expected_delta: isize, operation: F) -> R
    where
        F: FnOnce(&Self) -> R,
    {
        let before = self.depth() as isize;
        let result = operation(self);
        let after = self.depth() as isize;
        if after != before + expected_delta {
            Fault::StackImbalance {
                operation: std::any::type_name::<F>().to_string(),
                expected: before + expected_delta,
                actual: after,
            }
            .raise();
        }
        result
    }

    /// Pushes an interpreter value as is.
    pub fn push_raw(&self, value: Value) {
        self.grow_stack(1);
        self.stack.borrow_mut().push(value);
    }

    /// Pops the top interpreter value. Popping an empty stack is a fault.
    pub fn pop_raw(&self) -> Value {
        let popped = self.stack.borrow_mut().pop();
        match popped {
            Some(value) => value,
            None => Fault::StackUnderflow {
                requested: 1,
                depth: 0,
            }
            .raise(),
        }
    }

    /// A copy of the top interpreter value, without consuming it.
    pub fn top(&self) -> Option<Value> {
        self.stack.borrow().last().cloned()
    }

    /// Interpreter type name of the top value.
    pub fn type_name_at_top(&self) -> Option<&'static str> {
        self.stack.borrow().last().map(|value| value.type_name())
    }

    /// Drops `count` values from the top of the stack.
    pub fn discard(&self, count: usize) {
        let removed = {
            let mut stack = self.stack.borrow_mut();
            let depth = stack.len();
            if count > depth {
                drop(stack);
                Fault::StackUnderflow {
                    requested: count,
                    depth,
                }
                .raise();
            }
            stack.split_off(depth - count)
        };
        drop(removed);
    }

    /// Pushes a byte string; allocation failure pushes nil instead.
    pub fn push_bytes(&self, bytes: &[u8]) {
        match self.lua.create_string(bytes) {
            Ok(string) => self.push_raw(Value::String(string)),
            Err(err) => {
                warn!("could not allocate string: {}", err);
                self.push_raw(Value::Nil);
            }
        }
    }

    // ------------------------------------------------------------------
    // Protocol entry points
    // ------------------------------------------------------------------

    /// Pushes any protocol value. Always +1.
    pub fn push<T: LuaValue>(&self, value: &T) {
        value.push_onto_stack(self);
    }

    /// Pops a protocol value. Always −1; `None` if the shape does not match.
    pub fn pop<T: LuaValue>(&self) -> Option<T> {
        T::pop_from_stack(self)
    }

    /// Tests the top of the stack without consuming it.
    pub fn is_on_stack<T: LuaValue>(&self) -> bool {
        T::is_on_stack(self)
    }

    /// Pushes a dynamic host value. Always +1.
    pub fn push_object(&self, value: &HostValue) {
        value.push_onto_stack(self);
    }

    /// Pops a dynamic host value. Always −1.
    pub fn pop_value(&self) -> Option<HostValue> {
        HostValue::pop_from_stack(self)
    }

    /// Pushes every argument of `invocation`, in order.
    pub fn push_arguments(&self, invocation: &Invocation) {
        self.grow_stack(invocation.arguments().len());
        for argument in invocation.arguments() {
            self.push_object(argument);
        }
    }

    /// Pops the top value coerced to the invocation's declared return type.
    ///
    /// A value of the wrong shape yields the zero value of the declared type
    /// rather than an error. A void invocation consumes nothing.
    pub fn pop_return_value(&self, invocation: &Invocation) -> HostValue {
        adapters::pop_coerced(self, invocation.return_type())
    }

    /// Encodes a host value as an interpreter value by way of the stack.
    pub(crate) fn encode(&self, value: &HostValue) -> Value {
        self.push_object(value);
        self.pop_raw()
    }

    /// Decodes an interpreter value by way of the stack.
    pub(crate) fn decode(&self, value: Value) -> Option<HostValue> {
        self.push_raw(value);
        self.pop_value()
    }

    /// Runs the decode of `table`, refusing to descend into a table that is
    /// already being decoded further up, or past [`MAX_DECODE_NESTING`].
    ///
    /// A table reached twice through different keys is decoded twice; only
    /// a table reached from inside itself is cut.
    pub(crate) fn nested<R>(&self, table: &Table, decode: impl FnOnce() -> R) -> Option<R> {
        let identity = table.to_pointer() as usize;
        {
            let mut decoding = self.decoding.borrow_mut();
            if decoding.contains(&identity) {
                debug!("table refers back to itself, skipping the cycle");
                return None;
            }
            if decoding.len() >= MAX_DECODE_NESTING {
                warn!("table nesting deeper than {} levels, skipping", MAX_DECODE_NESTING);
                return None;
            }
            decoding.push(identity);
        }
        let _done = DecodeGuard(&self.decoding);
        Some(decode())
    }

    // ------------------------------------------------------------------
    // Opaque references
    // ------------------------------------------------------------------

    /// Registers a host value with no interpreter encoding and pushes it as
    /// light userdata carrying its handle.
    ///
    /// The context keeps the value alive until
    /// [`release_opaque`](Self::release_opaque) or until the context is
    /// dropped, so the interpreter never observes a dangling reference.
    /// Popping the light userdata back does not release it, so every
    /// distinct value pushed (including those nested in sequences and
    /// mappings) stays registered until then; [`opaque_count`](Self::opaque_count)
    /// shows how many are held.
    pub fn push_opaque(&self, value: &Rc<dyn Any>) {
        let handle = self.register_opaque(value);
        self.push_raw(Value::LightUserData(LightUserData(handle as *mut c_void)));
    }

    fn register_opaque(&self, value: &Rc<dyn Any>) -> usize {
        let identity = Rc::as_ptr(value) as *const () as usize;
        let mut table = self.opaque.borrow_mut();
        if let Some(handle) = table.by_identity.get(&identity) {
            return *handle;
        }
        table.next_handle += 1;
        let handle = table.next_handle;
        table.entries.insert(handle, value.clone());
        table.by_identity.insert(identity, handle);
        handle
    }

    /// Looks up an opaque value by handle.
    pub(crate) fn opaque(&self, handle: usize) -> Option<Rc<dyn Any>> {
        self.opaque.borrow().entries.get(&handle).cloned()
    }

    /// Stops keeping `value` alive for the interpreter.
    pub fn release_opaque(&self, value: &Rc<dyn Any>) -> bool {
        let identity = Rc::as_ptr(value) as *const () as usize;
        let removed = {
            let mut table = self.opaque.borrow_mut();
            match table.by_identity.remove(&identity) {
                Some(handle) => table.entries.remove(&handle),
                None => None,
            }
        };
        removed.is_some()
    }

    /// Number of opaque values currently held.
    pub fn opaque_count(&self) -> usize {
        self.opaque.borrow().entries.len()
    }

    // ------------------------------------------------------------------
    // Loading and calling
    // ------------------------------------------------------------------

    /// Compiles base-syntax source and pushes the resulting function.
    ///
    /// On a compile error the stack is left unchanged.
    pub fn load_script(&self, source: &str) -> BridgeResult<()> {
        self.load_script_with_syntax(source, Syntax::Base, "=(load)")
    }

    /// Compiles source in either dialect and pushes the resulting function.
    pub fn load_script_with_syntax(
        &self,
        source: &str,
        syntax: Syntax,
        chunk_name: &str,
    ) -> BridgeResult<()> {
        let function = match syntax {
            Syntax::Base => self.compile_base(source, chunk_name),
            Syntax::Extended => self.compile_extended(source, chunk_name),
        }?;
        self.push_raw(Value::Function(function));
        Ok(())
    }

    /// Compiles a script file, picking the dialect from its extension.
    pub fn load_script_at(&self, path: &Path) -> BridgeResult<()> {
        let source = std::fs::read_to_string(path).map_err(|source| BridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let syntax = Syntax::from_path(path).unwrap_or_default();
        let chunk_name = format!("@{}", path.display());
        debug!("loading {} as {:?} syntax", path.display(), syntax);
        self.load_script_with_syntax(&source, syntax, &chunk_name)
    }

    /// Compiles a script from any [`ScriptSource`].
    pub fn load(&self, script: &ScriptSource) -> BridgeResult<()> {
        match script {
            ScriptSource::Text {
                source,
                syntax,
                chunk_name,
            } => self.load_script_with_syntax(source, *syntax, chunk_name),
            ScriptSource::File(path) => self.load_script_at(path),
        }
    }

    fn compile_base(&self, source: &str, chunk_name: &str) -> BridgeResult<Function> {
        self.lua
            .load(source)
            .set_name(chunk_name)
            .set_mode(ChunkMode::Text)
            .into_function()
            .map_err(bridge_error)
    }

    fn compile_extended(&self, source: &str, chunk_name: &str) -> BridgeResult<Function> {
        let unavailable = |err: mlua::Error| {
            BridgeError::compile(format!(
                "extended syntax compiler `{}` unavailable: {}",
                self.extended_compiler,
                bridge_error(err)
            ))
        };
        let require: Function = self.lua.globals().get("require").map_err(unavailable)?;
        let compiler: Table = require
            .call(self.extended_compiler.as_str())
            .map_err(unavailable)?;
        let loadstring: Function = compiler.get("loadstring").map_err(unavailable)?;

        let (chunk, message): (Option<Function>, Option<String>) = loadstring
            .call((source, chunk_name))
            .map_err(|err| BridgeError::compile(bridge_error(err).to_string()))?;
        chunk.ok_or_else(|| {
            BridgeError::compile(
                message.unwrap_or_else(|| format!("{}: extended syntax compiler failed", chunk_name)),
            )
        })
    }

    /// Calls the function sitting below `arg_count` arguments.
    ///
    /// The call is protected: an interpreter error replaces the callee and
    /// arguments with the error value and is returned as
    /// [`BridgeError::Runtime`] carrying the interpreter status. Missing
    /// parameters are padded with nil by the interpreter itself.
    ///
    /// The interpreter running out of stack while this call is nested inside
    /// another one (the host was re-entered from a script and called back
    /// in) is a [`Fault::StackOverflow`]: the recursion runs through the
    /// bridge. Overflow in a call that is not nested stays a runtime error.
    pub fn call_function(&self, arg_count: usize, results: ResultCount) -> BridgeResult<()> {
        let depth = self.depth();
        if arg_count + 1 > depth {
            Fault::StackUnderflow {
                requested: arg_count + 1,
                depth,
            }
            .raise();
        }
        let frame = self.stack.borrow_mut().split_off(depth - arg_count - 1);

        let nesting = self.calls.get() + 1;
        self.calls.set(nesting);
        let returned = {
            let _done = CallGuard(&self.calls);
            self.call_helper.call::<MultiValue>(frame.into_iter().collect::<MultiValue>())
        };

        match returned {
            Ok(returned) => {
                let mut values: Vec<Value> = returned.into_iter().collect();
                if let ResultCount::Exactly(count) = results {
                    values.resize(count, Value::Nil);
                }
                self.grow_stack(values.len());
                self.stack.borrow_mut().extend(values);
                Ok(())
            }
            Err(err) => {
                let error = bridge_error(err);
                debug!("protected call failed: {}", error);
                let message = match &error {
                    BridgeError::Runtime { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                let overflow = STACK_OVERFLOW_MARKERS
                    .iter()
                    .any(|marker| message.contains(marker));
                if nesting > 1 && overflow {
                    Fault::StackOverflow {
                        requested: arg_count + 1,
                        depth: self.depth(),
                        limit: self.max_stack_depth,
                    }
                    .raise();
                }
                self.push_bytes(message.as_bytes());
                Err(match error {
                    BridgeError::Compile { status, message } => {
                        BridgeError::Runtime { status, message }
                    }
                    other => other,
                })
            }
        }
    }

    /// Loads and runs base-syntax source, leaving its results on the stack.
    ///
    /// Unlike [`call_function`](Self::call_function), a failure leaves the
    /// stack exactly as it was.
    pub fn do_string(&self, source: &str, results: ResultCount) -> BridgeResult<()> {
        self.load_script(source)?;
        self.call_function(0, results).inspect_err(|_| self.discard(1))
    }

    // ------------------------------------------------------------------
    // Globals and garbage collection
    // ------------------------------------------------------------------

    /// Pushes the global `name` (nil if unset).
    pub fn push_global(&self, name: &str) {
        let value = self.lua.globals().get::<Value>(name).unwrap_or_else(|err| {
            warn!("reading global `{}` failed: {}", name, err);
            Value::Nil
        });
        self.push_raw(value);
    }

    /// Pops the top value into the global `name`.
    pub fn set_global(&self, name: &str) -> BridgeResult<()> {
        let value = self.pop_raw();
        self.lua.globals().set(name, value).map_err(bridge_error)
    }

    /// Runs a full collection cycle, finalizing unreachable userdata.
    pub fn collect_garbage(&self) -> BridgeResult<()> {
        // the second cycle frees what the first cycle's finalizers released
        self.lua.gc_collect().map_err(bridge_error)?;
        self.lua.gc_collect().map_err(bridge_error)
    }

    // ------------------------------------------------------------------
    // Script search
    // ------------------------------------------------------------------

    /// Search paths registered with this context.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.search_paths.borrow().clone()
    }

    /// Registers another search path, also visible to `require`.
    pub fn add_search_path(&self, path: impl Into<PathBuf>) -> BridgeResult<()> {
        let path = path.into();
        self.extend_package_path(std::slice::from_ref(&path))?;
        self.search_paths.borrow_mut().push(path);
        Ok(())
    }

    /// Finds the implementation file for `name`: the interpreter's default
    /// library path first, then the registered search paths, extended
    /// syntax before base syntax.
    pub fn resolve_script(&self, name: &str) -> Option<PathBuf> {
        let mut templates = package_path_templates(&self.lua);
        templates.extend(
            self.search_paths
                .borrow()
                .iter()
                .map(|path| path.to_string_lossy().into_owned()),
        );
        let found = SearchPathLocator::new(templates).locate(name);
        debug!("resolved script `{}`: {:?}", name, found);
        found
    }

    fn extend_package_path(&self, paths: &[PathBuf]) -> BridgeResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let package: Table = self.lua.globals().get("package").map_err(bridge_error)?;
        let mut package_path: String = package.get("path").map_err(bridge_error)?;
        for path in paths {
            let entry = path.to_string_lossy();
            package_path.push(';');
            if entry.contains('?') {
                package_path.push_str(&entry);
            } else {
                package_path.push_str(&format!("{}/?.lua", entry.trim_end_matches('/')));
            }
        }
        package.set("path", package_path).map_err(bridge_error)
    }
}

/// Pops the innermost table of a decode, even if the decode unwinds.
struct DecodeGuard<'a>(&'a RefCell<Vec<usize>>);

impl Drop for DecodeGuard<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().pop();
    }
}

/// Leaves a protected call, even if a fault unwinds through it.
struct CallGuard<'a>(&'a Cell<usize>);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        let values = std::mem::take(self.stack.get_mut());
        drop(values);
        self.arena.clear_caches();
        if self.owns_state {
            debug!(
                "closing execution context ({} objects still bound)",
                self.arena.len()
            );
        } else {
            self.lua.remove_app_data::<ContextLink>();
            debug!("releasing borrowed execution context");
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("depth", &self.depth())
            .field("owns_state", &self.owns_state)
            .field("search_paths", &self.search_paths.borrow())
            .field("bound_objects", &self.arena.len())
            .finish()
    }
}
