//! Bridged classes and their host-native methods.

use crate::context::ExecutionContext;
use crate::value::HostValue;
use core_types::{BridgeResult, ScriptSource};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A host-native method reachable from the interpreter.
pub type HostMethod<C> = Rc<dyn Fn(&Rc<C>, &[HostValue]) -> BridgeResult<HostValue>>;

/// The host-native methods of one class, by selector.
pub struct HostMethods<C> {
    methods: HashMap<String, HostMethod<C>>,
}

impl<C> HostMethods<C> {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Registers `method` under `selector`, replacing any earlier one.
    pub fn add<F>(&mut self, selector: &str, method: F)
    where
        F: Fn(&Rc<C>, &[HostValue]) -> BridgeResult<HostValue> + 'static,
    {
        self.methods.insert(selector.to_string(), Rc::new(method));
    }

    pub fn get(&self, selector: &str) -> Option<HostMethod<C>> {
        self.methods.get(selector).cloned()
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.methods.contains_key(selector)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Registered selectors, unordered.
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

impl<C> Default for HostMethods<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A host class whose instances can be bound into the interpreter, and
/// whose missing methods are forwarded to its interpreter-side table.
///
/// # Example
///
/// ```
/// use bridge::{BridgedClass, HostMethods, HostValue};
///
/// struct Counter {
///     start: i64,
/// }
///
/// impl BridgedClass for Counter {
///     const CLASS_NAME: &'static str = "Counter";
///
///     fn register_methods(methods: &mut HostMethods<Self>) {
///         methods.add("start", |this, _| Ok(HostValue::Integer(this.start)));
///     }
/// }
/// ```
pub trait BridgedClass: Any + Sized {
    /// Name used to find the class script and to key its class table.
    const CLASS_NAME: &'static str;

    /// Registers the methods interpreter code may call on instances.
    fn register_methods(_methods: &mut HostMethods<Self>) {}

    /// Where the class's interpreter-side implementation lives.
    ///
    /// Defaults to `<CLASS_NAME>.mlua` or `<CLASS_NAME>.lua` on the
    /// context's search paths. `None` means the class has no
    /// interpreter-side behavior.
    fn implementation_source(context: &ExecutionContext) -> Option<ScriptSource> {
        context
            .resolve_script(Self::CLASS_NAME)
            .map(ScriptSource::File)
    }

    /// Host-level equality. Identity unless overridden.
    fn host_equals(this: &Rc<Self>, other: &Rc<Self>) -> bool {
        Rc::ptr_eq(this, other)
    }

    /// Hash consistent with [`host_equals`](Self::host_equals).
    fn host_hash(this: &Rc<Self>) -> u64 {
        Rc::as_ptr(this) as *const () as usize as u64
    }
}

thread_local! {
    static METHOD_TABLES: RefCell<HashMap<TypeId, Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

/// The method table of `C`, built on first use.
pub fn host_methods<C: BridgedClass>() -> Rc<HostMethods<C>> {
    let id = TypeId::of::<C>();
    let cached = METHOD_TABLES.with(|tables| tables.borrow().get(&id).cloned());
    if let Some(methods) = cached.and_then(|table| table.downcast::<HostMethods<C>>().ok()) {
        return methods;
    }

    // built outside the borrow so registration may itself look up tables
    let mut methods = HostMethods::new();
    C::register_methods(&mut methods);
    let methods = Rc::new(methods);
    log::debug!("{} registered {} host methods", C::CLASS_NAME, methods.len());
    METHOD_TABLES.with(|tables| {
        tables.borrow_mut().insert(id, methods.clone());
    });
    methods
}

/// Object-safe view of a bridged instance.
pub trait HostObject: Any {
    /// Class name of the instance.
    fn class_name(&self) -> &'static str;

    /// Address-based identity, stable for the life of the instance.
    fn identity(&self) -> usize;

    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;

    /// Runs a host-native method. `None` if the class has no such method.
    fn perform(
        self: Rc<Self>,
        selector: &str,
        arguments: &[HostValue],
    ) -> Option<BridgeResult<HostValue>>;

    /// Whether a host-native method exists for `selector`.
    fn responds_to(&self, selector: &str) -> bool;

    fn is_equal(self: Rc<Self>, other: &ObjectRef) -> bool;

    fn hash_value(self: Rc<Self>) -> u64;
}

/// Shared reference to any bridged instance.
pub type ObjectRef = Rc<dyn HostObject>;

impl<C: BridgedClass> HostObject for C {
    fn class_name(&self) -> &'static str {
        C::CLASS_NAME
    }

    fn identity(&self) -> usize {
        self as *const C as *const () as usize
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn perform(
        self: Rc<Self>,
        selector: &str,
        arguments: &[HostValue],
    ) -> Option<BridgeResult<HostValue>> {
        let method = host_methods::<C>().get(selector)?;
        Some(method(&self, arguments))
    }

    fn responds_to(&self, selector: &str) -> bool {
        host_methods::<C>().contains(selector)
    }

    fn is_equal(self: Rc<Self>, other: &ObjectRef) -> bool {
        match other.clone().into_any().downcast::<C>() {
            Ok(other) => C::host_equals(&self, &other),
            Err(_) => false,
        }
    }

    fn hash_value(self: Rc<Self>) -> u64 {
        C::host_hash(&self)
    }
}
