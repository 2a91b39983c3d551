//! Bridge between Rust host objects and an embedded Lua interpreter
//!
//! This crate provides:
//! - An execution context that owns the interpreter stack and checks the
//!   stack delta of every operation
//! - A value bridging protocol with adapters for text, numbers, decimals,
//!   sequences, mappings and dynamic host values
//! - Bridged objects: `Rc` instances exposed as userdata, whose missing
//!   methods are forwarded to a per-class interpreter table
//!
//! # Example
//!
//! ```
//! use bridge::{forward_invocation, BridgedClass, ExecutionContext, HostValue, Invocation};
//! use core_types::{ScriptSource, ValueType};
//! use std::rc::Rc;
//!
//! struct Square {
//!     side: i64,
//! }
//!
//! impl BridgedClass for Square {
//!     const CLASS_NAME: &'static str = "Square";
//!
//!     fn register_methods(methods: &mut bridge::HostMethods<Self>) {
//!         methods.add("side", |this, _| Ok(HostValue::Integer(this.side)));
//!     }
//!
//!     fn implementation_source(_: &ExecutionContext) -> Option<ScriptSource> {
//!         Some(ScriptSource::text(
//!             "return { area = function(self) return self:side() * self:side() end }",
//!         ))
//!     }
//! }
//!
//! let square = Rc::new(Square { side: 3 });
//! let area = forward_invocation(&square, &Invocation::new("area").returning(ValueType::Integer));
//! assert_eq!(area.unwrap(), HostValue::Integer(9));
//! ```

#![warn(clippy::all)]

mod adapters;
pub mod config;
pub mod context;
pub mod invocation;
pub mod json;
mod lua_error;
pub mod object;
pub mod protocol;
pub mod search;
pub mod value;

// Re-export main types at crate root
pub use config::{
    add_search_path, set_default_config, BridgeConfig, DEFAULT_EXTENDED_COMPILER,
    DEFAULT_MAX_STACK_DEPTH, SEARCH_PATH_ENV,
};
pub use context::{ExecutionContext, ResultCount};
pub use invocation::Invocation;
pub use json::DICTIONARY_SELECTOR;
pub use object::{
    class_state, forward_in, forward_invocation, host_methods, install_class, responds_to, send,
    shutdown, state, BindingState, BridgedClass, ClassState, HostMethod, HostMethods, HostObject,
    ObjectRef,
};
pub use protocol::LuaValue;
pub use search::{ScriptLocator, SearchPathLocator};
pub use value::{HostValue, MapKey, Mapping};

pub use mlua;
