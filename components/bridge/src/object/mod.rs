//! Bridged objects: host instances bound into the interpreter as userdata,
//! with unimplemented methods forwarded to interpreter-side class tables.

mod arena;
mod class;
mod forward;
mod state;
mod userdata;

pub(crate) use arena::Arena;
pub use class::{host_methods, BridgedClass, HostMethod, HostMethods, HostObject, ObjectRef};
pub use forward::{forward_in, forward_invocation, responds_to, send};
pub use state::{class_state, install_class, shutdown, state, ClassState};
pub use userdata::BindingState;
