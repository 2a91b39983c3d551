//! Value bridging protocol.

use crate::context::ExecutionContext;

/// A host type that can cross the interpreter stack.
///
/// Implementations must keep the stack contract: `is_on_stack` consumes
/// nothing, `pop_from_stack` always removes exactly one value (even when it
/// returns `None`), and `push_onto_stack` always adds exactly one.
///
/// # Example
///
/// ```
/// use bridge::{ExecutionContext, LuaValue};
///
/// let context = ExecutionContext::new().unwrap();
/// 3.5f64.push_onto_stack(&context);
/// assert!(f64::is_on_stack(&context));
/// assert_eq!(f64::pop_from_stack(&context), Some(3.5));
/// assert_eq!(context.depth(), 0);
/// ```
pub trait LuaValue: Sized {
    /// Whether the top of the stack can be decoded as `Self`.
    fn is_on_stack(context: &ExecutionContext) -> bool;

    /// Pops the top of the stack, decoding it if it has the right shape.
    fn pop_from_stack(context: &ExecutionContext) -> Option<Self>;

    /// Pushes `self` onto the stack.
    fn push_onto_stack(&self, context: &ExecutionContext);
}
