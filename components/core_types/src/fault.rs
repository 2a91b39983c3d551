//! Fatal bridge faults.
//!
//! A fault means the bridge itself is broken: the stack could not be grown
//! (usually unbounded recursion through a trampoline) or an operation left
//! the stack at the wrong depth. Faults are raised with
//! [`std::panic::panic_any`] so the payload can be recovered by downcasting,
//! and they are never converted into a [`BridgeError`](crate::BridgeError).

use thiserror::Error;

/// An unrecoverable bridge defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// The stack cannot hold `requested` more slots.
    #[error("stack overflow: cannot reserve {requested} slots at depth {depth} (limit {limit})")]
    StackOverflow {
        /// Slots asked for
        requested: usize,
        /// Depth at the time of the request
        depth: usize,
        /// Configured maximum depth
        limit: usize,
    },

    /// An operation finished at a different depth than it promised.
    #[error("stack imbalance in {operation}: expected depth {expected}, found {actual}")]
    StackImbalance {
        /// Name of the checked operation
        operation: String,
        /// Depth the operation promised
        expected: isize,
        /// Depth actually observed
        actual: isize,
    },

    /// More values were consumed than the stack holds.
    #[error("stack underflow: cannot pop {requested} values at depth {depth}")]
    StackUnderflow {
        /// Values asked for
        requested: usize,
        /// Depth at the time of the request
        depth: usize,
    },
}

impl Fault {
    /// Logs the fault and unwinds with it as the panic payload.
    pub fn raise(self) -> ! {
        log::error!("bridge fault: {}", self);
        std::panic::panic_any(self)
    }

    /// Recovers a fault from a panic payload, if the panic carried one.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Option<&Fault> {
        payload.downcast_ref::<Fault>()
    }
}
