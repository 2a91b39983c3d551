//! Arena of bound instances.
//!
//! The interpreter never holds a host reference directly: its userdata
//! carries an integer handle into this arena, and the arena entry holds the
//! one strong reference owned by the interpreter side.

use super::class::ObjectRef;
use mlua::Function;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// One bound instance.
pub(crate) struct BoundEntry {
    pub(crate) object: ObjectRef,
    /// Trampolines handed out by `__index`, by selector
    pub(crate) trampolines: RefCell<HashMap<String, Function>>,
    /// Class table functions resolved by forwarding, by selector
    pub(crate) forwards: RefCell<HashMap<String, Function>>,
}

impl BoundEntry {
    fn clear_caches(&self) {
        let trampolines = std::mem::take(&mut *self.trampolines.borrow_mut());
        let forwards = std::mem::take(&mut *self.forwards.borrow_mut());
        drop((trampolines, forwards));
    }
}

#[derive(Default)]
pub(crate) struct Arena {
    next_handle: Cell<i64>,
    entries: RefCell<HashMap<i64, Rc<BoundEntry>>>,
    by_identity: RefCell<HashMap<usize, i64>>,
}

impl Arena {
    /// Adds the interpreter-held reference to `object` under a new handle.
    pub(crate) fn bind(&self, object: ObjectRef) -> i64 {
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        self.by_identity.borrow_mut().insert(object.identity(), handle);
        self.entries.borrow_mut().insert(
            handle,
            Rc::new(BoundEntry {
                object,
                trampolines: RefCell::new(HashMap::new()),
                forwards: RefCell::new(HashMap::new()),
            }),
        );
        handle
    }

    /// The latest handle bound for an instance.
    pub(crate) fn handle_for(&self, identity: usize) -> Option<i64> {
        self.by_identity.borrow().get(&identity).copied()
    }

    pub(crate) fn get(&self, handle: i64) -> Option<Rc<BoundEntry>> {
        self.entries.borrow().get(&handle).cloned()
    }

    /// Drops the interpreter-held reference. Returns false if the handle was
    /// already released.
    pub(crate) fn release(&self, handle: i64) -> bool {
        let removed = self.entries.borrow_mut().remove(&handle);
        let Some(entry) = removed else {
            return false;
        };
        let identity = entry.object.identity();
        {
            let mut by_identity = self.by_identity.borrow_mut();
            if by_identity.get(&identity) == Some(&handle) {
                by_identity.remove(&identity);
            }
        }
        // the host instance may be dropped here, after every borrow ends
        entry.clear_caches();
        drop(entry);
        true
    }

    /// Forgets every cached interpreter value, keeping the bindings.
    pub(crate) fn clear_caches(&self) {
        let entries: Vec<Rc<BoundEntry>> = self.entries.borrow().values().cloned().collect();
        for entry in entries {
            entry.clear_caches();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}
