//! Model equality and hashing.
//!
//! The class table may define `isEqual(self, selector, other)` and
//! `hash(self, selector)`; their results are coerced to a boolean and an
//! unsigned integer. Without overrides, models compare the values at
//! `equalityKeyPaths` (a sequence of dotted key paths in the class table),
//! or at every declared property when the table lists none. A failing
//! override is logged and the structural comparison is used instead.

use crate::class::{Model, ModelClass};
use bridge::{class_state, forward_invocation, ClassState, HostValue, Invocation};
use core_types::ValueType;
use log::warn;
use mlua::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Class table key of the equality override.
pub const IS_EQUAL_KEY: &str = "isEqual";

/// Class table key of the hash override.
pub const HASH_KEY: &str = "hash";

/// Class table key listing the key paths compared structurally.
pub const KEY_PATHS_KEY: &str = "equalityKeyPaths";

fn state_of<C: ModelClass>() -> Option<Rc<ClassState>> {
    match class_state::<Model<C>>() {
        Ok(state) => Some(state),
        Err(err) => {
            warn!("{} class script failed to load: {}", C::CLASS_NAME, err);
            None
        }
    }
}

fn has_override(state: Option<&Rc<ClassState>>, key: &str) -> bool {
    matches!(state.and_then(|state| state.lookup(key)), Some(Value::Function(_)))
}

/// Key paths compared by the structural equality of `C`.
pub fn equality_key_paths<C: ModelClass>() -> Vec<String> {
    key_paths_or_declared::<C>(state_of::<C>().as_ref())
}

fn key_paths_or_declared<C: ModelClass>(state: Option<&Rc<ClassState>>) -> Vec<String> {
    let listed = state.map(|state| key_paths(state)).unwrap_or_default();
    if listed.is_empty() {
        C::PROPERTY_KEYS.iter().map(|key| key.to_string()).collect()
    } else {
        listed
    }
}

fn key_paths(state: &ClassState) -> Vec<String> {
    let Some(listed) = state.lookup(KEY_PATHS_KEY) else {
        return Vec::new();
    };
    let context = state.context();
    context.push_raw(listed);
    match context.pop::<Vec<HostValue>>() {
        Some(paths) => paths
            .iter()
            .filter_map(|path| path.as_str().map(str::to_string))
            .collect(),
        None => {
            warn!("{} is not a sequence of key paths", KEY_PATHS_KEY);
            Vec::new()
        }
    }
}

/// Model equality: identity, then the `isEqual` override, then structure.
pub fn equals<C: ModelClass>(this: &Rc<Model<C>>, other: &Rc<Model<C>>) -> bool {
    if Rc::ptr_eq(this, other) {
        return true;
    }
    let state = state_of::<C>();
    if has_override(state.as_ref(), IS_EQUAL_KEY) {
        let invocation = Invocation::new(IS_EQUAL_KEY)
            .with_argument(HostValue::object(other.clone()))
            .returning(ValueType::Bool);
        match forward_invocation(this, &invocation) {
            Ok(result) => return result.as_bool().unwrap_or(false),
            Err(err) => warn!(
                "{}.{} failed, comparing structurally: {}",
                C::CLASS_NAME,
                IS_EQUAL_KEY,
                err
            ),
        }
    }
    structural_equals(this, other, &key_paths_or_declared::<C>(state.as_ref()))
}

/// Model hash: the `hash` override, else a hash of the key path values.
pub fn hash<C: ModelClass>(this: &Rc<Model<C>>) -> u64 {
    let state = state_of::<C>();
    if has_override(state.as_ref(), HASH_KEY) {
        let invocation = Invocation::new(HASH_KEY).returning(ValueType::Unsigned);
        match forward_invocation(this, &invocation) {
            Ok(result) => return result.as_i64().unwrap_or(0) as u64,
            Err(err) => warn!(
                "{}.{} failed, hashing structurally: {}",
                C::CLASS_NAME,
                HASH_KEY,
                err
            ),
        }
    }
    structural_hash(this, &key_paths_or_declared::<C>(state.as_ref()))
}

/// Compares the values at each key path; unset on both sides counts as equal.
pub fn structural_equals<C: ModelClass>(a: &Model<C>, b: &Model<C>, paths: &[String]) -> bool {
    paths
        .iter()
        .all(|path| a.value_for_key_path(path) == b.value_for_key_path(path))
}

/// Hashes the values at each key path.
pub fn structural_hash<C: ModelClass>(model: &Model<C>, paths: &[String]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for path in paths {
        model.value_for_key_path(path).hash(&mut hasher);
    }
    hasher.finish()
}
