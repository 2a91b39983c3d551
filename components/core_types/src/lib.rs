//! Core types shared by the Lua bridge components.
//!
//! This crate holds everything the bridge needs to describe outcomes and
//! values without depending on the interpreter itself.
//!
//! # Overview
//!
//! - [`BridgeError`] - Recoverable errors (compile, runtime, dispatch, validation)
//! - [`LuaStatus`] - Interpreter status codes carried by interpreter errors
//! - [`ErrorDomain`] - Groups errors by where their code originates
//! - [`Fault`] - Unrecoverable bridge defects raised as panics
//! - [`Syntax`] / [`ScriptSource`] - Script dialects and where a script comes from
//! - [`ValueType`] - Declared host types for arguments and return values
//!
//! # Examples
//!
//! ```
//! use core_types::{BridgeError, ErrorDomain, LuaStatus};
//!
//! let error = BridgeError::Runtime {
//!     status: LuaStatus::Runtime,
//!     message: "attempt to call a nil value".to_string(),
//! };
//!
//! assert_eq!(error.domain(), ErrorDomain::Interpreter);
//! assert_eq!(error.code(), Some(2));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod fault;
mod source;
mod value_type;

pub use error::{BridgeError, BridgeResult, ErrorDomain, LuaStatus, LUA_ERROR_DOMAIN};
pub use fault::Fault;
pub use source::{ScriptSource, Syntax, BASE_EXTENSION, EXTENDED_EXTENSION};
pub use value_type::ValueType;
