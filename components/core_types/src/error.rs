//! Bridge error types and interpreter status codes.
//!
//! Errors in this module are the recoverable ones: malformed scripts,
//! interpreter exceptions raised inside a protected call, unresolved
//! forwarded methods and rejected model values. Bridge defects are
//! [`Fault`](crate::Fault)s instead and never travel through `Result`.

use std::path::PathBuf;
use thiserror::Error;

/// Name of the error domain for codes that originate from the interpreter.
pub const LUA_ERROR_DOMAIN: &str = "moonlit.lua";

/// Status codes reported by the interpreter.
///
/// The discriminants are the interpreter's own `LUA_*` values so they can be
/// surfaced unchanged through [`BridgeError::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaStatus {
    /// `LUA_OK`
    Ok = 0,
    /// `LUA_YIELD`
    Yield = 1,
    /// `LUA_ERRRUN`: runtime error inside a protected call
    Runtime = 2,
    /// `LUA_ERRSYNTAX`: the compiler rejected the chunk
    Syntax = 3,
    /// `LUA_ERRMEM`: allocation failure
    Memory = 4,
    /// `LUA_ERRERR`: error while running the message handler
    ErrorHandler = 5,
    /// `LUA_ERRFILE`: a script file could not be opened or read
    File = 6,
}

impl LuaStatus {
    /// Numeric value of the status, as the interpreter reports it.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps a raw interpreter code back to a status.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => LuaStatus::Ok,
            1 => LuaStatus::Yield,
            2 => LuaStatus::Runtime,
            3 => LuaStatus::Syntax,
            4 => LuaStatus::Memory,
            5 => LuaStatus::ErrorHandler,
            6 => LuaStatus::File,
            _ => return None,
        })
    }
}

/// Where an error's code comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// Codes are interpreter status codes ([`LuaStatus`])
    Interpreter,
    /// Errors produced by the bridge itself (dispatch, validation, config)
    Bridge,
    /// File system errors while locating or reading scripts
    Io,
}

impl ErrorDomain {
    /// Stable string name of the domain.
    pub fn name(self) -> &'static str {
        match self {
            ErrorDomain::Interpreter => LUA_ERROR_DOMAIN,
            ErrorDomain::Bridge => "moonlit.bridge",
            ErrorDomain::Io => "moonlit.io",
        }
    }
}

/// A recoverable bridge error.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Script source failed to compile; the stack is left untouched.
    #[error("compile error: {message}")]
    Compile {
        /// Interpreter status (normally [`LuaStatus::Syntax`])
        status: LuaStatus,
        /// Compiler message, including the chunk name and line
        message: String,
    },

    /// Interpreter error raised inside a protected call.
    #[error("runtime error: {message}")]
    Runtime {
        /// Interpreter status code of the failed call
        status: LuaStatus,
        /// Error value rendered as text
        message: String,
    },

    /// Neither the host class nor its interpreter table handles a selector.
    #[error("{class} does not understand `{selector}`")]
    UnrecognizedSelector {
        /// Class name of the receiver
        class: String,
        /// Selector that could not be resolved
        selector: String,
    },

    /// A bridged instance was used after the interpreter finalized it.
    #[error("{class} instance has been finalized")]
    Finalized {
        /// Class name of the finalized instance
        class: String,
    },

    /// A model rejected a value during dictionary construction.
    #[error("invalid value for `{key}`: {reason}")]
    Validation {
        /// Property key being assigned
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Reading a script or configuration file failed.
    #[error("could not read {}: {source}", path.display())]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BridgeError {
    /// The domain the error's code belongs to.
    pub fn domain(&self) -> ErrorDomain {
        match self {
            BridgeError::Compile { .. } | BridgeError::Runtime { .. } => ErrorDomain::Interpreter,
            BridgeError::Io { .. } => ErrorDomain::Io,
            _ => ErrorDomain::Bridge,
        }
    }

    /// Interpreter status code, for errors in the interpreter domain.
    pub fn code(&self) -> Option<i32> {
        self.status().map(LuaStatus::code)
    }

    /// Interpreter status, for errors in the interpreter domain.
    pub fn status(&self) -> Option<LuaStatus> {
        match self {
            BridgeError::Compile { status, .. } | BridgeError::Runtime { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Shorthand for a runtime error with [`LuaStatus::Runtime`].
    pub fn runtime(message: impl Into<String>) -> Self {
        BridgeError::Runtime {
            status: LuaStatus::Runtime,
            message: message.into(),
        }
    }

    /// Shorthand for a compile error with [`LuaStatus::Syntax`].
    pub fn compile(message: impl Into<String>) -> Self {
        BridgeError::Compile {
            status: LuaStatus::Syntax,
            message: message.into(),
        }
    }
}

impl Clone for BridgeError {
    fn clone(&self) -> Self {
        match self {
            BridgeError::Compile { status, message } => BridgeError::Compile {
                status: *status,
                message: message.clone(),
            },
            BridgeError::Runtime { status, message } => BridgeError::Runtime {
                status: *status,
                message: message.clone(),
            },
            BridgeError::UnrecognizedSelector { class, selector } => {
                BridgeError::UnrecognizedSelector {
                    class: class.clone(),
                    selector: selector.clone(),
                }
            }
            BridgeError::Finalized { class } => BridgeError::Finalized {
                class: class.clone(),
            },
            BridgeError::Validation { key, reason } => BridgeError::Validation {
                key: key.clone(),
                reason: reason.clone(),
            },
            // io::Error is not Clone; keep the kind and the rendered message
            BridgeError::Io { path, source } => BridgeError::Io {
                path: path.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            BridgeError::Config(message) => BridgeError::Config(message.clone()),
        }
    }
}

/// Result type used throughout the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;
