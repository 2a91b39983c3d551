//! Translation of interpreter errors into bridge errors.

use core_types::{BridgeError, LuaStatus};

/// Converts an `mlua` error into the bridge taxonomy.
///
/// Errors raised by bridge callbacks travel through the interpreter wrapped
/// in callback errors; they are unwrapped so the host caller sees the
/// original [`BridgeError`].
pub(crate) fn bridge_error(err: mlua::Error) -> BridgeError {
    match err {
        mlua::Error::SyntaxError { message, .. } => BridgeError::Compile {
            status: LuaStatus::Syntax,
            message,
        },
        mlua::Error::RuntimeError(message) => BridgeError::Runtime {
            status: LuaStatus::Runtime,
            message: strip_traceback(message),
        },
        mlua::Error::MemoryError(message) => BridgeError::Runtime {
            status: LuaStatus::Memory,
            message,
        },
        mlua::Error::CallbackError { cause, .. } | mlua::Error::WithContext { cause, .. } => {
            bridge_error((*cause).clone())
        }
        mlua::Error::ExternalError(external) => match external.downcast_ref::<BridgeError>() {
            Some(inner) => inner.clone(),
            None => BridgeError::runtime(external.to_string()),
        },
        other => BridgeError::runtime(other.to_string()),
    }
}

/// Drops the traceback the interpreter appends to error values.
fn strip_traceback(message: String) -> String {
    match message.find("\nstack traceback:") {
        Some(end) => {
            log::trace!("{}", &message[end + 1..]);
            message[..end].to_string()
        }
        None => message,
    }
}

/// Wraps a bridge error so it can cross back through the interpreter.
pub(crate) fn lua_error(err: BridgeError) -> mlua::Error {
    mlua::Error::external(err)
}
